//! Legacy fixes (spec §4.8): parameterized compatibility patches applied
//! between flattening and argument assembly. Each emits an event when
//! applied, and the applied set is surfaced in the final `Game`.
//!
//! The teacher has no equivalent of any of these; they're built directly
//! from spec §4.8's bullet list.

use crate::config::InstallerConfig;
use crate::maven::MavenCoordinate;
use crate::version::schema::{VersionJson, VersionKind};

/// True for any descriptor using the legacy single-string argument shape,
/// the proxy for "old enough that modern argument templates don't exist".
fn is_legacy(descriptor: &VersionJson) -> bool {
    descriptor.minecraft_arguments.is_some()
        || matches!(descriptor.kind, VersionKind::OldAlpha | VersionKind::OldBeta)
}

/// Library-level fixes: auth-lib coordinate swap and LWJGL version
/// rewrite. Applied directly to the flattened descriptor's libraries,
/// before any fetch is scheduled.
pub fn apply_descriptor_fixes(descriptor: &mut VersionJson, cfg: &InstallerConfig) -> Vec<&'static str> {
    let mut applied = Vec::new();

    if cfg.fix_auth_lib_2_1_28 {
        let mut touched = false;
        for lib in &mut descriptor.libraries {
            if lib.name.group == "com.mojang"
                && lib.name.artifact == "authlib"
                && lib.name.version == "2.1.28"
            {
                lib.name.version = "2.2.30".to_string();
                touched = true;
            }
        }
        if touched {
            applied.push("auth_lib_2_1_28_to_2_2_30");
        }
    }

    if let Some(target_version) = &cfg.fix_lwjgl {
        let mut touched = false;
        for lib in &mut descriptor.libraries {
            if lib.name.group.starts_with("org.lwjgl") && lib.name.version != *target_version {
                lib.name.version = target_version.clone();
                touched = true;
            }
        }
        if touched {
            applied.push("lwjgl");
        }
    }

    applied
}

/// Argument-level fixes: these append directly to the assembled argv,
/// since several target versions whose descriptors never had the modern
/// `arguments.jvm`/`arguments.game` shape to begin with.
pub fn apply_argument_fixes(
    descriptor: &VersionJson,
    cfg: &InstallerConfig,
    jvm_args: &mut Vec<String>,
    game_args: &mut Vec<String>,
) -> Vec<&'static str> {
    let mut applied = Vec::new();
    let legacy = is_legacy(descriptor);

    if legacy {
        if let Some((host, port)) = &cfg.fix_legacy_proxy {
            jvm_args.push(format!("-Dhttp.proxyHost={host}"));
            jvm_args.push(format!("-Dhttp.proxyPort={port}"));
            applied.push("legacy_proxy");
        }
    }

    if cfg.fix_legacy_merge_sort
        && matches!(descriptor.kind, VersionKind::OldAlpha | VersionKind::OldBeta)
    {
        jvm_args.push("-Djava.util.Arrays.useLegacyMergeSort=true".to_string());
        applied.push("legacy_merge_sort");
    }

    if legacy && cfg.fix_legacy_resolution {
        if let Some((width, height)) = cfg.resolution {
            game_args.push("--width".to_string());
            game_args.push(width.to_string());
            game_args.push("--height".to_string());
            game_args.push(height.to_string());
            applied.push("legacy_resolution");
        }
    }

    if legacy && cfg.fix_legacy_quick_play {
        if let Some((host, port)) = &cfg.quick_play_multiplayer {
            game_args.push("--server".to_string());
            game_args.push(host.clone());
            game_args.push("--port".to_string());
            game_args.push(port.to_string());
            applied.push("legacy_quick_play");
        }
    }

    applied
}

pub fn lwjgl_coordinate_missing(libraries: &[MavenCoordinate], version: &str) -> bool {
    !libraries
        .iter()
        .any(|c| c.group.starts_with("org.lwjgl") && c.version == version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::schema::{Library, VersionDownloads, VersionLogging};

    fn descriptor_with_libs(libs: Vec<&str>, kind: VersionKind, legacy: bool) -> VersionJson {
        VersionJson {
            id: "test".to_string(),
            inherits_from: None,
            kind,
            main_class: None,
            asset_index: None,
            assets: None,
            downloads: VersionDownloads::default(),
            logging: VersionLogging::default(),
            java_version: None,
            libraries: libs
                .into_iter()
                .map(|c| Library {
                    name: MavenCoordinate::parse(c).unwrap(),
                    rules: None,
                    downloads: None,
                    url: None,
                    natives: Default::default(),
                    extract: None,
                })
                .collect(),
            arguments: None,
            minecraft_arguments: if legacy {
                Some("--username ${auth_player_name}".to_string())
            } else {
                None
            },
            compliance_level: 0,
        }
    }

    #[test]
    fn auth_lib_fix_swaps_coordinate() {
        let mut descriptor =
            descriptor_with_libs(vec!["com.mojang:authlib:2.1.28"], VersionKind::Release, false);
        let mut cfg = InstallerConfig::default();
        cfg.fix_auth_lib_2_1_28 = true;
        let applied = apply_descriptor_fixes(&mut descriptor, &cfg);
        assert_eq!(applied, vec!["auth_lib_2_1_28_to_2_2_30"]);
        assert_eq!(descriptor.libraries[0].name.version, "2.2.30");
    }

    #[test]
    fn lwjgl_fix_rewrites_all_lwjgl_libraries() {
        let mut descriptor = descriptor_with_libs(
            vec!["org.lwjgl:lwjgl:3.2.1", "org.lwjgl:lwjgl-glfw:3.2.1"],
            VersionKind::Release,
            false,
        );
        let mut cfg = InstallerConfig::default();
        cfg.fix_lwjgl = Some("3.3.1".to_string());
        let applied = apply_descriptor_fixes(&mut descriptor, &cfg);
        assert_eq!(applied, vec!["lwjgl"]);
        assert!(descriptor.libraries.iter().all(|l| l.name.version == "3.3.1"));
    }

    #[test]
    fn legacy_merge_sort_only_on_old_alpha_beta() {
        let descriptor = descriptor_with_libs(vec![], VersionKind::OldBeta, true);
        let mut cfg = InstallerConfig::default();
        cfg.fix_legacy_merge_sort = true;
        let mut jvm_args = vec![];
        let mut game_args = vec![];
        let applied = apply_argument_fixes(&descriptor, &cfg, &mut jvm_args, &mut game_args);
        assert_eq!(applied, vec!["legacy_merge_sort"]);
        assert!(jvm_args.contains(&"-Djava.util.Arrays.useLegacyMergeSort=true".to_string()));
    }

    #[test]
    fn quick_play_fix_synthesizes_server_and_port() {
        let descriptor = descriptor_with_libs(vec![], VersionKind::Release, true);
        let mut cfg = InstallerConfig::default();
        cfg.fix_legacy_quick_play = true;
        cfg.quick_play_multiplayer = Some(("mc.example.com".to_string(), 25565));
        let mut jvm_args = vec![];
        let mut game_args = vec![];
        apply_argument_fixes(&descriptor, &cfg, &mut jvm_args, &mut game_args);
        assert_eq!(
            game_args,
            vec!["--server", "mc.example.com", "--port", "25565"]
        );
    }
}
