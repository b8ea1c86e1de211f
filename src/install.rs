//! Top-level installation orchestration (spec §5 lifecycle): resolves a
//! version string through the loader-prefix grammar, walks the descriptor
//! chain, schedules every fetch batch, extracts natives, provisions a
//! JVM, and assembles the final `Game`.
//!
//! Grounded on the teacher's `minecraft/install.rs::{VersionInfo::install,
//! complete_files}`, which drives the same overall sequence (metadata ->
//! libraries -> assets -> arguments) but without mod-loader dispatch, JVM
//! provisioning, or the fixes/exclude_lib layers added here.

use tokio::sync::mpsc::UnboundedSender;

use crate::arguments;
use crate::assets;
use crate::auth::AuthSession;
use crate::config::InstallerConfig;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::fetch::{FetchEngine, FetchEntry};
use crate::fixes;
use crate::game::Game;
use crate::jvm;
use crate::library;
use crate::loaders::{fabric, forge};
use crate::mojang::MojangProvider;
use crate::platform;
use crate::rules::PlatformFacts;
use crate::version::resolver;
use crate::version::schema::{AssetsIndex, VersionJson, VersionKind};

/// Parsed shape of spec §6's version grammar:
/// `[loader-prefix:]<id-or-alias>[:<loader-extra>]`. `babric` is accepted
/// alongside the prefixes spec §6 lists, since the Fabric-family installer
/// already supports it (SPEC_FULL §4.14).
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoaderSpec {
    Standard,
    Fabric(fabric::FabricFamily),
    Forge(forge::ForgeFamily),
}

fn parse_version_spec(spec: &str) -> (LoaderSpec, String, Option<String>) {
    let first = spec.splitn(2, ':').next().unwrap_or(spec);
    let is_prefix = matches!(
        first,
        "standard" | "mojang" | "fabric" | "quilt" | "legacyfabric" | "babric" | "forge" | "neoforge"
    );

    if !is_prefix {
        let mut parts = spec.splitn(2, ':');
        let id = parts.next().unwrap_or(spec).to_string();
        let extra = parts.next().map(str::to_string);
        return (LoaderSpec::Standard, id, extra);
    }

    let rest = spec.splitn(2, ':').nth(1).unwrap_or_default();
    let mut rest_parts = rest.splitn(2, ':');
    let id = rest_parts.next().unwrap_or_default().to_string();
    let extra = rest_parts.next().map(str::to_string);

    let loader = match first {
        "standard" | "mojang" => LoaderSpec::Standard,
        "fabric" => LoaderSpec::Fabric(fabric::FabricFamily::Fabric),
        "quilt" => LoaderSpec::Fabric(fabric::FabricFamily::Quilt),
        "legacyfabric" => LoaderSpec::Fabric(fabric::FabricFamily::LegacyFabric),
        "babric" => LoaderSpec::Fabric(fabric::FabricFamily::Babric),
        "forge" => LoaderSpec::Forge(forge::ForgeFamily::Forge),
        "neoforge" => LoaderSpec::Forge(forge::ForgeFamily::NeoForge),
        _ => unreachable!("checked by is_prefix above"),
    };
    (loader, id, extra)
}

fn version_type_str(kind: &VersionKind) -> &'static str {
    match kind {
        VersionKind::Release => "release",
        VersionKind::Snapshot => "snapshot",
        VersionKind::OldBeta => "old_beta",
        VersionKind::OldAlpha => "old_alpha",
    }
}

fn emit(events: Option<&UnboundedSender<Event>>, event: Event) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

/// Runs one full install to a ready-to-launch `Game`. This, together with
/// `Game::spawn`, is the stable pair a front end (CLI or otherwise) is
/// meant to target; everything else in this crate is a building block it
/// composes.
pub async fn install(
    cfg: &InstallerConfig,
    auth: &AuthSession,
    is_demo_user: bool,
    events: Option<UnboundedSender<Event>>,
) -> Result<Game> {
    let events_ref = events.as_ref();
    let dirs = &cfg.dirs;

    let client = reqwest::Client::builder()
        .connect_timeout(cfg.connect_timeout)
        .timeout(cfg.idle_timeout)
        .build()?;
    let provider = MojangProvider::new(client.clone());

    let (loader, id, extra) = parse_version_spec(&cfg.version);
    let mc_version = provider.resolve_version_id(&id).await?;

    let root_id = match loader {
        LoaderSpec::Standard => mc_version.clone(),
        LoaderSpec::Fabric(family) => {
            let loader_version =
                fabric::resolve_loader_version(family, &client, &mc_version, extra.as_deref()).await?;
            fabric::install(family, &client, dirs, &mc_version, &loader_version, events_ref).await?
        }
        LoaderSpec::Forge(family) => {
            let base_jar = prepare_base_install(&client, &provider, dirs, &mc_version, cfg).await?;
            let loader_version =
                forge::resolve_version(family, &client, &mc_version, extra.as_deref()).await?;
            forge::install(
                family,
                &client,
                dirs,
                &mc_version,
                &loader_version,
                &base_jar,
                events_ref,
            )
            .await?
        }
    };

    let chain = resolver::load_chain(
        &root_id,
        |id| dirs.version_json(id),
        &provider,
        cfg.max_inheritance_depth,
        events_ref,
    )
    .await?;
    let mut flattened = resolver::flatten(&chain)?;

    let mut applied_fixes = fixes::apply_descriptor_fixes(&mut flattened, cfg);
    for name in &applied_fixes {
        emit(events_ref, Event::FixApplied { name: *name });
    }

    let features = cfg.feature_set(is_demo_user);
    emit(
        events_ref,
        Event::FeaturesSelected {
            features: features.keys(),
        },
    );

    let facts = PlatformFacts {
        os: platform::CURRENT_OS,
        os_version: platform::current_os_version(),
        arch: platform::CURRENT_ARCH.to_string(),
    };

    let main_class = flattened
        .main_class
        .clone()
        .ok_or_else(|| Error::MainClassNotFound {
            id: flattened.id.clone(),
        })?;

    let client_download = flattened
        .downloads
        .client
        .clone()
        .ok_or(Error::ClientNotFound)?;
    let client_jar_path = dirs.version_jar(&flattened.id);

    emit(events_ref, Event::ClientLoadStart);
    let mut fetch_batch = vec![FetchEntry {
        url: client_download.url,
        dest: client_jar_path.clone(),
        size: Some(client_download.size),
        sha1: Some(client_download.sha1),
        executable: false,
    }];

    let resolved_libs = library::resolve(
        &flattened.libraries,
        dirs,
        &facts,
        &features,
        &cfg.exclude_lib,
    )?;
    emit(
        events_ref,
        Event::LibrariesLoadStart {
            count: resolved_libs.fetch.len(),
        },
    );
    fetch_batch.extend(resolved_libs.fetch.clone());

    let asset_index_info =
        flattened
            .asset_index
            .clone()
            .ok_or_else(|| Error::AssetsIndexNotFound {
                id: flattened.id.clone(),
            })?;
    emit(
        events_ref,
        Event::AssetsLoadStart {
            index_id: asset_index_info.id.clone(),
        },
    );
    let asset_index = fetch_asset_index(&client, &asset_index_info, dirs, cfg.strict_assets).await?;
    let resolved_assets = assets::resolve(&asset_index, &asset_index_info.id, dirs);
    fetch_batch.extend(resolved_assets.fetch);

    let logger_arg = flattened.logging.client.as_ref().map(|logging_client| {
        emit(events_ref, Event::LoggerLoadStart);
        let log_path = dirs.assets().join("log_configs").join(&logging_client.file.id);
        fetch_batch.push(FetchEntry {
            url: logging_client.file.url.clone(),
            dest: log_path.clone(),
            size: Some(logging_client.file.size),
            sha1: Some(logging_client.file.sha1.clone()),
            executable: false,
        });
        (logging_client.argument.clone(), log_path)
    });

    let strict = cfg.strict_libraries || cfg.strict_assets;
    let engine = FetchEngine::new(client.clone(), cfg.fetch_workers, cfg.fetch_retries, strict);
    engine.run(fetch_batch, events.clone()).await?;

    emit(events_ref, Event::ClientLoadEnd);
    emit(events_ref, Event::LibrariesLoadEnd);
    emit(
        events_ref,
        Event::AssetsLoadEnd {
            count: asset_index.objects.len(),
        },
    );
    if logger_arg.is_some() {
        emit(events_ref, Event::LoggerLoadEnd);
    }

    assets::mirror(&asset_index, &asset_index_info.id, dirs).await?;

    let run_id = uuid::Uuid::new_v4().to_string();
    let bin_dir = dirs.run_bin_dir(&run_id);
    for native in &resolved_libs.natives {
        let jar_path = native.jar_path.clone();
        let exclude = native.exclude.clone();
        let dest = bin_dir.clone();
        tokio::task::spawn_blocking(move || library::extract_native_jar(&jar_path, &dest, &exclude))
            .await
            .map_err(|e| Error::Other(anyhow::anyhow!(e)))??;
    }
    if !cfg.include_bin.is_empty() {
        tokio::fs::create_dir_all(&bin_dir).await?;
    }
    for extra_path in &cfg.include_bin {
        if let Some(file_name) = extra_path.file_name() {
            tokio::fs::copy(extra_path, bin_dir.join(file_name)).await?;
        }
    }

    let (jvm_component, jvm_major) = flattened
        .java_version
        .as_ref()
        .map(|j| (j.component.clone(), j.major_version))
        .unwrap_or_else(|| ("jre-legacy".to_string(), 8));
    let resolved_jvm = jvm::resolve(
        &cfg.jvm_policy,
        &jvm_component,
        jvm_major,
        dirs,
        &client,
        &engine,
        events_ref,
    )
    .await?;

    let assets_root = if asset_index.virtual_ {
        dirs.asset_virtual_dir(&asset_index_info.id)
    } else if asset_index.map_to_resources {
        dirs.work_resources()
    } else {
        dirs.assets()
    };

    let mut classpath = resolved_libs.classpath;
    classpath.push(client_jar_path);

    let mut map = arguments::base_substitutions(
        auth,
        &flattened.id,
        version_type_str(&flattened.kind),
        &dirs.work,
        &assets_root,
        &asset_index_info.id,
        &cfg.launcher_name,
        &cfg.launcher_version,
        &classpath,
        &bin_dir,
    );
    if let Some((width, height)) = cfg.resolution {
        map.set("resolution_width", width.to_string());
        map.set("resolution_height", height.to_string());
    }
    if let Some((host, port)) = &cfg.quick_play_multiplayer {
        map.set("quickPlayMultiplayer", format!("{host}:{port}"));
    }
    if let Some(singleplayer) = &cfg.quick_play_singleplayer {
        map.set("quickPlaySingleplayer", singleplayer.clone());
    }

    let mut jvm_args = match flattened.arguments.as_ref().and_then(|a| a.jvm.clone()) {
        Some(args) => arguments::assemble(&args, &map, &facts, &features),
        None => vec![
            format!("-Djava.library.path={}", bin_dir.display()),
            "-cp".to_string(),
            classpath
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join(platform::CLASSPATH_SEPARATOR),
        ],
    };
    if let Some((template, log_path)) = &logger_arg {
        jvm_args.push(arguments::logger_argument(template, log_path));
    }

    let mut game_args = match (&flattened.arguments, &flattened.minecraft_arguments) {
        (Some(args), _) => args
            .game
            .as_ref()
            .map(|game| arguments::assemble(game, &map, &facts, &features))
            .unwrap_or_default(),
        (None, Some(legacy)) => arguments::assemble_legacy(legacy, &map),
        (None, None) => Vec::new(),
    };

    let arg_fixes = fixes::apply_argument_fixes(&flattened, cfg, &mut jvm_args, &mut game_args);
    for name in &arg_fixes {
        emit(events_ref, Event::FixApplied { name: *name });
    }
    applied_fixes.extend(arg_fixes);

    Ok(Game {
        id: flattened.id,
        jvm_executable: resolved_jvm.executable,
        working_directory: dirs.work.clone(),
        main_class,
        jvm_args,
        game_args,
        applied_fixes,
    })
}

/// Ensures the plain Mojang descriptor and client jar for `mc_version` are
/// present on disk, returning the jar's path. The Forge/NeoForge processor
/// pipeline patches against this file, so it must exist before the loader
/// installer runs (spec §4.9 "install (V2 scheme)").
async fn prepare_base_install(
    client: &reqwest::Client,
    provider: &MojangProvider,
    dirs: &crate::dirs::GameDirs,
    mc_version: &str,
    cfg: &InstallerConfig,
) -> Result<std::path::PathBuf> {
    use crate::version::resolver::VersionProvider;

    let descriptor_path = dirs.version_json(mc_version);
    if !descriptor_path.exists() {
        if !provider.ensure(mc_version, &descriptor_path).await? {
            return Err(Error::VersionNotFound {
                id: mc_version.to_string(),
            });
        }
    }

    let jar_path = dirs.version_jar(mc_version);
    if !jar_path.exists() {
        let bytes = tokio::fs::read(&descriptor_path).await?;
        let descriptor: VersionJson =
            serde_json::from_slice(&bytes).map_err(|e| Error::MalformedDescriptor {
                id: mc_version.to_string(),
                reason: e.to_string(),
            })?;
        let download = descriptor.downloads.client.ok_or(Error::ClientNotFound)?;
        let engine = FetchEngine::new(
            client.clone(),
            cfg.fetch_workers,
            cfg.fetch_retries,
            cfg.strict_libraries,
        );
        engine
            .run(
                vec![FetchEntry {
                    url: download.url,
                    dest: jar_path.clone(),
                    size: Some(download.size),
                    sha1: Some(download.sha1),
                    executable: false,
                }],
                None,
            )
            .await?;
    }

    Ok(jar_path)
}

async fn fetch_asset_index(
    client: &reqwest::Client,
    info: &crate::version::schema::AssetIndexInfo,
    dirs: &crate::dirs::GameDirs,
    strict: bool,
) -> Result<AssetsIndex> {
    let index_path = dirs.asset_index_json(&info.id);
    if index_path.exists() && !strict {
        let bytes = tokio::fs::read(&index_path).await?;
        if let Ok(index) = serde_json::from_slice(&bytes) {
            return Ok(index);
        }
    }

    let bytes = client.get(&info.url).send().await?.bytes().await?;
    if let Some(parent) = index_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = index_path.with_extension("json.part");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, &index_path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_id_has_no_loader_prefix() {
        let (loader, id, extra) = parse_version_spec("1.20.1");
        assert_eq!(loader, LoaderSpec::Standard);
        assert_eq!(id, "1.20.1");
        assert_eq!(extra, None);
    }

    #[test]
    fn fabric_prefix_with_loader_version() {
        let (loader, id, extra) = parse_version_spec("fabric:1.20.1:0.14.21");
        assert_eq!(loader, LoaderSpec::Fabric(fabric::FabricFamily::Fabric));
        assert_eq!(id, "1.20.1");
        assert_eq!(extra.as_deref(), Some("0.14.21"));
    }

    #[test]
    fn forge_prefix_without_loader_version_resolves_latest_later() {
        let (loader, id, extra) = parse_version_spec("forge:1.20.1");
        assert_eq!(loader, LoaderSpec::Forge(forge::ForgeFamily::Forge));
        assert_eq!(id, "1.20.1");
        assert_eq!(extra, None);
    }

    #[test]
    fn standard_prefix_is_equivalent_to_no_prefix() {
        let (loader, id, _) = parse_version_spec("standard:release");
        assert_eq!(loader, LoaderSpec::Standard);
        assert_eq!(id, "release");
    }

    #[test]
    fn version_type_strings_match_placeholder_values() {
        assert_eq!(version_type_str(&VersionKind::Release), "release");
        assert_eq!(version_type_str(&VersionKind::OldAlpha), "old_alpha");
    }
}
