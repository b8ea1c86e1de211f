//! Installer configuration (spec §3 "Installer configuration"). A plain
//! struct, buildable programmatically or loaded from TOML/JSON the way the
//! teacher loads `dmclc_extras.json` next to each installation.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dirs::GameDirs;
use crate::rules::FeatureSet;

/// Which JVM source to use, and in what order, per spec §4.5.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "path")]
pub enum JvmPolicy {
    Static(PathBuf),
    System,
    Mojang,
    SystemThenMojang,
    MojangThenSystem,
}

impl Default for JvmPolicy {
    fn default() -> Self {
        JvmPolicy::SystemThenMojang
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct InstallerConfig {
    /// Version identifier to install (an id or the `release`/`snapshot`
    /// alias grammar described in spec §6).
    pub version: String,

    pub dirs: GameDirs,

    /// Skip hash verification for already-present assets/libraries/JVM
    /// files when false; presence alone is accepted.
    pub strict_assets: bool,
    pub strict_libraries: bool,
    pub strict_jvm: bool,

    pub jvm_policy: JvmPolicy,

    pub launcher_name: String,
    pub launcher_version: String,

    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    /// Worker pool size for the fetch engine; spec default `min(2*cores, 16)`.
    pub fetch_workers: usize,
    pub fetch_retries: usize,

    pub max_inheritance_depth: usize,

    /// Extra exclusion patterns of the form `group:artifact[:[version][:classifierPrefix]]`.
    pub exclude_lib: Vec<String>,
    /// Extra paths to place in the run bin directory (spec §4.3).
    pub include_bin: Vec<PathBuf>,

    pub resolution: Option<(u32, u32)>,
    pub quick_play_multiplayer: Option<(String, u16)>,
    pub quick_play_singleplayer: Option<String>,

    pub fix_legacy_proxy: Option<(String, u16)>,
    pub fix_legacy_merge_sort: bool,
    pub fix_legacy_resolution: bool,
    pub fix_legacy_quick_play: bool,
    pub fix_auth_lib_2_1_28: bool,
    pub fix_lwjgl: Option<String>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            version: "release".to_string(),
            dirs: GameDirs::default(),
            strict_assets: true,
            strict_libraries: true,
            strict_jvm: true,
            jvm_policy: JvmPolicy::default(),
            launcher_name: "portablemc-core".to_string(),
            launcher_version: env!("CARGO_PKG_VERSION").to_string(),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30),
            fetch_workers: (cores * 2).min(16),
            fetch_retries: 3,
            max_inheritance_depth: 16,
            exclude_lib: Vec::new(),
            include_bin: Vec::new(),
            resolution: None,
            quick_play_multiplayer: None,
            quick_play_singleplayer: None,
            fix_legacy_proxy: None,
            fix_legacy_merge_sort: false,
            fix_legacy_resolution: false,
            fix_legacy_quick_play: false,
            fix_auth_lib_2_1_28: false,
            fix_lwjgl: None,
        }
    }
}

impl InstallerConfig {
    pub fn from_toml_str(data: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(data)?)
    }

    pub fn from_json_str(data: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn feature_set(&self, is_demo_user: bool) -> FeatureSet {
        let mut features = FeatureSet::new().with("is_demo_user", is_demo_user);
        features.set("has_custom_resolution", self.resolution.is_some());
        features.set(
            "has_quick_plays_support",
            self.quick_play_multiplayer.is_some() || self.quick_play_singleplayer.is_some(),
        );
        features.set(
            "is_quick_play_singleplayer",
            self.quick_play_singleplayer.is_some(),
        );
        features.set(
            "is_quick_play_multiplayer",
            self.quick_play_multiplayer.is_some(),
        );
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let cfg = InstallerConfig::default();
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
        assert_eq!(cfg.idle_timeout, Duration::from_secs(30));
        assert_eq!(cfg.fetch_retries, 3);
        assert!(cfg.fetch_workers <= 16);
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = InstallerConfig::default();
        let serialized = toml::to_string(&cfg).unwrap();
        let parsed = InstallerConfig::from_toml_str(&serialized).unwrap();
        assert_eq!(parsed.version, cfg.version);
    }
}
