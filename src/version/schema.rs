//! On-the-wire version descriptor shapes (spec §3 "Version descriptor",
//! "Library entry"). Simplified from the teacher's 5-variant untagged
//! `Library` enum into one struct matching the spec's literal field list;
//! the base installer doesn't need to distinguish Fabric/Forge-specific
//! wire shapes, only the fields spec §3 actually names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::maven::MavenCoordinate;
use crate::platform::Os;
use crate::rules::EnvRule;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Resource {
    pub url: String,
    pub sha1: String,
    pub size: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    pub sha1: String,
    pub size: u64,
    pub total_size: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct VersionDownloads {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<Resource>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggingClient {
    pub argument: String,
    pub file: LoggingFile,
    #[serde(rename = "type")]
    pub typ: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggingFile {
    pub id: String,
    pub url: String,
    pub sha1: String,
    pub size: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct VersionLogging {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<LoggingClient>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub component: String,
    pub major_version: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LibraryDownloads {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<LibraryArtifact>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub classifiers: HashMap<String, LibraryArtifact>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LibraryArtifact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub url: String,
    pub sha1: String,
    pub size: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LibraryExtract {
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Library {
    pub name: MavenCoordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<EnvRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,
    /// Repository base URL for libraries with no `downloads` block (Fabric
    /// loader's `profile/json` endpoint, old-Forge `BaseOnly` libs). Absent
    /// means the default `https://libraries.minecraft.net/` base applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Per-OS native classifier template, e.g. `natives-linux-${arch}`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub natives: HashMap<Os, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<LibraryExtract>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum OneOrMore {
    One(String),
    More(Vec<String>),
}

impl OneOrMore {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMore::One(s) => vec![s],
            OneOrMore::More(v) => v,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum Argument {
    Plain(String),
    Conditional {
        rules: Vec<EnvRule>,
        value: OneOrMore,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Arguments {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<Vec<Argument>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jvm: Option<Vec<Argument>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    Snapshot,
    #[default]
    Release,
    OldBeta,
    OldAlpha,
}

/// A flattened-or-raw version descriptor. `arguments` and
/// `minecraft_arguments` are mutually exclusive on the wire; both are
/// `Option` here so a single struct can represent both shapes (the open
/// question in spec §9 resolves: any other `arguments.game` element shape
/// is rejected as `malformed_descriptor` at parse/flatten time, not
/// represented structurally).
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    #[serde(default)]
    #[serde(rename = "type")]
    pub kind: VersionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,
    #[serde(default)]
    pub downloads: VersionDownloads,
    #[serde(default)]
    pub logging: VersionLogging,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_version: Option<JavaVersionInfo>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub compliance_level: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AssetsIndex {
    #[serde(default, rename = "virtual")]
    pub virtual_: bool,
    #[serde(default)]
    pub map_to_resources: bool,
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VersionManifestEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: VersionKind,
    pub url: String,
    #[serde(rename = "releaseTime")]
    pub release_time: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VersionManifest {
    pub latest: LatestVersions,
    pub versions: Vec<VersionManifestEntry>,
}

impl VersionManifest {
    pub fn find(&self, id: &str) -> Option<&VersionManifestEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// Resolves spec §6's `release`/`snapshot` id aliases.
    pub fn resolve_alias<'a>(&'a self, id: &'a str) -> &'a str {
        match id {
            "release" => &self.latest.release,
            "snapshot" => &self.latest.snapshot,
            other => other,
        }
    }
}
