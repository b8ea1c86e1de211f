//! The Fabric-family installer (spec §4.9): Fabric, Quilt, LegacyFabric,
//! Babric. Given a game version and optional loader version, resolve a
//! concrete loader version against the family's metadata API, then
//! synthesize a descriptor inheriting from the underlying Mojang version.
//!
//! Generalized from the teacher's `components/install/fabriclike.rs`,
//! which only covers Fabric and Quilt (two `meta_url`/`loader_artifact_name`
//! constructors); SPEC_FULL §4.14 adds LegacyFabric and Babric as two more
//! members of the same shape.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::dirs::GameDirs;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::maven::MavenCoordinate;
use crate::version::schema::VersionJson;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FabricFamily {
    Fabric,
    Quilt,
    LegacyFabric,
    Babric,
}

impl FabricFamily {
    fn meta_url(&self) -> &'static str {
        match self {
            FabricFamily::Fabric => "https://meta.fabricmc.net/v2",
            FabricFamily::Quilt => "https://meta.quiltmc.org/v3",
            FabricFamily::LegacyFabric => "https://meta.legacyfabric.net/v2",
            FabricFamily::Babric => "https://meta.babric.glass-launcher.net/v2",
        }
    }

    fn loader_artifact_name(&self) -> &'static str {
        match self {
            FabricFamily::Fabric => "fabric-loader",
            FabricFamily::Quilt => "quilt-loader",
            FabricFamily::LegacyFabric => "fabric-loader",
            FabricFamily::Babric => "babric-loader",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            FabricFamily::Fabric => "fabric",
            FabricFamily::Quilt => "quilt",
            FabricFamily::LegacyFabric => "legacyfabric",
            FabricFamily::Babric => "babric",
        }
    }

    fn name(&self) -> &'static str {
        self.prefix()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct LoaderVersionEntry {
    loader: LoaderVersion,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct LoaderVersion {
    maven: MavenCoordinate,
    version: String,
}

fn urlencode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Lists available loader versions for a game version, newest first (the
/// shape every family's `/versions/loader/<mc>` endpoint returns).
pub async fn list_loader_versions(
    family: FabricFamily,
    client: &reqwest::Client,
    mc_version: &str,
) -> Result<Vec<String>> {
    let url = format!(
        "{}/versions/loader/{}",
        family.meta_url(),
        urlencode(mc_version)
    );
    let entries: Vec<LoaderVersionEntry> = client.get(&url).send().await?.json().await?;
    Ok(entries.into_iter().map(|e| e.loader.version).collect())
}

pub async fn resolve_loader_version(
    family: FabricFamily,
    client: &reqwest::Client,
    mc_version: &str,
    requested: Option<&str>,
) -> Result<String> {
    let versions = list_loader_versions(family, client, mc_version).await?;
    if versions.is_empty() {
        return Err(Error::FabricGameVersionNotFound {
            family: family.name().to_string(),
            game_version: mc_version.to_string(),
        });
    }
    match requested {
        None => Ok(versions[0].clone()),
        Some(wanted) if wanted == "latest" => Ok(versions[0].clone()),
        Some(wanted) => versions
            .into_iter()
            .find(|v| v == wanted)
            .ok_or_else(|| Error::FabricLoaderVersionNotFound {
                family: family.name().to_string(),
                loader_version: wanted.to_string(),
            }),
    }
}

/// Fetches the loader's synthesized profile JSON, rewrites its id, and
/// writes it to `versions/<prefix>-<mc>-<loader>/…`. Delegation to the
/// base installer happens by the caller simply resolving
/// `synthesized_id` through the normal metadata resolver afterwards.
pub async fn install(
    family: FabricFamily,
    client: &reqwest::Client,
    dirs: &GameDirs,
    mc_version: &str,
    loader_version: &str,
    events: Option<&UnboundedSender<Event>>,
) -> Result<String> {
    let url = format!(
        "{}/versions/loader/{}/{}/profile/json",
        family.meta_url(),
        urlencode(mc_version),
        urlencode(loader_version),
    );
    if let Some(tx) = events {
        let _ = tx.send(Event::FetchVersion {
            family: family.name().to_string(),
            url: url.clone(),
        });
    }

    let mut descriptor: VersionJson = client.get(&url).send().await?.json().await?;

    let synthesized_id = format!("{}-{}-{}", family.prefix(), mc_version, loader_version);
    descriptor.id = synthesized_id.clone();
    descriptor.inherits_from = Some(mc_version.to_string());

    let path = dirs.version_json(&synthesized_id);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(&descriptor)?;
    let tmp = path.with_extension("json.part");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, &path).await?;

    Ok(synthesized_id)
}

/// The loader artifact's version, if present in an already-flattened
/// descriptor's libraries (teacher: `find_in_version`).
pub fn find_in_descriptor(family: FabricFamily, descriptor: &VersionJson) -> Option<String> {
    descriptor
        .libraries
        .iter()
        .find(|lib| lib.name.artifact == family.loader_artifact_name())
        .map(|lib| lib.name.version.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_cover_all_four_families() {
        assert_eq!(FabricFamily::Fabric.prefix(), "fabric");
        assert_eq!(FabricFamily::Quilt.prefix(), "quilt");
        assert_eq!(FabricFamily::LegacyFabric.prefix(), "legacyfabric");
        assert_eq!(FabricFamily::Babric.prefix(), "babric");
    }

    #[test]
    fn synthesized_id_matches_seed_scenario() {
        let id = format!(
            "{}-{}-{}",
            FabricFamily::Fabric.prefix(),
            "1.20.1",
            "0.14.21"
        );
        assert_eq!(id, "fabric-1.20.1-0.14.21");
    }
}
