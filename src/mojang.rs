//! The Mojang layer: the one external collaborator the base installer
//! always needs even for an un-modded install, since nothing else knows
//! how to turn `release`/`snapshot`/a bare id into an on-disk descriptor.
//!
//! Grounded on the teacher's `minecraft/install.rs`, which fetches
//! `version_manifest_v2.json` and a version's own `<id>.json` the same
//! way; generalized here into a `VersionProvider` impl so it can also
//! serve as the collaborator for a loader-synthesized descriptor's parent
//! link (spec §4.1/§4.9).

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::version::resolver::VersionProvider;
use crate::version::schema::VersionManifest;

const VERSION_MANIFEST_URL: &str = "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

pub struct MojangProvider {
    client: reqwest::Client,
    manifest: OnceCell<VersionManifest>,
}

impl MojangProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            manifest: OnceCell::new(),
        }
    }

    async fn manifest(&self) -> Result<&VersionManifest> {
        self.manifest
            .get_or_try_init(|| async {
                let manifest: VersionManifest = self
                    .client
                    .get(VERSION_MANIFEST_URL)
                    .send()
                    .await?
                    .json()
                    .await?;
                Ok(manifest)
            })
            .await
    }

    /// Resolves spec §6's `release`/`snapshot` aliases against the live
    /// manifest. Called before any loader metadata API lookup, which
    /// needs a concrete id like `1.20.1`, never an alias.
    pub async fn resolve_version_id(&self, id: &str) -> Result<String> {
        let manifest = self.manifest().await?;
        Ok(manifest.resolve_alias(id).to_string())
    }
}

#[async_trait]
impl VersionProvider for MojangProvider {
    async fn ensure(&self, id: &str, dest: &Path) -> Result<bool> {
        let manifest = self.manifest().await?;
        let resolved_id = manifest.resolve_alias(id).to_string();
        let Some(entry) = manifest.find(&resolved_id) else {
            return Ok(false);
        };

        let bytes = self.client.get(&entry.url).send().await?.bytes().await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = dest.with_extension("json.part");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, dest).await?;
        Ok(true)
    }
}
