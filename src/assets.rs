//! The asset index processor (spec §4.4): expands an asset index into
//! content-addressed object fetches, plus legacy `virtual`/
//! `map_to_resources` mirroring.
//!
//! Grounded on the teacher's `minecraft/install.rs::install_resources`,
//! which only implements the modern hash-sharded layout; the legacy
//! mirroring is new, built directly from spec §4.4.

use crate::dirs::GameDirs;
use crate::fetch::FetchEntry;
use crate::version::schema::AssetsIndex;

const RESOURCES_CDN: &str = "https://resources.download.minecraft.net";

pub struct ResolvedAssets {
    pub fetch: Vec<FetchEntry>,
    /// Logical path -> object path, for mirroring after the fetch batch
    /// completes (virtual / map_to_resources layouts).
    pub mirrors: Vec<AssetMirror>,
}

pub struct AssetMirror {
    pub logical_path: String,
    pub object_path: std::path::PathBuf,
}

pub fn resolve(index: &AssetsIndex, asset_index_id: &str, dirs: &GameDirs) -> ResolvedAssets {
    let mut fetch = Vec::new();
    let mut mirrors = Vec::new();

    for (logical_path, object) in &index.objects {
        let shard = &object.hash[0..2];
        let dest = dirs.asset_object(&object.hash);
        fetch.push(FetchEntry {
            url: format!("{RESOURCES_CDN}/{shard}/{}", object.hash),
            dest: dest.clone(),
            size: Some(object.size),
            sha1: Some(object.hash.clone()),
            executable: false,
        });

        if index.virtual_ || index.map_to_resources {
            mirrors.push(AssetMirror {
                logical_path: logical_path.clone(),
                object_path: dest,
            });
        }
    }

    let _ = asset_index_id;
    ResolvedAssets { fetch, mirrors }
}

/// Mirror already-downloaded objects into the legacy layouts. Both
/// mirrors are populated when an index is marked both `virtual` and
/// `map_to_resources` (spec §8 boundary case: "virtual mirror wins at
/// runtime; resources mirror still populated for legacy tools" — both
/// copies are written here, it's the argument assembler that decides
/// which `assets_root` wins).
pub async fn mirror(
    index: &AssetsIndex,
    asset_index_id: &str,
    dirs: &GameDirs,
) -> crate::error::Result<()> {
    for (logical_path, object) in &index.objects {
        let object_path = dirs.asset_object(&object.hash);
        if index.virtual_ {
            let dest = dirs.asset_virtual_dir(asset_index_id).join(logical_path);
            copy_if_needed(&object_path, &dest).await?;
        }
        if index.map_to_resources {
            let dest = dirs.work_resources().join(logical_path);
            copy_if_needed(&object_path, &dest).await?;
        }
    }
    Ok(())
}

async fn copy_if_needed(src: &std::path::Path, dest: &std::path::Path) -> crate::error::Result<()> {
    if dest.exists() {
        return Ok(());
    }
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(src, dest).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn sample_index(virtual_: bool, map_to_resources: bool) -> AssetsIndex {
        let mut objects = HashMap::new();
        objects.insert(
            "icons/icon_16x16.png".to_string(),
            crate::version::schema::AssetObject {
                hash: "aabbccddeeff00112233445566778899aabbccdd".to_string(),
                size: 1234,
            },
        );
        AssetsIndex {
            virtual_,
            map_to_resources,
            objects,
        }
    }

    #[test]
    fn object_url_uses_sharded_layout() {
        let index = sample_index(false, false);
        let dirs = GameDirs::new(PathBuf::from("/main"), PathBuf::from("/work"));
        let resolved = resolve(&index, "legacy", &dirs);
        assert_eq!(resolved.fetch.len(), 1);
        let entry = &resolved.fetch[0];
        assert!(entry.url.starts_with(RESOURCES_CDN));
        assert!(entry.url.ends_with("aabbccddeeff00112233445566778899aabbccdd"));
        assert!(resolved.mirrors.is_empty());
    }

    #[test]
    fn virtual_and_map_to_resources_both_populate_mirrors() {
        let index = sample_index(true, true);
        let dirs = GameDirs::new(PathBuf::from("/main"), PathBuf::from("/work"));
        let resolved = resolve(&index, "legacy", &dirs);
        assert_eq!(resolved.mirrors.len(), 1);
    }
}
