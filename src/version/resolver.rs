//! The metadata resolver (spec §4.1): walks `inheritsFrom`, detects
//! cycles, and flattens a chain into one effective descriptor.
//!
//! Generalized from the teacher's `utils.rs::merge_version_json`, which
//! only merges exactly two descriptors; this handles an arbitrary-length
//! chain with cycle detection, matching spec §4.1's algorithm.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{Error, Result};
use crate::events::Event;
use crate::version::schema::{Arguments, VersionJson};

/// The external collaborator that can populate a missing descriptor file
/// (typically the Mojang layer, fetching `versions/<id>/<id>.json` from
/// the version manifest). Returning `Ok(false)` means "I couldn't, and
/// this isn't a hard error" — the resolver then fails with
/// `version_not_found`.
#[async_trait]
pub trait VersionProvider: Send + Sync {
    async fn ensure(&self, id: &str, dest: &Path) -> Result<bool>;
}

/// A provider that never populates anything; useful when the caller has
/// already pre-populated the versions directory.
pub struct NoopProvider;

#[async_trait]
impl VersionProvider for NoopProvider {
    async fn ensure(&self, _id: &str, _dest: &Path) -> Result<bool> {
        Ok(false)
    }
}

fn parse_descriptor(id: &str, bytes: &[u8]) -> Result<VersionJson> {
    let descriptor: VersionJson =
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedDescriptor {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
    if descriptor.id.is_empty() {
        return Err(Error::MalformedDescriptor {
            id: id.to_string(),
            reason: "missing id field".to_string(),
        });
    }
    Ok(descriptor)
}

/// Load the root-first inheritance chain for `root_id`, fetching missing
/// descriptors through `provider`.
pub async fn load_chain(
    root_id: &str,
    version_json_path: impl Fn(&str) -> std::path::PathBuf,
    provider: &dyn VersionProvider,
    max_depth: usize,
    events: Option<&UnboundedSender<Event>>,
) -> Result<Vec<VersionJson>> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut current = root_id.to_string();

    loop {
        if !visited.insert(current.clone()) {
            return Err(Error::HierarchyLoop { id: current });
        }
        if chain.len() >= max_depth {
            return Err(Error::HierarchyLoop { id: current });
        }

        let path = version_json_path(&current);
        if !path.exists() {
            if let Some(tx) = events {
                let _ = tx.send(Event::NeedVersion {
                    id: current.clone(),
                    file: path.clone(),
                    retry: false,
                });
            }
            let populated = provider.ensure(&current, &path).await?;
            if !populated || !path.exists() {
                return Err(Error::VersionNotFound { id: current });
            }
            if let Some(tx) = events {
                let _ = tx.send(Event::NeedVersion {
                    id: current.clone(),
                    file: path.clone(),
                    retry: true,
                });
            }
        }

        let bytes = tokio::fs::read(&path).await?;
        let descriptor = parse_descriptor(&current, &bytes)?;
        let parent = descriptor.inherits_from.clone();
        chain.push(descriptor);

        match parent {
            Some(parent_id) => current = parent_id,
            None => break,
        }
    }

    if let Some(tx) = events {
        let _ = tx.send(Event::HierarchyLoaded {
            root: root_id.to_string(),
            chain: chain.iter().map(|d| d.id.clone()).collect(),
        });
    }

    Ok(chain)
}

fn merge_args(parent: Option<Vec<crate::version::schema::Argument>>, child: Option<Vec<crate::version::schema::Argument>>) -> Option<Vec<crate::version::schema::Argument>> {
    match (parent, child) {
        (None, None) => None,
        (Some(p), None) => Some(p),
        (None, Some(c)) => Some(c),
        (Some(mut p), Some(c)) => {
            p.extend(c);
            Some(p)
        }
    }
}

fn dedup_keep_last(
    libs: Vec<crate::version::schema::Library>,
) -> Vec<crate::version::schema::Library> {
    let mut order: Vec<(String, String, Option<String>)> = Vec::new();
    let mut map: HashMap<(String, String, Option<String>), crate::version::schema::Library> =
        HashMap::new();
    for lib in libs {
        let key = lib.name.dedup_key();
        if !map.contains_key(&key) {
            order.push(key.clone());
        }
        map.insert(key, lib);
    }
    order.into_iter().map(|k| map.remove(&k).unwrap()).collect()
}

/// Flatten a root-first chain into one effective descriptor, per spec
/// §4.1 step 4: process ancestor-first so that later merges (more
/// specific descriptors) override scalar/Option fields and JVM component
/// references, while libraries and arguments concatenate parent-first.
pub fn flatten(chain: &[VersionJson]) -> Result<VersionJson> {
    let mut iter = chain.iter().rev();
    let topmost = iter
        .next()
        .ok_or_else(|| Error::MalformedDescriptor {
            id: "<empty>".to_string(),
            reason: "empty inheritance chain".to_string(),
        })?
        .clone();

    let mut acc = topmost;
    for child in iter {
        acc.id = child.id.clone();
        acc.inherits_from = child.inherits_from.clone();
        acc.kind = child.kind.clone();
        acc.compliance_level = child.compliance_level;
        if child.main_class.is_some() {
            acc.main_class = child.main_class.clone();
        }
        if child.asset_index.is_some() {
            acc.asset_index = child.asset_index.clone();
        }
        if child.assets.is_some() {
            acc.assets = child.assets.clone();
        }
        if child.downloads.client.is_some() {
            acc.downloads = child.downloads.clone();
        }
        if child.logging.client.is_some() {
            acc.logging = child.logging.clone();
        }
        if child.java_version.is_some() {
            acc.java_version = child.java_version.clone();
        }

        acc.libraries.extend(child.libraries.clone());

        match (&acc.arguments, &child.arguments) {
            (_, None) => {}
            (None, Some(child_args)) => acc.arguments = Some(child_args.clone()),
            (Some(_), Some(child_args)) => {
                let acc_args = acc.arguments.take().unwrap();
                acc.arguments = Some(Arguments {
                    jvm: merge_args(acc_args.jvm, child_args.jvm.clone()),
                    game: merge_args(acc_args.game, child_args.game.clone()),
                });
            }
        }

        if child.minecraft_arguments.is_some() {
            acc.minecraft_arguments = child.minecraft_arguments.clone();
        }
    }

    acc.libraries = dedup_keep_last(acc.libraries);
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::schema::{Library, VersionDownloads, VersionKind, VersionLogging};

    fn descriptor(id: &str, inherits: Option<&str>, libs: Vec<&str>) -> VersionJson {
        VersionJson {
            id: id.to_string(),
            inherits_from: inherits.map(str::to_string),
            kind: VersionKind::Release,
            main_class: None,
            asset_index: None,
            assets: None,
            downloads: VersionDownloads::default(),
            logging: VersionLogging::default(),
            java_version: None,
            libraries: libs
                .into_iter()
                .map(|coord| Library {
                    name: crate::maven::MavenCoordinate::parse(coord).unwrap(),
                    rules: None,
                    downloads: None,
                    url: None,
                    natives: Default::default(),
                    extract: None,
                })
                .collect(),
            arguments: None,
            minecraft_arguments: None,
            compliance_level: 0,
        }
    }

    #[test]
    fn flattening_concatenates_libraries_parent_first() {
        let chain = vec![
            descriptor("fabric-1.20.1", Some("1.20.1"), vec!["net.fabricmc:fabric-loader:0.14.21"]),
            descriptor("1.20.1", None, vec!["com.mojang:authlib:3.11.50"]),
        ];
        let flat = flatten(&chain).unwrap();
        assert_eq!(flat.id, "fabric-1.20.1");
        assert_eq!(flat.libraries.len(), 2);
        assert_eq!(flat.libraries[0].name.artifact, "authlib");
        assert_eq!(flat.libraries[1].name.artifact, "fabric-loader");
    }

    #[test]
    fn dedup_keeps_last_version_for_same_coordinate() {
        let chain = vec![
            descriptor("child", Some("parent"), vec!["com.mojang:authlib:2.2.30"]),
            descriptor("parent", None, vec!["com.mojang:authlib:2.1.28"]),
        ];
        let flat = flatten(&chain).unwrap();
        assert_eq!(flat.libraries.len(), 1);
        assert_eq!(flat.libraries[0].name.version, "2.2.30");
    }

    #[test]
    fn single_descriptor_chain_flattens_to_itself() {
        let chain = vec![descriptor("1.20.1", None, vec![])];
        let flat = flatten(&chain).unwrap();
        assert_eq!(flat.id, "1.20.1");
        assert!(flat.libraries.is_empty());
    }

    #[test]
    fn flattening_is_deterministic() {
        let chain = vec![
            descriptor("child", Some("parent"), vec!["a:b:1", "c:d:2"]),
            descriptor("parent", None, vec!["e:f:3"]),
        ];
        let first = flatten(&chain).unwrap();
        let second = flatten(&chain).unwrap();
        let first_ids: Vec<_> = first.libraries.iter().map(|l| l.name.to_string()).collect();
        let second_ids: Vec<_> = second.libraries.iter().map(|l| l.name.to_string()).collect();
        assert_eq!(first_ids, second_ids);
    }
}
