//! JVM provisioning (spec §4.5): picks a runtime per `JvmPolicy`, probing
//! a system JVM or fetching Mojang's own distribution manifest.
//!
//! The teacher has no equivalent (it assumes a system JVM is always
//! present). This module's wire types are grounded on
//! `other_examples/77be23d9_sergious234-uranium-rs...mine_data_structs-src-minecraft.rs.rs`'s
//! `Runtimes`/`RuntimeFile`/`Manifest` shapes, extended with the `target`
//! field spec §3 requires for symlinks (missing from that source struct).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::JvmPolicy;
use crate::dirs::GameDirs;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::fetch::{FetchEngine, FetchEntry};
use crate::platform::{CURRENT_ARCH, CURRENT_BITS, CURRENT_OS};

const ALL_PLATFORMS_MANIFEST_URL: &str =
    "https://launchermeta.mojang.com/v1/products/java-runtime/2ec0cc96c44e5a76b9c8b7c39df7210883d12871/all.json";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ManifestRef {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JvmComponentAvailability {
    pub manifest: ManifestRef,
    pub version: JvmVersionInfo,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JvmVersionInfo {
    pub name: String,
    pub released: String,
}

/// `all.json`: platform key -> component name -> availability entries.
pub type AllPlatformsManifest = HashMap<String, HashMap<String, Vec<JvmComponentAvailability>>>;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JvmFileDownloads {
    pub raw: ManifestRef,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JvmFileEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub executable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<JvmFileDownloads>,
    /// UTF-8 link target; present when `kind == "link"`, resolved to a
    /// symlink at extraction (spec §3 "JVM distribution manifest").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JvmComponentManifest {
    pub files: HashMap<String, JvmFileEntry>,
}

/// Maps `(CURRENT_OS, CURRENT_ARCH, CURRENT_BITS)` to the platform key
/// Mojang's `all.json` uses.
fn platform_key() -> &'static str {
    match (CURRENT_OS, CURRENT_ARCH, CURRENT_BITS) {
        (crate::platform::Os::Linux, "x86_64", _) => "linux",
        (crate::platform::Os::Linux, _, "32") => "linux-i386",
        (crate::platform::Os::Osx, "arm64", _) => "mac-os-arm64",
        (crate::platform::Os::Osx, _, _) => "mac-os",
        (crate::platform::Os::Windows, "arm64", _) => "windows-arm64",
        (crate::platform::Os::Windows, _, "32") => "windows-x86",
        (crate::platform::Os::Windows, _, _) => "windows-x64",
    }
}

pub struct ResolvedJvm {
    pub executable: PathBuf,
    pub compatible: bool,
}

pub async fn resolve(
    policy: &JvmPolicy,
    component: &str,
    major: u32,
    dirs: &GameDirs,
    client: &reqwest::Client,
    fetch_engine: &FetchEngine,
    events: Option<&tokio::sync::mpsc::UnboundedSender<Event>>,
) -> Result<ResolvedJvm> {
    emit(events, Event::JvmLoadStart { major });
    let result = resolve_inner(policy, component, major, dirs, client, fetch_engine, events).await;
    if let Ok(resolved) = &result {
        emit(
            events,
            Event::JvmLoadEnd {
                compatible: resolved.compatible,
            },
        );
    }
    result
}

async fn resolve_inner(
    policy: &JvmPolicy,
    component: &str,
    major: u32,
    dirs: &GameDirs,
    client: &reqwest::Client,
    fetch_engine: &FetchEngine,
    events: Option<&tokio::sync::mpsc::UnboundedSender<Event>>,
) -> Result<ResolvedJvm> {
    match policy {
        JvmPolicy::Static(path) => {
            let compatible = probe(path, major).await.unwrap_or(false);
            Ok(ResolvedJvm {
                executable: path.clone(),
                compatible,
            })
        }
        JvmPolicy::System => find_system(major)
            .await
            .ok_or(Error::JvmNotFound { major }),
        JvmPolicy::Mojang => {
            provision_mojang(component, major, dirs, client, fetch_engine, events).await
        }
        JvmPolicy::SystemThenMojang => {
            match find_system(major).await {
                Some(resolved) => Ok(resolved),
                None => provision_mojang(component, major, dirs, client, fetch_engine, events).await,
            }
        }
        JvmPolicy::MojangThenSystem => {
            match provision_mojang(component, major, dirs, client, fetch_engine, events).await {
                Ok(resolved) => Ok(resolved),
                Err(_) => find_system(major).await.ok_or(Error::JvmNotFound { major }),
            }
        }
    }
}

fn emit(events: Option<&tokio::sync::mpsc::UnboundedSender<Event>>, event: Event) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

async fn probe(java_path: &Path, required_major: u32) -> Option<bool> {
    let output = tokio::process::Command::new(java_path)
        .arg("-version")
        .output()
        .await
        .ok()?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    Some(parse_major_version(&stderr) == Some(required_major))
}

fn parse_major_version(version_output: &str) -> Option<u32> {
    let quoted = version_output.split('"').nth(1)?;
    let first_segment = quoted.split('.').next()?;
    let major: u32 = first_segment.parse().ok()?;
    if major == 1 {
        // Old scheme: "1.8.0_392" means major version 8.
        quoted.split('.').nth(1)?.parse().ok()
    } else {
        Some(major)
    }
}

async fn find_system(required_major: u32) -> Option<ResolvedJvm> {
    let exe_name = if cfg!(windows) { "java.exe" } else { "java" };
    let mut candidates = Vec::new();
    if let Some(path_var) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_var) {
            candidates.push(dir.join(exe_name));
        }
    }
    if let Ok(java_home) = std::env::var("JAVA_HOME") {
        candidates.push(PathBuf::from(java_home).join("bin").join(exe_name));
    }

    for candidate in candidates {
        if !candidate.is_file() {
            continue;
        }
        if let Some(compatible) = probe(&candidate, required_major).await {
            if compatible {
                return Some(ResolvedJvm {
                    executable: candidate,
                    compatible: true,
                });
            }
        }
    }
    None
}

async fn provision_mojang(
    component: &str,
    major: u32,
    dirs: &GameDirs,
    client: &reqwest::Client,
    fetch_engine: &FetchEngine,
    events: Option<&tokio::sync::mpsc::UnboundedSender<Event>>,
) -> Result<ResolvedJvm> {
    let all_platforms: AllPlatformsManifest = client
        .get(ALL_PLATFORMS_MANIFEST_URL)
        .send()
        .await?
        .json()
        .await?;

    let platform = platform_key();
    let availability = all_platforms
        .get(platform)
        .and_then(|components| components.get(component))
        .and_then(|entries| entries.first());

    let Some(availability) = availability else {
        emit(
            events,
            Event::JvmLoadEnd { compatible: false },
        );
        return Err(Error::JvmNotFound { major });
    };

    let component_manifest: JvmComponentManifest = client
        .get(&availability.manifest.url)
        .send()
        .await?
        .json()
        .await?;

    let component_dir = dirs.jvm_component_dir(component);
    let mut fetch_batch = Vec::new();
    let mut links = Vec::new();

    for (rel_path, entry) in &component_manifest.files {
        let dest = component_dir.join(rel_path);
        match entry.kind.as_str() {
            "file" => {
                if let Some(downloads) = &entry.downloads {
                    fetch_batch.push(FetchEntry {
                        url: downloads.raw.url.clone(),
                        dest,
                        size: Some(downloads.raw.size),
                        sha1: Some(downloads.raw.sha1.clone()),
                        executable: entry.executable,
                    });
                }
            }
            "directory" => {
                tokio::fs::create_dir_all(&dest).await?;
            }
            "link" => {
                if let Some(target) = &entry.target {
                    links.push((dest, target.clone()));
                }
            }
            _ => {}
        }
    }

    fetch_engine.run(fetch_batch, None).await?;

    for (link_path, target) in links {
        if let Some(parent) = link_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        create_symlink(&target, &link_path).await?;
    }

    let java_exe = if cfg!(windows) { "java.exe" } else { "java" };
    let bin_subdir = if cfg!(target_os = "macos") {
        component_dir.join(format!("{component}.jre")).join("Contents/Home/bin")
    } else {
        component_dir.join("bin")
    };

    Ok(ResolvedJvm {
        executable: bin_subdir.join(java_exe),
        compatible: true,
    })
}

#[cfg(unix)]
async fn create_symlink(target: &str, link: &Path) -> Result<()> {
    let target = target.to_string();
    let link = link.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let _ = std::fs::remove_file(&link);
        std::os::unix::fs::symlink(target, link)
    })
    .await
    .map_err(|e| Error::Other(anyhow::anyhow!(e)))??;
    Ok(())
}

#[cfg(windows)]
async fn create_symlink(target: &str, link: &Path) -> Result<()> {
    // Symlinks require elevated privileges on Windows in the common case;
    // fall back to a plain copy of the resolved target file.
    let resolved = link
        .parent()
        .map(|p| p.join(target))
        .unwrap_or_else(|| PathBuf::from(target));
    if resolved.exists() {
        tokio::fs::copy(&resolved, link).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modern_version_string() {
        let output = "openjdk version \"17.0.9\" 2023-10-17\n";
        assert_eq!(parse_major_version(output), Some(17));
    }

    #[test]
    fn parses_legacy_1_x_version_string() {
        let output = "java version \"1.8.0_392\"\n";
        assert_eq!(parse_major_version(output), Some(8));
    }
}
