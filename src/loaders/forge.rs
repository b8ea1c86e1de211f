//! The Forge-family installer (spec §4.9): Forge and NeoForge share the
//! same installer-jar + `install_profile.json` + processor-pipeline shape,
//! differing only in maven layout and version-matching rules.
//!
//! Grounded on the teacher's `components/install/forgelike.rs` (the
//! `ForgeLikeInstaller` trait, `Processor`/`InstallerProfile` types, and
//! the processor runner) and its two concrete impls `forge.rs`/
//! `neoforge.rs` (maven group URLs, archive base names, version matching).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tokio::sync::mpsc::UnboundedSender;
use xmltree::Element;

use crate::dirs::GameDirs;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::maven::MavenCoordinate;
use crate::version::schema::{Argument, VersionJson};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgeFamily {
    Forge,
    NeoForge,
}

impl ForgeFamily {
    fn name(&self) -> &'static str {
        match self {
            ForgeFamily::Forge => "forge",
            ForgeFamily::NeoForge => "neoforge",
        }
    }

    fn maven_group_url(&self) -> &'static str {
        match self {
            ForgeFamily::Forge => "https://maven.minecraftforge.net/net/minecraftforge",
            ForgeFamily::NeoForge => "https://maven.neoforged.net/releases/net/neoforged",
        }
    }

    fn archive_base_name(&self, mc_version: &str) -> &'static str {
        match self {
            ForgeFamily::Forge => "forge",
            ForgeFamily::NeoForge if mc_version == "1.20.1" => "forge",
            ForgeFamily::NeoForge => "neoforge",
        }
    }

    fn supports_older_version(&self) -> bool {
        matches!(self, ForgeFamily::Forge)
    }

    /// Whether a loader version string belongs to `mc_version`.
    fn match_version(&self, loader: &str, mc_version: &str) -> bool {
        match self {
            ForgeFamily::Forge => loader.starts_with(&format!("{mc_version}-")),
            ForgeFamily::NeoForge => {
                if mc_version == "1.20.1" {
                    loader.starts_with("1.20.1-")
                } else if mc_version.contains('-') || mc_version.contains('w') {
                    false
                } else {
                    mc_version
                        .strip_prefix("1.")
                        .map(|stripped| loader.starts_with(stripped))
                        .unwrap_or(false)
                }
            }
        }
    }

    /// The loader artifact's version if present in an already-flattened
    /// descriptor (teacher: `find_in_version`).
    pub fn find_in_descriptor(&self, mc_version: &str, descriptor: &VersionJson) -> Option<String> {
        let _ = mc_version;
        match self {
            ForgeFamily::Forge => {
                for lib in &descriptor.libraries {
                    if lib.name.artifact == "fmlloader" || lib.name.artifact == "forge" {
                        if let Some((_, version)) = lib.name.version.split_once('-') {
                            return Some(version.to_string());
                        }
                        return Some(lib.name.version.clone());
                    }
                }
                find_fml_arg(descriptor, "--fml.forgeVersion")
            }
            ForgeFamily::NeoForge => find_fml_arg(descriptor, "--fml.neoForgeVersion"),
        }
    }
}

fn find_fml_arg(descriptor: &VersionJson, flag: &str) -> Option<String> {
    let game_args = descriptor.arguments.as_ref()?.game.as_ref()?;
    let mut iter = game_args.iter();
    while let Some(arg) = iter.next() {
        if let Argument::Plain(s) = arg {
            if s == flag {
                if let Some(Argument::Plain(value)) = iter.next() {
                    return Some(value.clone());
                }
            }
        }
    }
    None
}

/// Lists maven-metadata.xml version entries that match `mc_version`.
pub async fn list_versions(
    family: ForgeFamily,
    client: &reqwest::Client,
    mc_version: &str,
) -> Result<Vec<String>> {
    let url = format!(
        "{}/{}/maven-metadata.xml",
        family.maven_group_url(),
        family.archive_base_name(mc_version)
    );
    let body = client.get(&url).send().await?.text().await?;
    let root = Element::parse(body.as_bytes())?;
    let versioning = root
        .get_child("versioning")
        .ok_or_else(|| Error::ForgeMavenMetadataMalformed {
            family: family.name().to_string(),
        })?;
    let versions = versioning
        .get_child("versions")
        .ok_or_else(|| Error::ForgeMavenMetadataMalformed {
            family: family.name().to_string(),
        })?;

    Ok(versions
        .children
        .iter()
        .filter_map(|n| n.as_element())
        .filter(|e| e.name == "version")
        .filter_map(|e| e.get_text().map(|t| t.to_string()))
        .filter(|v| family.match_version(v, mc_version))
        .collect())
}

pub async fn resolve_version(
    family: ForgeFamily,
    client: &reqwest::Client,
    mc_version: &str,
    requested: Option<&str>,
) -> Result<String> {
    let versions = list_versions(family, client, mc_version).await?;
    match requested {
        Some(wanted) if wanted != "latest" => {
            if versions.iter().any(|v| v == wanted) {
                Ok(wanted.to_string())
            } else {
                Err(Error::ForgeInstallerNotFound {
                    family: family.name().to_string(),
                    version: wanted.to_string(),
                })
            }
        }
        _ => versions
            .last()
            .cloned()
            .ok_or_else(|| Error::ForgeLatestVersionNotFound {
                family: family.name().to_string(),
                game_version: mc_version.to_string(),
            }),
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Side {
    Client,
    Server,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct DataEntry {
    client: String,
    #[allow(dead_code)]
    server: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct Processor {
    #[serde(default)]
    sides: Vec<Side>,
    jar: MavenCoordinate,
    #[serde(default)]
    classpath: Vec<MavenCoordinate>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    outputs: HashMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct InstallerProfileNew {
    data: HashMap<String, DataEntry>,
    processors: Vec<Processor>,
    libraries: Vec<crate::version::schema::Library>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct InstallerInformation {
    file_path: String,
    path: MavenCoordinate,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct InstallerProfileOld {
    version_info: VersionJson,
    install: InstallerInformation,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
enum InstallerProfile {
    New(InstallerProfileNew),
    Old(InstallerProfileOld),
}

/// Downloads the installer jar, extracts its install profile, synthesizes
/// (or directly adopts, for the legacy shape) a version descriptor, and
/// runs any processor pipeline. Returns the installed version's id.
///
/// `minecraft_jar` must already exist on disk: the processor pipeline
/// patches against the vanilla client jar, so the caller is responsible
/// for having fetched it (under the plain `mc_version` id) before calling
/// this function.
pub async fn install(
    family: ForgeFamily,
    client: &reqwest::Client,
    dirs: &GameDirs,
    mc_version: &str,
    loader_version: &str,
    minecraft_jar: &Path,
    events: Option<&UnboundedSender<Event>>,
) -> Result<String> {
    if let Some(tx) = events {
        let _ = tx.send(Event::FetchInstaller {
            family: family.name().to_string(),
            version: loader_version.to_string(),
        });
    }

    let base_name = family.archive_base_name(mc_version);
    let installer_url = format!(
        "{}/{}/{}/{}-{}-installer.jar",
        family.maven_group_url(),
        base_name,
        loader_version,
        base_name,
        loader_version,
    );

    let installer_bytes = client.get(&installer_url).send().await?.bytes().await?;
    let extract_dir = tempfile::tempdir()?;
    {
        let cursor = std::io::Cursor::new(&installer_bytes[..]);
        let mut archive = zip::ZipArchive::new(cursor)?;
        archive.extract(extract_dir.path())?;
    }

    let profile_path = extract_dir.path().join("install_profile.json");
    let profile_bytes = std::fs::read(&profile_path).map_err(|_| Error::ForgeInstallProfileNotFound {
        family: family.name().to_string(),
    })?;
    let profile: InstallerProfile = serde_json::from_slice(&profile_bytes)?;

    let synthesized_id = format!("{}-{}-{}", family.name(), mc_version, loader_version);

    match profile {
        InstallerProfile::Old(old) => {
            if !family.supports_older_version() {
                return Err(Error::ForgeInstallProfileIncoherent {
                    reason: format!("{} does not support the legacy install profile shape", family.name()),
                });
            }
            let mut descriptor = old.version_info;
            descriptor.id = synthesized_id.clone();
            descriptor.inherits_from = Some(mc_version.to_string());
            write_descriptor(dirs, &descriptor).await?;

            let src = extract_dir.path().join(&old.install.file_path);
            let dest = dirs.library_path(&old.install.path);
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(&src, &dest).await.map_err(|_| {
                Error::ForgeInstallerFileNotFound {
                    entry: old.install.file_path.clone(),
                }
            })?;
        }
        InstallerProfile::New(new) => {
            let source_json_path = extract_dir.path().join("version.json");
            let mut descriptor: VersionJson = serde_json::from_slice(
                &std::fs::read(&source_json_path).map_err(|_| Error::ForgeInstallProfileIncoherent {
                    reason: "install profile is missing its embedded version.json".to_string(),
                })?,
            )?;
            descriptor.id = synthesized_id.clone();
            descriptor.inherits_from = Some(mc_version.to_string());
            descriptor.libraries.extend(new.libraries.clone());
            write_descriptor(dirs, &descriptor).await?;

            let maven_src = extract_dir.path().join("maven");
            if maven_src.is_dir() {
                fs_extra::dir::copy(
                    &maven_src,
                    dirs.libraries(),
                    &fs_extra::dir::CopyOptions::new().content_only(true),
                )
                .map_err(|e| Error::Other(anyhow::anyhow!(e)))?;
            }

            run_processors(
                &new, extract_dir.path(), dirs, mc_version, minecraft_jar, events,
            )
            .await?;
        }
    }

    if let Some(tx) = events {
        let _ = tx.send(Event::Installed {
            id: synthesized_id.clone(),
        });
    }

    Ok(synthesized_id)
}

async fn write_descriptor(dirs: &GameDirs, descriptor: &VersionJson) -> Result<()> {
    let path = dirs.version_json(&descriptor.id);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(descriptor)?;
    let tmp = path.with_extension("json.part");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
}

async fn run_processors(
    profile: &InstallerProfileNew,
    installer_dir: &Path,
    dirs: &GameDirs,
    mc_version: &str,
    minecraft_jar: &Path,
    events: Option<&UnboundedSender<Event>>,
) -> Result<()> {
    for processor in &profile.processors {
        if !processor.sides.is_empty() && !processor.sides.contains(&Side::Client) {
            continue;
        }
        if processor.args.iter().any(|a| a == "DOWNLOAD_MOJMAPS") {
            continue;
        }

        let name = processor.jar.artifact.clone();

        if outputs_already_correct(&processor.outputs, profile, installer_dir, mc_version, minecraft_jar, dirs)
            .await?
        {
            continue;
        }

        if let Some(tx) = events {
            let _ = tx.send(Event::RunInstallerProcessor {
                name: name.clone(),
                task: "run".to_string(),
            });
        }

        let jar_path = dirs.library_path(&processor.jar);
        let main_class = read_main_class(&jar_path)?;

        let mut classpath: Vec<PathBuf> = processor
            .classpath
            .iter()
            .map(|c| dirs.library_path(c))
            .collect();
        classpath.push(jar_path);

        let args: Vec<String> = processor
            .args
            .iter()
            .map(|a| transform_argument(a, profile, installer_dir, mc_version, minecraft_jar, dirs))
            .collect();

        let classpath_str = classpath
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join(crate::platform::CLASSPATH_SEPARATOR);

        let output = tokio::process::Command::new("java")
            .arg("-cp")
            .arg(&classpath_str)
            .arg(&main_class)
            .args(&args)
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::ForgeProcessorFailed {
                name,
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        for (file_key, expected_sha1_key) in &processor.outputs {
            let file = transform_argument(file_key, profile, installer_dir, mc_version, minecraft_jar, dirs);
            let expected_sha1 = expected_sha1_key.trim_matches('\'').to_string();
            let bytes = tokio::fs::read(&file).await?;
            let mut hasher = Sha1::new();
            hasher.update(&bytes);
            let digest = crate::fetch::to_hex(&hasher.finalize());
            if digest != expected_sha1 {
                return Err(Error::ForgeProcessorOutputCorrupted {
                    name,
                    file: PathBuf::from(file),
                    expected_sha1,
                });
            }
        }
    }
    Ok(())
}

async fn outputs_already_correct(
    outputs: &HashMap<String, String>,
    profile: &InstallerProfileNew,
    installer_dir: &Path,
    mc_version: &str,
    minecraft_jar: &Path,
    dirs: &GameDirs,
) -> Result<bool> {
    if outputs.is_empty() {
        return Ok(false);
    }
    for (file_key, expected_sha1_key) in outputs {
        let file = transform_argument(file_key, profile, installer_dir, mc_version, minecraft_jar, dirs);
        let expected_sha1 = expected_sha1_key.trim_matches('\'').to_string();
        let path = PathBuf::from(&file);
        let Ok(bytes) = tokio::fs::read(&path).await else {
            return Ok(false);
        };
        let mut hasher = Sha1::new();
        hasher.update(&bytes);
        let digest = crate::fetch::to_hex(&hasher.finalize());
        if digest != expected_sha1 {
            return Ok(false);
        }
    }
    Ok(true)
}

fn read_main_class(jar_path: &Path) -> Result<String> {
    let file = std::fs::File::open(jar_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut manifest = archive.by_name("META-INF/MANIFEST.MF")?;
    let mut contents = String::new();
    std::io::Read::read_to_string(&mut manifest, &mut contents)?;
    contents
        .lines()
        .find_map(|line| line.strip_prefix("Main-Class: "))
        .map(|s| s.trim().to_string())
        .ok_or_else(|| Error::ForgeInstallerFileNotFound {
            entry: "META-INF/MANIFEST.MF Main-Class".to_string(),
        })
}

/// Resolves `{SIDE}`, `{MINECRAFT_JAR}`, `{BINPATCH}`, `{dataKey}`, and
/// `[mavenId]` placeholders inside processor arguments.
fn transform_argument(
    arg: &str,
    profile: &InstallerProfileNew,
    installer_dir: &Path,
    mc_version: &str,
    minecraft_jar: &Path,
    dirs: &GameDirs,
) -> String {
    if arg.starts_with('[') && arg.ends_with(']') {
        let coord = MavenCoordinate::parse(&arg[1..arg.len() - 1]).unwrap_or_else(|_| MavenCoordinate {
            group: String::new(),
            artifact: String::new(),
            version: String::new(),
            classifier: None,
            extension: "jar".to_string(),
        });
        return dirs.library_path(&coord).to_string_lossy().to_string();
    }
    if let Some(key) = arg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        return match key {
            "SIDE" => "client".to_string(),
            "MINECRAFT_JAR" => minecraft_jar.to_string_lossy().to_string(),
            "BINPATCH" => installer_dir.join("data/client.lzma").to_string_lossy().to_string(),
            "MINECRAFT_VERSION" => mc_version.to_string(),
            _ => profile
                .data
                .get(key)
                .map(|entry| entry.client.clone())
                .unwrap_or_else(|| arg.to_string()),
        };
    }
    arg.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forge_match_version_requires_mc_prefix() {
        assert!(ForgeFamily::Forge.match_version("1.20.1-47.2.0", "1.20.1"));
        assert!(!ForgeFamily::Forge.match_version("1.19.2-43.2.0", "1.20.1"));
    }

    #[test]
    fn neoforge_1_20_1_uses_forge_archive_name() {
        assert_eq!(ForgeFamily::NeoForge.archive_base_name("1.20.1"), "forge");
        assert_eq!(ForgeFamily::NeoForge.archive_base_name("1.21"), "neoforge");
    }

    #[test]
    fn neoforge_match_version_strips_minecraft_major_prefix() {
        assert!(ForgeFamily::NeoForge.match_version("21.1.57", "1.21.1"));
        assert!(!ForgeFamily::NeoForge.match_version("21.1.57", "1.21-pre1"));
    }

    #[test]
    fn neoforge_rejects_snapshot_shaped_versions() {
        assert!(!ForgeFamily::NeoForge.match_version("21.1.57", "24w14a"));
    }
}
