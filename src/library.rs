//! The library/native resolver (spec §4.3): schedules library and native
//! classifier fetches, builds the classpath, and extracts natives into a
//! per-run bin directory.
//!
//! Grounded on the teacher's `minecraft/install.rs::install_libraries`
//! (match over library shapes, building `(Resource, BetterPath)` pairs)
//! and `minecraft/launch.rs::{unzip_natives, gen_classpath}`; generalized
//! to support the `exclude_lib`/`include_bin` filters the teacher lacks.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::dirs::GameDirs;
use crate::error::{Error, Result};
use crate::fetch::FetchEntry;
use crate::maven::MavenCoordinate;
use crate::platform::CURRENT_ARCH;
use crate::rules::{evaluate_optional, FeatureSet, PlatformFacts};
use crate::version::schema::Library;

pub struct NativeLibrary {
    pub jar_path: PathBuf,
    pub exclude: Vec<String>,
}

pub struct ResolvedLibraries {
    pub fetch: Vec<FetchEntry>,
    pub classpath: Vec<PathBuf>,
    pub natives: Vec<NativeLibrary>,
}

/// Parses an `exclude_lib` filter of the form
/// `group:artifact[:[version][:classifierPrefix]]`.
struct ExcludeFilter {
    group: String,
    artifact: Option<String>,
    version: Option<String>,
    classifier_prefix: Option<String>,
}

impl ExcludeFilter {
    fn parse(pattern: &str) -> Self {
        let mut parts = pattern.split(':');
        let group = parts.next().unwrap_or_default().to_string();
        let artifact = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        let version = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        let classifier_prefix = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        Self {
            group,
            artifact,
            version,
            classifier_prefix,
        }
    }

    fn matches(&self, coord: &MavenCoordinate) -> bool {
        if self.group != coord.group {
            return false;
        }
        if let Some(artifact) = &self.artifact {
            if artifact != &coord.artifact {
                return false;
            }
        }
        if let Some(version) = &self.version {
            if version != &coord.version {
                return false;
            }
        }
        if let Some(prefix) = &self.classifier_prefix {
            match &coord.classifier {
                Some(classifier) if classifier.starts_with(prefix.as_str()) => {}
                _ => return false,
            }
        }
        true
    }
}

fn is_excluded(coord: &MavenCoordinate, patterns: &[String]) -> bool {
    patterns
        .iter()
        .map(|p| ExcludeFilter::parse(p))
        .any(|f| f.matches(coord))
}

/// Repository base used when a library carries no `downloads` block at all
/// (Fabric-family loader libs from `profile/json`, old-Forge `BaseOnly`
/// entries) and no explicit `url` of its own either.
const DEFAULT_LIBRARIES_REPO: &str = "https://libraries.minecraft.net/";

pub fn resolve(
    libraries: &[Library],
    dirs: &GameDirs,
    facts: &PlatformFacts,
    features: &FeatureSet,
    exclude_lib: &[String],
) -> Result<ResolvedLibraries> {
    let mut fetch = Vec::new();
    let mut classpath = Vec::new();
    let mut classpath_seen = HashSet::new();
    let mut natives = Vec::new();

    for lib in libraries {
        if !evaluate_optional(&lib.rules, facts, features) {
            continue;
        }
        if is_excluded(&lib.name, exclude_lib) {
            continue;
        }

        let Some(downloads) = &lib.downloads else {
            // Spec §4.3 step 2: no `downloads` block means deriving the
            // artifact from `name` + a repository base (the library's own
            // `url`, falling back to the Mojang libraries mirror). This is
            // the shape Fabric-family loader libraries and old-Forge
            // `BaseOnly` entries arrive in.
            let rel_path = lib.name.to_path();
            let dest = dirs.libraries().join(&rel_path);
            let key = lib.name.dedup_key();
            if classpath_seen.insert(key) {
                classpath.push(dest.clone());
            }
            let base = lib.url.as_deref().unwrap_or(DEFAULT_LIBRARIES_REPO);
            let base = if base.ends_with('/') {
                base.to_string()
            } else {
                format!("{base}/")
            };
            fetch.push(FetchEntry {
                url: format!("{base}{rel_path}"),
                dest,
                size: None,
                sha1: None,
                executable: false,
            });
            continue;
        };

        if let Some(artifact) = &downloads.artifact {
            let rel_path = artifact
                .path
                .clone()
                .unwrap_or_else(|| lib.name.to_path());
            let dest = dirs.libraries().join(&rel_path);
            let key = lib.name.dedup_key();
            if classpath_seen.insert(key) {
                classpath.push(dest.clone());
            }
            fetch.push(FetchEntry {
                url: artifact.url.clone(),
                dest,
                size: Some(artifact.size),
                sha1: Some(artifact.sha1.clone()),
                executable: false,
            });
        }

        if let Some(template) = lib.natives.get(&facts.os) {
            let classifier = template.replace("${arch}", CURRENT_ARCH);
            if let Some(native_artifact) = downloads.classifiers.get(&classifier) {
                let mut native_coord = lib.name.clone();
                native_coord.classifier = Some(classifier);
                let dest = dirs.libraries().join(native_coord.to_path());
                fetch.push(FetchEntry {
                    url: native_artifact.url.clone(),
                    dest: dest.clone(),
                    size: Some(native_artifact.size),
                    sha1: Some(native_artifact.sha1.clone()),
                    executable: false,
                });
                let exclude = lib
                    .extract
                    .as_ref()
                    .map(|e| e.exclude.clone())
                    .unwrap_or_default();
                natives.push(NativeLibrary {
                    jar_path: dest,
                    exclude,
                });
            } else {
                return Err(Error::LibraryNotFound {
                    coordinate: format!("{}:{classifier}", lib.name),
                });
            }
        }
    }

    Ok(ResolvedLibraries {
        fetch,
        classpath,
        natives,
    })
}

static GLOB_CACHE: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn glob_matches(pattern: &str, path: &str) -> bool {
    let mut cache = GLOB_CACHE.lock().unwrap();
    let re = cache.entry(pattern.to_string()).or_insert_with(|| {
        let mut regex_str = String::from("^");
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    if chars.peek() == Some(&'*') {
                        chars.next();
                        regex_str.push_str(".*");
                    } else {
                        regex_str.push_str("[^/]*");
                    }
                }
                c if "\\.+()|[]{}^$?".contains(c) => {
                    regex_str.push('\\');
                    regex_str.push(c);
                }
                c => regex_str.push(c),
            }
        }
        regex_str.push('$');
        Regex::new(&regex_str).unwrap_or_else(|_| Regex::new("$^").unwrap())
    });
    re.is_match(path)
}

/// Extract a native classifier JAR's shared libraries into the run bin
/// directory, honoring `extract.exclude` glob filters. Blocking: callers
/// should run this through `spawn_blocking`.
pub fn extract_native_jar(jar_path: &Path, bin_dir: &Path, exclude: &[String]) -> Result<()> {
    std::fs::create_dir_all(bin_dir)?;
    let file = std::fs::File::open(jar_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if name.ends_with('/') {
            continue;
        }
        if exclude.iter().any(|pattern| glob_matches(pattern, &name)) {
            continue;
        }
        let file_name = Path::new(&name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or(name.clone());
        let dest = bin_dir.join(file_name);
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        std::fs::write(&dest, &buf)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_filter_matches_group_artifact() {
        let filter = ExcludeFilter::parse("org.lwjgl:lwjgl");
        let coord = MavenCoordinate::parse("org.lwjgl:lwjgl:3.3.1").unwrap();
        assert!(filter.matches(&coord));
        let other = MavenCoordinate::parse("org.lwjgl:lwjgl-glfw:3.3.1").unwrap();
        assert!(!filter.matches(&other));
    }

    #[test]
    fn exclude_filter_group_only_matches_everything_in_group() {
        let filter = ExcludeFilter::parse("org.lwjgl");
        let coord = MavenCoordinate::parse("org.lwjgl:lwjgl-opengl:3.3.1").unwrap();
        assert!(filter.matches(&coord));
    }

    #[test]
    fn glob_matches_double_star() {
        assert!(glob_matches("META-INF/**", "META-INF/MANIFEST.MF"));
        assert!(!glob_matches("META-INF/**", "lib/MANIFEST.MF"));
    }

    #[test]
    fn glob_matches_single_star_one_segment() {
        assert!(glob_matches("*.txt", "readme.txt"));
        assert!(!glob_matches("*.txt", "a/readme.txt"));
    }

    #[test]
    fn resolve_derives_url_for_library_with_no_downloads_block() {
        let dirs = GameDirs::new(PathBuf::from("/main"), PathBuf::from("/work"));
        let facts = PlatformFacts {
            os: crate::platform::Os::Linux,
            os_version: String::new(),
            arch: "x86_64".to_string(),
        };
        let features = FeatureSet::new();

        let fabric_lib = Library {
            name: MavenCoordinate::parse("net.fabricmc:fabric-loader:0.16.0").unwrap(),
            rules: None,
            downloads: None,
            url: Some("https://maven.fabricmc.net/".to_string()),
            natives: HashMap::new(),
            extract: None,
        };
        let base_only_lib = Library {
            name: MavenCoordinate::parse("com.mojang:patchy:1.1").unwrap(),
            rules: None,
            downloads: None,
            url: None,
            natives: HashMap::new(),
            extract: None,
        };

        let resolved = resolve(
            &[fabric_lib.clone(), base_only_lib],
            &dirs,
            &facts,
            &features,
            &[],
        )
        .unwrap();

        assert_eq!(resolved.fetch.len(), 2);
        assert_eq!(resolved.classpath.len(), 2);
        assert_eq!(
            resolved.fetch[0].url,
            format!("https://maven.fabricmc.net/{}", fabric_lib.name.to_path())
        );
        assert!(resolved.fetch[1].url.starts_with(DEFAULT_LIBRARIES_REPO));
        assert!(resolved.fetch.iter().all(|e| e.sha1.is_none()));
    }
}
