//! `GameDirs`: the stable filesystem layout (spec §3 "Context", §6
//! "Filesystem layout"). Computes paths only; performs no I/O itself.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::maven::MavenCoordinate;
use crate::path::JoinPath;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GameDirs {
    /// The launcher's main directory (`<main>` in spec §6).
    pub main: PathBuf,
    /// The game's working directory (`<work>` in spec §6), may differ
    /// from `main` per version.
    pub work: PathBuf,
}

impl Default for GameDirs {
    fn default() -> Self {
        let main = dirs_home().join(".portablemc");
        Self {
            main: main.clone(),
            work: main,
        }
    }
}

impl GameDirs {
    pub fn new(main: PathBuf, work: PathBuf) -> Self {
        Self { main, work }
    }

    fn main(&self) -> JoinPath {
        JoinPath(self.main.clone())
    }

    pub fn versions(&self) -> PathBuf {
        (&self.main() / "versions").0
    }

    pub fn version_dir(&self, id: &str) -> PathBuf {
        (&JoinPath(self.versions()) / id).0
    }

    pub fn version_json(&self, id: &str) -> PathBuf {
        (&JoinPath(self.version_dir(id)) / format!("{id}.json").as_str()).0
    }

    pub fn version_jar(&self, id: &str) -> PathBuf {
        (&JoinPath(self.version_dir(id)) / format!("{id}.jar").as_str()).0
    }

    pub fn libraries(&self) -> PathBuf {
        (&self.main() / "libraries").0
    }

    pub fn library_path(&self, coordinate: &MavenCoordinate) -> PathBuf {
        (&JoinPath(self.libraries()) / coordinate.to_path().as_str()).0
    }

    pub fn assets(&self) -> PathBuf {
        (&self.main() / "assets").0
    }

    pub fn asset_index_json(&self, id: &str) -> PathBuf {
        (&JoinPath(self.assets()) / "indexes").0.join(format!("{id}.json"))
    }

    pub fn asset_object(&self, hash: &str) -> PathBuf {
        JoinPath(self.assets())
            .0
            .join("objects")
            .join(&hash[0..2])
            .join(hash)
    }

    pub fn asset_virtual_dir(&self, id: &str) -> PathBuf {
        JoinPath(self.assets()).0.join("virtual").join(id)
    }

    pub fn jvm(&self) -> PathBuf {
        (&self.main() / "jvm").0
    }

    pub fn jvm_component_dir(&self, component: &str) -> PathBuf {
        JoinPath(self.jvm()).0.join(component)
    }

    pub fn bin(&self) -> PathBuf {
        (&self.main() / "bin").0
    }

    pub fn run_bin_dir(&self, run_id: &str) -> PathBuf {
        JoinPath(self.bin()).0.join(run_id)
    }

    pub fn work_resources(&self) -> PathBuf {
        self.work.join("resources")
    }

    pub fn auth_db(&self) -> PathBuf {
        self.work.join("portablemc_auth.json")
    }
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_spec() {
        let dirs = GameDirs::new(PathBuf::from("/main"), PathBuf::from("/work"));
        assert_eq!(dirs.version_json("1.20.1"), PathBuf::from("/main/versions/1.20.1/1.20.1.json"));
        assert_eq!(dirs.version_jar("1.20.1"), PathBuf::from("/main/versions/1.20.1/1.20.1.jar"));
        assert_eq!(
            dirs.asset_object("aabbccddeeff00112233"),
            PathBuf::from("/main/assets/objects/aa/aabbccddeeff00112233")
        );
        assert_eq!(dirs.auth_db(), PathBuf::from("/work/portablemc_auth.json"));
    }

    #[test]
    fn library_path_uses_maven_layout() {
        let dirs = GameDirs::new(PathBuf::from("/main"), PathBuf::from("/work"));
        let coord = MavenCoordinate::parse("com.mojang:authlib:2.1.28").unwrap();
        assert_eq!(
            dirs.library_path(&coord),
            PathBuf::from("/main/libraries/com/mojang/authlib/2.1.28/authlib-2.1.28.jar")
        );
    }
}
