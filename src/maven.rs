//! [Maven coordinates](https://maven.apache.org/pom.html#Maven_Coordinates),
//! used for library names and Forge/NeoForge loader version strings.

use std::fmt::Display;

use serde::{de::Visitor, Deserialize, Serialize};

/// `group:artifact:version[:classifier][@extension]`.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct MavenCoordinate {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

struct CoordStrVisitor;

impl<'de> Visitor<'de> for CoordStrVisitor {
    type Value = MavenCoordinate;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a maven coordinate string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        MavenCoordinate::parse(v).map_err(|e| serde::de::Error::custom(e))
    }
}

impl<'de> Deserialize<'de> for MavenCoordinate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(CoordStrVisitor)
    }
}

impl Serialize for MavenCoordinate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl Display for MavenCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)?;
        if let Some(cls) = &self.classifier {
            write!(f, ":{cls}")?;
        }
        if self.extension != "jar" {
            write!(f, "@{}", self.extension)?;
        }
        Ok(())
    }
}

impl MavenCoordinate {
    /// Maven repository-relative path for this coordinate.
    pub fn to_path(&self) -> String {
        let mut ret = format!(
            "{}/{}/{}/{}-{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version,
            self.artifact,
            self.version
        );
        if let Some(cls) = &self.classifier {
            ret.push('-');
            ret.push_str(cls);
        }
        ret.push('.');
        ret.push_str(&self.extension);
        ret
    }

    /// The `(group, artifact, classifier)` key used to dedup libraries
    /// during descriptor flattening (spec §4.1).
    pub fn dedup_key(&self) -> (String, String, Option<String>) {
        (self.group.clone(), self.artifact.clone(), self.classifier.clone())
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        let mut ext_split = value.splitn(2, '@');
        let main = ext_split.next().unwrap();
        let extension = ext_split.next().unwrap_or("jar").to_string();

        let mut parts = main.split(':');
        let group = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("missing group in maven coordinate {value}"))?
            .to_string();
        let artifact = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("missing artifact in maven coordinate {value}"))?
            .to_string();
        let version = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("missing version in maven coordinate {value}"))?
            .to_string();
        let classifier = parts.next().map(str::to_string);

        Ok(Self {
            group,
            artifact,
            version,
            classifier,
            extension,
        })
    }
}

impl From<&str> for MavenCoordinate {
    fn from(value: &str) -> Self {
        Self::parse(value).expect("invalid maven coordinate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_coordinate() {
        let c = MavenCoordinate::parse("com.mojang:authlib:2.1.28").unwrap();
        assert_eq!(c.group, "com.mojang");
        assert_eq!(c.artifact, "authlib");
        assert_eq!(c.version, "2.1.28");
        assert_eq!(c.classifier, None);
        assert_eq!(c.extension, "jar");
    }

    #[test]
    fn parses_classifier_and_extension() {
        let c = MavenCoordinate::parse("org.lwjgl:lwjgl:3.3.1:natives-linux@jar").unwrap();
        assert_eq!(c.classifier.as_deref(), Some("natives-linux"));
        assert_eq!(c.extension, "jar");
    }

    #[test]
    fn to_path_matches_maven_layout() {
        let c = MavenCoordinate::parse("com.mojang:authlib:2.1.28").unwrap();
        assert_eq!(c.to_path(), "com/mojang/authlib/2.1.28/authlib-2.1.28.jar");
    }

    #[test]
    fn to_path_with_classifier() {
        let c = MavenCoordinate::parse("org.lwjgl:lwjgl:3.3.1:natives-linux").unwrap();
        assert_eq!(
            c.to_path(),
            "org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1-natives-linux.jar"
        );
    }

    #[test]
    fn display_round_trips() {
        let c = MavenCoordinate::parse("org.lwjgl:lwjgl:3.3.1:natives-linux@jar").unwrap();
        assert_eq!(c.to_string(), "org.lwjgl:lwjgl:3.3.1:natives-linux");
    }
}
