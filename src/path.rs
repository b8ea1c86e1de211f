//! A small path-joining convenience used throughout the crate.

use std::{
    ffi::{OsStr, OsString},
    fmt::Debug,
    ops::Div,
    path::{Path, PathBuf},
};

/// A `PathBuf` wrapper supporting `/` for joining, so call sites read like
/// the filesystem layout they build (`&dirs.libraries / coord.to_path()`).
#[repr(transparent)]
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct JoinPath(pub PathBuf);

impl Debug for JoinPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl AsRef<Path> for JoinPath {
    fn as_ref(&self) -> &Path {
        self.0.as_ref()
    }
}

impl From<PathBuf> for JoinPath {
    fn from(value: PathBuf) -> Self {
        Self(value)
    }
}

impl From<&Path> for JoinPath {
    fn from(value: &Path) -> Self {
        Self(value.to_path_buf())
    }
}

macro_rules! impl_div {
    ($rhs:ty) => {
        impl Div<$rhs> for &JoinPath {
            type Output = JoinPath;

            fn div(self, rhs: $rhs) -> Self::Output {
                let mut buf = self.0.clone();
                buf.push(rhs);
                JoinPath(buf)
            }
        }

        impl Div<$rhs> for JoinPath {
            type Output = JoinPath;

            fn div(self, rhs: $rhs) -> Self::Output {
                let mut buf = self.0;
                buf.push(rhs);
                JoinPath(buf)
            }
        }
    };
}

impl_div!(&str);
impl_div!(&String);
impl_div!(String);
impl_div!(&OsStr);
impl_div!(&OsString);
impl_div!(OsString);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_like_path_buf() {
        let root = JoinPath(PathBuf::from("/usr"));
        let joined = &root / "bin" / "bash";
        assert_eq!(joined.0, PathBuf::from("/usr/bin/bash"));
    }
}
