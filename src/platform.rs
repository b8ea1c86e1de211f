//! Current-platform detection: OS, architecture and bit width, used by the
//! rule evaluator (§4.2) and native classifier resolution (§4.3).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Windows,
    #[serde(rename = "osx")]
    Osx,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Os::Linux => "linux",
            Os::Windows => "windows",
            Os::Osx => "osx",
        })
    }
}

#[cfg(target_os = "windows")]
pub const CURRENT_OS: Os = Os::Windows;
#[cfg(target_os = "linux")]
pub const CURRENT_OS: Os = Os::Linux;
#[cfg(target_os = "macos")]
pub const CURRENT_OS: Os = Os::Osx;

/// The `${arch}` placeholder value for native classifier templates, and
/// the `os.arch` rule predicate's match target.
#[cfg(target_arch = "x86_64")]
pub const CURRENT_ARCH: &str = "x86_64";
#[cfg(target_arch = "x86")]
pub const CURRENT_ARCH: &str = "x86";
#[cfg(target_arch = "aarch64")]
pub const CURRENT_ARCH: &str = "arm64";
#[cfg(target_arch = "arm")]
pub const CURRENT_ARCH: &str = "arm";

#[cfg(target_pointer_width = "64")]
pub const CURRENT_BITS: &str = "64";
#[cfg(target_pointer_width = "32")]
pub const CURRENT_BITS: &str = "32";

/// Path delimiter for classpath strings (`:` on POSIX, `;` on Windows).
#[cfg(not(target_os = "windows"))]
pub const CLASSPATH_SEPARATOR: &str = ":";
#[cfg(target_os = "windows")]
pub const CLASSPATH_SEPARATOR: &str = ";";

/// The running OS's version string, the `os.version` rule predicate's
/// match target. Best-effort: an unparseable probe falls back to an empty
/// string, which just means `os.version`-gated rules never match.
pub fn current_os_version() -> String {
    #[cfg(unix)]
    {
        std::process::Command::new("uname")
            .arg("-r")
            .output()
            .ok()
            .filter(|out| out.status.success())
            .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
            .unwrap_or_default()
    }
    #[cfg(windows)]
    {
        std::process::Command::new("cmd")
            .args(["/C", "ver"])
            .output()
            .ok()
            .filter(|out| out.status.success())
            .and_then(|out| {
                let text = String::from_utf8_lossy(&out.stdout).to_string();
                text.split('[').nth(1).map(|s| s.trim_end_matches([']', '\r', '\n', ' ']).to_string())
            })
            .unwrap_or_default()
    }
}

/// Executable suffix for native shared libraries we may need to strip
/// version suffixes from when copying into the run bin directory
/// (`libfoo.so.3` -> `libfoo.so`), per spec §4.3.
pub fn strip_shared_object_version(filename: &str) -> String {
    if let Some(idx) = filename.find(".so.") {
        filename[..idx + 3].to_string()
    } else {
        filename.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_shared_object_suffix() {
        assert_eq!(strip_shared_object_version("libfoo.so.3"), "libfoo.so");
        assert_eq!(strip_shared_object_version("libfoo.so"), "libfoo.so");
        assert_eq!(strip_shared_object_version("libfoo.dylib"), "libfoo.dylib");
    }
}
