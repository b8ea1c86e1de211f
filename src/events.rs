//! The machine-output event stream (spec §6): one tagged record per phase
//! transition. A consumer that only wants text can log these at `info!`
//! (see `tracing` calls at each emission site) and ignore the channel.

use std::path::PathBuf;

use crate::error::DownloadFailure;

#[derive(Debug, Clone)]
pub enum Event {
    /// The feature set used for rule evaluation on this install.
    FeaturesSelected { features: Vec<String> },

    /// The resolver needs a descriptor it doesn't have on disk yet.
    NeedVersion {
        id: String,
        file: PathBuf,
        retry: bool,
    },
    /// The whole inheritance chain finished loading.
    HierarchyLoaded { root: String, chain: Vec<String> },

    ClientLoadStart,
    ClientLoadEnd,
    LibrariesLoadStart { count: usize },
    LibrariesLoadEnd,
    AssetsLoadStart { index_id: String },
    AssetsLoadEnd { count: usize },
    LoggerLoadStart,
    LoggerLoadEnd,
    JvmLoadStart { major: u32 },
    JvmLoadEnd { compatible: bool },

    DownloadProgress {
        done_count: usize,
        total_count: usize,
        done_bytes: u64,
        total_bytes: u64,
    },
    DownloadResourcesCancelled,
    DownloadFailed {
        failures: Vec<DownloadFailure>,
    },

    FixApplied { name: &'static str },

    /// Fabric-family: metadata/version fetched from the loader's API.
    FetchVersion { family: String, url: String },

    /// Forge-family.
    FetchInstaller { family: String, version: String },
    RunInstallerProcessor { name: String, task: String },
    Installed { id: String },
}
