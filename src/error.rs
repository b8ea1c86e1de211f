//! The closed error taxonomy (spec family: Auth / Auth DB / Base installer /
//! Mojang / Fabric / Forge), implemented with `thiserror` so callers can
//! match on the tag instead of parsing strings.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // --- Auth (the bearer-token collaborator surfaces only these) ---
    #[error("authentication declined")]
    AuthDeclined,
    #[error("authentication timed out")]
    AuthTimedOut,
    #[error("authentication token is outdated")]
    AuthOutdatedToken,
    #[error("account does not own this game")]
    AuthDoesNotOwnGame,
    #[error("authentication server returned HTTP {status}")]
    AuthHttpStatus { status: u16 },
    #[error("authentication failed: {message}")]
    AuthUnknown { message: String },

    // --- Auth DB ---
    #[error("auth database I/O error: {0}")]
    AuthDbIo(#[source] std::io::Error),
    #[error("auth database is corrupted")]
    AuthDbCorrupted,
    #[error("failed to write auth database: {0}")]
    AuthDbWriteFailed(#[source] std::io::Error),

    // --- Base installer ---
    #[error("version hierarchy loop detected at {id}")]
    HierarchyLoop { id: String },
    #[error("version not found: {id}")]
    VersionNotFound { id: String },
    #[error("malformed version descriptor: {id}: {reason}")]
    MalformedDescriptor { id: String, reason: String },
    #[error("asset index not found: {id}")]
    AssetsIndexNotFound { id: String },
    #[error("client jar not found")]
    ClientNotFound,
    #[error("library not found: {coordinate}")]
    LibraryNotFound { coordinate: String },
    #[error("no compatible JVM found for Java {major}")]
    JvmNotFound { major: u32 },
    #[error("main class not found in descriptor {id}")]
    MainClassNotFound { id: String },
    #[error("download cancelled")]
    DownloadCancelled,
    #[error("{} of {} downloads failed", .failures.len(), total)]
    Download {
        failures: Vec<DownloadFailure>,
        total: usize,
    },

    // --- Mojang layer ---
    #[error("lwjgl fix: no library found for version {version}")]
    LwjglFixNotFound { version: String },

    // --- Fabric layer ---
    #[error("no latest loader version available for {family}")]
    FabricLatestVersionNotFound { family: String },
    #[error("game version not found in {family} metadata: {game_version}")]
    FabricGameVersionNotFound { family: String, game_version: String },
    #[error("loader version not found in {family} metadata: {loader_version}")]
    FabricLoaderVersionNotFound {
        family: String,
        loader_version: String,
    },

    // --- Forge layer ---
    #[error("no latest {family} version available for {game_version}")]
    ForgeLatestVersionNotFound { family: String, game_version: String },
    #[error("{family} installer not found for {version}")]
    ForgeInstallerNotFound { family: String, version: String },
    #[error("{family} maven-metadata.xml is malformed")]
    ForgeMavenMetadataMalformed { family: String },
    #[error("install_profile.json not found in {family} installer")]
    ForgeInstallProfileNotFound { family: String },
    #[error("install_profile.json is incoherent: {reason}")]
    ForgeInstallProfileIncoherent { reason: String },
    #[error("installer archive entry not found: {entry}")]
    ForgeInstallerFileNotFound { entry: String },
    #[error("processor not found: {name}")]
    ForgeProcessorNotFound { name: String },
    #[error("processor {name} failed with status {status:?}")]
    ForgeProcessorFailed {
        name: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("processor {name} produced corrupted output {file}: expected sha1 {expected_sha1}")]
    ForgeProcessorOutputCorrupted {
        name: String,
        file: PathBuf,
        expected_sha1: String,
    },

    // --- plumbing ---
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Xml(#[from] xmltree::ParseError),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct DownloadFailure {
    pub url: String,
    pub dest: PathBuf,
    pub cause: String,
}
