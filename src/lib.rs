//! A cross-platform Minecraft launcher installation engine: resolves a
//! version string (plain id, `release`/`snapshot` alias, or a loader-prefixed
//! spec), walks the descriptor inheritance chain, fetches libraries/assets/
//! client jar/JVM, applies legacy compatibility fixes, and hands back a
//! [`Game`] ready to [`Game::spawn`].
//!
//! The public surface is intentionally narrow: [`install::install`] is the
//! one entry point most front ends need, [`Game`] and [`events::Event`] are
//! what it hands back, and everything else (`library`, `assets`, `jvm`, ...)
//! is a building block it composes internally but that a front end doing
//! something unusual (custom mirrors, partial reinstalls) can also reach for
//! directly.

pub mod arguments;
pub mod assets;
pub mod auth;
pub mod config;
pub mod dirs;
pub mod error;
pub mod events;
pub mod fetch;
pub mod fixes;
pub mod game;
pub mod install;
pub mod jvm;
pub mod library;
pub mod loaders;
pub mod maven;
pub mod mojang;
pub mod path;
pub mod platform;
pub mod rules;
pub mod version;

pub use auth::AuthSession;
pub use config::{InstallerConfig, JvmPolicy};
pub use dirs::GameDirs;
pub use error::{Error, Result};
pub use events::Event;
pub use game::Game;
pub use install::install;
