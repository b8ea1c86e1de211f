//! Mod loader installers that compose onto a resolved Mojang version
//! (spec §4.9): the Fabric family (Fabric/Quilt/LegacyFabric/Babric) and
//! the Forge family (Forge/NeoForge).

pub mod fabric;
pub mod forge;
