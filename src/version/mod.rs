pub mod resolver;
pub mod schema;

pub use resolver::{load_chain, flatten, NoopProvider, VersionProvider};
pub use schema::VersionJson;
