pub mod audio;
pub mod config;
pub mod error;
pub mod guided;
pub mod kernel;
pub mod speech;

// Re-export specific items for convenient access
pub use config::EngineConfig;
pub use kernel::reactor::{ReactorParts, SessionReactor, SessionSnapshot};
pub use kernel::technique::{Catalog, Technique};
