pub mod bootstrap;
pub mod config;
pub mod error;
pub mod io;
pub mod loader;
pub mod paths;
pub mod process;
pub mod resolver;
pub mod session;
pub mod types;
pub mod version;

pub use error::{GuidelineError, Result};
