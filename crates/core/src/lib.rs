pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::AppConfig;
pub use error::{ErrorKind, SessionError};
pub use events::*;
pub use types::*;
