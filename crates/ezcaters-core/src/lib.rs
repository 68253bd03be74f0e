//! EZCaters Core crate - shared error type, configuration, and domain types
//! for the catering voice agent.

pub mod config;
pub mod error;
pub mod types;

pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use types::*;
