pub mod config;
pub mod error;
pub mod logger;
pub mod orchestrator;
pub mod pipeline;
pub mod platform;
pub mod recognition;
pub mod sleep;
pub mod stop;
pub mod traversal;
pub mod types;

pub use config::TraversalConfig;
pub use error::{Result, SweepError};
pub use traversal::{Context, Directive, NodeStore};
