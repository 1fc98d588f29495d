pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use errors::{NotifierError, NotifierResult};
pub use services::{DispatchOutcome, RequestNotifier};
