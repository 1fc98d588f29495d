// src/services/mod.rs
pub mod auth;
pub mod driver_directory;
pub mod google_error;
pub mod messaging_service;
pub mod request_notifier;

pub use driver_directory::{DriverDirectory, FirestoreDriverDirectory};
pub use messaging_service::{FcmPushGateway, LoggingPushGateway, PushGateway};
pub use request_notifier::{DispatchOutcome, RequestNotifier};
