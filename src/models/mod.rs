// src/models/mod.rs
pub mod driver;
pub mod firestore;
pub mod notification;
pub mod request;

pub use driver::*;
pub use firestore::{Document, DocumentEventData, Fields, Value};
pub use notification::*;
pub use request::*;
