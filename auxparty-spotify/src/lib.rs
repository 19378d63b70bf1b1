mod client;
mod error;
mod models;
mod service;

pub use client::*;
pub use error::*;
pub use models::*;
pub use service::*;
