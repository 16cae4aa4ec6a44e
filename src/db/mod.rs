mod client;
mod models;
pub mod schema;

pub use client::Database;
pub use models::*;
