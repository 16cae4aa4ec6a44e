// Library exports for the binary and integration tests

pub mod app_context;
pub mod blob_url;
pub mod config;
pub mod db;
pub mod import;
pub mod library;
pub mod playback;
pub mod preferences;

pub use app_context::AppContext;
