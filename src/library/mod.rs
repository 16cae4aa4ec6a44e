pub mod catalog;
pub mod identity;
mod manager;

pub use catalog::{CatalogEvent, LoadedTrack, TrackCatalog};
pub use identity::{IdentityStore, Session};
pub use manager::{LibraryError, LibraryManager, PLAYLIST_GRADIENTS};
