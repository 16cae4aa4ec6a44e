use crate::blob_url::BlobHandle;
use crate::db::DbTrack;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// A persisted track together with the byte-access handle for its file
///
/// The handle lives only in memory; it is never written back to the
/// catalog store.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTrack {
    pub track: DbTrack,
    pub blob: Option<BlobHandle>,
}

impl LoadedTrack {
    pub fn new(track: DbTrack, blob: Option<BlobHandle>) -> Self {
        LoadedTrack { track, blob }
    }

    pub fn id(&self) -> &str {
        &self.track.id
    }

    pub fn url(&self) -> Option<&str> {
        self.blob.as_ref().map(BlobHandle::url)
    }

    fn release(&self) {
        if let Some(blob) = &self.blob {
            blob.release();
        }
    }
}

/// Notifications published whenever the catalog view changes
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    TracksChanged { count: usize },
}

/// In-memory view of the current user's tracks
///
/// The view belongs to at most one user at a time. Removing a track from the
/// view, replacing it, or clearing the view releases the byte-access handles
/// it held.
#[derive(Clone)]
pub struct TrackCatalog {
    owner: Arc<Mutex<Option<i64>>>,
    tracks: Arc<Mutex<Vec<LoadedTrack>>>,
    event_tx: broadcast::Sender<CatalogEvent>,
}

impl Default for TrackCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackCatalog {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(64);
        TrackCatalog {
            owner: Arc::new(Mutex::new(None)),
            tracks: Arc::new(Mutex::new(Vec::new())),
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.event_tx.subscribe()
    }

    fn notify(&self, count: usize) {
        // No receivers is fine
        let _ = self.event_tx.send(CatalogEvent::TracksChanged { count });
    }

    /// The user whose tracks this view shows
    pub fn owner(&self) -> Option<i64> {
        *self.owner.lock()
    }

    /// Hand the view to another user (or to nobody), emptying it
    pub fn reset(&self, owner: Option<i64>) {
        let mut current_owner = self.owner.lock();
        *current_owner = owner;
        self.clear();
    }

    /// Replace the whole view
    pub fn set_tracks(&self, tracks: Vec<LoadedTrack>) {
        let kept: HashSet<String> = tracks
            .iter()
            .filter_map(|t| t.url().map(str::to_string))
            .collect();

        let previous = {
            let mut current = self.tracks.lock();
            std::mem::replace(&mut *current, tracks)
        };
        for track in &previous {
            if track.url().is_some_and(|url| !kept.contains(url)) {
                track.release();
            }
        }

        let count = self.len();
        debug!("Catalog view replaced with {} tracks", count);
        self.notify(count);
    }

    pub fn add_track(&self, track: LoadedTrack) {
        self.add_tracks(vec![track]);
    }

    /// Append tracks in one update; ids already in the view are ignored
    pub fn add_tracks(&self, tracks: Vec<LoadedTrack>) {
        let count = {
            let mut current = self.tracks.lock();
            let mut ids: HashSet<String> = current.iter().map(|t| t.track.id.clone()).collect();
            for track in tracks {
                if ids.insert(track.track.id.clone()) {
                    current.push(track);
                }
            }
            current.len()
        };
        self.notify(count);
    }

    /// Append freshly imported tracks if `owner_id` owns the view
    ///
    /// Tracks for anyone else are not shown and their handles are released.
    pub fn add_tracks_for(&self, owner_id: i64, tracks: Vec<LoadedTrack>) -> bool {
        let owner = self.owner.lock();
        if *owner != Some(owner_id) {
            for track in &tracks {
                track.release();
            }
            return false;
        }
        self.add_tracks(tracks);
        true
    }

    /// Remove a track from the view and release its handle
    pub fn remove_track(&self, track_id: &str) -> Option<LoadedTrack> {
        let removed = {
            let mut current = self.tracks.lock();
            let index = current.iter().position(|t| t.track.id == track_id)?;
            current.remove(index)
        };
        removed.release();
        self.notify(self.len());
        Some(removed)
    }

    /// Replace the persisted fields of a track, keeping its handle
    pub fn update_track(&self, track: &DbTrack) -> bool {
        let updated = {
            let mut current = self.tracks.lock();
            match current.iter_mut().find(|t| t.track.id == track.id) {
                Some(existing) => {
                    existing.track = track.clone();
                    true
                }
                None => false,
            }
        };
        if updated {
            self.notify(self.len());
        }
        updated
    }

    /// Empty the view, releasing every handle
    pub fn clear(&self) {
        let previous = std::mem::take(&mut *self.tracks.lock());
        for track in &previous {
            track.release();
        }
        debug!("Catalog view cleared ({} tracks)", previous.len());
        self.notify(0);
    }

    pub fn get(&self, track_id: &str) -> Option<LoadedTrack> {
        self.tracks
            .lock()
            .iter()
            .find(|t| t.track.id == track_id)
            .cloned()
    }

    pub fn tracks(&self) -> Vec<LoadedTrack> {
        self.tracks.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.tracks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
