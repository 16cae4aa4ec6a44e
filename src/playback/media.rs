use crate::playback::queue::PlayerState;

/// The two native elements a media adapter keeps around
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaElementKind {
    Audio,
    Video,
}

impl MediaElementKind {
    pub fn for_video(is_video: bool) -> Self {
        if is_video {
            MediaElementKind::Video
        } else {
            MediaElementKind::Audio
        }
    }
}

/// Commands for the media adapter
#[derive(Debug, Clone, PartialEq)]
pub enum MediaIntent {
    /// Drop the element's source
    Detach { element: MediaElementKind },
    /// Point the element at a byte-access URL
    Load { element: MediaElementKind, url: String },
    Play { element: MediaElementKind },
    Pause { element: MediaElementKind },
    /// Position in seconds
    Seek { element: MediaElementKind, position: f64 },
    /// Applies to both elements
    SetVolume(f32),
}

/// Tracks which element is hot and derives intents from state changes
///
/// At most one element holds a source at a time. Switching between audio
/// and video pauses and detaches the old element before the new one loads.
#[derive(Debug, Default)]
pub struct MediaSession {
    hot: Option<MediaElementKind>,
    loaded_url: Option<String>,
}

impl MediaSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hot_element(&self) -> Option<MediaElementKind> {
        self.hot
    }

    pub fn loaded_url(&self) -> Option<&str> {
        self.loaded_url.as_deref()
    }

    /// Intents that move the adapter from `before` to `after`
    ///
    /// A change of `current_time` on the same track is treated as a seek, so
    /// adapter time reports must not be passed through here.
    pub fn reconcile(&mut self, before: &PlayerState, after: &PlayerState) -> Vec<MediaIntent> {
        let mut intents = Vec::new();

        if after.volume != before.volume {
            intents.push(MediaIntent::SetVolume(after.volume));
        }

        let target = after.current_track.as_ref().and_then(|track| {
            track
                .url()
                .map(|url| (MediaElementKind::for_video(track.track.is_video), url))
        });

        let same_track = before.current_track_id() == after.current_track_id();
        let same_source = target.map(|(_, url)| url) == self.loaded_url.as_deref();

        match target {
            None => {
                if let Some(element) = self.hot.take() {
                    intents.push(MediaIntent::Pause { element });
                    intents.push(MediaIntent::Detach { element });
                }
                self.loaded_url = None;
            }
            Some((element, url)) if !(same_track && same_source) || self.hot.is_none() => {
                if let Some(previous) = self.hot.filter(|&hot| hot != element) {
                    intents.push(MediaIntent::Pause { element: previous });
                    intents.push(MediaIntent::Detach { element: previous });
                }
                intents.push(MediaIntent::Load {
                    element,
                    url: url.to_string(),
                });
                self.hot = Some(element);
                self.loaded_url = Some(url.to_string());
                if after.is_playing {
                    intents.push(MediaIntent::Play { element });
                }
            }
            Some((element, _)) => {
                if after.current_time != before.current_time {
                    intents.push(MediaIntent::Seek {
                        element,
                        position: after.current_time,
                    });
                }
                if after.is_playing != before.is_playing {
                    intents.push(if after.is_playing {
                        MediaIntent::Play { element }
                    } else {
                        MediaIntent::Pause { element }
                    });
                }
            }
        }

        intents
    }

    pub fn seek(&self, position: f64) -> Option<MediaIntent> {
        self.hot.map(|element| MediaIntent::Seek { element, position })
    }

    pub fn resume(&self) -> Option<MediaIntent> {
        self.hot.map(|element| MediaIntent::Play { element })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_url::BlobUrlRegistry;
    use crate::db::DbTrack;
    use crate::library::LoadedTrack;
    use crate::playback::queue::PlaybackQueue;
    use crate::preferences::PlayerPreferences;
    use std::sync::Arc;

    fn loaded(registry: &BlobUrlRegistry, file_id: i64, is_video: bool) -> LoadedTrack {
        let track = DbTrack::new("Song", "Artist", "Album", 10.0, file_id, 1, is_video);
        let mime = if is_video { "video/mp4" } else { "audio/mpeg" };
        let blob = registry.create(file_id, mime, Arc::from(vec![0u8; 4]));
        LoadedTrack::new(track, Some(blob))
    }

    fn step(
        session: &mut MediaSession,
        queue: &mut PlaybackQueue,
        f: impl FnOnce(&mut PlaybackQueue),
    ) -> Vec<MediaIntent> {
        let before = queue.state().clone();
        f(queue);
        session.reconcile(&before, queue.state())
    }

    #[test]
    fn test_first_track_loads_and_plays() {
        let registry = BlobUrlRegistry::new();
        let song = loaded(&registry, 1, false);
        let url = song.url().unwrap().to_string();
        let mut session = MediaSession::new();
        let mut queue = PlaybackQueue::new(PlayerPreferences::default());

        let intents = step(&mut session, &mut queue, |q| q.play_track(song, None));
        assert_eq!(
            intents,
            vec![
                MediaIntent::Load {
                    element: MediaElementKind::Audio,
                    url,
                },
                MediaIntent::Play {
                    element: MediaElementKind::Audio
                },
            ]
        );
        assert_eq!(session.hot_element(), Some(MediaElementKind::Audio));
    }

    #[test]
    fn test_switching_kind_detaches_previous_element() {
        let registry = BlobUrlRegistry::new();
        let song = loaded(&registry, 1, false);
        let clip = loaded(&registry, 2, true);
        let mut session = MediaSession::new();
        let mut queue = PlaybackQueue::new(PlayerPreferences::default());
        let all = vec![song.clone(), clip.clone()];

        step(&mut session, &mut queue, |q| q.play_track(song, Some(all)));
        let intents = step(&mut session, &mut queue, |q| {
            q.next();
        });

        assert_eq!(
            &intents[..2],
            &[
                MediaIntent::Pause {
                    element: MediaElementKind::Audio
                },
                MediaIntent::Detach {
                    element: MediaElementKind::Audio
                },
            ]
        );
        assert!(matches!(
            intents[2],
            MediaIntent::Load {
                element: MediaElementKind::Video,
                ..
            }
        ));
        assert_eq!(session.hot_element(), Some(MediaElementKind::Video));
    }

    #[test]
    fn test_same_kind_reuses_element() {
        let registry = BlobUrlRegistry::new();
        let first = loaded(&registry, 1, false);
        let second = loaded(&registry, 2, false);
        let mut session = MediaSession::new();
        let mut queue = PlaybackQueue::new(PlayerPreferences::default());
        let all = vec![first.clone(), second.clone()];

        step(&mut session, &mut queue, |q| q.play_track(first, Some(all)));
        let intents = step(&mut session, &mut queue, |q| {
            q.next();
        });
        assert!(!intents
            .iter()
            .any(|i| matches!(i, MediaIntent::Detach { .. })));
        assert_eq!(session.loaded_url(), second.url());
    }

    #[test]
    fn test_restart_in_place_seeks_to_zero() {
        let registry = BlobUrlRegistry::new();
        let song = loaded(&registry, 1, false);
        let mut session = MediaSession::new();
        let mut queue = PlaybackQueue::new(PlayerPreferences::default());

        step(&mut session, &mut queue, |q| q.play_track(song, None));
        queue.set_current_time(8.0);
        let intents = step(&mut session, &mut queue, |q| {
            q.previous();
        });
        assert_eq!(
            intents,
            vec![MediaIntent::Seek {
                element: MediaElementKind::Audio,
                position: 0.0
            }]
        );
    }

    #[test]
    fn test_track_without_handle_detaches() {
        let registry = BlobUrlRegistry::new();
        let song = loaded(&registry, 1, false);
        let bare = LoadedTrack::new(DbTrack::new("Bare", "A", "B", 0.0, 9, 1, false), None);
        let mut session = MediaSession::new();
        let mut queue = PlaybackQueue::new(PlayerPreferences::default());

        step(&mut session, &mut queue, |q| q.play_track(song, None));
        let intents = step(&mut session, &mut queue, |q| q.play_track(bare, None));
        assert_eq!(
            intents,
            vec![
                MediaIntent::Pause {
                    element: MediaElementKind::Audio
                },
                MediaIntent::Detach {
                    element: MediaElementKind::Audio
                },
            ]
        );
        assert_eq!(session.hot_element(), None);
    }

    #[test]
    fn test_pause_and_volume() {
        let registry = BlobUrlRegistry::new();
        let song = loaded(&registry, 1, false);
        let mut session = MediaSession::new();
        let mut queue = PlaybackQueue::new(PlayerPreferences::default());

        step(&mut session, &mut queue, |q| q.play_track(song, None));
        let intents = step(&mut session, &mut queue, |q| {
            q.pause();
            q.set_volume(0.2);
        });
        assert_eq!(
            intents,
            vec![
                MediaIntent::SetVolume(0.2),
                MediaIntent::Pause {
                    element: MediaElementKind::Audio
                },
            ]
        );
    }
}
