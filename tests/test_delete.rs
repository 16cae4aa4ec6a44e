mod support;
use tempfile::TempDir;

use crate::support::{audio, tracing_init, TestLibrary};
use playnest::config::Config;
use playnest::library::LibraryError;
use playnest::AppContext;

#[tokio::test]
async fn test_delete_track_cascades() {
    let lib = TestLibrary::new().await;
    let user = lib.user("alice").await;
    let ids = lib.import(user.id, &["A - One.mp3", "B - Two.mp3"]).await;
    let playlist = lib
        .library_manager
        .create_playlist("Mix", user.id, None)
        .await
        .unwrap();
    lib.library_manager
        .add_tracks_to_playlist(playlist.id, &ids)
        .await
        .unwrap();

    let track = lib.database.get_track_by_id(&ids[0]).await.unwrap().unwrap();
    assert!(lib.library_manager.delete_track(&ids[0]).await.unwrap());

    assert!(lib.database.get_track_by_id(&ids[0]).await.unwrap().is_none());
    assert!(lib.database.get_file_by_id(track.file_id).await.unwrap().is_none());
    let remaining = lib
        .library_manager
        .load_playlist_tracks(playlist.id)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id(), ids[1]);
}

#[tokio::test]
async fn test_delete_unknown_track_returns_false() {
    let lib = TestLibrary::new().await;
    assert!(!lib.library_manager.delete_track("missing").await.unwrap());
}

#[tokio::test]
async fn test_deleted_file_name_can_be_imported_again() {
    let lib = TestLibrary::new().await;
    let user = lib.user("alice").await;
    let ids = lib.import(user.id, &["A - One.mp3"]).await;

    lib.library_manager.delete_track(&ids[0]).await.unwrap();
    let summary = lib
        .import_service
        .import_files(vec![audio("A - One.mp3")], user.id)
        .await
        .unwrap();
    assert_eq!(summary.added, 1);
}

#[tokio::test]
async fn test_rename_unknown_track_fails() {
    let lib = TestLibrary::new().await;
    let result = lib.library_manager.rename_track("missing", "New").await;
    assert!(matches!(result, Err(LibraryError::TrackNotFound(_))));
}

#[tokio::test]
async fn test_context_delete_releases_catalog_handle() {
    tracing_init();
    let temp_dir = TempDir::new().unwrap();
    let context = AppContext::initialize(Config::with_library_path(temp_dir.path()))
        .await
        .unwrap();
    let user = context
        .identity
        .create_user("alice", "alice@example.com")
        .await
        .unwrap();
    context.switch_user(user.id).await.unwrap();
    context
        .import_service
        .import_files(vec![audio("A - One.mp3"), audio("B - Two.mp3")], user.id)
        .await
        .unwrap();

    let victim = context.catalog.tracks()[0].clone();
    let url = victim.url().unwrap().to_string();
    let blob_urls = context.library_manager.blob_urls();
    assert!(blob_urls.resolve(&url).is_some());

    assert!(context.delete_track(victim.id()).await.unwrap());
    assert_eq!(context.catalog.len(), 1);
    assert!(context.catalog.get(victim.id()).is_none());
    assert!(blob_urls.resolve(&url).is_none());
}

#[tokio::test]
async fn test_context_rename_updates_catalog() {
    tracing_init();
    let temp_dir = TempDir::new().unwrap();
    let context = AppContext::initialize(Config::with_library_path(temp_dir.path()))
        .await
        .unwrap();
    let user = context
        .identity
        .create_user("alice", "alice@example.com")
        .await
        .unwrap();
    context.switch_user(user.id).await.unwrap();
    context
        .import_service
        .import_files(vec![audio("A - One.mp3")], user.id)
        .await
        .unwrap();

    let before = context.catalog.tracks()[0].clone();
    let renamed = context.rename_track(before.id(), "Uno").await.unwrap();
    assert_eq!(renamed.title, "Uno");

    let after = context.catalog.get(before.id()).unwrap();
    assert_eq!(after.track.title, "Uno");
    // Same handle, still live
    assert_eq!(after.url(), before.url());
}

#[tokio::test]
async fn test_rename_trims_and_rejects_blank_titles() {
    let lib = TestLibrary::new().await;
    let user = lib.user("alice").await;
    let ids = lib.import(user.id, &["A - One.mp3"]).await;

    for blank in ["", "   \t"] {
        let result = lib.library_manager.rename_track(&ids[0], blank).await;
        assert!(matches!(result, Err(LibraryError::InvalidTrack(_))));
    }
    let stored = lib.database.get_track_by_id(&ids[0]).await.unwrap().unwrap();
    assert_eq!(stored.title, "One");

    let renamed = lib
        .library_manager
        .rename_track(&ids[0], "  Uno ")
        .await
        .unwrap();
    assert_eq!(renamed.title, "Uno");
}

#[tokio::test]
async fn test_track_without_stored_file_is_left_out() {
    let lib = TestLibrary::new().await;
    let user = lib.user("alice").await;
    lib.view_as(&user);
    let ids = lib.import(user.id, &["A - One.mp3", "B - Two.mp3"]).await;
    let playlist = lib
        .library_manager
        .create_playlist("Mix", user.id, None)
        .await
        .unwrap();
    lib.library_manager
        .add_tracks_to_playlist(playlist.id, &ids)
        .await
        .unwrap();

    // Remove only the file row; the track row and its catalog handle remain
    let track = lib.database.get_track_by_id(&ids[0]).await.unwrap().unwrap();
    lib.database.delete_file(track.file_id).await.unwrap();
    assert!(lib.catalog.get(&ids[0]).is_some());

    let loaded = lib
        .library_manager
        .load_tracks_for_user(user.id)
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id(), ids[1]);

    let in_playlist = lib
        .library_manager
        .load_playlist_tracks(playlist.id)
        .await
        .unwrap();
    assert_eq!(in_playlist.len(), 1);
    assert_eq!(in_playlist[0].id(), ids[1]);
}

#[tokio::test]
async fn test_dangling_playlist_link_is_skipped() {
    let lib = TestLibrary::new().await;
    let user = lib.user("alice").await;
    let ids = lib.import(user.id, &["A - One.mp3"]).await;
    let playlist = lib
        .library_manager
        .create_playlist("Mix", user.id, None)
        .await
        .unwrap();
    lib.library_manager
        .add_tracks_to_playlist(playlist.id, &ids)
        .await
        .unwrap();
    lib.database
        .insert_playlist_link(playlist.id, "track-that-was-never-there")
        .await
        .unwrap();
    assert_eq!(lib.database.get_playlist_links(playlist.id).await.unwrap().len(), 2);

    let tracks = lib
        .library_manager
        .load_playlist_tracks(playlist.id)
        .await
        .unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].id(), ids[0]);
}

#[tokio::test]
async fn test_reload_reuses_attached_handles() {
    let lib = TestLibrary::new().await;
    let user = lib.user("alice").await;
    lib.view_as(&user);
    let ids = lib.import(user.id, &["A - One.mp3"]).await;
    let in_view = lib.catalog.get(&ids[0]).unwrap();

    let loaded = lib
        .library_manager
        .load_tracks_for_user(user.id)
        .await
        .unwrap();
    assert_eq!(loaded[0].url(), in_view.url());
    assert_eq!(lib.blob_urls.live_count(), 1);
}
