use std::env;
use tracing::error;

use playnest::config::Config;
use playnest::import::ImportFile;
use playnest::AppContext;

#[tokio::main]
async fn main() {
    // Use RUST_LOG env var if set, otherwise default to info level
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("playnest");

    let Some(command) = args.get(1) else {
        print_usage(program);
        std::process::exit(1);
    };

    let context = match AppContext::initialize(Config::load()).await {
        Ok(context) => context,
        Err(e) => {
            error!("Failed to open library: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&context, command, &args[2..]).await {
        match e {
            CliError::Usage => print_usage(program),
            CliError::Failed(message) => error!("{}", message),
        }
        std::process::exit(1);
    }
}

enum CliError {
    Usage,
    Failed(String),
}

impl<E: std::fmt::Display> From<E> for CliError {
    fn from(e: E) -> Self {
        CliError::Failed(e.to_string())
    }
}

async fn run(context: &AppContext, command: &str, args: &[String]) -> Result<(), CliError> {
    match (command, args) {
        ("users", []) => {
            for user in context.identity.get_all_users().await? {
                println!("{}\t{}\t{}", user.id, user.username, user.email);
            }
        }
        ("create-user", [username, email]) => {
            let user = context.identity.create_user(username, email).await?;
            println!("Created user {} ({})", user.username, user.id);
        }
        ("import", [user_id, paths @ ..]) if !paths.is_empty() => {
            let files = paths.iter().map(ImportFile::from_path).collect();
            let summary = context
                .import_service
                .import_files(files, parse_id(user_id)?)
                .await?;
            println!("{}", summary);
        }
        ("tracks", [user_id]) => {
            let tracks = context
                .library_manager
                .load_tracks_for_user(parse_id(user_id)?)
                .await?;
            for loaded in tracks {
                let track = &loaded.track;
                println!(
                    "{}\t{} - {}\t{}",
                    track.id,
                    track.artist,
                    track.title,
                    format_duration(track.duration)
                );
            }
        }
        ("rename", [track_id, title]) => {
            let track = context.rename_track(track_id, title).await?;
            println!("Renamed {} to '{}'", track.id, track.title);
        }
        ("delete", [track_id]) => {
            if context.delete_track(track_id).await? {
                println!("Deleted {}", track_id);
            } else {
                println!("No track {}", track_id);
            }
        }
        ("playlists", [user_id]) => {
            for playlist in context
                .library_manager
                .get_playlists(parse_id(user_id)?)
                .await?
            {
                println!("{}\t{}", playlist.id, playlist.name);
            }
        }
        ("create-playlist", [user_id, name]) => {
            let playlist = context
                .library_manager
                .create_playlist(name, parse_id(user_id)?, None)
                .await?;
            println!("Created playlist {} ({})", playlist.name, playlist.id);
        }
        ("delete-playlist", [playlist_id, user_id]) => {
            context
                .library_manager
                .delete_playlist(parse_id(playlist_id)?, parse_id(user_id)?)
                .await?;
            println!("Deleted playlist {}", playlist_id);
        }
        ("playlist", [playlist_id]) => {
            let playlist_id = parse_id(playlist_id)?;
            let playlist = context
                .library_manager
                .get_playlist(playlist_id)
                .await?
                .ok_or_else(|| CliError::Failed(format!("No playlist {}", playlist_id)))?;
            println!("{}", playlist.name);
            for loaded in context.library_manager.load_playlist_tracks(playlist_id).await? {
                println!("{}\t{} - {}", loaded.track.id, loaded.track.artist, loaded.track.title);
            }
        }
        ("add-to-playlist", [playlist_id, track_ids @ ..]) if !track_ids.is_empty() => {
            let added = context
                .library_manager
                .add_tracks_to_playlist(parse_id(playlist_id)?, track_ids)
                .await?;
            println!("Added {} track(s)", added);
        }
        ("remove-from-playlist", [playlist_id, track_id]) => {
            context
                .library_manager
                .remove_track_from_playlist(parse_id(playlist_id)?, track_id)
                .await?;
            println!("Removed {} from playlist {}", track_id, playlist_id);
        }
        ("wipe", [user_id]) => {
            context.clear_user_data(parse_id(user_id)?).await?;
            println!("Cleared library of user {}", user_id);
        }
        _ => return Err(CliError::Usage),
    }
    Ok(())
}

fn parse_id(value: &str) -> Result<i64, CliError> {
    value
        .parse()
        .map_err(|_| CliError::Failed(format!("Not a valid id: {}", value)))
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <command> [args]", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  users");
    eprintln!("  create-user <username> <email>");
    eprintln!("  import <user-id> <file>...");
    eprintln!("  tracks <user-id>");
    eprintln!("  rename <track-id> <title>");
    eprintln!("  delete <track-id>");
    eprintln!("  playlists <user-id>");
    eprintln!("  create-playlist <user-id> <name>");
    eprintln!("  delete-playlist <playlist-id> <user-id>");
    eprintln!("  playlist <playlist-id>");
    eprintln!("  add-to-playlist <playlist-id> <track-id>...");
    eprintln!("  remove-from-playlist <playlist-id> <track-id>");
    eprintln!("  wipe <user-id>");
}
