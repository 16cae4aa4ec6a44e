use crate::db::{Database, DbUser};
use crate::library::catalog::TrackCatalog;
use crate::library::manager::LibraryError;
use crate::preferences::{PreferenceFile, SessionPreferences};
use rand::seq::SliceRandom;
use tracing::{info, warn};

pub const MIN_USERNAME_LENGTH: usize = 2;
pub const MAX_USERNAME_LENGTH: usize = 50;

/// Avatar colours a new user picks from
pub const AVATAR_COLORS: [&str; 6] = [
    "hsl(270, 91%, 65%)",
    "hsl(280, 100%, 70%)",
    "hsl(320, 85%, 60%)",
    "hsl(200, 90%, 60%)",
    "hsl(150, 80%, 50%)",
    "hsl(30, 90%, 60%)",
];

/// Creates, finds and removes library users
#[derive(Debug, Clone)]
pub struct IdentityStore {
    database: Database,
}

impl IdentityStore {
    pub fn new(database: Database) -> Self {
        IdentityStore { database }
    }

    pub async fn create_user(&self, username: &str, email: &str) -> Result<DbUser, LibraryError> {
        let username = username.trim();
        let email = email.trim();

        let length = username.chars().count();
        if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&length) {
            return Err(LibraryError::InvalidUser(format!(
                "username must be {} to {} characters",
                MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
            )));
        }
        if email.is_empty() {
            return Err(LibraryError::InvalidUser("email cannot be empty".to_string()));
        }

        let avatar_color = AVATAR_COLORS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(AVATAR_COLORS[0]);

        let mut user = DbUser::new(username, email, avatar_color);
        user.id = self.database.insert_user(&user).await?;
        info!("Created user '{}' ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn get_all_users(&self) -> Result<Vec<DbUser>, LibraryError> {
        Ok(self.database.get_users().await?)
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<DbUser>, LibraryError> {
        Ok(self.database.get_user_by_id(user_id).await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<DbUser>, LibraryError> {
        Ok(self.database.get_user_by_email(email.trim()).await?)
    }

    /// Delete a user together with everything they own
    pub async fn delete_user(&self, user_id: i64) -> Result<(), LibraryError> {
        if self.database.get_user_by_id(user_id).await?.is_none() {
            return Err(LibraryError::UserNotFound(user_id));
        }
        self.database.delete_user_data(user_id, true).await?;
        info!("Deleted user {} and all of their data", user_id);
        Ok(())
    }
}

/// Who is currently using the library
///
/// Switching users or logging out empties the in-memory catalog view so
/// no track of the previous user stays reachable.
pub struct Session {
    current: Option<DbUser>,
    catalog: TrackCatalog,
    preferences: Option<PreferenceFile<SessionPreferences>>,
}

impl Session {
    pub fn new(catalog: TrackCatalog) -> Self {
        Session {
            current: None,
            catalog,
            preferences: None,
        }
    }

    /// Restore the persisted current user, if it still exists
    pub async fn restore(
        identity: &IdentityStore,
        catalog: TrackCatalog,
        preferences: PreferenceFile<SessionPreferences>,
    ) -> Result<Self, LibraryError> {
        let saved = preferences.load();
        let current = match saved.current_user_id {
            Some(user_id) => {
                let user = identity.get_user(user_id).await?;
                if user.is_none() {
                    warn!("Remembered user {} no longer exists", user_id);
                }
                user
            }
            None => None,
        };

        catalog.reset(current.as_ref().map(|user| user.id));
        Ok(Session {
            current,
            catalog,
            preferences: Some(preferences),
        })
    }

    pub fn current_user(&self) -> Option<&DbUser> {
        self.current.as_ref()
    }

    pub fn switch_user(&mut self, user: DbUser) {
        info!("Switching to user '{}' ({})", user.username, user.id);
        self.catalog.reset(Some(user.id));
        self.current = Some(user);
        self.persist();
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.current.take() {
            info!("Logged out user {}", user.id);
        }
        self.catalog.reset(None);
        self.persist();
    }

    fn persist(&self) {
        if let Some(preferences) = &self.preferences {
            let state = SessionPreferences {
                current_user_id: self.current.as_ref().map(|user| user.id),
            };
            if let Err(e) = preferences.save(&state) {
                warn!("Failed to remember current user: {}", e);
            }
        }
    }
}
