use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    guard::{OwnedResource, ResourceKind},
    password::PasswordHash,
};

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: PasswordHash,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub password_hash: Option<PasswordHash>,
}

/// What the credential check needs from an account, and nothing more.
pub trait AuthSubject {
    fn username_for_auth(&self) -> &str;
    fn password_hash_for_auth(&self) -> PasswordHash;
}

impl AuthSubject for User {
    fn username_for_auth(&self) -> &str {
        &self.username
    }

    fn password_hash_for_auth(&self) -> PasswordHash {
        PasswordHash::from_stored(self.password_hash.clone())
    }
}

impl OwnedResource for User {
    const KIND: ResourceKind = ResourceKind::Account;

    fn owner_user_id(&self) -> Uuid {
        self.id
    }
}
