use serde::Deserialize;

/// Partial profile update for the calling account. A password change
/// needs the current password alongside the new one.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}
