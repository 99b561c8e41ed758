use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::guard::{OwnedResource, ResourceKind};

#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub pin_id: Uuid,
    pub user_id: Uuid, // author
    pub text: String,
    pub created_at: OffsetDateTime,
}

/// Comment joined with its author's username.
#[derive(Debug, Clone, FromRow)]
pub struct CommentWithAuthor {
    #[sqlx(flatten)]
    pub comment: Comment,
    pub username: String,
}

impl OwnedResource for Comment {
    const KIND: ResourceKind = ResourceKind::Comment;

    // the author, not the pin's owner
    fn owner_user_id(&self) -> Uuid {
        self.user_id
    }
}
