use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::guard::{OwnedResource, ResourceKind};

#[derive(Debug, Clone, FromRow)]
pub struct Pin {
    pub id: Uuid,
    pub board_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPin {
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct PinChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Which pins a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinFilter {
    All,
    Board(Uuid),
    Owner(Uuid),
}

impl OwnedResource for Pin {
    const KIND: ResourceKind = ResourceKind::Pin;

    fn owner_user_id(&self) -> Uuid {
        self.user_id
    }
}
