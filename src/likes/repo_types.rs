use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::guard::{OwnedResource, ResourceKind};

/// At most one per (pin_id, user_id).
#[derive(Debug, Clone, FromRow)]
pub struct Like {
    pub id: Uuid,
    pub pin_id: Uuid,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
}

impl OwnedResource for Like {
    const KIND: ResourceKind = ResourceKind::Like;

    fn owner_user_id(&self) -> Uuid {
        self.user_id
    }
}
