use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::{
        guard::Authorized,
        principal::Principal,
        repo_types::{NewUser, User, UserChanges},
    },
    boards::repo_types::{Board, BoardChanges, NewBoard},
    comments::repo_types::{Comment, CommentWithAuthor},
    likes::repo_types::Like,
    pins::repo_types::{NewPin, Pin, PinChanges, PinFilter},
};

pub mod memory;
pub mod pg;

/// A unique account column is already held by another user. Stores return
/// it inside their `anyhow::Error` so it survives added context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Duplicate {
    #[error("Username already taken")]
    Username,
    #[error("Email already registered")]
    Email,
}

/// Persistence seam for every entity.
///
/// Creating a record takes the acting principal, which becomes its owner.
/// Changing or removing an existing record takes an [`Authorized`] proof,
/// so it cannot happen without the ownership check.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, new: NewUser) -> anyhow::Result<User>;
    async fn user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn list_users(&self) -> anyhow::Result<Vec<User>>;
    async fn update_user(
        &self,
        user: Authorized<User>,
        changes: UserChanges,
    ) -> anyhow::Result<User>;
    /// Cascades to everything the user owns.
    async fn delete_user(&self, user: Authorized<User>) -> anyhow::Result<()>;

    async fn create_board(&self, owner: &Principal, new: NewBoard) -> anyhow::Result<Board>;
    async fn board_by_id(&self, id: Uuid) -> anyhow::Result<Option<Board>>;
    async fn list_boards(&self, owner: Option<Uuid>) -> anyhow::Result<Vec<Board>>;
    async fn update_board(
        &self,
        board: Authorized<Board>,
        changes: BoardChanges,
    ) -> anyhow::Result<Board>;
    /// Cascades to the board's pins and their comments and likes.
    async fn delete_board(&self, board: Authorized<Board>) -> anyhow::Result<()>;
    async fn count_pins(&self, board_id: Uuid) -> anyhow::Result<i64>;

    /// Adding a pin changes the board, so it needs the board's proof.
    async fn create_pin(&self, board: &Authorized<Board>, new: NewPin) -> anyhow::Result<Pin>;
    async fn pin_by_id(&self, id: Uuid) -> anyhow::Result<Option<Pin>>;
    async fn list_pins(&self, filter: PinFilter) -> anyhow::Result<Vec<Pin>>;
    async fn update_pin(&self, pin: Authorized<Pin>, changes: PinChanges)
        -> anyhow::Result<Pin>;
    async fn delete_pin(&self, pin: Authorized<Pin>) -> anyhow::Result<()>;

    async fn create_comment(
        &self,
        author: &Principal,
        pin_id: Uuid,
        text: String,
    ) -> anyhow::Result<Comment>;
    async fn comment_by_id(&self, id: Uuid) -> anyhow::Result<Option<Comment>>;
    async fn comments_for_pin(&self, pin_id: Uuid) -> anyhow::Result<Vec<CommentWithAuthor>>;
    async fn update_comment(
        &self,
        comment: Authorized<Comment>,
        text: String,
    ) -> anyhow::Result<Comment>;
    async fn delete_comment(&self, comment: Authorized<Comment>) -> anyhow::Result<()>;

    /// `None` when this user already likes the pin.
    async fn add_like(&self, liker: &Principal, pin_id: Uuid) -> anyhow::Result<Option<Like>>;
    async fn like_by(&self, pin_id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Like>>;
    async fn count_likes(&self, pin_id: Uuid) -> anyhow::Result<i64>;
    async fn delete_like(&self, like: Authorized<Like>) -> anyhow::Result<()>;
}
