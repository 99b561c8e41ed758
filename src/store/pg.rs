use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use super::{Duplicate, Store};
use crate::{
    auth::{
        guard::Authorized,
        principal::{Principal, UserLookup},
        repo_types::{NewUser, User, UserChanges},
    },
    boards::repo_types::{Board, BoardChanges, NewBoard},
    comments::repo_types::{Comment, CommentWithAuthor},
    likes::repo_types::Like,
    pins::repo_types::{NewPin, Pin, PinChanges, PinFilter},
};

const USER_COLS: &str = "id, username, email, password_hash, bio, profile_picture, created_at";
const BOARD_COLS: &str = "id, user_id, title, description, visibility, created_at";
const PIN_COLS: &str = "id, board_id, user_id, title, description, image_url, created_at";
const COMMENT_COLS: &str = "id, pin_id, user_id, text, created_at";
const LIKE_COLS: &str = "id, pin_id, user_id, created_at";

/// Postgres-backed store. Child rows go away through `ON DELETE CASCADE`.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        Ok(Self { db })
    }

    async fn user_where(&self, column: &str, value: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("find user by {column}"))?;
        Ok(user)
    }
}

/// Unique-constraint violations on `users` become [`Duplicate`]; anything
/// else keeps its context.
fn user_write_error(e: sqlx::Error, what: &'static str) -> anyhow::Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some(c) if c.contains("email") => Duplicate::Email.into(),
                _ => Duplicate::Username.into(),
            };
        }
    }
    anyhow::Error::new(e).context(what)
}

#[async_trait]
impl UserLookup for PgStore {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        self.user_where("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.user_where("email", email).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, new: NewUser) -> anyhow::Result<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, bio, profile_picture)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.username)
            .bind(new.email)
            .bind(new.password_hash.into_string())
            .bind(new.bio)
            .bind(new.profile_picture)
            .fetch_one(&self.db)
            .await
            .map_err(|e| user_write_error(e, "insert user"))?;
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("get user")?;
        Ok(user)
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLS} FROM users ORDER BY created_at ASC");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list users")?;
        Ok(users)
    }

    async fn update_user(
        &self,
        user: Authorized<User>,
        changes: UserChanges,
    ) -> anyhow::Result<User> {
        let sql = format!(
            "UPDATE users
                SET username = COALESCE($2, username),
                    bio = COALESCE($3, bio),
                    profile_picture = COALESCE($4, profile_picture),
                    password_hash = COALESCE($5, password_hash)
              WHERE id = $1
          RETURNING {USER_COLS}"
        );
        let updated = sqlx::query_as::<_, User>(&sql)
            .bind(user.resource().id)
            .bind(changes.username)
            .bind(changes.bio)
            .bind(changes.profile_picture)
            .bind(changes.password_hash.map(|h| h.into_string()))
            .fetch_one(&self.db)
            .await
            .map_err(|e| user_write_error(e, "update user"))?;
        Ok(updated)
    }

    async fn delete_user(&self, user: Authorized<User>) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user.resource().id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(())
    }

    async fn create_board(&self, owner: &Principal, new: NewBoard) -> anyhow::Result<Board> {
        let sql = format!(
            "INSERT INTO boards (id, user_id, title, description, visibility)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {BOARD_COLS}"
        );
        let board = sqlx::query_as::<_, Board>(&sql)
            .bind(Uuid::new_v4())
            .bind(owner.user_id)
            .bind(new.title)
            .bind(new.description)
            .bind(new.visibility)
            .fetch_one(&self.db)
            .await
            .context("insert board")?;
        Ok(board)
    }

    async fn board_by_id(&self, id: Uuid) -> anyhow::Result<Option<Board>> {
        let sql = format!("SELECT {BOARD_COLS} FROM boards WHERE id = $1");
        let board = sqlx::query_as::<_, Board>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("get board")?;
        Ok(board)
    }

    async fn list_boards(&self, owner: Option<Uuid>) -> anyhow::Result<Vec<Board>> {
        let sql = format!(
            "SELECT {BOARD_COLS} FROM boards
              WHERE ($1::uuid IS NULL OR user_id = $1)
              ORDER BY created_at DESC"
        );
        let boards = sqlx::query_as::<_, Board>(&sql)
            .bind(owner)
            .fetch_all(&self.db)
            .await
            .context("list boards")?;
        Ok(boards)
    }

    async fn update_board(
        &self,
        board: Authorized<Board>,
        changes: BoardChanges,
    ) -> anyhow::Result<Board> {
        let sql = format!(
            "UPDATE boards
                SET title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    visibility = COALESCE($4, visibility)
              WHERE id = $1
          RETURNING {BOARD_COLS}"
        );
        let updated = sqlx::query_as::<_, Board>(&sql)
            .bind(board.resource().id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.visibility)
            .fetch_one(&self.db)
            .await
            .context("update board")?;
        Ok(updated)
    }

    async fn delete_board(&self, board: Authorized<Board>) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(board.resource().id)
            .execute(&self.db)
            .await
            .context("delete board")?;
        Ok(())
    }

    async fn count_pins(&self, board_id: Uuid) -> anyhow::Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pins WHERE board_id = $1")
            .bind(board_id)
            .fetch_one(&self.db)
            .await
            .context("count pins")?;
        Ok(n)
    }

    async fn create_pin(&self, board: &Authorized<Board>, new: NewPin) -> anyhow::Result<Pin> {
        let sql = format!(
            "INSERT INTO pins (id, board_id, user_id, title, description, image_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PIN_COLS}"
        );
        let pin = sqlx::query_as::<_, Pin>(&sql)
            .bind(Uuid::new_v4())
            .bind(board.resource().id)
            .bind(board.principal().user_id)
            .bind(new.title)
            .bind(new.description)
            .bind(new.image_url)
            .fetch_one(&self.db)
            .await
            .context("insert pin")?;
        Ok(pin)
    }

    async fn pin_by_id(&self, id: Uuid) -> anyhow::Result<Option<Pin>> {
        let sql = format!("SELECT {PIN_COLS} FROM pins WHERE id = $1");
        let pin = sqlx::query_as::<_, Pin>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("get pin")?;
        Ok(pin)
    }

    async fn list_pins(&self, filter: PinFilter) -> anyhow::Result<Vec<Pin>> {
        let (clause, id) = match filter {
            PinFilter::All => ("$1::uuid IS NULL", None),
            PinFilter::Board(id) => ("board_id = $1", Some(id)),
            PinFilter::Owner(id) => ("user_id = $1", Some(id)),
        };
        let sql = format!("SELECT {PIN_COLS} FROM pins WHERE {clause} ORDER BY created_at DESC");
        let pins = sqlx::query_as::<_, Pin>(&sql)
            .bind(id)
            .fetch_all(&self.db)
            .await
            .context("list pins")?;
        Ok(pins)
    }

    async fn update_pin(
        &self,
        pin: Authorized<Pin>,
        changes: PinChanges,
    ) -> anyhow::Result<Pin> {
        let sql = format!(
            "UPDATE pins
                SET title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    image_url = COALESCE($4, image_url)
              WHERE id = $1
          RETURNING {PIN_COLS}"
        );
        let updated = sqlx::query_as::<_, Pin>(&sql)
            .bind(pin.resource().id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.image_url)
            .fetch_one(&self.db)
            .await
            .context("update pin")?;
        Ok(updated)
    }

    async fn delete_pin(&self, pin: Authorized<Pin>) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM pins WHERE id = $1")
            .bind(pin.resource().id)
            .execute(&self.db)
            .await
            .context("delete pin")?;
        Ok(())
    }

    async fn create_comment(
        &self,
        author: &Principal,
        pin_id: Uuid,
        text: String,
    ) -> anyhow::Result<Comment> {
        let sql = format!(
            "INSERT INTO comments (id, pin_id, user_id, text)
             VALUES ($1, $2, $3, $4)
             RETURNING {COMMENT_COLS}"
        );
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(Uuid::new_v4())
            .bind(pin_id)
            .bind(author.user_id)
            .bind(text)
            .fetch_one(&self.db)
            .await
            .context("insert comment")?;
        Ok(comment)
    }

    async fn comment_by_id(&self, id: Uuid) -> anyhow::Result<Option<Comment>> {
        let sql = format!("SELECT {COMMENT_COLS} FROM comments WHERE id = $1");
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("get comment")?;
        Ok(comment)
    }

    async fn comments_for_pin(&self, pin_id: Uuid) -> anyhow::Result<Vec<CommentWithAuthor>> {
        let rows = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.pin_id, c.user_id, c.text, c.created_at, u.username
              FROM comments c
              JOIN users u ON u.id = c.user_id
             WHERE c.pin_id = $1
             ORDER BY c.created_at ASC
            "#,
        )
        .bind(pin_id)
        .fetch_all(&self.db)
        .await
        .context("list comments by pin")?;
        Ok(rows)
    }

    async fn update_comment(
        &self,
        comment: Authorized<Comment>,
        text: String,
    ) -> anyhow::Result<Comment> {
        let sql = format!("UPDATE comments SET text = $2 WHERE id = $1 RETURNING {COMMENT_COLS}");
        let updated = sqlx::query_as::<_, Comment>(&sql)
            .bind(comment.resource().id)
            .bind(text)
            .fetch_one(&self.db)
            .await
            .context("update comment")?;
        Ok(updated)
    }

    async fn delete_comment(&self, comment: Authorized<Comment>) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment.resource().id)
            .execute(&self.db)
            .await
            .context("delete comment")?;
        Ok(())
    }

    async fn add_like(&self, liker: &Principal, pin_id: Uuid) -> anyhow::Result<Option<Like>> {
        let sql = format!(
            "INSERT INTO pin_likes (id, pin_id, user_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (pin_id, user_id) DO NOTHING
             RETURNING {LIKE_COLS}"
        );
        let like = sqlx::query_as::<_, Like>(&sql)
            .bind(Uuid::new_v4())
            .bind(pin_id)
            .bind(liker.user_id)
            .fetch_optional(&self.db)
            .await
            .context("insert like")?;
        Ok(like)
    }

    async fn like_by(&self, pin_id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Like>> {
        let sql = format!("SELECT {LIKE_COLS} FROM pin_likes WHERE pin_id = $1 AND user_id = $2");
        let like = sqlx::query_as::<_, Like>(&sql)
            .bind(pin_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .context("get like")?;
        Ok(like)
    }

    async fn count_likes(&self, pin_id: Uuid) -> anyhow::Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pin_likes WHERE pin_id = $1")
            .bind(pin_id)
            .fetch_one(&self.db)
            .await
            .context("count likes")?;
        Ok(n)
    }

    async fn delete_like(&self, like: Authorized<Like>) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM pin_likes WHERE id = $1")
            .bind(like.resource().id)
            .execute(&self.db)
            .await
            .context("delete like")?;
        Ok(())
    }
}
