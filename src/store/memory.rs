use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
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

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    boards: Vec<Board>,
    pins: Vec<Pin>,
    comments: Vec<Comment>,
    likes: Vec<Like>,
}

impl Tables {
    fn drop_pins_where(&mut self, doomed: impl Fn(&Pin) -> bool) {
        let gone: Vec<Uuid> = self.pins.iter().filter(|p| doomed(p)).map(|p| p.id).collect();
        self.pins.retain(|p| !gone.contains(&p.id));
        self.comments.retain(|c| !gone.contains(&c.pin_id));
        self.likes.retain(|l| !gone.contains(&l.pin_id));
    }
}

/// Process-local store with the same cascade and uniqueness rules as the
/// Postgres schema. Rows are kept in insertion order; listings return the
/// newest first, comments oldest first.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>) -> Vec<T> {
    rows.rev().collect()
}

#[async_trait]
impl UserLookup for MemoryStore {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, new: NewUser) -> anyhow::Result<User> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|u| u.username == new.username) {
            return Err(Duplicate::Username.into());
        }
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(Duplicate::Email.into());
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash.into_string(),
            bio: new.bio,
            profile_picture: new.profile_picture,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn update_user(
        &self,
        user: Authorized<User>,
        changes: UserChanges,
    ) -> anyhow::Result<User> {
        let mut t = self.tables.write().await;
        let id = user.resource().id;
        if let Some(name) = &changes.username {
            if t.users.iter().any(|u| u.id != id && &u.username == name) {
                return Err(Duplicate::Username.into());
            }
        }
        let row = t
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| anyhow::anyhow!("user {id} vanished"))?;
        if let Some(v) = changes.username {
            row.username = v;
        }
        if let Some(v) = changes.bio {
            row.bio = Some(v);
        }
        if let Some(v) = changes.profile_picture {
            row.profile_picture = Some(v);
        }
        if let Some(v) = changes.password_hash {
            row.password_hash = v.into_string();
        }
        Ok(row.clone())
    }

    async fn delete_user(&self, user: Authorized<User>) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        let id = user.resource().id;
        let boards: Vec<Uuid> = t.boards.iter().filter(|b| b.user_id == id).map(|b| b.id).collect();
        t.drop_pins_where(|p| p.user_id == id || boards.contains(&p.board_id));
        t.boards.retain(|b| b.user_id != id);
        t.comments.retain(|c| c.user_id != id);
        t.likes.retain(|l| l.user_id != id);
        t.users.retain(|u| u.id != id);
        Ok(())
    }

    async fn create_board(&self, owner: &Principal, new: NewBoard) -> anyhow::Result<Board> {
        let board = Board {
            id: Uuid::new_v4(),
            user_id: owner.user_id,
            title: new.title,
            description: new.description,
            visibility: new.visibility,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.write().await.boards.push(board.clone());
        Ok(board)
    }

    async fn board_by_id(&self, id: Uuid) -> anyhow::Result<Option<Board>> {
        let t = self.tables.read().await;
        Ok(t.boards.iter().find(|b| b.id == id).cloned())
    }

    async fn list_boards(&self, owner: Option<Uuid>) -> anyhow::Result<Vec<Board>> {
        let t = self.tables.read().await;
        Ok(newest_first(
            t.boards
                .iter()
                .filter(|b| owner.map_or(true, |o| b.user_id == o))
                .cloned(),
        ))
    }

    async fn update_board(
        &self,
        board: Authorized<Board>,
        changes: BoardChanges,
    ) -> anyhow::Result<Board> {
        let mut t = self.tables.write().await;
        let id = board.resource().id;
        let row = t
            .boards
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| anyhow::anyhow!("board {id} vanished"))?;
        if let Some(v) = changes.title {
            row.title = v;
        }
        if let Some(v) = changes.description {
            row.description = Some(v);
        }
        if let Some(v) = changes.visibility {
            row.visibility = v;
        }
        Ok(row.clone())
    }

    async fn delete_board(&self, board: Authorized<Board>) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        let id = board.resource().id;
        t.drop_pins_where(|p| p.board_id == id);
        t.boards.retain(|b| b.id != id);
        Ok(())
    }

    async fn count_pins(&self, board_id: Uuid) -> anyhow::Result<i64> {
        let t = self.tables.read().await;
        Ok(t.pins.iter().filter(|p| p.board_id == board_id).count() as i64)
    }

    async fn create_pin(&self, board: &Authorized<Board>, new: NewPin) -> anyhow::Result<Pin> {
        let pin = Pin {
            id: Uuid::new_v4(),
            board_id: board.resource().id,
            user_id: board.principal().user_id,
            title: new.title,
            description: new.description,
            image_url: new.image_url,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.write().await.pins.push(pin.clone());
        Ok(pin)
    }

    async fn pin_by_id(&self, id: Uuid) -> anyhow::Result<Option<Pin>> {
        let t = self.tables.read().await;
        Ok(t.pins.iter().find(|p| p.id == id).cloned())
    }

    async fn list_pins(&self, filter: PinFilter) -> anyhow::Result<Vec<Pin>> {
        let t = self.tables.read().await;
        Ok(newest_first(
            t.pins
                .iter()
                .filter(|p| match filter {
                    PinFilter::All => true,
                    PinFilter::Board(id) => p.board_id == id,
                    PinFilter::Owner(id) => p.user_id == id,
                })
                .cloned(),
        ))
    }

    async fn update_pin(
        &self,
        pin: Authorized<Pin>,
        changes: PinChanges,
    ) -> anyhow::Result<Pin> {
        let mut t = self.tables.write().await;
        let id = pin.resource().id;
        let row = t
            .pins
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow::anyhow!("pin {id} vanished"))?;
        if let Some(v) = changes.title {
            row.title = v;
        }
        if let Some(v) = changes.description {
            row.description = Some(v);
        }
        if let Some(v) = changes.image_url {
            row.image_url = v;
        }
        Ok(row.clone())
    }

    async fn delete_pin(&self, pin: Authorized<Pin>) -> anyhow::Result<()> {
        let id = pin.resource().id;
        self.tables.write().await.drop_pins_where(|p| p.id == id);
        Ok(())
    }

    async fn create_comment(
        &self,
        author: &Principal,
        pin_id: Uuid,
        text: String,
    ) -> anyhow::Result<Comment> {
        let mut t = self.tables.write().await;
        anyhow::ensure!(t.pins.iter().any(|p| p.id == pin_id), "pin {pin_id} does not exist");
        let comment = Comment {
            id: Uuid::new_v4(),
            pin_id,
            user_id: author.user_id,
            text,
            created_at: OffsetDateTime::now_utc(),
        };
        t.comments.push(comment.clone());
        Ok(comment)
    }

    async fn comment_by_id(&self, id: Uuid) -> anyhow::Result<Option<Comment>> {
        let t = self.tables.read().await;
        Ok(t.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn comments_for_pin(&self, pin_id: Uuid) -> anyhow::Result<Vec<CommentWithAuthor>> {
        let t = self.tables.read().await;
        let rows = t
            .comments
            .iter()
            .filter(|c| c.pin_id == pin_id)
            .filter_map(|c| {
                let author = t.users.iter().find(|u| u.id == c.user_id)?;
                Some(CommentWithAuthor {
                    comment: c.clone(),
                    username: author.username.clone(),
                })
            })
            .collect();
        Ok(rows)
    }

    async fn update_comment(
        &self,
        comment: Authorized<Comment>,
        text: String,
    ) -> anyhow::Result<Comment> {
        let mut t = self.tables.write().await;
        let id = comment.resource().id;
        let row = t
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow::anyhow!("comment {id} vanished"))?;
        row.text = text;
        Ok(row.clone())
    }

    async fn delete_comment(&self, comment: Authorized<Comment>) -> anyhow::Result<()> {
        let id = comment.resource().id;
        self.tables.write().await.comments.retain(|c| c.id != id);
        Ok(())
    }

    async fn add_like(&self, liker: &Principal, pin_id: Uuid) -> anyhow::Result<Option<Like>> {
        let mut t = self.tables.write().await;
        anyhow::ensure!(t.pins.iter().any(|p| p.id == pin_id), "pin {pin_id} does not exist");
        if t
            .likes
            .iter()
            .any(|l| l.pin_id == pin_id && l.user_id == liker.user_id)
        {
            return Ok(None);
        }
        let like = Like {
            id: Uuid::new_v4(),
            pin_id,
            user_id: liker.user_id,
            created_at: OffsetDateTime::now_utc(),
        };
        t.likes.push(like.clone());
        Ok(Some(like))
    }

    async fn like_by(&self, pin_id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Like>> {
        let t = self.tables.read().await;
        Ok(t
            .likes
            .iter()
            .find(|l| l.pin_id == pin_id && l.user_id == user_id)
            .cloned())
    }

    async fn count_likes(&self, pin_id: Uuid) -> anyhow::Result<i64> {
        let t = self.tables.read().await;
        Ok(t.likes.iter().filter(|l| l.pin_id == pin_id).count() as i64)
    }

    async fn delete_like(&self, like: Authorized<Like>) -> anyhow::Result<()> {
        let id = like.resource().id;
        self.tables.write().await.likes.retain(|l| l.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{guard::OwnershipGuard, password::PasswordHash};

    async fn user(store: &MemoryStore, name: &str) -> Principal {
        let u = store
            .create_user(NewUser {
                username: name.into(),
                email: format!("{name}@example.com"),
                password_hash: PasswordHash::from_stored("$argon2id$stub"),
                bio: None,
                profile_picture: None,
            })
            .await
            .unwrap();
        Principal::from(&u)
    }

    async fn board_with_pin(store: &MemoryStore, owner: &Principal) -> (Board, Pin) {
        let board = store
            .create_board(
                owner,
                NewBoard {
                    title: "Trips".into(),
                    description: None,
                    visibility: "public".into(),
                },
            )
            .await
            .unwrap();
        let proof = OwnershipGuard.authorize(owner, board.clone()).unwrap();
        let pin = store
            .create_pin(
                &proof,
                NewPin {
                    title: "Lisbon".into(),
                    description: None,
                    image_url: "https://img.example/lisbon.jpg".into(),
                },
            )
            .await
            .unwrap();
        (board, pin)
    }

    #[tokio::test]
    async fn duplicate_usernames_are_refused() {
        let store = MemoryStore::default();
        user(&store, "alice").await;
        let dup = store
            .create_user(NewUser {
                username: "alice".into(),
                email: "other@example.com".into(),
                password_hash: PasswordHash::from_stored("x"),
                bio: None,
                profile_picture: None,
            })
            .await
            .unwrap_err();
        assert_eq!(dup.downcast_ref::<Duplicate>(), Some(&Duplicate::Username));

        let same_email = store
            .create_user(NewUser {
                username: "alice2".into(),
                email: "alice@example.com".into(),
                password_hash: PasswordHash::from_stored("x"),
                bio: None,
                profile_picture: None,
            })
            .await
            .unwrap_err();
        assert_eq!(same_email.downcast_ref::<Duplicate>(), Some(&Duplicate::Email));
    }

    #[tokio::test]
    async fn rename_onto_taken_username_is_a_duplicate() {
        let store = MemoryStore::default();
        user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let row = store.user_by_id(bob.user_id).await.unwrap().unwrap();
        let proof = OwnershipGuard.authorize(&bob, row).unwrap();
        let err = store
            .update_user(
                proof,
                UserChanges {
                    username: Some("alice".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<Duplicate>(), Some(&Duplicate::Username));
    }

    #[tokio::test]
    async fn one_like_per_user_and_pin() {
        let store = MemoryStore::default();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let (_, pin) = board_with_pin(&store, &alice).await;

        assert!(store.add_like(&bob, pin.id).await.unwrap().is_some());
        assert!(store.add_like(&bob, pin.id).await.unwrap().is_none());
        assert!(store.add_like(&alice, pin.id).await.unwrap().is_some());
        assert_eq!(store.count_likes(pin.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn deleting_a_board_cascades() {
        let store = MemoryStore::default();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let (board, pin) = board_with_pin(&store, &alice).await;
        let comment = store
            .create_comment(&bob, pin.id, "nice".into())
            .await
            .unwrap();
        store.add_like(&bob, pin.id).await.unwrap();

        let proof = OwnershipGuard.authorize(&alice, board.clone()).unwrap();
        store.delete_board(proof).await.unwrap();

        assert!(store.board_by_id(board.id).await.unwrap().is_none());
        assert!(store.pin_by_id(pin.id).await.unwrap().is_none());
        assert!(store.comment_by_id(comment.id).await.unwrap().is_none());
        assert_eq!(store.count_likes(pin.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deleting_a_user_removes_their_records() {
        let store = MemoryStore::default();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let (_, pin) = board_with_pin(&store, &alice).await;
        store.create_comment(&bob, pin.id, "hi".into()).await.unwrap();
        store.add_like(&bob, pin.id).await.unwrap();

        let bob_row = store.user_by_id(bob.user_id).await.unwrap().unwrap();
        let proof = OwnershipGuard.authorize(&bob, bob_row).unwrap();
        store.delete_user(proof).await.unwrap();

        assert!(store.find_by_username("bob").await.unwrap().is_none());
        assert!(store.comments_for_pin(pin.id).await.unwrap().is_empty());
        assert_eq!(store.count_likes(pin.id).await.unwrap(), 0);
        assert!(store.pin_by_id(pin.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn listings_are_newest_first() {
        let store = MemoryStore::default();
        let alice = user(&store, "alice").await;
        for title in ["first", "second"] {
            store
                .create_board(
                    &alice,
                    NewBoard {
                        title: title.into(),
                        description: None,
                        visibility: "public".into(),
                    },
                )
                .await
                .unwrap();
        }
        let titles: Vec<String> = store
            .list_boards(Some(alice.user_id))
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, ["second", "first"]);
    }
}
