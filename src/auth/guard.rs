use std::fmt;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::{error::AuthError, principal::Principal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Account,
    Board,
    Pin,
    Comment,
    Like,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Account => "account",
            Self::Board => "board",
            Self::Pin => "pin",
            Self::Comment => "comment",
            Self::Like => "like",
        })
    }
}

/// A record with exactly one owning user, fixed at creation.
pub trait OwnedResource {
    const KIND: ResourceKind;

    /// The direct owner. For a like this is the user who liked, not the
    /// pin's owner.
    fn owner_user_id(&self) -> Uuid;
}

/// Proof that `principal` passed the ownership check for `resource`.
///
/// Only [`OwnershipGuard::authorize`] can build one, and every store
/// mutation of an existing record takes it by value.
#[derive(Debug)]
pub struct Authorized<R> {
    principal: Principal,
    resource: R,
}

impl<R> Authorized<R> {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn into_inner(self) -> R {
        self.resource
    }
}

/// Owner-only write policy. No admin bypass, no inherited ownership: the
/// owner of a pin cannot delete someone else's comment on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipGuard;

impl OwnershipGuard {
    pub fn authorize_mutation(
        &self,
        principal: &Principal,
        kind: ResourceKind,
        owner_user_id: Uuid,
    ) -> Result<(), AuthError> {
        if principal.user_id == owner_user_id {
            return Ok(());
        }
        warn!(
            user_id = %principal.user_id,
            %owner_user_id,
            %kind,
            "mutation denied: not the owner"
        );
        Err(AuthError::Forbidden(kind))
    }

    pub fn authorize<R: OwnedResource>(
        &self,
        principal: &Principal,
        resource: R,
    ) -> Result<Authorized<R>, AuthError> {
        self.authorize_mutation(principal, R::KIND, resource.owner_user_id())?;
        Ok(Authorized {
            principal: principal.clone(),
            resource,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Note {
        owner: Uuid,
    }

    impl OwnedResource for Note {
        const KIND: ResourceKind = ResourceKind::Comment;

        fn owner_user_id(&self) -> Uuid {
            self.owner
        }
    }

    fn principal(name: &str) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            username: name.into(),
        }
    }

    #[test]
    fn owner_is_allowed() {
        let u1 = principal("u1");
        assert!(OwnershipGuard
            .authorize_mutation(&u1, ResourceKind::Board, u1.user_id)
            .is_ok());
    }

    #[test]
    fn non_owner_is_forbidden() {
        let u1 = principal("u1");
        let u2 = principal("u2");
        let err = OwnershipGuard
            .authorize_mutation(&u2, ResourceKind::Board, u1.user_id)
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(ResourceKind::Board)));
    }

    #[test]
    fn authorize_wraps_resource_for_owner() {
        let u1 = principal("u1");
        let authorized = OwnershipGuard
            .authorize(&u1, Note { owner: u1.user_id })
            .unwrap();
        assert_eq!(authorized.principal(), &u1);
        assert_eq!(authorized.into_inner().owner, u1.user_id);
    }

    #[test]
    fn authorize_reports_kind_of_resource() {
        let u1 = principal("u1");
        let u2 = principal("u2");
        let err = OwnershipGuard
            .authorize(&u2, Note { owner: u1.user_id })
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(ResourceKind::Comment)));
        assert_eq!(err.to_string(), "principal does not own this comment");
    }
}
