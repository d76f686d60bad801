//! Caller identity and capability checks.
//!
//! Capabilities are derived from the account's role flags once, when the
//! caller is resolved from the session, and passed explicitly to every service
//! operation.

use serde::Serialize;
use uuid::Uuid;

use crate::models::User;

/// Snapshot of an authenticated account.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            is_active: user.is_active,
        }
    }
}

/// What a caller is allowed to do beyond managing their own content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Edit, delete, or feature any post, and delete any comment.
    pub can_moderate_posts: bool,
    pub can_manage_categories: bool,
    pub can_manage_users: bool,
}

impl Identity {
    pub fn capabilities(&self) -> Capabilities {
        if !self.is_active {
            return Capabilities::default();
        }
        Capabilities {
            can_moderate_posts: self.is_staff || self.is_superuser,
            can_manage_categories: self.is_superuser,
            can_manage_users: self.is_superuser,
        }
    }
}

/// The principal on whose behalf an operation runs.
#[derive(Debug, Clone)]
pub enum Caller {
    Anonymous,
    Authenticated(Identity),
}

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(identity) => Some(identity),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.identity().map(|i| i.user_id)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.identity()
            .map(Identity::capabilities)
            .unwrap_or_default()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Whether the caller authored the record, or may moderate anyone's posts.
    pub fn owns_or_moderates(&self, author_id: Uuid) -> bool {
        self.user_id() == Some(author_id) || self.capabilities().can_moderate_posts
    }
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self::Authenticated(Identity::from(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(is_staff: bool, is_superuser: bool, is_active: bool) -> Identity {
        Identity {
            user_id: Uuid::now_v7(),
            username: "tester".to_string(),
            is_staff,
            is_superuser,
            is_active,
        }
    }

    #[test]
    fn regular_user_has_no_capabilities() {
        assert_eq!(
            identity(false, false, true).capabilities(),
            Capabilities::default()
        );
    }

    #[test]
    fn staff_can_moderate_but_not_administer() {
        let caps = identity(true, false, true).capabilities();
        assert!(caps.can_moderate_posts);
        assert!(!caps.can_manage_categories);
        assert!(!caps.can_manage_users);
    }

    #[test]
    fn superuser_has_every_capability() {
        let caps = identity(false, true, true).capabilities();
        assert!(caps.can_moderate_posts);
        assert!(caps.can_manage_categories);
        assert!(caps.can_manage_users);
    }

    #[test]
    fn inactive_accounts_hold_nothing() {
        assert_eq!(
            identity(true, true, false).capabilities(),
            Capabilities::default()
        );
    }

    #[test]
    fn ownership_check() {
        let author = identity(false, false, true);
        let author_id = author.user_id;
        let caller = Caller::Authenticated(author);
        assert!(caller.owns_or_moderates(author_id));
        assert!(!caller.owns_or_moderates(Uuid::now_v7()));
        assert!(!Caller::Anonymous.owns_or_moderates(author_id));
    }
}
