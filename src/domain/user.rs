//! User domain entity, roles and account status.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

string_enum! {
    /// Staff roles, strongest first
    pub enum UserRole {
        Admin => "admin",
        Manager => "manager",
        Operator => "operator",
        Viewer => "viewer",
    }
}

impl UserRole {
    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Whether this role may perform an action that requires `required`.
    ///
    /// Admin passes everything, manager everything but admin-only actions,
    /// operator operator and viewer actions, viewer only viewer actions.
    pub fn has_permission(&self, required: UserRole) -> bool {
        self.rank() >= required.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            UserRole::Admin => 3,
            UserRole::Manager => 2,
            UserRole::Operator => 1,
            UserRole::Viewer => 0,
        }
    }
}

string_enum! {
    /// Account status. Only active accounts can sign in.
    pub enum UserStatus {
        Active => "active",
        Inactive => "inactive",
        Blocked => "blocked",
    }
}

/// User domain entity
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft delete timestamp (None = live, Some = deleted)
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Live and in `active` status
    pub fn can_sign_in(&self) -> bool {
        !self.is_deleted() && self.status == UserStatus::Active
    }
}

/// Data needed to insert a user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
}

/// Partial user update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, serde::Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "clerk@tea-logistics.local")]
    pub email: String,
    #[schema(example = "Mei Lin")]
    pub name: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
            deleted_at: user.deleted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_hierarchy_table() {
        use UserRole::*;

        let expected = [
            (Admin, [true, true, true, true]),
            (Manager, [false, true, true, true]),
            (Operator, [false, false, true, true]),
            (Viewer, [false, false, false, true]),
        ];

        for (role, row) in expected {
            for (required, allowed) in [Admin, Manager, Operator, Viewer].into_iter().zip(row) {
                assert_eq!(
                    role.has_permission(required),
                    allowed,
                    "{} requiring {}",
                    role,
                    required
                );
            }
        }
    }

    #[test]
    fn role_parses_from_storage_value() {
        assert_eq!("manager".parse::<UserRole>().unwrap(), UserRole::Manager);
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn only_live_active_users_can_sign_in() {
        let now = Utc::now();
        let mut user = User {
            id: Uuid::new_v4(),
            email: "a@b.c".into(),
            password_hash: String::new(),
            name: "A".into(),
            role: UserRole::Viewer,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        assert!(user.can_sign_in());

        user.status = UserStatus::Blocked;
        assert!(!user.can_sign_in());

        user.status = UserStatus::Active;
        user.deleted_at = Some(now);
        assert!(!user.can_sign_in());
    }
}
