use serde::{Deserialize, Serialize};

/// Closed set of account roles. Anything else in the database is a decode
/// error, not a fourth role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Owner,
    Admin,
}

/// Roles allowed to manage listings.
pub const OWNER_ROLES: &[Role] = &[Role::Owner, Role::Admin];
/// Roles allowed on administrative routes.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Owner => "owner",
            Role::Admin => "admin",
        }
    }

    /// Membership test against a handler's required set.
    pub fn satisfies(&self, required: &[Role]) -> bool {
        required.contains(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"owner\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"admin\"").unwrap(),
            Role::Admin
        );
    }

    #[test]
    fn rejects_unknown_role() {
        assert!(serde_json::from_str::<Role>("\"superuser\"").is_err());
    }

    #[test]
    fn owner_routes_admit_owner_and_admin() {
        assert!(Role::Owner.satisfies(OWNER_ROLES));
        assert!(Role::Admin.satisfies(OWNER_ROLES));
        assert!(!Role::User.satisfies(OWNER_ROLES));
    }

    #[test]
    fn admin_routes_admit_admin_only() {
        assert!(Role::Admin.satisfies(ADMIN_ROLES));
        assert!(!Role::Owner.satisfies(ADMIN_ROLES));
        assert!(!Role::User.satisfies(ADMIN_ROLES));
    }
}
