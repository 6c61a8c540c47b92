use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::shared::types::errors::DomainError;

/// User role. `Admin` implicitly satisfies any role requirement; the other
/// roles only satisfy themselves (see [`UserRole::satisfies`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Admin,
    Dba,
    Viewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Dba => "dba",
            UserRole::Viewer => "viewer",
        }
    }

    /// The single role-override rule: admins pass every check, everyone
    /// else needs an exact match.
    pub fn satisfies(&self, required: &UserRole) -> bool {
        matches!(self, UserRole::Admin) || self == required
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Viewer
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "dba" => Ok(UserRole::Dba),
            "viewer" => Ok(UserRole::Viewer),
            other => Err(DomainError::Validation(format!("Unknown role '{other}'"))),
        }
    }
}

/// User account record.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_satisfies_every_role() {
        assert!(UserRole::Admin.satisfies(&UserRole::Admin));
        assert!(UserRole::Admin.satisfies(&UserRole::Dba));
        assert!(UserRole::Admin.satisfies(&UserRole::Viewer));
    }

    #[test]
    fn non_admin_roles_need_exact_match() {
        assert!(UserRole::Dba.satisfies(&UserRole::Dba));
        assert!(!UserRole::Dba.satisfies(&UserRole::Admin));
        assert!(!UserRole::Viewer.satisfies(&UserRole::Dba));
    }

    #[test]
    fn parses_role_strings_case_insensitively() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("DBA".parse::<UserRole>().unwrap(), UserRole::Dba);
        assert!("superuser".parse::<UserRole>().is_err());
    }
}
