use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Platform role attached to an account.
///
/// Resolved once from the credential store and carried in session claims.
/// An unrecognised stored value is an error, never a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Assigned to newly provisioned accounts.
    #[default]
    Student,
    Teacher,
    Expert,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Expert => "expert",
            Role::Admin => "admin",
        }
    }

    /// Roles that manage other users' content (teachers, experts, admins).
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Student)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "expert" => Ok(Role::Expert),
            "admin" => Ok(Role::Admin),
            other => Err(AuthError::RoleLookupFailed(format!(
                "unrecognised role {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Student, Role::Teacher, Role::Expert, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_role_is_an_error() {
        assert!(matches!(
            "superuser".parse::<Role>(),
            Err(AuthError::RoleLookupFailed(_))
        ));
        assert!("Student".parse::<Role>().is_err());
    }

    #[test]
    fn test_staff_roles() {
        assert!(!Role::Student.is_staff());
        assert!(Role::Teacher.is_staff());
        assert!(Role::Admin.is_staff());
    }
}
