//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Admin => "admin",
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

/// Outcome of recording a lesson completion for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// A new completion record was persisted.
    Recorded,
    /// A completion record for this (user, lesson) pair already existed.
    AlreadyCompleted,
    /// No lesson with the requested id exists.
    UnknownLesson,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_strings_match_database_enum() {
        assert_eq!(UserRole::Student.as_str(), "student");
        assert_eq!(UserRole::Admin.as_str(), "admin");
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Student.is_admin());
    }
}
