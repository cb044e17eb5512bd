use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" | "User" => Ok(UserRole::User),
            "admin" | "Admin" => Ok(UserRole::Admin),
            _ => Err(format!("Unknown UserRole: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub suspended_until: Option<DateTime<Utc>>,
    pub permanently_suspended: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(username: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            role,
            suspended_until: None,
            permanently_suspended: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_suspended_at(&self, now: DateTime<Utc>) -> bool {
        self.permanently_suspended || self.suspended_until.is_some_and(|until| until > now)
    }
}
