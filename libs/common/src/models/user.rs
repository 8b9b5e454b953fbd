//! User model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub avatar: Option<String>,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user creation payload
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Already hashed; stores never see plain passwords
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub avatar: Option<String>,
}

/// Columns of `users` that a partial update may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Username,
    Email,
    PasswordHash,
    GoogleId,
    Avatar,
    IsEmailVerified,
}

impl UserField {
    /// Storage column backing this field
    pub const fn column(self) -> &'static str {
        match self {
            UserField::Username => "username",
            UserField::Email => "email",
            UserField::PasswordHash => "password_hash",
            UserField::GoogleId => "google_id",
            UserField::Avatar => "avatar",
            UserField::IsEmailVerified => "is_email_verified",
        }
    }
}

/// Value written by a partial update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValue {
    Text(String),
    Flag(bool),
}

/// User update payload; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub avatar: Option<String>,
    pub is_email_verified: Option<bool>,
}

impl UserChanges {
    /// The supplied fields, in a fixed column order
    pub fn assignments(&self) -> Vec<(UserField, UpdateValue)> {
        let text = [
            (UserField::Username, &self.username),
            (UserField::Email, &self.email),
            (UserField::PasswordHash, &self.password_hash),
            (UserField::GoogleId, &self.google_id),
            (UserField::Avatar, &self.avatar),
        ];

        let mut out: Vec<(UserField, UpdateValue)> = text
            .into_iter()
            .filter_map(|(field, value)| value.clone().map(|v| (field, UpdateValue::Text(v))))
            .collect();

        if let Some(flag) = self.is_email_verified {
            out.push((UserField::IsEmailVerified, UpdateValue::Flag(flag)));
        }

        out
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }

    /// Apply the change set to an in-memory user
    pub fn apply_to(&self, user: &mut User) {
        for (field, value) in self.assignments() {
            match (field, value) {
                (UserField::Username, UpdateValue::Text(v)) => user.username = v,
                (UserField::Email, UpdateValue::Text(v)) => user.email = v,
                (UserField::PasswordHash, UpdateValue::Text(v)) => user.password_hash = Some(v),
                (UserField::GoogleId, UpdateValue::Text(v)) => user.google_id = Some(v),
                (UserField::Avatar, UpdateValue::Text(v)) => user.avatar = Some(v),
                (UserField::IsEmailVerified, UpdateValue::Flag(v)) => user.is_email_verified = v,
                _ => {}
            }
        }
    }
}
