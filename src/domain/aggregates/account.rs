//! Customer and admin principals.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Registered customer. `password_hash` is an argon2 PHC string.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String { format!("{} {}", self.first_name, self.last_name).trim().to_string() }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            age: self.age,
            created_at: self.created_at,
        }
    }
}

/// The user as returned over the API: no credential material.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Changes to a profile. `None` leaves the column as is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,
    pub password_hash: Option<String>,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_hides_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "zain@example.com".into(),
            password_hash: "$argon2id$v=19$...".into(),
            first_name: "Zain".into(),
            last_name: "Ahmed".into(),
            age: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(user.profile()).unwrap();
        assert_eq!(json["firstName"], "Zain");
        assert!(json.get("passwordHash").is_none());
        assert_eq!(user.full_name(), "Zain Ahmed");
    }
}
