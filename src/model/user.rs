use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::FieldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

// Public profile: everything except the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

// Summary shape joined into booking listings: name and email only.
#[derive(Debug, Clone, Serialize)]
pub struct UserBrief {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserBrief {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    let mut parts = value.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl RegisterInput {
    // Emails are stored lowercased so the unique index catches case-variant
    // duplicates.
    pub fn validate(self) -> Result<(String, String, String), Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Some(name.to_string()),
            _ => {
                errors.push(FieldError::new("name", "name is required"));
                None
            }
        };
        let email = match self.email.as_deref().map(str::trim) {
            Some(email) if looks_like_email(email) => Some(email.to_lowercase()),
            _ => {
                errors.push(FieldError::new("email", "email must be a valid email address"));
                None
            }
        };
        let password = match self.password {
            Some(password) if password.len() >= 6 => Some(password),
            _ => {
                errors.push(FieldError::new(
                    "password",
                    "password must be at least 6 characters",
                ));
                None
            }
        };

        match (name, email, password) {
            (Some(name), Some(email), Some(password)) => Ok((name, email, password)),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginInput {
    pub fn validate(self) -> Result<(String, String), Vec<FieldError>> {
        let mut errors = Vec::new();

        let email = match self.email.as_deref().map(str::trim) {
            Some(email) if looks_like_email(email) => Some(email.to_lowercase()),
            _ => {
                errors.push(FieldError::new("email", "email must be a valid email address"));
                None
            }
        };
        let password = match self.password {
            Some(password) if !password.is_empty() => Some(password),
            _ => {
                errors.push(FieldError::new("password", "password is required"));
                None
            }
        };

        match (email, password) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_normalizes_the_email() {
        let input = RegisterInput {
            name: Some("Jess".into()),
            email: Some("  Jess@Example.COM ".into()),
            password: Some("hunter22".into()),
        };
        let (name, email, _) = input.validate().unwrap();
        assert_eq!(name, "Jess");
        assert_eq!(email, "jess@example.com");
    }

    #[test]
    fn registration_reports_every_bad_field() {
        let input = RegisterInput {
            name: Some("  ".into()),
            email: Some("not-an-email".into()),
            password: Some("tiny".into()),
        };
        let errors = input.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "password"]);
    }

    #[test]
    fn email_shape_check_wants_a_dotted_domain() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a@.co"));
        assert!(!looks_like_email("a.b.co"));
    }

    #[test]
    fn user_response_never_carries_the_hash() {
        let user = User {
            id: Some(ObjectId::new()),
            name: "Jess".into(),
            email: "jess@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::User,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "user");
    }
}
