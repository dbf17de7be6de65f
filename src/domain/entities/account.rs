use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::errors::ValidationError;

/// Role of a registered user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Customer => "Customer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Admin" => Ok(Role::Admin),
            "Customer" => Ok(Role::Customer),
            other => Err(ValidationError::UnknownVariant {
                field: "usertype",
                value: other.to_string(),
            }),
        }
    }
}

/// Validated registration data, before the password is hashed
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub tax_id: Option<String>,
}

impl NewAccount {
    pub fn new(
        username: &str,
        email: &str,
        role: &str,
        tax_id: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::MissingField("username"));
        }

        let email = normalize_email(email)?;
        let role = role.parse::<Role>()?;

        // An empty tax id is treated as absent so it does not collide on the unique index
        let tax_id = tax_id
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| t.to_uppercase());

        Ok(NewAccount {
            username: username.to_string(),
            email,
            role,
            tax_id,
        })
    }
}

/// Trim and lowercase an email address, rejecting obviously malformed input
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::MissingField("email"));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(email.to_lowercase())
        }
        _ => Err(ValidationError::InvalidEmail(email.to_string())),
    }
}
