//! `AuthToken`/`AuthUser` — the immutable snapshot an OAuth exchange
//! produces and the trimmed view handlers see on the request bag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything validated from a successful OAuth exchange. Never mutated
/// after construction — a refreshed or re-issued token replaces the cached
/// entry wholesale rather than editing one in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub value: String,
    pub sub: String,
    pub email: String,
    pub name: String,
    pub permissions: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// The user view exposed to handlers and scope checks — everything about
/// `AuthToken` except the bearer value and its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub permissions: Vec<String>,
}

impl From<&AuthToken> for AuthUser {
    fn from(token: &AuthToken) -> Self {
        AuthUser {
            sub: token.sub.clone(),
            email: token.email.clone(),
            name: token.name.clone(),
            permissions: token.permissions.clone(),
        }
    }
}
