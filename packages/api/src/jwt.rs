//! First-party JWT claims for the access/refresh token pair.
//!
//! Tokens are signed with HS256 using the shared `AUTH_SECRET`; signing
//! and validation live on [`crate::state::State`], which holds the keys.

use serde::{Deserialize, Serialize};

/// Token type - determines what the token can be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived token sent as `Authorization: Bearer` on API calls
    Access,
    /// Long-lived token exchanged for fresh access tokens
    Refresh,
}

impl TokenType {
    /// Get the default TTL in seconds for this token type
    pub fn default_ttl_seconds(&self) -> i64 {
        match self {
            TokenType::Access => 60 * 60,            // 1 hour
            TokenType::Refresh => 30 * 24 * 60 * 60, // 30 days
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a string, per JWT convention
    pub sub: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: i32, token_type: TokenType) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            token_type,
            iat: now,
            exp: now + token_type.default_ttl_seconds(),
        }
    }

    pub fn user_id(&self) -> Result<i32, crate::error::ApiError> {
        Ok(self.sub.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_claims_carry_sub_and_expiry() {
        let claims = Claims::new(42, TokenType::Access);
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.exp - claims.iat, TokenType::Access.default_ttl_seconds());
    }
}
