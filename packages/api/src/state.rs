use std::{sync::Arc, time::Duration};

use anyhow::Context;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;

use crate::error::ApiError;
use crate::jwt::{Claims, TokenType};
use crate::mail::mail_client_from_env;
use crate::notify::Notifier;

pub type AppState = Arc<State>;

pub struct State {
    pub db: DatabaseConnection,
    pub notifier: Notifier,
    /// Product-offer listing cache, keyed by the canonical filter string
    pub offer_cache: moka::sync::Cache<String, Value>,
    jwt_encoding: EncodingKey,
    jwt_decoding: DecodingKey,
}

impl State {
    pub async fn from_env() -> anyhow::Result<Self> {
        let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let mut opt = ConnectOptions::new(db_url);
        opt.max_connections(10)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .sqlx_logging(false);
        let db = Database::connect(opt)
            .await
            .context("Failed to connect to database")?;

        let secret = std::env::var("AUTH_SECRET").context("AUTH_SECRET must be set")?;

        let mail_client = match mail_client_from_env() {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!("Failed to initialize mail client: {:#}", err);
                None
            }
        };
        let manager_email = std::env::var("SHOP_MANAGER_EMAIL").ok();
        let notifier = Notifier::spawn(db.clone(), mail_client, manager_email);

        Ok(Self::from_parts(db, &secret, notifier))
    }

    /// Assemble a state from already-built pieces. `from_env` delegates
    /// here; tests use it with an in-memory database and a sink notifier.
    pub fn from_parts(db: DatabaseConnection, auth_secret: &str, notifier: Notifier) -> Self {
        Self {
            db,
            notifier,
            offer_cache: moka::sync::Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(60))
                .build(),
            jwt_encoding: EncodingKey::from_secret(auth_secret.as_bytes()),
            jwt_decoding: DecodingKey::from_secret(auth_secret.as_bytes()),
        }
    }

    pub fn sign_token(&self, user_id: i32, token_type: TokenType) -> Result<String, ApiError> {
        let claims = Claims::new(user_id, token_type);
        Ok(encode(&Header::default(), &claims, &self.jwt_encoding)?)
    }

    /// Validate signature and expiry, then check the token is of the
    /// expected type so a refresh token cannot be used as an access token.
    pub fn validate_token(&self, token: &str, expected: TokenType) -> Result<Claims, ApiError> {
        let decoded = decode::<Claims>(token, &self.jwt_decoding, &Validation::default())?;
        let claims = decoded.claims;
        if claims.token_type != expected {
            return Err(ApiError::unauthorized("wrong token type"));
        }
        Ok(claims)
    }

    pub fn get_cache<T>(&self, key: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.offer_cache
            .get(key)
            .and_then(|json_value| serde_json::from_value(json_value).ok())
    }

    pub fn set_cache<T>(&self, key: String, value: T)
    where
        T: serde::Serialize,
    {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.offer_cache.insert(key, json_value);
        }
    }

    pub fn invalidate_cache_all(&self) {
        self.offer_cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::TokenType;

    fn bare_state() -> State {
        let (notifier, _rx) = Notifier::sink();
        State::from_parts(DatabaseConnection::Disconnected, "test-secret", notifier)
    }

    #[test]
    fn token_roundtrip() {
        let state = bare_state();
        let token = state.sign_token(7, TokenType::Access).unwrap();
        let claims = state.validate_token(&token, TokenType::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), 7);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let state = bare_state();
        let token = state.sign_token(7, TokenType::Refresh).unwrap();
        assert!(state.validate_token(&token, TokenType::Access).is_err());
        assert!(state.validate_token(&token, TokenType::Refresh).is_ok());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let state = bare_state();
        let mut token = state.sign_token(7, TokenType::Access).unwrap();
        token.push('x');
        assert!(state.validate_token(&token, TokenType::Access).is_err());
    }
}
