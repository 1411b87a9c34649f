//! Email + password accounts and opaque session tokens.
//!
//! Passwords are stored as argon2id PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`).
//! Session tokens are random hex strings handed to the client once; only their
//! SHA-256 is persisted.

use argon2::{
    Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version,
    password_hash::{self, PasswordHash, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, TimeDelta, Utc};
use db::{
    models::{auth_session::AuthSession, user::User},
    validation::{self, ValidationError},
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::config::{Config, DEFAULT_SESSION_TTL_HOURS};

const SESSION_TOKEN_LEN: usize = 32;
/// Longest accepted session lifetime; larger configured values fall back to the default.
const MAX_SESSION_TTL_DAYS: i64 = 3650;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Session is missing, expired or revoked")]
    SessionInvalid,
    #[error("Stored password hash is malformed")]
    MalformedHash,
    #[error("Password hashing failed: {0}")]
    Hashing(password_hash::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// The caller's session as exposed by `GET /api/auth/session`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
pub struct SessionInfo {
    pub user: User,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// An authenticated caller, attached to each protected request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: User,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl From<RequestContext> for SessionInfo {
    fn from(ctx: RequestContext) -> Self {
        Self {
            user: ctx.user,
            session_id: ctx.session_id,
            expires_at: ctx.expires_at,
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    session_ttl: TimeDelta,
    password_min_length: usize,
    hasher: Argon2<'static>,
}

impl AuthService {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        Self {
            pool,
            session_ttl: session_ttl(config.session_ttl_hours),
            password_min_length: config.password_min_length,
            hasher: Argon2::default(),
        }
    }

    /// Override the argon2 cost for newly stored passwords.
    ///
    /// Invalid combinations keep the current cost. Stored hashes carry their
    /// own parameters, so verification is unaffected.
    pub fn with_hash_cost(mut self, memory_kib: u32, iterations: u32) -> Self {
        match Params::new(memory_kib, iterations, 1, None) {
            Ok(params) => self.hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            Err(e) => warn!(memory_kib, iterations, error = %e, "Ignoring invalid argon2 cost"),
        }
        self
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = validation::normalize_email(email)?;
        validation::validate_password(password, self.password_min_length)?;

        let password_hash = hash_password(&self.hasher, password)?;
        match User::create(&self.pool, &email, &password_hash).await {
            Ok(user) => {
                info!(user_id = %user.id, "User signed up");
                Ok(user)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AuthError::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let email = validation::normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let Some(credentials) = User::find_credentials_by_email(&self.pool, &email).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(&self.hasher, password, &credentials.password_hash)? {
            warn!(user_id = %credentials.id, "Rejected login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = generate_session_token();
        let expires_at = Utc::now() + self.session_ttl;
        let session =
            AuthSession::create(&self.pool, credentials.id, &hash_session_token(&token), expires_at)
                .await?;

        info!(user_id = %credentials.id, session_id = %session.id, "User logged in");
        Ok(LoginResponse {
            token,
            expires_at: session.expires_at,
            user: credentials.into_user(),
        })
    }

    /// Resolve a bearer token into its user, touching the session on success.
    pub async fn authenticate(&self, token: &str) -> Result<RequestContext, AuthError> {
        let session = AuthSession::find_by_token_hash(&self.pool, &hash_session_token(token))
            .await?
            .filter(|s| s.is_active(Utc::now()))
            .ok_or(AuthError::SessionInvalid)?;

        let user = User::find_by_id(&self.pool, session.user_id)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if let Err(e) = AuthSession::touch(&self.pool, session.id).await {
            warn!(session_id = %session.id, error = %e, "Failed to touch session");
        }

        Ok(RequestContext {
            user,
            session_id: session.id,
            expires_at: session.expires_at,
        })
    }

    /// The caller's session, or `None` for anonymous or stale tokens.
    pub async fn session(&self, token: Option<&str>) -> Result<Option<SessionInfo>, AuthError> {
        let Some(token) = token else {
            return Ok(None);
        };
        match self.authenticate(token).await {
            Ok(ctx) => Ok(Some(ctx.into())),
            Err(AuthError::SessionInvalid) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn logout(&self, session_id: Uuid) -> Result<(), AuthError> {
        AuthSession::revoke(&self.pool, session_id).await?;
        info!(%session_id, "Session revoked");
        Ok(())
    }

    /// Drop expired and revoked sessions. Returns the number removed.
    pub async fn purge_inactive_sessions(&self) -> Result<u64, AuthError> {
        Ok(AuthSession::delete_inactive(&self.pool, Utc::now()).await?)
    }
}

fn session_ttl(hours: i64) -> TimeDelta {
    TimeDelta::try_hours(hours)
        .filter(|ttl| *ttl > TimeDelta::zero() && *ttl <= TimeDelta::days(MAX_SESSION_TTL_DAYS))
        .unwrap_or_else(|| {
            warn!(
                hours,
                default = DEFAULT_SESSION_TTL_HOURS,
                "session_ttl_hours out of range, using default"
            );
            TimeDelta::hours(DEFAULT_SESSION_TTL_HOURS)
        })
}

pub fn generate_session_token() -> String {
    let bytes: [u8; SESSION_TOKEN_LEN] = rand::rng().random();
    hex::encode(bytes)
}

pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash `password` into a PHC string with a fresh random salt.
pub fn hash_password(hasher: &Argon2<'_>, password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(AuthError::Hashing)
}

/// Check `password` against a stored PHC string, using the parameters it records.
pub fn verify_password(
    hasher: &Argon2<'_>,
    password: &str,
    stored: &str,
) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|_| AuthError::MalformedHash)?;
    match hasher.verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hashing(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Argon2<'static> {
        Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(Params::MIN_M_COST, 1, 1, None).unwrap(),
        )
    }

    #[test]
    fn password_hash_round_trip() {
        let stored = hash_password(&cheap(), "correct horse").unwrap();
        assert!(stored.starts_with("$argon2id$v=19$"));
        assert!(verify_password(&cheap(), "correct horse", &stored).unwrap());
        assert!(!verify_password(&cheap(), "wrong horse", &stored).unwrap());
    }

    #[test]
    fn verification_uses_the_stored_parameters() {
        let stored = hash_password(&cheap(), "pw").unwrap();
        assert!(verify_password(&Argon2::default(), "pw", &stored).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(
            hash_password(&cheap(), "same").unwrap(),
            hash_password(&cheap(), "same").unwrap()
        );
    }

    #[test]
    fn malformed_hashes_are_rejected() {
        for stored in [
            "",
            "plain",
            "pbkdf2-sha256$1$00$00",
            "$argon2id$v=19$m=8,t=1,p=1$!!!!$!!!!",
        ] {
            assert!(matches!(
                verify_password(&cheap(), "pw", stored),
                Err(AuthError::MalformedHash)
            ));
        }
    }

    #[test]
    fn session_tokens_are_random_hex() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_eq!(a.len(), SESSION_TOKEN_LEN * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert_eq!(hash_session_token(&a).len(), 64);
        assert_ne!(hash_session_token(&a), a);
    }

    #[test]
    fn out_of_range_session_ttl_falls_back_to_default() {
        let default = TimeDelta::hours(DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(session_ttl(12), TimeDelta::hours(12));
        assert_eq!(session_ttl(i64::MAX), default);
        assert_eq!(session_ttl(i64::MAX / 3600), default);
        assert_eq!(session_ttl(0), default);
        assert_eq!(session_ttl(-5), default);
    }

    #[tokio::test]
    async fn huge_configured_ttl_does_not_panic() {
        let (pool, _dir) = db::test_utils::create_test_pool().await;
        let config = Config {
            session_ttl_hours: i64::MAX,
            ..Config::default()
        };
        let auth = AuthService::new(pool, &config).with_hash_cost(Params::MIN_M_COST, 1);
        auth.signup("ada@example.com", "secret1").await.unwrap();
        let login = auth.login("ada@example.com", "secret1").await.unwrap();
        let ttl = login.expires_at - Utc::now();
        assert!(ttl <= TimeDelta::hours(DEFAULT_SESSION_TTL_HOURS));
        assert!(ttl > TimeDelta::hours(DEFAULT_SESSION_TTL_HOURS - 1));
    }
}
