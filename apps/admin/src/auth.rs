//! # Sessions
//!
//! Password sign-in for dashboard users and the signed session tokens that
//! carry the [`Actor`] between requests.
//!
//! ## Session Lifecycle
//! ```text
//! login(email, password)
//!     │  argon2 verify against UserDirectory
//!     ▼
//! Session { token (HS256 JWT), actor, expires_at }
//!     │
//!     ├── authenticate(token) → Actor      (signature, expiry, revocation)
//!     │
//!     └── logout(token)       → jti added to the revocation set
//! ```
//!
//! The revocation set only needs to outlive the token, so entries are pruned
//! once their `exp` has passed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use keystone_core::validation::{validate_email, validate_name};
use keystone_core::{Actor, ValidationError};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. The two are not distinguished.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Session has been signed out")]
    SessionRevoked,

    #[error("User already exists: {0}")]
    DuplicateUser(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Failed to issue token: {0}")]
    Token(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

fn lock<T>(mutex: &Mutex<T>) -> AuthResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AuthError::Internal("session lock poisoned".to_string()))
}

// =============================================================================
// Password Hashing
// =============================================================================

/// Hashes a password with argon2 and a random salt (PHC string format).
pub fn hash_password(password: &str) -> AuthResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// User Directory
// =============================================================================

/// A dashboard user able to sign in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub password_hash: String,
}

impl UserAccount {
    pub fn actor(&self) -> Actor {
        Actor::new(&self.id, &self.name, &self.email, &self.role)
    }
}

/// Sign-in accounts keyed by lowercased email.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<String, UserAccount>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user, hashing `password`. Emails are unique case-insensitively.
    pub fn add_user(
        &mut self,
        name: &str,
        email: &str,
        role: &str,
        password: &str,
    ) -> AuthResult<UserAccount> {
        validate_name("name", name)?;
        validate_email(email)?;
        if role.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "role".to_string(),
            }
            .into());
        }
        if password.len() < 8 {
            return Err(ValidationError::OutOfRange {
                field: "password length".to_string(),
                min: 8,
                max: 1024,
            }
            .into());
        }

        let key = email.trim().to_lowercase();
        if self.users.contains_key(&key) {
            return Err(AuthError::DuplicateUser(key));
        }

        let account = UserAccount {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: key.clone(),
            role: role.to_string(),
            password_hash: hash_password(password)?,
        };
        debug!(email = %account.email, role = %account.role, "Added user");
        self.users.insert(key, account.clone());
        Ok(account)
    }

    pub fn find_by_email(&self, email: &str) -> Option<&UserAccount> {
        self.users.get(&email.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

// =============================================================================
// Tokens
// =============================================================================

/// JWT claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub name: String,

    pub email: String,

    /// Role id at sign-in time
    pub role: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID, used for revocation
    pub jti: String,
}

impl Claims {
    fn actor(&self) -> Actor {
        Actor {
            id: self.sub.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

/// A signed-in session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub actor: Actor,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// Session Manager
// =============================================================================

/// Issues, validates and revokes session tokens.
///
/// ## Usage
/// ```rust,ignore
/// let session = sessions.login("ana@example.com", "correct horse")?;
/// let actor = sessions.authenticate(&session.token)?;
/// sessions.logout(&session.token)?;
/// ```
pub struct SessionManager {
    secret: String,
    ttl_secs: i64,
    directory: RwLock<UserDirectory>,
    /// Revoked jti → token expiry (Unix timestamp).
    revoked: Mutex<HashMap<String, i64>>,
}

impl SessionManager {
    pub fn new(secret: impl Into<String>, ttl_secs: i64, directory: UserDirectory) -> Self {
        SessionManager {
            secret: secret.into(),
            ttl_secs,
            directory: RwLock::new(directory),
            revoked: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a user to the directory backing this manager.
    pub fn register(
        &self,
        name: &str,
        email: &str,
        role: &str,
        password: &str,
    ) -> AuthResult<Actor> {
        let mut directory = self
            .directory
            .write()
            .map_err(|_| AuthError::Internal("user directory lock poisoned".to_string()))?;
        Ok(directory.add_user(name, email, role, password)?.actor())
    }

    /// Verifies credentials and issues a token.
    pub fn login(&self, email: &str, password: &str) -> AuthResult<Session> {
        let account = {
            let directory = self
                .directory
                .read()
                .map_err(|_| AuthError::Internal("user directory lock poisoned".to_string()))?;
            directory.find_by_email(email).cloned()
        };

        let Some(account) = account else {
            warn!(email = %email, "Sign-in for unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &account.password_hash) {
            warn!(email = %account.email, "Sign-in with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.issue(account.actor())?;
        info!(user_id = %session.actor.id, role = ?session.actor.role, "Signed in");
        Ok(session)
    }

    fn issue(&self, actor: Actor) -> AuthResult<Session> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.ttl_secs);

        let claims = Claims {
            sub: actor.id.clone(),
            name: actor.name.clone(),
            email: actor.email.clone(),
            role: actor.role.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Token(e.to_string()))?;

        Ok(Session {
            token,
            actor,
            expires_at: exp,
        })
    }

    fn validate_token(&self, token: &str) -> AuthResult<Claims> {
        let validation = Validation::default();

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims)
    }

    /// Resolves a token to its actor, rejecting signed-out sessions.
    pub fn authenticate(&self, token: &str) -> AuthResult<Actor> {
        let claims = self.validate_token(token)?;

        if lock(&self.revoked)?.contains_key(&claims.jti) {
            return Err(AuthError::SessionRevoked);
        }

        Ok(claims.actor())
    }

    /// Signs a session out. The token is rejected from then on.
    pub fn logout(&self, token: &str) -> AuthResult<()> {
        let claims = self.validate_token(token)?;
        let now = Utc::now().timestamp();

        let mut revoked = lock(&self.revoked)?;
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(claims.jti, claims.exp);

        let expires_at = Utc.timestamp_opt(claims.exp, 0).single();
        info!(user_id = %claims.sub, ?expires_at, "Signed out");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
