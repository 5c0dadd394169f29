//! Account registration and credential checks.

use std::sync::Arc;

use leasehold_api_types::{AuthPayload, LoginInput, RegisterInput};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{NewUser, RepoError, UsersRepo};
use crate::application::tokens::{TokenError, TokenService};
use crate::domain::error::DomainError;
use crate::domain::users::{UserRecord, normalize_email, normalize_name, validate_password};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("an account already exists for this email")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for AuthError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { .. } => AuthError::EmailTaken,
            other => AuthError::Repo(other),
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    pub async fn register(&self, input: RegisterInput) -> Result<AuthPayload, AuthError> {
        // Checked before the insert so no account is created without a token.
        if !self.tokens.is_configured() {
            return Err(TokenError::NotConfigured.into());
        }

        let email = normalize_email(&input.email)?;
        let name = normalize_name(&input.name)?;
        validate_password(&input.password)?;

        let salt = Uuid::new_v4().simple().to_string();
        let user = self
            .users
            .insert_user(NewUser {
                email,
                name,
                password_hash: hash_password(&salt, &input.password),
                password_salt: salt,
                created_at: OffsetDateTime::now_utc(),
            })
            .await?;

        info!(target = "leasehold::auth", user_id = user.id, "registered account");
        self.payload_for(&user)
    }

    pub async fn login(&self, input: LoginInput) -> Result<AuthPayload, AuthError> {
        let email = normalize_email(&input.email).map_err(|_| AuthError::InvalidCredentials)?;
        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let presented = hash_password(&user.password_salt, &input.password);
        if user.password_hash.as_slice().ct_eq(presented.as_slice()).unwrap_u8() == 0 {
            return Err(AuthError::InvalidCredentials);
        }

        self.payload_for(&user)
    }

    fn payload_for(&self, user: &UserRecord) -> Result<AuthPayload, AuthError> {
        Ok(AuthPayload {
            token: self.tokens.issue(user.id)?,
            user: user.profile(),
        })
    }
}

fn hash_password(salt: &str, password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}
