use std::sync::Arc;

use leasehold_api_types::{PublicUser, UpdateProfileInput, UserProfile};
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::repos::{RepoError, UpdateUserParams, UsersRepo};
use crate::domain::error::DomainError;
use crate::domain::users::normalize_name;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for UserError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => UserError::NotFound,
            other => UserError::Repo(other),
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UsersRepo>,
}

impl UserService {
    pub fn new(users: Arc<dyn UsersRepo>) -> Self {
        Self { users }
    }

    pub async fn profile(&self, user_id: i64) -> Result<UserProfile, UserError> {
        let user = self.users.find_user(user_id).await?.ok_or(UserError::NotFound)?;
        Ok(user.profile())
    }

    pub async fn public_profile(&self, user_id: i64) -> Result<PublicUser, UserError> {
        let user = self.users.find_user(user_id).await?.ok_or(UserError::NotFound)?;
        Ok(user.public())
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<UserProfile, UserError> {
        let name = input.name.as_deref().map(normalize_name).transpose()?;
        let user = self
            .users
            .update_user(
                user_id,
                UpdateUserParams {
                    name,
                    preferred_locale: input.preferred_locale,
                },
                OffsetDateTime::now_utc(),
            )
            .await?;
        Ok(user.profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repos::NewUser;
    use crate::domain::locale::Locale;
    use crate::infra::memory::InMemoryRepositories;

    async fn seeded() -> (UserService, i64) {
        let repos = Arc::new(InMemoryRepositories::new());
        let user = repos
            .insert_user(NewUser {
                email: "lin@example.com".to_string(),
                name: "Lin".to_string(),
                password_salt: "salt".to_string(),
                password_hash: vec![0; 32],
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .expect("insert");
        (UserService::new(repos), user.id)
    }

    #[tokio::test]
    async fn update_profile_changes_only_given_fields() {
        let (users, id) = seeded().await;
        let updated = users
            .update_profile(
                id,
                UpdateProfileInput {
                    name: None,
                    preferred_locale: Some(Locale::Zh),
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.name, "Lin");
        assert_eq!(updated.preferred_locale, Some(Locale::Zh));
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (users, id) = seeded().await;
        let err = users
            .update_profile(
                id,
                UpdateProfileInput {
                    name: Some("  ".to_string()),
                    preferred_locale: None,
                },
            )
            .await
            .expect_err("blank name");
        assert!(matches!(err, UserError::Domain(_)));
    }

    #[tokio::test]
    async fn unknown_users_are_not_found() {
        let (users, _) = seeded().await;
        assert!(matches!(users.public_profile(999).await, Err(UserError::NotFound)));
        assert!(matches!(
            users.update_profile(999, UpdateProfileInput::default()).await,
            Err(UserError::NotFound)
        ));
    }
}
