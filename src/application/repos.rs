//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::locale::Locale;
use crate::domain::properties::{PropertyDraft, PropertyRecord};
use crate::domain::users::UserRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: &'static str },
    #[error("resource not found")]
    NotFound,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_salt: String,
    pub password_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserParams {
    pub name: Option<String>,
    pub preferred_locale: Option<Locale>,
}

#[derive(Debug, Clone)]
pub struct NewProperty {
    pub owner_id: i64,
    pub slug: String,
    pub draft: PropertyDraft,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct PropertyQueryFilter {
    /// Case-insensitive exact city match.
    pub city: Option<String>,
    pub min_rent: Option<u32>,
    pub max_rent: Option<u32>,
    pub bedrooms: Option<u8>,
    pub owner_id: Option<i64>,
}

impl PropertyQueryFilter {
    pub fn matches(&self, record: &PropertyRecord) -> bool {
        self.city
            .as_deref()
            .is_none_or(|city| record.city.eq_ignore_ascii_case(city.trim()))
            && self.min_rent.is_none_or(|min| record.monthly_rent >= min)
            && self.max_rent.is_none_or(|max| record.monthly_rent <= max)
            && self.bedrooms.is_none_or(|beds| record.bedrooms == beds)
            && self.owner_id.is_none_or(|owner| record.owner_id == owner)
    }
}

#[derive(Debug, Clone)]
pub struct PropertyPage {
    pub items: Vec<PropertyRecord>,
    pub total: usize,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, RepoError>;

    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn update_user(
        &self,
        id: i64,
        params: UpdateUserParams,
        now: OffsetDateTime,
    ) -> Result<UserRecord, RepoError>;
}

#[async_trait]
pub trait PropertiesRepo: Send + Sync {
    async fn insert_property(&self, property: NewProperty) -> Result<PropertyRecord, RepoError>;

    async fn find_property(&self, id: i64) -> Result<Option<PropertyRecord>, RepoError>;

    async fn find_property_by_slug(&self, slug: &str)
    -> Result<Option<PropertyRecord>, RepoError>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError>;

    /// Newest first.
    async fn list_properties(
        &self,
        filter: &PropertyQueryFilter,
        limit: usize,
        offset: usize,
    ) -> Result<PropertyPage, RepoError>;

    async fn save_property(&self, property: PropertyRecord) -> Result<PropertyRecord, RepoError>;

    async fn delete_property(&self, id: i64) -> Result<(), RepoError>;
}
