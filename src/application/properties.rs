//! Listing queries and owner-scoped mutations.

use std::sync::Arc;

use leasehold_api_types::{
    CreatePropertyInput, DeletedOutput, PropertyList, PropertyListInput, PropertyView,
    UpdatePropertyInput,
};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::application::repos::{
    NewProperty, PropertiesRepo, PropertyPage, PropertyQueryFilter, RepoError,
};
use crate::domain::error::DomainError;
use crate::domain::locale::Locale;
use crate::domain::properties::{PropertyDraft, PropertyRecord};
use crate::domain::slug::{self, SlugError, slug_for_title};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum PropertyError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("property not found")]
    NotFound,
    #[error("only the owner may change this listing")]
    NotOwner,
    #[error("slug `{0}` is already in use")]
    SlugTaken(String),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for PropertyError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => PropertyError::NotFound,
            other => PropertyError::Repo(other),
        }
    }
}

#[derive(Clone)]
pub struct PropertyService {
    repo: Arc<dyn PropertiesRepo>,
}

impl PropertyService {
    pub fn new(repo: Arc<dyn PropertiesRepo>) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        input: PropertyListInput,
        locale: Locale,
    ) -> Result<PropertyList, PropertyError> {
        let limit = page_size(input.limit)?;
        let offset = input.offset.unwrap_or(0) as usize;
        let filter = PropertyQueryFilter {
            city: input.city.filter(|city| !city.trim().is_empty()),
            min_rent: input.min_rent,
            max_rent: input.max_rent,
            bedrooms: input.bedrooms,
            owner_id: None,
        };

        let page = self.repo.list_properties(&filter, limit, offset).await?;
        Ok(to_list(page, locale))
    }

    pub async fn mine(&self, owner_id: i64, locale: Locale) -> Result<PropertyList, PropertyError> {
        let filter = PropertyQueryFilter {
            owner_id: Some(owner_id),
            ..Default::default()
        };
        let page = self.repo.list_properties(&filter, usize::MAX, 0).await?;
        Ok(to_list(page, locale))
    }

    pub async fn by_id(&self, id: i64, locale: Locale) -> Result<PropertyView, PropertyError> {
        let record = self.repo.find_property(id).await?.ok_or(PropertyError::NotFound)?;
        Ok(record.view(locale))
    }

    pub async fn by_slug(&self, slug: &str, locale: Locale) -> Result<PropertyView, PropertyError> {
        let record = self
            .repo
            .find_property_by_slug(slug)
            .await?
            .ok_or(PropertyError::NotFound)?;
        Ok(record.view(locale))
    }

    pub async fn create(
        &self,
        owner_id: i64,
        input: CreatePropertyInput,
        locale: Locale,
    ) -> Result<PropertyView, PropertyError> {
        let draft = PropertyDraft::from_input(input)?;
        let slug = self.free_slug(&draft.title).await?;

        let record = self
            .repo
            .insert_property(NewProperty {
                owner_id,
                slug: slug.clone(),
                draft,
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => PropertyError::SlugTaken(slug),
                other => other.into(),
            })?;

        info!(
            target = "leasehold::properties",
            property_id = record.id,
            owner_id,
            slug = %record.slug,
            "listing created"
        );
        Ok(record.view(locale))
    }

    pub async fn update(
        &self,
        owner_id: i64,
        input: UpdatePropertyInput,
        locale: Locale,
    ) -> Result<PropertyView, PropertyError> {
        let mut record = self.owned(owner_id, input.id).await?;
        record.apply_update(input, OffsetDateTime::now_utc())?;
        let saved = self.repo.save_property(record).await?;
        Ok(saved.view(locale))
    }

    pub async fn delete(&self, owner_id: i64, id: i64) -> Result<DeletedOutput, PropertyError> {
        self.owned(owner_id, id).await?;
        self.repo.delete_property(id).await?;
        info!(target = "leasehold::properties", property_id = id, owner_id, "listing deleted");
        Ok(DeletedOutput { id, deleted: true })
    }

    async fn owned(&self, owner_id: i64, id: i64) -> Result<PropertyRecord, PropertyError> {
        let record = self.repo.find_property(id).await?.ok_or(PropertyError::NotFound)?;
        if record.owner_id != owner_id {
            return Err(PropertyError::NotOwner);
        }
        Ok(record)
    }

    async fn free_slug(&self, title: &str) -> Result<String, PropertyError> {
        let base = slug_for_title(title)?;
        for candidate in slug::candidates(&base) {
            if !self.repo.slug_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(SlugError::Exhausted(base).into())
    }
}

fn page_size(limit: Option<u32>) -> Result<usize, DomainError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(DomainError::validation(
            "limit",
            format!("must be between 1 and {MAX_PAGE_SIZE}"),
        ));
    }
    Ok(limit as usize)
}

fn to_list(page: PropertyPage, locale: Locale) -> PropertyList {
    PropertyList {
        items: page.items.iter().map(|record| record.view(locale)).collect(),
        total: page.total,
    }
}
