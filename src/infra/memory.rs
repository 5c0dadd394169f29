//! Process-local repositories backed by concurrent maps.
//!
//! Unique indexes (user email, property slug) are claimed through the map's
//! entry API, so two concurrent inserts for the same key cannot both succeed.
//! Identifiers are assigned from monotonically increasing counters; listing
//! order "newest first" is therefore descending id.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use time::OffsetDateTime;

use crate::application::repos::{
    NewProperty, NewUser, PropertiesRepo, PropertyPage, PropertyQueryFilter, RepoError,
    UpdateUserParams, UsersRepo,
};
use crate::domain::properties::PropertyRecord;
use crate::domain::users::UserRecord;

const EMAIL_CONSTRAINT: &str = "users_email_key";
const SLUG_CONSTRAINT: &str = "properties_slug_key";

#[derive(Debug)]
pub struct InMemoryRepositories {
    next_user_id: AtomicI64,
    next_property_id: AtomicI64,
    users: DashMap<i64, UserRecord>,
    user_emails: DashMap<String, i64>,
    properties: DashMap<i64, PropertyRecord>,
    property_slugs: DashMap<String, i64>,
}

impl Default for InMemoryRepositories {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self {
            next_user_id: AtomicI64::new(1),
            next_property_id: AtomicI64::new(1),
            users: DashMap::new(),
            user_emails: DashMap::new(),
            properties: DashMap::new(),
            property_slugs: DashMap::new(),
        }
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepositories {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, RepoError> {
        let slot = match self.user_emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(RepoError::Duplicate {
                    constraint: EMAIL_CONSTRAINT,
                });
            }
            Entry::Vacant(slot) => slot,
        };

        let id = self.next_user_id.fetch_add(1, Ordering::Relaxed);
        let record = UserRecord {
            id,
            email: user.email,
            name: user.name,
            password_salt: user.password_salt,
            password_hash: user.password_hash,
            preferred_locale: None,
            created_at: user.created_at,
            updated_at: user.created_at,
        };
        self.users.insert(id, record.clone());
        slot.insert(id);
        Ok(record)
    }

    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let Some(id) = self.user_emails.get(email).map(|id| *id) else {
            return Ok(None);
        };
        self.find_user(id).await
    }

    async fn update_user(
        &self,
        id: i64,
        params: UpdateUserParams,
        now: OffsetDateTime,
    ) -> Result<UserRecord, RepoError> {
        let mut user = self.users.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(name) = params.name {
            user.name = name;
        }
        if let Some(locale) = params.preferred_locale {
            user.preferred_locale = Some(locale);
        }
        user.updated_at = now;
        Ok(user.clone())
    }
}

#[async_trait]
impl PropertiesRepo for InMemoryRepositories {
    async fn insert_property(&self, property: NewProperty) -> Result<PropertyRecord, RepoError> {
        let slot = match self.property_slugs.entry(property.slug.clone()) {
            Entry::Occupied(_) => {
                return Err(RepoError::Duplicate {
                    constraint: SLUG_CONSTRAINT,
                });
            }
            Entry::Vacant(slot) => slot,
        };

        let id = self.next_property_id.fetch_add(1, Ordering::Relaxed);
        let draft = property.draft;
        let record = PropertyRecord {
            id,
            slug: property.slug,
            owner_id: property.owner_id,
            title: draft.title,
            title_zh: draft.title_zh,
            description: draft.description,
            description_zh: draft.description_zh,
            city: draft.city,
            address: draft.address,
            monthly_rent: draft.monthly_rent,
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            created_at: property.created_at,
            updated_at: property.created_at,
        };
        self.properties.insert(id, record.clone());
        slot.insert(id);
        Ok(record)
    }

    async fn find_property(&self, id: i64) -> Result<Option<PropertyRecord>, RepoError> {
        Ok(self.properties.get(&id).map(|record| record.clone()))
    }

    async fn find_property_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<PropertyRecord>, RepoError> {
        let Some(id) = self.property_slugs.get(slug).map(|id| *id) else {
            return Ok(None);
        };
        self.find_property(id).await
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        Ok(self.property_slugs.contains_key(slug))
    }

    async fn list_properties(
        &self,
        filter: &PropertyQueryFilter,
        limit: usize,
        offset: usize,
    ) -> Result<PropertyPage, RepoError> {
        let mut matching: Vec<PropertyRecord> = self
            .properties
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));

        let total = matching.len();
        let items = matching.into_iter().skip(offset).take(limit).collect();
        Ok(PropertyPage { items, total })
    }

    async fn save_property(&self, property: PropertyRecord) -> Result<PropertyRecord, RepoError> {
        let mut stored = self
            .properties
            .get_mut(&property.id)
            .ok_or(RepoError::NotFound)?;
        if stored.slug != property.slug {
            return Err(RepoError::Persistence(format!(
                "slug of property {} is immutable",
                property.id
            )));
        }
        *stored = property.clone();
        Ok(property)
    }

    async fn delete_property(&self, id: i64) -> Result<(), RepoError> {
        let (_, removed) = self.properties.remove(&id).ok_or(RepoError::NotFound)?;
        self.property_slugs.remove(&removed.slug);
        Ok(())
    }
}
