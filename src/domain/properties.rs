//! Rental listings and the rules a listing must satisfy.

use leasehold_api_types::{CreatePropertyInput, PropertyView, UpdatePropertyInput};
use time::OffsetDateTime;

use super::error::DomainError;
use super::locale::Locale;

pub const MAX_TITLE_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRecord {
    pub id: i64,
    pub slug: String,
    pub owner_id: i64,
    pub title: String,
    pub title_zh: Option<String>,
    pub description: String,
    pub description_zh: Option<String>,
    pub city: String,
    pub address: String,
    pub monthly_rent: u32,
    pub bedrooms: u8,
    pub bathrooms: u8,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated listing content, before it has an id or slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDraft {
    pub title: String,
    pub title_zh: Option<String>,
    pub description: String,
    pub description_zh: Option<String>,
    pub city: String,
    pub address: String,
    pub monthly_rent: u32,
    pub bedrooms: u8,
    pub bathrooms: u8,
}

impl PropertyDraft {
    pub fn from_input(input: CreatePropertyInput) -> Result<Self, DomainError> {
        Ok(Self {
            title: required_text("title", &input.title, MAX_TITLE_CHARS)?,
            title_zh: optional_text("titleZh", input.title_zh, MAX_TITLE_CHARS)?,
            description: input.description.trim().to_string(),
            description_zh: input
                .description_zh
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            city: required_text("city", &input.city, MAX_TITLE_CHARS)?,
            address: input.address.trim().to_string(),
            monthly_rent: positive_rent(input.monthly_rent)?,
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
        })
    }
}

impl PropertyRecord {
    /// Apply a partial update in place. Nothing is modified if any field is invalid.
    pub fn apply_update(
        &mut self,
        update: UpdatePropertyInput,
        now: OffsetDateTime,
    ) -> Result<(), DomainError> {
        let mut next = self.clone();

        if let Some(title) = update.title {
            next.title = required_text("title", &title, MAX_TITLE_CHARS)?;
        }
        if let Some(title_zh) = update.title_zh {
            next.title_zh = optional_text("titleZh", Some(title_zh), MAX_TITLE_CHARS)?;
        }
        if let Some(description) = update.description {
            next.description = description.trim().to_string();
        }
        if let Some(description_zh) = update.description_zh {
            let trimmed = description_zh.trim();
            next.description_zh = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(city) = update.city {
            next.city = required_text("city", &city, MAX_TITLE_CHARS)?;
        }
        if let Some(address) = update.address {
            next.address = address.trim().to_string();
        }
        if let Some(rent) = update.monthly_rent {
            next.monthly_rent = positive_rent(rent)?;
        }
        if let Some(bedrooms) = update.bedrooms {
            next.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = update.bathrooms {
            next.bathrooms = bathrooms;
        }

        next.updated_at = now;
        *self = next;
        Ok(())
    }

    pub fn view(&self, locale: Locale) -> PropertyView {
        let (display_title, display_description) = match locale {
            Locale::Zh => (
                self.title_zh.clone().unwrap_or_else(|| self.title.clone()),
                self.description_zh
                    .clone()
                    .unwrap_or_else(|| self.description.clone()),
            ),
            Locale::En => (self.title.clone(), self.description.clone()),
        };

        PropertyView {
            id: self.id,
            slug: self.slug.clone(),
            owner_id: self.owner_id,
            title: self.title.clone(),
            title_zh: self.title_zh.clone(),
            description: self.description.clone(),
            description_zh: self.description_zh.clone(),
            display_title,
            display_description,
            city: self.city.clone(),
            address: self.address.clone(),
            monthly_rent: self.monthly_rent,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn required_text(field: &'static str, raw: &str, max: usize) -> Result<String, DomainError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    if value.chars().count() > max {
        return Err(DomainError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(value.to_string())
}

fn optional_text(
    field: &'static str,
    raw: Option<String>,
    max: usize,
) -> Result<Option<String>, DomainError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => required_text(field, value, max).map(Some),
    }
}

fn positive_rent(rent: u32) -> Result<u32, DomainError> {
    if rent == 0 {
        return Err(DomainError::validation("monthlyRent", "must be greater than zero"));
    }
    Ok(rent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CreatePropertyInput {
        CreatePropertyInput {
            title: " Sunny two-bedroom ".to_string(),
            title_zh: Some("阳光两居室".to_string()),
            description: "Near the park".to_string(),
            description_zh: Some("  ".to_string()),
            city: "Shanghai".to_string(),
            address: "1 Park Road".to_string(),
            monthly_rent: 8_000,
            bedrooms: 2,
            bathrooms: 1,
        }
    }

    fn record() -> PropertyRecord {
        let draft = PropertyDraft::from_input(input()).expect("valid draft");
        let now = OffsetDateTime::now_utc();
        PropertyRecord {
            id: 1,
            slug: "sunny-two-bedroom".to_string(),
            owner_id: 7,
            title: draft.title,
            title_zh: draft.title_zh,
            description: draft.description,
            description_zh: draft.description_zh,
            city: draft.city,
            address: draft.address,
            monthly_rent: draft.monthly_rent,
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn draft_trims_and_drops_blank_translations() {
        let draft = PropertyDraft::from_input(input()).expect("valid draft");
        assert_eq!(draft.title, "Sunny two-bedroom");
        assert_eq!(draft.description_zh, None);
    }

    #[test]
    fn draft_rejects_zero_rent_and_blank_city() {
        let mut bad = input();
        bad.monthly_rent = 0;
        assert!(PropertyDraft::from_input(bad).is_err());

        let mut bad = input();
        bad.city = " ".to_string();
        assert_eq!(
            PropertyDraft::from_input(bad),
            Err(DomainError::validation("city", "must not be empty"))
        );
    }

    #[test]
    fn view_localizes_with_fallback() {
        let record = record();
        let zh = record.view(Locale::Zh);
        assert_eq!(zh.display_title, "阳光两居室");
        assert_eq!(zh.display_description, "Near the park");

        let en = record.view(Locale::En);
        assert_eq!(en.display_title, "Sunny two-bedroom");
    }

    #[test]
    fn failed_update_leaves_record_untouched() {
        let mut record = record();
        let before = record.clone();
        let update = UpdatePropertyInput {
            id: record.id,
            title: Some("New title".to_string()),
            title_zh: None,
            description: None,
            description_zh: None,
            city: None,
            address: None,
            monthly_rent: Some(0),
            bedrooms: None,
            bathrooms: None,
        };

        assert!(record.apply_update(update, OffsetDateTime::now_utc()).is_err());
        assert_eq!(record, before);
    }
}
