//! Wire types shared between the Leasehold RPC server and its clients.
//!
//! Every procedure input and output that crosses the `/trpc` boundary is
//! declared here so that clients can deserialize responses without pulling
//! in the server crate.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Languages the site serves content in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Zh];

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh",
        }
    }

    /// Exact, case-sensitive match against the supported tags.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|locale| locale.as_str() == tag)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSuccess<T> {
    pub result: RpcResultData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResultData<T> {
    pub data: T,
}

impl<T> RpcSuccess<T> {
    pub fn new(data: T) -> Self {
        Self {
            result: RpcResultData { data },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcFailure {
    pub error: RpcErrorShape,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorShape {
    pub message: String,
    /// JSON-RPC 2.0 numeric code.
    pub code: i32,
    pub data: RpcErrorData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcErrorData {
    pub code: String,
    pub http_status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

// ---------------------------------------------------------------------------
// auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutput {
    pub authenticated: bool,
    pub user_id: Option<i64>,
    pub locale: Locale,
}

// ---------------------------------------------------------------------------
// users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub preferred_locale: Option<Locale>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdInput {
    pub id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub preferred_locale: Option<Locale>,
}

// ---------------------------------------------------------------------------
// properties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertyListInput {
    pub city: Option<String>,
    pub min_rent: Option<u32>,
    pub max_rent: Option<u32>,
    pub bedrooms: Option<u8>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyIdInput {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySlugInput {
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyInput {
    pub title: String,
    #[serde(default)]
    pub title_zh: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_zh: Option<String>,
    pub city: String,
    #[serde(default)]
    pub address: String,
    pub monthly_rent: u32,
    pub bedrooms: u8,
    pub bathrooms: u8,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePropertyInput {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_zh: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_zh: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub monthly_rent: Option<u32>,
    #[serde(default)]
    pub bedrooms: Option<u8>,
    #[serde(default)]
    pub bathrooms: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyView {
    pub id: i64,
    pub slug: String,
    pub owner_id: i64,
    pub title: String,
    pub title_zh: Option<String>,
    pub description: String,
    pub description_zh: Option<String>,
    /// Title in the caller's negotiated locale.
    pub display_title: String,
    pub display_description: String,
    pub city: String,
    pub address: String,
    pub monthly_rent: u32,
    pub bedrooms: u8,
    pub bathrooms: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyList {
    pub items: Vec<PropertyView>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedOutput {
    pub id: i64,
    pub deleted: bool,
}
