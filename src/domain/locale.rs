//! Locale negotiation from request headers.

pub use leasehold_api_types::Locale;

/// Header a client sets to pin the response language explicitly.
pub const LOCALE_HEADER: &str = "x-locale";

/// Resolve the response locale.
///
/// Precedence: an explicit `x-locale` value naming a supported locale, then the
/// primary subtag of the first `Accept-Language` entry, then [`Locale::En`].
pub fn negotiate(explicit: Option<&str>, accept_language: Option<&str>) -> Locale {
    explicit
        .and_then(Locale::from_tag)
        .or_else(|| accept_language.and_then(preferred_from_accept_language))
        .unwrap_or_default()
}

/// Only the first (most preferred) entry is consulted; quality weights on later
/// entries are ignored.
fn preferred_from_accept_language(header: &str) -> Option<Locale> {
    let first = header.split(',').next()?;
    let range = first.split(';').next()?.trim();
    let primary = range.split('-').next()?;
    if primary.is_empty() {
        return None;
    }
    Locale::from_tag(&primary.to_ascii_lowercase())
}
