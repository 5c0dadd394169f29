//! URL slugs for listings.
//!
//! Titles are often written in Chinese, so ideographs are transliterated to
//! pinyin (`pinyin` crate) before ASCII slugification (`slug` crate):
//! “静安两居室” becomes `jing-an-liang-ju-shi`.

use pinyin::ToPinyin;
use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("cannot derive a slug from empty text")]
    Empty,
    #[error("`{0}` has no characters usable in a slug")]
    Unrepresentable(String),
    #[error("no free slug left for `{0}`")]
    Exhausted(String),
}

pub fn slug_for_title(title: &str) -> Result<String, SlugError> {
    if title.trim().is_empty() {
        return Err(SlugError::Empty);
    }

    let slug = slugify(transliterate(title));
    if slug.is_empty() {
        return Err(SlugError::Unrepresentable(title.to_string()));
    }
    Ok(slug)
}

/// `base`, then `base-2`, `base-3`, … up to the suffix limit.
pub fn candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string()).chain((2..=MAX_SUFFIX + 1).map(move |n| format!("{base}-{n}")))
}

fn transliterate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (ch, py) in input.chars().zip(input.to_pinyin()) {
        match py {
            Some(py) => {
                if !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
                out.push_str(py.plain());
                out.push(' ');
            }
            None => out.push(ch),
        }
    }
    out
}
