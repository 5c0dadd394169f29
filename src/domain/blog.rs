//! Blog posts sourced from Markdown files with a YAML front-matter block.
//!
//! Parsing is pure: callers hand over the slug and the raw file contents and
//! receive a [`BlogPost`] with its excerpt already derived.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use serde_yaml::Value as YamlValue;
use thiserror::Error;
use tracing::warn;
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

pub const EXCERPT_CHARS: usize = 150;
const EXCERPT_SUFFIX: &str = "...";
const FRONT_MATTER_DELIMITER: &str = "---";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub slug: String,
    pub title: String,
    pub title_en: Option<String>,
    pub date_published: String,
    pub keywords: Vec<String>,
    pub schema: Value,
    pub content: String,
    pub excerpt: String,
    #[serde(skip)]
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Error)]
pub enum BlogParseError {
    #[error("front-matter is not valid YAML: {0}")]
    FrontMatter(#[from] serde_yaml::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FrontMatter {
    #[serde(deserialize_with = "lenient_text")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    title_en: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    date_published: Option<String>,
    #[serde(deserialize_with = "lenient_keywords")]
    keywords: Option<Vec<String>>,
    schema: Option<Value>,
}

/// Scalars are rendered as text; any other shape is dropped so one odd field
/// does not hide the whole post.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<YamlValue>::deserialize(deserializer)?;
    Ok(value.and_then(|value| {
        let text = scalar_text(&value);
        if text.is_none() && !value.is_null() {
            warn!(target = "leasehold::blog", "ignoring non-scalar front-matter text field");
        }
        text
    }))
}

/// A list of scalars, or a single scalar standing for a one-element list.
fn lenient_keywords<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<YamlValue>::deserialize(deserializer)?;
    let keywords = match value {
        None | Some(YamlValue::Null) => Vec::new(),
        Some(YamlValue::Sequence(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(other) => match scalar_text(&other) {
            Some(keyword) => vec![keyword],
            None => {
                warn!(target = "leasehold::blog", "ignoring keywords that are not a list");
                Vec::new()
            }
        },
    };
    Ok(Some(keywords))
}

fn scalar_text(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(text) => Some(text.clone()),
        YamlValue::Number(number) => Some(number.to_string()),
        YamlValue::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

impl BlogPost {
    pub fn parse(slug: impl Into<String>, raw: &str) -> Result<Self, BlogParseError> {
        let (matter, body) = split_front_matter(raw);
        let front = match matter {
            Some(yaml) if !yaml.trim().is_empty() => {
                serde_yaml::from_str::<Option<FrontMatter>>(yaml)?.unwrap_or_default()
            }
            _ => FrontMatter::default(),
        };

        let date_published = front.date_published.unwrap_or_default();
        let published_at = parse_published_at(&date_published);
        let schema = match front.schema {
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(value) => value,
        };

        Ok(Self {
            slug: slug.into(),
            title: front.title.unwrap_or_default(),
            title_en: front.title_en,
            date_published,
            keywords: front.keywords.unwrap_or_default(),
            schema,
            excerpt: derive_excerpt(body),
            content: body.to_string(),
            published_at,
        })
    }
}

/// Split a leading `---` fenced block from the Markdown body.
///
/// Returns `(None, raw)` when the file does not open with a fence. An opening
/// fence with no closing fence treats the rest of the file as front-matter.
fn split_front_matter(raw: &str) -> (Option<&str>, &str) {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let Some(rest) = raw.strip_prefix(FRONT_MATTER_DELIMITER) else {
        return (None, raw);
    };
    if rest.starts_with('-') {
        return (None, raw);
    }

    let (opening_tail, after_open) = rest.split_once('\n').unwrap_or((rest, ""));
    let language = opening_tail.trim();
    if !language.is_empty() && language != "yaml" {
        return (None, raw);
    }

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        if bare == FRONT_MATTER_DELIMITER {
            let matter = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return (Some(matter), body);
        }
        offset += line.len();
    }

    (Some(after_open), "")
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_published_at(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed);
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

/// Build a short plain-text teaser for listings.
///
/// Heading lines are dropped and the remaining lines joined with spaces. When
/// the text contains a run of CJK ideographs (two ideographs with no ASCII
/// letter between them) that run is preferred, otherwise the text opens the
/// excerpt. Either way at most [`EXCERPT_CHARS`] characters are kept.
///
/// Lengths count Unicode scalar values, and CRLF line endings are normalised
/// by `lines()`.
pub fn derive_excerpt(body: &str) -> String {
    let cleaned = body
        .lines()
        .map(|line| if line.starts_with('#') { "" } else { line })
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = cleaned.trim();

    let source = first_cjk_run(cleaned).unwrap_or(cleaned);
    let truncated: String = source.chars().take(EXCERPT_CHARS).collect();
    format!("{}{EXCERPT_SUFFIX}", truncated.trim())
}

fn is_cjk(ch: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&ch)
}

/// First span that starts and ends with a CJK ideograph and contains no ASCII
/// letters. The span is extended as far as possible.
fn first_cjk_run(text: &str) -> Option<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut cursor = 0;

    while cursor < chars.len() {
        let start = (cursor..chars.len()).find(|&idx| is_cjk(chars[idx].1))?;

        let mut end = None;
        let mut idx = start + 1;
        while idx < chars.len() && !chars[idx].1.is_ascii_alphabetic() {
            if is_cjk(chars[idx].1) {
                end = Some(idx);
            }
            idx += 1;
        }

        if let Some(end) = end {
            let (last_offset, last_char) = chars[end];
            return Some(&text[chars[start].0..last_offset + last_char.len_utf8()]);
        }
        cursor = idx;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const BILINGUAL: &str = "---\ntitle: 租房指南\ntitleEn: Renting Guide\ndatePublished: 2024-03-01\nkeywords:\n  - rent\n  - guide\nschema:\n  \"@type\": Article\n---\n# 租房指南\n\n在上海租房需要注意很多事情。\n\nRenting in Shanghai takes care.\n";

    #[test]
    fn parses_front_matter_and_body() {
        let post = BlogPost::parse("guide", BILINGUAL).expect("parse");

        assert_eq!(post.slug, "guide");
        assert_eq!(post.title, "租房指南");
        assert_eq!(post.title_en.as_deref(), Some("Renting Guide"));
        assert_eq!(post.date_published, "2024-03-01");
        assert_eq!(post.keywords, vec!["rent", "guide"]);
        assert_eq!(post.schema["@type"], "Article");
        assert!(post.content.starts_with("# 租房指南"));
        assert!(post.published_at.is_some());
    }

    #[test]
    fn excerpt_prefers_cjk_run() {
        let post = BlogPost::parse("guide", BILINGUAL).expect("parse");
        assert_eq!(post.excerpt, "在上海租房需要注意很多事情...");
    }

    #[test]
    fn excerpt_falls_back_to_leading_text() {
        let body = "# Heading\n\n".to_string() + &"word ".repeat(60);
        let excerpt = derive_excerpt(&body);

        assert!(excerpt.ends_with("..."));
        assert!(!excerpt.contains("Heading"));
        assert!(excerpt.chars().count() <= EXCERPT_CHARS + 3);
    }

    #[test]
    fn cjk_excerpt_is_truncated() {
        let body = "中".repeat(400);
        let excerpt = derive_excerpt(&body);
        assert_eq!(excerpt.chars().count(), EXCERPT_CHARS + 3);
    }

    #[test]
    fn single_ideograph_is_not_a_run() {
        assert_eq!(first_cjk_run("abc 中 def"), None);
        assert_eq!(first_cjk_run("中 x 文字"), Some("文字"));
        assert_eq!(first_cjk_run("中，文 ok"), Some("中，文"));
    }

    #[test]
    fn missing_front_matter_uses_whole_file() {
        let post = BlogPost::parse("plain", "Just text.\n").expect("parse");
        assert_eq!(post.title, "");
        assert_eq!(post.content, "Just text.\n");
        assert_eq!(post.schema, Value::Object(Map::new()));
        assert!(post.keywords.is_empty());
        assert!(post.published_at.is_none());
    }

    #[test]
    fn null_schema_becomes_empty_object() {
        let post = BlogPost::parse("n", "---\ntitle: T\nschema: null\n---\nbody").expect("parse");
        assert_eq!(post.schema, Value::Object(Map::new()));
        assert_eq!(post.content, "body");
    }

    #[test]
    fn mistyped_fields_keep_the_post() {
        let post = BlogPost::parse(
            "loose",
            "---\ntitle: 2024\nkeywords: rent\nschema: {}\n---\nbody",
        )
        .expect("parse");
        assert_eq!(post.title, "2024");
        assert_eq!(post.keywords, vec!["rent"]);

        let post = BlogPost::parse("odd", "---\ntitle: [a, b]\nkeywords:\n  k: v\n---\nbody")
            .expect("parse");
        assert_eq!(post.title, "");
        assert!(post.keywords.is_empty());

        let post = BlogPost::parse("mixed", "---\nkeywords: [rent, 3, {k: v}]\n---\nbody")
            .expect("parse");
        assert_eq!(post.keywords, vec!["rent", "3"]);
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let result = BlogPost::parse("bad", "---\ntitle: [unterminated\n---\nbody");
        assert!(result.is_err());
    }

    #[test]
    fn published_at_accepts_rfc3339_and_dates() {
        assert!(parse_published_at("2024-05-06T10:00:00Z").is_some());
        assert!(parse_published_at("2024-05-06").is_some());
        assert!(parse_published_at("May 6").is_none());
    }

    #[test]
    fn serializes_camel_case_fields() {
        let post = BlogPost::parse("guide", BILINGUAL).expect("parse");
        let json = serde_json::to_value(&post).expect("serialize");
        assert_eq!(json["titleEn"], "Renting Guide");
        assert_eq!(json["datePublished"], "2024-03-01");
        assert!(json.get("publishedAt").is_none());
    }
}
