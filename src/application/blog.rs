//! Read-only access to the Markdown blog directory.
//!
//! Nothing is cached: every call goes to the filesystem, so edits to the
//! directory show up on the next request. Failures never reach the caller.
//! A broken file is logged and skipped, and an unreadable directory yields
//! an empty listing.

use std::{
    io,
    num::NonZeroUsize,
    path::{Component, Path, PathBuf},
};

use futures::{StreamExt, stream};
use metrics::counter;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::BlogSettings;
use crate::domain::blog::{BlogParseError, BlogPost};

const MARKDOWN_EXTENSION: &str = ".md";
pub const METRIC_BLOG_READ_FAILURES: &str = "leasehold_blog_read_failures_total";

#[derive(Debug, Error)]
pub enum BlogReadError {
    #[error("`{0}` is not a valid post slug")]
    InvalidSlug(String),
    #[error("failed to read post file: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Parse(#[from] BlogParseError),
}

#[derive(Debug, Clone)]
pub struct BlogService {
    directory: PathBuf,
    read_concurrency: NonZeroUsize,
}

impl BlogService {
    pub fn new(directory: impl Into<PathBuf>, read_concurrency: NonZeroUsize) -> Self {
        Self {
            directory: directory.into(),
            read_concurrency,
        }
    }

    pub fn from_settings(settings: &BlogSettings) -> Self {
        Self::new(settings.directory.clone(), settings.read_concurrency)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// All readable posts, newest `datePublished` first.
    pub async fn list_posts(&self) -> Vec<BlogPost> {
        let slugs = match self.markdown_slugs().await {
            Ok(slugs) => slugs,
            Err(err) => {
                error!(
                    target = "leasehold::blog",
                    directory = %self.directory.display(),
                    error = %err,
                    "failed to read blog directory"
                );
                counter!(METRIC_BLOG_READ_FAILURES, "kind" => "directory").increment(1);
                return Vec::new();
            }
        };

        let mut posts: Vec<BlogPost> = stream::iter(slugs)
            .map(|slug| async move { self.get_post(&slug).await })
            .buffered(self.read_concurrency.get())
            .filter_map(|post| async move { post })
            .collect()
            .await;

        // Stable: equal or missing dates keep file-name order, undated posts go last.
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        posts
    }

    /// The post stored as `<slug>.md`, or `None` if it is missing or broken.
    pub async fn get_post(&self, slug: &str) -> Option<BlogPost> {
        match self.read_post(slug).await {
            Ok(post) => Some(post),
            Err(err) => {
                warn!(
                    target = "leasehold::blog",
                    slug,
                    error = %err,
                    "skipping unreadable blog post"
                );
                counter!(METRIC_BLOG_READ_FAILURES, "kind" => "post").increment(1);
                None
            }
        }
    }

    async fn read_post(&self, slug: &str) -> Result<BlogPost, BlogReadError> {
        if !is_single_segment(slug) {
            return Err(BlogReadError::InvalidSlug(slug.to_string()));
        }
        let path = self.directory.join(format!("{slug}{MARKDOWN_EXTENSION}"));
        let raw = tokio::fs::read_to_string(&path).await?;
        Ok(BlogPost::parse(slug, &raw)?)
    }

    /// Slugs of `*.md` entries, sorted by name.
    async fn markdown_slugs(&self) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.directory).await?;
        let mut slugs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(slug) = name.strip_suffix(MARKDOWN_EXTENSION) {
                slugs.push(slug.to_string());
            }
        }
        slugs.sort();
        Ok(slugs)
    }
}

fn is_single_segment(slug: &str) -> bool {
    let mut components = Path::new(slug).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !slug.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_must_stay_inside_the_directory() {
        assert!(is_single_segment("hello-world"));
        assert!(is_single_segment("租房指南"));
        assert!(!is_single_segment(""));
        assert!(!is_single_segment(".."));
        assert!(!is_single_segment("../secrets"));
        assert!(!is_single_segment("nested/post"));
        assert!(!is_single_segment("/etc/passwd"));
        assert!(!is_single_segment("a\\b"));
    }
}
