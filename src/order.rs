//! Defines [`PostSet`]: the total order over loaded posts plus the
//! date index used to resolve guide references. Built exactly once, after
//! every post has been loaded and validated, and shared read-only with
//! everything downstream.

use crate::post::Post;
use std::collections::HashMap;
use std::fmt;

/// The full collection of posts, sorted by date descending (most recent
/// first), together with a date index mapping each post's date back to its
/// position. The index is bijective: construction fails on the first
/// duplicate date.
#[derive(Debug)]
pub struct PostSet {
    posts: Vec<Post>,
    by_date: HashMap<i64, usize>,
}

impl PostSet {
    /// Builds the index and the total order over `posts`. A duplicate date
    /// is a content-authoring error, not a transient condition: the whole
    /// build fails, with no retry.
    pub fn new(mut posts: Vec<Post>) -> Result<PostSet> {
        let mut by_date: HashMap<i64, usize> = HashMap::with_capacity(posts.len());
        for (position, post) in posts.iter().enumerate() {
            if let Some(&existing) = by_date.get(&post.date) {
                return Err(Error::DuplicateDate {
                    date: post.formatted_date.clone(),
                    first: posts[existing].path_name.clone(),
                    second: post.path_name.clone(),
                });
            }
            by_date.insert(post.date, position);
        }

        // Discovery order is filesystem-dependent; the sort below is the
        // only order anything downstream may rely on. Dates are unique, so
        // no tie-break is needed.
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        for (position, post) in posts.iter().enumerate() {
            by_date.insert(post.date, position);
        }

        Ok(PostSet { posts, by_date })
    }

    /// All posts, most recent first.
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Resolves a date reference back to its post.
    pub fn by_date(&self, date: i64) -> Option<&Post> {
        self.by_date.get(&date).map(|&position| &self.posts[position])
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Represents the result of building a [`PostSet`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error building a [`PostSet`].
#[derive(Debug)]
pub enum Error {
    /// Returned when two posts share a publication date. The date is the
    /// collection's uniqueness key, so this stops the whole build.
    DuplicateDate {
        date: String,
        first: String,
        second: String,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::DuplicateDate {
                date,
                first,
                second,
            } => write!(
                f,
                "Duplicate post date {} shared by '{}' and '{}': post dates must be unique",
                date, first, second
            ),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
