//! Projects the ordered post set into the named fragments that pages
//! splice in: the full chronological archive body, the bounded "recent
//! posts" body for the home page, and the expanded guides catalogue. Each
//! fragment is built by instantiating a per-item sub-template once per
//! item, in the item sequence's order, and concatenating the results with
//! no separator.

use crate::guides::Guide;
use crate::order::PostSet;
use crate::post::Post;
use crate::template::{Bindings, Template};
use chrono::{LocalResult, TimeZone, Utc};
use std::fmt;

/// Instantiates `item` once per post, in the order given, and concatenates
/// the results. Applied to the full ordered set this is the archive body.
pub fn post_list(posts: &[Post], item: &Template) -> String {
    let mut out = String::new();
    for post in posts {
        out.push_str(&post_item(post, item));
    }
    out
}

/// The first `n` posts rendered through `item`. The result is always a
/// prefix of [`post_list`]'s output over the same set; `n` is presentation
/// policy (the home page's "recent posts" count), not an invariant.
pub fn recent_post_list(posts: &[Post], item: &Template, n: usize) -> String {
    post_list(&posts[..n.min(posts.len())], item)
}

/// Renders one post through a per-item sub-template. The sub-template sees
/// the post's `link`, `title`, `date`, and `desc` fields; its output is
/// final text, never re-scanned for placeholders.
fn post_item(post: &Post, item: &Template) -> String {
    let mut bindings = Bindings::new();
    bindings.inline("link", &post.link);
    bindings.inline("title", &post.title);
    bindings.inline("date", &post.formatted_date);
    bindings.inline("desc", &post.description);
    item.render(&bindings)
}

/// Expands the guides catalogue into one guide-container instance per
/// guide, in catalogue order. Each container receives the guide's `name`
/// and `desc` plus two assembled blocks: its post rows (in the guide's
/// declared order, not chronological order) and its to-do rows. A date
/// reference that doesn't resolve in `set` stops the build.
pub fn guides_fragment(
    catalogue: &[Guide],
    set: &PostSet,
    container: &Template,
    post_row: &Template,
    todo_row: &Template,
) -> Result<String> {
    let mut out = String::new();
    for guide in catalogue {
        let mut rows = String::new();
        for &date in &guide.posts {
            match set.by_date(date) {
                Some(post) => rows.push_str(&post_item(post, post_row)),
                None => {
                    return Err(Error::UnresolvedGuideReference {
                        guide: guide.name.clone(),
                        date: format_date(date),
                    });
                }
            }
        }

        let mut todos = String::new();
        for title in &guide.todo {
            let mut bindings = Bindings::new();
            bindings.inline("title", title);
            todos.push_str(&todo_row.render(&bindings));
        }

        let mut bindings = Bindings::new();
        bindings.inline("name", &guide.name);
        bindings.inline("desc", &guide.description);
        bindings.block("posts", rows);
        bindings.block("todo", todos);
        out.push_str(&container.render(&bindings));
    }
    Ok(out)
}

/// Renders an unresolved date reference for diagnostics. There is no post
/// to take a formatted date from, so format the raw value here.
fn format_date(date: i64) -> String {
    match Utc.timestamp_opt(date, 0) {
        LocalResult::Single(datetime) => {
            format!("{} ({})", datetime.format("%Y-%m-%d"), date)
        }
        _ => date.to_string(),
    }
}

/// Represents the result of a fragment projection.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error projecting a fragment.
#[derive(Debug)]
pub enum Error {
    /// Returned when a guide references a date no post carries.
    UnresolvedGuideReference { guide: String, date: String },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnresolvedGuideReference { guide, date } => write!(
                f,
                "Guide '{}' references post date {} but no post has that date",
                guide, date
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
