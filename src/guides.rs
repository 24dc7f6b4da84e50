//! Loading the guides catalogue: the curated, ordered groupings of posts
//! that form the site's learning paths. The catalogue only declares
//! references (posts by date, unwritten entries by title); resolving the
//! references against the post collection happens in [`crate::views`].

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// One curated learning path: an ordered selection of posts plus titles
/// for entries not yet written.
#[derive(Debug, Clone, Deserialize)]
pub struct Guide {
    /// The guide's display name.
    pub name: String,

    /// The guide's display description.
    pub description: String,

    /// Date references into the post collection, in display order. The
    /// author's curation order is authoritative; it need not match the
    /// posts' chronological order.
    #[serde(default)]
    pub posts: Vec<i64>,

    /// Titles of planned-but-unwritten entries, in display order. These
    /// never resolve to a post.
    #[serde(default)]
    pub todo: Vec<String>,
}

/// Reads the guides catalogue from `path`. The catalogue's declaration
/// order is preserved: it controls the order guides appear on the guides
/// page.
pub fn load_catalogue(path: &Path) -> Result<Vec<Guide>> {
    let contents = std::fs::read_to_string(path).map_err(|err| Error::Open {
        path: path.to_owned(),
        err,
    })?;
    serde_json::from_str(&contents).map_err(|err| Error::Deserialize {
        path: path.to_owned(),
        err,
    })
}

/// Represents the result of loading the guides catalogue.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading the guides catalogue.
#[derive(Debug)]
pub enum Error {
    /// Returned when the catalogue file can't be read.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when the catalogue can't be decoded.
    Deserialize {
        path: PathBuf,
        err: serde_json::Error,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open { path, err } => {
                write!(f, "Opening guides catalogue '{}': {}", path.display(), err)
            }
            Error::Deserialize { path, err } => {
                write!(f, "Reading guides catalogue '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { path: _, err } => Some(err),
            Error::Deserialize { path: _, err } => Some(err),
        }
    }
}
