//! Defines the [`Post`] type and the logic for loading posts from their
//! source directories into memory. Each post is a directory whose name is
//! the post's URL-safe identifier, containing a metadata resource and a
//! markdown body. Loading is a pure read: the body is located and checked
//! for existence here but only rendered when pages are assembled.

use chrono::{LocalResult, TimeZone, Utc};
use serde::Deserialize;
use std::fmt;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

/// File name of the metadata resource inside a post directory.
pub const METADATA_FILE: &str = "meta.json";

/// File name of the markdown body inside a post directory.
pub const BODY_FILE: &str = "body.md";

/// One published content item. Constructed once at build start, immutable
/// afterwards.
#[derive(Debug, Clone)]
pub struct Post {
    /// URL-safe identifier, taken from the post directory's name. Only
    /// ASCII letters, digits, underscores, and hyphens are allowed.
    pub path_name: String,

    /// The title of the post.
    pub title: String,

    /// The description of the post, shown in list views.
    pub description: String,

    /// Publication time in seconds since the epoch. Doubles as the post's
    /// uniqueness key: no two posts may share a date.
    pub date: i64,

    /// `date` formatted as `YYYY-MM-DD`, computed once at load time.
    /// Always UTC, so the same content produces the same output on every
    /// machine.
    pub formatted_date: String,

    /// Site-relative link to the post's page.
    pub link: String,

    /// Path of the markdown body. The loader only checks that it exists;
    /// the contents pass through unexamined until the page is rendered.
    pub body_path: PathBuf,

    /// The post's source directory, kept for diagnostics and for copying
    /// the post's bundled assets into the output tree.
    pub dir: PathBuf,
}

/// The decoded shape of a post's metadata file. Absent `title` and
/// `description` decode as empty and are rejected by the same check as
/// authored-but-empty values. Unknown fields are ignored.
#[derive(Deserialize)]
struct Metadata {
    #[serde(default)]
    title: String,

    #[serde(default)]
    description: String,

    date: Option<i64>,
}

/// Loads a single [`Post`] from its source directory, or fails with a
/// diagnostic identifying the directory.
pub fn load_post(dir: &Path) -> Result<Post> {
    let path_name = match dir.file_name().and_then(|name| name.to_str()) {
        Some(name) if is_valid_identifier(name) => name.to_owned(),
        _ => return Err(Error::InvalidIdentifier { dir: dir.to_owned() }),
    };

    let metadata_path = dir.join(METADATA_FILE);
    let contents = match std::fs::read_to_string(&metadata_path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::MissingMetadata { dir: dir.to_owned() });
        }
        Err(err) => return Err(Error::Io(err)),
    };
    let metadata: Metadata = serde_json::from_str(&contents).map_err(|err| Error::Metadata {
        path: metadata_path,
        err,
    })?;

    if metadata.title.is_empty() {
        return Err(Error::IncompleteMetadata {
            dir: dir.to_owned(),
            field: "title",
        });
    }
    if metadata.description.is_empty() {
        return Err(Error::IncompleteMetadata {
            dir: dir.to_owned(),
            field: "description",
        });
    }
    let date = match metadata.date {
        Some(date) => date,
        None => {
            return Err(Error::IncompleteMetadata {
                dir: dir.to_owned(),
                field: "date",
            });
        }
    };
    // A date outside chrono's representable range is as unusable as a
    // missing one.
    let formatted_date = match Utc.timestamp_opt(date, 0) {
        LocalResult::Single(datetime) => datetime.format("%Y-%m-%d").to_string(),
        _ => {
            return Err(Error::IncompleteMetadata {
                dir: dir.to_owned(),
                field: "date",
            });
        }
    };

    let body_path = dir.join(BODY_FILE);
    if !body_path.is_file() {
        return Err(Error::MissingBody { dir: dir.to_owned() });
    }

    Ok(Post {
        link: format!("/posts/{}", path_name),
        path_name,
        title: metadata.title,
        description: metadata.description,
        date,
        formatted_date,
        body_path,
        dir: dir.to_owned(),
    })
}

/// Returns true if `name` is a valid post identifier: one or more ASCII
/// letters, digits, underscores, or hyphens.
fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Searches `source_directory` for post directories and loads each one.
/// Plain files in the source directory are ignored. The result is
/// unordered; discovery order is filesystem-dependent, and ordering is the
/// job of [`crate::order::PostSet`].
pub fn load_posts(source_directory: &Path, threads: usize) -> Result<Vec<Post>> {
    if threads < 2 {
        load_posts_singlethreaded(source_directory)
    } else {
        load_posts_parallel(source_directory, threads)
    }
}

fn post_directories(source_directory: &Path) -> Result<Vec<PathBuf>> {
    let mut directories = Vec::new();
    for result in read_dir(source_directory)? {
        let entry = result?;
        if entry.file_type()?.is_dir() {
            directories.push(entry.path());
        }
    }
    Ok(directories)
}

fn load_posts_singlethreaded(source_directory: &Path) -> Result<Vec<Post>> {
    post_directories(source_directory)?
        .iter()
        .map(|dir| load_post(dir))
        .collect()
}

fn load_posts_parallel(source_directory: &Path, threads: usize) -> Result<Vec<Post>> {
    use crossbeam_channel::unbounded;
    use std::thread;

    let (tx, rx) = unbounded::<PathBuf>();
    let mut workers = Vec::with_capacity(threads);

    for _ in 0..workers.capacity() {
        let rx = rx.clone();
        workers.push(thread::spawn(move || -> Result<Vec<Post>> {
            let mut posts: Vec<Post> = Vec::new();
            for dir in rx {
                posts.push(load_post(&dir)?);
            }
            Ok(posts)
        }))
    }

    for dir in post_directories(source_directory)? {
        // A send can only fail once every worker has already bailed out;
        // the worker's own error surfaces at join.
        let _ = tx.send(dir);
    }
    drop(tx);

    let mut posts: Vec<Post> = Vec::new();
    for worker in workers {
        posts.extend(worker.join().unwrap()?);
    }
    Ok(posts)
}

/// Represents the result of a [`Post`]-loading operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a [`Post`] from its source directory.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post directory's name contains characters outside
    /// `[A-Za-z0-9_-]`.
    InvalidIdentifier { dir: PathBuf },

    /// Returned when a post directory has no metadata resource.
    MissingMetadata { dir: PathBuf },

    /// Returned when the metadata resource can't be decoded.
    Metadata {
        path: PathBuf,
        err: serde_json::Error,
    },

    /// Returned when a required metadata field is absent, empty, or
    /// unusable.
    IncompleteMetadata { dir: PathBuf, field: &'static str },

    /// Returned when a post directory has no markdown body.
    MissingBody { dir: PathBuf },

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidIdentifier { dir } => write!(
                f,
                "Invalid post identifier '{}': names may only contain letters, digits, underscores, and hyphens",
                dir.display()
            ),
            Error::MissingMetadata { dir } => write!(
                f,
                "Post '{}' is missing its {} file",
                dir.display(),
                METADATA_FILE
            ),
            Error::Metadata { path, err } => {
                write!(f, "Reading metadata '{}': {}", path.display(), err)
            }
            Error::IncompleteMetadata { dir, field } => write!(
                f,
                "Post '{}': metadata field `{}` is missing or empty",
                dir.display(),
                field
            ),
            Error::MissingBody { dir } => write!(
                f,
                "Post '{}' is missing its {} file",
                dir.display(),
                BODY_FILE
            ),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidIdentifier { .. } => None,
            Error::MissingMetadata { .. } => None,
            Error::Metadata { path: _, err } => Some(err),
            Error::IncompleteMetadata { .. } => None,
            Error::MissingBody { .. } => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn write_post(root: &Path, name: &str, meta: &str, body: Option<&str>) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(METADATA_FILE), meta).unwrap();
        if let Some(body) = body {
            fs::write(dir.join(BODY_FILE), body).unwrap();
        }
        dir
    }

    #[test]
    fn test_load_post() {
        let root = tempfile::tempdir().unwrap();
        let dir = write_post(
            root.path(),
            "hello-world",
            r#"{"title": "Hello", "description": "A greeting", "date": 1618531200}"#,
            Some("# Hello\n"),
        );

        let post = load_post(&dir).unwrap();
        assert_eq!(post.path_name, "hello-world");
        assert_eq!(post.title, "Hello");
        assert_eq!(post.description, "A greeting");
        assert_eq!(post.date, 1618531200);
        assert_eq!(post.formatted_date, "2021-04-16");
        assert_eq!(post.link, "/posts/hello-world");
        assert_eq!(post.body_path, dir.join(BODY_FILE));
    }

    #[test]
    fn test_unknown_metadata_fields_are_ignored() {
        let root = tempfile::tempdir().unwrap();
        let dir = write_post(
            root.path(),
            "extra",
            r#"{"title": "T", "description": "D", "date": 0, "author": "someone"}"#,
            Some("body"),
        );
        assert!(load_post(&dir).is_ok());
    }

    #[test]
    fn test_invalid_identifier() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("bad name");
        fs::create_dir_all(&dir).unwrap();
        match load_post(&dir).unwrap_err() {
            Error::InvalidIdentifier { .. } => (),
            err => panic!("unexpected error: {}", err),
        }
    }

    #[test]
    fn test_missing_metadata() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("no-meta");
        fs::create_dir_all(&dir).unwrap();
        match load_post(&dir).unwrap_err() {
            Error::MissingMetadata { .. } => (),
            err => panic!("unexpected error: {}", err),
        }
    }

    #[test]
    fn test_malformed_metadata() {
        let root = tempfile::tempdir().unwrap();
        let dir = write_post(root.path(), "broken", "{not json", Some("body"));
        match load_post(&dir).unwrap_err() {
            Error::Metadata { .. } => (),
            err => panic!("unexpected error: {}", err),
        }
    }

    #[test]
    fn test_empty_title() {
        let root = tempfile::tempdir().unwrap();
        let dir = write_post(
            root.path(),
            "untitled",
            r#"{"title": "", "description": "D", "date": 100}"#,
            Some("body"),
        );
        match load_post(&dir).unwrap_err() {
            Error::IncompleteMetadata { field: "title", .. } => (),
            err => panic!("unexpected error: {}", err),
        }
    }

    #[test]
    fn test_absent_description() {
        let root = tempfile::tempdir().unwrap();
        let dir = write_post(
            root.path(),
            "undescribed",
            r#"{"title": "T", "date": 100}"#,
            Some("body"),
        );
        match load_post(&dir).unwrap_err() {
            Error::IncompleteMetadata {
                field: "description",
                ..
            } => (),
            err => panic!("unexpected error: {}", err),
        }
    }

    #[test]
    fn test_absent_date() {
        let root = tempfile::tempdir().unwrap();
        let dir = write_post(
            root.path(),
            "undated",
            r#"{"title": "T", "description": "D"}"#,
            Some("body"),
        );
        match load_post(&dir).unwrap_err() {
            Error::IncompleteMetadata { field: "date", .. } => (),
            err => panic!("unexpected error: {}", err),
        }
    }

    #[test]
    fn test_missing_body() {
        let root = tempfile::tempdir().unwrap();
        let dir = write_post(
            root.path(),
            "bodyless",
            r#"{"title": "T", "description": "D", "date": 100}"#,
            None,
        );
        match load_post(&dir).unwrap_err() {
            Error::MissingBody { .. } => (),
            err => panic!("unexpected error: {}", err),
        }
    }

    #[test]
    fn test_load_posts_skips_plain_files() {
        let root = tempfile::tempdir().unwrap();
        write_post(
            root.path(),
            "only",
            r#"{"title": "T", "description": "D", "date": 100}"#,
            Some("body"),
        );
        fs::write(root.path().join("notes.txt"), "not a post").unwrap();

        let posts = load_posts(root.path(), 1).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].path_name, "only");
    }

    #[test]
    fn test_load_posts_parallel() {
        let root = tempfile::tempdir().unwrap();
        for (i, name) in ["alpha", "beta", "gamma"].iter().enumerate() {
            write_post(
                root.path(),
                name,
                &format!(
                    r#"{{"title": "{}", "description": "D", "date": {}}}"#,
                    name,
                    100 * (i + 1)
                ),
                Some("body"),
            );
        }

        let posts = load_posts(root.path(), 4).unwrap();
        assert_eq!(posts.len(), 3);
    }

    #[test]
    fn test_load_posts_parallel_propagates_errors() {
        let root = tempfile::tempdir().unwrap();
        write_post(
            root.path(),
            "good",
            r#"{"title": "T", "description": "D", "date": 100}"#,
            Some("body"),
        );
        // An empty directory is a post with no metadata.
        fs::create_dir_all(root.path().join("bad")).unwrap();

        assert!(load_posts(root.path(), 4).is_err());
    }
}
