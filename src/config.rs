//! Project configuration: locating the project file, decoding it, and
//! resolving every path the build needs against the project root. The
//! theme directory's resources have fixed names; [`Theme`] centralizes
//! them so the rest of the build never spells out a file name.

use crate::util::open;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name of the project configuration, searched for upwards from the
/// invocation directory.
pub const PROJECT_FILE: &str = "waymark.yaml";

/// Number of posts shown on the home page. A presentation default, not an
/// invariant.
#[derive(Deserialize)]
struct RecentPosts(usize);
impl Default for RecentPosts {
    fn default() -> Self {
        RecentPosts(4)
    }
}

fn default_posts_dir() -> PathBuf {
    PathBuf::from("posts")
}

fn default_guides_file() -> PathBuf {
    PathBuf::from("guides.json")
}

fn default_theme_dir() -> PathBuf {
    PathBuf::from("theme")
}

/// The raw shape of the project file. Paths are relative to the project
/// root (the directory holding the project file).
#[derive(Deserialize)]
struct Project {
    #[serde(default = "default_posts_dir")]
    posts: PathBuf,

    #[serde(default = "default_guides_file")]
    guides: PathBuf,

    #[serde(default = "default_theme_dir")]
    theme: PathBuf,

    #[serde(default)]
    recent_posts: RecentPosts,
}

/// Resolved build configuration: every path joined against the project
/// root, worker count decided.
pub struct Config {
    pub posts_source_directory: PathBuf,
    pub guides_file: PathBuf,
    pub theme: Theme,
    pub output_directory: PathBuf,
    pub recent_posts: usize,
    pub threads: usize,
}

impl Config {
    /// Walks up from `dir` looking for the project file, then loads it.
    pub fn from_directory(
        dir: &Path,
        output_directory: &Path,
        threads: Option<usize>,
    ) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            match Config::from_project_file(&path, output_directory, threads) {
                Ok(config) => Ok(config),
                Err(e) => Err(anyhow!("Loading configuration: {:?}", e)),
            }
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory, threads),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(
        path: &Path,
        output_directory: &Path,
        threads: Option<usize>,
    ) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => Ok(Config {
                posts_source_directory: project_root.join(&project.posts),
                guides_file: project_root.join(&project.guides),
                theme: Theme::new(project_root.join(&project.theme)),
                output_directory: output_directory.to_owned(),
                recent_posts: project.recent_posts.0,
                threads: match threads {
                    None => num_cpus::get(),
                    Some(threads) => threads,
                },
            }),
        }
    }
}

/// The theme directory's fixed-name resources. Holds paths only; each
/// template is read when a page actually needs it.
pub struct Theme {
    dir: PathBuf,
}

impl Theme {
    fn new(dir: PathBuf) -> Theme {
        Theme { dir }
    }

    /// Page template for the home page.
    pub fn home_template(&self) -> PathBuf {
        self.dir.join("home.html")
    }

    /// Page template for the chronological post archive.
    pub fn archive_template(&self) -> PathBuf {
        self.dir.join("archive.html")
    }

    /// Page template for the guides index.
    pub fn guides_template(&self) -> PathBuf {
        self.dir.join("guides.html")
    }

    /// Page template for individual post pages.
    pub fn post_template(&self) -> PathBuf {
        self.dir.join("post.html")
    }

    /// Shared navigation partial.
    pub fn navbar(&self) -> PathBuf {
        self.dir.join("navbar.html")
    }

    /// Shared footer partial.
    pub fn footer(&self) -> PathBuf {
        self.dir.join("footer.html")
    }

    /// Shared stylesheet.
    pub fn style(&self) -> PathBuf {
        self.dir.join("style.css")
    }

    /// Sub-template for one post row in archive and home lists.
    pub fn post_item(&self) -> PathBuf {
        self.dir.join("post-item.html")
    }

    /// Sub-template for one guide's container.
    pub fn guide_container(&self) -> PathBuf {
        self.dir.join("guide.html")
    }

    /// Sub-template for one resolved post row inside a guide.
    pub fn guide_post_row(&self) -> PathBuf {
        self.dir.join("guide-post.html")
    }

    /// Sub-template for one unwritten ("to-do") row inside a guide.
    pub fn guide_todo_row(&self) -> PathBuf {
        self.dir.join("guide-todo.html")
    }
}
