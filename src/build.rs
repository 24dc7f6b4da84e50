//! Exports the [`build_site`] function which stitches together the
//! high-level steps of building the output site: loading the posts
//! ([`crate::post`]), ordering them ([`crate::order`]), projecting the
//! archive/home/guides fragments ([`crate::views`]), composing each page
//! ([`crate::template`]), and rendering post bodies ([`crate::render`]).
//! Everything is written into a staging directory that replaces the
//! published output only once the whole build has succeeded.

use crate::config::{Config, Theme};
use crate::guides::{self, Guide};
use crate::log;
use crate::order::PostSet;
use crate::post::{self, Post};
use crate::render;
use crate::template::{self, Bindings, Template};
use crate::views;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builds the site from a [`Config`] object. Produces the per-post pages,
/// the post archive, the guides index, the home page, and the output
/// directory layout itself; any failure aborts the build before the
/// previously published output is touched.
pub fn build_site(config: &Config) -> Result<()> {
    // Load and validate every post before any ordering or page work; a
    // duplicate date discovered last must still fail the whole build.
    let posts = post::load_posts(&config.posts_source_directory, config.threads)?;
    let set = Arc::new(PostSet::new(posts)?);
    let catalogue = guides::load_catalogue(&config.guides_file)?;
    log!("posts"; "loaded {} posts and {} guides", set.len(), catalogue.len());

    let stage = Stage::new(&config.output_directory)?;

    write_post_pages(config, &stage, &set)?;
    write_archive_page(config, &stage, &set)?;
    write_home_page(config, &stage, &set)?;
    write_guides_page(config, &stage, &set, &catalogue)?;

    stage.publish()?;
    log!("site"; "published to '{}'", config.output_directory.display());
    Ok(())
}

/// Renders and writes every post page, fanning the work out across the
/// configured worker count. Post pages are mutually independent, and
/// distinct identifiers map to distinct output paths, so the workers never
/// contend for a file.
fn write_post_pages(config: &Config, stage: &Stage, set: &Arc<PostSet>) -> Result<()> {
    let template = Arc::new(Template::load(&config.theme.post_template())?);
    let mut base = Bindings::new();
    bind_partials(&mut base, &template, &config.theme)?;
    let base = Arc::new(base);

    if config.threads < 2 || set.len() < 2 {
        for post in set.posts() {
            write_post_page(post, &template, &base, &stage.dir)?;
        }
        return Ok(());
    }

    use crossbeam_channel::unbounded;
    use std::thread;

    let (tx, rx) = unbounded::<usize>();
    let mut workers = Vec::with_capacity(config.threads);

    for _ in 0..workers.capacity() {
        let rx = rx.clone();
        let set = Arc::clone(set);
        let template = Arc::clone(&template);
        let base = Arc::clone(&base);
        let out = stage.dir.clone();
        workers.push(thread::spawn(move || -> Result<()> {
            for position in rx {
                write_post_page(&set.posts()[position], &template, &base, &out)?;
            }
            Ok(())
        }))
    }

    for position in 0..set.len() {
        // A send can only fail once every worker has already bailed out;
        // the worker's own error surfaces at join.
        let _ = tx.send(position);
    }
    drop(tx);

    for worker in workers {
        worker.join().unwrap()?;
    }
    Ok(())
}

/// Renders one post page: reads the markdown body, hands it to the
/// renderer, composes the page template, writes the result, and copies the
/// post's bundled assets alongside it.
fn write_post_page(
    post: &Post,
    template: &Template,
    base: &Bindings,
    out: &Path,
) -> Result<()> {
    let mut bindings = base.clone();
    bindings.inline("title", &post.title);
    bindings.inline("desc", &post.description);
    bindings.inline("date", &post.formatted_date);
    bindings.inline("link", &post.link);

    let markdown = fs::read_to_string(&post.body_path)?;
    bindings.block("body", render::markdown_to_html(&markdown));

    let directory = out.join("posts").join(&post.path_name);
    write_page(&directory, &template.render(&bindings))?;
    copy_bundle_assets(post, &directory)
}

/// Copies everything in the post's source directory except the metadata
/// and body resources into the post's output directory, preserving
/// relative paths.
fn copy_bundle_assets(post: &Post, output_directory: &Path) -> Result<()> {
    for result in walkdir::WalkDir::new(&post.dir) {
        let entry = result?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.depth() == 1
            && (entry.file_name() == post::METADATA_FILE || entry.file_name() == post::BODY_FILE)
        {
            continue;
        }
        // strip_prefix can't fail: every entry is under the post directory
        let relative = entry.path().strip_prefix(&post.dir).unwrap();
        let target = output_directory.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
    }
    Ok(())
}

/// Writes the chronological archive page from the full post list.
fn write_archive_page(config: &Config, stage: &Stage, set: &PostSet) -> Result<()> {
    let template = Template::load(&config.theme.archive_template())?;
    let mut bindings = Bindings::new();
    bind_partials(&mut bindings, &template, &config.theme)?;
    if template.has("posts") {
        let item = Template::load(&config.theme.post_item())?;
        bindings.block("posts", views::post_list(set.posts(), &item));
    }
    write_page(&stage.dir.join("posts"), &template.render(&bindings))
}

/// Writes the home page from the bounded recent-posts list.
fn write_home_page(config: &Config, stage: &Stage, set: &PostSet) -> Result<()> {
    let template = Template::load(&config.theme.home_template())?;
    let mut bindings = Bindings::new();
    bind_partials(&mut bindings, &template, &config.theme)?;
    if template.has("posts") {
        let item = Template::load(&config.theme.post_item())?;
        bindings.block(
            "posts",
            views::recent_post_list(set.posts(), &item, config.recent_posts),
        );
    }
    write_page(&stage.dir, &template.render(&bindings))
}

/// Writes the guides index from the expanded catalogue.
fn write_guides_page(
    config: &Config,
    stage: &Stage,
    set: &PostSet,
    catalogue: &[Guide],
) -> Result<()> {
    let template = Template::load(&config.theme.guides_template())?;
    let mut bindings = Bindings::new();
    bind_partials(&mut bindings, &template, &config.theme)?;
    if template.has("guides") {
        let container = Template::load(&config.theme.guide_container())?;
        let post_row = Template::load(&config.theme.guide_post_row())?;
        let todo_row = Template::load(&config.theme.guide_todo_row())?;
        bindings.block(
            "guides",
            views::guides_fragment(catalogue, set, &container, &post_row, &todo_row)?,
        );
    }
    write_page(&stage.dir.join("guides"), &template.render(&bindings))
}

/// Binds the shared navbar/footer/style partials for one page template.
/// Presence is a per-page contract: a partial is only read if the template
/// actually carries its placeholder.
fn bind_partials(bindings: &mut Bindings, template: &Template, theme: &Theme) -> Result<()> {
    if template.has("navbar") {
        bindings.block("navbar", template::load_fragment(&theme.navbar())?);
    }
    if template.has("footer") {
        bindings.block("footer", template::load_fragment(&theme.footer())?);
    }
    if template.has("style") {
        bindings.block("style", template::load_fragment(&theme.style())?);
    }
    Ok(())
}

fn write_page(directory: &Path, contents: &str) -> Result<()> {
    fs::create_dir_all(directory)?;
    fs::write(directory.join("index.html"), contents)?;
    Ok(())
}

/// Staging directory for one build. Every page is written here; the
/// published output is replaced only by [`Stage::publish`], so a failed
/// build leaves the previously published site untouched.
struct Stage {
    dir: PathBuf,
    target: PathBuf,
}

impl Stage {
    fn new(target: &Path) -> Result<Stage> {
        let name = match target.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => return Err(Error::Stage {
                path: target.to_owned(),
            }),
        };
        let dir = target.with_file_name(format!("{}.staging", name));
        // A leftover staging directory is stale output from an aborted
        // build.
        rmdir(&dir)?;
        fs::create_dir_all(&dir)?;
        Ok(Stage {
            dir,
            target: target.to_owned(),
        })
    }

    /// Replaces the published output with the staged build.
    fn publish(self) -> Result<()> {
        if let Some(parent) = self.target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        rmdir(&self.target)?;
        fs::rename(&self.dir, &self.target).map_err(|err| Error::Publish {
            path: self.target.clone(),
            err,
        })
    }
}

fn rmdir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during post loading,
/// ordering, catalogue loading, fragment projection, template loading,
/// staging, publishing, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors loading posts.
    Post(post::Error),

    /// Returned for a duplicate post date.
    Order(crate::order::Error),

    /// Returned for errors loading the guides catalogue.
    Guides(guides::Error),

    /// Returned for errors expanding fragments.
    View(views::Error),

    /// Returned for errors loading template resources.
    Template(template::Error),

    /// Returned when the output location can't host a staging directory.
    Stage { path: PathBuf },

    /// Returned for I/O problems while cleaning stale output.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned when the staged output can't be moved into place.
    Publish { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while copying a post's bundled assets.
    WalkDir(walkdir::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Post(err) => err.fmt(f),
            Error::Order(err) => err.fmt(f),
            Error::Guides(err) => err.fmt(f),
            Error::View(err) => err.fmt(f),
            Error::Template(err) => err.fmt(f),
            Error::Stage { path } => write!(
                f,
                "Output location '{}' can't host a staging directory",
                path.display()
            ),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::Publish { path, err } => {
                write!(f, "Publishing output to '{}': {}", path.display(), err)
            }
            Error::WalkDir(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Post(err) => Some(err),
            Error::Order(err) => Some(err),
            Error::Guides(err) => Some(err),
            Error::View(err) => Some(err),
            Error::Template(err) => Some(err),
            Error::Stage { path: _ } => None,
            Error::Clean { path: _, err } => Some(err),
            Error::Publish { path: _, err } => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<post::Error> for Error {
    /// Converts [`post::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: post::Error) -> Error {
        Error::Post(err)
    }
}

impl From<crate::order::Error> for Error {
    /// Converts [`crate::order::Error`]s into [`Error`]. This allows us to
    /// use the `?` operator.
    fn from(err: crate::order::Error) -> Error {
        Error::Order(err)
    }
}

impl From<guides::Error> for Error {
    /// Converts [`guides::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: guides::Error) -> Error {
        Error::Guides(err)
    }
}

impl From<views::Error> for Error {
    /// Converts [`views::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: views::Error) -> Error {
        Error::View(err)
    }
}

impl From<template::Error> for Error {
    /// Converts [`template::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: template::Error) -> Error {
        Error::Template(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts [`walkdir::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    /// Lays out a complete project (posts, guides catalogue, theme) under
    /// `root` and returns a [`Config`] building into `root/_site`.
    fn fixture(root: &Path) -> Config {
        let posts = root.join("posts");
        for (name, title, date) in &[
            ("first-steps", "A", 100),
            ("big-picture", "B", 300),
            ("side-quest", "C", 200),
        ] {
            let dir = posts.join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(
                dir.join(post::METADATA_FILE),
                format!(
                    r#"{{"title": "{}", "description": "{} desc", "date": {}}}"#,
                    title, title, date
                ),
            )
            .unwrap();
            fs::write(dir.join(post::BODY_FILE), format!("# {}\n\nbody text\n", title)).unwrap();
        }

        fs::write(
            root.join("guides.json"),
            r#"[{"name": "Intro", "description": "Start here", "posts": [100, 300], "todo": ["Advanced Topic"]}]"#,
        )
        .unwrap();

        let theme = root.join("theme");
        fs::create_dir_all(&theme).unwrap();
        fs::write(theme.join("navbar.html"), "<nav>site</nav>").unwrap();
        fs::write(theme.join("footer.html"), "<footer>fin</footer>").unwrap();
        fs::write(theme.join("style.css"), "body { margin: 0; }").unwrap();
        fs::write(
            theme.join("home.html"),
            "<style>$style$</style>$navbar$<main>$posts$</main>$footer$",
        )
        .unwrap();
        fs::write(
            theme.join("archive.html"),
            "$navbar$<main class=\"archive\">$posts$</main>$footer$",
        )
        .unwrap();
        fs::write(
            theme.join("guides.html"),
            "$navbar$<main class=\"guides\">$guides$</main>$footer$",
        )
        .unwrap();
        fs::write(
            theme.join("post.html"),
            "$navbar$<article><h2>$title$</h2><time>$date$</time>$body$</article>$footer$",
        )
        .unwrap();
        fs::write(theme.join("post-item.html"), "<li><a href=\"$link$\">$title$</a> $date$ $desc$</li>").unwrap();
        fs::write(theme.join("guide.html"), "<section><h3>$name$</h3><p>$desc$</p><ol>$posts$$todo$</ol></section>").unwrap();
        fs::write(theme.join("guide-post.html"), "<li><a href=\"$link$\">$title$</a></li>").unwrap();
        fs::write(theme.join("guide-todo.html"), "<li class=\"todo\">$title$</li>").unwrap();

        let project_file = root.join(crate::config::PROJECT_FILE);
        fs::write(&project_file, "recent_posts: 2\n").unwrap();
        Config::from_project_file(&project_file, &root.join("_site"), Some(2)).unwrap()
    }

    #[test]
    fn test_build_site() {
        let root = tempfile::tempdir().unwrap();
        let config = fixture(root.path());
        build_site(&config).unwrap();

        let out = root.path().join("_site");

        // Home page: the two most recent posts, most recent first.
        let home = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(home.contains("body { margin: 0; }"));
        assert!(home.contains("<nav>site</nav>"));
        let b = home.find("B").unwrap();
        let c = home.find(">C<").unwrap();
        assert!(b < c);
        assert!(!home.contains(">A<"));

        // Archive: all three posts in descending date order.
        let archive = fs::read_to_string(out.join("posts").join("index.html")).unwrap();
        for link in &["/posts/first-steps", "/posts/big-picture", "/posts/side-quest"] {
            assert!(archive.contains(link));
        }
        let order: Vec<usize> = ["big-picture", "side-quest", "first-steps"]
            .iter()
            .map(|n| archive.find(n).unwrap())
            .collect();
        assert!(order[0] < order[1] && order[1] < order[2]);

        // Post pages: rendered markdown inside the page template.
        let page = fs::read_to_string(
            out.join("posts").join("first-steps").join("index.html"),
        )
        .unwrap();
        assert!(page.contains("<h1>A</h1>"));
        assert!(page.contains("<h2>A</h2>"));
        assert!(page.contains("<footer>fin</footer>"));

        // Guides: declared order (A before B), then the to-do row.
        let guides = fs::read_to_string(out.join("guides").join("index.html")).unwrap();
        let a = guides.find("first-steps").unwrap();
        let b = guides.find("big-picture").unwrap();
        let todo = guides.find("Advanced Topic").unwrap();
        assert!(a < b && b < todo);

        // Staging directory is gone after a successful publish.
        assert!(!root.path().join("_site.staging").exists());
    }

    #[test]
    fn test_duplicate_date_aborts_without_output() {
        let root = tempfile::tempdir().unwrap();
        let config = fixture(root.path());
        let dup = root.path().join("posts").join("late-arrival");
        fs::create_dir_all(&dup).unwrap();
        fs::write(
            dup.join(post::METADATA_FILE),
            r#"{"title": "Dup", "description": "D", "date": 300}"#,
        )
        .unwrap();
        fs::write(dup.join(post::BODY_FILE), "body").unwrap();

        match build_site(&config).unwrap_err() {
            Error::Order(crate::order::Error::DuplicateDate { .. }) => (),
            err => panic!("unexpected error: {}", err),
        }
        assert!(!root.path().join("_site").exists());
    }

    #[test]
    fn test_failed_build_leaves_published_output_intact() {
        let root = tempfile::tempdir().unwrap();
        let config = fixture(root.path());
        build_site(&config).unwrap();

        // Sabotage the next build, then check the published output
        // survived it.
        fs::remove_file(root.path().join("theme").join("guides.html")).unwrap();
        match build_site(&config).unwrap_err() {
            Error::Template(template::Error::MissingTemplateResource { .. }) => (),
            err => panic!("unexpected error: {}", err),
        }
        assert!(root
            .path()
            .join("_site")
            .join("guides")
            .join("index.html")
            .exists());
    }

    #[test]
    fn test_unresolved_guide_reference_aborts() {
        let root = tempfile::tempdir().unwrap();
        let config = fixture(root.path());
        fs::write(
            root.path().join("guides.json"),
            r#"[{"name": "Intro", "description": "d", "posts": [12345]}]"#,
        )
        .unwrap();

        match build_site(&config).unwrap_err() {
            Error::View(views::Error::UnresolvedGuideReference { .. }) => (),
            err => panic!("unexpected error: {}", err),
        }
        assert!(!root.path().join("_site").exists());
    }

    #[test]
    fn test_bundle_assets_are_copied() {
        let root = tempfile::tempdir().unwrap();
        let config = fixture(root.path());
        let images = root
            .path()
            .join("posts")
            .join("first-steps")
            .join("images");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("diagram.svg"), "<svg/>").unwrap();

        build_site(&config).unwrap();
        assert!(root
            .path()
            .join("_site")
            .join("posts")
            .join("first-steps")
            .join("images")
            .join("diagram.svg")
            .exists());
    }

    #[test]
    fn test_page_without_posts_placeholder_skips_fragment() {
        let root = tempfile::tempdir().unwrap();
        let config = fixture(root.path());
        // A home template with no $posts$ line must not require the
        // post-item sub-template at all.
        fs::write(root.path().join("theme").join("home.html"), "$navbar$<main>static</main>").unwrap();
        fs::remove_file(root.path().join("theme").join("post-item.html")).unwrap();
        // The archive still needs the sub-template, so give the archive a
        // static template too.
        fs::write(root.path().join("theme").join("archive.html"), "<main>static</main>").unwrap();

        build_site(&config).unwrap();
        let home =
            fs::read_to_string(root.path().join("_site").join("index.html")).unwrap();
        assert_eq!(home, "<nav>site</nav><main>static</main>");
    }
}
