//! The library code for the `waymark` static site generator. The
//! architecture can be generally broken down into four distinct steps:
//!
//! 1. Loading posts from source directories on disk ([`crate::post`])
//! 2. Ordering them and indexing them by date ([`crate::order`])
//! 3. Projecting the ordered set into render-ready fragments
//!    ([`crate::views`])
//! 4. Composing and writing the output pages ([`crate::build`])
//!
//! The second step is a barrier: every post must be loaded and validated
//! before any ordering or page work begins, because a duplicate date
//! anywhere fails the whole build. After the barrier the ordered set is
//! immutable and shared read-only.
//!
//! The fourth step leans on the `$name$` placeholder engine
//! ([`crate::template`]): each page template is merged with shared
//! partials (navbar, footer, stylesheet) and with the fragments built in
//! step three: the full archive body, the home page's bounded recent
//! list, and the guides catalogue expanded against the date index. Post
//! bodies are converted to HTML by [`crate::render`], the one step that
//! interprets their contents.
//!
//! Output is staged and atomically published, so a failed build never
//! leaves a half-written site where the previous one was.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod guides;
pub mod logger;
pub mod order;
pub mod post;
pub mod render;
pub mod template;
pub mod util;
pub mod views;
