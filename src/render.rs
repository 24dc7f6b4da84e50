//! Markdown rendering. The rest of the pipeline treats post bodies as
//! opaque text; this is the one place their contents are interpreted.

use pulldown_cmark::{html, Options, Parser};

/// Converts a post's markdown body to an HTML fragment. Pure function of
/// the source text; the caller is responsible for splicing the result into
/// a page template.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}
