//! Defines the [`Template`] type: the `$name$` placeholder engine used to
//! compose every output page. A template is parsed once into a sequence of
//! literal runs and named placeholders; [`Template::render`] then
//! substitutes bound values in a single pass.
//!
//! Two kinds of bindings share the `$name$` syntax:
//!
//! 1. Inline bindings ([`Bindings::inline`]) substitute a field value such
//!    as a post title. The value is escaped so that markup characters in a
//!    field can't corrupt the surrounding page.
//! 2. Block bindings ([`Bindings::block`]) splice a pre-rendered fragment
//!    (a post list, a shared partial) verbatim, every line preserved.
//!
//! A placeholder with no binding renders back as its literal `$name$`
//! text, so rendering is byte-idempotent with respect to names a template
//! doesn't carry. Substituted content is never re-scanned: a value that
//! happens to contain `$name$` is emitted as-is.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A parsed template: literal text runs interleaved with `$name$`
/// placeholders. A template has no identity beyond its content.
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    /// A run of literal text, emitted verbatim.
    Literal(String),

    /// A `$name$` placeholder, resolved against the bindings at render
    /// time.
    Placeholder(String),
}

impl Template {
    /// Parses `input` over the placeholder grammar
    /// `$[A-Za-z_][A-Za-z0-9_]*$`. Parsing never fails: a `$` that doesn't
    /// open a well-formed placeholder is plain text.
    pub fn parse(input: &str) -> Template {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = input;

        while let Some(start) = rest.find('$') {
            match placeholder_len(&rest[start + 1..]) {
                Some(len) => {
                    literal.push_str(&rest[..start]);
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    let name = &rest[start + 1..start + 1 + len];
                    segments.push(Segment::Placeholder(name.to_owned()));
                    rest = &rest[start + len + 2..];
                }
                None => {
                    literal.push_str(&rest[..=start]);
                    rest = &rest[start + 1..];
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Template { segments }
    }

    /// Reads and parses a template resource from disk. A resource that
    /// can't be read is a fatal build error.
    pub fn load(path: &Path) -> Result<Template> {
        Ok(Template::parse(&load_fragment(path)?))
    }

    /// Returns true if the template carries a `$name$` placeholder. Pages
    /// use this to avoid reading fragments they don't display.
    pub fn has(&self, name: &str) -> bool {
        self.segments.iter().any(|segment| match segment {
            Segment::Placeholder(n) => n == name,
            Segment::Literal(_) => false,
        })
    }

    /// Substitutes `bindings` into the template in a single pass. Unbound
    /// placeholders are re-emitted as their original `$name$` text.
    pub fn render(&self, bindings: &Bindings) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => match bindings.get(name) {
                    Some(Value::Inline(value)) => escape_into(&mut out, value),
                    Some(Value::Block(value)) => out.push_str(value),
                    None => {
                        out.push('$');
                        out.push_str(name);
                        out.push('$');
                    }
                },
            }
        }
        out
    }
}

/// Reads a raw fragment resource (a partial such as the navbar or the
/// stylesheet) without parsing it for placeholders.
pub fn load_fragment(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|err| Error::MissingTemplateResource {
        path: path.to_owned(),
        err,
    })
}

/// Returns the length of the placeholder name at the start of `input`, if
/// `input` begins with a well-formed name followed by a closing `$`.
fn placeholder_len(input: &str) -> Option<usize> {
    let mut len = 0;
    for &b in input.as_bytes() {
        match b {
            b'$' if len > 0 => return Some(len),
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => len += 1,
            b'0'..=b'9' if len > 0 => len += 1,
            _ => return None,
        }
    }
    None
}

/// The values substituted into a template. Built up by the caller, then
/// passed to [`Template::render`].
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
enum Value {
    Inline(String),
    Block(String),
}

impl Bindings {
    pub fn new() -> Bindings {
        Bindings::default()
    }

    /// Binds a field value. Escaped at render time.
    pub fn inline(&mut self, name: &str, value: &str) {
        self.values
            .insert(name.to_owned(), Value::Inline(value.to_owned()));
    }

    /// Binds a pre-rendered fragment. Spliced verbatim at render time,
    /// internal newlines and blank lines included.
    pub fn block(&mut self, name: &str, value: String) {
        self.values.insert(name.to_owned(), Value::Block(value));
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Appends `value` to `out`, replacing the characters that would otherwise
/// terminate or corrupt the surrounding markup.
fn escape_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// Represents the result of a template operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a template resource.
#[derive(Debug)]
pub enum Error {
    /// Returned when a template, partial, or sub-template resource can't
    /// be read.
    MissingTemplateResource { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingTemplateResource { path, err } => {
                write!(f, "Reading template resource '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingTemplateResource { path: _, err } => Some(err),
        }
    }
}
