//! Best-effort plain text rendering of HTML bodies

use scraper::{ElementRef, Html, Node};
use thiserror::Error;

/// Deepest element nesting that is rendered
pub const MAX_HTML_DEPTH: usize = 256;

/// Errors produced when HTML cannot be rendered as text
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HtmlToTextError {
    /// Elements are nested deeper than [`MAX_HTML_DEPTH`]
    #[error("elements nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Elements whose content never appears in the text rendition
const SKIPPED: &[&str] = &["head", "script", "style", "title", "template"];

/// Elements that start on a new line
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "dt", "dd", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre",
    "section", "table", "tr", "ul",
];

/// Render an HTML document as readable plain text
///
/// The document is parsed with `scraper`, so entities are decoded and
/// malformed markup is recovered the way a browser would. Block elements
/// become line breaks, list items are prefixed with `- ` and links keep
/// their target as `text [href]`.
///
/// ```rust
/// use acton_mail::mime::html_to_text;
///
/// assert_eq!(html_to_text("<p>Hi</p>").unwrap(), "Hi");
/// assert_eq!(
///     html_to_text(r#"<p>Go <a href="https://example.com">here</a></p>"#).unwrap(),
///     "Go here [https://example.com]"
/// );
/// ```
///
/// # Errors
///
/// Returns [`HtmlToTextError::TooDeep`] when elements nest deeper than
/// [`MAX_HTML_DEPTH`].
pub fn html_to_text(html: &str) -> Result<String, HtmlToTextError> {
    let document = Html::parse_document(html);
    let mut out = TextWriter::default();
    render(document.root_element(), 0, &mut out)?;
    Ok(out.finish())
}

fn render(
    element: ElementRef<'_>,
    depth: usize,
    out: &mut TextWriter,
) -> Result<(), HtmlToTextError> {
    if depth > MAX_HTML_DEPTH {
        return Err(HtmlToTextError::TooDeep(MAX_HTML_DEPTH));
    }

    let name = element.value().name();
    if SKIPPED.contains(&name) {
        return Ok(());
    }

    let block = BLOCKS.contains(&name);
    if block {
        out.paragraph();
    }
    match name {
        "br" => out.line_break(),
        "li" => {
            out.line_break();
            out.raw("- ");
        }
        "td" | "th" => out.text(" "),
        _ => {}
    }

    let start = out.len();
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.text(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    render(child, depth + 1, out)?;
                }
            }
            _ => {}
        }
    }

    if name == "a" {
        if let Some(href) = element.value().attr("href").map(str::trim) {
            let label = out.since(start).trim();
            if !href.is_empty() && !href.starts_with('#') && label != href {
                out.text(&format!(" [{href}]"));
            }
        }
    }
    if block {
        out.paragraph();
    }

    Ok(())
}

#[derive(Default)]
struct TextWriter {
    buf: String,
    pending_space: bool,
}

impl TextWriter {
    fn len(&self) -> usize {
        self.buf.len()
    }

    fn since(&self, start: usize) -> &str {
        self.buf.get(start..).unwrap_or_default()
    }

    /// Append decoded text, collapsing whitespace runs
    fn text(&mut self, decoded: &str) {
        for c in decoded.chars() {
            if c.is_whitespace() && c != '\u{a0}' {
                self.pending_space = true;
                continue;
            }
            if self.pending_space && !self.buf.is_empty() && !self.buf.ends_with(['\n', ' ']) {
                self.buf.push(' ');
            }
            self.pending_space = false;
            self.buf.push(if c == '\u{a0}' { ' ' } else { c });
        }
    }

    /// Append text without whitespace processing
    fn raw(&mut self, s: &str) {
        self.buf.push_str(s);
        self.pending_space = false;
    }

    fn line_break(&mut self) {
        let trimmed = self.buf.trim_end_matches(' ').len();
        self.buf.truncate(trimmed);
        if !self.buf.is_empty() {
            self.buf.push('\n');
        }
        self.pending_space = false;
    }

    fn paragraph(&mut self) {
        if !self.buf.is_empty() && !self.buf.ends_with("\n\n") {
            self.line_break();
            if !self.buf.ends_with("\n\n") {
                self.buf.push('\n');
            }
        }
        self.pending_space = false;
    }

    fn finish(self) -> String {
        let mut out = String::with_capacity(self.buf.len());
        let mut newlines = 0;
        for line in self.buf.lines().map(str::trim_end) {
            if line.is_empty() {
                newlines += 1;
                continue;
            }
            if !out.is_empty() {
                out.push_str(if newlines > 0 { "\n\n" } else { "\n" });
            }
            out.push_str(line);
            newlines = 0;
        }
        out
    }
}
