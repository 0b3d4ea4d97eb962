//! Content type sniffing and HTML-to-text rendering for outbound mail
//!
//! Attachment content types are detected from the leading bytes of the stream
//! (magic numbers via the `infer` crate), never from the filename. The peeked
//! bytes are stitched back in front of the stream so callers still read the
//! full content.
//!
//! # Examples
//!
//! ```rust
//! use acton_mail::mime;
//! use tokio::io::AsyncReadExt;
//!
//! # async fn example() -> std::io::Result<()> {
//! let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
//! let (mut reader, content_type) = mime::sniff(std::io::Cursor::new(png.clone())).await?;
//! assert_eq!(content_type, "image/png");
//!
//! let mut all = Vec::new();
//! reader.read_to_end(&mut all).await?;
//! assert_eq!(all, png);
//! # Ok(())
//! # }
//! ```

mod html;

pub use html::{html_to_text, HtmlToTextError, MAX_HTML_DEPTH};

use std::io::{self, Cursor};

use tokio::io::{AsyncRead, AsyncReadExt};

/// Number of leading bytes inspected when sniffing
pub const SNIFF_LEN: u64 = 3072;

/// Fallback for binary content the detector does not recognize
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type reported for UTF-8 text (and empty streams)
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Detect the content type of a byte prefix
#[must_use]
pub fn detect(head: &[u8]) -> &'static str {
    if let Some(kind) = infer::get(head) {
        return kind.mime_type();
    }

    if looks_like_text(head) {
        TEXT_PLAIN
    } else {
        OCTET_STREAM
    }
}

/// Peek at the start of `reader` and detect its content type
///
/// Returns a reader that yields the peeked bytes followed by the remainder of
/// the original stream, so no data is lost.
///
/// # Errors
///
/// Returns the underlying I/O error if the prefix cannot be read.
pub async fn sniff<R>(mut reader: R) -> io::Result<(impl AsyncRead + Unpin, &'static str)>
where
    R: AsyncRead + Unpin,
{
    let mut head = Vec::with_capacity(usize::try_from(SNIFF_LEN).unwrap_or(4096));
    (&mut reader).take(SNIFF_LEN).read_to_end(&mut head).await?;

    let content_type = detect(&head);
    Ok((Cursor::new(head).chain(reader), content_type))
}

fn looks_like_text(head: &[u8]) -> bool {
    let valid_prefix = match std::str::from_utf8(head) {
        Ok(text) => text,
        // A multi-byte character cut off by the sniff window is still text
        Err(err) if err.error_len().is_none() => {
            std::str::from_utf8(&head[..err.valid_up_to()]).unwrap_or_default()
        }
        Err(_) => return false,
    };

    !valid_prefix
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\x0C'))
}
