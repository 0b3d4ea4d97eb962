//! Reading attachment streams

use tokio::io::AsyncReadExt;

use super::{AttachmentReader, MailerError};
use crate::mime;

/// Read one attachment to the end and detect its content type
///
/// # Errors
///
/// Returns `MailerError::Attachment` carrying `filename` if the stream fails.
pub async fn read_attachment(
    filename: &str,
    reader: &mut AttachmentReader,
) -> Result<(Vec<u8>, &'static str), MailerError> {
    let attachment_error = |source| MailerError::Attachment {
        filename: filename.to_string(),
        source,
    };

    let (mut reader, content_type) = mime::sniff(reader).await.map_err(attachment_error)?;

    let mut content = Vec::new();
    reader
        .read_to_end(&mut content)
        .await
        .map_err(attachment_error)?;

    Ok((content, content_type))
}
