//! MIME message assembly shared by the SMTP and sendmail backends
//!
//! Unlike Resend, a raw MIME message has a native inline mechanism: inline
//! attachments become `multipart/related` parts whose `Content-ID` is the
//! filename, so HTML can reference them as `cid:<filename>`.

use lettre::message::{
    header::{ContentType, HeaderName, HeaderValue},
    Attachment, Mailbox, MultiPart, MultiPartBuilder, SinglePart,
};

use crate::mailer::{
    attachment::read_attachment,
    headers::{with_default_headers, MESSAGE_ID},
    Address, Attachments, MailerError, Message,
};

enum Part {
    Single(SinglePart),
    Multi(MultiPart),
}

impl Part {
    fn nest(self, builder: MultiPartBuilder) -> MultiPart {
        match self {
            Self::Single(part) => builder.singlepart(part),
            Self::Multi(part) => builder.multipart(part),
        }
    }
}

/// Build a `lettre` message from `message`, reading every attachment
///
/// # Errors
///
/// Returns `MailerError::InvalidAddress` for an unparseable address,
/// `MailerError::Attachment` for an unreadable attachment and
/// `MailerError::Build` for an invalid header or an empty recipient list.
pub async fn build_message(message: &mut Message) -> Result<lettre::Message, MailerError> {
    let mut builder = lettre::Message::builder()
        .from(mailbox(&message.from)?)
        .subject(message.subject.clone());

    for address in &message.to {
        builder = builder.to(mailbox(address)?);
    }
    for address in &message.cc {
        builder = builder.cc(mailbox(address)?);
    }
    for address in &message.bcc {
        builder = builder.bcc(mailbox(address)?);
    }

    let headers = with_default_headers(&message.headers, &message.from);
    let mut message_id = None;
    for (name, value) in headers {
        if name.eq_ignore_ascii_case(MESSAGE_ID) {
            message_id = Some(value);
            continue;
        }
        let header_name = HeaderName::new_from_ascii(name.clone())
            .map_err(|_| MailerError::build(format!("invalid header name: {name}")))?;
        builder = builder.raw_header(HeaderValue::new(header_name, value));
    }
    builder = builder.message_id(message_id);

    let text = message.plain_text();
    let mut body = match (text.is_empty(), message.html.is_empty()) {
        (false, false) => Part::Multi(MultiPart::alternative_plain_html(
            text,
            message.html.clone(),
        )),
        (true, false) => Part::Single(SinglePart::html(message.html.clone())),
        _ => Part::Single(SinglePart::plain(text)),
    };

    if !message.inline_attachments.is_empty() {
        let related = append(
            body.nest(MultiPart::related()),
            &mut message.inline_attachments,
            Attachment::new_inline,
        )
        .await?;
        body = Part::Multi(related);
    }

    if !message.attachments.is_empty() {
        let mixed = append(
            body.nest(MultiPart::mixed()),
            &mut message.attachments,
            Attachment::new,
        )
        .await?;
        body = Part::Multi(mixed);
    }

    let built = match body {
        Part::Single(part) => builder.singlepart(part),
        Part::Multi(part) => builder.multipart(part),
    };
    built.map_err(|e| MailerError::build(e.to_string()))
}

async fn append(
    mut multipart: MultiPart,
    attachments: &mut Attachments,
    disposition: fn(String) -> Attachment,
) -> Result<MultiPart, MailerError> {
    for (filename, reader) in attachments.iter_mut() {
        let (content, content_type) = read_attachment(filename, reader).await?;
        let content_type = ContentType::parse(content_type)
            .map_err(|e| MailerError::build(format!("invalid content type {content_type}: {e}")))?;
        multipart = multipart.singlepart(disposition(filename.clone()).body(content, content_type));
    }
    Ok(multipart)
}

fn mailbox(address: &Address) -> Result<Mailbox, MailerError> {
    Mailbox::try_from(address)
}
