//! Resend backend for sending emails
//!
//! Posts a JSON payload to the Resend `/emails` endpoint. Resend has no
//! separate inline disposition in its payload, so inline attachments are sent
//! as regular attachments (HTML that references them via `cid:` will not
//! render them in place).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ResendSettings;
use crate::mailer::{
    addresses_to_strings, attachment::read_attachment, headers::with_default_headers,
    AttachmentReader, Hook, Mailer, MailerError, Message, SendEvent, SendInterceptor, Terminal,
};

const PROVIDER: &str = "resend";

/// One attachment in the Resend payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendAttachment {
    /// Attachment filename
    pub filename: String,

    /// Base64 encoded content
    pub content: String,

    /// Content type detected from the leading bytes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_type: String,
}

/// JSON body posted to the Resend API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendPayload {
    /// Sender, rendered as `Name <addr>` or `addr`
    pub from: String,

    /// Primary recipients
    pub to: Vec<String>,

    /// CC recipients
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,

    /// BCC recipients
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,

    /// Subject line
    pub subject: String,

    /// HTML body
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub html: String,

    /// Plain text body
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,

    /// Custom headers, including a synthesized `Message-ID`
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// Regular attachments followed by inline ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<ResendAttachment>,
}

/// Error body returned by the Resend API (`{statusCode, message, name}`)
#[derive(Debug, Deserialize)]
struct ResendErrorResponse {
    #[serde(default)]
    message: String,
}

/// Resend email backend
///
/// The underlying `reqwest::Client` is created once and reused, so
/// connections are pooled across sends.
///
/// # Examples
///
/// ```rust,no_run
/// use acton_mail::{Address, Mailer, Message, ResendClient, ResendSettings};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ResendClient::new(ResendSettings::with_api_key("re_123"))?;
///
/// let message = Message::new(Address::with_name("Acme", "noreply@acme.test"))
///     .to(Address::new("user@example.com"))
///     .subject("Hello!")
///     .html("<p>Hello, World!</p>");
///
/// client.send(message).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ResendClient {
    settings: ResendSettings,
    http: reqwest::Client,
    hook: Arc<Hook>,
}

impl ResendClient {
    /// Create a client with its own hook
    ///
    /// # Errors
    ///
    /// Returns `MailerError::Config` if the HTTP client cannot be built.
    pub fn new(settings: ResendSettings) -> Result<Self, MailerError> {
        Self::with_hook(settings, Arc::new(Hook::new()))
    }

    /// Create a client sharing an existing hook
    ///
    /// # Errors
    ///
    /// Returns `MailerError::Config` if the HTTP client cannot be built.
    pub fn with_hook(settings: ResendSettings, hook: Arc<Hook>) -> Result<Self, MailerError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| MailerError::config(format!("failed to build resend HTTP client: {e}")))?;

        Ok(Self {
            settings,
            http,
            hook,
        })
    }

    /// The settings this client was built from
    #[must_use]
    pub const fn settings(&self) -> &ResendSettings {
        &self.settings
    }

    /// Build the JSON payload for `message`
    ///
    /// Reads every attachment stream to the end. Derives a plain text body
    /// from the HTML when no text is given, and adds a `Message-ID` when the
    /// caller did not provide one.
    ///
    /// # Errors
    ///
    /// Returns `MailerError::Attachment` naming the first attachment whose
    /// stream fails; no payload is produced in that case.
    pub async fn build_payload(message: &mut Message) -> Result<ResendPayload, MailerError> {
        let text = message.plain_text();

        let mut attachments =
            Vec::with_capacity(message.attachments.len() + message.inline_attachments.len());
        for (filename, reader) in &mut message.attachments {
            attachments.push(prepare_attachment(filename, reader).await?);
        }
        for (filename, reader) in &mut message.inline_attachments {
            attachments.push(prepare_attachment(filename, reader).await?);
        }

        Ok(ResendPayload {
            from: message.from.to_string(),
            to: addresses_to_strings(&message.to),
            cc: addresses_to_strings(&message.cc),
            bcc: addresses_to_strings(&message.bcc),
            subject: message.subject.clone(),
            html: message.html.clone(),
            text,
            headers: with_default_headers(&message.headers, &message.from),
            attachments,
        })
    }

    async fn transmit(&self, message: &mut Message) -> Result<(), MailerError> {
        if self.settings.api_key.is_empty() {
            return Err(MailerError::config("resend API key is required"));
        }

        let payload = Self::build_payload(message).await?;
        let body = serde_json::to_vec(&payload)?;

        debug!(
            provider = PROVIDER,
            to = payload.to.len(),
            cc = payload.cc.len(),
            bcc = payload.bcc.len(),
            attachments = payload.attachments.len(),
            bytes = body.len(),
            "posting resend payload"
        );

        let response = self
            .http
            .post(&self.settings.endpoint)
            .bearer_auth(&self.settings.api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| MailerError::transport(format!("failed to send resend request: {e}")))?;

        let status = response.status();
        if status.is_success() {
            info!(
                provider = PROVIDER,
                recipients = message.recipient_count(),
                subject = %payload.subject,
                "email sent"
            );
            return Ok(());
        }

        let raw = response.text().await.unwrap_or_default();
        let reason = rejection_message(&raw);
        warn!(provider = PROVIDER, status = status.as_u16(), error = %reason, "resend rejected email");

        Err(MailerError::Rejected {
            provider: PROVIDER,
            status: status.as_u16(),
            message: reason,
        })
    }
}

#[async_trait]
impl Mailer for ResendClient {
    async fn send(&self, message: Message) -> Result<(), MailerError> {
        self.hook.dispatch(message, &Transmit(self)).await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

impl SendInterceptor for ResendClient {
    fn on_send(&self) -> &Hook {
        &self.hook
    }
}

struct Transmit<'a>(&'a ResendClient);

#[async_trait]
impl Terminal for Transmit<'_> {
    async fn call(&self, event: &mut SendEvent) -> Result<(), MailerError> {
        self.0.transmit(&mut event.message).await
    }
}

async fn prepare_attachment(
    filename: &str,
    reader: &mut AttachmentReader,
) -> Result<ResendAttachment, MailerError> {
    let (content, content_type) = read_attachment(filename, reader).await?;

    Ok(ResendAttachment {
        filename: filename.to_string(),
        content: STANDARD.encode(content),
        content_type: content_type.to_string(),
    })
}

/// Prefer the decoded API message, fall back to the raw body
fn rejection_message(raw: &str) -> String {
    serde_json::from_str::<ResendErrorResponse>(raw)
        .ok()
        .filter(|body| !body.message.is_empty())
        .map_or_else(|| raw.to_string(), |body| body.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::headers::MESSAGE_ID;
    use crate::{mime, Address};
    use proptest::prelude::*;

    struct BrokenReader;

    impl tokio::io::AsyncRead for BrokenReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::other("device unplugged")))
        }
    }

    #[tokio::test]
    async fn test_payload_for_html_only_message() {
        let mut message = Message::new(Address::with_name("Test", "test@example.com"))
            .to(Address::new("r@example.com"))
            .subject("S")
            .html("<p>Hi</p>");

        let payload = ResendClient::build_payload(&mut message).await.unwrap();

        assert_eq!(payload.from, "Test <test@example.com>");
        assert_eq!(payload.to, vec!["r@example.com"]);
        assert_eq!(payload.subject, "S");
        assert_eq!(payload.html, "<p>Hi</p>");
        assert_eq!(payload.text, "Hi");
        let id = payload.headers.get(MESSAGE_ID).expect("message id");
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@example.com>"));
    }

    #[tokio::test]
    async fn test_explicit_text_is_kept() {
        let mut message = Message::new(Address::new("sender@example.com"))
            .to(Address::new("to@example.com"))
            .subject("Test")
            .html("<p>Ignored for text</p>")
            .text("Plain text content");

        let payload = ResendClient::build_payload(&mut message).await.unwrap();

        assert_eq!(payload.text, "Plain text content");
    }

    #[tokio::test]
    async fn test_unrenderable_html_leaves_text_empty() {
        let html = "<div>".repeat(mime::MAX_HTML_DEPTH + 1);
        let mut message = Message::new(Address::new("sender@example.com"))
            .to(Address::new("to@example.com"))
            .html(html.clone());

        let payload = ResendClient::build_payload(&mut message).await.unwrap();

        assert!(payload.text.is_empty());
        assert_eq!(payload.html, html);
    }

    #[tokio::test]
    async fn test_malformed_html_still_yields_text() {
        let mut message = Message::new(Address::new("sender@example.com"))
            .to(Address::new("to@example.com"))
            .html("<p>unterminated <b>Caf&eacute;");

        let payload = ResendClient::build_payload(&mut message).await.unwrap();

        assert_eq!(payload.text, "unterminated Café");
    }

    #[tokio::test]
    async fn test_recipients_and_custom_headers() {
        let mut message = Message::new(Address::new("sender@example.com"))
            .to(Address::new("to1@example.com"))
            .to(Address::with_name("Second", "to2@example.com"))
            .cc(Address::new("cc@example.com"))
            .bcc(Address::new("bcc@example.com"))
            .header("X-Custom-Header", "custom-value");

        let payload = ResendClient::build_payload(&mut message).await.unwrap();

        assert_eq!(payload.to, vec!["to1@example.com", "Second <to2@example.com>"]);
        assert_eq!(payload.cc, vec!["cc@example.com"]);
        assert_eq!(payload.bcc, vec!["bcc@example.com"]);
        assert_eq!(
            payload.headers.get("X-Custom-Header").map(String::as_str),
            Some("custom-value")
        );
        assert!(payload.headers.contains_key(MESSAGE_ID));
    }

    #[tokio::test]
    async fn test_sender_without_domain_gets_no_message_id() {
        let mut message = Message::new(Address::new("root"))
            .to(Address::new("to@example.com"))
            .text("hi");

        let payload = ResendClient::build_payload(&mut message).await.unwrap();

        assert!(payload.headers.is_empty());
    }

    #[tokio::test]
    async fn test_attachments_are_encoded_with_detected_type() {
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];
        let mut message = Message::new(Address::new("sender@example.com"))
            .to(Address::new("to@example.com"))
            .attach_bytes("test.txt", b"test content".to_vec())
            .inline_bytes("logo.png", png.clone());

        let payload = ResendClient::build_payload(&mut message).await.unwrap();

        assert_eq!(payload.attachments.len(), 2);
        assert_eq!(payload.attachments[0].filename, "test.txt");
        assert_eq!(payload.attachments[0].content_type, mime::TEXT_PLAIN);
        assert_eq!(
            STANDARD.decode(&payload.attachments[0].content).unwrap(),
            b"test content"
        );
        assert_eq!(payload.attachments[1].filename, "logo.png");
        assert_eq!(payload.attachments[1].content_type, "image/png");
        assert_eq!(STANDARD.decode(&payload.attachments[1].content).unwrap(), png);
    }

    #[tokio::test]
    async fn test_failing_attachment_aborts_payload() {
        let mut message = Message::new(Address::new("sender@example.com"))
            .to(Address::new("to@example.com"))
            .attach_bytes("fine.txt", b"ok".to_vec())
            .attach("broken.bin", BrokenReader);

        let err = ResendClient::build_payload(&mut message).await.unwrap_err();

        match err {
            MailerError::Attachment { filename, .. } => assert_eq!(filename, "broken.bin"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_payload_json_omits_empty_optional_fields() {
        let payload = ResendPayload {
            from: "a@example.com".to_string(),
            to: vec!["b@example.com".to_string()],
            subject: "S".to_string(),
            ..ResendPayload::default()
        };

        let json = serde_json::to_value(&payload).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 3);
        assert!(object.contains_key("from"));
        assert!(object.contains_key("to"));
        assert!(object.contains_key("subject"));
    }

    #[test]
    fn test_rejection_message_prefers_decoded_message() {
        assert_eq!(
            rejection_message(r#"{"statusCode": 401, "message": "Invalid API key", "name": "unauthorized"}"#),
            "Invalid API key"
        );
        assert_eq!(rejection_message(r#"{"message": ""}"#), r#"{"message": ""}"#);
        assert_eq!(rejection_message("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let client = ResendClient::new(ResendSettings {
            endpoint: "http://127.0.0.1:9/emails".to_string(),
            ..ResendSettings::default()
        })
        .unwrap();

        let message = Message::new(Address::with_name("Test", "test@example.com"))
            .to(Address::new("recipient@example.com"))
            .subject("Test Subject")
            .html("<p>Test</p>");

        let err = client.send(message).await.unwrap_err();
        assert!(matches!(err, MailerError::Config(_)));
    }

    #[test]
    fn test_on_send_returns_same_hook() {
        let client = ResendClient::new(ResendSettings::with_api_key("test_key")).unwrap();
        assert!(std::ptr::eq(client.on_send(), client.on_send()));
        assert_eq!(client.provider_name(), "resend");
    }

    #[test]
    fn test_implements_mailer_traits() {
        fn assert_mailer<T: Mailer + SendInterceptor>() {}
        assert_mailer::<ResendClient>();
    }

    proptest! {
        #[test]
        fn prop_attachments_round_trip(
            regular in proptest::collection::btree_map("[a-z]{1,8}\\.bin", proptest::collection::vec(any::<u8>(), 0..512), 0..4),
            inline in proptest::collection::btree_map("[a-z]{1,8}\\.img", proptest::collection::vec(any::<u8>(), 0..512), 0..4),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let mut message = Message::new(Address::new("sender@example.com"));
            for (name, data) in &regular {
                message = message.attach_bytes(name.clone(), data.clone());
            }
            for (name, data) in &inline {
                message = message.inline_bytes(name.clone(), data.clone());
            }

            let payload = runtime.block_on(ResendClient::build_payload(&mut message)).unwrap();

            prop_assert_eq!(payload.attachments.len(), regular.len() + inline.len());
            for attachment in &payload.attachments {
                let original = regular
                    .get(&attachment.filename)
                    .or_else(|| inline.get(&attachment.filename))
                    .expect("attachment comes from the message");
                prop_assert_eq!(&STANDARD.decode(&attachment.content).unwrap(), original);
            }
        }
    }
}
