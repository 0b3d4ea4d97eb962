//! Custom header copying and `Message-ID` defaulting

use std::collections::HashMap;

use rand::{distributions::Alphanumeric, Rng};

use super::Address;

/// Header name checked (case-insensitively) before synthesizing one
pub const MESSAGE_ID: &str = "Message-ID";

/// Length of the random local part of a synthesized `Message-ID`
pub const MESSAGE_ID_TOKEN_LEN: usize = 20;

/// Generate a random alphanumeric token of `len` characters
///
/// Uses the thread-local CSPRNG, so concurrent sends do not collide.
#[must_use]
pub fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Build `<token@domain>` for the sender, or `None` when the sender address
/// does not contain exactly one `@`
#[must_use]
pub fn message_id_for(from: &Address) -> Option<String> {
    from.domain()
        .map(|domain| format!("<{}@{domain}>", random_token(MESSAGE_ID_TOKEN_LEN)))
}

/// Copy the caller's headers and add a `Message-ID` if none is present
///
/// Header names are copied as given. A missing `Message-ID` is synthesized from
/// the sender domain; an unusable sender address silently skips synthesis.
#[must_use]
pub fn with_default_headers(
    headers: &HashMap<String, String>,
    from: &Address,
) -> HashMap<String, String> {
    let mut out = headers.clone();

    let has_message_id = out.keys().any(|name| name.eq_ignore_ascii_case(MESSAGE_ID));
    if !has_message_id {
        if let Some(id) = message_id_for(from) {
            out.insert(MESSAGE_ID.to_string(), id);
        }
    }

    out
}
