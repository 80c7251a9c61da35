//! Turning free-form user input into something the channel lookup understands.

use once_cell::sync::Lazy;
use regex::Regex;

/// Inputs with at most this many words are treated as a channel name guess
const MAX_NAME_WORDS: usize = 5;

/// Length of a `UC...` channel id
const CHANNEL_ID_LEN: usize = 24;

static HANDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([A-Za-z0-9_]+)").expect("valid handle regex"));

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(https?://\S+)").expect("valid url regex"));

static URL_HANDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/@([A-Za-z0-9_.\-]+)").expect("valid url handle regex"));

static URL_CHANNEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/channel/([A-Za-z0-9_-]+)").expect("valid url channel regex"));

static YT_CHANNEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"youtube\.com/channel/(UC[A-Za-z0-9_-]{22})").expect("valid channel regex")
});

static YT_HANDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"youtube\.com/@([A-Za-z0-9_.\-]+)").expect("valid handle regex"));

static YT_LEGACY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"youtube\.com/(?:c|user)/([A-Za-z0-9_-]+)").expect("valid legacy regex")
});

/// What a normalised identifier points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// `UC...` channel id
    Id(String),
    /// Handle without the leading `@`
    Handle(String),
    /// Anything else; resolved through search
    Name(String),
}

/// Pull a handle, channel id or short name out of free text such as
/// "analyze @somechannel please" or a pasted URL.
///
/// Returns an empty string for blank input.
pub fn extract_channel_from_text(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    if let Some(caps) = HANDLE_RE.captures(text) {
        let handle = format!("@{}", &caps[1]);
        log::debug!("extracted handle={handle}");
        return handle;
    }

    if let Some(url) = URL_RE.captures(text).map(|c| c[1].to_string()) {
        if let Some(caps) = URL_HANDLE_RE.captures(&url) {
            return format!("@{}", &caps[1]);
        }
        if let Some(caps) = URL_CHANNEL_RE.captures(&url) {
            return caps[1].to_string();
        }
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= MAX_NAME_WORDS {
        let guess = words.join(" ");
        log::debug!("guessing channel name={guess}");
        return guess;
    }

    text.to_string()
}

pub fn normalize_identifier(identifier: &str) -> ChannelRef {
    let identifier = identifier.trim();

    if is_channel_id(identifier) {
        return ChannelRef::Id(identifier.to_string());
    }
    if let Some(handle) = identifier.strip_prefix('@') {
        return ChannelRef::Handle(handle.to_string());
    }

    if let Some(caps) = YT_CHANNEL_RE.captures(identifier) {
        return ChannelRef::Id(caps[1].to_string());
    }
    if let Some(caps) = YT_HANDLE_RE.captures(identifier) {
        return ChannelRef::Handle(caps[1].to_string());
    }
    if let Some(caps) = YT_LEGACY_RE.captures(identifier) {
        return ChannelRef::Name(caps[1].to_string());
    }

    ChannelRef::Name(identifier.to_string())
}

fn is_channel_id(s: &str) -> bool {
    s.starts_with("UC") && s.len() >= CHANNEL_ID_LEN && !s.contains(char::is_whitespace)
}
