//! Composite profile handle codec.
//!
//! A profile has a single mutable text field, so the handle, the category tags
//! and the email address are packed into it as three `+`-separated segments:
//!
//! ```text
//! @username + tag,tag,tag + email
//! ```
//!
//! Category tags are truncated to four characters. A delimiter inside a value
//! is escaped with a backslash (`\+`, `\,`). Backslashes are only doubled when
//! they come right before a delimiter, so any value without a delimiter encodes
//! exactly as the older unescaped format did and handles already stored
//! on-chain, backslashes included, stay readable.

use serde::Serialize;

use crate::constants::{CATEGORY_SEP, CATEGORY_TAG_LEN, HANDLE_DELIM, HANDLE_ESCAPE};
use crate::models::Tweet;

/// The three logical parts of a composite handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodedHandle {
    /// Username without the leading `@`
    pub username: String,
    /// Truncated category tags, in stored order
    pub categories: Vec<String>,
    /// Email address, empty when the handle has fewer than three segments
    pub email: String,
}

impl DecodedHandle {
    /// `@username` as shown in the feed
    pub fn display(&self) -> String {
        format!("@{}", self.username)
    }

    pub fn has_category(&self, category: &str) -> bool {
        let tag = truncate_tag(category);
        self.categories.iter().any(|c| *c == tag)
    }
}

/// Truncate a category key to its stored tag form.
///
/// # Examples
/// ```
/// use dtw_core::handle::truncate_tag;
///
/// assert_eq!(truncate_tag("electrical"), "elec");
/// assert_eq!(truncate_tag("art"), "art");
/// ```
pub fn truncate_tag(category: &str) -> String {
    category.chars().take(CATEGORY_TAG_LEN).collect()
}

/// Encode a username, categories and email into a composite handle.
///
/// A leading `@` on the username is kept as-is rather than doubled.
///
/// # Examples
/// ```
/// use dtw_core::handle::encode;
///
/// let raw = encode("@alice", &["electrical", "coding", "farming"], "a@b.com");
/// assert_eq!(raw, "@alice+elec,codi,farm+a@b.com");
/// ```
pub fn encode<S: AsRef<str>>(username: &str, categories: &[S], email: &str) -> String {
    let handle = if username.starts_with('@') {
        username.to_string()
    } else {
        format!("@{}", username)
    };

    let tags: Vec<String> = categories
        .iter()
        .map(|c| escape(&truncate_tag(c.as_ref()), TAG_SPECIALS, true))
        .collect();

    let mut out = escape(&handle, SEGMENT_SPECIALS, true);
    out.push(HANDLE_DELIM);
    out.push_str(&tags.join(&CATEGORY_SEP.to_string()));
    out.push(HANDLE_DELIM);
    out.push_str(&escape(email, SEGMENT_SPECIALS, false));
    out
}

/// Decode a composite handle.
///
/// Never fails: a handle with one segment yields no categories and no email,
/// two segments yield no email. An empty category segment yields no
/// categories, so a lone empty tag reads back as none. Unescaped delimiters
/// past the second one are treated as part of the email, which recovers
/// addresses written by the unescaped format.
pub fn decode(raw: &str) -> DecodedHandle {
    let parts = split_unescaped(raw, HANDLE_DELIM);
    let has_email = parts.len() >= 3;

    let head = unescape(
        parts.first().map(String::as_str).unwrap_or(""),
        SEGMENT_SPECIALS,
        parts.len() >= 2,
    );
    let username = head.strip_prefix('@').unwrap_or(&head).to_string();

    let categories = match parts.get(1) {
        Some(segment) if !segment.is_empty() => {
            let tags = split_unescaped(segment, CATEGORY_SEP);
            let last = tags.len() - 1;
            tags.iter()
                .enumerate()
                .map(|(i, tag)| unescape(tag, TAG_SPECIALS, i < last || has_email))
                .collect()
        }
        _ => Vec::new(),
    };

    let email = if has_email {
        unescape(
            &parts[2..].join(&HANDLE_DELIM.to_string()),
            SEGMENT_SPECIALS,
            false,
        )
    } else {
        String::new()
    };

    DecodedHandle {
        username,
        categories,
        email,
    }
}

pub fn extract_email(raw: &str) -> String {
    decode(raw).email
}

pub fn has_category(raw: &str, category: &str) -> bool {
    decode(raw).has_category(category)
}

/// Keep tweets whose author handle carries any of the selected categories.
/// An empty selection keeps everything.
pub fn filter_by_categories<'a, S: AsRef<str>>(tweets: &'a [Tweet], selected: &[S]) -> Vec<&'a Tweet> {
    if selected.is_empty() {
        return tweets.iter().collect();
    }

    tweets
        .iter()
        .filter(|t| {
            let handle = t.handle();
            selected.iter().any(|cat| handle.has_category(cat.as_ref()))
        })
        .collect()
}

const SEGMENT_SPECIALS: &[char] = &[HANDLE_DELIM];
const TAG_SPECIALS: &[char] = &[HANDLE_DELIM, CATEGORY_SEP];

fn push_escapes(out: &mut String, count: usize) {
    out.extend(std::iter::repeat(HANDLE_ESCAPE).take(count));
}

/// Escape `specials` in `segment`. A run of backslashes is doubled only when it
/// precedes a special character, or ends the segment and `trailing` says a
/// delimiter follows in the encoded output.
fn escape(segment: &str, specials: &[char], trailing: bool) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut run = 0;
    for c in segment.chars() {
        if c == HANDLE_ESCAPE {
            run += 1;
            continue;
        }
        if specials.contains(&c) {
            push_escapes(&mut out, 2 * run + 1);
        } else {
            push_escapes(&mut out, run);
        }
        run = 0;
        out.push(c);
    }
    push_escapes(&mut out, if trailing { 2 * run } else { run });
    out
}

/// Inverse of [`escape`]. Backslashes that do not precede a special character
/// are literal; an odd trailing backslash is kept.
fn unescape(segment: &str, specials: &[char], trailing: bool) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut run = 0;
    for c in segment.chars() {
        if c == HANDLE_ESCAPE {
            run += 1;
            continue;
        }
        if specials.contains(&c) {
            push_escapes(&mut out, run / 2);
        } else {
            push_escapes(&mut out, run);
        }
        run = 0;
        out.push(c);
    }
    push_escapes(&mut out, if trailing { run / 2 + run % 2 } else { run });
    out
}

/// Split on `delim` unless an odd run of backslashes precedes it. Segments
/// keep their escapes.
fn split_unescaped(input: &str, delim: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut run = 0;

    for c in input.chars() {
        if c == delim && run % 2 == 0 {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
        run = if c == HANDLE_ESCAPE { run + 1 } else { 0 };
    }
    parts.push(current);
    parts
}
