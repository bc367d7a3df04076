//! Discord message limits and markdown helpers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Truncation, markdown emphasis, list joining and permission rendering

use serenity::model::permissions::Permissions;

/// Discord embed description limit
pub const EMBED_LIMIT: usize = 4096;
/// Discord message content limit
pub const MESSAGE_LIMIT: usize = 2000;

/// Truncate text to fit embed limit, adding ellipsis if needed
pub fn truncate_for_embed(text: &str) -> String {
    truncate_to(text, EMBED_LIMIT)
}

/// Truncate text to fit message limit, adding ellipsis if needed
pub fn truncate_for_message(text: &str) -> String {
    truncate_to(text, MESSAGE_LIMIT)
}

fn truncate_to(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    // Find a safe UTF-8 boundary
    let mut end = limit - 3; // Room for "..."
    while !text.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

pub fn bold(text: &str) -> String {
    format!("**{text}**")
}

pub fn italic(text: &str) -> String {
    format!("*{text}*")
}

pub fn underline(text: &str) -> String {
    format!("__{text}__")
}

/// Join items as an English conjunction list: `a`, `a and b`, `a, b, and c`
pub fn format_list<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [first, second] => format!("{} and {}", first.as_ref(), second.as_ref()),
        [rest @ .., last] => {
            let head: Vec<&str> = rest.iter().map(|item| item.as_ref()).collect();
            format!("{}, and {}", head.join(", "), last.as_ref())
        }
    }
}

/// Render each permission as underlined italics and join them as a list
pub fn format_permissions(permissions: Permissions) -> String {
    let names: Vec<String> = permissions
        .get_permission_names()
        .into_iter()
        .map(|name| underline(&italic(name)))
        .collect();
    format_list(&names)
}
