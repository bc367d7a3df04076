//! Embed builders shared by command handlers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use crate::core::truncate_for_embed;
use serenity::builder::CreateEmbed;

/// Accent colors used across replies
pub struct Colors;

impl Colors {
    pub const DEFAULT: u32 = 0x2B2D31;
    pub const RED: u32 = 0xED4245;
    pub const GREEN: u32 = 0x57F287;
}

/// Build the standard accent-colored embed with a "Powered by" footer.
///
/// Callers chain image/thumbnail/title setters on the returned embed.
pub fn branded_embed(description: &str, footer: &str, footer_icon: Option<&str>) -> CreateEmbed {
    let mut embed = CreateEmbed::default();
    embed.color(Colors::DEFAULT);
    if !description.is_empty() {
        embed.description(truncate_for_embed(description));
    }
    embed.footer(|f| {
        f.text(footer);
        if let Some(url) = footer_icon {
            f.icon_url(url);
        }
        f
    });
    embed
}
