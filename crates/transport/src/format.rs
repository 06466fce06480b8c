//! Plain-text rendering of content items.
//!
//! The layout is what subscribers see in chat: a bold title line, a
//! truncated body, tag and timestamp lines, the item id, and the source
//! link when one exists. Rich per-channel formatting is out of scope;
//! Markdown here is limited to the bold title.

use courier_common::types::ContentItem;

/// Body text is cut at this many characters to stay well under chat
/// message limits.
const BODY_PREVIEW_CHARS: usize = 500;

/// When an item has no title, this many body characters stand in for it.
const TITLE_PREVIEW_CHARS: usize = 50;

/// Render one item, optionally appending a broadcast footer line.
pub fn render(item: &ContentItem, footer: Option<&str>) -> String {
    let mut lines: Vec<String> = Vec::new();

    let title = match item.title.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(title) => title.trim().to_string(),
        None => preview(&item.body, TITLE_PREVIEW_CHARS),
    };
    lines.push(format!("📰 **{}**", title));

    if !item.body.trim().is_empty() {
        lines.push(preview(&item.body, BODY_PREVIEW_CHARS));
    }

    if !item.tags.trim().is_empty() {
        lines.push(format!("🏷️ {}", item.tags));
    }

    if let Some(published) = item.published_at {
        lines.push(format!("⏰ {}", published.format("%Y-%m-%d %H:%M UTC")));
    }

    lines.push(format!("🆔 {}", item.id));

    if let Some(url) = item.source_url.as_deref() {
        lines.push(format!("🔗 {}", url));
    }

    if let Some(footer) = footer {
        lines.push(footer.to_string());
    }

    lines.join("\n")
}

/// Char-boundary-safe prefix with a `...` marker when truncated.
fn preview(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}
