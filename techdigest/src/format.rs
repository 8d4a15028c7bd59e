use crate::extract::Digest;
use crate::news::Article;

/// Body text is cut to this many characters before rendering.
pub const MAX_BODY_CHARS: usize = 800;

/// Render article + digest into one Telegram-HTML message. Pure function
/// of its inputs, no failure modes.
pub fn format_message(article: &Article, digest: &Digest) -> String {
    let mut out = String::new();

    out.push_str(&format!("<b>📰 {}</b>\n", article.title));

    if !article.source_name.is_empty() {
        out.push_str(&format!("📢 <i>{}</i>", article.source_name));
        if !article.author.is_empty() {
            out.push_str(&format!(" | ✍️ {}", article.author));
        }
        out.push('\n');
    }
    out.push('\n');

    out.push_str(&truncate_body(&article.content));
    out.push_str("\n\n");

    out.push_str("<b>🔑 Key Terms:</b>\n");
    for keyword in &digest.keywords {
        if let Some(translation) = digest.translation(keyword) {
            out.push_str(&format!("• {} — {}\n", keyword, translation));
        }
    }
    out.push('\n');

    out.push_str(&format!(
        "🔗 <a href=\"{}\">Read full article</a>\n",
        article.url
    ));

    out.push_str(&format!(
        "\n📅 Published: {}",
        article.published_at.format("%d.%m.%Y %H:%M")
    ));

    out
}

/// Cut the body at the last sentence end inside the first `MAX_BODY_CHARS`
/// characters; with no usable sentence end, hard-cut and mark the ellipsis.
fn truncate_body(content: &str) -> String {
    if content.chars().count() <= MAX_BODY_CHARS {
        return content.to_string();
    }

    let window: String = content.chars().take(MAX_BODY_CHARS).collect();
    match window.rfind('.') {
        Some(position) if position > 0 => window[..=position].to_string(),
        _ => format!("{}...", window),
    }
}
