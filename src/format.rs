//! Telegram HTML rendering for canned texts
//!
//! Canned replies use `**bold**`. Telegram's HTML mode is the least fragile
//! target: escape `& < >`, then turn bold pairs into `<b>` tags. An
//! unmatched `**` is left as literal text.

/// Escape the three characters Telegram HTML mode reserves
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Convert `**bold**` markup to Telegram HTML
pub fn markdown_to_telegram_html(text: &str) -> String {
    let escaped = escape_html(text);
    let mut result = String::with_capacity(escaped.len() + 32);
    let mut rest = escaped.as_str();

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        match after_open.find("**") {
            Some(close) => {
                result.push_str(&rest[..open]);
                result.push_str("<b>");
                result.push_str(&after_open[..close]);
                result.push_str("</b>");
                rest = &after_open[close + 2..];
            }
            None => break,
        }
    }
    result.push_str(rest);
    result
}

/// Remove `**` markers for a plain-text retry
pub fn strip_markup(text: &str) -> String {
    text.replace("**", "")
}
