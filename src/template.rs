use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

/// Replace {{field}} placeholders with values from a flat string map.
/// Unknown fields render as empty strings. No escaping, no conditionals.
pub fn render(template: &str, data: &HashMap<String, String>) -> String {
    TEMPLATE_RE
        .replace_all(template, |caps: &regex::Captures| {
            data.get(&caps[1]).cloned().unwrap_or_default()
        })
        .to_string()
}

/// A rendered message shorter than 2 characters after trimming is treated
/// as empty; the target is skipped rather than sent as a blank message.
pub fn is_blank(rendered: &str) -> bool {
    rendered.trim().len() < 2
}
