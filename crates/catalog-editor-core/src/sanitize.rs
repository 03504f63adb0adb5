//! Allow-list cleanup for rendered preview markup.
//!
//! Markdown sources may carry raw HTML, which `render_preview` passes through
//! untouched. This pass keeps only the tags and attributes the preview rules
//! themselves produce (plus `<u>`, which the underline command inserts) and
//! neutralizes everything else by escaping its opening bracket.

use std::sync::LazyLock;

use regex_lite::{Captures, Regex};

use crate::render::render_preview;
use crate::upload::is_absolute_url;

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)((?:\s[^<>]*)?)>").unwrap());

static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
    )
    .unwrap()
});

static CHAR_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[xX]([0-9A-Fa-f]{1,6})|#([0-9]{1,7})|([A-Za-z][A-Za-z0-9]*));?").unwrap()
});

const BLOCKED_SCHEMES: [&str; 3] = ["javascript", "vbscript", "data"];

fn allowed_attributes(tag: &str) -> Option<&'static [&'static str]> {
    let attrs: &'static [&'static str] = match tag {
        "p" | "br" | "strong" | "em" | "u" | "code" | "h1" | "h2" | "h3" | "blockquote"
        | "li" => &[],
        "a" => &["href", "target", "rel"],
        "img" => &["src", "alt"],
        _ => return None,
    };
    Some(attrs)
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "br" | "img")
}

/// Resolve the character references a browser would decode in an attribute
/// value. Unknown named references are left as written.
fn decode_char_refs(value: &str) -> String {
    CHAR_REF
        .replace_all(value, |caps: &Captures<'_>| {
            let code = match (caps.get(1), caps.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (_, Some(dec)) => dec.as_str().parse().ok(),
                _ => None,
            };
            if let Some(code) = code {
                return char::from_u32(code).unwrap_or('\u{FFFD}').to_string();
            }
            let Some(name) = caps.get(3) else {
                return caps[0].to_string();
            };
            let named = match name.as_str().to_ascii_lowercase().as_str() {
                "colon" => ":",
                "tab" => "\t",
                "newline" => "\n",
                "amp" => "&",
                "sol" => "/",
                "period" => ".",
                "lpar" => "(",
                "rpar" => ")",
                _ => return caps[0].to_string(),
            };
            named.to_string()
        })
        .into_owned()
}

/// Whether a link target may be kept. Script schemes and inline documents are
/// refused; inline images are allowed for `src`.
fn is_safe_url(attr: &str, url: &str) -> bool {
    let compact: String = decode_char_refs(url)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    // A reference left undecoded ahead of the scheme separator could still
    // spell out a scheme.
    if compact.split_once(':').is_some_and(|(head, _)| head.contains('&')) {
        return false;
    }
    if !is_absolute_url(&compact) {
        return true;
    }
    let scheme = compact.split(':').next().unwrap_or_default();
    !BLOCKED_SCHEMES.contains(&scheme) || (attr == "src" && compact.starts_with("data:image/"))
}

fn escape_attr(value: &str) -> String {
    value.replace('"', "&quot;").replace('<', "&lt;").replace('>', "&gt;")
}

fn rebuild_tag(caps: &Captures<'_>) -> Option<String> {
    let closing = !caps[1].is_empty();
    let name = caps[2].to_ascii_lowercase();
    let allowed = allowed_attributes(&name)?;

    if closing {
        return Some(format!("</{name}>"));
    }

    let mut tag = format!("<{name}");
    let raw_attrs = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
    for attr in ATTR.captures_iter(raw_attrs) {
        let attr_name = attr[1].to_ascii_lowercase();
        if !allowed.contains(&attr_name.as_str()) {
            continue;
        }
        let value = attr
            .get(2)
            .or_else(|| attr.get(3))
            .or_else(|| attr.get(4))
            .map(|m| m.as_str())
            .unwrap_or_default();
        if matches!(attr_name.as_str(), "href" | "src") && !is_safe_url(&attr_name, value) {
            tracing::debug!(tag = %name, attr = %attr_name, "dropping unsafe url");
            continue;
        }
        tag.push_str(&format!(" {attr_name}=\"{}\"", escape_attr(value)));
    }
    tag.push_str(if is_void(&name) { " />" } else { ">" });
    Some(tag)
}

/// Strip everything but the preview's own markup from an HTML fragment.
///
/// Disallowed tags are escaped so they show as text rather than vanishing.
pub fn sanitize_preview(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for caps in TAG.captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&html[last..whole.start()].replace('<', "&lt;"));
        match rebuild_tag(&caps) {
            Some(tag) => out.push_str(&tag),
            None => {
                out.push_str("&lt;");
                out.push_str(&whole.as_str()[1..]);
            }
        }
        last = whole.end();
    }
    out.push_str(&html[last..].replace('<', "&lt;"));
    out
}

/// `render_preview` followed by `sanitize_preview`.
pub fn render_preview_sanitized(markdown: &str) -> String {
    sanitize_preview(&render_preview(markdown))
}
