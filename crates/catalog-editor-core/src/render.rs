//! Markdown preview rendering.
//!
//! `render_preview` is a small, pure rewrite pipeline from markdown source to
//! an HTML fragment, used for the read-only preview pane. It is deliberately
//! not a full markdown parser: each rule is a single regex pass, and later
//! passes run over the output of earlier ones. The order below matters.
//!
//! The output is raw markup. Pass it through
//! [`sanitize_preview`](crate::sanitize::sanitize_preview) before handing it
//! to a surface that interprets HTML from untrusted authors.

use std::sync::LazyLock;

use regex_lite::Regex;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            // Patterns are fixed at compile time and covered by tests.
            pattern: Regex::new(pattern).expect("preview rule pattern"),
            replacement,
        }
    }
}

/// Inline and line-level rules, applied in order.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // Bold before italic so `**` isn't consumed as two emphasis markers.
        Rule::new(r"\*\*(.*?)\*\*", "<strong>${1}</strong>"),
        Rule::new(r"\*(.*?)\*", "<em>${1}</em>"),
        Rule::new(r"`(.*?)`", "<code>${1}</code>"),
        Rule::new(r"(?m)^# (.*)$", "<h1>${1}</h1>"),
        Rule::new(r"(?m)^## (.*)$", "<h2>${1}</h2>"),
        Rule::new(r"(?m)^### (.*)$", "<h3>${1}</h3>"),
        Rule::new(r"(?m)^> (.*)$", "<blockquote>${1}</blockquote>"),
        // Each item is wrapped on its own; consecutive items don't get a
        // containing list element.
        Rule::new(r"(?m)^- (.*)$", "<li>${1}</li>"),
        Rule::new(r"(?m)^\d+\. (.*)$", "<li>${1}</li>"),
        // Images before links, since an image reference contains a link.
        Rule::new(r"!\[(.*?)\]\((.*?)\)", r#"<img src="${2}" alt="${1}" />"#),
        Rule::new(
            r"\[(.*?)\]\((.*?)\)",
            r#"<a href="${2}" target="_blank" rel="noopener noreferrer">${1}</a>"#,
        ),
    ]
});

/// Tags produced by the line rules. A line starting with one of these is a
/// block of its own and never goes inside a paragraph.
const BLOCK_OPENERS: [&str; 5] = ["<h1>", "<h2>", "<h3>", "<blockquote>", "<li>"];

fn is_block_line(line: &str) -> bool {
    BLOCK_OPENERS.iter().any(|tag| line.starts_with(tag))
}

/// Render markdown to an HTML fragment for preview.
///
/// Pure and deterministic; never fails. Malformed markdown comes through as
/// literal text. Empty input renders to an empty string.
pub fn render_preview(markdown: &str) -> String {
    let normalized = markdown.replace("\r\n", "\n");

    let mut html = normalized;
    for rule in RULES.iter() {
        // `replace_all` borrows when nothing matched; only reallocate on change.
        if let std::borrow::Cow::Owned(replaced) =
            rule.pattern.replace_all(&html, rule.replacement)
        {
            html = replaced;
        }
    }

    paragraphs(&html)
}

/// Wrap blank-line-separated runs of text in `<p>`, turning the remaining
/// single newlines into `<br>`. Block lines never go inside a paragraph, but
/// a single newline next to one still becomes a `<br>`.
fn paragraphs(html: &str) -> String {
    let mut groups: Vec<String> = Vec::new();
    let mut segments: Vec<String> = Vec::new();
    let mut run: Vec<&str> = Vec::new();

    for line in html.split('\n') {
        if line.trim().is_empty() {
            flush_paragraph(&mut run, &mut segments);
            if !segments.is_empty() {
                groups.push(segments.join("<br>"));
                segments.clear();
            }
        } else if is_block_line(line) {
            flush_paragraph(&mut run, &mut segments);
            segments.push(line.to_string());
        } else {
            run.push(line);
        }
    }
    flush_paragraph(&mut run, &mut segments);
    if !segments.is_empty() {
        groups.push(segments.join("<br>"));
    }

    groups.join("\n")
}

fn flush_paragraph(run: &mut Vec<&str>, segments: &mut Vec<String>) {
    if run.is_empty() {
        return;
    }
    segments.push(format!("<p>{}</p>", run.join("<br>")));
    run.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_empty_input() {
        assert_eq!(render_preview(""), "");
        assert_eq!(render_preview("\n\n\n"), "");
    }

    #[test]
    fn test_inline_rules() {
        assert_snapshot!(
            render_preview("**bold** and *it* with `code`"),
            @"<p><strong>bold</strong> and <em>it</em> with <code>code</code></p>"
        );
    }

    #[test]
    fn test_bold_is_not_double_matched_as_italic() {
        assert_eq!(render_preview("**x**"), "<p><strong>x</strong></p>");
    }

    #[test]
    fn test_headings() {
        assert_eq!(
            render_preview("# One\n## Two\n### Three"),
            "<h1>One</h1><br><h2>Two</h2><br><h3>Three</h3>"
        );
        // No space after the hashes: not a heading
        assert_eq!(render_preview("#tag"), "<p>#tag</p>");
    }

    #[test]
    fn test_quote_and_list_items() {
        assert_eq!(
            render_preview("> said\n- a\n- b\n1. first\n12. twelfth"),
            "<blockquote>said</blockquote><br><li>a</li><br><li>b</li><br><li>first</li><br><li>twelfth</li>"
        );
    }

    #[test]
    fn test_image_and_link() {
        assert_snapshot!(
            render_preview("![cat](https://cdn.example.com/cat.png)"),
            @r#"<p><img src="https://cdn.example.com/cat.png" alt="cat" /></p>"#
        );
        assert_snapshot!(
            render_preview("see [docs](https://example.com)"),
            @r#"<p>see <a href="https://example.com" target="_blank" rel="noopener noreferrer">docs</a></p>"#
        );
    }

    #[test]
    fn test_paragraphs_and_line_breaks() {
        assert_eq!(
            render_preview("one\ntwo\n\nthree"),
            "<p>one<br>two</p>\n<p>three</p>"
        );
    }

    #[test]
    fn test_mixed_document() {
        let source = "# Title\n\nIntro with **bold**.\n\n- item\n- [link](/x)\n\n![](image-url)";
        assert_eq!(
            render_preview(source),
            "<h1>Title</h1>\n\
             <p>Intro with <strong>bold</strong>.</p>\n\
             <li>item</li><br>\
             <li><a href=\"/x\" target=\"_blank\" rel=\"noopener noreferrer\">link</a></li>\n\
             <p><img src=\"image-url\" alt=\"\" /></p>"
        );
    }

    #[test]
    fn test_single_newline_beside_block_is_a_break() {
        assert_eq!(
            render_preview("Intro\n- a\n\n> q\ntail"),
            "<p>Intro</p><br><li>a</li>\n<blockquote>q</blockquote><br><p>tail</p>"
        );
    }

    #[test]
    fn test_unclosed_markers_stay_literal() {
        assert_eq!(render_preview("a * b"), "<p>a * b</p>");
        assert_eq!(render_preview("[open(paren"), "<p>[open(paren</p>");
    }

    #[test]
    fn test_render_is_deterministic() {
        let source = "## H\n\n*a* **b** `c`\n> q";
        assert_eq!(render_preview(source), render_preview(source));
    }

    #[test]
    fn test_crlf_input() {
        assert_eq!(render_preview("a\r\nb"), "<p>a<br>b</p>");
    }
}
