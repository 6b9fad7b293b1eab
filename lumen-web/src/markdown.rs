//! Markdown to HTML for model replies.

use pulldown_cmark::{html, Event, Options, Parser};

/// Render CommonMark (plus tables, strikethrough, and task lists) to HTML.
///
/// Raw HTML in the input is escaped rather than passed through.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_basic_markdown() {
        let out = render_html("# Title\n\nSome **bold** text.");
        assert!(out.contains("<h1>Title</h1>"));
        assert!(out.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_renders_code_blocks_with_language() {
        let out = render_html("```rust\nfn main() {}\n```");
        assert!(out.contains(r#"<code class="language-rust">"#));
        assert!(out.contains("fn main() {}"));
    }

    #[test]
    fn test_renders_tables_and_strikethrough() {
        let out = render_html("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~old~~");
        assert!(out.contains("<table>"));
        assert!(out.contains("<del>old</del>"));
    }

    #[test]
    fn test_escapes_raw_html() {
        let out = render_html("hello <script>alert(1)</script>");
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_empty_input_renders_empty() {
        assert_eq!(render_html(""), "");
    }
}
