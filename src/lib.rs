/// A recursion-bounded BBCode parser and HTML renderer
pub mod ast;
pub mod escape;
pub mod parser;
pub mod renderer;

use parser::Parser;
use renderer::HtmlRenderer;

/// Convert BBCode markup to sanitized HTML.
///
/// The whole input is entity-escaped once before any tag matching, so
/// literal text can never smuggle raw HTML through. Malformed markup never
/// fails the call: unknown or unclosed constructs stay in the output as
/// escaped literal text.
pub fn bbcode_to_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let escaped = escape::escape_html(text);
    let parser = Parser::new();
    let ast = parser.parse(&escaped);
    let renderer = HtmlRenderer::new();
    renderer.render(&ast)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(bbcode_to_html(""), "");
    }

    #[test]
    fn test_basic_bold() {
        assert_eq!(bbcode_to_html("[b]hi[/b]"), "<strong>hi</strong>");
    }

    #[test]
    fn test_basic_image() {
        assert_eq!(
            bbcode_to_html("[img]http://example.com/a.jpg[/img]"),
            "<img src=\"http://example.com/a.jpg\" alt=\"http://example.com/a.jpg\" />"
        );
    }

    #[test]
    fn test_plain_text_equals_escaper_output() {
        let input = "5 < 6 & \"seven\" > 2";
        assert_eq!(bbcode_to_html(input), escape::escape_html(input));
    }
}
