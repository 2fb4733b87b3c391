/// HTML escaping primitive applied to the whole input before tag recognition

/// Entity-escape every character that can alter HTML structure.
///
/// This runs exactly once per render call, over the raw input, so every
/// literal character is inert HTML by the time tag expansion begins. Square
/// brackets pass through untouched; the parser matches tags on the escaped
/// text.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_structural_characters() {
        assert_eq!(
            escape_html("<a href=\"x\">&'"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn test_script_tag_is_inert() {
        assert_eq!(
            escape_html("<script>alert(1)</script>"),
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_brackets_pass_through() {
        assert_eq!(escape_html("[b]hi[/b]"), "[b]hi[/b]");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(escape_html("привет, world"), "привет, world");
    }
}
