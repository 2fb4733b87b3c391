/// BBCode parser implementation
use crate::ast::{Alignment, ListKind, Node};
use tracing::warn;

/// Nesting levels expanded before the parser stops descending into tag
/// bodies. Bounds worst-case work to a constant multiple of input size
/// regardless of adversarial nesting.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// The fixed set of recognized tag kinds. Dispatch is by exact tag-name
/// match, so no two patterns can overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TagKind {
    Bold,
    Underline,
    Italic,
    Url,
    Color,
    Size,
    Quote,
    List,
    Code,
    Spoiler,
    Left,
    Center,
    Right,
    Img,
    Rule,
    LineBreak,
}

impl TagKind {
    fn from_name(name: &str) -> Option<TagKind> {
        // Tag names are ASCII and case-insensitive
        Some(match name.to_ascii_lowercase().as_str() {
            "b" => TagKind::Bold,
            "u" => TagKind::Underline,
            "i" => TagKind::Italic,
            "url" => TagKind::Url,
            "color" => TagKind::Color,
            "size" => TagKind::Size,
            "quote" => TagKind::Quote,
            "list" => TagKind::List,
            "code" => TagKind::Code,
            "spoiler" => TagKind::Spoiler,
            "left" => TagKind::Left,
            "center" => TagKind::Center,
            "right" => TagKind::Right,
            "img" => TagKind::Img,
            "hr" => TagKind::Rule,
            "br" => TagKind::LineBreak,
            _ => return None,
        })
    }
}

/// An opening tag token: `[name]` or `[name=arg]`.
#[derive(Debug)]
struct OpenTag<'a> {
    name: &'a str,
    arg: Option<&'a str>,
    /// Byte offset just past the closing `]`.
    end: usize,
}

pub struct Parser {
    max_depth: usize,
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Parser { max_depth }
    }

    /// Parse pre-escaped text into a document tree.
    ///
    /// The input is expected to have gone through the escape pre-pass
    /// already; the parser treats everything outside recognized tags as
    /// opaque literal text.
    pub fn parse(&self, input: &str) -> Node {
        Node::Document(self.parse_fragment(input, 0))
    }

    /// Single sweep over `text`: every recognized, properly closed tag
    /// becomes a node, everything else accumulates into literal text runs.
    fn parse_fragment(&self, text: &str, depth: usize) -> Vec<Node> {
        if text.is_empty() {
            return Vec::new();
        }
        if depth >= self.max_depth {
            warn!(depth, "max recursion depth exceeded, leaving markup unexpanded");
            return vec![Node::Text(text.to_string())];
        }
        if !has_tag_open(text) {
            return vec![Node::Text(text.to_string())];
        }

        let bytes = text.as_bytes();
        let mut nodes = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b'[' {
                i += 1;
                continue;
            }
            let Some(open) = scan_open_tag(text, i) else {
                i += 1;
                continue;
            };
            let Some((node, end)) = self.build_node(text, &open, depth) else {
                // Recognized-looking but invalid (unknown name, bad argument,
                // missing close): the bracket stays literal.
                i += 1;
                continue;
            };
            if literal_start < i {
                nodes.push(Node::Text(text[literal_start..i].to_string()));
            }
            nodes.push(node);
            i = end;
            literal_start = end;
        }
        if literal_start < text.len() {
            nodes.push(Node::Text(text[literal_start..].to_string()));
        }
        nodes
    }

    /// Try to turn the open tag at the current position into a node. Returns
    /// the node and the byte offset just past its closing tag.
    fn build_node(&self, text: &str, open: &OpenTag, depth: usize) -> Option<(Node, usize)> {
        let kind = TagKind::from_name(open.name)?;

        // Void tags have neither body nor argument
        match kind {
            TagKind::Rule => return open.arg.is_none().then_some((Node::Rule, open.end)),
            TagKind::LineBreak => return open.arg.is_none().then_some((Node::LineBreak, open.end)),
            _ => {}
        }

        let (close_start, close_end) = find_matching_close(text, open.end, open.name)?;
        let body = &text[open.end..close_start];

        let node = match (kind, open.arg) {
            (TagKind::Bold, None) => Node::Bold(self.parse_fragment(body, depth + 1)),
            (TagKind::Underline, None) => Node::Underline(self.parse_fragment(body, depth + 1)),
            (TagKind::Italic, None) => Node::Italic(self.parse_fragment(body, depth + 1)),
            // Link targets and labels are literal, never re-expanded
            (TagKind::Url, None) => Node::Link {
                href: body.to_string(),
                label: None,
            },
            (TagKind::Url, Some(href)) => Node::Link {
                href: href.to_string(),
                label: Some(body.to_string()),
            },
            (TagKind::Color, Some(value)) if !value.is_empty() => Node::Color {
                value: value.to_string(),
                children: self.parse_fragment(body, depth + 1),
            },
            (TagKind::Size, Some(arg)) => Node::Size {
                px: arg.parse().ok()?,
                children: self.parse_fragment(body, depth + 1),
            },
            (TagKind::Quote, author) => Node::Quote {
                author: author.map(str::to_string),
                children: self.parse_fragment(body, depth + 1),
            },
            (TagKind::List, arg) => {
                let kind = match arg {
                    None => ListKind::Unordered,
                    Some("1") => ListKind::Decimal,
                    Some("a") => ListKind::LowerAlpha,
                    Some(_) => return None,
                };
                Node::List {
                    kind,
                    children: self.parse_list_items(body, depth),
                }
            }
            (TagKind::Code, None) => Node::Code(body.to_string()),
            (TagKind::Spoiler, None) => Node::Spoiler(self.parse_fragment(body, depth + 1)),
            (TagKind::Left, None) => Node::Align {
                alignment: Alignment::Left,
                children: self.parse_fragment(body, depth + 1),
            },
            (TagKind::Center, None) => Node::Align {
                alignment: Alignment::Center,
                children: self.parse_fragment(body, depth + 1),
            },
            (TagKind::Right, None) => Node::Align {
                alignment: Alignment::Right,
                children: self.parse_fragment(body, depth + 1),
            },
            (TagKind::Img, None) => Node::Image(body.to_string()),
            _ => return None,
        };
        Some((node, close_end))
    }

    /// Split a `[list]` body at top-level `[*]` markers and parse each item.
    /// Markers inside a nested `[list]` belong to that list.
    fn parse_list_items(&self, body: &str, depth: usize) -> Vec<Node> {
        let markers = item_marker_positions(body);
        if markers.is_empty() {
            return self.parse_fragment(body, depth + 1);
        }

        let mut children = Vec::new();
        let leading = &body[..markers[0]];
        if !leading.trim().is_empty() {
            children.extend(self.parse_fragment(leading, depth + 1));
        }
        for (idx, &marker) in markers.iter().enumerate() {
            let item_start = marker + 3; // past "[*]"
            let item_end = markers.get(idx + 1).copied().unwrap_or(body.len());
            children.push(Node::ListItem(
                self.parse_fragment(&body[item_start..item_end], depth + 1),
            ));
        }
        children
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Base case for recursion: any `[` followed by an ASCII letter could start
/// a tag. Without one there is nothing left to expand.
fn has_tag_open(text: &str) -> bool {
    text.as_bytes()
        .windows(2)
        .any(|w| w[0] == b'[' && w[1].is_ascii_alphabetic())
}

/// Scan an opening tag token at `start` (which must point at `[`).
fn scan_open_tag(text: &str, start: usize) -> Option<OpenTag<'_>> {
    let bytes = text.as_bytes();
    let name_start = start + 1;
    let mut i = name_start;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    let name = &text[name_start..i];
    match bytes.get(i) {
        Some(b']') => Some(OpenTag {
            name,
            arg: None,
            end: i + 1,
        }),
        Some(b'=') => {
            let arg_start = i + 1;
            let close = text[arg_start..].find(']')? + arg_start;
            Some(OpenTag {
                name,
                arg: Some(&text[arg_start..close]),
                end: close + 1,
            })
        }
        _ => None,
    }
}

/// Scan a closing tag token `[/name]` at `start`. Returns the name and the
/// byte offset just past `]`.
fn scan_close_tag(text: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'[') || bytes.get(start + 1) != Some(&b'/') {
        return None;
    }
    let name_start = start + 2;
    let mut i = name_start;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i == name_start || bytes.get(i) != Some(&b']') {
        return None;
    }
    Some((&text[name_start..i], i + 1))
}

/// Find the close tag matching an open tag of `name`, balancing nested
/// same-name opens. Returns (close_start, close_end).
fn find_matching_close(text: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut nesting = 0usize;
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }
        if let Some((close_name, end)) = scan_close_tag(text, i) {
            if close_name.eq_ignore_ascii_case(name) {
                if nesting == 0 {
                    return Some((i, end));
                }
                nesting -= 1;
            }
            i = end;
            continue;
        }
        if let Some(open) = scan_open_tag(text, i) {
            if open.name.eq_ignore_ascii_case(name) {
                nesting += 1;
                i = open.end;
                continue;
            }
        }
        i += 1;
    }
    None
}

/// Byte offsets of top-level `[*]` markers in a list body, skipping markers
/// that belong to a nested `[list]`.
fn item_marker_positions(body: &str) -> Vec<usize> {
    let bytes = body.as_bytes();
    let mut positions = Vec::new();
    let mut level = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }
        if body[i..].starts_with("[*]") {
            if level == 0 {
                positions.push(i);
            }
            i += 3;
            continue;
        }
        if let Some((close_name, end)) = scan_close_tag(body, i) {
            if close_name.eq_ignore_ascii_case("list") {
                level = level.saturating_sub(1);
            }
            i = end;
            continue;
        }
        if let Some(open) = scan_open_tag(body, i) {
            if open.name.eq_ignore_ascii_case("list") {
                level += 1;
            }
            i = open.end;
            continue;
        }
        i += 1;
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Node {
        Parser::new().parse(input)
    }

    /// Depth of the deepest Bold chain in the tree.
    fn bold_nesting(node: &Node) -> usize {
        match node {
            Node::Document(children) => children.iter().map(bold_nesting).max().unwrap_or(0),
            Node::Bold(children) => 1 + children.iter().map(bold_nesting).max().unwrap_or(0),
            _ => 0,
        }
    }

    #[test]
    fn test_simple_bold() {
        assert_eq!(
            parse("[b]hi[/b]"),
            Node::Document(vec![Node::Bold(vec![Node::Text("hi".to_string())])])
        );
    }

    #[test]
    fn test_text_around_tag() {
        assert_eq!(
            parse("a[i]b[/i]c"),
            Node::Document(vec![
                Node::Text("a".to_string()),
                Node::Italic(vec![Node::Text("b".to_string())]),
                Node::Text("c".to_string()),
            ])
        );
    }

    #[test]
    fn test_unknown_tag_stays_literal() {
        assert_eq!(
            parse("[blink]x[/blink]"),
            Node::Document(vec![Node::Text("[blink]x[/blink]".to_string())])
        );
    }

    #[test]
    fn test_unclosed_tag_stays_literal() {
        assert_eq!(
            parse("[b]never closed"),
            Node::Document(vec![Node::Text("[b]never closed".to_string())])
        );
    }

    #[test]
    fn test_case_insensitive_names() {
        assert_eq!(
            parse("[B]hi[/B]"),
            Node::Document(vec![Node::Bold(vec![Node::Text("hi".to_string())])])
        );
    }

    #[test]
    fn test_tag_names_match_exactly() {
        // "brx" must not be read as [br] followed by junk
        assert_eq!(
            parse("[brx]"),
            Node::Document(vec![Node::Text("[brx]".to_string())])
        );
    }

    #[test]
    fn test_void_tags() {
        assert_eq!(
            parse("a[br]b[hr]c"),
            Node::Document(vec![
                Node::Text("a".to_string()),
                Node::LineBreak,
                Node::Text("b".to_string()),
                Node::Rule,
                Node::Text("c".to_string()),
            ])
        );
    }

    #[test]
    fn test_url_forms() {
        assert_eq!(
            parse("[url]http://e.com[/url]"),
            Node::Document(vec![Node::Link {
                href: "http://e.com".to_string(),
                label: None,
            }])
        );
        assert_eq!(
            parse("[url=http://e.com]here[/url]"),
            Node::Document(vec![Node::Link {
                href: "http://e.com".to_string(),
                label: Some("here".to_string()),
            }])
        );
    }

    #[test]
    fn test_url_body_not_expanded() {
        assert_eq!(
            parse("[url=http://e.com][b]x[/b][/url]"),
            Node::Document(vec![Node::Link {
                href: "http://e.com".to_string(),
                label: Some("[b]x[/b]".to_string()),
            }])
        );
    }

    #[test]
    fn test_code_body_is_verbatim() {
        assert_eq!(
            parse("[code][b]x[/b][/code]"),
            Node::Document(vec![Node::Code("[b]x[/b]".to_string())])
        );
    }

    #[test]
    fn test_quote_with_author() {
        assert_eq!(
            parse("[quote=vasya]hi[/quote]"),
            Node::Document(vec![Node::Quote {
                author: Some("vasya".to_string()),
                children: vec![Node::Text("hi".to_string())],
            }])
        );
    }

    #[test]
    fn test_nested_quotes_balance() {
        assert_eq!(
            parse("[quote][quote]inner[/quote][/quote]"),
            Node::Document(vec![Node::Quote {
                author: None,
                children: vec![Node::Quote {
                    author: None,
                    children: vec![Node::Text("inner".to_string())],
                }],
            }])
        );
    }

    #[test]
    fn test_size_requires_numeric_argument() {
        assert_eq!(
            parse("[size=12]x[/size]"),
            Node::Document(vec![Node::Size {
                px: 12,
                children: vec![Node::Text("x".to_string())],
            }])
        );
        assert_eq!(
            parse("[size=big]x[/size]"),
            Node::Document(vec![Node::Text("[size=big]x[/size]".to_string())])
        );
    }

    #[test]
    fn test_list_items() {
        assert_eq!(
            parse("[list][*]a[*]b[/list]"),
            Node::Document(vec![Node::List {
                kind: ListKind::Unordered,
                children: vec![
                    Node::ListItem(vec![Node::Text("a".to_string())]),
                    Node::ListItem(vec![Node::Text("b".to_string())]),
                ],
            }])
        );
    }

    #[test]
    fn test_list_argument_forms() {
        let Node::Document(nodes) = parse("[list=1][*]a[/list][list=a][*]b[/list]") else {
            panic!("expected document");
        };
        assert_eq!(nodes.len(), 2);
        assert!(matches!(
            nodes[0],
            Node::List {
                kind: ListKind::Decimal,
                ..
            }
        ));
        assert!(matches!(
            nodes[1],
            Node::List {
                kind: ListKind::LowerAlpha,
                ..
            }
        ));
        // Any other argument is not a list
        assert_eq!(
            parse("[list=x][*]a[/list]"),
            Node::Document(vec![Node::Text("[list=x][*]a[/list]".to_string())])
        );
    }

    #[test]
    fn test_nested_list_keeps_its_own_markers() {
        let input = "[list][*]outer[list][*]inner[/list][/list]";
        let Node::Document(nodes) = parse(input) else {
            panic!("expected document");
        };
        let Node::List { children, .. } = &nodes[0] else {
            panic!("expected list");
        };
        // One outer item containing the nested list
        assert_eq!(children.len(), 1);
        let Node::ListItem(item) = &children[0] else {
            panic!("expected list item");
        };
        assert!(matches!(item[1], Node::List { .. }));
    }

    #[test]
    fn test_depth_ceiling_stops_expansion() {
        let input = format!("{}x{}", "[b]".repeat(15), "[/b]".repeat(15));
        let ast = parse(&input);
        assert_eq!(bold_nesting(&ast), DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_injected_depth_ceiling() {
        let input = format!("{}x{}", "[b]".repeat(5), "[/b]".repeat(5));
        let ast = Parser::with_max_depth(2).parse(&input);
        assert_eq!(bold_nesting(&ast), 2);
    }

    #[test]
    fn test_multiline_body() {
        assert_eq!(
            parse("[quote]line one\nline two[/quote]"),
            Node::Document(vec![Node::Quote {
                author: None,
                children: vec![Node::Text("line one\nline two".to_string())],
            }])
        );
    }

    #[test]
    fn test_plain_text_is_single_node() {
        assert_eq!(
            parse("no markup here"),
            Node::Document(vec![Node::Text("no markup here".to_string())])
        );
    }
}
