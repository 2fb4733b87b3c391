/// AST node types for BBCode fragments
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Document(Vec<Node>),
    /// Literal text. Already HTML-escaped by the input pre-pass, so the
    /// renderer emits it verbatim.
    Text(String),
    // Inline formatting
    Bold(Vec<Node>),      // <strong> tag
    Underline(Vec<Node>), // <u> tag
    Italic(Vec<Node>),    // <em> tag
    Link {
        href: String,
        /// Display text for the `[url=...]text[/url]` form; `None` means the
        /// href itself is displayed.
        label: Option<String>,
    },
    Color {
        value: String,
        children: Vec<Node>,
    },
    Size {
        /// Requested size in px, as written. Clamping happens at render time.
        px: u32,
        children: Vec<Node>,
    },
    // Block-level nodes
    Quote {
        author: Option<String>,
        children: Vec<Node>,
    },
    List {
        kind: ListKind,
        children: Vec<Node>, // ListItem nodes, plus any content before the first [*]
    },
    ListItem(Vec<Node>),
    /// Verbatim code body; never re-expanded, so markup inside stays literal.
    Code(String),
    Spoiler(Vec<Node>),
    Align {
        alignment: Alignment,
        children: Vec<Node>,
    },
    Image(String),
    Rule,      // <hr /> tag
    LineBreak, // <br /> tag
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ListKind {
    Unordered,
    Decimal,
    LowerAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Alignment {
    Left,
    Center,
    Right,
}
