/// HTML renderer for BBCode AST
use crate::ast::{Alignment, ListKind, Node};
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Fallback anchor for link targets that fail validation.
const LINK_PLACEHOLDER: &str = r##"<a href="#" title="#">A-a-a-a!</a>"##;

/// Font-size clamp bounds, preventing invisible or layout-breaking text.
pub const DEFAULT_MIN_FONT_PX: u32 = 8;
pub const DEFAULT_MAX_FONT_PX: u32 = 48;
/// Longest accepted link or image URL, in characters.
pub const DEFAULT_MAX_URL_LEN: usize = 2000;

/// Schemes rejected regardless of otherwise-valid URL syntax.
const DENIED_SCHEMES: [&str; 3] = ["javascript", "data", "vbscript"];

/// Why a URL was refused. Never crosses the public API: rejection routes to
/// the tag's degradation path plus a diagnostic.
#[derive(Debug, Error)]
enum UrlRejection {
    #[error("denylisted scheme")]
    DeniedScheme,
    #[error("exceeds {limit} characters")]
    TooLong { limit: usize },
    #[error("not a well-formed URL: {0}")]
    Malformed(#[from] url::ParseError),
}

pub struct HtmlRenderer {
    min_font_px: u32,
    max_font_px: u32,
    max_url_len: usize,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        HtmlRenderer {
            min_font_px: DEFAULT_MIN_FONT_PX,
            max_font_px: DEFAULT_MAX_FONT_PX,
            max_url_len: DEFAULT_MAX_URL_LEN,
        }
    }

    pub fn with_limits(min_font_px: u32, max_font_px: u32, max_url_len: usize) -> Self {
        HtmlRenderer {
            min_font_px,
            max_font_px,
            max_url_len,
        }
    }

    pub fn render(&self, node: &Node) -> String {
        self.render_node(node)
    }

    fn render_children(&self, children: &[Node]) -> String {
        children.iter().map(|child| self.render_node(child)).collect()
    }

    fn render_node(&self, node: &Node) -> String {
        match node {
            Node::Document(children) => self.render_children(children),
            // Literal text was escaped by the pre-pass; emit verbatim
            Node::Text(text) => text.clone(),
            Node::Bold(children) => format!("<strong>{}</strong>", self.render_children(children)),
            Node::Underline(children) => format!("<u>{}</u>", self.render_children(children)),
            Node::Italic(children) => format!("<em>{}</em>", self.render_children(children)),
            Node::Link { href, label } => match self.check_url(href) {
                Ok(()) => {
                    let label = label.as_deref().unwrap_or(href);
                    format!(
                        r#"<a href="{href}" target="_blank" rel="noopener noreferrer" title="{label}">{label}</a>"#
                    )
                }
                Err(reason) => {
                    warn!(url = %href, %reason, "rejected link URL, substituting placeholder");
                    LINK_PLACEHOLDER.to_string()
                }
            },
            Node::Color { value, children } => format!(
                r#"<span style="color:{value};">{}</span>"#,
                self.render_children(children)
            ),
            Node::Size { px, children } => {
                let px = (*px).clamp(self.min_font_px, self.max_font_px);
                format!(
                    r#"<span style="font-size:{px}px;">{}</span>"#,
                    self.render_children(children)
                )
            }
            Node::Quote { author, children } => {
                let content = self.render_children(children);
                match author {
                    Some(author) => format!(
                        "<blockquote><strong>{author} писал:</strong><br />{content}</blockquote>"
                    ),
                    None => format!("<blockquote>{content}</blockquote>"),
                }
            }
            Node::List { kind, children } => {
                let content = self.render_children(children);
                match kind {
                    ListKind::Unordered => format!("<ul>{content}</ul>"),
                    ListKind::Decimal => format!(r#"<ol type="1">{content}</ol>"#),
                    ListKind::LowerAlpha => format!(r#"<ol type="a">{content}</ol>"#),
                }
            }
            Node::ListItem(children) => format!("<li>{}</li>", self.render_children(children)),
            Node::Code(literal) => format!("<pre><code>{literal}</code></pre>"),
            Node::Spoiler(children) => format!(
                "<details><summary>Показать/скрыть</summary>{}</details>",
                self.render_children(children)
            ),
            Node::Align {
                alignment,
                children,
            } => {
                let align = match alignment {
                    Alignment::Left => "left",
                    Alignment::Center => "center",
                    Alignment::Right => "right",
                };
                format!(
                    r#"<p style="text-align:{align};">{}</p>"#,
                    self.render_children(children)
                )
            }
            Node::Image(src) => match self.check_url(src) {
                Ok(()) => format!(r#"<img src="{src}" alt="{src}" />"#),
                Err(reason) => {
                    warn!(url = %src, %reason, "dropped image with rejected URL");
                    String::new()
                }
            },
            Node::Rule => "<hr />".to_string(),
            Node::LineBreak => "<br />".to_string(),
        }
    }

    fn check_url(&self, raw: &str) -> Result<(), UrlRejection> {
        let candidate = raw.trim();
        let lower = candidate.to_ascii_lowercase();
        // Prefix check catches denylisted schemes whether or not the rest of
        // the URL would parse
        if DENIED_SCHEMES
            .iter()
            .any(|scheme| lower.strip_prefix(scheme).is_some_and(|rest| rest.starts_with(':')))
        {
            return Err(UrlRejection::DeniedScheme);
        }
        if candidate.chars().count() > self.max_url_len {
            return Err(UrlRejection::TooLong {
                limit: self.max_url_len,
            });
        }
        let parsed = Url::parse(candidate)?;
        // The WHATWG parser strips internal tabs and newlines, so a scheme
        // obfuscated with them still needs to be caught here
        if DENIED_SCHEMES.contains(&parsed.scheme()) {
            return Err(UrlRejection::DeniedScheme);
        }
        Ok(())
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}
