use std::collections::HashSet;

use once_cell::sync::Lazy;
use thiserror::Error;

/// Tags that survive sanitization. Everything else is flattened to its text
/// content.
static ALLOWED_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "p", "br", "strong", "b", "em", "i", "u", "s", "strike", "h1", "h2", "h3", "h4", "h5",
        "h6", "ul", "ol", "li", "a", "img", "div", "span", "blockquote", "pre", "code", "table",
        "tr", "td", "th", "thead", "tbody",
    ]
    .into_iter()
    .collect()
});

// Elements that never take a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

// Elements whose content is raw character data. The payload is executable or
// style text, never display content, so it is discarded outright instead of
// being flattened like ordinary disallowed markup.
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

#[derive(Debug, Error)]
enum ParseError {
    #[error("unterminated tag at byte {0}")]
    UnterminatedTag(usize),
    #[error("unterminated comment at byte {0}")]
    UnterminatedComment(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<Node>,
    },
}

/// Cleans rich-text markup down to the allow-listed tags and attributes.
///
/// Disallowed elements are replaced by their flattened text content, kept
/// elements lose every attribute outside the per-tag allow-list, and any
/// attribute whose value contains `javascript:` (case-insensitive) is
/// stripped regardless of the allow-lists. Input that does not parse is
/// returned unchanged — fail-open is a deliberate policy carried over from
/// the original behavior, so the output is best-effort, not a safety proof.
/// Sanitizing already-sanitized output changes nothing.
pub fn sanitize(raw: &str) -> String {
    match parse(raw) {
        Ok(nodes) => {
            let cleaned = clean_nodes(nodes);
            let mut out = String::with_capacity(raw.len());
            for node in &cleaned {
                write_node(node, &mut out);
            }
            out
        }
        Err(_) => raw.to_string(),
    }
}

/// Flattened text content of the markup, for plain-text surfaces. Fail-open
/// like `sanitize`: unparseable input comes back verbatim.
pub fn text_content(raw: &str) -> String {
    match parse(raw) {
        Ok(nodes) => collect_text(&nodes),
        Err(_) => raw.to_string(),
    }
}

fn clean_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            Node::Text(_) => out.push(node),
            Node::Element {
                tag,
                attrs,
                children,
            } => {
                if !ALLOWED_TAGS.contains(tag.as_str()) {
                    let text = collect_text(&children);
                    if !text.is_empty() {
                        out.push(Node::Text(text));
                    }
                    continue;
                }
                let kept = attrs
                    .into_iter()
                    .filter(|(name, value)| {
                        allowed_attribute(&tag, name)
                            && !value.to_ascii_lowercase().contains("javascript:")
                    })
                    .collect();
                out.push(Node::Element {
                    tag,
                    attrs: kept,
                    children: clean_nodes(children),
                });
            }
        }
    }
    out
}

fn allowed_attribute(tag: &str, name: &str) -> bool {
    match tag {
        "a" => matches!(name, "href" | "title" | "target"),
        "img" => matches!(name, "src" | "alt" | "title" | "width" | "height"),
        "div" | "span" | "table" | "tr" | "td" | "th" => name == "class",
        _ => false,
    }
}

fn collect_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    push_text(nodes, &mut out);
    out
}

fn push_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element { children, .. } => push_text(children, out),
        }
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(text),
        Node::Element {
            tag,
            attrs,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&value.replace('"', "&quot;"));
                out.push('"');
            }
            out.push('>');
            if is_void(tag) {
                return;
            }
            for child in children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_TAGS.contains(&tag)
}

#[derive(Debug)]
enum Token {
    Text(String),
    Open {
        tag: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close(String),
}

fn parse(input: &str) -> Result<Vec<Node>, ParseError> {
    let tokens = tokenize(input)?;

    // Stack of open elements; unmatched close tags are dropped and anything
    // still open at the end is auto-closed, the usual tolerant recovery.
    let mut stack: Vec<(String, Vec<(String, String)>, Vec<Node>)> = Vec::new();
    let mut top: Vec<Node> = Vec::new();

    for token in tokens {
        match token {
            Token::Text(text) => {
                sink(&mut stack, &mut top).push(Node::Text(text));
            }
            Token::Open {
                tag,
                attrs,
                self_closing,
            } => {
                if self_closing || is_void(&tag) {
                    sink(&mut stack, &mut top).push(Node::Element {
                        tag,
                        attrs,
                        children: Vec::new(),
                    });
                } else {
                    stack.push((tag, attrs, Vec::new()));
                }
            }
            Token::Close(name) => {
                let Some(open_idx) = stack.iter().rposition(|(tag, _, _)| *tag == name) else {
                    continue;
                };
                while stack.len() > open_idx {
                    let (tag, attrs, children) = stack.pop().expect("non-empty stack");
                    sink(&mut stack, &mut top).push(Node::Element {
                        tag,
                        attrs,
                        children,
                    });
                }
            }
        }
    }

    while let Some((tag, attrs, children)) = stack.pop() {
        sink(&mut stack, &mut top).push(Node::Element {
            tag,
            attrs,
            children,
        });
    }

    Ok(top)
}

fn sink<'a>(
    stack: &'a mut Vec<(String, Vec<(String, String)>, Vec<Node>)>,
    top: &'a mut Vec<Node>,
) -> &'a mut Vec<Node> {
    match stack.last_mut() {
        Some((_, _, children)) => children,
        None => top,
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let rest = &input[pos..];

        if rest.starts_with("<!--") {
            flush_text(input, text_start, pos, &mut tokens);
            let Some(end) = rest[4..].find("-->") else {
                return Err(ParseError::UnterminatedComment(pos));
            };
            pos += 4 + end + 3;
            text_start = pos;
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            flush_text(input, text_start, pos, &mut tokens);
            let Some(end) = rest.find('>') else {
                return Err(ParseError::UnterminatedTag(pos));
            };
            pos += end + 1;
            text_start = pos;
        } else if rest.starts_with("</") {
            flush_text(input, text_start, pos, &mut tokens);
            let Some(end) = rest.find('>') else {
                return Err(ParseError::UnterminatedTag(pos));
            };
            let name = rest[2..end].trim().to_ascii_lowercase();
            if !name.is_empty() {
                tokens.push(Token::Close(name));
            }
            pos += end + 1;
            text_start = pos;
        } else if rest.len() > 1 && rest.as_bytes()[1].is_ascii_alphabetic() {
            flush_text(input, text_start, pos, &mut tokens);
            let end = find_tag_end(rest).ok_or(ParseError::UnterminatedTag(pos))?;
            let inner = rest[1..end].trim_end();
            let self_closing = inner.ends_with('/');
            let inner = inner.strip_suffix('/').unwrap_or(inner);
            let (tag, attrs) = parse_tag_body(inner);
            pos += end + 1;
            text_start = pos;

            if is_raw_text(&tag) && !self_closing {
                // Skip the raw payload up to the matching close tag, or to
                // the end of input when the author never closed it.
                pos = skip_raw_content(input, pos, &tag);
                text_start = pos;
                tokens.push(Token::Open {
                    tag: tag.clone(),
                    attrs,
                    self_closing: false,
                });
                tokens.push(Token::Close(tag));
            } else {
                tokens.push(Token::Open {
                    tag,
                    attrs,
                    self_closing,
                });
            }
        } else {
            // Stray '<' that does not open anything stays in the text run.
            pos += 1;
        }
    }

    flush_text(input, text_start, input.len(), &mut tokens);
    Ok(tokens)
}

fn flush_text(input: &str, start: usize, end: usize, tokens: &mut Vec<Token>) {
    if end > start {
        tokens.push(Token::Text(input[start..end].to_string()));
    }
}

// Byte offset of the closing '>' of the tag starting at `rest[0]`, honoring
// quoted attribute values.
fn find_tag_end(rest: &str) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (idx, byte) in rest.bytes().enumerate() {
        match quote {
            Some(open) => {
                if byte == open {
                    quote = None;
                }
            }
            None => match byte {
                b'"' | b'\'' => quote = Some(byte),
                b'>' => return Some(idx),
                _ => {}
            },
        }
    }
    None
}

fn parse_tag_body(inner: &str) -> (String, Vec<(String, String)>) {
    let name_end = inner
        .find(|c: char| c.is_ascii_whitespace())
        .unwrap_or(inner.len());
    let tag = inner[..name_end].to_ascii_lowercase();
    let attrs = parse_attributes(&inner[name_end..]);
    (tag, attrs)
}

fn parse_attributes(mut rest: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return attrs;
        }
        let name_end = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '=')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let value = if let Some(stripped) = rest.strip_prefix('=') {
            let stripped = stripped.trim_start();
            if let Some(quoted) = stripped.strip_prefix('"').map(|tail| ('"', tail)) {
                take_quoted(quoted.0, quoted.1, &mut rest)
            } else if let Some(quoted) = stripped.strip_prefix('\'').map(|tail| ('\'', tail)) {
                take_quoted(quoted.0, quoted.1, &mut rest)
            } else {
                let end = stripped
                    .find(|c: char| c.is_ascii_whitespace())
                    .unwrap_or(stripped.len());
                let value = stripped[..end].to_string();
                rest = &stripped[end..];
                value
            }
        } else {
            String::new()
        };

        if !name.is_empty() {
            attrs.push((name, value));
        }
    }
}

fn take_quoted<'a>(quote: char, tail: &'a str, rest: &mut &'a str) -> String {
    match tail.find(quote) {
        Some(end) => {
            let value = tail[..end].to_string();
            *rest = &tail[end + 1..];
            value
        }
        None => {
            // Unclosed quote; the tokenizer's quote tracking already bounded
            // the tag, take what is left.
            let value = tail.to_string();
            *rest = "";
            value
        }
    }
}

// Returns the byte offset just past `</tag ...>`, or the end of input.
fn skip_raw_content(input: &str, start: usize, tag: &str) -> usize {
    let haystack = input[start..].to_ascii_lowercase();
    let needle = format!("</{}", tag);
    match haystack.find(&needle) {
        Some(off) => match input[start + off..].find('>') {
            Some(close) => start + off + close + 1,
            None => input.len(),
        },
        None => input.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_markup_and_payload_are_removed() {
        assert_eq!(sanitize("<p>hi<script>alert(1)</script></p>"), "<p>hi</p>");
    }

    #[test]
    fn disallowed_tag_keeps_its_text_content() {
        assert_eq!(sanitize("<p><marquee>wow</marquee></p>"), "<p>wow</p>");
        assert_eq!(
            sanitize("<center>a<b>bold</b></center>"),
            "abold"
        );
    }

    #[test]
    fn javascript_href_is_stripped_but_anchor_kept() {
        assert_eq!(
            sanitize("<a href=\"javascript:alert(1)\">x</a>"),
            "<a>x</a>"
        );
        assert_eq!(
            sanitize("<a href=\"JaVaScRiPt:alert(1)\" title=\"ok\">x</a>"),
            "<a title=\"ok\">x</a>"
        );
    }

    #[test]
    fn attributes_outside_allow_list_are_dropped() {
        assert_eq!(
            sanitize("<span class=\"note\" onclick=\"alert(1)\" id=\"x\">hi</span>"),
            "<span class=\"note\">hi</span>"
        );
        assert_eq!(
            sanitize("<img src=\"cat.png\" alt=\"cat\" onerror=\"alert(1)\">"),
            "<img src=\"cat.png\" alt=\"cat\">"
        );
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(sanitize("hello world"), "hello world");
        assert_eq!(sanitize("a < b and c > d"), "a < b and c > d");
    }

    #[test]
    fn nested_allowed_structure_survives() {
        let input = "<div class=\"body\"><h2>Title</h2><ul><li>one</li><li>two</li></ul></div>";
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn table_subelements_keep_class_only() {
        assert_eq!(
            sanitize("<table border=\"1\"><tr class=\"row\"><td width=\"3\">x</td></tr></table>"),
            "<table><tr class=\"row\"><td>x</td></tr></table>"
        );
    }

    #[test]
    fn unparseable_input_is_returned_unchanged() {
        let broken = "<div class=\"x";
        assert_eq!(sanitize(broken), broken);
        let comment = "before <!-- never closed";
        assert_eq!(sanitize(comment), comment);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "<p>hi<script>alert(1)</script></p>",
            "<a href='javascript:x' title=ok>link</a>",
            "<div class=\"a&quot;b\">text</div>",
            "<ul><li>a</li><li><blink>b</blink></li></ul>",
            "<p>unclosed <b>bold",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input: {input}");
        }
    }

    #[test]
    fn unclosed_tags_are_auto_closed() {
        assert_eq!(sanitize("<p>one <b>two"), "<p>one <b>two</b></p>");
    }

    #[test]
    fn comments_and_doctype_are_dropped() {
        assert_eq!(sanitize("<!DOCTYPE html><p>hi<!-- note --></p>"), "<p>hi</p>");
    }

    #[test]
    fn void_elements_serialize_without_close() {
        assert_eq!(sanitize("line<br>break"), "line<br>break");
    }

    #[test]
    fn text_content_flattens_markup() {
        assert_eq!(text_content("<p>a<b>b</b></p><span>c</span>"), "abc");
        assert_eq!(text_content("<p>x<script>alert(1)</script></p>"), "x");
        assert_eq!(text_content("<div class=\"y"), "<div class=\"y");
    }
}
