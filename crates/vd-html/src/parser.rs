//! Markup parser building [`HtmlNode`] trees from quick-xml events.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::HtmlError;
use crate::tree::HtmlNode;

/// Tag of the synthetic wrapper element added around parsed input.
pub(crate) const ROOT_TAG: &str = "vd-root";

/// Parse markup into a tree rooted at a synthetic wrapper node.
///
/// The wrapper makes fragments and multi-rooted input parse uniformly;
/// callers strip it when serializing.
pub(crate) fn parse_wrapped(html: &str) -> Result<HtmlNode, HtmlError> {
    // A doctype may not appear inside an element, so strip it before wrapping.
    let html = strip_doctype(html);
    let wrapped = format!("<{ROOT_TAG}>{html}</{ROOT_TAG}>");
    let mut reader = Reader::from_str(&wrapped);
    reader.config_mut().trim_text(false);

    // Consume events up to the wrapper's start tag.
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == ROOT_TAG.as_bytes() => break,
            Event::Eof => return Ok(HtmlNode::new(ROOT_TAG)),
            _ => {}
        }
        buf.clear();
    }

    let mut root = parse_children(&mut reader, ROOT_TAG)?;
    root.tag = ROOT_TAG.to_owned();
    Ok(root)
}

/// Parse the children of the current element until its end tag.
fn parse_children<R: BufRead>(
    reader: &mut Reader<R>,
    parent_tag: &str,
) -> Result<HtmlNode, HtmlError> {
    let mut buf = Vec::new();
    let mut node = HtmlNode::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let child_tag = decode_name(reader, e.name().as_ref());
                let child_attrs = decode_attrs(reader, &e);
                let mut child = parse_children(reader, &child_tag)?;
                child.tag = child_tag;
                child.attrs = child_attrs;
                node.children.push(child);
            }
            Event::Empty(e) => {
                let child = HtmlNode {
                    tag: decode_name(reader, e.name().as_ref()),
                    attrs: decode_attrs(reader, &e),
                    ..Default::default()
                };
                node.children.push(child);
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                append_text(&mut node, &text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?.into_owned();
                append_text(&mut node, &decode_entity(&entity));
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                append_text(&mut node, &text);
            }
            Event::End(e) => {
                let end_tag = decode_name(reader, e.name().as_ref());
                if end_tag == parent_tag {
                    return Ok(node);
                }
                // Mismatched end tag - continue
            }
            Event::Eof => {
                return Ok(node);
            }
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

fn decode_name<R: BufRead>(reader: &Reader<R>, name: &[u8]) -> String {
    reader.decoder().decode(name).map_or_else(
        |_| String::from_utf8_lossy(name).into_owned(),
        std::borrow::Cow::into_owned,
    )
}

fn decode_attrs<R: BufRead>(reader: &Reader<R>, e: &BytesStart) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    for attr in e.attributes().flatten() {
        let key = reader.decoder().decode(attr.key.as_ref()).map_or_else(
            |_| String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            std::borrow::Cow::into_owned,
        );

        if key.starts_with("xmlns") {
            continue;
        }

        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            std::borrow::Cow::into_owned,
        );

        attrs.push((key, value));
    }
    attrs
}

/// Strip a leading `<!DOCTYPE …>` declaration, if any.
fn strip_doctype(html: &str) -> &str {
    let trimmed = html.trim_start();
    if trimmed.len() >= 9 && trimmed[..9].eq_ignore_ascii_case("<!doctype") {
        if let Some(end) = trimmed.find('>') {
            return &trimmed[end + 1..];
        }
    }
    html
}

/// Append text to the node's text or the last child's tail.
fn append_text(node: &mut HtmlNode, text: &str) {
    if let Some(last_child) = node.children.last_mut() {
        last_child.tail.push_str(text);
    } else {
        node.text.push_str(text);
    }
}

/// Decode entity references to their character values.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        "nbsp" => "\u{00a0}".to_owned(),
        "mdash" => "\u{2014}".to_owned(),
        "ndash" => "\u{2013}".to_owned(),
        "hellip" => "\u{2026}".to_owned(),
        // Numeric character references
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        // Unknown entity - preserve as-is
        _ => format!("&{entity};"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_element() {
        let tree = parse_wrapped("<p>Hello</p>").unwrap();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].tag, "p");
        assert_eq!(tree.children[0].text, "Hello");
    }

    #[test]
    fn test_parse_nested_elements() {
        let tree = parse_wrapped("<p><strong>Bold</strong> text</p>").unwrap();
        let p_node = &tree.children[0];
        assert!(p_node.text.is_empty());
        assert_eq!(p_node.children.len(), 1);

        let strong = &p_node.children[0];
        assert_eq!(strong.tag, "strong");
        assert_eq!(strong.text, "Bold");
        assert_eq!(strong.tail, " text");
    }

    #[test]
    fn test_parse_attributes_keep_order() {
        let tree = parse_wrapped(r#"<h2 class="note" id="x" data-k="v">T</h2>"#).unwrap();
        let h2 = &tree.children[0];
        let keys: Vec<&str> = h2.attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["class", "id", "data-k"]);
    }

    #[test]
    fn test_parse_self_closing() {
        let tree = parse_wrapped("<p>Before<br />After</p>").unwrap();
        let p_node = &tree.children[0];
        assert_eq!(p_node.text, "Before");
        assert_eq!(p_node.children[0].tag, "br");
        assert_eq!(p_node.children[0].tail, "After");
    }

    #[test]
    fn test_parse_entities() {
        let tree = parse_wrapped("<p>a &lt; b &amp; c&nbsp;&#67;</p>").unwrap();
        assert_eq!(tree.children[0].text, "a < b & c\u{00a0}C");
    }

    #[test]
    fn test_parse_empty_input() {
        let tree = parse_wrapped("").unwrap();
        assert!(tree.children.is_empty());
        assert!(tree.text.is_empty());
    }

    #[test]
    fn test_doctype_and_comments_ignored() {
        let tree = parse_wrapped("<!DOCTYPE html><!-- note --><html><body /></html>").unwrap();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].tag, "html");
    }
}
