//! Recursive serializer from [`HtmlNode`] trees back to markup.

use std::fmt::Write;

use crate::tree::HtmlNode;

/// Serialize the children of a wrapper root to a markup string.
pub(crate) fn serialize(root: &HtmlNode) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(&escape_text(&root.text));
    for child in &root.children {
        serialize_node(child, &mut out);
    }
    out
}

/// Serialize a single node recursively.
fn serialize_node(node: &HtmlNode, out: &mut String) {
    out.push('<');
    out.push_str(&node.tag);

    for (key, value) in &node.attrs {
        write!(out, r#" {}="{}""#, key, escape_attr(value)).unwrap();
    }

    if node.children.is_empty() && node.text.is_empty() {
        out.push_str(" />");
    } else {
        out.push('>');

        if !node.text.is_empty() {
            out.push_str(&escape_text(&node.text));
        }

        for child in &node.children {
            serialize_node(child, out);
        }

        write!(out, "</{}>", node.tag).unwrap();
    }

    if !node.tail.is_empty() {
        out.push_str(&escape_text(&node.tail));
    }
}

/// Escape text content.
fn escape_text(text: &str) -> String {
    escape_markup(text, false)
}

/// Escape attribute values.
fn escape_attr(text: &str) -> String {
    escape_markup(text, true)
}

/// Escape markup special characters.
fn escape_markup(text: &str, escape_quotes: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if escape_quotes => result.push_str("&quot;"),
            _ => result.push(ch),
        }
    }
    result
}
