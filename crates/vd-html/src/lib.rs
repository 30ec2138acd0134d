//! Owned HTML document tree for VD.
//!
//! Rendered pages are manipulated as an owned tree of [`HtmlNode`]s: parse
//! once with quick-xml, mutate in place, serialize back to a string. The
//! model keeps text in `text`/`tail` slots (leading text of an element and
//! text following it) rather than as separate child nodes, which keeps
//! child lists element-only and mutation simple.
//!
//! # Example
//!
//! ```
//! use vd_html::HtmlDocument;
//!
//! let mut doc = HtmlDocument::parse("<html><body><p>Hello</p></body></html>")?;
//! let body = doc.body_mut().expect("document has a body");
//! body.children[0].set_attr("id", "greeting");
//! assert_eq!(doc.to_html(), r#"<html><body><p id="greeting">Hello</p></body></html>"#);
//! # Ok::<(), vd_html::HtmlError>(())
//! ```

mod parser;
mod serializer;
mod tree;

pub use tree::HtmlNode;

/// Error while parsing markup into a tree.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HtmlError {
    /// XML parsing error.
    #[error("markup parse error")]
    Parse(#[from] quick_xml::Error),

    /// Encoding error during parsing.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}

/// A parsed HTML document.
///
/// The tree is held under a synthetic root node so documents without a
/// single top-level element (fragments, doctype-stripped input) parse the
/// same way as full pages.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    root: HtmlNode,
}

impl HtmlDocument {
    /// Parse a well-formed HTML/XHTML string into a document tree.
    ///
    /// Comments, processing instructions, and the doctype are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`HtmlError`] when the markup cannot be read as XML events.
    pub fn parse(html: &str) -> Result<Self, HtmlError> {
        Ok(Self {
            root: parser::parse_wrapped(html)?,
        })
    }

    /// Parse an HTML fragment into a list of top-level nodes.
    ///
    /// Leading text of the fragment (before the first element) is attached
    /// to a synthetic `span` so callers always receive element nodes.
    ///
    /// # Errors
    ///
    /// Returns [`HtmlError`] when the markup cannot be read as XML events.
    pub fn parse_fragment(html: &str) -> Result<Vec<HtmlNode>, HtmlError> {
        let root = parser::parse_wrapped(html)?;
        let mut nodes = Vec::with_capacity(root.children.len() + 1);
        if !root.text.is_empty() {
            nodes.push(HtmlNode::new("span").with_text(root.text));
        }
        nodes.extend(root.children);
        Ok(nodes)
    }

    /// Build a document from already-constructed top-level nodes.
    #[must_use]
    pub fn from_nodes(nodes: Vec<HtmlNode>) -> Self {
        Self {
            root: HtmlNode::new(parser::ROOT_TAG).with_children(nodes),
        }
    }

    /// The document element (`<html>`), if present.
    pub fn document_element_mut(&mut self) -> Option<&mut HtmlNode> {
        self.root.children.iter_mut().find(|n| n.tag == "html")
    }

    /// First `<head>` element anywhere in the tree.
    pub fn head_mut(&mut self) -> Option<&mut HtmlNode> {
        self.root.find_mut("head")
    }

    /// First `<body>` element anywhere in the tree.
    pub fn body_mut(&mut self) -> Option<&mut HtmlNode> {
        self.root.find_mut("body")
    }

    /// Visit every element in the document, depth-first.
    pub fn for_each_element_mut(&mut self, f: &mut dyn FnMut(&mut HtmlNode)) {
        for child in &mut self.root.children {
            child.for_each_mut(f);
        }
    }

    /// Remove every element matching the predicate, keeping trailing text.
    pub fn remove_elements(&mut self, pred: &dyn Fn(&HtmlNode) -> bool) {
        self.root.remove_descendants(pred);
    }

    /// Serialize the document back to a markup string.
    #[must_use]
    pub fn to_html(&self) -> String {
        serializer::serialize(&self.root)
    }
}
