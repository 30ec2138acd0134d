//! DOM post-processing passes for rendered documentation pages.
//!
//! [`PostProcessor`] runs four independent passes over a parsed
//! [`HtmlDocument`]:
//!
//! 1. source-code link visibility (dev affordances shown or scrubbed)
//! 2. heading/table-header id synthesis
//! 3. self-anchoring of elements with ids
//! 4. coverage hiding (dev preview of a plain reader's view)
//!
//! Every pass is idempotent and treats missing attributes or structure as a
//! per-element no-op - a malformed fragment never fails a render. After
//! serialization, [`normalize_fragments`] rewrites all fragment identifiers
//! to their URL-safe form (see [`to_fragment_id`]).

mod normalize;
mod slug;

pub use normalize::normalize_fragments;
pub use slug::to_fragment_id;

use vd_html::{HtmlDocument, HtmlNode};

/// Class marking an element that links to its source code.
const CLASS_SOURCE_CODE_TITLE: &str = "source-code-title";
/// Class of the appended source-code link itself.
const CLASS_SOURCE_CODE: &str = "source-code";
/// Generic hidden marker class.
const CLASS_HIDDEN: &str = "hidden";
/// Class of the hidden spans carrying pre-normalization ids.
const CLASS_INVISIBLE_ID: &str = "invisible-id";

/// Semantic classes demoted to `hidden` by the coverage pass.
const CLASSES_TO_HIDE: [&str; 6] = [
    "covered-by-code",
    "introduction",
    "quote",
    "generic",
    "note",
    "excluded",
];

/// Tags eligible for id synthesis.
const ID_BEARING_TAGS: [&str; 7] = ["h1", "h2", "h3", "h4", "h5", "h6", "th"];

/// Post-processor over parsed document trees.
#[derive(Debug, Clone)]
pub struct PostProcessor {
    dev_mode: bool,
    hide_covered: bool,
    table_marker: Option<String>,
}

impl PostProcessor {
    /// Create a post-processor for the given visibility context.
    #[must_use]
    pub fn new(dev_mode: bool, hide_covered: bool) -> Self {
        Self {
            dev_mode,
            hide_covered,
            table_marker: None,
        }
    }

    /// Restrict id synthesis on table headers to cells whose text contains
    /// the marker token. Without a marker every `th` is eligible.
    #[must_use]
    pub fn with_table_marker(mut self, marker: impl Into<String>) -> Self {
        self.table_marker = Some(marker.into());
        self
    }

    /// Whether the processor runs with dev affordances visible.
    #[must_use]
    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Run all tree passes in order.
    pub fn process_document(&self, doc: &mut HtmlDocument) {
        self.prepare_code_links(doc);
        self.add_ids_to_headings(doc);
        self.add_self_anchors(doc);
        self.hide_covered(doc);
    }

    /// Source-code link visibility.
    ///
    /// In dev mode, elements marked as source-code titles get a visible
    /// link to their `data-source-code` target appended. Outside dev mode
    /// the marker class is demoted to `hidden` and the dev-only markers and
    /// data attribute are scrubbed for public output.
    pub fn prepare_code_links(&self, doc: &mut HtmlDocument) {
        let dev_mode = self.dev_mode;
        doc.for_each_element_mut(&mut |el| {
            if !el.has_class(CLASS_SOURCE_CODE_TITLE) {
                return;
            }
            if dev_mode {
                let Some(target) = el.attr("data-source-code").map(ToOwned::to_owned) else {
                    return;
                };
                if el.children.iter().any(|c| c.has_class(CLASS_SOURCE_CODE)) {
                    return;
                }
                let link = HtmlNode::new("a")
                    .with_attr("class", CLASS_SOURCE_CODE)
                    .with_attr("href", target)
                    .with_text("source code");
                el.children.push(link);
            } else {
                el.replace_class(CLASS_SOURCE_CODE_TITLE, CLASS_HIDDEN);
                el.remove_class("covered-by-code");
                el.remove_class("generic");
                el.remove_attr("data-source-code");
            }
        });
    }

    /// Heading/table-header id synthesis.
    ///
    /// Derives an id from the first text directly inside each heading (and
    /// eligible `th`), recording the pre-normalization form in
    /// `data-original-id`. Elements that already carry an id are skipped.
    pub fn add_ids_to_headings(&self, doc: &mut HtmlDocument) {
        let marker = self.table_marker.as_deref();
        doc.for_each_element_mut(&mut |el| {
            if !ID_BEARING_TAGS.contains(&el.tag.as_str()) {
                return;
            }
            if el.attr("id").is_some_and(|id| !id.is_empty()) {
                return;
            }
            if el.tag == "th"
                && let Some(marker) = marker
                && !text_content(el).contains(marker)
            {
                return;
            }
            let id = first_direct_text(el).to_owned();
            if id.is_empty() {
                return;
            }
            el.set_attr("id", id.clone());
            if el.attr("data-original-id").is_none() {
                el.set_attr("data-original-id", id);
            }
        });
    }

    /// Self-anchoring tree phase.
    ///
    /// For every element in the body carrying an id whose first child is a
    /// text node, the text is wrapped in a link back to the element's own
    /// fragment and the remaining children are transferred into that link,
    /// order preserved. Children are handled before deeper descendants.
    pub fn add_self_anchors(&self, doc: &mut HtmlDocument) {
        let Some(body) = doc.body_mut() else {
            return;
        };
        anchor_elements_with_ids(&mut body.children);
    }

    /// Coverage hiding.
    ///
    /// Only active when both the dev flag and the hide-covered flag are
    /// set: removes every image and demotes the fixed set of semantic
    /// classes to `hidden`, previewing what a plain reader would see.
    pub fn hide_covered(&self, doc: &mut HtmlDocument) {
        if !self.dev_mode || !self.hide_covered {
            return;
        }
        doc.remove_elements(&|el| el.tag == "img");
        doc.for_each_element_mut(&mut |el| {
            for class in CLASSES_TO_HIDE {
                el.replace_class(class, CLASS_HIDDEN);
            }
        });
    }
}

/// Wrap leading text of id-carrying elements in self-referencing links.
fn anchor_elements_with_ids(nodes: &mut Vec<HtmlNode>) {
    for node in nodes.iter_mut() {
        // The hidden original-id spans are fragment targets, not content.
        if node.has_class(CLASS_INVISIBLE_ID) {
            continue;
        }
        if let Some(id) = node.attr("id").filter(|id| !id.is_empty())
            && !node.text.is_empty()
        {
            let mut anchor = HtmlNode::new("a").with_attr("href", format!("#{id}"));
            anchor.text = std::mem::take(&mut node.text);
            anchor.children = std::mem::take(&mut node.children);
            node.children = vec![anchor];
        }
        anchor_elements_with_ids(&mut node.children);
    }
}

/// First text directly inside an element, in document order.
///
/// Leading text wins; otherwise the first non-empty text following a
/// child element, so `<h2><em>icon</em>Title</h2>` yields `Title`.
fn first_direct_text(node: &HtmlNode) -> &str {
    let text = node.text.trim();
    if !text.is_empty() {
        return text;
    }
    node.children
        .iter()
        .map(|child| child.tail.trim())
        .find(|tail| !tail.is_empty())
        .unwrap_or("")
}

/// Concatenated text of a node and all its descendants.
fn text_content(node: &HtmlNode) -> String {
    fn collect(node: &HtmlNode, out: &mut String) {
        out.push_str(&node.text);
        for child in &node.children {
            collect(child, out);
            out.push_str(&child.tail);
        }
    }
    let mut out = String::new();
    collect(node, &mut out);
    out
}
