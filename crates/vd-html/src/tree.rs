//! Tree node representation for parsed HTML.

/// Element node in a parsed HTML tree.
///
/// Text is stored in two slots instead of as child nodes: `text` is the
/// content before the first child element, `tail` is the content following
/// this element inside its parent. Attributes keep document order so a
/// tree serializes deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlNode {
    /// Element tag name.
    pub tag: String,
    /// Direct leading text content.
    pub text: String,
    /// Text after this element (XML tail).
    pub tail: String,
    /// Attributes in document order.
    pub attrs: Vec<(String, String)>,
    /// Child element nodes.
    pub children: Vec<HtmlNode>,
}

impl HtmlNode {
    /// Create a new node with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Set text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute (builder form).
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<HtmlNode>) -> Self {
        self.children = children;
        self
    }

    /// Attribute value by name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.attrs.iter_mut().find(|(k, _)| *k == name) {
            entry.1 = value;
        } else {
            self.attrs.push((name, value));
        }
    }

    /// Remove an attribute. Returns `true` when it was present.
    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|(k, _)| k != name);
        self.attrs.len() != before
    }

    /// Whether the `class` attribute contains the given token.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|v| v.split_whitespace().any(|c| c == class))
    }

    /// Append a class token unless already present.
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        match self.attr("class") {
            Some(existing) if !existing.is_empty() => {
                let merged = format!("{existing} {class}");
                self.set_attr("class", merged);
            }
            _ => self.set_attr("class", class),
        }
    }

    /// Remove a class token if present.
    pub fn remove_class(&mut self, class: &str) {
        let Some(existing) = self.attr("class") else {
            return;
        };
        let remaining: Vec<&str> = existing
            .split_whitespace()
            .filter(|c| *c != class)
            .collect();
        self.set_attr("class", remaining.join(" "));
    }

    /// Replace a class token with another, keeping its position.
    pub fn replace_class(&mut self, from: &str, to: &str) {
        let Some(existing) = self.attr("class") else {
            return;
        };
        if !existing.split_whitespace().any(|c| c == from) {
            return;
        }
        let replaced: Vec<&str> = existing
            .split_whitespace()
            .map(|c| if c == from { to } else { c })
            .collect();
        self.set_attr("class", replaced.join(" "));
    }

    /// First descendant (depth-first, self included) with the given tag.
    pub fn find_mut(&mut self, tag: &str) -> Option<&mut HtmlNode> {
        if self.tag == tag {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(tag))
    }

    /// Visit this element and every descendant, depth-first.
    pub fn for_each_mut(&mut self, f: &mut dyn FnMut(&mut HtmlNode)) {
        f(self);
        for child in &mut self.children {
            child.for_each_mut(f);
        }
    }

    /// Remove every descendant matching the predicate.
    ///
    /// Tail text of a removed element is reattached to the preceding
    /// sibling (or to this node's text) so surrounding content survives.
    pub fn remove_descendants(&mut self, pred: &dyn Fn(&HtmlNode) -> bool) {
        let mut i = 0;
        while i < self.children.len() {
            if pred(&self.children[i]) {
                let removed = self.children.remove(i);
                if !removed.tail.is_empty() {
                    if i == 0 {
                        self.text.push_str(&removed.tail);
                    } else {
                        self.children[i - 1].tail.push_str(&removed.tail);
                    }
                }
            } else {
                self.children[i].remove_descendants(pred);
                i += 1;
            }
        }
    }
}
