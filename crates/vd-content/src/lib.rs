//! Rendered-content pipeline.
//!
//! [`RenderedContent`] turns a parsed documentation page into the exact
//! bytes served to a reader: post-processing passes, version and cache
//! stamps, menu and background decoration, fragment normalization, and a
//! write-through cache keyed by everything that influences the output.
//!
//! The pipeline has three fast paths around the full build:
//!
//! - printable content is served verbatim, no rendering
//! - a valid cache entry is served as-is, the page is never re-assembled
//! - a pending redirect is injected into the served bytes only, after
//!   caching, so a cached page never carries a stale redirect
//!
//! Cache failures degrade to a rebuild, never to an error response.

mod memory;

pub use memory::MemoryCeilingGuard;

use vd_cache::ContentCache;
use vd_html::{HtmlDocument, HtmlError, HtmlNode};
use vd_postprocess::{PostProcessor, normalize_fragments};

/// Failure while assembling a rendered page.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ContentError {
    /// The page or menu markup could not be parsed.
    #[error("content markup error: {0}")]
    Html(#[from] HtmlError),
}

/// How a piece of content is rendered and cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// Regular page with the full rule text.
    Full,
    /// Page restricted to its tables.
    Tabular,
    /// Print-oriented content served verbatim.
    Printable,
    /// Content forwarded from another page; rendered and cached like a
    /// regular page.
    PassThrough,
    /// Not-found page; styled and rendered like a regular page.
    NotFound,
}

impl ContentType {
    /// Whether this content skips rendering and caching entirely.
    #[must_use]
    pub fn bypasses_rendering(self) -> bool {
        matches!(self, Self::Printable)
    }

    /// Whether this is the print-oriented variant.
    #[must_use]
    pub fn is_printable(self) -> bool {
        self == Self::Printable
    }

    /// Whether this is the tables-only variant.
    #[must_use]
    pub fn is_tabular(self) -> bool {
        self == Self::Tabular
    }

    /// Stable token used in cache ids.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Tabular => "tabular",
            Self::Printable => "printable",
            Self::PassThrough => "pass",
            Self::NotFound => "not_found",
        }
    }
}

/// A pending client-side redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Absolute or relative target URL.
    pub target: String,
    /// Seconds the client waits before following.
    pub after_seconds: u32,
}

impl Redirect {
    /// Create a redirect to `target` after `after_seconds`.
    #[must_use]
    pub fn new(target: impl Into<String>, after_seconds: u32) -> Self {
        Self {
            target: target.into(),
            after_seconds,
        }
    }
}

/// Source of the page markup being rendered.
pub trait HtmlContentSource {
    /// Parse the page into a document tree for the build path.
    ///
    /// # Errors
    ///
    /// Returns [`HtmlError`] when the markup cannot be parsed.
    fn html_document(&self) -> Result<HtmlDocument, HtmlError>;

    /// The raw serialized page, for content served verbatim.
    fn plain_value(&self) -> String;
}

/// Source of the navigation menu markup.
pub trait MenuBody {
    /// Menu markup injected into every rendered page; empty disables it.
    fn value(&self) -> String;
}

/// Compose the cache id for one rendered variant of a page.
///
/// Everything that changes the rendered bytes is part of the id: the
/// content version, the page name, the content type, and the visibility
/// flags. Two requests with the same id are guaranteed the same output.
#[must_use]
pub fn compose_cache_id(
    version: &str,
    page: &str,
    content_type: ContentType,
    dev_mode: bool,
    hide_covered: bool,
) -> String {
    let mut id = format!("{version}_{page}_{}", content_type.name());
    if dev_mode {
        id.push_str("_dev");
    }
    if hide_covered {
        id.push_str("_hide_covered");
    }
    id
}

/// The rendered-content pipeline for a single page variant.
pub struct RenderedContent {
    source: Box<dyn HtmlContentSource>,
    menu: Box<dyn MenuBody>,
    cache: ContentCache,
    post_processor: PostProcessor,
    content_type: ContentType,
    version: String,
    redirect: Option<Redirect>,
}

impl RenderedContent {
    /// Assemble a pipeline for one page variant.
    #[must_use]
    pub fn new(
        source: Box<dyn HtmlContentSource>,
        menu: Box<dyn MenuBody>,
        cache: ContentCache,
        post_processor: PostProcessor,
        content_type: ContentType,
        version: impl Into<String>,
    ) -> Self {
        Self {
            source,
            menu,
            cache,
            post_processor,
            content_type,
            version: version.into(),
            redirect: None,
        }
    }

    /// Attach a redirect to be injected into served output.
    ///
    /// The redirect affects only what [`Self::value`] returns, never what
    /// is written to the cache.
    pub fn set_redirect(&mut self, redirect: Redirect) {
        self.redirect = Some(redirect);
    }

    /// The content type this pipeline renders.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Produce the bytes to serve.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError`] when the page markup cannot be assembled.
    /// Cache reads and writes never fail this method.
    pub fn value(&self) -> Result<String, ContentError> {
        if self.content_type.bypasses_rendering() {
            return Ok(self.source.plain_value());
        }

        let content = if self.cache.is_valid() {
            tracing::debug!("serving cached page {}", self.cache.cache_id());
            self.cache.cached_content()
        } else {
            let built = self.build_content()?;
            self.cache.cache_content(&built);
            if self.post_processor.dev_mode() {
                self.cache.save_content_for_debug(&built);
            }
            built
        };

        Ok(self.inject_redirect(&content))
    }

    /// Run the full build: passes, stamps, decoration, normalization.
    fn build_content(&self) -> Result<String, ContentError> {
        let _memory = MemoryCeilingGuard::engage();
        tracing::debug!("building page {}", self.cache.cache_id());

        let mut doc = self.source.html_document()?;
        self.post_processor.process_document(&mut doc);

        if let Some(root) = doc.document_element_mut() {
            root.set_attr("data-content-version", self.version.clone());
            root.set_attr(
                "data-cached-at",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
            );
        }

        self.insert_menu(&mut doc)?;
        insert_background(&mut doc);

        if let Some(root) = doc.document_element_mut() {
            root.set_attr("data-cache-stamp", self.cache.cache_id());
        }

        Ok(normalize_fragments(&doc.to_html()))
    }

    /// Wrap the menu markup and make it the first element of the body.
    fn insert_menu(&self, doc: &mut HtmlDocument) -> Result<(), ContentError> {
        let menu_body = self.menu.value();
        if menu_body.is_empty() {
            return Ok(());
        }
        let Some(body) = doc.body_mut() else {
            return Ok(());
        };
        let wrapper = HtmlNode::new("div")
            .with_attr("id", "menu_wrapper")
            .with_children(HtmlDocument::parse_fragment(&menu_body)?);
        body.children.insert(0, wrapper);
        Ok(())
    }

    /// Inject the pending redirect into served bytes.
    ///
    /// Best effort: content without a parseable head is served unchanged.
    fn inject_redirect(&self, content: &str) -> String {
        let Some(redirect) = &self.redirect else {
            return content.to_owned();
        };
        let mut doc = match HtmlDocument::parse(content) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("cannot inject redirect into unparseable content: {e}");
                return content.to_owned();
            }
        };
        let Some(head) = doc.head_mut() else {
            tracing::warn!("cannot inject redirect: content has no head");
            return content.to_owned();
        };
        head.children.push(
            HtmlNode::new("meta")
                .with_attr("http-equiv", "Refresh")
                .with_attr(
                    "content",
                    format!("{}; url={}", redirect.after_seconds, redirect.target),
                )
                .with_attr("id", "meta_redirect"),
        );
        doc.to_html()
    }
}

/// Prepend the background decoration to the body.
///
/// Final element order: wallpaper left, wallpaper right, then whatever the
/// body already starts with (the menu wrapper when one was inserted).
fn insert_background(doc: &mut HtmlDocument) {
    let Some(body) = doc.body_mut() else {
        return;
    };
    let right = HtmlNode::new("div").with_attr(
        "class",
        "background-wallpaper background-wallpaper-right background-related",
    );
    let left = HtmlNode::new("div").with_attr(
        "class",
        "background-wallpaper background-wallpaper-left background-related",
    );
    body.children.insert(0, right);
    body.children.insert(0, left);
}
