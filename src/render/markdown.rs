//! Markdown renderer using pulldown-cmark.

use std::sync::Arc;

use linkify::{LinkFinder, LinkKind};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use super::document::{Document, Element, Node};
use super::validate::validate_text;
use super::{FeatureSet, RenderFuture, Rendered, Renderer, ValidationResult};

/// Features every markdown renderer supports.
const BASE_FEATURES: &[&str] = &[
    "headers",
    "paragraphs",
    "emphasis",
    "strong",
    "lists",
    "links",
    "code-blocks",
    "inline-code",
];

/// Features added by GitHub Flavored Markdown.
const GFM_FEATURES: &[&str] = &["tables", "strikethrough", "task-lists", "autolinks", "footnotes"];

/// URL schemes allowed in `href` and `src`. Scheme-less URLs always pass.
const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto", "irc", "ircs", "xmpp"];

/// Elements whose text is never autolinked.
const LITERAL_TAGS: &[&str] = &["a", "code", "pre", "img"];

/// Options for markdown rendering
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Enable GitHub Flavored Markdown extensions
    pub gfm: bool,
    /// Maximum accepted content length, in characters
    pub max_length: usize,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            gfm: true,
            max_length: 100_000,
        }
    }
}

impl MarkdownOptions {
    /// Convert to pulldown-cmark Options
    fn to_pulldown_options(&self) -> Options {
        let mut opts = Options::empty();
        if self.gfm {
            opts.insert(Options::ENABLE_TABLES);
            opts.insert(Options::ENABLE_STRIKETHROUGH);
            opts.insert(Options::ENABLE_TASKLISTS);
            opts.insert(Options::ENABLE_FOOTNOTES);
        }
        opts
    }
}

/// [`Renderer`] for markdown text.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: MarkdownOptions,
}

impl MarkdownRenderer {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }
}

impl Renderer for MarkdownRenderer {
    fn validate(&self, content: &str) -> ValidationResult {
        validate_text(content, self.options.max_length)
    }

    fn render(&self, content: &str) -> RenderFuture {
        let content = content.to_owned();
        let options = self.options.to_pulldown_options();
        let autolink = self.options.gfm;
        Box::pin(async move {
            if content.trim().is_empty() {
                return Ok(Rendered::Empty);
            }
            let doc = MarkdownConverter::new(autolink).convert(&content, options);
            Ok(Rendered::Document(Arc::new(doc)))
        })
    }

    fn supported_features(&self) -> FeatureSet {
        let mut features: FeatureSet = BASE_FEATURES.iter().copied().collect();
        if self.options.gfm {
            features.extend(GFM_FEATURES.iter().copied());
        }
        features
    }
}

// =============================================================================
// Converter
// =============================================================================

/// Markdown to document converter
struct MarkdownConverter {
    /// Stack of open elements (for nested structures)
    stack: Vec<Element>,
    /// Root children (collected when stack is empty)
    root_children: Vec<Node>,
    /// Inside `<thead>`: cells become `<th>`
    in_table_head: bool,
    /// Set when bare URLs and e-mail addresses in text become links
    autolinks: Option<LinkFinder>,
}

impl MarkdownConverter {
    fn new(autolink: bool) -> Self {
        let autolinks = autolink.then(|| {
            let mut finder = LinkFinder::new();
            // www. hosts are linked too; other scheme-less hits are dropped later
            finder.url_must_have_scheme(false);
            finder
        });
        Self {
            stack: Vec::new(),
            root_children: Vec::new(),
            in_table_head: false,
            autolinks,
        }
    }

    fn convert(mut self, markdown: &str, options: Options) -> Document {
        for event in Parser::new_ext(markdown, options) {
            self.handle_event(event);
        }

        let mut root = Element::new("article");
        root.children.extend(self.root_children);
        Document::new(root)
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.add_linked_text(text.as_ref()),
            Event::Code(code) => self.add_inline_code(code.as_ref()),
            // Raw HTML is shown as text, never injected into the preview
            Event::Html(html) | Event::InlineHtml(html) => self.add_text(html.as_ref()),
            Event::SoftBreak => self.add_text("\n"),
            Event::HardBreak => self.add_node(Node::Element(Box::new(Element::new("br")))),
            Event::Rule => self.add_node(Node::Element(Box::new(Element::new("hr")))),
            Event::FootnoteReference(name) => self.add_footnote_ref(name.as_ref()),
            Event::TaskListMarker(checked) => self.add_task_marker(checked),
            Event::InlineMath(math) | Event::DisplayMath(math) => self.add_inline_code(math.as_ref()),
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match &tag {
            Tag::TableHead => self.in_table_head = true,
            Tag::CodeBlock(CodeBlockKind::Fenced(lang)) if !lang.is_empty() => {
                let class = format!("language-{lang}");
                self.stack
                    .push(Element::with_attrs("pre", vec![("class".into(), class.clone())]));
                self.stack
                    .push(Element::with_attrs("code", vec![("class".into(), class)]));
                return;
            }
            Tag::CodeBlock(_) => {
                self.stack.push(Element::new("pre"));
                self.stack.push(Element::new("code"));
                return;
            }
            _ => {}
        }

        let (tag_name, attrs) = tag_to_element(&tag, self.in_table_head);
        self.stack.push(Element::with_attrs(tag_name, attrs));
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::TableHead => self.in_table_head = false,
            // <pre><code> was opened as two frames
            TagEnd::CodeBlock => self.close_frame(),
            _ => {}
        }
        self.close_frame();
    }

    fn close_frame(&mut self) {
        if let Some(mut element) = self.stack.pop() {
            if element.tag == "img" {
                // <img> is void: its text children become the alt attribute
                let alt = element.text();
                element.children.clear();
                if !alt.is_empty() {
                    element.attrs.push(("alt".to_string(), alt));
                }
            }
            self.add_node(Node::Element(Box::new(element)));
        }
    }

    fn add_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        // Merge adjacent text so the tree stays compact
        let last = match self.stack.last_mut() {
            Some(frame) => frame.children.last_mut(),
            None => self.root_children.last_mut(),
        };
        if let Some(Node::Text(last)) = last {
            last.push_str(text);
            return;
        }
        self.add_node(Node::Text(text.to_string()));
    }

    /// Add text, turning bare links into `<a>` unless inside a literal frame.
    fn add_linked_text(&mut self, text: &str) {
        let pieces = match &self.autolinks {
            Some(finder) if !self.in_literal() => split_links(finder, text),
            _ => None,
        };
        let Some(pieces) = pieces else {
            self.add_text(text);
            return;
        };

        for (piece, href) in pieces {
            match href {
                Some(href) => {
                    let mut link = Element::with_attrs("a", vec![("href".into(), href)]);
                    link.children.push(Node::Text(piece));
                    self.add_node(Node::Element(Box::new(link)));
                }
                None => self.add_text(&piece),
            }
        }
    }

    fn in_literal(&self) -> bool {
        self.stack
            .iter()
            .any(|frame| LITERAL_TAGS.contains(&frame.tag.as_str()))
    }

    fn add_inline_code(&mut self, code: &str) {
        let mut elem = Element::new("code");
        elem.children.push(Node::Text(code.to_string()));
        self.add_node(Node::Element(Box::new(elem)));
    }

    fn add_footnote_ref(&mut self, name: &str) {
        let mut link = Element::with_attrs(
            "a",
            vec![
                ("href".into(), format!("#fn-{name}")),
                ("id".into(), format!("fnref-{name}")),
            ],
        );
        link.children.push(Node::Text(format!("[{name}]")));

        let mut sup = Element::with_attrs("sup", vec![("class".into(), "footnote-ref".into())]);
        sup.children.push(Node::Element(Box::new(link)));
        self.add_node(Node::Element(Box::new(sup)));
    }

    fn add_task_marker(&mut self, checked: bool) {
        let mut attrs = vec![
            ("type".to_string(), "checkbox".to_string()),
            ("disabled".to_string(), String::new()),
        ];
        if checked {
            attrs.push(("checked".to_string(), String::new()));
        }
        self.add_node(Node::Element(Box::new(Element::with_attrs("input", attrs))));
    }

    /// Add a node to current context (top of stack or root)
    fn add_node(&mut self, node: Node) {
        if let Some(frame) = self.stack.last_mut() {
            frame.children.push(node);
        } else {
            self.root_children.push(node);
        }
    }
}

/// Convert pulldown-cmark Tag to (tag_name, attributes)
fn tag_to_element(tag: &Tag, in_table_head: bool) -> (&'static str, Vec<(String, String)>) {
    match tag {
        Tag::Paragraph => ("p", vec![]),
        Tag::Heading { level, .. } => (heading_level_to_tag(*level), vec![]),
        Tag::BlockQuote(_) => ("blockquote", vec![]),
        Tag::CodeBlock(_) => ("pre", vec![]),
        Tag::List(Some(start)) if *start != 1 => ("ol", vec![("start".to_string(), start.to_string())]),
        Tag::List(Some(_)) => ("ol", vec![]),
        Tag::List(None) => ("ul", vec![]),
        Tag::Item => ("li", vec![]),
        Tag::FootnoteDefinition(name) => (
            "div",
            vec![
                ("class".to_string(), "footnote".to_string()),
                ("id".to_string(), format!("fn-{name}")),
            ],
        ),

        Tag::Table(_) => ("table", vec![]),
        Tag::TableHead => ("thead", vec![]),
        Tag::TableRow => ("tr", vec![]),
        Tag::TableCell if in_table_head => ("th", vec![]),
        Tag::TableCell => ("td", vec![]),

        Tag::Emphasis => ("em", vec![]),
        Tag::Strong => ("strong", vec![]),
        Tag::Strikethrough => ("del", vec![]),
        Tag::Superscript => ("sup", vec![]),
        Tag::Subscript => ("sub", vec![]),
        Tag::Link {
            dest_url, title, ..
        } => {
            let mut attrs = vec![("href".to_string(), safe_url(dest_url))];
            if !title.is_empty() {
                attrs.push(("title".to_string(), title.to_string()));
            }
            ("a", attrs)
        }
        Tag::Image {
            dest_url, title, ..
        } => {
            let mut attrs = vec![("src".to_string(), safe_url(dest_url))];
            if !title.is_empty() {
                attrs.push(("title".to_string(), title.to_string()));
            }
            ("img", attrs)
        }

        Tag::DefinitionList => ("dl", vec![]),
        Tag::DefinitionListTitle => ("dt", vec![]),
        Tag::DefinitionListDefinition => ("dd", vec![]),

        Tag::HtmlBlock | Tag::MetadataBlock(_) => ("div", vec![]),
    }
}

/// Split text into `(piece, href)` runs. `None` when nothing is linkable.
fn split_links(finder: &LinkFinder, text: &str) -> Option<Vec<(String, Option<String>)>> {
    let pieces: Vec<_> = finder
        .spans(text)
        .map(|span| {
            let href = span.kind().and_then(|kind| autolink_href(kind, span.as_str()));
            (span.as_str().to_string(), href)
        })
        .collect();
    pieces.iter().any(|(_, href)| href.is_some()).then_some(pieces)
}

fn autolink_href(kind: &LinkKind, found: &str) -> Option<String> {
    let href = match kind {
        LinkKind::Url if found.contains("://") => found.to_string(),
        LinkKind::Url if found.starts_with("www.") => format!("http://{found}"),
        LinkKind::Email => format!("mailto:{found}"),
        _ => return None,
    };
    let href = safe_url(&href);
    (!href.is_empty()).then_some(href)
}

/// `url` if its scheme is allowed or it has none, otherwise empty.
///
/// Whitespace and control characters are ignored when reading the scheme,
/// since browsers drop them too.
fn safe_url(url: &str) -> String {
    let Some(end) = url.find([':', '/', '?', '#']) else {
        return url.to_string();
    };
    if !url[end..].starts_with(':') {
        return url.to_string();
    }
    let scheme: String = url[..end]
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect::<String>()
        .to_ascii_lowercase();
    if SAFE_SCHEMES.contains(&scheme.as_str()) {
        url.to_string()
    } else {
        String::new()
    }
}

fn heading_level_to_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}
