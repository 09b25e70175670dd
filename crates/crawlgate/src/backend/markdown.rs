//! HTML to markdown extraction.
//!
//! The document is parsed with `scraper` and walked into text blocks
//! (headings, paragraphs, list items, quotes). Link targets stay inline and
//! non-content elements are dropped. Filtering works per block on word counts
//! and link density.

use scraper::{ElementRef, Html, Node};
use url::Url;

use crate::request::ExtractionOptions;

/// Elements whose content is never rendered.
const SKIPPED: &[&str] = &[
    "script", "style", "head", "noscript", "template", "svg", "iframe", "canvas",
];

/// Elements that start or end a text block.
const BLOCK_BOUNDARIES: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "nav", "aside", "ul", "ol",
    "table", "thead", "tbody", "tr", "td", "th", "pre", "form", "figure", "figcaption", "dl",
    "dt", "dd", "hr", "body", "html", "details", "summary",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
    Quote,
}

/// One rendered text block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
    pub words: usize,
    /// Words that appeared inside links.
    pub link_words: usize,
}

impl Block {
    /// Share of words outside links, 0.0 for an empty block.
    pub fn text_ratio(&self) -> f64 {
        if self.words == 0 {
            return 0.0;
        }
        (self.words - self.link_words) as f64 / self.words as f64
    }

    fn is_heading(&self) -> bool {
        matches!(self.kind, BlockKind::Heading(_))
    }
}

/// Split an HTML document into text blocks. Relative links are resolved
/// against `base` when given.
pub fn parse_blocks(html: &str, base: Option<&Url>) -> Vec<Block> {
    let document = Html::parse_document(html);
    let mut builder = BlockBuilder::new(base);
    builder.walk(document.root_element());
    builder.finish()
}

/// Blocks that survive filtering. Headings are always kept.
pub fn prune<'a>(blocks: &'a [Block], options: &ExtractionOptions) -> Vec<&'a Block> {
    blocks
        .iter()
        .filter(|b| {
            b.is_heading()
                || (b.words >= options.min_word_threshold
                    && b.text_ratio() >= options.filter_threshold)
        })
        .collect()
}

/// Render blocks as markdown. Consecutive list items share a list.
pub fn render<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> String {
    let mut out = String::new();
    let mut prev: Option<BlockKind> = None;

    for block in blocks {
        if let Some(prev) = prev {
            let tight = prev == BlockKind::ListItem && block.kind == BlockKind::ListItem;
            out.push_str(if tight { "\n" } else { "\n\n" });
        }
        match block.kind {
            BlockKind::Heading(level) => {
                out.push_str(&"#".repeat(level as usize));
                out.push(' ');
            }
            BlockKind::ListItem => out.push_str("- "),
            BlockKind::Quote => out.push_str("> "),
            BlockKind::Paragraph => {}
        }
        out.push_str(&block.text);
        prev = Some(block.kind);
    }

    out
}

/// Document walk events, replayed in order from an explicit stack.
enum Step<'a> {
    Open(ElementRef<'a>),
    Close(&'a str),
    Text(&'a str),
}

struct OpenLink {
    href: String,
    start: usize,
}

struct BlockBuilder<'a> {
    base: Option<&'a Url>,
    blocks: Vec<Block>,
    text: String,
    words: usize,
    link_words: usize,
    kind: BlockKind,
    /// Enclosing list item or quote, restored after inner blocks end.
    container: Option<BlockKind>,
    pending_space: bool,
    link: Option<OpenLink>,
    in_link: bool,
}

impl<'a> BlockBuilder<'a> {
    fn new(base: Option<&'a Url>) -> Self {
        Self {
            base,
            blocks: Vec::new(),
            text: String::new(),
            words: 0,
            link_words: 0,
            kind: BlockKind::Paragraph,
            container: None,
            pending_space: false,
            link: None,
            in_link: false,
        }
    }

    fn push_text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        if raw.starts_with(char::is_whitespace) {
            self.pending_space = true;
        }
        for word in raw.split_whitespace() {
            let needs_separator = !self.text.is_empty() && !self.text.ends_with(' ');
            // Text split only by inline tags continues the previous word.
            let glued = needs_separator && !self.pending_space;
            if needs_separator && self.pending_space {
                self.text.push(' ');
            }
            self.text.push_str(word);
            self.pending_space = true;
            if !glued {
                self.words += 1;
                if self.in_link {
                    self.link_words += 1;
                }
            }
        }
        self.pending_space = raw.ends_with(char::is_whitespace);
    }

    /// Depth-first walk without recursion, so deeply nested pages cannot
    /// exhaust the stack.
    fn walk<'d>(&mut self, root: ElementRef<'d>) {
        let mut stack = vec![Step::Open(root)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Text(text) => self.push_text(text),
                Step::Close(name) => self.close_element(name),
                Step::Open(element) => {
                    let name = element.value().name();
                    if SKIPPED.contains(&name) {
                        continue;
                    }
                    self.open_element(name, element.value().attr("href"));
                    stack.push(Step::Close(name));
                    for child in element.children().rev() {
                        match child.value() {
                            Node::Text(text) => stack.push(Step::Text(&**text)),
                            Node::Element(_) => {
                                stack.extend(ElementRef::wrap(child).map(Step::Open));
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
    }

    fn open_element(&mut self, name: &str, href: Option<&str>) {
        match name {
            "br" => self.pending_space = true,
            "a" => self.open_link(href),
            "li" => self.enter_container(BlockKind::ListItem),
            "blockquote" => self.enter_container(BlockKind::Quote),
            _ => {
                if let Some(level) = heading_level(name) {
                    self.flush();
                    self.kind = BlockKind::Heading(level);
                } else if BLOCK_BOUNDARIES.contains(&name) {
                    self.flush();
                }
            }
        }
    }

    fn close_element(&mut self, name: &str) {
        match name {
            "a" => self.close_link(),
            "li" | "blockquote" => {
                self.flush();
                self.container = None;
                self.kind = BlockKind::Paragraph;
            }
            _ if heading_level(name).is_some() || BLOCK_BOUNDARIES.contains(&name) => {
                self.flush();
            }
            _ => {}
        }
    }

    fn enter_container(&mut self, kind: BlockKind) {
        self.flush();
        self.container = Some(kind);
        self.kind = kind;
    }

    fn open_link(&mut self, href: Option<&str>) {
        self.in_link = true;
        let Some(href) = href.and_then(|h| self.resolve(h)) else {
            return;
        };
        if self.pending_space && !self.text.is_empty() {
            self.text.push(' ');
        }
        self.pending_space = false;
        self.link = Some(OpenLink {
            href,
            start: self.text.len(),
        });
    }

    fn close_link(&mut self) {
        self.in_link = false;
        let Some(link) = self.link.take() else {
            return;
        };
        if link.start > self.text.len() {
            return;
        }
        let anchor = self.text[link.start..].trim().to_string();
        if anchor.is_empty() {
            return;
        }
        self.text.truncate(link.start);
        self.text.push_str(&format!("[{anchor}]({})", link.href));
    }

    fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }
        match self.base {
            Some(base) => base.join(href).ok().map(String::from),
            None => Some(href.to_string()),
        }
    }

    fn flush(&mut self) {
        let text = std::mem::take(&mut self.text);
        let text = text.trim();
        if !text.is_empty() {
            self.blocks.push(Block {
                kind: self.kind,
                text: text.to_string(),
                words: self.words,
                link_words: self.link_words,
            });
        }
        self.words = 0;
        self.link_words = 0;
        self.pending_space = false;
        self.link = None;
        self.kind = self.container.unwrap_or(BlockKind::Paragraph);
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}
