//! Main-content localization and structured extraction from raw HTML.
//!
//! The main region is searched in four tiers, each tried only when the
//! previous one finds nothing:
//!
//! 1. the first match of a semantic container (`main`, `article`, `section`)
//! 2. the first element whose `id` is a conventional content token
//! 3. the first element whose `class` list contains a content token
//! 4. the `div` with the most `p` descendants, if it has more than two
//!
//! Failing all four, the document body is used. Extraction is a pure
//! function of the HTML and the configured tag/token sets.

use crate::error::{Result, ScanError};
use crate::links;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};
use url::Url;

pub const UNTITLED: &str = "Untitled Page";

const SEMANTIC_CONTAINERS: &[&str] = &["main", "[role='main']", "article", "section"];

const CONTENT_TOKENS: &[&str] = &[
    "content",
    "main",
    "article",
    "post",
    "main-content",
    "page-content",
];

const SKIP_TOKENS: &[&str] = &[
    "header",
    "footer",
    "sidebar",
    "menu",
    "nav",
    "navigation",
    "comments",
    "ad",
    "advertisement",
];

const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "svg", "nav", "footer", "header", "aside", "form",
    "button", "input", "img", "template",
];

const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "main",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "ul",
    "ol",
    "li",
    "table",
    "tr",
    "br",
    "blockquote",
    "pre",
    "dt",
    "dd",
];

/// A paragraph-count winner must hold strictly more paragraphs than this.
const MIN_FALLBACK_PARAGRAPHS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Ordered,
    Unordered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListBlock {
    pub kind: ListKind,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredContent {
    pub title: String,
    /// Heading level (1..=6) to heading texts in document order
    pub headings: BTreeMap<u8, Vec<String>>,
    pub paragraphs: Vec<String>,
    pub lists: Vec<ListBlock>,
    pub tables: Vec<Table>,
    pub clean_text: String,
}

struct Selectors {
    title: Selector,
    h1: Selector,
    body: Selector,
    headings: Selector,
    paragraph: Selector,
    list: Selector,
    table: Selector,
    thead: Selector,
    row: Selector,
    header_cell: Selector,
    div: Selector,
    with_id: Selector,
    with_class: Selector,
    anchor: Selector,
}

impl Selectors {
    fn new() -> Result<Self> {
        Ok(Self {
            title: parse_selector("title")?,
            h1: parse_selector("h1")?,
            body: parse_selector("body")?,
            headings: parse_selector("h1, h2, h3, h4, h5, h6")?,
            paragraph: parse_selector("p")?,
            list: parse_selector("ul, ol")?,
            table: parse_selector("table")?,
            thead: parse_selector("thead")?,
            row: parse_selector("tr")?,
            header_cell: parse_selector("th")?,
            div: parse_selector("div")?,
            with_id: parse_selector("[id]")?,
            with_class: parse_selector("[class]")?,
            anchor: parse_selector("a[href]")?,
        })
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ScanError::Extraction(format!("invalid selector '{}': {:?}", css, e)))
}

/// Heuristic structured-content extractor.
pub struct ContentExtractor {
    selectors: Selectors,
    containers: Vec<String>,
    content_tokens: HashSet<String>,
    skip_tokens: HashSet<String>,
    skip_tags: HashSet<String>,
}

impl ContentExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            selectors: Selectors::new()?,
            containers: SEMANTIC_CONTAINERS.iter().map(|s| s.to_string()).collect(),
            content_tokens: CONTENT_TOKENS.iter().map(|s| s.to_string()).collect(),
            skip_tokens: SKIP_TOKENS.iter().map(|s| s.to_string()).collect(),
            skip_tags: SKIP_TAGS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the tier-one container preference list (CSS selectors, tried in order).
    pub fn with_containers(mut self, containers: Vec<String>) -> Self {
        self.containers = containers;
        self
    }

    /// Parse one document into its title and structured content.
    pub fn extract(&self, html: &str) -> (String, StructuredContent) {
        let document = Html::parse_document(html);
        self.extract_document(&document)
    }

    /// Like [`extract`](Self::extract), also running the link-discovery pass.
    pub fn extract_with_links(
        &self,
        html: &str,
        base: &Url,
    ) -> (String, StructuredContent, Vec<Url>) {
        let document = Html::parse_document(html);
        let (title, content) = self.extract_document(&document);
        let links = self.links_in(&document, base);
        (title, content, links)
    }

    /// Every `a[href]` normalized against `base`, rejects dropped, first occurrence kept.
    pub fn discover_links(&self, html: &str, base: &Url) -> Vec<Url> {
        let document = Html::parse_document(html);
        self.links_in(&document, base)
    }

    fn links_in(&self, document: &Html, base: &Url) -> Vec<Url> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for anchor in document.select(&self.selectors.anchor) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if let Some(url) = links::normalize(href, base)
                && seen.insert(url.as_str().to_string())
            {
                found.push(url);
            }
        }
        debug!("Discovered {} links on {}", found.len(), base);
        found
    }

    fn extract_document(&self, document: &Html) -> (String, StructuredContent) {
        let title = self.title(document);

        let located = match self.locate_main(document) {
            Ok(region) => region,
            Err(e) => {
                warn!("Main-content search failed, using whole document: {}", e);
                None
            }
        };
        let region = located.unwrap_or_else(|| self.body(document));

        let content = StructuredContent {
            title: title.clone(),
            headings: self.headings(region),
            paragraphs: self.paragraphs(region),
            lists: self.lists(region),
            tables: self.tables(region),
            clean_text: self.clean_text(region),
        };
        (title, content)
    }

    /// `<title>`, else the first `<h1>`, else a placeholder.
    fn title(&self, document: &Html) -> String {
        document
            .select(&self.selectors.title)
            .map(element_text)
            .find(|t| !t.is_empty())
            .or_else(|| {
                document
                    .select(&self.selectors.h1)
                    .map(element_text)
                    .find(|t| !t.is_empty())
            })
            .unwrap_or_else(|| UNTITLED.to_string())
    }

    fn body<'a>(&self, document: &'a Html) -> ElementRef<'a> {
        document
            .select(&self.selectors.body)
            .next()
            .unwrap_or_else(|| document.root_element())
    }

    fn locate_main<'a>(&self, document: &'a Html) -> Result<Option<ElementRef<'a>>> {
        for css in &self.containers {
            let selector = parse_selector(css)?;
            if let Some(found) = document.select(&selector).next() {
                debug!("Main content located by container '{}'", css);
                return Ok(Some(found));
            }
        }

        if let Some(found) = document.select(&self.selectors.with_id).find(|el| {
            el.value()
                .id()
                .is_some_and(|id| self.content_tokens.contains(id))
        }) {
            debug!("Main content located by id");
            return Ok(Some(found));
        }

        if let Some(found) = document.select(&self.selectors.with_class).find(|el| {
            el.value()
                .classes()
                .any(|class| self.content_tokens.contains(class))
        }) {
            debug!("Main content located by class");
            return Ok(Some(found));
        }

        // Ties go to the earliest div in document order.
        let mut best: Option<(ElementRef<'a>, usize)> = None;
        for div in document.select(&self.selectors.div) {
            let count = div.select(&self.selectors.paragraph).count();
            if best.is_none_or(|(_, most)| count > most) {
                best = Some((div, count));
            }
        }
        Ok(best
            .filter(|(_, count)| *count > MIN_FALLBACK_PARAGRAPHS)
            .map(|(div, count)| {
                debug!("Main content located by paragraph density ({} paragraphs)", count);
                div
            }))
    }

    fn headings(&self, region: ElementRef) -> BTreeMap<u8, Vec<String>> {
        let mut headings: BTreeMap<u8, Vec<String>> = BTreeMap::new();
        for heading in region.select(&self.selectors.headings) {
            let level = heading.value().name()[1..].parse::<u8>().unwrap_or(1);
            let text = element_text(heading);
            if !text.is_empty() {
                headings.entry(level).or_default().push(text);
            }
        }
        headings
    }

    fn paragraphs(&self, region: ElementRef) -> Vec<String> {
        region
            .select(&self.selectors.paragraph)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn lists(&self, region: ElementRef) -> Vec<ListBlock> {
        region
            .select(&self.selectors.list)
            .filter_map(|list| {
                let kind = if list.value().name() == "ol" {
                    ListKind::Ordered
                } else {
                    ListKind::Unordered
                };
                let items: Vec<String> = child_elements(list, &["li"])
                    .map(element_text)
                    .filter(|t| !t.is_empty())
                    .collect();
                (!items.is_empty()).then_some(ListBlock { kind, items })
            })
            .collect()
    }

    fn tables(&self, region: ElementRef) -> Vec<Table> {
        let mut tables = Vec::new();

        for table in region.select(&self.selectors.table) {
            let mut headers: Vec<String> = table
                .select(&self.selectors.thead)
                .next()
                .map(|thead| {
                    thead
                        .select(&self.selectors.header_cell)
                        .map(element_text)
                        .collect()
                })
                .unwrap_or_default();

            // Without a thead, a first row of th cells doubles as the header.
            let mut reused_row = None;
            if headers.is_empty()
                && let Some(first_row) = table.select(&self.selectors.row).next()
            {
                let cells: Vec<String> = child_elements(first_row, &["th"])
                    .map(element_text)
                    .collect();
                if !cells.is_empty() {
                    headers = cells;
                    reused_row = Some(first_row.id());
                }
            }

            // Header rows never come back as data; tbody and tfoot rows do.
            let rows: Vec<Vec<String>> = table
                .select(&self.selectors.row)
                .filter(|row| Some(row.id()) != reused_row && !in_thead(*row))
                .map(|row| {
                    child_elements(row, &["td", "th"])
                        .map(element_text)
                        .collect::<Vec<_>>()
                })
                .filter(|cells| !cells.is_empty())
                .collect();

            if !headers.is_empty() || !rows.is_empty() {
                tables.push(Table { headers, rows });
            }
        }

        tables
    }

    fn clean_text(&self, region: ElementRef) -> String {
        let mut raw = String::new();
        self.collect_text(region, &mut raw);

        raw.lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn collect_text(&self, element: ElementRef, out: &mut String) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => out.push_str(text),
                Node::Element(_) => {
                    let Some(child) = ElementRef::wrap(child) else {
                        continue;
                    };
                    if self.is_skipped(child) {
                        continue;
                    }
                    let block = BLOCK_TAGS.contains(&child.value().name());
                    if block {
                        out.push('\n');
                    }
                    self.collect_text(child, out);
                    if block {
                        out.push('\n');
                    }
                }
                _ => {}
            }
        }
    }

    fn is_skipped(&self, element: ElementRef) -> bool {
        let value = element.value();
        self.skip_tags.contains(value.name())
            || value.id().is_some_and(|id| self.skip_tokens.contains(id))
            || value.classes().any(|class| self.skip_tokens.contains(class))
    }
}

/// Text content with whitespace runs collapsed to single spaces.
fn element_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn child_elements<'a>(
    parent: ElementRef<'a>,
    names: &'a [&'a str],
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| names.contains(&child.value().name()))
}

fn in_thead(row: ElementRef) -> bool {
    row.parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| parent.value().name() == "thead")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ContentExtractor {
        ContentExtractor::new().unwrap()
    }

    #[test]
    fn test_basic_page() {
        let html = "<title>Test Page</title><h1>Welcome</h1><main><p>This is a test paragraph.</p>\
                    <ul><li>Item 1</li><li>Item 2</li></ul></main>";

        let (title, content) = extractor().extract(html);
        assert_eq!(title, "Test Page");
        assert_eq!(content.title, "Test Page");
        assert_eq!(content.paragraphs, vec!["This is a test paragraph."]);
        assert_eq!(content.lists.len(), 1);
        assert_eq!(content.lists[0].kind, ListKind::Unordered);
        assert_eq!(content.lists[0].items, vec!["Item 1", "Item 2"]);
        // The h1 sits outside <main>.
        assert!(content.headings.is_empty());
    }

    #[test]
    fn test_title_fallbacks() {
        let ex = extractor();
        assert_eq!(ex.extract("<h1> Heading  Title </h1><p>x</p>").0, "Heading Title");
        assert_eq!(ex.extract("<title>  </title><h1>From H1</h1>").0, "From H1");
        assert_eq!(ex.extract("<p>nothing here</p>").0, UNTITLED);
    }

    #[test]
    fn test_semantic_preference_order() {
        let html = "<section><p>section text</p></section><article><p>article text</p></article>";
        let (_, content) = extractor().extract(html);
        assert_eq!(content.paragraphs, vec!["article text"]);
    }

    #[test]
    fn test_locate_by_id_then_class() {
        let html = r#"<div class="post"><p>by class</p></div><div id="page-content"><p>by id</p></div>"#;
        let (_, content) = extractor().extract(html);
        assert_eq!(content.paragraphs, vec!["by id"]);

        let html = r#"<div class="wrapper"><p>outside</p></div><div class="x main-content"><p>by class</p></div>"#;
        let (_, content) = extractor().extract(html);
        assert_eq!(content.paragraphs, vec!["by class"]);
    }

    #[test]
    fn test_paragraph_density_fallback() {
        let html = r#"<body>
            <div><p>a</p></div>
            <div><p>b</p><p>c</p></div>
            <div><p>one</p><p>two</p><p>three</p><p>four</p></div>
            <div><p>d</p></div>
        </body>"#;
        let (_, content) = extractor().extract(html);
        assert_eq!(content.paragraphs, vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn test_density_threshold_falls_back_to_body() {
        let html = r#"<body><div><p>a</p><p>b</p></div><div><p>c</p></div></body>"#;
        let (_, content) = extractor().extract(html);
        assert_eq!(content.paragraphs, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_headings_grouped_by_level() {
        let html = "<main><h2>B</h2><h1>A</h1><h2>C</h2><h3>  </h3><h6>F</h6></main>";
        let (_, content) = extractor().extract(html);
        assert_eq!(content.headings.get(&1), Some(&vec!["A".to_string()]));
        assert_eq!(
            content.headings.get(&2),
            Some(&vec!["B".to_string(), "C".to_string()])
        );
        assert!(!content.headings.contains_key(&3));
        assert_eq!(content.headings.get(&6), Some(&vec!["F".to_string()]));
    }

    #[test]
    fn test_lists_skip_empty_items_and_lists() {
        let html = "<main><ol><li>first</li><li> </li><li>second</li></ol><ul><li></li></ul></main>";
        let (_, content) = extractor().extract(html);
        assert_eq!(content.lists.len(), 1);
        assert_eq!(content.lists[0].kind, ListKind::Ordered);
        assert_eq!(content.lists[0].items, vec!["first", "second"]);
    }

    #[test]
    fn test_table_with_thead() {
        let html = "<main><table><thead><tr><th>Name</th><th>Age</th></tr></thead>\
                    <tbody><tr><td>Ann</td><td>31</td></tr><tr><td>Bo</td><td>4</td></tr></tbody></table></main>";
        let (_, content) = extractor().extract(html);
        assert_eq!(content.tables.len(), 1);
        assert_eq!(content.tables[0].headers, vec!["Name", "Age"]);
        assert_eq!(
            content.tables[0].rows,
            vec![vec!["Ann", "31"], vec!["Bo", "4"]]
        );
    }

    #[test]
    fn test_table_with_only_thead_has_no_rows() {
        let html = "<main><table><thead><tr><th>Name</th><th>Age</th></tr></thead></table></main>";
        let (_, content) = extractor().extract(html);
        assert_eq!(content.tables.len(), 1);
        assert_eq!(content.tables[0].headers, vec!["Name", "Age"]);
        assert!(content.tables[0].rows.is_empty());
    }

    #[test]
    fn test_table_keeps_tfoot_rows() {
        let html = "<main><table><thead><tr><th>K</th></tr></thead>\
                    <tbody><tr><td>a</td></tr></tbody>\
                    <tfoot><tr><td>sum</td></tr></tfoot></table></main>";
        let (_, content) = extractor().extract(html);
        assert_eq!(content.tables[0].headers, vec!["K"]);
        assert_eq!(content.tables[0].rows, vec![vec!["a"], vec!["sum"]]);

        let html = "<main><table><thead><tr><th>K</th></tr></thead>\
                    <tfoot><tr><td>sum</td></tr></tfoot></table></main>";
        let (_, content) = extractor().extract(html);
        assert_eq!(content.tables[0].rows, vec![vec!["sum"]]);
    }

    #[test]
    fn test_table_header_from_first_row() {
        let html = "<main><table><tr><th>K</th><th>V</th></tr><tr><td>a</td><td>1</td></tr></table></main>";
        let (_, content) = extractor().extract(html);
        assert_eq!(content.tables[0].headers, vec!["K", "V"]);
        assert_eq!(content.tables[0].rows, vec![vec!["a", "1"]]);
    }

    #[test]
    fn test_table_without_headers() {
        let html = "<main><table><tr><td>a</td><td>1</td></tr><tr><td>b</td><td>2</td></tr></table></main>";
        let (_, content) = extractor().extract(html);
        assert!(content.tables[0].headers.is_empty());
        assert_eq!(content.tables[0].rows.len(), 2);
    }

    #[test]
    fn test_clean_text_skips_boilerplate() {
        let html = r#"<main>
            <nav>Home | About</nav>
            <h2>Heading</h2>
            <p>First   paragraph
               continues.</p>
            <script>var x = 1;</script>
            <div class="sidebar">Sidebar junk</div>
            <div id="comments">Comment junk</div>
            <ul><li>one</li><li>two</li></ul>
            <footer>Footer</footer>
        </main>"#;
        let (_, content) = extractor().extract(html);
        assert_eq!(
            content.clean_text,
            "Heading\nFirst paragraph\ncontinues.\none\ntwo"
        );
    }

    #[test]
    fn test_invalid_container_falls_back_to_body() {
        let ex = extractor().with_containers(vec!["main[".to_string()]);
        let html = "<main><p>inside</p></main><p>outside</p>";
        let (_, content) = ex.extract(html);
        assert_eq!(content.paragraphs, vec!["inside", "outside"]);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let html = "<div><p>a</p><p>b</p><p>c</p></div><div><p>d</p><p>e</p><p>f</p></div>";
        let ex = extractor();
        let first = ex.extract(html);
        for _ in 0..5 {
            assert_eq!(ex.extract(html), first);
        }
        // Equal counts: the earlier div wins.
        assert_eq!(first.1.paragraphs, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_discover_links() {
        let html = r##"<main>
            <a href="/link1">Link 1</a>
            <a href="https://example.com/link2">Link 2</a>
            <a href="/link1#again">dup</a>
            <a href="#top">anchor</a>
            <a href="mailto:x@example.com">mail</a>
        </main>"##;
        let base = Url::parse("https://example.com").unwrap();
        let links = extractor().discover_links(html, &base);
        let links: Vec<&str> = links.iter().map(|u| u.as_str()).collect();
        assert_eq!(
            links,
            vec!["https://example.com/link1", "https://example.com/link2"]
        );
    }
}
