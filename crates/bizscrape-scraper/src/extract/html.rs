//! DOM lookups shared by the extraction strategies.
//!
//! Pages are parsed once with `scraper` (html5ever), so implied end tags,
//! entity references and misnested markup are resolved the way a browser
//! would resolve them.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::normalize::collapse_whitespace;

/// Parses a selector written into the source.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

pub(crate) static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));
pub(crate) static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img"));
pub(crate) static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| selector("p"));
pub(crate) static H1: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
pub(crate) static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));

/// Card headings, in order of preference.
pub(crate) static HEADINGS: LazyLock<[Selector; 4]> =
    LazyLock::new(|| [selector("h1"), selector("h2"), selector("h3"), selector("h4")]);

static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static META: LazyLock<Selector> = LazyLock::new(|| selector("meta[content]"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("link[rel][href]"));

/// Elements whose text is never shown to a reader.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Elements html5ever creates even for input that has no markup.
const IMPLIED_ELEMENTS: [&str; 3] = ["html", "head", "body"];

/// Trimmed value of attribute `name`, or `None` when absent or blank.
pub(crate) fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Class tokens, lowercased.
pub(crate) fn classes(el: ElementRef<'_>) -> Vec<String> {
    el.value().classes().map(str::to_ascii_lowercase).collect()
}

/// Returns `true` if any class token contains one of `hints`.
pub(crate) fn has_class_hint(el: ElementRef<'_>, hints: &[&str]) -> bool {
    el.value().classes().any(|c| {
        let c = c.to_ascii_lowercase();
        hints.iter().any(|h| c.contains(h))
    })
}

/// Visible text with whitespace collapsed. Script and style content is
/// skipped, and element boundaries count as word breaks.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_text(el, &mut raw);
    collapse_whitespace(&raw)
}

fn push_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            if !HIDDEN_ELEMENTS.contains(&child.value().name()) {
                out.push(' ');
                push_text(child, out);
                out.push(' ');
            }
        }
    }
}

/// Content of `<meta property|name|itemprop="key" content="...">`.
pub(crate) fn meta_content(document: &Html, key: &str) -> Option<String> {
    document.select(&META).find_map(|meta| {
        let matches = ["property", "name", "itemprop"]
            .iter()
            .any(|a| meta.value().attr(a).is_some_and(|v| v.eq_ignore_ascii_case(key)));
        if matches {
            attr(meta, "content")
        } else {
            None
        }
    })
}

/// `href` of `<link rel="canonical">`.
pub(crate) fn canonical_href(document: &Html) -> Option<String> {
    document.select(&LINK).find_map(|link| {
        let rel = link.value().attr("rel")?;
        rel.split_whitespace()
            .any(|r| r.eq_ignore_ascii_case("canonical"))
            .then(|| attr(link, "href"))
            .flatten()
    })
}

/// The `<body>` element, or the document root when there is none.
pub(crate) fn body(document: &Html) -> ElementRef<'_> {
    document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element())
}

/// Returns `true` if the source contained at least one element of its own.
pub(crate) fn has_markup(document: &Html) -> bool {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| !IMPLIED_ELEMENTS.contains(&el.value().name()))
}

#[cfg(test)]
#[path = "html_test.rs"]
mod tests;
