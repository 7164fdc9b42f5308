//! Listings inferred from page layout when the page does not describe
//! itself.
//!
//! Index pages repeat one card element per listing, so elements are grouped
//! by their class signature. A group of three or more link-bearing siblings
//! is taken as the listing units. Otherwise the page is treated as a single
//! listing described by its headline.

use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use super::html;
use super::{CandidateFields, ExtractionStrategy, Page};
use crate::error::ParseError;
use crate::normalize::extract_price;

static CONTAINERS: LazyLock<Selector> =
    LazyLock::new(|| html::selector("div, section, article, li"));
static CLASSED: LazyLock<Selector> = LazyLock::new(|| html::selector("[class]"));
static LOCATION_CANDIDATES: LazyLock<Selector> =
    LazyLock::new(|| html::selector("address, [class]"));

const LISTING_CLASS_HINTS: [&str; 9] = [
    "listing",
    "result",
    "card",
    "item",
    "business",
    "opportunity",
    "teaser",
    "entry",
    "record",
];

const PRICE_CLASS_HINTS: [&str; 4] = ["price", "cost", "amount", "asking"];

const LOCATION_CLASS_HINTS: [&str; 5] = ["location", "city", "county", "region", "address"];

/// Longer "location" text is a layout region, not an address.
const MAX_LOCATION_CHARS: usize = 120;

const MIN_GROUP_SIZE: usize = 3;

const MIN_DESCRIPTION_CHARS: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct HeuristicStrategy {
    min_title_words: usize,
}

impl HeuristicStrategy {
    #[must_use]
    pub fn new(min_title_words: usize) -> Self {
        Self { min_title_words }
    }
}

impl ExtractionStrategy for HeuristicStrategy {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn rank(&self) -> u8 {
        1
    }

    fn extract(&self, page: &Page<'_>) -> Result<Vec<CandidateFields>, ParseError> {
        let document = page.document();
        if !html::has_markup(document) {
            return Err(ParseError::Markup("document contains no tags".to_owned()));
        }
        let body = html::body(document);

        if let Some(units) = listing_units(body) {
            let fields: Vec<CandidateFields> = units
                .into_iter()
                .filter_map(|unit| self.unit_fields(unit, page))
                .collect();
            if !fields.is_empty() {
                return Ok(fields);
            }
        }
        Ok(self.single_listing(body, page).into_iter().collect())
    }
}

impl HeuristicStrategy {
    fn unit_fields(&self, unit: ElementRef<'_>, page: &Page<'_>) -> Option<CandidateFields> {
        let heading = html::HEADINGS
            .iter()
            .find_map(|selector| unit.select(selector).next());
        let anchors: Vec<ElementRef<'_>> = unit.select(&html::ANCHOR).collect();

        let (title, title_href) = match heading {
            Some(h) => (
                html::text_of(h),
                h.select(&html::ANCHOR).next().and_then(|a| html::attr(a, "href")),
            ),
            None => {
                let a = *anchors.first()?;
                (html::text_of(a), html::attr(a, "href"))
            }
        };
        if word_count(&title) < self.min_title_words {
            return None;
        }

        let listing_url = title_href
            .or_else(|| anchors.iter().find_map(|a| html::attr(*a, "href")))
            .and_then(|href| page.resolve(&href));

        Some(CandidateFields {
            title: Some(title),
            listing_url,
            location: location_text(unit),
            price: price_text(unit),
            description: first_paragraph(unit),
            images: image_sources(unit, page),
            links: anchor_links(&anchors, page),
        })
    }

    fn single_listing(&self, body: ElementRef<'_>, page: &Page<'_>) -> Option<CandidateFields> {
        let document = page.document();
        let title = body
            .select(&html::H1)
            .next()
            .map(html::text_of)
            .filter(|t| !t.is_empty())
            .or_else(|| html::meta_content(document, "og:title"))
            .or_else(|| document.select(&html::TITLE).next().map(html::text_of))?;
        if word_count(&title) < self.min_title_words {
            return None;
        }

        let listing_url = html::canonical_href(document)
            .or_else(|| html::meta_content(document, "og:url"))
            .and_then(|u| page.resolve(&u))
            .or_else(|| page.resolve(page.url));

        let description = first_paragraph(body)
            .or_else(|| html::meta_content(document, "description"))
            .or_else(|| html::meta_content(document, "og:description"));

        let mut images: Vec<String> = html::meta_content(document, "og:image")
            .and_then(|src| page.resolve(&src))
            .into_iter()
            .collect();
        for src in image_sources(body, page) {
            if !images.contains(&src) {
                images.push(src);
            }
        }

        let anchors: Vec<ElementRef<'_>> = body.select(&html::ANCHOR).collect();
        Some(CandidateFields {
            title: Some(title),
            listing_url,
            location: location_text(body),
            price: price_text(body),
            description,
            images,
            links: anchor_links(&anchors, page),
        })
    }
}

/// The best group of repeated link-bearing containers, if one has at least
/// [`MIN_GROUP_SIZE`] members. Groups whose classes carry a listing hint
/// outrank larger groups without one.
fn listing_units(body: ElementRef<'_>) -> Option<Vec<ElementRef<'_>>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<ElementRef<'_>>)> = Vec::new();

    for el in body.select(&CONTAINERS) {
        let mut classes = html::classes(el);
        if classes.is_empty() || !contains_link(el) {
            continue;
        }
        classes.sort();
        classes.dedup();
        let signature = format!("{}:{}", el.value().name(), classes.join(" "));
        let slot = *index.entry(signature.clone()).or_insert_with(|| {
            groups.push((signature, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(el);
    }

    groups.sort_by_key(|(signature, members)| {
        let hinted = LISTING_CLASS_HINTS.iter().any(|h| signature.contains(h));
        (std::cmp::Reverse(hinted), std::cmp::Reverse(members.len()))
    });
    groups
        .into_iter()
        .find(|(_, members)| members.len() >= MIN_GROUP_SIZE)
        .map(|(_, members)| members)
}

fn contains_link(el: ElementRef<'_>) -> bool {
    el.select(&html::ANCHOR)
        .any(|a| a.value().attr("href").is_some())
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn price_text(scope: ElementRef<'_>) -> Option<String> {
    scope
        .select(&CLASSED)
        .filter(|el| html::has_class_hint(*el, &PRICE_CLASS_HINTS))
        .find_map(|el| extract_price(&html::text_of(el)))
        .or_else(|| extract_price(&html::text_of(scope)))
}

fn location_text(scope: ElementRef<'_>) -> Option<String> {
    scope
        .select(&LOCATION_CANDIDATES)
        .filter(|el| {
            el.value().name() == "address" || html::has_class_hint(*el, &LOCATION_CLASS_HINTS)
        })
        .map(html::text_of)
        .find(|t| !t.is_empty() && t.chars().count() <= MAX_LOCATION_CHARS)
}

fn first_paragraph(scope: ElementRef<'_>) -> Option<String> {
    scope
        .select(&html::PARAGRAPH)
        .map(html::text_of)
        .find(|t| t.chars().count() >= MIN_DESCRIPTION_CHARS)
}

fn image_sources(scope: ElementRef<'_>, page: &Page<'_>) -> Vec<String> {
    let mut images = Vec::new();
    for img in scope.select(&html::IMAGE) {
        let Some(src) = html::attr(img, "src")
            .or_else(|| html::attr(img, "data-src"))
            .and_then(|s| page.resolve(&s))
        else {
            continue;
        };
        if !images.contains(&src) {
            images.push(src);
        }
    }
    images
}

fn anchor_links(anchors: &[ElementRef<'_>], page: &Page<'_>) -> Vec<String> {
    let mut links = Vec::new();
    for href in anchors.iter().filter_map(|a| html::attr(*a, "href")) {
        if let Some(link) = page.resolve(&href) {
            if !links.contains(&link) {
                links.push(link);
            }
        }
    }
    links
}

#[cfg(test)]
#[path = "heuristic_test.rs"]
mod tests;
