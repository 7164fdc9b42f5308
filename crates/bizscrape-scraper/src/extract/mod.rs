//! Candidate extraction from fetched pages.
//!
//! Each [`ExtractionStrategy`] turns a page into zero or more signals. The
//! [`Extractor`] runs all registered strategies, tags each signal with the
//! strategy's rank, and merges them into one candidate per listing unit.

mod heuristic;
mod html;
mod merge;
mod structured;

use bizscrape_core::ScraperSettings;
use scraper::Html;

use crate::error::ParseError;
use crate::normalize::resolve_url;

pub use heuristic::HeuristicStrategy;
pub use merge::merge_signals;
pub use structured::StructuredStrategy;

/// A page handed to the strategies, parsed once and shared by all of them.
#[derive(Debug)]
pub struct Page<'a> {
    /// URL after redirects.
    pub url: &'a str,
    pub html: &'a str,
    document: Html,
}

impl<'a> Page<'a> {
    #[must_use]
    pub fn new(url: &'a str, html: &'a str) -> Self {
        Self {
            url,
            html,
            document: Html::parse_document(html),
        }
    }

    #[must_use]
    pub fn document(&self) -> &Html {
        &self.document
    }

    /// Resolves `raw` against the page URL. Fragments, `mailto:`,
    /// `javascript:`, `tel:` and `data:` references yield `None`.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<String> {
        resolve_url(raw, self.url)
    }
}

/// Raw, unnormalized fields proposed for one listing unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateFields {
    pub title: Option<String>,
    pub listing_url: Option<String>,
    pub location: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub links: Vec<String>,
}

impl CandidateFields {
    /// Fills every absent field from `other`; present fields, lists
    /// included, are kept as they are.
    pub fn fill_from(&mut self, other: CandidateFields) {
        fn fill(slot: &mut Option<String>, value: Option<String>) {
            if slot.as_deref().is_none_or(|s| s.trim().is_empty()) {
                if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                    *slot = Some(v);
                }
            }
        }
        fill(&mut self.title, other.title);
        fill(&mut self.listing_url, other.listing_url);
        fill(&mut self.location, other.location);
        fill(&mut self.price, other.price);
        fill(&mut self.description, other.description);
        if self.images.is_empty() {
            self.images = other.images;
        }
        if self.links.is_empty() {
            self.links = other.links;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == CandidateFields::default()
    }
}

/// Candidate fields attributed to the strategy that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSignal {
    pub fields: CandidateFields,
    pub strategy: &'static str,
    /// Higher wins when strategies disagree on a field.
    pub rank: u8,
    /// Position of the unit within this strategy's output.
    pub unit: usize,
}

/// One way of reading listings out of a page.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn rank(&self) -> u8;

    /// # Errors
    ///
    /// Returns [`ParseError`] when the page cannot be read by this strategy
    /// at all. The caller treats that as "no signals".
    fn extract(&self, page: &Page<'_>) -> Result<Vec<CandidateFields>, ParseError>;
}

/// Ordered set of strategies, highest rank first.
pub struct Extractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Extractor {
    /// Structured metadata first, then the markup heuristics.
    #[must_use]
    pub fn new(settings: &ScraperSettings) -> Self {
        let mut extractor = Self {
            strategies: Vec::new(),
        };
        extractor.register(Box::new(StructuredStrategy));
        extractor.register(Box::new(HeuristicStrategy::new(settings.min_title_words)));
        extractor
    }

    /// Adds a strategy, keeping the list sorted by descending rank.
    pub fn register(&mut self, strategy: Box<dyn ExtractionStrategy>) {
        self.strategies.push(strategy);
        self.strategies.sort_by_key(|s| std::cmp::Reverse(s.rank()));
    }

    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Runs every strategy over `page`. A strategy that fails contributes
    /// nothing; the others still run.
    #[must_use]
    pub fn signals(&self, page: &Page<'_>) -> Vec<ExtractionSignal> {
        let mut signals = Vec::new();
        for strategy in &self.strategies {
            match strategy.extract(page) {
                Ok(units) => {
                    signals.extend(units.into_iter().filter(|f| !f.is_empty()).enumerate().map(
                        |(unit, fields)| ExtractionSignal {
                            fields,
                            strategy: strategy.name(),
                            rank: strategy.rank(),
                            unit,
                        },
                    ));
                }
                Err(e) => {
                    tracing::debug!(
                        url = page.url,
                        strategy = strategy.name(),
                        error = %e,
                        "extraction strategy produced no signals"
                    );
                }
            }
        }
        signals
    }

    /// Signals merged into one candidate per listing unit.
    #[must_use]
    pub fn candidates(&self, page: &Page<'_>) -> Vec<CandidateFields> {
        merge_signals(self.signals(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        rank: u8,
        result: fn() -> Result<Vec<CandidateFields>, ParseError>,
    }

    impl ExtractionStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }
        fn rank(&self) -> u8 {
            self.rank
        }
        fn extract(&self, _page: &Page<'_>) -> Result<Vec<CandidateFields>, ParseError> {
            (self.result)()
        }
    }

    fn titled(title: &str) -> CandidateFields {
        CandidateFields {
            title: Some(title.to_owned()),
            ..CandidateFields::default()
        }
    }

    #[test]
    fn default_extractor_orders_structured_first() {
        let extractor = Extractor::new(&ScraperSettings::default());
        assert_eq!(extractor.strategy_names(), ["structured", "heuristic"]);
    }

    #[test]
    fn failing_strategy_does_not_stop_others() {
        let mut extractor = Extractor {
            strategies: Vec::new(),
        };
        extractor.register(Box::new(Fixed {
            name: "broken",
            rank: 9,
            result: || Err(ParseError::Markup("nope".to_owned())),
        }));
        extractor.register(Box::new(Fixed {
            name: "fixed",
            rank: 1,
            result: || Ok(vec![titled("Corner Bakery"), CandidateFields::default()]),
        }));
        let page = Page::new("https://example.com/", "<p></p>");
        let signals = extractor.signals(&page);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].strategy, "fixed");
        assert_eq!(signals[0].unit, 0);
    }

    #[test]
    fn fill_from_keeps_present_fields() {
        let mut base = CandidateFields {
            title: Some("Structured Title".to_owned()),
            links: vec!["https://a.test/1".to_owned()],
            ..CandidateFields::default()
        };
        base.fill_from(CandidateFields {
            title: Some("Heuristic Title".to_owned()),
            price: Some("$100".to_owned()),
            links: vec!["https://a.test/1".to_owned(), "https://a.test/2".to_owned()],
            ..CandidateFields::default()
        });
        assert_eq!(base.title.as_deref(), Some("Structured Title"));
        assert_eq!(base.price.as_deref(), Some("$100"));
        assert_eq!(base.links, ["https://a.test/1"]);
    }

    #[test]
    fn structured_links_are_not_widened_by_page_navigation() {
        let mut structured = CandidateFields {
            title: Some("Corner Bakery".to_owned()),
            links: vec!["https://e.com/l/1".to_owned()],
            ..CandidateFields::default()
        };
        structured.fill_from(CandidateFields {
            images: vec!["https://e.com/front.jpg".to_owned()],
            links: vec![
                "https://e.com/contact".to_owned(),
                "https://e.com/privacy".to_owned(),
            ],
            ..CandidateFields::default()
        });
        assert_eq!(structured.links, ["https://e.com/l/1"]);
        assert_eq!(structured.images, ["https://e.com/front.jpg"]);

        let mut bare = CandidateFields::default();
        bare.fill_from(CandidateFields {
            links: vec!["https://e.com/contact".to_owned()],
            ..CandidateFields::default()
        });
        assert_eq!(bare.links, ["https://e.com/contact"]);
    }

    #[test]
    fn page_resolves_relative_links() {
        let page = Page::new("https://example.com/listings/", "");
        assert_eq!(
            page.resolve("item-1").as_deref(),
            Some("https://example.com/listings/item-1")
        );
        assert_eq!(page.resolve("#top"), None);
    }
}
