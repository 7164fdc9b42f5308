//! Session-wide normalization, junk filtering and deduplication.

use std::collections::HashSet;

use bizscrape_core::{BusinessRecord, ScraperSettings};
use sha2::{Digest, Sha256};

use crate::extract::CandidateFields;
use crate::normalize::{clean_field, fold_title, normalize_price, normalize_url};

/// Identity of a record within one session: a hash of the normalized
/// listing URL, or of the case-folded title when there is no URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupeKey(String);

impl DedupeKey {
    #[must_use]
    pub fn for_record(record: &BusinessRecord) -> Option<Self> {
        let material = if let Some(url) = record.listing_url.as_deref() {
            format!("url:{url}")
        } else {
            format!("title:{}", fold_title(record.title.as_deref()?))
        };
        Some(Self(format!("{:x}", Sha256::digest(material.as_bytes()))))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What happened to a candidate handed to [`RecordSet::fold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    Inserted,
    Duplicate,
    Junk,
    /// Neither a title nor a listing URL survived normalization.
    MissingIdentity,
}

/// Keyword lists deciding which candidates are site furniture rather than
/// listings. Title keywords match whole words; URL keywords match whole
/// path or query tokens.
#[derive(Debug, Clone)]
pub struct JunkFilter {
    title_keywords: Vec<String>,
    url_keywords: Vec<String>,
}

impl JunkFilter {
    #[must_use]
    pub fn new(title_keywords: &[String], url_keywords: &[String]) -> Self {
        let prepare = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        };
        Self {
            title_keywords: prepare(title_keywords),
            url_keywords: prepare(url_keywords),
        }
    }

    #[must_use]
    pub fn is_junk(&self, record: &BusinessRecord) -> bool {
        let title_hit = record.title.as_deref().is_some_and(|title| {
            let folded = fold_title(title);
            let words = tokens(&folded);
            self.title_keywords
                .iter()
                .any(|k| matches_keyword(&words, &folded, k))
        });
        let url_hit = record.listing_url.as_deref().is_some_and(|url| {
            let tail = url_tail(url).to_lowercase();
            let words = tokens(&tail);
            self.url_keywords
                .iter()
                .any(|k| matches_keyword(&words, &tail, k))
        });
        title_hit || url_hit
    }
}

fn tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Single-word keywords must equal a token; multi-word keywords match as a
/// substring of the folded text.
fn matches_keyword(words: &[&str], folded: &str, keyword: &str) -> bool {
    if keyword.contains(char::is_whitespace) {
        folded.contains(keyword)
    } else {
        words.contains(&keyword)
    }
}

/// Path, query and fragment of `url`; the host is never matched.
fn url_tail(url: &str) -> &str {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    after_scheme
        .find('/')
        .map_or("", |slash| &after_scheme[slash..])
}

/// Canonical form of a candidate. Relative URLs have already been resolved
/// by the strategies; anything that still does not parse is dropped.
#[must_use]
pub fn normalize_candidate(candidate: CandidateFields) -> BusinessRecord {
    let listing_url = candidate.listing_url.as_deref().and_then(normalize_url);
    let dedupe_urls = |urls: Vec<String>| {
        let mut out: Vec<String> = Vec::new();
        for url in urls.iter().filter_map(|u| normalize_url(u)) {
            if !out.contains(&url) {
                out.push(url);
            }
        }
        out
    };
    BusinessRecord {
        title: clean_field(candidate.title),
        listing_url,
        location: clean_field(candidate.location),
        price: candidate.price.as_deref().and_then(normalize_price),
        description: clean_field(candidate.description),
        images: dedupe_urls(candidate.images),
        all_links: dedupe_urls(candidate.links),
    }
}

/// The single owner of a session's unique records.
///
/// Fetch tasks hand their candidates to the session loop, which folds them
/// in here one at a time; `&mut self` keeps that the only write path.
#[derive(Debug)]
pub struct RecordSet {
    junk: JunkFilter,
    keys: HashSet<DedupeKey>,
    records: Vec<BusinessRecord>,
    duplicates: usize,
    rejected: usize,
}

impl RecordSet {
    #[must_use]
    pub fn new(settings: &ScraperSettings) -> Self {
        Self {
            junk: JunkFilter::new(&settings.junk_title_keywords, &settings.junk_url_keywords),
            keys: HashSet::new(),
            records: Vec::new(),
            duplicates: 0,
            rejected: 0,
        }
    }

    /// Normalizes `candidate`, then inserts it unless it is junk, lacks an
    /// identity, or repeats a key already held.
    pub fn fold(&mut self, candidate: CandidateFields) -> FoldOutcome {
        let record = normalize_candidate(candidate);
        let Some(key) = DedupeKey::for_record(&record) else {
            self.rejected += 1;
            return FoldOutcome::MissingIdentity;
        };
        if self.junk.is_junk(&record) {
            self.rejected += 1;
            return FoldOutcome::Junk;
        }
        if !self.keys.insert(key) {
            self.duplicates += 1;
            return FoldOutcome::Duplicate;
        }
        self.records.push(record);
        FoldOutcome::Inserted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Candidates dropped as junk or for lacking an identity.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    #[must_use]
    pub fn into_records(self) -> Vec<BusinessRecord> {
        self.records
    }
}
