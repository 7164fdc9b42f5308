//! Listings declared in embedded structured metadata: JSON-LD blocks,
//! schema.org microdata and, as a last resort, OpenGraph tags.

use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use serde_json::Value;

use super::html;
use super::{CandidateFields, ExtractionStrategy, Page};
use crate::error::ParseError;

static SCRIPT: LazyLock<Selector> = LazyLock::new(|| html::selector("script[type]"));
static ITEM_SCOPE: LazyLock<Selector> =
    LazyLock::new(|| html::selector("[itemscope][itemtype]"));
static ITEM_PROP: LazyLock<Selector> = LazyLock::new(|| html::selector("[itemprop]"));

const ACCEPTED_TYPES: [&str; 8] = [
    "LocalBusiness",
    "Business",
    "Product",
    "Offer",
    "Service",
    "Organization",
    "Corporation",
    "RealEstateListing",
];

const TITLE_KEYS: [&str; 4] = ["name", "headline", "title", "legalName"];

const ADDRESS_KEYS: [&str; 5] = [
    "streetAddress",
    "addressLocality",
    "addressRegion",
    "postalCode",
    "addressCountry",
];

/// Highest-ranked strategy: what the page says about itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredStrategy;

impl ExtractionStrategy for StructuredStrategy {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn rank(&self) -> u8 {
        2
    }

    fn extract(&self, page: &Page<'_>) -> Result<Vec<CandidateFields>, ParseError> {
        let mut units = Vec::new();
        let mut malformed = None;

        let scripts = page.document().select(&SCRIPT).filter(|script| {
            script
                .value()
                .attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"))
        });
        for script in scripts {
            let block: String = script.text().collect();
            let text = block
                .trim()
                .trim_start_matches("<!--")
                .trim_end_matches("-->")
                .trim();
            match serde_json::from_str::<Value>(text) {
                Ok(value) => collect_entities(&value, page, &mut units),
                Err(e) => {
                    tracing::debug!(url = page.url, error = %e, "skipping malformed JSON-LD block");
                    malformed.get_or_insert(e);
                }
            }
        }

        units.extend(microdata_entities(page));

        if units.is_empty() {
            units.extend(opengraph_entity(page));
        }
        if units.is_empty() {
            if let Some(e) = malformed {
                return Err(ParseError::MalformedJson(e));
            }
        }
        Ok(units)
    }
}

// ---------------------------------------------------------------------------
// JSON-LD
// ---------------------------------------------------------------------------

/// Walks arrays, `@graph` containers and nested objects (e.g. `ItemList`
/// elements). An accepted entity is mapped whole; its children are not
/// searched again.
fn collect_entities(value: &Value, page: &Page<'_>, out: &mut Vec<CandidateFields>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_entities(item, page, out);
            }
        }
        Value::Object(map) => {
            if map.get("@type").is_some_and(is_accepted_type) {
                out.extend(map_entity(value, page));
                return;
            }
            for (key, child) in map {
                if key != "@context" && (child.is_array() || child.is_object()) {
                    collect_entities(child, page, out);
                }
            }
        }
        _ => {}
    }
}

fn is_accepted_type(type_node: &Value) -> bool {
    let matches = |raw: &str| {
        let name = raw.rsplit('/').next().unwrap_or(raw);
        ACCEPTED_TYPES.iter().any(|t| name.eq_ignore_ascii_case(t))
            || name.ends_with("Business")
            || name.ends_with("Store")
    };
    match type_node {
        Value::String(s) => matches(s),
        Value::Array(types) => types.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn map_entity(item: &Value, page: &Page<'_>) -> Option<CandidateFields> {
    let title = TITLE_KEYS.iter().find_map(|k| non_empty_str(item.get(*k)));
    let listing_url = non_empty_str(item.get("url"))
        .or_else(|| non_empty_str(item.get("@id")).filter(|id| !id.contains('#')))
        .and_then(|u| page.resolve(&u));
    if title.is_none() && listing_url.is_none() {
        return None;
    }

    let mut links: Vec<String> = listing_url.iter().cloned().collect();
    for same_as in string_values(item.get("sameAs")) {
        if let Some(link) = page.resolve(&same_as) {
            if !links.contains(&link) {
                links.push(link);
            }
        }
    }

    Some(CandidateFields {
        title,
        listing_url,
        location: location_of(item),
        price: price_of(item),
        description: non_empty_str(item.get("description")),
        images: image_values(item.get("image"))
            .into_iter()
            .filter_map(|src| page.resolve(&src))
            .collect(),
        links,
    })
}

fn price_of(item: &Value) -> Option<String> {
    let offer = match item.get("offers") {
        Some(Value::Array(offers)) => offers.iter().find(|o| o.get("price").is_some()),
        Some(offer @ Value::Object(_)) => Some(offer),
        _ => None,
    };
    let source = offer.unwrap_or(item);
    let amount = scalar_text(source.get("price")?)?;
    match non_empty_str(source.get("priceCurrency")) {
        Some(currency) => Some(format!("{currency} {amount}")),
        None => Some(amount),
    }
}

fn location_of(item: &Value) -> Option<String> {
    if let Some(address) = item.get("address") {
        if let Some(text) = address_text(address) {
            return Some(text);
        }
    }
    if let Some(area) = item.get("areaServed") {
        if let Some(text) = non_empty_str(Some(area)).or_else(|| non_empty_str(area.get("name")))
        {
            return Some(text);
        }
    }
    item.get("location").and_then(|loc| {
        loc.get("address")
            .and_then(address_text)
            .or_else(|| non_empty_str(loc.get("name")))
            .or_else(|| non_empty_str(Some(loc)))
    })
}

fn address_text(address: &Value) -> Option<String> {
    if let Some(text) = non_empty_str(Some(address)) {
        return Some(text);
    }
    let parts: Vec<String> = ADDRESS_KEYS
        .iter()
        .filter_map(|k| {
            let v = address.get(*k)?;
            non_empty_str(Some(v)).or_else(|| non_empty_str(v.get("name")))
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn image_values(node: Option<&Value>) -> Vec<String> {
    match node {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .flat_map(|i| image_values(Some(i)))
            .collect(),
        Some(obj @ Value::Object(_)) => non_empty_str(obj.get("url"))
            .or_else(|| non_empty_str(obj.get("contentUrl")))
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

fn string_values(node: Option<&Value>) -> Vec<String> {
    match node {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

fn non_empty_str(node: Option<&Value>) -> Option<String> {
    node?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Prices appear as strings or bare numbers in the wild.
fn scalar_text(node: &Value) -> Option<String> {
    match node {
        Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Microdata
// ---------------------------------------------------------------------------

fn microdata_entities(page: &Page<'_>) -> Vec<CandidateFields> {
    let mut units = Vec::new();
    let mut taken = Vec::new();
    for scope in page.document().select(&ITEM_SCOPE) {
        let accepted = scope
            .value()
            .attr("itemtype")
            .is_some_and(|t| is_accepted_type(&Value::String(t.to_owned())));
        if !accepted || scope.ancestors().any(|a| taken.contains(&a.id())) {
            continue;
        }
        taken.push(scope.id());
        units.extend(microdata_fields(scope, page));
    }
    units
}

fn microdata_fields(scope: ElementRef<'_>, page: &Page<'_>) -> Option<CandidateFields> {
    let mut props: HashMap<String, String> = HashMap::new();
    let mut images = Vec::new();

    for el in scope.select(&ITEM_PROP) {
        let Some(names) = html::attr(el, "itemprop") else { continue };
        let value = html::attr(el, "content")
            .or_else(|| match el.value().name() {
                "a" | "link" => html::attr(el, "href"),
                "img" | "source" => html::attr(el, "src"),
                _ => None,
            })
            .unwrap_or_else(|| html::text_of(el));
        if value.is_empty() {
            continue;
        }
        for name in names.split_whitespace() {
            if name == "image" {
                images.push(value.clone());
            } else {
                props.entry(name.to_owned()).or_insert_with(|| value.clone());
            }
        }
    }

    let title = props.get("name").cloned();
    let listing_url = props.get("url").and_then(|u| page.resolve(u));
    if title.is_none() && listing_url.is_none() {
        return None;
    }

    let address_parts: Vec<&str> = ADDRESS_KEYS
        .iter()
        .filter_map(|k| props.get(*k).map(String::as_str))
        .collect();
    let location = if address_parts.is_empty() {
        props.get("address").cloned()
    } else {
        Some(address_parts.join(", "))
    };
    let price = props.get("price").map(|amount| match props.get("priceCurrency") {
        Some(currency) => format!("{currency} {amount}"),
        None => amount.clone(),
    });

    Some(CandidateFields {
        title,
        links: listing_url.iter().cloned().collect(),
        listing_url,
        location,
        price,
        description: props.get("description").cloned(),
        images: images.iter().filter_map(|src| page.resolve(src)).collect(),
    })
}

// ---------------------------------------------------------------------------
// OpenGraph
// ---------------------------------------------------------------------------

fn opengraph_entity(page: &Page<'_>) -> Option<CandidateFields> {
    let document = page.document();
    let title = html::meta_content(document, "og:title")?;
    let listing_url = page.resolve(&html::meta_content(document, "og:url")?)?;

    let amount = html::meta_content(document, "product:price:amount")
        .or_else(|| html::meta_content(document, "og:price:amount"));
    let currency = html::meta_content(document, "product:price:currency")
        .or_else(|| html::meta_content(document, "og:price:currency"));
    let price = amount.map(|a| match currency {
        Some(c) => format!("{c} {a}"),
        None => a,
    });

    Some(CandidateFields {
        title: Some(title),
        links: vec![listing_url.clone()],
        listing_url: Some(listing_url),
        location: None,
        price,
        description: html::meta_content(document, "og:description"),
        images: html::meta_content(document, "og:image")
            .and_then(|src| page.resolve(&src))
            .into_iter()
            .collect(),
    })
}

#[cfg(test)]
#[path = "structured_test.rs"]
mod tests;
