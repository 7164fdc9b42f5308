use super::*;

#[test]
fn collapse_whitespace_trims_and_joins() {
    assert_eq!(collapse_whitespace("  Corner \n\t Bakery  "), "Corner Bakery");
    assert_eq!(clean_field(Some("   ".to_owned())), None);
}

#[test]
fn fold_title_is_case_insensitive() {
    assert_eq!(fold_title("Corner  BAKERY"), fold_title("corner bakery"));
}

#[test]
fn normalize_url_lowercases_host_and_drops_fragment() {
    assert_eq!(
        normalize_url("HTTPS://Example.COM/Listing/42#photos").as_deref(),
        Some("https://example.com/Listing/42")
    );
}

#[test]
fn normalize_url_strips_tracking_params_only() {
    assert_eq!(
        normalize_url("https://example.com/l/1?utm_source=x&id=7&gclid=abc&UTM_MEDIUM=y").as_deref(),
        Some("https://example.com/l/1?id=7")
    );
    assert_eq!(
        normalize_url("https://example.com/l/1?utm_campaign=z").as_deref(),
        Some("https://example.com/l/1")
    );
}

#[test]
fn normalize_url_keeps_listing_identifiers() {
    assert_eq!(
        normalize_url("https://brokers.example/listing?ref=101&fbclid=x").as_deref(),
        Some("https://brokers.example/listing?ref=101")
    );
    assert_ne!(
        normalize_url("https://brokers.example/listing?ref=101"),
        normalize_url("https://brokers.example/listing?ref=202")
    );
}

#[test]
fn normalize_url_removes_trailing_slash() {
    assert_eq!(
        normalize_url("https://example.com/listing/").as_deref(),
        Some("https://example.com/listing")
    );
    assert_eq!(
        normalize_url("https://example.com/").as_deref(),
        Some("https://example.com")
    );
    assert_eq!(
        normalize_url("https://example.com").as_deref(),
        Some("https://example.com")
    );
}

#[test]
fn normalize_url_is_idempotent() {
    let once = normalize_url("https://Example.com/a/?ref=home&b=2#x").unwrap();
    assert_eq!(normalize_url(&once).as_deref(), Some(once.as_str()));
}

#[test]
fn normalize_url_rejects_relative_and_non_http() {
    assert_eq!(normalize_url("/listing/1"), None);
    assert_eq!(normalize_url("mailto:a@b.test"), None);
}

#[test]
fn resolve_url_joins_relative_paths() {
    assert_eq!(
        resolve_url("/listing/9", "https://example.com/search?q=x").as_deref(),
        Some("https://example.com/listing/9")
    );
    assert_eq!(
        resolve_url("https://other.test/a", "https://example.com/").as_deref(),
        Some("https://other.test/a")
    );
}

#[test]
fn resolve_url_skips_non_navigable_references() {
    for raw in ["#top", "mailto:x@y.test", "javascript:void(0)", "tel:123", ""] {
        assert_eq!(resolve_url(raw, "https://example.com/"), None, "{raw}");
    }
}

#[test]
fn extract_price_finds_symbol_and_code_prefixes() {
    assert_eq!(
        extract_price("Asking price: £250,000 ono").as_deref(),
        Some("£250,000")
    );
    assert_eq!(extract_price("USD 1,200.50 firm").as_deref(), Some("USD 1,200.50"));
    assert_eq!(extract_price("Only $95k!").as_deref(), Some("$95k"));
    assert_eq!(extract_price("Price on application"), None);
}

#[test]
fn normalize_price_falls_back_to_text() {
    assert_eq!(
        normalize_price("Price on   application").as_deref(),
        Some("Price on application")
    );
    assert_eq!(normalize_price("  "), None);
}
