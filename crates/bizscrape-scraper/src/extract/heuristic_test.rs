use super::*;

const PAGE_URL: &str = "https://brokers.example.com/search?sector=retail";

fn run(html: &str) -> Vec<CandidateFields> {
    HeuristicStrategy::new(2)
        .extract(&Page::new(PAGE_URL, html))
        .expect("extracts")
}

const INDEX_PAGE: &str = r#"<html><body>
<nav><ul>
  <li class="menu-item"><a href="/">Home</a></li>
  <li class="menu-item"><a href="/contact">Contact</a></li>
</ul></nav>
<div class="results">
  <div class="listing-card">
    <h3><a href="/l/101">Busy Corner Bakery</a></h3>
    <span class="location">Leeds</span>
    <span class="price">£120,000</span>
    <p>Long-established bakery with wholesale contracts.</p>
    <img src="/img/101.jpg">
  </div>
  <div class="listing-card">
    <h3><a href="/l/102">Dry Cleaning Franchise</a></h3>
    <span class="location">York</span>
    <div class="asking">Asking $75k</div>
  </div>
  <div class="listing-card">
    <h3>Village Post Office</h3>
    <a href="/l/103?utm_source=list">Details</a>
  </div>
  <div class="listing-card">
    <h3><a href="/l/104">Pub</a></h3>
  </div>
</div>
</body></html>"#;

#[test]
fn detects_repeated_listing_cards() {
    let units = run(INDEX_PAGE);
    let titles: Vec<_> = units.iter().filter_map(|u| u.title.as_deref()).collect();
    // "Pub" is below the two-word minimum.
    assert_eq!(
        titles,
        [
            "Busy Corner Bakery",
            "Dry Cleaning Franchise",
            "Village Post Office"
        ]
    );
}

#[test]
fn unit_fields_are_read_from_the_card() {
    let units = run(INDEX_PAGE);
    let first = &units[0];
    assert_eq!(
        first.listing_url.as_deref(),
        Some("https://brokers.example.com/l/101")
    );
    assert_eq!(first.location.as_deref(), Some("Leeds"));
    assert_eq!(first.price.as_deref(), Some("£120,000"));
    assert_eq!(
        first.description.as_deref(),
        Some("Long-established bakery with wholesale contracts.")
    );
    assert_eq!(first.images, ["https://brokers.example.com/img/101.jpg"]);

    assert_eq!(units[1].price.as_deref(), Some("$75k"));
    assert_eq!(
        units[2].listing_url.as_deref(),
        Some("https://brokers.example.com/l/103?utm_source=list")
    );
}

#[test]
fn hinted_group_outranks_larger_unhinted_group() {
    let html = r#"<body>
      <span class="x"></span>
      <div class="tile"><a href="/a">Alpha Beta</a></div>
      <div class="tile"><a href="/b">Gamma Delta</a></div>
      <div class="tile"><a href="/c">Epsilon Zeta</a></div>
      <div class="tile"><a href="/d">Eta Theta</a></div>
      <article class="result"><h2><a href="/r1">Result One</a></h2></article>
      <article class="result"><h2><a href="/r2">Result Two</a></h2></article>
      <article class="result"><h2><a href="/r3">Result Three</a></h2></article>
    </body>"#;
    let units = run(html);
    assert_eq!(units.len(), 3);
    assert_eq!(units[0].title.as_deref(), Some("Result One"));
}

#[test]
fn single_listing_page_yields_one_unit() {
    let html = r#"<html><head>
      <title>Corner Bakery | Brokers</title>
      <link rel="canonical" href="https://brokers.example.com/l/101">
      <meta name="description" content="A bakery for sale in Leeds.">
      <meta property="og:image" content="/og/101.jpg">
    </head><body>
      <h1>Corner Bakery for sale</h1>
      <address>12 High Street, Leeds</address>
      <div class="price-box">Asking price: GBP 120,000</div>
      <p>Short.</p>
      <a href="/l/101/enquire">Enquire</a>
      <a href="mailto:broker@example.com">Email</a>
    </body></html>"#;
    let units = run(html);
    assert_eq!(units.len(), 1);
    let unit = &units[0];
    assert_eq!(unit.title.as_deref(), Some("Corner Bakery for sale"));
    assert_eq!(
        unit.listing_url.as_deref(),
        Some("https://brokers.example.com/l/101")
    );
    assert_eq!(unit.location.as_deref(), Some("12 High Street, Leeds"));
    assert_eq!(unit.price.as_deref(), Some("GBP 120,000"));
    assert_eq!(
        unit.description.as_deref(),
        Some("A bakery for sale in Leeds.")
    );
    assert_eq!(unit.images, ["https://brokers.example.com/og/101.jpg"]);
    assert_eq!(unit.links, ["https://brokers.example.com/l/101/enquire"]);
}

#[test]
fn single_listing_falls_back_to_page_url() {
    let html = "<body><h1>Seaside Cafe Lease</h1></body>";
    let units = run(html);
    assert_eq!(units[0].listing_url.as_deref(), Some(PAGE_URL));
}

#[test]
fn page_without_usable_title_yields_nothing() {
    assert!(run("<body><h1>Home</h1></body>").is_empty());
    assert!(run("<body><p>no heading here</p></body>").is_empty());
}

#[test]
fn plain_text_is_a_markup_error() {
    let result = HeuristicStrategy::new(2).extract(&Page::new(PAGE_URL, "just text"));
    assert!(matches!(result, Err(ParseError::Markup(_))));
}

#[test]
fn unclosed_cards_do_not_absorb_their_siblings() {
    let html = r#"<html><body><ul class="results">
      <li class="result"><h3><a href="/l/1">Alpha Bakery Shop</a></h3>
        <p>Family bakery on a busy high street.
      <li class="result"><h3><a href="/l/2">Beta Garage Services</a></h3>
        <span class="price">£50,000</span><img src="/b.jpg">
      <li class="result"><h3><a href="/l/3">Gamma Print Works</a></h3>
        <span class="location">Hull</span>
    </ul></body></html>"#;
    let units = run(html);
    assert_eq!(units.len(), 3);

    let alpha = &units[0];
    assert_eq!(alpha.title.as_deref(), Some("Alpha Bakery Shop"));
    assert_eq!(alpha.price, None);
    assert_eq!(alpha.location, None);
    assert!(alpha.images.is_empty());
    assert_eq!(alpha.links, ["https://brokers.example.com/l/1"]);
    assert_eq!(
        alpha.description.as_deref(),
        Some("Family bakery on a busy high street.")
    );

    let beta = &units[1];
    assert_eq!(beta.price.as_deref(), Some("£50,000"));
    assert_eq!(beta.images, ["https://brokers.example.com/b.jpg"]);
    assert_eq!(beta.links, ["https://brokers.example.com/l/2"]);
    assert_eq!(units[2].location.as_deref(), Some("Hull"));
}

#[test]
fn entity_encoded_text_is_decoded() {
    let html = r#"<html><head>
      <meta property="og:image" content="/img?id=9&amp;size=large">
    </head><body>
      <h1>Joe&#8217;s Caf&eacute; &ndash; Leeds</h1>
      <p>Fish &amp; chips shop with&nbsp;seating for forty.</p>
    </body></html>"#;
    let units = run(html);
    assert_eq!(units.len(), 1);
    let unit = &units[0];
    assert_eq!(
        unit.title.as_deref(),
        Some("Joe\u{2019}s Caf\u{e9} \u{2013} Leeds")
    );
    assert_eq!(
        unit.description.as_deref(),
        Some("Fish & chips shop with seating for forty.")
    );
    assert_eq!(
        unit.images,
        ["https://brokers.example.com/img?id=9&size=large"]
    );
}
