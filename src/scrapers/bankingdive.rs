//! Banking Dive listing and article scraper.
//!
//! This module parses pages from [Banking Dive](https://www.bankingdive.com/news/),
//! a trade publication covering the US banking industry. The news listing is
//! paginated with a `?page=N` query and renders each story as a feed item
//! (`li.feed__item` or a `rowfeed` container) holding a headline link, a deck,
//! and usually a date label.
//!
//! Markup drifts over time, so every field is found through an ordered list of
//! fallbacks rather than a single selector. Items that yield no usable link or
//! title are skipped and counted.

use crate::models::ArticleStub;
use crate::utils::{canonical_url, normalize_whitespace, parse_publish_date};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

/// Default listing root.
pub const NEWS_URL: &str = "https://www.bankingdive.com/news/";

/// Summaries outside this length range are layout text, not decks.
const MIN_SUMMARY_CHARS: usize = 20;
const MAX_SUMMARY_CHARS: usize = 500;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

static FEED_ITEMS: Lazy<Selector> = Lazy::new(|| {
    selector(
        r#"li[class*="feed__item"], li[class*="rowfeed"], article[class*="feed__item"], article[class*="rowfeed"], div[class*="feed__item"], div[class*="rowfeed"]"#,
    )
});
static ARTICLE_TAGS: Lazy<Selector> = Lazy::new(|| selector("article"));
static HEADINGS: Lazy<[Selector; 3]> = Lazy::new(|| [selector("h3"), selector("h2"), selector("h1")]);
static LINKS: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| selector("p"));
static BLOCKS: Lazy<Selector> = Lazy::new(|| selector("div, span"));
static TIME_TAGS: Lazy<Selector> = Lazy::new(|| selector("time"));
static DATE_LABELS: Lazy<Selector> = Lazy::new(|| {
    selector(r#"[class*="date"], [class*="secondary-label"], [class*="published"]"#)
});
static PUBLISHED_META: Lazy<Selector> = Lazy::new(|| {
    selector(r#"meta[property="article:published_time"], meta[name="date"], meta[itemprop="datePublished"]"#)
});
static BODY_PARAGRAPHS: Lazy<[Selector; 3]> = Lazy::new(|| {
    [
        selector(r#"div[class*="article-body"] p"#),
        selector("article p"),
        selector("main p"),
    ]
});

/// Class fragments that mark a paragraph as the story deck.
const DECK_CLASSES: [&str; 6] = ["deck", "summary", "excerpt", "dek", "description", "rowfeed"];

/// URL of listing page `page` (1-based) under `base`.
pub fn listing_url(base: &Url, page: usize) -> String {
    let mut url = base.clone();
    url.query_pairs_mut().clear().append_pair("page", &page.to_string());
    url.to_string()
}

/// Stubs parsed from one listing page.
#[derive(Debug, Default)]
pub struct ListingPage {
    /// Stubs in page order. May contain repeats; the collector deduplicates.
    pub stubs: Vec<ArticleStub>,
    /// Feed items that had no usable link or title.
    pub skipped: usize,
}

/// Parse a listing page into article stubs.
///
/// Feed-item containers are preferred; when none exist every `<article>`
/// element is tried instead. Links that leave the listing's host are ignored.
#[instrument(level = "debug", skip_all, fields(base = %base))]
pub fn parse_listing(html: &str, base: &Url) -> ListingPage {
    let document = Html::parse_document(html);
    let mut items: Vec<ElementRef> = document.select(&FEED_ITEMS).collect();
    if items.is_empty() {
        items = document.select(&ARTICLE_TAGS).collect();
    }

    let mut page = ListingPage::default();
    for item in items {
        match parse_feed_item(item, base) {
            Some(stub) => page.stubs.push(stub),
            None => page.skipped += 1,
        }
    }

    debug!(stubs = page.stubs.len(), skipped = page.skipped, "Parsed listing page");
    page
}

fn parse_feed_item(item: ElementRef, base: &Url) -> Option<ArticleStub> {
    let heading = HEADINGS
        .iter()
        .find_map(|sel| item.select(sel).find(|h| !element_text(*h).is_empty()));

    let link = heading
        .and_then(|h| h.select(&LINKS).next())
        .or_else(|| item.select(&LINKS).find(|a| !element_text(*a).is_empty()))?;
    let href = link.value().attr("href")?;
    let url = canonical_url(base, href)?;
    if Url::parse(&url).ok()?.host_str() != base.host_str() {
        debug!(%url, "Skipping off-site link");
        return None;
    }

    let title = heading.map(element_text).unwrap_or_else(|| element_text(link));
    if title.is_empty() {
        return None;
    }

    Some(ArticleStub {
        url,
        title,
        summary: find_summary(item).unwrap_or_default(),
        publish_date: find_date(item),
    })
}

fn find_summary(item: ElementRef) -> Option<String> {
    let by_class = item.select(&PARAGRAPHS).find(|p| {
        let classes = p.value().classes().collect::<Vec<_>>().join(" ").to_lowercase();
        !element_text(*p).is_empty() && DECK_CLASSES.iter().any(|k| classes.contains(k))
    });
    if let Some(p) = by_class {
        return Some(element_text(p));
    }

    if let Some(p) = item
        .select(&PARAGRAPHS)
        .map(element_text)
        .find(|t| t.chars().count() > MIN_SUMMARY_CHARS)
    {
        return Some(p);
    }

    // Some decks live in bare divs or spans; take the first leaf-ish block of
    // plausible length.
    item.select(&BLOCKS)
        .filter(|el| el.id() != item.id())
        .map(element_text)
        .find(|t| {
            let n = t.chars().count();
            n > MIN_SUMMARY_CHARS && n < MAX_SUMMARY_CHARS
        })
}

fn find_date(scope: ElementRef) -> Option<chrono::NaiveDate> {
    scope
        .select(&TIME_TAGS)
        .find_map(|t| {
            t.value()
                .attr("datetime")
                .and_then(parse_publish_date)
                .or_else(|| parse_publish_date(&element_text(t)))
        })
        .or_else(|| {
            scope
                .select(&DATE_LABELS)
                .find_map(|el| parse_publish_date(&element_text(el)))
        })
}

/// Content extracted from a single article page.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ArticlePage {
    /// Body paragraphs joined by newlines; empty when nothing matched.
    pub body: String,
    pub publish_date: Option<chrono::NaiveDate>,
}

/// Parse an article page into body text and publish date.
#[instrument(level = "debug", skip_all)]
pub fn parse_article(html: &str) -> ArticlePage {
    let document = Html::parse_document(html);

    let mut paragraphs: Vec<String> = Vec::new();
    for sel in BODY_PARAGRAPHS.iter() {
        paragraphs = document
            .select(sel)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            break;
        }
    }
    if paragraphs.is_empty() {
        warn!("No article body paragraphs matched");
    }

    let publish_date = document
        .select(&PUBLISHED_META)
        .find_map(|m| m.value().attr("content").and_then(parse_publish_date))
        .or_else(|| find_date(document.root_element()));

    let page = ArticlePage {
        body: paragraphs.join("\n"),
        publish_date,
    };
    debug!(bytes = page.body.len(), date = ?page.publish_date, "Parsed article page");
    page
}

fn element_text(el: ElementRef) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const LISTING: &str = r#"
        <html><body>
          <ul class="feed">
            <li class="row feed__item">
              <h3 class="feed__title"><a href="/news/wire-fraud-scheme-bank/700001/">Bank uncovers wire fraud scheme</a></h3>
              <p class="feed__description">Prosecutors say the ring moved millions through mule accounts.</p>
              <span class="secondary-label">Oct. 17, 2025</span>
            </li>
            <li class="row feed__item">
              <h3 class="feed__title"><a href="https://www.bankingdive.com/news/fed-rate-outlook/700002/?utm_source=feed">Fed holds rates steady</a></h3>
              <p>Regional lenders brace for another quarter of margin pressure.</p>
            </li>
            <li class="row feed__item">
              <h3 class="feed__title"><a href="https://sponsor.example.com/promo">Sponsored: grow deposits</a></h3>
            </li>
            <li class="row feed__item">
              <span class="label">Advertisement</span>
            </li>
          </ul>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse(NEWS_URL).unwrap()
    }

    #[test]
    fn test_listing_url() {
        assert_eq!(listing_url(&base(), 1), "https://www.bankingdive.com/news/?page=1");
        assert_eq!(listing_url(&base(), 12), "https://www.bankingdive.com/news/?page=12");
    }

    #[test]
    fn test_parse_listing_extracts_stubs() {
        let page = parse_listing(LISTING, &base());
        assert_eq!(page.stubs.len(), 2);
        assert_eq!(page.skipped, 2);

        let first = &page.stubs[0];
        assert_eq!(first.url, "https://www.bankingdive.com/news/wire-fraud-scheme-bank/700001/");
        assert_eq!(first.title, "Bank uncovers wire fraud scheme");
        assert_eq!(first.summary, "Prosecutors say the ring moved millions through mule accounts.");
        assert_eq!(first.publish_date, NaiveDate::from_ymd_opt(2025, 10, 17));

        let second = &page.stubs[1];
        assert_eq!(second.url, "https://www.bankingdive.com/news/fed-rate-outlook/700002/");
        assert_eq!(second.summary, "Regional lenders brace for another quarter of margin pressure.");
        assert_eq!(second.publish_date, None);
    }

    #[test]
    fn test_parse_listing_falls_back_to_article_tags() {
        let html = r#"<html><body>
            <article><h2><a href="/news/check-fraud/1/">Check fraud climbs</a></h2>
            <div>Banks report a sharp rise in altered and counterfeit checks.</div></article>
        </body></html>"#;
        let page = parse_listing(html, &base());
        assert_eq!(page.stubs.len(), 1);
        assert_eq!(page.stubs[0].title, "Check fraud climbs");
        assert_eq!(
            page.stubs[0].summary,
            "Banks report a sharp rise in altered and counterfeit checks."
        );
    }

    #[test]
    fn test_parse_listing_empty_page() {
        let page = parse_listing("<html><body><p>No results</p></body></html>", &base());
        assert!(page.stubs.is_empty());
        assert_eq!(page.skipped, 0);
    }

    #[test]
    fn test_parse_article_body_and_meta_date() {
        let html = r#"<html><head>
            <meta property="article:published_time" content="2025-10-16T09:00:00-04:00">
          </head><body>
            <h1>Bank uncovers wire fraud scheme</h1>
            <div class="large medium article-body">
              <p>The bank said the   scheme began in 2023.</p>
              <p></p>
              <p>Investigators froze the accounts.</p>
            </div>
            <p>Newsletter signup</p>
        </body></html>"#;
        let page = parse_article(html);
        assert_eq!(
            page.body,
            "The bank said the scheme began in 2023.\nInvestigators froze the accounts."
        );
        assert_eq!(page.publish_date, NaiveDate::from_ymd_opt(2025, 10, 16));
    }

    #[test]
    fn test_parse_article_published_label() {
        let html = r#"<html><body>
            <div class="published-info"><span>Published Sept. 3, 2025</span></div>
            <article><p>Body text.</p></article>
        </body></html>"#;
        let page = parse_article(html);
        assert_eq!(page.body, "Body text.");
        assert_eq!(page.publish_date, NaiveDate::from_ymd_opt(2025, 9, 3));
    }

    #[test]
    fn test_parse_article_without_body() {
        let page = parse_article("<html><body><div>Paywall</div></body></html>");
        assert_eq!(page, ArticlePage::default());
    }
}
