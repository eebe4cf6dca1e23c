//! Paginated article collection.
//!
//! The [`Collector`] walks listing pages in order, deduplicates stubs by URL,
//! optionally drops stubs whose title and summary match no fraud keyword, and
//! fetches the full page for every accepted stub. It is a bounded lazy
//! sequence: each [`Collector::next_article`] call does only the network work
//! needed for the next article, and the sequence ends when either
//!
//! - `target` articles have been produced, or
//! - `max_empty_pages` consecutive listing pages yielded no new accepted stub,
//!   a listing page contained no feed items at all, or a listing page failed
//!   permanently (e.g. 404 past the last page).
//!
//! The empty-page bound keeps a source whose pagination loops back onto
//! already-seen stories from running forever.

use crate::classifier::taxonomy::FraudTaxonomy;
use crate::fetcher::FetchPage;
use crate::models::{ArticleStub, RawArticle};
use crate::scrapers::bankingdive::{listing_url, parse_article, parse_listing};
use crate::utils::truncate_for_log;
use futures::stream::{self, Stream, StreamExt};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const DEFAULT_TARGET: usize = 20;
pub const DEFAULT_MAX_EMPTY_PAGES: usize = 3;

/// Knobs for one collection run.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Listing root; page `N` is `base_url?page=N`.
    pub base_url: Url,
    /// Number of accepted articles to produce.
    pub target: usize,
    /// Skip stubs whose title and summary contain no fraud keyword.
    pub fraud_only: bool,
    /// Consecutive listing pages without a new accepted stub before giving up.
    pub max_empty_pages: usize,
}

/// Counters describing how a run went.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub pages_fetched: usize,
    pub listing_failures: usize,
    pub parse_skipped: usize,
    pub duplicates: usize,
    pub filtered_out: usize,
    pub body_failures: usize,
    pub produced: usize,
}

pub struct Collector<'a, F> {
    fetcher: &'a F,
    taxonomy: &'a FraudTaxonomy,
    config: CollectorConfig,
    page: usize,
    seen: HashSet<String>,
    pending: VecDeque<(ArticleStub, Vec<String>)>,
    empty_streak: usize,
    exhausted: bool,
    stats: CollectStats,
}

impl<'a, F> Collector<'a, F>
where
    F: FetchPage,
{
    pub fn new(fetcher: &'a F, taxonomy: &'a FraudTaxonomy, config: CollectorConfig) -> Self {
        Self {
            fetcher,
            taxonomy,
            config,
            page: 0,
            seen: HashSet::new(),
            pending: VecDeque::new(),
            empty_streak: 0,
            exhausted: false,
            stats: CollectStats::default(),
        }
    }

    /// Produce the next article, or `None` once the run is over.
    pub async fn next_article(&mut self) -> Option<RawArticle> {
        loop {
            if self.stats.produced >= self.config.target {
                return None;
            }
            if let Some((stub, keywords)) = self.pending.pop_front() {
                let article = self.fetch_full(stub, keywords).await;
                self.stats.produced += 1;
                return Some(article);
            }
            if self.exhausted {
                return None;
            }
            self.load_next_page().await;
        }
    }

    /// The remaining articles as a stream, in discovery order.
    pub fn articles(&mut self) -> impl Stream<Item = RawArticle> {
        stream::unfold(self, |collector| async move {
            collector.next_article().await.map(|a| (a, collector))
        })
    }

    /// Drive the sequence to completion.
    #[instrument(level = "info", skip_all, fields(target = self.config.target, fraud_only = self.config.fraud_only))]
    pub async fn run(mut self) -> (Vec<RawArticle>, CollectStats) {
        let articles: Vec<RawArticle> = self.articles().collect().await;
        info!(
            produced = self.stats.produced,
            pages = self.stats.pages_fetched,
            duplicates = self.stats.duplicates,
            filtered_out = self.stats.filtered_out,
            body_failures = self.stats.body_failures,
            listing_failures = self.stats.listing_failures,
            parse_skipped = self.stats.parse_skipped,
            "Collection finished"
        );
        (articles, self.stats)
    }

    #[instrument(level = "info", skip(self), fields(page = self.page + 1))]
    async fn load_next_page(&mut self) {
        self.page += 1;
        let url = listing_url(&self.config.base_url, self.page);

        let accepted = match self.fetcher.fetch(&url).await {
            Ok(html) => {
                self.stats.pages_fetched += 1;
                let listing = parse_listing(&html, &self.config.base_url);
                self.stats.parse_skipped += listing.skipped;
                if listing.stubs.is_empty() && listing.skipped == 0 {
                    info!(%url, "Listing page has no feed items; pagination exhausted");
                    debug!(preview = %truncate_for_log(&html, 300), "Listing page without feed items");
                    self.exhausted = true;
                    return;
                }
                self.accept(listing.stubs)
            }
            Err(e) if e.is_transient() => {
                self.stats.listing_failures += 1;
                warn!(%url, error = %e, "Listing page unavailable; counting it as empty");
                0
            }
            Err(e) => {
                self.stats.listing_failures += 1;
                warn!(%url, error = %e, status = ?e.status(), "Listing page failed permanently; stopping pagination");
                self.exhausted = true;
                return;
            }
        };

        if accepted == 0 {
            self.empty_streak += 1;
            debug!(streak = self.empty_streak, max = self.config.max_empty_pages, "Page yielded nothing new");
            if self.empty_streak >= self.config.max_empty_pages {
                info!(
                    pages = self.page,
                    streak = self.empty_streak,
                    "No new articles for consecutive pages; pagination exhausted"
                );
                self.exhausted = true;
            }
        } else {
            self.empty_streak = 0;
        }
    }

    /// Queue unseen stubs that pass the pre-filter; returns how many were queued.
    fn accept(&mut self, stubs: Vec<ArticleStub>) -> usize {
        let mut accepted = 0;
        for stub in stubs {
            if !self.seen.insert(stub.url.clone()) {
                self.stats.duplicates += 1;
                continue;
            }
            let keywords = self
                .taxonomy
                .matched_keywords(&format!("{} {}", stub.title, stub.summary));
            if self.config.fraud_only && keywords.is_empty() {
                self.stats.filtered_out += 1;
                debug!(url = %stub.url, title = %stub.title, "Pre-filter rejected stub");
                continue;
            }
            self.pending.push_back((stub, keywords));
            accepted += 1;
        }
        accepted
    }

    /// Fetch the article page; a failure keeps the stub with no body.
    async fn fetch_full(&mut self, stub: ArticleStub, keywords: Vec<String>) -> RawArticle {
        match self.fetcher.fetch(&stub.url).await {
            Ok(html) => {
                let page = parse_article(&html);
                let date = stub.publish_date.or(page.publish_date);
                let body = (!page.body.is_empty()).then_some(page.body);
                let mut article = RawArticle::from_stub(stub, body, keywords);
                article.publish_date = date;
                debug!(url = %article.url, has_body = article.body_text.is_some(), "Collected article");
                article
            }
            Err(e) => {
                self.stats.body_failures += 1;
                warn!(url = %stub.url, error = %e, "Article fetch failed; keeping listing metadata only");
                RawArticle::from_stub(stub, None, keywords)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchError;
    use crate::scrapers::bankingdive::NEWS_URL;
    use std::sync::Mutex;

    /// In-memory source: a routing closure plus a log of requested URLs.
    struct FakeSite<R> {
        route: R,
        requests: Mutex<Vec<String>>,
    }

    impl<R> FakeSite<R>
    where
        R: Fn(&str) -> Result<String, FetchError>,
    {
        fn new(route: R) -> Self {
            Self {
                route,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl<R> FetchPage for FakeSite<R>
    where
        R: Fn(&str) -> Result<String, FetchError>,
    {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            (self.route)(url)
        }
    }

    fn listing(items: &[(u32, &str)]) -> String {
        let lis: String = items
            .iter()
            .map(|(id, title)| {
                format!(
                    r#"<li class="row feed__item"><h3><a href="/news/story-{id}/{id}/">{title}</a></h3>
                       <p class="feed__description">Deck for story {id} goes here.</p></li>"#
                )
            })
            .collect();
        format!("<html><body><ul>{lis}</ul></body></html>")
    }

    fn article_url(id: u32) -> String {
        format!("https://www.bankingdive.com/news/story-{id}/{id}/")
    }

    fn page_of(url: &str) -> Option<usize> {
        url.split("?page=").nth(1).and_then(|p| p.parse().ok())
    }

    fn article_html(id: u32) -> String {
        format!(
            r#"<html><body><div class="article-body"><p>Full body of story {id}.</p></div>
               <time datetime="2025-10-0{}">Oct</time></body></html>"#,
            (id % 9) + 1
        )
    }

    fn config(target: usize, fraud_only: bool) -> CollectorConfig {
        CollectorConfig {
            base_url: Url::parse(NEWS_URL).unwrap(),
            target,
            fraud_only,
            max_empty_pages: DEFAULT_MAX_EMPTY_PAGES,
        }
    }

    fn fraud_titles() -> Vec<(u32, &'static str)> {
        vec![
            (1, "Wire fraud ring busted"),
            (2, "Check fraud climbs again"),
            (3, "Phishing wave hits credit unions"),
        ]
    }

    #[tokio::test]
    async fn test_terminates_when_source_repeats() {
        let items = fraud_titles();
        let site = FakeSite::new(move |url: &str| match page_of(url) {
            Some(_) => Ok(listing(&items)),
            None => Ok(article_html(1)),
        });
        let taxonomy = FraudTaxonomy::default();
        let (articles, stats) = Collector::new(&site, &taxonomy, config(5, true)).run().await;

        assert_eq!(articles.len(), 3);
        // Page 1 yields three, then three empty pages in a row end the run.
        assert_eq!(stats.pages_fetched, 4);
        assert_eq!(stats.duplicates, 9);
        let listing_requests = site.requests().iter().filter(|u| page_of(u).is_some()).count();
        assert_eq!(listing_requests, 4);
    }

    #[tokio::test]
    async fn test_no_duplicate_identities_and_discovery_order() {
        let site = FakeSite::new(|url: &str| match page_of(url) {
            Some(1) => Ok(listing(&[(1, "Wire fraud case"), (2, "Scam alert issued")])),
            Some(2) => Ok(listing(&[(2, "Scam alert issued"), (3, "Embezzlement charges filed")])),
            Some(3) => Ok(listing(&[(3, "Embezzlement charges filed"), (4, "Ransomware strikes lender")])),
            Some(_) => Ok(listing(&[])),
            None => Ok(article_html(2)),
        });
        let taxonomy = FraudTaxonomy::default();
        let (articles, _) = Collector::new(&site, &taxonomy, config(10, true)).run().await;

        let urls: Vec<String> = articles.iter().map(|a| a.url.clone()).collect();
        assert_eq!(
            urls,
            vec![article_url(1), article_url(2), article_url(3), article_url(4)]
        );
        let unique: HashSet<&String> = urls.iter().collect();
        assert_eq!(unique.len(), urls.len());
    }

    #[tokio::test]
    async fn test_fraud_only_prefilter_skips_fetches() {
        let site = FakeSite::new(|url: &str| match page_of(url) {
            Some(1) => Ok(listing(&[
                (1, "Fed holds rates steady"),
                (2, "Money laundering probe widens"),
                (3, "Deposit growth slows"),
            ])),
            Some(_) => Ok(listing(&[])),
            None => Ok(article_html(2)),
        });
        let taxonomy = FraudTaxonomy::default();
        let (articles, stats) = Collector::new(&site, &taxonomy, config(10, true)).run().await;

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].url, article_url(2));
        assert_eq!(articles[0].matched_keywords, vec!["money laundering"]);
        assert_eq!(stats.filtered_out, 2);
        assert!(!site.requests().contains(&article_url(1)));
        assert!(!site.requests().contains(&article_url(3)));
    }

    #[tokio::test]
    async fn test_all_mode_accepts_everything() {
        let site = FakeSite::new(|url: &str| match page_of(url) {
            Some(1) => Ok(listing(&[(1, "Fed holds rates steady"), (2, "Deposit growth slows")])),
            Some(_) => Ok(listing(&[])),
            None => Ok(article_html(1)),
        });
        let taxonomy = FraudTaxonomy::default();
        let (articles, _) = Collector::new(&site, &taxonomy, config(10, false)).run().await;
        assert_eq!(articles.len(), 2);
        assert!(articles.iter().all(|a| a.matched_keywords.is_empty()));
    }

    #[tokio::test]
    async fn test_stops_at_target_without_extra_fetches() {
        let site = FakeSite::new(|url: &str| match page_of(url) {
            Some(1) => Ok(listing(&[(1, "Wire fraud"), (2, "Check fraud"), (3, "Card fraud")])),
            Some(_) => panic!("should not paginate past the first page"),
            None => Ok(article_html(3)),
        });
        let taxonomy = FraudTaxonomy::default();
        let (articles, _) = Collector::new(&site, &taxonomy, config(2, true)).run().await;
        assert_eq!(articles.len(), 2);
        assert!(!site.requests().contains(&article_url(3)));
    }

    #[tokio::test]
    async fn test_body_failure_keeps_stub() {
        let failing = article_url(2);
        let site = FakeSite::new(move |url: &str| match page_of(url) {
            Some(1) => Ok(listing(&[(1, "Wire fraud"), (2, "Check fraud")])),
            Some(_) => Ok(listing(&[])),
            None if url == failing => Err(FetchError::Status(503)),
            None => Ok(article_html(4)),
        });
        let taxonomy = FraudTaxonomy::default();
        let (articles, stats) = Collector::new(&site, &taxonomy, config(10, true)).run().await;

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].body_text.as_deref(), Some("Full body of story 4."));
        assert!(articles[0].publish_date.is_some());
        assert_eq!(articles[1].body_text, None);
        assert_eq!(articles[1].title, "Check fraud");
        assert_eq!(stats.body_failures, 1);
    }

    #[tokio::test]
    async fn test_permanent_listing_failure_ends_pagination() {
        let site = FakeSite::new(|url: &str| match page_of(url) {
            Some(1) => Ok(listing(&[(1, "Wire fraud")])),
            Some(_) => Err(FetchError::Status(404)),
            None => Ok(article_html(1)),
        });
        let taxonomy = FraudTaxonomy::default();
        let (articles, stats) = Collector::new(&site, &taxonomy, config(10, true)).run().await;
        assert_eq!(articles.len(), 1);
        assert_eq!(stats.listing_failures, 1);
    }

    #[tokio::test]
    async fn test_transient_listing_failure_counts_as_empty_page() {
        let site = FakeSite::new(|url: &str| match page_of(url) {
            Some(1) => Err(FetchError::Timeout),
            Some(2) => Ok(listing(&[(7, "Identity theft spree")])),
            Some(_) => Err(FetchError::Timeout),
            None => Ok(article_html(7)),
        });
        let taxonomy = FraudTaxonomy::default();
        let (articles, stats) = Collector::new(&site, &taxonomy, config(10, true)).run().await;
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].url, article_url(7));
        // One failure before the hit, then the empty-page bound after it.
        assert_eq!(stats.listing_failures, 1 + DEFAULT_MAX_EMPTY_PAGES);
    }

    #[tokio::test]
    async fn test_stream_yields_in_order() {
        let site = FakeSite::new(|url: &str| match page_of(url) {
            Some(1) => Ok(listing(&[(1, "Wire fraud"), (2, "Check fraud")])),
            Some(_) => Ok(listing(&[])),
            None => Ok(article_html(1)),
        });
        let taxonomy = FraudTaxonomy::default();
        let mut collector = Collector::new(&site, &taxonomy, config(10, true));
        let urls: Vec<String> = collector.articles().map(|a| a.url).collect().await;
        assert_eq!(urls, vec![article_url(1), article_url(2)]);
    }

    #[tokio::test]
    async fn test_sequence_ends_after_target() {
        let site = FakeSite::new(|url: &str| match page_of(url) {
            Some(_) => Ok(listing(&[(1, "Wire fraud")])),
            None => Ok(article_html(1)),
        });
        let taxonomy = FraudTaxonomy::default();
        let mut collector = Collector::new(&site, &taxonomy, config(1, true));
        assert!(collector.next_article().await.is_some());
        assert!(collector.next_article().await.is_none());
        assert_eq!(site.requests().len(), 2);
    }
}
