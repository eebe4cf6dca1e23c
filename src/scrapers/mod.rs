//! News source scrapers.
//!
//! Each scraper turns raw HTML into pipeline types in two phases:
//!
//! 1. **Listing**: parse a paginated listing page into [`ArticleStub`]s
//! 2. **Article**: parse a single article page into body text and metadata
//!
//! Scrapers never touch the network; the collector feeds them HTML obtained
//! through a [`crate::fetcher::FetchPage`] implementation.
//!
//! # Supported Sources
//!
//! | Source | Module | Listing URL |
//! |--------|--------|-------------|
//! | Banking Dive | [`bankingdive`] | `https://www.bankingdive.com/news/?page=N` |
//!
//! [`ArticleStub`]: crate::models::ArticleStub

pub mod bankingdive;
