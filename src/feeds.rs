//! Feed discovery and download.
//!
//! Plain-text EDL feeds are listed on an HTML index page. The IPv4 links are
//! collected in page order and fetched concurrently; results come back in
//! the same order so the merged dataset keeps a stable match precedence.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::Url;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Index page listing the public EDL feeds.
pub const DEFAULT_FEED_INDEX: &str = "https://saasedl.paloaltonetworks.com/feeds.html";

/// Default number of concurrent downloads.
pub const DEFAULT_THREADS: usize = 50;

static HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<a\s[^>]*?href\s*=\s*["']([^"']+)["']"#).unwrap());

/// Extract IPv4 feed links from an index page.
///
/// Relative links are resolved against `base`. Links are returned in page
/// order with duplicates removed.
pub fn feed_links(html: &str, base: &Url) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();

    for caps in HREF.captures_iter(html) {
        let href = caps[1].trim();
        if !href.contains("ipv4") {
            continue;
        }
        let url = match base.join(href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                log::warn!("Ignoring feed link {}: {}", href, e);
                continue;
            }
        };
        if !links.contains(&url) {
            links.push(url);
        }
    }

    links
}

/// Blocking feed downloader.
pub struct FeedClient {
    client: Client,
    threads: usize,
}

impl FeedClient {
    /// Client with a per-request timeout and at most `threads` downloads in
    /// flight.
    pub fn new(timeout: Duration, threads: usize) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            threads: threads.max(1),
        })
    }

    /// Fetch `index` and list the feeds it links to.
    pub fn discover(&self, index: &str) -> Result<Vec<String>> {
        let base = Url::parse(index)
            .map_err(|e| Error::Config(format!("invalid feed index URL {}: {}", index, e)))?;
        let html = self.fetch(index)?;
        let links = feed_links(&html, &base);
        log::info!("Discovered {} feeds on {}", links.len(), index);
        Ok(links)
    }

    /// Download one feed body.
    pub fn fetch(&self, url: &str) -> Result<String> {
        let body = self.client.get(url).send()?.error_for_status()?.text()?;
        Ok(body)
    }

    /// Download every feed, returning results in the order of `urls`.
    pub fn fetch_all(&self, urls: &[String]) -> Vec<Result<String>> {
        let next = AtomicUsize::new(0);
        let slots: Vec<Mutex<Option<Result<String>>>> =
            urls.iter().map(|_| Mutex::new(None)).collect();
        let workers = self.threads.min(urls.len());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(url) = urls.get(i) else {
                        break;
                    };
                    log::debug!("Downloading {}", url);
                    let result = self.fetch(url);
                    if let Ok(mut slot) = slots[i].lock() {
                        *slot = Some(result);
                    }
                });
            }
        });

        slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| {
                slot.into_inner().ok().flatten().unwrap_or_else(|| {
                    Err(Error::Config(format!("download of {} did not complete", url)))
                })
            })
            .collect()
    }
}
