use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::{form_urlencoded, Url};

use super::ProductFetcher;
use crate::database_ops::models::Product;
use crate::normalization::SearchTerm;
use crate::util::env as env_util;

/// One storefront to scrape. `search_url` carries a `{query}` placeholder;
/// the selector fields are CSS selectors, all but `item` relative to a listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeSource {
    pub name: String,
    pub search_url: String,
    pub item: String,
    pub title: String,
    pub price: String,
    pub link: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl ScrapeSource {
    fn search_url_for(&self, term: &SearchTerm) -> Result<Url> {
        let raw = self.search_url.replace("{query}", &query_component(term));
        Url::parse(&raw).with_context(|| format!("invalid search url for {}", self.name))
    }

    fn validate(&self) -> Result<()> {
        if !self.search_url.contains("{query}") {
            return Err(anyhow!("{}: search_url has no {{query}} placeholder", self.name));
        }
        let mut selectors = vec![&self.item, &self.title, &self.price, &self.link];
        if let Some(image) = &self.image {
            selectors.push(image);
        }
        for sel in selectors {
            selector(sel).with_context(|| format!("source {}", self.name))?;
        }
        Ok(())
    }
}

/// Percent-encodes the escaped key for use inside a query string. The `%20`
/// separators produced by normalization pass through unchanged.
fn query_component(term: &SearchTerm) -> String {
    term.as_str()
        .split("%20")
        .map(|part| form_urlencoded::byte_serialize(part.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join("%20")
}

/// Scrapes every configured source concurrently and merges the listings.
pub struct HttpScraper {
    client: Client,
    sources: Vec<ScrapeSource>,
}

impl HttpScraper {
    pub fn new(sources: Vec<ScrapeSource>, timeout: Duration, user_agent: &str) -> Result<Self> {
        for source in &sources {
            source.validate()?;
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("failed to build scrape client")?;
        Ok(Self { client, sources })
    }

    /// Env: SCRAPE_SOURCES_PATH (JSON array of sources), SCRAPE_TIMEOUT_SECS
    /// (default 20), SCRAPE_USER_AGENT.
    pub fn from_env() -> Result<Self> {
        let sources = match env_util::env_opt("SCRAPE_SOURCES_PATH") {
            Some(path) => load_sources(Path::new(&path))?,
            None => {
                warn!("SCRAPE_SOURCES_PATH not set; scrape fallback will return no products");
                Vec::new()
            }
        };
        let timeout = Duration::from_secs(env_util::env_parse("SCRAPE_TIMEOUT_SECS", 20u64));
        let user_agent = env_util::env_opt("SCRAPE_USER_AGENT").unwrap_or_else(|| {
            format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        });
        info!(sources = sources.len(), ?timeout, "scraper configured");
        Self::new(sources, timeout, &user_agent)
    }

    async fn fetch_source(&self, source: &ScrapeSource, term: &SearchTerm) -> Result<Vec<Product>> {
        let url = source.search_url_for(term)?;
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("request to {} failed", source.name))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("{} responded with {}", source.name, status));
        }
        let body = resp.text().await?;
        extract_listings(source, &url, &body)
    }
}

#[async_trait]
impl ProductFetcher for HttpScraper {
    async fn fetch(&self, term: &SearchTerm) -> Result<Vec<Product>> {
        if self.sources.is_empty() {
            return Ok(Vec::new());
        }

        let results = join_all(
            self.sources
                .iter()
                .map(|source| async move { (source, self.fetch_source(source, term).await) }),
        )
        .await;

        let mut products = Vec::new();
        let mut failures = 0usize;
        for (source, res) in results {
            match res {
                Ok(found) => {
                    debug!(source = %source.name, count = found.len(), "scraped listings");
                    products.extend(found);
                }
                Err(e) => {
                    failures += 1;
                    warn!(source = %source.name, error = %e, "scrape source failed");
                }
            }
        }

        if failures == self.sources.len() {
            return Err(anyhow!("all {} scrape sources failed", failures));
        }
        info!(term = %term, count = products.len(), failures, "scrape finished");
        Ok(products)
    }
}

pub fn load_sources(path: &Path) -> Result<Vec<ScrapeSource>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scrape sources from {}", path.display()))?;
    serde_json::from_str(&raw).context("invalid scrape sources file")
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css:?}: {e}"))
}

/// Pull listings out of a search results page. Listings missing a title,
/// a parseable price or a link are skipped.
pub fn extract_listings(source: &ScrapeSource, page_url: &Url, html: &str) -> Result<Vec<Product>> {
    let item_sel = selector(&source.item)?;
    let title_sel = selector(&source.title)?;
    let price_sel = selector(&source.price)?;
    let link_sel = selector(&source.link)?;
    let image_sel = source.image.as_deref().map(selector).transpose()?;

    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    for item in doc.select(&item_sel) {
        let Some(name) = first_text(&item, &title_sel) else {
            continue;
        };
        let Some(price) = first_text(&item, &price_sel).and_then(|t| parse_price(&t)) else {
            continue;
        };
        let Some(url) = item
            .select(&link_sel)
            .next()
            .and_then(|el| el.value().attr("href"))
            .and_then(|href| resolve_url(page_url, href))
        else {
            continue;
        };
        let image_url = image_sel.as_ref().and_then(|sel| {
            item.select(sel)
                .next()
                .and_then(|el| el.value().attr("src").or_else(|| el.value().attr("data-src")))
                .and_then(|src| resolve_url(page_url, src))
        });

        out.push(Product {
            name,
            price,
            currency: source.currency.clone(),
            url,
            image_url,
            source: source.name.clone(),
        });
    }
    Ok(out)
}

fn first_text(item: &ElementRef<'_>, sel: &Selector) -> Option<String> {
    let el = item.select(sel).next()?;
    let text = el.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}

fn price_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d.,]*").expect("price regex"))
}

/// Parse the first numeric run of a price label. The right-most of `.`/`,`
/// is the decimal separator when both appear; a lone `,` is decimal only
/// when followed by exactly two digits.
pub fn parse_price(text: &str) -> Option<f64> {
    let run = price_regex().find(text)?.as_str();
    let run = run.trim_end_matches(['.', ',']);

    let normalized = match (run.rfind('.'), run.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => run.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => run.replace(',', ""),
        (None, Some(comma)) => {
            if run.len() - comma - 1 == 2 && run.matches(',').count() == 1 {
                run.replace(',', ".")
            } else {
                run.replace(',', "")
            }
        }
        (Some(_), None) if run.matches('.').count() > 1 => run.replace('.', ""),
        _ => run.to_string(),
    };
    normalized.parse::<f64>().ok()
}
