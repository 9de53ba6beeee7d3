// search.rs - DuckDuckGo web search collaborator
//
// Scrapes the HTML endpoint for (title, link) pairs. Result links on that
// page are DuckDuckGo redirects; the real target is unwrapped from `uddg`.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::error::{BotError, BotResult};

pub const DEFAULT_MAX_RESULTS: usize = 3;

/// Represents a single search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
}

impl SearchResult {
    pub fn new(title: &str, link: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            link: link.trim().to_string(),
        }
    }
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Empty vec when nothing was found
    async fn search(&self, query: &str, max_results: usize) -> BotResult<Vec<SearchResult>>;
}

pub struct DuckDuckGoSearch {
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new() -> BotResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36")
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> BotResult<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        log::info!("[SEARCH] DuckDuckGo search for '{}'", query);
        let search_url = format!(
            "https://html.duckduckgo.com/html/?q={}",
            urlencoding::encode(query)
        );

        let response = self.client.get(&search_url).send().await?;
        if !response.status().is_success() {
            return Err(BotError::ExternalService(format!(
                "search request failed with status: {}",
                response.status()
            )));
        }

        let html_content = response.text().await?;
        let results = parse_results(&html_content, max_results)?;
        log::info!("[SEARCH] Found {} results", results.len());
        Ok(results)
    }
}

/// Extract up to `max_results` results from a DuckDuckGo HTML page.
pub fn parse_results(html: &str, max_results: usize) -> BotResult<Vec<SearchResult>> {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("a.result__a")
        .map_err(|e| BotError::ExternalService(format!("Failed to parse title selector: {:?}", e)))?;

    let results = document
        .select(&title_selector)
        .filter_map(|anchor| {
            let title = anchor.text().collect::<Vec<_>>().join(" ");
            let link = resolve_link(anchor.value().attr("href")?);
            let result = SearchResult::new(&title, &link);
            (!result.title.is_empty() && !result.link.is_empty()).then_some(result)
        })
        .take(max_results)
        .collect();
    Ok(results)
}

fn resolve_link(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href.to_string()
    };

    // Redirect links carry the target in the uddg query parameter
    absolute
        .split_once("uddg=")
        .map(|(_, rest)| rest.split('&').next().unwrap_or(rest))
        .and_then(|encoded| urlencoding::decode(encoded).ok())
        .map(|decoded| decoded.into_owned())
        .unwrap_or(absolute)
}

/// Bulleted reply for the SEARCH intent
pub fn format_search_results(results: &[SearchResult]) -> String {
    let summary = if results.is_empty() {
        "No results found.".to_string()
    } else {
        results
            .iter()
            .map(|r| format!("- {} ({})", r.title, r.link))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!("🔍 Search results:\n{}", summary)
}
