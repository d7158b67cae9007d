//! arXiv research source implementation.

use async_trait::async_trait;
use feed_rs::parser;

use crate::models::{Paper, SearchQuery, SourceType};
use crate::sources::{normalize, RawRecord, Source, SourceError};
use crate::utils::{arxiv_retry_config, with_retry, HttpClient, RetryConfig};

/// Base URL for arXiv API
const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

/// Longest query text sent to arXiv
const MAX_QUERY_CHARS: usize = 300;

/// The abstract is the start of the entry summary, cut at this many characters
const ABSTRACT_CHARS: usize = 500;

/// arXiv research source
///
/// Makes a single attempt by default. Network errors, bad statuses, an
/// unparseable feed and an empty feed all count as failure.
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: HttpClient,
    api_url: String,
    retry: RetryConfig,
}

impl ArxivSource {
    /// Create a new arXiv source
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(HttpClient::new()?))
    }

    /// Create with a shared HTTP client
    pub fn with_client(client: HttpClient) -> Self {
        Self {
            client,
            api_url: ARXIV_API_URL.to_string(),
            retry: arxiv_retry_config(),
        }
    }

    /// Use `{root}/api/query` as the endpoint
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_url = format!("{}/api/query", base_url.into().trim_end_matches('/'));
        self
    }

    /// Override the retry policy; raising `max_attempts` enables backoff
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Build search query for arXiv API
    fn build_search_query(query: &SearchQuery) -> String {
        let text: String = query.text().chars().take(MAX_QUERY_CHARS).collect();
        format!("all:{}", text)
    }

    fn build_search_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}?search_query={}&start=0&max_results={}&sortBy=relevance&sortOrder=descending",
            self.api_url,
            urlencoding::encode(&Self::build_search_query(query)),
            query.limit()
        )
    }

    /// Parse an Atom feed body into papers
    fn parse_feed(body: &[u8]) -> Result<Vec<Paper>, SourceError> {
        let feed = parser::parse(body)
            .map_err(|e| SourceError::Parse(format!("Failed to parse Atom feed: {}", e)))?;

        Ok(feed
            .entries
            .iter()
            .map(|entry| normalize(Self::entry_record(entry)))
            .collect())
    }

    /// Pull title, abstract and URL out of a feed entry
    fn entry_record(entry: &feed_rs::model::Entry) -> RawRecord {
        // Titles arrive hard-wrapped
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.split_whitespace().collect::<Vec<_>>().join(" "));

        let abstract_text = entry
            .summary
            .as_ref()
            .map(|s| s.content.trim().chars().take(ABSTRACT_CHARS).collect::<String>());

        // feed-rs invents an id when the entry has none
        let url = if entry.id.starts_with("http") {
            Some(entry.id.clone())
        } else {
            entry
                .links
                .iter()
                .find(|l| l.rel.as_deref() == Some("alternate"))
                .or_else(|| entry.links.first())
                .map(|l| l.href.clone())
        };

        RawRecord::new()
            .title(title)
            .abstract_text(abstract_text)
            .url(url)
    }
}

#[async_trait]
impl Source for ArxivSource {
    fn source_type(&self) -> SourceType {
        SourceType::Arxiv
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        let url = self.build_search_url(query);

        let body = with_retry("arXiv search", self.retry, || {
            let request = self
                .client
                .get(&url)
                .header("Accept", "application/atom+xml");
            async move {
                let response = request.send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(SourceError::RateLimit);
                }
                if !status.is_success() {
                    return Err(SourceError::Status(status.as_u16()));
                }

                Ok(response.bytes().await?)
            }
        })
        .await?;

        let papers = Self::parse_feed(body.as_ref())?;
        if papers.is_empty() {
            return Err(SourceError::NotFound(format!(
                "arXiv returned no entries for '{}'",
                query.text()
            )));
        }

        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NO_ABSTRACT, NO_URL};
    use mockito::Matcher;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>arXiv Query Results</title>
  <id>http://arxiv.org/api/query</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <id>http://arxiv.org/abs/2301.12345v1</id>
    <updated>2023-01-15T10:00:00Z</updated>
    <published>2023-01-15T10:00:00Z</published>
    <title>Microbial Signals and
      Mood Regulation</title>
    <summary>  A short abstract.
    </summary>
    <author><name>Test Author</name></author>
    <link rel="alternate" type="text/html" href="http://arxiv.org/abs/2301.12345v1"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2302.00001v2</id>
    <updated>2023-02-01T10:00:00Z</updated>
    <title>Untitled summary</title>
  </entry>
</feed>"#;

    const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>arXiv Query Results</title>
  <id>http://arxiv.org/api/query</id>
  <updated>2024-01-01T00:00:00Z</updated>
</feed>"#;

    fn source_for(server: &mockito::ServerGuard) -> ArxivSource {
        ArxivSource::with_client(HttpClient::new().unwrap()).base_url(server.url())
    }

    #[test]
    fn test_build_search_query_truncates() {
        let long = "x".repeat(400);
        let query = SearchQuery::new(long, 5).unwrap();
        let search = ArxivSource::build_search_query(&query);

        assert_eq!(search.len(), "all:".len() + 300);
    }

    #[test]
    fn test_build_search_url() {
        let source = ArxivSource::with_client(HttpClient::new().unwrap());
        let query = SearchQuery::new("neural networks", 2).unwrap();
        let url = source.build_search_url(&query);

        assert!(url.starts_with(ARXIV_API_URL));
        assert!(url.contains("search_query=all%3Aneural%20networks"));
        assert!(url.contains("max_results=2"));
    }

    #[test]
    fn test_parse_feed() {
        let papers = ArxivSource::parse_feed(FEED.as_bytes()).unwrap();
        assert_eq!(papers.len(), 2);

        assert_eq!(papers[0].title, "Microbial Signals and Mood Regulation");
        assert_eq!(papers[0].r#abstract, "A short abstract.");
        assert_eq!(papers[0].url, "http://arxiv.org/abs/2301.12345v1");

        assert_eq!(papers[1].r#abstract, NO_ABSTRACT);
        assert_eq!(papers[1].url, "http://arxiv.org/abs/2302.00001v2");
        assert_ne!(papers[1].url, NO_URL);
    }

    #[test]
    fn test_abstract_is_cut_to_500_chars() {
        let summary = "é".repeat(600);
        let feed = FEED.replace("  A short abstract.\n    ", &summary);

        let papers = ArxivSource::parse_feed(feed.as_bytes()).unwrap();
        assert_eq!(papers[0].r#abstract.chars().count(), 500);
    }

    #[tokio::test]
    async fn test_search_returns_entries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search_query".into(), "all:gut microbiome".into()),
                Matcher::UrlEncoded("max_results".into(), "5".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/atom+xml")
            .with_body(FEED)
            .create_async()
            .await;

        let source = source_for(&server);
        let query = SearchQuery::new("gut microbiome", 5).unwrap();
        let result = source.fetch(&query).await;

        assert!(result.is_ok());
        assert_eq!(result.papers().len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_feed_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(EMPTY_FEED)
            .create_async()
            .await;

        let source = source_for(&server);
        let query = SearchQuery::new("nothing", 5).unwrap();
        let result = source.fetch(&query).await;

        assert!(!result.is_ok());
        assert!(result.papers().is_empty());
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let source = source_for(&server);
        let query = SearchQuery::new("anything", 5).unwrap();
        let result = source.fetch(&query).await;

        assert!(!result.is_ok());
        mock.assert_async().await;
    }
}
