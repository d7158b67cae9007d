//! PubMed research source implementation using E-utilities API.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;

use crate::models::{Paper, SearchQuery, SourceType};
use crate::sources::{normalize, RawRecord, Source, SourceError};
use crate::utils::{pubmed_retry_config, with_retry, HttpClient, RetryConfig};

/// PubMed E-utilities API base URLs
const PUBMED_ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const PUBMED_EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";
const PUBMED_ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// PubMed research source
///
/// Two phases: an esearch call returns PMIDs as JSON, then one efetch call
/// returns the articles as XML. Each phase retries independently on any
/// transport error or unsuccessful status. No ids means no results, and the
/// fetch phase is skipped.
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: HttpClient,
    search_url: String,
    fetch_url: String,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl PubMedSource {
    /// Create a new PubMed source
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(HttpClient::new()?))
    }

    /// Create with a shared HTTP client
    pub fn with_client(client: HttpClient) -> Self {
        Self {
            client,
            search_url: PUBMED_ESEARCH_URL.to_string(),
            fetch_url: PUBMED_EFETCH_URL.to_string(),
            api_key: std::env::var("NCBI_API_KEY").ok(),
            retry: pubmed_retry_config(),
        }
    }

    /// Use endpoints under a different root, e.g. `{root}/esearch.fcgi`
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        let base = base.trim_end_matches('/');
        self.search_url = format!("{}/esearch.fcgi", base);
        self.fetch_url = format!("{}/efetch.fcgi", base);
        self
    }

    /// Set the NCBI API key (optional, raises the request quota)
    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Override the retry policy applied to each phase
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Build E-utilities search URL
    fn build_search_url(&self, query: &SearchQuery) -> String {
        let mut url = format!(
            "{}?db=pubmed&term={}&retmode=json&retmax={}",
            self.search_url,
            urlencoding::encode(query.text()),
            query.limit()
        );
        self.push_api_key(&mut url);
        url
    }

    /// Build E-utilities fetch URL for specific PubMed IDs
    fn build_fetch_url(&self, ids: &[String]) -> String {
        let mut url = format!(
            "{}?db=pubmed&id={}&retmode=xml",
            self.fetch_url,
            urlencoding::encode(&ids.join(","))
        );
        self.push_api_key(&mut url);
        url
    }

    fn push_api_key(&self, url: &mut String) {
        if let Some(key) = &self.api_key {
            url.push_str("&api_key=");
            url.push_str(&urlencoding::encode(key));
        }
    }

    /// Parse the esearch JSON body into PMIDs
    fn parse_search_response(body: &str) -> Result<Vec<String>, SourceError> {
        #[derive(Debug, Deserialize)]
        struct ESearchResponse {
            #[serde(default)]
            esearchresult: Option<ESearchResult>,
        }

        #[derive(Debug, Deserialize)]
        struct ESearchResult {
            #[serde(default)]
            idlist: Vec<String>,
        }

        let response: ESearchResponse = serde_json::from_str(body)
            .map_err(|e| SourceError::Decode(format!("esearch JSON: {}", e)))?;
        Ok(response
            .esearchresult
            .map(|r| r.idlist)
            .unwrap_or_default())
    }

    /// Parse the efetch XML body into papers
    ///
    /// For each `PubmedArticle` the first `PMID`, `ArticleTitle` and
    /// `AbstractText` are taken, including text inside inline markup.
    fn parse_fetch_response(xml: &str) -> Result<Vec<Paper>, SourceError> {
        let mut reader = Reader::from_str(xml);

        let mut papers = Vec::new();
        let mut article: Option<ArticleFields> = None;
        // Field being captured with its text so far; depth counts elements nested inside it
        let mut capture: Option<(Field, String)> = None;
        let mut depth = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    if capture.is_some() {
                        depth += 1;
                        continue;
                    }
                    match e.name().as_ref() {
                        b"PubmedArticle" => article = Some(ArticleFields::default()),
                        name => {
                            if let (Some(fields), Some(field)) = (&article, Field::from_tag(name)) {
                                if !fields.has(field) {
                                    capture = Some((field, String::new()));
                                    depth = 0;
                                }
                            }
                        }
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some((_, text)) = capture.as_mut() {
                        let unescaped = e.unescape().map_err(|err| {
                            SourceError::Parse(format!("PubMed XML text: {}", err))
                        })?;
                        text.push_str(&unescaped);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some((_, text)) = capture.as_mut() {
                        text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Ok(Event::End(e)) => {
                    if capture.is_some() {
                        if depth > 0 {
                            depth -= 1;
                        } else if let Some((field, text)) = capture.take() {
                            if let Some(fields) = article.as_mut() {
                                fields.set(field, text);
                            }
                        }
                    } else if e.name().as_ref() == b"PubmedArticle" {
                        if let Some(fields) = article.take() {
                            papers.push(normalize(fields.into_record()));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(SourceError::Parse(format!(
                        "PubMed XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
            }
        }

        Ok(papers)
    }

    /// GET `url` and parse the body, all inside one retried attempt
    async fn get_parsed<T, P>(&self, label: &str, url: &str, parse: P) -> Result<T, SourceError>
    where
        P: Fn(&str) -> Result<T, SourceError>,
    {
        let parse = &parse;
        with_retry(label, self.retry, || {
            let request = self.client.get(url);
            async move {
                let response = request.send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(SourceError::RateLimit);
                }
                if !status.is_success() {
                    return Err(SourceError::Status(status.as_u16()));
                }

                let body = response.text().await?;
                parse(&body)
            }
        })
        .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Pmid,
    Title,
    Abstract,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"PMID" => Some(Field::Pmid),
            b"ArticleTitle" => Some(Field::Title),
            b"AbstractText" => Some(Field::Abstract),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct ArticleFields {
    pmid: Option<String>,
    title: Option<String>,
    abstract_text: Option<String>,
}

impl ArticleFields {
    fn has(&self, field: Field) -> bool {
        match field {
            Field::Pmid => self.pmid.is_some(),
            Field::Title => self.title.is_some(),
            Field::Abstract => self.abstract_text.is_some(),
        }
    }

    fn set(&mut self, field: Field, text: String) {
        let text = text.trim().to_string();
        match field {
            Field::Pmid => self.pmid = Some(text),
            Field::Title => self.title = Some(text),
            Field::Abstract => self.abstract_text = Some(text),
        }
    }

    fn into_record(self) -> RawRecord {
        let url = self
            .pmid
            .filter(|id| !id.is_empty())
            .map(|id| format!("{}/{}/", PUBMED_ARTICLE_URL, id));

        RawRecord::new()
            .title(self.title)
            .abstract_text(self.abstract_text)
            .url(url)
    }
}

#[async_trait]
impl Source for PubMedSource {
    fn source_type(&self) -> SourceType {
        SourceType::PubMed
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        let search_url = self.build_search_url(query);
        let ids = self
            .get_parsed("PubMed search", &search_url, Self::parse_search_response)
            .await?;

        if ids.is_empty() {
            tracing::debug!("No PubMed articles found for '{}'", query.text());
            return Ok(Vec::new());
        }

        let fetch_url = self.build_fetch_url(&ids);
        self.get_parsed("PubMed fetch", &fetch_url, Self::parse_fetch_response)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NO_ABSTRACT, NO_TITLE, NO_URL};
    use mockito::Matcher;
    use std::time::Duration;

    const FETCH_XML: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">38000001</PMID>
      <Article PubModel="Print">
        <ArticleTitle>Gut microbiota in <i>major</i> depressive disorder.</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">Depression &amp; the gut.</AbstractText>
          <AbstractText Label="METHODS">Second section.</AbstractText>
        </Abstract>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ReferenceList>
        <Reference><ArticleIdList><ArticleId IdType="pubmed">11111111</ArticleId></ArticleIdList></Reference>
      </ReferenceList>
    </PubmedData>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">38000002</PMID>
      <Article>
        <ArticleTitle>No abstract here</ArticleTitle>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <Article><AbstractText/></Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    fn source_for(server: &mockito::ServerGuard) -> PubMedSource {
        PubMedSource::with_client(HttpClient::new().unwrap())
            .base_url(server.url())
            .api_key(None)
            .retry_config(
                pubmed_retry_config()
                    .initial_delay(Duration::from_millis(5))
                    .attempt_timeout(Duration::from_secs(5)),
            )
    }

    #[test]
    fn test_build_search_url() {
        let source = PubMedSource::with_client(HttpClient::new().unwrap()).api_key(None);
        let query = SearchQuery::new("machine learning", 10).unwrap();
        let url = source.build_search_url(&query);

        assert!(url.starts_with(PUBMED_ESEARCH_URL));
        assert!(url.contains("db=pubmed"));
        assert!(url.contains("term=machine%20learning"));
        assert!(url.contains("retmax=10"));
        assert!(url.contains("retmode=json"));
        assert!(!url.contains("api_key"));
    }

    #[test]
    fn test_build_fetch_url_with_key() {
        let source =
            PubMedSource::with_client(HttpClient::new().unwrap()).api_key(Some("k".to_string()));
        let url = source.build_fetch_url(&["1".to_string(), "2".to_string()]);

        assert!(url.contains("id=1%2C2"));
        assert!(url.contains("retmode=xml"));
        assert!(url.ends_with("&api_key=k"));
    }

    #[test]
    fn test_parse_search_response() {
        let body = r#"{"header": {}, "esearchresult": {"count": "2", "idlist": ["1", "2"]}}"#;
        assert_eq!(
            PubMedSource::parse_search_response(body).unwrap(),
            vec!["1".to_string(), "2".to_string()]
        );

        assert!(PubMedSource::parse_search_response("{}").unwrap().is_empty());
        assert!(matches!(
            PubMedSource::parse_search_response("not json"),
            Err(SourceError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_fetch_response() {
        let papers = PubMedSource::parse_fetch_response(FETCH_XML).unwrap();
        assert_eq!(papers.len(), 3);

        assert_eq!(papers[0].title, "Gut microbiota in major depressive disorder.");
        assert_eq!(papers[0].r#abstract, "Depression & the gut.");
        assert_eq!(papers[0].url, "https://pubmed.ncbi.nlm.nih.gov/38000001/");

        assert_eq!(papers[1].title, "No abstract here");
        assert_eq!(papers[1].r#abstract, NO_ABSTRACT);

        assert_eq!(papers[2], Paper::new(NO_TITLE, NO_ABSTRACT, NO_URL));
    }

    #[test]
    fn test_parse_fetch_rejects_broken_xml() {
        let result = PubMedSource::parse_fetch_response("<PubmedArticleSet><PubmedArticle></Oops>");
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[tokio::test]
    async fn test_zero_ids_skips_fetch() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::UrlEncoded("term".into(), "nothing here".into()))
            .with_status(200)
            .with_body(r#"{"esearchresult": {"count": "0", "idlist": []}}"#)
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let source = source_for(&server);
        let query = SearchQuery::new("nothing here", 5).unwrap();
        let result = source.fetch(&query).await;

        assert!(result.is_ok());
        assert!(result.papers().is_empty());
        search.assert_async().await;
        fetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_and_fetch() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"esearchresult": {"idlist": ["38000001", "38000002"]}}"#)
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::UrlEncoded("id".into(), "38000001,38000002".into()))
            .with_status(200)
            .with_body(FETCH_XML)
            .create_async()
            .await;

        let source = source_for(&server);
        let query = SearchQuery::new("depression", 5).unwrap();
        let papers = source.search(&query).await.unwrap();

        assert_eq!(papers.len(), 3);
        fetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_phase_exhausts_retries() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(502)
            .expect(5)
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let source = source_for(&server);
        let query = SearchQuery::new("depression", 5).unwrap();
        let result = source.fetch(&query).await;

        assert!(!result.is_ok());
        assert!(result.papers().is_empty());
        search.assert_async().await;
        fetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_phase_retries_independently() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let _search_ok = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"esearchresult": {"idlist": ["38000001"]}}"#)
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(5)
            .create_async()
            .await;

        let source = source_for(&server);
        let query = SearchQuery::new("depression", 5).unwrap();
        let result = source.fetch(&query).await;

        assert!(!result.is_ok());
        assert_eq!(result.error(), Some("HTTP status 503"));
        search.assert_async().await;
        fetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_undecodable_search_body_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let overloaded = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body>Service busy</body></html>")
            .expect(2)
            .create_async()
            .await;
        let search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"esearchresult": {"idlist": ["38000001"]}}"#)
            .expect(1)
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(FETCH_XML)
            .expect(1)
            .create_async()
            .await;

        let source = source_for(&server);
        let query = SearchQuery::new("depression", 5).unwrap();
        let result = source.fetch(&query).await;

        assert!(result.is_ok());
        assert_eq!(result.papers()[0].url, "https://pubmed.ncbi.nlm.nih.gov/38000001/");
        overloaded.assert_async().await;
        search.assert_async().await;
        fetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_broken_fetch_xml_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"esearchresult": {"idlist": ["38000001"]}}"#)
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<PubmedArticleSet><PubmedArticle></Oops>")
            .expect(1)
            .create_async()
            .await;

        let source = source_for(&server);
        let query = SearchQuery::new("depression", 5).unwrap();
        let result = source.fetch(&query).await;

        assert!(!result.is_ok());
        fetch.assert_async().await;
    }
}
