use crate::domain::model::RawDocument;
use crate::utils::error::{EtlError, Result};
use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;

/// Bytes scanned for a `<meta>` charset declaration, as in the HTML prescan.
const META_SNIFF_LIMIT: usize = 1024;

fn meta_charset_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#)
            .expect("static meta charset pattern")
    })
}

/// `charset` parameter of a `Content-Type` header value.
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

fn meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(META_SNIFF_LIMIT)]);
    let caps = meta_charset_pattern().captures(&head)?;
    Encoding::for_label(caps[1].as_bytes())
}

/// Decodes a page body. The header charset wins, then a `<meta>` declaration,
/// then UTF-8.
pub fn decode_body(bytes: &[u8], header_charset: Option<&str>) -> String {
    let encoding = header_charset
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .or_else(|| meta_charset(bytes))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::warn!("Page body is not valid {}; replaced invalid bytes", used.name());
    } else {
        tracing::debug!("Decoded page body as {}", used.name());
    }
    text.into_owned()
}

/// Optional retry wrapped around the single GET. The default makes one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 0,
            delay: Duration::from_secs(5),
        }
    }
}

pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent.to_string());
        }
        let client = builder.build().map_err(|e| EtlError::ConfigValidationError {
            field: "source".to_string(),
            message: format!("cannot build HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// GETs `url` and returns the decoded body. Non-2xx is an error.
    pub async fn fetch(&self, url: &str) -> Result<RawDocument> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url).await {
                Ok(doc) => return Ok(doc),
                Err(e) if attempt <= self.retry.attempts => {
                    tracing::warn!(
                        "⚠️ Fetch attempt {}/{} failed: {}",
                        attempt,
                        self.retry.attempts + 1,
                        e
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<RawDocument> {
        tracing::debug!("Requesting source page: {}", url);

        let transport = |source: reqwest::Error| EtlError::TransportError {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        tracing::debug!("Source page status: {}", status);

        if !status.is_success() {
            return Err(EtlError::HttpStatusError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let header_charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_param)
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(transport)?;
        let body = decode_body(&bytes, header_charset.as_deref());

        Ok(RawDocument {
            url: url.to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fetcher() -> Fetcher {
        Fetcher::new(Duration::from_secs(5), None).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start();
        let page_mock = server.mock(|when, then| {
            when.method(GET).path("/page.html");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body("<html><body>Přerov 12,3 °C</body></html>");
        });

        let doc = fetcher().fetch(&server.url("/page.html")).await.unwrap();

        page_mock.assert();
        assert!(doc.body.contains("Přerov 12,3 °C"));
        assert_eq!(doc.url, server.url("/page.html"));
    }

    #[tokio::test]
    async fn test_fetch_uses_meta_charset_without_header_charset() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/cp1250.html");
            then.status(200)
                .header("Content-Type", "text/html")
                .body(
                    &b"<html><head><meta http-equiv=\"Content-Type\" \
                       content=\"text/html; charset=windows-1250\"></head>\
                       <body>P\xf8erov 12,3 \xb0C</body></html>"[..],
                );
        });

        let doc = fetcher().fetch(&server.url("/cp1250.html")).await.unwrap();

        assert!(doc.body.contains("Přerov 12,3 °C"));
    }

    #[test]
    fn test_decode_body_prefers_header_charset() {
        let bytes = b"<meta charset=\"utf-8\"><td>P\xf8erov</td>";
        assert_eq!(
            decode_body(bytes, Some("windows-1250")),
            "<meta charset=\"utf-8\"><td>Přerov</td>"
        );
    }

    #[test]
    fn test_decode_body_meta_charset_then_utf8() {
        let html5 = b"<meta charset='iso-8859-2'><td>P\xf8erov</td>";
        assert!(decode_body(html5, None).contains("Přerov"));

        let plain = "<td>Přerov</td>".as_bytes();
        assert_eq!(decode_body(plain, None), "<td>Přerov</td>");

        let unknown = b"<meta charset=\"no-such-charset\"><td>ok</td>";
        assert_eq!(decode_body(unknown, None), "<meta charset=\"no-such-charset\"><td>ok</td>");
    }

    #[test]
    fn test_charset_param() {
        assert_eq!(charset_param("text/html; charset=\"UTF-8\""), Some("UTF-8"));
        assert_eq!(charset_param("text/html;Charset=windows-1250"), Some("windows-1250"));
        assert_eq!(charset_param("text/html"), None);
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_error() {
        let server = MockServer::start();
        let page_mock = server.mock(|when, then| {
            when.method(GET).path("/missing.html");
            then.status(404);
        });

        let err = fetcher()
            .fetch(&server.url("/missing.html"))
            .await
            .unwrap_err();

        page_mock.assert();
        assert!(matches!(err, EtlError::HttpStatusError { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_without_retry_makes_one_attempt() {
        let server = MockServer::start();
        let page_mock = server.mock(|when, then| {
            when.method(GET).path("/flaky.html");
            then.status(503);
        });

        let result = fetcher().fetch(&server.url("/flaky.html")).await;

        assert!(result.is_err());
        page_mock.assert_hits(1);
    }

    #[tokio::test]
    async fn test_fetch_retry_policy_repeats_failed_requests() {
        let server = MockServer::start();
        let page_mock = server.mock(|when, then| {
            when.method(GET).path("/flaky.html");
            then.status(503);
        });

        let fetcher = fetcher().with_retry(RetryPolicy {
            attempts: 2,
            delay: Duration::from_millis(10),
        });
        let err = fetcher.fetch(&server.url("/flaky.html")).await.unwrap_err();

        assert!(matches!(err, EtlError::HttpStatusError { status: 503, .. }));
        page_mock.assert_hits(3);
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport_error() {
        // Nothing listens on port 9 on a test host
        let err = fetcher()
            .fetch("http://127.0.0.1:9/page.html")
            .await
            .unwrap_err();

        assert!(matches!(err, EtlError::TransportError { .. }));
    }
}
