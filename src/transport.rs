//! Transport resolution: one logical fetch, many possible paths.
//!
//! Many portals block scripted clients or sit behind CORS rules, so a single
//! logical fetch walks an ordered chain of transports:
//!
//! 1. a direct request with browser-like headers (10 s timeout)
//! 2. each configured relay in order (15 s timeout each)
//!
//! The chain stops at the first attempt whose payload is plausibly real
//! (more than 500 bytes for pages, anything non-blank for feeds). Every
//! transport is tried at most once and strictly sequentially; there is no
//! backoff and no retry beyond the chain itself.
//!
//! # Architecture
//!
//! - [`Fetcher`]: the seam the orchestrator depends on
//! - [`TransportResolver`]: the real implementation over `reqwest`
//! - [`Relay`]: how one relay wraps a target URL and unwraps its response
//! - [`FetchAttempt`]: an ephemeral record of one try, used for logging and probes

use crate::error::{NewsError, Result};
use crate::utils::truncate_for_log;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const DIRECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(15);
/// Page payloads at or below this size are treated as block pages or stubs.
pub const MIN_PAGE_BYTES: usize = 500;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml;q=0.9, */*;q=0.8";
const JSON_ACCEPT: &str = "application/json";

/// What kind of document a fetch expects; decides headers and the size floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Page,
    Feed,
}

impl PayloadKind {
    /// Whether `payload` is plausible enough to stop the attempt chain.
    pub fn accepts(&self, payload: &str) -> bool {
        match self {
            PayloadKind::Page => payload.len() > MIN_PAGE_BYTES,
            PayloadKind::Feed => !payload.trim().is_empty(),
        }
    }

    fn accept_header(&self) -> &'static str {
        match self {
            PayloadKind::Page => HTML_ACCEPT,
            PayloadKind::Feed => FEED_ACCEPT,
        }
    }
}

/// How a relay embeds the target URL after its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayEncoding {
    #[default]
    Raw,
    Percent,
}

/// How a relay hands the fetched document back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseEnvelope {
    /// The response body is the document.
    #[default]
    Body,
    /// The body is JSON with the document under `contents` (or `data`).
    JsonContents,
}

/// An intermediary fetch path used when a direct request fails or is blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    pub name: String,
    pub prefix: String,
    #[serde(default)]
    pub encoding: RelayEncoding,
    #[serde(default)]
    pub envelope: ResponseEnvelope,
}

impl Relay {
    pub fn new(name: &str, prefix: &str, encoding: RelayEncoding, envelope: ResponseEnvelope) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            encoding,
            envelope,
        }
    }

    /// Build the request URL that asks this relay for `target`.
    pub fn wrap(&self, target: &str) -> String {
        match self.encoding {
            RelayEncoding::Raw => format!("{}{}", self.prefix, target),
            RelayEncoding::Percent => format!("{}{}", self.prefix, urlencoding::encode(target)),
        }
    }

    /// Pull the document out of a relay response body.
    ///
    /// Returns `None` when a JSON envelope is malformed or carries no document.
    pub fn unwrap_payload(&self, body: String) -> Option<String> {
        match self.envelope {
            ResponseEnvelope::Body => Some(body),
            ResponseEnvelope::JsonContents => {
                let value: serde_json::Value = serde_json::from_str(&body).ok()?;
                value
                    .get("contents")
                    .or_else(|| value.get("data"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            }
        }
    }

    fn accept_header(&self, kind: PayloadKind) -> &'static str {
        match self.envelope {
            ResponseEnvelope::JsonContents => JSON_ACCEPT,
            ResponseEnvelope::Body => kind.accept_header(),
        }
    }
}

/// The default relay chain, in the order it is tried.
pub fn default_relays() -> Vec<Relay> {
    vec![
        Relay::new(
            "allorigins",
            "https://api.allorigins.win/get?url=",
            RelayEncoding::Percent,
            ResponseEnvelope::JsonContents,
        ),
        Relay::new(
            "codetabs",
            "https://api.codetabs.com/v1/proxy?quest=",
            RelayEncoding::Raw,
            ResponseEnvelope::Body,
        ),
        Relay::new(
            "thingproxy",
            "https://thingproxy.freeboard.io/fetch/",
            RelayEncoding::Raw,
            ResponseEnvelope::Body,
        ),
        Relay::new(
            "corsproxy",
            "https://corsproxy.io/?",
            RelayEncoding::Percent,
            ResponseEnvelope::Body,
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportId {
    Direct,
    Relay(String),
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportId::Direct => f.write_str("direct"),
            TransportId::Relay(name) => write!(f, "relay:{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Payload { bytes: usize },
    Timeout,
    Failed { reason: String },
}

/// One transport try. Never persisted.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub url: String,
    pub transport: TransportId,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

impl FetchAttempt {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Payload { .. })
    }
}

/// Performs one logical fetch of a URL.
///
/// The orchestrator only sees this trait, which keeps network access out of
/// its tests.
pub trait Fetcher {
    /// Fetch `url` and return the document text.
    ///
    /// # Errors
    ///
    /// [`NewsError::InvalidUrl`] for a malformed URL and
    /// [`NewsError::SourceExhausted`] when no transport produced a payload.
    async fn fetch(&self, url: &str, kind: PayloadKind) -> Result<String>;
}

/// Direct-then-relays transport chain over a shared `reqwest` client.
pub struct TransportResolver {
    client: Client,
    relays: Vec<Relay>,
    direct_timeout: Duration,
    relay_timeout: Duration,
}

impl fmt::Debug for TransportResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResolver")
            .field("relays", &self.relays.iter().map(|r| &r.name).collect::<Vec<_>>())
            .field("direct_timeout", &self.direct_timeout)
            .field("relay_timeout", &self.relay_timeout)
            .finish()
    }
}

impl TransportResolver {
    /// Create a resolver that tries `relays` in order after the direct attempt.
    ///
    /// # Errors
    ///
    /// Fails only if the underlying HTTP client cannot be built (TLS backend).
    pub fn new(relays: Vec<Relay>) -> Result<Self> {
        let client = Client::builder().user_agent(BROWSER_USER_AGENT).build()?;
        Ok(Self {
            client,
            relays,
            direct_timeout: DIRECT_TIMEOUT,
            relay_timeout: RELAY_TIMEOUT,
        })
    }

    pub fn with_timeouts(mut self, direct: Duration, relay: Duration) -> Self {
        self.direct_timeout = direct;
        self.relay_timeout = relay;
        self
    }

    /// Walk the attempt chain for `url` and report every try.
    ///
    /// The attempt list is returned even on success so probes can show which
    /// transport won.
    #[instrument(level = "debug", skip(self))]
    pub async fn resolve(&self, url: &str, kind: PayloadKind) -> (Result<String>, Vec<FetchAttempt>) {
        let mut attempts = Vec::with_capacity(self.relays.len() + 1);

        if let Err(e) = Url::parse(url) {
            return (Err(e.into()), attempts);
        }

        let (result, attempt) = self
            .attempt(url, url, TransportId::Direct, kind, None)
            .await;
        attempts.push(attempt);
        if let Ok(payload) = result {
            return (Ok(payload), attempts);
        }

        for relay in &self.relays {
            let request_url = relay.wrap(url);
            let (result, attempt) = self
                .attempt(
                    url,
                    &request_url,
                    TransportId::Relay(relay.name.clone()),
                    kind,
                    Some(relay),
                )
                .await;
            attempts.push(attempt);
            if let Ok(payload) = result {
                return (Ok(payload), attempts);
            }
        }

        let exhausted = NewsError::SourceExhausted {
            url: url.to_string(),
            attempts: attempts.len(),
        };
        (Err(exhausted), attempts)
    }

    async fn attempt(
        &self,
        target: &str,
        request_url: &str,
        transport: TransportId,
        kind: PayloadKind,
        relay: Option<&Relay>,
    ) -> (Result<String>, FetchAttempt) {
        let t0 = Instant::now();
        let result = self.try_transport(request_url, kind, relay).await;
        let elapsed = t0.elapsed();

        let outcome = match &result {
            Ok(payload) => AttemptOutcome::Payload {
                bytes: payload.len(),
            },
            Err(AttemptError::Timeout) => AttemptOutcome::Timeout,
            Err(AttemptError::Failed(reason)) => AttemptOutcome::Failed {
                reason: reason.clone(),
            },
        };

        match &outcome {
            AttemptOutcome::Payload { bytes } => info!(
                url = %target,
                %transport,
                bytes,
                elapsed_ms = elapsed.as_millis() as u64,
                "Transport attempt succeeded"
            ),
            AttemptOutcome::Timeout => warn!(
                url = %target,
                %transport,
                elapsed_ms = elapsed.as_millis() as u64,
                "Transport attempt timed out"
            ),
            AttemptOutcome::Failed { reason } => debug!(
                url = %target,
                %transport,
                elapsed_ms = elapsed.as_millis() as u64,
                reason = %truncate_for_log(reason, 100),
                "Transport attempt failed"
            ),
        }

        let attempt = FetchAttempt {
            url: target.to_string(),
            transport: transport.clone(),
            outcome,
            elapsed,
        };
        let result = result.map_err(|e| NewsError::Transport {
            url: target.to_string(),
            transport: transport.to_string(),
            reason: e.to_string(),
        });
        (result, attempt)
    }

    async fn try_transport(
        &self,
        request_url: &str,
        kind: PayloadKind,
        relay: Option<&Relay>,
    ) -> std::result::Result<String, AttemptError> {
        let accept = relay.map_or(kind.accept_header(), |r| r.accept_header(kind));
        let timeout = if relay.is_some() {
            self.relay_timeout
        } else {
            self.direct_timeout
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("pt-BR,pt;q=0.9,en;q=0.8"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        if relay.is_none() {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        }

        let response = self
            .client
            .get(request_url)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await
            .map_err(AttemptError::from_reqwest)?;

        let status = response.status();
        // Relays often wrap upstream errors in a 4xx with a usable body; only
        // their own server errors are disqualifying.
        let status_ok = match relay {
            None => status.is_success(),
            Some(_) => !status.is_server_error(),
        };
        if !status_ok {
            return Err(AttemptError::Failed(format!("HTTP {}", status.as_u16())));
        }

        let body = response.text().await.map_err(AttemptError::from_reqwest)?;
        let payload = match relay {
            Some(relay) => relay
                .unwrap_payload(body)
                .ok_or_else(|| AttemptError::Failed("unrecognized relay envelope".into()))?,
            None => body,
        };

        if !kind.accepts(&payload) {
            return Err(AttemptError::Failed(format!(
                "payload too small ({} bytes)",
                payload.len()
            )));
        }
        Ok(payload)
    }
}

impl Fetcher for TransportResolver {
    async fn fetch(&self, url: &str, kind: PayloadKind) -> Result<String> {
        let (result, attempts) = self.resolve(url, kind).await;
        if let Err(e) = &result {
            warn!(
                %url,
                attempts = attempts.len(),
                error = %e,
                "All transports failed"
            );
        }
        result
    }
}

#[derive(Debug)]
enum AttemptError {
    Timeout,
    Failed(String),
}

impl AttemptError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AttemptError::Timeout
        } else {
            AttemptError::Failed(e.to_string())
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Timeout => f.write_str("timed out"),
            AttemptError::Failed(reason) => f.write_str(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page_body() -> String {
        format!("<html><body>{}</body></html>", "<p>noticia</p>".repeat(60))
    }

    fn relay(server: &MockServer, name: &str) -> Relay {
        Relay::new(
            name,
            &format!("{}/{}?url=", server.uri(), name),
            RelayEncoding::Percent,
            ResponseEnvelope::Body,
        )
    }

    async fn mount(server: &MockServer, at: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[test]
    fn test_relay_wrap_encodings() {
        let target = "https://www.em.com.br/?a=1&b=2";
        let raw = Relay::new("t", "https://proxy.test/fetch/", RelayEncoding::Raw, ResponseEnvelope::Body);
        assert_eq!(raw.wrap(target), "https://proxy.test/fetch/https://www.em.com.br/?a=1&b=2");

        let pct = Relay::new("t", "https://proxy.test/get?url=", RelayEncoding::Percent, ResponseEnvelope::Body);
        assert_eq!(
            pct.wrap(target),
            "https://proxy.test/get?url=https%3A%2F%2Fwww.em.com.br%2F%3Fa%3D1%26b%3D2"
        );
    }

    #[test]
    fn test_json_envelope_unwrap() {
        let relay = Relay::new("t", "p", RelayEncoding::Percent, ResponseEnvelope::JsonContents);
        assert_eq!(
            relay.unwrap_payload(r#"{"contents":"<rss/>","status":{}}"#.into()),
            Some("<rss/>".to_string())
        );
        assert_eq!(
            relay.unwrap_payload(r#"{"data":"<feed/>"}"#.into()),
            Some("<feed/>".to_string())
        );
        assert_eq!(relay.unwrap_payload("not json".into()), None);
        assert_eq!(relay.unwrap_payload(r#"{"contents":null}"#.into()), None);
    }

    #[test]
    fn test_payload_kind_thresholds() {
        assert!(!PayloadKind::Page.accepts(&"x".repeat(MIN_PAGE_BYTES)));
        assert!(PayloadKind::Page.accepts(&"x".repeat(MIN_PAGE_BYTES + 1)));
        assert!(PayloadKind::Feed.accepts("<rss/>"));
        assert!(!PayloadKind::Feed.accepts("   \n"));
    }

    #[tokio::test]
    async fn test_direct_success_skips_relays() {
        let server = MockServer::start().await;
        mount(&server, "/news", ResponseTemplate::new(200).set_body_string(page_body())).await;

        let resolver = TransportResolver::new(vec![relay(&server, "relay1")]).unwrap();
        let (result, attempts) = resolver
            .resolve(&format!("{}/news", server.uri()), PayloadKind::Page)
            .await;

        assert_eq!(result.unwrap(), page_body());
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].transport, TransportId::Direct);
    }

    #[tokio::test]
    async fn test_forbidden_direct_falls_back_to_relay() {
        let server = MockServer::start().await;
        mount(&server, "/news", ResponseTemplate::new(403)).await;
        mount(&server, "/relay1", ResponseTemplate::new(200).set_body_string(page_body())).await;

        let resolver = TransportResolver::new(vec![relay(&server, "relay1")]).unwrap();
        let payload = resolver
            .fetch(&format!("{}/news", server.uri()), PayloadKind::Page)
            .await
            .unwrap();

        assert_eq!(payload, page_body());
    }

    #[tokio::test]
    async fn test_undersized_direct_payload_falls_back() {
        let server = MockServer::start().await;
        mount(&server, "/news", ResponseTemplate::new(200).set_body_string("<html>blocked</html>")).await;
        mount(&server, "/relay1", ResponseTemplate::new(200).set_body_string(page_body())).await;

        let resolver = TransportResolver::new(vec![relay(&server, "relay1")]).unwrap();
        let (result, attempts) = resolver
            .resolve(&format!("{}/news", server.uri()), PayloadKind::Page)
            .await;

        assert!(result.is_ok());
        assert_eq!(attempts.len(), 2);
        assert!(!attempts[0].succeeded());
        assert!(attempts[1].succeeded());
    }

    #[tokio::test]
    async fn test_feed_accepts_small_direct_payload() {
        let server = MockServer::start().await;
        mount(&server, "/feed", ResponseTemplate::new(200).set_body_string("<rss><channel/></rss>")).await;

        let resolver = TransportResolver::new(vec![relay(&server, "relay1")]).unwrap();
        let payload = resolver
            .fetch(&format!("{}/feed", server.uri()), PayloadKind::Feed)
            .await
            .unwrap();

        assert_eq!(payload, "<rss><channel/></rss>");
    }

    #[tokio::test]
    async fn test_relays_tried_in_order() {
        let server = MockServer::start().await;
        mount(&server, "/news", ResponseTemplate::new(500)).await;
        mount(&server, "/relay1", ResponseTemplate::new(502)).await;
        mount(&server, "/relay2", ResponseTemplate::new(200).set_body_string(page_body())).await;
        mount(&server, "/relay3", ResponseTemplate::new(200).set_body_string("unused")).await;

        let resolver = TransportResolver::new(vec![
            relay(&server, "relay1"),
            relay(&server, "relay2"),
            relay(&server, "relay3"),
        ])
        .unwrap();
        let (result, attempts) = resolver
            .resolve(&format!("{}/news", server.uri()), PayloadKind::Page)
            .await;

        assert_eq!(result.unwrap(), page_body());
        let transports: Vec<String> = attempts.iter().map(|a| a.transport.to_string()).collect();
        assert_eq!(transports, vec!["direct", "relay:relay1", "relay:relay2"]);
    }

    #[tokio::test]
    async fn test_json_envelope_relay() {
        let server = MockServer::start().await;
        mount(&server, "/feed", ResponseTemplate::new(404)).await;
        let body = serde_json::json!({ "contents": "<rss><channel><item/></channel></rss>" });
        mount(&server, "/allorigins", ResponseTemplate::new(200).set_body_json(body)).await;

        let relay = Relay::new(
            "allorigins",
            &format!("{}/allorigins?url=", server.uri()),
            RelayEncoding::Percent,
            ResponseEnvelope::JsonContents,
        );
        let resolver = TransportResolver::new(vec![relay]).unwrap();
        let payload = resolver
            .fetch(&format!("{}/feed", server.uri()), PayloadKind::Feed)
            .await
            .unwrap();

        assert_eq!(payload, "<rss><channel><item/></channel></rss>");
    }

    #[tokio::test]
    async fn test_all_transports_exhausted() {
        let server = MockServer::start().await;
        mount(&server, "/news", ResponseTemplate::new(403)).await;
        mount(&server, "/relay1", ResponseTemplate::new(200).set_body_string("tiny")).await;
        mount(&server, "/relay2", ResponseTemplate::new(503)).await;

        let resolver =
            TransportResolver::new(vec![relay(&server, "relay1"), relay(&server, "relay2")]).unwrap();
        let result = resolver
            .fetch(&format!("{}/news", server.uri()), PayloadKind::Page)
            .await;

        match result {
            Err(NewsError::SourceExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected SourceExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_relative_url_rejected() {
        let resolver = TransportResolver::new(Vec::new()).unwrap();
        let result = resolver.fetch("/mg/minas-gerais/", PayloadKind::Page).await;
        assert!(matches!(result, Err(NewsError::InvalidUrl(_))));
    }
}
