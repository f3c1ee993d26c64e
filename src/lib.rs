//! Canned responses for code written against [`http_client::HttpClient`].
//!
//! A [`MockClient`] never touches the network. Every request it receives is
//! recorded, matched against the registered rules, and answered with a static
//! [`MockResponse`] or the result of a callback.
//!
//! ```rust,no_run
//! use http_client::HttpClient;
//! use http_client_mock::{MockClient, MockResponse, RequestMatcher, UrlMatcher};
//! use http_types::{Method, Request, Url};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MockClient::new();
//! client.add_response(
//!     RequestMatcher::any().method("GET").url(UrlMatcher::parse("http://test_url")?),
//!     MockResponse::new().body("test content"),
//! );
//!
//! let request = Request::new(Method::Get, Url::parse("http://test_url")?);
//! let mut response = client.send(request).await?;
//! assert_eq!(response.body_string().await?, "test content");
//!
//! let recorded = client.get_request(&RequestMatcher::any().method("GET"))?;
//! assert_eq!(recorded.url.as_str(), "http://test_url/");
//!
//! client.teardown()?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use http_client::{Config, Error, HttpClient, Request, Response};
use http_types::StatusCode;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

mod error;
mod form_data;
mod matcher;
mod recorded;
mod registry;
mod response;

pub use error::MockError;
pub use form_data::{encode_form_data, parse_form_data, Multipart, DEFAULT_BOUNDARY};
pub use matcher::{RequestMatcher, UrlMatcher};
pub use recorded::{Ledger, RecordedRequest};
pub use registry::{Callback, Registry, Rule, RulePayload};
pub use response::{http_version_label, HttpVersionLabel, MockResponse, ResponseBody};

#[derive(Debug, Default)]
struct MockState {
    registry: Registry,
    ledger: Ledger,
    finished: bool,
}

/// An [`HttpClient`] answering from registered rules.
///
/// Clones share the same rules and recorded requests. When the last handle is
/// dropped without [`MockClient::teardown`], rules that never answered a
/// request make it panic (or log a warning when
/// `assert_all_responses_were_requested` is off).
#[derive(Debug, Clone)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
    config: Config,
    assert_all_responses_were_requested: bool,
}

impl MockClient {
    pub fn new() -> Self {
        MockClientBuilder::new().build()
    }

    pub fn builder() -> MockClientBuilder {
        MockClientBuilder::new()
    }

    // Registry and ledger share one lock so both follow the same call order.
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer requests accepted by `matcher` with `response`.
    pub fn add_response(&self, matcher: RequestMatcher, response: MockResponse) {
        self.add_rule(matcher, RulePayload::Static(response));
    }

    /// Answer requests accepted by `matcher` with whatever `callback` returns.
    ///
    /// Errors returned by the callback reach the caller of `send` untouched.
    pub fn add_callback<F>(&self, matcher: RequestMatcher, callback: F)
    where
        F: Fn(&RecordedRequest, Option<Duration>) -> Result<Response, Error>
            + Send
            + Sync
            + 'static,
    {
        self.add_rule(matcher, RulePayload::Dynamic(Arc::new(callback)));
    }

    // A rule added after teardown re-arms the check on drop.
    fn add_rule(&self, matcher: RequestMatcher, payload: RulePayload) {
        let mut state = self.state();
        state.registry.add(matcher, payload);
        state.finished = false;
    }

    /// All recorded requests accepted by `matcher`, in the order they were sent.
    pub fn get_requests(&self, matcher: &RequestMatcher) -> Vec<RecordedRequest> {
        self.state().ledger.query(matcher)
    }

    /// The only recorded request accepted by `matcher`.
    pub fn get_request(&self, matcher: &RequestMatcher) -> Result<RecordedRequest, MockError> {
        self.state().ledger.query_one(matcher)
    }

    /// Recorded requests as YAML, handy when a test fails.
    pub fn requests_yaml(&self) -> Result<String, MockError> {
        self.state().ledger.to_yaml()
    }

    /// Drop every rule and recorded request.
    ///
    /// With `assert_all_responses_were_requested`, rules that never answered
    /// are reported as [`MockError::UnfulfilledExpectation`].
    pub fn reset(&self, assert_all_responses_were_requested: bool) -> Result<(), MockError> {
        let mut state = self.state();
        let unrequested: Vec<String> = state
            .registry
            .unrequested()
            .iter()
            .map(|rule| rule.matcher.to_string())
            .collect();

        log::debug!(
            "Resetting mock: {} rules, {} recorded requests",
            state.registry.len(),
            state.ledger.len()
        );
        state.registry.clear();
        state.ledger.clear();

        if unrequested.is_empty() {
            return Ok(());
        }

        if assert_all_responses_were_requested {
            Err(MockError::UnfulfilledExpectation(unrequested))
        } else {
            log::warn!(
                "Discarding {} mocked responses that were never requested: {}",
                unrequested.len(),
                unrequested.join(", ")
            );
            Ok(())
        }
    }

    /// End of test: check the rules according to the configured policy and
    /// discard all state.
    ///
    /// Rules added later through another handle are checked again on drop.
    pub fn teardown(self) -> Result<(), MockError> {
        let result = self.reset(self.assert_all_responses_were_requested);
        self.state().finished = true;
        result
    }

    async fn dispatch(&self, mut req: Request) -> Result<Response, Error> {
        let body = req
            .take_body()
            .into_bytes()
            .await
            .map_err(|e| {
                Error::new(
                    StatusCode::InternalServerError,
                    MockError::BodyRead(e.to_string()),
                )
            })?;

        let recorded = RecordedRequest::from_request(&req, body);

        let (payload, recorded) = {
            let mut guard = self.state();
            let MockState {
                registry, ledger, ..
            } = &mut *guard;
            let recorded = ledger.record(recorded);

            match registry.select(recorded) {
                Some(payload) => (payload, recorded.clone()),
                None => {
                    if registry.is_empty() {
                        log::debug!("No rules registered");
                    } else if let Some(closest) = registry.closest_url(recorded) {
                        log::debug!("Closest registered URL to {}: {}", recorded.url, closest);
                    }
                    let error = MockError::NoMatch {
                        method: recorded.method.clone(),
                        url: recorded.url.to_string(),
                    };
                    log::debug!("{error}");
                    return Err(Error::new(StatusCode::NotFound, error));
                }
            }
        };

        match payload {
            RulePayload::Static(response) => Ok(response.to_response()),
            RulePayload::Dynamic(callback) => callback(&recorded, self.config.timeout),
        }
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MockClient {
    fn drop(&mut self) {
        if Arc::strong_count(&self.state) > 1 {
            return;
        }

        let state = self.state();
        if state.finished {
            return;
        }

        let unrequested: Vec<String> = state
            .registry
            .unrequested()
            .iter()
            .map(|rule| rule.matcher.to_string())
            .collect();
        drop(state);

        if unrequested.is_empty() {
            return;
        }

        if self.assert_all_responses_were_requested && !std::thread::panicking() {
            panic!("{}", MockError::UnfulfilledExpectation(unrequested));
        }

        log::warn!(
            "MockClient dropped with {} mocked responses never requested: {}",
            unrequested.len(),
            unrequested.join(", ")
        );
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn send(&self, req: Request) -> Result<Response, Error> {
        self.dispatch(req).await
    }

    fn set_config(&mut self, config: Config) -> Result<(), Error> {
        self.config = config;
        Ok(())
    }

    fn config(&self) -> &Config {
        &self.config
    }
}

#[derive(Debug)]
pub struct MockClientBuilder {
    config: Config,
    assert_all_responses_were_requested: bool,
}

impl MockClientBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
            assert_all_responses_were_requested: true,
        }
    }

    /// Whether rules left unused at teardown are an error (the default) or
    /// only logged.
    pub fn assert_all_responses_were_requested(mut self, assert: bool) -> Self {
        self.assert_all_responses_were_requested = assert;
        self
    }

    /// Timeout handed to callbacks; the mock never enforces it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> MockClient {
        MockClient {
            state: Arc::new(Mutex::new(MockState::default())),
            config: self.config,
            assert_all_responses_were_requested: self.assert_all_responses_were_requested,
        }
    }
}

impl Default for MockClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
