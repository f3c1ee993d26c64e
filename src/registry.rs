use crate::matcher::{RequestMatcher, UrlMatcher};
use crate::recorded::RecordedRequest;
use crate::response::MockResponse;
use http_client::{Error, Response};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A function computing the response for a request.
///
/// Receives the buffered request and the client's configured timeout.
pub type Callback =
    Arc<dyn Fn(&RecordedRequest, Option<Duration>) -> Result<Response, Error> + Send + Sync>;

/// What a rule answers with once selected.
#[derive(Clone)]
pub enum RulePayload {
    Static(MockResponse),
    Dynamic(Callback),
}

impl fmt::Debug for RulePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulePayload::Static(response) => f.debug_tuple("Static").field(response).finish(),
            RulePayload::Dynamic(_) => f.debug_tuple("Dynamic").field(&"<callback>").finish(),
        }
    }
}

#[derive(Debug)]
pub struct Rule {
    pub matcher: RequestMatcher,
    pub payload: RulePayload,
    calls: usize,
}

impl Rule {
    pub fn new(matcher: RequestMatcher, payload: RulePayload) -> Self {
        Self {
            matcher,
            payload,
            calls: 0,
        }
    }

    /// How many requests this rule has answered.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

/// Registered rules, in registration order.
///
/// Selection is consumption-based: among the rules matching a request, the
/// first one never selected wins. Once all of them have been selected, the
/// last one keeps answering. This lets a test queue distinct responses for
/// repeated calls to the same endpoint.
#[derive(Debug, Default)]
pub struct Registry {
    rules: Vec<Rule>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, matcher: RequestMatcher, payload: RulePayload) {
        log::debug!("Registering rule for {matcher}");
        self.rules.push(Rule::new(matcher, payload));
    }

    /// Pick the rule answering `request` and count the call against it.
    pub fn select(&mut self, request: &RecordedRequest) -> Option<RulePayload> {
        let matching: Vec<usize> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.matcher.matches(request))
            .map(|(index, _)| index)
            .collect();

        let index = matching
            .iter()
            .copied()
            .find(|&index| self.rules[index].calls == 0)
            .or_else(|| matching.last().copied())?;

        let rule = &mut self.rules[index];
        rule.calls += 1;
        log::debug!(
            "Request #{} {} {} answered by rule #{} ({}), call {}",
            request.sequence,
            request.method,
            request.url,
            index,
            rule.matcher,
            rule.calls
        );
        Some(rule.payload.clone())
    }

    /// Rules that never answered a request.
    pub fn unrequested(&self) -> Vec<&Rule> {
        self.rules.iter().filter(|rule| rule.calls == 0).collect()
    }

    /// The registered exact URL closest to the request URL, for diagnostics.
    pub fn closest_url(&self, request: &RecordedRequest) -> Option<String> {
        let target = request.url.as_str();
        self.rules
            .iter()
            .filter_map(|rule| match rule.matcher.url_matcher() {
                Some(UrlMatcher::Exact(url)) => Some(url.as_str()),
                _ => None,
            })
            .min_by_key(|candidate| levenshtein::levenshtein(candidate, target))
            .map(str::to_string)
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_client::Request;
    use http_types::Method;
    use url::Url;

    fn recorded(method: Method, url: &str) -> RecordedRequest {
        let req = Request::new(method, Url::parse(url).unwrap());
        RecordedRequest::from_request(&req, Vec::new())
    }

    fn body_of(payload: Option<RulePayload>) -> Vec<u8> {
        match payload {
            Some(RulePayload::Static(response)) => response.body_bytes(),
            other => panic!("expected a static payload, got {other:?}"),
        }
    }

    fn respond(body: &str) -> RulePayload {
        RulePayload::Static(MockResponse::new().body(body))
    }

    #[test]
    fn test_no_rules_selects_nothing() {
        let mut registry = Registry::new();

        assert!(registry.select(&recorded(Method::Get, "http://test_url")).is_none());
    }

    #[test]
    fn test_last_rule_becomes_sticky() {
        let mut registry = Registry::new();
        registry.add(RequestMatcher::any(), respond("1"));
        registry.add(RequestMatcher::any(), respond("2"));
        registry.add(RequestMatcher::any(), respond("3"));

        let request = recorded(Method::Get, "http://test_url");
        assert_eq!(body_of(registry.select(&request)), b"1");
        assert_eq!(body_of(registry.select(&request)), b"2");
        assert_eq!(body_of(registry.select(&request)), b"3");
        assert_eq!(body_of(registry.select(&request)), b"3");
        assert!(registry.unrequested().is_empty());
    }

    #[test]
    fn test_selection_is_per_matching_subset() {
        let mut registry = Registry::new();
        let url = UrlMatcher::parse("http://test_url").unwrap();
        registry.add(RequestMatcher::any().method("GET").url(url.clone()), respond("get"));
        registry.add(RequestMatcher::any().method("POST").url(url), respond("post"));

        assert_eq!(body_of(registry.select(&recorded(Method::Post, "http://test_url"))), b"post");
        assert_eq!(body_of(registry.select(&recorded(Method::Post, "http://test_url"))), b"post");
        assert_eq!(body_of(registry.select(&recorded(Method::Get, "http://test_url"))), b"get");
    }

    #[test]
    fn test_unrequested_lists_unused_rules() {
        let mut registry = Registry::new();
        registry.add(RequestMatcher::any().method("GET"), respond("get"));
        registry.add(RequestMatcher::any().method("PUT"), respond("put"));

        registry.select(&recorded(Method::Get, "http://test_url"));

        let unused = registry.unrequested();
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].matcher.to_string(), "PUT requests");
        assert_eq!(unused[0].calls(), 0);
    }

    #[test]
    fn test_closest_url_prefers_smallest_edit_distance() {
        let mut registry = Registry::new();
        registry.add(
            RequestMatcher::any().url(UrlMatcher::parse("http://test_url/users").unwrap()),
            respond(""),
        );
        registry.add(
            RequestMatcher::any().url(UrlMatcher::parse("http://elsewhere/").unwrap()),
            respond(""),
        );
        registry.add(RequestMatcher::any().url(UrlMatcher::pattern("users").unwrap()), respond(""));

        assert_eq!(
            registry.closest_url(&recorded(Method::Get, "http://test_url/user")),
            Some("http://test_url/users".to_string())
        );
    }
}
