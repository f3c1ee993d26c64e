use crate::error::MockError;
use crate::matcher::RequestMatcher;
use base64::Engine;
use http_client::Request;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

/// A request seen by the mock, with its body fully buffered.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub sequence: u64,
    pub method: String,
    pub url: Url,
    /// Lower-cased header names to their values, in arrival order per name.
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Capture `req` together with its already drained body.
    pub fn from_request(req: &Request, body: Vec<u8>) -> Self {
        let mut headers = BTreeMap::new();
        for (name, values) in req.iter() {
            let header_values: Vec<String> =
                values.iter().map(|v| v.as_str().to_string()).collect();
            headers
                .entry(name.as_str().to_ascii_lowercase())
                .or_insert_with(Vec::new)
                .extend(header_values);
        }

        Self {
            sequence: 0,
            method: req.method().to_string().to_ascii_uppercase(),
            url: req.url().clone(),
            headers,
            body,
        }
    }

    /// Header value by case-insensitive name; multiple values are joined with ", ".
    pub fn header(&self, name: &str) -> Option<String> {
        self.header_values(name).map(|values| values.join(", "))
    }

    pub fn header_values(&self, name: &str) -> Option<&[String]> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_string(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// The body decoded as `application/x-www-form-urlencoded` fields.
    pub fn form(&self) -> Vec<(String, String)> {
        self.body_string()
            .map(crate::form_data::parse_form_data)
            .unwrap_or_default()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Serialized shape of one ledger entry.
#[derive(Debug, Serialize)]
struct LedgerEntry<'a> {
    sequence: u64,
    method: &'a str,
    url: &'a str,
    headers: &'a BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body_base64: Option<String>,
}

impl<'a> From<&'a RecordedRequest> for LedgerEntry<'a> {
    fn from(request: &'a RecordedRequest) -> Self {
        let (body, body_base64) = if request.body.is_empty() {
            (None, None)
        } else {
            match request.body_string() {
                Some(text) => (Some(text), None),
                None => (
                    None,
                    Some(base64::engine::general_purpose::STANDARD.encode(&request.body)),
                ),
            }
        };

        Self {
            sequence: request.sequence,
            method: &request.method,
            url: request.url.as_str(),
            headers: &request.headers,
            body,
            body_base64,
        }
    }
}

/// Append-only log of every request the mock received, matched or not.
#[derive(Debug, Default)]
pub struct Ledger {
    requests: Vec<RecordedRequest>,
    next_sequence: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `request` with the next sequence number and store it.
    pub fn record(&mut self, mut request: RecordedRequest) -> &RecordedRequest {
        request.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.requests.push(request);
        &self.requests[self.requests.len() - 1]
    }

    pub fn query(&self, matcher: &RequestMatcher) -> Vec<RecordedRequest> {
        self.requests
            .iter()
            .filter(|request| matcher.matches(request))
            .cloned()
            .collect()
    }

    /// Like [`Ledger::query`] but insists on exactly one match.
    pub fn query_one(&self, matcher: &RequestMatcher) -> Result<RecordedRequest, MockError> {
        let mut matching = self.query(matcher);
        if matching.len() != 1 {
            return Err(MockError::AmbiguousOrMissingRequest {
                matcher: matcher.to_string(),
                count: matching.len(),
            });
        }
        Ok(matching.remove(0))
    }

    pub fn to_yaml(&self) -> Result<String, MockError> {
        let entries: Vec<LedgerEntry<'_>> = self.requests.iter().map(LedgerEntry::from).collect();
        serde_yaml::to_string(&entries).map_err(|e| MockError::Serialization(e.to_string()))
    }

    /// Forget recorded requests; sequence numbers keep increasing.
    pub fn clear(&mut self) {
        self.requests.clear();
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
