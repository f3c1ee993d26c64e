use crate::error::MockError;
use crate::recorded::RecordedRequest;
use regex::Regex;
use std::fmt;
use url::Url;

/// How a rule constrains the request URL.
#[derive(Debug, Clone)]
pub enum UrlMatcher {
    /// Same URL; query parameters compared as a set, in any order.
    Exact(Url),
    /// Regular expression searched anywhere in the URL string.
    Pattern(Regex),
}

impl UrlMatcher {
    pub fn parse(url: &str) -> Result<Self, MockError> {
        Url::parse(url)
            .map(UrlMatcher::Exact)
            .map_err(|source| MockError::InvalidUrl {
                url: url.to_string(),
                source,
            })
    }

    pub fn pattern(pattern: &str) -> Result<Self, MockError> {
        Ok(UrlMatcher::Pattern(Regex::new(pattern)?))
    }

    pub fn matches(&self, url: &Url) -> bool {
        match self {
            UrlMatcher::Exact(expected) => {
                without_query(expected) == without_query(url)
                    && sorted_query_pairs(expected) == sorted_query_pairs(url)
            }
            UrlMatcher::Pattern(regex) => regex.is_match(url.as_str()),
        }
    }
}

impl From<Url> for UrlMatcher {
    fn from(url: Url) -> Self {
        UrlMatcher::Exact(url)
    }
}

impl From<Regex> for UrlMatcher {
    fn from(regex: Regex) -> Self {
        UrlMatcher::Pattern(regex)
    }
}

impl fmt::Display for UrlMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlMatcher::Exact(url) => write!(f, "{url}"),
            UrlMatcher::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

fn without_query(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_query(None);
    url
}

fn sorted_query_pairs(url: &Url) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();
    pairs
}

/// Predicate deciding whether a request satisfies a rule.
///
/// Every filter left unset accepts anything; the ones that are set must all
/// hold.
#[derive(Debug, Clone, Default)]
pub struct RequestMatcher {
    method: Option<String>,
    url: Option<UrlMatcher>,
    headers: Vec<(String, String)>,
    content: Option<Vec<u8>>,
}

impl RequestMatcher {
    /// A matcher without filters, accepting every request.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl AsRef<str>) -> Self {
        self.method = Some(method.as_ref().to_ascii_uppercase());
        self
    }

    pub fn url(mut self, url: impl Into<UrlMatcher>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Require `name` (any case) to carry exactly `value`.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .push((name.as_ref().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn url_matcher(&self) -> Option<&UrlMatcher> {
        self.url.as_ref()
    }

    pub fn matches(&self, request: &RecordedRequest) -> bool {
        if let Some(method) = &self.method {
            if !request.method.eq_ignore_ascii_case(method) {
                log::debug!("Method mismatch: {} != {}", request.method, method);
                return false;
            }
        }

        if let Some(url) = &self.url {
            if !url.matches(&request.url) {
                log::debug!("URL mismatch: {} != {}", request.url, url);
                return false;
            }
        }

        for (name, expected) in &self.headers {
            match request.header(name) {
                Some(actual) if &actual == expected => {}
                actual => {
                    log::debug!(
                        "Header '{}' mismatch: request={:?}, expected={:?}",
                        name,
                        actual,
                        expected
                    );
                    return false;
                }
            }
        }

        if let Some(content) = &self.content {
            if request.body() != content.as_slice() {
                log::debug!(
                    "Content mismatch: {} request bytes, {} expected",
                    request.body().len(),
                    content.len()
                );
                return false;
            }
        }

        true
    }
}

impl fmt::Display for RequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "{method} requests")?,
            None => write!(f, "all requests")?,
        }
        if let Some(url) = &self.url {
            write!(f, " on {url}")?;
        }
        if !self.headers.is_empty() {
            let headers: Vec<String> = self
                .headers
                .iter()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect();
            write!(f, " with headers {{{}}}", headers.join(", "))?;
        }
        if let Some(content) = &self.content {
            write!(f, " with {} bytes of content", content.len())?;
        }
        Ok(())
    }
}
