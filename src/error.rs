use thiserror::Error;

/// Errors produced by the mock engine itself.
///
/// Errors returned by callbacks are never converted into this type; they reach
/// the caller exactly as the callback built them.
#[derive(Error, Debug)]
pub enum MockError {
    #[error("No mock can be found for {method} request on {url}.")]
    NoMatch { method: String, url: String },
    #[error("The following responses are mocked but not requested: {}", .0.join(", "))]
    UnfulfilledExpectation(Vec<String>),
    #[error("Expected exactly one request matching {matcher} but found {count}.")]
    AmbiguousOrMissingRequest { matcher: String, count: usize },
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid URL pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("failed to read request body: {0}")]
    BodyRead(String),
    #[error("failed to serialize recorded requests: {0}")]
    Serialization(String),
}
