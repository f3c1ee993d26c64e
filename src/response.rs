use crate::form_data::{encode_form_data, Multipart, DEFAULT_BOUNDARY};
use http_client::Response;
use http_types::headers::{HeaderName, HeaderValue, CONTENT_TYPE};
use http_types::{StatusCode, Version};
use serde_json::Value;
use std::str::FromStr;

/// The HTTP version label a mocked response was registered with.
///
/// Stored verbatim as a response extension, since labels such as `HTTP/2`
/// have no exact [`Version`] spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpVersionLabel(pub String);

/// The version label attached to a response produced from a [`MockResponse`].
pub fn http_version_label(response: &Response) -> Option<&str> {
    response
        .ext()
        .get::<HttpVersionLabel>()
        .map(|label| label.0.as_str())
}

fn parse_version(label: &str) -> Option<Version> {
    match label {
        "HTTP/0.9" => Some(Version::Http0_9),
        "HTTP/1.0" => Some(Version::Http1_0),
        "HTTP/1.1" => Some(Version::Http1_1),
        "HTTP/2" | "HTTP/2.0" => Some(Version::Http2_0),
        "HTTP/3" | "HTTP/3.0" => Some(Version::Http3_0),
        _ => None,
    }
}

/// Where the body of a mocked response comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Raw(Vec<u8>),
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart(Multipart),
}

impl ResponseBody {
    /// Encoded bytes plus the content type to announce, if any.
    pub fn encode(&self) -> (Vec<u8>, Option<String>) {
        match self {
            ResponseBody::Raw(bytes) => (bytes.clone(), None),
            ResponseBody::Json(value) => (
                value.to_string().into_bytes(),
                Some("application/json".to_string()),
            ),
            ResponseBody::Form(fields) => (
                encode_form_data(fields).into_bytes(),
                Some("application/x-www-form-urlencoded".to_string()),
            ),
            ResponseBody::Multipart(multipart) => {
                (multipart.encode(), Some(multipart.content_type()))
            }
        }
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        ResponseBody::Raw(Vec::new())
    }
}

/// Template for a static mocked response.
///
/// Defaults to `200`, no headers, `HTTP/1.1` and an empty body.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    status: u16,
    headers: Vec<(String, String)>,
    http_version: String,
    body: ResponseBody,
}

impl MockResponse {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            http_version: "HTTP/1.1".to_string(),
            body: ResponseBody::default(),
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn http_version(mut self, label: impl Into<String>) -> Self {
        self.http_version = label.into();
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = ResponseBody::Raw(body.into());
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = ResponseBody::Json(value);
        self
    }

    /// Add a form field. The body is urlencoded unless files or a boundary
    /// turn it into a multipart body.
    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let field = (name.into(), value.into());
        match &mut self.body {
            ResponseBody::Form(fields) => fields.push(field),
            ResponseBody::Multipart(multipart) => multipart.fields.push(field),
            _ => self.body = ResponseBody::Form(vec![field]),
        }
        self
    }

    /// Add a file part, switching the body to multipart.
    pub fn file(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let mut multipart = self.take_multipart(DEFAULT_BOUNDARY);
        multipart.files.push((name.into(), content.into()));
        self.body = ResponseBody::Multipart(multipart);
        self
    }

    /// Render the body as multipart with this boundary.
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        let boundary = boundary.into();
        let mut multipart = self.take_multipart(&boundary);
        multipart.boundary = boundary;
        self.body = ResponseBody::Multipart(multipart);
        self
    }

    pub fn multipart(mut self, multipart: Multipart) -> Self {
        self.body = ResponseBody::Multipart(multipart);
        self
    }

    fn take_multipart(&mut self, boundary: &str) -> Multipart {
        match std::mem::take(&mut self.body) {
            ResponseBody::Multipart(multipart) => multipart,
            ResponseBody::Form(fields) => Multipart {
                boundary: boundary.to_string(),
                fields,
                files: Vec::new(),
            },
            _ => Multipart::new(boundary),
        }
    }

    /// The body exactly as it will be sent.
    pub fn body_bytes(&self) -> Vec<u8> {
        self.body.encode().0
    }

    pub fn to_response(&self) -> Response {
        let status = StatusCode::try_from(self.status).unwrap_or(StatusCode::InternalServerError);

        let mut res = Response::new(status);

        for (name, value) in &self.headers {
            match (HeaderName::from_str(name), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    res.append_header(name, value);
                }
                _ => log::warn!("Skipping invalid mocked header {name:?}: {value:?}"),
            }
        }
        let has_content_type = res.header(CONTENT_TYPE).is_some();

        res.set_version(parse_version(&self.http_version));
        res.ext_mut()
            .insert(HttpVersionLabel(self.http_version.clone()));

        let (body, content_type) = self.body.encode();
        if !body.is_empty() {
            if let Some(content_type) = &content_type {
                if !has_content_type {
                    res.insert_header(CONTENT_TYPE, content_type.as_str());
                }
            }
            res.set_body(body);
            // set_body fills in the body's own mime type when none is present
            if content_type.is_none() && !has_content_type {
                res.remove_header(CONTENT_TYPE);
            }
        }

        res
    }
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::new()
    }
}
