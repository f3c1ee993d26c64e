/// Boundary used for multipart bodies when none is given.
///
/// Fixed so that rendered bodies are reproducible across runs.
pub const DEFAULT_BOUNDARY: &str = "b2a4d0c63f9e4e1a8c9f2b7d51e0a3c4";

/// Parse URL-encoded form data into key-value pairs, keeping their order
pub fn parse_form_data(data: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();

    for pair in data.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        // Form encoding writes spaces as '+'
        let key = key.replace('+', " ");
        let value = value.replace('+', " ");
        let decoded_key = urlencoding::decode(&key)
            .map(|k| k.into_owned())
            .unwrap_or_else(|_| key.clone());
        let decoded_value = urlencoding::decode(&value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.clone());
        params.push((decoded_key, decoded_value));
    }

    params
}

/// Encode form data to a URL-encoded string, in insertion order
pub fn encode_form_data(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// A `multipart/form-data` body: plain fields followed by file parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multipart {
    pub boundary: String,
    pub fields: Vec<(String, String)>,
    pub files: Vec<(String, Vec<u8>)>,
}

impl Multipart {
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            fields: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.files.push((name.into(), content.into()));
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Render the body with RFC 2046 framing.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();

        for (name, value) in &self.fields {
            self.write_delimiter(&mut out);
            out.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }

        for (name, content) in &self.files {
            self.write_delimiter(&mut out);
            out.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"upload\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            out.extend_from_slice(content);
            out.extend_from_slice(b"\r\n");
        }

        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        out
    }

    fn write_delimiter(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
    }
}
