use http_client::{HttpClient, Request};
use http_client_mock::{http_version_label, MockClient, MockResponse, Multipart, RequestMatcher};
use http_types::{Method, Url, Version};
use serde_json::{json, Value};

const BOUNDARY: &str = "2256d3a36d2a61a1eba35a22bee5c74a";

fn get(url: &str) -> Result<Request, Box<dyn std::error::Error>> {
    Ok(Request::new(Method::Get, Url::parse(url)?))
}

fn header(response: &http_client::Response, name: &str) -> Option<String> {
    response.header(name).map(|values| {
        values
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    })
}

#[tokio::test]
async fn test_with_http_version_2() -> Result<(), Box<dyn std::error::Error>> {
    let client = MockClient::new();
    client.add_response(
        RequestMatcher::any(),
        MockResponse::new().http_version("HTTP/2").body("test content 1"),
    );

    let mut response = client.send(get("http://test_url")?).await?;

    assert_eq!(response.body_string().await?, "test content 1");
    assert_eq!(http_version_label(&response), Some("HTTP/2"));
    assert_eq!(response.version(), Some(Version::Http2_0));

    client.teardown()?;
    Ok(())
}

#[tokio::test]
async fn test_with_headers() -> Result<(), Box<dyn std::error::Error>> {
    let client = MockClient::new();
    client.add_response(
        RequestMatcher::any(),
        MockResponse::new()
            .body("test content 1")
            .header("X-Test", "Test value"),
    );

    let mut response = client.send(get("http://test_url")?).await?;

    assert_eq!(response.iter().count(), 1);
    assert_eq!(header(&response, "x-test").as_deref(), Some("Test value"));
    assert!(header(&response, "content-type").is_none());
    assert_eq!(response.body_string().await?, "test content 1");

    client.teardown()?;
    Ok(())
}

#[tokio::test]
async fn test_multipart_body() -> Result<(), Box<dyn std::error::Error>> {
    let client = MockClient::new();
    client.add_response(
        RequestMatcher::any(),
        MockResponse::new().form_field("key1", "value1"),
    );
    client.add_response(
        RequestMatcher::any(),
        MockResponse::new()
            .file("file1", "content of file 1")
            .boundary(BOUNDARY),
    );
    client.add_response(
        RequestMatcher::any(),
        MockResponse::new()
            .form_field("key1", "value1")
            .file("file1", "content of file 1")
            .boundary(BOUNDARY),
    );

    let mut response = client.send(get("http://test_url")?).await?;
    assert_eq!(response.body_string().await?, "key1=value1");
    assert_eq!(
        header(&response, "content-type").as_deref(),
        Some("application/x-www-form-urlencoded")
    );

    let mut response = client.send(get("http://test_url")?).await?;
    assert_eq!(
        response.body_string().await?,
        "--2256d3a36d2a61a1eba35a22bee5c74a\r\n\
         Content-Disposition: form-data; name=\"file1\"; filename=\"upload\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         content of file 1\r\n\
         --2256d3a36d2a61a1eba35a22bee5c74a--\r\n"
    );

    let mut response = client.send(get("http://test_url")?).await?;
    assert_eq!(
        header(&response, "content-type"),
        Some(format!("multipart/form-data; boundary={BOUNDARY}"))
    );
    assert_eq!(
        response.body_string().await?,
        "--2256d3a36d2a61a1eba35a22bee5c74a\r\n\
         Content-Disposition: form-data; name=\"key1\"\r\n\r\n\
         value1\r\n\
         --2256d3a36d2a61a1eba35a22bee5c74a\r\n\
         Content-Disposition: form-data; name=\"file1\"; filename=\"upload\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         content of file 1\r\n\
         --2256d3a36d2a61a1eba35a22bee5c74a--\r\n"
    );

    client.teardown()?;
    Ok(())
}

#[tokio::test]
async fn test_explicit_multipart_fields_only() -> Result<(), Box<dyn std::error::Error>> {
    let client = MockClient::new();
    client.add_response(
        RequestMatcher::any(),
        MockResponse::new().multipart(Multipart::new("B").field("key1", "value1")),
    );

    let mut response = client.send(get("http://test_url")?).await?;

    assert_eq!(
        response.body_bytes().await?,
        b"--B\r\nContent-Disposition: form-data; name=\"key1\"\r\n\r\nvalue1\r\n--B--\r\n"
    );
    client.teardown()?;
    Ok(())
}

#[tokio::test]
async fn test_requests_json_body() -> Result<(), Box<dyn std::error::Error>> {
    let client = MockClient::new();
    client.add_response(
        RequestMatcher::any().method("GET"),
        MockResponse::new().json(json!(["list content 1", "list content 2"])),
    );
    client.add_response(
        RequestMatcher::any().method("POST"),
        MockResponse::new().json(json!({"key 1": "value 1", "key 2": "value 2"})),
    );
    client.add_response(
        RequestMatcher::any().method("PUT"),
        MockResponse::new().json(json!("string value")),
    );

    let url = Url::parse("http://test_url")?;

    let mut response = client.send(Request::new(Method::Post, url.clone())).await?;
    assert_eq!(
        header(&response, "content-type").as_deref(),
        Some("application/json")
    );
    let value: Value = response.body_json().await?;
    assert_eq!(value, json!({"key 1": "value 1", "key 2": "value 2"}));

    let mut response = client.send(Request::new(Method::Get, url.clone())).await?;
    let value: Value = response.body_json().await?;
    assert_eq!(value, json!(["list content 1", "list content 2"]));

    let mut response = client.send(Request::new(Method::Put, url)).await?;
    let value: Value = response.body_json().await?;
    assert_eq!(value, json!("string value"));

    client.teardown()?;
    Ok(())
}
