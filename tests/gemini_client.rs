//! `GeminiClient` against a one-shot local HTTP server.
//!
//! Each test binds an ephemeral port, answers exactly one request with a
//! canned response, and hands back what the client sent.

use edgequake_bgswap::prompts::REMOVE_BACKGROUND_PROMPT;
use edgequake_bgswap::{
    GeminiClient, HexColor, ImageArtifact, ImageTransformer, Operation, StudioConfig,
};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct Captured {
    head: String,
    body: Value,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Serve one request; returns the base URL and a handle to the captured request.
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];

        let head_end = loop {
            let n = sock.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
        let len = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < head_end + len {
            let n = sock.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body = serde_json::from_slice(&buf[head_end..head_end + len]).unwrap();

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        sock.write_all(response.as_bytes()).await.unwrap();
        sock.shutdown().await.ok();

        Captured {
            head,
            body: request_body,
        }
    });

    (format!("http://{addr}/v1beta"), handle)
}

fn client(base_url: &str) -> GeminiClient {
    let config = StudioConfig::builder()
        .base_url(base_url)
        .model("test-model")
        .api_timeout_secs(10)
        .build()
        .unwrap();
    GeminiClient::new("test-key", &config).unwrap()
}

fn photo() -> ImageArtifact {
    ImageArtifact::new(b"photo".to_vec(), "image/jpeg")
}

fn image_response(data: &[u8], mime: &str) -> String {
    use base64::Engine;
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [
                { "inlineData": { "mimeType": mime, "data": base64::engine::general_purpose::STANDARD.encode(data) } }
            ]}
        }]
    })
    .to_string()
}

#[tokio::test]
async fn remove_background_round_trip() {
    let (base, server) = serve_once("200 OK", image_response(b"cutout", "image/png")).await;

    let result = client(&base).remove_background(&photo()).await.unwrap();
    let image = result.expect("image returned");
    assert_eq!(image.bytes(), b"cutout");
    assert_eq!(image.media_type(), "image/png");

    let captured = server.await.unwrap();
    assert!(captured
        .head
        .starts_with("post /v1beta/models/test-model:generatecontent http/1.1"));
    assert!(captured.head.contains("x-goog-api-key: test-key"));

    let parts = &captured.body["contents"][0]["parts"];
    assert_eq!(captured.body["contents"][0]["role"], "user");
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(parts[0]["inlineData"]["data"], "cGhvdG8=");
    assert_eq!(parts[1]["text"], REMOVE_BACKGROUND_PROMPT);
    assert_eq!(captured.body["generationConfig"]["responseModalities"], json!(["IMAGE"]));
}

#[tokio::test]
async fn color_instruction_names_the_color() {
    let (base, server) = serve_once("200 OK", image_response(b"final", "image/png")).await;

    let color = HexColor::parse("#00FF00").unwrap();
    let result = client(&base).composite_onto_color(&photo(), &color).await.unwrap();
    assert!(result.is_some());

    let captured = server.await.unwrap();
    let parts = captured.body["contents"][0]["parts"].as_array().unwrap().clone();
    assert_eq!(parts.len(), 2);
    let instruction = parts[1]["text"].as_str().unwrap();
    assert!(instruction.contains("#00ff00"));
    assert!(!instruction.contains("{color}"));
}

#[tokio::test]
async fn composite_sends_subject_then_background() {
    let (base, server) = serve_once("200 OK", image_response(b"final", "image/png")).await;

    let subject = ImageArtifact::new(b"subject".to_vec(), "image/png");
    let background = ImageArtifact::new(b"scene".to_vec(), "image/jpeg");
    client(&base)
        .composite_onto_image(&subject, &background)
        .await
        .unwrap();

    let captured = server.await.unwrap();
    let parts = &captured.body["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
    assert!(parts[2]["text"].is_string());
}

#[tokio::test]
async fn text_only_answer_is_no_image() {
    let body = json!({
        "candidates": [{ "content": { "parts": [{ "text": "I cannot edit this photo." }] } }]
    })
    .to_string();
    let (base, server) = serve_once("200 OK", body).await;

    let result = client(&base).cartoonify(&photo()).await.unwrap();
    assert!(result.is_none());
    server.await.unwrap();
}

#[tokio::test]
async fn http_error_is_transport_failure() {
    let body = json!({ "error": { "code": 500, "message": "internal" } }).to_string();
    let (base, server) = serve_once("500 Internal Server Error", body).await;

    let err = client(&base).remove_background(&photo()).await.unwrap_err();
    assert!(err.is_transport_failure());
    let msg = err.to_string();
    assert!(msg.starts_with("remove-background request failed"), "{msg}");
    assert!(msg.contains("500"), "{msg}");
    assert!(!err.is_soft_failure());
    server.await.unwrap();
}

#[tokio::test]
async fn malformed_body_is_transport_failure() {
    let (base, server) = serve_once("200 OK", "not json".to_string()).await;

    let err = client(&base).cartoonify(&photo()).await.unwrap_err();
    assert!(matches!(
        err,
        edgequake_bgswap::BgSwapError::RemoteTransportFailure {
            operation: Operation::Cartoonify,
            ..
        }
    ));
    server.await.unwrap();
}
