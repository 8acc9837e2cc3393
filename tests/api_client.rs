//! Exercises the HTTP client against a local one-shot responder, covering
//! the wire contract: multipart upload shape, query parameters, health
//! probing, and the typed error for non-2xx answers.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use sightline::api::types::{DetectionResponse, RegisterRequest};
use sightline::settings::ApiSettings;
use sightline::{ApiClient, ApiError, ConnectivityMonitor, Domain};

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn read_request(socket: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return buf;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    buf
}

/// Serves one canned response per accepted connection, in order, and logs
/// every raw request for the test to inspect.
async fn spawn_server(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<Vec<u8>>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_writer = Arc::clone(&log);

    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let request = read_request(&mut socket).await;
            log_writer.lock().await.push(request);

            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), log)
}

fn client_for(base_url: &str) -> ApiClient {
    ApiClient::new(&ApiSettings {
        base_url: base_url.to_string(),
        health_timeout_secs: 2,
        upload_timeout_secs: 5,
    })
}

#[tokio::test]
async fn health_check_is_idempotent_when_healthy() {
    let (base_url, _) = spawn_server(vec![
        (200, r#"{"status": "healthy"}"#),
        (200, r#"{"status": "healthy"}"#),
    ])
    .await;

    let monitor = ConnectivityMonitor::new(client_for(&base_url));
    assert!(monitor.refresh().await);
    assert!(monitor.is_connected());
    assert!(monitor.refresh().await);
    assert!(monitor.is_connected());
}

#[tokio::test]
async fn non_healthy_status_reads_as_disconnected() {
    let (base_url, _) = spawn_server(vec![(200, r#"{"status": "starting"}"#)]).await;
    assert!(!client_for(&base_url).check_health().await);
}

#[tokio::test]
async fn unreachable_server_reads_as_disconnected() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(&format!("http://{}", addr));
    assert!(!client.check_health().await);
}

#[tokio::test]
async fn color_upload_is_multipart_without_confidence() {
    let (base_url, log) = spawn_server(vec![(
        200,
        r##"{"success": true, "data": {"name": "Red", "hex": "#FF0000"}}"##,
    )])
    .await;

    let response = client_for(&base_url)
        .detect(Domain::Color, b"fakejpeg".to_vec(), "frame.jpg")
        .await
        .unwrap();

    match response {
        DetectionResponse::Color(color) => assert_eq!(color.data.unwrap().name, "Red"),
        other => panic!("unexpected variant: {:?}", other),
    }

    let log = log.lock().await;
    let request = String::from_utf8_lossy(&log[0]);
    assert!(request.starts_with("POST /detect-color-simple HTTP/1.1"));
    assert!(!request.contains("confidence"));
    assert!(request.contains("multipart/form-data"));
    assert!(request.contains(r#"name="file""#));
    assert!(request.contains(r#"filename="frame.jpg""#));
    assert!(request.contains("image/jpeg"));
}

#[tokio::test]
async fn currency_upload_carries_confidence_query() {
    let (base_url, log) = spawn_server(vec![(
        200,
        r#"{"success": true, "detections": [{"class": "500", "confidence": 0.9}]}"#,
    )])
    .await;

    client_for(&base_url)
        .detect(Domain::Currency, b"fakejpeg".to_vec(), "frame.jpg")
        .await
        .unwrap();

    let log = log.lock().await;
    let request = String::from_utf8_lossy(&log[0]);
    assert!(request.starts_with("POST /detect-currency?confidence=0.5 HTTP/1.1"));
}

#[tokio::test]
async fn non_2xx_yields_typed_status_error() {
    let (base_url, _) = spawn_server(vec![(500, "boom")]).await;

    let err = client_for(&base_url)
        .detect(Domain::Object, b"fakejpeg".to_vec(), "frame.jpg")
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn register_person_posts_json() {
    let (base_url, log) = spawn_server(vec![(
        200,
        r#"{"success": true, "name": "Ayesha", "num_embeddings": 5}"#,
    )])
    .await;

    let response = client_for(&base_url)
        .register_person(&RegisterRequest {
            name: "Ayesha".into(),
            images: vec!["aGVsbG8=".into(); 3],
        })
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.num_embeddings, Some(5));

    let log = log.lock().await;
    let request = String::from_utf8_lossy(&log[0]);
    assert!(request.starts_with("POST /api/person/register HTTP/1.1"));
    assert!(request.contains(r#""images""#));
}
