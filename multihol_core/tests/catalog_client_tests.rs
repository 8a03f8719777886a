//! HTTP catalog client against a local one-shot server

use multihol_core::catalog::{
    CatalogConfig, CatalogError, CatalogService, HoldingDisposition, HttpCatalogClient,
};
use multihol_core::security::SecureString;
use multihol_test_utils::ItemBuilder;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve one canned response and hand back the raw request
async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: &'static str,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/almaws/v1", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        let _ = tx.send(request);
    });

    (base_url, rx)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&data).into_owned()
}

fn client(base_url: String) -> HttpCatalogClient {
    let config = CatalogConfig {
        base_url,
        timeout: Duration::from_secs(5),
        min_request_interval: Duration::ZERO,
    };
    HttpCatalogClient::new(config, &SecureString::new("l8xx-test-key\n")).unwrap()
}

#[tokio::test]
async fn test_fetch_holding_sends_key_and_accepts_xml() {
    let (base_url, request) = serve_once("200 OK", "application/xml", "<holding/>").await;

    let xml = client(base_url)
        .fetch_holding("990006489880203339", "22312549980003339")
        .await
        .unwrap();
    let request = request.await.unwrap().to_lowercase();

    assert_eq!(xml, "<holding/>");
    assert!(request.starts_with(
        "get /almaws/v1/bibs/990006489880203339/holdings/22312549980003339 http/1.1"
    ));
    assert!(request.contains("authorization: apikey l8xx-test-key\r\n"));
    assert!(request.contains("accept: application/xml"));
}

#[tokio::test]
async fn test_fetch_items_pages_all_holdings() {
    let body = r#"{"item":[{"item_data":{"barcode":"A0001"}}],"total_record_count":106}"#;
    let (base_url, request) = serve_once("200 OK", "application/json", body).await;

    let page = client(base_url)
        .fetch_items("990006489880203339", 100, 100)
        .await
        .unwrap();
    let request = request.await.unwrap();

    assert_eq!(page.total_record_count, 106);
    assert_eq!(page.items[0].barcode(), "A0001");
    assert!(request.starts_with(
        "GET /almaws/v1/bibs/990006489880203339/holdings/ALL/items?limit=100&offset=100 "
    ));
}

#[tokio::test]
async fn test_delete_passes_holding_disposition() {
    let (base_url, request) = serve_once("204 No Content", "application/json", "").await;

    let mut item = ItemBuilder::new("A0001").build();
    item.link = format!("{base_url}/bibs/99/holdings/22/items/23");

    client(base_url)
        .delete_item(&item, HoldingDisposition::Retain)
        .await
        .unwrap();
    let request = request.await.unwrap();

    assert!(request.starts_with("DELETE /almaws/v1/bibs/99/holdings/22/items/23?holdings=retain "));
}

#[tokio::test]
async fn test_create_posts_full_record() {
    let (base_url, request) = serve_once(
        "200 OK",
        "application/json",
        r#"{"item_data":{"barcode":"A0001"}}"#,
    )
    .await;

    let item = ItemBuilder::new("A0001")
        .extra("enumeration_a", serde_json::json!("219"))
        .build();

    let created = client(base_url)
        .create_item("99", "22", &item)
        .await
        .unwrap();
    let request = request.await.unwrap();

    assert_eq!(created.barcode(), "A0001");
    assert!(request.starts_with("POST /almaws/v1/bibs/99/holdings/22/items "));
    assert!(request.contains(r#""enumeration_a":"219""#));
}

#[tokio::test]
async fn test_error_body_is_decoded() {
    let body = r#"{"errorsExist":true,"errorList":{"error":[{"errorCode":"401873","errorMessage":"Barcode exists"}]}}"#;
    let (base_url, _request) = serve_once("400 Bad Request", "application/json", body).await;

    let item = ItemBuilder::new("A0001").build();
    let error = client(base_url)
        .create_item("99", "22", &item)
        .await
        .unwrap_err();

    assert_eq!(error, CatalogError::api(400, "401873", "Barcode exists"));
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/almaws/v1", listener.local_addr().unwrap());
    drop(listener);

    let error = client(base_url)
        .fetch_holding("99", "22")
        .await
        .unwrap_err();

    assert!(matches!(error, CatalogError::Transport { .. }));
}
