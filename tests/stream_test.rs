//! Integration tests for partial-content playback.

mod common;

use common::{get_range, header, payload, upload_ok, TestHarness};

#[tokio::test]
async fn windows_over_a_250k_asset() {
    let (_h, addr) = TestHarness::with_server().await;
    let data = payload(250_000);
    let id = upload_ok(addr, data.clone()).await;

    let resp = get_range(addr, &id, Some("bytes=0-")).await;
    assert_eq!(resp.status(), 206);
    assert_eq!(header(&resp, "content-range"), "bytes 0-99999/250000");
    assert_eq!(header(&resp, "content-length"), "100000");
    assert_eq!(header(&resp, "accept-ranges"), "bytes");
    assert_eq!(header(&resp, "content-type"), "video/mp4");
    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], &data[..100_000]);

    let resp = get_range(addr, &id, Some("bytes=200000-")).await;
    assert_eq!(resp.status(), 206);
    assert_eq!(header(&resp, "content-range"), "bytes 200000-249999/250000");
    assert_eq!(header(&resp, "content-length"), "50000");
    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], &data[200_000..]);

    let resp = get_range(addr, &id, Some("bytes=250000-")).await;
    assert_eq!(resp.status(), 416);
    assert_eq!(header(&resp, "content-range"), "bytes */250000");
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "unsatisfiable_range");
}

#[tokio::test]
async fn sequential_windows_reconstruct_the_upload() {
    let (_h, addr) = TestHarness::with_server().await;
    let data = payload(345_678);
    let id = upload_ok(addr, data.clone()).await;

    let mut rebuilt = Vec::with_capacity(data.len());
    let mut requests = 0;
    loop {
        let resp = get_range(addr, &id, Some(&format!("bytes={}-", rebuilt.len()))).await;
        assert_eq!(resp.status(), 206);
        let body = resp.bytes().await.unwrap();
        assert!(!body.is_empty());
        rebuilt.extend_from_slice(&body);
        requests += 1;
        if rebuilt.len() == data.len() {
            break;
        }
    }

    assert_eq!(requests, 4);
    assert_eq!(rebuilt, data);
}

#[tokio::test]
async fn repeated_requests_return_identical_bytes() {
    let (_h, addr) = TestHarness::with_server().await;
    let id = upload_ok(addr, payload(150_000)).await;

    let first = get_range(addr, &id, Some("bytes=12345-")).await;
    let first_range = header(&first, "content-range").to_string();
    let first = first.bytes().await.unwrap();

    let second = get_range(addr, &id, Some("bytes=12345-")).await;
    assert_eq!(header(&second, "content-range"), first_range);
    let second = second.bytes().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first_range, "bytes 12345-112344/150000");
}

#[tokio::test]
async fn requested_end_does_not_change_the_window() {
    let (_h, addr) = TestHarness::with_server().await;
    let id = upload_ok(addr, payload(150_000)).await;

    let resp = get_range(addr, &id, Some("bytes=0-10")).await;
    assert_eq!(resp.status(), 206);
    assert_eq!(header(&resp, "content-range"), "bytes 0-99999/150000");
}

#[tokio::test]
async fn last_byte_window() {
    let (h, addr) = TestHarness::with_server().await;
    h.seed("tail", b"abcdef");

    let resp = get_range(addr, "tail", Some("bytes=5-")).await;
    assert_eq!(resp.status(), 206);
    assert_eq!(header(&resp, "content-range"), "bytes 5-5/6");
    assert_eq!(&resp.bytes().await.unwrap()[..], b"f");
}

#[tokio::test]
async fn missing_range_is_rejected() {
    let (h, addr) = TestHarness::with_server().await;
    h.seed("present", b"data");

    let resp = get_range(addr, "present", None).await;
    assert_eq!(resp.status(), 400);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "missing_range");
    assert!(json["request_id"].is_string());
}

#[tokio::test]
async fn malformed_ranges_are_rejected() {
    let (h, addr) = TestHarness::with_server().await;
    h.seed("present", b"data");

    for range in ["items=0-", "bytes=abc-", "bytes=0-1,5-6", "bytes=-500", "bytes"] {
        let resp = get_range(addr, "present", Some(range)).await;
        assert_eq!(resp.status(), 400, "range {range:?}");
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["code"], "malformed_range", "range {range:?}");
    }
}

#[tokio::test]
async fn unknown_video_is_404() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = get_range(addr, "does-not-exist", Some("bytes=0-")).await;
    assert_eq!(resp.status(), 404);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn traversal_identifiers_are_rejected() {
    let (_h, addr) = TestHarness::with_server().await;
    for id in ["../Cargo", "a/b", ".hidden", ""] {
        let resp = get_range(addr, id, Some("bytes=0-")).await;
        assert_eq!(resp.status(), 400, "id {id:?}");
    }
}

#[tokio::test]
async fn empty_asset_cannot_be_ranged() {
    let (h, addr) = TestHarness::with_server().await;
    h.seed("empty", b"");

    let resp = get_range(addr, "empty", Some("bytes=0-")).await;
    assert_eq!(resp.status(), 416);
    assert_eq!(header(&resp, "content-range"), "bytes */0");
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "empty_asset");
}

#[tokio::test]
async fn configured_window_size_is_honored() {
    let mut config = vs_core::config::Config::default();
    config.streaming.max_chunk_bytes = 4096;
    config.streaming.read_buffer_bytes = 1024;
    let (_h, addr) = TestHarness::with_server_config(config).await;
    let data = payload(10_000);
    let id = upload_ok(addr, data.clone()).await;

    let resp = get_range(addr, &id, Some("bytes=8192-")).await;
    assert_eq!(header(&resp, "content-range"), "bytes 8192-9999/10000");
    assert_eq!(&resp.bytes().await.unwrap()[..], &data[8192..]);
}

#[tokio::test]
async fn api_prefix_streams_too() {
    let (h, addr) = TestHarness::with_server().await;
    h.seed("aliased", b"0123456789");

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/api/videos?videoId=aliased"))
        .header("range", "bytes=3-")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(&resp.bytes().await.unwrap()[..], b"3456789");
}

#[tokio::test]
async fn cors_exposes_range_headers() {
    let (h, addr) = TestHarness::with_server().await;
    h.seed("cors", b"0123456789");

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/videos?videoId=cors"))
        .header("range", "bytes=0-")
        .header("origin", "http://player.example")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(header(&resp, "access-control-allow-origin"), "*");
    let exposed = header(&resp, "access-control-expose-headers").to_ascii_lowercase();
    assert!(exposed.contains("content-range"));
}

#[tokio::test]
async fn health_endpoint() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}
