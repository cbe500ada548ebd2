//! End-to-end client behaviour against an in-process server.

mod common;

use common::{response, serve};
use corenet::{Client, NetError, PoolLimits, TimeoutConfig, TimeoutPhase};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn client() -> Client {
    Client::builder().trust_env(false).build()
}

#[tokio::test]
async fn test_cookie_reaches_next_request() {
    let server = serve(|req| match req.path() {
        "/login" => response("200 OK", &[("Set-Cookie", "sid=abc123; Path=/")], "ok"),
        _ => response("200 OK", &[], req.header("cookie").unwrap_or("none")),
    })
    .await;
    let client = client();

    client.get(server.url("/login")).send().await.unwrap();
    let echoed = client.get(server.url("/me")).send().await.unwrap();
    assert_eq!(echoed.text().await.unwrap(), "sid=abc123");
    assert_eq!(client.cookies().get("sid", None).unwrap().value, "abc123");

    let overridden = client
        .get(server.url("/me"))
        .header("cookie", "sid=mine")
        .send()
        .await
        .unwrap();
    assert_eq!(overridden.text().await.unwrap(), "sid=mine");
}

#[tokio::test]
async fn test_head_does_not_follow_redirects() {
    let server = serve(|req| match req.path() {
        "/old" => response("301 Moved Permanently", &[("Location", "/new")], ""),
        _ => response("200 OK", &[], ""),
    })
    .await;
    let client = client();

    let head = client.head(server.url("/old")).send().await.unwrap();
    assert_eq!(head.status(), 301);
    assert!(head.history().is_empty());

    let get = client.get(server.url("/old")).send().await.unwrap();
    assert_eq!(get.status(), 200);
    assert_eq!(get.history().len(), 1);
}

#[tokio::test]
async fn test_303_after_post_becomes_get_without_body() {
    let server = serve(|req| match req.path() {
        "/submit" => response("303 See Other", &[("Location", "/result")], ""),
        _ => {
            let summary = format!(
                "{} {} {}",
                req.method,
                req.body.len(),
                req.header("content-length").unwrap_or("-")
            );
            response("200 OK", &[], &summary)
        }
    })
    .await;

    let resp = client()
        .post(server.url("/submit"))
        .body("field=value")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.history().len(), 1);
    assert_eq!(resp.history()[0].status(), 303);
    assert_eq!(resp.request().method(), "GET");
    assert_eq!(resp.text().await.unwrap(), "GET 0 -");
}

#[tokio::test]
async fn test_sequential_requests_reuse_one_connection() {
    let server = serve(|_| response("200 OK", &[], "hello")).await;
    let client = client();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let resp = client.get(server.url("/")).send().await.unwrap();
        ids.push(resp.connection_id());
        assert_eq!(resp.text().await.unwrap(), "hello");
    }
    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(server.accepted(), 1);
    assert_eq!(client.pool().connections_opened(), 1);
}

#[tokio::test]
async fn test_streaming_response() {
    let body = "x".repeat(64 * 1024);
    let expected = body.len();
    let server = serve(move |_| response("200 OK", &[], &body)).await;
    let client = client();

    let mut resp = client.get(server.url("/big")).stream(true).send().await.unwrap();
    let mut total = 0;
    while let Some(chunk) = resp.chunk().await {
        total += chunk.unwrap().len();
    }
    assert_eq!(total, expected);
    assert_eq!(client.pool().idle_count(), 1);
}

#[tokio::test]
async fn test_close_while_waiting_yields_client_closed() {
    let server = serve(|_| response("200 OK", &[], "held")).await;
    let client = Client::builder()
        .trust_env(false)
        .pool_limits(PoolLimits::new(1, 1))
        .build();

    let _held = client.get(server.url("/")).stream(true).send().await.unwrap();
    let waiter = {
        let client = client.clone();
        let url = server.url("/");
        tokio::spawn(async move { client.get(url).send().await })
    };
    while client.pool().pending_acquires() == 0 {
        tokio::task::yield_now().await;
    }

    client.close().await;
    assert!(matches!(waiter.await.unwrap(), Err(NetError::ClientClosed)));
}

#[tokio::test]
async fn test_pool_timeout() {
    let server = serve(|_| response("200 OK", &[], "held")).await;
    let client = Client::builder()
        .trust_env(false)
        .pool_limits(PoolLimits::new(1, 1))
        .build();

    let _held = client.get(server.url("/")).stream(true).send().await.unwrap();
    let err = client
        .get(server.url("/"))
        .timeout(TimeoutConfig::default().pool(Duration::from_millis(50)))
        .send()
        .await
        .unwrap_err();
    assert_eq!(err.timeout_phase(), Some(TimeoutPhase::PoolAcquire));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_per_call_timeout_fails_only_that_call() {
    let slow_hits = Arc::new(AtomicUsize::new(0));
    let hits = slow_hits.clone();
    let server = serve(move |req| {
        if req.path() == "/slow" {
            hits.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
        }
        response("200 OK", &[], "done")
    })
    .await;
    let client = client();

    let err = client
        .get(server.url("/slow"))
        .timeout(TimeoutConfig::default().read(Duration::from_millis(50)))
        .send()
        .await
        .unwrap_err();
    assert_eq!(err.timeout_phase(), Some(TimeoutPhase::Read));

    let ok = client.get(server.url("/fast")).send().await.unwrap();
    assert_eq!(ok.text().await.unwrap(), "done");
    assert_eq!(slow_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scope_closes_pool() {
    let server = serve(|_| response("200 OK", &[], "ok")).await;
    let client = client();
    let url = server.url("/");

    let status = client
        .scope(|c| async move { c.get(url).send().await.map(|r| r.status()) })
        .await
        .unwrap();
    assert_eq!(status, 200);
    assert!(client.pool().is_closed());
    assert!(matches!(
        client.get(server.url("/")).send().await,
        Err(NetError::ClientClosed)
    ));
}

#[cfg(feature = "json")]
#[tokio::test]
async fn test_json_round_trip() {
    let server = serve(|req| {
        let body = String::from_utf8_lossy(&req.body).into_owned();
        response("200 OK", &[("Content-Type", "application/json")], &body)
    })
    .await;

    let value: serde_json::Value = client()
        .post(server.url("/echo"))
        .json(&serde_json::json!({"name": "corenet", "ok": true}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(value["name"], "corenet");
}
