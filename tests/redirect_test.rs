mod common;

use common::{response, serve, TestServer};
use corenet::{Auth, Client, NetError};

fn client(max_redirects: usize) -> Client {
    Client::builder()
        .trust_env(false)
        .max_redirects(max_redirects)
        .build()
}

/// `/hop/N` redirects to `/hop/N+1` until `hops`, then answers 200.
async fn hop_server(hops: usize) -> TestServer {
    serve(move |req| {
        let n: usize = req
            .path()
            .trim_start_matches("/hop/")
            .parse()
            .unwrap_or(0);
        if n < hops {
            let next = format!("/hop/{}", n + 1);
            response("302 Found", &[("Location", next.as_str())], "")
        } else {
            response("200 OK", &[], "arrived")
        }
    })
    .await
}

#[tokio::test]
async fn test_exactly_max_redirects_succeeds() {
    let server = hop_server(5).await;
    let resp = client(5).get(server.url("/hop/0")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.history().len(), 5);
    let paths: Vec<_> = resp.history().iter().map(|r| r.url().path().to_string()).collect();
    assert_eq!(paths, ["/hop/0", "/hop/1", "/hop/2", "/hop/3", "/hop/4"]);
    assert_eq!(resp.text().await.unwrap(), "arrived");
}

#[tokio::test]
async fn test_one_hop_over_limit_fails() {
    let server = hop_server(6).await;
    let err = client(5).get(server.url("/hop/0")).send().await.unwrap_err();

    assert!(err.is_redirect());
    match err {
        NetError::TooManyRedirects {
            max_redirects,
            history,
            ..
        } => {
            assert_eq!(max_redirects, 5);
            assert_eq!(history.len(), 6);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_redirect_loop() {
    let server = serve(|req| {
        let to = if req.path() == "/a" { "/b" } else { "/a" };
        response("302 Found", &[("Location", to)], "")
    })
    .await;
    let err = client(20).get(server.url("/a")).send().await.unwrap_err();
    assert!(matches!(err, NetError::RedirectLoop { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_redirect_hops_share_connection() {
    let server = hop_server(3).await;
    let client = client(10);
    client.get(server.url("/hop/0")).send().await.unwrap();
    assert_eq!(server.accepted(), 1);
}

#[tokio::test]
async fn test_cross_origin_redirect_strips_auth() {
    let target = serve(|req| {
        response("200 OK", &[], req.header("authorization").unwrap_or("anonymous"))
    })
    .await;
    let landing = target.url("/landing");
    let origin = serve(move |req| match req.path() {
        "/same" => response("302 Found", &[("Location", "/echo")], ""),
        "/echo" => response("200 OK", &[], req.header("authorization").unwrap_or("anonymous")),
        _ => response("302 Found", &[("Location", landing.as_str())], ""),
    })
    .await;

    let client = Client::builder()
        .trust_env(false)
        .auth(Auth::basic("user", "pass"))
        .build();

    let same = client.get(origin.url("/same")).send().await.unwrap();
    assert_eq!(same.text().await.unwrap(), "Basic dXNlcjpwYXNz");

    let cross = client.get(origin.url("/away")).send().await.unwrap();
    assert_eq!(cross.history().len(), 1);
    assert_eq!(cross.text().await.unwrap(), "anonymous");
}
