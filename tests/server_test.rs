use std::{sync::Arc, time::Duration};

use anyhow::Result;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use routeway::{
    config::CorsConfig,
    constants::data_keys::IDENTITY,
    features::auth::{Identity, JwtValidator},
    middleware::{auth::bearer, cors::cors, logger::logger, recover::recover, request_id::request_id},
    serve, FrozenRouter, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::oneshot};

fn app(jwt: Arc<JwtValidator>) -> FrozenRouter {
    let mut router = Router::new();
    router
        .use_middleware(recover())
        .use_middleware(request_id())
        .use_middleware(logger())
        .use_middleware(cors(CorsConfig::default()));

    router.get("/health", |ctx| ctx.respond_ok(&json!({"status": "ok"})));
    router.get("/panic", |_ctx| panic!("This is a panic test"));
    router.get("/slow/:ms", |ctx| {
        let ms: u64 = ctx.param("ms").and_then(|v| v.parse().ok()).unwrap_or(0);
        std::thread::sleep(Duration::from_millis(ms));
        ctx.respond_ok(&ms);
    });
    router.post("/echo", |ctx| {
        let body = String::from_utf8_lossy(ctx.body()).into_owned();
        ctx.respond_ok(&json!({"len": body.len(), "body": body}));
    });
    {
        let mut api = router.group("/api");
        api.use_middleware(bearer(jwt, IDENTITY));
        api.get("/me", |ctx| {
            let identity = ctx.get::<Identity>(IDENTITY).cloned();
            ctx.respond_ok(&identity);
        });
    }
    router.freeze()
}

/// Serves `router` on an ephemeral port; dropping the sender stops it.
async fn spawn(router: FrozenRouter, max_body_size: usize) -> Result<(String, oneshot::Sender<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(serve(listener, router, max_body_size, async move {
        let _ = rx.await;
    }));
    Ok((base_url, tx))
}

#[tokio::test]
async fn test_end_to_end() -> Result<()> {
    let jwt = Arc::new(JwtValidator::new(b"e2e-secret"));
    let (base_url, _shutdown) = spawn(app(Arc::clone(&jwt)), 1024).await?;
    let client = Client::new();

    println!("--- TESTING: health ---");
    let res = client.get(format!("{base_url}/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.json::<Value>().await?, json!({"status": "ok"}));

    println!("--- TESTING: request id propagation ---");
    let res = client
        .get(format!("{base_url}/health"))
        .header("X-Request-ID", "trace-me")
        .send()
        .await?;
    assert_eq!(res.headers()["x-request-id"], "trace-me");

    println!("--- TESTING: panic recovery ---");
    let res = client.get(format!("{base_url}/panic")).send().await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await?;
    assert!(body["error"].as_str().unwrap().contains("Error ID: "));
    let res = client.get(format!("{base_url}/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    println!("--- TESTING: CORS preflight ---");
    let res = client
        .request(reqwest::Method::OPTIONS, format!("{base_url}/api/me"))
        .header("Origin", "https://app.example")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");

    println!("--- TESTING: bearer auth ---");
    let res = client.get(format!("{base_url}/api/me")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let token = jwt.issue("alice", &["user".to_string()], Duration::from_secs(60))?;
    let res = client.get(format!("{base_url}/api/me")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["user_id"], "alice");

    println!("--- TESTING: body limits ---");
    let res = client.post(format!("{base_url}/echo")).body("hello").send().await?;
    assert_eq!(res.json::<Value>().await?, json!({"len": 5, "body": "hello"}));
    let res = client.post(format!("{base_url}/echo")).body(vec![b'x'; 4096]).send().await?;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    println!("--- TESTING: not found ---");
    let res = client.get(format!("{base_url}/nowhere")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await?, json!({"error": "404 page not found"}));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_handlers_do_not_serialize_requests() -> Result<()> {
    let (base_url, _shutdown) = spawn(app(Arc::new(JwtValidator::new(b"s"))), 1024).await?;
    let client = Client::new();

    let started = std::time::Instant::now();
    let requests = (0..8).map(|_| {
        let client = client.clone();
        let url = format!("{base_url}/slow/200");
        async move { client.get(url).send().await }
    });
    for res in join_all(requests).await {
        assert_eq!(res?.status(), StatusCode::OK);
    }
    // eight 200ms handlers on the blocking pool finish well under 8 * 200ms
    assert!(started.elapsed() < Duration::from_millis(1200));
    Ok(())
}

#[tokio::test]
async fn test_unguarded_panic_is_contained_by_host() -> Result<()> {
    let mut router = Router::new();
    router.get("/panic", |_ctx| panic!("no recover installed"));
    router.get("/ok", |ctx| ctx.respond_ok(&"fine"));
    let (base_url, _shutdown) = spawn(router.freeze(), 1024).await?;
    let client = Client::new();

    let res = client.get(format!("{base_url}/panic")).send().await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await?;
    assert!(body["error"].as_str().unwrap().starts_with("Something went wrong. Error ID: "));

    let res = client.get(format!("{base_url}/ok")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}
