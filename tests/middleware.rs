//! Middleware ordering, panic recovery and the concurrency limiter.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::http::{Method, StatusCode};
use switchyard::middleware::{recover, ConcurrencyLimiter};
use switchyard::{handler_fn, Core, Error, Routes};
use tokio::sync::Notify;

mod common;
use common::{body_string, request, EventLog};

#[tokio::test]
async fn test_first_middleware_is_outermost() {
    let log = EventLog::default();
    let mut core = Core::new();
    core.add(
        Method::GET,
        "/",
        log.handler(),
        vec![log.middleware("A"), log.middleware("B")],
    );

    let res = core.serve(request(Method::GET, "/")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        log.events(),
        ["A-before", "B-before", "H", "B-after", "A-after"]
    );
}

#[tokio::test]
async fn test_global_then_group_then_route_order() {
    let log = EventLog::default();
    let mut core = Core::new();
    core.use_middleware([log.middleware("G")]);
    {
        let mut group = core.group("/g", vec![log.middleware("P")]);
        group.add(Method::GET, "/x", log.handler(), vec![log.middleware("R")]);
    }

    core.serve(request(Method::GET, "/g/x")).await;
    assert_eq!(
        log.events(),
        ["G-before", "P-before", "R-before", "H", "R-after", "P-after", "G-after"]
    );
}

#[tokio::test]
async fn test_global_middleware_skips_builtin_fallbacks() {
    let log = EventLog::default();
    let mut core = Core::new();
    core.use_middleware([log.middleware("G")]);
    core.post("/only-post", log.handler());

    let res = core.serve(request(Method::GET, "/missing")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = core.serve(request(Method::GET, "/only-post")).await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn test_global_middleware_wraps_configured_fallbacks() {
    let log = EventLog::default();
    let mut core = Core::new();
    core.use_middleware([log.middleware("G")]);
    core.not_found_handler(log.handler());
    core.method_not_allowed_handler(log.handler());
    core.post("/only-post", handler_fn(|c| Box::pin(async move { c.no_content(StatusCode::OK) })));

    core.serve(request(Method::GET, "/missing")).await;
    assert_eq!(log.events(), ["G-before", "H", "G-after"]);

    core.serve(request(Method::GET, "/only-post")).await;
    assert_eq!(
        log.events(),
        ["G-before", "H", "G-after", "G-before", "H", "G-after"]
    );
}

#[tokio::test]
async fn test_recover_covers_configured_not_found_handler() {
    let mut core = Core::new();
    core.use_middleware([recover()]);
    core.not_found_handler(handler_fn(|_| Box::pin(async move { panic!("lost page") })));

    let res = core.serve(request(Method::GET, "/nope")).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(res).await, "Internal Server Error");
}

#[tokio::test]
async fn test_middleware_can_short_circuit() {
    let log = EventLog::default();
    let mut core = Core::new();
    let deny = switchyard::middleware_fn(|c, _next| {
        Box::pin(async move { c.string(StatusCode::FORBIDDEN, "denied") })
    });
    core.add(Method::GET, "/admin", log.handler(), vec![deny]);

    let res = core.serve(request(Method::GET, "/admin")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(log.events().is_empty());
}

fn panicking_core() -> Core {
    let mut core = Core::new();
    core.use_middleware([recover()]);
    core.get(
        "/str",
        handler_fn(|_| Box::pin(async move { panic!("string payload") })),
    );
    core.get(
        "/error",
        handler_fn(|_| {
            Box::pin(async move {
                std::panic::panic_any(Error::other("error payload"));
            })
        }),
    );
    core.get(
        "/other",
        handler_fn(|_| Box::pin(async move { std::panic::panic_any(7_i32) })),
    );
    core.get(
        "/fine",
        handler_fn(|c| Box::pin(async move { c.string(StatusCode::OK, "fine") })),
    );
    core
}

#[tokio::test]
async fn test_recover_turns_panics_into_500() {
    let core = panicking_core();

    for path in ["/str", "/error", "/other"] {
        let res = core.serve(request(Method::GET, path)).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        let body = body_string(res).await;
        assert_eq!(body, "Internal Server Error", "{path}");
    }

    // The core keeps serving afterwards and the contexts made it back.
    let res = core.serve(request(Method::GET, "/fine")).await;
    assert_eq!(body_string(res).await, "fine");
    assert!(core.pool().idle() >= 1);
}

fn limited_core(max: usize, gate: Arc<Notify>, entered: Arc<Notify>) -> Core {
    let limiter = ConcurrencyLimiter::new(max);
    let mut core = Core::new();
    core.use_middleware([limiter.middleware()]);
    core.get(
        "/work",
        handler_fn(move |c| {
            let gate = Arc::clone(&gate);
            let entered = Arc::clone(&entered);
            Box::pin(async move {
                entered.notify_one();
                gate.notified().await;
                c.string(StatusCode::OK, "done")
            })
        }),
    );
    core.get(
        "/quick",
        handler_fn(|c| Box::pin(async move { c.string(StatusCode::OK, "quick") })),
    );
    core
}

fn from_client(method: Method, uri: &str, addr: &str) -> axum::http::Request<axum::body::Body> {
    let mut req = request(method, uri);
    let addr: SocketAddr = addr.parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

#[tokio::test]
async fn test_limiter_rejects_concurrent_request_then_recovers() {
    let gate = Arc::new(Notify::new());
    let entered = Arc::new(Notify::new());
    let core = Arc::new(limited_core(1, Arc::clone(&gate), Arc::clone(&entered)));

    let first = {
        let core = Arc::clone(&core);
        tokio::spawn(async move {
            core.serve(from_client(Method::GET, "/work", "10.1.1.1:4000")).await
        })
    };
    entered.notified().await;

    let res = core
        .serve(from_client(Method::GET, "/quick", "10.1.1.1:4001"))
        .await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let other_client = core
        .serve(from_client(Method::GET, "/quick", "10.1.1.2:4000"))
        .await;
    assert_eq!(other_client.status(), StatusCode::OK);

    gate.notify_one();
    let res = tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(body_string(res).await, "done");

    let res = core
        .serve(from_client(Method::GET, "/quick", "10.1.1.1:4002"))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_limiter_disabled_or_unknown_client_passes() {
    let gate = Arc::new(Notify::new());
    let entered = Arc::new(Notify::new());
    let core = limited_core(0, gate, entered);

    let res = core
        .serve(from_client(Method::GET, "/quick", "10.1.1.1:4000"))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let gate = Arc::new(Notify::new());
    let entered = Arc::new(Notify::new());
    let core = limited_core(1, gate, entered);
    let res = core.serve(request(Method::GET, "/quick")).await;
    assert_eq!(res.status(), StatusCode::OK);
}
