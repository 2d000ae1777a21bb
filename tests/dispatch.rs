//! Request resolution through the dispatch core.

use axum::http::{header, Method, StatusCode};
use switchyard::error::RouteError;
use switchyard::http::mime;
use switchyard::{handler_fn, Core, Error, HttpError, Routes};

mod common;
use common::{body_string, request, text};

fn users_core() -> Core {
    let mut core = Core::new();
    core.get(
        "/users/{id}",
        handler_fn(|c| {
            Box::pin(async move {
                let id = c.param("id").unwrap_or_default().to_string();
                c.string(StatusCode::OK, format!("get {id}"))
            })
        }),
    );
    core.post(
        "/users/{id}",
        handler_fn(|c| {
            Box::pin(async move {
                let id = c.param("id").unwrap_or_default().to_string();
                c.string(StatusCode::CREATED, format!("post {id}"))
            })
        }),
    );
    core
}

#[tokio::test]
async fn test_method_selects_route_and_extracts_param() {
    let core = users_core();

    let res = core.serve(request(Method::GET, "/users/42")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(res).await, "get 42");

    let res = core.serve(request(Method::POST, "/users/42")).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(body_string(res).await, "post 42");
}

#[tokio::test]
async fn test_unregistered_method_is_405() {
    let core = users_core();
    let res = core.serve(request(Method::PUT, "/users/42")).await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_string(res).await, "");
}

#[tokio::test]
async fn test_configured_method_not_allowed_handler() {
    let mut core = users_core();
    core.method_not_allowed_handler(handler_fn(|c| {
        Box::pin(async move { c.string(StatusCode::METHOD_NOT_ALLOWED, "try GET or POST") })
    }));

    let res = core.serve(request(Method::DELETE, "/users/1")).await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_string(res).await, "try GET or POST");
}

#[tokio::test]
async fn test_unknown_path_uses_default_404() {
    let core = users_core();
    let res = core.serve(request(Method::GET, "/nope")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        mime::MIME_TEXT_PLAIN_CHARSET_UTF8
    );
    assert_eq!(body_string(res).await, "404 page not found");
}

#[tokio::test]
async fn test_configured_not_found_handler_also_serves_sentinel() {
    let mut core = Core::new();
    core.not_found_handler(handler_fn(|c| {
        Box::pin(async move { c.html(StatusCode::NOT_FOUND, "<h1>missing</h1>") })
    }));
    core.get(
        "/articles/{slug}",
        handler_fn(|_| Box::pin(async move { Err(Error::NotFound) })),
    );

    let res = core.serve(request(Method::GET, "/nope")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(res).await, "<h1>missing</h1>");

    let res = core.serve(request(Method::GET, "/articles/draft")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(res).await, "<h1>missing</h1>");
}

#[tokio::test]
async fn test_duplicate_name_keeps_first_route_live() {
    let mut core = Core::new();
    assert!(core.get("/first", text("first")).name("home").build().is_ok());

    let err = core
        .get("/second", text("second"))
        .name("home")
        .build()
        .unwrap_err();
    assert_eq!(err, RouteError::DuplicateName("home".into()));

    let res = core.serve(request(Method::GET, "/first")).await;
    assert_eq!(body_string(res).await, "first");

    let res = core.serve(request(Method::GET, "/second")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    assert_eq!(core.check_routes().unwrap_err().len(), 1);
}

#[tokio::test]
async fn test_first_registered_route_wins() {
    let mut core = Core::new();
    core.get("/files/{name}", text("generic"));
    core.get("/files/readme", text("specific"));

    let res = core.serve(request(Method::GET, "/files/readme")).await;
    assert_eq!(body_string(res).await, "generic");
}

#[tokio::test]
async fn test_custom_pattern_constrains_match() {
    let mut core = Core::new();
    core.get("/items/{id:[0-9]+}", text("numeric"));
    core.get("/items/{slug}", text("slug"));

    let res = core.serve(request(Method::GET, "/items/17")).await;
    assert_eq!(body_string(res).await, "numeric");

    let res = core.serve(request(Method::GET, "/items/seventeen")).await;
    assert_eq!(body_string(res).await, "slug");
}

#[tokio::test]
async fn test_broken_pattern_never_matches() {
    let mut core = Core::new();
    let err = core.get("/a/{id/b", text("never")).build().unwrap_err();
    assert!(matches!(err, RouteError::Pattern { .. }));

    let res = core.serve(request(Method::GET, "/a/1/b")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_groups_share_prefix_and_names() {
    let mut core = Core::new();
    {
        let mut api = core.group("/api/", vec![]);
        api.get("/status", text("ok")).name("status");
        let mut v2 = api.group("v2", vec![]);
        v2.get("{id}", text("v2")).name("v2-item");
    }

    let res = core.serve(request(Method::GET, "/api/status")).await;
    assert_eq!(body_string(res).await, "ok");

    let res = core.serve(request(Method::GET, "/api/v2/9")).await;
    assert_eq!(body_string(res).await, "v2");

    assert_eq!(core.url("v2-item", &["9"]).unwrap(), "/api/v2/9");

    let err = core.get("/elsewhere", text("x")).name("status").build().unwrap_err();
    assert_eq!(err, RouteError::DuplicateName("status".into()));
}

#[tokio::test]
async fn test_any_answers_every_method() {
    let mut core = Core::new();
    core.any("/echo", text("echo"), vec![]).unwrap();

    for method in [Method::GET, Method::POST, Method::DELETE, Method::PATCH] {
        let res = core.serve(request(method.clone(), "/echo")).await;
        assert_eq!(res.status(), StatusCode::OK, "{method}");
    }
}

#[tokio::test]
async fn test_http_error_payload_and_status() {
    let mut core = Core::new();
    core.post(
        "/login",
        handler_fn(|_| {
            Box::pin(async move {
                Err(HttpError::with_message(
                    StatusCode::UNAUTHORIZED,
                    serde_json::json!({ "message": "bad credentials", "retry": false }),
                )
                .into())
            })
        }),
    );

    let res = core.serve(request(Method::POST, "/login")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
    assert_eq!(body["message"], "bad credentials");
    assert_eq!(body["retry"], false);
}

#[tokio::test]
async fn test_system_error_handler_replaces_default() {
    let mut core = Core::new();
    core.get("/fail", handler_fn(|_| Box::pin(async move { Err(Error::other("boom")) })));
    core.system_error_handler(|err, c| {
        let _ = c.string(StatusCode::SERVICE_UNAVAILABLE, format!("sorry: {err}"));
    });

    let res = core.serve(request(Method::GET, "/fail")).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_string(res).await, "sorry: boom");
}

#[tokio::test]
async fn test_route_info_and_query_reach_handler() {
    let mut core = Core::new();
    core.get(
        "/search/{scope}",
        handler_fn(|c| {
            Box::pin(async move {
                let route = c.route().map(|r| r.name().to_string()).unwrap_or_default();
                let q = c.query_param("q").unwrap_or_default().to_string();
                let scope = c.param("scope").unwrap_or_default().to_string();
                c.json(
                    StatusCode::OK,
                    &serde_json::json!({ "route": route, "q": q, "scope": scope }),
                )
            })
        }),
    )
    .name("search");

    let res = core.serve(request(Method::GET, "/search/docs?q=pool")).await;
    let body: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
    assert_eq!(body, serde_json::json!({ "route": "search", "q": "pool", "scope": "docs" }));
}

#[tokio::test]
async fn test_concurrent_requests_do_not_share_state() {
    use std::sync::Arc;

    let mut core = Core::new();
    core.get(
        "/slow/{id}",
        handler_fn(|c| {
            Box::pin(async move {
                let id = c.param("id").unwrap_or_default().to_string();
                c.set("id", id.clone());
                tokio::task::yield_now().await;
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                let seen = c.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                c.string(StatusCode::OK, format!("{id}:{seen}"))
            })
        }),
    );
    let core = Arc::new(core);

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let core = Arc::clone(&core);
            tokio::spawn(async move {
                let res = core.serve(request(Method::GET, &format!("/slow/{i}"))).await;
                (i, body_string(res).await)
            })
        })
        .collect();

    for task in tasks {
        let (i, body) = task.await.unwrap();
        assert_eq!(body, format!("{i}:{i}"));
    }
}
