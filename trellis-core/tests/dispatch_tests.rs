use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use trellis_core::{
    Container, Error, ExceptionHandler, HttpRequest, HttpResponse, Json, Lifetime, Middleware,
    MiddlewareRef, Next, Result, Route, RouteGroup, RouteParams, Router, RouterConfig, from_fn,
};

type Log = Arc<Mutex<Vec<String>>>;

struct Tag {
    label: &'static str,
    log: Log,
}

#[async_trait]
impl Middleware for Tag {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse> {
        self.log.lock().push(format!("{}-before", self.label));
        let res = next(req).await;
        self.log.lock().push(format!("{}-after", self.label));
        res
    }
}

fn tag(label: &'static str, log: &Log) -> Tag {
    Tag {
        label,
        log: log.clone(),
    }
}

struct RequestId(usize);

#[derive(Serialize)]
struct User {
    id: u64,
    name: String,
}

async fn show_user(params: RouteParams) -> Result<Json<User>> {
    let id: u64 = params.parse("id")?;
    Ok(Json(User {
        id,
        name: format!("user-{}", id),
    }))
}

#[tokio::test]
async fn test_global_group_and_route_middleware_order() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut router = Router::new();
    router.middleware(tag("global", &log));

    let inner = log.clone();
    router
        .group(RouteGroup::new().prefix("/admin").middleware(tag("group", &log)), |r| {
            r.add(
                Route::get("/dashboard", move || {
                    let inner = inner.clone();
                    async move {
                        inner.lock().push("handler".to_string());
                        "dashboard"
                    }
                })
                .middleware(tag("route", &log)),
            )?;
            Ok(())
        })
        .unwrap();

    let response = router
        .handle(&Container::new(), HttpRequest::new("GET", "/admin/dashboard"))
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(
        *log.lock(),
        vec![
            "global-before",
            "group-before",
            "route-before",
            "handler",
            "route-after",
            "group-after",
            "global-after"
        ]
    );
}

#[tokio::test]
async fn test_middleware_short_circuit() {
    let mut router = Router::new();
    router.middleware(from_fn(|req: HttpRequest, next: Next| async move {
        if req.header("Authorization").is_none() {
            return Err(Error::Unauthorized("missing token".into()));
        }
        next(req).await
    }));
    router.get("/private", || async { "secret" }).unwrap();

    let container = Container::new();
    let denied = router.handle(&container, HttpRequest::new("GET", "/private")).await;
    assert_eq!(denied.status, 401);

    let allowed = router
        .handle(
            &container,
            HttpRequest::new("GET", "/private").with_header("Authorization", "Bearer x"),
        )
        .await;
    assert_eq!(allowed.status, 200);
    assert_eq!(allowed.body_str(), "secret");
}

#[tokio::test]
async fn test_global_middleware_wraps_not_found() {
    let mut router = Router::new();
    router.middleware(from_fn(|req: HttpRequest, next: Next| async move {
        let res = next(req).await?;
        Ok::<_, Error>(res.with_header("X-Seen", "1"))
    }));
    router.get("/exists", || async { "here" }).unwrap();

    let container = Container::new();
    let ok = router.handle(&container, HttpRequest::new("GET", "/exists")).await;
    assert_eq!(ok.header("X-Seen"), Some("1"));

    let missing = router.handle(&container, HttpRequest::new("GET", "/missing")).await;
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn test_json_response_with_route_params() {
    let mut router = Router::new();
    router.get(r"/users/{id:\d+}", show_user).unwrap();

    let response = router
        .handle(&Container::new(), HttpRequest::new("GET", "/users/12"))
        .await;
    assert_eq!(response.status, 200);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["id"], 12);
    assert_eq!(body["name"], "user-12");
}

#[tokio::test]
async fn test_scoped_services_are_per_request() {
    let container = Container::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let next_id = counter.clone();
    container.scoped(move || RequestId(next_id.fetch_add(1, Ordering::SeqCst)));

    let mut router = Router::new();
    router
        .get("/id", |a: Arc<RequestId>, b: Arc<RequestId>| async move {
            assert!(Arc::ptr_eq(&a, &b));
            a.0.to_string()
        })
        .unwrap();

    let first = router.handle(&container, HttpRequest::new("GET", "/id")).await;
    let second = router.handle(&container, HttpRequest::new("GET", "/id")).await;
    assert_eq!(first.body_str(), "0");
    assert_eq!(second.body_str(), "1");
}

#[tokio::test]
async fn test_scope_teardown_runs_after_each_request() {
    struct Connection;

    let container = Container::new();
    let closed = Arc::new(AtomicUsize::new(0));
    let on_close = closed.clone();
    container.scoped(move |scope: Container| {
        let on_close = on_close.clone();
        scope.terminating(move |_scope: &Container| {
            on_close.fetch_add(1, Ordering::SeqCst);
        });
        Connection
    });

    let mut router = Router::new();
    router.get("/work", |_conn: Arc<Connection>| async { "done" }).unwrap();
    router
        .get("/fail", |_conn: Arc<Connection>| async {
            Err::<String, _>(Error::Conflict("busy".into()))
        })
        .unwrap();

    router.handle(&container, HttpRequest::new("GET", "/work")).await;
    let failed = router.handle(&container, HttpRequest::new("GET", "/fail")).await;
    assert_eq!(failed.status, 409);
    assert_eq!(closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_request_is_injected_from_scope() {
    let mut router = Router::new();
    router
        .post("/echo", |req: HttpRequest| async move {
            HttpResponse::ok().with_body(req.body.clone())
        })
        .unwrap();
    let response = router
        .handle(
            &Container::new(),
            HttpRequest::new("POST", "/echo").with_body("ping"),
        )
        .await;
    assert_eq!(response.body_str(), "ping");
}

#[tokio::test]
async fn test_shared_request_sees_middleware_changes() {
    let mut router = Router::new();
    router.middleware(from_fn(|req: HttpRequest, next: Next| async move {
        next(req.with_header("X-User", "ada")).await
    }));
    router
        .get("/whoami", |owned: HttpRequest, shared: Arc<HttpRequest>| async move {
            format!(
                "{}/{}",
                owned.header("X-User").unwrap_or("-"),
                shared.header("X-User").unwrap_or("-")
            )
        })
        .unwrap();

    let response = router.handle(&Container::new(), HttpRequest::new("GET", "/whoami")).await;
    assert_eq!(response.body_str(), "ada/ada");
}

#[tokio::test]
async fn test_cancelled_request_still_tears_down_scope() {
    struct Session;

    let events: Log = Arc::new(Mutex::new(Vec::new()));
    let (finished, done) = oneshot::channel::<()>();
    let finished = Arc::new(Mutex::new(Some(finished)));

    let container = Container::new();
    let log = events.clone();
    container.scoped(move |scope: Container| {
        let sync_log = log.clone();
        scope.terminating(move |_scope: &Container| sync_log.lock().push("sync".to_string()));
        let async_log = log.clone();
        let finished = finished.clone();
        scope.terminating_async(move |_scope: Container| async move {
            async_log.lock().push("async".to_string());
            if let Some(finished) = finished.lock().take() {
                let _ = finished.send(());
            }
        });
        Session
    });

    let mut router = Router::new();
    router
        .get("/slow", |_session: Arc<Session>| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            "late"
        })
        .unwrap();

    let request = router.handle(&container, HttpRequest::new("GET", "/slow"));
    let cancelled = tokio::time::timeout(Duration::from_millis(20), request).await;
    assert!(cancelled.is_err());

    done.await.unwrap();
    assert_eq!(*events.lock(), vec!["sync".to_string(), "async".to_string()]);
}

#[tokio::test]
async fn test_panicking_handler_becomes_500() {
    let mut router = Router::new();
    router
        .get("/boom", || async {
            let broken: Option<&str> = None;
            broken.map(str::to_string).unwrap_or_else(|| panic!("handler exploded"))
        })
        .unwrap();

    let response = router.handle(&Container::new(), HttpRequest::new("GET", "/boom")).await;
    assert_eq!(response.status, 500);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["error"], "Internal Server Error");
}

#[tokio::test]
async fn test_debug_mode_renders_error_message() {
    let mut router = Router::with_config(RouterConfig::new().debug(true));
    router
        .get("/bad", || async { Err::<String, _>(Error::BadRequest("missing field 'name'".into())) })
        .unwrap();

    let response = router.handle(&Container::new(), HttpRequest::new("GET", "/bad")).await;
    assert_eq!(response.status, 400);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("missing field 'name'"));
    assert_eq!(body["path"], "/bad");
}

#[tokio::test]
async fn test_method_not_allowed_response_carries_allow_header() {
    let mut router = Router::new();
    router.get("/x", || async { "x" }).unwrap();
    router.put("/x", || async { "x" }).unwrap();

    let response = router.handle(&Container::new(), HttpRequest::new("POST", "/x")).await;
    assert_eq!(response.status, 405);
    assert_eq!(response.header("Allow"), Some("GET, PUT"));
}

struct TeapotHandler {
    reported: Arc<AtomicUsize>,
}

impl ExceptionHandler for TeapotHandler {
    fn report(&self, _error: &Error) {
        self.reported.fetch_add(1, Ordering::SeqCst);
    }

    fn render(&self, _request: &HttpRequest, error: &Error) -> HttpResponse {
        HttpResponse::new(418).with_body(error.to_string())
    }
}

#[tokio::test]
async fn test_exception_handler_bound_in_container() {
    let reported = Arc::new(AtomicUsize::new(0));
    let container = Container::new();
    container.instance_shared::<dyn ExceptionHandler>(Arc::new(TeapotHandler {
        reported: reported.clone(),
    }));

    let router = Router::new();
    let response = router.handle(&container, HttpRequest::new("GET", "/nowhere")).await;
    assert_eq!(response.status, 418);
    assert_eq!(reported.load(Ordering::SeqCst), 1);
}

struct Audit {
    log: Log,
}

#[async_trait]
impl Middleware for Audit {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse> {
        self.log.lock().push(format!("audit {}", req.path));
        next(req).await
    }
}

#[tokio::test]
async fn test_deferred_middleware_resolved_per_request() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let container = Container::new();
    let sink = log.clone();
    container.bind_shared(Lifetime::Scoped, move || {
        Arc::new(Audit { log: sink.clone() }) as Arc<dyn Middleware>
    });
    container.alias::<dyn Middleware>("audit");

    let mut router = Router::new();
    router
        .add(Route::get("/audited", || async { "ok" }).middleware(MiddlewareRef::named("audit")))
        .unwrap();

    router.handle(&container, HttpRequest::new("GET", "/audited")).await;
    router.handle(&container, HttpRequest::new("GET", "/audited")).await;
    assert_eq!(*log.lock(), vec!["audit /audited", "audit /audited"]);
}

#[tokio::test]
async fn test_unresolvable_middleware_is_an_error_response() {
    let mut router = Router::new();
    router
        .add(Route::get("/guarded", || async { "ok" }).middleware(MiddlewareRef::named("missing")))
        .unwrap();
    let response = router
        .handle(&Container::new(), HttpRequest::new("GET", "/guarded"))
        .await;
    assert_eq!(response.status, 500);
}
