//! Chained routes: capture sharing, scope isolation and error handling.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http::StatusCode;
use sigroute::prelude::*;
use sigroute_test::TestClient;

#[derive(Debug, Clone, PartialEq, Eq)]
struct User {
    id: u64,
}

struct Counted {
    queries: Arc<AtomicUsize>,
}

#[async_trait]
impl Provider for Counted {
    async fn provide(&self, request: &RequestContext, _scope: &ResolutionContext) -> Resolution {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match request.path_param("id").and_then(|raw| raw.parse::<u64>().ok()) {
            Some(id) if id < 100 => Resolution::resolved(User { id }),
            _ => Resolution::NotFound,
        }
    }
}

fn user_routes() -> RouteTree {
    RouteTree::builder()
        .route(RouteDef::new("find_user", "user/{id}").capture("user", "User"))
        .route(
            RouteDef::new("show", "")
                .chained("find_user")
                .action("showUser"),
        )
        .route(
            RouteDef::new("edit", "edit")
                .chained("find_user")
                .required("user", "User")
                .action("editUser"),
        )
        .route(
            RouteDef::new("remove", "remove")
                .chained("find_user")
                .action("removeUser")
                .methods(MethodSet::new().delete()),
        )
        .build()
        .unwrap()
}

fn user_client(queries: &Arc<AtomicUsize>) -> TestClient {
    let dispatcher = Dispatcher::builder(user_routes())
        .provider(
            "User",
            Counted {
                queries: Arc::clone(queries),
            },
        )
        .handler("showUser", |_request, args: BoundArgs| async move {
            let user = args.require::<User>("user")?;
            Ok::<_, RouteError>(format!("user {}", user.id))
        })
        .handler("editUser", |_request, args: BoundArgs| async move {
            let user = args.require::<User>("user")?;
            Ok::<_, RouteError>(format!("editing {}", user.id))
        })
        .handler("removeUser", |_request, _args| async { Ok::<_, RouteError>("removed") })
        .build()
        .unwrap();
    TestClient::new(dispatcher)
}

#[tokio::test]
async fn chained_endpoint_reuses_captured_user() {
    let queries = Arc::new(AtomicUsize::new(0));
    let client = user_client(&queries);

    client
        .get("/user/42/edit")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_eq(&serde_json::json!("editing 42"));

    assert_eq!(queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn parameterless_endpoint_receives_captured_user() {
    let queries = Arc::new(AtomicUsize::new(0));
    let client = user_client(&queries);

    client
        .get("/user/42")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_eq(&serde_json::json!("user 42"));

    assert_eq!(queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn every_chain_member_is_reachable() {
    let queries = Arc::new(AtomicUsize::new(0));
    let client = user_client(&queries);

    client
        .get("/user/7")
        .send()
        .await
        .assert_json_eq(&serde_json::json!("user 7"));
    client
        .delete("/user/7/remove")
        .send()
        .await
        .assert_json_eq(&serde_json::json!("removed"));

    client
        .get("/user/7/remove")
        .send()
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_header("allow", "DELETE");
}

#[tokio::test]
async fn missing_captured_user_rejects_whole_chain() {
    let queries = Arc::new(AtomicUsize::new(0));
    let client = user_client(&queries);

    client
        .get("/user/500/edit")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
    assert_eq!(queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn capture_is_visible_to_children_but_not_siblings() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let probe_seen = Arc::clone(&seen);

    let tree = RouteTree::builder()
        .route(RouteDef::new("find_item", "item/{id}").capture("item", "Item"))
        .route(
            RouteDef::new("gated", "")
                .chained("find_item")
                .required("probe", "Probe")
                .required("gate", "Gate")
                .action("gated"),
        )
        .route(
            RouteDef::new("sibling", "item/{id}")
                .required("probe", "Probe")
                .action("sibling"),
        )
        .build()
        .unwrap();

    let dispatcher = Dispatcher::builder(tree)
        .provider(
            "Item",
            sync_provider(|request, _scope| {
                Resolution::from_option(request.path_param("id").map(str::to_string))
            }),
        )
        .provider(
            "Probe",
            sync_provider(move |_request, scope| {
                probe_seen.lock().unwrap().push(scope.contains("Item"));
                Resolution::resolved(())
            }),
        )
        .provider("Gate", sync_provider(|_request, _scope| Resolution::NotFound))
        .handler("gated", |_request, _args| async { Ok::<_, RouteError>("gated") })
        .handler("sibling", |_request, _args| async { Ok::<_, RouteError>("sibling") })
        .build()
        .unwrap();

    TestClient::new(dispatcher)
        .get("/item/1")
        .send()
        .await
        .assert_json_eq(&serde_json::json!("sibling"));

    assert_eq!(*seen.lock().unwrap(), vec![true, false]);
}

#[tokio::test]
async fn resolution_error_aborts_without_trying_siblings() {
    let fallback_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fallback_calls);

    let tree = RouteTree::builder()
        .route(
            RouteDef::new("from_db", "report/{id}")
                .required("report", "Report")
                .action("fromDb"),
        )
        .route(RouteDef::new("from_cache", "report/{id}").action("fromCache"))
        .build()
        .unwrap();

    let dispatcher = Dispatcher::builder(tree)
        .provider(
            "Report",
            provider_fn(|_request, _scope| async {
                Resolution::Error(ResolutionError::with_source(
                    "Report",
                    "database unavailable",
                    std::io::Error::other("connection refused"),
                ))
            }),
        )
        .handler("fromDb", |_request, _args| async { Ok::<_, RouteError>("db") })
        .handler("fromCache", move |_request, _args| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, RouteError>("cache") }
        })
        .build()
        .unwrap();

    let response = TestClient::new(dispatcher).get("/report/9").send().await;
    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_error_code("RESOLUTION_ERROR");
    assert!(!response.text().unwrap().contains("connection refused"));
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
}
