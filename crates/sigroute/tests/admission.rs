//! Route admission scenarios: resolution, rejection and fallback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::StatusCode;
use serde::Serialize;
use sigroute::prelude::*;
use sigroute_test::TestClient;

#[derive(Debug, Clone, Serialize)]
struct User {
    id: u64,
    name: String,
}

fn user_directory() -> Arc<HashMap<u64, User>> {
    Arc::new(HashMap::from([(
        42,
        User {
            id: 42,
            name: "ada".to_string(),
        },
    )]))
}

fn find_user(users: Arc<HashMap<u64, User>>) -> impl Provider {
    lookup("id", move |id: u64| {
        let users = Arc::clone(&users);
        async move { Ok::<_, std::io::Error>(users.get(&id).cloned()) }
    })
}

#[tokio::test]
async fn present_user_is_admitted_and_absent_user_falls_back() {
    let handled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&handled);

    let tree = RouteTree::builder()
        .route(
            RouteDef::new("show_user", "user/{id}")
                .capture("user", "User")
                .action("showUser"),
        )
        .build()
        .unwrap();

    let dispatcher = Dispatcher::builder(tree)
        .provider("User", find_user(user_directory()))
        .handler("showUser", move |_request, args: BoundArgs| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let user = args.require::<User>("user")?;
                Ok::<_, RouteError>((*user).clone())
            }
        })
        .not_found(not_found_handler(|request: RequestContext| async move {
            json_response(
                StatusCode::NOT_FOUND,
                &serde_json::json!({ "missing": request.path() }),
            )
        }))
        .build()
        .unwrap();
    let client = TestClient::new(dispatcher);

    client
        .get("/user/42")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_eq(&serde_json::json!({ "id": 42, "name": "ada" }));

    client
        .get("/user/999")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_json_eq(&serde_json::json!({ "missing": "/user/999" }));

    assert_eq!(handled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_node_never_invokes_its_handler() {
    let handled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&handled);

    let tree = RouteTree::builder()
        .route(
            RouteDef::new("admin", "admin/{id}")
                .required("user", "User")
                .required("token", "AdminToken")
                .action("admin"),
        )
        .build()
        .unwrap();

    let dispatcher = Dispatcher::builder(tree)
        .provider("User", find_user(user_directory()))
        .provider("AdminToken", Header::new("x-admin-token"))
        .handler("admin", move |_request, _args| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, RouteError>("admin") }
        })
        .build()
        .unwrap();
    let client = TestClient::new(dispatcher);

    client
        .get("/admin/42")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error_code("NOT_FOUND");
    assert_eq!(handled.load(Ordering::SeqCst), 0);

    client
        .get("/admin/42")
        .header("x-admin-token", "secret")
        .send()
        .await
        .assert_success();
    assert_eq!(handled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn arguments_are_bound_in_declared_order() {
    let tree = RouteTree::builder()
        .route(
            RouteDef::new("search", "search/{term}")
                .required("term", "Term")
                .optional("page", "Page")
                .required("tenant", "Tenant")
                .action("search"),
        )
        .build()
        .unwrap();

    let dispatcher = Dispatcher::builder(tree)
        .provider("Term", PathParam::<String>::new("term"))
        .provider("Page", QueryParam::<u32>::new("page"))
        .provider("Tenant", Header::new("x-tenant"))
        .handler("search", |_request, args: BoundArgs| async move {
            let names: Vec<String> = args.names().map(str::to_string).collect();
            let page = args.get::<u32>("page").map(|p| *p);
            Ok::<_, RouteError>(serde_json::json!({ "names": names, "page": page }))
        })
        .build()
        .unwrap();
    let client = TestClient::new(dispatcher).with_default_header("x-tenant", "acme");

    client
        .get("/search/rust")
        .send()
        .await
        .assert_success()
        .assert_json_eq(&serde_json::json!({
            "names": ["term", "page", "tenant"],
            "page": null,
        }));

    client
        .get("/search/rust?page=3")
        .send()
        .await
        .assert_json_field("page", &serde_json::json!(3));
}

#[tokio::test]
async fn later_provider_starts_after_earlier_one_returns() {
    let events = Arc::new(Mutex::new(Vec::new()));

    let slow_events = Arc::clone(&events);
    let slow = provider_fn(move |_request, _scope| {
        let events = Arc::clone(&slow_events);
        async move {
            events.lock().unwrap().push("a:start");
            tokio::time::sleep(Duration::from_millis(20)).await;
            events.lock().unwrap().push("a:done");
            Resolution::resolved(1_u8)
        }
    });

    let fast_events = Arc::clone(&events);
    let fast = sync_provider(move |_request, _scope| {
        fast_events.lock().unwrap().push("b:start");
        Resolution::resolved(2_u8)
    });

    let tree = RouteTree::builder()
        .route(
            RouteDef::new("pair", "pair")
                .required("a", "A")
                .required("b", "B")
                .action("pair"),
        )
        .build()
        .unwrap();
    let dispatcher = Dispatcher::builder(tree)
        .provider("A", slow)
        .provider("B", fast)
        .handler("pair", |_request, _args| async { Ok::<_, RouteError>("ok") })
        .build()
        .unwrap();

    TestClient::new(dispatcher).get("/pair").send().await.assert_success();

    assert_eq!(*events.lock().unwrap(), vec!["a:start", "a:done", "b:start"]);
}

#[tokio::test]
async fn json_body_mismatch_falls_through_to_next_route() {
    #[derive(Debug, serde::Deserialize)]
    struct NewUser {
        name: String,
    }

    let tree = RouteTree::builder()
        .route(
            RouteDef::new("create", "users")
                .required("payload", "NewUser")
                .action("create")
                .methods(MethodSet::new().post()),
        )
        .route(
            RouteDef::new("create_raw", "users")
                .action("createRaw")
                .methods(MethodSet::new().post()),
        )
        .build()
        .unwrap();

    let dispatcher = Dispatcher::builder(tree)
        .provider("NewUser", JsonBody::<NewUser>::new())
        .handler("create", |_request, args: BoundArgs| async move {
            let payload = args.require::<NewUser>("payload")?;
            Ok::<_, RouteError>(format!("created {}", payload.name))
        })
        .handler("createRaw", |_request, _args| async { Ok::<_, RouteError>("raw") })
        .build()
        .unwrap();
    let client = TestClient::new(dispatcher);

    client
        .post("/users")
        .json(&serde_json::json!({ "name": "grace" }))
        .send()
        .await
        .assert_json_eq(&serde_json::json!("created grace"));

    client
        .post("/users")
        .body("not json")
        .send()
        .await
        .assert_json_eq(&serde_json::json!("raw"));
}
