use radix_router::{middleware, Handler, Next, Params, Router};

use hyper::body::to_bytes;
use hyper::header::{ALLOW, LOCATION};
use hyper::service::Service;
use hyper::{Body, Method, Request, Response, StatusCode};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn request(method: Method, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

async fn body(res: Response<Body>) -> String {
    let bytes = to_bytes(res.into_body()).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn echo_params(req: Request<Body>) -> hyper::Result<Response<Body>> {
    let params = req.extensions().get::<Params>().unwrap();
    let text = params
        .iter()
        .map(|p| format!("{}={}", p.key, p.value))
        .collect::<Vec<_>>()
        .join("&");
    Ok(Response::new(text.into()))
}

async fn ok(_: Request<Body>) -> hyper::Result<Response<Body>> {
    Ok(Response::new("ok".into()))
}

#[tokio::test]
async fn params_reach_the_handler() {
    init_tracing();
    let router = Router::default()
        .get("/user/:id", echo_params)
        .get("/user/new", ok)
        .get("/files/*path", echo_params);

    let res = router.serve(request(Method::GET, "/user/42")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await, "id=42");

    let res = router.serve(request(Method::GET, "/user/new")).await.unwrap();
    assert_eq!(body(res).await, "ok");

    let res = router
        .serve(request(Method::GET, "/files/a/b/c.txt"))
        .await
        .unwrap();
    assert_eq!(body(res).await, "path=a/b/c.txt");
}

#[tokio::test]
async fn trailing_slash_redirects() {
    init_tracing();
    let router = Router::default()
        .get("/user/:id", ok)
        .post("/form/", ok);

    let res = router.serve(request(Method::GET, "/user/42/")).await.unwrap();
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[LOCATION], "/user/42");

    let res = router.serve(request(Method::POST, "/form")).await.unwrap();
    assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(res.headers()[LOCATION], "/form/");
}

#[tokio::test]
async fn fixed_path_redirects() {
    init_tracing();
    let router = Router::default().get("/Users/:name", ok);

    let res = router
        .serve(request(Method::GET, "/users/../USERS/gordon"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[LOCATION], "/Users/gordon");

    let router = Router::default()
        .get("/Users/:name", ok)
        .redirect_fixed_path(false);
    let res = router.serve(request(Method::GET, "/users/gordon")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn method_not_allowed_sets_allow() {
    init_tracing();
    let router = Router::default().get("/path", ok).put("/path", ok);

    let res = router.serve(request(Method::POST, "/path")).await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()[ALLOW], "GET, PUT, OPTIONS");

    let router = Router::default()
        .get("/path", ok)
        .method_not_allowed(|_: Request<Body>| async {
            let mut res = Response::new(Body::from("custom"));
            *res.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
            Ok::<_, hyper::Error>(res)
        });

    let res = router.serve(request(Method::DELETE, "/path")).await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()[ALLOW], "GET, OPTIONS");
    assert_eq!(body(res).await, "custom");

    let router = Router::default()
        .get("/path", ok)
        .handle_method_not_allowed(false);
    let res = router.serve(request(Method::POST, "/path")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cleaned_paths_report_allowed_methods() {
    init_tracing();
    let router = Router::default()
        .get("/x", ok)
        .options("/x", ok)
        .remove_extra_slash(true);

    let res = router.serve(request(Method::POST, "//x")).await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()[ALLOW], "GET, OPTIONS");

    let router = Router::default().get("/x", ok).remove_extra_slash(true);
    let res = router.serve(request(Method::OPTIONS, "//x")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[ALLOW], "GET, OPTIONS");
}

#[tokio::test]
async fn trailing_slash_redirects_keep_forwarded_prefix() {
    init_tracing();
    let router = Router::default().get("/user/:id", ok).get("/About", ok);

    let req = Request::builder()
        .uri("/user/42/")
        .header("x-forwarded-prefix", "/api/")
        .body(Body::empty())
        .unwrap();
    let res = router.serve(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[LOCATION], "/api/user/42");

    let req = Request::builder()
        .uri("/user/42/")
        .header("x-forwarded-prefix", "")
        .body(Body::empty())
        .unwrap();
    let res = router.serve(req).await.unwrap();
    assert_eq!(res.headers()[LOCATION], "/user/42");

    // case corrections already carry the full path
    let req = Request::builder()
        .uri("/about")
        .header("x-forwarded-prefix", "/api")
        .body(Body::empty())
        .unwrap();
    let res = router.serve(req).await.unwrap();
    assert_eq!(res.headers()[LOCATION], "/About");
}

#[tokio::test]
async fn automatic_options() {
    init_tracing();
    let router = Router::default().post("/path", ok).get("/path", ok);

    let res = router.serve(request(Method::OPTIONS, "/path")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[ALLOW], "GET, POST, OPTIONS");

    let res = router.serve(request(Method::OPTIONS, "*")).await.unwrap();
    assert_eq!(res.headers()[ALLOW], "GET, POST, OPTIONS");

    let res = router.serve(request(Method::OPTIONS, "/doesnotexist")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // custom handlers take priority
    let router = Router::default()
        .get("/path", ok)
        .options("/path", |_: Request<Body>| async {
            Ok::<_, hyper::Error>(Response::new(Body::from("custom options")))
        });
    let res = router.serve(request(Method::OPTIONS, "/path")).await.unwrap();
    assert!(!res.headers().contains_key(ALLOW));
    assert_eq!(body(res).await, "custom options");

    let router = Router::default()
        .get("/path", ok)
        .global_options(|_: Request<Body>| async {
            let mut res = Response::new(Body::empty());
            res.headers_mut()
                .insert("access-control-allow-origin", "*".parse().unwrap());
            Ok::<_, hyper::Error>(res)
        });
    let res = router.serve(request(Method::OPTIONS, "/path")).await.unwrap();
    assert_eq!(res.headers()[ALLOW], "GET, OPTIONS");
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn not_found_handler() {
    init_tracing();
    let router = Router::default().get("/", ok);

    let res = router.serve(request(Method::GET, "/missing")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(res).await, "");

    let router = Router::default()
        .get("/", ok)
        .not_found(|_: Request<Body>| async {
            let mut res = Response::new(Body::from("nothing here"));
            *res.status_mut() = StatusCode::NOT_FOUND;
            Ok::<_, hyper::Error>(res)
        });

    let res = router.serve(request(Method::GET, "/missing")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(res).await, "nothing here");
}

async fn require_token(req: Request<Body>, next: Next) -> hyper::Result<Response<Body>> {
    if req.headers().contains_key("x-token") {
        return next.run(req).await;
    }

    let mut res = Response::new(Body::empty());
    *res.status_mut() = StatusCode::UNAUTHORIZED;
    Ok(res)
}

async fn tag(mut req: Request<Body>, next: Next) -> hyper::Result<Response<Body>> {
    req.headers_mut().insert("x-tagged", "yes".parse().unwrap());
    let mut res = next.run(req).await?;
    res.headers_mut().insert("x-after", "1".parse().unwrap());
    Ok(res)
}

async fn tagged(req: Request<Body>) -> hyper::Result<Response<Body>> {
    let tagged = req.headers().contains_key("x-tagged");
    Ok(Response::new(format!("tagged={}", tagged).into()))
}

#[tokio::test]
async fn handler_chain_runs_in_order() {
    init_tracing();
    let chain: Vec<Box<dyn Handler>> = vec![
        Box::new(middleware(require_token)),
        Box::new(middleware(tag)),
        Box::new(tagged),
    ];
    let router = Router::default().handle_chain("/admin", Method::GET, chain);

    let res = router.serve(request(Method::GET, "/admin")).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/admin")
        .header("x-token", "secret")
        .body(Body::empty())
        .unwrap();
    let res = router.serve(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-after"], "1");
    assert_eq!(body(res).await, "tagged=true");
}

#[tokio::test]
async fn exhausted_chain_answers_ok() {
    init_tracing();
    let chain: Vec<Box<dyn Handler>> = vec![Box::new(middleware(
        |req: Request<Body>, next: Next| async move {
            assert_eq!(next.remaining(), 0);
            next.run(req).await
        },
    ))];
    let router = Router::default().handle_chain("/", Method::GET, chain);

    let res = router.serve(request(Method::GET, "/")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await, "");
}

#[tokio::test]
async fn into_service_serves_requests() {
    init_tracing();
    let router = Router::default().get("/hello/:name", echo_params);

    let mut make_service = router.into_service();
    let mut service = make_service.call(()).await.unwrap();

    let res = service
        .call(request(Method::GET, "/hello/world"))
        .await
        .unwrap();
    assert_eq!(body(res).await, "name=world");
}

#[test]
#[should_panic(expected = "conflicts with existing route")]
fn conflicting_builder_route_panics() {
    let _ = Router::default()
        .get("/user/:id", ok)
        .get("/user/:name", ok);
}

#[test]
#[should_panic(expected = "path must begin with '/'")]
fn relative_builder_route_panics() {
    let _ = Router::default().get("user", ok);
}
