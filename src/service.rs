use crate::handler::{Handler, HandlerFuture, Next};
use crate::params::Params;
use crate::path::clean;
use crate::router::{HandlerChain, Resolved, Router};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{future, ready};
use hyper::header::{self, HeaderValue};
use hyper::service::Service;
use hyper::{Body, Method, Request, Response, StatusCode};

#[doc(hidden)]
pub struct MakeRouterService(RouterService);

impl<T> Service<T> for MakeRouterService {
    type Response = RouterService;
    type Error = hyper::Error;
    type Future = future::Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _: T) -> Self::Future {
        let service = self.0.clone();
        future::ok(service)
    }
}

#[doc(hidden)]
#[derive(Clone)]
pub struct RouterService(Arc<Router>);

impl RouterService {
    fn new(router: Router) -> Self {
        RouterService(Arc::new(router))
    }
}

impl Service<Request<Body>> for RouterService {
    type Response = Response<Body>;
    type Error = hyper::Error;
    type Future = ResponseFut;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        self.0.serve(req)
    }
}

// a resolution detached from the request, so the request can be handed on
enum Outcome {
    Matched(HandlerChain<Box<dyn Handler>>, Params<'static, 'static>),
    Redirect(String),
    MethodNotAllowed(String),
    NotFound,
}

impl Router {
    /// Converts the `Router` into a `Service` which you can serve directly with `Hyper`.
    /// If you have an existing `Service` that you want to incorporate a `Router` into, see
    /// [`Router::serve`](crate::Router::serve).
    /// ```rust,no_run
    /// # use radix_router::Router;
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// // Our router...
    /// let router = Router::default();
    ///
    /// // Convert it into a service...
    /// let service = router.into_service();
    ///
    /// // Serve with hyper
    /// hyper::Server::bind(&([127, 0, 0, 1], 3030).into())
    ///     .serve(service)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn into_service(self) -> MakeRouterService {
        MakeRouterService(RouterService::new(self))
    }

    /// An asynchronous function from a `Request` to a `Response`. You will generally not need to use
    /// this function directly, and instead use
    /// [`Router::into_service`](crate::Router::into_service). However, it may be useful when
    /// incorporating the router into a larger service.
    ///
    /// Matched requests run their handler chain with the bound [`Params`] in the
    /// request extensions. Redirects answer `301` for `GET` requests and `308`
    /// otherwise, with the target in the `Location` header.
    /// ```rust,no_run
    /// # use radix_router::Router;
    /// # use hyper::service::{make_service_fn, service_fn};
    /// # use hyper::{Request, Body, Server};
    /// # use std::convert::Infallible;
    /// # use std::sync::Arc;
    ///
    /// # async fn run() {
    /// let router = Arc::new(Router::default());
    ///
    /// let make_svc = make_service_fn(move |_| {
    ///     let router = router.clone();
    ///     async move {
    ///         Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
    ///             let router = router.clone();
    ///             async move { router.serve(req).await }
    ///         }))
    ///     }
    /// });
    ///
    /// let server = Server::bind(&([127, 0, 0, 1], 3000).into())
    ///     .serve(make_svc)
    ///     .await;
    /// # }
    /// ```
    pub fn serve(&self, mut req: Request<Body>) -> ResponseFut {
        let outcome = match self.resolve_method(Some(req.method()), req.uri().path()) {
            Resolved::Matched(matched) => {
                Outcome::Matched(matched.value.clone(), matched.params.into_owned())
            }
            Resolved::TrailingSlashRedirect(path) => {
                Outcome::Redirect(forwarded_prefix(&req).unwrap_or_default() + &path)
            }
            Resolved::CaseCorrectedRedirect(path) => Outcome::Redirect(path),
            Resolved::MethodNotAllowed(mut allowed) => {
                allowed.retain(|&method| method != Method::OPTIONS);
                allowed.push("OPTIONS");
                Outcome::MethodNotAllowed(allowed.join(", "))
            }
            Resolved::NotFound => Outcome::NotFound,
        };

        match outcome {
            Outcome::Matched(chain, params) => {
                req.extensions_mut().insert(params);
                ResponseFutKind::Boxed(Next::new(chain).run(req)).into()
            }
            Outcome::Redirect(path) => {
                let code = match *req.method() {
                    // Moved Permanently, request with GET method
                    Method::GET => StatusCode::MOVED_PERMANENTLY,
                    // Permanent Redirect, request with same method
                    _ => StatusCode::PERMANENT_REDIRECT,
                };

                ResponseFutKind::Redirect(path, code).into()
            }
            Outcome::MethodNotAllowed(allow) => self.fallback(req, Some(allow)),
            Outcome::NotFound => self.fallback(req, None),
        }
    }

    fn fallback(&self, req: Request<Body>, method_not_allowed: Option<String>) -> ResponseFut {
        if req.method() == Method::OPTIONS && self.config().handle_options {
            let allow = self.allowed(&self.lookup_path(req.uri().path())).join(", ");

            if !allow.is_empty() {
                return match self.global_options {
                    Some(ref chain) => {
                        let fut = Next::new(chain.clone()).run(req);
                        ResponseFutKind::Boxed(with_allow(fut, allow)).into()
                    }
                    None => ResponseFutKind::Options(allow).into(),
                };
            }
        } else if let Some(allow) = method_not_allowed {
            return match self.method_not_allowed {
                Some(ref chain) => {
                    let fut = Next::new(chain.clone()).run(req);
                    ResponseFutKind::Boxed(with_allow(fut, allow)).into()
                }
                None => ResponseFutKind::MethodNotAllowed(allow).into(),
            };
        }

        match self.not_found {
            Some(ref chain) => ResponseFutKind::Boxed(Next::new(chain.clone()).run(req)).into(),
            None => ResponseFutKind::NotFound.into(),
        }
    }
}

// the cleaned `X-Forwarded-Prefix` a proxy mounted the router under, without
// its trailing slash
fn forwarded_prefix(req: &Request<Body>) -> Option<String> {
    let prefix = req.headers().get("x-forwarded-prefix")?.to_str().ok()?;
    if prefix.is_empty() {
        return None;
    }

    let prefix = clean(prefix);
    Some(prefix.trim_end_matches('/').to_owned())
}

// sets the `Allow` header on the response of a fallback handler
fn with_allow(fut: HandlerFuture, allow: String) -> HandlerFuture {
    Box::pin(async move {
        let mut res = fut.await?;
        set_header(&mut res, header::ALLOW, &allow);
        Ok(res)
    })
}

fn empty(status: StatusCode) -> Response<Body> {
    let mut res = Response::new(Body::empty());
    *res.status_mut() = status;
    res
}

fn set_header(res: &mut Response<Body>, name: header::HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        res.headers_mut().insert(name, value);
    }
}

pub struct ResponseFut {
    kind: ResponseFutKind,
}

impl From<ResponseFutKind> for ResponseFut {
    fn from(kind: ResponseFutKind) -> Self {
        Self { kind }
    }
}

enum ResponseFutKind {
    Boxed(HandlerFuture),
    Redirect(String, StatusCode),
    MethodNotAllowed(String),
    Options(String),
    NotFound,
}

impl Future for ResponseFut {
    type Output = hyper::Result<Response<Body>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let ready = match self.kind {
            ResponseFutKind::Boxed(ref mut fut) => ready!(fut.as_mut().poll(cx)),
            ResponseFutKind::Redirect(ref path, code) => {
                let mut res = empty(code);
                set_header(&mut res, header::LOCATION, path);
                Ok(res)
            }
            ResponseFutKind::NotFound => Ok(empty(StatusCode::NOT_FOUND)),
            ResponseFutKind::Options(ref allowed) => {
                let mut res = empty(StatusCode::OK);
                set_header(&mut res, header::ALLOW, allowed);
                Ok(res)
            }
            ResponseFutKind::MethodNotAllowed(ref allowed) => {
                let mut res = empty(StatusCode::METHOD_NOT_ALLOWED);
                set_header(&mut res, header::ALLOW, allowed);
                Ok(res)
            }
        };

        Poll::Ready(ready)
    }
}
