use crate::router::HandlerChain;

use std::future::Future;

use futures_util::future::{self, BoxFuture};
use hyper::{Body, Request, Response};

/// The future returned by a [`Handler`].
pub type HandlerFuture = BoxFuture<'static, hyper::Result<Response<Body>>>;

/// Represents a HTTP handler function.
/// This trait is implemented for asynchronous functions that take a `Request` and return a
/// `Result<Response<Body>, hyper::Error>`, and for [`middleware`] wrapping functions that also
/// take the rest of the chain.
/// ```rust
/// # use radix_router::Handler;
/// # use hyper::{Request, Response, Body};
/// async fn hello(_: Request<Body>) -> Result<Response<Body>, hyper::Error> {
///     Ok(Response::new(Body::empty()))
/// }
///
/// let handler: Box<dyn Handler> = Box::new(hello);
/// ```
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: Request<Body>, next: Next) -> HandlerFuture;
}

impl<F, R> Handler for F
where
    F: Fn(Request<Body>) -> R + Send + Sync + 'static,
    R: Future<Output = hyper::Result<Response<Body>>> + Send + 'static,
{
    fn handle(&self, req: Request<Body>, _: Next) -> HandlerFuture {
        Box::pin(self(req))
    }
}

/// A handler that decides whether, and with which request, the rest of its
/// chain runs. Created by [`middleware`].
pub struct Middleware<F>(F);

impl<F, R> Handler for Middleware<F>
where
    F: Fn(Request<Body>, Next) -> R + Send + Sync + 'static,
    R: Future<Output = hyper::Result<Response<Body>>> + Send + 'static,
{
    fn handle(&self, req: Request<Body>, next: Next) -> HandlerFuture {
        Box::pin((self.0)(req, next))
    }
}

/// Wraps an asynchronous function taking the request and the remainder of the
/// handler chain.
/// ```rust
/// use radix_router::{middleware, Handler, Next, Router};
/// use hyper::{Body, Method, Request, Response, StatusCode};
///
/// async fn auth(req: Request<Body>, next: Next) -> hyper::Result<Response<Body>> {
///     if req.headers().contains_key("authorization") {
///         return next.run(req).await;
///     }
///
///     let mut res = Response::new(Body::empty());
///     *res.status_mut() = StatusCode::UNAUTHORIZED;
///     Ok(res)
/// }
///
/// async fn admin(_: Request<Body>) -> hyper::Result<Response<Body>> {
///     Ok(Response::new("welcome".into()))
/// }
///
/// let chain: Vec<Box<dyn Handler>> = vec![Box::new(middleware(auth)), Box::new(admin)];
/// let router = Router::default().handle_chain("/admin", Method::GET, chain);
/// ```
pub fn middleware<F, R>(f: F) -> Middleware<F>
where
    F: Fn(Request<Body>, Next) -> R + Send + Sync + 'static,
    R: Future<Output = hyper::Result<Response<Body>>> + Send + 'static,
{
    Middleware(f)
}

/// The part of a handler chain that has not run yet.
pub struct Next {
    chain: HandlerChain<Box<dyn Handler>>,
    index: usize,
}

impl Next {
    pub(crate) fn new(chain: HandlerChain<Box<dyn Handler>>) -> Self {
        Self { chain, index: 0 }
    }

    /// The number of handlers left to run.
    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.index)
    }

    /// Runs the next handler in the chain. Once the chain is exhausted an
    /// empty `200 OK` response is returned.
    pub fn run(mut self, req: Request<Body>) -> HandlerFuture {
        let chain = self.chain.clone();

        match chain.get(self.index) {
            Some(handler) => {
                self.index += 1;
                handler.handle(req, self)
            }
            None => Box::pin(future::ok(Response::new(Body::empty()))),
        }
    }
}
