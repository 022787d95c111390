//! # radix-router
//!
//! A lightweight high performance HTTP request router built on one compressed
//! radix tree per request method.
//!
//! This router supports variables in the routing pattern and matches against the request method.
//! Lookups take time proportional to the length of the path and never allocate beyond the
//! parameter list, which is sized up front from the registered routes.
//!
//! ## Features
//!
//! **Most specific match wins:** Static segments are always tried before parameters at the
//! same position, and a parameter branch is only taken when the static branch dead-ends. Both
//! `/user/new` and `/user/:id` can be registered, and `/user/new` always reaches the former.
//!
//! **Path auto-correction:** Besides detecting the missing or additional trailing slash at no extra cost,
//! the router can also fix wrong cases and remove superfluous path elements (like `../` or `//`).
//! [`Router::resolve`] reports these as redirect targets instead of serving the request.
//!
//! **Parameters in your routing pattern:** Stop parsing the requested URL path, just give the path
//! segment a name and the router delivers the dynamic value to you.
//!
//! **Handler chains:** Every route holds an ordered chain of handlers. The router stores the chain
//! as given, so it can be used with any handler type. For hyper, [`Handler`] and [`middleware`] run
//! a chain through [`Next`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use radix_router::{Router, Params};
//! use hyper::{Request, Response, Body, Error};
//!
//! async fn index(_: Request<Body>) -> Result<Response<Body>, Error> {
//!     Ok(Response::new("Hello, World!".into()))
//! }
//!
//! async fn hello(req: Request<Body>) -> Result<Response<Body>, Error> {
//!     let params = req.extensions().get::<Params>().unwrap();
//!     Ok(Response::new(format!("Hello, {}", params.get("user").unwrap()).into()))
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::default()
//!         .get("/", index)
//!         .get("/hello/:user", hello);
//!
//!     hyper::Server::bind(&([127, 0, 0, 1], 3000).into())
//!         .serve(router.into_service())
//!         .await;
//! }
//! ```
//!
//! ### Named parameters
//!
//! `:user` is a *named parameter*. The values are accessible via `req.extensions().get::<Params>()`.
//!
//! Named parameters only match a single, non-empty path segment:
//!
//! ```ignore
//! Pattern: /user/:user
//!
//!  /user/gordon              match
//!  /user/you                 match
//!  /user/gordon/profile      no match
//!  /user/                    no match
//! ```
//!
//! ### Catch-All parameters
//!
//! The second type are *catch-all* parameters and have the form `*name`. Like the name suggests,
//! they match everything. Therefore they must always be at the **end** of the pattern:
//!
//! ```ignore
//! Pattern: /src/*filepath
//!
//!  /src/                     match
//!  /src/somefile.go          match
//!  /src/subdir/somefile.go   match
//! ```
//!
//! ## Without hyper
//!
//! The routing core is generic over the handler type:
//!
//! ```rust
//! use radix_router::{Resolved, Router};
//!
//! type Endpoint = fn() -> &'static str;
//!
//! let mut router: Router<Endpoint> = Router::new();
//! router.register("GET", "/ping", vec![(|| "pong") as Endpoint]).unwrap();
//!
//! match router.resolve("GET", "/ping") {
//!     Resolved::Matched(matched) => assert_eq!((matched.value[0])(), "pong"),
//!     _ => unreachable!(),
//! }
//! ```

#![forbid(unsafe_code)]

mod config;
mod error;
mod handler;
mod params;
pub mod path;
mod router;
mod service;
mod tree;

pub use config::{RedirectPolicy, RouterConfig};
pub use error::InsertError;
pub use handler::{middleware, Handler, HandlerFuture, Middleware, Next};
pub use params::{Param, Params};
pub use router::{HandlerChain, Resolved, Router};
pub use service::{MakeRouterService, ResponseFut, RouterService};
pub use tree::{Match, Node, NodeType, Skipped, Tsr};

// test the code examples in README.md
#[cfg(doctest)]
mod test_readme {
    macro_rules! doc_comment {
        ($x:expr) => {
            #[doc = $x]
            extern "C" {}
        };
    }

    doc_comment!(include_str!("../README.md"));
}
