//! [`Router`](crate::Router) is a lightweight high performance HTTP request router.
//!
//! This router supports variables in the routing pattern and matches against
//! the request method. Every method gets its own compressing dynamic trie
//! (radix tree), so a path registered for `GET` never affects `POST`.
//!
//! The router is optimized for high performance and a small memory footprint.
//! It scales well even with very long paths and a large number of routes.
//!
//! The registered path, against which the router matches incoming requests, can
//! contain two types of parameters:
//! ```ignore
//!  Syntax    Type
//!  :name     named parameter
//!  *name     catch-all parameter
//! ```
//!
//! Named parameters are dynamic path segments. They match anything until the
//! next '/' or the path end:
//! ```ignore
//!  Path: /blog/:category/:post
//! ```
//!
//!  Requests:
//! ```ignore
//!   /blog/rust/request-routers            match: category="rust", post="request-routers"
//!   /blog/rust/request-routers/           no match, but the router would redirect
//!   /blog/rust/                           no match
//!   /blog/rust/request-routers/comments   no match
//! ```
//!
//! Catch-all parameters match anything until the path end, but not the '/'
//! in front of them. Since they match anything until the end, catch-all
//! parameters must always be the final path element.
//! ```ignore
//!  Path: /files/*filepath
//! ```
//!
//!  Requests:
//! ```ignore
//!   /files/                             match: filepath=""
//!   /files/LICENSE                      match: filepath="LICENSE"
//!   /files/templates/article.html       match: filepath="templates/article.html"
//!   /files                              no match, but the router would redirect
//! ```
//!
//! Lookups never fail. A path either matches, or [`Router::resolve`] explains
//! what the caller should answer instead:
//! ```rust
//! use radix_router::{Resolved, Router};
//!
//! let mut router: Router<&str> = Router::new();
//! router.register("GET", "/user/:id", vec!["user"]).unwrap();
//! router.register("GET", "/Users", vec!["users"]).unwrap();
//!
//! assert!(matches!(router.resolve("GET", "/user/42/"), Resolved::TrailingSlashRedirect(p) if p == "/user/42"));
//! assert!(matches!(router.resolve("GET", "/users"), Resolved::CaseCorrectedRedirect(p) if p == "/Users"));
//! assert!(matches!(router.resolve("POST", "/user/42"), Resolved::MethodNotAllowed(m) if m == ["GET"]));
//! assert!(matches!(router.resolve("GET", "/nope"), Resolved::NotFound));
//! ```
use crate::config::{RedirectPolicy, RouterConfig};
use crate::error::InsertError;
use crate::handler::Handler;
use crate::params::Params;
use crate::path::clean;
use crate::tree::{count_params, count_sections, Match, Node, Tsr};

use std::borrow::Cow;
use std::cmp::max;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use hyper::Method;
use tracing::{debug, trace, warn};

/// An ordered, non-empty sequence of handlers bound to a single route.
///
/// Cloning a chain is cheap, the handlers are shared.
pub struct HandlerChain<H>(Arc<[H]>);

impl<H> From<Vec<H>> for HandlerChain<H> {
    fn from(handlers: Vec<H>) -> Self {
        HandlerChain(handlers.into())
    }
}

impl<H> Clone for HandlerChain<H> {
    fn clone(&self) -> Self {
        HandlerChain(Arc::clone(&self.0))
    }
}

impl<H> Deref for HandlerChain<H> {
    type Target = [H];

    fn deref(&self) -> &[H] {
        &self.0
    }
}

impl<H> fmt::Debug for HandlerChain<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("len", &self.0.len())
            .finish()
    }
}

/// The outcome of [`Router::resolve`].
#[derive(Debug)]
pub enum Resolved<'r, 'p, H> {
    /// A route matched. Carries its handler chain, the bound parameters and
    /// the pattern the route was registered under.
    Matched(Match<'r, 'p, &'r HandlerChain<H>>),
    /// No route matched, but the path with a trailing slash added or removed
    /// would. Carries that path.
    TrailingSlashRedirect(String),
    /// No route matched, but the cleaned path matches a route when compared
    /// case-insensitively. Carries the path as it was registered.
    CaseCorrectedRedirect(String),
    /// The path matches under other methods, listed in sorted order.
    MethodNotAllowed(Vec<&'r str>),
    NotFound,
}

impl<'r, 'p, H> Resolved<'r, 'p, H> {
    /// Returns the match, if a route matched.
    pub fn into_match(self) -> Option<Match<'r, 'p, &'r HandlerChain<H>>> {
        match self {
            Resolved::Matched(matched) => Some(matched),
            _ => None,
        }
    }

    /// Detaches the parameter values from the request path.
    pub fn into_owned_values(self) -> Resolved<'r, 'static, H> {
        match self {
            Resolved::Matched(matched) => Resolved::Matched(Match {
                value: matched.value,
                params: matched.params.into_owned_values(),
                full_path: matched.full_path,
            }),
            Resolved::TrailingSlashRedirect(path) => Resolved::TrailingSlashRedirect(path),
            Resolved::CaseCorrectedRedirect(path) => Resolved::CaseCorrectedRedirect(path),
            Resolved::MethodNotAllowed(allowed) => Resolved::MethodNotAllowed(allowed),
            Resolved::NotFound => Resolved::NotFound,
        }
    }
}

/// Router dispatches requests to different handler chains via configurable routes.
///
/// Routes are registered up front, after which the router is only read and
/// can be shared between threads freely.
pub struct Router<H = Box<dyn Handler>> {
    trees: HashMap<Method, Node<HandlerChain<H>>>,
    config: RouterConfig,
    max_params: usize,
    max_sections: usize,
    pub(crate) global_options: Option<HandlerChain<H>>,
    pub(crate) not_found: Option<HandlerChain<H>>,
    pub(crate) method_not_allowed: Option<HandlerChain<H>>,
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::with_config(RouterConfig::default())
    }
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            trees: HashMap::new(),
            config,
            max_params: 0,
            max_sections: 0,
            global_options: None,
            not_found: None,
            method_not_allowed: None,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The largest number of parameters any registered route binds.
    pub fn max_params(&self) -> usize {
        self.max_params
    }

    /// The largest number of `/` separated sections of any registered route.
    pub fn max_sections(&self) -> usize {
        self.max_sections
    }

    /// Registers a handler chain for the given method and path.
    ///
    /// The path must begin with `/`, the method must be a valid HTTP method
    /// token and the chain must hold at least one handler.
    /// ```rust
    /// use radix_router::{InsertError, Router};
    ///
    /// let mut router: Router<u32> = Router::new();
    /// router.register("GET", "/user/:id", vec![1, 2]).unwrap();
    ///
    /// let err = router.register("GET", "/user/:name", vec![3]).unwrap_err();
    /// assert!(err.is_conflict());
    /// assert_eq!(router.register("GET", "user", vec![3]), Err(InsertError::EmptyPath { path: "user".into() }));
    /// ```
    pub fn register(&mut self, method: &str, path: &str, chain: Vec<H>) -> Result<(), InsertError> {
        let handlers = chain.len();

        match self.try_register(method, path, chain) {
            Ok(()) => {
                debug!(method, path, handlers, "registered route");
                Ok(())
            }
            Err(error) => {
                warn!(method, path, %error, "rejected route");
                Err(error)
            }
        }
    }

    fn try_register(&mut self, method: &str, path: &str, chain: Vec<H>) -> Result<(), InsertError> {
        if !path.starts_with('/') {
            return Err(InsertError::EmptyPath {
                path: path.to_owned(),
            });
        }

        if method.is_empty() {
            return Err(InsertError::EmptyMethod);
        }

        let method = Method::from_bytes(method.as_bytes()).map_err(|_| InsertError::InvalidMethod {
            method: method.to_owned(),
        })?;

        if chain.is_empty() {
            return Err(InsertError::EmptyHandlerChain);
        }

        let root = self.trees.entry(method.clone()).or_default();
        if let Err(err) = root.insert(path, HandlerChain::from(chain)) {
            // don't keep a tree around for a method whose only route was rejected
            if root.is_empty() {
                self.trees.remove(&method);
            }

            return Err(err);
        }

        self.max_params = max(self.max_params, count_params(path));
        self.max_sections = max(self.max_sections, count_sections(path));

        Ok(())
    }

    /// Lookup allows the manual lookup of the handler chain for a specific
    /// method and path, without any of the redirect or fallback handling.
    /// If nothing matches, it returns a [`Tsr`] indicating whether a redirection
    /// should be performed to the same path with (without) a trailing slash.
    /// ```rust
    /// use radix_router::Router;
    /// use hyper::Method;
    ///
    /// let mut router: Router<&str> = Router::new();
    /// router.register("GET", "/home", vec!["home"]).unwrap();
    ///
    /// let res = router.lookup(&Method::GET, "/home").unwrap();
    /// assert!(res.params.is_empty());
    /// assert_eq!(res.value[0], "home");
    /// ```
    pub fn lookup<'r, 'p>(
        &'r self,
        method: &Method,
        path: &'p str,
    ) -> Result<Match<'r, 'p, &'r HandlerChain<H>>, Tsr> {
        self.trees
            .get(method)
            .map_or(Err(Tsr::No), |root| root.at(path))
    }

    /// Resolves a request to a handler chain, a redirect hint, or the reason
    /// nothing could be matched.
    ///
    /// When the method's tree has no match the configured redirects are tried
    /// in the order given by [`RedirectPolicy`], then the other methods'
    /// trees are checked before giving up with [`Resolved::NotFound`].
    /// Redirects are never suggested for `CONNECT` requests or the path `/`.
    pub fn resolve<'r, 'p>(&'r self, method: &str, path: &'p str) -> Resolved<'r, 'p, H> {
        let method = Method::from_bytes(method.as_bytes()).ok();
        self.resolve_method(method.as_ref(), path)
    }

    pub(crate) fn resolve_method<'r, 'p>(
        &'r self,
        method: Option<&Method>,
        path: &'p str,
    ) -> Resolved<'r, 'p, H> {
        match self.lookup_path(path) {
            Cow::Owned(cleaned) => self.resolve_path(method, &cleaned).into_owned_values(),
            Cow::Borrowed(path) => self.resolve_path(method, path),
        }
    }

    // the request path as the trees see it, cleaned when `remove_extra_slash` is set
    pub(crate) fn lookup_path<'p>(&self, path: &'p str) -> Cow<'p, str> {
        if self.config.remove_extra_slash && path != "*" {
            clean(path)
        } else {
            Cow::Borrowed(path)
        }
    }

    fn resolve_path<'r, 'p>(
        &'r self,
        method: Option<&Method>,
        path: &'p str,
    ) -> Resolved<'r, 'p, H> {
        if let Some(root) = method.and_then(|method| self.trees.get(method)) {
            let mut params = Params::with_capacity(self.max_params);
            let mut skipped = Vec::with_capacity(self.max_sections);

            match root.at_with(path, &mut params, &mut skipped) {
                Ok((value, full_path)) => {
                    if self.config.unescape_path_values {
                        params.unescape();
                    }

                    return Resolved::Matched(Match {
                        value,
                        params,
                        full_path,
                    });
                }
                Err(tsr) => {
                    if method != Some(&Method::CONNECT) && path != "/" {
                        if let Some(redirect) = self.redirect(root, path, tsr) {
                            return redirect;
                        }
                    }
                }
            }
        }

        if self.config.handle_method_not_allowed {
            let allowed = self.allowed_except(method, path);

            if !allowed.is_empty() {
                trace!(path, ?allowed, "method not allowed");
                return Resolved::MethodNotAllowed(allowed);
            }
        }

        trace!(path, "no route found");
        Resolved::NotFound
    }

    fn redirect<'r, 'p>(
        &self,
        root: &Node<HandlerChain<H>>,
        path: &str,
        tsr: Tsr,
    ) -> Option<Resolved<'r, 'p, H>> {
        let trailing_slash = || {
            if tsr == Tsr::No || !self.config.redirect_trailing_slash {
                return None;
            }

            let redirect = if path.len() > 1 && path.ends_with('/') {
                path[..path.len() - 1].to_owned()
            } else {
                [path, "/"].concat()
            };

            trace!(path, %redirect, "trailing slash redirect");
            Some(Resolved::TrailingSlashRedirect(redirect))
        };

        let fixed_path = || {
            if !self.config.redirect_fixed_path {
                return None;
            }

            let redirect = root
                .path_ignore_case(clean(path), self.config.redirect_trailing_slash)
                .filter(|fixed| fixed != path)?;

            trace!(path, %redirect, "case corrected redirect");
            Some(Resolved::CaseCorrectedRedirect(redirect))
        };

        match self.config.redirect_policy {
            RedirectPolicy::TrailingSlashFirst => trailing_slash().or_else(fixed_path),
            RedirectPolicy::FixedPathFirst => fixed_path().or_else(trailing_slash),
        }
    }

    // the methods other than `method` that have a route matching the path
    fn allowed_except(&self, method: Option<&Method>, path: &str) -> Vec<&str> {
        let mut allowed = self
            .trees
            .iter()
            .filter(|&(other, _)| Some(other) != method)
            .filter(|(_, root)| root.at(path).is_ok())
            .map(|(other, _)| other.as_str())
            .collect::<Vec<_>>();

        allowed.sort_unstable();
        allowed
    }

    /// Returns a list of the allowed methods for a specific path, sorted,
    /// followed by `OPTIONS`. The path `*` lists every registered method.
    /// ```rust
    /// use radix_router::Router;
    ///
    /// let mut router: Router<&str> = Router::new();
    /// router.register("POST", "/home", vec!["create"]).unwrap();
    /// router.register("GET", "/home", vec!["show"]).unwrap();
    ///
    /// assert_eq!(router.allowed("/home"), ["GET", "POST", "OPTIONS"]);
    /// assert!(router.allowed("/away").is_empty());
    /// ```
    pub fn allowed(&self, path: &str) -> Vec<&str> {
        let mut allowed = match path {
            "*" => self
                .trees
                .keys()
                .filter(|&method| method != Method::OPTIONS)
                .map(Method::as_str)
                .collect::<Vec<_>>(),
            _ => self
                .trees
                .iter()
                .filter(|&(method, _)| method != Method::OPTIONS)
                .filter(|(_, root)| root.at(path).is_ok())
                .map(|(method, _)| method.as_str())
                .collect::<Vec<_>>(),
        };

        allowed.sort_unstable();

        if !allowed.is_empty() {
            allowed.push("OPTIONS");
        }

        allowed
    }

    /// Lists every registered route as `(method, path)`, sorted.
    pub fn routes(&self) -> Vec<(&str, &str)> {
        let mut routes = self
            .trees
            .iter()
            .flat_map(|(method, root)| {
                root.routes()
                    .into_iter()
                    .map(move |path| (method.as_str(), path))
            })
            .collect::<Vec<_>>();

        routes.sort_unstable();
        routes
    }

    /// Enables automatic redirection if the current route can't be matched but a
    /// handler for the path with (without) the trailing slash exists.
    pub fn redirect_trailing_slash(mut self, enabled: bool) -> Self {
        self.config.redirect_trailing_slash = enabled;
        self
    }

    /// If enabled, the router tries to fix the current request path with a
    /// case-insensitive lookup of the cleaned path.
    pub fn redirect_fixed_path(mut self, enabled: bool) -> Self {
        self.config.redirect_fixed_path = enabled;
        self
    }

    /// If enabled, the router checks if another method is allowed for the
    /// current route, if the current request can not be routed.
    pub fn handle_method_not_allowed(mut self, enabled: bool) -> Self {
        self.config.handle_method_not_allowed = enabled;
        self
    }

    /// If enabled, the router automatically replies to `OPTIONS` requests.
    pub fn handle_options(mut self, enabled: bool) -> Self {
        self.config.handle_options = enabled;
        self
    }

    pub fn unescape_path_values(mut self, enabled: bool) -> Self {
        self.config.unescape_path_values = enabled;
        self
    }

    pub fn remove_extra_slash(mut self, enabled: bool) -> Self {
        self.config.remove_extra_slash = enabled;
        self
    }

    pub fn redirect_policy(mut self, policy: RedirectPolicy) -> Self {
        self.config.redirect_policy = policy;
        self
    }
}

impl Router {
    /// Insert a handler into the router for a specific path at the specified method.
    ///
    /// # Panics
    ///
    /// Panics if the route can not be registered, see [`Router::register`].
    /// ```rust
    /// use radix_router::Router;
    /// use hyper::{Response, Body, Method, Request};
    ///
    /// let router = Router::default()
    ///     .handle("/teapot", Method::GET, |_: Request<Body>| async {
    ///         Ok(Response::new(Body::from("I am a teapot!")))
    ///     });
    /// ```
    pub fn handle(self, path: &str, method: Method, handler: impl Handler) -> Self {
        self.handle_chain(path, method, vec![Box::new(handler) as Box<dyn Handler>])
    }

    /// Insert a chain of handlers for a specific path at the specified method.
    /// The handlers run in order, each one deciding whether to call the next.
    ///
    /// # Panics
    ///
    /// Panics if the route can not be registered, see [`Router::register`].
    pub fn handle_chain(
        mut self,
        path: &str,
        method: Method,
        chain: Vec<Box<dyn Handler>>,
    ) -> Self {
        if let Err(err) = self.register(method.as_str(), path, chain) {
            panic!("{}", err);
        }

        self
    }

    /// Register a handler for `GET` requests
    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.handle(path, Method::GET, handler)
    }

    /// Register a handler for `HEAD` requests
    pub fn head(self, path: &str, handler: impl Handler) -> Self {
        self.handle(path, Method::HEAD, handler)
    }

    /// Register a handler for `OPTIONS` requests
    pub fn options(self, path: &str, handler: impl Handler) -> Self {
        self.handle(path, Method::OPTIONS, handler)
    }

    /// Register a handler for `POST` requests
    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.handle(path, Method::POST, handler)
    }

    /// Register a handler for `PUT` requests
    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.handle(path, Method::PUT, handler)
    }

    /// Register a handler for `PATCH` requests
    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.handle(path, Method::PATCH, handler)
    }

    /// Register a handler for `DELETE` requests
    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.handle(path, Method::DELETE, handler)
    }

    /// An optional handler that is called on automatic `OPTIONS` requests.
    /// The handler is only called if `handle_options` is true and no `OPTIONS`
    /// handler for the specific path was set.
    /// The `Allow` header is set on the handler's response.
    pub fn global_options(mut self, handler: impl Handler) -> Self {
        self.global_options = Some(HandlerChain::from(vec![Box::new(handler) as Box<dyn Handler>]));
        self
    }

    /// Configurable handler which is called when no matching route is
    /// found.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = Some(HandlerChain::from(vec![Box::new(handler) as Box<dyn Handler>]));
        self
    }

    /// A configurable handler which is called when a request
    /// cannot be routed and `handle_method_not_allowed` is true.
    /// The `Allow` header with allowed request methods is set on the
    /// handler's response.
    pub fn method_not_allowed(mut self, handler: impl Handler) -> Self {
        let chain = vec![Box::new(handler) as Box<dyn Handler>];
        self.method_not_allowed = Some(HandlerChain::from(chain));
        self
    }
}
