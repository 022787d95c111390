//! Router behaviour switches.

use serde::{Deserialize, Serialize};

/// Which redirect is tried first when a lookup misses and both a trailing
/// slash redirect and a fixed path redirect would apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectPolicy {
    /// Offer the trailing slash variant before attempting case correction.
    #[default]
    TrailingSlashFirst,
    /// Offer the cleaned, case-corrected path before the trailing slash variant.
    FixedPathFirst,
}

/// Configuration of a [`Router`](crate::Router).
///
/// Every field is optional when deserializing, missing fields take their
/// default value:
/// ```rust
/// # use radix_router::{RedirectPolicy, RouterConfig};
/// let config: RouterConfig = serde_json::from_str(r#"{ "redirect_fixed_path": false }"#).unwrap();
/// assert!(!config.redirect_fixed_path);
/// assert!(config.redirect_trailing_slash);
/// assert_eq!(config.redirect_policy, RedirectPolicy::TrailingSlashFirst);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Enables automatic redirection if the current route can't be matched but a
    /// handler for the path with (without) the trailing slash exists.
    /// For example if `/foo/` is requested but a route only exists for `/foo`, the
    /// client is redirected to `/foo` with HTTP status code 301 for `GET` requests
    /// and 308 for all other request methods.
    pub redirect_trailing_slash: bool,
    /// If enabled, the router tries to fix the current request path, if no
    /// handler is registered for it.
    /// First superfluous path elements like `../` or `//` are removed.
    /// Afterwards the router does a case-insensitive lookup of the cleaned path.
    /// If a handler can be found for this route, the router makes a redirection
    /// to the corrected path.
    /// For example `/FOO` and `/..//Foo` could be redirected to `/foo`.
    pub redirect_fixed_path: bool,
    /// If enabled, the router checks if another method is allowed for the
    /// current route, if the current request can not be routed.
    /// If this is the case, the request is answered with `MethodNotAllowed`
    /// and HTTP status code 405.
    pub handle_method_not_allowed: bool,
    /// If enabled, the router automatically replies to `OPTIONS` requests.
    /// Custom `OPTIONS` handlers take priority over automatic replies.
    pub handle_options: bool,
    /// Percent-decode parameter values after a successful match.
    pub unescape_path_values: bool,
    /// Clean the request path before it is looked up, so `/a//b/../c` is
    /// served by the route for `/a/c` without a redirect.
    pub remove_extra_slash: bool,
    pub redirect_policy: RedirectPolicy,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            handle_method_not_allowed: true,
            handle_options: true,
            unescape_path_values: false,
            remove_extra_slash: false,
            redirect_policy: RedirectPolicy::default(),
        }
    }
}
