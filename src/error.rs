//! Registration failures.

use thiserror::Error;

/// Represents errors that can occur when registering a route.
///
/// Lookups never fail, so this is the only error type the router produces.
/// [`InsertError::is_conflict`] separates routes that clash with an earlier
/// registration from patterns that are malformed on their own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    /// The route overlaps with a previously registered route: a duplicate
    /// path, a differently named wildcard at the same position, or a catch-all
    /// sharing its position with other segments.
    #[error("route '{route}' conflicts with existing route '{with}'")]
    Conflict {
        /// The route that failed to register.
        route: String,
        /// The registered path occupying the conflicting position.
        with: String,
    },
    /// The path was empty or did not begin with `/`.
    #[error("path must begin with '/', found: '{path}'")]
    EmptyPath {
        /// The rejected path.
        path: String,
    },
    /// The method was the empty string.
    #[error("HTTP method must not be empty")]
    EmptyMethod,
    /// The method is not a valid HTTP token.
    #[error("invalid HTTP method '{method}'")]
    InvalidMethod {
        /// The rejected method.
        method: String,
    },
    /// The handler chain had no handlers.
    #[error("there must be at least one handler")]
    EmptyHandlerChain,
    /// Catch-all parameters are only allowed at the end of a route, directly
    /// after a `/`.
    #[error("catch-all parameters are only allowed at the end of a route, after a '/'")]
    InvalidCatchAll,
    /// Only one wildcard is allowed per path segment.
    #[error("only one wildcard per path segment is allowed")]
    TooManyWildcards,
    /// Wildcards must have a non-empty name.
    #[error("wildcards must be named with a non-empty name")]
    UnnamedWildcard,
}

impl InsertError {
    pub(crate) fn conflict(route: &str, with: &str) -> Self {
        InsertError::Conflict {
            route: route.to_owned(),
            with: with.to_owned(),
        }
    }

    /// Returns `true` if the route clashed with an earlier registration, as
    /// opposed to being malformed by itself.
    pub fn is_conflict(&self) -> bool {
        matches!(self, InsertError::Conflict { .. })
    }
}
