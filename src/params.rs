use std::borrow::Cow;
use std::ops::Index;
use std::slice;

use percent_encoding::percent_decode_str;

/// A single URL parameter, consisting of a key and a value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Param<'k, 'v> {
    pub key: Cow<'k, str>,
    pub value: Cow<'v, str>,
}

/// A list of parameters returned by a route match, in the order their
/// segments appear in the path.
///
/// Keys borrow from the routing tree and values from the request path until
/// [`Params::into_owned`] is called.
/// ```rust
/// # use radix_router::Router;
/// let mut router: Router<&str> = Router::new();
/// router.register("GET", "/users/:id", vec!["users"]).unwrap();
///
/// let matched = router.resolve("GET", "/users/1").into_match().unwrap();
/// assert_eq!(matched.params.get("id"), Some("1"));
/// assert_eq!(matched.params[0].key, "id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params<'k, 'v> {
    vec: Vec<Param<'k, 'v>>,
}

impl<'k, 'v> Params<'k, 'v> {
    pub fn new() -> Self {
        Self { vec: Vec::new() }
    }

    /// Creates an empty list with room for `capacity` parameters.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vec: Vec::with_capacity(capacity),
        }
    }

    /// Returns the value of the first parameter whose key matches the given name.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();
        self.vec
            .iter()
            .find(|param| param.key == name)
            .map(|param| param.value.as_ref())
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Param<'k, 'v>> {
        self.vec.iter()
    }

    pub(crate) fn push(&mut self, key: &'k str, value: &'v str) {
        self.vec.push(Param {
            key: Cow::Borrowed(key),
            value: Cow::Borrowed(value),
        });
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.vec.truncate(len);
    }

    pub(crate) fn clear(&mut self) {
        self.vec.clear();
    }

    /// Percent-decodes every value in place.
    ///
    /// Values that do not decode to valid UTF-8 are left untouched.
    pub fn unescape(&mut self) {
        for param in &mut self.vec {
            if !param.value.contains('%') {
                continue;
            }

            let decoded = match percent_decode_str(&param.value).decode_utf8() {
                Ok(Cow::Owned(decoded)) => decoded,
                _ => continue,
            };

            param.value = Cow::Owned(decoded);
        }
    }

    /// Copies the values so the list no longer borrows from the request path.
    pub fn into_owned_values(self) -> Params<'k, 'static> {
        Params {
            vec: self
                .vec
                .into_iter()
                .map(|param| Param {
                    key: param.key,
                    value: Cow::Owned(param.value.into_owned()),
                })
                .collect(),
        }
    }

    /// Copies keys and values so the list can outlive both the router and
    /// the request path.
    pub fn into_owned(self) -> Params<'static, 'static> {
        Params {
            vec: self
                .vec
                .into_iter()
                .map(|param| Param {
                    key: Cow::Owned(param.key.into_owned()),
                    value: Cow::Owned(param.value.into_owned()),
                })
                .collect(),
        }
    }
}

impl<'k, 'v> Index<usize> for Params<'k, 'v> {
    type Output = Param<'k, 'v>;

    fn index(&self, i: usize) -> &Self::Output {
        &self.vec[i]
    }
}

impl<'a, 'k, 'v> IntoIterator for &'a Params<'k, 'v> {
    type Item = &'a Param<'k, 'v>;
    type IntoIter = slice::Iter<'a, Param<'k, 'v>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
