//! Lexical path normalisation.

use std::borrow::Cow;

/// Returns the canonical URL path for `p`, eliminating `.` and `..` elements.
///
/// The following rules are applied iteratively until no further processing can
/// be done:
/// 1. Replace multiple slashes with a single slash.
/// 2. Eliminate each `.` path name element (the current directory).
/// 3. Eliminate each inner `..` path name element (the parent directory)
///    along with the non-`..` element that precedes it.
/// 4. Eliminate `..` elements that begin a rooted path:
///    that is, replace `/..` by `/` at the beginning of a path.
///
/// If the result of this process is an empty string, `/` is returned.
/// A trailing slash is preserved.
/// ```rust
/// use radix_router::path::clean;
///
/// assert_eq!(clean("/abc//def/../ghi/"), "/abc/ghi/");
/// assert_eq!(clean("../a/./b"), "/a/b");
/// ```
pub fn clean(p: &str) -> Cow<'_, str> {
    if p.is_empty() {
        return Cow::Borrowed("/");
    }

    let bytes = p.as_bytes();
    let n = bytes.len();

    let mut buf = Vec::with_capacity(n + 1);
    buf.push(b'/');

    // reading from bytes, writing to buf
    let mut r = if bytes[0] == b'/' { 1 } else { 0 };
    let mut trailing = n > 1 && bytes[n - 1] == b'/';

    while r < n {
        match bytes[r] {
            // empty path element
            b'/' => r += 1,
            // trailing `.`
            b'.' if r + 1 == n => {
                trailing = true;
                r += 1;
            }
            // `./`
            b'.' if bytes[r + 1] == b'/' => r += 2,
            // `..` element, remove the last written element
            b'.' if bytes[r + 1] == b'.' && (r + 2 == n || bytes[r + 2] == b'/') => {
                r += 3;
                while buf.len() > 1 && buf.pop() != Some(b'/') {}
            }
            _ => {
                // real path element, add a slash if needed
                if buf.len() > 1 {
                    buf.push(b'/');
                }

                while r < n && bytes[r] != b'/' {
                    buf.push(bytes[r]);
                    r += 1;
                }
            }
        }
    }

    if trailing && buf.len() > 1 {
        buf.push(b'/');
    }

    if buf == bytes {
        return Cow::Borrowed(p);
    }

    // elements are only ever split on ascii bytes
    Cow::Owned(String::from_utf8_lossy(&buf).into_owned())
}
