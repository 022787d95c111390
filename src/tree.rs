//! The compressed radix tree backing each HTTP method.
//!
//! Every node stores the segment of the path it represents, the first byte of
//! each static child in `indices`, and at most one wildcard child which is
//! always kept last. Children are ordered by priority, the number of routes
//! registered through them, so that busier branches are probed first.
use std::cmp::min;
use std::mem;
use std::str;

use crate::error::InsertError;
use crate::params::Params;

/// The types of nodes the tree can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// The root path.
    Root,
    /// A route parameter, ex: `/:id`.
    Param,
    /// A catch-all parameter, ex: `/*file`.
    CatchAll,
    /// Anything else.
    Static,
}

/// Whether a path that failed to match would match with a trailing slash
/// added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tsr {
    Yes,
    No,
}

impl From<bool> for Tsr {
    fn from(tsr: bool) -> Self {
        if tsr {
            Tsr::Yes
        } else {
            Tsr::No
        }
    }
}

/// A successful match: the stored value, the parameters bound while walking
/// the tree, and the route pattern the value was registered under.
#[derive(Debug)]
pub struct Match<'n, 'p, V> {
    pub value: V,
    pub params: Params<'n, 'p>,
    pub full_path: &'n str,
}

/// A wildcard branch that was passed over in favour of a static child, kept so
/// the lookup can resume there if the static branch dead-ends.
pub struct Skipped<'n, T> {
    node: &'n Node<T>,
    // length of the path that was left when the node was reached
    path_len: usize,
    // number of parameters bound at that point
    params: usize,
}

// a child taken while walking down to insert a route
#[derive(Clone, Copy)]
enum Step {
    // the static child indexed by this byte
    Static(u8),
    // the only child of a param node
    Only,
    // the wildcard child
    Wild,
}

/// A radix tree used for URL path matching.
pub struct Node<T> {
    priority: u32,
    wild_child: bool,
    indices: Vec<u8>,
    node_type: NodeType,
    prefix: Vec<u8>,
    full_path: String,
    children: Vec<Self>,
    value: Option<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            priority: 0,
            wild_child: false,
            indices: Vec::new(),
            node_type: NodeType::Static,
            prefix: Vec::new(),
            full_path: String::new(),
            children: Vec::new(),
            value: None,
        }
    }
}

impl<T> Node<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing has been inserted into the tree.
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty() && self.children.is_empty() && self.value.is_none()
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// The route pattern up to and including this node. For nodes holding a
    /// value this is the full registered route.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn children(&self) -> &[Self] {
        &self.children
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Registers `value` under `route`.
    ///
    /// Routes that fail to validate leave the tree untouched. A route rejected
    /// for conflicting with an existing one may still have split a shared
    /// prefix, but priorities and child order only change once a route is
    /// stored.
    pub fn insert(&mut self, route: &str, value: T) -> Result<(), InsertError> {
        validate(route.as_bytes())?;

        let mut walked = Vec::new();
        self.insert_route(route, value, &mut walked)?;
        self.bump_priorities(&walked);

        Ok(())
    }

    // stores the value, recording every existing child passed on the way down
    fn insert_route(
        &mut self,
        route: &str,
        value: T,
        walked: &mut Vec<Step>,
    ) -> Result<(), InsertError> {
        let bytes = route.as_bytes();
        let mut prefix = bytes;
        // offset of the current node's prefix within the route
        let mut offset = 0;

        // the tree is empty
        if self.is_empty() {
            self.insert_child(prefix, route, offset, value);
            self.node_type = NodeType::Root;
            return Ok(());
        }

        let mut current = self;

        'walk: loop {
            // find the longest common prefix
            let len = min(prefix.len(), current.prefix.len());
            let common_prefix = (0..len)
                .find(|&i| prefix[i] != current.prefix[i])
                .unwrap_or(len);

            // the common prefix is a substring of the current node's prefix, split the node
            if common_prefix < current.prefix.len() {
                let child = Node {
                    prefix: current.prefix[common_prefix..].to_vec(),
                    children: mem::take(&mut current.children),
                    wild_child: current.wild_child,
                    indices: mem::take(&mut current.indices),
                    value: current.value.take(),
                    full_path: mem::take(&mut current.full_path),
                    priority: current.priority,
                    node_type: NodeType::Static,
                };

                // the current node now holds only the common prefix
                current.indices = vec![child.prefix[0]];
                current.children = vec![child];
                current.prefix.truncate(common_prefix);
                current.full_path = full_path(route, offset + common_prefix);
                current.wild_child = false;
            }

            // the route has a common prefix, search deeper
            if prefix.len() > common_prefix {
                prefix = &prefix[common_prefix..];
                offset += common_prefix;

                let next = prefix[0];

                // `/` after param
                if current.node_type == NodeType::Param
                    && next == b'/'
                    && current.children.len() == 1
                {
                    walked.push(Step::Only);
                    current = &mut current.children[0];

                    continue 'walk;
                }

                // find a child that matches the next path byte
                if let Some(i) = current.indices.iter().position(|&c| c == next) {
                    walked.push(Step::Static(next));
                    current = &mut current.children[i];
                    continue 'walk;
                }

                let wildcard = matches!(next, b':' | b'*');

                // nothing can live next to a catch-all
                if !wildcard {
                    if let Some(catch_all) = current.catch_all() {
                        return Err(InsertError::conflict(route, &catch_all.full_path));
                    }

                    // there is no matching child node, create a new one
                    current.indices.push(next);
                    let child = current.add_child(Node::default());
                    let child = current.update_child_priority(child);
                    current.children[child].insert_child(prefix, route, offset, value);
                    return Ok(());
                }

                // inserting a wildcard, and this node already has a wildcard child
                if current.wild_child {
                    // wildcards are always at the end
                    let last = current.children.len() - 1;
                    walked.push(Step::Wild);
                    current = &mut current.children[last];

                    // make sure the wildcard matches
                    if prefix.len() < current.prefix.len()
                        || current.prefix[..] != prefix[..current.prefix.len()]
                        // catch-alls cannot have children or duplicates
                        || current.node_type == NodeType::CatchAll
                        // check for longer wildcard, e.g. :name and :names
                        || (current.prefix.len() < prefix.len()
                            && prefix[current.prefix.len()] != b'/')
                    {
                        return Err(InsertError::conflict(route, &current.full_path));
                    }

                    continue 'walk;
                }

                // a catch-all cannot share its position with anything
                if next == b'*' && (current.value.is_some() || !current.children.is_empty()) {
                    return Err(InsertError::conflict(route, current.any_route()));
                }

                // otherwise, create the wildcard node
                current.insert_child(prefix, route, offset, value);
                return Ok(());
            }

            // exact match, this node should be empty
            if current.value.is_some() {
                return Err(InsertError::conflict(route, &current.full_path));
            }

            // the directory a catch-all is registered under belongs to it
            if let Some(catch_all) = current.catch_all() {
                return Err(InsertError::conflict(route, &catch_all.full_path));
            }

            // add the value to current node
            current.value = Some(value);
            current.full_path = route.to_owned();

            return Ok(());
        }
    }

    // counts a stored route against the root and every existing node walked
    // through, reordering static siblings as their priorities grow
    fn bump_priorities(&mut self, walked: &[Step]) {
        self.priority += 1;

        let mut current = self;
        for &step in walked {
            let i = match step {
                Step::Static(c) => match current.indices.iter().position(|&i| i == c) {
                    Some(i) => current.update_child_priority(i),
                    None => return,
                },
                Step::Only => {
                    current.children[0].priority += 1;
                    0
                }
                Step::Wild => {
                    let last = current.children.len() - 1;
                    current.children[last].priority += 1;
                    last
                }
            };

            current = &mut current.children[i];
        }
    }

    // add a child node, keeping wildcards at the end
    fn add_child(&mut self, child: Node<T>) -> usize {
        let len = self.children.len();

        if self.wild_child && len > 0 {
            self.children.insert(len - 1, child);
            len - 1
        } else {
            self.children.push(child);
            len
        }
    }

    // increments priority of the given child and reorders if necessary.
    //
    // returns the new index of the child
    fn update_child_priority(&mut self, i: usize) -> usize {
        self.children[i].priority += 1;
        let priority = self.children[i].priority;

        // adjust position (move to front)
        let mut updated = i;
        while updated > 0 && self.children[updated - 1].priority < priority {
            // swap node positions
            self.children.swap(updated - 1, updated);
            updated -= 1;
        }

        // build new index list
        if updated != i {
            self.indices = [
                &self.indices[..updated],  // unchanged prefix, might be empty
                &self.indices[i..=i],      // the index char we move
                &self.indices[updated..i], // rest without char at 'pos'
                &self.indices[i + 1..],
            ]
            .concat();
        }

        updated
    }

    // insert a child node at this node, the route has already been validated
    fn insert_child(&mut self, mut prefix: &[u8], route: &str, mut offset: usize, value: T) {
        let mut current = self;

        loop {
            // search for a wildcard segment
            let (wildcard, wildcard_index) = match find_wildcard(prefix) {
                Some(found) => found,
                // no wildcard, simply use the current node
                None => {
                    current.prefix = prefix.to_vec();
                    current.full_path = route.to_owned();
                    current.value = Some(value);
                    return;
                }
            };

            // insert prefix before the current wildcard
            if wildcard_index > 0 {
                current.prefix = prefix[..wildcard_index].to_vec();
                current.full_path = full_path(route, offset + wildcard_index);
                prefix = &prefix[wildcard_index..];
                offset += wildcard_index;
            }

            // catch-all route, always the final segment
            if wildcard[0] == b'*' {
                let child = Self {
                    prefix: prefix.to_vec(),
                    node_type: NodeType::CatchAll,
                    full_path: route.to_owned(),
                    value: Some(value),
                    priority: 1,
                    ..Self::default()
                };

                current.add_child(child);
                current.wild_child = true;
                return;
            }

            // regular route parameter
            let child = Self {
                node_type: NodeType::Param,
                prefix: wildcard.to_vec(),
                full_path: full_path(route, offset + wildcard.len()),
                ..Self::default()
            };

            let child = current.add_child(child);
            current.wild_child = true;
            current = &mut current.children[child];
            current.priority += 1;

            // if the route doesn't end with the wildcard, then there
            // will be another non-wildcard subroute starting with '/'
            if wildcard.len() < prefix.len() {
                prefix = &prefix[wildcard.len()..];
                offset += wildcard.len();

                let child = Self {
                    priority: 1,
                    ..Self::default()
                };

                let child = current.add_child(child);
                current = &mut current.children[child];
                continue;
            }

            // otherwise we're done. Insert the value in the new leaf
            current.value = Some(value);
            return;
        }
    }

    // the wildcard child, if it is a catch-all
    fn catch_all(&self) -> Option<&Self> {
        if !self.wild_child {
            return None;
        }

        self.children
            .last()
            .filter(|child| child.node_type == NodeType::CatchAll)
    }

    // the name a param or catch-all node binds its value to
    fn wildcard_name(&self) -> &str {
        // wildcard segments are never split and begin with an ascii marker
        str::from_utf8(&self.prefix[1..]).unwrap_or_default()
    }

    // whether a path ending exactly at this node has a value, either here or
    // through an empty catch-all
    fn is_endpoint(&self) -> bool {
        self.value.is_some() || self.catch_all().is_some()
    }

    // some route registered at or below this node, for conflict reports
    fn any_route(&self) -> &str {
        let mut current = self;
        while current.value.is_none() {
            match current.children.first() {
                Some(child) => current = child,
                None => break,
            }
        }
        &current.full_path
    }

    /// Collects the full path of every route stored in the tree.
    pub fn routes(&self) -> Vec<&str> {
        let mut routes = Vec::new();
        self.collect_routes(&mut routes);
        routes
    }

    fn collect_routes<'n>(&'n self, routes: &mut Vec<&'n str>) {
        if self.value.is_some() {
            routes.push(&self.full_path);
        }

        for child in &self.children {
            child.collect_routes(routes);
        }
    }
}

impl<T> Node<T> {
    /// Returns the value registered under the route matching `path`.
    ///
    /// If no route matches, the returned [`Tsr`] tells whether the same path
    /// with a trailing slash added or removed would.
    pub fn at<'n, 'p>(&'n self, path: &'p str) -> Result<Match<'n, 'p, &'n T>, Tsr> {
        let mut params = Params::new();
        let mut skipped = Vec::new();
        let (value, full_path) = self.at_with(path, &mut params, &mut skipped)?;

        Ok(Match {
            value,
            params,
            full_path,
        })
    }

    /// Like [`Node::at`], but binds parameters into `params` and uses `skipped`
    /// as the backtracking stack, so both buffers can be sized once and reused
    /// across lookups. Both are cleared before the walk starts.
    pub fn at_with<'n, 'p>(
        &'n self,
        full: &'p str,
        params: &mut Params<'n, 'p>,
        skipped: &mut Vec<Skipped<'n, T>>,
    ) -> Result<(&'n T, &'n str), Tsr> {
        params.clear();
        skipped.clear();

        let mut current = self;
        let mut path = full.as_bytes();
        let mut backtracking = false;
        let mut tsr = false;

        loop {
            // the path is longer than this node's prefix, we are expecting a child node
            if path.len() > current.prefix.len() {
                if path.starts_with(&current.prefix) {
                    let consumed = path.len();
                    path = &path[current.prefix.len()..];

                    // try searching for a matching static child unless we are currently
                    // backtracking, which would mean we already traversed them
                    if !backtracking {
                        if let Some(i) = current.indices.iter().position(|&c| c == path[0]) {
                            // keep track of wildcard routes we skipped to backtrack to later if
                            // we don't find a match
                            if current.wild_child {
                                skipped.push(Skipped {
                                    node: current,
                                    path_len: consumed,
                                    params: params.len(),
                                });
                            }

                            // "/a/" requested, "/a" registered
                            tsr |= path == b"/" && current.value.is_some();

                            // continue with the child node
                            current = &current.children[i];
                            continue;
                        }
                    }

                    backtracking = false;

                    if !current.wild_child {
                        // "/a/" requested, "/a" registered
                        tsr |= path == b"/" && current.value.is_some();
                    } else {
                        // handle the wildcard child, which is always at the end of the list
                        let wild = &current.children[current.children.len() - 1];
                        let start = full.len() - path.len();

                        match wild.node_type {
                            NodeType::Param => {
                                // a parameter matches a single, non-empty segment
                                let end = path
                                    .iter()
                                    .position(|&c| c == b'/')
                                    .unwrap_or(path.len());

                                let value = full.get(start..start + end).filter(|_| end > 0);
                                if let Some(value) = value {
                                    params.push(wild.wildcard_name(), value);

                                    if end < path.len() {
                                        // "/user/1/" requested, "/user/:id" registered
                                        tsr |= path.len() == end + 1 && wild.value.is_some();

                                        // continue with the child node
                                        if let [child] = wild.children.as_slice() {
                                            path = &path[end..];
                                            current = child;
                                            continue;
                                        }
                                    } else if let Some(value) = &wild.value {
                                        return Ok((value, &wild.full_path));
                                    } else if let [child] = wild.children.as_slice() {
                                        // "/user/1" requested, "/user/:id/" registered
                                        tsr |= child.prefix == b"/" && child.is_endpoint();
                                    }
                                }
                            }
                            NodeType::CatchAll => {
                                // catch-alls are terminal, either this node has the value or
                                // there is no match
                                let rest = full.get(start..);
                                if let (Some(value), Some(rest)) = (&wild.value, rest) {
                                    params.push(wild.wildcard_name(), rest);
                                    return Ok((value, &wild.full_path));
                                }
                            }
                            NodeType::Root | NodeType::Static => {}
                        }
                    }
                }
            } else if path == &current.prefix[..] {
                // this is it, we should have reached the node containing the value
                if let Some(value) = &current.value {
                    return Ok((value, &current.full_path));
                }

                // an empty catch-all, "/files/" matching "/files/*path"
                if let Some(catch_all) = current.catch_all() {
                    if let Some(value) = &catch_all.value {
                        params.push(catch_all.wildcard_name(), "");
                        return Ok((value, &catch_all.full_path));
                    }
                }

                // "/a" requested, "/a/" registered
                if let Some(i) = current.indices.iter().position(|&c| c == b'/') {
                    let child = &current.children[i];
                    tsr |= child.prefix == b"/" && child.is_endpoint();
                }
            } else {
                // "/a" requested, "/a/" registered as the end of this node
                tsr |= current.prefix.len() == path.len() + 1
                    && current.prefix.starts_with(path)
                    && current.prefix.ends_with(b"/")
                    && current.is_endpoint();
            }

            // dead end, try backtracking to any matching wildcard nodes we
            // skipped while traversing the tree
            match skipped.pop() {
                Some(skip) => {
                    path = &full.as_bytes()[full.len() - skip.path_len..];
                    current = skip.node;
                    params.truncate(skip.params);
                    backtracking = true;
                }
                None => return Err(Tsr::from(tsr)),
            }
        }
    }

    /// Makes a case-insensitive lookup of the given path and tries to find a
    /// route for it, folding ascii letters only.
    ///
    /// On success the path as it was registered is returned, with parameter
    /// values kept as they appear in `path`. If `fix_trailing_slash` is set a
    /// missing or superfluous trailing slash is corrected as well.
    pub fn path_ignore_case(
        &self,
        path: impl AsRef<str>,
        fix_trailing_slash: bool,
    ) -> Option<String> {
        let path = path.as_ref();
        let mut insensitive = Vec::with_capacity(path.len() + 1);

        if self.find_ignore_case(path.as_bytes(), &mut insensitive, fix_trailing_slash) {
            // every byte either came from the path or from a route whose
            // ascii letters it folded onto, so the result is still utf-8
            String::from_utf8(insensitive).ok()
        } else {
            None
        }
    }

    // recursive case-insensitive lookup on a static node
    fn find_ignore_case(&self, path: &[u8], out: &mut Vec<u8>, fix: bool) -> bool {
        let len = self.prefix.len();

        if path.len() < len || !path[..len].eq_ignore_ascii_case(&self.prefix) {
            // "/a" requested, "/a/" registered as the end of this node
            if fix
                && path.len() + 1 == len
                && self.prefix[path.len()] == b'/'
                && path.eq_ignore_ascii_case(&self.prefix[..path.len()])
                && self.is_endpoint()
            {
                out.extend_from_slice(&self.prefix);
                return true;
            }

            return false;
        }

        let restore = out.len();
        out.extend_from_slice(&self.prefix);
        let path = &path[len..];

        if path.is_empty() {
            if self.is_endpoint() {
                return true;
            }

            // no value found, try to fix the path by adding a trailing slash
            if fix {
                if let Some(i) = self.indices.iter().position(|&c| c == b'/') {
                    let child = &self.children[i];
                    if child.prefix == b"/" && child.is_endpoint() {
                        out.push(b'/');
                        return true;
                    }
                }
            }

            out.truncate(restore);
            return false;
        }

        // static children whose first byte matches in either case
        for (i, &c) in self.indices.iter().enumerate() {
            if c.eq_ignore_ascii_case(&path[0])
                && self.children[i].find_ignore_case(path, out, fix)
            {
                return true;
            }
        }

        if self.wild_child {
            let wild = &self.children[self.children.len() - 1];
            if wild.find_wild_ignore_case(path, out, fix) {
                return true;
            }
        }

        // "/a/" requested, "/a" registered
        if fix && path == b"/" && self.value.is_some() {
            return true;
        }

        out.truncate(restore);
        false
    }

    // case-insensitive lookup on a wildcard node, the values are kept as is
    fn find_wild_ignore_case(&self, path: &[u8], out: &mut Vec<u8>, fix: bool) -> bool {
        match self.node_type {
            NodeType::Param => {
                let end = path.iter().position(|&c| c == b'/').unwrap_or(path.len());
                if end == 0 {
                    return false;
                }

                let restore = out.len();
                out.extend_from_slice(&path[..end]);

                if end < path.len() {
                    if let [child] = self.children.as_slice() {
                        if child.find_ignore_case(&path[end..], out, fix) {
                            return true;
                        }
                    }

                    // "/user/1/" requested, "/user/:id" registered
                    if fix && path.len() == end + 1 && self.value.is_some() {
                        return true;
                    }
                } else if self.value.is_some() {
                    return true;
                } else if fix {
                    // "/user/1" requested, "/user/:id/" registered
                    if let [child] = self.children.as_slice() {
                        if child.prefix == b"/" && child.is_endpoint() {
                            out.push(b'/');
                            return true;
                        }
                    }
                }

                out.truncate(restore);
                false
            }
            NodeType::CatchAll => {
                out.extend_from_slice(path);
                true
            }
            NodeType::Root | NodeType::Static => false,
        }
    }
}

/// Counts the wildcards in a route.
pub(crate) fn count_params(path: &str) -> usize {
    path.bytes().filter(|&c| c == b':' || c == b'*').count()
}

/// Counts the `/` separated sections of a route.
pub(crate) fn count_sections(path: &str) -> usize {
    path.bytes().filter(|&c| c == b'/').count()
}

// the route up to `end`, backed off to the nearest character boundary
fn full_path(route: &str, mut end: usize) -> String {
    while !route.is_char_boundary(end) {
        end -= 1;
    }

    route[..end].to_owned()
}

// Searches for a wildcard segment, returning it along with its index.
// A wildcard starts with ':' (param) or '*' (catch-all) and runs to the next '/'.
fn find_wildcard(path: &[u8]) -> Option<(&[u8], usize)> {
    let start = path.iter().position(|&c| c == b':' || c == b'*')?;
    let end = path[start..]
        .iter()
        .position(|&c| c == b'/')
        .map_or(path.len(), |i| start + i);

    Some((&path[start..end], start))
}

// Checks every wildcard in the route before anything is inserted.
fn validate(route: &[u8]) -> Result<(), InsertError> {
    let mut offset = 0;

    while let Some((wildcard, i)) = find_wildcard(&route[offset..]) {
        let start = offset + i;

        // the wildcard name must only contain one ':' or '*' character
        if wildcard[1..].iter().any(|&c| c == b':' || c == b'*') {
            return Err(InsertError::TooManyWildcards);
        }

        if wildcard.len() < 2 {
            return Err(InsertError::UnnamedWildcard);
        }

        // catch-alls come last, directly after a '/'
        if wildcard[0] == b'*'
            && (start + wildcard.len() != route.len() || start == 0 || route[start - 1] != b'/')
        {
            return Err(InsertError::InvalidCatchAll);
        }

        offset = start + wildcard.len();
    }

    Ok(())
}

#[cfg(test)]
const _: () = {
    use std::fmt::{self, Debug, Formatter};

    // visualize the tree structure when debugging
    impl<T: Debug> Debug for Node<T> {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            let indices = self
                .indices
                .iter()
                .map(|&x| char::from(x))
                .collect::<Vec<_>>();

            let mut fmt = f.debug_struct("Node");
            fmt.field("value", &self.value);
            fmt.field("prefix", &String::from_utf8_lossy(&self.prefix));
            fmt.field("node_type", &self.node_type);
            fmt.field("priority", &self.priority);
            fmt.field("children", &self.children);
            fmt.field("indices", &indices);
            fmt.finish()
        }
    }
};
