//! Route matching
//!
//! Patterns without placeholders live in a flat map keyed by the normalized
//! path. Everything else is stored in a segment trie:
//!
//! - `users` static segment
//! - `{id}` dynamic segment matching any single segment
//! - `{id:\d+}` dynamic segment constrained by an anchored regex
//! - `{*path}` catch-all consuming the remaining segments (final segment only)
//!
//! Lookup prefers static children, then dynamic children (higher route
//! priority first, then registration order), then the catch-all, and
//! backtracks when a branch fails further down.

use super::route::Route;
use crate::http::RouteParams;
use crate::logging::{trace, warn};
use crate::{Error, Result};
use regex::Regex;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

/// One parsed segment of a route pattern.
#[derive(Debug, Clone)]
pub(crate) enum Segment {
    Static(String),
    Param {
        name: String,
        pattern: Option<String>,
        regex: Option<Regex>,
    },
    CatchAll(String),
}

fn invalid(pattern: &str, reason: impl Into<String>) -> Error {
    Error::InvalidRoute {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split a route pattern into segments, validating placeholders.
pub(crate) fn parse_pattern(pattern: &str) -> Result<Vec<Segment>> {
    let raw: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let mut segments = Vec::with_capacity(raw.len());
    let mut names: Vec<&str> = Vec::new();

    for (index, part) in raw.iter().enumerate() {
        if !part.contains('{') {
            if part.contains('}') {
                return Err(invalid(pattern, format!("unmatched '}}' in '{}'", part)));
            }
            segments.push(Segment::Static(part.to_string()));
            continue;
        }

        let inner = part
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| invalid(pattern, format!("placeholder '{}' must span the whole segment", part)))?;

        if let Some(name) = inner.strip_prefix('*') {
            if !valid_name(name) {
                return Err(invalid(pattern, format!("invalid catch-all name '{}'", name)));
            }
            if index + 1 != raw.len() {
                return Err(invalid(pattern, "catch-all must be the final segment"));
            }
            if names.contains(&name) {
                return Err(invalid(pattern, format!("duplicate parameter '{}'", name)));
            }
            names.push(name);
            segments.push(Segment::CatchAll(name.to_string()));
            continue;
        }

        let (name, pattern_src) = match inner.split_once(':') {
            Some((name, re)) => (name, Some(re)),
            None => (inner, None),
        };
        if !valid_name(name) {
            return Err(invalid(pattern, format!("invalid parameter name '{}'", name)));
        }
        if names.contains(&name) {
            return Err(invalid(pattern, format!("duplicate parameter '{}'", name)));
        }
        names.push(name);

        let regex = match pattern_src {
            None => None,
            Some("") => return Err(invalid(pattern, format!("empty regex for '{}'", name))),
            Some(re) => Some(
                Regex::new(&format!("^(?:{})$", re))
                    .map_err(|e| invalid(pattern, format!("bad regex for '{}': {}", name, e)))?,
            ),
        };
        segments.push(Segment::Param {
            name: name.to_string(),
            pattern: pattern_src.map(str::to_string),
            regex,
        });
    }

    Ok(segments)
}

/// Normalized static key: leading slash, no empty segments.
fn static_key<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let mut key = String::new();
    for segment in segments {
        key.push('/');
        key.push_str(segment);
    }
    if key.is_empty() {
        key.push('/');
    }
    key
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn merge_methods(allowed: &mut Vec<String>, methods: impl Iterator<Item = String>) {
    for method in methods {
        if !allowed.contains(&method) {
            allowed.push(method);
        }
    }
}

/// Routes registered at one trie position, by method. `"*"` matches any.
#[derive(Default)]
struct MethodMap {
    entries: Vec<(String, Arc<Route>)>,
}

impl MethodMap {
    fn insert(&mut self, method: &str, route: Arc<Route>) {
        match self.entries.iter_mut().find(|(m, _)| m == method) {
            Some(entry) => {
                warn!(method, path = route.path(), "Route replaced");
                entry.1 = route;
            }
            None => self.entries.push((method.to_string(), route)),
        }
    }

    fn get(&self, method: &str) -> Option<&Arc<Route>> {
        self.entries
            .iter()
            .find(|(m, _)| m.eq_ignore_ascii_case(method))
            .or_else(|| self.entries.iter().find(|(m, _)| m == "*"))
            .map(|(_, route)| route)
    }

    fn methods(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|(m, _)| m.clone())
    }
}

struct DynamicChild {
    name: String,
    pattern: Option<String>,
    regex: Option<Regex>,
    priority: i32,
    node: Node,
}

impl DynamicChild {
    fn matches(&self, value: &str) -> bool {
        self.regex.as_ref().is_none_or(|re| re.is_match(value))
    }
}

struct CatchAll {
    name: String,
    routes: MethodMap,
}

type Captures<'a> = SmallVec<[(&'a str, String); 4]>;

#[derive(Default)]
struct Node {
    routes: MethodMap,
    statics: HashMap<String, Node>,
    dynamics: Vec<DynamicChild>,
    catch_all: Option<CatchAll>,
}

impl Node {
    fn dynamic_child(&mut self, name: &str, pattern: &Option<String>, regex: &Option<Regex>, priority: i32) -> &mut Node {
        let index = match self
            .dynamics
            .iter()
            .position(|child| child.name == name && &child.pattern == pattern)
        {
            Some(index) => {
                let child = &mut self.dynamics[index];
                child.priority = child.priority.max(priority);
                index
            }
            None => {
                self.dynamics.push(DynamicChild {
                    name: name.to_string(),
                    pattern: pattern.clone(),
                    regex: regex.clone(),
                    priority,
                    node: Node::default(),
                });
                self.dynamics.len() - 1
            }
        };

        // Stable: equal priorities keep registration order.
        let key = (name.to_string(), pattern.clone());
        self.dynamics.sort_by_key(|child| Reverse(child.priority));
        let index = self
            .dynamics
            .iter()
            .position(|child| child.name == key.0 && child.pattern == key.1)
            .unwrap_or(index);
        &mut self.dynamics[index].node
    }

    fn find<'a>(
        &'a self,
        method: &str,
        segments: &[&str],
        captures: &mut Captures<'a>,
        allowed: &mut Vec<String>,
    ) -> Option<&'a Arc<Route>> {
        let Some((first, rest)) = segments.split_first() else {
            if let Some(route) = self.routes.get(method) {
                return Some(route);
            }
            merge_methods(allowed, self.routes.methods());
            return None;
        };

        if let Some(child) = self.statics.get(*first) {
            if let Some(route) = child.find(method, rest, captures, allowed) {
                return Some(route);
            }
        }

        if !self.dynamics.is_empty() {
            let value = decode(first);
            for child in &self.dynamics {
                if !child.matches(&value) {
                    continue;
                }
                captures.push((child.name.as_str(), value.clone()));
                if let Some(route) = child.node.find(method, rest, captures, allowed) {
                    return Some(route);
                }
                captures.pop();
            }
        }

        if let Some(catch_all) = &self.catch_all {
            if let Some(route) = catch_all.routes.get(method) {
                captures.push((catch_all.name.as_str(), decode(&segments.join("/"))));
                return Some(route);
            }
            merge_methods(allowed, catch_all.routes.methods());
        }

        None
    }
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub params: RouteParams,
}

/// Static map plus segment trie, with a reverse index of named routes.
#[derive(Default)]
pub struct RouteTrie {
    statics: HashMap<String, MethodMap>,
    root: Node,
    names: HashMap<String, Arc<Route>>,
    routes: Vec<Arc<Route>>,
}

impl RouteTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `route` for each of its methods.
    pub fn insert(&mut self, route: Route) -> Result<()> {
        let segments = parse_pattern(route.path())?;
        if route.methods().is_empty() {
            return Err(invalid(route.path(), "route has no methods"));
        }
        let route = Arc::new(route);

        let dynamic = segments.iter().any(|s| !matches!(s, Segment::Static(_)));
        if !dynamic {
            let key = static_key(segments.iter().filter_map(|s| match s {
                Segment::Static(literal) => Some(literal.as_str()),
                _ => None,
            }));
            trace!(path = %key, "Registering static route");
            let map = self.statics.entry(key).or_default();
            for method in route.methods() {
                map.insert(method, route.clone());
            }
        } else {
            self.insert_dynamic(&segments, route.clone())?;
        }

        if let Some(name) = route.get_name() {
            if let Some(previous) = self.names.insert(name.to_string(), route.clone()) {
                warn!(name, previous = previous.path(), path = route.path(), "Route name reused");
            }
        }
        self.routes.push(route);
        Ok(())
    }

    /// Reject a catch-all whose name differs from one already registered at
    /// the same node. Runs before any node is created or reprioritised.
    fn check_catch_all(&self, segments: &[Segment], path: &str) -> Result<()> {
        let mut node = &self.root;
        for segment in segments {
            let next = match segment {
                Segment::Static(literal) => node.statics.get(literal),
                Segment::Param { name, pattern, .. } => node
                    .dynamics
                    .iter()
                    .find(|child| &child.name == name && &child.pattern == pattern)
                    .map(|child| &child.node),
                Segment::CatchAll(name) => {
                    return match &node.catch_all {
                        Some(existing) if &existing.name != name => Err(invalid(
                            path,
                            format!("conflicting catch-all '{}' (already '{}')", name, existing.name),
                        )),
                        _ => Ok(()),
                    };
                }
            };
            match next {
                Some(child) => node = child,
                None => return Ok(()),
            }
        }
        Ok(())
    }

    fn insert_dynamic(&mut self, segments: &[Segment], route: Arc<Route>) -> Result<()> {
        self.check_catch_all(segments, route.path())?;
        let priority = route.get_priority();
        let mut node = &mut self.root;
        for segment in segments {
            match segment {
                Segment::Static(literal) => {
                    node = node.statics.entry(literal.clone()).or_default();
                }
                Segment::Param { name, pattern, regex } => {
                    node = node.dynamic_child(name, pattern, regex, priority);
                }
                Segment::CatchAll(name) => {
                    let catch_all = node.catch_all.get_or_insert_with(|| CatchAll {
                        name: name.clone(),
                        routes: MethodMap::default(),
                    });
                    for method in route.methods() {
                        catch_all.routes.insert(method, route.clone());
                    }
                    return Ok(());
                }
            }
        }
        for method in route.methods() {
            node.routes.insert(method, route.clone());
        }
        Ok(())
    }

    /// Find the route for `method` and `path`.
    ///
    /// Fails with [`Error::MethodNotAllowed`] when the path matched but no
    /// route accepts the method, [`Error::RouteNotFound`] otherwise.
    pub fn find(&self, method: &str, path: &str) -> Result<RouteMatch> {
        let path = path.split_once('?').map_or(path, |(p, _)| p);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut allowed: Vec<String> = Vec::new();

        if let Some(map) = self.statics.get(&static_key(segments.iter().copied())) {
            if let Some(route) = map.get(method) {
                trace!(method, path, "Static route matched");
                return Ok(RouteMatch {
                    route: route.clone(),
                    params: RouteParams::default(),
                });
            }
            merge_methods(&mut allowed, map.methods());
        }

        let mut captures = Captures::new();
        if let Some(route) = self.root.find(method, &segments, &mut captures, &mut allowed) {
            trace!(method, path, pattern = route.path(), "Dynamic route matched");
            let params = captures
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect();
            return Ok(RouteMatch {
                route: route.clone(),
                params: RouteParams(params),
            });
        }

        if allowed.is_empty() {
            Err(Error::RouteNotFound(format!("{} {}", method, path)))
        } else {
            Err(Error::MethodNotAllowed {
                method: method.to_string(),
                path: path.to_string(),
                allowed,
            })
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Route> {
        self.names.get(name).map(|route| route.as_ref())
    }

    /// Build the URL of a named route. Parameters not used by the pattern
    /// are appended as a query string, in the order given.
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String> {
        let route = self
            .names
            .get(name)
            .ok_or_else(|| Error::UrlGeneration(format!("no route named '{}'", name)))?;
        let mut used: Vec<&str> = Vec::new();
        let mut url = String::new();

        for segment in parse_pattern(route.path())? {
            url.push('/');
            match segment {
                Segment::Static(literal) => url.push_str(&literal),
                Segment::Param { name: param, regex, .. } => {
                    let value = lookup(params, &param).ok_or_else(|| {
                        Error::UrlGeneration(format!("missing parameter '{}' for route '{}'", param, name))
                    })?;
                    if let Some(re) = &regex {
                        if !re.is_match(value) {
                            return Err(Error::UrlGeneration(format!(
                                "parameter '{}' = '{}' does not match its constraint",
                                param, value
                            )));
                        }
                    }
                    url.push_str(&urlencoding::encode(value));
                    used.push(lookup_key(params, &param));
                }
                Segment::CatchAll(param) => {
                    let value = lookup(params, &param).ok_or_else(|| {
                        Error::UrlGeneration(format!("missing parameter '{}' for route '{}'", param, name))
                    })?;
                    let encoded: Vec<String> = value
                        .split('/')
                        .filter(|s| !s.is_empty())
                        .map(|s| urlencoding::encode(s).into_owned())
                        .collect();
                    url.push_str(&encoded.join("/"));
                    used.push(lookup_key(params, &param));
                }
            }
        }
        if url.is_empty() {
            url.push('/');
        }

        let query: Vec<String> = params
            .iter()
            .filter(|(key, _)| !used.contains(key))
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
            .collect();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        Ok(url)
    }

    /// Every registered route, in registration order.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn lookup<'p>(params: &[(&str, &'p str)], name: &str) -> Option<&'p str> {
    params.iter().find(|(key, _)| *key == name).map(|(_, value)| *value)
}

fn lookup_key<'p>(params: &[(&'p str, &str)], name: &str) -> &'p str {
    params
        .iter()
        .find(|(key, _)| *key == name)
        .map_or("", |(key, _)| *key)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop() -> &'static str {
        "ok"
    }

    fn trie(routes: Vec<Route>) -> RouteTrie {
        let mut trie = RouteTrie::new();
        for route in routes {
            trie.insert(route).unwrap();
        }
        trie
    }

    #[test]
    fn test_invalid_patterns() {
        for pattern in [
            "/users/{id",
            "/users/id}",
            "/users/{}",
            "/users/x{id}",
            "/files/{*path}/edit",
            "/users/{id:}",
            "/users/{id:(}",
            "/users/{id}/{id}",
            "/users/{*}",
        ] {
            let err = parse_pattern(pattern).err();
            assert!(
                matches!(err, Some(Error::InvalidRoute { .. })),
                "{} should be rejected",
                pattern
            );
        }
    }

    #[test]
    fn test_static_beats_dynamic() {
        let trie = trie(vec![
            Route::get("/foo/{bar}", noop).name("dynamic"),
            Route::get("/foo/boom", noop).name("static"),
        ]);
        let found = trie.find("GET", "/foo/boom").unwrap();
        assert_eq!(found.route.get_name(), Some("static"));
        let found = trie.find("GET", "/foo/other").unwrap();
        assert_eq!(found.params.get("bar"), Some("other"));
    }

    #[test]
    fn test_regex_registration_order() {
        let trie = trie(vec![
            Route::get("/foo/{bar:\\d+}", noop).name("digits"),
            Route::get("/foo/{bar:\\w+}", noop).name("word"),
        ]);
        assert_eq!(trie.find("GET", "/foo/42").unwrap().route.get_name(), Some("digits"));
        assert_eq!(trie.find("GET", "/foo/abc").unwrap().route.get_name(), Some("word"));
    }

    #[test]
    fn test_priority_overrides_registration_order() {
        let trie = trie(vec![
            Route::get("/foo/{bar:\\w+}", noop).name("word"),
            Route::get("/foo/{bar:\\d+}", noop).name("digits").priority(10),
        ]);
        assert_eq!(trie.find("GET", "/foo/42").unwrap().route.get_name(), Some("digits"));
        assert_eq!(trie.find("GET", "/foo/abc").unwrap().route.get_name(), Some("word"));
    }

    #[test]
    fn test_catch_all() {
        let trie = trie(vec![Route::get("/files/{*path}", noop)]);
        let found = trie.find("GET", "/files/a/b/c").unwrap();
        assert_eq!(found.params.get("path"), Some("a/b/c"));
        assert!(matches!(trie.find("GET", "/files"), Err(Error::RouteNotFound(_))));
    }

    #[test]
    fn test_backtracks_out_of_dead_branch() {
        let trie = trie(vec![
            Route::get("/a/{x}/edit", noop).name("edit"),
            Route::get("/a/special/{y}/view", noop).name("view"),
        ]);
        let found = trie.find("GET", "/a/special/edit").unwrap();
        assert_eq!(found.route.get_name(), Some("edit"));
        assert_eq!(found.params.get("x"), Some("special"));
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let trie = trie(vec![
            Route::get("/x", noop),
            Route::new(["PUT", "DELETE"], "/items/{id}", noop),
        ]);
        match trie.find("POST", "/x") {
            Err(Error::MethodNotAllowed { allowed, .. }) => assert_eq!(allowed, vec!["GET"]),
            other => panic!("unexpected: {:?}", other.map(|m| m.route.path().to_string())),
        }
        match trie.find("GET", "/items/3") {
            Err(Error::MethodNotAllowed { allowed, .. }) => assert_eq!(allowed, vec!["PUT", "DELETE"]),
            other => panic!("unexpected: {:?}", other.map(|m| m.route.path().to_string())),
        }
        assert!(matches!(trie.find("GET", "/nope"), Err(Error::RouteNotFound(_))));
    }

    #[test]
    fn test_wildcard_method() {
        let trie = trie(vec![Route::any("/ping", noop)]);
        assert!(trie.find("PATCH", "/ping").is_ok());
    }

    #[test]
    fn test_params_are_percent_decoded() {
        let trie = trie(vec![Route::get("/users/{name}", noop)]);
        let found = trie.find("GET", "/users/J%C3%BCrgen%20K").unwrap();
        assert_eq!(found.params.get("name"), Some("Jürgen K"));
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let trie = trie(vec![Route::get("/users", noop)]);
        assert!(trie.find("GET", "/users/").is_ok());
        assert!(trie.find("GET", "users").is_ok());
    }

    #[test]
    fn test_url_for() {
        let trie = trie(vec![
            Route::get("/users/{id:\\d+}/posts/{slug}", noop).name("posts.show"),
            Route::get("/files/{*path}", noop).name("files"),
        ]);
        let url = trie
            .url_for("posts.show", &[("id", "7"), ("slug", "hello world"), ("page", "2")])
            .unwrap();
        assert_eq!(url, "/users/7/posts/hello%20world?page=2");
        assert_eq!(trie.url_for("files", &[("path", "a/b.txt")]).unwrap(), "/files/a/b.txt");
        assert!(trie.url_for("posts.show", &[("id", "x"), ("slug", "s")]).is_err());
        assert!(trie.url_for("posts.show", &[("id", "1")]).is_err());
        assert!(trie.url_for("missing", &[]).is_err());
    }

    #[test]
    fn test_conflicting_catch_all_names() {
        let mut trie = RouteTrie::new();
        trie.insert(Route::get("/f/{*a}", noop)).unwrap();
        assert!(trie.insert(Route::post("/f/{*b}", noop)).is_err());
    }

    #[test]
    fn test_rejected_catch_all_leaves_trie_unchanged() {
        let mut trie = trie(vec![
            Route::get("/f/{slug}", noop).name("slug"),
            Route::get("/f/{id}", noop).name("id"),
            Route::get("/f/{id}/{*rest}", noop),
        ]);
        let err = trie.insert(Route::post("/f/{id}/{*other}", noop).priority(10)).err();
        assert!(matches!(err, Some(Error::InvalidRoute { .. })));
        assert_eq!(trie.find("GET", "/f/x").unwrap().route.get_name(), Some("slug"));

        trie.insert(Route::post("/f/{id}/new/{*other}", noop)).unwrap();
        assert!(trie.find("POST", "/f/1/new/a/b").is_ok());
    }
}
