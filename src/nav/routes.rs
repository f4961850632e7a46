//! Route records and path matching.
//!
//! DESIGN
//! ======
//! Records nest like the UI's layout tree. Children inherit `requires_auth`
//! from their parent unless they set it themselves; a route that never sets
//! it anywhere is public. Nested records are flattened once at construction.
//!
//! Matching is case-insensitive on static segments. `:name` captures one
//! segment and `:name(.*)*` captures the rest of the path; catch-all routes
//! are only tried after every other route failed.

use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteRecord {
    pub path: String,
    pub name: Option<String>,
    pub requires_auth: Option<bool>,
    pub children: Vec<RouteRecord>,
}

impl RouteRecord {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Self::default() }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = Some(requires_auth);
        self
    }

    #[must_use]
    pub fn children(mut self, children: Vec<RouteRecord>) -> Self {
        self.children = children;
        self
    }
}

/// A resolved navigation target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch {
    /// Normalized path that was matched.
    pub path: String,
    pub name: Option<String>,
    pub params: BTreeMap<String, String>,
    pub requires_auth: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    CatchAll(String),
}

#[derive(Clone, Debug)]
struct CompiledRoute {
    segments: Vec<Segment>,
    name: Option<String>,
    requires_auth: bool,
}

impl CompiledRoute {
    fn is_catch_all(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::CatchAll(_)))
    }

    fn matches(&self, parts: &[&str]) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::CatchAll(name) => {
                    params.insert(name.clone(), parts.get(i..).unwrap_or_default().join("/"));
                    return Some(params);
                }
                Segment::Static(expected) => {
                    if !parts.get(i).is_some_and(|p| p.eq_ignore_ascii_case(expected)) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(i)?;
                    params.insert(name.clone(), (*value).to_owned());
                }
            }
        }
        (parts.len() == self.segments.len()).then_some(params)
    }
}

#[derive(Clone, Debug)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    #[must_use]
    pub fn new(records: Vec<RouteRecord>) -> Self {
        let mut routes = Vec::new();
        for record in &records {
            flatten(record, "", false, &mut routes);
        }
        Self { routes }
    }

    /// The document manager's routes.
    #[must_use]
    pub fn document_manager() -> Self {
        Self::new(vec![
            RouteRecord::new("/login").named("Login").requires_auth(false),
            RouteRecord::new("/register").named("Register").requires_auth(false),
            RouteRecord::new("/").requires_auth(true).children(vec![
                RouteRecord::new("").named("Dashboard"),
                RouteRecord::new("documents").named("Documents"),
                RouteRecord::new("documents/:id").named("DocumentDetail"),
                RouteRecord::new("profile").named("Profile"),
            ]),
            RouteRecord::new("/public").requires_auth(false).children(vec![
                RouteRecord::new("search").named("PublicSearch"),
                RouteRecord::new("documents/:id").named("PublicDocumentDetail"),
            ]),
            RouteRecord::new("/:pathMatch(.*)*").named("NotFound").requires_auth(false),
        ])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the route for `path`. Query strings and fragments are ignored.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let path = normalize_path(path);
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let specific = self.routes.iter().filter(|r| !r.is_catch_all());
        let catch_all = self.routes.iter().filter(|r| r.is_catch_all());
        specific.chain(catch_all).find_map(|route| {
            let params = route.matches(&parts)?;
            Some(RouteMatch {
                path: path.clone(),
                name: route.name.clone(),
                params,
                requires_auth: route.requires_auth,
            })
        })
    }
}

fn flatten(record: &RouteRecord, parent: &str, inherited_auth: bool, out: &mut Vec<CompiledRoute>) {
    let full = join_route(parent, &record.path);
    let requires_auth = record.requires_auth.unwrap_or(inherited_auth);
    if record.children.is_empty() || record.name.is_some() {
        out.push(CompiledRoute { segments: compile(&full), name: record.name.clone(), requires_auth });
    }
    for child in &record.children {
        flatten(child, &full, requires_auth, out);
    }
}

fn join_route(parent: &str, path: &str) -> String {
    if path.starts_with('/') {
        return normalize_path(path);
    }
    normalize_path(&format!("{}/{path}", parent.trim_end_matches('/')))
}

fn compile(path: &str) -> Vec<Segment> {
    path.split('/')
        .filter(|p| !p.is_empty())
        .map(|part| {
            let Some(param) = part.strip_prefix(':') else {
                return Segment::Static(part.to_owned());
            };
            match param.split_once('(') {
                Some((name, pattern)) if pattern.contains(".*") => Segment::CatchAll(name.to_owned()),
                Some((name, _)) => Segment::Param(name.to_owned()),
                None => Segment::Param(param.to_owned()),
            }
        })
        .collect()
}

/// Canonical form of a path: leading slash, no query or fragment, no empty
/// segments, no trailing slash (except for the root).
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let parts: Vec<&str> = raw[..end].split('/').filter(|p| !p.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;
