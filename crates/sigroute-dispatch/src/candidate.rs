//! Candidate chain enumeration.
//!
//! Walks the route tree depth-first, matching each node's pattern against the
//! path where its parent stopped. Every endpoint that consumes the whole path
//! yields one candidate chain. Candidates are then filtered by method and
//! ordered: most `Capture` parameters along the chain first, then declaration
//! order of the endpoint.

use std::cmp::Reverse;

use http::Method;
use sigroute_core::{NodeId, RouteTree};
use sigroute_router::{split_path, Params};

/// One node of a candidate chain with the path parameters bound so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// The node.
    pub node: NodeId,
    /// Parameters bound by this node and its ancestors.
    pub params: Params,
}

/// A root-to-endpoint chain matching the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The endpoint node.
    pub endpoint: NodeId,
    /// Chain steps, root first.
    pub steps: Vec<Step>,
    /// Number of `Capture` parameters along the chain.
    pub capture_count: usize,
}

impl Candidate {
    /// Returns the parameters bound by the whole chain.
    pub fn params(&self) -> Option<&Params> {
        self.steps.last().map(|step| &step.params)
    }
}

/// Result of matching a request against the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSet {
    /// Ordered candidates accepting the request method.
    Matched(Vec<Candidate>),
    /// The path matched but no candidate accepts the method.
    MethodNotAllowed(Vec<String>),
    /// Nothing matched the path.
    NoMatch,
}

/// Enumerates the candidate chains for `method` and `path`.
pub fn match_candidates(tree: &RouteTree, method: &Method, path: &str) -> CandidateSet {
    let segments = split_path(path);
    let mut found = Vec::new();
    let mut params = Params::new();
    let mut trail = Vec::new();

    for &root in tree.roots() {
        walk(tree, root, &segments, 0, &mut params, &mut trail, &mut found);
    }

    if found.is_empty() {
        return CandidateSet::NoMatch;
    }

    let (mut accepted, refused): (Vec<_>, Vec<_>) = found
        .into_iter()
        .partition(|c| tree.node(c.endpoint).methods().allows(method));

    if accepted.is_empty() {
        return CandidateSet::MethodNotAllowed(allowed_methods(tree, &refused));
    }

    accepted.sort_by_key(|c| (Reverse(c.capture_count), c.endpoint));
    CandidateSet::Matched(accepted)
}

fn walk(
    tree: &RouteTree,
    id: NodeId,
    segments: &[&str],
    offset: usize,
    params: &mut Params,
    trail: &mut Vec<Step>,
    found: &mut Vec<Candidate>,
) {
    let node = tree.node(id);
    let mark = params.len();
    let Some(next) = node.pattern().match_at(segments, offset, params) else {
        return;
    };

    trail.push(Step {
        node: id,
        params: params.clone(),
    });

    if node.is_endpoint() && next == segments.len() {
        found.push(Candidate {
            endpoint: id,
            steps: trail.clone(),
            capture_count: tree.chain_capture_count(id),
        });
    }

    for &child in node.children() {
        walk(tree, child, segments, next, params, trail, found);
    }

    trail.pop();
    params.truncate(mark);
}

fn allowed_methods(tree: &RouteTree, refused: &[Candidate]) -> Vec<String> {
    let mut allowed: Vec<String> = Vec::new();
    for candidate in refused {
        let methods = tree.node(candidate.endpoint).methods().allowed().unwrap_or_default();
        for method in methods {
            if !allowed.iter().any(|m| m == method.as_str()) {
                allowed.push(method.as_str().to_string());
            }
        }
    }
    allowed
}
