//! Chained route tree.
//!
//! Routes are declared as [`RouteDef`]s and assembled into an immutable
//! [`RouteTree`]. A node chained to a parent continues the parent's path: the
//! request path must be consumed by the patterns from root to endpoint, in
//! order. Nodes that invoke an action are endpoints; nodes with children are
//! chain points whose signatures are resolved (and captured) on the way down.

use std::collections::{HashMap, HashSet};
use std::fmt;

use sigroute_router::{MethodSet, Pattern};

use crate::error::SignatureError;
use crate::signature::{Modifier, Modifiers, ParameterSpec, SignatureDescriptor};

/// Identifier of a node; also its declaration position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the declaration position.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the route tree.
#[derive(Debug, Clone)]
pub struct RouteNode {
    id: NodeId,
    name: String,
    pattern: Pattern,
    signature: SignatureDescriptor,
    action: Option<String>,
    methods: MethodSet,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl RouteNode {
    /// Returns the node id.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the pattern fragment.
    #[must_use]
    pub const fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Returns the signature.
    #[must_use]
    pub const fn signature(&self) -> &SignatureDescriptor {
        &self.signature
    }

    /// Returns the action (operation id) invoked when this node ends a chain.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Returns true if this node can end a chain.
    #[must_use]
    pub const fn is_endpoint(&self) -> bool {
        self.action.is_some()
    }

    /// Returns the accepted methods.
    #[must_use]
    pub const fn methods(&self) -> &MethodSet {
        &self.methods
    }

    /// Returns the parent node.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the children in declaration order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Declaration of one route node.
///
/// # Example
///
/// ```
/// use sigroute_core::RouteDef;
/// use sigroute_router::MethodSet;
///
/// let find_user = RouteDef::new("find_user", "user/{id}").capture("user", "User");
/// let edit = RouteDef::new("edit", "edit")
///     .chained("find_user")
///     .action("editUser")
///     .methods(MethodSet::new().get().post());
/// # let _ = (find_user, edit);
/// ```
#[derive(Debug, Clone)]
pub struct RouteDef {
    name: String,
    pattern: String,
    params: Vec<ParameterSpec>,
    parent: Option<String>,
    action: Option<String>,
    methods: Option<MethodSet>,
}

impl RouteDef {
    /// Declares a node with a name and a pattern fragment.
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            params: Vec::new(),
            parent: None,
            action: None,
            methods: None,
        }
    }

    /// Replaces the parameters with those of `signature`.
    #[must_use]
    pub fn signature(mut self, signature: SignatureDescriptor) -> Self {
        self.params = signature.params().to_vec();
        self
    }

    /// Adds a required parameter.
    #[must_use]
    pub fn required(self, name: impl Into<String>, capability: impl Into<String>) -> Self {
        self.param(ParameterSpec::new(name, capability, Modifiers::none()))
    }

    /// Adds a required, captured parameter.
    #[must_use]
    pub fn capture(self, name: impl Into<String>, capability: impl Into<String>) -> Self {
        self.param(ParameterSpec::new(
            name,
            capability,
            Modifiers::none().with(Modifier::Capture),
        ))
    }

    /// Adds an optional parameter.
    #[must_use]
    pub fn optional(self, name: impl Into<String>, capability: impl Into<String>) -> Self {
        self.param(ParameterSpec::new(
            name,
            capability,
            Modifiers::none().with(Modifier::Optional),
        ))
    }

    /// Adds a fully specified parameter.
    #[must_use]
    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Chains this node under `parent`, which must be declared earlier.
    #[must_use]
    pub fn chained(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Sets the action invoked when this node ends a chain.
    #[must_use]
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Restricts the accepted methods. Only endpoints (nodes with an action)
    /// may restrict methods.
    #[must_use]
    pub fn methods(mut self, methods: MethodSet) -> Self {
        self.methods = Some(methods);
        self
    }
}

/// Builder for [`RouteTree`].
#[derive(Debug, Default)]
pub struct RouteTreeBuilder {
    defs: Vec<RouteDef>,
}

impl RouteTreeBuilder {
    /// Adds a route node. Declaration order matters for tie-breaking.
    #[must_use]
    pub fn route(mut self, def: RouteDef) -> Self {
        self.defs.push(def);
        self
    }

    /// Validates the declarations and builds the tree.
    pub fn build(self) -> Result<RouteTree, SignatureError> {
        let mut nodes: Vec<RouteNode> = Vec::with_capacity(self.defs.len());
        let mut by_name: HashMap<String, NodeId> = HashMap::with_capacity(self.defs.len());
        let mut roots = Vec::new();

        for (position, def) in self.defs.into_iter().enumerate() {
            if def.name.is_empty() {
                return Err(SignatureError::EmptyNodeName { position });
            }
            if by_name.contains_key(&def.name) {
                return Err(SignatureError::DuplicateNode { node: def.name });
            }
            if def.action.is_none() && def.methods.is_some() {
                return Err(SignatureError::MethodsWithoutAction { node: def.name });
            }

            let pattern = Pattern::parse(&def.pattern).map_err(|source| SignatureError::Pattern {
                node: def.name.clone(),
                source,
            })?;
            let signature = SignatureDescriptor::from_specs(def.params)?;
            let id = NodeId(position);

            let parent = match def.parent {
                None => None,
                Some(parent_name) => {
                    let parent_id = *by_name.get(&parent_name).ok_or_else(|| {
                        SignatureError::UnknownParent {
                            node: def.name.clone(),
                            parent: parent_name.clone(),
                        }
                    })?;
                    let parent = &nodes[parent_id.0];
                    if parent.pattern.has_wildcard() {
                        return Err(SignatureError::WildcardWithChildren {
                            node: parent.name.clone(),
                        });
                    }
                    Some(parent_id)
                }
            };

            let mut inherited = HashSet::new();
            let mut cursor = parent;
            while let Some(ancestor) = cursor {
                let ancestor = &nodes[ancestor.0];
                inherited.extend(ancestor.pattern.param_names());
                cursor = ancestor.parent;
            }
            if let Some(name) = pattern.param_names().find(|n| inherited.contains(n)) {
                return Err(SignatureError::DuplicatePathParam {
                    node: def.name,
                    name: name.to_string(),
                });
            }

            match parent {
                Some(parent_id) => nodes[parent_id.0].children.push(id),
                None => roots.push(id),
            }
            by_name.insert(def.name.clone(), id);
            nodes.push(RouteNode {
                id,
                name: def.name,
                pattern,
                signature,
                action: def.action,
                methods: def.methods.unwrap_or_else(MethodSet::any),
                parent,
                children: Vec::new(),
            });
        }

        if let Some(dead) = nodes
            .iter()
            .find(|n| n.action.is_none() && n.children.is_empty())
        {
            return Err(SignatureError::DeadEnd {
                node: dead.name.clone(),
            });
        }

        Ok(RouteTree {
            nodes,
            roots,
            by_name,
        })
    }
}

/// An immutable tree of chained route nodes.
///
/// # Example
///
/// ```
/// use sigroute_core::{RouteDef, RouteTree};
///
/// let tree = RouteTree::builder()
///     .route(RouteDef::new("find_user", "user/{id}").capture("user", "User"))
///     .route(RouteDef::new("show", "").chained("find_user").action("showUser"))
///     .route(RouteDef::new("edit", "edit").chained("find_user").action("editUser"))
///     .build()
///     .unwrap();
///
/// let edit = tree.find("edit").unwrap();
/// let chain: Vec<_> = tree.chain(edit).map(|n| n.name()).collect();
/// assert_eq!(chain, vec!["find_user", "edit"]);
/// assert_eq!(tree.endpoints().count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RouteTree {
    nodes: Vec<RouteNode>,
    roots: Vec<NodeId>,
    by_name: HashMap<String, NodeId>,
}

impl RouteTree {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> RouteTreeBuilder {
        RouteTreeBuilder::default()
    }

    /// Returns the root nodes in declaration order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Returns a node by id.
    ///
    /// Ids come from this tree, so lookups never miss.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &RouteNode {
        &self.nodes[id.0]
    }

    /// Returns every node in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &RouteNode> {
        self.nodes.iter()
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Finds a node by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Returns the chain from the root down to `id`, inclusive.
    pub fn chain(&self, id: NodeId) -> impl DoubleEndedIterator<Item = &RouteNode> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current);
            chain.push(node);
            cursor = node.parent;
        }
        chain.into_iter().rev()
    }

    /// Returns the endpoint nodes in declaration order.
    pub fn endpoints(&self) -> impl Iterator<Item = &RouteNode> {
        self.nodes.iter().filter(|n| n.is_endpoint())
    }

    /// Returns the capabilities captured by the strict ancestors of `id`.
    #[must_use]
    pub fn ancestor_captures(&self, id: NodeId) -> HashSet<&str> {
        self.chain(id)
            .filter(|n| n.id != id)
            .flat_map(|n| n.signature.iter())
            .filter(|p| p.is_capture())
            .map(ParameterSpec::capability)
            .collect()
    }

    /// Returns the number of `Capture` parameters along the chain ending at `id`.
    #[must_use]
    pub fn chain_capture_count(&self, id: NodeId) -> usize {
        self.chain(id).map(|n| n.signature.capture_count()).sum()
    }
}
