//! Arena backed node hierarchy.
//!
//! Nodes live in a slot map and refer to each other by [`NodeId`]. A parent owns its
//! children: removing a node takes its whole subtree out of the arena as a
//! [`DetachedNode`]. Names are indexed in a flat registry that every structural change
//! keeps in sync, so lookups by name never walk the tree.

use crate::core::node::{GraphId, Node, NodeId};
use crate::error_info;
use crate::rendering::ErrorCode;
use itertools::Itertools;
use log::trace;
use nalgebra::Matrix4;
use slotmap::SlotMap;
use smallvec::{SmallVec, smallvec};
use snafu::Snafu;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Write;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum SceneError {
    #[snafu(display("Scene node not found [{code}]: {message}"))]
    NodeNotFound { code: ErrorCode, message: String },

    #[snafu(display("Scene node name already taken [{code}]: {message}"))]
    DuplicateName { code: ErrorCode, message: String },
}

error_info!(SceneError {
    NodeNotFound,
    DuplicateName,
});

pub type Result<T, E = SceneError> = std::result::Result<T, E>;

pub const ROOT_NAME: &str = "Root";

type TraversalStack<T> = SmallVec<[T; 16]>;

/// A subtree that was removed from a scene graph. Dropping it destroys the subtree,
/// [`SceneGraph::add_child`] puts it back into a graph.
#[derive(Debug)]
pub struct DetachedNode {
    node: Node,
    children: Vec<DetachedNode>,
}

impl DetachedNode {
    #[inline]
    pub fn name(&self) -> &str {
        self.node.name()
    }

    /// Always `None`, a detached node has no parent.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.node.parent()
    }

    /// Always `None`, a detached node belongs to no graph.
    #[inline]
    pub fn scene_graph(&self) -> Option<GraphId> {
        self.node.scene_graph()
    }

    #[inline]
    pub fn node(&self) -> &Node {
        &self.node
    }

    #[inline]
    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    #[inline]
    pub fn children(&self) -> &[DetachedNode] {
        &self.children
    }

    /// Number of nodes in the subtree, including this one.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(DetachedNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(self.name());
        for child in &self.children {
            child.collect_names(out);
        }
    }
}

#[derive(Debug)]
pub struct SceneGraph {
    id: GraphId,
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    registry: HashMap<String, NodeId>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(id: NodeId) -> SceneError {
    SceneError::NodeNotFound {
        code: ErrorCode::NOT_FOUND,
        message: format!("{id:?} is not part of the scene graph"),
    }
}

impl SceneGraph {
    pub fn new() -> SceneGraph {
        let id = GraphId::next();
        let mut nodes = SlotMap::with_key();

        let mut root = Node::new(ROOT_NAME);
        root.graph = Some(id);
        let root = nodes.insert(root);

        let mut registry = HashMap::new();
        registry.insert(ROOT_NAME.to_string(), root);

        SceneGraph {
            id,
            nodes,
            root,
            registry,
        }
    }

    #[inline]
    pub fn id(&self) -> GraphId {
        self.id
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, including the root.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Never true, the root always exists.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or_else(|| not_found(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id).ok_or_else(|| not_found(id))
    }

    /// Appends a new child to `parent`. Names are not checked for uniqueness, the registry
    /// points at the most recently added node of a name. Once that node leaves the graph,
    /// the first remaining holder in pre-order takes its place.
    pub fn create_child(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId> {
        self.get(parent)?;

        let mut node = Node::new(name);
        node.parent = Some(parent);
        node.graph = Some(self.id);

        let name = node.name().to_string();
        let id = self.nodes.insert(node);
        self.get_mut(parent)?.children.push(id);
        self.registry.insert(name, id);

        Ok(id)
    }

    /// Creates a node under `parent` (the root when `None`), refusing names that are
    /// already registered.
    pub fn create_node(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> Result<NodeId> {
        let name = name.into();
        if self.registry.contains_key(&name) {
            return DuplicateNameErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: format!("a node named {name:?} already exists"),
            }
            .fail();
        }

        self.create_child(parent.unwrap_or(self.root), name)
    }

    /// Re-inserts a detached subtree below `parent` and registers all its names.
    pub fn add_child(&mut self, parent: NodeId, subtree: DetachedNode) -> Result<NodeId> {
        self.get(parent)?;

        let id = self.insert_subtree(parent, subtree);
        self.get_mut(parent)?.children.push(id);

        Ok(id)
    }

    fn insert_subtree(&mut self, parent: NodeId, subtree: DetachedNode) -> NodeId {
        let DetachedNode { mut node, children } = subtree;
        node.parent = Some(parent);
        node.graph = Some(self.id);
        node.children.clear();

        let name = node.name().to_string();
        let id = self.nodes.insert(node);
        self.registry.insert(name, id);

        let child_ids: Vec<NodeId> = children
            .into_iter()
            .map(|child| self.insert_subtree(id, child))
            .collect();

        if let Some(node) = self.nodes.get_mut(id) {
            node.children = child_ids;
        }

        id
    }

    /// Detaches the first child of `parent` named `name` together with its subtree.
    /// Returns `Ok(None)` when `parent` has no such child.
    pub fn remove_child(&mut self, parent: NodeId, name: &str) -> Result<Option<DetachedNode>> {
        let parent_node = self.get(parent)?;

        let Some(position) = parent_node
            .children
            .iter()
            .position(|child| self.nodes.get(*child).is_some_and(|n| n.name() == name))
        else {
            return Ok(None);
        };

        let child = self.get_mut(parent)?.children.remove(position);
        let detached = self.detach_subtree(child);

        if let Some(detached) = &detached {
            let mut names = Vec::new();
            detached.collect_names(&mut names);
            for name in names.into_iter().unique() {
                self.register_survivor(name);
            }
            trace!("Removed {:?} ({} nodes)", detached.name(), detached.len());
        }

        Ok(detached)
    }

    fn detach_subtree(&mut self, id: NodeId) -> Option<DetachedNode> {
        let mut node = self.nodes.remove(id)?;

        if self.registry.get(node.name()) == Some(&id) {
            self.registry.remove(node.name());
        }

        let children = std::mem::take(&mut node.children)
            .into_iter()
            .filter_map(|child| self.detach_subtree(child))
            .collect();

        node.parent = None;
        node.graph = None;

        Some(DetachedNode { node, children })
    }

    /// Renames a node and moves its registry entry. Fails if another node holds the name.
    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.registry.get(&name).is_some_and(|&holder| holder != id) {
            return DuplicateNameErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: format!("a node named {name:?} already exists"),
            }
            .fail();
        }

        let node = self.get_mut(id)?;
        let old = node.name().to_string();
        node.set_name(name.clone());

        if self.registry.get(&old) == Some(&id) {
            self.registry.remove(&old);
        }
        self.registry.insert(name, id);
        self.register_survivor(&old);

        Ok(())
    }

    /// Points a vacated registry name at the first node still carrying it, if any.
    fn register_survivor(&mut self, name: &str) {
        if self.registry.contains_key(name) {
            return;
        }

        let mut survivor = None;
        self.for_each(self.root, |id, node| {
            if survivor.is_none() && node.name() == name {
                survivor = Some(id);
            }
        });

        if let Some(id) = survivor {
            trace!("Registry entry {name:?} moved to {id:?}");
            self.registry.insert(name.to_string(), id);
        }
    }

    /// Registry lookup, never walks the tree.
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeId> {
        self.registry.get(name).copied()
    }

    /// Visits `start` and all its descendants, parents before children, siblings in order.
    pub fn for_each(&self, start: NodeId, mut f: impl FnMut(NodeId, &Node)) {
        let mut stack: TraversalStack<NodeId> = smallvec![start];

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            f(id, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Like [`SceneGraph::for_each`] with mutable access to every visited node.
    pub fn for_each_mut(&mut self, start: NodeId, mut f: impl FnMut(NodeId, &mut Node)) {
        let mut stack: TraversalStack<NodeId> = smallvec![start];

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            f(id, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Pre-order visit that skips invisible nodes together with their subtrees.
    pub fn for_each_visible(&self, start: NodeId, mut f: impl FnMut(NodeId, &Node)) {
        let mut stack: TraversalStack<NodeId> = smallvec![start];

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !node.is_visible() {
                continue;
            }
            f(id, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// First descendant of `start` in pre-order matching `predicate`.
    pub fn find_child(&self, start: NodeId, predicate: impl Fn(&Node) -> bool) -> Option<NodeId> {
        let mut found = None;
        self.for_each(start, |id, node| {
            if found.is_none() && id != start && predicate(node) {
                found = Some(id);
            }
        });
        found
    }

    /// All descendants of `start` matching `predicate`, in pre-order.
    pub fn find_children(&self, start: NodeId, predicate: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.for_each(start, |id, node| {
            if id != start && predicate(node) {
                found.push(id);
            }
        });
        found
    }

    /// Runs the listeners for `event` on `id`, then on each ancestor up to the root.
    /// Returns the number of listeners invoked.
    pub fn trigger_event(&mut self, id: NodeId, event: &str, payload: &dyn Any) -> Result<usize> {
        self.get(id)?;

        let mut invoked = 0;
        let mut current = Some(id);

        while let Some(id) = current {
            let Some(node) = self.nodes.get_mut(id) else {
                break;
            };
            invoked += node.notify(event, payload);
            current = node.parent;
        }

        Ok(invoked)
    }

    /// Updates the components of every node in pre-order, then propagates transforms.
    pub fn update(&mut self, dt: f32) {
        self.for_each_mut(self.root, |_, node| node.update_components(dt));
        self.update_transforms();
    }

    /// Recomputes every world matrix as parent world times local.
    pub fn update_transforms(&mut self) {
        let mut stack: TraversalStack<(NodeId, Matrix4<f32>)> =
            smallvec![(self.root, Matrix4::identity())];

        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };

            node.world = parent_world * node.transform().local_matrix();
            let world = node.world;
            stack.extend(node.children.iter().rev().map(|child| (*child, world)));
        }
    }

    /// Human readable summary of a node.
    pub fn debug_info(&self, id: NodeId) -> Result<String> {
        let node = self.get(id)?;
        let mut info = String::new();

        let parent = node
            .parent()
            .and_then(|p| self.nodes.get(p))
            .map_or("<none>", Node::name);
        let position = node.world_matrix().column(3).xyz();

        let _ = writeln!(info, "Node {:?}", node.name());
        let _ = writeln!(info, "  parent: {parent}");
        let _ = writeln!(info, "  children: {}", node.children().len());
        let _ = writeln!(
            info,
            "  components: [{}]",
            node.components().names().join(", ")
        );
        let _ = writeln!(info, "  properties: {}", node.properties().len());
        let _ = writeln!(
            info,
            "  world position: ({:.3}, {:.3}, {:.3})",
            position.x, position.y, position.z
        );
        let _ = write!(info, "  visible: {}", node.is_visible());

        Ok(info)
    }
}
