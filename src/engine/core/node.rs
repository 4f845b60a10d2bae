use crate::components::{Component, ComponentStorage};
use crate::core::Transform;
use nalgebra::Matrix4;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

slotmap::new_key_type! {
    /// Handle of a node inside its [`SceneGraph`](crate::core::SceneGraph).
    pub struct NodeId;
}

/// Identifies the scene graph a node belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GraphId(u64);

impl GraphId {
    pub(crate) fn next() -> GraphId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        GraphId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

pub type EventListener = Box<dyn FnMut(&dyn Any)>;

/// Single slot per payload type, independent from the components.
#[derive(Default)]
pub struct PropertyMap {
    values: HashMap<TypeId, Box<dyn Any>>,
}

impl PropertyMap {
    /// Stores `value`, returning the previous value of the same type.
    pub fn set<T: Any>(&mut self, value: T) -> Option<T> {
        self.values
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast().ok())
            .map(|old: Box<T>| *old)
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.values.get(&TypeId::of::<T>())?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.values.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    pub fn remove<T: Any>(&mut self) -> Option<T> {
        self.values
            .remove(&TypeId::of::<T>())
            .and_then(|old| old.downcast().ok())
            .map(|old: Box<T>| *old)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A scene graph node.
///
/// Structure (parent, children, registration) is owned by the scene graph. Everything a
/// node carries by itself, its transform, components, properties and listeners, is edited
/// here.
pub struct Node {
    name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) graph: Option<GraphId>,
    pub(crate) children: Vec<NodeId>,
    transform: Transform,
    pub(crate) world: Matrix4<f32>,
    visible: bool,
    components: ComponentStorage,
    properties: PropertyMap,
    pub(crate) listeners: HashMap<String, Vec<EventListener>>,
}

impl Node {
    pub(crate) fn new(name: impl Into<String>) -> Node {
        Node {
            name: name.into(),
            parent: None,
            graph: None,
            children: Vec::new(),
            transform: Transform::new(),
            world: Matrix4::identity(),
            visible: true,
            components: ComponentStorage::default(),
            properties: PropertyMap::default(),
            listeners: HashMap::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// The non-owning parent reference. `None` for the root and for detached nodes.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn scene_graph(&self) -> Option<GraphId> {
        self.graph
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Invisible nodes and their subtrees are not drawn.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    #[inline]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    #[inline]
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Parent world matrix times the local matrix, as of the last transform update.
    #[inline]
    pub fn world_matrix(&self) -> &Matrix4<f32> {
        &self.world
    }

    /// Attaches `component`, returning the one of the same type it replaced.
    pub fn add_component<C: Component>(&mut self, component: C) -> Option<C> {
        self.components.insert(component)
    }

    pub fn component<C: Component>(&self) -> Option<&C> {
        self.components.get()
    }

    pub fn component_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.components.get_mut()
    }

    pub fn remove_component<C: Component>(&mut self) -> Option<C> {
        self.components.remove()
    }

    pub fn has_component<C: Component>(&self) -> bool {
        self.components.contains::<C>()
    }

    pub fn components(&self) -> &ComponentStorage {
        &self.components
    }

    /// Last write per type wins. Returns the value it replaced.
    pub fn set_property<T: Any>(&mut self, value: T) -> Option<T> {
        self.properties.set(value)
    }

    pub fn property<T: Any>(&self) -> Option<&T> {
        self.properties.get()
    }

    pub fn property_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.properties.get_mut()
    }

    pub fn has_property<T: Any>(&self) -> bool {
        self.properties.contains::<T>()
    }

    pub fn remove_property<T: Any>(&mut self) -> Option<T> {
        self.properties.remove()
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Listeners run in registration order when an event with this name reaches the node.
    pub fn add_event_listener(
        &mut self,
        event: impl Into<String>,
        listener: impl FnMut(&dyn Any) + 'static,
    ) {
        self.listeners
            .entry(event.into())
            .or_default()
            .push(Box::new(listener));
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, Vec::len)
    }

    /// Invokes this node's listeners for `event` and returns how many ran.
    pub(crate) fn notify(&mut self, event: &str, payload: &dyn Any) -> usize {
        let Some(listeners) = self.listeners.get_mut(event) else {
            return 0;
        };

        for listener in listeners.iter_mut() {
            listener(payload);
        }
        listeners.len()
    }

    /// Updates every component once. Components added while updating are kept, and
    /// replace existing ones of the same type.
    pub(crate) fn update_components(&mut self, dt: f32) {
        if self.components.is_empty() {
            return;
        }

        let mut components = std::mem::take(&mut self.components);
        components.update_all(self, dt);

        let added = std::mem::replace(&mut self.components, components);
        self.components.merge(added);
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("visible", &self.visible)
            .field("components", &self.components.names().collect::<Vec<_>>())
            .field("properties", &self.properties.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Counter(u32);

    impl Component for Counter {
        fn update(&mut self, node: &mut Node, _dt: f32) {
            self.0 += 1;
            node.set_property(self.0);
        }
    }

    #[test]
    fn properties_keep_one_slot_per_type() {
        let mut node = Node::new("n");
        assert!(node.set_property(Vector3::new(1.0f32, 0.0, 0.0)).is_none());
        let old = node.set_property(Vector3::new(2.0f32, 0.0, 0.0));

        assert_eq!(old, Some(Vector3::new(1.0, 0.0, 0.0)));
        assert_eq!(node.property::<Vector3<f32>>(), Some(&Vector3::new(2.0, 0.0, 0.0)));
        assert!(node.property::<String>().is_none());

        node.set_property(String::from("label"));
        assert_eq!(node.properties().len(), 2);
        assert_eq!(node.remove_property::<String>().as_deref(), Some("label"));
        assert!(!node.has_property::<String>());
    }

    #[test]
    fn components_see_their_node() {
        let mut node = Node::new("n");
        node.add_component(Counter(0));

        node.update_components(0.016);
        node.update_components(0.016);

        assert_eq!(node.component::<Counter>().map(|c| c.0), Some(2));
        assert_eq!(node.property::<u32>(), Some(&2));
    }

    #[test]
    fn listeners_run_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut node = Node::new("n");

        for i in 0..3 {
            let log = log.clone();
            node.add_event_listener("hit", move |payload| {
                let damage = payload.downcast_ref::<u32>().copied().unwrap_or(0);
                log.borrow_mut().push((i, damage));
            });
        }

        assert_eq!(node.notify("hit", &5u32), 3);
        assert_eq!(node.notify("miss", &5u32), 0);
        assert_eq!(*log.borrow(), vec![(0, 5), (1, 5), (2, 5)]);
    }
}
