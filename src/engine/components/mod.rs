//! Behaviour attached to scene nodes, plus the camera and its input controller.
//!
//! A node holds at most one component per concrete type. Components are updated once per
//! scene update with mutable access to the node that owns them.

mod camera;
mod camera_controller;
mod orbit;
mod oscillate;
mod rotate;

pub use camera::*;
pub use camera_controller::*;
pub use orbit::*;
pub use oscillate::*;
pub use rotate::*;

use crate::core::Node;
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Upcasting to [`Any`] for trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

pub trait Component: AsAny {
    // Gets called once per scene update. The owning node's components are not reachable
    // through `node` while this runs.
    fn update(&mut self, _node: &mut Node, _dt: f32) {}

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Single slot per component type.
#[derive(Default)]
pub struct ComponentStorage {
    components: HashMap<TypeId, Box<dyn Component>>,
}

impl ComponentStorage {
    /// Stores `component`. Returns the previous component of the same type.
    pub fn insert<C: Component>(&mut self, component: C) -> Option<C> {
        let previous = self
            .components
            .insert(TypeId::of::<C>(), Box::new(component))?;
        previous.into_any().downcast().ok().map(|c: Box<C>| *c)
    }

    pub fn get<C: Component>(&self) -> Option<&C> {
        self.components
            .get(&TypeId::of::<C>())
            .and_then(|c| (**c).as_any().downcast_ref())
    }

    pub fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.components
            .get_mut(&TypeId::of::<C>())
            .and_then(|c| (**c).as_any_mut().downcast_mut())
    }

    pub fn remove<C: Component>(&mut self) -> Option<C> {
        let boxed = self.components.remove(&TypeId::of::<C>())?;
        boxed.into_any().downcast().ok().map(|c: Box<C>| *c)
    }

    pub fn contains<C: Component>(&self) -> bool {
        self.components.contains_key(&TypeId::of::<C>())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.components.values().map(|c| c.name())
    }

    pub(crate) fn update_all(&mut self, node: &mut Node, dt: f32) {
        for component in self.components.values_mut() {
            component.update(node, dt);
        }
    }

    /// Moves all of `other` into `self`. Components of `other` win.
    pub(crate) fn merge(&mut self, other: ComponentStorage) {
        self.components.extend(other.components);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Health(u32);
    impl Component for Health {}

    struct Tag;
    impl Component for Tag {
        fn name(&self) -> &'static str {
            "Tag"
        }
    }

    #[test]
    fn one_slot_per_type() {
        let mut storage = ComponentStorage::default();
        assert!(storage.insert(Health(3)).is_none());
        assert_eq!(storage.insert(Health(7)).map(|h| h.0), Some(3));
        storage.insert(Tag);
        if let Some(health) = storage.get_mut::<Health>() {
            health.0 += 1;
        }

        assert_eq!(storage.len(), 2);
        assert_eq!(storage.get::<Health>().map(|h| h.0), Some(8));
        assert!(storage.contains::<Tag>());
    }

    #[test]
    fn remove_returns_the_component() {
        let mut storage = ComponentStorage::default();
        storage.insert(Health(5));

        assert_eq!(storage.remove::<Health>().map(|h| h.0), Some(5));
        assert!(storage.remove::<Health>().is_none());
        assert!(storage.get::<Tag>().is_none());
    }

    #[test]
    fn names_default_to_type_names() {
        let mut storage = ComponentStorage::default();
        storage.insert(Health(1));
        storage.insert(Tag);

        let mut names: Vec<_> = storage.names().collect();
        names.sort();
        assert_eq!(names[0], "Tag");
        assert!(names[1].ends_with("Health"));
    }
}
