//! An arena of transform nodes.
//!
//! Nodes are addressed by versioned indices, both downwards (children) and upwards (parent,
//! listeners), so there are no reference cycles. A listener is any node that wants to know
//! when the world transform of another node changes, e.g. a skinned drawable listening to its
//! bones. Listener lists are compacted whenever nodes are removed.

use std::cell::Cell;

use cgmath::{Decomposed, Matrix4, One, Quaternion, Rotation3, SquareMatrix, Vector3, Zero};
use smallvec::SmallVec;

use crate::errors::*;

/// A versioned index into a `SceneGraph`. A removed node's index is recycled with a new
/// version, so stale indices never alias a live node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex {
    index: u32,
    version: u32,
}

impl NodeIndex {
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }
}

/// Position, rotation and uniform scale, relative to the parent node.
pub type Transform = Decomposed<Vector3<f32>, Quaternion<f32>>;

struct Node {
    name: String,
    parent: Option<NodeIndex>,
    children: SmallVec<[NodeIndex; 4]>,
    listeners: SmallVec<[NodeIndex; 2]>,
    local: Transform,
    world: Cell<Matrix4<f32>>,
    dirty: Cell<bool>,
    notified: bool,
}

impl Node {
    fn new(name: String) -> Self {
        Node {
            name,
            parent: None,
            children: SmallVec::new(),
            listeners: SmallVec::new(),
            local: Decomposed {
                scale: 1.0,
                rot: Quaternion::one(),
                disp: Vector3::zero(),
            },
            world: Cell::new(Matrix4::identity()),
            dirty: Cell::new(true),
            notified: false,
        }
    }
}

struct Entry {
    version: u32,
    node: Option<Node>,
}

pub struct SceneGraph {
    entries: Vec<Entry>,
    frees: Vec<u32>,
    roots: Vec<NodeIndex>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        SceneGraph::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        SceneGraph {
            entries: Vec::new(),
            frees: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// The number of live nodes.
    pub fn len(&self) -> usize {
        self.entries.len() - self.frees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates a root node with identity transform.
    pub fn create<T: Into<String>>(&mut self, name: T) -> NodeIndex {
        let node = Node::new(name.into());

        let handle = if let Some(index) = self.frees.pop() {
            let entry = &mut self.entries[index as usize];
            entry.version += 1;
            entry.node = Some(node);
            NodeIndex {
                index,
                version: entry.version,
            }
        } else {
            self.entries.push(Entry {
                version: 1,
                node: Some(node),
            });

            NodeIndex {
                index: self.entries.len() as u32 - 1,
                version: 1,
            }
        };

        self.roots.push(handle);
        handle
    }

    #[inline]
    pub fn is_alive(&self, handle: NodeIndex) -> bool {
        self.node(handle).is_some()
    }

    fn node(&self, handle: NodeIndex) -> Option<&Node> {
        self.entries
            .get(handle.index as usize)
            .filter(|v| v.version == handle.version)
            .and_then(|v| v.node.as_ref())
    }

    fn node_mut(&mut self, handle: NodeIndex) -> Option<&mut Node> {
        self.entries
            .get_mut(handle.index as usize)
            .filter(|v| v.version == handle.version)
            .and_then(|v| v.node.as_mut())
    }

    fn get(&self, handle: NodeIndex) -> Result<&Node> {
        self.node(handle)
            .ok_or_else(|| Error::ResourceNotFound(format!("Node {:?}", handle)))
    }

    pub fn name(&self, handle: NodeIndex) -> Option<&str> {
        self.node(handle).map(|v| v.name.as_str())
    }

    /// Finds the first live node named `name`.
    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        self.entries.iter().enumerate().find_map(|(i, v)| match v.node {
            Some(ref n) if n.name == name => Some(NodeIndex {
                index: i as u32,
                version: v.version,
            }),
            _ => None,
        })
    }

    #[inline]
    pub fn parent(&self, handle: NodeIndex) -> Option<NodeIndex> {
        self.node(handle).and_then(|v| v.parent)
    }

    pub fn children(&self, handle: NodeIndex) -> &[NodeIndex] {
        self.node(handle).map(|v| &v.children[..]).unwrap_or(&[])
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    #[inline]
    pub fn is_root(&self, handle: NodeIndex) -> bool {
        self.node(handle).map(|v| v.parent.is_none()).unwrap_or(false)
    }

    #[inline]
    pub fn is_leaf(&self, handle: NodeIndex) -> bool {
        self.node(handle).map(|v| v.children.is_empty()).unwrap_or(false)
    }

    /// Returns an iterator over the ancestors of a node, nearest first.
    pub fn ancestors(&self, handle: NodeIndex) -> Ancestors {
        Ancestors {
            graph: self,
            cursor: self.parent(handle),
        }
    }

    /// Whether `ancestor` is one of the ancestors of `handle`.
    pub fn is_ancestor(&self, handle: NodeIndex, ancestor: NodeIndex) -> bool {
        self.ancestors(handle).any(|v| v == ancestor)
    }

    /// The descendants of a node, depth first.
    pub fn descendants(&self, handle: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeIndex> = self.children(handle).iter().rev().cloned().collect();

        while let Some(v) = stack.pop() {
            out.push(v);
            stack.extend(self.children(v).iter().rev().cloned());
        }

        out
    }

    /// Attaches `child` under `parent`, or makes it a root with `None`. The local transform is
    /// kept, so the world pose follows the new parent.
    pub fn set_parent<T>(&mut self, child: NodeIndex, parent: T) -> Result<()>
    where
        T: Into<Option<NodeIndex>>,
    {
        let parent = parent.into();
        self.get(child)?;

        if let Some(parent) = parent {
            self.get(parent)?;
            if parent == child || self.is_ancestor(parent, child) {
                return Err(Error::InvalidSettings(format!(
                    "Node {:?} can not become a child of its own descendant.",
                    child
                )));
            }
        }

        self.detach(child);

        match parent {
            Some(parent) => {
                if let Some(node) = self.node_mut(parent) {
                    node.children.push(child);
                }

                if let Some(node) = self.node_mut(child) {
                    node.parent = Some(parent);
                }
            }
            None => self.roots.push(child),
        }

        self.mark_dirty(child);
        Ok(())
    }

    fn detach(&mut self, child: NodeIndex) {
        let parent = self.node_mut(child).and_then(|v| v.parent.take());
        match parent {
            Some(parent) => {
                if let Some(node) = self.node_mut(parent) {
                    node.children.retain(|v| *v != child);
                }
            }
            None => self.roots.retain(|v| *v != child),
        }
    }

    /// Removes a node and all of its descendants. Returns the removed indices.
    pub fn remove(&mut self, handle: NodeIndex) -> Result<Vec<NodeIndex>> {
        self.get(handle)?;
        self.detach(handle);

        let mut removes = vec![handle];
        removes.extend(self.descendants(handle));

        for v in &removes {
            let entry = &mut self.entries[v.index as usize];
            entry.node = None;
            self.frees.push(v.index);
        }

        self.compact_listeners();
        Ok(removes)
    }

    fn compact_listeners(&mut self) {
        let alive: Vec<bool> = self.entries.iter().map(|v| v.node.is_some()).collect();
        let versions: Vec<u32> = self.entries.iter().map(|v| v.version).collect();

        for entry in &mut self.entries {
            if let Some(ref mut node) = entry.node {
                node.listeners.retain(|v| {
                    let i = v.index as usize;
                    alive[i] && versions[i] == v.version
                });
            }
        }
    }

    /// Registers `listener` to be notified whenever the world transform of `handle` changes.
    pub fn add_listener(&mut self, handle: NodeIndex, listener: NodeIndex) -> Result<()> {
        self.get(listener)?;
        let node = self
            .node_mut(handle)
            .ok_or_else(|| Error::ResourceNotFound(format!("Node {:?}", handle)))?;

        if !node.listeners.contains(&listener) {
            node.listeners.push(listener);
        }

        Ok(())
    }

    pub fn remove_listener(&mut self, handle: NodeIndex, listener: NodeIndex) {
        if let Some(node) = self.node_mut(handle) {
            node.listeners.retain(|v| *v != listener);
        }
    }

    pub fn listeners(&self, handle: NodeIndex) -> &[NodeIndex] {
        self.node(handle).map(|v| &v.listeners[..]).unwrap_or(&[])
    }

    /// Whether a node was notified since the last call, and clears the notification.
    pub fn take_notification(&mut self, handle: NodeIndex) -> bool {
        self.node_mut(handle)
            .map(|v| ::std::mem::replace(&mut v.notified, false))
            .unwrap_or(false)
    }

    fn mark_dirty(&mut self, handle: NodeIndex) {
        let mut stack = vec![handle];
        let mut listeners = Vec::new();

        while let Some(v) = stack.pop() {
            if let Some(node) = self.node(v) {
                node.dirty.set(true);
                stack.extend(node.children.iter().cloned());
                listeners.extend(node.listeners.iter().cloned());
            }
        }

        for v in listeners {
            if let Some(node) = self.node_mut(v) {
                node.notified = true;
            }
        }
    }
}

impl SceneGraph {
    #[inline]
    pub fn local_transform(&self, handle: NodeIndex) -> Option<Transform> {
        self.node(handle).map(|v| v.local)
    }

    pub fn set_local_transform(&mut self, handle: NodeIndex, transform: Transform) {
        if let Some(node) = self.node_mut(handle) {
            node.local = transform;
        }

        self.mark_dirty(handle);
    }

    pub fn set_position<T: Into<Vector3<f32>>>(&mut self, handle: NodeIndex, position: T) {
        if let Some(mut t) = self.local_transform(handle) {
            t.disp = position.into();
            self.set_local_transform(handle, t);
        }
    }

    pub fn translate<T: Into<Vector3<f32>>>(&mut self, handle: NodeIndex, disp: T) {
        if let Some(mut t) = self.local_transform(handle) {
            t.disp += disp.into();
            self.set_local_transform(handle, t);
        }
    }

    pub fn set_rotation<T: Into<Quaternion<f32>>>(&mut self, handle: NodeIndex, rotation: T) {
        if let Some(mut t) = self.local_transform(handle) {
            t.rot = rotation.into();
            self.set_local_transform(handle, t);
        }
    }

    /// Rotates the node about its local Y axis.
    pub fn yaw<T: Into<cgmath::Rad<f32>>>(&mut self, handle: NodeIndex, angle: T) {
        if let Some(mut t) = self.local_transform(handle) {
            t.rot = Quaternion::from_angle_y(angle) * t.rot;
            self.set_local_transform(handle, t);
        }
    }

    pub fn set_scale(&mut self, handle: NodeIndex, scale: f32) {
        if let Some(mut t) = self.local_transform(handle) {
            t.scale = scale;
            self.set_local_transform(handle, t);
        }
    }

    /// The parent-relative matrix of a node.
    pub fn local_matrix(&self, handle: NodeIndex) -> Option<Matrix4<f32>> {
        self.node(handle).map(|v| Matrix4::from(v.local))
    }

    /// The world matrix of a node. Clean nodes answer from their cache; dirty ones fold their
    /// ancestors without touching it.
    pub fn world_transform(&self, handle: NodeIndex) -> Option<Matrix4<f32>> {
        let node = self.node(handle)?;
        if !node.dirty.get() {
            return Some(node.world.get());
        }

        let local = Matrix4::from(node.local);
        Some(match node.parent {
            Some(parent) => self.world_transform(parent).unwrap_or_else(Matrix4::identity) * local,
            None => local,
        })
    }

    /// Recomputes the world matrices of every dirty node. Returns the number of nodes whose
    /// world matrix was recomputed.
    pub fn update_transforms(&mut self) -> u32 {
        let mut count = 0;
        let mut stack: Vec<(NodeIndex, Matrix4<f32>, bool)> = self
            .roots
            .iter()
            .map(|v| (*v, Matrix4::identity(), false))
            .collect();

        while let Some((handle, parent, forced)) = stack.pop() {
            let node = match self.node(handle) {
                Some(v) => v,
                None => continue,
            };

            let changed = forced || node.dirty.get();
            if changed {
                node.world.set(parent * Matrix4::from(node.local));
                node.dirty.set(false);
                count += 1;
            }

            let world = node.world.get();
            for v in &node.children {
                stack.push((*v, world, changed));
            }
        }

        count
    }
}

/// An iterator over the ancestors of a node.
pub struct Ancestors<'a> {
    graph: &'a SceneGraph,
    cursor: Option<NodeIndex>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let v = self.cursor?;
        self.cursor = self.graph.parent(v);
        Some(v)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use cgmath::{Deg, Vector4};

    #[test]
    fn hierarchy() {
        let mut graph = SceneGraph::new();
        let e1 = graph.create("e1");
        let e2 = graph.create("e2");
        let e3 = graph.create("e3");
        let e4 = graph.create("e4");

        graph.set_parent(e4, e3).unwrap();
        graph.set_parent(e3, e1).unwrap();
        graph.set_parent(e2, e1).unwrap();
        // e1 <- (e3 <- (e4), e2)

        assert!(graph.is_ancestor(e4, e1));
        assert!(graph.is_ancestor(e4, e3));
        assert!(!graph.is_ancestor(e1, e4));
        assert!(graph.is_root(e1));
        assert!(graph.is_leaf(e2));
        assert_eq!(graph.roots(), &[e1]);
        assert_eq!(graph.descendants(e1), vec![e3, e4, e2]);
        assert!(graph.set_parent(e1, e4).is_err());
        assert_eq!(graph.find("e3"), Some(e3));
    }

    #[test]
    fn starts_at_identity() {
        let mut graph = SceneGraph::new();
        let node = graph.create("node");

        let local = graph.local_transform(node).unwrap();
        assert_eq!(local.scale, 1.0);
        assert_eq!(local.disp, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(graph.world_transform(node), Some(Matrix4::identity()));
    }

    #[test]
    fn transforms() {
        let mut graph = SceneGraph::new();
        let parent = graph.create("parent");
        let child = graph.create("child");
        graph.set_parent(child, parent).unwrap();

        graph.set_position(parent, [1.0, 0.0, 0.0]);
        graph.set_position(child, [0.0, 0.0, 1.0]);
        graph.yaw(parent, Deg(90.0));
        assert_eq!(graph.update_transforms(), 2);
        assert_eq!(graph.update_transforms(), 0);

        let p = graph.world_transform(child).unwrap() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p, Vector4::new(2.0, 0.0, 0.0, 1.0), epsilon = 1e-5);

        graph.translate(parent, [0.0, 1.0, 0.0]);
        let p = graph.world_transform(child).unwrap() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p, Vector4::new(2.0, 1.0, 0.0, 1.0), epsilon = 1e-5);
        assert_eq!(graph.update_transforms(), 2);
    }

    #[test]
    fn listeners() {
        let mut graph = SceneGraph::new();
        let bone = graph.create("bone");
        let skin = graph.create("skin");
        let other = graph.create("other");

        graph.add_listener(bone, skin).unwrap();
        graph.add_listener(bone, other).unwrap();
        graph.add_listener(bone, skin).unwrap();
        assert_eq!(graph.listeners(bone).len(), 2);

        graph.set_position(bone, [0.0, 1.0, 0.0]);
        assert!(graph.take_notification(skin));
        assert!(!graph.take_notification(skin));

        graph.remove(other).unwrap();
        assert_eq!(graph.listeners(bone), &[skin]);
    }

    #[test]
    fn recycle() {
        let mut graph = SceneGraph::new();
        let e1 = graph.create("e1");
        let e2 = graph.create("e2");
        graph.set_parent(e2, e1).unwrap();

        assert_eq!(graph.remove(e1).unwrap(), vec![e1, e2]);
        assert!(graph.is_empty());

        let e3 = graph.create("e3");
        assert!(!graph.is_alive(e1) && !graph.is_alive(e2));
        assert!(graph.is_alive(e3));
        assert!(e3 != e1 && e3 != e2);
        assert_eq!(graph.len(), 1);
    }
}
