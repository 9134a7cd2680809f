//! Document collection holding the live volume entities of a run
//!
//! The host owns this collection. The pipeline only needs to add entities,
//! clear everything, and look entities up by name.

use crate::utils::glob_match;
use crate::volume::VolumeImage;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Shared handle to a volume registered in a scene
pub type SharedVolume = Arc<RwLock<VolumeImage>>;

/// A registered entity
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: Uuid,
    pub volume: SharedVolume,
}

impl SceneNode {
    pub fn name(&self) -> String {
        self.volume.read().name().to_string()
    }
}

/// Collaborator interface over the host's entity collection
pub trait Scene: Send + Sync {
    /// Register a volume and return its node
    fn add(&self, volume: VolumeImage) -> SceneNode;

    /// Discard every registered entity
    fn clear(&self);

    /// Find the first node whose name equals `pattern`, or matches it when
    /// it contains `*` or `?` wildcards
    fn lookup(&self, pattern: &str) -> Option<SceneNode>;

    /// Number of registered entities
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory scene, nodes kept in insertion order
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: RwLock<Vec<SceneNode>>,
    clears: AtomicUsize,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the scene has been cleared
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    /// Names of all nodes, in insertion order
    pub fn names(&self) -> Vec<String> {
        self.nodes.read().iter().map(SceneNode::name).collect()
    }
}

impl Scene for MemoryScene {
    fn add(&self, volume: VolumeImage) -> SceneNode {
        let node = SceneNode {
            id: Uuid::new_v4(),
            volume: Arc::new(RwLock::new(volume)),
        };
        self.nodes.write().push(node.clone());
        node
    }

    fn clear(&self) {
        self.nodes.write().clear();
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn lookup(&self, pattern: &str) -> Option<SceneNode> {
        let wildcard = pattern.contains(['*', '?']);
        self.nodes
            .read()
            .iter()
            .find(|node| {
                let volume = node.volume.read();
                if wildcard {
                    glob_match(pattern, volume.name())
                } else {
                    volume.name() == pattern
                }
            })
            .cloned()
    }

    fn len(&self) -> usize {
        self.nodes.read().len()
    }
}
