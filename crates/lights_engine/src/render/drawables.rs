//! Drawable registry
//!
//! The ordered list of (mesh, material) pairs drawn each frame. The registry
//! stores handles only; meshes and materials live in the renderer's slot maps,
//! and the generation in each key lets a stale pair be detected after its
//! asset is destroyed.

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a GPU mesh
    pub struct MeshHandle;
    /// Handle to a material
    pub struct MaterialHandle;
    /// Handle to a graphics pipeline
    pub struct PipelineHandle;
    /// Handle to a sampled texture
    pub struct TextureHandle;
    /// Identifies one entry in the drawable registry
    pub struct DrawableId;
}

/// A mesh drawn with a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Drawable {
    /// Geometry to draw
    pub mesh: MeshHandle,
    /// Material providing pipeline and descriptor sets
    pub material: MaterialHandle,
}

/// Insertion-ordered drawables
#[derive(Debug, Default)]
pub struct DrawableRegistry {
    entries: SlotMap<DrawableId, Drawable>,
    order: Vec<DrawableId>,
}

impl DrawableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a drawable; duplicates are allowed and drawn twice
    pub fn add(&mut self, mesh: MeshHandle, material: MaterialHandle) -> DrawableId {
        let id = self.entries.insert(Drawable { mesh, material });
        self.order.push(id);
        id
    }

    /// Remove a drawable, returning it if it was present
    pub fn remove(&mut self, id: DrawableId) -> Option<Drawable> {
        let drawable = self.entries.remove(id)?;
        self.order.retain(|&entry| entry != id);
        Some(drawable)
    }

    /// Look up a drawable
    pub fn get(&self, id: DrawableId) -> Option<&Drawable> {
        self.entries.get(id)
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Visit every drawable in insertion order
    pub fn for_each<F: FnMut(DrawableId, &Drawable)>(&self, mut visitor: F) {
        for &id in &self.order {
            if let Some(drawable) = self.entries.get(id) {
                visitor(id, drawable);
            }
        }
    }

    /// Drawables in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (DrawableId, &Drawable)> + '_ {
        self.order
            .iter()
            .filter_map(move |&id| self.entries.get(id).map(|drawable| (id, drawable)))
    }

    /// Number of drawables
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drop every drawable for which `is_live` returns false
    ///
    /// Run after destroying a mesh or material so no drawable refers to it.
    /// Returns the number of drawables removed.
    pub fn retain_valid<F: FnMut(&Drawable) -> bool>(&mut self, mut is_live: F) -> usize {
        let before = self.order.len();
        let entries = &mut self.entries;
        self.order.retain(|&id| match entries.get(id) {
            Some(drawable) if is_live(drawable) => true,
            Some(_) => {
                entries.remove(id);
                false
            }
            None => false,
        });

        let removed = before - self.order.len();
        if removed > 0 {
            log::debug!("Removed {} drawables referring to destroyed assets", removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles() -> (SlotMap<MeshHandle, ()>, SlotMap<MaterialHandle, ()>) {
        (SlotMap::with_key(), SlotMap::with_key())
    }

    #[test]
    fn test_insertion_order() {
        let (mut meshes, mut materials) = handles();
        let (m0, m1) = (meshes.insert(()), meshes.insert(()));
        let mat = materials.insert(());

        let mut registry = DrawableRegistry::new();
        let a = registry.add(m1, mat);
        let b = registry.add(m0, mat);
        let c = registry.add(m1, mat);

        let mut visited = Vec::new();
        registry.for_each(|id, _| visited.push(id));
        assert_eq!(visited, vec![a, b, c]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_remove_keeps_order() {
        let (mut meshes, mut materials) = handles();
        let mesh = meshes.insert(());
        let mat = materials.insert(());

        let mut registry = DrawableRegistry::new();
        let ids: Vec<DrawableId> = (0..4).map(|_| registry.add(mesh, mat)).collect();
        assert!(registry.remove(ids[1]).is_some());
        assert!(registry.remove(ids[1]).is_none());

        let remaining: Vec<DrawableId> = registry.iter().map(|(id, _)| id).collect();
        assert_eq!(remaining, vec![ids[0], ids[2], ids[3]]);
    }

    /// Destroying a mesh invalidates every drawable that used it
    #[test]
    fn test_retain_valid_drops_stale_handles() {
        let (mut meshes, mut materials) = handles();
        let keep = meshes.insert(());
        let doomed = meshes.insert(());
        let mat = materials.insert(());

        let mut registry = DrawableRegistry::new();
        registry.add(doomed, mat);
        let survivor = registry.add(keep, mat);
        registry.add(doomed, mat);

        meshes.remove(doomed);
        let removed = registry.retain_valid(|d| meshes.contains_key(d.mesh) && materials.contains_key(d.material));

        assert_eq!(removed, 2);
        assert_eq!(registry.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![survivor]);
    }

    #[test]
    fn test_clear() {
        let (mut meshes, mut materials) = handles();
        let mut registry = DrawableRegistry::new();
        registry.add(meshes.insert(()), materials.insert(()));
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.iter().count(), 0);
    }
}
