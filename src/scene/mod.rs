//! In-memory model of the editor scene the pipeline mutates.
//!
//! Objects, materials and images live in arenas addressed by
//! generation-checked handles, so a handle kept across a deletion resolves
//! to `None` instead of to whatever reused the slot.

pub mod arena;
pub mod hierarchy;
pub mod mesh;
pub mod reference;
pub mod serialization;

use cgmath::{Matrix4, SquareMatrix};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use arena::{Arena, ArenaHandle, ImageId, MaterialId, ObjectId};
pub use mesh::{Mesh, UvLayer};

use crate::error::{ImportError, Result};
use crate::math;
use crate::shader::ShaderGraph;

/// Longest parent chain followed before assuming a cycle.
const MAX_PARENT_DEPTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Copies the target's world transform onto the owner. Used as the
    /// relationship marker between a capture mesh and its reference.
    CopyTransforms,
}

impl ConstraintKind {
    pub fn default_name(&self) -> &'static str {
        match self {
            ConstraintKind::CopyTransforms => "Copy Transforms",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub target: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    pub mesh: Option<Mesh>,
    pub parent: Option<ObjectId>,
    pub matrix_basis: Matrix4<f32>,
    pub matrix_parent_inverse: Matrix4<f32>,
    pub constraints: Vec<Constraint>,
    pub hidden: bool,
}

impl Object {
    pub fn new(name: &str, mesh: Option<Mesh>) -> Self {
        Self {
            name: name.to_string(),
            mesh,
            parent: None,
            matrix_basis: Matrix4::identity(),
            matrix_parent_inverse: Matrix4::identity(),
            constraints: vec![],
            hidden: false,
        }
    }

    pub fn is_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    /// Copy-transform relationship markers on this object.
    pub fn markers(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints
            .iter()
            .filter(|c| c.kind == ConstraintKind::CopyTransforms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMethod {
    #[default]
    Opaque,
    Blend,
    Hashed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub blend_method: BlendMethod,
    pub show_transparent_back: bool,
    pub node_tree: Option<ShaderGraph>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    #[default]
    Srgb,
    NonColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    pub filepath: PathBuf,
    pub width: u32,
    pub height: u32,
    pub colorspace: ColorSpace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub objects: Vec<ObjectId>,
}

/// Split `"Name.001"` into `("Name", Some(1))`.
pub fn split_numeric_suffix(name: &str) -> (&str, Option<u32>) {
    if let Some((base, suffix)) = name.rsplit_once('.') {
        if suffix.len() >= 3 && suffix.chars().all(|c| c.is_ascii_digit()) {
            return (base, suffix.parse().ok());
        }
    }
    (name, None)
}

/// First of `desired`, `base.001`, `base.002`, ... that is not taken.
fn unique_name(desired: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(desired) {
        return desired.to_string();
    }
    let (base, _) = split_numeric_suffix(desired);
    let mut n = 1u32;
    loop {
        let candidate = format!("{}.{:03}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    objects: Arena<ObjectId, Object>,
    materials: Arena<MaterialId, Material>,
    images: Arena<ImageId, Image>,
    collections: Vec<Collection>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Objects
    // ========================================================================

    /// Create an object. A name collision gets a `.001`-style suffix.
    pub fn add_object(&mut self, name: &str, mesh: Option<Mesh>) -> ObjectId {
        let name = unique_name(name, |n| self.object_by_name(n).is_some());
        self.objects.insert(Object::new(&name, mesh))
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.objects.contains(id)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter()
    }

    pub fn object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, o)| o.name == name)
            .map(|(id, _)| id)
    }

    pub fn object_name(&self, id: ObjectId) -> Option<&str> {
        self.objects.get(id).map(|o| o.name.as_str())
    }

    /// Rename an object, returning the name it actually received.
    pub fn rename_object(&mut self, id: ObjectId, name: &str) -> Option<String> {
        let current = self.objects.get(id)?.name.clone();
        if current == name {
            return Some(current);
        }
        let name = unique_name(name, |n| {
            self.objects.iter().any(|(other, o)| other != id && o.name == n)
        });
        self.objects.get_mut(id)?.name = name.clone();
        Some(name)
    }

    /// Delete an object. Children are unparented in place, markers that
    /// pointed at it lose their target and every collection forgets it.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<Object> {
        if !self.objects.contains(id) {
            return None;
        }

        let children: Vec<(ObjectId, Matrix4<f32>)> = self
            .children(id)
            .into_iter()
            .filter_map(|child| self.world_matrix(child).map(|w| (child, w)))
            .collect();
        for (child, world) in children {
            if let Some(object) = self.objects.get_mut(child) {
                object.parent = None;
                object.matrix_parent_inverse = Matrix4::identity();
                object.matrix_basis = world;
            }
        }

        for other in self.objects.handles() {
            if let Some(object) = self.objects.get_mut(other) {
                for constraint in object.constraints.iter_mut() {
                    if constraint.target == Some(id) {
                        constraint.target = None;
                    }
                }
            }
        }

        for collection in self.collections.iter_mut() {
            collection.objects.retain(|o| *o != id);
        }

        self.objects.remove(id)
    }

    pub fn children(&self, id: ObjectId) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.parent == Some(id))
            .map(|(child, _)| child)
            .collect()
    }

    /// Live parent of an object, if any.
    pub fn parent_of(&self, id: ObjectId) -> Option<ObjectId> {
        let parent = self.objects.get(id)?.parent?;
        self.objects.contains(parent).then_some(parent)
    }

    /// World transform: `parent_world * parent_inverse * basis`.
    pub fn world_matrix(&self, id: ObjectId) -> Option<Matrix4<f32>> {
        let mut current = self.objects.get(id)?;
        let mut world = current.matrix_basis;
        for _ in 0..MAX_PARENT_DEPTH {
            let Some(parent) = current.parent.and_then(|p| self.objects.get(p)) else {
                break;
            };
            world = parent.matrix_basis * current.matrix_parent_inverse * world;
            current = parent;
        }
        Some(world)
    }

    /// Set the basis so that the object's world transform equals `world`.
    pub fn set_world_matrix(&mut self, id: ObjectId, world: Matrix4<f32>) -> Result<()> {
        let object = self
            .objects
            .get(id)
            .ok_or_else(|| ImportError::MissingReference(format!("object {}", id)))?;
        let parent_space = match object.parent.and_then(|p| self.world_matrix(p)) {
            Some(parent_world) => parent_world * object.matrix_parent_inverse,
            None => Matrix4::identity(),
        };
        let to_local = math::try_invert(&parent_space).ok_or_else(|| {
            ImportError::UnsupportedFormat(format!(
                "parent transform of '{}' is not invertible",
                object.name
            ))
        })?;
        if let Some(object) = self.objects.get_mut(id) {
            object.matrix_basis = to_local * world;
        }
        Ok(())
    }

    /// Set the parent link only; matrices are untouched.
    pub fn set_parent(&mut self, id: ObjectId, parent: Option<ObjectId>) -> Result<()> {
        if !self.objects.contains(id) {
            return Err(ImportError::MissingReference(format!("object {}", id)));
        }
        if let Some(parent) = parent {
            if !self.objects.contains(parent) {
                return Err(ImportError::MissingReference(format!(
                    "parent object {}",
                    parent
                )));
            }
            let mut ancestor = Some(parent);
            for _ in 0..MAX_PARENT_DEPTH {
                match ancestor {
                    Some(a) if a == id => {
                        return Err(ImportError::UnsupportedFormat(format!(
                            "parenting {} to {} would create a cycle",
                            id, parent
                        )))
                    }
                    Some(a) => ancestor = self.objects.get(a).and_then(|o| o.parent),
                    None => break,
                }
            }
        }
        if let Some(object) = self.objects.get_mut(id) {
            object.parent = parent;
        }
        Ok(())
    }

    pub fn set_hidden(&mut self, id: ObjectId, hidden: bool) -> bool {
        match self.objects.get_mut(id) {
            Some(object) => {
                object.hidden = hidden;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    /// Add a constraint and return its (unique per object) name.
    pub fn add_constraint(
        &mut self,
        owner: ObjectId,
        kind: ConstraintKind,
        target: Option<ObjectId>,
    ) -> Result<String> {
        let object = self
            .objects
            .get_mut(owner)
            .ok_or_else(|| ImportError::MissingReference(format!("object {}", owner)))?;
        let name = unique_name(kind.default_name(), |n| {
            object.constraints.iter().any(|c| c.name == n)
        });
        object.constraints.push(Constraint {
            name: name.clone(),
            kind,
            target,
        });
        Ok(name)
    }

    pub fn remove_constraint(&mut self, owner: ObjectId, name: &str) -> Option<Constraint> {
        let object = self.objects.get_mut(owner)?;
        let position = object.constraints.iter().position(|c| c.name == name)?;
        Some(object.constraints.remove(position))
    }

    /// Bake a copy-transforms constraint: the owner takes the target's world
    /// transform and the constraint is removed.
    pub fn apply_constraint(&mut self, owner: ObjectId, name: &str) -> Result<()> {
        let object = self
            .objects
            .get(owner)
            .ok_or_else(|| ImportError::MissingReference(format!("object {}", owner)))?;
        let constraint = object
            .constraints
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                ImportError::MissingReference(format!(
                    "constraint '{}' on '{}'",
                    name, object.name
                ))
            })?;
        let target = constraint.target.ok_or_else(|| {
            ImportError::MissingReference(format!(
                "constraint '{}' on '{}' has no target",
                name, object.name
            ))
        })?;
        let world = self.world_matrix(target).ok_or_else(|| {
            ImportError::MissingReference(format!("target {} no longer exists", target))
        })?;

        self.set_world_matrix(owner, world)?;
        self.remove_constraint(owner, name);
        Ok(())
    }

    // ========================================================================
    // Materials
    // ========================================================================

    pub fn add_material(&mut self, name: &str) -> MaterialId {
        let name = unique_name(name, |n| self.material_by_name(n).is_some());
        self.materials.insert(Material {
            name,
            blend_method: BlendMethod::Opaque,
            show_transparent_back: true,
            node_tree: None,
        })
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials.iter()
    }

    pub fn material_by_name(&self, name: &str) -> Option<MaterialId> {
        self.materials
            .iter()
            .find(|(_, m)| m.name == name)
            .map(|(id, _)| id)
    }

    pub fn rename_material(&mut self, id: MaterialId, name: &str) -> Option<String> {
        let current = self.materials.get(id)?.name.clone();
        if current == name {
            return Some(current);
        }
        let name = unique_name(name, |n| {
            self.materials.iter().any(|(other, m)| other != id && m.name == n)
        });
        self.materials.get_mut(id)?.name = name.clone();
        Some(name)
    }

    /// Number of objects whose mesh uses the material in any slot.
    pub fn material_users(&self, id: MaterialId) -> usize {
        self.objects
            .iter()
            .filter(|(_, o)| {
                o.mesh
                    .as_ref()
                    .map(|m| m.materials.contains(&Some(id)))
                    .unwrap_or(false)
            })
            .count()
    }

    /// Primary material of an object's mesh.
    pub fn primary_material(&self, id: ObjectId) -> Option<MaterialId> {
        self.objects.get(id)?.mesh.as_ref()?.primary_material()
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// Register an image file. An image with the same name is reused.
    pub fn load_image(&mut self, path: &Path, width: u32, height: u32) -> ImageId {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        if let Some(existing) = self.image_by_name(&name) {
            return existing;
        }
        self.images.insert(Image {
            name,
            filepath: path.to_path_buf(),
            width,
            height,
            colorspace: ColorSpace::Srgb,
        })
    }

    pub fn image(&self, id: ImageId) -> Option<&Image> {
        self.images.get(id)
    }

    pub fn image_mut(&mut self, id: ImageId) -> Option<&mut Image> {
        self.images.get_mut(id)
    }

    pub fn images(&self) -> impl Iterator<Item = (ImageId, &Image)> {
        self.images.iter()
    }

    pub fn image_by_name(&self, name: &str) -> Option<ImageId> {
        self.images
            .iter()
            .find(|(_, i)| i.name == name)
            .map(|(id, _)| id)
    }

    pub fn rename_image(&mut self, id: ImageId, name: &str) -> Option<String> {
        let current = self.images.get(id)?.name.clone();
        if current == name {
            return Some(current);
        }
        let name = unique_name(name, |n| {
            self.images.iter().any(|(other, i)| other != id && i.name == n)
        });
        self.images.get_mut(id)?.name = name.clone();
        Some(name)
    }

    // ========================================================================
    // Collections
    // ========================================================================

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn ensure_collection(&mut self, name: &str) -> &mut Collection {
        let index = match self.collections.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.collections.push(Collection {
                    name: name.to_string(),
                    objects: vec![],
                });
                self.collections.len() - 1
            }
        };
        &mut self.collections[index]
    }

    pub fn remove_collection(&mut self, name: &str) -> Option<Collection> {
        let index = self.collections.iter().position(|c| c.name == name)?;
        Some(self.collections.remove(index))
    }

    /// Live objects of a collection in link order.
    pub fn collection_objects(&self, name: &str) -> Vec<ObjectId> {
        self.collection(name)
            .map(|c| {
                c.objects
                    .iter()
                    .copied()
                    .filter(|id| self.objects.contains(*id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn in_collection(&self, name: &str, id: ObjectId) -> bool {
        self.collection(name)
            .map(|c| c.objects.contains(&id))
            .unwrap_or(false)
    }

    /// Link an object into a collection, creating it if needed. Returns
    /// false when the object was already linked.
    pub fn link_object(&mut self, collection: &str, id: ObjectId) -> bool {
        let collection = self.ensure_collection(collection);
        if collection.objects.contains(&id) {
            return false;
        }
        collection.objects.push(id);
        true
    }

    /// Returns false when the object was not linked.
    pub fn unlink_object(&mut self, collection: &str, id: ObjectId) -> bool {
        match self.collections.iter_mut().find(|c| c.name == collection) {
            Some(c) => {
                let before = c.objects.len();
                c.objects.retain(|o| *o != id);
                c.objects.len() != before
            }
            None => false,
        }
    }
}
