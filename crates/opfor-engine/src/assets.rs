//! Meshes, models and materials owned by the application.
//!
//! Meshes and models live in [`Arena`]s and are referenced from components by
//! [`Handle`]. PBR materials are keyed by name.

use std::collections::HashMap;

use glam::{Vec2, Vec3, Vec4};
use tracing::{debug, warn};

use crate::arena::{Arena, Handle};
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Asset types
// ---------------------------------------------------------------------------

/// Triangle mesh in CPU memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub uvs: Vec<Vec2>,
    /// Indices into `positions`.
    pub triangles: Vec<[u32; 3]>,
    /// Name of the PBR material to draw with.
    pub material: Option<String>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether every triangle index points at an existing vertex.
    pub fn indices_in_bounds(&self) -> bool {
        let count = self.positions.len();
        self.triangles
            .iter()
            .flatten()
            .all(|&i| (i as usize) < count)
    }
}

/// A model file split into meshes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub path: String,
    pub meshes: Vec<Handle<Mesh>>,
}

/// Metallic-roughness material.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PbrMaterial {
    pub name: String,
    pub base_color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
    pub albedo_texture: Option<String>,
    pub metallic_roughness_texture: Option<String>,
    pub normal_texture: Option<String>,
}

impl PbrMaterial {
    /// White, non-metallic, fully rough material named `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color: Vec4::ONE,
            metallic: 0.0,
            roughness: 1.0,
            albedo_texture: None,
            metallic_roughness_texture: None,
            normal_texture: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AssetLibrary
// ---------------------------------------------------------------------------

/// Exclusive owner of every loaded mesh, model and material.
#[derive(Debug, Default)]
pub struct AssetLibrary {
    meshes: Arena<Mesh>,
    models: Arena<Model>,
    pbr_materials: HashMap<String, PbrMaterial>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    // -- meshes -------------------------------------------------------------

    pub fn add_mesh(&mut self, mesh: Mesh) -> Handle<Mesh> {
        let handle = self.meshes.insert(mesh);
        debug!(mesh = handle.id(), "added mesh");
        handle
    }

    pub fn mesh(&self, handle: Handle<Mesh>) -> Option<&Mesh> {
        self.meshes.get(handle)
    }

    pub fn remove_mesh(&mut self, handle: Handle<Mesh>) -> Option<Mesh> {
        self.meshes.remove(handle)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Point `mesh` at the material called `name`.
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleHandle`] if the mesh is gone,
    /// [`EngineError::UnknownMaterial`] if no such material is loaded.
    pub fn assign_material(&mut self, mesh: Handle<Mesh>, name: &str) -> Result<(), EngineError> {
        if !self.pbr_materials.contains_key(name) {
            return Err(EngineError::UnknownMaterial {
                name: name.to_owned(),
            });
        }
        let mesh = self.meshes.get_mut(mesh).ok_or(EngineError::StaleHandle {
            kind: "mesh",
            id: mesh.id(),
        })?;
        mesh.material = Some(name.to_owned());
        Ok(())
    }

    // -- models -------------------------------------------------------------

    /// Store `meshes` and a model referencing them.
    pub fn register_model(&mut self, path: impl Into<String>, meshes: Vec<Mesh>) -> Handle<Model> {
        let meshes = meshes.into_iter().map(|m| self.meshes.insert(m)).collect();
        let model = Model {
            path: path.into(),
            meshes,
        };
        debug!(path = %model.path, meshes = model.meshes.len(), "registered model");
        self.models.insert(model)
    }

    pub fn model(&self, handle: Handle<Model>) -> Option<&Model> {
        self.models.get(handle)
    }

    /// Remove a model together with the meshes it owns.
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleHandle`] if the model was already removed.
    pub fn remove_model(&mut self, handle: Handle<Model>) -> Result<Model, EngineError> {
        let model = self.models.remove(handle).ok_or(EngineError::StaleHandle {
            kind: "model",
            id: handle.id(),
        })?;
        for &mesh in &model.meshes {
            self.meshes.remove(mesh);
        }
        Ok(model)
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    // -- materials ----------------------------------------------------------

    /// Store `material` under its name. An existing material with the same
    /// name is replaced.
    pub fn add_pbr_material(&mut self, material: PbrMaterial) {
        if self.pbr_materials.contains_key(&material.name) {
            warn!(material = %material.name, "material already exists, overwriting");
        }
        self.pbr_materials.insert(material.name.clone(), material);
    }

    pub fn pbr_material(&self, name: &str) -> Option<&PbrMaterial> {
        self.pbr_materials.get(name)
    }

    /// Every material name, sorted.
    pub fn material_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.pbr_materials.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
