//! Scene geometry loading from GLB/glTF files.
//!
//! The walkthrough loads a single static model. Every mesh primitive in the
//! file becomes one [`SceneMesh`] whose vertices are already in world space,
//! so collision queries and rendering never have to walk the node hierarchy
//! again.
//!
//! ```no_run
//! use batikwalk::LoadedScene;
//!
//! let scene = LoadedScene::from_file("assets/rumah_batik.glb").unwrap();
//! let (min, max) = scene.bounds();
//! println!("{} meshes, size {:?}", scene.meshes.len(), max - min);
//! ```
//!
//! Naming follows the usual glTF importer convention: a mesh takes its node's
//! name, and a node with several primitives yields one mesh per primitive
//! named `<node>_<index>`, parented under the node.

use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex3d};
use glam::{Mat4, Vec3};
use std::path::Path;

/// Errors that can occur when loading scene geometry.
#[derive(Debug, thiserror::Error)]
pub enum SceneLoadError {
    /// File could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The glTF data was invalid or corrupt.
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),
    /// A primitive had no position attribute.
    #[error("missing position data for mesh '{0}'")]
    MissingPositions(String),
    /// The model contains no geometry, or all of it collapses to a point.
    #[error("model is empty (no triangles or zero-size bounds)")]
    EmptyModel,
    /// The loader thread could not be started.
    #[error("could not start loader thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// The loader thread ended without a result.
    #[error("loader thread exited without a result")]
    LoaderExited,
}

/// Raw geometry data before GPU upload.
#[derive(Clone, Debug, Default)]
pub struct RawGeometry {
    /// Vertex positions, normals, and UVs.
    pub vertices: Vec<Vertex3d>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

impl RawGeometry {
    /// Creates raw geometry from vertices and indices.
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Computes the axis-aligned bounding box.
    ///
    /// Returns `(min, max)` corners of the bounding box.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    /// Returns the center point of the geometry.
    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    /// Returns the size of the bounding box.
    pub fn size(&self) -> Vec3 {
        let (min, max) = self.bounds();
        max - min
    }

    /// Vertex positions as vectors.
    pub fn positions(&self) -> Vec<Vec3> {
        self.vertices.iter().map(|v| Vec3::from(v.position)).collect()
    }

    /// Recalculates vertex normals from face geometry.
    ///
    /// Used for primitives exported without normals. Face normals are
    /// accumulated unnormalized, so larger faces weigh more.
    pub fn recalculate_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = [0.0, 0.0, 0.0];
        }

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if i0 >= self.vertices.len() || i1 >= self.vertices.len() || i2 >= self.vertices.len() {
                continue;
            }

            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);
            let face_normal = (p1 - p0).cross(p2 - p0);

            for i in [i0, i1, i2] {
                let n = Vec3::from(self.vertices[i].normal) + face_normal;
                self.vertices[i].normal = n.into();
            }
        }

        for v in &mut self.vertices {
            v.normal = Vec3::from(v.normal).normalize_or_zero().into();
        }
    }

    /// Uploads this geometry to the GPU as a [`Mesh`].
    pub fn upload(&self, gpu: &GpuContext) -> Mesh {
        Mesh::new(gpu, &self.vertices, &self.indices)
    }
}

/// One drawable, collidable piece of the loaded model.
#[derive(Clone, Debug)]
pub struct SceneMesh {
    /// Node name (or `<node>_<index>` for multi-primitive meshes).
    pub name: String,
    /// Name of the parent node, empty at the root.
    pub parent_name: String,
    /// Material name, if the exporter kept one.
    pub material_name: Option<String>,
    /// Linear RGBA base colour factor of the material.
    pub base_color: [f32; 4],
    /// Primitive topology as reported to the info panel.
    pub geometry_kind: String,
    /// World-space geometry.
    pub geometry: RawGeometry,
}

impl SceneMesh {
    /// Build a mesh from world-space geometry with a neutral material.
    pub fn new(name: impl Into<String>, parent_name: impl Into<String>, geometry: RawGeometry) -> Self {
        Self {
            name: name.into(),
            parent_name: parent_name.into(),
            material_name: None,
            base_color: [1.0, 1.0, 1.0, 1.0],
            geometry_kind: "Triangles".to_string(),
            geometry,
        }
    }

    /// Sets the material name and base colour.
    pub fn material(mut self, name: impl Into<String>, base_color: [f32; 4]) -> Self {
        self.material_name = Some(name.into());
        self.base_color = base_color;
        self
    }

    /// Number of vertices in this mesh.
    pub fn vertex_count(&self) -> usize {
        self.geometry.vertices.len()
    }
}

/// The whole model, flattened into world-space meshes.
#[derive(Clone, Debug, Default)]
pub struct LoadedScene {
    /// All triangle meshes in file order.
    pub meshes: Vec<SceneMesh>,
}

impl LoadedScene {
    /// Wraps already built meshes.
    pub fn from_meshes(meshes: Vec<SceneMesh>) -> Self {
        Self { meshes }
    }

    /// Loads a `.glb` or `.gltf` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SceneLoadError> {
        let (document, buffers, _images) = gltf::import(path.as_ref())?;
        Self::from_document(&document, &buffers)
    }

    /// Loads a GLB from memory.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SceneLoadError> {
        let (document, buffers, _images) = gltf::import_slice(bytes)?;
        Self::from_document(&document, &buffers)
    }

    fn from_document(
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
    ) -> Result<Self, SceneLoadError> {
        let mut meshes = Vec::new();

        let scene = document.default_scene().or_else(|| document.scenes().next());
        if let Some(scene) = scene {
            for node in scene.nodes() {
                process_node(&node, "", Mat4::IDENTITY, buffers, &mut meshes)?;
            }
        }

        let scene = Self { meshes };
        if scene.is_empty() {
            return Err(SceneLoadError::EmptyModel);
        }

        Ok(scene)
    }

    /// Axis-aligned bounds of all meshes as `(min, max)`.
    ///
    /// Returns zero bounds when there are no vertices.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for mesh in &self.meshes {
            if mesh.geometry.vertices.is_empty() {
                continue;
            }
            let (lo, hi) = mesh.geometry.bounds();
            min = min.min(lo);
            max = max.max(hi);
        }

        if min.x > max.x {
            (Vec3::ZERO, Vec3::ZERO)
        } else {
            (min, max)
        }
    }

    /// Returns the size of the overall bounding box.
    pub fn size(&self) -> Vec3 {
        let (min, max) = self.bounds();
        max - min
    }

    /// Returns the center of the overall bounding box.
    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    /// True when there is nothing to walk on or look at.
    pub fn is_empty(&self) -> bool {
        self.meshes.iter().all(|m| m.geometry.indices.len() < 3) || self.size() == Vec3::ZERO
    }

    /// Total number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(SceneMesh::vertex_count).sum()
    }
}

/// Walk a node and its children, baking transforms into vertices.
fn process_node(
    node: &gltf::Node,
    parent_name: &str,
    parent_transform: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<SceneMesh>,
) -> Result<(), SceneLoadError> {
    let local = Mat4::from_cols_array_2d(&node.transform().matrix());
    let world = parent_transform * local;

    let node_name = node
        .name()
        .or_else(|| node.mesh().and_then(|m| m.name()))
        .unwrap_or("")
        .to_string();

    if let Some(mesh) = node.mesh() {
        let primitives: Vec<_> = mesh
            .primitives()
            .filter(|p| {
                let surface = triangle_list(p.mode(), &[]).is_some();
                if !surface {
                    log::warn!("Skipping {:?} primitive in '{}'", p.mode(), node_name);
                }
                surface
            })
            .collect();
        let multi = primitives.len() > 1;

        for (index, primitive) in primitives.iter().enumerate() {
            let geometry = read_primitive(primitive, buffers, world, &node_name)?;

            let material = primitive.material();
            let (name, parent) = if multi {
                (format!("{}_{}", node_name, index), node_name.clone())
            } else {
                (node_name.clone(), parent_name.to_string())
            };

            out.push(SceneMesh {
                name,
                parent_name: parent,
                material_name: material.name().map(str::to_string),
                base_color: material.pbr_metallic_roughness().base_color_factor(),
                geometry_kind: format!("{:?}", primitive.mode()),
                geometry,
            });
        }
    }

    for child in node.children() {
        process_node(&child, &node_name, world, buffers, out)?;
    }

    Ok(())
}

/// Extract one primitive's vertices in world space.
fn read_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    world: Mat4,
    name: &str,
) -> Result<RawGeometry, SceneLoadError> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data[..]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| SceneLoadError::MissingPositions(name.to_string()))?
        .collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| iter.collect());
    let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|tc| tc.into_f32().collect());

    let indices: Vec<u32> = reader
        .read_indices()
        .map(|iter| iter.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());
    let indices = triangle_list(primitive.mode(), &indices).unwrap_or_default();

    let normal_matrix = world.inverse().transpose();

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let position = world.transform_point3(Vec3::from(*p));
            let normal = normals
                .as_ref()
                .and_then(|n| n.get(i))
                .map(|n| normal_matrix.transform_vector3(Vec3::from(*n)).normalize_or_zero())
                .unwrap_or(Vec3::ZERO);
            let uv = uvs.as_ref().and_then(|uv| uv.get(i)).copied().unwrap_or([0.0, 0.0]);
            Vertex3d::new(position.into(), normal.into(), uv)
        })
        .collect();

    let mut geometry = RawGeometry::new(vertices, indices);
    if normals.is_none() {
        geometry.recalculate_normals();
    }

    Ok(geometry)
}

/// Rewrite strip and fan indices as a plain triangle list, keeping the
/// winding of every triangle. `None` for points and lines.
fn triangle_list(mode: gltf::mesh::Mode, indices: &[u32]) -> Option<Vec<u32>> {
    use gltf::mesh::Mode;

    match mode {
        Mode::Triangles => Some(indices.to_vec()),
        Mode::TriangleStrip => Some(
            indices
                .windows(3)
                .enumerate()
                .flat_map(|(i, w)| if i % 2 == 0 { [w[0], w[1], w[2]] } else { [w[2], w[1], w[0]] })
                .collect(),
        ),
        Mode::TriangleFan => Some(match indices.split_first() {
            Some((&hub, rest)) => rest.windows(2).flat_map(|w| [hub, w[0], w[1]]).collect(),
            None => Vec::new(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(offset: Vec3) -> RawGeometry {
        let p = |x: f32, y: f32, z: f32| (Vec3::new(x, y, z) + offset).into();
        RawGeometry::new(
            vec![
                Vertex3d::new(p(0.0, 0.0, 0.0), [0.0, 1.0, 0.0], [0.0, 0.0]),
                Vertex3d::new(p(1.0, 0.0, 0.0), [0.0, 1.0, 0.0], [1.0, 0.0]),
                Vertex3d::new(p(0.0, 0.0, 1.0), [0.0, 1.0, 0.0], [0.0, 1.0]),
            ],
            vec![0, 2, 1],
        )
    }

    #[test]
    fn strips_and_fans_become_triangle_lists() {
        use gltf::mesh::Mode;

        assert_eq!(
            triangle_list(Mode::TriangleStrip, &[0, 1, 2, 3, 4]),
            Some(vec![0, 1, 2, 3, 2, 1, 2, 3, 4])
        );
        assert_eq!(
            triangle_list(Mode::TriangleFan, &[0, 1, 2, 3, 4]),
            Some(vec![0, 1, 2, 0, 2, 3, 0, 3, 4])
        );
        assert_eq!(triangle_list(Mode::Triangles, &[2, 1, 0]), Some(vec![2, 1, 0]));
        assert_eq!(triangle_list(Mode::TriangleStrip, &[0, 1]), Some(vec![]));
        assert_eq!(triangle_list(Mode::Lines, &[0, 1]), None);
    }

    #[test]
    fn raw_geometry_bounds() {
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([-1.0, -1.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        let geom = RawGeometry::new(vertices, vec![0, 1, 2]);

        let (min, max) = geom.bounds();
        assert_eq!(min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn recalculated_normals_face_up_for_ccw_floor() {
        let mut geom = triangle(Vec3::ZERO);
        geom.recalculate_normals();

        for v in &geom.vertices {
            assert!((Vec3::from(v.normal) - Vec3::Y).length() < 1e-5);
        }
    }

    #[test]
    fn scene_bounds_cover_all_meshes() {
        let scene = LoadedScene::from_meshes(vec![
            SceneMesh::new("a", "", triangle(Vec3::ZERO)),
            SceneMesh::new("b", "", triangle(Vec3::new(4.0, 2.0, -3.0))),
        ]);

        let (min, max) = scene.bounds();
        assert_eq!(min, Vec3::new(0.0, 0.0, -3.0));
        assert_eq!(max, Vec3::new(5.0, 2.0, 1.0));
        assert_eq!(scene.center(), Vec3::new(2.5, 1.0, -1.0));
        assert_eq!(scene.vertex_count(), 6);
        assert!(!scene.is_empty());
    }

    #[test]
    fn empty_scene_is_detected() {
        assert!(LoadedScene::default().is_empty());
        assert_eq!(LoadedScene::default().bounds(), (Vec3::ZERO, Vec3::ZERO));

        let degenerate = RawGeometry::new(
            vec![Vertex3d::new([1.0, 1.0, 1.0], [0.0, 1.0, 0.0], [0.0, 0.0]); 3],
            vec![0, 1, 2],
        );
        let scene = LoadedScene::from_meshes(vec![SceneMesh::new("dot", "", degenerate)]);
        assert!(scene.is_empty());
    }

    #[test]
    fn invalid_bytes_are_a_gltf_error() {
        let result = LoadedScene::from_slice(b"definitely not a glb");
        assert!(matches!(result, Err(SceneLoadError::Gltf(_))));
    }
}
