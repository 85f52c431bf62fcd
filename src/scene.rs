//! The loaded scene as ECS entities.
//!
//! Each mesh of the model is spawned into a [`hecs::World`] with:
//!
//! - [`SceneObject`]: names, material and classification, cached at load time
//! - [`Collider`]: world-space triangles plus the surface category
//! - [`Appearance`]: what the renderer should draw it with
//! - [`MeshIndex`]: position of the mesh in the source [`LoadedScene`]
//!
//! A [`SceneWorld`] is immutable for the session apart from [`Appearance`],
//! which the canting minigame changes when it paints the special object.

use crate::classify::{ClassificationRules, ObjectKind, SurfaceCategory};
use crate::geometry::LoadedScene;
use crate::picking::TriangleMesh;
use crate::texture::TextureId;
use glam::Vec3;
use hecs::{Entity, World};

/// Descriptive data for one scene mesh.
#[derive(Clone, Debug)]
pub struct SceneObject {
    /// Mesh name.
    pub name: String,
    /// Parent node name, empty at the root.
    pub parent_name: String,
    /// Cached interaction classification.
    pub kind: ObjectKind,
    /// Material name, if any.
    pub material_name: Option<String>,
    /// Linear RGBA base colour of the material.
    pub base_color: [f32; 4],
    /// Primitive topology.
    pub geometry_kind: String,
    /// Number of vertices.
    pub vertex_count: usize,
}

/// Collision geometry and its cached surface category.
#[derive(Clone, Debug)]
pub struct Collider {
    /// World-space triangles.
    pub mesh: TriangleMesh,
    /// Whether the surface can be stood on.
    pub category: SurfaceCategory,
}

/// How the renderer draws an object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Appearance {
    /// Linear RGBA tint.
    pub color: [f32; 4],
    /// Texture replacing the material colour.
    pub texture: Option<TextureId>,
    /// Draw back faces too.
    pub double_sided: bool,
}

/// Index of the object's mesh in the [`LoadedScene`] it was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshIndex(pub usize);

/// Counts logged after classification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassificationSummary {
    /// Surfaces the player can stand on.
    pub ground: usize,
    /// Everything else.
    pub generic: usize,
    /// Objects offering an interaction.
    pub interactable: usize,
}

impl ClassificationSummary {
    /// Total number of surfaces.
    pub fn total(&self) -> usize {
        self.ground + self.generic
    }
}

/// Classified, queryable scene.
pub struct SceneWorld {
    world: World,
    special: Option<Entity>,
    bounds: (Vec3, Vec3),
    summary: ClassificationSummary,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self::empty()
    }
}

impl SceneWorld {
    /// A scene with no surfaces, used until loading completes.
    pub fn empty() -> Self {
        Self {
            world: World::new(),
            special: None,
            bounds: (Vec3::ZERO, Vec3::ZERO),
            summary: ClassificationSummary::default(),
        }
    }

    /// Classify every mesh of `scene` and spawn it as an entity.
    ///
    /// The special object is shown plain white and double-sided until
    /// something is painted onto it.
    pub fn build(scene: &LoadedScene, rules: &ClassificationRules) -> Self {
        let mut world = World::new();
        let mut special = None;
        let mut summary = ClassificationSummary::default();

        for (index, mesh) in scene.meshes.iter().enumerate() {
            let category = rules.surface_category(&mesh.name, &mesh.parent_name);
            let kind = rules.object_kind(&mesh.name, &mesh.parent_name);

            match category {
                SurfaceCategory::Ground => summary.ground += 1,
                SurfaceCategory::Generic => summary.generic += 1,
            }
            if kind.is_interactable() {
                summary.interactable += 1;
            }

            let collider = Collider {
                mesh: TriangleMesh::from_indexed(&mesh.geometry.positions(), &mesh.geometry.indices),
                category,
            };

            let appearance = if kind.is_special() {
                Appearance {
                    color: [1.0, 1.0, 1.0, 1.0],
                    texture: None,
                    double_sided: true,
                }
            } else {
                Appearance {
                    color: mesh.base_color,
                    texture: None,
                    double_sided: false,
                }
            };

            let object = SceneObject {
                name: mesh.name.clone(),
                parent_name: mesh.parent_name.clone(),
                kind,
                material_name: mesh.material_name.clone(),
                base_color: mesh.base_color,
                geometry_kind: mesh.geometry_kind.clone(),
                vertex_count: mesh.vertex_count(),
            };

            let entity = world.spawn((object, collider, appearance, MeshIndex(index)));

            if kind.is_special() {
                if special.is_some() {
                    log::warn!("Duplicate special object '{}', keeping the first", mesh.name);
                } else {
                    log::info!("Found special object '{}'", mesh.name);
                    special = Some(entity);
                }
            }
        }

        log::info!(
            "Classified {} surfaces: {} ground, {} walls, {} interactable",
            summary.total(),
            summary.ground,
            summary.generic,
            summary.interactable
        );
        if special.is_none() {
            log::warn!("Special object '{}' not found in scene", rules.special_object_name);
        }

        Self {
            world,
            special,
            bounds: scene.bounds(),
            summary,
        }
    }

    /// The underlying ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The special object, if the scene has one.
    pub fn special_object(&self) -> Option<Entity> {
        self.special
    }

    /// Model bounds as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.bounds
    }

    /// Classification counts.
    pub fn summary(&self) -> ClassificationSummary {
        self.summary
    }

    /// True when there is nothing to collide with.
    pub fn is_empty(&self) -> bool {
        self.summary.total() == 0
    }

    /// Descriptive data of an object.
    pub fn object(&self, entity: Entity) -> Option<SceneObject> {
        self.world.get::<&SceneObject>(entity).ok().map(|o| (*o).clone())
    }

    /// Cached interaction kind of an object.
    pub fn kind(&self, entity: Entity) -> Option<ObjectKind> {
        self.world.get::<&SceneObject>(entity).ok().map(|o| o.kind)
    }

    /// Current appearance of an object.
    pub fn appearance(&self, entity: Entity) -> Option<Appearance> {
        self.world.get::<&Appearance>(entity).ok().map(|a| *a)
    }

    /// Replace an object's material with a texture.
    ///
    /// Returns false if the entity is not part of this scene.
    pub fn apply_texture(&mut self, entity: Entity, texture: TextureId) -> bool {
        match self.world.get::<&mut Appearance>(entity) {
            Ok(mut appearance) => {
                appearance.texture = Some(texture);
                appearance.color = [1.0, 1.0, 1.0, 1.0];
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geometry::{RawGeometry, SceneMesh};
    use crate::mesh::Vertex3d;

    /// World-space geometry for an axis-aligned box.
    pub(crate) fn cuboid(min: Vec3, max: Vec3) -> RawGeometry {
        let corners: Vec<Vertex3d> = (0..8)
            .map(|i| {
                let p = Vec3::new(
                    if i & 1 == 0 { min.x } else { max.x },
                    if i & 2 == 0 { min.y } else { max.y },
                    if i & 4 == 0 { min.z } else { max.z },
                );
                Vertex3d::new(p.into(), [0.0, 1.0, 0.0], [0.0, 0.0])
            })
            .collect();

        #[rustfmt::skip]
        let indices = vec![
            0, 2, 6, 6, 4, 0, // -X
            1, 5, 7, 7, 3, 1, // +X
            0, 4, 5, 5, 1, 0, // -Y
            2, 3, 7, 7, 6, 2, // +Y
            0, 1, 3, 3, 2, 0, // -Z
            4, 6, 7, 7, 5, 4, // +Z
        ];

        RawGeometry::new(corners, indices)
    }

    /// A flat square of half-size `half` at height `y`.
    pub(crate) fn floor(half: f32, y: f32) -> RawGeometry {
        let p = |x: f32, z: f32| [x, y, z];
        RawGeometry::new(
            vec![
                Vertex3d::new(p(-half, -half), [0.0, 1.0, 0.0], [0.0, 0.0]),
                Vertex3d::new(p(half, -half), [0.0, 1.0, 0.0], [1.0, 0.0]),
                Vertex3d::new(p(half, half), [0.0, 1.0, 0.0], [1.0, 1.0]),
                Vertex3d::new(p(-half, half), [0.0, 1.0, 0.0], [0.0, 1.0]),
            ],
            vec![0, 3, 2, 2, 1, 0],
        )
    }

    pub(crate) fn world_of(meshes: Vec<SceneMesh>) -> SceneWorld {
        SceneWorld::build(&LoadedScene::from_meshes(meshes), &ClassificationRules::default())
    }

    #[test]
    fn build_caches_classification() {
        let scene = world_of(vec![
            SceneMesh::new("Lantai_01", "", floor(10.0, 0.0)),
            SceneMesh::new("Dinding", "Rumah", cuboid(Vec3::new(5.0, 0.0, -5.0), Vec3::new(6.0, 3.0, 5.0))),
            SceneMesh::new("Kain", "Batik_Koleksi", cuboid(Vec3::splat(1.0), Vec3::splat(2.0))),
            SceneMesh::new("Object_3_4", "Meja", cuboid(Vec3::splat(-2.0), Vec3::splat(-1.0))),
        ]);

        let summary = scene.summary();
        assert_eq!(summary.ground, 1);
        assert_eq!(summary.generic, 3);
        assert_eq!(summary.interactable, 2);
        assert!(!scene.is_empty());

        let special = scene.special_object().unwrap();
        assert_eq!(scene.kind(special), Some(ObjectKind::Canting));
        assert_eq!(scene.object(special).unwrap().vertex_count, 8);
    }

    #[test]
    fn special_object_starts_white_and_double_sided() {
        let mut scene = world_of(vec![
            SceneMesh::new("Object_3_4", "", cuboid(Vec3::ZERO, Vec3::ONE))
                .material("Kayu", [0.4, 0.2, 0.1, 1.0]),
        ]);

        let special = scene.special_object().unwrap();
        let appearance = scene.appearance(special).unwrap();
        assert_eq!(appearance.color, [1.0, 1.0, 1.0, 1.0]);
        assert!(appearance.double_sided);
        assert_eq!(scene.object(special).unwrap().base_color, [0.4, 0.2, 0.1, 1.0]);

        assert!(scene.apply_texture(special, TextureId(3)));
        assert_eq!(scene.appearance(special).unwrap().texture, Some(TextureId(3)));
    }

    #[test]
    fn empty_world_has_no_special_object() {
        let scene = SceneWorld::empty();
        assert!(scene.is_empty());
        assert!(scene.special_object().is_none());
    }
}
