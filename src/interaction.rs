//! Look-at targeting, interaction prompt and info panel state.
//!
//! Every frame the [`InteractionTargeter`] casts one ray from the camera
//! through the centre of the view. If the closest thing it hits is an
//! interactable exhibit within reach, that object becomes the current target:
//! the prompt appears and the info panel (if the player opened it) shows the
//! target's details. Anything else clears the target and force-closes the
//! panel.
//!
//! ```
//! use batikwalk::{InteractionTargeter, SceneWorld, LookControl};
//!
//! let mut targeter = InteractionTargeter::new(20.0);
//! let scene = SceneWorld::empty();
//! targeter.update(&scene, &LookControl::new().camera());
//!
//! assert!(targeter.target().is_none());
//! assert!(!targeter.visibility().prompt_visible);
//! ```

use glam::Vec3;
use hecs::Entity;
use serde::Deserialize;

use crate::camera::Camera;
use crate::classify::ObjectKind;
use crate::picking::Ray;
use crate::probe::SpatialProbe;
use crate::scene::SceneWorld;

/// Tuning for [`InteractionTargeter`].
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Max distance at which an exhibit can be interacted with.
    pub interaction_distance: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            interaction_distance: 20.0,
        }
    }
}

/// The object currently looked at and within reach.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractionTarget {
    pub entity: Entity,
    pub kind: ObjectKind,
    pub distance: f32,
    pub point: Vec3,
}

impl InteractionTarget {
    /// True if this is the object the canting minigame paints.
    pub fn is_special(&self) -> bool {
        self.kind.is_special()
    }
}

/// What the HUD should show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UiVisibility {
    pub prompt_visible: bool,
    pub info_panel_open: bool,
}

/// Which actions the prompt advertises.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prompt {
    /// Only the info panel.
    Info,
    /// The info panel and the canting minigame.
    InfoAndCanting,
}

impl Prompt {
    pub fn text(&self) -> &'static str {
        match self {
            Prompt::Info => "Press E to view info",
            Prompt::InfoAndCanting => "Press E to view info | Q to use Canting",
        }
    }
}

/// Details of the current target, shown in the info panel.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetInfo {
    pub name: String,
    pub object_type: &'static str,
    pub geometry_kind: String,
    pub distance: f32,
    pub material_name: String,
    pub color: [f32; 4],
    pub point: Vec3,
    pub vertex_count: usize,
}

impl TargetInfo {
    /// Collect the panel content for `target` from the scene.
    pub fn from_target(scene: &SceneWorld, target: &InteractionTarget) -> Option<Self> {
        let object = scene.object(target.entity)?;
        let color = scene
            .appearance(target.entity)
            .map_or(object.base_color, |a| a.color);

        Some(Self {
            name: if object.name.is_empty() {
                "Unnamed Object".to_string()
            } else {
                object.name
            },
            object_type: "Mesh",
            geometry_kind: object.geometry_kind,
            distance: target.distance,
            material_name: object
                .material_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            color,
            point: target.point,
            vertex_count: object.vertex_count,
        })
    }

    /// Material colour as `#RRGGBB`, in sRGB.
    pub fn color_hex(&self) -> String {
        let [r, g, b, _] = self.color;
        format!(
            "#{:02X}{:02X}{:02X}",
            srgb_byte(r),
            srgb_byte(g),
            srgb_byte(b)
        )
    }

    /// Labelled rows in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Object", self.name.clone()),
            ("Type", self.object_type.to_string()),
            ("Geometry", self.geometry_kind.clone()),
            ("Distance", format!("{:.2}m", self.distance)),
            ("Material", self.material_name.clone()),
            ("Color", self.color_hex()),
            (
                "Position",
                format!("X: {:.1}  Y: {:.1}  Z: {:.1}", self.point.x, self.point.y, self.point.z),
            ),
            ("Vertices", group_thousands(self.vertex_count)),
        ]
    }
}

/// Linear channel to an 8-bit sRGB value.
fn srgb_byte(linear: f32) -> u8 {
    let c = linear.clamp(0.0, 1.0);
    let srgb = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (srgb * 255.0).round() as u8
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Tracks what the player is looking at.
#[derive(Clone, Debug)]
pub struct InteractionTargeter {
    interaction_distance: f32,
    target: Option<InteractionTarget>,
    info: Option<TargetInfo>,
    info_panel_open: bool,
}

impl InteractionTargeter {
    pub fn new(interaction_distance: f32) -> Self {
        Self {
            interaction_distance,
            target: None,
            info: None,
            info_panel_open: false,
        }
    }

    pub fn from_config(config: &InteractionConfig) -> Self {
        Self::new(config.interaction_distance)
    }

    /// Recompute the target from the centre-of-view ray.
    ///
    /// Returns true if the targeted entity changed.
    pub fn update(&mut self, scene: &SceneWorld, camera: &Camera) -> bool {
        let previous = self.target.map(|t| t.entity);

        let ray = Ray::from_camera(camera);
        let next = scene
            .raycast(&ray, f32::INFINITY)
            .and_then(|hit| {
                let kind = scene.kind(hit.entity)?;
                Some(InteractionTarget {
                    entity: hit.entity,
                    kind,
                    distance: hit.distance,
                    point: hit.point,
                })
            })
            .filter(|t| t.kind.is_interactable() && t.distance <= self.interaction_distance);

        match next {
            Some(target) => {
                self.info = TargetInfo::from_target(scene, &target);
                self.target = Some(target);
            }
            None => self.clear(),
        }

        let current = self.target.map(|t| t.entity);
        if current != previous {
            match &self.info {
                Some(info) => log::debug!("Targeting '{}' at {:.2}m", info.name, info.distance),
                None => log::trace!("Target cleared"),
            }
        }
        current != previous
    }

    /// Drop the target and close the panel.
    pub fn clear(&mut self) {
        self.target = None;
        self.info = None;
        self.info_panel_open = false;
    }

    /// Flip the info panel. Only works with a target and look-lock active.
    ///
    /// Returns true if the panel changed.
    pub fn toggle_info(&mut self, locked: bool) -> bool {
        if self.target.is_none() || !locked {
            return false;
        }
        self.info_panel_open = !self.info_panel_open;
        true
    }

    /// True if the secondary (canting) action is offered.
    pub fn looking_at_special(&self) -> bool {
        self.target.is_some_and(|t| t.is_special())
    }

    pub fn target(&self) -> Option<&InteractionTarget> {
        self.target.as_ref()
    }

    pub fn info(&self) -> Option<&TargetInfo> {
        self.info.as_ref()
    }

    pub fn prompt(&self) -> Option<Prompt> {
        self.target.map(|t| {
            if t.is_special() {
                Prompt::InfoAndCanting
            } else {
                Prompt::Info
            }
        })
    }

    pub fn visibility(&self) -> UiVisibility {
        UiVisibility {
            prompt_visible: self.target.is_some(),
            info_panel_open: self.info_panel_open && self.target.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SceneMesh;
    use crate::look_control::LookControl;
    use crate::scene::tests::{cuboid, world_of};

    /// A 2x2x2 box whose near face is `distance` in front of a camera at the
    /// origin looking down -Z.
    fn box_ahead(name: &str, parent: &str, distance: f32) -> SceneMesh {
        SceneMesh::new(
            name,
            parent,
            cuboid(
                Vec3::new(-1.0, -1.0, -distance - 2.0),
                Vec3::new(1.0, 1.0, -distance),
            ),
        )
        .material("Kain", [0.5, 0.0, 0.0, 1.0])
    }

    fn camera() -> Camera {
        LookControl::new().camera()
    }

    #[test]
    fn special_object_in_range_offers_canting() {
        let scene = world_of(vec![box_ahead("Object_3_4", "", 15.0)]);
        let mut targeter = InteractionTargeter::new(20.0);

        assert!(targeter.update(&scene, &camera()));

        let target = targeter.target().unwrap();
        assert!((target.distance - 15.0).abs() < 1e-4);
        assert!(targeter.looking_at_special());
        assert_eq!(targeter.prompt(), Some(Prompt::InfoAndCanting));
        assert!(targeter.visibility().prompt_visible);
    }

    #[test]
    fn special_object_out_of_range_hides_prompt() {
        let scene = world_of(vec![box_ahead("Object_3_4", "", 25.0)]);
        let mut targeter = InteractionTargeter::new(20.0);

        targeter.update(&scene, &camera());

        assert!(targeter.target().is_none());
        assert!(!targeter.looking_at_special());
        assert_eq!(targeter.visibility(), UiVisibility::default());
    }

    #[test]
    fn closer_plain_object_hides_exhibit_behind_it() {
        let scene = world_of(vec![
            box_ahead("Batik_Parang", "", 10.0),
            box_ahead("Tiang", "", 3.0),
        ]);
        let mut targeter = InteractionTargeter::new(20.0);

        targeter.update(&scene, &camera());
        assert!(targeter.target().is_none());
    }

    #[test]
    fn info_panel_toggles_only_with_target_and_lock() {
        let scene = world_of(vec![box_ahead("kain", "Koleksi_Batik", 5.0)]);
        let mut targeter = InteractionTargeter::new(20.0);

        assert!(!targeter.toggle_info(true));

        targeter.update(&scene, &camera());
        assert_eq!(targeter.prompt(), Some(Prompt::Info));
        assert!(!targeter.toggle_info(false));
        assert!(!targeter.visibility().info_panel_open);

        assert!(targeter.toggle_info(true));
        assert!(targeter.visibility().info_panel_open);

        // Stays open while the target is kept
        targeter.update(&scene, &camera());
        assert!(targeter.visibility().info_panel_open);

        // Force-closed when the view leaves the exhibit
        let away = LookControl::new().yaw(std::f32::consts::PI).camera();
        targeter.update(&scene, &away);
        assert_eq!(targeter.visibility(), UiVisibility::default());

        targeter.update(&scene, &camera());
        assert!(!targeter.visibility().info_panel_open);
    }

    #[test]
    fn info_rows_are_formatted() {
        let scene = world_of(vec![box_ahead("Batik_Kawung", "", 4.0)]);
        let mut targeter = InteractionTargeter::new(20.0);
        targeter.update(&scene, &camera());

        let info = targeter.info().unwrap();
        assert_eq!(info.name, "Batik_Kawung");
        assert_eq!(info.material_name, "Kain");
        assert_eq!(info.color_hex(), "#BC0000");

        let rows = info.rows();
        assert_eq!(rows[3], ("Distance", "4.00m".to_string()));
        assert_eq!(rows[6].1, "X: 0.0  Y: 0.0  Z: -4.0");
        assert_eq!(rows[7], ("Vertices", "8".to_string()));
    }

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn empty_scene_clears_everything() {
        let mut targeter = InteractionTargeter::new(20.0);
        targeter.update(&SceneWorld::empty(), &camera());

        assert!(targeter.target().is_none());
        assert!(targeter.info().is_none());
        assert!(targeter.prompt().is_none());
    }
}
