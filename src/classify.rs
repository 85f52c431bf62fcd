//! Name-based classification of scene objects.
//!
//! The scene is authored without any metadata besides node names, so every
//! mesh is tagged once, right after loading, by matching its own name and its
//! parent's name against a few keywords:
//!
//! - [`SurfaceCategory`] decides whether the player may stand on a mesh.
//! - [`ObjectKind`] decides whether looking at a mesh offers an interaction.
//!
//! Matching is case-insensitive substring matching, except for the special
//! object, which must match its name exactly.
//!
//! # Example
//!
//! ```
//! use batikwalk::{ClassificationRules, ObjectKind, SurfaceCategory};
//!
//! let rules = ClassificationRules::default();
//!
//! assert_eq!(rules.surface_category("Mesh_12", "Lantai_Utama"), SurfaceCategory::Ground);
//! assert_eq!(rules.object_kind("Kain_BATIK_03", ""), ObjectKind::Batik);
//! assert_eq!(rules.object_kind("Object_3_4", ""), ObjectKind::Canting);
//! ```

use serde::Deserialize;

/// Whether a collidable surface can be stood on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceCategory {
    /// Walkable floor geometry (paving, floors, ramps).
    Ground,
    /// Walls, furniture, props: blocks movement but cannot be stood on.
    Generic,
}

/// What looking at an object offers the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Nothing to interact with.
    Plain,
    /// A batik exhibit: the info panel can be opened.
    Batik,
    /// The special object: info panel plus the canting minigame.
    Canting,
}

impl ObjectKind {
    /// Returns true if targeting this object shows an interaction prompt.
    pub fn is_interactable(self) -> bool {
        !matches!(self, ObjectKind::Plain)
    }

    /// Returns true if this is the object the canting minigame paints.
    pub fn is_special(self) -> bool {
        matches!(self, ObjectKind::Canting)
    }
}

/// Keyword rules used to classify meshes by name.
///
/// Keywords are stored lowercased; names are lowercased before matching.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClassificationRules {
    /// Substrings marking walkable ground.
    pub ground_keywords: Vec<String>,
    /// Substring marking an interactable exhibit.
    pub interactable_keyword: String,
    /// Exact node name of the special (canting) object.
    pub special_object_name: String,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            ground_keywords: vec!["paving".into(), "lantai".into(), "ramp".into()],
            interactable_keyword: "batik".into(),
            special_object_name: "Object_3_4".into(),
        }
    }
}

impl ClassificationRules {
    /// Lowercase all keywords so matching only has to lowercase the names.
    ///
    /// Call after deserializing user-provided rules.
    pub fn normalized(mut self) -> Self {
        for keyword in &mut self.ground_keywords {
            *keyword = keyword.to_lowercase();
        }
        self.ground_keywords.retain(|k| !k.is_empty());
        self.interactable_keyword = self.interactable_keyword.to_lowercase();
        self
    }

    /// Classify a mesh as ground or generic from its name and its parent's name.
    ///
    /// Floors are often grouped under a named parent, so either name matching
    /// any ground keyword is enough.
    pub fn surface_category(&self, name: &str, parent_name: &str) -> SurfaceCategory {
        let name = name.to_lowercase();
        let parent = parent_name.to_lowercase();

        let is_ground = self
            .ground_keywords
            .iter()
            .any(|k| name.contains(k.as_str()) || parent.contains(k.as_str()));

        if is_ground {
            SurfaceCategory::Ground
        } else {
            SurfaceCategory::Generic
        }
    }

    /// Returns true if the name or parent name marks an interactable exhibit.
    ///
    /// Pure and case-insensitive. Two empty names never match.
    pub fn is_interactable(&self, name: &str, parent_name: &str) -> bool {
        if name.is_empty() && parent_name.is_empty() {
            return false;
        }
        if self.interactable_keyword.is_empty() {
            return false;
        }

        let keyword = self.interactable_keyword.as_str();
        name.to_lowercase().contains(keyword) || parent_name.to_lowercase().contains(keyword)
    }

    /// Returns true if `name` is exactly the special object's name.
    pub fn is_special(&self, name: &str) -> bool {
        !self.special_object_name.is_empty() && name == self.special_object_name
    }

    /// Classify what looking at an object offers.
    ///
    /// The special object wins over the keyword match.
    pub fn object_kind(&self, name: &str, parent_name: &str) -> ObjectKind {
        if self.is_special(name) {
            ObjectKind::Canting
        } else if self.is_interactable(name, parent_name) {
            ObjectKind::Batik
        } else {
            ObjectKind::Plain
        }
    }
}
