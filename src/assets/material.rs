use crate::config::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// What happens to an object or kart that touches a surface of this material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionReaction {
    #[default]
    Normal,
    /// Karts touching the surface are rescued
    Rescue,
    /// Karts are pushed back from the surface
    PushBack,
    /// Soccer balls are pushed away from the surface
    PushSoccer,
}

impl CollisionReaction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "" | "none" | "normal" => Some(Self::Normal),
            "reset" | "rescue" => Some(Self::Rescue),
            "push" => Some(Self::PushBack),
            "push-soccer" => Some(Self::PushSoccer),
            _ => None,
        }
    }
}

/// Surface material of collision geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub collision_reaction: CollisionReaction,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collision_reaction: CollisionReaction::Normal,
        }
    }

    pub fn with_collision_reaction(mut self, reaction: CollisionReaction) -> Self {
        self.collision_reaction = reaction;
        self
    }
}

/// Named set of shared materials
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: HashMap<String, Arc<Material>>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `<materials><material name=".." collision-reaction=".."/></materials>`
    pub fn from_xml(xml: &str) -> ConfigResult<Self> {
        let doc = roxmltree::Document::parse(xml)?;
        let mut library = Self::new();

        for node in doc
            .root_element()
            .children()
            .filter(|n| n.tag_name().name() == "material")
        {
            let name = node.attribute("name").ok_or_else(|| ConfigError::MissingAttribute {
                element: "material".to_string(),
                attribute: "name".to_string(),
            })?;
            let reaction_name = node.attribute("collision-reaction").unwrap_or("");
            let reaction = CollisionReaction::from_name(reaction_name).unwrap_or_else(|| {
                warn!("Material '{}': unknown collision reaction '{}'", name, reaction_name);
                CollisionReaction::Normal
            });
            library.insert(Material::new(name).with_collision_reaction(reaction));
        }

        debug!("Loaded {} materials", library.len());
        Ok(library)
    }

    pub fn insert(&mut self, material: Material) -> Arc<Material> {
        let material = Arc::new(material);
        self.materials.insert(material.name.clone(), Arc::clone(&material));
        material
    }

    pub fn get(&self, name: &str) -> Option<Arc<Material>> {
        self.materials.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
