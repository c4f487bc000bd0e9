use crate::config::{ConfigError, ConfigResult};
use crate::physics::body_type::BodyType;
use crate::physics::reaction::ReactionKind;
use crate::utils::math::parsing;
use tracing::debug;

/// Reset height used when none is configured; no object is ever below it
pub const DEFAULT_RESET_HEIGHT: f32 = f32::NEG_INFINITY;

/// Designer-facing description of a physical object
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSettings {
    /// ID of the object, for lookup and debugging
    pub id: String,
    /// 0 means the object is not moved by the simulation
    pub mass: f32,
    /// Radius for cones, cylinders and spheres; <= 0 derives it from the mesh
    pub radius: f32,
    pub body_type: BodyType,
    /// Trigger a rescue in karts touching it
    pub crash_reset: bool,
    /// Knock (explode) karts touching it
    pub knock_kart: bool,
    /// Flatten karts touching it
    pub flatten_kart: bool,
    /// Put the object back to its start when it falls under the track
    /// (a boulder rolling down a hill, for instance)
    pub reset_when_too_low: bool,
    /// Height below which the object is reset, if `reset_when_too_low`
    pub reset_height: f32,
    /// How the object reacts to hits and explosions
    pub reaction: ReactionKind,
    /// Hit points of destructible objects; `None` uses the configured default
    pub hit_points: Option<u32>,
}

impl ObjectSettings {
    pub fn new(body_type: BodyType, radius: f32, mass: f32) -> Self {
        Self {
            id: String::new(),
            mass,
            radius,
            body_type,
            crash_reset: false,
            knock_kart: false,
            flatten_kart: false,
            reset_when_too_low: false,
            reset_height: DEFAULT_RESET_HEIGHT,
            reaction: ReactionKind::Scenery,
            hit_points: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Reads the settings from the attributes of a scene element.
    /// Every attribute except `shape` is optional.
    pub fn from_xml(node: roxmltree::Node<'_, '_>) -> ConfigResult<Self> {
        let element = node.tag_name().name().to_string();
        let shape = node.attribute("shape").ok_or_else(|| ConfigError::MissingAttribute {
            element,
            attribute: "shape".to_string(),
        })?;

        let mut settings = Self::new(shape.parse()?, 0.0, 0.0);

        if let Some(id) = node.attribute("id") {
            settings.id = id.to_string();
        }
        if let Some(mass) = float_attribute(node, "mass")? {
            if mass < 0.0 {
                return Err(ConfigError::InvalidAttribute {
                    attribute: "mass".to_string(),
                    reason: format!("mass must not be negative, got {}", mass),
                });
            }
            settings.mass = mass;
        }
        if let Some(radius) = float_attribute(node, "radius")? {
            settings.radius = radius;
        }

        settings.crash_reset = bool_attribute(node, &["crashReset", "reset"])?.unwrap_or(false);
        settings.knock_kart = bool_attribute(node, &["knockKart", "explode"])?.unwrap_or(false);
        settings.flatten_kart = bool_attribute(node, &["flattenKart", "flatten"])?.unwrap_or(false);

        settings.reset_when_too_low = bool_attribute(node, &["resetWhenTooLow"])?.unwrap_or(false);
        if let Some(height) = float_attribute(node, "resetHeight")? {
            settings.reset_height = height;
        }
        // Older records give only the height, which implies the flag
        if let Some(height) = float_attribute(node, "reset-when-below")? {
            settings.reset_when_too_low = true;
            settings.reset_height = height;
        }

        if let Some(reaction) = node.attribute("reaction") {
            settings.reaction = reaction.parse()?;
        }
        if let Some(value) = node.attribute("hitPoints") {
            let hit_points = value.trim().parse::<u32>().map_err(|e| ConfigError::InvalidAttribute {
                attribute: "hitPoints".to_string(),
                reason: e.to_string(),
            })?;
            settings.hit_points = Some(hit_points);
        }

        debug!(
            "Parsed physics settings for '{}': shape={} mass={} radius={}",
            settings.id, settings.body_type, settings.mass, settings.radius
        );
        Ok(settings)
    }

    /// Parses the root element of `xml`
    pub fn from_xml_str(xml: &str) -> ConfigResult<Self> {
        let doc = roxmltree::Document::parse(xml)?;
        Self::from_xml(doc.root_element())
    }
}

fn float_attribute(node: roxmltree::Node<'_, '_>, name: &str) -> ConfigResult<Option<f32>> {
    node.attribute(name)
        .map(|value| {
            parsing::parse_f32(value).map_err(|reason| ConfigError::InvalidAttribute {
                attribute: name.to_string(),
                reason,
            })
        })
        .transpose()
}

/// First present attribute among `names` (preferred name first, then aliases)
fn bool_attribute(node: roxmltree::Node<'_, '_>, names: &[&str]) -> ConfigResult<Option<bool>> {
    for name in names {
        if let Some(value) = node.attribute(*name) {
            return parsing::parse_bool(value)
                .map(Some)
                .map_err(|reason| ConfigError::InvalidAttribute {
                    attribute: name.to_string(),
                    reason,
                });
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_type::Axis;

    #[test]
    fn test_direct_construction_defaults() {
        let settings = ObjectSettings::new(BodyType::Sphere, 0.5, 2.0);
        assert_eq!(settings.body_type, BodyType::Sphere);
        assert_eq!(settings.radius, 0.5);
        assert_eq!(settings.mass, 2.0);
        assert!(!settings.crash_reset);
        assert!(!settings.knock_kart);
        assert!(!settings.flatten_kart);
        assert!(!settings.reset_when_too_low);
        assert_eq!(settings.reset_height, DEFAULT_RESET_HEIGHT);
        assert_eq!(settings.reaction, ReactionKind::Scenery);
    }

    #[test]
    fn test_minimal_record() {
        let settings = ObjectSettings::from_xml_str(r#"<object shape="box"/>"#).unwrap();
        assert_eq!(settings.id, "");
        assert_eq!(settings.mass, 0.0);
        assert_eq!(settings.radius, 0.0);
        assert_eq!(settings.body_type, BodyType::Box);
        assert!(!settings.crash_reset);
        assert!(!settings.reset_when_too_low);
        assert!(settings.reset_height < -1.0e30);
    }

    #[test]
    fn test_full_record() {
        let xml = r#"<object id="boulder" mass="50" radius="1.5" shape="cylinder_x"
                        crashReset="true" knockKart="false" flattenKart="Y"
                        resetWhenTooLow="true" resetHeight="-12.5"
                        reaction="explosive"/>"#;
        let settings = ObjectSettings::from_xml_str(xml).unwrap();
        assert_eq!(settings.id, "boulder");
        assert_eq!(settings.mass, 50.0);
        assert_eq!(settings.radius, 1.5);
        assert_eq!(settings.body_type, BodyType::Cylinder(Axis::X));
        assert!(settings.crash_reset);
        assert!(!settings.knock_kart);
        assert!(settings.flatten_kart);
        assert!(settings.reset_when_too_low);
        assert_eq!(settings.reset_height, -12.5);
        assert_eq!(settings.reaction, ReactionKind::Explosive);
    }

    #[test]
    fn test_legacy_attribute_names() {
        let xml = r#"<object shape="coneZ" reset="y" explode="1" flatten="no" reset-when-below="-3"/>"#;
        let settings = ObjectSettings::from_xml_str(xml).unwrap();
        assert_eq!(settings.body_type, BodyType::Cone(Axis::Z));
        assert!(settings.crash_reset);
        assert!(settings.knock_kart);
        assert!(!settings.flatten_kart);
        assert!(settings.reset_when_too_low);
        assert_eq!(settings.reset_height, -3.0);
    }

    #[test]
    fn test_unknown_shape_fails() {
        let err = ObjectSettings::from_xml_str(r#"<object shape="teapot"/>"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownShape { .. }));
    }

    #[test]
    fn test_missing_shape_fails() {
        let err = ObjectSettings::from_xml_str(r#"<object id="a"/>"#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingAttribute { attribute, .. } if attribute == "shape"));
    }

    #[test]
    fn test_malformed_numbers_fail() {
        let err = ObjectSettings::from_xml_str(r#"<object shape="box" mass="heavy"/>"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAttribute { attribute, .. } if attribute == "mass"));

        let err = ObjectSettings::from_xml_str(r#"<object shape="box" mass="-1"/>"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAttribute { .. }));
    }

    #[test]
    fn test_destructible_hit_points() {
        let xml = r#"<object shape="box" reaction="destructible" hitPoints="5"/>"#;
        let settings = ObjectSettings::from_xml_str(xml).unwrap();
        assert_eq!(settings.reaction, ReactionKind::Destructible);
        assert_eq!(settings.hit_points, Some(5));
    }
}
