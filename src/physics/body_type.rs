use crate::config::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Primitive axis of cones and cylinders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// The supported collision shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyType {
    #[default]
    None,
    Cone(Axis),
    Cylinder(Axis),
    Box,
    Sphere,
    /// Triangle mesh built from the render geometry
    Exact,
}

impl BodyType {
    pub fn name(self) -> &'static str {
        match self {
            BodyType::None => "none",
            BodyType::Cone(Axis::X) => "cone_x",
            BodyType::Cone(Axis::Y) => "cone_y",
            BodyType::Cone(Axis::Z) => "cone_z",
            BodyType::Cylinder(Axis::X) => "cylinder_x",
            BodyType::Cylinder(Axis::Y) => "cylinder_y",
            BodyType::Cylinder(Axis::Z) => "cylinder_z",
            BodyType::Box => "box",
            BodyType::Sphere => "sphere",
            BodyType::Exact => "exact",
        }
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BodyType {
    type Err = ConfigError;

    /// Accepts the snake_case names as well as the older camelCase ones
    /// ("cone", "coneX", "cylinderZ", ...)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body_type = match s.trim() {
            "none" => BodyType::None,
            "cone" | "cone_y" | "coneY" => BodyType::Cone(Axis::Y),
            "cone_x" | "coneX" => BodyType::Cone(Axis::X),
            "cone_z" | "coneZ" => BodyType::Cone(Axis::Z),
            "cylinder" | "cylinder_y" | "cylinderY" => BodyType::Cylinder(Axis::Y),
            "cylinder_x" | "cylinderX" => BodyType::Cylinder(Axis::X),
            "cylinder_z" | "cylinderZ" => BodyType::Cylinder(Axis::Z),
            "box" => BodyType::Box,
            "sphere" => BodyType::Sphere,
            "exact" => BodyType::Exact,
            other => {
                return Err(ConfigError::UnknownShape {
                    value: other.to_string(),
                })
            }
        };
        Ok(body_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("cone_x".parse::<BodyType>().unwrap(), BodyType::Cone(Axis::X));
        assert_eq!("cone".parse::<BodyType>().unwrap(), BodyType::Cone(Axis::Y));
        assert_eq!("cylinderZ".parse::<BodyType>().unwrap(), BodyType::Cylinder(Axis::Z));
        assert_eq!("exact".parse::<BodyType>().unwrap(), BodyType::Exact);
        assert_eq!("none".parse::<BodyType>().unwrap(), BodyType::None);
    }

    #[test]
    fn test_names_parse_back() {
        for body_type in [
            BodyType::None,
            BodyType::Cone(Axis::X),
            BodyType::Cylinder(Axis::Z),
            BodyType::Box,
            BodyType::Sphere,
            BodyType::Exact,
        ] {
            assert_eq!(body_type.name().parse::<BodyType>().unwrap(), body_type);
        }
    }

    #[test]
    fn test_unknown_shape() {
        let err = "pyramid".parse::<BodyType>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownShape { value } if value == "pyramid"));
    }
}
