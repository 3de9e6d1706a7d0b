//! Solver hyperparameters.
//!
//! The pose network never interprets these values; it stores them, persists
//! them and hands them to the [`RbfEvaluator`](super::RbfEvaluator).
//!
//! Enum values are written to documents by symbolic name. When reading, both
//! the name and the legacy integer index are accepted, so documents survive
//! enum reordering between versions.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::{PoseWranglerError, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum NameOrIndex {
    Name(String),
    Index(u64),
}

macro_rules! symbolic_enum {
    (
        $(#[$meta:meta])*
        $name:ident, kind = $kind:literal, default = $default:ident,
        { $($(#[$vmeta:meta])* $variant:ident),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every value, in index order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }

            #[must_use]
            pub fn index(self) -> usize {
                self as usize
            }

            pub fn from_index(index: usize) -> Result<Self> {
                Self::ALL.get(index).copied().ok_or_else(|| PoseWranglerError::UnknownEnumValue {
                    kind: $kind,
                    value: index.to_string(),
                })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl FromStr for $name {
            type Err = PoseWranglerError;

            fn from_str(s: &str) -> Result<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name() == s)
                    .ok_or_else(|| PoseWranglerError::UnknownEnumValue {
                        kind: $kind,
                        value: s.to_owned(),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                match NameOrIndex::deserialize(deserializer)? {
                    NameOrIndex::Name(name) => name.parse().map_err(de::Error::custom),
                    NameOrIndex::Index(index) => usize::try_from(index)
                        .map_err(de::Error::custom)
                        .and_then(|i| Self::from_index(i).map_err(de::Error::custom)),
                }
            }
        }
    };
}

symbolic_enum! {
    /// How pose weights combine.
    SolverMode, kind = "mode", default = Interpolative,
    { Additive, Interpolative }
}

symbolic_enum! {
    /// Distance metric between the live input and a pose.
    ///
    /// `DefaultMethod` is only meaningful as a per-pose override: "use the solver's".
    DistanceMethod, kind = "distanceMethod", default = DefaultMethod,
    { Euclidean, Quaternion, SwingAngle, TwistAngle, DefaultMethod }
}

symbolic_enum! {
    NormalizeMethod, kind = "normalizeMethod", default = OnlyNormalizeAboveOne,
    { OnlyNormalizeAboveOne, AlwaysNormalize, NormalizeWithinMedian }
}

symbolic_enum! {
    /// Radial falloff kernel.
    ///
    /// `DefaultFunctionType` is only meaningful as a per-pose override.
    FunctionType, kind = "functionType", default = DefaultFunctionType,
    { Linear, Gaussian, Exponential, Cubic, Quintic, DefaultFunctionType }
}

symbolic_enum! {
    TwistAxis, kind = "twistAxis", default = X,
    { X, Y, Z }
}

symbolic_enum! {
    InputMode, kind = "inputMode", default = Automatic,
    { Automatic, Structural }
}

/// Solver-wide hyperparameters.
///
/// Field names serialize in camelCase (`automaticRadius`, `weightThreshold`, ...),
/// the layout used by solver documents. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverConfig {
    pub mode: SolverMode,
    pub radius: f64,
    /// Derive the radius from the enabled poses instead of `radius`.
    pub automatic_radius: bool,
    /// Weights below this are clamped to zero after evaluation.
    pub weight_threshold: f64,
    pub distance_method: DistanceMethod,
    pub normalize_method: NormalizeMethod,
    pub function_type: FunctionType,
    pub twist_axis: TwistAxis,
    pub input_mode: InputMode,
}

impl SolverConfig {
    pub const DEFAULT_RADIUS: f64 = 45.0;
    pub const DEFAULT_WEIGHT_THRESHOLD: f64 = 1e-3;
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mode: SolverMode::Interpolative,
            radius: Self::DEFAULT_RADIUS,
            automatic_radius: false,
            weight_threshold: Self::DEFAULT_WEIGHT_THRESHOLD,
            distance_method: DistanceMethod::Quaternion,
            normalize_method: NormalizeMethod::OnlyNormalizeAboveOne,
            function_type: FunctionType::Gaussian,
            twist_axis: TwistAxis::X,
            input_mode: InputMode::Automatic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_accept_name_or_index() {
        let by_name: DistanceMethod = serde_json::from_str("\"SwingAngle\"").unwrap();
        let by_index: DistanceMethod = serde_json::from_str("2").unwrap();
        assert_eq!(by_name, DistanceMethod::SwingAngle);
        assert_eq!(by_index, DistanceMethod::SwingAngle);
        assert_eq!(serde_json::to_string(&by_name).unwrap(), "\"SwingAngle\"");
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        assert!(serde_json::from_str::<FunctionType>("\"Spline\"").is_err());
        assert!(serde_json::from_str::<TwistAxis>("7").is_err());
        assert!(matches!(
            "W".parse::<TwistAxis>(),
            Err(PoseWranglerError::UnknownEnumValue { kind: "twistAxis", .. })
        ));
    }

    #[test]
    fn config_uses_camel_case_keys() {
        let json = serde_json::to_value(SolverConfig::default()).unwrap();
        assert_eq!(json["automaticRadius"], false);
        assert_eq!(json["mode"], "Interpolative");
        assert_eq!(json["radius"], 45.0);

        let partial: SolverConfig = serde_json::from_str(r#"{"radius": 30, "mode": 0}"#).unwrap();
        assert_eq!(partial.radius, 30.0);
        assert_eq!(partial.mode, SolverMode::Additive);
        assert_eq!(partial.twist_axis, TwistAxis::X);
    }
}
