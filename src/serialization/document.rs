//! Serde data model of solver documents.
//!
//! ```json
//! {
//!   "arm_l_UERBFSolver": {
//!     "drivers": ["arm_l_upper"],
//!     "driven_transforms": ["arm_l_twist"],
//!     "controllers": [],
//!     "poses": {
//!       "default": { "drivers": [[1, 0, ...]], "driven": { "arm_l_twist": [1, 0, ...] }, ... }
//!     },
//!     "driven_attrs": [],
//!     "mode": "Interpolative",
//!     "radius": 45.0,
//!     ...
//!   }
//! }
//! ```
//!
//! Matrices are flat column-major arrays of 16 numbers.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::math::FlatMatrix;
use crate::network::{DistanceMethod, FunctionType, PoseOverrides, SolverConfig};

/// Solver name to solver entry.
pub type Document = BTreeMap<String, SolverDocument>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverDocument {
    pub drivers: Vec<String>,
    pub driven_transforms: Vec<String>,
    pub controllers: Vec<String>,
    pub poses: OrderedPoses,
    /// Blendshape meshes whose weights the solver drives. Informational.
    pub driven_attrs: Vec<String>,
    #[serde(flatten)]
    pub config: SolverConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseDocument {
    pub drivers: Vec<FlatMatrix>,
    pub controllers: Vec<FlatMatrix>,
    pub driven: BTreeMap<String, FlatMatrix>,
    pub function_type: FunctionType,
    pub distance_method: DistanceMethod,
    pub scale_factor: f64,
    pub target_enable: bool,
    pub blendshape_data: Vec<BlendshapeDocument>,
}

impl Default for PoseDocument {
    fn default() -> Self {
        let overrides = PoseOverrides::default();
        Self {
            drivers: Vec::new(),
            controllers: Vec::new(),
            driven: BTreeMap::new(),
            function_type: overrides.function_type,
            distance_method: overrides.distance_method,
            scale_factor: overrides.scale_factor,
            target_enable: true,
            blendshape_data: Vec::new(),
        }
    }
}

impl PoseDocument {
    #[must_use]
    pub fn overrides(&self) -> PoseOverrides {
        PoseOverrides {
            function_type: self.function_type,
            distance_method: self.distance_method,
            scale_factor: self.scale_factor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendshapeDocument {
    pub mesh: String,
    pub base_mesh: String,
}

/// Pose name to pose entry, kept in document order.
///
/// Pose indices are positional, so the map order is significant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderedPoses(pub Vec<(String, PoseDocument)>);

impl OrderedPoses {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PoseDocument> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PoseDocument)> {
        self.0.iter().map(|(n, p)| (n.as_str(), p))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for OrderedPoses {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, pose) in &self.0 {
            map.serialize_entry(name, pose)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OrderedPoses {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PosesVisitor;

        impl<'de> Visitor<'de> for PosesVisitor {
            type Value = OrderedPoses;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of pose name to pose")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut poses: Vec<(String, PoseDocument)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, pose)) = access.next_entry::<String, PoseDocument>()? {
                    // Last one wins, at the position of the first.
                    match poses.iter_mut().find(|(n, _)| *n == name) {
                        Some(slot) => slot.1 = pose,
                        None => poses.push((name, pose)),
                    }
                }
                Ok(OrderedPoses(poses))
            }
        }

        deserializer.deserialize_map(PosesVisitor)
    }
}
