use std::collections::BTreeMap;

use nalgebra::{Isometry3, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Name of the property that holds an object's type.
pub const OBJECT_TYPE: &str = "object_type";

/// An axis-aligned bounding box in the object's frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

/// One entry of an object's state history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Time the state was observed.
    #[serde(default)]
    pub time: f64,
    /// Pose of the object in the world frame.
    pub pose: Isometry3<f64>,
    /// Extent of the object, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

/// A physical object in the world.
///
/// Objects are identified by their UID. Everything else that features may
/// want to know about an object lives in its property map, including its
/// [`OBJECT_TYPE`]. The state history is ordered oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    /// Unique identifier of the object within its world.
    pub uid: String,
    /// Arbitrary string properties (`object_type`, `color`, ...).
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Observed states, oldest first.
    #[serde(default)]
    pub states: Vec<State>,
}

impl Object {
    /// Create an object with no properties and no state history.
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            properties: BTreeMap::new(),
            states: Vec::new(),
        }
    }

    /// Builder-style helper that sets a property.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Builder-style helper that appends a state with the given pose.
    pub fn with_pose(mut self, pose: Isometry3<f64>) -> Self {
        let time = self.states.len() as f64;
        self.states.push(State {
            time,
            pose,
            bounding_box: None,
        });
        self
    }

    /// Builder-style helper that appends an unrotated state at `(x, y, z)`.
    pub fn at(self, x: f64, y: f64, z: f64) -> Self {
        self.with_pose(Isometry3::translation(x, y, z))
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// The object's type, if it has one.
    pub fn object_type(&self) -> Option<&str> {
        self.property(OBJECT_TYPE)
    }

    /// The most recent pose, if the object has been observed at all.
    pub fn pose(&self) -> Option<&Isometry3<f64>> {
        self.states.last().map(|state| &state.pose)
    }

    /// Translation component of the most recent pose.
    pub fn position(&self) -> Option<Vector3<f64>> {
        self.pose().map(|pose| pose.translation.vector)
    }
}
