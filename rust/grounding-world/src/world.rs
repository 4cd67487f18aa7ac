use std::collections::BTreeMap;
use std::path::Path;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::sort::{RelativeFrame, order};
use crate::{Object, SortKey, SortedObjects, WorldError};

/// The on-disk shape of a world: a flat list of objects.
#[derive(Serialize, Deserialize)]
struct WorldDocument {
    #[serde(default)]
    objects: Vec<Object>,
}

/// A collection of objects keyed by UID.
///
/// Iteration order is UID order, which makes every derived table
/// deterministic for a given world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WorldDocument", into = "WorldDocument")]
pub struct World {
    objects: BTreeMap<String, Object>,
}

impl From<WorldDocument> for World {
    fn from(document: WorldDocument) -> Self {
        document.objects.into_iter().collect()
    }
}

impl From<World> for WorldDocument {
    fn from(world: World) -> Self {
        WorldDocument {
            objects: world.objects.into_values().collect(),
        }
    }
}

impl FromIterator<Object> for World {
    fn from_iter<I: IntoIterator<Item = Object>>(objects: I) -> Self {
        let mut world = World::new();
        for object in objects {
            world.insert(object);
        }
        world
    }
}

impl World {
    /// An empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a world from its JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, WorldError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the world to its JSON document.
    pub fn to_json_string(&self) -> Result<String, WorldError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a world from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorldError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Add an object, returning the object it replaced if the UID was taken.
    pub fn insert(&mut self, object: Object) -> Option<Object> {
        self.objects.insert(object.uid.clone(), object)
    }

    /// Look up an object by UID.
    pub fn object(&self, uid: &str) -> Option<&Object> {
        self.objects.get(uid)
    }

    /// Iterate over objects in UID order.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the world has no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of objects sharing the given `object_type`.
    pub fn count_of_type(&self, object_type: &str) -> usize {
        self.objects()
            .filter(|object| object.object_type() == Some(object_type))
            .count()
    }

    /// Mean position of every object that has a pose.
    pub fn centroid(&self) -> Option<Vector3<f64>> {
        let positions: Vec<Vector3<f64>> = self.objects().filter_map(Object::position).collect();
        if positions.is_empty() {
            return None;
        }
        let sum: Vector3<f64> = positions.iter().sum();
        Some(sum / positions.len() as f64)
    }

    /// Order every object under `sort_key` and partition the result by
    /// object type.
    ///
    /// Centre-relative keys temporarily re-express every pose in the
    /// centroid frame. The poses are restored before this returns.
    pub fn sort_objects(&mut self, sort_key: SortKey) -> SortedObjects {
        if !sort_key.is_center_relative() {
            return order(self.objects.values(), sort_key);
        }

        let Some(centroid) = self.centroid() else {
            return order(self.objects.values(), sort_key);
        };

        let frame = Isometry3::from_parts(Translation3::from(centroid), UnitQuaternion::identity());
        let relative = RelativeFrame::enter(&mut self.objects, frame);
        order(relative.objects(), sort_key)
    }
}
