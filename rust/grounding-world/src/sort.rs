use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use nalgebra::{Isometry3, Vector3};

use crate::{Object, WorldError};

/// Name of the bucket in [`SortedObjects`] that holds every object.
pub const ALL_OBJECTS: &str = "all";

/// The comparator policies a world can be sorted by.
///
/// `Min*` keys sort ascending and `Max*` keys sort descending. The `Abs`
/// variants compare the absolute value of one coordinate. Euclidean
/// distance is measured from the world origin, centre distance from the
/// centroid of all posed objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SortKey {
    #[allow(missing_docs)]
    MinXAxis,
    #[allow(missing_docs)]
    MaxXAxis,
    #[allow(missing_docs)]
    MinYAxis,
    #[allow(missing_docs)]
    MaxYAxis,
    #[allow(missing_docs)]
    MinZAxis,
    #[allow(missing_docs)]
    MaxZAxis,
    #[allow(missing_docs)]
    MinAbsXAxis,
    #[allow(missing_docs)]
    MaxAbsXAxis,
    #[allow(missing_docs)]
    MinAbsYAxis,
    #[allow(missing_docs)]
    MaxAbsYAxis,
    #[allow(missing_docs)]
    MinAbsZAxis,
    #[allow(missing_docs)]
    MaxAbsZAxis,
    #[allow(missing_docs)]
    MinEuclideanDistance,
    #[allow(missing_docs)]
    MaxEuclideanDistance,
    #[allow(missing_docs)]
    MinCenterDistance,
    #[allow(missing_docs)]
    MaxCenterDistance,
}

impl SortKey {
    /// Every sort key, in declaration order.
    pub const ALL: [SortKey; 16] = [
        SortKey::MinXAxis,
        SortKey::MaxXAxis,
        SortKey::MinYAxis,
        SortKey::MaxYAxis,
        SortKey::MinZAxis,
        SortKey::MaxZAxis,
        SortKey::MinAbsXAxis,
        SortKey::MaxAbsXAxis,
        SortKey::MinAbsYAxis,
        SortKey::MaxAbsYAxis,
        SortKey::MinAbsZAxis,
        SortKey::MaxAbsZAxis,
        SortKey::MinEuclideanDistance,
        SortKey::MaxEuclideanDistance,
        SortKey::MinCenterDistance,
        SortKey::MaxCenterDistance,
    ];

    /// The snake_case name used in model files and symbol properties.
    pub fn name(self) -> &'static str {
        match self {
            SortKey::MinXAxis => "min_x_axis",
            SortKey::MaxXAxis => "max_x_axis",
            SortKey::MinYAxis => "min_y_axis",
            SortKey::MaxYAxis => "max_y_axis",
            SortKey::MinZAxis => "min_z_axis",
            SortKey::MaxZAxis => "max_z_axis",
            SortKey::MinAbsXAxis => "min_abs_x_axis",
            SortKey::MaxAbsXAxis => "max_abs_x_axis",
            SortKey::MinAbsYAxis => "min_abs_y_axis",
            SortKey::MaxAbsYAxis => "max_abs_y_axis",
            SortKey::MinAbsZAxis => "min_abs_z_axis",
            SortKey::MaxAbsZAxis => "max_abs_z_axis",
            SortKey::MinEuclideanDistance => "min_euclidean_distance",
            SortKey::MaxEuclideanDistance => "max_euclidean_distance",
            SortKey::MinCenterDistance => "min_center_distance",
            SortKey::MaxCenterDistance => "max_center_distance",
        }
    }

    /// Whether larger measures sort first.
    pub fn is_descending(self) -> bool {
        matches!(
            self,
            SortKey::MaxXAxis
                | SortKey::MaxYAxis
                | SortKey::MaxZAxis
                | SortKey::MaxAbsXAxis
                | SortKey::MaxAbsYAxis
                | SortKey::MaxAbsZAxis
                | SortKey::MaxEuclideanDistance
                | SortKey::MaxCenterDistance
        )
    }

    /// Whether the key measures poses relative to the centroid of the world.
    pub fn is_center_relative(self) -> bool {
        matches!(self, SortKey::MinCenterDistance | SortKey::MaxCenterDistance)
    }

    /// The scalar an object at `position` is ordered by.
    ///
    /// For centre-relative keys the position must already be expressed in
    /// the centroid frame.
    pub fn measure(self, position: &Vector3<f64>) -> f64 {
        match self {
            SortKey::MinXAxis | SortKey::MaxXAxis => position.x,
            SortKey::MinYAxis | SortKey::MaxYAxis => position.y,
            SortKey::MinZAxis | SortKey::MaxZAxis => position.z,
            SortKey::MinAbsXAxis | SortKey::MaxAbsXAxis => position.x.abs(),
            SortKey::MinAbsYAxis | SortKey::MaxAbsYAxis => position.y.abs(),
            SortKey::MinAbsZAxis | SortKey::MaxAbsZAxis => position.z.abs(),
            SortKey::MinEuclideanDistance
            | SortKey::MaxEuclideanDistance
            | SortKey::MinCenterDistance
            | SortKey::MaxCenterDistance => position.norm(),
        }
    }

    /// Compare two objects under this key. Objects without a pose order
    /// after every posed object.
    pub fn compare(self, a: &Object, b: &Object) -> Ordering {
        let measure_a = a.position().map(|position| self.measure(&position));
        let measure_b = b.position().map(|position| self.measure(&position));

        match (measure_a, measure_b) {
            (Some(a), Some(b)) if self.is_descending() => b.total_cmp(&a),
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SortKey {
    type Err = WorldError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.name() == name)
            .ok_or_else(|| WorldError::UnknownSortKey(name.to_string()))
    }
}

/// Object UIDs ordered by one [`SortKey`], partitioned by object type.
///
/// Each bucket preserves the global order. The [`ALL_OBJECTS`] bucket holds
/// every object, including those without an `object_type`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedObjects {
    buckets: BTreeMap<String, Vec<String>>,
}

impl SortedObjects {
    /// Partition an already-sorted sequence of objects.
    pub fn from_sorted<'a>(objects: impl IntoIterator<Item = &'a Object>) -> Self {
        let mut buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut all = Vec::new();

        for object in objects {
            if let Some(object_type) = object.object_type() {
                buckets
                    .entry(object_type.to_string())
                    .or_default()
                    .push(object.uid.clone());
            }
            all.push(object.uid.clone());
        }

        buckets.insert(ALL_OBJECTS.to_string(), all);
        Self { buckets }
    }

    /// The ordered UIDs of one object type (or [`ALL_OBJECTS`]).
    pub fn bucket(&self, object_type: &str) -> Option<&[String]> {
        self.buckets.get(object_type).map(Vec::as_slice)
    }

    /// The ordered UIDs of every object.
    pub fn all(&self) -> &[String] {
        self.bucket(ALL_OBJECTS).unwrap_or_default()
    }

    /// The UID at position `index` of a bucket.
    pub fn nth(&self, object_type: &str, index: usize) -> Option<&str> {
        self.bucket(object_type)?.get(index).map(String::as_str)
    }

    /// Position of `uid` within a bucket.
    pub fn position(&self, object_type: &str, uid: &str) -> Option<usize> {
        self.bucket(object_type)?.iter().position(|entry| entry == uid)
    }

    /// Iterate over `(bucket name, ordered UIDs)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.buckets
            .iter()
            .map(|(name, uids)| (name.as_str(), uids.as_slice()))
    }
}

/// Sort `objects` under `sort_key` without touching their poses.
pub(crate) fn order<'a>(
    objects: impl IntoIterator<Item = &'a Object>,
    sort_key: SortKey,
) -> SortedObjects {
    let mut handles: Vec<&Object> = objects.into_iter().collect();
    handles.sort_by(|a, b| sort_key.compare(a, b));
    SortedObjects::from_sorted(handles)
}

/// Scoped re-expression of every pose relative to a reference frame.
///
/// Entering the frame multiplies each pose by the inverse of `frame`. The
/// original poses are restored exactly when the guard is dropped, so an
/// early return or unwind while the guard is alive never leaks transformed
/// state into the world.
pub(crate) struct RelativeFrame<'a> {
    objects: &'a mut BTreeMap<String, Object>,
    originals: Vec<Vec<Isometry3<f64>>>,
}

impl<'a> RelativeFrame<'a> {
    pub(crate) fn enter(objects: &'a mut BTreeMap<String, Object>, frame: Isometry3<f64>) -> Self {
        let inverse = frame.inverse();
        let mut originals = Vec::with_capacity(objects.len());

        for object in objects.values_mut() {
            originals.push(object.states.iter().map(|state| state.pose).collect());
            for state in object.states.iter_mut() {
                state.pose = inverse * state.pose;
            }
        }

        Self { objects, originals }
    }

    pub(crate) fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }
}

impl Drop for RelativeFrame<'_> {
    fn drop(&mut self) {
        for (object, poses) in self.objects.values_mut().zip(self.originals.drain(..)) {
            for (state, pose) in object.states.iter_mut().zip(poses) {
                state.pose = pose;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OBJECT_TYPE;
    use pretty_assertions::assert_eq;

    fn boxes() -> Vec<Object> {
        vec![
            Object::new("a").with_property(OBJECT_TYPE, "box").at(1.0, -4.0, 0.0),
            Object::new("b").with_property(OBJECT_TYPE, "box").at(2.0, 0.5, 0.0),
            Object::new("c").with_property(OBJECT_TYPE, "box").at(-3.0, 2.0, 0.0),
        ]
    }

    #[test]
    fn it_parses_every_key_from_its_name() {
        for key in SortKey::ALL {
            assert_eq!(key.name().parse::<SortKey>().unwrap(), key);
        }
        assert!(matches!(
            "leftmost".parse::<SortKey>(),
            Err(WorldError::UnknownSortKey(name)) if name == "leftmost"
        ));
    }

    #[test]
    fn it_sorts_by_absolute_value() {
        let objects = boxes();

        let table = order(&objects, SortKey::MinAbsXAxis);
        assert_eq!(table.all(), ["a", "b", "c"]);

        let table = order(&objects, SortKey::MaxAbsYAxis);
        assert_eq!(table.all(), ["a", "c", "b"]);
    }

    #[test]
    fn it_orders_unposed_objects_last() {
        let mut objects = boxes();
        objects.insert(0, Object::new("ghost").with_property(OBJECT_TYPE, "box"));

        let ascending = order(&objects, SortKey::MinXAxis);
        let descending = order(&objects, SortKey::MaxXAxis);

        assert_eq!(ascending.bucket("box").unwrap(), ["c", "a", "b", "ghost"]);
        assert_eq!(descending.bucket("box").unwrap(), ["b", "a", "c", "ghost"]);
    }

    #[test]
    fn it_keeps_untyped_objects_in_the_all_bucket_only() {
        let mut objects = boxes();
        objects.push(Object::new("floor").at(0.0, 0.0, -1.0));

        let table = order(&objects, SortKey::MinZAxis);

        assert_eq!(table.all().first().map(String::as_str), Some("floor"));
        assert_eq!(table.bucket("box").unwrap().len(), 3);
        assert_eq!(table.position(ALL_OBJECTS, "floor"), Some(0));
        assert_eq!(table.nth("box", 5), None);
    }
}
