#![warn(missing_docs)]

//! The world a grounded utterance is interpreted against.
//!
//! A [`World`] is a set of [`Object`]s keyed by UID. Each object carries a
//! property map (its `object_type` among them) and an ordered history of
//! [`State`]s; the most recent state holds the object's current pose.
//!
//! Spatial-relation features repeatedly ask questions like "which box is
//! the leftmost" or "which object is the second closest to the centre".
//! [`WorldDcg`] answers those without re-sorting: it takes ownership of a
//! world and precomputes one [`SortedObjects`] table per [`SortKey`] at
//! construction time. The world is treated as immutable for the lifetime of
//! a [`WorldDcg`], so the tables are never invalidated.
//!
//! ```
//! use grounding_world::{Object, SortKey, World, WorldDcg};
//!
//! let mut world = World::new();
//! for (uid, x) in [("a", 1.0), ("b", 3.0), ("c", 2.0)] {
//!     world.insert(Object::new(uid).with_property("object_type", "box").at(x, 0.0, 0.0));
//! }
//!
//! let world = WorldDcg::new(world);
//! let table = world.sorted_objects(SortKey::MaxXAxis).unwrap();
//! assert_eq!(table.bucket("box").unwrap(), ["b", "c", "a"]);
//! ```

mod error;
pub use error::*;

mod object;
pub use object::*;

mod sort;
pub use sort::*;

mod world;
pub use world::*;

mod world_dcg;
pub use world_dcg::*;
