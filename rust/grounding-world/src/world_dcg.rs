use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Object, SortKey, SortedObjects, World};

static NEXT_WORLD_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of one [`WorldDcg`].
///
/// Every [`WorldDcg::new`] gets a fresh id. Clones keep it, since the
/// wrapped world cannot change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(u64);

/// A [`World`] with every [`SortKey`] table precomputed.
///
/// The tables are built once in [`WorldDcg::new`] and never invalidated, so
/// the wrapped world cannot be mutated through this type. Use
/// [`WorldDcg::into_inner`] to get the world back for editing.
#[derive(Debug, Clone)]
pub struct WorldDcg {
    id: WorldId,
    world: World,
    sorted: HashMap<SortKey, SortedObjects>,
}

impl WorldDcg {
    /// Take ownership of `world` and sort it under every key.
    ///
    /// An empty world gets no tables.
    pub fn new(mut world: World) -> Self {
        let mut sorted = HashMap::new();

        if !world.is_empty() {
            for sort_key in SortKey::ALL {
                let table = world.sort_objects(sort_key);
                tracing::debug!(
                    sort_key = %sort_key,
                    buckets = table.iter().count(),
                    "precomputed sorted objects"
                );
                sorted.insert(sort_key, table);
            }
        }

        Self {
            id: WorldId(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed)),
            world,
            sorted,
        }
    }

    /// This world's identity, for caches of values computed against it.
    pub fn id(&self) -> WorldId {
        self.id
    }

    /// The wrapped world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Release the wrapped world, discarding the precomputed tables.
    pub fn into_inner(self) -> World {
        self.world
    }

    /// The precomputed table for `sort_key`, if the world had any objects.
    pub fn sorted_objects(&self, sort_key: SortKey) -> Option<&SortedObjects> {
        self.sorted.get(&sort_key)
    }

    /// The object at position `index` among objects of `object_type` under
    /// `sort_key`.
    pub fn nth_object(&self, sort_key: SortKey, object_type: &str, index: usize) -> Option<&Object> {
        let uid = self.sorted_objects(sort_key)?.nth(object_type, index)?;
        self.world.object(uid)
    }

    /// Position of the object `uid` among objects of its own type under
    /// `sort_key`.
    pub fn sort_position(&self, sort_key: SortKey, uid: &str) -> Option<usize> {
        let object_type = self.world.object(uid)?.object_type()?;
        self.sorted_objects(sort_key)?.position(object_type, uid)
    }
}

impl Default for WorldDcg {
    fn default() -> Self {
        WorldDcg::new(World::new())
    }
}

impl Deref for WorldDcg {
    type Target = World;

    fn deref(&self) -> &Self::Target {
        &self.world
    }
}

impl From<World> for WorldDcg {
    fn from(world: World) -> Self {
        WorldDcg::new(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OBJECT_TYPE;

    #[test_log::test]
    fn it_precomputes_every_sort_key() {
        let world: World = [
            Object::new("box1").with_property(OBJECT_TYPE, "box").at(1.0, 2.0, 0.0),
            Object::new("ball1").with_property(OBJECT_TYPE, "ball").at(-1.0, 0.0, 3.0),
        ]
        .into_iter()
        .collect();

        let world = WorldDcg::new(world);

        for sort_key in SortKey::ALL {
            let table = world.sorted_objects(sort_key).unwrap();
            assert_eq!(table.all().len(), 2);
        }
        assert_eq!(world.nth_object(SortKey::MinXAxis, "all", 0).unwrap().uid, "ball1");
        assert_eq!(world.sort_position(SortKey::MaxZAxis, "ball1"), Some(0));
    }

    #[test]
    fn it_gives_each_precomputed_world_its_own_id() {
        let first = WorldDcg::new(World::new());
        let second = WorldDcg::new(World::new());

        assert_ne!(first.id(), second.id());
        assert_eq!(first.clone().id(), first.id());
    }

    #[test]
    fn it_skips_tables_for_an_empty_world() {
        let world = WorldDcg::new(World::new());

        assert!(SortKey::ALL.iter().all(|key| world.sorted_objects(*key).is_none()));
        assert!(world.nth_object(SortKey::MinXAxis, "box", 0).is_none());
    }
}
