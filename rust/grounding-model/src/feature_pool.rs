use std::collections::HashMap;

use grounding_language::{LanguageVariable, Symbol};
use grounding_world::{WorldDcg, WorldId};

use crate::{
    Attributes, ConstituentFeatureSet, Feature, FeatureCategory, FeatureError, FeatureSet,
    FeatureValue,
};

/// Handle to a feature instance owned by a [`FeaturePool`].
///
/// Handle equality is instance identity: two factors sharing a feature
/// hold equal handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(usize);

impl FeatureId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the instance in the pool's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Feature key to instance, for one language variable or symbol key.
pub type FeatureMap = HashMap<String, FeatureId>;

#[derive(Debug)]
struct FeatureInstance {
    feature: Box<dyn Feature>,
    key: String,
    value: FeatureValue,
}

/// Slot storage for feature instances. Released slots are reused.
#[derive(Debug, Default)]
struct FeatureArena {
    instances: Vec<Option<FeatureInstance>>,
    free: Vec<usize>,
}

impl FeatureArena {
    fn insert(&mut self, feature: Box<dyn Feature>) -> FeatureId {
        let instance = FeatureInstance {
            key: feature.key(),
            feature,
            value: FeatureValue::Unknown,
        };
        match self.free.pop() {
            Some(index) => {
                self.instances[index] = Some(instance);
                FeatureId(index)
            }
            None => {
                self.instances.push(Some(instance));
                FeatureId(self.instances.len() - 1)
            }
        }
    }

    fn dup(&mut self, id: FeatureId) -> Result<FeatureId, FeatureError> {
        let feature = self.get(id)?.feature.dup();
        Ok(self.insert(feature))
    }

    fn remove(&mut self, id: FeatureId) -> Option<FeatureInstance> {
        let instance = self.instances.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        Some(instance)
    }

    fn get(&self, id: FeatureId) -> Result<&FeatureInstance, FeatureError> {
        self.instances
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(FeatureError::UnknownHandle(id))
    }

    fn get_mut(&mut self, id: FeatureId) -> Result<&mut FeatureInstance, FeatureError> {
        self.instances
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(FeatureError::UnknownHandle(id))
    }

    /// Drop every instance at or beyond `len`.
    fn truncate(&mut self, len: usize) {
        self.instances.truncate(len);
        self.free.retain(|&index| index < len);
    }

    fn live(&self) -> usize {
        self.instances.iter().filter(|slot| slot.is_some()).count()
    }
}

/// The per-model cache of feature instances.
///
/// The pool owns the model's template features, loaded once and never
/// mutated, plus every instance created for factors. Instances are shared
/// between factors according to their category:
///
/// - CV features: every factor uses the template itself.
/// - Language features: one instance per language variable key.
/// - Static symbol features: one instance per symbol key.
/// - Dynamic symbol features: the first factor for a symbol key uses the
///   instance stored in the symbol's map, and every later factor gets its
///   own duplicate, returned to the pool by [`FeaturePool::release`].
///
/// The slot layout (and so the weight vector layout) depends only on the
/// templates, never on which instances were shared.
///
/// Evaluated values are cached against one [`WorldDcg`]. Evaluating against
/// another world forgets every cached value first.
#[derive(Debug, Default)]
pub struct FeaturePool {
    arena: FeatureArena,
    num_templates: usize,
    generation: u64,
    world: Option<WorldId>,
    constituent_feature_sets: Vec<ConstituentFeatureSet>,
    language_variable_features: HashMap<String, FeatureMap>,
    symbol_features: HashMap<String, FeatureMap>,
}

impl FeaturePool {
    /// Build a pool from the model's template features, one vector per
    /// constituent feature set. Within a set, features are laid out by
    /// category and keep their relative order.
    pub fn new(constituent_feature_sets: Vec<Vec<Box<dyn Feature>>>) -> Self {
        let mut arena = FeatureArena::default();
        let mut sets = Vec::with_capacity(constituent_feature_sets.len());

        for features in constituent_feature_sets {
            let mut set = ConstituentFeatureSet::default();
            let mut features = features;
            features.sort_by_key(|feature| feature.category());
            for feature in features {
                let category = feature.category();
                set.push(category, arena.insert(feature));
            }
            sets.push(set);
        }

        let pool = Self {
            num_templates: arena.instances.len(),
            arena,
            generation: 0,
            world: None,
            constituent_feature_sets: sets,
            language_variable_features: HashMap::new(),
            symbol_features: HashMap::new(),
        };
        tracing::debug!(
            sets = pool.constituent_feature_sets.len(),
            templates = pool.num_template_features(),
            slots = pool.num_constituent_features(),
            "built feature pool"
        );
        pool
    }

    /// The template feature sets.
    pub fn constituent_feature_sets(&self) -> &[ConstituentFeatureSet] {
        &self.constituent_feature_sets
    }

    /// Attributes of every template, grouped by constituent feature set.
    pub fn template_attributes(&self) -> Vec<Vec<Attributes>> {
        self.constituent_feature_sets
            .iter()
            .map(|set| {
                set.iter()
                    .filter_map(|(_, id)| self.feature(id).ok())
                    .map(|feature| feature.attributes())
                    .collect()
            })
            .collect()
    }

    /// Total number of weighted slots across every constituent feature set.
    pub fn num_constituent_features(&self) -> usize {
        self.constituent_feature_sets
            .iter()
            .map(ConstituentFeatureSet::num_slots)
            .sum()
    }

    /// Total number of template features.
    pub fn num_template_features(&self) -> usize {
        self.constituent_feature_sets
            .iter()
            .map(ConstituentFeatureSet::num_features)
            .sum()
    }

    /// Number of live feature instances, templates included.
    pub fn num_instances(&self) -> usize {
        self.arena.live()
    }

    /// The map of shared instances for a language variable key, created
    /// empty on first use.
    pub fn get_or_create_language_variable_feature_map(&mut self, key: &str) -> &mut FeatureMap {
        get_or_create(&mut self.language_variable_features, key, "language variable")
    }

    /// The map of instances for a symbol key, created empty on first use.
    pub fn get_or_create_symbol_feature_map(&mut self, key: &str) -> &mut FeatureMap {
        get_or_create(&mut self.symbol_features, key, "symbol")
    }

    /// The instances shared under a language variable key, if any.
    pub fn language_variable_feature_map(&self, key: &str) -> Option<&FeatureMap> {
        self.language_variable_features.get(key)
    }

    /// The instances stored under a symbol key, if any.
    pub fn symbol_feature_map(&self, key: &str) -> Option<&FeatureMap> {
        self.symbol_features.get(key)
    }

    /// Assemble the feature set for one factor.
    pub fn feature_set(
        &mut self,
        language_variable: &LanguageVariable,
        symbol: &Symbol,
    ) -> Result<FeatureSet, FeatureError> {
        let language_variable_key = language_variable.key();
        let symbol_key = symbol.key();

        let Self {
            arena,
            constituent_feature_sets,
            language_variable_features,
            symbol_features,
            ..
        } = self;
        let language_variable_map = get_or_create(
            language_variable_features,
            &language_variable_key,
            "language variable",
        );
        let symbol_map = get_or_create(symbol_features, &symbol_key, "symbol");

        let mut sets = Vec::with_capacity(constituent_feature_sets.len());
        let mut owned = Vec::new();

        for template in constituent_feature_sets.iter() {
            let mut set = ConstituentFeatureSet::default();
            for (category, template_id) in template.iter() {
                let id = match category {
                    FeatureCategory::Cv => template_id,
                    FeatureCategory::Language => {
                        share(arena, language_variable_map, template_id, &language_variable_key)?
                    }
                    FeatureCategory::StaticSymbol => {
                        share(arena, symbol_map, template_id, &symbol_key)?
                    }
                    FeatureCategory::DynamicSymbol => {
                        let key = arena.get(template_id)?.key.clone();
                        match symbol_map.get(&key) {
                            Some(&stored) => {
                                let id = arena.dup(stored)?;
                                tracing::trace!(symbol = %symbol_key, feature = %key, "duplicated dynamic feature");
                                owned.push(id);
                                id
                            }
                            None => {
                                let id = arena.dup(template_id)?;
                                tracing::trace!(symbol = %symbol_key, feature = %key, "stored dynamic feature");
                                symbol_map.insert(key, id);
                                id
                            }
                        }
                    }
                };
                set.push(category, id);
            }
            sets.push(set);
        }

        Ok(FeatureSet::new(sets, owned).in_generation(self.generation))
    }

    /// The feature behind a handle.
    pub fn feature(&self, id: FeatureId) -> Result<&dyn Feature, FeatureError> {
        Ok(self.arena.get(id)?.feature.as_ref())
    }

    /// The deduplication key of the feature behind a handle.
    pub fn key(&self, id: FeatureId) -> Result<&str, FeatureError> {
        Ok(&self.arena.get(id)?.key)
    }

    /// The last evaluated value of an instance.
    pub fn value(&self, id: FeatureId) -> Result<FeatureValue, FeatureError> {
        Ok(self.arena.get(id)?.value)
    }

    /// Evaluate an instance and store its value.
    pub fn evaluate(
        &mut self,
        id: FeatureId,
        cv: &str,
        language_variable: &LanguageVariable,
        world: &WorldDcg,
        symbol: &Symbol,
    ) -> Result<FeatureValue, FeatureError> {
        self.enter_world(world.id());
        let instance = self.arena.get_mut(id)?;
        instance.value = instance
            .feature
            .evaluate(cv, language_variable, world, symbol)?;
        Ok(instance.value)
    }

    /// Number of resets so far. Feature sets remember the generation they
    /// were assembled in.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Make `world` the world cached values belong to, forgetting every
    /// value evaluated against a different one.
    pub fn enter_world(&mut self, world: WorldId) {
        if self.world == Some(world) {
            return;
        }
        if self.world.is_some() {
            self.forget_values();
            tracing::debug!(?world, "world changed, forgot evaluated values");
        }
        self.world = Some(world);
    }

    fn forget_values(&mut self) {
        for instance in self.arena.instances.iter_mut().flatten() {
            instance.value = FeatureValue::Unknown;
        }
    }

    /// Return a feature set's per-factor duplicates to the pool.
    ///
    /// Feature sets assembled before the last [`FeaturePool::reset`] own
    /// nothing any more and are ignored.
    pub fn release(&mut self, mut feature_set: FeatureSet) {
        if feature_set.generation() != self.generation {
            tracing::trace!(
                generation = feature_set.generation(),
                current = self.generation,
                "ignored release of a feature set from before the last reset"
            );
            return;
        }
        let owned = feature_set.take_owned();
        let released = owned
            .into_iter()
            .filter(|&id| self.arena.remove(id).is_some())
            .count();
        tracing::trace!(released, "released feature set");
    }

    /// Forget every shared instance and evaluated value, keeping only the
    /// templates. Handles from earlier feature sets become invalid.
    pub fn reset(&mut self) {
        self.arena.truncate(self.num_templates);
        self.forget_values();
        self.generation += 1;
        self.world = None;
        self.language_variable_features.clear();
        self.symbol_features.clear();
        tracing::debug!(templates = self.num_templates, "reset feature pool");
    }
}

fn get_or_create<'a>(
    maps: &'a mut HashMap<String, FeatureMap>,
    key: &str,
    kind: &'static str,
) -> &'a mut FeatureMap {
    maps.entry(key.to_string()).or_insert_with(|| {
        tracing::trace!(kind, key, "created feature map");
        FeatureMap::new()
    })
}

/// The instance stored under the template's key, inserting a duplicate of
/// the template on first use.
fn share(
    arena: &mut FeatureArena,
    map: &mut FeatureMap,
    template_id: FeatureId,
    owner: &str,
) -> Result<FeatureId, FeatureError> {
    let key = arena.get(template_id)?.key.clone();
    if let Some(&id) = map.get(&key) {
        return Ok(id);
    }
    let id = arena.dup(template_id)?;
    tracing::trace!(owner, feature = %key, "shared feature");
    map.insert(key, id);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CvFeature, SymbolMatchesChildFeature, SymbolTypeFeature, WordFeature};

    fn pool() -> FeaturePool {
        FeaturePool::new(vec![vec![
            Box::new(WordFeature::new("box")),
            Box::new(CvFeature::new("true")),
            Box::new(CvFeature::new("false")),
            Box::new(SymbolTypeFeature::new("object")),
        ]])
    }

    #[test]
    fn it_lays_templates_out_by_category() {
        let pool = pool();
        let set = &pool.constituent_feature_sets()[0];

        let keys: Vec<_> = set.iter().map(|(_, id)| pool.key(id).unwrap()).collect();
        assert_eq!(
            keys,
            vec![
                "cv(cv=true)",
                "cv(cv=false)",
                "word(word=box)",
                "symbol_type(symbol_type=object)"
            ]
        );
        assert_eq!(pool.num_template_features(), 4);
        assert_eq!(pool.num_constituent_features(), 2);
    }

    #[test]
    fn it_creates_feature_maps_once() {
        let mut pool = pool();
        let id = FeatureId::new(0);

        pool.get_or_create_symbol_feature_map("object(uid=b1)")
            .insert("x".into(), id);

        assert_eq!(
            pool.get_or_create_symbol_feature_map("object(uid=b1)").get("x"),
            Some(&id)
        );
        assert!(pool.language_variable_feature_map("NP[]").is_none());
    }

    #[test]
    fn it_resets_to_the_templates() {
        let mut pool = pool();
        let lv = LanguageVariable::new("NP").with_text("the box");
        let feature_set = pool.feature_set(&lv, &Symbol::object("b1")).unwrap();
        assert_eq!(pool.num_instances(), 6);

        pool.reset();

        assert_eq!(pool.num_instances(), 4);
        assert!(pool.symbol_feature_map("object(uid=b1)").is_none());
        let language = feature_set.features(FeatureCategory::Language).next().unwrap();
        assert_eq!(pool.value(language), Err(FeatureError::UnknownHandle(language)));
    }

    #[test]
    fn it_ignores_releases_from_before_a_reset() {
        let mut pool = FeaturePool::new(vec![vec![
            Box::new(CvFeature::new("true")),
            Box::new(SymbolMatchesChildFeature::new("object")),
        ]]);
        let lv = LanguageVariable::new("NP").with_text("the box");
        let symbol = Symbol::object("b1");
        pool.feature_set(&lv, &symbol).unwrap();
        let stale = pool.feature_set(&lv, &symbol).unwrap();
        assert_eq!(stale.owned().len(), 1);

        pool.reset();
        pool.feature_set(&lv, &symbol).unwrap();
        let fresh = pool.feature_set(&lv, &symbol).unwrap();
        assert_eq!(fresh.owned(), stale.owned());
        let live = pool.num_instances();

        pool.release(stale);

        assert_eq!(pool.num_instances(), live);
        assert!(pool.key(fresh.owned()[0]).is_ok());
        assert_eq!(fresh.generation(), 1);
        assert_eq!(pool.generation(), 1);

        pool.release(fresh);
        assert_eq!(pool.num_instances(), live - 1);
    }

    #[test]
    fn it_reports_unknown_handles() {
        let pool = pool();

        assert_eq!(
            pool.value(FeatureId::new(99)),
            Err(FeatureError::UnknownHandle(FeatureId::new(99)))
        );
    }
}
