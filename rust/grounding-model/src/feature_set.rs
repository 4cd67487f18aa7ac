use std::collections::BTreeMap;

use grounding_language::{LanguageVariable, Symbol};
use grounding_world::WorldDcg;
use itertools::Itertools;

use crate::{FeatureCategory, FeatureError, FeatureId, FeaturePool};

/// Feature indices that fired, keyed by correspondence variable.
///
/// Every correspondence variable a factor was evaluated for has an entry,
/// possibly empty.
pub type IndicesByCv = BTreeMap<String, Vec<usize>>;

/// One constituent feature set: feature handles partitioned by category.
///
/// The set expands to the cartesian product of its non-empty categories.
/// Each combination is one weighted slot, numbered in row-major order with
/// categories taken in [`FeatureCategory::ALL`] order, so the last
/// participating category varies fastest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstituentFeatureSet {
    features: [Vec<FeatureId>; 4],
}

impl ConstituentFeatureSet {
    /// Append a feature to its category.
    pub fn push(&mut self, category: FeatureCategory, id: FeatureId) {
        self.features[category.index()].push(id);
    }

    /// The features of one category, in slot order.
    pub fn category(&self, category: FeatureCategory) -> &[FeatureId] {
        &self.features[category.index()]
    }

    /// Every feature with its category, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureCategory, FeatureId)> + '_ {
        FeatureCategory::ALL.into_iter().flat_map(move |category| {
            self.category(category)
                .iter()
                .map(move |&id| (category, id))
        })
    }

    /// Number of features across every category.
    pub fn num_features(&self) -> usize {
        self.features.iter().map(Vec::len).sum()
    }

    /// Number of weighted slots: the product of the non-empty category
    /// sizes, or zero when every category is empty.
    pub fn num_slots(&self) -> usize {
        let mut participating = self.participating().peekable();
        if participating.peek().is_none() {
            return 0;
        }
        participating.map(<[FeatureId]>::len).product()
    }

    fn participating(&self) -> impl Iterator<Item = &[FeatureId]> {
        self.features
            .iter()
            .filter(|features| !features.is_empty())
            .map(Vec::as_slice)
    }

    /// Enumerate `(slot, features)` for every combination, in slot order.
    pub fn slots(&self) -> impl Iterator<Item = (usize, Vec<FeatureId>)> + '_ {
        let axes: Vec<&[FeatureId]> = self.participating().collect();
        let combinations: Vec<Vec<FeatureId>> = if axes.is_empty() {
            Vec::new()
        } else {
            axes.iter()
                .map(|features| features.iter().copied())
                .multi_cartesian_product()
                .collect()
        };
        combinations.into_iter().enumerate()
    }
}

/// One fired slot, recorded for introspection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressedFeature {
    /// Flat weight index of the slot.
    pub index: usize,
    /// Keys of the features making up the slot.
    pub constituents: Vec<String>,
    /// How often the slot fired, per correspondence variable.
    pub counts: BTreeMap<String, usize>,
}

/// Fired slots across any number of factor evaluations, keyed by the
/// joined keys of their constituents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressedFeatures {
    by_key: BTreeMap<String, ExpressedFeature>,
}

impl ExpressedFeatures {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, index: usize, constituents: Vec<String>, cv: &str) -> &ExpressedFeature {
        let key = constituents.join("*");
        let expressed = self.by_key.entry(key).or_insert_with(|| ExpressedFeature {
            index,
            constituents,
            counts: BTreeMap::new(),
        });
        *expressed.counts.entry(cv.to_string()).or_default() += 1;
        expressed
    }

    /// Look up a slot by its joined constituent keys.
    pub fn get(&self, key: &str) -> Option<&ExpressedFeature> {
        self.by_key.get(key)
    }

    /// Look up a slot by its weight index.
    pub fn by_index(&self, index: usize) -> Option<&ExpressedFeature> {
        self.by_key.values().find(|expressed| expressed.index == index)
    }

    /// Iterate over `(key, slot)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExpressedFeature)> {
        self.by_key.iter().map(|(key, expressed)| (key.as_str(), expressed))
    }

    /// Number of distinct slots recorded.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether nothing has fired.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// The feature handles one factor evaluates, as assembled by
/// [`FeaturePool::feature_set`].
///
/// Handles in `owned` are per-factor duplicates that the pool reclaims in
/// [`FeaturePool::release`]. Every other handle belongs to the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    sets: Vec<ConstituentFeatureSet>,
    offsets: Vec<usize>,
    owned: Vec<FeatureId>,
    generation: u64,
}

impl FeatureSet {
    /// Assemble a feature set. `owned` lists handles the set is responsible
    /// for releasing.
    pub fn new(sets: Vec<ConstituentFeatureSet>, owned: Vec<FeatureId>) -> Self {
        let offsets = sets
            .iter()
            .scan(0, |offset, set| {
                let start = *offset;
                *offset += set.num_slots();
                Some(start)
            })
            .collect();
        Self {
            sets,
            offsets,
            owned,
            generation: 0,
        }
    }

    pub(crate) fn in_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// The pool generation this set was assembled in. See
    /// [`FeaturePool::generation`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The constituent feature sets, in model order.
    pub fn constituent_feature_sets(&self) -> &[ConstituentFeatureSet] {
        &self.sets
    }

    /// Handles of the features in `category` across every constituent set.
    pub fn features(&self, category: FeatureCategory) -> impl Iterator<Item = FeatureId> + '_ {
        self.sets
            .iter()
            .flat_map(move |set| set.category(category).iter().copied())
    }

    /// Per-factor duplicates to be released after evaluation.
    pub fn owned(&self) -> &[FeatureId] {
        &self.owned
    }

    pub(crate) fn take_owned(&mut self) -> Vec<FeatureId> {
        std::mem::take(&mut self.owned)
    }

    /// Total number of weighted slots.
    pub fn num_constituent_features(&self) -> usize {
        self.sets.iter().map(ConstituentFeatureSet::num_slots).sum()
    }

    /// Evaluate every feature and collect, per correspondence variable, the
    /// weight indices of the slots whose features are all `True`.
    ///
    /// Language and static symbol features already evaluated through
    /// another factor against the same world keep their value. Dynamic symbol features are always
    /// evaluated, and CV features are evaluated once per correspondence
    /// variable.
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate(
        &self,
        pool: &mut FeaturePool,
        cvs: &[String],
        symbol: &Symbol,
        language_variable: &LanguageVariable,
        world: &WorldDcg,
        expressed: &mut ExpressedFeatures,
        debug: bool,
    ) -> Result<IndicesByCv, FeatureError> {
        let mut indices = IndicesByCv::new();
        let Some(first_cv) = cvs.first() else {
            return Ok(indices);
        };
        pool.enter_world(world.id());

        for category in [
            FeatureCategory::Language,
            FeatureCategory::StaticSymbol,
            FeatureCategory::DynamicSymbol,
        ] {
            for id in self.features(category) {
                let shared = category != FeatureCategory::DynamicSymbol;
                if shared && pool.value(id)?.is_known() {
                    continue;
                }
                let value = pool.evaluate(id, first_cv, language_variable, world, symbol)?;
                if debug {
                    let feature = pool.key(id)?;
                    tracing::debug!(feature, ?value, "evaluated feature");
                }
            }
        }

        for cv in cvs {
            for id in self.features(FeatureCategory::Cv) {
                pool.evaluate(id, cv, language_variable, world, symbol)?;
            }

            let fired = indices.entry(cv.clone()).or_default();
            for (set, offset) in self.sets.iter().zip(&self.offsets) {
                for (slot, combination) in set.slots() {
                    if !all_true(pool, &combination)? {
                        continue;
                    }
                    let index = offset + slot;
                    fired.push(index);

                    let constituents = combination
                        .iter()
                        .map(|&id| pool.key(id).map(str::to_string))
                        .collect::<Result<Vec<_>, _>>()?;
                    let record = expressed.record(index, constituents, cv);
                    if debug {
                        tracing::debug!(cv = %cv, index, features = ?record.constituents, "expressed feature");
                    }
                }
            }
        }

        Ok(indices)
    }
}

fn all_true(pool: &FeaturePool, combination: &[FeatureId]) -> Result<bool, FeatureError> {
    for &id in combination {
        if !pool.value(id)?.is_true() {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::Range<usize>) -> Vec<FeatureId> {
        range.map(FeatureId::new).collect()
    }

    #[test]
    fn it_counts_product_slots_over_non_empty_categories() {
        let mut set = ConstituentFeatureSet::default();
        assert_eq!(set.num_slots(), 0);

        for id in ids(0..2) {
            set.push(FeatureCategory::Cv, id);
        }
        for id in ids(2..5) {
            set.push(FeatureCategory::StaticSymbol, id);
        }

        assert_eq!(set.num_features(), 5);
        assert_eq!(set.num_slots(), 6);
    }

    #[test]
    fn it_numbers_slots_with_the_last_category_fastest() {
        let mut set = ConstituentFeatureSet::default();
        set.push(FeatureCategory::Cv, FeatureId::new(0));
        set.push(FeatureCategory::Cv, FeatureId::new(1));
        set.push(FeatureCategory::Language, FeatureId::new(2));
        set.push(FeatureCategory::Language, FeatureId::new(3));

        let slots: Vec<_> = set.slots().collect();

        assert_eq!(
            slots,
            vec![
                (0, ids(0..1).into_iter().chain(ids(2..3)).collect()),
                (1, ids(0..1).into_iter().chain(ids(3..4)).collect()),
                (2, ids(1..3)),
                (3, ids(1..2).into_iter().chain(ids(3..4)).collect()),
            ]
        );
    }

    #[test]
    fn it_offsets_slots_of_later_sets() {
        let mut first = ConstituentFeatureSet::default();
        first.push(FeatureCategory::Cv, FeatureId::new(0));
        first.push(FeatureCategory::Cv, FeatureId::new(1));
        let mut second = ConstituentFeatureSet::default();
        second.push(FeatureCategory::Language, FeatureId::new(2));

        let set = FeatureSet::new(vec![first, second], vec![]);

        assert_eq!(set.offsets, vec![0, 2]);
        assert_eq!(set.num_constituent_features(), 3);
    }
}
