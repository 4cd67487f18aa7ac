use std::collections::BTreeMap;
use std::sync::Arc;

use grounding_language::{LanguageVariable, Symbol};
use grounding_world::WorldDcg;

use crate::{
    ExpressedFeatures, FeatureError, FeaturePool, FeatureSet, IndicesByCv, Llm, LlmError,
    TrainingExample,
};

/// One cell of the factor graph: a symbol, a language variable, and the
/// correspondence variables it is scored over.
#[derive(Debug)]
pub struct Factor {
    symbol: Arc<Symbol>,
    language_variable: Arc<LanguageVariable>,
    cvs: Vec<String>,
    feature_set: FeatureSet,
    indices: IndicesByCv,
    pygx: BTreeMap<String, f64>,
}

impl Factor {
    /// A factor over an already assembled feature set.
    pub fn new(
        symbol: Arc<Symbol>,
        language_variable: Arc<LanguageVariable>,
        cvs: Vec<String>,
        feature_set: FeatureSet,
    ) -> Self {
        Self {
            symbol,
            language_variable,
            cvs,
            feature_set,
            indices: IndicesByCv::new(),
            pygx: BTreeMap::new(),
        }
    }

    /// A factor whose feature set comes from `pool`, sharing instances with
    /// other factors of the same language variable or symbol.
    pub fn from_pool(
        symbol: Arc<Symbol>,
        language_variable: Arc<LanguageVariable>,
        cvs: Vec<String>,
        pool: &mut FeaturePool,
    ) -> Result<Self, FeatureError> {
        let feature_set = pool.feature_set(&language_variable, &symbol)?;
        Ok(Self::new(symbol, language_variable, cvs, feature_set))
    }

    /// The grounding candidate.
    pub fn symbol(&self) -> &Arc<Symbol> {
        &self.symbol
    }

    /// The phrase being grounded.
    pub fn language_variable(&self) -> &Arc<LanguageVariable> {
        &self.language_variable
    }

    /// The correspondence variables this factor is scored over.
    pub fn cvs(&self) -> &[String] {
        &self.cvs
    }

    /// The factor's feature handles.
    pub fn feature_set(&self) -> &FeatureSet {
        &self.feature_set
    }

    /// Evaluate the feature set, storing and returning the fired indices
    /// per correspondence variable.
    pub fn evaluate(
        &mut self,
        pool: &mut FeaturePool,
        world: &WorldDcg,
        expressed: &mut ExpressedFeatures,
        debug: bool,
    ) -> Result<&IndicesByCv, FeatureError> {
        self.indices = self.feature_set.evaluate(
            pool,
            &self.cvs,
            &self.symbol,
            &self.language_variable,
            world,
            expressed,
            debug,
        )?;
        Ok(&self.indices)
    }

    /// Indices from the last [`Factor::evaluate`].
    pub fn indices(&self) -> &IndicesByCv {
        &self.indices
    }

    /// Compute and store `p(cv | x)` for every correspondence variable.
    pub fn score(&mut self, llm: &Llm) -> Result<&BTreeMap<String, f64>, LlmError> {
        let mut pygx = BTreeMap::new();
        for cv in &self.cvs {
            pygx.insert(cv.clone(), llm.pygx(cv, &self.indices, false)?.prob);
        }
        self.pygx = pygx;
        Ok(&self.pygx)
    }

    /// The probability of `cv` from the last [`Factor::score`].
    pub fn value(&self, cv: &str) -> Option<f64> {
        self.pygx.get(cv).copied()
    }

    /// A training example labelling this factor's evaluation with `cv`.
    pub fn training_example(&self, cv: impl Into<String>) -> TrainingExample {
        TrainingExample::new(cv, self.indices.clone())
    }

    /// Return the factor's per-factor feature duplicates to `pool`.
    pub fn release(self, pool: &mut FeaturePool) {
        pool.release(self.feature_set);
    }
}
