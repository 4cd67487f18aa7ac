use std::sync::Arc;

use grounding_language::{LanguageVariable, Symbol};
use grounding_model::{ExpressedFeatures, Factor, Llm};
use grounding_world::WorldDcg;
use itertools::Itertools;

use crate::{SearchConfig, SearchResult, SymbolSpace};

/// A grounding of one language variable and, recursively, its children.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Type of the grounded language variable.
    pub language_variable_type: String,
    /// Symbols assigned the true correspondence variable, in symbol space
    /// order.
    pub groundings: Vec<Arc<Symbol>>,
    /// Log probability of this grounding and every child grounding.
    pub log_probability: f64,
    /// One solution per child connection, in child order.
    pub children: Vec<Solution>,
}

impl Solution {
    /// The solution's probability.
    pub fn probability(&self) -> f64 {
        self.log_probability.exp()
    }

    /// Keys of the grounded symbols.
    pub fn grounding_keys(&self) -> Vec<String> {
        self.groundings.iter().map(|symbol| symbol.key()).collect()
    }
}

#[derive(Clone)]
struct Partial {
    groundings: Vec<Arc<Symbol>>,
    log_probability: f64,
}

/// Beam search over the distributed correspondence graph.
///
/// Each language variable gets one factor per candidate symbol. Factors for
/// a parent are built only after its children have been solved, so dynamic
/// features see the children's groundings.
pub struct Dcg<'a> {
    llm: &'a mut Llm,
    world: &'a WorldDcg,
    symbols: &'a SymbolSpace,
    config: SearchConfig,
    expressed: ExpressedFeatures,
}

impl<'a> Dcg<'a> {
    /// A search of `symbols` in `world`, scored by `llm`.
    pub fn new(
        llm: &'a mut Llm,
        world: &'a WorldDcg,
        symbols: &'a SymbolSpace,
        config: SearchConfig,
    ) -> Self {
        Self {
            llm,
            world,
            symbols,
            config,
            expressed: ExpressedFeatures::new(),
        }
    }

    /// The search configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Slots that fired in any factor of any search so far.
    pub fn expressed_features(&self) -> &ExpressedFeatures {
        &self.expressed
    }

    /// The best groundings of `root`, most probable first, at most
    /// `beam_width` of them.
    ///
    /// Feature instances from earlier searches are discarded first.
    pub fn search(&mut self, root: &LanguageVariable) -> SearchResult<Vec<Solution>> {
        self.config.validate()?;
        self.llm.feature_pool_mut().reset();

        tracing::info!(
            nodes = root.size(),
            symbols = self.symbols.len(),
            beam_width = self.config.beam_width,
            "starting search"
        );
        let solutions = self.solve(root)?;
        tracing::info!(
            solutions = solutions.len(),
            best = solutions.first().map(|solution| solution.log_probability),
            instances = self.llm.feature_pool().num_instances(),
            "finished search"
        );
        Ok(solutions)
    }

    fn solve(&mut self, language_variable: &LanguageVariable) -> SearchResult<Vec<Solution>> {
        let child_beams = language_variable
            .children
            .iter()
            .map(|connection| self.solve(&connection.child))
            .collect::<SearchResult<Vec<_>>>()?;

        let combinations: Vec<Vec<&Solution>> = if child_beams.is_empty() {
            vec![Vec::new()]
        } else {
            child_beams
                .iter()
                .map(|beam| beam.iter())
                .multi_cartesian_product()
                .collect()
        };

        let mut solutions = Vec::new();
        for combination in &combinations {
            let groundings: Vec<Vec<Arc<Symbol>>> = combination
                .iter()
                .map(|child| child.groundings.clone())
                .collect();
            let grounded = Arc::new(language_variable.with_child_groundings(&groundings)?);
            let log_probability = combination
                .iter()
                .map(|child| child.log_probability)
                .sum();

            let children: Vec<Solution> = combination.iter().map(|&child| child.clone()).collect();
            for partial in self.assign(&grounded, log_probability)? {
                solutions.push(Solution {
                    language_variable_type: language_variable.kind.clone(),
                    groundings: partial.groundings,
                    log_probability: partial.log_probability,
                    children: children.clone(),
                });
            }
        }

        solutions.sort_by(|a, b| b.log_probability.total_cmp(&a.log_probability));
        solutions.truncate(self.config.beam_width);

        tracing::debug!(
            language_variable = %language_variable.key(),
            combinations = combinations.len(),
            beam = solutions.len(),
            "solved language variable"
        );
        Ok(solutions)
    }

    /// Score every symbol against `language_variable`, expanding the beam of
    /// partial assignments by each correspondence variable.
    fn assign(
        &mut self,
        language_variable: &Arc<LanguageVariable>,
        log_probability: f64,
    ) -> SearchResult<Vec<Partial>> {
        let symbols = self.symbols;
        let world = self.world;
        let mut beam = vec![Partial {
            groundings: Vec::new(),
            log_probability,
        }];

        for symbol in symbols.iter() {
            let mut factor = Factor::from_pool(
                symbol.clone(),
                language_variable.clone(),
                self.config.cvs.clone(),
                self.llm.feature_pool_mut(),
            )?;
            factor.evaluate(
                self.llm.feature_pool_mut(),
                world,
                &mut self.expressed,
                self.config.debug,
            )?;
            let scores: Vec<(String, f64)> = factor
                .score(&*self.llm)?
                .iter()
                .map(|(cv, probability)| (cv.clone(), probability.ln()))
                .collect();
            factor.release(self.llm.feature_pool_mut());

            let mut next = Vec::with_capacity(beam.len() * scores.len());
            for partial in &beam {
                for (cv, score) in &scores {
                    let mut extended = partial.clone();
                    extended.log_probability += score;
                    if *cv == self.config.true_cv {
                        extended.groundings.push(symbol.clone());
                    }
                    next.push(extended);
                }
            }
            next.sort_by(|a, b| b.log_probability.total_cmp(&a.log_probability));
            next.truncate(self.config.beam_width);
            beam = next;
        }
        Ok(beam)
    }
}
