use anyhow::Result;
use grounding_language::{AXIS, LanguageVariable, SPATIAL_RELATION, Symbol};
use grounding_model::{FeatureError, Llm};
use grounding_search::{Dcg, SearchConfig, SearchError, SymbolDictionary, SymbolSpace};
use grounding_world::{OBJECT_TYPE, Object, World, WorldDcg};
use pretty_assertions::assert_eq;

// Slot weights come in (false, true) pairs, one pair per constituent set:
// a bias towards `false`, then "box", "ball", "right", the landmark of a
// prepositional phrase and the object related to it.
const MODEL: &str = r#"{
    "feature-pool": {"constituent-feature-sets": [
        [{"class": "cv", "cv": "false"}, {"class": "cv", "cv": "true"}],
        [
            {"class": "cv", "cv": "false"}, {"class": "cv", "cv": "true"},
            {"class": "word", "word": "box"},
            {"class": "symbol_attribute_value", "symbol_type": "object",
             "attribute_type": "object_type", "attribute_value": "box", "invert": "false"}
        ],
        [
            {"class": "cv", "cv": "false"}, {"class": "cv", "cv": "true"},
            {"class": "word", "word": "ball"},
            {"class": "symbol_attribute_value", "symbol_type": "object",
             "attribute_type": "object_type", "attribute_value": "ball", "invert": "false"}
        ],
        [
            {"class": "cv", "cv": "false"}, {"class": "cv", "cv": "true"},
            {"class": "word", "word": "right"},
            {"class": "symbol_attribute_value", "symbol_type": "spatial_relation",
             "attribute_type": "axis", "attribute_value": "+x", "invert": "false"}
        ],
        [
            {"class": "cv", "cv": "false"}, {"class": "cv", "cv": "true"},
            {"class": "language_variable_type", "type": "PP"},
            {"class": "symbol_matches_child", "symbol_type": "object", "invert": "false"}
        ],
        [
            {"class": "cv", "cv": "false"}, {"class": "cv", "cv": "true"},
            {"class": "child_connection", "edge_label": "nmod", "child_type": "PP"},
            {"class": "object_spatially_related_to_child", "edge_label": "nmod", "invert": "false"}
        ]
    ]},
    "llm": {"weights": "2,-2,-1,1,-5,5,-5,5,-5,5,-5,5"}
}"#;

fn world() -> WorldDcg {
    [
        Object::new("box1").with_property(OBJECT_TYPE, "box").at(1.0, 0.0, 0.0),
        Object::new("ball1").with_property(OBJECT_TYPE, "ball").at(2.0, 0.0, 0.0),
        Object::new("box2").with_property(OBJECT_TYPE, "box").at(3.0, 0.0, 0.0),
    ]
    .into_iter()
    .collect::<World>()
    .into()
}

fn the_box_right_of_the_ball() -> LanguageVariable {
    LanguageVariable::new("NP").with_text("the box").with_labelled_child(
        "nmod",
        LanguageVariable::new("PP")
            .with_text("right of")
            .with_labelled_child("pobj", LanguageVariable::new("NP").with_text("the ball")),
    )
}

fn right() -> Symbol {
    Symbol::new(SPATIAL_RELATION).with_property(AXIS, "+x")
}

#[test_log::test]
fn it_grounds_a_phrase_through_its_children() -> Result<()> {
    let mut llm = Llm::from_json_str(MODEL)?;
    let world = world();
    let dictionary = SymbolDictionary::new().with(SPATIAL_RELATION, AXIS, ["+x", "-x"]);
    let symbols = SymbolSpace::new(&world, &dictionary);
    assert_eq!(symbols.len(), 5);

    let mut dcg = Dcg::new(&mut llm, &world, &symbols, SearchConfig::default());
    let solutions = dcg.search(&the_box_right_of_the_ball())?;
    assert_eq!(solutions.len(), 4);
    assert!(!dcg.expressed_features().is_empty());

    let best = &solutions[0];
    assert_eq!(best.language_variable_type, "NP");
    assert_eq!(best.grounding_keys(), vec![Symbol::object("box2").key()]);

    let relation = &best.children[0];
    assert_eq!(relation.language_variable_type, "PP");
    assert_eq!(
        relation.grounding_keys(),
        vec![Symbol::object("ball1").key(), right().key()]
    );

    let landmark = &relation.children[0];
    assert_eq!(landmark.grounding_keys(), vec![Symbol::object("ball1").key()]);
    assert!(landmark.children.is_empty());

    assert!(best.log_probability > solutions[1].log_probability);
    assert!(best.log_probability < relation.log_probability);
    assert!(best.probability() > 0.0 && best.probability() < 1.0);
    Ok(())
}

#[test]
fn it_gives_the_same_answer_on_every_search() -> Result<()> {
    let mut llm = Llm::from_json_str(MODEL)?;
    let world = world();
    let dictionary = SymbolDictionary::new().with(SPATIAL_RELATION, AXIS, ["+x", "-x"]);
    let symbols = SymbolSpace::new(&world, &dictionary);
    let root = the_box_right_of_the_ball();

    let mut dcg = Dcg::new(&mut llm, &world, &symbols, SearchConfig::default());
    let first = dcg.search(&root)?;
    let second = dcg.search(&root)?;

    assert_eq!(first, second);
    Ok(())
}

#[test]
fn it_surfaces_malformed_relations_as_feature_errors() -> Result<()> {
    let mut llm = Llm::from_json_str(MODEL)?;
    let world = world();
    let dictionary = SymbolDictionary::new().with(SPATIAL_RELATION, AXIS, ["sideways"]);
    let symbols = SymbolSpace::new(&world, &dictionary);
    let config = SearchConfig {
        beam_width: 64,
        ..SearchConfig::default()
    };

    let result = Dcg::new(&mut llm, &world, &symbols, config).search(&the_box_right_of_the_ball());

    assert!(matches!(
        result,
        Err(SearchError::Feature(FeatureError::MalformedProperty { property, .. })) if property == AXIS
    ));
    Ok(())
}

#[test]
fn it_loads_configuration_and_dictionaries_from_files() -> Result<()> {
    let directory = tempfile::tempdir()?;
    let config_path = directory.path().join("search.json");
    let dictionary_path = directory.path().join("symbols.json");
    std::fs::write(&config_path, r#"{"beam_width": 2, "debug": true}"#)?;
    std::fs::write(&dictionary_path, r#"{"spatial_relation": {"axis": ["+x"]}}"#)?;

    let config = SearchConfig::load(&config_path)?;
    let dictionary = SymbolDictionary::load(&dictionary_path)?;
    let mut llm = Llm::from_json_str(MODEL)?;
    let world = world();
    let symbols = SymbolSpace::new(&world, &dictionary);

    let solutions = Dcg::new(&mut llm, &world, &symbols, config).search(&the_box_right_of_the_ball())?;

    assert_eq!(solutions.len(), 2);
    assert_eq!(solutions[0].grounding_keys(), vec![Symbol::object("box2").key()]);
    assert!(matches!(
        SearchConfig::load(directory.path().join("absent.json")),
        Err(SearchError::Io { .. })
    ));
    Ok(())
}
