use anyhow::Result;
use grounding_model::{Llm, LlmError, Model, ParseError};
use pretty_assertions::assert_eq;

const MODEL_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model>
  <feature-pool>
    <constituent-feature-set>
      <feature class="cv" cv="false"/>
      <feature class="cv" cv="true"/>
      <feature class="word" word="box"/>
      <feature class="word" word="ball"/>
    </constituent-feature-set>
    <constituent-feature-set>
      <feature class="cv" cv="true"/>
      <feature class="symbol_attribute_value" symbol_type="object" attribute_type="object_type" attribute_value="box" invert="false"/>
      <feature class="object_spatially_related_to_child" edge_label="nmod" invert="false"/>
    </constituent-feature-set>
  </feature-pool>
  <llm weights="0.1,0.2,0.3,0.4,1.5"/>
</model>"#;

#[test]
fn it_loads_a_model_from_xml() -> Result<()> {
    let llm = Llm::from_xml_str(MODEL_XML)?;

    assert_eq!(llm.feature_pool().num_template_features(), 7);
    assert_eq!(llm.feature_pool().num_constituent_features(), 5);
    assert_eq!(llm.weights(), &[0.1, 0.2, 0.3, 0.4, 1.5]);
    Ok(())
}

#[test_log::test]
fn it_saves_and_reloads_in_either_format() -> Result<()> {
    let directory = tempfile::tempdir()?;
    let llm = Llm::from_xml_str(MODEL_XML)?;

    for name in ["model.xml", "model.json"] {
        let path = directory.path().join(name);
        llm.save(&path)?;
        let reloaded = Llm::load(&path)?;

        assert_eq!(reloaded.weights(), llm.weights());
        assert_eq!(
            reloaded.feature_pool().template_attributes(),
            llm.feature_pool().template_attributes()
        );
    }
    Ok(())
}

#[test]
fn it_defaults_missing_weights_to_zero() -> Result<()> {
    let llm = Llm::from_json_str(
        r#"{"feature-pool": {"constituent-feature-sets": [[
            {"class": "cv", "cv": "true"},
            {"class": "symbol_type", "symbol_type": "object"},
            {"class": "object_is_unique", "invert": "false"}
        ]]}}"#,
    )?;

    assert_eq!(llm.weights(), &[0.0, 0.0]);
    Ok(())
}

#[test]
fn it_rejects_bad_feature_definitions() {
    let unknown = r#"<model><feature-pool><constituent-feature-set>
        <feature class="telepathy"/>
    </constituent-feature-set></feature-pool></model>"#;
    let missing = r#"<model><feature-pool><constituent-feature-set>
        <feature class="symbol_attribute_value" symbol_type="object" attribute_type="color" invert="false"/>
    </constituent-feature-set></feature-pool></model>"#;
    let malformed = r#"<model><feature-pool><constituent-feature-set>
        <feature class="object_is_unique" invert="yes"/>
    </constituent-feature-set></feature-pool></model>"#;

    assert!(matches!(
        Llm::from_xml_str(unknown),
        Err(ParseError::UnknownFeatureClass(class)) if class == "telepathy"
    ));
    assert!(matches!(
        Llm::from_xml_str(missing),
        Err(ParseError::MissingAttribute { class, attribute })
            if class == "symbol_attribute_value" && attribute == "attribute_value"
    ));
    assert!(matches!(
        Llm::from_xml_str(malformed),
        Err(ParseError::InvalidAttribute { attribute, .. }) if attribute == "invert"
    ));
}

#[test]
fn it_rejects_weights_that_do_not_fit_the_pool() {
    let document = MODEL_XML.replace("0.1,0.2,0.3,0.4,1.5", "0.1,0.2");

    assert!(matches!(
        Llm::from_xml_str(&document),
        Err(ParseError::Llm(LlmError::WeightCount { expected: 5, found: 2 }))
    ));
}

#[test]
fn it_reports_unreadable_paths() {
    let directory = tempfile::tempdir().unwrap();

    assert!(matches!(
        Model::load(directory.path().join("absent.xml")),
        Err(ParseError::Io { .. })
    ));
    assert!(matches!(
        Model::load(directory.path().join("model.toml")),
        Err(ParseError::UnsupportedFormat(_))
    ));
}
