use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use super::{Model, format_weights, parse_weights};
use crate::{Attributes, CLASS, ParseError};

const MODEL: &str = "model";
const FEATURE_POOL: &str = "feature-pool";
const CONSTITUENT_FEATURE_SET: &str = "constituent-feature-set";
const FEATURE: &str = "feature";
const LLM: &str = "llm";
const WEIGHTS: &str = "weights";

fn xml_error(error: impl std::fmt::Display) -> ParseError {
    ParseError::Xml(error.to_string())
}

fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

fn attributes_of(element: &BytesStart<'_>) -> Result<Attributes, ParseError> {
    let mut attributes = Attributes::default();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        let name = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(xml_error)?;
        attributes.insert(&name, value);
    }
    Ok(attributes)
}

/// Accumulates a [`Model`] from reader events.
#[derive(Default)]
struct ModelReader {
    sets: Option<Vec<Vec<Attributes>>>,
    current: Option<Vec<Attributes>>,
    in_pool: bool,
    weights: Option<Vec<f64>>,
}

impl ModelReader {
    fn open(&mut self, element: &BytesStart<'_>, empty: bool) -> Result<(), ParseError> {
        let name = element_name(element);
        match name.as_str() {
            MODEL => {}
            FEATURE_POOL if self.sets.is_none() => {
                self.sets = Some(Vec::new());
                self.in_pool = !empty;
            }
            FEATURE_POOL => {
                return Err(ParseError::UnexpectedElement {
                    element: name,
                    context: "after the first <feature-pool>",
                });
            }
            CONSTITUENT_FEATURE_SET if self.in_pool && self.current.is_none() => {
                if empty {
                    self.sets.get_or_insert_with(Vec::new).push(Vec::new());
                } else {
                    self.current = Some(Vec::new());
                }
            }
            FEATURE => match &mut self.current {
                Some(set) => set.push(attributes_of(element)?),
                None => {
                    return Err(ParseError::UnexpectedElement {
                        element: name,
                        context: "outside <constituent-feature-set>",
                    });
                }
            },
            LLM if self.in_pool => {
                return Err(ParseError::UnexpectedElement {
                    element: name,
                    context: "inside <feature-pool>",
                });
            }
            LLM if self.weights.is_some() => {
                return Err(ParseError::UnexpectedElement {
                    element: name,
                    context: "after the first <llm>",
                });
            }
            LLM => {
                let attributes = attributes_of(element)?;
                let weights = attributes.required(LLM, WEIGHTS)?;
                self.weights = Some(parse_weights(weights)?);
            }
            _ => {
                return Err(ParseError::UnexpectedElement {
                    element: name,
                    context: "in model document",
                });
            }
        }
        Ok(())
    }

    fn close(&mut self, element: &BytesEnd<'_>) {
        match element.name().as_ref() {
            name if name == CONSTITUENT_FEATURE_SET.as_bytes() => {
                if let Some(set) = self.current.take() {
                    self.sets.get_or_insert_with(Vec::new).push(set);
                }
            }
            name if name == FEATURE_POOL.as_bytes() => self.in_pool = false,
            _ => {}
        }
    }

    fn finish(self) -> Result<Model, ParseError> {
        let constituent_feature_sets = self.sets.ok_or(ParseError::MissingElement(FEATURE_POOL))?;
        Ok(Model {
            constituent_feature_sets,
            weights: self.weights,
        })
    }
}

pub(super) fn read(document: &str) -> Result<Model, ParseError> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);
    let mut model = ModelReader::default();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(element) => model.open(&element, false)?,
            Event::Empty(element) => model.open(&element, true)?,
            Event::End(element) => model.close(&element),
            Event::Eof => break,
            _ => {}
        }
    }

    model.finish()
}

pub(super) fn write(model: &Model) -> Result<String, ParseError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Start(BytesStart::new(MODEL)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Start(BytesStart::new(FEATURE_POOL)))
        .map_err(xml_error)?;

    for set in &model.constituent_feature_sets {
        writer
            .write_event(Event::Start(BytesStart::new(CONSTITUENT_FEATURE_SET)))
            .map_err(xml_error)?;
        for attributes in set {
            let mut feature = BytesStart::new(FEATURE);
            if let Some(class) = attributes.class() {
                feature.push_attribute((CLASS, class));
            }
            for (name, value) in attributes.iter().filter(|(name, _)| *name != CLASS) {
                feature.push_attribute((name, value));
            }
            writer.write_event(Event::Empty(feature)).map_err(xml_error)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(CONSTITUENT_FEATURE_SET)))
            .map_err(xml_error)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(FEATURE_POOL)))
        .map_err(xml_error)?;

    if let Some(weights) = &model.weights {
        let weights = format_weights(weights);
        let mut llm = BytesStart::new(LLM);
        llm.push_attribute((WEIGHTS, weights.as_str()));
        writer.write_event(Event::Empty(llm)).map_err(xml_error)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(MODEL)))
        .map_err(xml_error)?;

    String::from_utf8(writer.into_inner()).map_err(xml_error)
}
