//! Country metadata: the entity and variable catalogs.
//!
//! Metadata is loaded once per session by an external collaborator and is
//! read-only afterwards. This module only defines its shape and parses it
//! from the metadata service's JSON.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::EntityDescriptor;
use crate::error::MetadataError;
use crate::value::Value;

/// Declared type of a variable's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "Enum")]
    Enum,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "str")]
    Str,
}

impl Default for ValueType {
    fn default() -> Self {
        Self::Float
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Enum => write!(f, "Enum"),
            Self::Float => write!(f, "float"),
            Self::Int => write!(f, "int"),
            Self::Str => write!(f, "str"),
        }
    }
}

/// One choice of an enumerated variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PossibleValue {
    pub value: Value,
    pub label: String,
}

/// Catalog entry for one simulation variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableInfo {
    /// Unique key. Filled from the metadata map key when absent.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub value_type: ValueType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possible_values: Option<Vec<PossibleValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,

    /// Name of the owning entity kind.
    pub entity: String,

    #[serde(default)]
    pub is_input_variable: bool,

    #[serde(default, rename = "hidden_input")]
    pub hidden_input: bool,

    /// Dotted module path, e.g. `household.expense.housing.rent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
}

impl VariableInfo {
    /// Creates an input variable owned by `entity`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        entity: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            value_type,
            unit: None,
            default_value: None,
            possible_values: None,
            documentation: None,
            entity: entity.into(),
            is_input_variable: true,
            hidden_input: false,
            module_name: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_module(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = Some(module_name.into());
        self
    }

    #[must_use]
    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }

    #[must_use]
    pub fn with_possible_values(mut self, values: Vec<PossibleValue>) -> Self {
        self.possible_values = Some(values);
        self
    }

    /// Marks the variable as computed-only.
    #[must_use]
    pub fn computed(mut self) -> Self {
        self.is_input_variable = false;
        self
    }

    /// The value a freshly added variable starts with.
    #[must_use]
    pub fn initial_value(&self) -> Value {
        self.default_value.clone().unwrap_or_default()
    }

    /// Category segments of the module path, without the trailing module
    /// file. `gov.irs.credits.heat_pump` yields `["gov", "irs", "credits"]`.
    #[must_use]
    pub fn category_path(&self) -> Vec<&str> {
        let Some(module) = self.module_name.as_deref() else {
            return Vec::new();
        };
        let mut segments: Vec<&str> = module.split('.').filter(|s| !s.is_empty()).collect();
        segments.pop();
        segments
    }
}

#[derive(Deserialize)]
struct RawCountryMetadata {
    #[serde(default)]
    variables: IndexMap<String, VariableInfo>,
    #[serde(default)]
    entities: IndexMap<String, EntityDescriptor>,
    #[serde(default, rename = "basicInputs")]
    basic_inputs: Vec<String>,
}

impl From<RawCountryMetadata> for CountryMetadata {
    fn from(raw: RawCountryMetadata) -> Self {
        let mut metadata = Self {
            variables: raw.variables,
            entities: raw.entities,
            basic_inputs: raw.basic_inputs,
        };
        for (name, entity) in &mut metadata.entities {
            entity.finish(name);
        }
        for (name, variable) in &mut metadata.variables {
            if variable.name.is_empty() {
                variable.name.clone_from(name);
            }
        }
        metadata
    }
}

/// Entity and variable catalogs for one country.
///
/// # Examples
///
/// ```
/// use policysim::{CountryMetadata, EntityDescriptor, ValueType, VariableInfo};
///
/// let metadata = CountryMetadata::new()
///     .with_entity(EntityDescriptor::person())
///     .with_variable(VariableInfo::new("age", "Age", "person", ValueType::Int).with_default(0));
///
/// assert!(metadata.variable("age").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCountryMetadata")]
pub struct CountryMetadata {
    pub variables: IndexMap<String, VariableInfo>,
    pub entities: IndexMap<String, EntityDescriptor>,
    #[serde(rename = "basicInputs")]
    pub basic_inputs: Vec<String>,
}

impl CountryMetadata {
    /// Creates empty catalogs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses metadata from the metadata service's JSON.
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts an already-parsed JSON document.
    pub fn from_value(value: serde_json::Value) -> Result<Self, MetadataError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Adds or replaces an entity, keyed by its name.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityDescriptor) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Adds or replaces a variable, keyed by its name.
    #[must_use]
    pub fn with_variable(mut self, variable: VariableInfo) -> Self {
        self.variables.insert(variable.name.clone(), variable);
        self
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&VariableInfo> {
        self.variables.get(name)
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }

    /// True when either catalog is missing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() || self.entities.is_empty()
    }

    /// Reports the first variable whose owning entity is not in the entity
    /// catalog.
    pub fn check(&self) -> Result<(), MetadataError> {
        match self
            .variables
            .values()
            .find(|v| !self.entities.contains_key(&v.entity))
        {
            Some(v) => Err(MetadataError::UnknownEntity {
                variable: v.name.clone(),
                entity: v.entity.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA_JSON: &str = r#"{
        "variables": {
            "age": {
                "name": "age",
                "label": "Age",
                "entity": "person",
                "valueType": "int",
                "unit": null,
                "defaultValue": 0,
                "isInputVariable": true,
                "hidden_input": false,
                "moduleName": "demographics.age",
                "documentation": "Age of the person in years"
            },
            "state_name": {
                "label": "State",
                "entity": "household",
                "valueType": "Enum",
                "defaultValue": "CA",
                "isInputVariable": true,
                "moduleName": "geography.state_name",
                "possibleValues": [
                    { "value": "CA", "label": "California" },
                    { "value": "NY", "label": "New York" }
                ]
            }
        },
        "entities": {
            "person": { "label": "Person", "plural": "people", "is_person": true },
            "household": { "label": "Household", "plural": "households" }
        },
        "basicInputs": ["age", "state_name"]
    }"#;

    #[test]
    fn test_from_json_fills_names() {
        let metadata = CountryMetadata::from_json(METADATA_JSON).unwrap();
        assert_eq!(metadata.variable("state_name").unwrap().name, "state_name");
        assert_eq!(metadata.entity("household").unwrap().name, "household");
        assert!(metadata.entity("person").unwrap().is_person);
        assert!(!metadata.entity("household").unwrap().is_person);
        assert_eq!(metadata.basic_inputs, vec!["age", "state_name"]);
    }

    #[test]
    fn test_from_json_reads_variable_fields() {
        let metadata = CountryMetadata::from_json(METADATA_JSON).unwrap();
        let age = metadata.variable("age").unwrap();
        assert_eq!(age.value_type, ValueType::Int);
        assert_eq!(age.default_value, Some(Value::Int(0)));
        assert!(age.unit.is_none());
        assert!(age.is_input_variable);

        let state = metadata.variable("state_name").unwrap();
        assert_eq!(state.value_type, ValueType::Enum);
        assert_eq!(state.possible_values.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_from_json_rejects_malformed_document() {
        let err = CountryMetadata::from_json("{\"variables\": 3}").unwrap_err();
        assert!(matches!(err, MetadataError::Parse { .. }));
    }

    #[test]
    fn test_empty_document_is_empty_catalog() {
        let metadata = CountryMetadata::from_json("{}").unwrap();
        assert!(metadata.is_empty());
        assert!(metadata.check().is_ok());
    }

    #[test]
    fn test_check_reports_unknown_entity() {
        let metadata = CountryMetadata::new()
            .with_entity(EntityDescriptor::person())
            .with_variable(VariableInfo::new("foo", "Foo", "mystery_unit", ValueType::Float));
        let err = metadata.check().unwrap_err();
        assert!(matches!(
            err,
            MetadataError::UnknownEntity { ref variable, ref entity }
                if variable == "foo" && entity == "mystery_unit"
        ));
    }

    #[test]
    fn test_category_path_drops_module_file() {
        let var = VariableInfo::new("x", "X", "tax_unit", ValueType::Float)
            .with_module("gov.irs.credits.heat_pump");
        assert_eq!(var.category_path(), vec!["gov", "irs", "credits"]);

        let flat = VariableInfo::new("y", "Y", "person", ValueType::Float).with_module("age");
        assert!(flat.category_path().is_empty());
    }

    #[test]
    fn test_initial_value_defaults_to_null() {
        let var = VariableInfo::new("x", "X", "person", ValueType::Float);
        assert_eq!(var.initial_value(), Value::Null);
        assert_eq!(var.with_default(0).initial_value(), Value::Int(0));
    }
}
