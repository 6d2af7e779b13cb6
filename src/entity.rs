//! Entity kinds a household can contain.
//!
//! Entities are grouping units (person, tax unit, SPM unit, family, marital
//! unit, household) that own their own variable values. Country metadata
//! describes them; the household record stores each kind under a storage
//! key derived from its plural.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage key of the person collection inside a household record.
pub const PEOPLE_KEY: &str = "people";

/// Description of one entity kind, as supplied by country metadata.
///
/// # Examples
///
/// ```
/// use policysim::EntityDescriptor;
///
/// let tax_unit = EntityDescriptor::group("tax_unit", "tax_units", "Tax Unit");
/// assert_eq!(tax_unit.storage_key(), "taxUnits");
/// assert!(!tax_unit.is_person);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Entity name, e.g. `tax_unit`. Filled from the metadata map key.
    #[serde(default)]
    pub name: String,

    pub plural: String,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub is_person: bool,
}

impl EntityDescriptor {
    /// The person entity.
    #[must_use]
    pub fn person() -> Self {
        Self::new("person", PEOPLE_KEY, "Person", true)
    }

    /// A non-person (group) entity.
    #[must_use]
    pub fn group(
        name: impl Into<String>,
        plural: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self::new(name, plural, label, false)
    }

    fn new(
        name: impl Into<String>,
        plural: impl Into<String>,
        label: impl Into<String>,
        is_person: bool,
    ) -> Self {
        Self {
            name: name.into(),
            plural: plural.into(),
            label: label.into(),
            is_person,
        }
    }

    /// Completes a descriptor deserialized from a metadata map entry.
    ///
    /// The `person` entity is always a person, whatever its flag says.
    pub(crate) fn finish(&mut self, name: &str) {
        if self.name.is_empty() {
            self.name = name.to_string();
        }
        self.is_person |= self.name == "person";
    }

    /// Key under which instances of this entity live in a household record.
    #[must_use]
    pub fn storage_key(&self) -> String {
        storage_key(&self.plural)
    }
}

impl fmt::Display for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Maps an entity plural to its household storage key.
///
/// Metadata spells plurals in snake case (`tax_units`) while household
/// records use camel case (`taxUnits`). Already camel-cased plurals map to
/// themselves.
#[must_use]
pub fn storage_key(plural: &str) -> String {
    let mut key = String::with_capacity(plural.len());
    let mut upper_next = false;
    for c in plural.chars() {
        if c == '_' {
            upper_next = !key.is_empty();
        } else if upper_next {
            key.extend(c.to_uppercase());
            upper_next = false;
        } else {
            key.push(c);
        }
    }
    key
}

/// Display name of the conventional single instance of an entity kind.
#[must_use]
pub fn group_name(plural: &str) -> String {
    let name = match storage_key(plural).as_str() {
        "people" => "you",
        "households" | "spmUnits" => "your household",
        "taxUnits" => "your tax unit",
        "families" => "your family",
        "maritalUnits" => "your marital unit",
        "benunits" => "your benefit unit",
        _ => return plural.to_string(),
    };
    name.to_string()
}
