//! Fluent construction of household records.
//!
//! [`HouseholdBuilder`] edits a working copy of a household for one current
//! year. People join their country's default group instances as they are
//! added, so a household built here always satisfies the membership
//! invariant.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HouseholdError, PolicySimResult, ValidationError};
use crate::household::{GroupEntity, Household, PersonRecord, YearValues};
use crate::value::Value;

pub const TAX_UNITS: &str = "taxUnits";
pub const FAMILIES: &str = "families";
pub const SPM_UNITS: &str = "spmUnits";
pub const HOUSEHOLDS: &str = "households";
pub const MARITAL_UNITS: &str = "maritalUnits";
pub const BENUNITS: &str = "benunits";

/// Shared marital unit of the adults in a US household.
pub const ADULT_MARITAL_UNIT: &str = "your marital unit";

const CHILD_MARITAL_UNIT_SUFFIX: &str = "'s marital unit";

/// Countries with a built-in household profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountryId {
    Us,
    Uk,
    Ca,
    Ng,
    Il,
}

impl CountryId {
    pub const ALL: [Self; 5] = [Self::Us, Self::Uk, Self::Ca, Self::Ng, Self::Il];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Us => "us",
            Self::Uk => "uk",
            Self::Ca => "ca",
            Self::Ng => "ng",
            Self::Il => "il",
        }
    }

    /// Group entity kinds an empty household of this country starts with.
    #[must_use]
    pub const fn default_entities(self) -> &'static [&'static str] {
        match self {
            Self::Us => &[FAMILIES, TAX_UNITS, SPM_UNITS, HOUSEHOLDS, MARITAL_UNITS],
            Self::Uk => &[BENUNITS, HOUSEHOLDS],
            Self::Ca | Self::Ng | Self::Il => &[HOUSEHOLDS],
        }
    }
}

impl fmt::Display for CountryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountryId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownCountry {
                value: s.to_string(),
            })
    }
}

/// A variable value handed to the builder: a scalar stored under the
/// current year, or an already year-keyed map stored as is.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableInput {
    Scalar(Value),
    ByYear(YearValues),
}

impl VariableInput {
    fn into_year_values(self, year: &str) -> YearValues {
        match self {
            Self::Scalar(value) => {
                let mut values = YearValues::new();
                values.insert(year.to_string(), value);
                values
            }
            Self::ByYear(values) => values,
        }
    }
}

impl From<Value> for VariableInput {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

impl From<YearValues> for VariableInput {
    fn from(values: YearValues) -> Self {
        Self::ByYear(values)
    }
}

impl From<bool> for VariableInput {
    fn from(b: bool) -> Self {
        Self::Scalar(b.into())
    }
}

impl From<i32> for VariableInput {
    fn from(n: i32) -> Self {
        Self::Scalar(n.into())
    }
}

impl From<i64> for VariableInput {
    fn from(n: i64) -> Self {
        Self::Scalar(n.into())
    }
}

impl From<f64> for VariableInput {
    fn from(x: f64) -> Self {
        Self::Scalar(x.into())
    }
}

impl From<&str> for VariableInput {
    fn from(s: &str) -> Self {
        Self::Scalar(s.into())
    }
}

/// Checks that `year` is exactly four ASCII digits.
pub fn validate_year(year: &str) -> Result<(), ValidationError> {
    static YEAR_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let valid = YEAR_PATTERN
        .get_or_init(|| Regex::new(r"^[0-9]{4}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(year));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidYear {
            value: year.to_string(),
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PersonKind {
    Adult,
    Child,
}

/// Builder for [`Household`] records.
///
/// # Examples
///
/// ```
/// use policysim::{CountryId, HouseholdBuilder};
///
/// let mut builder = HouseholdBuilder::new(CountryId::Us, "2025").unwrap();
/// builder.add_adult("you", 30, &[("employment_income", 50_000.into())]).unwrap();
/// builder.add_adult("your partner", 28, &[]).unwrap();
/// builder.set_marital_status("you", "your partner");
///
/// let household = builder.build();
/// assert_eq!(household.person_names(), vec!["you", "your partner"]);
/// assert_eq!(household.groups("taxUnits").unwrap()["your tax unit"].members.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct HouseholdBuilder {
    household: Household,
    current_year: String,
}

impl HouseholdBuilder {
    /// Starts an empty household with the country's default entity kinds.
    pub fn new(country: CountryId, current_year: &str) -> Result<Self, ValidationError> {
        validate_year(current_year)?;
        let mut household = Household::new(country.as_str());
        for key in country.default_entities() {
            household.groups_mut(key);
        }
        Ok(Self {
            household,
            current_year: current_year.to_string(),
        })
    }

    /// Starts from a copy of an existing household.
    pub fn from_household(
        household: &Household,
        current_year: &str,
    ) -> Result<Self, ValidationError> {
        validate_year(current_year)?;
        Ok(Self {
            household: household.clone(),
            current_year: current_year.to_string(),
        })
    }

    /// Replaces the working household with a copy of `household`.
    pub fn load_household(&mut self, household: &Household) -> &mut Self {
        self.household = household.clone();
        self
    }

    pub fn set_current_year(&mut self, year: &str) -> Result<&mut Self, ValidationError> {
        validate_year(year)?;
        self.current_year = year.to_string();
        Ok(self)
    }

    #[must_use]
    pub fn current_year(&self) -> &str {
        &self.current_year
    }

    /// Country profile of the working household, if it is a built-in one.
    #[must_use]
    pub fn country(&self) -> Option<CountryId> {
        self.household.country_id.parse().ok()
    }

    /// Adds an adult and returns its name.
    pub fn add_adult(
        &mut self,
        name: &str,
        age: u32,
        variables: &[(&str, VariableInput)],
    ) -> PolicySimResult<String> {
        self.insert_person(name, age, variables, PersonKind::Adult)
    }

    /// Adds a child and returns its name. US children are marked as tax
    /// unit dependents and get a marital unit of their own.
    pub fn add_child(
        &mut self,
        name: &str,
        age: u32,
        variables: &[(&str, VariableInput)],
    ) -> PolicySimResult<String> {
        self.insert_person(name, age, variables, PersonKind::Child)
    }

    /// Adds `count` children named `base` (when one) or `base 1`, `base 2`, ….
    pub fn add_children(
        &mut self,
        base: &str,
        count: usize,
        age: u32,
        variables: &[(&str, VariableInput)],
    ) -> PolicySimResult<Vec<String>> {
        (1..=count)
            .map(|i| {
                let name = if count == 1 {
                    base.to_string()
                } else {
                    format!("{base} {i}")
                };
                self.add_child(&name, age, variables)
            })
            .collect()
    }

    fn insert_person(
        &mut self,
        name: &str,
        age: u32,
        variables: &[(&str, VariableInput)],
        kind: PersonKind,
    ) -> PolicySimResult<String> {
        if name.is_empty() {
            return Err(ValidationError::MissingField {
                field: "name".to_string(),
            }
            .into());
        }
        if self.household.has_person(name) {
            return Err(HouseholdError::DuplicatePerson {
                name: name.to_string(),
            }
            .into());
        }

        let year = self.current_year.clone();
        let mut person = PersonRecord::new();
        person.insert(
            "age".to_string(),
            VariableInput::from(Value::from(age)).into_year_values(&year),
        );
        for (variable, input) in variables {
            person.insert((*variable).to_string(), input.clone().into_year_values(&year));
        }
        let country = self.country();
        if kind == PersonKind::Child && country == Some(CountryId::Us) {
            person.insert(
                "is_tax_unit_dependent".to_string(),
                VariableInput::from(true).into_year_values(&year),
            );
        }
        self.household.entities.people.insert(name.to_string(), person);

        match country {
            Some(CountryId::Us) => self.join_us_defaults(name, kind),
            Some(CountryId::Uk) => {
                self.join_first_instance(BENUNITS, "your benefit unit", name);
                self.join_first_instance(HOUSEHOLDS, "your household", name);
            }
            _ => self.join_first_instance(HOUSEHOLDS, "your household", name),
        }
        debug!(person = name, "added person");
        Ok(name.to_string())
    }

    fn join_us_defaults(&mut self, name: &str, kind: PersonKind) {
        self.join_first_instance(TAX_UNITS, "your tax unit", name);
        self.join_first_instance(FAMILIES, "your family", name);
        self.join_first_instance(SPM_UNITS, "your household", name);

        let year = self.current_year.clone();
        let marital_units = self.household.groups_mut(MARITAL_UNITS);
        match kind {
            PersonKind::Adult => {
                marital_units
                    .entry(ADULT_MARITAL_UNIT.to_string())
                    .or_default()
                    .add_member(name);
            }
            PersonKind::Child => {
                let existing = marital_units
                    .keys()
                    .filter(|k| k.ends_with(CHILD_MARITAL_UNIT_SUFFIX))
                    .count();
                let id = i64::try_from(existing).map_or(i64::MAX, |n| n + 1);
                let mut unit = GroupEntity::with_members([name]);
                unit.variables.insert(
                    "marital_unit_id".to_string(),
                    VariableInput::from(id).into_year_values(&year),
                );
                marital_units.insert(format!("{name}{CHILD_MARITAL_UNIT_SUFFIX}"), unit);
            }
        }

        self.join_first_instance(HOUSEHOLDS, "your household", name);
    }

    /// Adds `person` to the first instance of `key`, creating `default_name`
    /// when the kind has no instances.
    fn join_first_instance(&mut self, key: &str, default_name: &str, person: &str) {
        let instances = self.household.groups_mut(key);
        if instances.is_empty() {
            instances.insert(default_name.to_string(), GroupEntity::default());
        }
        if let Some((_, group)) = instances.first_mut() {
            group.add_member(person);
        }
    }

    /// Deletes a person and strips them from every group. A child's own
    /// marital unit goes with them.
    pub fn remove_person(&mut self, name: &str) -> &mut Self {
        if self.household.remove_person(name) {
            debug!(person = name, "removed person");
        }
        if let Some(units) = self.household.entities.groups.get_mut(MARITAL_UNITS) {
            let own_unit = format!("{name}{CHILD_MARITAL_UNIT_SUFFIX}");
            if units.get(&own_unit).is_some_and(|u| u.members.is_empty()) {
                units.shift_remove(&own_unit);
            }
        }
        self
    }

    /// Links two people as a couple. Only US households record this, as
    /// `"your marital unit"` with exactly these two members.
    pub fn set_marital_status(&mut self, first: &str, second: &str) -> &mut Self {
        if self.country() == Some(CountryId::Us) {
            self.household
                .groups_mut(MARITAL_UNITS)
                .insert(ADULT_MARITAL_UNIT.to_string(), GroupEntity::with_members([first, second]));
        }
        self
    }

    /// Adds `person` to `group` of entity kind `entity_key`, creating either
    /// on demand.
    pub fn assign_to_group_entity(
        &mut self,
        person: &str,
        entity_key: &str,
        group: &str,
    ) -> &mut Self {
        self.household
            .groups_mut(entity_key)
            .entry(group.to_string())
            .or_default()
            .add_member(person);
        self
    }

    pub fn set_person_variable(
        &mut self,
        person: &str,
        variable: &str,
        value: impl Into<VariableInput>,
    ) -> Result<&mut Self, HouseholdError> {
        let year = self.current_year.clone();
        let record = self
            .household
            .entities
            .people
            .get_mut(person)
            .ok_or_else(|| HouseholdError::PersonNotFound {
                name: person.to_string(),
            })?;
        record.insert(variable.to_string(), value.into().into_year_values(&year));
        Ok(self)
    }

    pub fn set_group_variable(
        &mut self,
        entity_key: &str,
        group: &str,
        variable: &str,
        value: impl Into<VariableInput>,
    ) -> Result<&mut Self, HouseholdError> {
        let year = self.current_year.clone();
        let variables = self
            .household
            .entities
            .groups
            .get_mut(entity_key)
            .and_then(|instances| instances.get_mut(group))
            .map(|g| &mut g.variables)
            .ok_or_else(|| HouseholdError::GroupNotFound {
                entity: entity_key.to_string(),
                group: group.to_string(),
            })?;
        variables.insert(variable.to_string(), value.into().into_year_values(&year));
        Ok(self)
    }

    /// The working household.
    #[must_use]
    pub fn household(&self) -> &Household {
        &self.household
    }

    /// A copy of the working household.
    #[must_use]
    pub fn build(&self) -> Household {
        self.household.clone()
    }
}
