//! The household record.
//!
//! A household holds, per entity instance, a map from variable name to a map
//! from year to value. People live under `people`; every other entity kind
//! lives under its storage key (`taxUnits`, `spmUnits`, `families`,
//! `households`, `maritalUnits`, `benunits`) as named instances that also
//! list their member people.
//!
//! Households are values: resolver and structure operations take one by
//! reference and return a new one. The `&mut self` helpers below exist for
//! those operations to edit their own copy.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::PEOPLE_KEY;
use crate::value::Value;

/// Values of one variable for one instance, keyed by year (`"2025"`).
pub type YearValues = IndexMap<String, Value>;

/// Variables of one instance, keyed by variable name.
pub type VariableMap = IndexMap<String, YearValues>;

/// One person's variables.
pub type PersonRecord = VariableMap;

/// A non-person entity instance: its variables plus its member people.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupEntity {
    #[serde(default)]
    pub members: Vec<String>,

    #[serde(flatten)]
    pub variables: VariableMap,
}

impl GroupEntity {
    /// Creates an instance with the given members and no variables.
    #[must_use]
    pub fn with_members<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
            variables: VariableMap::new(),
        }
    }

    /// Appends a member unless already present. Returns true if added.
    pub fn add_member(&mut self, person: &str) -> bool {
        if self.members.iter().any(|m| m == person) {
            return false;
        }
        self.members.push(person.to_string());
        true
    }

    /// Removes a member. Returns true if it was present.
    pub fn remove_member(&mut self, person: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != person);
        before != self.members.len()
    }
}

/// Instances of one group entity kind, keyed by instance name.
pub type GroupInstances = IndexMap<String, GroupEntity>;

/// All entity instances of a household.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HouseholdData {
    #[serde(default)]
    pub people: IndexMap<String, PersonRecord>,

    /// Group entity kinds keyed by storage key.
    #[serde(flatten)]
    pub groups: IndexMap<String, GroupInstances>,
}

/// A synthetic household under construction.
///
/// # Examples
///
/// ```
/// use policysim::Household;
///
/// let household: Household = serde_json::from_str(r#"{
///     "countryId": "us",
///     "householdData": {
///         "people": { "you": { "age": { "2025": 30 } } },
///         "households": { "your household": { "members": ["you"] } }
///     }
/// }"#).unwrap();
///
/// assert_eq!(household.person_names(), vec!["you"]);
/// assert_eq!(household.instance_names("households"), vec!["your household"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Household {
    #[serde(rename = "countryId")]
    pub country_id: String,

    #[serde(rename = "householdData", alias = "entities")]
    pub entities: HouseholdData,
}

impl Household {
    /// Creates a household with no people and no group instances.
    #[must_use]
    pub fn new(country_id: impl Into<String>) -> Self {
        Self {
            country_id: country_id.into(),
            entities: HouseholdData::default(),
        }
    }

    #[must_use]
    pub fn person(&self, name: &str) -> Option<&PersonRecord> {
        self.entities.people.get(name)
    }

    /// Person names in insertion order.
    #[must_use]
    pub fn person_names(&self) -> Vec<String> {
        self.entities.people.keys().cloned().collect()
    }

    #[must_use]
    pub fn has_person(&self, name: &str) -> bool {
        self.entities.people.contains_key(name)
    }

    /// Instances of a group entity kind, by storage key.
    #[must_use]
    pub fn groups(&self, key: &str) -> Option<&GroupInstances> {
        self.entities.groups.get(key)
    }

    /// Mutable access to a group kind, creating it empty when absent.
    pub fn groups_mut(&mut self, key: &str) -> &mut GroupInstances {
        self.entities.groups.entry(key.to_string()).or_default()
    }

    /// Instance names of an entity kind. `people` lists person names.
    #[must_use]
    pub fn instance_names(&self, key: &str) -> Vec<String> {
        if key == PEOPLE_KEY {
            return self.person_names();
        }
        self.groups(key)
            .map(|instances| instances.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Variables of one instance of an entity kind.
    #[must_use]
    pub fn variables(&self, key: &str, instance: &str) -> Option<&VariableMap> {
        if key == PEOPLE_KEY {
            return self.entities.people.get(instance);
        }
        self.groups(key)?.get(instance).map(|g| &g.variables)
    }

    pub fn variables_mut(&mut self, key: &str, instance: &str) -> Option<&mut VariableMap> {
        if key == PEOPLE_KEY {
            return self.entities.people.get_mut(instance);
        }
        self.entities
            .groups
            .get_mut(key)?
            .get_mut(instance)
            .map(|g| &mut g.variables)
    }

    /// Variable maps of every instance of an entity kind.
    pub fn all_variables_mut(&mut self, key: &str) -> Vec<(&String, &mut VariableMap)> {
        if key == PEOPLE_KEY {
            return self.entities.people.iter_mut().collect();
        }
        match self.entities.groups.get_mut(key) {
            Some(instances) => instances
                .iter_mut()
                .map(|(name, g)| (name, &mut g.variables))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every `(kind, instance, member)` triple whose member is not a person.
    #[must_use]
    pub fn dangling_members(&self) -> Vec<(String, String, String)> {
        let mut dangling = Vec::new();
        for (kind, instances) in &self.entities.groups {
            for (instance, group) in instances {
                for member in &group.members {
                    if !self.has_person(member) {
                        dangling.push((kind.clone(), instance.clone(), member.clone()));
                    }
                }
            }
        }
        dangling
    }

    /// Removes a person and strips them from every group's members.
    pub fn remove_person(&mut self, name: &str) -> bool {
        let existed = self.entities.people.shift_remove(name).is_some();
        for instances in self.entities.groups.values_mut() {
            for group in instances.values_mut() {
                group.remove_member(name);
            }
        }
        existed
    }
}
