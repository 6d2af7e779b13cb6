//! Entity-aware variable resolution.
//!
//! Resolves which entity kind a variable belongs to using country metadata,
//! and reads or writes its value at the matching place in a household
//! record. Every function here is pure: households are taken by reference
//! and a new household is returned.
//!
//! Nothing here fails. An unknown variable resolves to `None` and turns
//! writes into no-ops; an unset value reads as `None` so callers can fall
//! back to the catalog default.

use chrono::{Datelike, Utc};
use tracing::{debug, warn};

use crate::entity::{storage_key, EntityDescriptor};
use crate::household::Household;
use crate::metadata::{CountryMetadata, VariableInfo};
use crate::value::Value;

/// Short description of where a variable lives, for labelling inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDisplayInfo {
    pub is_person: bool,
    pub label: String,
}

/// Looks up the entity kind that owns `variable`.
#[must_use]
pub fn resolve_entity<'m>(
    variable: &str,
    metadata: &'m CountryMetadata,
) -> Option<&'m EntityDescriptor> {
    let info = metadata.variable(variable)?;
    metadata.entity(&info.entity)
}

/// Looks up the catalog entry for `variable`.
#[must_use]
pub fn variable_info<'m>(
    variable: &str,
    metadata: &'m CountryMetadata,
) -> Option<&'m VariableInfo> {
    metadata.variable(variable)
}

/// Whether `variable` is per-person, and a lower-case label for its entity.
///
/// Unknown variables report `{ is_person: true, label: "unknown" }`.
#[must_use]
pub fn variable_entity_display_info(
    variable: &str,
    metadata: &CountryMetadata,
) -> EntityDisplayInfo {
    match resolve_entity(variable, metadata) {
        None => EntityDisplayInfo {
            is_person: true,
            label: "unknown".to_string(),
        },
        Some(entity) if entity.is_person => EntityDisplayInfo {
            is_person: true,
            label: "person".to_string(),
        },
        Some(entity) => {
            let label = if entity.label.is_empty() {
                "household".to_string()
            } else {
                entity.label.to_lowercase()
            };
            EntityDisplayInfo {
                is_person: false,
                label,
            }
        }
    }
}

/// True when the variable is known and its owning entity differs from the
/// scope the caller expected (per-person or not).
#[must_use]
pub fn is_scope_mismatch(
    variable: &str,
    metadata: &CountryMetadata,
    expected_is_person: bool,
) -> bool {
    resolve_entity(variable, metadata)
        .is_some_and(|entity| entity.is_person != expected_is_person)
}

/// Instance names of the entity kind with the given plural.
///
/// Accepts metadata plurals (`tax_units`) and storage keys (`taxUnits`).
#[must_use]
pub fn get_entity_instances(household: &Household, entity_plural: &str) -> Vec<String> {
    household.instance_names(&storage_key(entity_plural))
}

/// Picks the instance a read or single-slot write targets.
///
/// People must be named explicitly. A group kind with exactly one instance
/// ignores the requested name; otherwise the named instance is used, or the
/// first one when none is named.
fn target_instance(
    household: &Household,
    entity: &EntityDescriptor,
    instance: Option<&str>,
) -> Option<String> {
    let key = entity.storage_key();
    if entity.is_person {
        return instance
            .filter(|name| household.has_person(name))
            .map(ToString::to_string);
    }

    let instances = household.groups(&key)?;
    if instances.len() == 1 {
        return instances.keys().next().cloned();
    }
    match instance {
        Some(name) if instances.contains_key(name) => Some(name.to_string()),
        Some(_) => None,
        None => instances.keys().next().cloned(),
    }
}

fn resolve_or_warn<'m>(
    variable: &str,
    metadata: &'m CountryMetadata,
) -> Option<(&'m VariableInfo, &'m EntityDescriptor)> {
    let info = metadata.variable(variable);
    let entity = info.and_then(|info| metadata.entity(&info.entity));
    match (info, entity) {
        (Some(info), Some(entity)) => Some((info, entity)),
        _ => {
            warn!(variable, "unknown variable");
            None
        }
    }
}

/// Reads the value stored for `variable` in `year`.
///
/// `entity_instance` names the person for person-level variables and picks
/// among group instances otherwise. Returns `None` for an unknown variable,
/// a missing instance or an unset year.
#[must_use]
pub fn get_value<'h>(
    household: &'h Household,
    variable: &str,
    metadata: &CountryMetadata,
    year: &str,
    entity_instance: Option<&str>,
) -> Option<&'h Value> {
    let (_, entity) = resolve_or_warn(variable, metadata)?;
    let instance = target_instance(household, entity, entity_instance)?;
    household
        .variables(&entity.storage_key(), &instance)?
        .get(variable)?
        .get(year)
}

/// Like [`get_value`] but falls back to the catalog default, then `Null`.
#[must_use]
pub fn get_value_or_default(
    household: &Household,
    variable: &str,
    metadata: &CountryMetadata,
    year: &str,
    entity_instance: Option<&str>,
) -> Value {
    if let Some(value) = get_value(household, variable, metadata, year, entity_instance) {
        return value.clone();
    }
    metadata
        .variable(variable)
        .map(VariableInfo::initial_value)
        .unwrap_or_default()
}

/// Returns a household with one `(instance, year)` slot of `variable` set.
///
/// The input is never modified. Unknown variables and missing instances
/// return an unchanged copy.
#[must_use]
pub fn set_value(
    household: &Household,
    variable: &str,
    value: impl Into<Value>,
    metadata: &CountryMetadata,
    year: &str,
    entity_instance: Option<&str>,
) -> Household {
    let mut updated = household.clone();
    let Some((_, entity)) = resolve_or_warn(variable, metadata) else {
        return updated;
    };
    let Some(instance) = target_instance(household, entity, entity_instance) else {
        return updated;
    };
    if let Some(variables) = updated.variables_mut(&entity.storage_key(), &instance) {
        variables
            .entry(variable.to_string())
            .or_default()
            .insert(year.to_string(), value.into());
    }
    updated
}

fn year_or_current(year: Option<&str>) -> String {
    year.map_or_else(|| Utc::now().year().to_string(), ToString::to_string)
}

/// Adds `variable`, set to its default for `year`, to every instance of its
/// owning entity kind. Instances that already carry it are left alone.
///
/// Without a year, the current calendar year is read from the system clock,
/// so the result then depends on when it runs. Pass the builder's
/// [`current_year`](crate::HouseholdBuilder::current_year) to stay
/// deterministic.
#[must_use]
pub fn add_variable(
    household: &Household,
    variable: &str,
    metadata: &CountryMetadata,
    year: Option<&str>,
) -> Household {
    let mut updated = household.clone();
    let Some((info, entity)) = resolve_or_warn(variable, metadata) else {
        return updated;
    };
    let year = year_or_current(year);
    let key = entity.storage_key();

    for (instance, variables) in updated.all_variables_mut(&key) {
        if !variables.contains_key(variable) {
            debug!(variable, entity = %entity, instance = %instance, "adding variable");
            variables
                .entry(variable.to_string())
                .or_default()
                .insert(year.clone(), info.initial_value());
        }
    }
    updated
}

/// Adds `variable` to a single instance.
///
/// The variable always lands on its own entity kind. When `target_instance`
/// names an instance of that kind, the value goes there. When it names an
/// instance of a different kind (a household name for a person-level
/// variable, or a person for a group-level one), the value goes to the first
/// instance of the owning kind; use [`is_scope_mismatch`] to tell the caller
/// about the reroute. A name that matches no instance at all is a no-op.
///
/// Without a year, the current calendar year is read from the system clock,
/// as in [`add_variable`].
#[must_use]
pub fn add_variable_to_entity(
    household: &Household,
    variable: &str,
    metadata: &CountryMetadata,
    year: Option<&str>,
    target_instance: &str,
) -> Household {
    let mut updated = household.clone();
    let Some((info, entity)) = resolve_or_warn(variable, metadata) else {
        return updated;
    };
    let key = entity.storage_key();
    let instances = household.instance_names(&key);
    let instance = if instances.iter().any(|name| name == target_instance) {
        Some(target_instance)
    } else if names_any_instance(household, target_instance) {
        debug!(variable, target_instance, entity = %entity, "rerouting to owning entity");
        instances.first().map(String::as_str)
    } else {
        debug!(variable, target_instance, "no such instance");
        None
    };
    let Some(instance) = instance else {
        return updated;
    };

    if let Some(variables) = updated.variables_mut(&key, instance) {
        if !variables.contains_key(variable) {
            variables
                .entry(variable.to_string())
                .or_default()
                .insert(year_or_current(year), info.initial_value());
        }
    }
    updated
}

fn names_any_instance(household: &Household, name: &str) -> bool {
    household.has_person(name)
        || household
            .entities
            .groups
            .values()
            .any(|instances| instances.contains_key(name))
}

/// Removes every stored value of `variable` from the instances of its
/// owning entity kind. Absent variables are a no-op.
#[must_use]
pub fn remove_variable(
    household: &Household,
    variable: &str,
    metadata: &CountryMetadata,
) -> Household {
    let mut updated = household.clone();
    let Some((_, entity)) = resolve_or_warn(variable, metadata) else {
        return updated;
    };
    for (_, variables) in updated.all_variables_mut(&entity.storage_key()) {
        variables.shift_remove(variable);
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ValueType;

    const YEAR: &str = "2025";

    fn metadata() -> CountryMetadata {
        CountryMetadata::new()
            .with_entity(EntityDescriptor::person())
            .with_entity(EntityDescriptor::group("household", "households", "Household"))
            .with_entity(EntityDescriptor::group("tax_unit", "tax_units", "Tax Unit"))
            .with_entity(EntityDescriptor::group(
                "marital_unit",
                "marital_units",
                "Marital Unit",
            ))
            .with_variable(
                VariableInfo::new("age", "Age", "person", ValueType::Int).with_default(0),
            )
            .with_variable(
                VariableInfo::new(
                    "employment_income",
                    "Employment income",
                    "person",
                    ValueType::Float,
                )
                .with_default(0),
            )
            .with_variable(
                VariableInfo::new("state_name", "State", "household", ValueType::Enum)
                    .with_default("CA"),
            )
            .with_variable(
                VariableInfo::new("is_tax_unit_head", "Tax unit head", "tax_unit", ValueType::Bool)
                    .with_default(false),
            )
            .with_variable(VariableInfo::new("orphan", "Orphan", "mystery_unit", ValueType::Float))
    }

    fn household() -> Household {
        serde_json::from_value(serde_json::json!({
            "countryId": "us",
            "householdData": {
                "people": {
                    "you": {
                        "age": { "2025": 30 },
                        "employment_income": { "2025": 50000 }
                    },
                    "your partner": {
                        "age": { "2025": 25 },
                        "employment_income": { "2025": 30000 }
                    }
                },
                "households": {
                    "your household": {
                        "members": ["you", "your partner"],
                        "state_name": { "2025": "CA" }
                    }
                },
                "taxUnits": {
                    "your tax unit": {
                        "members": ["you", "your partner"],
                        "is_tax_unit_head": { "2025": true }
                    }
                },
                "maritalUnits": {
                    "your marital unit": { "members": ["you", "your partner"] },
                    "your first dependent's marital unit": { "members": [] }
                }
            }
        }))
        .unwrap()
    }

    fn with_marital_unit_ids() -> (CountryMetadata, Household) {
        let meta = metadata().with_variable(VariableInfo::new(
            "marital_unit_id",
            "Id",
            "marital_unit",
            ValueType::Int,
        ));
        let h = set_value(
            &household(),
            "marital_unit_id",
            1,
            &meta,
            YEAR,
            Some("your marital unit"),
        );
        let h = set_value(
            &h,
            "marital_unit_id",
            2,
            &meta,
            YEAR,
            Some("your first dependent's marital unit"),
        );
        (meta, h)
    }

    #[test]
    fn test_resolve_entity() {
        let meta = metadata();
        let person = resolve_entity("age", &meta).unwrap();
        assert!(person.is_person);
        assert_eq!(person.plural, "people");

        let household = resolve_entity("state_name", &meta).unwrap();
        assert!(!household.is_person);
        assert_eq!(household.storage_key(), "households");
    }

    #[test]
    fn test_resolve_entity_unknown_or_partial_catalog() {
        let meta = metadata();
        assert!(resolve_entity("nonexistent", &meta).is_none());
        assert!(resolve_entity("orphan", &meta).is_none());
        assert!(resolve_entity("age", &CountryMetadata::new()).is_none());
    }

    #[test]
    fn test_display_info() {
        let meta = metadata();
        assert_eq!(
            variable_entity_display_info("age", &meta),
            EntityDisplayInfo {
                is_person: true,
                label: "person".to_string()
            }
        );
        assert_eq!(variable_entity_display_info("is_tax_unit_head", &meta).label, "tax unit");
        assert_eq!(
            variable_entity_display_info("nonexistent", &meta),
            EntityDisplayInfo {
                is_person: true,
                label: "unknown".to_string()
            }
        );
    }

    #[test]
    fn test_get_value_person_requires_name() {
        let meta = metadata();
        let h = household();
        assert_eq!(
            get_value(&h, "employment_income", &meta, YEAR, Some("your partner")),
            Some(&Value::Int(30000))
        );
        assert_eq!(get_value(&h, "age", &meta, YEAR, None), None);
        assert_eq!(get_value(&h, "age", &meta, YEAR, Some("nobody")), None);
    }

    #[test]
    fn test_get_value_single_group_ignores_instance_name() {
        let meta = metadata();
        let h = household();
        let ca = Value::from("CA");
        assert_eq!(get_value(&h, "state_name", &meta, YEAR, None), Some(&ca));
        assert_eq!(get_value(&h, "state_name", &meta, YEAR, Some("you")), Some(&ca));
        assert_eq!(get_value(&h, "is_tax_unit_head", &meta, YEAR, None), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_get_value_among_several_group_instances() {
        let (meta, h) = with_marital_unit_ids();
        let second = Some("your first dependent's marital unit");
        assert_eq!(
            get_value(&h, "marital_unit_id", &meta, YEAR, second),
            Some(&Value::Int(2))
        );
        assert_eq!(get_value(&h, "marital_unit_id", &meta, YEAR, None), Some(&Value::Int(1)));
        assert_eq!(
            get_value(&h, "marital_unit_id", &meta, YEAR, Some("nobody's marital unit")),
            None
        );
    }

    #[test]
    fn test_get_value_missing_year_or_variable() {
        let meta = metadata();
        let h = household();
        assert_eq!(get_value(&h, "age", &meta, "2030", Some("you")), None);
        assert_eq!(get_value(&h, "nonexistent", &meta, YEAR, Some("you")), None);
    }

    #[test]
    fn test_get_value_or_default_falls_back() {
        let meta = metadata();
        let h = remove_variable(&household(), "state_name", &meta);
        assert_eq!(get_value_or_default(&h, "state_name", &meta, YEAR, None), Value::from("CA"));
        assert_eq!(get_value_or_default(&h, "nonexistent", &meta, YEAR, None), Value::Null);
    }

    #[test]
    fn test_set_value_is_pure() {
        let meta = metadata();
        let h = household();
        let updated = set_value(&h, "age", 35, &meta, YEAR, Some("you"));
        assert_eq!(get_value(&updated, "age", &meta, YEAR, Some("you")), Some(&Value::Int(35)));
        assert_eq!(
            get_value(&updated, "age", &meta, YEAR, Some("your partner")),
            Some(&Value::Int(25))
        );
        assert_eq!(get_value(&h, "age", &meta, YEAR, Some("you")), Some(&Value::Int(30)));
    }

    #[test]
    fn test_set_value_new_year_slot() {
        let meta = metadata();
        let updated = set_value(&household(), "state_name", "NY", &meta, "2026", None);
        assert_eq!(
            get_value(&updated, "state_name", &meta, "2026", None),
            Some(&Value::from("NY"))
        );
        assert_eq!(
            get_value(&updated, "state_name", &meta, YEAR, None),
            Some(&Value::from("CA"))
        );
    }

    #[test]
    fn test_set_value_unknown_target_is_noop() {
        let meta = metadata();
        let h = household();
        assert_eq!(set_value(&h, "nonexistent", 42, &meta, YEAR, Some("you")), h);
        assert_eq!(set_value(&h, "age", 99, &meta, YEAR, Some("nobody")), h);
        assert_eq!(set_value(&h, "age", 99, &meta, YEAR, None), h);
    }

    #[test]
    fn test_set_value_among_several_group_instances() {
        let (_, h) = with_marital_unit_ids();
        let units = h.groups("maritalUnits").unwrap();
        assert_eq!(units["your marital unit"].variables["marital_unit_id"][YEAR], Value::Int(1));
        assert_eq!(
            units["your first dependent's marital unit"].variables["marital_unit_id"][YEAR],
            Value::Int(2)
        );
    }

    #[test]
    fn test_add_variable_to_all_people() {
        let meta = metadata();
        let h = remove_variable(&household(), "employment_income", &meta);
        let updated = add_variable(&h, "employment_income", &meta, Some(YEAR));
        for person in ["you", "your partner"] {
            assert_eq!(
                get_value(&updated, "employment_income", &meta, YEAR, Some(person)),
                Some(&Value::Int(0))
            );
        }
    }

    #[test]
    fn test_add_variable_does_not_overwrite() {
        let meta = metadata();
        let updated = add_variable(&household(), "employment_income", &meta, Some(YEAR));
        assert_eq!(
            get_value(&updated, "employment_income", &meta, YEAR, Some("you")),
            Some(&Value::Int(50000))
        );
        assert_eq!(updated, household());
    }

    #[test]
    fn test_add_variable_without_year_uses_current_year() {
        let meta = metadata();
        let h = remove_variable(&household(), "state_name", &meta);
        let updated = add_variable(&h, "state_name", &meta, None);
        let this_year = Utc::now().year().to_string();
        assert_eq!(
            get_value(&updated, "state_name", &meta, &this_year, None),
            Some(&Value::from("CA"))
        );
    }

    #[test]
    fn test_add_variable_to_entity_targets_one_person() {
        let meta = metadata();
        let h = remove_variable(&household(), "employment_income", &meta);
        let updated =
            add_variable_to_entity(&h, "employment_income", &meta, Some(YEAR), "your partner");
        assert_eq!(get_value(&updated, "employment_income", &meta, YEAR, Some("you")), None);
        assert_eq!(
            get_value(&updated, "employment_income", &meta, YEAR, Some("your partner")),
            Some(&Value::Int(0))
        );
    }

    #[test]
    fn test_add_variable_to_entity_unknown_person_is_noop() {
        let meta = metadata();
        let h = remove_variable(&household(), "employment_income", &meta);
        for target in ["your first dependent", "yuo", ""] {
            let updated =
                add_variable_to_entity(&h, "employment_income", &meta, Some(YEAR), target);
            assert_eq!(updated, h, "{target:?}");
        }
        assert_eq!(
            set_value(&h, "employment_income", 0, &meta, YEAR, Some("your first dependent")),
            h
        );
    }

    #[test]
    fn test_add_variable_to_entity_routes_to_owning_entity() {
        let meta = metadata();
        let h = remove_variable(&household(), "state_name", &meta);
        let updated = add_variable_to_entity(&h, "state_name", &meta, Some(YEAR), "you");

        assert!(!updated.person("you").unwrap().contains_key("state_name"));
        assert_eq!(get_value(&updated, "state_name", &meta, YEAR, None), Some(&Value::from("CA")));
        assert!(is_scope_mismatch("state_name", &meta, true));
        assert!(!is_scope_mismatch("age", &meta, true));
        assert!(!is_scope_mismatch("nonexistent", &meta, true));
    }

    #[test]
    fn test_add_variable_to_entity_group_name_for_person_variable() {
        let meta = metadata();
        let h = remove_variable(&household(), "employment_income", &meta);
        let updated =
            add_variable_to_entity(&h, "employment_income", &meta, Some(YEAR), "your household");

        assert!(is_scope_mismatch("employment_income", &meta, false));
        assert_eq!(
            get_value(&updated, "employment_income", &meta, YEAR, Some("you")),
            Some(&Value::Int(0))
        );
        assert_eq!(
            get_value(&updated, "employment_income", &meta, YEAR, Some("your partner")),
            None
        );
    }

    #[test]
    fn test_remove_variable() {
        let meta = metadata();
        let h = household();
        let updated = remove_variable(&h, "employment_income", &meta);
        assert!(!updated.person("you").unwrap().contains_key("employment_income"));
        assert!(!updated.person("your partner").unwrap().contains_key("employment_income"));
        assert_eq!(get_value(&updated, "age", &meta, YEAR, Some("you")), Some(&Value::Int(30)));
        assert!(h.person("you").unwrap().contains_key("employment_income"));
    }

    #[test]
    fn test_remove_absent_or_unknown_variable_is_noop() {
        let meta = metadata();
        let h = remove_variable(&household(), "state_name", &meta);
        assert_eq!(remove_variable(&h, "state_name", &meta), h);
        assert_eq!(remove_variable(&h, "nonexistent", &meta), h);
    }

    #[test]
    fn test_get_entity_instances() {
        let h = household();
        assert_eq!(get_entity_instances(&h, "people"), vec!["you", "your partner"]);
        assert_eq!(get_entity_instances(&h, "tax_units"), vec!["your tax unit"]);
        assert_eq!(get_entity_instances(&h, "taxUnits"), vec!["your tax unit"]);
        assert!(get_entity_instances(&h, "spm_units").is_empty());
    }
}
