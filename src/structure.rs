//! Household shape edits and the reconciliation pass that follows them.
//!
//! Changing marital status or the number of dependents adds or removes
//! people. [`reconcile`] then brings group membership and the variables
//! tracked for "all people" back in line with the new person set. It is
//! idempotent and cheap to run after every edit.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::{CountryId, HouseholdBuilder, MARITAL_UNITS};
use crate::error::PolicySimResult;
use crate::household::Household;
use crate::metadata::CountryMetadata;
use crate::resolver::{add_variable, resolve_entity};

/// The primary adult every household starts with.
pub const PRIMARY_ADULT: &str = "you";
pub const PARTNER: &str = "your partner";

const ADULT_AGE: u32 = 30;
const DEPENDENT_AGE: u32 = 10;
const DEPENDENT_MARKER: &str = "dependent";
const ORDINALS: [&str; 5] = ["first", "second", "third", "fourth", "fifth"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaritalStatus {
    Single,
    Married,
}

/// A household holding only the primary adult.
pub fn default_household(country: CountryId, year: &str) -> PolicySimResult<Household> {
    let mut builder = HouseholdBuilder::new(country, year)?;
    builder.add_adult(PRIMARY_ADULT, ADULT_AGE, &[("employment_income", 0.into())])?;
    Ok(builder.build())
}

#[must_use]
pub fn marital_status(household: &Household) -> MaritalStatus {
    if household.has_person(PARTNER) {
        MaritalStatus::Married
    } else {
        MaritalStatus::Single
    }
}

/// Names of the people counted as dependents, in insertion order.
#[must_use]
pub fn dependents(household: &Household) -> Vec<String> {
    household
        .person_names()
        .into_iter()
        .filter(|name| name.contains(DEPENDENT_MARKER))
        .collect()
}

#[must_use]
pub fn dependent_count(household: &Household) -> usize {
    dependents(household).len()
}

/// Name of the dependent at zero-based `index`.
///
/// ```
/// use policysim::structure::dependent_name;
///
/// assert_eq!(dependent_name(0), "your first dependent");
/// assert_eq!(dependent_name(5), "your 6th dependent");
/// ```
#[must_use]
pub fn dependent_name(index: usize) -> String {
    match ORDINALS.get(index) {
        Some(ordinal) => format!("your {ordinal} {DEPENDENT_MARKER}"),
        None => format!("your {}th {DEPENDENT_MARKER}", index + 1),
    }
}

/// Adds or removes the partner.
///
/// A new partner is 30 with no employment income and, in US households,
/// shares the primary adult's marital unit.
pub fn set_marital_status(
    household: &Household,
    status: MaritalStatus,
    year: &str,
) -> PolicySimResult<Household> {
    let mut builder = HouseholdBuilder::from_household(household, year)?;
    match (status, household.has_person(PARTNER)) {
        (MaritalStatus::Married, false) => {
            builder.add_adult(PARTNER, ADULT_AGE, &[("employment_income", 0.into())])?;
            builder.set_marital_status(PRIMARY_ADULT, PARTNER);
        }
        (MaritalStatus::Single, true) => {
            builder.remove_person(PARTNER);
        }
        _ => {}
    }
    Ok(builder.build())
}

/// Replaces every dependent with `count` fresh ones aged 10.
pub fn set_dependent_count(
    household: &Household,
    count: usize,
    year: &str,
) -> PolicySimResult<Household> {
    let mut builder = HouseholdBuilder::from_household(household, year)?;
    for name in dependents(household) {
        builder.remove_person(&name);
    }
    for index in 0..count {
        builder.add_child(
            &dependent_name(index),
            DEPENDENT_AGE,
            &[("employment_income", 0.into())],
        )?;
    }
    Ok(builder.build())
}

/// Restores the household invariants after its person set changed.
///
/// - members that name no existing person are dropped;
/// - a person missing from every instance of a group kind joins that kind's
///   first instance (marital units excepted, they are per couple or child);
/// - each person-level variable in `tracked` is added, at its default for
///   `year`, to people that lack it.
///
/// Running it twice gives the same household as running it once.
#[must_use]
pub fn reconcile<S: AsRef<str>>(
    household: &Household,
    tracked: &[S],
    metadata: &CountryMetadata,
    year: &str,
) -> Household {
    let mut reconciled = household.clone();
    let people = reconciled.person_names();

    for (kind, instances) in &mut reconciled.entities.groups {
        for (instance, group) in instances.iter_mut() {
            let before = group.members.len();
            group.members.retain(|m| people.contains(m));
            if group.members.len() != before {
                debug!(entity = %kind, instance = %instance, "dropped dangling members");
            }
        }

        if kind == MARITAL_UNITS {
            continue;
        }
        let unassigned: Vec<&String> = people
            .iter()
            .filter(|p| !instances.values().any(|g| g.members.contains(p)))
            .collect();
        if let Some((instance, first)) = instances.first_mut() {
            for person in unassigned {
                debug!(person = %person, entity = %kind, instance = %instance, "assigned person");
                first.add_member(person);
            }
        }
    }

    for variable in tracked {
        let variable = variable.as_ref();
        let per_person = resolve_entity(variable, metadata).is_some_and(|e| e.is_person);
        let missing = reconciled
            .entities
            .people
            .values()
            .any(|record| !record.contains_key(variable));
        if per_person && missing {
            debug!(variable, "re-applying tracked variable");
            reconciled = add_variable(&reconciled, variable, metadata, Some(year));
        }
    }

    reconciled
}
