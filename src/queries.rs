//! Read-only questions about the people in a household.
//!
//! Everything here reads a single year of a year-keyed household record.
//! Adults and children are split on `age[year]`; a person with no age for
//! that year counts as a child. Aggregates only see numeric values (ints and
//! floats), so booleans, strings and unset slots are skipped.

use crate::builder::CountryId;
use crate::household::Household;
use crate::value::Value;

/// Age from which a person counts as an adult.
pub const ADULT_AGE: f64 = 18.0;

fn age(household: &Household, person: &str, year: &str) -> f64 {
    person_value(household, person, "age", year)
        .and_then(Value::as_float)
        .unwrap_or(0.0)
}

/// People aged [`ADULT_AGE`] or over in `year`, in insertion order.
#[must_use]
pub fn adults(household: &Household, year: &str) -> Vec<String> {
    household
        .person_names()
        .into_iter()
        .filter(|name| age(household, name, year) >= ADULT_AGE)
        .collect()
}

/// People under [`ADULT_AGE`] in `year`, or with no age recorded.
#[must_use]
pub fn children(household: &Household, year: &str) -> Vec<String> {
    household
        .person_names()
        .into_iter()
        .filter(|name| age(household, name, year) < ADULT_AGE)
        .collect()
}

#[must_use]
pub fn person_count(household: &Household) -> usize {
    household.entities.people.len()
}

#[must_use]
pub fn adult_count(household: &Household, year: &str) -> usize {
    adults(household, year).len()
}

#[must_use]
pub fn child_count(household: &Household, year: &str) -> usize {
    children(household, year).len()
}

#[must_use]
pub fn is_empty(household: &Household) -> bool {
    household.entities.people.is_empty()
}

#[must_use]
pub fn has_people(household: &Household) -> bool {
    !is_empty(household)
}

/// The value one person holds for `variable` in `year`.
#[must_use]
pub fn person_value<'h>(
    household: &'h Household,
    person: &str,
    variable: &str,
    year: &str,
) -> Option<&'h Value> {
    household.person(person)?.get(variable)?.get(year)
}

/// Every person paired with their value for `variable` in `year`.
#[must_use]
pub fn person_values<'h>(
    household: &'h Household,
    variable: &str,
    year: &str,
) -> Vec<(&'h str, Option<&'h Value>)> {
    household
        .entities
        .people
        .iter()
        .map(|(name, record)| {
            let value = record.get(variable).and_then(|years| years.get(year));
            (name.as_str(), value)
        })
        .collect()
}

fn numeric_values<'h>(
    household: &'h Household,
    variable: &'h str,
    year: &'h str,
) -> impl Iterator<Item = f64> + 'h {
    household
        .entities
        .people
        .values()
        .filter_map(move |record| record.get(variable)?.get(year))
        .filter_map(Value::as_float)
}

/// Sum of a person-level variable over everyone; non-numeric values count as 0.
#[must_use]
pub fn sum_person_variable(household: &Household, variable: &str, year: &str) -> f64 {
    numeric_values(household, variable, year).sum()
}

/// Mean over all people, including those without a numeric value.
/// An empty household averages to 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn avg_person_variable(household: &Household, variable: &str, year: &str) -> f64 {
    let people = person_count(household);
    if people == 0 {
        return 0.0;
    }
    sum_person_variable(household, variable, year) / people as f64
}

#[must_use]
pub fn min_person_variable(household: &Household, variable: &str, year: &str) -> Option<f64> {
    numeric_values(household, variable, year).reduce(f64::min)
}

#[must_use]
pub fn max_person_variable(household: &Household, variable: &str, year: &str) -> Option<f64> {
    numeric_values(household, variable, year).reduce(f64::max)
}

#[must_use]
pub fn total_employment_income(household: &Household, year: &str) -> f64 {
    sum_person_variable(household, "employment_income", year)
}

/// Built-in country profile of the household, if any.
#[must_use]
pub fn country(household: &Household) -> Option<CountryId> {
    household.country_id.parse().ok()
}

#[must_use]
pub fn is_us_household(household: &Household) -> bool {
    country(household) == Some(CountryId::Us)
}

#[must_use]
pub fn is_uk_household(household: &Household) -> bool {
    country(household) == Some(CountryId::Uk)
}
