//! Readiness checks run before a household is submitted.
//!
//! Errors make a household unfit for simulation; warnings flag shapes that
//! are legal but probably unintended.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::builder::{validate_year, HOUSEHOLDS, TAX_UNITS};
use crate::household::Household;
use crate::metadata::{ValueType, VariableInfo};
use crate::value::Value;

/// Inclusive range of plausible ages.
pub const AGE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=120.0;

/// Inclusive range of plausible simulation years.
pub const YEAR_RANGE: std::ops::RangeInclusive<u32> = 2000..=2100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    NoPeople,
    DanglingMember,
    InvalidYear,
    UnusualYear,
    MissingAge,
    UnusualAge,
    EmptyGroup,
    NoTaxUnit,
    NoHouseholdUnit,
    InvalidType,
    NotInteger,
    InvalidChoice,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::NoPeople => "NO_PEOPLE",
            Self::DanglingMember => "DANGLING_MEMBER",
            Self::InvalidYear => "INVALID_YEAR",
            Self::UnusualYear => "UNUSUAL_YEAR",
            Self::MissingAge => "MISSING_AGE",
            Self::UnusualAge => "UNUSUAL_AGE",
            Self::EmptyGroup => "EMPTY_GROUP",
            Self::NoTaxUnit => "NO_TAX_UNIT",
            Self::NoHouseholdUnit => "NO_HOUSEHOLD_UNIT",
            Self::InvalidType => "INVALID_TYPE",
            Self::NotInteger => "NOT_INTEGER",
            Self::InvalidChoice => "INVALID_CHOICE",
        };
        f.write_str(code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationIssue {
    fn new(code: IssueCode, message: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when an error or warning carries `code`.
    #[must_use]
    pub fn has(&self, code: IssueCode) -> bool {
        self.errors.iter().chain(&self.warnings).any(|i| i.code == code)
    }

    fn error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    fn warn(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }
}

/// Checks a household's structure and per-person ages for `year`.
#[must_use]
pub fn validate_household(household: &Household, year: &str) -> ValidationReport {
    let mut report = ValidationReport::default();

    match validate_year(year) {
        Err(err) => report.error(ValidationIssue::new(
            IssueCode::InvalidYear,
            err.to_string(),
            "year",
        )),
        Ok(()) => {
            if year.parse::<u32>().is_ok_and(|y| !YEAR_RANGE.contains(&y)) {
                report.warn(ValidationIssue::new(
                    IssueCode::UnusualYear,
                    format!("Year {year} seems unusual"),
                    "year",
                ));
            }
        }
    }

    if household.entities.people.is_empty() {
        report.error(ValidationIssue::new(
            IssueCode::NoPeople,
            "Household must have at least one person for simulation",
            "people",
        ));
    }

    for (kind, instance, member) in household.dangling_members() {
        report.error(ValidationIssue::new(
            IssueCode::DanglingMember,
            format!("{instance} lists {member}, who is not in the household"),
            format!("{kind}.{instance}.members"),
        ));
    }

    for (name, person) in &household.entities.people {
        let field = format!("people.{name}.age");
        match person.get("age").and_then(|ages| ages.get(year)).and_then(Value::as_float) {
            None => report.warn(ValidationIssue::new(
                IssueCode::MissingAge,
                format!("{name} is missing an age for {year}"),
                field,
            )),
            Some(age) if !AGE_RANGE.contains(&age) => report.warn(ValidationIssue::new(
                IssueCode::UnusualAge,
                format!("{name} has unusual age: {age}"),
                field,
            )),
            Some(_) => {}
        }
    }

    for (kind, instances) in &household.entities.groups {
        for (instance, group) in instances {
            if group.members.is_empty() {
                report.warn(ValidationIssue::new(
                    IssueCode::EmptyGroup,
                    format!("{instance} has no members"),
                    format!("{kind}.{instance}.members"),
                ));
            }
        }
    }

    if household.country_id == "us" && !household.entities.people.is_empty() {
        let has_instances = |key: &str| household.groups(key).is_some_and(|g| !g.is_empty());
        if !has_instances(TAX_UNITS) {
            report.warn(ValidationIssue::new(
                IssueCode::NoTaxUnit,
                "US households with people typically have a tax unit",
                TAX_UNITS,
            ));
        }
        if !has_instances(HOUSEHOLDS) {
            report.warn(ValidationIssue::new(
                IssueCode::NoHouseholdUnit,
                "US households with people typically have a household",
                HOUSEHOLDS,
            ));
        }
    }

    report
}

/// Whether the household can be handed to the calculation service.
#[must_use]
pub fn is_ready_for_simulation(household: &Household, year: &str) -> bool {
    validate_household(household, year).is_valid()
}

/// Checks a value against a variable's declared type and choices.
#[must_use]
pub fn validate_variable_value(value: &Value, variable: &VariableInfo) -> ValidationReport {
    let mut report = ValidationReport::default();
    let name = variable.name.as_str();
    let type_error = |expected: &str| {
        ValidationIssue::new(
            IssueCode::InvalidType,
            format!("Variable {name} must be {expected}, got {}", value.type_name()),
            name,
        )
    };

    match variable.value_type {
        ValueType::Float if !value.is_number() => report.error(type_error("a number")),
        ValueType::Int => match value {
            Value::Int(_) => {}
            Value::Float(x) if x.fract() != 0.0 => report.error(ValidationIssue::new(
                IssueCode::NotInteger,
                format!("Variable {name} must be an integer"),
                name,
            )),
            Value::Float(_) => {}
            _ => report.error(type_error("a number")),
        },
        ValueType::Bool if !value.is_bool() => report.error(type_error("a boolean")),
        ValueType::Str if !value.is_string() => report.error(type_error("a string")),
        ValueType::Enum => {
            let choices = variable.possible_values.as_deref().unwrap_or_default();
            if !choices.is_empty() && !choices.iter().any(|c| c.value == *value) {
                report.error(ValidationIssue::new(
                    IssueCode::InvalidChoice,
                    format!("{value} is not a choice of {name}"),
                    name,
                ));
            }
        }
        _ => {}
    }

    report
}
