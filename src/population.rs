//! Population references.
//!
//! A population is the subject of a simulation: either one synthetic
//! household or a geographic region. [`PopulationRef`] identifies which one
//! is being simulated, and every operation over it dispatches exhaustively on
//! the variant, so adding a third kind of population fails to compile until
//! each operation handles it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::user_population::UserPopulationRef;

/// A single synthetic household stored by the calculation service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdPopulation {
    pub household_id: String,
}

/// A geographic region, such as a country, state or district.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeographyPopulation {
    pub geography_id: String,
}

/// What is being simulated.
///
/// Identifiers are opaque. Construction accepts any string, including the
/// empty one; use [`PopulationRef::is_valid`] or the `try_*` constructors to
/// reject empty ids.
///
/// # Examples
///
/// ```
/// use policysim::PopulationRef;
///
/// let household = PopulationRef::household("42");
/// assert_eq!(household.cache_key(), "household:42");
/// assert_ne!(household, PopulationRef::geography("42"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PopulationRef {
    Household(HouseholdPopulation),
    Geography(GeographyPopulation),
}

/// The variant tag of a population, without its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationKind {
    Household,
    Geography,
}

impl PopulationKind {
    /// Display name of the kind: `"Household"` or `"Geography"`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Household => "Household",
            Self::Geography => "Geography",
        }
    }

    /// Prefix used in cache keys.
    #[must_use]
    pub const fn key_prefix(self) -> &'static str {
        match self {
            Self::Household => "household",
            Self::Geography => "geography",
        }
    }
}

impl fmt::Display for PopulationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_prefix())
    }
}

/// Request payload fragment sent to the calculation service.
///
/// Household and geography payloads carry different keys; serializing the
/// value produces exactly those keys and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PopulationPayload {
    Household {
        population_id: String,
        household_id: String,
    },
    Geography {
        geography_id: String,
        region: String,
    },
}

impl PopulationPayload {
    /// Converts the payload into a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Household {
                population_id,
                household_id,
            } => serde_json::json!({
                "population_id": population_id,
                "household_id": household_id,
            }),
            Self::Geography {
                geography_id,
                region,
            } => serde_json::json!({
                "geography_id": geography_id,
                "region": region,
            }),
        }
    }
}

/// One handler per population variant.
///
/// Passed to [`match_population`] and
/// [`match_user_population`](crate::user_population::match_user_population);
/// both fields are required, so every call site covers every variant.
#[derive(Debug, Clone, Copy)]
pub struct PopulationHandlers<H, G> {
    pub household: H,
    pub geography: G,
}

/// Calls exactly one handler for the active variant and returns its result.
///
/// # Examples
///
/// ```
/// use policysim::{
///     match_population, GeographyPopulation, HouseholdPopulation, PopulationHandlers,
///     PopulationRef,
/// };
///
/// let population = PopulationRef::geography("state/ca");
/// let described = match_population(
///     &population,
///     PopulationHandlers {
///         household: |h: &HouseholdPopulation| format!("household {}", h.household_id),
///         geography: |g: &GeographyPopulation| format!("region {}", g.geography_id),
///     },
/// );
/// assert_eq!(described, "region state/ca");
/// ```
pub fn match_population<'a, T, H, G>(
    population: &'a PopulationRef,
    handlers: PopulationHandlers<H, G>,
) -> T
where
    H: FnOnce(&'a HouseholdPopulation) -> T,
    G: FnOnce(&'a GeographyPopulation) -> T,
{
    match population {
        PopulationRef::Household(h) => (handlers.household)(h),
        PopulationRef::Geography(g) => (handlers.geography)(g),
    }
}

impl PopulationRef {
    /// Creates a household population reference.
    #[must_use]
    pub fn household(household_id: impl Into<String>) -> Self {
        Self::Household(HouseholdPopulation {
            household_id: household_id.into(),
        })
    }

    /// Creates a geography population reference.
    #[must_use]
    pub fn geography(geography_id: impl Into<String>) -> Self {
        Self::Geography(GeographyPopulation {
            geography_id: geography_id.into(),
        })
    }

    /// Creates a household reference, rejecting an empty id.
    pub fn try_household(household_id: impl Into<String>) -> Result<Self, ValidationError> {
        let population = Self::household(household_id);
        population.ensure_valid()?;
        Ok(population)
    }

    /// Creates a geography reference, rejecting an empty id.
    pub fn try_geography(geography_id: impl Into<String>) -> Result<Self, ValidationError> {
        let population = Self::geography(geography_id);
        population.ensure_valid()?;
        Ok(population)
    }

    /// Projects a user population down to the population it wraps.
    #[must_use]
    pub fn from_user_population(user: &UserPopulationRef) -> Self {
        user.population.clone()
    }

    /// Returns the variant tag.
    #[must_use]
    pub const fn kind(&self) -> PopulationKind {
        match self {
            Self::Household(_) => PopulationKind::Household,
            Self::Geography(_) => PopulationKind::Geography,
        }
    }

    /// Returns the household id or the geography id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Household(h) => &h.household_id,
            Self::Geography(g) => &g.geography_id,
        }
    }

    /// Default human-readable label, before any custom override.
    #[must_use]
    pub fn label(&self) -> String {
        match_population(
            self,
            PopulationHandlers {
                household: |h: &HouseholdPopulation| format!("Household {}", h.household_id),
                geography: |g: &GeographyPopulation| format!("Geography: {}", g.geography_id),
            },
        )
    }

    /// Returns `"Household"` or `"Geography"`.
    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        self.kind().label()
    }

    /// Builds the payload fragment for the calculation service.
    #[must_use]
    pub fn api_payload(&self) -> PopulationPayload {
        match self {
            Self::Household(h) => PopulationPayload::Household {
                population_id: h.household_id.clone(),
                household_id: h.household_id.clone(),
            },
            Self::Geography(g) => PopulationPayload::Geography {
                geography_id: g.geography_id.clone(),
                region: g.geography_id.clone(),
            },
        }
    }

    /// Stable query-cache key: `"household:{id}"` or `"geography:{id}"`.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.kind().key_prefix(), self.id())
    }

    /// A reference is valid when its id is non-empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.id().is_empty()
    }

    /// Same variant and same id. A household and a geography sharing an id
    /// are never equal.
    #[must_use]
    pub fn is_equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Household(a), Self::Household(b)) => a.household_id == b.household_id,
            (Self::Geography(a), Self::Geography(b)) => a.geography_id == b.geography_id,
            (Self::Household(_) | Self::Geography(_), _) => false,
        }
    }

    fn ensure_valid(&self) -> Result<(), ValidationError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ValidationError::EmptyId {
                kind: self.kind().key_prefix(),
            })
        }
    }
}

impl fmt::Display for PopulationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<&UserPopulationRef> for PopulationRef {
    fn from(user: &UserPopulationRef) -> Self {
        Self::from_user_population(user)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn test_id_for_each_variant() {
        assert_eq!(PopulationRef::household("household-123").id(), "household-123");
        assert_eq!(PopulationRef::geography("us-ca").id(), "us-ca");
        assert_eq!(PopulationRef::household("").id(), "");
    }

    #[test]
    fn test_default_labels() {
        assert_eq!(PopulationRef::household("household-123").label(), "Household household-123");
        assert_eq!(PopulationRef::geography("us-ca").label(), "Geography: us-ca");
    }

    #[test]
    fn test_type_labels() {
        assert_eq!(PopulationRef::household("x").type_label(), "Household");
        assert_eq!(PopulationRef::geography("x").type_label(), "Geography");
    }

    #[test]
    fn test_household_payload_repeats_id() {
        let payload = PopulationRef::household("42").api_payload();
        assert_eq!(
            payload.to_json(),
            serde_json::json!({ "population_id": "42", "household_id": "42" })
        );
        assert_eq!(serde_json::to_value(&payload).unwrap(), payload.to_json());
    }

    #[test]
    fn test_geography_payload_repeats_id_as_region() {
        let payload = PopulationRef::geography("state/ca").api_payload();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({ "geography_id": "state/ca", "region": "state/ca" })
        );
    }

    #[test]
    fn test_cache_keys_do_not_collide_across_variants() {
        for id in ["", "1", "us-ca", "household:1"] {
            let h = PopulationRef::household(id).cache_key();
            let g = PopulationRef::geography(id).cache_key();
            assert_eq!(h, format!("household:{id}"));
            assert_eq!(g, format!("geography:{id}"));
            assert_ne!(h, g);
        }
    }

    #[test]
    fn test_validity_requires_non_empty_id() {
        assert!(PopulationRef::household("42").is_valid());
        assert!(!PopulationRef::household("").is_valid());
        assert!(PopulationRef::geography("uk").is_valid());
        assert!(!PopulationRef::geography("").is_valid());
    }

    #[test]
    fn test_try_constructors_reject_empty_ids() {
        assert_eq!(
            PopulationRef::try_household(""),
            Err(ValidationError::EmptyId { kind: "household" })
        );
        assert_eq!(
            PopulationRef::try_geography(""),
            Err(ValidationError::EmptyId { kind: "geography" })
        );
        assert!(PopulationRef::try_geography("uk").is_ok());
    }

    #[test]
    fn test_equality_is_tag_dominated() {
        let h1 = PopulationRef::household("household-123");
        assert!(h1.is_equal(&PopulationRef::household("household-123")));
        assert!(!h1.is_equal(&PopulationRef::household("household-456")));
        assert!(!h1.is_equal(&PopulationRef::geography("household-123")));
        assert!(!PopulationRef::geography("x").is_equal(&PopulationRef::household("x")));
    }

    #[test]
    fn test_match_population_calls_exactly_one_handler() {
        let household_calls = Cell::new(0);
        let geography_calls = Cell::new(0);

        let result = match_population(
            &PopulationRef::household("household-123"),
            PopulationHandlers {
                household: |h: &HouseholdPopulation| {
                    household_calls.set(household_calls.get() + 1);
                    format!("household result {}", h.household_id)
                },
                geography: |_: &GeographyPopulation| {
                    geography_calls.set(geography_calls.get() + 1);
                    "geography result".to_string()
                },
            },
        );

        assert_eq!(result, "household result household-123");
        assert_eq!(household_calls.get(), 1);
        assert_eq!(geography_calls.get(), 0);
    }

    #[test]
    fn test_serde_uses_type_tag() {
        let json = serde_json::to_value(PopulationRef::household("h1")).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "household", "householdId": "h1" }));

        let parsed: PopulationRef =
            serde_json::from_str(r#"{"type":"geography","geographyId":"us"}"#).unwrap();
        assert_eq!(parsed, PopulationRef::geography("us"));
    }
}
