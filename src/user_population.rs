//! User-owned population references.
//!
//! A [`UserPopulationRef`] is the persisted association between a user and a
//! population, carrying an optional custom label and, for geographies, the
//! country and scope. Label defaulting lives here so every list, picker and
//! breadcrumb renders a saved population the same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::population::{
    GeographyPopulation, HouseholdPopulation, PopulationHandlers, PopulationRef,
};

/// Whether a geography covers a whole country or part of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeographicScope {
    National,
    Subnational,
}

/// A population saved by a user.
///
/// The wrapped [`PopulationRef`] is flattened on the wire, so a saved
/// household serializes as
/// `{"type":"household","householdId":"…","userId":"…",…}`.
///
/// # Examples
///
/// ```
/// use policysim::{GeographicScope, PopulationRef, UserPopulationRef};
///
/// let saved = UserPopulationRef::new(PopulationRef::geography("G1"), "user-1")
///     .with_scope(GeographicScope::National);
/// assert_eq!(saved.label(), "National: G1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPopulationRef {
    #[serde(flatten)]
    pub population: PopulationRef,

    pub user_id: String,

    #[serde(
        default,
        rename = "label",
        alias = "customLabel",
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_label: Option<String>,

    #[serde(default)]
    pub country_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<GeographicScope>,

    /// Set once the population exists on the calculation service.
    #[serde(default, alias = "isCreator")]
    pub is_created: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserPopulationRef {
    /// Associates a population with a user.
    #[must_use]
    pub fn new(population: PopulationRef, user_id: impl Into<String>) -> Self {
        Self {
            population,
            user_id: user_id.into(),
            custom_label: None,
            country_id: String::new(),
            scope: None,
            is_created: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// Sets the custom label shown instead of the default.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.custom_label = Some(label.into());
        self
    }

    /// Sets the country the population belongs to.
    #[must_use]
    pub fn with_country(mut self, country_id: impl Into<String>) -> Self {
        self.country_id = country_id.into();
        self
    }

    /// Sets the geographic scope.
    #[must_use]
    pub fn with_scope(mut self, scope: GeographicScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Marks the association as created now.
    #[must_use]
    pub fn created(mut self) -> Self {
        let now = Utc::now();
        self.is_created = true;
        self.created_at = Some(now);
        self.updated_at = Some(now);
        self
    }

    /// Replaces the custom label and bumps `updated_at`.
    pub fn rename(&mut self, label: impl Into<String>) {
        self.custom_label = Some(label.into());
        self.updated_at = Some(Utc::now());
    }

    /// Returns the id of the wrapped population.
    #[must_use]
    pub fn id(&self) -> &str {
        self.population.id()
    }

    /// Drops the ownership fields.
    #[must_use]
    pub fn to_population_ref(&self) -> PopulationRef {
        PopulationRef::from_user_population(self)
    }

    /// Valid when the population id and the owning user are both non-empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.population.is_valid() && !self.user_id.is_empty()
    }

    /// Like [`is_valid`](Self::is_valid) but says what is missing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.population.is_valid() {
            return Err(ValidationError::EmptyId {
                kind: self.population.kind().key_prefix(),
            });
        }
        if self.user_id.is_empty() {
            return Err(ValidationError::MissingUser);
        }
        Ok(())
    }

    /// Display label: the custom label when set, otherwise a default derived
    /// from the variant and, for geographies, the scope.
    #[must_use]
    pub fn label(&self) -> String {
        if let Some(label) = self.custom_label.as_deref().filter(|l| !l.is_empty()) {
            return label.to_string();
        }

        match_user_population(
            self,
            PopulationHandlers {
                household: |user: &UserPopulationRef, _: &HouseholdPopulation| {
                    user.population.label()
                },
                geography: |user: &UserPopulationRef, g: &GeographyPopulation| match user.scope {
                    Some(GeographicScope::National) => format!("National: {}", g.geography_id),
                    Some(GeographicScope::Subnational) | None => {
                        format!("Regional: {}", g.geography_id)
                    }
                },
            },
        )
    }
}

impl From<UserPopulationRef> for PopulationRef {
    fn from(user: UserPopulationRef) -> Self {
        user.population
    }
}

/// Dispatches on the wrapped population variant.
///
/// Each handler receives the whole user reference alongside the variant
/// payload, and exactly one of them is called.
pub fn match_user_population<'a, T, H, G>(
    user: &'a UserPopulationRef,
    handlers: PopulationHandlers<H, G>,
) -> T
where
    H: FnOnce(&'a UserPopulationRef, &'a HouseholdPopulation) -> T,
    G: FnOnce(&'a UserPopulationRef, &'a GeographyPopulation) -> T,
{
    match &user.population {
        PopulationRef::Household(h) => (handlers.household)(user, h),
        PopulationRef::Geography(g) => (handlers.geography)(user, g),
    }
}
