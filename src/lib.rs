//! # policysim - Populations and Households for Policy Simulation
//!
//! The data core of a tax-benefit policy simulator front end. It identifies
//! *what* is being simulated (a synthetic household or a geography) and
//! places simulation variables on the right entity of a household record.
//!
//! ## Core Concepts
//!
//! - **PopulationRef**: a closed household/geography sum type with identity,
//!   labels, API payloads and cache keys
//! - **UserPopulationRef**: a population saved by a user, with label defaulting
//! - **CountryMetadata**: the entity and variable catalogs of one country
//! - **Household**: per-instance, per-year variable values plus group membership
//! - **Resolver**: pure functions that read and write variables on the entity
//!   that owns them
//!
//! ## Usage
//!
//! ```rust
//! use policysim::{resolver, CountryId, CountryMetadata, HouseholdBuilder, PopulationRef, Value};
//!
//! let metadata = CountryMetadata::from_json(r#"{
//!     "entities": {
//!         "person": { "label": "Person", "plural": "people", "is_person": true },
//!         "household": { "label": "Household", "plural": "households" }
//!     },
//!     "variables": {
//!         "employment_income": {
//!             "label": "Employment income", "entity": "person",
//!             "valueType": "float", "defaultValue": 0, "isInputVariable": true
//!         }
//!     }
//! }"#)?;
//!
//! let mut builder = HouseholdBuilder::new(CountryId::Uk, "2025")?;
//! builder.add_adult("you", 30, &[])?;
//! let household = builder.build();
//! let year = Some("2025");
//! let household = resolver::add_variable(&household, "employment_income", &metadata, year);
//! let household = resolver::set_value(
//!     &household, "employment_income", 42_000, &metadata, "2025", Some("you"),
//! );
//!
//! assert_eq!(
//!     resolver::get_value(&household, "employment_income", &metadata, "2025", Some("you")),
//!     Some(&Value::Int(42_000))
//! );
//! assert_eq!(PopulationRef::household("42").cache_key(), "household:42");
//! # Ok::<(), policysim::PolicySimError>(())
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod entity;
pub mod error;
pub mod household;
pub mod metadata;
pub mod value;

// Population references
pub mod population;
pub mod user_population;

// Household operations
pub mod builder;
pub mod catalog;
pub mod queries;
pub mod resolver;
pub mod structure;
pub mod validation;

// Re-export primary types at crate root for convenience
pub use entity::{group_name, storage_key, EntityDescriptor};
pub use error::{HouseholdError, MetadataError, PolicySimError, PolicySimResult, ValidationError};
pub use household::{GroupEntity, Household, HouseholdData, PersonRecord, VariableMap, YearValues};
pub use metadata::{CountryMetadata, PossibleValue, ValueType, VariableInfo};
pub use value::Value;

pub use population::{
    match_population, GeographyPopulation, HouseholdPopulation, PopulationHandlers, PopulationKind,
    PopulationPayload, PopulationRef,
};
pub use user_population::{match_user_population, GeographicScope, UserPopulationRef};

pub use builder::{CountryId, HouseholdBuilder, VariableInput};
pub use catalog::NestedCategory;
pub use resolver::EntityDisplayInfo;
pub use structure::MaritalStatus;
pub use validation::{IssueCode, ValidationIssue, ValidationReport};
