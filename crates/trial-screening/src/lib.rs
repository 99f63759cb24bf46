//! Client-side intake and validation pipeline for clinical-trial
//! eligibility screening.
//!
//! The [`screening`] module holds the core: the trial catalog, the dynamic
//! field schemas, the pure validation engine, the two intake state machines
//! (single applicant and bulk cohort), and the gateway to the evaluation
//! service. [`config`] and [`telemetry`] carry the ambient runtime concerns.

pub mod config;
pub mod screening;
pub mod telemetry;
