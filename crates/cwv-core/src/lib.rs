//! # cwv-core
//!
//! Foundation types, events, errors, and logging for the CWV report agent.
//!
//! This crate provides the shared vocabulary that all other `cwv-*` crates depend on:
//!
//! - **Messages**: role-tagged [`Message`]s, the [`Tier`] of a prompt, [`DeviceType`]
//! - **Dataset**: [`PageDataset`] with a full and a summary representation per source
//! - **Plans**: [`PromptPlan`] holding the nine canonical [`Section`]s and their token counts
//! - **Budget**: [`TokenBudget`] input/output limits for a model
//! - **Events**: [`ReportEvent`] structured progress stream and the [`EventSink`] seam
//! - **Errors**: [`ErrorCategory`] classification of backend HTTP statuses
//! - **Logging**: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod budget;
pub mod dataset;
pub mod errors;
pub mod events;
pub mod logging;
pub mod messages;
pub mod plan;

pub use budget::TokenBudget;
pub use dataset::{NetworkTrace, PageDataset, RulesOutcome, SourceData};
pub use errors::{ErrorCategory, FailureKind};
pub use events::{
    ArtifactSize, CacheProvenance, DowngradeReason, EventSink, NullSink, RecordingSink,
    ReportEvent, Stage,
};
pub use logging::TracingSink;
pub use messages::{DeviceType, Message, Role, Tier};
pub use plan::{PromptPlan, Section, SectionTokens};
