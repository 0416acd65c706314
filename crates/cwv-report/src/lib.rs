//! # cwv-report
//!
//! Adaptive context-budgeting orchestrator for web-performance reports.
//!
//! A report run flows through these stages, each memoized in the report cache:
//!
//! 1. [`CollectorFacade`] calls the four collectors in sequence and builds a
//!    [`PageDataset`](cwv_core::PageDataset)
//! 2. [`RuleSummarizer`] condenses rule-engine findings (cache-first)
//! 3. [`PromptAssembler`] renders the nine-message prompt for a [`Tier`](cwv_core::Tier)
//! 4. [`budget`] decides whether the full tier fits the model
//! 5. [`InvocationMachine`] sends the prompt, downgrading at most once
//!
//! [`ReportGenerator`] wires the stages together and short-circuits on a
//! previously cached report.

#![deny(unsafe_code)]

pub mod budget;
pub mod cms;
pub mod collect;
pub mod errors;
pub mod generator;
pub mod invocation;
pub mod prompt;
pub mod rules;

pub use budget::{BudgetCheck, is_admissible};
pub use cms::{Cms, detect_cms};
pub use collect::{
    CodeResult, CodeStats, CollectOptions, CollectorFacade, CollectorSet, FieldDataCollector,
    LabAuditCollector, NetworkTraceCollector, SourceCodeCollector, SourceResult, TraceResult,
};
pub use errors::{CollectError, ReportError, RuleEngineError};
pub use generator::{GeneratedReport, ReportGenerator, ReportRequest};
pub use invocation::{AttemptOutcome, InvocationAttempt, InvocationMachine, Invocation};
pub use prompt::{DefaultTemplates, PromptAssembler, PromptTemplates, SectionContent, StepSequence};
pub use rules::{EvidenceBundle, RuleEngine, RuleSummarizer};
