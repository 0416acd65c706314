//! Prompt assembly.
//!
//! - [`StepSequence`]: per-build step numbering
//! - [`PromptTemplates`]: section text provider, [`DefaultTemplates`] built in
//! - [`PromptAssembler`]: builds and measures a [`PromptPlan`](cwv_core::PromptPlan)

pub mod assembler;
pub mod sequence;
pub mod templates;

pub use assembler::PromptAssembler;
pub use sequence::StepSequence;
pub use templates::{DefaultTemplates, PromptTemplates, SectionContent};
