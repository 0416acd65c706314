//! Prompt plans.
//!
//! A [`PromptPlan`] is the assembled prompt for one tier: nine messages in
//! canonical [`Section`] order plus the measured token count of each.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::messages::{Message, Tier};

/// Canonical prompt sections, in send order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// System instructions (parameterized by CMS).
    System,
    /// Real-user field data.
    FieldData,
    /// Lab audit results.
    LabAudit,
    /// Browser performance entries.
    PerformanceTrace,
    /// HTTP archive.
    NetworkTrace,
    /// Rendered page markup.
    RenderedMarkup,
    /// Rule engine findings.
    RulesFindings,
    /// Source code of page resources.
    CodeAnalysis,
    /// Final action instruction.
    Action,
}

impl Section {
    /// All sections in canonical order.
    pub const ALL: [Section; 9] = [
        Section::System,
        Section::FieldData,
        Section::LabAudit,
        Section::PerformanceTrace,
        Section::NetworkTrace,
        Section::RenderedMarkup,
        Section::RulesFindings,
        Section::CodeAnalysis,
        Section::Action,
    ];

    /// Human-facing label of this section in the given tier.
    pub fn label(&self, tier: Tier) -> &'static str {
        match (self, tier) {
            (Self::System, _) => "System Message",
            (Self::FieldData, Tier::Full) => "CrUX Data",
            (Self::FieldData, Tier::Summarized) => "CrUX Summary",
            (Self::LabAudit, Tier::Full) => "PSI Data",
            (Self::LabAudit, Tier::Summarized) => "PSI Summary",
            (Self::PerformanceTrace, Tier::Full) => "Performance Entries",
            (Self::PerformanceTrace, Tier::Summarized) => "Performance Summary",
            (Self::NetworkTrace, Tier::Full) => "HAR Data",
            (Self::NetworkTrace, Tier::Summarized) => "HAR Summary",
            (Self::RenderedMarkup, _) => "HTML Content",
            (Self::RulesFindings, _) => "Rules",
            (Self::CodeAnalysis, _) => "Code Analysis",
            (Self::Action, _) => "Action Prompt",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label(Tier::Full))
    }
}

/// Measured token count of one section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTokens {
    /// Section measured.
    pub section: Section,
    /// Estimated tokens of the section's message.
    pub tokens: u64,
}

/// An assembled prompt for one tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPlan {
    /// Tier the plan was assembled in.
    pub tier: Tier,
    /// Messages in canonical order.
    pub messages: Vec<Message>,
    /// Token count per section, parallel to `messages`.
    pub sections: Vec<SectionTokens>,
}

impl PromptPlan {
    /// Total estimated tokens across all sections.
    pub fn total_tokens(&self) -> u64 {
        self.sections.iter().map(|s| s.tokens).sum()
    }

    /// Token count of a single section, if present.
    pub fn tokens_for(&self, section: Section) -> Option<u64> {
        self.sections
            .iter()
            .find(|s| s.section == section)
            .map(|s| s.tokens)
    }

    /// Message contents joined with the prompt separator.
    pub fn joined_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n")
    }
}
