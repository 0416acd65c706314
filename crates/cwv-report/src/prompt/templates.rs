//! Prompt templates.
//!
//! [`PromptTemplates`] turns one section's content into message text. Every
//! data-bearing section has its own method so a provider can override a
//! single step; by default they all go through [`PromptTemplates::data_step`].

use std::borrow::Cow;

use cwv_core::{DeviceType, Section, Tier};

use crate::cms::Cms;
use crate::prompt::sequence::StepSequence;

/// What a template renders for one section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionContent<'a> {
    /// Section being rendered.
    pub section: Section,
    /// Representation of `body`.
    pub tier: Tier,
    /// Section payload; `None` when the source has no data.
    pub body: Option<Cow<'a, str>>,
}

impl SectionContent<'_> {
    /// Heading of the section in its tier.
    pub fn label(&self) -> &'static str {
        self.section.label(self.tier)
    }
}

/// Message-producing contract consumed by the assembler.
pub trait PromptTemplates: Send + Sync {
    /// System instructions for a site built on `cms`.
    fn system(&self, cms: Cms) -> String;

    /// Generic data step.
    fn data_step(&self, steps: &mut StepSequence, content: &SectionContent<'_>) -> String;

    /// Closing instruction.
    fn action(&self, steps: &mut StepSequence, page_url: &str, device: DeviceType) -> String;

    /// Field data step.
    fn field_data(&self, steps: &mut StepSequence, content: &SectionContent<'_>) -> String {
        self.data_step(steps, content)
    }

    /// Lab audit step.
    fn lab_audit(&self, steps: &mut StepSequence, content: &SectionContent<'_>) -> String {
        self.data_step(steps, content)
    }

    /// Performance entries step.
    fn performance_trace(&self, steps: &mut StepSequence, content: &SectionContent<'_>) -> String {
        self.data_step(steps, content)
    }

    /// HAR step.
    fn network_trace(&self, steps: &mut StepSequence, content: &SectionContent<'_>) -> String {
        self.data_step(steps, content)
    }

    /// Rendered markup step.
    fn rendered_markup(&self, steps: &mut StepSequence, content: &SectionContent<'_>) -> String {
        self.data_step(steps, content)
    }

    /// Rule findings step.
    fn rules_findings(&self, steps: &mut StepSequence, content: &SectionContent<'_>) -> String {
        self.data_step(steps, content)
    }

    /// Source code step.
    fn code_analysis(&self, steps: &mut StepSequence, content: &SectionContent<'_>) -> String {
        self.data_step(steps, content)
    }

    /// Route a data-bearing section to its step method.
    fn section(&self, steps: &mut StepSequence, content: &SectionContent<'_>) -> String {
        match content.section {
            Section::FieldData => self.field_data(steps, content),
            Section::LabAudit => self.lab_audit(steps, content),
            Section::PerformanceTrace => self.performance_trace(steps, content),
            Section::NetworkTrace => self.network_trace(steps, content),
            Section::RenderedMarkup => self.rendered_markup(steps, content),
            Section::RulesFindings => self.rules_findings(steps, content),
            Section::CodeAnalysis => self.code_analysis(steps, content),
            Section::System | Section::Action => self.data_step(steps, content),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Built-in templates
// ─────────────────────────────────────────────────────────────────────────────

const ROLE: &str = "You are a web performance expert analyzing Core Web Vitals (LCP, CLS, INP) \
for a single page. You will receive the page's measurement data in numbered steps. \
Read every step before drawing conclusions, correlate evidence across sources, and \
only recommend changes that the data supports.";

const REPORT_SHAPE: &str = "Structure the report as: an executive summary, one section per \
metric with the observed value, the root causes found in the data, and prioritized \
recommendations with the expected impact and a concrete code or configuration change.";

/// Built-in English templates with numbered step headers.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultTemplates;

impl DefaultTemplates {
    fn platform(cms: Cms) -> &'static str {
        match cms {
            Cms::AemEds => {
                "The site runs on Adobe Experience Manager Edge Delivery Services. \
                 Prefer fixes in blocks, scripts/aem.js loading phases and delayed loading."
            }
            Cms::AemCs => {
                "The site runs on Adobe Experience Manager as a Cloud Service. \
                 Prefer fixes in client libraries, dispatcher caching and components."
            }
            Cms::AemAms => {
                "The site runs on Adobe Experience Manager (Managed Services). \
                 Prefer fixes in client libraries, dispatcher caching and components."
            }
            Cms::Unknown => "The platform behind the site could not be identified.",
        }
    }

    fn intro(section: Section) -> &'static str {
        match section {
            Section::FieldData => "Real-user field data (CrUX) for the page:",
            Section::LabAudit => "Lab audit results (PageSpeed Insights) for the page:",
            Section::PerformanceTrace => "Browser performance entries recorded during load:",
            Section::NetworkTrace => "Network requests recorded during load (HAR):",
            Section::RenderedMarkup => "Markup of the page as rendered:",
            Section::RulesFindings => "Findings from the automated performance rules:",
            Section::CodeAnalysis => "Source code of the resources the page loads:",
            Section::System | Section::Action => "",
        }
    }
}

impl PromptTemplates for DefaultTemplates {
    fn system(&self, cms: Cms) -> String {
        format!("{ROLE}\n\n{}\n\n{REPORT_SHAPE}", Self::platform(cms))
    }

    fn data_step(&self, steps: &mut StepSequence, content: &SectionContent<'_>) -> String {
        let step = steps.advance();
        let label = content.label();
        match &content.body {
            Some(body) => format!(
                "Step {step}: {label}\n{}\n\n{body}",
                Self::intro(content.section)
            ),
            None => format!("Step {step}: {label}\nNo {label} is available for this page."),
        }
    }

    fn action(&self, steps: &mut StepSequence, page_url: &str, device: DeviceType) -> String {
        let completed = steps.issued();
        format!(
            "Using the {completed} steps above, write the Core Web Vitals report for \
             {page_url} measured on {device}. {REPORT_SHAPE}"
        )
    }
}
