//! Prompt assembler.
//!
//! Builds the nine-message [`PromptPlan`] for a tier and measures every
//! message. In the summarized tier each data section uses the condensed
//! representation unless that renders larger than the full one, and the
//! code section is cut at a character ceiling. A summarized plan is
//! therefore never larger than the full plan for the same data.

use std::borrow::Cow;
use std::fmt::Write as _;

use cwv_core::{Message, PageDataset, PromptPlan, Section, SectionTokens, SourceData, Tier};
use cwv_tokens::estimate_message;
use tracing::debug;

use crate::cms::Cms;
use crate::prompt::sequence::StepSequence;
use crate::prompt::templates::{PromptTemplates, SectionContent};

/// Renders [`PromptPlan`]s through a [`PromptTemplates`] provider.
pub struct PromptAssembler<'a> {
    templates: &'a dyn PromptTemplates,
    code_char_limit: usize,
}

impl<'a> PromptAssembler<'a> {
    /// Create an assembler; `code_char_limit` caps the code section in the
    /// summarized tier.
    pub fn new(templates: &'a dyn PromptTemplates, code_char_limit: usize) -> Self {
        Self {
            templates,
            code_char_limit,
        }
    }

    /// Assemble the plan for `tier`.
    pub fn assemble(&self, data: &PageDataset, tier: Tier) -> PromptPlan {
        let mut steps = StepSequence::new();
        let cms = data.cms.as_deref().map_or(Cms::Unknown, Cms::from_id);

        let mut messages = Vec::with_capacity(Section::ALL.len());
        let mut sections = Vec::with_capacity(Section::ALL.len());

        for section in Section::ALL {
            let message = match section {
                Section::System => Message::system(self.templates.system(cms)),
                Section::Action => Message::human(self.templates.action(
                    &mut steps,
                    &data.page_url,
                    data.device,
                )),
                _ => Message::human(self.render_data(data, section, tier, &mut steps)),
            };
            let tokens = estimate_message(&message);
            debug!(%tier, %section, tokens, "section measured");
            sections.push(SectionTokens { section, tokens });
            messages.push(message);
        }

        PromptPlan {
            tier,
            messages,
            sections,
        }
    }

    fn render_data(
        &self,
        data: &PageDataset,
        section: Section,
        tier: Tier,
        steps: &mut StepSequence,
    ) -> String {
        let full = self.content(data, section, Tier::Full);
        if tier == Tier::Full {
            return self.templates.section(steps, &full);
        }

        let mut condensed_steps = steps.clone();
        let condensed = self
            .templates
            .section(&mut condensed_steps, &self.content(data, section, tier));
        let mut full_steps = steps.clone();
        let complete = self.templates.section(&mut full_steps, &full);

        if condensed.len() <= complete.len() {
            *steps = condensed_steps;
            condensed
        } else {
            debug!(%section, "summary larger than full payload, sending full");
            *steps = full_steps;
            complete
        }
    }

    fn content<'d>(&self, data: &'d PageDataset, section: Section, tier: Tier) -> SectionContent<'d> {
        let network = data.network.as_ref();
        let body = match section {
            Section::FieldData => source_body(data.field_data.as_ref(), tier),
            Section::LabAudit => source_body(data.lab_audit.as_ref(), tier),
            Section::PerformanceTrace => source_body(network.map(|n| &n.performance), tier),
            Section::NetworkTrace => source_body(network.map(|n| &n.har), tier),
            Section::RenderedMarkup => data.rendered_markup().map(Cow::Borrowed),
            Section::RulesFindings => data
                .rules
                .as_ref()
                .map(|r| Cow::Borrowed(r.summary.as_str())),
            Section::CodeAnalysis => code_body(data).map(|body| match tier {
                Tier::Full => Cow::Owned(body),
                Tier::Summarized => Cow::Owned(truncate_chars(&body, self.code_char_limit).to_string()),
            }),
            Section::System | Section::Action => None,
        };
        SectionContent {
            section,
            tier,
            body,
        }
    }
}

fn source_body(source: Option<&SourceData>, tier: Tier) -> Option<Cow<'_, str>> {
    source.map(|s| match tier {
        Tier::Full => Cow::Owned(s.full_text()),
        Tier::Summarized => Cow::Borrowed(s.summary.as_str()),
    })
}

/// Every code resource except the page document, each under a URL header.
fn code_body(data: &PageDataset) -> Option<String> {
    let mut body = String::new();
    for (url, code) in data.code_resources() {
        if !body.is_empty() {
            body.push('\n');
        }
        let _ = writeln!(body, "// {url}");
        body.push_str(code);
        body.push('\n');
    }
    (!body.is_empty()).then_some(body)
}

/// Longest prefix of `text` with at most `limit` characters.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
