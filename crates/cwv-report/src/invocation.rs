//! LLM invocation state machine.
//!
//! ```text
//! Build(Full) ──admissible──▶ Send ──ok──▶ done
//!      │                       │
//!      └─over budget─┐         └─context overflow─┐
//!                    ▼                            ▼
//!               Downgrade(Full → Summarized) ◀────┘
//!                    │
//!                    ▼
//!            Build(Summarized) ─▶ Send ──ok──▶ done
//!                                   └─any error──▶ fail
//! ```
//!
//! Only a tier with a lower tier below it can be downgraded, and there is
//! nothing below `Summarized`, so a run sends at most two requests and
//! downgrades at most once. Auth, rate-limit, and unknown failures end the
//! run on the spot. No sleeping, no backoff.

use std::time::{Duration, Instant};

use cwv_cache::{CacheError, CacheKey, CacheLocation, CacheStage, CacheStore};
use cwv_core::{
    DowngradeReason, EventSink, FailureKind, PageDataset, PromptPlan, ReportEvent, Tier,
    TokenBudget,
};
use cwv_llm::{LlmBackend, LlmResponse, classify};
use tracing::{error, info, warn};

use crate::budget::BudgetCheck;
use crate::collect::elapsed_ms;
use crate::errors::ReportError;
use crate::prompt::PromptAssembler;

/// How one backend request ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The backend answered.
    Success,
    /// The backend failed with this classification.
    Failed(FailureKind),
}

/// One backend request made during a run. Not persisted.
#[derive(Clone, Debug)]
pub struct InvocationAttempt {
    /// Tier of the plan sent.
    pub tier: Tier,
    /// When the request was sent.
    pub started_at: Instant,
    /// How long the backend took.
    pub duration: Duration,
    /// Result.
    pub outcome: AttemptOutcome,
}

/// A successful run of the state machine.
#[derive(Clone, Debug)]
pub struct Invocation {
    /// Backend response.
    pub response: LlmResponse,
    /// Tier that produced the response.
    pub tier: Tier,
    /// Every request made, in order.
    pub attempts: Vec<InvocationAttempt>,
    /// Where the report text was cached; `None` if the write failed.
    pub location: Option<CacheLocation>,
}

#[derive(Debug)]
enum State {
    Build(Tier),
    Send(PromptPlan),
    Downgrade {
        from: Tier,
        to: Tier,
        reason: DowngradeReason,
    },
}

/// Drives assembly, gating, sending and downgrading for one dataset.
pub struct InvocationMachine<'a> {
    assembler: &'a PromptAssembler<'a>,
    backend: &'a dyn LlmBackend,
    cache: &'a dyn CacheStore,
    sink: &'a dyn EventSink,
    budget: TokenBudget,
}

impl<'a> InvocationMachine<'a> {
    /// Create a machine for one run.
    pub fn new(
        assembler: &'a PromptAssembler<'a>,
        backend: &'a dyn LlmBackend,
        cache: &'a dyn CacheStore,
        sink: &'a dyn EventSink,
        budget: TokenBudget,
    ) -> Self {
        Self {
            assembler,
            backend,
            cache,
            sink,
            budget,
        }
    }

    /// Run to a terminal state.
    pub async fn run(&self, data: &PageDataset) -> Result<Invocation, ReportError> {
        let mut attempts = Vec::new();
        let mut state = State::Build(Tier::Full);

        loop {
            state = match state {
                State::Build(tier) => self.build(data, tier)?,

                State::Send(plan) => {
                    let tier = plan.tier;
                    #[allow(clippy::cast_possible_truncation)]
                    let attempt = attempts.len() as u32 + 1;
                    self.sink.emit(ReportEvent::LlmRequestStarted {
                        model: self.backend.model().to_string(),
                        tier,
                        attempt,
                    });
                    let started_at = Instant::now();
                    let result = self.backend.invoke(&plan.messages).await;
                    let duration = started_at.elapsed();

                    match result {
                        Ok(response) => {
                            attempts.push(InvocationAttempt {
                                tier,
                                started_at,
                                duration,
                                outcome: AttemptOutcome::Success,
                            });
                            self.sink.emit(ReportEvent::LlmResponseReceived {
                                model: self.backend.model().to_string(),
                                tier,
                                duration_ms: elapsed_ms(started_at),
                            });
                            let location = self.persist_report(data, &response);
                            return Ok(Invocation {
                                response,
                                tier,
                                attempts,
                                location,
                            });
                        }
                        Err(source) => {
                            let kind = classify(&source);
                            attempts.push(InvocationAttempt {
                                tier,
                                started_at,
                                duration,
                                outcome: AttemptOutcome::Failed(kind),
                            });
                            self.sink.emit(ReportEvent::LlmFailed {
                                tier,
                                kind,
                                message: source.to_string(),
                            });

                            match (kind, tier.downgrade()) {
                                (FailureKind::ContextOverflow, Some(to)) => State::Downgrade {
                                    from: tier,
                                    to,
                                    reason: DowngradeReason::ContextOverflow,
                                },
                                _ => {
                                    error!(
                                        page_url = %data.page_url,
                                        %tier,
                                        %kind,
                                        error = %source,
                                        "report generation failed"
                                    );
                                    return Err(ReportError::Backend { kind, tier, source });
                                }
                            }
                        }
                    }
                }

                State::Downgrade { from, to, reason } => {
                    warn!(%from, %to, ?reason, "retrying with a smaller prompt");
                    self.sink
                        .emit(ReportEvent::Downgraded { from, to, reason });
                    State::Build(to)
                }
            };
        }
    }

    fn build(&self, data: &PageDataset, tier: Tier) -> Result<State, ReportError> {
        let plan = self.assembler.assemble(data, tier);
        let total_tokens = plan.total_tokens();
        self.sink.emit(ReportEvent::PromptAssembled {
            tier,
            sections: plan.sections.clone(),
            total_tokens,
        });
        self.persist_prompt(data, &plan)?;

        let check = BudgetCheck::evaluate(&plan, self.budget);
        self.sink.emit(ReportEvent::BudgetChecked {
            tier,
            total_tokens,
            ceiling: check.ceiling,
            input_limit: self.budget.input_limit,
            output_limit: self.budget.output_limit,
            usage_percent: check.usage_percent,
            admissible: check.admissible,
        });

        match tier.downgrade() {
            Some(to) if !check.admissible => Ok(State::Downgrade {
                from: tier,
                to,
                reason: DowngradeReason::BudgetExceeded,
            }),
            None if !check.admissible => {
                warn!(%tier, total_tokens, ceiling = check.ceiling, "no smaller tier, sending anyway");
                Ok(State::Send(plan))
            }
            _ => Ok(State::Send(plan)),
        }
    }

    /// Cache the plan as a message list and as joined text.
    fn persist_prompt(&self, data: &PageDataset, plan: &PromptPlan) -> Result<(), CacheError> {
        let key = CacheKey::new(&data.page_url, data.device, CacheStage::Prompt)
            .with_variant(plan.tier.as_str());
        let _ = self
            .cache
            .write_json(&key, &serde_json::to_value(&plan.messages)?)?;
        let _ = self.cache.write_text(&key, &plan.joined_text())?;
        Ok(())
    }

    /// Cache the response object and its text, keyed by model.
    ///
    /// A failed write is logged; the response is still returned.
    fn persist_report(&self, data: &PageDataset, response: &LlmResponse) -> Option<CacheLocation> {
        let key = CacheKey::new(&data.page_url, data.device, CacheStage::Report)
            .with_model(self.backend.model());
        let written = serde_json::to_value(response)
            .map_err(CacheError::from)
            .and_then(|value| self.cache.write_json(&key, &value))
            .and_then(|_| self.cache.write_text(&key, &response.content));

        match written {
            Ok(location) => {
                info!(%location, "report cached");
                self.sink.emit(ReportEvent::ReportCached {
                    location: location.to_string(),
                });
                Some(location)
            }
            Err(e) => {
                error!(error = %e, "failed to cache report");
                None
            }
        }
    }
}
