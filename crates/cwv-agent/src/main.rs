//! # cwv-agent
//!
//! Command-line entry point: generates a Core Web Vitals report for one page
//! from pre-collected artifacts and prints it to stdout. Progress goes to
//! stderr.

#![deny(unsafe_code)]

mod artifacts;
mod presenter;
mod rules;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cwv_cache::{CacheStore, FileCacheStore};
use cwv_core::DeviceType;
use cwv_core::logging::{init_json_subscriber, init_subscriber};
use cwv_llm::{OpenAiChatBackend, OpenAiConfig};
use cwv_report::{ReportError, ReportGenerator, ReportRequest};
use cwv_settings::get_settings;
use tracing::info;

use crate::artifacts::ArtifactCollectors;
use crate::presenter::{ConsolePresenter, PresenterMode};
use crate::rules::HeuristicRules;

/// Core Web Vitals report agent.
#[derive(Parser, Debug)]
#[command(name = "cwv-agent", about = "Generate a Core Web Vitals report for a page")]
struct Cli {
    /// Page URL.
    url: String,

    /// Device profile (`mobile` or `desktop`).
    #[arg(long, default_value = "mobile")]
    device: DeviceType,

    /// Model id (overrides settings).
    #[arg(long)]
    model: Option<String>,

    /// Ignore the cached report and cached rule findings.
    #[arg(long)]
    skip_cache: bool,

    /// Cache root (overrides settings).
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Log filter (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Write progress events as JSON lines.
    #[arg(long)]
    json_events: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            if let Some(hint) = e.downcast_ref::<ReportError>().and_then(retry_hint) {
                eprintln!("{hint}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Advice for failures a later run could get past.
fn retry_hint(err: &ReportError) -> Option<String> {
    match err.retry_after_ms() {
        Some(ms) => Some(format!("retry after {}s", ms.div_ceil(1000))),
        None if err.is_transient() => Some("the failure looks transient; try again later".into()),
        None => None,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = get_settings();

    let level = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    if settings.logging.json {
        init_json_subscriber(level);
    } else {
        init_subscriber(level);
    }

    let model = cli.model.unwrap_or_else(|| settings.models.default.clone());
    let budget = settings.models.resolve_budget(&model);
    let cache_dir = cli
        .cache_dir
        .unwrap_or_else(|| settings.cache.resolved_dir());
    info!(cache_dir = %cache_dir.display(), %model, "configured");
    let cache: Arc<dyn CacheStore> = Arc::new(FileCacheStore::new(cache_dir));

    let config = OpenAiConfig::from_settings(&settings.api, &model, Some(budget.output_limit))
        .context("invalid API configuration")?;
    let backend = OpenAiChatBackend::new(config).context("failed to build HTTP client")?;

    let mode = if cli.json_events {
        PresenterMode::JsonLines
    } else {
        PresenterMode::Human
    };
    let generator = ReportGenerator::new(
        ArtifactCollectors::collector_set(cache.clone()),
        Arc::new(HeuristicRules),
        Arc::new(backend),
        cache,
    )
    .with_sink(Arc::new(ConsolePresenter::new(std::io::stderr(), mode)))
    .with_models(settings.models.clone())
    .with_prompt_settings(settings.prompt.clone());

    let request = ReportRequest::new(cli.url, cli.device).skip_cache(cli.skip_cache);
    let report = generator.generate(&request).await?;
    info!(
        from_cache = report.from_cache,
        attempts = report.attempts.len(),
        "report ready"
    );
    println!("{}", report.content());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cwv_core::{FailureKind, Tier};
    use cwv_llm::BackendError;

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "cwv-agent",
            "https://a.test/",
            "--device",
            "desktop",
            "--skip-cache",
            "--model",
            "gpt-4o",
        ])
        .unwrap();
        assert_eq!(cli.device, DeviceType::Desktop);
        assert!(cli.skip_cache);
        assert_eq!(cli.model.as_deref(), Some("gpt-4o"));
        assert!(!cli.json_events);
    }

    #[test]
    fn device_defaults_to_mobile() {
        let cli = Cli::try_parse_from(["cwv-agent", "https://a.test/"]).unwrap();
        assert_eq!(cli.device, DeviceType::Mobile);
    }

    fn backend_failure(kind: FailureKind, source: BackendError) -> ReportError {
        ReportError::Backend {
            kind,
            tier: Tier::Summarized,
            source,
        }
    }

    #[test]
    fn hint_prefers_the_backend_delay() {
        let err = backend_failure(
            FailureKind::RateLimited,
            BackendError::RateLimited {
                retry_after_ms: 1_500,
                message: "slow down".into(),
            },
        );
        assert_eq!(retry_hint(&err).as_deref(), Some("retry after 2s"));
    }

    #[test]
    fn hint_for_server_errors_without_delay() {
        let err = backend_failure(
            FailureKind::Unknown,
            BackendError::Api {
                status: 503,
                message: "overloaded".into(),
                code: None,
                retryable: true,
            },
        );
        assert!(retry_hint(&err).unwrap().contains("transient"));
    }

    #[test]
    fn no_hint_for_auth_failures() {
        let err = backend_failure(
            FailureKind::AuthInvalid,
            BackendError::Auth {
                status: Some(401),
                message: "bad key".into(),
            },
        );
        assert_eq!(retry_hint(&err), None);
    }

    #[test]
    fn rejects_unknown_device() {
        assert!(Cli::try_parse_from(["cwv-agent", "https://a.test/", "--device", "tv"]).is_err());
    }
}
