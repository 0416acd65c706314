//! Built-in heuristic rule engine.
//!
//! Used when no rule findings were cached by external tooling. Checks the
//! field metrics against the Core Web Vitals thresholds, lists the heaviest
//! responses in the HAR, and counts parser-blocking scripts in `<head>`.

use std::fmt::Write as _;

use async_trait::async_trait;
use cwv_core::{DeviceType, RulesOutcome};
use cwv_report::{CollectOptions, EvidenceBundle, RuleEngine, RuleEngineError};
use serde_json::Value;

/// Responses listed in the heaviest-resources finding.
const HEAVIEST_LIMIT: usize = 3;

/// `(metric key, label, good threshold, poor threshold)`.
const THRESHOLDS: [(&str, &str, f64, f64); 3] = [
    ("largest_contentful_paint", "LCP", 2500.0, 4000.0),
    ("interaction_to_next_paint", "INP", 200.0, 500.0),
    ("cumulative_layout_shift", "CLS", 0.1, 0.25),
];

/// Heuristic rules over the evidence bundle.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicRules;

#[async_trait]
impl RuleEngine for HeuristicRules {
    async fn evaluate(
        &self,
        _page_url: &str,
        _device: DeviceType,
        _options: &CollectOptions,
        evidence: &EvidenceBundle<'_>,
    ) -> Result<RulesOutcome, RuleEngineError> {
        let mut findings = Vec::new();
        if let Some(crux) = evidence.crux {
            findings.extend(field_metric_findings(crux));
        }
        if let Some(har) = evidence.har {
            findings.extend(heaviest_responses(har));
        }
        if let Some(html) = evidence.full_html {
            let blocking = blocking_head_scripts(html);
            if blocking > 0 {
                findings.push(format!(
                    "{blocking} parser-blocking script(s) in <head> (no async, defer or type=module)"
                ));
            }
        }

        let mut summary = String::new();
        if findings.is_empty() {
            summary.push_str("No rule violations found.");
        }
        for finding in &findings {
            let _ = writeln!(summary, "- {finding}");
        }
        Ok(RulesOutcome {
            summary,
            from_cache: false,
        })
    }
}

fn field_metric_findings(crux: &Value) -> Vec<String> {
    let metrics = &crux["record"]["metrics"];
    THRESHOLDS
        .iter()
        .filter_map(|(key, label, good, poor)| {
            let p75 = p75(&metrics[*key])?;
            if p75 <= *good {
                return None;
            }
            let rating = if p75 <= *poor {
                "needs improvement"
            } else {
                "poor"
            };
            Some(format!("{label} p75 is {p75} ({rating}, good is <= {good})"))
        })
        .collect()
}

/// CrUX reports p75 as a number or, for CLS, a numeric string.
fn p75(metric: &Value) -> Option<f64> {
    let value = &metric["percentiles"]["p75"];
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn heaviest_responses(har: &Value) -> Vec<String> {
    let Some(entries) = har["log"]["entries"].as_array() else {
        return Vec::new();
    };
    let mut sized: Vec<(&str, u64)> = entries
        .iter()
        .filter_map(|e| {
            let url = e["request"]["url"].as_str()?;
            let size = e["response"]["_transferSize"]
                .as_u64()
                .or_else(|| e["response"]["content"]["size"].as_u64())?;
            Some((url, size))
        })
        .collect();
    sized.sort_by(|a, b| b.1.cmp(&a.1));
    sized
        .into_iter()
        .take(HEAVIEST_LIMIT)
        .map(|(url, size)| format!("heavy response: {url} ({} KB)", size / 1024))
        .collect()
}

fn blocking_head_scripts(html: &str) -> usize {
    let lower = html.to_ascii_lowercase();
    let head = lower
        .split_once("</head>")
        .map_or(lower.as_str(), |(head, _)| head);
    head.split("<script")
        .skip(1)
        .filter_map(|tag| tag.split_once('>').map(|(attrs, _)| attrs))
        .filter(|attrs| attrs.contains("src="))
        .filter(|attrs| {
            !(attrs.contains("async") || attrs.contains("defer") || attrs.contains("module"))
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn field_metrics_rated_against_thresholds() {
        let crux = json!({"record": {"metrics": {
            "largest_contentful_paint": {"percentiles": {"p75": 4200}},
            "interaction_to_next_paint": {"percentiles": {"p75": 150}},
            "cumulative_layout_shift": {"percentiles": {"p75": "0.15"}}
        }}});
        let findings = field_metric_findings(&crux);
        assert_eq!(findings.len(), 2);
        assert!(findings[0].starts_with("LCP p75 is 4200 (poor"));
        assert!(findings[1].starts_with("CLS p75 is 0.15 (needs improvement"));
    }

    #[test]
    fn heaviest_responses_sorted_and_capped() {
        let har = json!({"log": {"entries": [
            {"request": {"url": "a"}, "response": {"_transferSize": 2048}},
            {"request": {"url": "b"}, "response": {"content": {"size": 10240}}},
            {"request": {"url": "c"}, "response": {"_transferSize": 4096}},
            {"request": {"url": "d"}, "response": {"_transferSize": 1024}},
            {"request": {"url": "e"}, "response": {}}
        ]}});
        let findings = heaviest_responses(&har);
        assert_eq!(
            findings,
            vec![
                "heavy response: b (10 KB)",
                "heavy response: c (4 KB)",
                "heavy response: a (2 KB)"
            ]
        );
    }

    #[test]
    fn blocking_scripts_only_counted_in_head() {
        let html = r#"<html><head>
            <script src="/a.js"></script>
            <script src="/b.js" defer></script>
            <script type="module" src="/c.js"></script>
            <script>inline()</script>
            </head><body><script src="/d.js"></script></body></html>"#;
        assert_eq!(blocking_head_scripts(html), 1);
    }

    #[tokio::test]
    async fn clean_page_has_no_findings() {
        let resources = BTreeMap::new();
        let evidence = EvidenceBundle {
            crux: None,
            psi: None,
            har: None,
            perf_entries: None,
            resources: &resources,
            full_html: Some("<html><head></head></html>"),
            js_api: None,
        };
        let outcome = HeuristicRules
            .evaluate(
                "https://a.test/",
                DeviceType::Mobile,
                &CollectOptions::default(),
                &evidence,
            )
            .await
            .unwrap();
        assert_eq!(outcome.summary, "No rule violations found.");
        assert!(!outcome.from_cache);
    }
}
