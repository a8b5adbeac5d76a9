//! Prometheus text export of the telemetry tree and the alert window
//!
//! A fresh registry is built per scrape from the current snapshot, so the
//! exported values always equal what `/api/admin/stats` reports.
use draftgate_ops::{Bucket, OpsAlertSummary, TelemetryCounters, TelemetrySnapshot};
use prometheus::{Encoder, Gauge, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

fn int_gauge_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<IntGaugeVec, prometheus::Error> {
    let vec = IntGaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}

fn set_counters(vec: &IntGaugeVec, key: Option<&str>, counters: &TelemetryCounters) {
    for bucket in Bucket::ALL {
        let value = counters.get(bucket) as i64;
        match key {
            Some(key) => vec.with_label_values(&[key, bucket.as_str()]).set(value),
            None => vec.with_label_values(&[bucket.as_str()]).set(value),
        }
    }
}

pub fn registry(
    snapshot: &TelemetrySnapshot,
    summary: &OpsAlertSummary,
) -> Result<Registry, prometheus::Error> {
    let registry = Registry::new_custom(Some("draftgate".to_string()), None)?;

    let totals = int_gauge_vec(&registry, "outcomes", "Finalized outcomes per bucket", &["bucket"])?;
    set_counters(&totals, None, &snapshot.totals);

    let by_mode = int_gauge_vec(
        &registry,
        "mode_outcomes",
        "Finalized outcomes per pipeline mode",
        &["mode", "bucket"],
    )?;
    for (mode, counters) in &snapshot.by_mode {
        set_counters(&by_mode, Some(mode), counters);
    }

    let by_emotion = int_gauge_vec(
        &registry,
        "emotion_outcomes",
        "Finalized outcomes per emotion category",
        &["emotion", "bucket"],
    )?;
    for (emotion, counters) in &snapshot.by_emotion {
        set_counters(&by_emotion, Some(emotion), counters);
    }

    let failure_rate = Gauge::new("window_failure_rate", "Failure rate over the alert window")?;
    failure_rate.set(summary.failure_rate);
    registry.register(Box::new(failure_rate))?;

    let p95 = IntGauge::new("window_p95_latency_ms", "p95 latency over the alert window")?;
    p95.set(summary.p95_latency_ms as i64);
    registry.register(Box::new(p95))?;

    let ai_errors = IntGauge::new("window_ai_errors", "AI errors over the alert window")?;
    ai_errors.set(summary.ai_error_count as i64);
    registry.register(Box::new(ai_errors))?;

    let active = int_gauge_vec(&registry, "active_alerts", "Active alert conditions", &["severity"])?;
    active.with_label_values(&["warning"]).set(summary.active_alerts.warning as i64);
    active.with_label_values(&["critical"]).set(summary.active_alerts.critical as i64);

    Ok(registry)
}

pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

pub fn render(
    snapshot: &TelemetrySnapshot,
    summary: &OpsAlertSummary,
) -> Result<String, prometheus::Error> {
    encode(&registry(snapshot, summary)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use draftgate_ops::ActiveAlertCounts;

    fn summary() -> OpsAlertSummary {
        OpsAlertSummary {
            failure_rate: 0.25,
            p95_latency_ms: 1800,
            ai_error_count: 1,
            total_samples: 8,
            window_minutes: 10,
            active_alerts: ActiveAlertCounts { warning: 2, critical: 0 },
            evaluated_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_includes_buckets_and_window() {
        let mut snapshot = TelemetrySnapshot::default();
        snapshot.totals.requests = 8;
        snapshot.totals.success = 6;
        snapshot.by_mode.insert(
            "draft".to_string(),
            TelemetryCounters {
                requests: 8,
                success: 6,
                ..TelemetryCounters::default()
            },
        );

        let text = render(&snapshot, &summary()).unwrap();
        assert!(text.contains(r#"draftgate_outcomes{bucket="requests"} 8"#));
        assert!(text.lines().any(|line| line.starts_with("draftgate_mode_outcomes{")
            && line.contains(r#"mode="draft""#)
            && line.contains(r#"bucket="success""#)
            && line.ends_with(" 6")));
        assert!(text.contains("draftgate_window_failure_rate 0.25"));
        assert!(text.contains(r#"draftgate_active_alerts{severity="warning"} 2"#));
    }
}
