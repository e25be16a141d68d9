// Alert-to-telemetry correlation by nearest timestamp
use chrono::{Duration, NaiveDateTime};

use crate::application::classifier::Thresholds;
use crate::domain::alert::{AlertRecord, CorrelatedAlert};
use crate::domain::telemetry::TelemetrySample;
use crate::domain::time_range::Timestamped;

/// Number of most recent alerts explained on the driver dashboard.
pub const RECENT_ALERTS: usize = 3;

/// Margin added around the alert cluster when fetching telemetry.
pub const WINDOW_MARGIN_MINUTES: i64 = 10;

/// Sample closest in absolute time to `target`.
///
/// Ties go to the sample that appears first in `samples`. Samples without a
/// timestamp are never chosen.
pub fn nearest<T: Timestamped>(target: NaiveDateTime, samples: &[T]) -> Option<&T> {
    let mut best: Option<(&T, Duration)> = None;
    for sample in samples {
        let Some(ts) = sample.timestamp() else {
            continue;
        };
        let diff = (ts - target).abs();
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((sample, diff)),
        }
    }
    best.map(|(sample, _)| sample)
}

/// Newest-first alerts, at most `bound` of them. Undated alerts sort last.
pub fn recent_alerts(alerts: &[AlertRecord], bound: usize) -> Vec<AlertRecord> {
    let mut sorted = alerts.to_vec();
    sort_newest_first(&mut sorted);
    sorted.truncate(bound);
    sorted
}

pub fn sort_newest_first(alerts: &mut [AlertRecord]) {
    alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Telemetry window covering every dated alert plus `margin` on each side.
pub fn correlation_window(
    alerts: &[AlertRecord],
    margin: Duration,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let mut stamps = alerts.iter().filter_map(|a| a.timestamp);
    let first = stamps.next()?;
    let (min, max) = stamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts)));
    Some((min - margin, max + margin))
}

/// Attach the derived reading and cause to each alert.
pub fn correlate(
    alerts: &[AlertRecord],
    samples: &[TelemetrySample],
    thresholds: &Thresholds,
) -> Vec<CorrelatedAlert> {
    alerts
        .iter()
        .map(|alert| {
            let sample = alert.timestamp.and_then(|ts| nearest(ts, samples));
            let derived_value = sample.and_then(|s| derive_value(alert, s));
            let cause = thresholds.classify(&alert.alert_type, derived_value.as_deref());
            CorrelatedAlert {
                alert: alert.clone(),
                derived_value,
                cause,
            }
        })
        .collect()
}

fn derive_value(alert: &AlertRecord, sample: &TelemetrySample) -> Option<String> {
    let metric = alert.category().metric()?;
    sample.value_of(metric).map(|value| metric.format(value))
}
