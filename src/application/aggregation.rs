// Statistical aggregation over telemetry groups
use crate::domain::telemetry::AggregateStats;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: usize,
    sum: f64,
    max: f64,
    min: f64,
}

impl Accumulator {
    fn seed(value: f64) -> Self {
        Self {
            count: 1,
            sum: value,
            max: value,
            min: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.max = self.max.max(value);
        self.min = self.min.min(value);
    }

    fn finish(self, group_key: String) -> AggregateStats {
        if self.count == 0 {
            return AggregateStats::empty(group_key);
        }
        // Rounding may step outside the observed range, keep min <= avg <= max.
        let average = round2(self.sum / self.count as f64).clamp(self.min, self.max);
        AggregateStats {
            group_key,
            average,
            max: self.max,
            min: self.min,
            count: self.count,
        }
    }
}

/// Missing and non-finite values count as 0.
fn coerce(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Group `records` by `key_fn` and summarize `value_fn` per group.
///
/// Groups come back in ascending key order. Max and min start at the first
/// value seen in each group.
pub fn aggregate<T, K, V>(
    records: &[T],
    key_fn: K,
    value_fn: V,
) -> BTreeMap<String, AggregateStats>
where
    K: Fn(&T) -> String,
    V: Fn(&T) -> Option<f64>,
{
    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    for record in records {
        let value = coerce(value_fn(record));
        groups
            .entry(key_fn(record))
            .and_modify(|acc| acc.push(value))
            .or_insert_with(|| Accumulator::seed(value));
    }

    groups
        .into_iter()
        .map(|(key, acc)| (key.clone(), acc.finish(key)))
        .collect()
}

/// Single-group average; 0 when there is nothing to average.
pub fn mean<T, V>(records: &[T], value_fn: V) -> f64
where
    V: Fn(&T) -> Option<f64>,
{
    if records.is_empty() {
        return 0.0;
    }
    let sum: f64 = records.iter().map(|r| coerce(value_fn(r))).sum();
    sum / records.len() as f64
}

/// Occurrences per key, in ascending key order.
pub fn count_by<T, K>(records: &[T], key_fn: K) -> BTreeMap<String, usize>
where
    K: Fn(&T) -> String,
{
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(key_fn(record)).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::TelemetrySample;

    fn sample(car: &str, speed: Option<f64>) -> TelemetrySample {
        TelemetrySample {
            car_id: Some(car.to_string()),
            speed,
            ..Default::default()
        }
    }

    #[test]
    fn test_speed_by_vehicle() {
        let records = vec![
            sample("C1", Some(50.0)),
            sample("C1", Some(70.0)),
            sample("C2", Some(30.0)),
        ];

        let stats = aggregate(&records, TelemetrySample::vehicle_id, |s| s.speed);

        assert_eq!(stats.keys().collect::<Vec<_>>(), vec!["C1", "C2"]);
        let c1 = &stats["C1"];
        assert_eq!((c1.average, c1.max, c1.min, c1.count), (60.0, 70.0, 50.0, 2));
        let c2 = &stats["C2"];
        assert_eq!((c2.average, c2.max, c2.min, c2.count), (30.0, 30.0, 30.0, 1));
    }

    #[test]
    fn test_empty_input() {
        let stats = aggregate(
            &Vec::<TelemetrySample>::new(),
            TelemetrySample::vehicle_id,
            |s| s.speed,
        );
        assert!(stats.is_empty());
        assert_eq!(
            AggregateStats::empty("C9"),
            AggregateStats {
                group_key: "C9".into(),
                average: 0.0,
                max: 0.0,
                min: 0.0,
                count: 0
            }
        );
        assert_eq!(mean(&Vec::<TelemetrySample>::new(), |s| s.speed), 0.0);
    }

    #[test]
    fn test_missing_values_count_as_zero() {
        let records = vec![
            sample("C1", None),
            sample("C1", Some(40.0)),
            sample("C1", Some(f64::NAN)),
        ];
        let c1 = &aggregate(&records, TelemetrySample::vehicle_id, |s| s.speed)["C1"];
        assert_eq!(c1.count, 3);
        assert_eq!(c1.min, 0.0);
        assert_eq!(c1.max, 40.0);
        assert_eq!(c1.average, 13.33);
    }

    #[test]
    fn test_negative_values_are_not_masked() {
        let records = vec![sample("C1", Some(-5.0)), sample("C1", Some(-1.0))];
        let c1 = &aggregate(&records, TelemetrySample::vehicle_id, |s| s.speed)["C1"];
        assert_eq!(c1.max, -1.0);
        assert_eq!(c1.min, -5.0);
    }

    #[test]
    fn test_average_within_bounds() {
        let values = [1.005, 1.005, 1.005, 3.3333, 0.0001, 99.999, 12.0];
        for window in 1..=values.len() {
            let records: Vec<_> = values[..window].iter().map(|v| sample("C", Some(*v))).collect();
            let stats = &aggregate(&records, TelemetrySample::vehicle_id, |s| s.speed)["C"];
            assert!(stats.min <= stats.average && stats.average <= stats.max, "{:?}", stats);
        }
    }

    #[test]
    fn test_source_untouched_and_deterministic() {
        let records = vec![sample("B", Some(1.0)), sample("A", Some(2.0))];
        let before = records.clone();
        let first = aggregate(&records, TelemetrySample::vehicle_id, |s| s.speed);
        let second = aggregate(&records, TelemetrySample::vehicle_id, |s| s.speed);
        assert_eq!(records, before);
        assert_eq!(first, second);
    }

    #[test]
    fn test_count_by_type() {
        let types = ["LOW_FUEL", "HIGH_SPEED", "LOW_FUEL"];
        let counts = count_by(&types, |t| t.to_string());
        assert_eq!(counts["LOW_FUEL"], 2);
        assert_eq!(counts["HIGH_SPEED"], 1);
    }
}
