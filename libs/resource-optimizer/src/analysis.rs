use std::collections::HashMap;

use chrono::{Duration, Timelike, Utc};

use crate::stats::{mean, stdev, trend_correlation, variance};
use crate::types::{TrendDirection, WorkloadAnalysis, WorkloadPattern, WorkloadSample};

const MIN_SAMPLES_FOR_ANALYSIS: usize = 10;
const MIN_SAMPLES_FOR_TREND_SPLIT: usize = 20;
const GROWTH_THRESHOLD: f64 = 0.2;
const STEADY_CV_THRESHOLD: f64 = 0.2;
const BURSTY_CV_THRESHOLD: f64 = 0.8;
const PEAK_HOUR_MULTIPLIER: f64 = 1.2;
const TREND_CORRELATION_THRESHOLD: f64 = 0.3;

/// Classifies the samples' coefficient of variation and first/second-half
/// growth rate into one of the six workload patterns, returning a
/// confidence score alongside the classification.
pub fn detect_pattern(samples: &[WorkloadSample]) -> (WorkloadPattern, f64) {
    if samples.len() < MIN_SAMPLES_FOR_ANALYSIS {
        return (WorkloadPattern::Random, 0.0);
    }

    let loads: Vec<f64> = samples.iter().map(|s| s.load).collect();
    let mean_load = mean(&loads);
    let cv = if mean_load > 0.0 { stdev(&loads) / mean_load } else { 0.0 };

    if loads.len() >= MIN_SAMPLES_FOR_TREND_SPLIT {
        let mid = loads.len() / 2;
        let first_avg = mean(&loads[..mid]);
        let second_avg = mean(&loads[mid..]);
        let growth_rate = if first_avg > 0.0 { (second_avg - first_avg) / first_avg } else { 0.0 };

        if growth_rate > GROWTH_THRESHOLD {
            return (WorkloadPattern::Growing, 0.8);
        }
        if growth_rate < -GROWTH_THRESHOLD {
            return (WorkloadPattern::Declining, 0.8);
        }
    }

    if cv < STEADY_CV_THRESHOLD {
        (WorkloadPattern::Steady, 0.9)
    } else if cv > BURSTY_CV_THRESHOLD {
        (WorkloadPattern::Bursty, 0.7)
    } else {
        (WorkloadPattern::Periodic, 0.6)
    }
}

/// Hours of day whose mean load exceeds 1.2x the overall mean.
pub fn find_peak_hours(samples: &[WorkloadSample]) -> Vec<u32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut by_hour: HashMap<u32, Vec<f64>> = HashMap::new();
    for sample in samples {
        by_hour.entry(sample.timestamp.hour()).or_default().push(sample.load);
    }

    let overall_average = mean(&samples.iter().map(|s| s.load).collect::<Vec<_>>());
    let mut peak_hours: Vec<u32> = by_hour
        .into_iter()
        .filter(|(_, loads)| mean(loads) > overall_average * PEAK_HOUR_MULTIPLIER)
        .map(|(hour, _)| hour)
        .collect();
    peak_hours.sort_unstable();
    peak_hours
}

/// Direction of a simple linear fit over the sample sequence.
pub fn analyze_trend(loads: &[f64]) -> TrendDirection {
    if loads.len() < MIN_SAMPLES_FOR_ANALYSIS {
        return TrendDirection::Unknown;
    }
    match trend_correlation(loads) {
        None => TrendDirection::Stable,
        Some(corr) if corr > TREND_CORRELATION_THRESHOLD => TrendDirection::Increasing,
        Some(corr) if corr < -TREND_CORRELATION_THRESHOLD => TrendDirection::Decreasing,
        Some(_) => TrendDirection::Stable,
    }
}

fn workload_recommendations(
    pattern_type: WorkloadPattern,
    average_load: f64,
    peak_load: f64,
    load_variance: f64,
) -> Vec<String> {
    let mut recs = Vec::new();

    match pattern_type {
        WorkloadPattern::Bursty => {
            recs.push("Consider implementing auto-scaling for burst workloads".to_string());
            recs.push("Add more backup workers for peak demand periods".to_string());
        }
        WorkloadPattern::Steady => {
            recs.push("Current steady workload is well-suited for fixed resource allocation".to_string());
            if average_load > 80.0 {
                recs.push("Consider adding more workers to reduce sustained high load".to_string());
            }
        }
        WorkloadPattern::Periodic => {
            recs.push("Implement scheduled scaling based on periodic patterns".to_string());
            recs.push("Pre-warm resources before expected peak periods".to_string());
        }
        WorkloadPattern::Growing => {
            recs.push("Plan for capacity expansion due to growing workload trend".to_string());
            recs.push("Consider upgrading to higher subscription tier".to_string());
        }
        WorkloadPattern::Declining => {
            recs.push("Consider reducing resource allocation due to declining workload".to_string());
            recs.push("Evaluate potential cost savings from tier downgrade".to_string());
        }
        WorkloadPattern::Random => {}
    }

    if peak_load > 95.0 {
        recs.push("Peak load is very high - add more capacity immediately".to_string());
    } else if average_load < 20.0 {
        recs.push("Average load is low - consider optimizing resource allocation".to_string());
    }

    if load_variance > 50.0 {
        recs.push("High load variance detected - implement dynamic scaling".to_string());
    }

    recs
}

/// Runs the full workload-pattern analysis pipeline over `samples` for the
/// given `analysis_period`, returning a low-confidence `Random` result when
/// fewer than ten samples are available.
pub fn analyze_workload_patterns(
    samples: &[WorkloadSample],
    analysis_period: Duration,
) -> WorkloadAnalysis {
    if samples.len() < MIN_SAMPLES_FOR_ANALYSIS {
        return WorkloadAnalysis {
            pattern_type: WorkloadPattern::Random,
            confidence: 0.0,
            peak_hours: Vec::new(),
            average_load: 0.0,
            peak_load: 0.0,
            load_variance: 0.0,
            trend_direction: TrendDirection::Unknown,
            recommendations: vec!["Collect more data for accurate analysis".to_string()],
            analysis_period_secs: analysis_period.num_seconds(),
            timestamp: Utc::now(),
        };
    }

    let loads: Vec<f64> = samples.iter().map(|s| s.load).collect();
    let average_load = mean(&loads);
    let peak_load = loads.iter().cloned().fold(f64::MIN, f64::max);
    let load_variance = variance(&loads);

    let (pattern_type, confidence) = detect_pattern(samples);
    let peak_hours = find_peak_hours(samples);
    let trend_direction = analyze_trend(&loads);
    let recommendations = workload_recommendations(pattern_type, average_load, peak_load, load_variance);

    WorkloadAnalysis {
        pattern_type,
        confidence,
        peak_hours,
        average_load,
        peak_load,
        load_variance,
        trend_direction,
        recommendations,
        analysis_period_secs: analysis_period.num_seconds(),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(hour_offset: i64, load: f64) -> WorkloadSample {
        WorkloadSample { timestamp: Utc::now() - Duration::hours(hour_offset), load }
    }

    #[test]
    fn fewer_than_ten_samples_yields_random_with_zero_confidence() {
        let samples = vec![sample(0, 10.0); 5];
        let analysis = analyze_workload_patterns(&samples, Duration::hours(24));
        assert_eq!(analysis.pattern_type, WorkloadPattern::Random);
        assert_eq!(analysis.confidence, 0.0);
        assert_eq!(analysis.recommendations, vec!["Collect more data for accurate analysis"]);
    }

    #[test]
    fn constant_load_is_classified_steady() {
        let samples: Vec<WorkloadSample> = (0..15).map(|i| sample(i, 50.0)).collect();
        let (pattern, confidence) = detect_pattern(&samples);
        assert_eq!(pattern, WorkloadPattern::Steady);
        assert_eq!(confidence, 0.9);
    }

    #[test]
    fn wildly_varying_load_is_classified_bursty() {
        let loads = [10.0, 90.0, 5.0, 95.0, 8.0, 92.0, 3.0, 97.0, 12.0, 88.0, 6.0];
        let samples: Vec<WorkloadSample> =
            loads.iter().enumerate().map(|(i, l)| sample(i as i64, *l)).collect();
        let (pattern, _) = detect_pattern(&samples);
        assert_eq!(pattern, WorkloadPattern::Bursty);
    }

    #[test]
    fn strongly_growing_load_across_twenty_samples_is_classified_growing() {
        let samples: Vec<WorkloadSample> =
            (0..20).map(|i| sample(20 - i, 10.0 + i as f64 * 5.0)).collect();
        let (pattern, confidence) = detect_pattern(&samples);
        assert_eq!(pattern, WorkloadPattern::Growing);
        assert_eq!(confidence, 0.8);
    }
}
