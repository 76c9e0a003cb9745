use tracing::debug;

use super::error::{ForecastError, Result};
use super::types::{BalancePoint, DetectorConfig, ExtremaReport, TurningPoint, TurningPointKind};

/// Returns the local minima (and maxima, when configured) of a balance series.
///
/// Index `i` in `[r, len - r)` qualifies when its balance equals the extremum of the
/// closed window `[i - r, i + r]` and differs from the previous day's balance. The
/// previous-day guard keeps a flat stretch at the extremum from firing on every day.
pub fn detect_turning_points(
    series: &[BalancePoint],
    config: DetectorConfig,
) -> Result<Vec<TurningPoint>> {
    let radius = config.radius.days();
    let required = 2 * radius + 1;
    if series.len() < required {
        return Err(ForecastError::InsufficientSeries {
            what: "balance series",
            required,
            actual: series.len(),
        });
    }

    let mut points = Vec::new();
    for i in radius..series.len() - radius {
        let current = series[i].balance;
        if current == series[i - 1].balance {
            continue;
        }

        let window = &series[i - radius..=i + radius];
        let (low, high) = window_bounds(window);

        if current == low {
            points.push(turning_point(&series[i], TurningPointKind::Minimum));
        }
        if config.report == ExtremaReport::Both && current == high {
            points.push(turning_point(&series[i], TurningPointKind::Maximum));
        }
    }

    debug!(
        radius,
        candidates = series.len() - 2 * radius,
        found = points.len(),
        "detected turning points"
    );
    Ok(points)
}

fn window_bounds(window: &[BalancePoint]) -> (f64, f64) {
    window.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.balance), hi.max(p.balance))
    })
}

fn turning_point(point: &BalancePoint, kind: TurningPointKind) -> TurningPoint {
    TurningPoint {
        date: point.date,
        balance: point.balance,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::WindowRadius;
    use chrono::{Days, NaiveDate};
    use proptest::prelude::{prop, prop_assert, proptest};

    fn series_from(balances: &[f64]) -> Vec<BalancePoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
        balances
            .iter()
            .enumerate()
            .map(|(i, &balance)| BalancePoint {
                date: start + Days::new(i as u64),
                balance,
            })
            .collect()
    }

    fn config(radius: WindowRadius, report: ExtremaReport) -> DetectorConfig {
        DetectorConfig { radius, report }
    }

    fn kinds_at(points: &[TurningPoint], series: &[BalancePoint]) -> Vec<(usize, TurningPointKind)> {
        points
            .iter()
            .map(|p| {
                let idx = series
                    .iter()
                    .position(|s| s.date == p.date)
                    .expect("point comes from series");
                (idx, p.kind)
            })
            .collect()
    }

    #[test]
    fn finds_a_single_valley_with_radius_two() {
        let series = series_from(&[10.0, 9.0, 8.0, 5.0, 8.0, 9.0, 10.0]);
        let points = detect_turning_points(&series, config(WindowRadius::Two, ExtremaReport::Minima))
            .expect("detects");

        assert_eq!(kinds_at(&points, &series), vec![(3, TurningPointKind::Minimum)]);
        assert_eq!(points[0].balance, 5.0);
    }

    #[test]
    fn reports_maxima_only_when_configured() {
        let series = series_from(&[1.0, 2.0, 3.0, 9.0, 3.0, 2.0, 1.0, 0.5, 1.0, 2.0, 3.0]);

        let minima = detect_turning_points(&series, config(WindowRadius::Two, ExtremaReport::Minima))
            .expect("detects");
        let both = detect_turning_points(&series, config(WindowRadius::Two, ExtremaReport::Both))
            .expect("detects");

        assert_eq!(kinds_at(&minima, &series), vec![(7, TurningPointKind::Minimum)]);
        assert_eq!(
            kinds_at(&both, &series),
            vec![(3, TurningPointKind::Maximum), (7, TurningPointKind::Minimum)]
        );
    }

    #[test]
    fn wider_window_ignores_shallow_dips() {
        // The dip at index 3 is a minimum over +-2 days but not over +-3 days.
        let series = series_from(&[1.0, 6.0, 6.0, 4.0, 6.0, 6.0, 6.0, 6.0]);

        let narrow = detect_turning_points(&series, config(WindowRadius::Two, ExtremaReport::Minima))
            .expect("detects");
        let wide = detect_turning_points(&series, config(WindowRadius::Three, ExtremaReport::Minima))
            .expect("detects");

        assert_eq!(kinds_at(&narrow, &series), vec![(3, TurningPointKind::Minimum)]);
        assert!(wide.is_empty());
    }

    #[test]
    fn plateau_triggers_only_on_entry() {
        let series = series_from(&[5.0, 5.0, 4.0, 3.0, 3.0, 3.0, 4.0, 5.0, 5.0]);
        let points = detect_turning_points(&series, config(WindowRadius::Two, ExtremaReport::Minima))
            .expect("detects");

        assert_eq!(kinds_at(&points, &series), vec![(3, TurningPointKind::Minimum)]);
    }

    #[test]
    fn window_margin_excludes_series_edges() {
        // Global minimum sits at index 0 and maximum at the last index.
        let series = series_from(&[0.0, 3.0, 2.0, 4.0, 2.0, 5.0, 9.0]);
        let points = detect_turning_points(&series, config(WindowRadius::Two, ExtremaReport::Both))
            .expect("detects");

        assert!(points.iter().all(|p| p.balance != 0.0 && p.balance != 9.0));
    }

    #[test]
    fn step_into_flat_window_reports_one_kind() {
        // The previous day sits inside the window, so a step into a flat run is either
        // the window's high or its low, never both.
        let series = series_from(&[1.0, 2.0, 3.0, 3.0, 3.0]);
        let points = detect_turning_points(&series, config(WindowRadius::Two, ExtremaReport::Both))
            .expect("detects");

        assert_eq!(
            kinds_at(&points, &series),
            vec![(2, TurningPointKind::Maximum)]
        );

        let series = series_from(&[4.0, 4.0, 3.0, 3.0, 3.0]);
        let points = detect_turning_points(&series, config(WindowRadius::Two, ExtremaReport::Both))
            .expect("detects");
        assert_eq!(
            kinds_at(&points, &series),
            vec![(2, TurningPointKind::Minimum)]
        );
    }

    #[test]
    fn short_series_is_rejected() {
        let series = series_from(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let err = detect_turning_points(&series, config(WindowRadius::Three, ExtremaReport::Minima))
            .expect_err("needs seven points");
        assert!(matches!(
            err,
            ForecastError::InsufficientSeries {
                required: 7,
                actual: 6,
                ..
            }
        ));
        assert!(detect_turning_points(&series[..5], config(WindowRadius::Two, ExtremaReport::Minima)).is_ok());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_emitted_points_differ_from_previous_day(
            cents in prop::collection::vec(-50i64..50, 7..80),
            wide in proptest::bool::ANY,
        ) {
            let balances: Vec<f64> = cents.iter().map(|c| *c as f64 / 10.0).collect();
            let series = series_from(&balances);
            let radius = if wide { WindowRadius::Three } else { WindowRadius::Two };
            let r = radius.days();

            let points = detect_turning_points(&series, config(radius, ExtremaReport::Both))
                .expect("long enough");

            for (idx, kind) in kinds_at(&points, &series) {
                prop_assert!(idx >= r && idx < series.len() - r);
                prop_assert!(series[idx].balance != series[idx - 1].balance);
                let window = &series[idx - r..=idx + r];
                match kind {
                    TurningPointKind::Minimum => {
                        prop_assert!(window.iter().all(|p| p.balance >= series[idx].balance));
                    }
                    TurningPointKind::Maximum => {
                        prop_assert!(window.iter().all(|p| p.balance <= series[idx].balance));
                    }
                }
            }
        }
    }
}
