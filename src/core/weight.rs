use chrono::{Days, NaiveDate};
use tracing::debug;

use super::error::{ForecastError, Result};
use super::types::WeightObservation;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Upper bound on synthesized days across all gaps in one series (about a century).
pub const MAX_FILLED_DAYS: i64 = 36_600;

/// Parses newline-separated `date,weight` rows.
///
/// Blank lines are ignored. The first non-blank row is skipped as a header when neither
/// column parses; any later unparseable row is an error.
/// Rows keep their input order; nothing is sorted or deduplicated here.
pub fn parse_weight_rows(text: &str) -> Result<Vec<WeightObservation>> {
    let mut observations = Vec::new();
    let mut first_row = true;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let is_first_row = std::mem::replace(&mut first_row, false);

        let (date_field, weight_field) = line.split_once(',').ok_or_else(|| {
            ForecastError::MalformedInput(format!(
                "line {}: expected `date,weight`, got {line:?}",
                line_no + 1
            ))
        })?;
        let date_field = date_field.trim();
        let weight_field = weight_field.trim();

        let date = parse_date(date_field);
        let weight = weight_field.parse::<f64>().ok();

        match (date, weight) {
            (Some(date), Some(weight)) if weight.is_finite() => {
                observations.push(WeightObservation { date, weight });
            }
            (None, None) if is_first_row => {
                debug!(line = line_no + 1, "skipping header row");
            }
            (None, _) => {
                return Err(ForecastError::MalformedInput(format!(
                    "line {}: unparseable date {date_field:?}",
                    line_no + 1
                )));
            }
            (Some(_), _) => {
                return Err(ForecastError::MalformedInput(format!(
                    "line {}: weight {weight_field:?} is not a finite number",
                    line_no + 1
                )));
            }
        }
    }

    Ok(observations)
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Fills every multi-day gap between consecutive observations.
///
/// Each skipped day gets the plain mean of the two bracketing weights; the value is
/// flat across the gap rather than ramped. Synthesized days are built separately from
/// the input, then merged and stably sorted by date.
pub fn fill_gaps(observations: &[WeightObservation]) -> Result<Vec<WeightObservation>> {
    if observations.len() < 2 {
        return Err(ForecastError::InsufficientSeries {
            what: "weight observations",
            required: 2,
            actual: observations.len(),
        });
    }

    let mut synthesized = Vec::new();
    let mut filled_days = 0i64;
    for pair in observations.windows(2) {
        let (before, after) = (pair[0], pair[1]);
        let gap = (after.date - before.date).num_days();
        if gap <= 1 {
            continue;
        }

        filled_days += gap - 1;
        if filled_days > MAX_FILLED_DAYS {
            return Err(ForecastError::MalformedInput(format!(
                "gap from {} to {} needs more than {MAX_FILLED_DAYS} filled days",
                before.date, after.date
            )));
        }

        let midpoint = (before.weight + after.weight) / 2.0;
        for step in 1..gap as u64 {
            let date = before.date.checked_add_days(Days::new(step)).ok_or_else(|| {
                ForecastError::Computation(format!("date overflow filling after {}", before.date))
            })?;
            synthesized.push(WeightObservation {
                date,
                weight: midpoint,
            });
        }
    }

    debug!(
        observed = observations.len(),
        synthesized = synthesized.len(),
        "filled weight gaps"
    );

    let mut normalized = Vec::with_capacity(observations.len() + synthesized.len());
    normalized.extend_from_slice(observations);
    normalized.extend(synthesized);
    normalized.sort_by_key(|obs| obs.date);
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop, prop_assert, prop_assert_eq, proptest};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    fn obs(d: &str, weight: f64) -> WeightObservation {
        WeightObservation {
            date: date(d),
            weight,
        }
    }

    #[test]
    fn parses_rows_and_ignores_blank_lines() {
        let rows = parse_weight_rows("2024-01-01,150\n\n 2024-01-03 , 148.5 \n").expect("parses");
        assert_eq!(rows, vec![obs("2024-01-01", 150.0), obs("2024-01-03", 148.5)]);
    }

    #[test]
    fn accepts_us_style_dates_and_a_header_row() {
        let rows = parse_weight_rows("Date,Weight\n01/05/2024,181.2\n2024-01-06,180.9").expect("parses");
        assert_eq!(rows, vec![obs("2024-01-05", 181.2), obs("2024-01-06", 180.9)]);
    }

    #[test]
    fn rejects_malformed_rows() {
        for text in [
            "2024-01-01 150",
            "2024-01-01,heavy",
            "2024-13-01,150",
            "2024-01-01,150\nDate,Weight",
            "Date,Weight\nnotes,none\n2024-01-01,150",
            "2024-01-01,NaN",
        ] {
            let err = parse_weight_rows(text).expect_err(text);
            assert!(matches!(err, ForecastError::MalformedInput(_)), "{text}: {err}");
        }
    }

    #[test]
    fn one_day_gap_gets_midpoint() {
        let rows = parse_weight_rows("2024-01-01,150\n2024-01-03,148").expect("parses");
        let filled = fill_gaps(&rows).expect("fills");

        assert_eq!(
            filled,
            vec![
                obs("2024-01-01", 150.0),
                obs("2024-01-02", 149.0),
                obs("2024-01-03", 148.0),
            ]
        );
    }

    #[test]
    fn gap_fill_is_flat_not_ramped() {
        // A true interpolation would give 198, 196, 194; the fill repeats the midpoint.
        let filled = fill_gaps(&[obs("2024-03-01", 200.0), obs("2024-03-05", 192.0)]).expect("fills");
        let synthesized: Vec<f64> = filled[1..4].iter().map(|o| o.weight).collect();
        assert_eq!(synthesized, vec![196.0, 196.0, 196.0]);
    }

    #[test]
    fn output_is_chronological_even_across_several_gaps() {
        let filled = fill_gaps(&[
            obs("2024-01-01", 100.0),
            obs("2024-01-04", 103.0),
            obs("2024-01-05", 104.0),
            obs("2024-01-07", 98.0),
        ])
        .expect("fills");

        let dates: Vec<NaiveDate> = filled.iter().map(|o| o.date).collect();
        let expected: Vec<NaiveDate> = (0..7).map(|d| date("2024-01-01") + Days::new(d)).collect();
        assert_eq!(dates, expected);
        assert_eq!(filled[5].weight, 101.0);
    }

    #[test]
    fn out_of_order_and_duplicate_pairs_add_nothing() {
        let input = [
            obs("2024-01-05", 100.0),
            obs("2024-01-02", 101.0),
            obs("2024-01-02", 102.0),
        ];
        let filled = fill_gaps(&input).expect("fills");
        assert_eq!(filled.len(), 3);
        assert_eq!(filled[0].date, date("2024-01-02"));
    }

    #[test]
    fn header_is_only_skipped_on_the_first_row() {
        let rows = parse_weight_rows("\n\nDate,Weight\n2024-01-01,150").expect("parses");
        assert_eq!(rows, vec![obs("2024-01-01", 150.0)]);

        let err = parse_weight_rows("Date,Weight\nDay,Pounds\n2024-01-01,150")
            .expect_err("second header-like row");
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn oversized_gap_is_rejected() {
        let far = NaiveDate::from_ymd_opt(12_024, 1, 1).expect("valid far date");
        let err = fill_gaps(&[
            obs("2024-01-01", 150.0),
            WeightObservation {
                date: far,
                weight: 150.0,
            },
        ])
        .expect_err("gap too large");
        assert!(matches!(err, ForecastError::MalformedInput(_)));

        let total_over_cap = fill_gaps(&[
            obs("2000-01-01", 150.0),
            obs("2060-01-01", 150.0),
            obs("2120-01-01", 150.0),
        ]);
        assert!(total_over_cap.is_err());

        let at_cap = fill_gaps(&[
            obs("2024-01-01", 150.0),
            WeightObservation {
                date: date("2024-01-01") + Days::new(MAX_FILLED_DAYS as u64 + 1),
                weight: 150.0,
            },
        ])
        .expect("exactly at the cap");
        assert_eq!(at_cap.len(), MAX_FILLED_DAYS as usize + 2);
    }

    #[test]
    fn needs_two_observations() {
        let err = fill_gaps(&[obs("2024-01-01", 150.0)]).expect_err("too short");
        assert!(matches!(
            err,
            ForecastError::InsufficientSeries {
                required: 2,
                actual: 1,
                ..
            }
        ));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_each_gap_adds_gap_minus_one_midpoints(
            steps in prop::collection::vec((1u64..9, 1_000u32..3_000), 2..20),
        ) {
            let mut current = date("2023-06-01");
            let mut input = Vec::new();
            for (i, (step, tenths)) in steps.iter().enumerate() {
                if i > 0 {
                    current = current + Days::new(*step);
                }
                input.push(WeightObservation { date: current, weight: *tenths as f64 / 10.0 });
            }

            let filled = fill_gaps(&input).expect("fills");
            let span = (input[input.len() - 1].date - input[0].date).num_days() as usize + 1;
            prop_assert_eq!(filled.len(), span);

            for pair in input.windows(2) {
                let midpoint = (pair[0].weight + pair[1].weight) / 2.0;
                let between: Vec<&WeightObservation> = filled
                    .iter()
                    .filter(|o| o.date > pair[0].date && o.date < pair[1].date)
                    .collect();
                let gap = (pair[1].date - pair[0].date).num_days() as usize;
                prop_assert_eq!(between.len(), gap - 1);
                prop_assert!(between.iter().all(|o| o.weight == midpoint));
            }
        }
    }
}
