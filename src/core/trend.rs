use chrono::{Datelike, Days, NaiveDate};
use tracing::debug;

use super::error::{ForecastError, Result};
use super::types::{FittedPoint, TrendModel, WeightForecast, WeightObservation, WeightPrediction};
use super::weight::fill_gaps;

pub const DEFAULT_HORIZONS: [u64; 5] = [15, 30, 45, 60, 90];

/// Day number used as the regression's x value; 0001-01-01 is day 1.
pub fn date_ordinal(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

/// Ordinary least squares fit of weight against date ordinal.
///
/// Point order does not matter and duplicate dates are fitted as separate points.
pub fn fit_trend(series: &[WeightObservation]) -> Result<TrendModel> {
    if series.len() < 2 {
        return Err(ForecastError::InsufficientSeries {
            what: "weight observations",
            required: 2,
            actual: series.len(),
        });
    }

    let n = series.len() as f64;
    let x_mean = series.iter().map(|o| date_ordinal(o.date) as f64).sum::<f64>() / n;
    let y_mean = series.iter().map(|o| o.weight).sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for obs in series {
        let dx = date_ordinal(obs.date) as f64 - x_mean;
        num += dx * (obs.weight - y_mean);
        den += dx * dx;
    }

    if den.abs() < 1e-12 {
        return Err(ForecastError::Computation(
            "all observations share one date; slope is undefined".to_string(),
        ));
    }

    let slope = num / den;
    let intercept = y_mean - slope * x_mean;
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(ForecastError::Computation(format!(
            "trend fit is not finite (slope {slope}, intercept {intercept})"
        )));
    }

    let fitted = series
        .iter()
        .map(|obs| {
            let ordinal = date_ordinal(obs.date);
            FittedPoint {
                date: obs.date,
                ordinal,
                weight: obs.weight,
                fitted: slope * ordinal as f64 + intercept,
            }
        })
        .collect();

    debug!(points = series.len(), slope, intercept, "fitted weight trend");
    Ok(TrendModel {
        slope,
        intercept,
        fitted,
    })
}

/// Evaluates the fitted line `horizons` days after `last_date`.
pub fn extrapolate(
    model: &TrendModel,
    last_date: NaiveDate,
    horizons: &[u64],
) -> Result<Vec<WeightPrediction>> {
    horizons
        .iter()
        .map(|&days| {
            let date = last_date.checked_add_days(Days::new(days)).ok_or_else(|| {
                ForecastError::Computation(format!("date overflow at {last_date} + {days} days"))
            })?;
            Ok(WeightPrediction {
                horizon_days: days as i64,
                date,
                weight: model.predict(date_ordinal(date)),
            })
        })
        .collect()
}

/// Runs the full weight pipeline: gap fill, fit, and optionally extrapolate.
///
/// Horizons are counted from the last observation by input position, not the latest date.
pub fn forecast_weight(
    observations: &[WeightObservation],
    include_forecast: bool,
) -> Result<WeightForecast> {
    let normalized = fill_gaps(observations)?;
    let model = fit_trend(&normalized)?;

    let predictions = match (include_forecast, observations.last()) {
        (true, Some(last)) => extrapolate(&model, last.date, &DEFAULT_HORIZONS)?,
        _ => Vec::new(),
    };

    Ok(WeightForecast { model, predictions })
}
