use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, Timelike, Weekday};
use tracing::debug;

use super::error::{ForecastError, Result};
use super::types::{BalanceInput, BalancePoint, PayCutoff};

/// Days simulated after the start day; the series holds `SIMULATION_DAYS + 1` points.
pub const SIMULATION_DAYS: u64 = 365;

/// Projects the running balance one year forward from `now`, one point per calendar day.
///
/// Pay lands on weekdays, except on the start day once the clock is at or past the
/// cutoff hour (today's pay is assumed to already be in `starting_balance`). Bills apply
/// on their day of month until their expiry date, and one-off cashflows on their exact
/// date. Each day's balance is rounded to cents before the next day builds on it.
pub fn simulate_balance(
    input: &BalanceInput,
    now: DateTime<FixedOffset>,
    cutoff: PayCutoff,
) -> Result<Vec<BalancePoint>> {
    let today = now.date_naive();
    let pay_already_landed = now.hour() >= cutoff.hour;

    let mut series = Vec::with_capacity(SIMULATION_DAYS as usize + 1);
    let mut balance = input.starting_balance;

    for offset in 0..=SIMULATION_DAYS {
        let date = today.checked_add_days(Days::new(offset)).ok_or_else(|| {
            ForecastError::Computation(format!("date overflow at {today} + {offset} days"))
        })?;

        if is_weekday(date) && !(date == today && pay_already_landed) {
            balance += input.daily_pay;
        }

        balance -= bills_due(input, date);
        balance += cashflows_on(input, date);

        balance = round_cents(balance);
        if !balance.is_finite() {
            return Err(ForecastError::Computation(format!(
                "balance is not finite on {date}"
            )));
        }
        series.push(BalancePoint { date, balance });
    }

    debug!(
        start = %today,
        points = series.len(),
        pay_already_landed,
        "simulated balance trajectory"
    );
    Ok(series)
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn bills_due(input: &BalanceInput, date: NaiveDate) -> f64 {
    input
        .bills
        .iter()
        .filter(|bill| bill.day_of_month == date.day())
        .filter(|bill| bill.expiry_date.is_none_or(|expiry| date <= expiry))
        .map(|bill| bill.amount)
        .sum()
}

fn cashflows_on(input: &BalanceInput, date: NaiveDate) -> f64 {
    input
        .cashflows
        .iter()
        .filter(|flow| flow.date == date)
        .map(|flow| flow.amount)
        .sum()
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
