use serde::Deserialize;

use crate::core::{
    BalanceInput, Cashflow, ForecastError, RecurringBill, Result, WeightObservation, parse_date,
    parse_weight_rows,
};

const NO_EXPIRY: &str = "null";

/// Numbers arrive either as JSON numbers or as numeric strings from form-style clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberField {
    Number(f64),
    Text(String),
}

impl NumberField {
    fn resolve(&self, field: &str) -> Result<f64> {
        let value = match self {
            NumberField::Number(v) => *v,
            NumberField::Text(s) => parse_amount(s.trim(), field)?,
        };
        ensure_finite(value, field)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BalancePayload {
    pub starting_balance: Option<NumberField>,
    pub daily_pay: Option<NumberField>,
    pub bill_days: Option<String>,
    pub bill_amounts: Option<String>,
    pub bill_expiry_dates: Option<String>,
    pub cashflow_dates: Option<String>,
    pub cashflow_amounts: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WeightPayload {
    pub data: Option<String>,
    pub forecast: Option<bool>,
}

pub fn balance_input_from_payload(payload: &BalancePayload) -> Result<BalanceInput> {
    let starting_balance = required_number(&payload.starting_balance, "starting_balance")?;
    let daily_pay = required_number(&payload.daily_pay, "daily_pay")?;

    let bill_days = split_list(&payload.bill_days);
    let bill_amounts = split_list(&payload.bill_amounts);
    let bill_expiry_dates = split_list(&payload.bill_expiry_dates);
    ensure_same_len("bill_days", &bill_days, "bill_amounts", &bill_amounts)?;
    ensure_same_len("bill_days", &bill_days, "bill_expiry_dates", &bill_expiry_dates)?;

    let bills = bill_days
        .iter()
        .zip(&bill_amounts)
        .zip(&bill_expiry_dates)
        .map(|((day, amount), expiry)| {
            Ok(RecurringBill {
                day_of_month: parse_day_of_month(day)?,
                amount: parse_amount(amount, "bill_amounts")?,
                expiry_date: parse_expiry(expiry)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let cashflow_dates = split_list(&payload.cashflow_dates);
    let cashflow_amounts = split_list(&payload.cashflow_amounts);
    ensure_same_len(
        "cashflow_dates",
        &cashflow_dates,
        "cashflow_amounts",
        &cashflow_amounts,
    )?;

    let cashflows = cashflow_dates
        .iter()
        .zip(&cashflow_amounts)
        .map(|(date, amount)| {
            Ok(Cashflow {
                date: parse_date(date).ok_or_else(|| {
                    ForecastError::MalformedInput(format!("cashflow_dates: invalid date {date:?}"))
                })?,
                amount: parse_amount(amount, "cashflow_amounts")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BalanceInput {
        starting_balance,
        daily_pay,
        bills,
        cashflows,
    })
}

pub fn weight_rows_from_payload(payload: &WeightPayload) -> Result<Vec<WeightObservation>> {
    let data = payload
        .data
        .as_deref()
        .ok_or_else(|| ForecastError::MalformedInput("missing field `data`".to_string()))?;
    parse_weight_rows(data)
}

fn required_number(field: &Option<NumberField>, name: &str) -> Result<f64> {
    field
        .as_ref()
        .ok_or_else(|| ForecastError::MalformedInput(format!("missing field `{name}`")))?
        .resolve(name)
}

/// Empty or absent lists mean "no entries".
fn split_list(raw: &Option<String>) -> Vec<&str> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Vec::new(),
        Some(s) => s.split(',').map(str::trim).collect(),
    }
}

fn ensure_same_len(a_name: &str, a: &[&str], b_name: &str, b: &[&str]) -> Result<()> {
    if a.len() != b.len() {
        return Err(ForecastError::MalformedInput(format!(
            "{a_name} has {} entries but {b_name} has {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

fn parse_amount(raw: &str, field: &str) -> Result<f64> {
    let value = raw
        .parse::<f64>()
        .map_err(|_| ForecastError::MalformedInput(format!("{field}: invalid number {raw:?}")))?;
    ensure_finite(value, field)
}

fn ensure_finite(value: f64, field: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ForecastError::MalformedInput(format!(
            "{field}: {value} is not a finite number"
        )))
    }
}

fn parse_day_of_month(raw: &str) -> Result<u32> {
    match raw.parse::<u32>() {
        Ok(day) if (1..=31).contains(&day) => Ok(day),
        _ => Err(ForecastError::MalformedInput(format!(
            "bill_days: {raw:?} is not a day of month between 1 and 31"
        ))),
    }
}

fn parse_expiry(raw: &str) -> Result<Option<chrono::NaiveDate>> {
    if raw.eq_ignore_ascii_case(NO_EXPIRY) {
        return Ok(None);
    }
    parse_date(raw).map(Some).ok_or_else(|| {
        ForecastError::MalformedInput(format!("bill_expiry_dates: invalid date {raw:?}"))
    })
}
