use chrono::NaiveDate;
use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurningPointKind {
    Minimum,
    Maximum,
}

/// Which extrema the detector reports.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExtremaReport {
    Minima,
    Both,
}

/// Half-width of the symmetric window used by the detector.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WindowRadius {
    Two,
    Three,
}

impl WindowRadius {
    pub fn days(self) -> usize {
        match self {
            WindowRadius::Two => 2,
            WindowRadius::Three => 3,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DetectorConfig {
    pub radius: WindowRadius,
    pub report: ExtremaReport,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            radius: WindowRadius::Three,
            report: ExtremaReport::Both,
        }
    }
}

/// Hour of day (in the reference zone) from which today's pay counts as already landed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PayCutoff {
    pub hour: u32,
}

impl PayCutoff {
    pub const ZONED: PayCutoff = PayCutoff { hour: 14 };
    pub const UTC: PayCutoff = PayCutoff { hour: 23 };
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecurringBill {
    pub day_of_month: u32,
    pub amount: f64,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cashflow {
    pub date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceInput {
    pub starting_balance: f64,
    pub daily_pay: f64,
    pub bills: Vec<RecurringBill>,
    pub cashflows: Vec<Cashflow>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub balance: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurningPoint {
    pub date: NaiveDate,
    pub balance: f64,
    pub kind: TurningPointKind,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WeightObservation {
    pub date: NaiveDate,
    pub weight: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FittedPoint {
    pub date: NaiveDate,
    pub ordinal: i32,
    pub weight: f64,
    pub fitted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendModel {
    pub slope: f64,
    pub intercept: f64,
    pub fitted: Vec<FittedPoint>,
}

impl TrendModel {
    pub fn predict(&self, ordinal: i32) -> f64 {
        self.slope * ordinal as f64 + self.intercept
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightPrediction {
    pub horizon_days: i64,
    pub date: NaiveDate,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightForecast {
    pub model: TrendModel,
    pub predictions: Vec<WeightPrediction>,
}
