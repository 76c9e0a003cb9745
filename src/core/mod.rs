mod balance;
mod clock;
mod error;
mod report;
mod trend;
mod turning;
mod types;
mod weight;

pub use balance::{SIMULATION_DAYS, simulate_balance};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ForecastError, Result};
pub use report::{render_balance_report, render_weight_report};
pub use trend::{DEFAULT_HORIZONS, date_ordinal, extrapolate, fit_trend, forecast_weight};
pub use turning::detect_turning_points;
pub use types::{
    BalanceInput, BalancePoint, Cashflow, DetectorConfig, ExtremaReport, FittedPoint, PayCutoff,
    RecurringBill, TrendModel, TurningPoint, TurningPointKind, WeightForecast, WeightObservation,
    WeightPrediction, WindowRadius,
};
pub use weight::{fill_gaps, parse_weight_rows};
pub(crate) use weight::parse_date;
