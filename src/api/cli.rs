use chrono::{DateTime, FixedOffset, Offset, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::payload::{BalancePayload, WeightPayload, balance_input_from_payload};
use super::{AppContext, balance_turning_points, run_http_server, weight_forecast};
use crate::core::{
    Clock, DetectorConfig, ExtremaReport, FixedClock, PayCutoff, SystemClock, WindowRadius,
    render_balance_report, render_weight_report,
};

#[derive(Debug, Parser)]
#[command(name = "forecast", about = "Balance and weight trend forecasting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API.
    Serve(ServeArgs),
    /// Run the balance forecast on a JSON payload file.
    Balance(BalanceArgs),
    /// Run the weight forecast on a file of `date,weight` rows.
    Weight(WeightArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    #[command(flatten)]
    pub clock: ClockArgs,

    #[command(flatten)]
    pub detector: DetectorArgs,
}

#[derive(Debug, Args)]
pub struct BalanceArgs {
    /// JSON file with the same fields the `/api/balance` endpoint accepts.
    #[arg(long)]
    pub input: PathBuf,

    /// Simulation start instant (RFC 3339); defaults to the current time.
    #[arg(long)]
    pub now: Option<String>,

    /// Print the turning points as JSON instead of the text report.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub clock: ClockArgs,

    #[command(flatten)]
    pub detector: DetectorArgs,
}

#[derive(Debug, Args)]
pub struct WeightArgs {
    #[arg(long)]
    pub input: PathBuf,

    /// Only print the fitted formula.
    #[arg(long)]
    pub no_forecast: bool,
}

#[derive(Debug, Args)]
pub struct ClockArgs {
    /// Reference time zone as a whole-hour offset from UTC.
    #[arg(long, allow_hyphen_values = true, value_parser = clap::value_parser!(i32).range(-23..=23))]
    pub utc_offset_hours: Option<i32>,

    /// Hour from which today's pay counts as already received. Defaults to 14 with a
    /// reference zone and 23 in UTC.
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
    pub pay_cutoff_hour: Option<u32>,
}

#[derive(Debug, Args)]
pub struct DetectorArgs {
    #[arg(long, value_enum, default_value_t = CliWindowRadius::Three)]
    pub window_radius: CliWindowRadius,

    #[arg(long, value_enum, default_value_t = CliExtremaReport::Both)]
    pub report: CliExtremaReport,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliWindowRadius {
    #[value(name = "2")]
    Two,
    #[value(name = "3")]
    Three,
}

impl From<CliWindowRadius> for WindowRadius {
    fn from(value: CliWindowRadius) -> Self {
        match value {
            CliWindowRadius::Two => WindowRadius::Two,
            CliWindowRadius::Three => WindowRadius::Three,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliExtremaReport {
    Minima,
    Both,
}

impl From<CliExtremaReport> for ExtremaReport {
    fn from(value: CliExtremaReport) -> Self {
        match value {
            CliExtremaReport::Minima => ExtremaReport::Minima,
            CliExtremaReport::Both => ExtremaReport::Both,
        }
    }
}

impl DetectorArgs {
    fn config(&self) -> DetectorConfig {
        DetectorConfig {
            radius: self.window_radius.into(),
            report: self.report.into(),
        }
    }
}

impl ClockArgs {
    fn offset(&self) -> Result<FixedOffset, String> {
        match self.utc_offset_hours {
            None => Ok(Utc.fix()),
            Some(hours) => FixedOffset::east_opt(hours * 3600)
                .ok_or_else(|| format!("--utc-offset-hours {hours} is out of range")),
        }
    }

    fn cutoff(&self) -> PayCutoff {
        match (self.pay_cutoff_hour, self.utc_offset_hours) {
            (Some(hour), _) => PayCutoff { hour },
            (None, Some(_)) => PayCutoff::ZONED,
            (None, None) => PayCutoff::UTC,
        }
    }
}

pub async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Serve(args) => {
            let ctx = AppContext {
                clock: Arc::new(SystemClock {
                    offset: args.clock.offset()?,
                }),
                cutoff: args.clock.cutoff(),
                detector: args.detector.config(),
            };
            info!(
                cutoff_hour = ctx.cutoff.hour,
                radius = ctx.detector.radius.days(),
                "starting server"
            );
            run_http_server(&args.host, args.port, ctx).await
        }
        Command::Balance(args) => {
            println!("{}", run_balance(&args)?);
            Ok(())
        }
        Command::Weight(args) => {
            println!("{}", run_weight(&args)?);
            Ok(())
        }
    }
}

fn run_balance(args: &BalanceArgs) -> Result<String, String> {
    let offset = args.clock.offset()?;
    let clock: Arc<dyn Clock> = match &args.now {
        Some(raw) => {
            let instant = DateTime::parse_from_rfc3339(raw)
                .map_err(|e| format!("--now {raw:?} is not an RFC 3339 timestamp: {e}"))?;
            Arc::new(FixedClock {
                instant: instant.with_timezone(&offset),
            })
        }
        None => Arc::new(SystemClock { offset }),
    };
    let ctx = AppContext {
        clock,
        cutoff: args.clock.cutoff(),
        detector: args.detector.config(),
    };

    let raw = fs::read_to_string(&args.input)
        .map_err(|e| format!("failed to read {}: {e}", args.input.display()))?;
    let payload: BalancePayload =
        serde_json::from_str(&raw).map_err(|e| format!("invalid balance JSON: {e}"))?;
    let input = balance_input_from_payload(&payload).map_err(|e| e.to_string())?;
    let points = balance_turning_points(&ctx, &input, ctx.detector).map_err(|e| e.to_string())?;

    if args.json {
        serde_json::to_string_pretty(&points).map_err(|e| e.to_string())
    } else {
        Ok(render_balance_report(&points, ctx.detector.report))
    }
}

fn run_weight(args: &WeightArgs) -> Result<String, String> {
    let data = fs::read_to_string(&args.input)
        .map_err(|e| format!("failed to read {}: {e}", args.input.display()))?;
    let payload = WeightPayload {
        data: Some(data),
        forecast: Some(!args.no_forecast),
    };
    let forecast = weight_forecast(&payload).map_err(|e| e.to_string())?;
    Ok(render_weight_report(&forecast))
}
