use super::types::{ExtremaReport, TurningPoint, TurningPointKind, WeightForecast};

const SEPARATOR: &str = " • ";

/// Renders the trend formula followed by one `- MM/DD: WW.WW lbs` line per prediction.
pub fn render_weight_report(forecast: &WeightForecast) -> String {
    let formula = format!(
        "Weight = {:.2} * DateOrdinal + {:.2}",
        forecast.model.slope, forecast.model.intercept
    );
    std::iter::once(formula)
        .chain(forecast.predictions.iter().map(|prediction| {
            format!(
                "- {}: {:.2} lbs",
                prediction.date.format("%m/%d"),
                prediction.weight
            )
        }))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders minima (and maxima, when reported) as `date: $balance` pairs on one line each.
pub fn render_balance_report(points: &[TurningPoint], report: ExtremaReport) -> String {
    let minima = render_kind(points, TurningPointKind::Minimum);
    match report {
        ExtremaReport::Minima => format!("Local minima: {minima}"),
        ExtremaReport::Both => {
            let maxima = render_kind(points, TurningPointKind::Maximum);
            format!("Local minima: {minima}\nLocal maxima: {maxima}")
        }
    }
}

fn render_kind(points: &[TurningPoint], kind: TurningPointKind) -> String {
    let rendered: Vec<String> = points
        .iter()
        .filter(|p| p.kind == kind)
        .map(|p| format!("{}: ${:.2}", p.date.format("%Y-%m-%d"), p.balance))
        .collect();
    if rendered.is_empty() {
        "none".to_string()
    } else {
        rendered.join(SEPARATOR)
    }
}
