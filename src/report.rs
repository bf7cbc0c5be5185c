use std::fmt::Write;

use crate::config::{DEFAULT_POUND_SELECTION, MIN_SCALE_RESOLUTION};
use crate::day::{to_date, Day};
use crate::error::WeightResult;
use crate::models::{Entry, SmoothedPoint, UserInfo};

/// Weights offered for quick entry around the most recent one, stepping by
/// the owner's scale resolution.
pub fn weight_choices(recent: f64, resolution: f64) -> Vec<String> {
    let resolution = resolution.max(MIN_SCALE_RESOLUTION);
    let first = (recent - DEFAULT_POUND_SELECTION).floor();
    let last = (recent + DEFAULT_POUND_SELECTION).ceil();

    (0u32..)
        .map(|step| first + f64::from(step) * resolution)
        .take_while(|weight| *weight <= last + 1e-9)
        .map(|weight| format!("{weight:.2}"))
        .collect()
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

pub fn build_report(
    user: &UserInfo,
    start: Day,
    end: Day,
    latest: Option<Entry>,
    points: &[SmoothedPoint],
    chart_url: Option<&str>,
) -> WeightResult<String> {
    let mut output = String::new();

    let _ = writeln!(output, "# Weight Trend Report");
    let _ = writeln!(
        output,
        "Generated for {} from {} to {} (gamma {:.2})",
        user.email,
        to_date(start)?,
        to_date(end)?,
        user.settings.gamma
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Entry");

    match latest {
        Some(entry) => {
            let _ = writeln!(output, "- {}: {:.2}", to_date(entry.day)?, entry.weight);
        }
        None => {
            let _ = writeln!(output, "No recent entry recorded.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trend");

    let trend: Vec<(Day, f64)> = points
        .iter()
        .filter_map(|p| p.smoothed.map(|s| (p.day, s)))
        .collect();
    match (trend.first(), trend.last()) {
        (Some(&(first_day, first)), Some(&(last_day, last))) => {
            let _ = writeln!(
                output,
                "- {:.2} on {} to {:.2} on {} ({:+.2})",
                first,
                to_date(first_day)?,
                last,
                to_date(last_day)?,
                last - first
            );
        }
        _ => {
            let _ = writeln!(output, "No weights recorded for this window.");
        }
    }

    if !points.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "| Date | Weight | Trend |");
        let _ = writeln!(output, "|---|---|---|");
        for point in points {
            let _ = writeln!(
                output,
                "| {} | {} | {} |",
                to_date(point.day)?,
                format_value(point.raw),
                format_value(point.smoothed)
            );
        }
    }

    if let Some(url) = chart_url {
        let _ = writeln!(output);
        let _ = writeln!(output, "![weight trend]({url})");
    }

    Ok(output)
}
