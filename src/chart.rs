use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::day::{to_date, Day};
use crate::error::WeightResult;
use crate::models::SmoothedPoint;

const CHART_BASE_URL: &str = "http://chart.apis.google.com/chart?";
const SIMPLE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const EXTENDED_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-.";
const TEXT_SCALE: f64 = 100.0;
/// Finest weight step worth resolving on the chart (1/20 lb).
const STEPS_PER_UNIT: f64 = 20.0;
const MARKERS: &str = "chm=D,ccddff,1,0,6|D,4488ff,0,0,2|d,4488ff,0,-1,6";

fn quantize(value: f64, min: f64, range: f64, levels: usize) -> usize {
    let level = ((levels - 1) as f64 * (value - min) / range) as usize;
    level.min(levels - 1)
}

pub fn simple_encode(values: &[Option<f64>], min: f64, max: f64) -> String {
    let range = max - min;
    if range <= 0.01 {
        return String::new();
    }

    values
        .iter()
        .map(|value| match value {
            Some(v) => SIMPLE_ALPHABET[quantize(*v, min, range, SIMPLE_ALPHABET.len())] as char,
            None => '_',
        })
        .collect()
}

pub fn extended_encode(values: &[Option<f64>], min: f64, max: f64) -> String {
    let range = max - min;
    if values.len() <= 1 || range <= 0.01 {
        return String::new();
    }

    let base = EXTENDED_ALPHABET.len();
    let mut encoded = String::with_capacity(values.len() * 2);
    for value in values {
        match value {
            Some(v) => {
                let level = quantize(*v, min, range, base * base);
                encoded.push(EXTENDED_ALPHABET[level / base] as char);
                encoded.push(EXTENDED_ALPHABET[level % base] as char);
            }
            None => encoded.push_str("__"),
        }
    }
    encoded
}

pub fn text_encode(values: &[Option<f64>], min: f64, max: f64) -> String {
    let range = max - min;
    if range <= 0.0 {
        return String::new();
    }

    values
        .iter()
        .map(|value| match value {
            Some(v) => format!("{:.1}", TEXT_SCALE * (v - min) / range),
            None => "-1".to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Axis labels showing no more of the date than the span needs.
pub fn date_labels(dates: &[NaiveDate]) -> Vec<String> {
    let single_year = dates.windows(2).all(|w| w[0].year() == w[1].year());
    let single_month = single_year && dates.windows(2).all(|w| w[0].month() == w[1].month());
    let repeated_month = dates
        .windows(2)
        .any(|w| (w[0].year(), w[0].month()) == (w[1].year(), w[1].month()));

    let format = if single_month {
        "%d"
    } else if single_year {
        "%b %d"
    } else if repeated_month {
        "%b %d, %Y"
    } else {
        "%b %Y"
    };

    dates.iter().map(|d| d.format(format).to_string()).collect()
}

/// Data and axis parameters for one or more series sharing the `days` axis.
pub fn data_params(days: &[Day], series: &[Vec<Option<f64>>]) -> WeightResult<Vec<String>> {
    let (Some(&earliest), Some(&latest)) = (days.iter().min(), days.iter().max()) else {
        return Ok(Vec::new());
    };

    let mut bounds: Option<(f64, f64)> = None;
    for value in series.iter().flatten().flatten() {
        bounds = Some(match bounds {
            Some((min, max)) => (min.min(*value), max.max(*value)),
            None => (*value, *value),
        });
    }
    let Some((mut min, mut max)) = bounds else {
        return Ok(Vec::new());
    };
    if min == max {
        min -= 0.1;
        max += 0.1;
    }

    let max_unique_values = STEPS_PER_UNIT * (max - min) + 1.0;
    let data = if max_unique_values <= SIMPLE_ALPHABET.len() as f64 {
        debug!(max_unique_values, "using simple encoding");
        let encoded: Vec<String> = series.iter().map(|s| simple_encode(s, min, max)).collect();
        format!("chd=s:{}", encoded.join(","))
    } else if max_unique_values <= (EXTENDED_ALPHABET.len() * EXTENDED_ALPHABET.len()) as f64 {
        debug!(max_unique_values, "using extended encoding");
        let encoded: Vec<String> = series.iter().map(|s| extended_encode(s, min, max)).collect();
        format!("chd=e:{}", encoded.join(","))
    } else {
        debug!(max_unique_values, "using text encoding");
        let encoded: Vec<String> = series.iter().map(|s| text_encode(s, min, max)).collect();
        format!("chd=t:{}", encoded.join("|"))
    };

    let middle = (earliest + latest) / 2;
    let label_days = if middle == earliest || middle == latest {
        vec![earliest, latest]
    } else {
        vec![earliest, middle, latest]
    };
    let label_dates = label_days
        .into_iter()
        .map(to_date)
        .collect::<WeightResult<Vec<_>>>()?;

    let labels = format!(
        "chxl=1:|{:.1}|{:.1}|{:.1}|0:|{}",
        min,
        (max + min) / 2.0,
        max,
        date_labels(&label_dates).join("|")
    );

    Ok(vec![data, "chxt=x,y".to_string(), labels])
}

/// Line chart of raw weights and their trend.
pub fn chart_url(points: &[SmoothedPoint], width: u32, height: u32) -> WeightResult<String> {
    let days: Vec<Day> = points.iter().map(|p| p.day).collect();
    let series: Vec<Vec<Option<f64>>> = vec![
        points.iter().map(|p| p.raw).collect(),
        points.iter().map(|p| p.smoothed).collect(),
    ];

    let mut params = vec![
        format!("chs={width}x{height}"),
        "cht=lc".to_string(),
        MARKERS.to_string(),
    ];
    params.extend(data_params(&days, &series)?);
    Ok(format!("{CHART_BASE_URL}{}", params.join("&")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day::to_day;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn point(day: Day, raw: Option<f64>, smoothed: f64) -> SmoothedPoint {
        SmoothedPoint {
            day,
            raw,
            smoothed: Some(smoothed),
        }
    }

    #[test]
    fn simple_encoding_spans_alphabet() {
        let values = [Some(0.0), Some(5.0), None, Some(10.0)];
        assert_eq!(simple_encode(&values, 0.0, 10.0), "Ae_9");
    }

    #[test]
    fn flat_range_encodes_to_nothing() {
        assert_eq!(simple_encode(&[Some(1.0)], 1.0, 1.005), "");
        assert_eq!(extended_encode(&[Some(1.0), Some(1.0)], 1.0, 1.0), "");
    }

    #[test]
    fn extended_encoding_uses_two_symbols() {
        let values = [Some(0.0), None, Some(10.0)];
        assert_eq!(extended_encode(&values, 0.0, 10.0), "AA__..");
        assert_eq!(extended_encode(&[Some(3.0)], 0.0, 10.0), "");
    }

    #[test]
    fn text_encoding_scales_to_hundred() {
        let values = [Some(0.0), Some(5.0), None, Some(10.0)];
        assert_eq!(text_encode(&values, 0.0, 10.0), "0.0,50.0,-1,100.0");
    }

    #[test]
    fn labels_drop_redundant_fields() {
        assert_eq!(date_labels(&[date(2026, 3, 1), date(2026, 3, 15)]), vec!["01", "15"]);
        assert_eq!(
            date_labels(&[date(2026, 1, 5), date(2026, 3, 1)]),
            vec!["Jan 05", "Mar 01"]
        );
        assert_eq!(
            date_labels(&[date(2024, 6, 1), date(2025, 6, 1), date(2026, 6, 1)]),
            vec!["Jun 2024", "Jun 2025", "Jun 2026"]
        );
        assert_eq!(
            date_labels(&[date(2025, 12, 1), date(2026, 1, 10), date(2026, 1, 20)]),
            vec!["Dec 01, 2025", "Jan 10, 2026", "Jan 20, 2026"]
        );
    }

    #[test]
    fn encoding_follows_value_spread() {
        let days: Vec<Day> = (0..3).map(|i| to_day(date(2026, 1, 1)) + i).collect();

        let narrow = data_params(&days, &[vec![Some(180.0), Some(181.0), None]]).unwrap();
        assert!(narrow[0].starts_with("chd=s:"));

        let medium = data_params(&days, &[vec![Some(100.0), Some(300.0), None]]).unwrap();
        assert!(medium[0].starts_with("chd=e:"));

        let wide = data_params(&days, &[vec![Some(0.0), Some(1_000.0), None]]).unwrap();
        assert_eq!(wide[0], "chd=t:0.0,100.0,-1");
    }

    #[test]
    fn constant_values_are_widened() {
        let days = vec![to_day(date(2026, 2, 1)), to_day(date(2026, 2, 11))];
        let params = data_params(&days, &[vec![Some(180.0), Some(180.0)]]).unwrap();
        assert_eq!(params[1], "chxt=x,y");
        assert_eq!(params[2], "chxl=1:|179.9|180.0|180.1|0:|01|06|11");
    }

    #[test]
    fn all_gaps_produce_no_params() {
        assert!(data_params(&[1, 2], &[vec![None, None]]).unwrap().is_empty());
        assert!(data_params(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn url_carries_both_series() {
        let first = to_day(date(2026, 5, 1));
        let points = vec![
            point(first, Some(180.0), 180.0),
            point(first + 1, None, 180.0),
            point(first + 2, Some(179.0), 179.9),
        ];
        let url = chart_url(&points, 300, 200).unwrap();
        assert!(url.starts_with("http://chart.apis.google.com/chart?chs=300x200&cht=lc&chm="));
        let data = url.split('&').find(|p| p.starts_with("chd=")).unwrap();
        let series: Vec<&str> = data["chd=s:".len()..].split(',').collect();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].len(), 3);
        assert_eq!(&series[0][1..2], "_");
    }
}
