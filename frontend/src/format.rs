use serde_json::Value;

/// Formats a statistics value for display: three decimals below 1,
/// grouped thousands (up to three fraction digits) below 1000, and a
/// rounded integer with grouping from there on.
pub fn format_metric(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude < 1.0 {
        format!("{value:.3}")
    } else if magnitude < 1000.0 {
        format_grouped(value, 3)
    } else {
        format_grouped(value.round(), 0)
    }
}

/// Same policy for raw JSON values; strings pass through untouched.
pub fn format_metric_value(value: &Value) -> String {
    match value {
        Value::Number(number) => number.as_f64().map(format_metric).unwrap_or_default(),
        Value::String(text) => text.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Display label for a statistics key; unknown keys show as-is.
pub fn metric_label(key: &str) -> &str {
    match key {
        "traffic" => "일교통량(AADT)",
        "tourism" => "관광지수(행정동)",
        "population" => "인구수(행정동)",
        "commercial_density" => "상권지수",
        "parcel_300m" => "반경 300m 필지수",
        "parcel_500m" => "반경 500m 필지수",
        other => other,
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{value:.1} %")
}

pub fn format_won_per_m2(value: f64) -> String {
    if value == 0.0 {
        return "-".to_string();
    }
    format!("{} 원/㎡", format_grouped(value, 3))
}

/// Thousands-grouped rendering with at most `max_fraction` fraction digits
/// and no trailing zeros.
pub fn format_grouped(value: f64, max_fraction: usize) -> String {
    let rendered = format!("{:.*}", max_fraction, value.abs());
    let (integer, fraction) = match rendered.split_once('.') {
        Some((integer, fraction)) => (integer, fraction.trim_end_matches('0')),
        None => (rendered.as_str(), ""),
    };

    let mut out = String::with_capacity(rendered.len() + integer.len() / 3 + 1);
    let negative = value < 0.0 && rendered.chars().any(|c| c.is_ascii_digit() && c != '0');
    if negative {
        out.push('-');
    }
    let digits = integer.len();
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (digits - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn small_values_keep_three_decimals() {
        assert_eq!(format_metric(0.5), "0.500");
        assert_eq!(format_metric(-0.25), "-0.250");
        assert_eq!(format_metric(0.0), "0.000");
    }

    #[test]
    fn mid_values_are_grouped_without_padding() {
        assert_eq!(format_metric(850.0), "850");
        assert_eq!(format_metric(12.3456), "12.346");
        assert_eq!(format_metric(1.5), "1.5");
    }

    #[test]
    fn large_values_are_rounded_then_grouped() {
        assert_eq!(format_metric(15234.0), "15,234");
        assert_eq!(format_metric(15234.6), "15,235");
        assert_eq!(format_metric(1_234_567.0), "1,234,567");
        assert_eq!(format_metric(-4821.2), "-4,821");
    }

    #[test]
    fn json_values_follow_the_same_policy() {
        assert_eq!(format_metric_value(&json!(15234)), "15,234");
        assert_eq!(format_metric_value(&json!("높음")), "높음");
        assert_eq!(format_metric_value(&json!(null)), "-");
    }

    #[test]
    fn known_metrics_get_korean_labels() {
        assert_eq!(metric_label("parcel_500m"), "반경 500m 필지수");
        assert_eq!(metric_label("custom_metric"), "custom_metric");
    }

    #[test]
    fn percent_and_price_helpers() {
        assert_eq!(format_percent(12.345), "12.3 %");
        assert_eq!(format_won_per_m2(1_250_000.0), "1,250,000 원/㎡");
        assert_eq!(format_won_per_m2(0.0), "-");
    }
}
