//! Display formatting for KPI values

pub const NO_DATA: &str = "no data";

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `1234.5` -> `1,234.50`
pub fn decimal(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, group_thousands(int_part), frac_part)
}

/// `1234.5` -> `$1,234.50`, `-3` -> `-$3.00`
pub fn currency(value: f64) -> String {
    let formatted = decimal(value);
    match formatted.strip_prefix('-') {
        Some(rest) => format!("-${}", rest),
        None => format!("${}", formatted),
    }
}

pub fn or_no_data(value: Option<f64>, fmt: fn(f64) -> String) -> String {
    value.map(fmt).unwrap_or_else(|| NO_DATA.to_string())
}
