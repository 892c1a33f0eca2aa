use chrono::NaiveDate;

/// Calculate the difference between two dates in days
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

/// Round half away from zero to a fixed number of decimals.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Percentage rounded to one decimal place.
pub fn round_prob(value: f64) -> f64 {
    round_to(value, 1)
}

/// Expected goals rounded to two decimal places.
pub fn round_goals(value: f64) -> f64 {
    round_to(value, 2)
}
