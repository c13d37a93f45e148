use chrono::{Days, NaiveDate};

/// Day zero of the spreadsheet date system (serial 1 is 1899-12-31).
pub fn serial_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// Calendar date of a date serial; the fractional time-of-day part is dropped.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.floor() as u64;
    serial_epoch()?.checked_add_days(Days::new(days))
}

/// `YYYY-MM-DD` text for a date serial.
pub fn format_serial(serial: f64) -> Option<String> {
    serial_to_date(serial).map(|date| date.format("%Y-%m-%d").to_string())
}
