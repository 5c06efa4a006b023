// src/utils/constants.rs

/// Sentinel published instead of a date for applications approved before systematic tracking.
pub const APPROVED_BEFORE_CUTOFF: &str = "Approved Prior to Jan 1, 1982";

/// Average year length used to turn day intervals into years.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Day zero of spreadsheet serial dates (1900 date system, leap-year bug included).
pub const SPREADSHEET_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Serial numbers outside this range are not treated as spreadsheet dates.
pub const SPREADSHEET_SERIAL_RANGE: (f64, f64) = (1.0, 2_958_465.0);
