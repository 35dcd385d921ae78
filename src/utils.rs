use crate::error::{DerivationError, Result};
use chrono::NaiveDate;

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year.checked_add(1)? } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
}

pub fn validate_fiscal_year_end_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(DerivationError::InvalidFiscalYearEndMonth(month));
    }
    Ok(())
}

/// Closing date of fiscal year `year` for a company whose year ends in
/// `fiscal_year_end_month`.
pub fn get_fiscal_year_end_date(year: i32, fiscal_year_end_month: u32) -> Result<NaiveDate> {
    validate_fiscal_year_end_month(fiscal_year_end_month)?;
    last_day_of_month(year, fiscal_year_end_month)
        .ok_or(DerivationError::InvalidYearRange { from: year, to: year })
}

/// Years of a closed range, most recent first.
pub fn descending_years(from_year: i32, to_year: i32) -> Result<Vec<i32>> {
    if from_year > to_year {
        return Err(DerivationError::InvalidYearRange {
            from: from_year,
            to: to_year,
        });
    }
    Ok((from_year..=to_year).rev().collect())
}

/// `(from_year, to_year)` of a window of `window_years` ending at `latest_year`.
pub fn window_range(latest_year: i32, window_years: u32) -> Result<(i32, i32)> {
    if window_years == 0 {
        return Err(DerivationError::InvalidWindow(window_years));
    }
    let span = i32::try_from(window_years - 1)
        .map_err(|_| DerivationError::InvalidWindow(window_years))?;
    let from_year = latest_year
        .checked_sub(span)
        .ok_or(DerivationError::InvalidWindow(window_years))?;
    Ok((from_year, latest_year))
}
