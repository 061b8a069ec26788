use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::domain::{Donation, Screening};

/// Days used to average monthly screening throughput, regardless of the calendar month.
const DAYS_PER_MONTH: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScreeningTally {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl ScreeningTally {
    pub fn from_screenings(screenings: &[Screening]) -> Self {
        let approved = screenings.iter().filter(|screening| screening.approved).count();
        Self {
            total: screenings.len(),
            approved,
            rejected: screenings.len() - approved,
        }
    }

    pub fn approved_pct(&self) -> f64 {
        percentage(self.approved, self.total)
    }

    pub fn rejected_pct(&self) -> f64 {
        percentage(self.rejected, self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DonationTally {
    pub total: usize,
    pub volume_ml: f64,
}

impl DonationTally {
    pub fn from_donations(donations: &[Donation]) -> Self {
        Self {
            total: donations.len(),
            volume_ml: donations.iter().map(|donation| donation.volume_ml).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStatistics {
    pub date: NaiveDate,
    pub screenings: ScreeningTally,
    pub donations: DonationTally,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStatistics {
    pub year: i32,
    pub month: u32,
    pub screenings: ScreeningTally,
    pub donations: DonationTally,
    pub average_screenings_per_day: f64,
}

impl MonthlyStatistics {
    pub fn new(year: i32, month: u32, screenings: ScreeningTally, donations: DonationTally) -> Self {
        Self {
            year,
            month,
            average_screenings_per_day: screenings.total as f64 / DAYS_PER_MONTH,
            screenings,
            donations,
        }
    }
}

/// All-time donation totals alongside today's and this month's counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralStatistics {
    pub as_of: NaiveDate,
    pub donations: DonationTally,
    pub donations_today: usize,
    pub donations_this_month: usize,
}

impl GeneralStatistics {
    pub fn from_donations(donations: &[Donation], as_of: NaiveDate) -> Self {
        let this_month =
            |date: NaiveDate| date.year() == as_of.year() && date.month() == as_of.month();
        Self {
            as_of,
            donations: DonationTally::from_donations(donations),
            donations_today: donations.iter().filter(|d| d.date == as_of).count(),
            donations_this_month: donations.iter().filter(|d| this_month(d.date)).count(),
        }
    }
}

/// First and last day of the month, or `None` for an invalid year/month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = next.pred_opt()?;
    debug_assert_eq!(last.month(), month);
    Some((first, last))
}

fn percentage(part: usize, total: usize) -> f64 {
    part as f64 * 100.0 / total.max(1) as f64
}
