use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::super::domain::{DonorId, ScreeningId, Sex};
use super::config::EligibilityConfig;

/// Donation fields that must be present before any other admission check runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationField {
    Date,
    Time,
    Volume,
    Screening,
    Donor,
}

impl DonationField {
    pub const fn label(self) -> &'static str {
        match self {
            DonationField::Date => "date",
            DonationField::Time => "time",
            DonationField::Volume => "volume",
            DonationField::Screening => "screening",
            DonationField::Donor => "donor",
        }
    }
}

impl fmt::Display for DonationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reasons a donation is refused, reported in admission-check order.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
pub enum DonationRejection {
    #[error("donation is missing required field: {0}")]
    MissingField(DonationField),
    #[error("donation volume {volume_ml} mL outside accepted range ({min_ml}-{max_ml} mL)")]
    VolumeOutOfRange {
        volume_ml: f64,
        min_ml: f64,
        max_ml: f64,
    },
    #[error("screening {screening_id} is missing or was not approved")]
    ScreeningNotApproved { screening_id: ScreeningId },
    #[error("screening performed on {screening_date} cannot back a donation on {donation_date}")]
    ScreeningDateMismatch {
        screening_date: NaiveDate,
        donation_date: NaiveDate,
    },
    #[error("donor {donor_id} is not eligible to donate on {as_of}")]
    DonorNotEligible { donor_id: DonorId, as_of: NaiveDate },
}

impl DonationRejection {
    pub const fn kind(&self) -> &'static str {
        match self {
            DonationRejection::MissingField(_) => "missing_field",
            DonationRejection::VolumeOutOfRange { .. } => "volume_out_of_range",
            DonationRejection::ScreeningNotApproved { .. } => "screening_not_approved",
            DonationRejection::ScreeningDateMismatch { .. } => "screening_date_mismatch",
            DonationRejection::DonorNotEligible { .. } => "donor_not_eligible",
        }
    }
}

/// Whole years between `birth_date` and `as_of`, counted as elapsed days / 365.
///
/// This is not calendar-aware: it drifts by roughly a day every four years, so a donor can
/// reach a boundary age a few days before or after their actual birthday. The eligibility
/// window is defined against this approximation.
pub fn approximate_age(birth_date: NaiveDate, as_of: NaiveDate) -> i64 {
    (as_of - birth_date).num_days() / 365
}

pub(crate) fn age_within(birth_date: NaiveDate, as_of: NaiveDate, config: &EligibilityConfig) -> bool {
    let age = approximate_age(birth_date, as_of);
    age >= config.min_donor_age && age <= config.max_donor_age
}

/// Minimum days between donations; `None` when the sex is unknown, which makes the donor ineligible.
pub(crate) fn required_interval_days(sex: Option<Sex>, config: &EligibilityConfig) -> Option<i64> {
    match sex {
        Some(Sex::Male) => Some(config.male_interval_days),
        Some(Sex::Female) => Some(config.female_interval_days),
        None => None,
    }
}
