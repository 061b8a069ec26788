mod config;
mod policy;
mod vitals;

pub use config::EligibilityConfig;
pub use policy::{approximate_age, DonationField, DonationRejection};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{DonationDraft, Donor, Screening, Sex, ValidatedDonation, VitalSigns};

/// Stateless evaluator applying the screening, donor, and donation rules.
///
/// The engine never touches storage; callers pass snapshots and receive verdicts, so a single
/// instance can be shared freely across threads.
#[derive(Debug, Clone, Default)]
pub struct EligibilityEngine {
    config: EligibilityConfig,
}

impl EligibilityEngine {
    pub fn new(config: EligibilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EligibilityConfig {
        &self.config
    }

    /// Approves a screening when every vital sign is within range.
    ///
    /// Malformed blood pressure readings count as a failed criterion.
    pub fn evaluate_screening(
        &self,
        heart_rate_bpm: i32,
        blood_pressure: &str,
        temperature_c: f64,
        weight_kg: f64,
    ) -> ScreeningVerdict {
        let failed_reasons = vitals::failed_criteria(
            heart_rate_bpm,
            blood_pressure,
            temperature_c,
            weight_kg,
            &self.config,
        );

        ScreeningVerdict {
            approved: failed_reasons.is_empty(),
            failed_reasons,
        }
    }

    pub fn evaluate_vitals(&self, vitals: &VitalSigns) -> ScreeningVerdict {
        self.evaluate_screening(
            vitals.heart_rate_bpm,
            &vitals.blood_pressure,
            vitals.temperature_c,
            vitals.weight_kg,
        )
    }

    /// Age window first, then the sex-specific interval since `last_donation`.
    pub fn can_donate(
        &self,
        donor: &Donor,
        last_donation: Option<NaiveDate>,
        as_of: NaiveDate,
    ) -> bool {
        self.profile_can_donate(donor.birth_date, donor.sex, last_donation, as_of)
    }

    /// Same rule as [`can_donate`](Self::can_donate) for a donor that is not on file.
    pub fn profile_can_donate(
        &self,
        birth_date: NaiveDate,
        sex: Option<Sex>,
        last_donation: Option<NaiveDate>,
        as_of: NaiveDate,
    ) -> bool {
        if !policy::age_within(birth_date, as_of, &self.config) {
            return false;
        }

        let Some(last_donation) = last_donation else {
            return true;
        };

        let days_since = (as_of - last_donation).num_days();
        match policy::required_interval_days(sex, &self.config) {
            Some(required) => days_since >= required,
            None => false,
        }
    }

    /// Fails with `MissingField` for the first absent field, in form order.
    pub fn require_fields(
        &self,
        draft: &DonationDraft,
    ) -> Result<ValidatedDonation, DonationRejection> {
        let date = draft
            .date
            .ok_or(DonationRejection::MissingField(DonationField::Date))?;
        let time = draft
            .time
            .ok_or(DonationRejection::MissingField(DonationField::Time))?;
        let volume_ml = draft
            .volume_ml
            .ok_or(DonationRejection::MissingField(DonationField::Volume))?;
        let screening_id = draft
            .screening_id
            .ok_or(DonationRejection::MissingField(DonationField::Screening))?;
        let donor_id = draft
            .donor_id
            .ok_or(DonationRejection::MissingField(DonationField::Donor))?;

        Ok(ValidatedDonation {
            date,
            time,
            volume_ml,
            screening_id,
            donor_id,
        })
    }

    /// Admission gate run before a donation is persisted.
    ///
    /// Checks run in a fixed order and stop at the first failure: required fields, volume,
    /// screening approval, same-day screening, donor eligibility. The donor's own
    /// `last_donation` is used for the interval rule.
    pub fn validate_donation(
        &self,
        draft: &DonationDraft,
        screening: Option<&Screening>,
        donor: &Donor,
        as_of: NaiveDate,
    ) -> Result<ValidatedDonation, DonationRejection> {
        let validated = self.validate_collection(draft, screening)?;

        if !self.can_donate(donor, donor.last_donation, as_of) {
            return Err(DonationRejection::DonorNotEligible {
                donor_id: donor.id,
                as_of,
            });
        }

        Ok(validated)
    }

    /// Every admission check except donor eligibility, in the same order.
    ///
    /// Used when correcting a donation that is already on file: the donor's interval was
    /// checked at admission and the stored donation now counts towards it.
    pub fn validate_collection(
        &self,
        draft: &DonationDraft,
        screening: Option<&Screening>,
    ) -> Result<ValidatedDonation, DonationRejection> {
        let validated = self.require_fields(draft)?;

        if !(self.config.min_volume_ml..=self.config.max_volume_ml).contains(&validated.volume_ml)
        {
            return Err(DonationRejection::VolumeOutOfRange {
                volume_ml: validated.volume_ml,
                min_ml: self.config.min_volume_ml,
                max_ml: self.config.max_volume_ml,
            });
        }

        let screening = match screening {
            Some(screening) if screening.approved => screening,
            _ => {
                return Err(DonationRejection::ScreeningNotApproved {
                    screening_id: validated.screening_id,
                })
            }
        };

        if screening.performed_on != validated.date {
            return Err(DonationRejection::ScreeningDateMismatch {
                screening_date: screening.performed_on,
                donation_date: validated.date,
            });
        }

        Ok(validated)
    }
}

/// The four screening criteria, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningCriterion {
    HeartRate,
    BloodPressure,
    Temperature,
    Weight,
}

impl ScreeningCriterion {
    pub const fn label(self) -> &'static str {
        match self {
            ScreeningCriterion::HeartRate => "heart rate",
            ScreeningCriterion::BloodPressure => "blood pressure",
            ScreeningCriterion::Temperature => "temperature",
            ScreeningCriterion::Weight => "weight",
        }
    }
}

/// Unmet criterion with an operator-facing explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionFailure {
    pub criterion: ScreeningCriterion,
    pub explanation: String,
}

/// Screening outcome with the diagnostics trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningVerdict {
    pub approved: bool,
    pub failed_reasons: Vec<CriterionFailure>,
}

impl ScreeningVerdict {
    pub fn failed_criteria(&self) -> Vec<ScreeningCriterion> {
        self.failed_reasons
            .iter()
            .map(|failure| failure.criterion)
            .collect()
    }

    pub fn summary(&self) -> String {
        if self.approved {
            return "screening approved - donor fit to donate".to_string();
        }

        let reasons: Vec<&str> = self
            .failed_reasons
            .iter()
            .map(|failure| failure.explanation.as_str())
            .collect();
        format!("screening rejected: {}", reasons.join("; "))
    }
}
