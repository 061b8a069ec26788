//! Blood-bank triage: screening evaluation, donor eligibility, and donation admission.
//!
//! The eligibility engine is pure; the service composes it with a record store and a clock,
//! and the router exposes the service over HTTP.

pub mod domain;
pub mod eligibility;
pub mod registration;
pub mod repository;
pub mod roster;
pub mod router;
pub mod service;
pub mod statistics;

#[cfg(test)]
pub(crate) mod tests;

pub use domain::{
    Administrator, AdministratorId, AdministratorRegistration, BloodType, Donation,
    DonationAmendment, DonationDraft, DonationId, Donor, DonorId, DonorRegistration, Hospital,
    HospitalId, HospitalRegistration, Screening, ScreeningId, Sex, ValidatedDonation, VitalSigns,
};
pub use eligibility::{
    approximate_age, CriterionFailure, DonationField, DonationRejection, EligibilityConfig,
    EligibilityEngine, ScreeningCriterion, ScreeningVerdict,
};
pub use registration::{RegistrationGuard, RegistrationViolation};
pub use repository::{Clock, FixedClock, RecordStore, RepositoryError, SystemClock};
pub use roster::{DonorRosterImporter, RejectedRow, RosterImportError, RosterImportReport};
pub use router::blood_bank_router;
pub use service::{
    BloodBankService, BloodBankServiceError, DonorEligibility, DonorFilter, HospitalFilter,
    ScreeningOutcome,
};
pub use statistics::{
    DailyStatistics, DonationTally, GeneralStatistics, MonthlyStatistics, ScreeningTally,
};
