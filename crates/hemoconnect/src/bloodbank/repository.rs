use chrono::{Local, NaiveDate};

use super::domain::{
    Administrator, AdministratorId, Donation, DonationId, Donor, DonorId, Hospital, HospitalId,
    Screening, ScreeningId,
};

/// Storage port for blood-bank records so the service can be exercised in isolation.
///
/// Every call is synchronous and either returns the record (or its absence) or a
/// `RepositoryError`, which callers propagate unchanged.
pub trait RecordStore: Send + Sync {
    fn find_donor(&self, id: DonorId) -> Result<Option<Donor>, RepositoryError>;
    fn find_donor_by_cpf(&self, cpf: &str) -> Result<Option<Donor>, RepositoryError>;
    fn insert_donor(&self, donor: Donor) -> Result<Donor, RepositoryError>;
    /// Replaces a stored donor; `NotFound` when the id is unknown.
    fn update_donor(&self, donor: Donor) -> Result<(), RepositoryError>;
    /// Stores enforcing references may refuse with `Conflict` while donations point at the donor.
    fn delete_donor(&self, id: DonorId) -> Result<(), RepositoryError>;
    /// Every donor, ordered by name.
    fn list_donors(&self) -> Result<Vec<Donor>, RepositoryError>;
    fn update_donor_last_donation(
        &self,
        donor_id: DonorId,
        date: NaiveDate,
    ) -> Result<(), RepositoryError>;

    fn find_screening(&self, id: ScreeningId) -> Result<Option<Screening>, RepositoryError>;
    fn insert_screening(&self, screening: Screening) -> Result<Screening, RepositoryError>;
    fn update_screening(&self, screening: Screening) -> Result<(), RepositoryError>;
    /// Removes the screening and every donation referencing it in one transaction, returning
    /// how many donations were removed. `NotFound` leaves the store untouched.
    fn delete_screening(&self, id: ScreeningId) -> Result<usize, RepositoryError>;
    /// Screenings performed between `from` and `to`, both inclusive.
    fn screenings_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Screening>, RepositoryError>;

    fn find_donation(&self, id: DonationId) -> Result<Option<Donation>, RepositoryError>;
    fn find_last_donation(&self, donor_id: DonorId) -> Result<Option<Donation>, RepositoryError>;
    fn insert_donation(&self, donation: Donation) -> Result<Donation, RepositoryError>;
    fn update_donation(&self, donation: Donation) -> Result<(), RepositoryError>;
    fn delete_donation(&self, id: DonationId) -> Result<(), RepositoryError>;
    /// Donations dated between `from` and `to`, both inclusive.
    fn donations_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Donation>, RepositoryError>;

    /// Persists an admitted donation and sets the donor's last-donation date to the donation
    /// date, unless the donor already has a later one: the date only ever moves forward, so a
    /// back-dated donation never shortens the interval owed by a more recent one.
    ///
    /// The default runs the writes back to back: a failure between them leaves the donation
    /// stored with a stale donor record. Stores with transactions should override this and
    /// commit both writes together, keeping the same forward-only rule.
    fn record_donation(&self, donation: Donation) -> Result<Donation, RepositoryError> {
        let stored = self.insert_donation(donation)?;
        let donor = self
            .find_donor(stored.donor_id)?
            .ok_or(RepositoryError::NotFound)?;
        if donor.last_donation < Some(stored.date) {
            self.update_donor_last_donation(stored.donor_id, stored.date)?;
        }
        Ok(stored)
    }

    fn find_hospital(&self, id: HospitalId) -> Result<Option<Hospital>, RepositoryError>;
    /// Case-insensitive name lookup.
    fn find_hospital_by_name(&self, name: &str) -> Result<Option<Hospital>, RepositoryError>;
    fn insert_hospital(&self, hospital: Hospital) -> Result<Hospital, RepositoryError>;
    fn update_hospital(&self, hospital: Hospital) -> Result<(), RepositoryError>;
    /// Stores enforcing references may refuse with `Conflict` while donors or administrators
    /// are linked to the hospital.
    fn delete_hospital(&self, id: HospitalId) -> Result<(), RepositoryError>;
    /// Every hospital, ordered by name.
    fn list_hospitals(&self) -> Result<Vec<Hospital>, RepositoryError>;

    fn find_administrator_by_login(
        &self,
        login: &str,
    ) -> Result<Option<Administrator>, RepositoryError>;
    fn insert_administrator(
        &self,
        administrator: Administrator,
    ) -> Result<Administrator, RepositoryError>;
    fn delete_administrator(&self, id: AdministratorId) -> Result<(), RepositoryError>;
    /// Every administrator, ordered by name.
    fn list_administrators(&self) -> Result<Vec<Administrator>, RepositoryError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Source of the evaluation date used for eligibility checks.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Clock backed by the host's local date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a single date, for tests and back-dated CLI runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
