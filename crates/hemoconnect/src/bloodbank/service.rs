use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    Administrator, AdministratorId, AdministratorRegistration, BloodType, Donation,
    DonationAmendment, DonationDraft, DonationId, Donor, DonorId, DonorRegistration, Hospital,
    HospitalId, HospitalRegistration, Screening, ScreeningId, VitalSigns,
};
use super::eligibility::{
    approximate_age, DonationRejection, EligibilityConfig, EligibilityEngine, ScreeningVerdict,
};
use super::registration::{RegistrationGuard, RegistrationViolation};
use super::repository::{Clock, RecordStore, RepositoryError};
use super::statistics::{
    month_bounds, DailyStatistics, DonationTally, GeneralStatistics, MonthlyStatistics,
    ScreeningTally,
};

/// Service composing the registration guard, record store, clock, and eligibility engine.
pub struct BloodBankService<S, C> {
    guard: RegistrationGuard,
    store: Arc<S>,
    clock: Arc<C>,
    engine: Arc<EligibilityEngine>,
    ids: IdSequences,
    admission_locks: Mutex<HashMap<DonorId, Arc<Mutex<()>>>>,
}

#[derive(Debug)]
struct IdSequences {
    donors: AtomicU64,
    screenings: AtomicU64,
    donations: AtomicU64,
    hospitals: AtomicU64,
    administrators: AtomicU64,
}

impl Default for IdSequences {
    fn default() -> Self {
        Self {
            donors: AtomicU64::new(1),
            screenings: AtomicU64::new(1),
            donations: AtomicU64::new(1),
            hospitals: AtomicU64::new(1),
            administrators: AtomicU64::new(1),
        }
    }
}

fn next(sequence: &AtomicU64) -> u64 {
    sequence.fetch_add(1, Ordering::Relaxed)
}

/// Screening together with the verdict explaining its outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningOutcome {
    pub screening: Screening,
    pub verdict: ScreeningVerdict,
}

impl ScreeningOutcome {
    pub fn summary(&self) -> String {
        self.verdict.summary()
    }
}

/// Donor eligibility as of a given date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonorEligibility {
    pub donor_id: DonorId,
    pub as_of: NaiveDate,
    pub age: i64,
    pub last_donation: Option<NaiveDate>,
    pub eligible: bool,
}

/// Donor search criteria; absent fields match every donor. Cities compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonorFilter {
    pub hospital_id: Option<HospitalId>,
    pub blood_type: Option<BloodType>,
    pub city: Option<String>,
}

impl DonorFilter {
    pub fn matches(&self, donor: &Donor) -> bool {
        self.hospital_id
            .map_or(true, |id| donor.hospital_id == Some(id))
            && self.blood_type.map_or(true, |wanted| donor.blood_type == wanted)
            && self
                .city
                .as_deref()
                .map_or(true, |city| same_text(&donor.city, city))
    }
}

/// Hospital search criteria; names and cities compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HospitalFilter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

impl HospitalFilter {
    pub fn matches(&self, hospital: &Hospital) -> bool {
        self.name
            .as_deref()
            .map_or(true, |name| same_text(&hospital.name, name))
            && self
                .city
                .as_deref()
                .map_or(true, |city| same_text(&hospital.city, city))
    }
}

fn same_text(stored: &str, wanted: &str) -> bool {
    stored.trim().to_lowercase() == wanted.trim().to_lowercase()
}

impl<S, C> BloodBankService<S, C>
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<C>, config: EligibilityConfig) -> Self {
        Self {
            guard: RegistrationGuard,
            store,
            clock,
            engine: Arc::new(EligibilityEngine::new(config)),
            ids: IdSequences::default(),
            admission_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &EligibilityEngine {
        &self.engine
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Register a donor after validating the form and checking CPF uniqueness.
    pub fn register_donor(
        &self,
        registration: DonorRegistration,
    ) -> Result<Donor, BloodBankServiceError> {
        let cpf = registration.cpf.trim().to_string();
        if self.store.find_donor_by_cpf(&cpf)?.is_some() {
            return Err(RegistrationViolation::DuplicateCpf { cpf }.into());
        }
        self.require_hospital(registration.hospital_id)?;

        let donor = self
            .guard
            .donor_from_registration(registration, || DonorId(next(&self.ids.donors)))?;
        let stored = self.store.insert_donor(donor)?;
        info!(donor_id = %stored.id, blood_type = %stored.blood_type, "donor registered");
        Ok(stored)
    }

    /// Replace a donor's registration data. The CPF must stay unique among the other donors;
    /// the donation history is kept as stored.
    pub fn update_donor(
        &self,
        donor_id: DonorId,
        registration: DonorRegistration,
    ) -> Result<Donor, BloodBankServiceError> {
        let current = self.donor(donor_id)?;

        let cpf = registration.cpf.trim().to_string();
        if let Some(holder) = self.store.find_donor_by_cpf(&cpf)? {
            if holder.id != donor_id {
                return Err(RegistrationViolation::DuplicateCpf { cpf }.into());
            }
        }
        self.require_hospital(registration.hospital_id)?;

        let mut donor = self.guard.donor_from_registration(registration, || donor_id)?;
        donor.last_donation = current.last_donation;
        self.store.update_donor(donor.clone())?;
        info!(donor_id = %donor.id, "donor updated");
        Ok(donor)
    }

    /// Delete a donor that has no donations on file.
    pub fn remove_donor(&self, donor_id: DonorId) -> Result<(), BloodBankServiceError> {
        self.donor(donor_id)?;
        if self.store.find_last_donation(donor_id)?.is_some() {
            return Err(BloodBankServiceError::StillReferenced {
                record: "donor",
                id: donor_id.0,
                dependents: "donations",
            });
        }

        self.store.delete_donor(donor_id)?;
        info!(donor_id = %donor_id, "donor deleted");
        Ok(())
    }

    pub fn remove_donor_by_cpf(&self, cpf: &str) -> Result<Donor, BloodBankServiceError> {
        let donor = self
            .store
            .find_donor_by_cpf(cpf.trim())?
            .ok_or(RepositoryError::NotFound)?;
        self.remove_donor(donor.id)?;
        Ok(donor)
    }

    /// Donors matching `filter`, ordered by name.
    pub fn donors(&self, filter: &DonorFilter) -> Result<Vec<Donor>, BloodBankServiceError> {
        let donors = self.store.list_donors()?;
        Ok(donors
            .into_iter()
            .filter(|donor| filter.matches(donor))
            .collect())
    }

    pub fn donor(&self, donor_id: DonorId) -> Result<Donor, BloodBankServiceError> {
        let donor = self
            .store
            .find_donor(donor_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(donor)
    }

    /// Whether the donor may give blood today, based on their latest known donation.
    pub fn donor_eligibility(
        &self,
        donor_id: DonorId,
    ) -> Result<DonorEligibility, BloodBankServiceError> {
        let as_of = self.clock.today();
        let donor = self.donor_snapshot(donor_id)?;
        let eligible = self.engine.can_donate(&donor, donor.last_donation, as_of);

        Ok(DonorEligibility {
            donor_id,
            as_of,
            age: approximate_age(donor.birth_date, as_of),
            last_donation: donor.last_donation,
            eligible,
        })
    }

    pub fn register_hospital(
        &self,
        registration: HospitalRegistration,
    ) -> Result<Hospital, BloodBankServiceError> {
        if self
            .store
            .find_hospital_by_name(registration.name.trim())?
            .is_some()
        {
            return Err(RegistrationViolation::DuplicateHospitalName {
                name: registration.name.trim().to_string(),
            }
            .into());
        }

        let hospital = self
            .guard
            .hospital_from_registration(registration, || HospitalId(next(&self.ids.hospitals)))?;
        let stored = self.store.insert_hospital(hospital)?;
        info!(hospital_id = %stored.id, "hospital registered");
        Ok(stored)
    }

    /// Replace a hospital's name, CEP and city; the name must stay unique among the others.
    pub fn update_hospital(
        &self,
        hospital_id: HospitalId,
        registration: HospitalRegistration,
    ) -> Result<Hospital, BloodBankServiceError> {
        self.hospital(hospital_id)?;
        if let Some(holder) = self
            .store
            .find_hospital_by_name(registration.name.trim())?
        {
            if holder.id != hospital_id {
                let name = holder.name;
                return Err(RegistrationViolation::DuplicateHospitalName { name }.into());
            }
        }

        let hospital = self
            .guard
            .hospital_from_registration(registration, || hospital_id)?;
        self.store.update_hospital(hospital.clone())?;
        info!(hospital_id = %hospital.id, "hospital updated");
        Ok(hospital)
    }

    /// Delete a hospital that no donor or administrator is linked to.
    pub fn remove_hospital(&self, hospital_id: HospitalId) -> Result<(), BloodBankServiceError> {
        if !self.hospital_donors(hospital_id)?.is_empty() {
            return Err(BloodBankServiceError::StillReferenced {
                record: "hospital",
                id: hospital_id.0,
                dependents: "donors",
            });
        }
        if !self.administrators(Some(hospital_id))?.is_empty() {
            return Err(BloodBankServiceError::StillReferenced {
                record: "hospital",
                id: hospital_id.0,
                dependents: "administrators",
            });
        }

        self.store.delete_hospital(hospital_id)?;
        info!(hospital_id = %hospital_id, "hospital deleted");
        Ok(())
    }

    pub fn hospitals(
        &self,
        filter: &HospitalFilter,
    ) -> Result<Vec<Hospital>, BloodBankServiceError> {
        let hospitals = self.store.list_hospitals()?;
        Ok(hospitals
            .into_iter()
            .filter(|hospital| filter.matches(hospital))
            .collect())
    }

    /// Donors linked to a registered hospital.
    pub fn hospital_donors(
        &self,
        hospital_id: HospitalId,
    ) -> Result<Vec<Donor>, BloodBankServiceError> {
        self.hospital(hospital_id)?;
        self.donors(&DonorFilter {
            hospital_id: Some(hospital_id),
            ..DonorFilter::default()
        })
    }

    pub fn hospital(&self, hospital_id: HospitalId) -> Result<Hospital, BloodBankServiceError> {
        let hospital = self
            .store
            .find_hospital(hospital_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(hospital)
    }

    pub fn register_administrator(
        &self,
        registration: AdministratorRegistration,
    ) -> Result<Administrator, BloodBankServiceError> {
        let login = registration.login.trim().to_string();
        if self.store.find_administrator_by_login(&login)?.is_some() {
            return Err(RegistrationViolation::DuplicateLogin { login }.into());
        }

        self.require_hospital(registration.hospital_id)?;

        let administrator = self.guard.administrator_from_registration(registration, || {
            AdministratorId(next(&self.ids.administrators))
        })?;
        let stored = self.store.insert_administrator(administrator)?;
        info!(administrator_id = %stored.id, "administrator registered");
        Ok(stored)
    }

    /// Administrators ordered by name, optionally only those of one hospital.
    pub fn administrators(
        &self,
        hospital_id: Option<HospitalId>,
    ) -> Result<Vec<Administrator>, BloodBankServiceError> {
        let administrators = self.store.list_administrators()?;
        Ok(administrators
            .into_iter()
            .filter(|administrator| {
                hospital_id.map_or(true, |id| administrator.hospital_id == Some(id))
            })
            .collect())
    }

    pub fn remove_administrator(
        &self,
        administrator_id: AdministratorId,
    ) -> Result<(), BloodBankServiceError> {
        self.store.delete_administrator(administrator_id)?;
        info!(administrator_id = %administrator_id, "administrator deleted");
        Ok(())
    }

    pub fn remove_administrator_by_login(
        &self,
        login: &str,
    ) -> Result<Administrator, BloodBankServiceError> {
        let administrator = self
            .store
            .find_administrator_by_login(login.trim())?
            .ok_or(RepositoryError::NotFound)?;
        self.remove_administrator(administrator.id)?;
        Ok(administrator)
    }

    pub fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Administrator, BloodBankServiceError> {
        match self.store.find_administrator_by_login(login.trim())? {
            Some(administrator) if administrator.password == password => Ok(administrator),
            _ => Err(BloodBankServiceError::InvalidCredentials),
        }
    }

    /// Evaluate and persist a screening. Defaults to today's date when none is given.
    pub fn record_screening(
        &self,
        vitals: VitalSigns,
        performed_on: Option<NaiveDate>,
    ) -> Result<ScreeningOutcome, BloodBankServiceError> {
        let verdict = self.engine.evaluate_vitals(&vitals);
        let screening = Screening {
            id: ScreeningId(next(&self.ids.screenings)),
            vitals,
            approved: verdict.approved,
            performed_on: performed_on.unwrap_or_else(|| self.clock.today()),
        };

        let screening = self.store.insert_screening(screening)?;
        info!(
            screening_id = %screening.id,
            approved = screening.approved,
            "screening recorded"
        );
        Ok(ScreeningOutcome { screening, verdict })
    }

    pub fn screening(
        &self,
        screening_id: ScreeningId,
    ) -> Result<ScreeningOutcome, BloodBankServiceError> {
        let screening = self
            .store
            .find_screening(screening_id)?
            .ok_or(RepositoryError::NotFound)?;
        let verdict = self.engine.evaluate_vitals(&screening.vitals);
        Ok(ScreeningOutcome { screening, verdict })
    }

    /// Replace a screening's vitals and recompute its outcome; the date is kept.
    pub fn amend_screening(
        &self,
        screening_id: ScreeningId,
        vitals: VitalSigns,
    ) -> Result<ScreeningOutcome, BloodBankServiceError> {
        let mut screening = self
            .store
            .find_screening(screening_id)?
            .ok_or(RepositoryError::NotFound)?;

        let verdict = self.engine.evaluate_vitals(&vitals);
        screening.vitals = vitals;
        screening.approved = verdict.approved;
        self.store.update_screening(screening.clone())?;

        info!(
            screening_id = %screening.id,
            approved = screening.approved,
            "screening amended"
        );
        Ok(ScreeningOutcome { screening, verdict })
    }

    /// Delete a screening and, with it, every donation it backed.
    pub fn remove_screening(&self, screening_id: ScreeningId) -> Result<usize, BloodBankServiceError> {
        let removed = self.store.delete_screening(screening_id)?;
        info!(
            screening_id = %screening_id,
            removed_donations = removed,
            "screening deleted"
        );
        Ok(removed)
    }

    /// Validate a donation draft and, when admitted, persist it and advance the donor's
    /// last-donation date.
    ///
    /// Admissions for the same donor are serialized so two concurrent drafts cannot both pass
    /// the interval check before either write lands.
    pub fn admit_donation(&self, draft: DonationDraft) -> Result<Donation, BloodBankServiceError> {
        let as_of = self.clock.today();
        let required = self.engine.require_fields(&draft).map_err(|rejection| {
            warn!(reason = rejection.kind(), "donation rejected");
            rejection
        })?;

        // Unknown donors never get an admission lock.
        self.donor(required.donor_id)?;

        self.with_admission_lock(required.donor_id, || -> Result<Donation, BloodBankServiceError> {
            let donor = self.donor_snapshot(required.donor_id)?;
            let screening = self.store.find_screening(required.screening_id)?;

            let validated = self
                .engine
                .validate_donation(&draft, screening.as_ref(), &donor, as_of)
                .map_err(|rejection| {
                    warn!(
                        donor_id = %donor.id,
                        reason = rejection.kind(),
                        "donation rejected"
                    );
                    rejection
                })?;

            let donation = validated.into_donation(DonationId(next(&self.ids.donations)));
            let stored = self.store.record_donation(donation)?;
            info!(
                donation_id = %stored.id,
                donor_id = %stored.donor_id,
                volume_ml = stored.volume_ml,
                "donation admitted"
            );
            Ok(stored)
        })
    }

    /// Correct the date, time or volume of an admitted donation.
    ///
    /// The corrected donation must pass every admission check except donor eligibility, against
    /// the screening it was admitted under.
    pub fn amend_donation(
        &self,
        donation_id: DonationId,
        amendment: DonationAmendment,
    ) -> Result<Donation, BloodBankServiceError> {
        let current = self.donation(donation_id)?;
        let draft = DonationDraft {
            date: amendment.date,
            time: amendment.time,
            volume_ml: amendment.volume_ml,
            screening_id: Some(current.screening_id),
            donor_id: Some(current.donor_id),
        };
        let screening = self.store.find_screening(current.screening_id)?;

        let validated = self
            .engine
            .validate_collection(&draft, screening.as_ref())
            .map_err(|rejection| {
                warn!(
                    donation_id = %donation_id,
                    reason = rejection.kind(),
                    "donation amendment rejected"
                );
                rejection
            })?;

        let donation = validated.into_donation(donation_id);
        self.store.update_donation(donation.clone())?;
        info!(
            donation_id = %donation.id,
            volume_ml = donation.volume_ml,
            "donation amended"
        );
        Ok(donation)
    }

    pub fn donation(&self, donation_id: DonationId) -> Result<Donation, BloodBankServiceError> {
        let donation = self
            .store
            .find_donation(donation_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(donation)
    }

    pub fn remove_donation(&self, donation_id: DonationId) -> Result<(), BloodBankServiceError> {
        self.store.delete_donation(donation_id)?;
        info!(donation_id = %donation_id, "donation deleted");
        Ok(())
    }

    /// Donations collected on `date`, in collection order.
    pub fn donations_on(&self, date: NaiveDate) -> Result<Vec<Donation>, BloodBankServiceError> {
        let mut donations = self.store.donations_between(date, date)?;
        donations.sort_by_key(|donation| (donation.time, donation.id));
        Ok(donations)
    }

    pub fn daily_statistics(&self, date: NaiveDate) -> Result<DailyStatistics, BloodBankServiceError> {
        let screenings = self.store.screenings_between(date, date)?;
        let donations = self.store.donations_between(date, date)?;

        Ok(DailyStatistics {
            date,
            screenings: ScreeningTally::from_screenings(&screenings),
            donations: DonationTally::from_donations(&donations),
        })
    }

    pub fn monthly_statistics(
        &self,
        year: i32,
        month: u32,
    ) -> Result<MonthlyStatistics, BloodBankServiceError> {
        let (first, last) =
            month_bounds(year, month).ok_or(BloodBankServiceError::InvalidPeriod { year, month })?;
        let screenings = self.store.screenings_between(first, last)?;
        let donations = self.store.donations_between(first, last)?;

        Ok(MonthlyStatistics::new(
            year,
            month,
            ScreeningTally::from_screenings(&screenings),
            DonationTally::from_donations(&donations),
        ))
    }

    pub fn general_statistics(&self) -> Result<GeneralStatistics, BloodBankServiceError> {
        let donations = self
            .store
            .donations_between(NaiveDate::MIN, NaiveDate::MAX)?;
        Ok(GeneralStatistics::from_donations(
            &donations,
            self.clock.today(),
        ))
    }

    fn require_hospital(
        &self,
        hospital_id: Option<HospitalId>,
    ) -> Result<(), BloodBankServiceError> {
        if let Some(id) = hospital_id {
            if self.store.find_hospital(id)?.is_none() {
                return Err(RegistrationViolation::UnknownHospital { id }.into());
            }
        }
        Ok(())
    }

    /// Donor record whose `last_donation` also reflects the newest stored donation, in case a
    /// previous two-step write never reached the donor row.
    fn donor_snapshot(&self, donor_id: DonorId) -> Result<Donor, BloodBankServiceError> {
        let mut donor = self.donor(donor_id)?;
        if let Some(latest) = self.store.find_last_donation(donor_id)? {
            donor.last_donation = donor.last_donation.max(Some(latest.date));
        }
        Ok(donor)
    }

    /// Runs `admit` while holding the donor's admission lock, then drops the lock entry once
    /// no other admission for the donor holds or awaits it.
    fn with_admission_lock<T>(&self, donor_id: DonorId, admit: impl FnOnce() -> T) -> T {
        let lock = self
            .admission_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(donor_id)
            .or_default()
            .clone();

        let outcome = {
            let _admission = lock.lock().unwrap_or_else(PoisonError::into_inner);
            admit()
        };

        // Clones are only taken and released under the map lock, so the count is exact here.
        let mut locks = self
            .admission_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&donor_id);
        }
        drop(lock);
        outcome
    }

    #[cfg(test)]
    pub(crate) fn admission_lock_count(&self) -> usize {
        self.admission_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Error raised by the blood-bank service.
#[derive(Debug, thiserror::Error)]
pub enum BloodBankServiceError {
    #[error(transparent)]
    Registration(#[from] RegistrationViolation),
    #[error(transparent)]
    Rejected(#[from] DonationRejection),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("invalid statistics period {year}-{month:02}")]
    InvalidPeriod { year: i32, month: u32 },
    #[error("invalid administrator credentials")]
    InvalidCredentials,
    #[error("{record} {id} still has linked {dependents}")]
    StillReferenced {
        record: &'static str,
        id: u64,
        dependents: &'static str,
    },
}
