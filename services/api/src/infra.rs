use chrono::NaiveDate;
use hemoconnect::bloodbank::{
    Administrator, AdministratorId, Donation, DonationId, Donor, DonorId, Hospital, HospitalId,
    RecordStore, RepositoryError, Screening, ScreeningId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Default)]
struct Records {
    donors: BTreeMap<DonorId, Donor>,
    screenings: BTreeMap<ScreeningId, Screening>,
    donations: BTreeMap<DonationId, Donation>,
    hospitals: BTreeMap<HospitalId, Hospital>,
    administrators: BTreeMap<String, Administrator>,
}

/// Process-local record store. Every operation runs under a single lock, so a donation and the
/// donor's last-donation update always land together.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemoryRecordStore {
    records: Arc<Mutex<Records>>,
}

impl InMemoryRecordStore {
    fn lock(&self) -> Result<MutexGuard<'_, Records>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("record store lock poisoned".to_string()))
    }

    pub(crate) fn donor_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.donors.len())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn find_donor(&self, id: DonorId) -> Result<Option<Donor>, RepositoryError> {
        Ok(self.lock()?.donors.get(&id).cloned())
    }

    fn find_donor_by_cpf(&self, cpf: &str) -> Result<Option<Donor>, RepositoryError> {
        Ok(self
            .lock()?
            .donors
            .values()
            .find(|donor| donor.cpf == cpf)
            .cloned())
    }

    fn insert_donor(&self, donor: Donor) -> Result<Donor, RepositoryError> {
        let mut records = self.lock()?;
        if records.donors.contains_key(&donor.id) {
            return Err(RepositoryError::Conflict);
        }
        records.donors.insert(donor.id, donor.clone());
        Ok(donor)
    }

    fn update_donor(&self, donor: Donor) -> Result<(), RepositoryError> {
        let mut records = self.lock()?;
        match records.donors.get_mut(&donor.id) {
            Some(slot) => {
                *slot = donor;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_donor(&self, id: DonorId) -> Result<(), RepositoryError> {
        let mut records = self.lock()?;
        if records.donations.values().any(|donation| donation.donor_id == id) {
            return Err(RepositoryError::Conflict);
        }
        records
            .donors
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn list_donors(&self) -> Result<Vec<Donor>, RepositoryError> {
        let mut donors: Vec<Donor> = self.lock()?.donors.values().cloned().collect();
        donors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(donors)
    }

    fn update_donor_last_donation(
        &self,
        donor_id: DonorId,
        date: NaiveDate,
    ) -> Result<(), RepositoryError> {
        let mut records = self.lock()?;
        let donor = records
            .donors
            .get_mut(&donor_id)
            .ok_or(RepositoryError::NotFound)?;
        donor.last_donation = Some(date);
        Ok(())
    }

    fn find_screening(&self, id: ScreeningId) -> Result<Option<Screening>, RepositoryError> {
        Ok(self.lock()?.screenings.get(&id).cloned())
    }

    fn insert_screening(&self, screening: Screening) -> Result<Screening, RepositoryError> {
        let mut records = self.lock()?;
        if records.screenings.contains_key(&screening.id) {
            return Err(RepositoryError::Conflict);
        }
        records.screenings.insert(screening.id, screening.clone());
        Ok(screening)
    }

    fn update_screening(&self, screening: Screening) -> Result<(), RepositoryError> {
        let mut records = self.lock()?;
        match records.screenings.get_mut(&screening.id) {
            Some(slot) => {
                *slot = screening;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_screening(&self, id: ScreeningId) -> Result<usize, RepositoryError> {
        let mut records = self.lock()?;
        if records.screenings.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        let before = records.donations.len();
        records
            .donations
            .retain(|_, donation| donation.screening_id != id);
        Ok(before - records.donations.len())
    }

    fn screenings_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Screening>, RepositoryError> {
        Ok(self
            .lock()?
            .screenings
            .values()
            .filter(|screening| (from..=to).contains(&screening.performed_on))
            .cloned()
            .collect())
    }

    fn find_donation(&self, id: DonationId) -> Result<Option<Donation>, RepositoryError> {
        Ok(self.lock()?.donations.get(&id).cloned())
    }

    fn find_last_donation(&self, donor_id: DonorId) -> Result<Option<Donation>, RepositoryError> {
        Ok(self
            .lock()?
            .donations
            .values()
            .filter(|donation| donation.donor_id == donor_id)
            .max_by_key(|donation| (donation.date, donation.time))
            .cloned())
    }

    fn insert_donation(&self, donation: Donation) -> Result<Donation, RepositoryError> {
        let mut records = self.lock()?;
        if records.donations.contains_key(&donation.id) {
            return Err(RepositoryError::Conflict);
        }
        records.donations.insert(donation.id, donation.clone());
        Ok(donation)
    }

    fn update_donation(&self, donation: Donation) -> Result<(), RepositoryError> {
        let mut records = self.lock()?;
        match records.donations.get_mut(&donation.id) {
            Some(slot) => {
                *slot = donation;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_donation(&self, id: DonationId) -> Result<(), RepositoryError> {
        self.lock()?
            .donations
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn donations_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Donation>, RepositoryError> {
        Ok(self
            .lock()?
            .donations
            .values()
            .filter(|donation| (from..=to).contains(&donation.date))
            .cloned()
            .collect())
    }

    fn record_donation(&self, donation: Donation) -> Result<Donation, RepositoryError> {
        let mut records = self.lock()?;
        if records.donations.contains_key(&donation.id) {
            return Err(RepositoryError::Conflict);
        }
        let donor = records
            .donors
            .get_mut(&donation.donor_id)
            .ok_or(RepositoryError::NotFound)?;
        donor.last_donation = donor.last_donation.max(Some(donation.date));
        records.donations.insert(donation.id, donation.clone());
        Ok(donation)
    }

    fn find_hospital(&self, id: HospitalId) -> Result<Option<Hospital>, RepositoryError> {
        Ok(self.lock()?.hospitals.get(&id).cloned())
    }

    fn find_hospital_by_name(&self, name: &str) -> Result<Option<Hospital>, RepositoryError> {
        let wanted = name.to_lowercase();
        Ok(self
            .lock()?
            .hospitals
            .values()
            .find(|hospital| hospital.name.to_lowercase() == wanted)
            .cloned())
    }

    fn insert_hospital(&self, hospital: Hospital) -> Result<Hospital, RepositoryError> {
        let mut records = self.lock()?;
        if records.hospitals.contains_key(&hospital.id) {
            return Err(RepositoryError::Conflict);
        }
        records.hospitals.insert(hospital.id, hospital.clone());
        Ok(hospital)
    }

    fn update_hospital(&self, hospital: Hospital) -> Result<(), RepositoryError> {
        let mut records = self.lock()?;
        match records.hospitals.get_mut(&hospital.id) {
            Some(slot) => {
                *slot = hospital;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_hospital(&self, id: HospitalId) -> Result<(), RepositoryError> {
        let mut records = self.lock()?;
        let linked = records
            .donors
            .values()
            .any(|donor| donor.hospital_id == Some(id))
            || records
                .administrators
                .values()
                .any(|administrator| administrator.hospital_id == Some(id));
        if linked {
            return Err(RepositoryError::Conflict);
        }
        records
            .hospitals
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn list_hospitals(&self) -> Result<Vec<Hospital>, RepositoryError> {
        let mut hospitals: Vec<Hospital> = self.lock()?.hospitals.values().cloned().collect();
        hospitals.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(hospitals)
    }

    fn find_administrator_by_login(
        &self,
        login: &str,
    ) -> Result<Option<Administrator>, RepositoryError> {
        Ok(self.lock()?.administrators.get(login).cloned())
    }

    fn insert_administrator(
        &self,
        administrator: Administrator,
    ) -> Result<Administrator, RepositoryError> {
        let mut records = self.lock()?;
        if records.administrators.contains_key(&administrator.login) {
            return Err(RepositoryError::Conflict);
        }
        records
            .administrators
            .insert(administrator.login.clone(), administrator.clone());
        Ok(administrator)
    }

    fn delete_administrator(&self, id: AdministratorId) -> Result<(), RepositoryError> {
        let mut records = self.lock()?;
        let before = records.administrators.len();
        records
            .administrators
            .retain(|_, administrator| administrator.id != id);
        if records.administrators.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn list_administrators(&self) -> Result<Vec<Administrator>, RepositoryError> {
        let mut administrators: Vec<Administrator> =
            self.lock()?.administrators.values().cloned().collect();
        administrators.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(administrators)
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
