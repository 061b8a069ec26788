use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{Duration, NaiveDate, NaiveTime};
use serde_json::Value;

use crate::bloodbank::domain::{
    Administrator, AdministratorId, BloodType, Donation, DonationDraft, DonationId, Donor,
    DonorId, DonorRegistration, Hospital, HospitalId, HospitalRegistration, Screening,
    ScreeningId, Sex, VitalSigns,
};
use crate::bloodbank::repository::{FixedClock, RecordStore, RepositoryError};
use crate::bloodbank::{blood_bank_router, BloodBankService, EligibilityConfig, EligibilityEngine};

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(crate) fn today() -> NaiveDate {
    date(2025, 6, 15)
}

pub(crate) fn collection_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).expect("valid time")
}

/// Birth date whose `days / 365` age on `as_of` is exactly `years`.
pub(crate) fn born_years_before(as_of: NaiveDate, years: i64) -> NaiveDate {
    as_of - Duration::days(365 * years)
}

pub(crate) fn engine() -> EligibilityEngine {
    EligibilityEngine::new(EligibilityConfig::default())
}

pub(crate) fn fit_vitals() -> VitalSigns {
    VitalSigns {
        heart_rate_bpm: 80,
        blood_pressure: "125/82".to_string(),
        temperature_c: 36.8,
        weight_kg: 70.0,
    }
}

pub(crate) fn unfit_vitals() -> VitalSigns {
    VitalSigns {
        heart_rate_bpm: 110,
        ..fit_vitals()
    }
}

pub(crate) fn donor(sex: Option<Sex>, age: i64, last_donation: Option<NaiveDate>) -> Donor {
    Donor {
        id: DonorId(7),
        name: "Carlos Pereira".to_string(),
        cpf: "52998224725".to_string(),
        sex,
        blood_type: BloodType::OPositive,
        birth_date: born_years_before(today(), age),
        phone: 81999998888,
        neighborhood: "Boa Viagem".to_string(),
        nationality: "Brasileira".to_string(),
        city: "Recife".to_string(),
        last_donation,
        hospital_id: None,
    }
}

pub(crate) fn screening(approved: bool, performed_on: NaiveDate) -> Screening {
    Screening {
        id: ScreeningId(3),
        vitals: if approved { fit_vitals() } else { unfit_vitals() },
        approved,
        performed_on,
    }
}

pub(crate) fn draft(volume_ml: f64) -> DonationDraft {
    DonationDraft {
        date: Some(today()),
        time: Some(collection_time()),
        volume_ml: Some(volume_ml),
        screening_id: Some(ScreeningId(3)),
        donor_id: Some(DonorId(7)),
    }
}

pub(crate) fn registration(cpf: &str, sex: &str) -> DonorRegistration {
    DonorRegistration {
        name: "Carlos Pereira".to_string(),
        cpf: cpf.to_string(),
        sex: sex.to_string(),
        blood_type: "O+".to_string(),
        birth_date: date(1995, 3, 10),
        phone: 81999998888,
        neighborhood: "Boa Viagem".to_string(),
        nationality: "Brasileira".to_string(),
        city: "Recife".to_string(),
        last_donation: None,
        hospital_id: None,
    }
}

pub(crate) fn hospital_form(name: &str, city: &str) -> HospitalRegistration {
    HospitalRegistration {
        name: name.to_string(),
        cep: "52011-000".to_string(),
        city: city.to_string(),
    }
}

pub(crate) fn draft_for(donor_id: DonorId, screening_id: ScreeningId, volume_ml: f64) -> DonationDraft {
    DonationDraft {
        date: Some(today()),
        time: Some(collection_time()),
        volume_ml: Some(volume_ml),
        screening_id: Some(screening_id),
        donor_id: Some(donor_id),
    }
}

pub(crate) fn build_service() -> (
    BloodBankService<MemoryRecordStore, FixedClock>,
    Arc<MemoryRecordStore>,
) {
    let store = Arc::new(MemoryRecordStore::default());
    let service = BloodBankService::new(
        store.clone(),
        Arc::new(FixedClock(today())),
        EligibilityConfig::default(),
    );
    (service, store)
}

pub(crate) fn router_with_service(
    service: BloodBankService<MemoryRecordStore, FixedClock>,
) -> axum::Router {
    blood_bank_router(Arc::new(service))
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Debug, Default)]
struct MemoryState {
    donors: BTreeMap<DonorId, Donor>,
    screenings: BTreeMap<ScreeningId, Screening>,
    donations: BTreeMap<DonationId, Donation>,
    hospitals: BTreeMap<HospitalId, Hospital>,
    administrators: Vec<Administrator>,
}

/// Record store backed by ordered maps under one mutex.
#[derive(Debug, Default, Clone)]
pub(crate) struct MemoryRecordStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRecordStore {
    pub(crate) fn donation_count(&self) -> usize {
        self.state.lock().expect("store mutex poisoned").donations.len()
    }

    pub(crate) fn put_screening(&self, screening: Screening) {
        self.state
            .lock()
            .expect("store mutex poisoned")
            .screenings
            .insert(screening.id, screening);
    }
}

impl RecordStore for MemoryRecordStore {
    fn find_donor(&self, id: DonorId) -> Result<Option<Donor>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.donors.get(&id).cloned())
    }

    fn find_donor_by_cpf(&self, cpf: &str) -> Result<Option<Donor>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.donors.values().find(|donor| donor.cpf == cpf).cloned())
    }

    fn insert_donor(&self, donor: Donor) -> Result<Donor, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if state.donors.contains_key(&donor.id) {
            return Err(RepositoryError::Conflict);
        }
        state.donors.insert(donor.id, donor.clone());
        Ok(donor)
    }

    fn update_donor(&self, donor: Donor) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let slot = state
            .donors
            .get_mut(&donor.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = donor;
        Ok(())
    }

    fn delete_donor(&self, id: DonorId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state
            .donors
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn list_donors(&self) -> Result<Vec<Donor>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let mut donors: Vec<Donor> = state.donors.values().cloned().collect();
        donors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(donors)
    }

    fn update_donor_last_donation(
        &self,
        donor_id: DonorId,
        date: NaiveDate,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let donor = state
            .donors
            .get_mut(&donor_id)
            .ok_or(RepositoryError::NotFound)?;
        donor.last_donation = Some(date);
        Ok(())
    }

    fn find_screening(&self, id: ScreeningId) -> Result<Option<Screening>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.screenings.get(&id).cloned())
    }

    fn insert_screening(&self, screening: Screening) -> Result<Screening, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if state.screenings.contains_key(&screening.id) {
            return Err(RepositoryError::Conflict);
        }
        state.screenings.insert(screening.id, screening.clone());
        Ok(screening)
    }

    fn update_screening(&self, screening: Screening) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let slot = state
            .screenings
            .get_mut(&screening.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = screening;
        Ok(())
    }

    fn delete_screening(&self, id: ScreeningId) -> Result<usize, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state
            .screenings
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        let before = state.donations.len();
        state.donations.retain(|_, donation| donation.screening_id != id);
        Ok(before - state.donations.len())
    }

    fn screenings_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Screening>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .screenings
            .values()
            .filter(|screening| (from..=to).contains(&screening.performed_on))
            .cloned()
            .collect())
    }

    fn find_donation(&self, id: DonationId) -> Result<Option<Donation>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.donations.get(&id).cloned())
    }

    fn find_last_donation(&self, donor_id: DonorId) -> Result<Option<Donation>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .donations
            .values()
            .filter(|donation| donation.donor_id == donor_id)
            .max_by_key(|donation| (donation.date, donation.time))
            .cloned())
    }

    fn insert_donation(&self, donation: Donation) -> Result<Donation, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if state.donations.contains_key(&donation.id) {
            return Err(RepositoryError::Conflict);
        }
        state.donations.insert(donation.id, donation.clone());
        Ok(donation)
    }

    fn update_donation(&self, donation: Donation) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let slot = state
            .donations
            .get_mut(&donation.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = donation;
        Ok(())
    }

    fn delete_donation(&self, id: DonationId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state
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
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .donations
            .values()
            .filter(|donation| (from..=to).contains(&donation.date))
            .cloned()
            .collect())
    }

    fn record_donation(&self, donation: Donation) -> Result<Donation, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let donor = state
            .donors
            .get_mut(&donation.donor_id)
            .ok_or(RepositoryError::NotFound)?;
        donor.last_donation = donor.last_donation.max(Some(donation.date));
        state.donations.insert(donation.id, donation.clone());
        Ok(donation)
    }

    fn find_hospital(&self, id: HospitalId) -> Result<Option<Hospital>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.hospitals.get(&id).cloned())
    }

    fn find_hospital_by_name(&self, name: &str) -> Result<Option<Hospital>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let wanted = name.to_lowercase();
        Ok(state
            .hospitals
            .values()
            .find(|hospital| hospital.name.to_lowercase() == wanted)
            .cloned())
    }

    fn insert_hospital(&self, hospital: Hospital) -> Result<Hospital, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.hospitals.insert(hospital.id, hospital.clone());
        Ok(hospital)
    }

    fn update_hospital(&self, hospital: Hospital) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let slot = state
            .hospitals
            .get_mut(&hospital.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = hospital;
        Ok(())
    }

    fn delete_hospital(&self, id: HospitalId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state
            .hospitals
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn list_hospitals(&self) -> Result<Vec<Hospital>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let mut hospitals: Vec<Hospital> = state.hospitals.values().cloned().collect();
        hospitals.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(hospitals)
    }

    fn find_administrator_by_login(
        &self,
        login: &str,
    ) -> Result<Option<Administrator>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .administrators
            .iter()
            .find(|administrator| administrator.login == login)
            .cloned())
    }

    fn insert_administrator(
        &self,
        administrator: Administrator,
    ) -> Result<Administrator, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.administrators.push(administrator.clone());
        Ok(administrator)
    }

    fn delete_administrator(&self, id: AdministratorId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let before = state.administrators.len();
        state.administrators.retain(|administrator| administrator.id != id);
        if state.administrators.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn list_administrators(&self) -> Result<Vec<Administrator>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let mut administrators = state.administrators.clone();
        administrators.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(administrators)
    }
}

/// Store whose every call fails as if the database were offline.
pub(crate) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl RecordStore for UnavailableStore {
    fn find_donor(&self, _id: DonorId) -> Result<Option<Donor>, RepositoryError> {
        offline()
    }

    fn find_donor_by_cpf(&self, _cpf: &str) -> Result<Option<Donor>, RepositoryError> {
        offline()
    }

    fn insert_donor(&self, _donor: Donor) -> Result<Donor, RepositoryError> {
        offline()
    }

    fn update_donor(&self, _donor: Donor) -> Result<(), RepositoryError> {
        offline()
    }

    fn delete_donor(&self, _id: DonorId) -> Result<(), RepositoryError> {
        offline()
    }

    fn list_donors(&self) -> Result<Vec<Donor>, RepositoryError> {
        offline()
    }

    fn update_donor_last_donation(
        &self,
        _donor_id: DonorId,
        _date: NaiveDate,
    ) -> Result<(), RepositoryError> {
        offline()
    }

    fn find_screening(&self, _id: ScreeningId) -> Result<Option<Screening>, RepositoryError> {
        offline()
    }

    fn insert_screening(&self, _screening: Screening) -> Result<Screening, RepositoryError> {
        offline()
    }

    fn update_screening(&self, _screening: Screening) -> Result<(), RepositoryError> {
        offline()
    }

    fn delete_screening(&self, _id: ScreeningId) -> Result<usize, RepositoryError> {
        offline()
    }

    fn screenings_between(
        &self,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<Screening>, RepositoryError> {
        offline()
    }

    fn find_donation(&self, _id: DonationId) -> Result<Option<Donation>, RepositoryError> {
        offline()
    }

    fn find_last_donation(&self, _donor_id: DonorId) -> Result<Option<Donation>, RepositoryError> {
        offline()
    }

    fn insert_donation(&self, _donation: Donation) -> Result<Donation, RepositoryError> {
        offline()
    }

    fn update_donation(&self, _donation: Donation) -> Result<(), RepositoryError> {
        offline()
    }

    fn delete_donation(&self, _id: DonationId) -> Result<(), RepositoryError> {
        offline()
    }

    fn donations_between(
        &self,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<Donation>, RepositoryError> {
        offline()
    }

    fn find_hospital(&self, _id: HospitalId) -> Result<Option<Hospital>, RepositoryError> {
        offline()
    }

    fn find_hospital_by_name(&self, _name: &str) -> Result<Option<Hospital>, RepositoryError> {
        offline()
    }

    fn insert_hospital(&self, _hospital: Hospital) -> Result<Hospital, RepositoryError> {
        offline()
    }

    fn update_hospital(&self, _hospital: Hospital) -> Result<(), RepositoryError> {
        offline()
    }

    fn delete_hospital(&self, _id: HospitalId) -> Result<(), RepositoryError> {
        offline()
    }

    fn list_hospitals(&self) -> Result<Vec<Hospital>, RepositoryError> {
        offline()
    }

    fn find_administrator_by_login(
        &self,
        _login: &str,
    ) -> Result<Option<Administrator>, RepositoryError> {
        offline()
    }

    fn insert_administrator(
        &self,
        _administrator: Administrator,
    ) -> Result<Administrator, RepositoryError> {
        offline()
    }

    fn delete_administrator(&self, _id: AdministratorId) -> Result<(), RepositoryError> {
        offline()
    }

    fn list_administrators(&self) -> Result<Vec<Administrator>, RepositoryError> {
        offline()
    }
}
