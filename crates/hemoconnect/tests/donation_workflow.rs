//! End-to-end scenarios for donor registration, screening, and donation admission driven through
//! the public service facade, the roster importer, and the HTTP router.

mod common {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use chrono::{NaiveDate, NaiveTime};

    use hemoconnect::bloodbank::{
        Administrator, AdministratorId, BloodBankService, Donation, DonationDraft, DonationId,
        Donor, DonorId, DonorRegistration, EligibilityConfig, FixedClock, Hospital, HospitalId,
        RecordStore, RepositoryError, Screening, ScreeningId, VitalSigns,
    };

    pub(super) fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid date")
    }

    pub(super) fn fit_vitals() -> VitalSigns {
        VitalSigns {
            heart_rate_bpm: 80,
            blood_pressure: "125/82".to_string(),
            temperature_c: 36.8,
            weight_kg: 70.0,
        }
    }

    pub(super) fn male_donor_aged_thirty() -> DonorRegistration {
        DonorRegistration {
            name: "Carlos Pereira".to_string(),
            cpf: "52998224725".to_string(),
            sex: "M".to_string(),
            blood_type: "O+".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1995, 3, 10).expect("valid date"),
            phone: 81999998888,
            neighborhood: "Boa Viagem".to_string(),
            nationality: "Brasileira".to_string(),
            city: "Recife".to_string(),
            last_donation: None,
            hospital_id: None,
        }
    }

    pub(super) fn draft(donor_id: DonorId, screening_id: ScreeningId, volume_ml: f64) -> DonationDraft {
        DonationDraft {
            date: Some(today()),
            time: NaiveTime::from_hms_opt(10, 15, 0),
            volume_ml: Some(volume_ml),
            screening_id: Some(screening_id),
            donor_id: Some(donor_id),
        }
    }

    pub(super) fn build_service() -> (
        Arc<BloodBankService<MemoryStore, FixedClock>>,
        Arc<MemoryStore>,
    ) {
        let store = Arc::new(MemoryStore::default());
        let service = BloodBankService::new(
            store.clone(),
            Arc::new(FixedClock(today())),
            EligibilityConfig::default(),
        );
        (Arc::new(service), store)
    }

    #[derive(Default)]
    struct Records {
        donors: BTreeMap<DonorId, Donor>,
        screenings: BTreeMap<ScreeningId, Screening>,
        donations: BTreeMap<DonationId, Donation>,
        hospitals: BTreeMap<HospitalId, Hospital>,
        administrators: Vec<Administrator>,
    }

    #[derive(Default)]
    pub(super) struct MemoryStore {
        records: Mutex<Records>,
    }

    impl MemoryStore {
        pub(super) fn donations(&self) -> Vec<Donation> {
            let records = self.records.lock().expect("store mutex poisoned");
            records.donations.values().cloned().collect()
        }

        pub(super) fn donor_count(&self) -> usize {
            self.records.lock().expect("store mutex poisoned").donors.len()
        }
    }

    impl RecordStore for MemoryStore {
        fn find_donor(&self, id: DonorId) -> Result<Option<Donor>, RepositoryError> {
            Ok(self.records.lock().expect("store mutex poisoned").donors.get(&id).cloned())
        }

        fn find_donor_by_cpf(&self, cpf: &str) -> Result<Option<Donor>, RepositoryError> {
            let records = self.records.lock().expect("store mutex poisoned");
            Ok(records.donors.values().find(|donor| donor.cpf == cpf).cloned())
        }

        fn insert_donor(&self, donor: Donor) -> Result<Donor, RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            records.donors.insert(donor.id, donor.clone());
            Ok(donor)
        }

        fn update_donor(&self, donor: Donor) -> Result<(), RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            match records.donors.get_mut(&donor.id) {
                Some(slot) => {
                    *slot = donor;
                    Ok(())
                }
                None => Err(RepositoryError::NotFound),
            }
        }

        fn delete_donor(&self, id: DonorId) -> Result<(), RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            records.donors.remove(&id).map(|_| ()).ok_or(RepositoryError::NotFound)
        }

        fn list_donors(&self) -> Result<Vec<Donor>, RepositoryError> {
            let records = self.records.lock().expect("store mutex poisoned");
            let mut donors: Vec<Donor> = records.donors.values().cloned().collect();
            donors.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(donors)
        }

        fn update_donor_last_donation(
            &self,
            donor_id: DonorId,
            date: NaiveDate,
        ) -> Result<(), RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            let donor = records
                .donors
                .get_mut(&donor_id)
                .ok_or(RepositoryError::NotFound)?;
            donor.last_donation = Some(date);
            Ok(())
        }

        fn find_screening(&self, id: ScreeningId) -> Result<Option<Screening>, RepositoryError> {
            let records = self.records.lock().expect("store mutex poisoned");
            Ok(records.screenings.get(&id).cloned())
        }

        fn insert_screening(&self, screening: Screening) -> Result<Screening, RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            records.screenings.insert(screening.id, screening.clone());
            Ok(screening)
        }

        fn update_screening(&self, screening: Screening) -> Result<(), RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            records.screenings.insert(screening.id, screening);
            Ok(())
        }

        fn delete_screening(&self, id: ScreeningId) -> Result<usize, RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            records.screenings.remove(&id).ok_or(RepositoryError::NotFound)?;
            let before = records.donations.len();
            records.donations.retain(|_, donation| donation.screening_id != id);
            Ok(before - records.donations.len())
        }

        fn screenings_between(
            &self,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<Screening>, RepositoryError> {
            let records = self.records.lock().expect("store mutex poisoned");
            Ok(records
                .screenings
                .values()
                .filter(|screening| screening.performed_on >= from && screening.performed_on <= to)
                .cloned()
                .collect())
        }

        fn find_donation(&self, id: DonationId) -> Result<Option<Donation>, RepositoryError> {
            let records = self.records.lock().expect("store mutex poisoned");
            Ok(records.donations.get(&id).cloned())
        }

        fn find_last_donation(
            &self,
            donor_id: DonorId,
        ) -> Result<Option<Donation>, RepositoryError> {
            let records = self.records.lock().expect("store mutex poisoned");
            Ok(records
                .donations
                .values()
                .filter(|donation| donation.donor_id == donor_id)
                .max_by_key(|donation| donation.date)
                .cloned())
        }

        fn insert_donation(&self, donation: Donation) -> Result<Donation, RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            records.donations.insert(donation.id, donation.clone());
            Ok(donation)
        }

        fn update_donation(&self, donation: Donation) -> Result<(), RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            match records.donations.get_mut(&donation.id) {
                Some(slot) => {
                    *slot = donation;
                    Ok(())
                }
                None => Err(RepositoryError::NotFound),
            }
        }

        fn delete_donation(&self, id: DonationId) -> Result<(), RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            records
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
            let records = self.records.lock().expect("store mutex poisoned");
            Ok(records
                .donations
                .values()
                .filter(|donation| donation.date >= from && donation.date <= to)
                .cloned()
                .collect())
        }

        fn find_hospital(&self, id: HospitalId) -> Result<Option<Hospital>, RepositoryError> {
            let records = self.records.lock().expect("store mutex poisoned");
            Ok(records.hospitals.get(&id).cloned())
        }

        fn find_hospital_by_name(&self, name: &str) -> Result<Option<Hospital>, RepositoryError> {
            let records = self.records.lock().expect("store mutex poisoned");
            Ok(records
                .hospitals
                .values()
                .find(|hospital| hospital.name.eq_ignore_ascii_case(name))
                .cloned())
        }

        fn insert_hospital(&self, hospital: Hospital) -> Result<Hospital, RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            records.hospitals.insert(hospital.id, hospital.clone());
            Ok(hospital)
        }

        fn update_hospital(&self, hospital: Hospital) -> Result<(), RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            match records.hospitals.get_mut(&hospital.id) {
                Some(slot) => {
                    *slot = hospital;
                    Ok(())
                }
                None => Err(RepositoryError::NotFound),
            }
        }

        fn delete_hospital(&self, id: HospitalId) -> Result<(), RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            records.hospitals.remove(&id).map(|_| ()).ok_or(RepositoryError::NotFound)
        }

        fn list_hospitals(&self) -> Result<Vec<Hospital>, RepositoryError> {
            let records = self.records.lock().expect("store mutex poisoned");
            let mut hospitals: Vec<Hospital> = records.hospitals.values().cloned().collect();
            hospitals.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(hospitals)
        }

        fn find_administrator_by_login(
            &self,
            login: &str,
        ) -> Result<Option<Administrator>, RepositoryError> {
            let records = self.records.lock().expect("store mutex poisoned");
            Ok(records
                .administrators
                .iter()
                .find(|administrator| administrator.login == login)
                .cloned())
        }

        fn insert_administrator(
            &self,
            administrator: Administrator,
        ) -> Result<Administrator, RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            records.administrators.push(administrator.clone());
            Ok(administrator)
        }

        fn delete_administrator(&self, id: AdministratorId) -> Result<(), RepositoryError> {
            let mut records = self.records.lock().expect("store mutex poisoned");
            let position = records
                .administrators
                .iter()
                .position(|administrator| administrator.id == id)
                .ok_or(RepositoryError::NotFound)?;
            records.administrators.remove(position);
            Ok(())
        }

        fn list_administrators(&self) -> Result<Vec<Administrator>, RepositoryError> {
            let records = self.records.lock().expect("store mutex poisoned");
            let mut administrators = records.administrators.clone();
            administrators.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(administrators)
        }
    }
}

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::NaiveDate;
use tower::ServiceExt;

use hemoconnect::bloodbank::{
    blood_bank_router, BloodBankServiceError, DonationDraft, DonationRejection,
    DonorRosterImporter,
};

use common::*;

#[test]
fn first_time_donor_is_screened_and_admitted() {
    let (service, store) = build_service();
    let donor = service
        .register_donor(male_donor_aged_thirty())
        .expect("donor registers");

    let outcome = service
        .record_screening(fit_vitals(), None)
        .expect("screening recorded");
    assert!(outcome.screening.approved);
    assert_eq!(outcome.summary(), "screening approved - donor fit to donate");

    let donation = service
        .admit_donation(draft(donor.id, outcome.screening.id, 450.0))
        .expect("donation admitted");
    assert_eq!(donation.volume_ml, 450.0);

    // The default two-step record path also advances the donor.
    let refreshed = service.donor(donor.id).expect("donor exists");
    assert_eq!(refreshed.last_donation, Some(today()));
    assert_eq!(store.donations().len(), 1);

    let again = service.admit_donation(draft(donor.id, outcome.screening.id, 450.0));
    assert!(matches!(
        again,
        Err(BloodBankServiceError::Rejected(
            DonationRejection::DonorNotEligible { .. }
        ))
    ));
}

#[test]
fn back_dated_donation_never_moves_last_donation_backwards() {
    let (service, store) = build_service();
    let april = NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date");
    let march = NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date");

    let mut form = male_donor_aged_thirty();
    form.last_donation = Some(april);
    let donor = service.register_donor(form).expect("donor registers");

    let outcome = service
        .record_screening(fit_vitals(), Some(march))
        .expect("screening recorded");
    let back_dated = DonationDraft {
        date: Some(march),
        ..draft(donor.id, outcome.screening.id, 450.0)
    };
    service
        .admit_donation(back_dated)
        .expect("late entry admitted");

    assert_eq!(store.donations().len(), 1);
    let refreshed = service.donor(donor.id).expect("donor exists");
    assert_eq!(refreshed.last_donation, Some(april));
}

#[test]
fn rejected_screening_blocks_the_donation() {
    let (service, store) = build_service();
    let donor = service
        .register_donor(male_donor_aged_thirty())
        .expect("donor registers");

    let mut feverish = fit_vitals();
    feverish.temperature_c = 38.1;
    let outcome = service
        .record_screening(feverish, None)
        .expect("screening recorded");
    assert!(!outcome.screening.approved);

    let result = service.admit_donation(draft(donor.id, outcome.screening.id, 450.0));
    assert!(matches!(
        result,
        Err(BloodBankServiceError::Rejected(
            DonationRejection::ScreeningNotApproved { .. }
        ))
    ));
    assert!(store.donations().is_empty());
}

#[test]
fn roster_import_reports_bad_rows_without_aborting() {
    let (service, store) = build_service();
    let csv = "Name,CPF,Sex,Blood Type,Birth Date,Phone,Neighborhood,Nationality,City,Last Donation\n\
Ana Souza,123.456.789-09,F,O-,1990-04-12,(81) 98888-7777,Centro,Brasileira,Recife,\n\
Bruno Lima,98765432100,M,Z+,1988-01-30,81999990000,Boa Vista,Brasileira,Recife,\n\
Clara Nunes,111.444.777-35,F,A+,20/11/1979,81977776666,Graças,Brasileira,Recife,01/03/2025\n\
Ana Duplicada,12345678909,F,O-,1990-04-12,81988887777,Centro,Brasileira,Recife,\n";

    let report = DonorRosterImporter::from_reader(csv.as_bytes(), service.as_ref())
        .expect("import succeeds");

    assert_eq!(report.imported.len(), 2);
    assert_eq!(store.donor_count(), 2);
    assert_eq!(report.rejected.len(), 2);
    assert_eq!(report.rejected[0].row, 2);
    assert!(report.rejected[0].reason.contains("Z+"));
    assert_eq!(report.rejected[1].row, 4);
    assert!(report.rejected[1].reason.contains("already registered"));

    let clara = service.donor(report.imported[1]).expect("imported donor");
    assert_eq!(
        clara.last_donation,
        chrono::NaiveDate::from_ymd_opt(2025, 3, 1)
    );
}

#[test]
fn malformed_roster_csv_aborts_the_import() {
    let (service, _) = build_service();
    let csv = "Name,CPF,Sex,Blood Type,Birth Date,Phone,Neighborhood,Nationality,City,Last Donation\n\
Ana Souza,12345678909,F\n";

    let result = DonorRosterImporter::from_reader(csv.as_bytes(), service.as_ref());
    assert!(matches!(
        result,
        Err(hemoconnect::bloodbank::RosterImportError::Csv(_))
    ));
}

#[tokio::test]
async fn router_exposes_eligibility_after_admission() {
    let (service, _) = build_service();
    let donor = service
        .register_donor(male_donor_aged_thirty())
        .expect("donor registers");
    let screening = service
        .record_screening(fit_vitals(), None)
        .expect("screening recorded")
        .screening;
    let router = blood_bank_router(service.clone());

    let body = serde_json::to_vec(&draft(donor.id, screening.id, 480.0)).expect("serialize");
    let response = router
        .clone()
        .oneshot(
            Request::post("/api/v1/donations")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/donors/{}/eligibility", donor.id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json payload");
    assert_eq!(payload["eligible"], serde_json::json!(false));
    assert_eq!(payload["age"], serde_json::json!(30));
}
