use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    AdministratorId, AdministratorRegistration, BloodType, DonationAmendment, DonationDraft,
    DonationId, DonorId, DonorRegistration, HospitalId, HospitalRegistration, ScreeningId,
    VitalSigns,
};
use super::registration::RegistrationViolation;
use super::repository::{Clock, RecordStore, RepositoryError};
use super::service::{
    BloodBankService, BloodBankServiceError, DonorFilter, HospitalFilter, ScreeningOutcome,
};

type SharedService<S, C> = Arc<BloodBankService<S, C>>;

/// Router builder exposing screening, donor, donation, hospital, administrator, and statistics
/// endpoints.
pub fn blood_bank_router<S, C>(service: SharedService<S, C>) -> Router
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route(
            "/api/v1/screenings/evaluate",
            post(evaluate_screening_handler::<S, C>),
        )
        .route("/api/v1/screenings", post(record_screening_handler::<S, C>))
        .route(
            "/api/v1/screenings/:screening_id",
            get(screening_handler::<S, C>)
                .put(amend_screening_handler::<S, C>)
                .delete(remove_screening_handler::<S, C>),
        )
        .route(
            "/api/v1/donors",
            get(donors_handler::<S, C>)
                .post(register_donor_handler::<S, C>)
                .delete(remove_donor_by_cpf_handler::<S, C>),
        )
        .route(
            "/api/v1/donors/:donor_id",
            get(donor_handler::<S, C>)
                .put(update_donor_handler::<S, C>)
                .delete(remove_donor_handler::<S, C>),
        )
        .route(
            "/api/v1/donors/:donor_id/eligibility",
            get(donor_eligibility_handler::<S, C>),
        )
        .route(
            "/api/v1/donations",
            get(donations_on_handler::<S, C>).post(admit_donation_handler::<S, C>),
        )
        .route(
            "/api/v1/donations/:donation_id",
            get(donation_handler::<S, C>)
                .put(amend_donation_handler::<S, C>)
                .delete(remove_donation_handler::<S, C>),
        )
        .route(
            "/api/v1/hospitals",
            get(hospitals_handler::<S, C>).post(register_hospital_handler::<S, C>),
        )
        .route(
            "/api/v1/hospitals/:hospital_id",
            get(hospital_handler::<S, C>)
                .put(update_hospital_handler::<S, C>)
                .delete(remove_hospital_handler::<S, C>),
        )
        .route(
            "/api/v1/hospitals/:hospital_id/donors",
            get(hospital_donors_handler::<S, C>),
        )
        .route(
            "/api/v1/administrators",
            get(administrators_handler::<S, C>)
                .post(register_administrator_handler::<S, C>)
                .delete(remove_administrator_handler::<S, C>),
        )
        .route(
            "/api/v1/administrators/authenticate",
            post(authenticate_handler::<S, C>),
        )
        .route(
            "/api/v1/statistics/daily",
            get(daily_statistics_handler::<S, C>),
        )
        .route(
            "/api/v1/statistics/monthly",
            get(monthly_statistics_handler::<S, C>),
        )
        .route(
            "/api/v1/statistics/general",
            get(general_statistics_handler::<S, C>),
        )
        .with_state(service)
}

/// Vitals plus an optional screening date; the service's clock fills in a missing date.
#[derive(Debug, Clone, Deserialize)]
pub struct ScreeningRequest {
    #[serde(flatten)]
    pub vitals: VitalSigns,
    #[serde(default)]
    pub performed_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonthlyQuery {
    pub year: i32,
    pub month: u32,
}

/// Donor search parameters. The blood type uses its label, e.g. `O-` or `AB%2B`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DonorQuery {
    #[serde(default)]
    pub hospital_id: Option<u64>,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CpfQuery {
    pub cpf: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdministratorQuery {
    #[serde(default)]
    pub hospital_id: Option<u64>,
}

/// Selects the administrator to remove, by id or by login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdministratorRemovalQuery {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub login: Option<String>,
}

pub(crate) async fn evaluate_screening_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    axum::Json(vitals): axum::Json<VitalSigns>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    let verdict = service.engine().evaluate_vitals(&vitals);
    let payload = json!({
        "approved": verdict.approved,
        "failed_reasons": verdict.failed_reasons,
        "summary": verdict.summary(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn record_screening_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    axum::Json(request): axum::Json<ScreeningRequest>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.record_screening(request.vitals, request.performed_on) {
        Ok(outcome) => (StatusCode::CREATED, axum::Json(screening_view(&outcome))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn screening_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(screening_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.screening(ScreeningId(screening_id)) {
        Ok(outcome) => (StatusCode::OK, axum::Json(screening_view(&outcome))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn amend_screening_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(screening_id): Path<u64>,
    axum::Json(vitals): axum::Json<VitalSigns>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.amend_screening(ScreeningId(screening_id), vitals) {
        Ok(outcome) => (StatusCode::OK, axum::Json(screening_view(&outcome))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_screening_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(screening_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.remove_screening(ScreeningId(screening_id)) {
        Ok(removed) => {
            let payload = json!({
                "screening_id": screening_id,
                "removed_donations": removed,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_donor_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    axum::Json(registration): axum::Json<DonorRegistration>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.register_donor(registration) {
        Ok(donor) => (StatusCode::CREATED, axum::Json(donor)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn donors_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Query(query): Query<DonorQuery>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    let blood_type = match query.blood_type.as_deref() {
        Some(raw) => match BloodType::parse(raw) {
            Some(blood_type) => Some(blood_type),
            None => {
                let violation = RegistrationViolation::UnknownBloodType {
                    found: raw.trim().to_string(),
                };
                return error_response(violation.into());
            }
        },
        None => None,
    };
    let filter = DonorFilter {
        hospital_id: query.hospital_id.map(HospitalId),
        blood_type,
        city: query.city,
    };

    match service.donors(&filter) {
        Ok(donors) => (StatusCode::OK, axum::Json(donors)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_donor_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(donor_id): Path<u64>,
    axum::Json(registration): axum::Json<DonorRegistration>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.update_donor(DonorId(donor_id), registration) {
        Ok(donor) => (StatusCode::OK, axum::Json(donor)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_donor_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(donor_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.remove_donor(DonorId(donor_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_donor_by_cpf_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Query(query): Query<CpfQuery>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.remove_donor_by_cpf(&query.cpf) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn donor_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(donor_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.donor(DonorId(donor_id)) {
        Ok(donor) => (StatusCode::OK, axum::Json(donor)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn donor_eligibility_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(donor_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.donor_eligibility(DonorId(donor_id)) {
        Ok(eligibility) => (StatusCode::OK, axum::Json(eligibility)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn admit_donation_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    axum::Json(draft): axum::Json<DonationDraft>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.admit_donation(draft) {
        Ok(donation) => (StatusCode::CREATED, axum::Json(donation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn donations_on_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Query(query): Query<DailyQuery>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.donations_on(query.date) {
        Ok(donations) => (StatusCode::OK, axum::Json(donations)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn donation_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(donation_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.donation(DonationId(donation_id)) {
        Ok(donation) => (StatusCode::OK, axum::Json(donation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn amend_donation_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(donation_id): Path<u64>,
    axum::Json(amendment): axum::Json<DonationAmendment>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.amend_donation(DonationId(donation_id), amendment) {
        Ok(donation) => (StatusCode::OK, axum::Json(donation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_donation_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(donation_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.remove_donation(DonationId(donation_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_hospital_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    axum::Json(registration): axum::Json<HospitalRegistration>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.register_hospital(registration) {
        Ok(hospital) => (StatusCode::CREATED, axum::Json(hospital)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn hospitals_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Query(filter): Query<HospitalFilter>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.hospitals(&filter) {
        Ok(hospitals) => (StatusCode::OK, axum::Json(hospitals)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn hospital_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(hospital_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.hospital(HospitalId(hospital_id)) {
        Ok(hospital) => (StatusCode::OK, axum::Json(hospital)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_hospital_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(hospital_id): Path<u64>,
    axum::Json(registration): axum::Json<HospitalRegistration>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.update_hospital(HospitalId(hospital_id), registration) {
        Ok(hospital) => (StatusCode::OK, axum::Json(hospital)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_hospital_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(hospital_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.remove_hospital(HospitalId(hospital_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn hospital_donors_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Path(hospital_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.hospital_donors(HospitalId(hospital_id)) {
        Ok(donors) => (StatusCode::OK, axum::Json(donors)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn administrators_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Query(query): Query<AdministratorQuery>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.administrators(query.hospital_id.map(HospitalId)) {
        Ok(administrators) => (StatusCode::OK, axum::Json(administrators)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_administrator_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Query(query): Query<AdministratorRemovalQuery>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    let result = match (query.id, query.login.as_deref()) {
        (Some(id), _) => service.remove_administrator(AdministratorId(id)),
        (None, Some(login)) => service.remove_administrator_by_login(login).map(|_| ()),
        (None, None) => {
            let payload = json!({ "error": "administrator id or login is required" });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_administrator_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    axum::Json(registration): axum::Json<AdministratorRegistration>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.register_administrator(registration) {
        Ok(administrator) => (StatusCode::CREATED, axum::Json(administrator)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn authenticate_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    axum::Json(credentials): axum::Json<CredentialsRequest>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.authenticate(&credentials.login, &credentials.password) {
        Ok(administrator) => (StatusCode::OK, axum::Json(administrator)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn daily_statistics_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Query(query): Query<DailyQuery>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.daily_statistics(query.date) {
        Ok(statistics) => {
            let payload = json!({
                "statistics": statistics,
                "approved_pct": statistics.screenings.approved_pct(),
                "rejected_pct": statistics.screenings.rejected_pct(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn monthly_statistics_handler<S, C>(
    State(service): State<SharedService<S, C>>,
    Query(query): Query<MonthlyQuery>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.monthly_statistics(query.year, query.month) {
        Ok(statistics) => {
            let payload = json!({
                "statistics": statistics,
                "approved_pct": statistics.screenings.approved_pct(),
                "rejected_pct": statistics.screenings.rejected_pct(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn general_statistics_handler<S, C>(
    State(service): State<SharedService<S, C>>,
) -> Response
where
    S: RecordStore + 'static,
    C: Clock + 'static,
{
    match service.general_statistics() {
        Ok(statistics) => (StatusCode::OK, axum::Json(statistics)).into_response(),
        Err(error) => error_response(error),
    }
}

fn screening_view(outcome: &ScreeningOutcome) -> serde_json::Value {
    json!({
        "screening": outcome.screening,
        "failed_reasons": outcome.verdict.failed_reasons,
        "summary": outcome.summary(),
    })
}

fn error_response(error: BloodBankServiceError) -> Response {
    let (status, payload) = match &error {
        BloodBankServiceError::Rejected(rejection) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "error": rejection.to_string(),
                "reason": rejection.kind(),
            }),
        ),
        BloodBankServiceError::Registration(violation) if violation.is_conflict() => {
            (StatusCode::CONFLICT, json!({ "error": violation.to_string() }))
        }
        BloodBankServiceError::Registration(violation) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": violation.to_string() }),
        ),
        BloodBankServiceError::InvalidPeriod { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": error.to_string() }),
        ),
        BloodBankServiceError::StillReferenced { .. } => {
            (StatusCode::CONFLICT, json!({ "error": error.to_string() }))
        }
        BloodBankServiceError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            json!({ "error": error.to_string() }),
        ),
        BloodBankServiceError::Repository(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, json!({ "error": error.to_string() }))
        }
        BloodBankServiceError::Repository(RepositoryError::Conflict) => {
            (StatusCode::CONFLICT, json!({ "error": error.to_string() }))
        }
        BloodBankServiceError::Repository(RepositoryError::Unavailable(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": error.to_string() }),
        ),
    };

    (status, axum::Json(payload)).into_response()
}
