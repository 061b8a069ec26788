use super::domain::{
    Administrator, AdministratorId, AdministratorRegistration, BloodType, Donor, DonorId,
    DonorRegistration, Hospital, HospitalId, HospitalRegistration, Sex,
    DEFAULT_ADMINISTRATOR_ROLE,
};

/// Validation errors raised by the registration guard.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationViolation {
    #[error("{field} must not be blank")]
    BlankField { field: &'static str },
    #[error("CPF must contain exactly 11 digits (found '{found}')")]
    InvalidCpf { found: String },
    #[error("unknown blood type '{found}' (expected one of A+, A-, B+, B-, AB+, AB-, O+, O-)")]
    UnknownBloodType { found: String },
    #[error("phone number must be a positive number")]
    InvalidPhone,
    #[error("hospital name must have at least {min} characters")]
    HospitalNameTooShort { min: usize },
    #[error("CEP must contain exactly 8 digits (found '{found}')")]
    InvalidCep { found: String },
    #[error("a donor with CPF {cpf} is already registered")]
    DuplicateCpf { cpf: String },
    #[error("a hospital named '{name}' is already registered")]
    DuplicateHospitalName { name: String },
    #[error("login '{login}' is already taken")]
    DuplicateLogin { login: String },
    #[error("hospital {id} is not registered")]
    UnknownHospital { id: HospitalId },
}

impl RegistrationViolation {
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RegistrationViolation::DuplicateCpf { .. }
                | RegistrationViolation::DuplicateHospitalName { .. }
                | RegistrationViolation::DuplicateLogin { .. }
        )
    }
}

const CPF_DIGITS: usize = 11;
const CEP_DIGITS: usize = 8;
const MIN_HOSPITAL_NAME_LEN: usize = 3;

/// Guard turning raw registration forms into records. Uniqueness and hospital links are checked
/// by the service, which owns the store.
///
/// `assign_id` runs only once the form is valid, so rejected forms never consume an id.
#[derive(Debug, Clone, Default)]
pub struct RegistrationGuard;

impl RegistrationGuard {
    pub fn donor_from_registration(
        &self,
        registration: DonorRegistration,
        assign_id: impl FnOnce() -> DonorId,
    ) -> Result<Donor, RegistrationViolation> {
        let name = require_text("name", &registration.name)?;

        let cpf = registration.cpf.trim().to_string();
        if cpf.len() != CPF_DIGITS || !cpf.chars().all(|c| c.is_ascii_digit()) {
            return Err(RegistrationViolation::InvalidCpf { found: cpf });
        }

        let blood_type = BloodType::parse(&registration.blood_type).ok_or_else(|| {
            RegistrationViolation::UnknownBloodType {
                found: registration.blood_type.trim().to_string(),
            }
        })?;

        if registration.phone == 0 {
            return Err(RegistrationViolation::InvalidPhone);
        }

        let neighborhood = require_text("neighborhood", &registration.neighborhood)?;
        let nationality = require_text("nationality", &registration.nationality)?;
        let city = require_text("city", &registration.city)?;

        Ok(Donor {
            id: assign_id(),
            name,
            cpf,
            // Unrecognised codes are kept as absent; such donors never pass the interval rule.
            sex: Sex::parse(&registration.sex),
            blood_type,
            birth_date: registration.birth_date,
            phone: registration.phone,
            neighborhood,
            nationality,
            city,
            last_donation: registration.last_donation,
            hospital_id: registration.hospital_id,
        })
    }

    pub fn hospital_from_registration(
        &self,
        registration: HospitalRegistration,
        assign_id: impl FnOnce() -> HospitalId,
    ) -> Result<Hospital, RegistrationViolation> {
        let name = registration.name.trim().to_string();
        if name.chars().count() < MIN_HOSPITAL_NAME_LEN {
            return Err(RegistrationViolation::HospitalNameTooShort {
                min: MIN_HOSPITAL_NAME_LEN,
            });
        }

        let cep: String = registration
            .cep
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        if cep.len() != CEP_DIGITS {
            return Err(RegistrationViolation::InvalidCep {
                found: registration.cep,
            });
        }

        let city = require_text("city", &registration.city)?;

        Ok(Hospital {
            id: assign_id(),
            name,
            cep,
            city,
        })
    }

    pub fn administrator_from_registration(
        &self,
        registration: AdministratorRegistration,
        assign_id: impl FnOnce() -> AdministratorId,
    ) -> Result<Administrator, RegistrationViolation> {
        let name = require_text("name", &registration.name)?;
        let login = require_text("login", &registration.login)?;
        if registration.password.trim().is_empty() {
            return Err(RegistrationViolation::BlankField { field: "password" });
        }

        let role = registration
            .role
            .map(|role| role.trim().to_string())
            .filter(|role| !role.is_empty())
            .unwrap_or_else(|| DEFAULT_ADMINISTRATOR_ROLE.to_string());

        Ok(Administrator {
            id: assign_id(),
            name,
            login,
            password: registration.password,
            role,
            hospital_id: registration.hospital_id,
        })
    }
}

fn require_text(field: &'static str, value: &str) -> Result<String, RegistrationViolation> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RegistrationViolation::BlankField { field });
    }
    Ok(trimmed.to_string())
}
