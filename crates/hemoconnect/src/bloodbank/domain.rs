use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered donors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DonorId(pub u64);

/// Identifier wrapper for recorded screenings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreeningId(pub u64);

/// Identifier wrapper for persisted donations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DonationId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HospitalId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdministratorId(pub u64);

macro_rules! display_id {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        })*
    };
}

display_id!(DonorId, ScreeningId, DonationId, HospitalId, AdministratorId);

/// Donor sex as recorded at registration; drives the inter-donation interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    /// Accepts the registration codes `M` and `F` in any case. Anything else is unrecognised.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "M" => Some(Self::Male),
            "F" => Some(Self::Female),
            _ => None,
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }
}

/// The eight ABO/Rh combinations accepted at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodType {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodType {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::APositive,
            Self::ANegative,
            Self::BPositive,
            Self::BNegative,
            Self::AbPositive,
            Self::AbNegative,
            Self::OPositive,
            Self::ONegative,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::APositive => "A+",
            Self::ANegative => "A-",
            Self::BPositive => "B+",
            Self::BNegative => "B-",
            Self::AbPositive => "AB+",
            Self::AbNegative => "AB-",
            Self::OPositive => "O+",
            Self::ONegative => "O-",
        }
    }

    /// Exact match against the canonical labels, surrounding whitespace ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ordered()
            .into_iter()
            .find(|blood_type| blood_type.label() == trimmed)
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Registered donor as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donor {
    pub id: DonorId,
    pub name: String,
    pub cpf: String,
    pub sex: Option<Sex>,
    pub blood_type: BloodType,
    pub birth_date: NaiveDate,
    pub phone: u64,
    pub neighborhood: String,
    pub nationality: String,
    pub city: String,
    pub last_donation: Option<NaiveDate>,
    pub hospital_id: Option<HospitalId>,
}

/// Vital signs captured during a pre-donation screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub heart_rate_bpm: i32,
    /// Systolic/diastolic reading, e.g. `"125/82"`.
    pub blood_pressure: String,
    pub temperature_c: f64,
    pub weight_kg: f64,
}

/// Screening snapshot; `approved` is always derived from `vitals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screening {
    pub id: ScreeningId,
    pub vitals: VitalSigns,
    pub approved: bool,
    pub performed_on: NaiveDate,
}

/// Unvalidated donation as entered by an operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonationDraft {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub volume_ml: Option<f64>,
    #[serde(default)]
    pub screening_id: Option<ScreeningId>,
    #[serde(default)]
    pub donor_id: Option<DonorId>,
}

/// Corrected collection details for an admitted donation. The screening and donor links are
/// fixed at admission and cannot be amended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonationAmendment {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub volume_ml: Option<f64>,
}

/// Donation that passed every admission check but has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedDonation {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub volume_ml: f64,
    pub screening_id: ScreeningId,
    pub donor_id: DonorId,
}

impl ValidatedDonation {
    pub fn into_donation(self, id: DonationId) -> Donation {
        Donation {
            id,
            date: self.date,
            time: self.time,
            volume_ml: self.volume_ml,
            screening_id: self.screening_id,
            donor_id: self.donor_id,
        }
    }
}

/// Persisted blood collection event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub volume_ml: f64,
    pub screening_id: ScreeningId,
    pub donor_id: DonorId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hospital {
    pub id: HospitalId,
    pub name: String,
    pub cep: String,
    pub city: String,
}

pub const DEFAULT_ADMINISTRATOR_ROLE: &str = "Administrador";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Administrator {
    pub id: AdministratorId,
    pub name: String,
    pub login: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: String,
    pub hospital_id: Option<HospitalId>,
}

/// Raw donor registration form; validated by the registration guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorRegistration {
    pub name: String,
    pub cpf: String,
    pub sex: String,
    pub blood_type: String,
    pub birth_date: NaiveDate,
    pub phone: u64,
    pub neighborhood: String,
    pub nationality: String,
    pub city: String,
    #[serde(default)]
    pub last_donation: Option<NaiveDate>,
    #[serde(default)]
    pub hospital_id: Option<HospitalId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalRegistration {
    pub name: String,
    pub cep: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministratorRegistration {
    pub name: String,
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub hospital_id: Option<HospitalId>,
}
