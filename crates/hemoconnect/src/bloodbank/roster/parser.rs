use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::io::Read;

use super::super::domain::{DonorRegistration, HospitalId};

/// One roster line: either a registration form or the reason it could not be read.
#[derive(Debug)]
pub(crate) struct RosterRecord {
    /// 1-based data row number, header excluded.
    pub(crate) row: usize,
    pub(crate) registration: Result<DonorRegistration, String>,
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<RosterRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (index, record) in csv_reader.deserialize::<RosterRow>().enumerate() {
        let row = record?;
        records.push(RosterRecord {
            row: index + 1,
            registration: row.into_registration(),
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "CPF")]
    cpf: String,
    #[serde(rename = "Sex", default, deserialize_with = "empty_string_as_none")]
    sex: Option<String>,
    #[serde(rename = "Blood Type")]
    blood_type: String,
    #[serde(rename = "Birth Date")]
    birth_date: String,
    #[serde(rename = "Phone", default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(rename = "Neighborhood", default)]
    neighborhood: String,
    #[serde(rename = "Nationality", default)]
    nationality: String,
    #[serde(rename = "City", default)]
    city: String,
    #[serde(
        rename = "Last Donation",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    last_donation: Option<String>,
    #[serde(rename = "Hospital", default, deserialize_with = "empty_string_as_none")]
    hospital: Option<String>,
}

impl RosterRow {
    fn into_registration(self) -> Result<DonorRegistration, String> {
        let birth_date = parse_date(&self.birth_date)
            .ok_or_else(|| format!("invalid birth date '{}'", self.birth_date))?;

        let last_donation = match self.last_donation.as_deref() {
            Some(raw) => {
                Some(parse_date(raw).ok_or_else(|| format!("invalid last donation '{raw}'"))?)
            }
            None => None,
        };

        let phone = match self.phone.as_deref() {
            Some(raw) => digits(raw)
                .parse::<u64>()
                .map_err(|_| format!("invalid phone '{raw}'"))?,
            None => 0,
        };

        let hospital_id = match self.hospital.as_deref() {
            Some(raw) => Some(HospitalId(
                raw.parse::<u64>()
                    .map_err(|_| format!("invalid hospital id '{raw}'"))?,
            )),
            None => None,
        };

        Ok(DonorRegistration {
            name: self.name,
            cpf: digits(&self.cpf),
            sex: self.sex.unwrap_or_default(),
            blood_type: self.blood_type,
            birth_date,
            phone,
            neighborhood: self.neighborhood,
            nationality: self.nationality,
            city: self.city,
            last_donation,
            hospital_id,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Accepts ISO dates and the `dd/mm/yyyy` form used by hospital spreadsheets.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .ok()
}

/// Strips punctuation from formatted identifiers such as `123.456.789-09`.
fn digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
pub(crate) fn parse_date_for_tests(value: &str) -> Option<NaiveDate> {
    parse_date(value)
}
