mod parser;

use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::DonorId;
use super::repository::{Clock, RecordStore, RepositoryError};
use super::service::{BloodBankService, BloodBankServiceError};

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Storage(RepositoryError),
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read donor roster: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid donor roster CSV data: {}", err),
            RosterImportError::Storage(err) => {
                write!(f, "could not store donor roster entries: {}", err)
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::Storage(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RepositoryError> for RosterImportError {
    fn from(err: RepositoryError) -> Self {
        Self::Storage(err)
    }
}

/// Row that could not be registered, with the operator-facing reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub row: usize,
    pub reason: String,
}

/// Outcome of a roster import: bad rows are reported, not fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterImportReport {
    pub imported: Vec<DonorId>,
    pub rejected: Vec<RejectedRow>,
}

/// Bulk donor registration from a CSV roster.
///
/// Expected header: `Name,CPF,Sex,Blood Type,Birth Date,Phone,Neighborhood,Nationality,City,
/// Last Donation` with an optional `Hospital` id column. Every row goes through the same
/// registration rules as a single donor.
pub struct DonorRosterImporter;

impl DonorRosterImporter {
    pub fn from_path<P, S, C>(
        path: P,
        service: &BloodBankService<S, C>,
    ) -> Result<RosterImportReport, RosterImportError>
    where
        P: AsRef<Path>,
        S: RecordStore + 'static,
        C: Clock + 'static,
    {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, service)
    }

    pub fn from_reader<R, S, C>(
        reader: R,
        service: &BloodBankService<S, C>,
    ) -> Result<RosterImportReport, RosterImportError>
    where
        R: Read,
        S: RecordStore + 'static,
        C: Clock + 'static,
    {
        let mut report = RosterImportReport::default();

        for record in parser::parse_records(reader)? {
            let registration = match record.registration {
                Ok(registration) => registration,
                Err(reason) => {
                    report.rejected.push(RejectedRow {
                        row: record.row,
                        reason,
                    });
                    continue;
                }
            };

            match service.register_donor(registration) {
                Ok(donor) => report.imported.push(donor.id),
                Err(BloodBankServiceError::Repository(err)) => return Err(err.into()),
                Err(other) => report.rejected.push(RejectedRow {
                    row: record.row,
                    reason: other.to_string(),
                }),
            }
        }

        if !report.rejected.is_empty() {
            warn!(rejected = report.rejected.len(), "donor roster rows rejected");
        }
        info!(imported = report.imported.len(), "donor roster imported");
        Ok(report)
    }
}
