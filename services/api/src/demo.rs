use crate::infra::{parse_date, InMemoryRecordStore};
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use clap::Args;
use hemoconnect::bloodbank::{
    approximate_age, BloodBankService, DonationDraft, DonorRegistration, DonorRosterImporter,
    EligibilityConfig, EligibilityEngine, FixedClock, Sex, VitalSigns,
};
use hemoconnect::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScreeningEvaluationArgs {
    /// Heart rate in beats per minute
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) heart_rate: i32,
    /// Blood pressure as systolic/diastolic, e.g. 125/82
    #[arg(long)]
    pub(crate) blood_pressure: String,
    /// Body temperature in °C
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) temperature: f64,
    /// Body weight in kg
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) weight: f64,
}

#[derive(Args, Debug)]
pub(crate) struct DonorEligibilityArgs {
    /// Birth date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) birth_date: NaiveDate,
    /// Registered sex code (M or F)
    #[arg(long)]
    pub(crate) sex: String,
    /// Date of the previous donation (YYYY-MM-DD), if any
    #[arg(long, value_parser = parse_date)]
    pub(crate) last_donation: Option<NaiveDate>,
    /// Evaluation date (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct RosterImportArgs {
    /// Donor roster CSV export
    pub(crate) csv: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the demo date (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_screening_evaluation(args: ScreeningEvaluationArgs) {
    let engine = EligibilityEngine::new(EligibilityConfig::default());
    let verdict = engine.evaluate_screening(
        args.heart_rate,
        &args.blood_pressure,
        args.temperature,
        args.weight,
    );

    println!("{}", verdict.summary());
    for failure in &verdict.failed_reasons {
        println!("- {}: {}", failure.criterion.label(), failure.explanation);
    }
}

pub(crate) fn run_donor_eligibility(args: DonorEligibilityArgs) {
    let engine = EligibilityEngine::new(EligibilityConfig::default());
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let sex = Sex::parse(&args.sex);
    let eligible = engine.profile_can_donate(args.birth_date, sex, args.last_donation, today);

    println!(
        "Donor aged {} ({}) as of {}",
        approximate_age(args.birth_date, today),
        sex.map(Sex::code).unwrap_or("unrecognised sex"),
        today
    );
    match args.last_donation {
        Some(last) => println!("Last donation: {} ({} days ago)", last, (today - last).num_days()),
        None => println!("Last donation: never"),
    }
    println!("Eligible to donate: {}", if eligible { "yes" } else { "no" });
}

pub(crate) fn run_roster_import(args: RosterImportArgs) -> Result<(), AppError> {
    let service = BloodBankService::new(
        Arc::new(InMemoryRecordStore::default()),
        Arc::new(FixedClock(Local::now().date_naive())),
        EligibilityConfig::default(),
    );

    let report = DonorRosterImporter::from_path(&args.csv, &service)?;
    println!(
        "Roster {}: {} donors imported, {} rows rejected",
        args.csv.display(),
        report.imported.len(),
        report.rejected.len()
    );
    for rejected in &report.rejected {
        println!("- row {}: {}", rejected.row, rejected.reason);
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let store = Arc::new(InMemoryRecordStore::default());
    let service = BloodBankService::new(
        store,
        Arc::new(FixedClock(today)),
        EligibilityConfig::default(),
    );

    println!("HemoConnect demo for {today}");

    let donor = match service.register_donor(demo_registration(today)) {
        Ok(donor) => donor,
        Err(err) => {
            println!("  Registration rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- Registered donor {} ({}, blood type {}, age {})",
        donor.id,
        donor.name,
        donor.blood_type,
        approximate_age(donor.birth_date, today)
    );

    let vitals = VitalSigns {
        heart_rate_bpm: 80,
        blood_pressure: "125/82".to_string(),
        temperature_c: 36.8,
        weight_kg: 70.0,
    };
    let outcome = match service.record_screening(vitals, None) {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("  Screening unavailable: {err}");
            return Ok(());
        }
    };
    println!("- Screening {}: {}", outcome.screening.id, outcome.summary());

    let draft = DonationDraft {
        date: Some(today),
        time: NaiveTime::from_hms_opt(9, 30, 0),
        volume_ml: Some(450.0),
        screening_id: Some(outcome.screening.id),
        donor_id: Some(donor.id),
    };
    match service.admit_donation(draft.clone()) {
        Ok(donation) => println!(
            "- Donation {} admitted: {:.0} mL at {}",
            donation.id, donation.volume_ml, donation.time
        ),
        Err(err) => println!("- Donation rejected: {err}"),
    }

    match service.admit_donation(draft) {
        Ok(_) => println!("- Repeat donation unexpectedly admitted"),
        Err(err) => println!("- Repeat donation the same day rejected: {err}"),
    }

    match service.daily_statistics(today) {
        Ok(stats) => println!(
            "\nToday: {} screenings ({:.0}% approved), {} donations, {:.0} mL collected",
            stats.screenings.total,
            stats.screenings.approved_pct(),
            stats.donations.total,
            stats.donations.volume_ml
        ),
        Err(err) => println!("\nStatistics unavailable: {err}"),
    }

    Ok(())
}

fn demo_registration(today: NaiveDate) -> DonorRegistration {
    DonorRegistration {
        name: "Carlos Pereira".to_string(),
        cpf: "52998224725".to_string(),
        sex: "M".to_string(),
        blood_type: "O+".to_string(),
        birth_date: today - Duration::days(365 * 30 + 10),
        phone: 81999998888,
        neighborhood: "Boa Viagem".to_string(),
        nationality: "Brasileira".to_string(),
        city: "Recife".to_string(),
        last_donation: None,
        hospital_id: None,
    }
}
