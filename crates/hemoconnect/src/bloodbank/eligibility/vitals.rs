use super::config::EligibilityConfig;
use super::{CriterionFailure, ScreeningCriterion};

/// Systolic/diastolic pair parsed from an `"S/D"` reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BloodPressure {
    pub systolic: i32,
    pub diastolic: i32,
}

/// Returns `None` for anything that is not exactly two integer parts around one `/`.
pub(crate) fn parse_blood_pressure(raw: &str) -> Option<BloodPressure> {
    let mut parts = raw.split('/');
    let systolic = parts.next()?.trim().parse::<i32>().ok()?;
    let diastolic = parts.next()?.trim().parse::<i32>().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some(BloodPressure {
        systolic,
        diastolic,
    })
}

/// Applies the four screening criteria in their fixed reporting order.
pub(crate) fn failed_criteria(
    heart_rate_bpm: i32,
    blood_pressure: &str,
    temperature_c: f64,
    weight_kg: f64,
    config: &EligibilityConfig,
) -> Vec<CriterionFailure> {
    let mut failures = Vec::new();

    if heart_rate_bpm < config.min_heart_rate_bpm || heart_rate_bpm > config.max_heart_rate_bpm {
        failures.push(CriterionFailure {
            criterion: ScreeningCriterion::HeartRate,
            explanation: format!(
                "heart rate {heart_rate_bpm} bpm outside {}-{} bpm",
                config.min_heart_rate_bpm, config.max_heart_rate_bpm
            ),
        });
    }

    match parse_blood_pressure(blood_pressure) {
        Some(reading) if blood_pressure_within(reading, config) => {}
        Some(reading) => failures.push(CriterionFailure {
            criterion: ScreeningCriterion::BloodPressure,
            explanation: format!(
                "blood pressure {}/{} mmHg outside {}/{}-{}/{} mmHg",
                reading.systolic,
                reading.diastolic,
                config.min_systolic_mmhg,
                config.min_diastolic_mmhg,
                config.max_systolic_mmhg,
                config.max_diastolic_mmhg
            ),
        }),
        None => failures.push(CriterionFailure {
            criterion: ScreeningCriterion::BloodPressure,
            explanation: format!(
                "blood pressure '{blood_pressure}' is not a systolic/diastolic reading"
            ),
        }),
    }

    if !(config.min_temperature_c..=config.max_temperature_c).contains(&temperature_c) {
        failures.push(CriterionFailure {
            criterion: ScreeningCriterion::Temperature,
            explanation: format!(
                "temperature {temperature_c:.1} °C outside {:.1}-{:.1} °C",
                config.min_temperature_c, config.max_temperature_c
            ),
        });
    }

    // NaN weights fail as well.
    if !(weight_kg >= config.min_weight_kg) {
        failures.push(CriterionFailure {
            criterion: ScreeningCriterion::Weight,
            explanation: format!(
                "weight {weight_kg:.1} kg below minimum {:.1} kg",
                config.min_weight_kg
            ),
        });
    }

    failures
}

fn blood_pressure_within(reading: BloodPressure, config: &EligibilityConfig) -> bool {
    (config.min_systolic_mmhg..=config.max_systolic_mmhg).contains(&reading.systolic)
        && (config.min_diastolic_mmhg..=config.max_diastolic_mmhg).contains(&reading.diastolic)
}
