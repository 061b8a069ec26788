use serde::{Deserialize, Serialize};

/// Thresholds applied by the eligibility engine. `Default` is the canonical rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityConfig {
    pub min_heart_rate_bpm: i32,
    pub max_heart_rate_bpm: i32,
    pub min_systolic_mmhg: i32,
    pub max_systolic_mmhg: i32,
    pub min_diastolic_mmhg: i32,
    pub max_diastolic_mmhg: i32,
    pub min_temperature_c: f64,
    pub max_temperature_c: f64,
    pub min_weight_kg: f64,
    pub min_donor_age: i64,
    pub max_donor_age: i64,
    pub male_interval_days: i64,
    pub female_interval_days: i64,
    pub min_volume_ml: f64,
    pub max_volume_ml: f64,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            min_heart_rate_bpm: 60,
            max_heart_rate_bpm: 100,
            min_systolic_mmhg: 120,
            max_systolic_mmhg: 129,
            min_diastolic_mmhg: 80,
            max_diastolic_mmhg: 84,
            min_temperature_c: 36.0,
            max_temperature_c: 37.2,
            min_weight_kg: 50.0,
            min_donor_age: 16,
            max_donor_age: 69,
            male_interval_days: 60,
            female_interval_days: 90,
            min_volume_ml: 350.0,
            max_volume_ml: 500.0,
        }
    }
}
