//! Display strings for logged entries
//!
//! Two renderings per category: a month-list row (`summary`) and a compact
//! day-cell badge (`day_badge`). Both read the same stored values the
//! feedback rules do and degrade to friendly no-data text.

use crate::category::Category;
use crate::schema::number_to_display;
use crate::store::docs::{EntryValues, Scalar};
use crate::sync::EntryIndex;

fn number_of(values: &EntryValues, key: &str) -> f64 {
    values.get(key).map(Scalar::coerce_number).unwrap_or(0.0)
}

fn flag_of(values: &EntryValues, key: &str) -> bool {
    values.get(key).map(Scalar::coerce_bool).unwrap_or(false)
}

/// Month-list row for one entry's values
pub fn summary(category: Category, values: &EntryValues) -> String {
    match category {
        Category::Water => {
            let glasses = number_of(values, "glasses");
            if glasses == 0.0 {
                "No water logged yet".to_string()
            } else {
                format!(
                    "{} {} of water",
                    number_to_display(glasses),
                    if glasses == 1.0 { "glass" } else { "glasses" }
                )
            }
        }
        Category::Diet => {
            let calories = number_of(values, "calories");
            if calories == 0.0 {
                "No calories logged yet".to_string()
            } else {
                format!("{} kcal", number_to_display(calories))
            }
        }
        Category::Exercise => {
            let completed = flag_of(values, "workoutCompleted");
            let minutes = number_of(values, "cardioMinutes");
            match (completed, minutes != 0.0) {
                (true, true) => format!(
                    "Workout done • {} min cardio",
                    number_to_display(minutes)
                ),
                (false, true) => format!("{} min of cardio", number_to_display(minutes)),
                (true, false) => "Workout done".to_string(),
                (false, false) => "No exercise logged yet".to_string(),
            }
        }
        Category::Sleep => {
            let hours = number_of(values, "hours");
            if hours == 0.0 {
                "No sleep logged yet".to_string()
            } else {
                format!(
                    "{} {} of sleep",
                    number_to_display(hours),
                    if hours == 1.0 { "hour" } else { "hours" }
                )
            }
        }
    }
}

/// Compact badge for a day cell; empty when there is nothing to show
pub fn day_badge(category: Category, values: &EntryValues) -> String {
    match category {
        Category::Water => {
            let glasses = number_of(values, "glasses");
            if glasses > 0.0 {
                format!("{} gls", number_to_display(glasses))
            } else {
                String::new()
            }
        }
        Category::Diet => {
            let calories = number_of(values, "calories");
            if calories > 0.0 {
                format!("{}k", number_to_display(calories))
            } else {
                String::new()
            }
        }
        Category::Exercise => {
            let minutes = number_of(values, "cardioMinutes");
            if minutes > 0.0 {
                format!("{}m", number_to_display(minutes))
            } else if flag_of(values, "workoutCompleted") {
                "Done".to_string()
            } else {
                String::new()
            }
        }
        Category::Sleep => {
            let hours = number_of(values, "hours");
            if hours > 0.0 {
                format!("{}h", number_to_display(hours))
            } else {
                String::new()
            }
        }
    }
}

/// Month-list rows for every entry in the index, in date order
pub fn month_summary(category: Category, index: &EntryIndex) -> Vec<(String, String)> {
    index
        .iter()
        .map(|(date_key, entry)| (date_key.clone(), summary(category, &entry.values)))
        .collect()
}
