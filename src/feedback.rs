//! Goal-conditioned feedback on the previous day's entries
//!
//! Pure classification: a category, the owner's goal, and yesterday's
//! values (or their absence) map to a message and a tone. Thresholds live
//! in explicit lookup functions keyed by goal; no data always encourages
//! rather than scolds.

use std::collections::BTreeMap;

use crate::category::{Category, GoalKey};
use crate::schema::number_to_display;
use crate::store::docs::{EntryValues, Scalar};

/// Presentation emphasis of a feedback message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Encourage,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub message: String,
    pub tone: Tone,
}

impl Feedback {
    fn positive(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tone: Tone::Positive,
        }
    }

    fn encourage(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tone: Tone::Encourage,
        }
    }

    fn neutral(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tone: Tone::Neutral,
        }
    }
}

/// Daily glass target by goal
pub fn water_target(goal: GoalKey) -> u32 {
    if goal == GoalKey::HydrateMore {
        10
    } else {
        8
    }
}

/// Daily calorie range `(low, high)` by goal
pub fn calorie_range(goal: GoalKey) -> (u32, u32) {
    match goal {
        GoalKey::LoseWeight => (1400, 1800),
        GoalKey::BuildMuscle => (2200, 2800),
        _ => (1800, 2200),
    }
}

/// Nightly sleep range in hours; the goal only changes wording, not the
/// range itself
pub const SLEEP_RANGE: (u32, u32) = (7, 9);

/// Daily cardio-minute target by goal
pub fn cardio_target(goal: GoalKey) -> u32 {
    match goal {
        GoalKey::BuildMuscle => 20,
        GoalKey::LoseWeight => 30,
        _ => 25,
    }
}

fn number_of(values: Option<&EntryValues>, key: &str) -> f64 {
    values
        .and_then(|v| v.get(key))
        .map(Scalar::coerce_number)
        .unwrap_or(0.0)
}

fn flag_of(values: Option<&EntryValues>, key: &str) -> bool {
    values
        .and_then(|v| v.get(key))
        .map(Scalar::coerce_bool)
        .unwrap_or(false)
}

fn glasses_word(count: f64) -> &'static str {
    if count == 1.0 {
        "glass"
    } else {
        "glasses"
    }
}

fn hours_word(count: f64) -> &'static str {
    if count == 1.0 {
        "hour"
    } else {
        "hours"
    }
}

/// Classify one category's previous-day values against the owner's goal
pub fn classify(category: Category, goal: GoalKey, values: Option<&EntryValues>) -> Feedback {
    match category {
        Category::Water => water_feedback(goal, values),
        Category::Diet => diet_feedback(goal, values),
        Category::Exercise => exercise_feedback(goal, values),
        Category::Sleep => sleep_feedback(goal, values),
    }
}

fn water_feedback(goal: GoalKey, values: Option<&EntryValues>) -> Feedback {
    let glasses = number_of(values, "glasses");
    let target = water_target(goal);

    if glasses == 0.0 {
        return Feedback::encourage(
            "No water logged yesterday. Capture today's glasses to stay hydrated.",
        );
    }

    let shown = number_to_display(glasses);
    if glasses >= f64::from(target) {
        return Feedback::positive(format!(
            "Great job! You drank {} {} yesterday - keep it up.",
            shown,
            glasses_word(glasses)
        ));
    }

    let focus_line = match goal {
        GoalKey::LoseWeight => "Hydration helps fat loss - aim for ",
        GoalKey::HydrateMore => "Let's hit ",
        _ => "Shoot for ",
    };
    Feedback::encourage(format!(
        "Yesterday came in at {} {}. {}{}+ glasses today.",
        shown,
        glasses_word(glasses),
        focus_line,
        target
    ))
}

fn diet_feedback(goal: GoalKey, values: Option<&EntryValues>) -> Feedback {
    let calories = number_of(values, "calories");
    let (low, high) = calorie_range(goal);

    if calories == 0.0 {
        return Feedback::encourage(
            "No calories logged yesterday. Log meals to unlock tailored nudges.",
        );
    }

    let shown = number_to_display(calories);
    if calories >= f64::from(low) && calories <= f64::from(high) {
        return Feedback::positive(format!(
            "Right on target at {} kcal yesterday - nice discipline!",
            shown
        ));
    }

    if calories > f64::from(high) {
        let reason = match goal {
            GoalKey::LoseWeight => {
                format!("To support weight loss aim for {}-{} kcal.", low, high)
            }
            GoalKey::BuildMuscle => {
                format!("Lean gains love {}-{} kcal of quality fuel.", low, high)
            }
            _ => format!("A good range is roughly {}-{} kcal.", low, high),
        };
        return Feedback::encourage(format!("Yesterday we ate {} kcal. {}", shown, reason));
    }

    let lift = match goal {
        GoalKey::BuildMuscle => {
            format!("Muscle growth needs at least {} kcal - add a solid meal.", low)
        }
        _ => format!("Let's aim for about {}-{} kcal to stay energised.", low, high),
    };
    Feedback::encourage(format!("Calories landed at {} kcal. {}", shown, lift))
}

fn sleep_feedback(goal: GoalKey, values: Option<&EntryValues>) -> Feedback {
    let hours = number_of(values, "hours");
    let (min, max) = SLEEP_RANGE;

    if hours == 0.0 {
        return Feedback::encourage(
            "No sleep logged last night. Add it tonight to see recovery tips.",
        );
    }

    let shown = number_to_display(hours);
    if hours >= f64::from(min) && hours <= f64::from(max) {
        return Feedback::positive(format!(
            "Last night you slept {} hours - right in the sweet {}-{} hour zone.",
            shown, min, max
        ));
    }

    if hours < f64::from(min) {
        let focus = if goal == GoalKey::SleepBetter {
            "Let's guard your bedtime and wind down earlier."
        } else {
            "Carve out a little more rest to stay sharp."
        };
        return Feedback::encourage(format!(
            "Last night came in at {} {}. Aim for {}-{} to feel your best. {}",
            shown,
            hours_word(hours),
            min,
            max,
            focus
        ));
    }

    Feedback::neutral(format!(
        "You logged {} hours. If you feel groggy, try settling around {}-{} hours.",
        shown, min, max
    ))
}

fn exercise_feedback(goal: GoalKey, values: Option<&EntryValues>) -> Feedback {
    let completed = flag_of(values, "workoutCompleted");
    let cardio_minutes = number_of(values, "cardioMinutes");
    let target = cardio_target(goal);

    if !completed && cardio_minutes <= 0.0 {
        let cue = match goal {
            GoalKey::BuildMuscle => "Lift or move today to build momentum.",
            GoalKey::LoseWeight => "A brisk 30 minute session will keep the scale trending down.",
            _ => "Schedule today's movement to stay consistent.",
        };
        return Feedback::encourage(format!("No workout logged yesterday. {}", cue));
    }

    let shown = number_to_display(cardio_minutes);
    if completed && cardio_minutes >= f64::from(target) {
        return Feedback::positive(format!(
            "Workout complete with {} min of cardio - excellent follow through!",
            shown
        ));
    }

    if completed {
        let remaining = f64::from(target) - cardio_minutes;
        let more = if remaining > 0.0 {
            number_to_display(remaining)
        } else {
            "a few".to_string()
        };
        return Feedback::encourage(format!(
            "Workout done! Add {} more cardio minutes to smash your goal.",
            more
        ));
    }

    Feedback::encourage(format!(
        "Cardio logged at {} min. Pair it with a full workout for even better progress.",
        shown
    ))
}

/// Placeholder board shown while no owner is present
pub fn signed_out_feedback() -> BTreeMap<Category, Feedback> {
    let mut board = BTreeMap::new();
    board.insert(
        Category::Water,
        Feedback::neutral("Log a few days to see hydration feedback."),
    );
    board.insert(
        Category::Diet,
        Feedback::neutral("Log yesterday's meals to get calorie guidance."),
    );
    board.insert(
        Category::Exercise,
        Feedback::neutral("Track workouts to unlock tailored coaching."),
    );
    board.insert(
        Category::Sleep,
        Feedback::neutral("Record sleep to get bedtime coaching."),
    );
    board
}
