//! Tracked categories and their field schemas
//!
//! Each category owns a stable key, a remote collection name, and a field
//! schema table. The tables are the single source of truth the form layer,
//! the save reconciler, and the summaries all read from.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::schema::{ChoiceOption, FieldDef, FieldKind};
use crate::store::docs::Scalar;

/// A tracked category, one structured entry per calendar day each
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Water,
    Diet,
    Exercise,
    Sleep,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Water,
        Category::Diet,
        Category::Exercise,
        Category::Sleep,
    ];

    /// Stable category key, as stored in entry documents
    pub fn key(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Diet => "diet",
            Self::Exercise => "exercise",
            Self::Sleep => "sleep",
        }
    }

    /// Remote collection holding this category's entries
    pub fn collection(self) -> &'static str {
        match self {
            Self::Water => "waterLogs",
            Self::Diet => "dietLogs",
            Self::Exercise => "exerciseLogs",
            Self::Sleep => "sleepLogs",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Water => "Water Log",
            Self::Diet => "Diet Log",
            Self::Exercise => "Exercise Log",
            Self::Sleep => "Sleep Log",
        }
    }

    /// Field schema for this category's entry form
    pub fn fields(self) -> &'static [FieldDef] {
        match self {
            Self::Water => &WATER_FIELDS,
            Self::Diet => &DIET_FIELDS,
            Self::Exercise => &EXERCISE_FIELDS,
            Self::Sleep => &SLEEP_FIELDS,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// The owner's primary goal, global per owner, read by the feedback rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKey {
    #[default]
    General,
    LoseWeight,
    BuildMuscle,
    SleepBetter,
    HydrateMore,
}

impl GoalKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::LoseWeight => "lose_weight",
            Self::BuildMuscle => "build_muscle",
            Self::SleepBetter => "sleep_better",
            Self::HydrateMore => "hydrate_more",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "general" => Some(Self::General),
            "lose_weight" => Some(Self::LoseWeight),
            "build_muscle" => Some(Self::BuildMuscle),
            "sleep_better" => Some(Self::SleepBetter),
            "hydrate_more" => Some(Self::HydrateMore),
            _ => None,
        }
    }
}

fn count_options(max: u32, singular: &str, plural: &str) -> Vec<ChoiceOption> {
    (0..=max)
        .map(|n| ChoiceOption {
            label: format!("{} {}", n, if n == 1 { singular } else { plural }),
            value: Scalar::Number(f64::from(n)),
        })
        .collect()
}

static WATER_FIELDS: Lazy<Vec<FieldDef>> = Lazy::new(|| {
    vec![FieldDef {
        key: "glasses",
        label: "How many glasses did you drink?",
        kind: FieldKind::Choice {
            options: count_options(16, "glass", "glasses"),
            default: Scalar::Number(0.0),
        },
    }]
});

static DIET_FIELDS: Lazy<Vec<FieldDef>> = Lazy::new(|| {
    vec![FieldDef {
        key: "calories",
        label: "How many calories did you consume?",
        kind: FieldKind::Numeric {
            unit: Some("kcal"),
            placeholder: Some("Enter total calories"),
        },
    }]
});

static EXERCISE_FIELDS: Lazy<Vec<FieldDef>> = Lazy::new(|| {
    vec![
        FieldDef {
            key: "workoutCompleted",
            label: "Workout completed?",
            kind: FieldKind::Boolean {
                true_label: "Completed",
                false_label: "Not yet",
            },
        },
        FieldDef {
            key: "cardioMinutes",
            label: "Minutes of cardio",
            kind: FieldKind::Numeric {
                unit: Some("min"),
                placeholder: Some("0"),
            },
        },
    ]
});

static SLEEP_FIELDS: Lazy<Vec<FieldDef>> = Lazy::new(|| {
    vec![FieldDef {
        key: "hours",
        label: "How many hours did you sleep?",
        kind: FieldKind::Choice {
            options: count_options(12, "hour", "hours"),
            default: Scalar::Number(0.0),
        },
    }]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_keys_and_collections() {
        assert_eq!(Category::Water.collection(), "waterLogs");
        assert_eq!(Category::Sleep.key(), "sleep");
        assert_eq!(Category::from_key("exercise"), Some(Category::Exercise));
        assert_eq!(Category::from_key("steps"), None);
    }

    #[test]
    fn test_category_serde_uses_key() {
        let json = serde_json::to_string(&Category::Diet).expect("encode");
        assert_eq!(json, "\"diet\"");
        let back: Category = serde_json::from_str("\"water\"").expect("decode");
        assert_eq!(back, Category::Water);
    }

    #[test]
    fn test_goal_key_roundtrip() {
        for goal in [
            GoalKey::General,
            GoalKey::LoseWeight,
            GoalKey::BuildMuscle,
            GoalKey::SleepBetter,
            GoalKey::HydrateMore,
        ] {
            assert_eq!(GoalKey::from_key(goal.as_str()), Some(goal));
        }
    }

    #[test]
    fn test_water_options_cover_zero_to_sixteen() {
        let fields = Category::Water.fields();
        assert_eq!(fields.len(), 1);
        match &fields[0].kind {
            FieldKind::Choice { options, default } => {
                assert_eq!(options.len(), 17);
                assert_eq!(options[1].label, "1 glass");
                assert_eq!(options[2].label, "2 glasses");
                assert_eq!(*default, Scalar::Number(0.0));
            }
            other => panic!("expected choice field, got {:?}", other),
        }
    }

    #[test]
    fn test_exercise_has_toggle_and_minutes() {
        let fields = Category::Exercise.fields();
        assert_eq!(fields.len(), 2);
        assert!(matches!(fields[0].kind, FieldKind::Boolean { .. }));
        assert!(matches!(fields[1].kind, FieldKind::Numeric { .. }));
    }
}
