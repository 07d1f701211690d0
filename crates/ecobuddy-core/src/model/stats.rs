use serde::{Deserialize, Serialize};

/// Points added to the sustainability score per completed challenge.
pub const COMPLETION_SCORE_BONUS: i64 = 5;

/// The user's running gauges. Serialized with camelCase keys so the local
/// mirror keeps the same shape across versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    /// Tons of CO₂ per year.
    pub carbon_footprint: f64,
    /// Liters per day.
    pub water_usage: f64,
    /// Percent.
    pub waste_reduction: f64,
    /// kWh.
    pub energy_saved: f64,
    /// Intended range 0-100; not enforced.
    pub sustainability_score: i64,
    pub completed_challenges: u32,
    pub streak: u32,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            carbon_footprint: 12.5,
            water_usage: 320.0,
            waste_reduction: 15.0,
            energy_saved: 230.0,
            sustainability_score: 65,
            completed_challenges: 0,
            streak: 0,
        }
    }
}

impl UserStats {
    /// Shallow merge: every field present in `patch` overwrites the current value.
    pub fn apply(&mut self, patch: &UserStatsPatch) {
        if let Some(v) = patch.carbon_footprint {
            self.carbon_footprint = v;
        }
        if let Some(v) = patch.water_usage {
            self.water_usage = v;
        }
        if let Some(v) = patch.waste_reduction {
            self.waste_reduction = v;
        }
        if let Some(v) = patch.energy_saved {
            self.energy_saved = v;
        }
        if let Some(v) = patch.sustainability_score {
            self.sustainability_score = v;
        }
        if let Some(v) = patch.completed_challenges {
            self.completed_challenges = v;
        }
        if let Some(v) = patch.streak {
            self.streak = v;
        }
    }

    /// The patch a single challenge completion applies on top of these stats.
    pub fn completion_reward(&self) -> UserStatsPatch {
        UserStatsPatch {
            completed_challenges: Some(self.completed_challenges.saturating_add(1)),
            streak: Some(self.streak.saturating_add(1)),
            sustainability_score: Some(
                self.sustainability_score
                    .saturating_add(COMPLETION_SCORE_BONUS),
            ),
            ..Default::default()
        }
    }
}

/// Partial stats update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbon_footprint: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_usage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste_reduction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_saved: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sustainability_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_challenges: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
}

impl UserStatsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
