use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estimated savings from adopting an action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Impact {
    /// Tons of CO₂ per year.
    pub carbon: f64,
    /// Liters per day.
    pub water: f64,
    /// Kilograms per week.
    pub waste: f64,
    /// kWh per year.
    pub energy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Medium => write!(f, "medium"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(format!("unknown difficulty: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Home,
    Transport,
    Food,
    Shopping,
    Energy,
}

impl std::fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Home => write!(f, "home"),
            Self::Transport => write!(f, "transport"),
            Self::Food => write!(f, "food"),
            Self::Shopping => write!(f, "shopping"),
            Self::Energy => write!(f, "energy"),
        }
    }
}

impl std::str::FromStr for ActionCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "home" => Ok(Self::Home),
            "transport" => Ok(Self::Transport),
            "food" => Ok(Self::Food),
            "shopping" => Ok(Self::Shopping),
            "energy" => Ok(Self::Energy),
            _ => Err(format!("unknown action category: {s}")),
        }
    }
}

/// A catalog entry describing one sustainable habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcoAction {
    pub id: String,
    pub title: String,
    pub description: String,
    pub impact: Impact,
    pub difficulty: Difficulty,
    pub category: ActionCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcoTip {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A multi-day challenge. `progress` is only set on the user's joined copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Length in days.
    pub duration: u32,
    pub points: u32,
    pub category: String,
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Challenge {
    /// The copy placed into the active set on join.
    pub fn joined(&self) -> Self {
        Self {
            progress: Some(0),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Article,
    Video,
    Infographic,
    Guide,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Article => write!(f, "article"),
            Self::Video => write!(f, "video"),
            Self::Infographic => write!(f, "infographic"),
            Self::Guide => write!(f, "guide"),
        }
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "article" => Ok(Self::Article),
            "video" => Ok(Self::Video),
            "infographic" => Ok(Self::Infographic),
            "guide" => Ok(Self::Guide),
            _ => Err(format!("unknown resource type: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: ResourceKind,
    pub category: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalService {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub address: String,
    pub coordinates: Coordinates,
    /// 0.0-5.0
    pub rating: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl LocalService {
    /// Number of filled stars out of five.
    pub fn full_stars(&self) -> usize {
        self.rating.clamp(0.0, 5.0).floor() as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityPost {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
    pub title: String,
    pub content: String,
    pub likes: u32,
    pub comments: u32,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Reference data the store reads from. Immutable from the views' side.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub actions: Vec<EcoAction>,
    pub tips: Vec<EcoTip>,
    pub challenges: Vec<Challenge>,
}

impl Catalog {
    pub fn challenge(&self, id: &str) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.id == id)
    }
}
