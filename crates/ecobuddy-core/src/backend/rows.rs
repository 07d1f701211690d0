//! Wire shapes of the backend tables, with conversions into the domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::*;

/// Display name used for posts whose author row is not joined in.
pub const ANONYMOUS_AUTHOR: &str = "Eco-Buddy member";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcoActionRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub impact_carbon: f64,
    pub impact_water: f64,
    pub impact_waste: f64,
    pub impact_energy: f64,
    pub difficulty: String,
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl EcoActionRow {
    /// Rows with an unknown difficulty or category are skipped by callers.
    pub fn into_action(self) -> Option<EcoAction> {
        let difficulty = self.difficulty.parse().ok()?;
        let category = self.category.parse().ok()?;
        Some(EcoAction {
            id: self.id,
            title: self.title,
            description: self.description,
            impact: Impact {
                carbon: self.impact_carbon,
                water: self.impact_water,
                waste: self.impact_waste,
                energy: self.impact_energy,
            },
            difficulty,
            category,
            image_url: self.image_url,
        })
    }

    pub fn from_action(action: &EcoAction, created_at: DateTime<Utc>) -> Self {
        Self {
            id: action.id.clone(),
            created_at,
            title: action.title.clone(),
            description: action.description.clone(),
            impact_carbon: action.impact.carbon,
            impact_water: action.impact.water,
            impact_waste: action.impact.waste,
            impact_energy: action.impact.energy,
            difficulty: action.difficulty.to_string(),
            category: action.category.to_string(),
            image_url: action.image_url.clone(),
        }
    }
}

/// Convert action rows, dropping (and logging) rows that do not parse.
pub fn actions_from_rows(rows: Vec<EcoActionRow>) -> Vec<EcoAction> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            let action = row.into_action();
            if action.is_none() {
                tracing::warn!(action_id = %id, "skipping eco action with unknown difficulty or category");
            }
            action
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub duration: u32,
    pub points: u32,
    pub category: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<ChallengeRow> for Challenge {
    fn from(row: ChallengeRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            duration: row.duration,
            points: row.points,
            category: row.category,
            steps: row.steps,
            progress: None,
            image_url: row.image_url,
        }
    }
}

impl ChallengeRow {
    pub fn from_challenge(challenge: &Challenge, created_at: DateTime<Utc>) -> Self {
        Self {
            id: challenge.id.clone(),
            created_at,
            title: challenge.title.clone(),
            description: challenge.description.clone(),
            duration: challenge.duration,
            points: challenge.points,
            category: challenge.category.clone(),
            steps: challenge.steps.clone(),
            image_url: challenge.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityPostRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    /// The author's `users` row, embedded by the feed query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<PostAuthor>,
}

/// The `users(name, avatar_url)` columns joined onto a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAuthor {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<CommunityPostRow> for CommunityPost {
    fn from(row: CommunityPostRow) -> Self {
        let (user_name, user_avatar) = match row.users {
            Some(author) => (author.name, author.avatar_url),
            None => (None, None),
        };
        Self {
            id: row.id,
            user_id: row.user_id,
            user_name: user_name.unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
            user_avatar,
            title: row.title,
            content: row.content,
            likes: row.likes,
            comments: row.comments,
            tags: row.tags,
            created_at: row.created_at,
        }
    }
}

/// A `user_challenges` row: one user's participation in one challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserChallengeRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub challenge_id: String,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub completed: bool,
}

impl UserChallengeRow {
    pub fn joined(user_id: &str, challenge_id: &str) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            created_at: Utc::now(),
            user_id: user_id.to_string(),
            challenge_id: challenge_id.to_string(),
            progress: 0,
            completed: false,
        }
    }
}

/// Partial `users` update. Only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sustainability_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_challenges: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
}

impl From<&ProfileEdit> for ProfileUpdate {
    fn from(edit: &ProfileEdit) -> Self {
        Self {
            name: edit.name.clone(),
            bio: edit.bio.clone(),
            location: edit.location.clone(),
            avatar_url: edit.avatar_url.clone(),
            ..Default::default()
        }
    }
}

impl From<&UserStats> for ProfileUpdate {
    fn from(stats: &UserStats) -> Self {
        Self {
            sustainability_score: Some(stats.sustainability_score),
            completed_challenges: Some(stats.completed_challenges),
            streak: Some(stats.streak),
            ..Default::default()
        }
    }
}

/// Progress/completion change on a `user_challenges` row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserChallengeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    #[test]
    fn test_action_row_columns() {
        let action = seed::eco_actions().remove(0);
        let row = EcoActionRow::from_action(&action, Utc::now());
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["impact_carbon"], serde_json::json!(action.impact.carbon));
        assert_eq!(json["difficulty"], "easy");
        assert_eq!(row.into_action().unwrap(), action);
    }

    #[test]
    fn test_action_row_unknown_category_skipped() {
        let action = seed::eco_actions().remove(0);
        let mut row = EcoActionRow::from_action(&action, Utc::now());
        row.category = "space".to_string();
        assert!(actions_from_rows(vec![row]).is_empty());
    }

    #[test]
    fn test_challenge_row_has_no_progress() {
        let mut challenge = seed::challenges().remove(0);
        challenge.progress = Some(40);
        let back: Challenge = ChallengeRow::from_challenge(&challenge, Utc::now()).into();
        assert!(back.progress.is_none());
        assert_eq!(back.steps, challenge.steps);
    }

    #[test]
    fn test_profile_update_from_stats_only_counters() {
        let update = ProfileUpdate::from(&UserStats::default());
        let json = serde_json::to_value(&update).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["sustainability_score"], 65);
        assert!(obj.contains_key("completed_challenges"));
        assert!(obj.contains_key("streak"));
    }

    #[test]
    fn test_post_row_takes_embedded_author() {
        let row: CommunityPostRow = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "created_at": "2024-03-03T10:00:00Z",
            "user_id": "u1",
            "title": "Bulk shopping",
            "content": "Bring your own jars.",
            "users": { "name": "Sarah Johnson", "avatar_url": null }
        }))
        .unwrap();
        let post = CommunityPost::from(row);
        assert_eq!(post.user_name, "Sarah Johnson");
        assert!(post.user_avatar.is_none());
        assert_eq!(post.likes, 0);
    }

    #[test]
    fn test_post_row_without_author_is_anonymous() {
        let row: CommunityPostRow = serde_json::from_value(serde_json::json!({
            "id": "p2",
            "created_at": "2024-03-03T10:00:00Z",
            "user_id": "gone",
            "title": "Orphaned",
            "content": "No author row."
        }))
        .unwrap();
        assert!(row.users.is_none());
        assert_eq!(CommunityPost::from(row).user_name, ANONYMOUS_AUTHOR);
    }
}
