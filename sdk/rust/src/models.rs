//! Backend payloads.
//!
//! Unknown fields are ignored; fields the backend does not always send default.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub login_id: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub login_id: String,
    pub password: String,
    pub username: String,
    pub student_id: String,
    pub mbti: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// A club.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub auth_code: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// A sub-group inside a club.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupItem {
    pub id: i64,
    pub team_id: i64,
    pub name: String,
    pub leader_id: i64,
    pub created_at: String,
}

/// Membership of a user in a club.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: i64,
    pub team_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub user_student_id: String,
    pub user_hakbun: i64,
    pub role: String,
}

/// A user as listed under `/groups/{id}/members`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub hakbun: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: i64,
    #[serde(default)]
    pub team_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMission<'a> {
    pub team_id: i64,
    pub title: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissionUpdate<'a> {
    pub title: &'a str,
    pub description: &'a str,
}

/// One row of `/leaderboard/{team_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub group_id: i64,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub points: i64,
}

/// Completion state of one group for a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionGroupStatus {
    pub group_id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

/// Sort a leaderboard by points, highest first.
pub fn rank(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| b.points.cmp(&a.points));
    entries
}
