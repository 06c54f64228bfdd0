use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// New types for compile-time safety
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(pub String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(pub String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A post after normalization. Built only by the API client, which collapses
/// the legacy `image` field into `images`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub is_public: bool,
    pub author_username: String,
    pub author_email: Option<String>,
    pub created_at: Option<String>,
}

/// Body sent when creating or updating a post.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub is_public: bool,
}

impl Default for PostDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            images: Vec::new(),
            is_public: true,
        }
    }
}

impl From<&Post> for PostDraft {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            content: post.content.clone(),
            images: post.images.clone(),
            is_public: post.is_public,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    #[serde(default)]
    pub post_id: PostId,
    #[serde(rename = "username", default)]
    pub author_username: String,
    pub comment: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LikeState {
    pub like_count: u64,
    pub liked_by_viewer: bool,
}

/// A feed entry: the post with its like and comment aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct PostView {
    pub post: Post,
    pub likes: LikeState,
    pub comments: Vec<Comment>,
}

impl PostView {
    pub fn id(&self) -> &PostId {
        &self.post.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub topic: String,
    pub resources: String,
    pub timeline: String,
}

impl PlanStep {
    pub fn new(
        topic: impl Into<String>,
        resources: impl Into<String>,
        timeline: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            resources: resources.into(),
            timeline: timeline.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        [&self.topic, &self.resources, &self.timeline]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPlan {
    pub id: PlanId,
    pub title: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub skills: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressBand {
    Low,
    Medium,
    High,
}

impl LearningPlan {
    /// Progress in percent, clamped to 0..=100.
    pub fn progress(&self) -> u8 {
        self.progress.unwrap_or(0).min(100) as u8
    }

    pub fn progress_band(&self) -> ProgressBand {
        match self.progress() {
            p if p < 30 => ProgressBand::Low,
            p if p < 70 => ProgressBand::Medium,
            _ => ProgressBand::High,
        }
    }

    pub fn skill_tags(&self) -> Vec<&str> {
        self.skills
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .collect()
    }

    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or("General")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Human-readable age of a server timestamp, e.g. "3 hours ago".
///
/// Accepts RFC 3339 and zone-less ISO timestamps (treated as UTC).
pub fn time_ago(timestamp: &str, now: DateTime<Utc>) -> Option<String> {
    let at = DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc())
        })
        .ok()?;

    let elapsed = now.signed_duration_since(at);
    let text = if elapsed.num_minutes() < 1 {
        "just now".to_string()
    } else if elapsed.num_hours() < 1 {
        plural(elapsed.num_minutes(), "minute")
    } else if elapsed.num_days() < 1 {
        plural(elapsed.num_hours(), "hour")
    } else if elapsed.num_days() < 30 {
        plural(elapsed.num_days(), "day")
    } else if elapsed.num_days() < 365 {
        plural(elapsed.num_days() / 30, "month")
    } else {
        plural(elapsed.num_days() / 365, "year")
    };
    Some(text)
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}
