//! Shared data models and their DynamoDB item encoding.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::item::{Item, ItemBuilder, ItemReader};
use crate::{Error, Result};

/// Sort-key prefixes of user-scoped items.
pub mod sort_key {
    pub const PROFILE: &str = "profile";
    pub const CURRICULUM: &str = "curriculum#";
    pub const TASK: &str = "task#";
    pub const MILESTONE: &str = "milestone#";
    pub const NOTIFICATION: &str = "notification#";
    pub const FAVORITE: &str = "favorite#";
}

/// Partition used for planner calls without a signed-in user.
pub const ANONYMOUS_USER: &str = "anonymous";

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn strip_prefix<'a>(sort_key: &'a str, prefix: &str) -> Result<&'a str> {
    sort_key
        .strip_prefix(prefix)
        .ok_or_else(|| Error::Aws(format!("unexpected sort key `{sort_key}`")))
}

// ============================================================
// CERTIFICATION
// ============================================================

/// A certification in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Field or difficulty level
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub search_keywords: Vec<String>,
    #[serde(default)]
    pub raw_data: Option<serde_json::Value>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Certification {
    pub fn into_item(self) -> Result<Item> {
        let raw = match &self.raw_data {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };
        Ok(ItemBuilder::new()
            .s("id", self.id)
            .s("name", self.name)
            .s("category", self.category)
            .opt_s("level", self.level)
            .s("description", self.description)
            .list("searchKeywords", &self.search_keywords)
            .opt_s("rawData", raw)
            .opt_time("updatedAt", self.updated_at)
            .build())
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        let reader = ItemReader::new(item);
        let raw_data = match reader.opt_str("rawData") {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        };
        Ok(Self {
            id: reader.str("id")?,
            name: reader.str("name")?,
            category: reader.opt_str("category").unwrap_or_default(),
            level: reader.opt_str("level"),
            description: reader.opt_str("description").unwrap_or_default(),
            search_keywords: reader.list("searchKeywords"),
            raw_data,
            updated_at: reader.opt_time("updatedAt"),
        })
    }

    /// Case-insensitive match on name, description and keywords.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self
                .search_keywords
                .iter()
                .any(|keyword| keyword.to_lowercase().contains(&needle))
    }
}

// ============================================================
// USER PROFILE
// ============================================================

/// Profile of a registered user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub job: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, email: Option<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            email,
            name: name.into(),
            interests: Vec::new(),
            major: None,
            job: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_item(self) -> Item {
        ItemBuilder::new()
            .s("userId", self.user_id)
            .s("type", sort_key::PROFILE)
            .opt_s("email", self.email)
            .s("name", self.name)
            .list("interests", &self.interests)
            .opt_s("major", self.major)
            .opt_s("job", self.job)
            .time("createdAt", self.created_at)
            .time("updatedAt", self.updated_at)
            .build()
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        let reader = ItemReader::new(item);
        Ok(Self {
            user_id: reader.str("userId")?,
            email: reader.opt_str("email"),
            name: reader.opt_str("name").unwrap_or_default(),
            interests: reader.list("interests"),
            major: reader.opt_str("major"),
            job: reader.opt_str("job"),
            created_at: reader.time("createdAt")?,
            updated_at: reader.time("updatedAt")?,
        })
    }
}

// ============================================================
// CURRICULUM
// ============================================================

/// Lifecycle of a curriculum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CurriculumStatus {
    /// Created, no tasks yet
    Skeleton,
    Active,
    Inactive,
}

impl fmt::Display for CurriculumStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            CurriculumStatus::Skeleton => "skeleton",
            CurriculumStatus::Active => "active",
            CurriculumStatus::Inactive => "inactive",
        };
        f.write_str(value)
    }
}

impl FromStr for CurriculumStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "skeleton" => Ok(Self::Skeleton),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(Error::Validation(format!(
                "Invalid status `{other}`. Must be one of: skeleton, active, inactive"
            ))),
        }
    }
}

/// A user's study plan for one certification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Curriculum {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub cert_id: String,
    pub status: CurriculumStatus,
    /// Length in weeks
    pub timeframe: u32,
    pub study_hours_per_week: u32,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Generated plan as JSON, kept until applied
    #[serde(skip)]
    pub plan: Option<String>,
}

impl Curriculum {
    pub fn new(
        user_id: impl Into<String>,
        cert_id: impl Into<String>,
        title: impl Into<String>,
        timeframe: u32,
        study_hours_per_week: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            user_id: user_id.into(),
            title: title.into(),
            cert_id: cert_id.into(),
            status: CurriculumStatus::Skeleton,
            timeframe,
            study_hours_per_week,
            description: None,
            created_at: now,
            updated_at: now,
            plan: None,
        }
    }

    pub fn sort_key(id: &str) -> String {
        format!("{}{}", sort_key::CURRICULUM, id)
    }

    pub fn into_item(self) -> Item {
        ItemBuilder::new()
            .s("userId", self.user_id)
            .s("type", Self::sort_key(&self.id))
            .s("title", self.title)
            .s("certId", self.cert_id)
            .s("status", self.status.to_string())
            .n("timeframe", self.timeframe)
            .n("studyHoursPerWeek", self.study_hours_per_week)
            .opt_s("description", self.description)
            .time("createdAt", self.created_at)
            .time("updatedAt", self.updated_at)
            .opt_s("plan", self.plan)
            .build()
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        let reader = ItemReader::new(item);
        let key = reader.str("type")?;
        Ok(Self {
            id: strip_prefix(&key, sort_key::CURRICULUM)?.to_string(),
            user_id: reader.str("userId")?,
            title: reader.opt_str("title").unwrap_or_default(),
            cert_id: reader.str("certId")?,
            status: reader.str("status")?.parse()?,
            timeframe: reader.u32("timeframe")?,
            study_hours_per_week: reader.u32("studyHoursPerWeek")?,
            description: reader.opt_str("description"),
            created_at: reader.time("createdAt")?,
            updated_at: reader.time("updatedAt")?,
            plan: reader.opt_str("plan"),
        })
    }
}

// ============================================================
// TASK
// ============================================================

/// Completion state of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        })
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(Error::Validation(format!(
                "Invalid status `{other}`. Must be one of: pending, completed"
            ))),
        }
    }
}

/// One unit of study work in a curriculum week.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub curriculum_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub week: u32,
    pub status: TaskStatus,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        user_id: impl Into<String>,
        curriculum_id: impl Into<String>,
        title: impl Into<String>,
        week: u32,
        estimated_hours: f64,
    ) -> Self {
        Self {
            id: new_id(),
            user_id: user_id.into(),
            curriculum_id: curriculum_id.into(),
            title: title.into(),
            description: None,
            week,
            status: TaskStatus::Pending,
            estimated_hours,
            actual_hours: 0.0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn sort_key(id: &str) -> String {
        format!("{}{}", sort_key::TASK, id)
    }

    pub fn into_item(self) -> Item {
        ItemBuilder::new()
            .s("userId", self.user_id)
            .s("type", Self::sort_key(&self.id))
            .s("curriculumId", self.curriculum_id)
            .s("title", self.title)
            .opt_s("description", self.description)
            .n("week", self.week)
            .s("status", self.status.to_string())
            .n("estimatedHours", self.estimated_hours)
            .n("actualHours", self.actual_hours)
            .time("createdAt", self.created_at)
            .opt_time("completedAt", self.completed_at)
            .build()
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        let reader = ItemReader::new(item);
        let key = reader.str("type")?;
        Ok(Self {
            id: strip_prefix(&key, sort_key::TASK)?.to_string(),
            user_id: reader.str("userId")?,
            curriculum_id: reader.str("curriculumId")?,
            title: reader.opt_str("title").unwrap_or_default(),
            description: reader.opt_str("description"),
            week: reader.u32("week")?,
            status: reader.str("status")?.parse()?,
            estimated_hours: reader.f64_or("estimatedHours", 0.0),
            actual_hours: reader.f64_or("actualHours", 0.0),
            created_at: reader.time("createdAt")?,
            completed_at: reader.opt_time("completedAt"),
        })
    }
}

// ============================================================
// MILESTONE
// ============================================================

/// A checkpoint inside a curriculum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub user_id: String,
    pub curriculum_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub week: u32,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Milestone {
    pub fn new(
        user_id: impl Into<String>,
        curriculum_id: impl Into<String>,
        title: impl Into<String>,
        week: u32,
    ) -> Self {
        Self {
            id: new_id(),
            user_id: user_id.into(),
            curriculum_id: curriculum_id.into(),
            title: title.into(),
            description: None,
            week,
            completed: false,
            created_at: Utc::now(),
        }
    }

    pub fn sort_key(id: &str) -> String {
        format!("{}{}", sort_key::MILESTONE, id)
    }

    pub fn into_item(self) -> Item {
        ItemBuilder::new()
            .s("userId", self.user_id)
            .s("type", Self::sort_key(&self.id))
            .s("curriculumId", self.curriculum_id)
            .s("title", self.title)
            .opt_s("description", self.description)
            .n("week", self.week)
            .bool("completed", self.completed)
            .time("createdAt", self.created_at)
            .build()
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        let reader = ItemReader::new(item);
        let key = reader.str("type")?;
        Ok(Self {
            id: strip_prefix(&key, sort_key::MILESTONE)?.to_string(),
            user_id: reader.str("userId")?,
            curriculum_id: reader.str("curriculumId")?,
            title: reader.opt_str("title").unwrap_or_default(),
            description: reader.opt_str("description"),
            week: reader.u32("week")?,
            completed: reader.bool_or("completed", false),
            created_at: reader.time("createdAt")?,
        })
    }
}

// ============================================================
// NOTIFICATION
// ============================================================

/// A user-scheduled study reminder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub curriculum_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            user_id: user_id.into(),
            title: title.into(),
            message: message.into(),
            scheduled_at: None,
            curriculum_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn sort_key(id: &str) -> String {
        format!("{}{}", sort_key::NOTIFICATION, id)
    }

    pub fn into_item(self) -> Item {
        ItemBuilder::new()
            .s("userId", self.user_id)
            .s("type", Self::sort_key(&self.id))
            .s("title", self.title)
            .s("message", self.message)
            .opt_time("scheduledAt", self.scheduled_at)
            .opt_s("curriculumId", self.curriculum_id)
            .time("createdAt", self.created_at)
            .build()
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        let reader = ItemReader::new(item);
        let key = reader.str("type")?;
        Ok(Self {
            id: strip_prefix(&key, sort_key::NOTIFICATION)?.to_string(),
            user_id: reader.str("userId")?,
            title: reader.opt_str("title").unwrap_or_default(),
            message: reader.opt_str("message").unwrap_or_default(),
            scheduled_at: reader.opt_time("scheduledAt"),
            curriculum_id: reader.opt_str("curriculumId"),
            created_at: reader.time("createdAt")?,
        })
    }
}

// ============================================================
// FAVORITE
// ============================================================

/// A saved certification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub user_id: String,
    pub cert_id: String,
    pub saved_at: DateTime<Utc>,
}

impl Favorite {
    pub fn new(user_id: impl Into<String>, cert_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            cert_id: cert_id.into(),
            saved_at: Utc::now(),
        }
    }

    pub fn sort_key(cert_id: &str) -> String {
        format!("{}{}", sort_key::FAVORITE, cert_id)
    }

    pub fn into_item(self) -> Item {
        ItemBuilder::new()
            .s("userId", self.user_id)
            .s("type", Self::sort_key(&self.cert_id))
            .s("certId", self.cert_id)
            .time("savedAt", self.saved_at)
            .build()
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        let reader = ItemReader::new(item);
        Ok(Self {
            user_id: reader.str("userId")?,
            cert_id: reader.str("certId")?,
            saved_at: reader.time("savedAt")?,
        })
    }
}

// ============================================================
// LEARNING RESOURCE
// ============================================================

/// Study material linked to a certification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearningResource {
    pub cert_id: String,
    pub resource_id: String,
    pub title: String,
    /// book, video, website, exam, community
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order: u32,
}

impl LearningResource {
    pub fn into_item(self) -> Item {
        ItemBuilder::new()
            .s("certId", self.cert_id)
            .s("resourceId", self.resource_id)
            .s("title", self.title)
            .s("kind", self.kind)
            .opt_s("url", self.url)
            .opt_s("description", self.description)
            .n("order", self.order)
            .build()
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        let reader = ItemReader::new(item);
        Ok(Self {
            cert_id: reader.str("certId")?,
            resource_id: reader.str("resourceId")?,
            title: reader.opt_str("title").unwrap_or_default(),
            kind: reader.opt_str("kind").unwrap_or_else(|| "website".to_string()),
            url: reader.opt_str("url"),
            description: reader.opt_str("description"),
            order: reader.opt_u32("order").unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curriculum_item_keeps_status_and_plan() {
        let mut curriculum = Curriculum::new("user-1", "sqld", "SQLD 학습 계획", 8, 10);
        curriculum.plan = Some(r#"{"totalWeeks":8}"#.to_string());
        let id = curriculum.id.clone();

        let item = curriculum.into_item();
        assert_eq!(item["type"].as_s().unwrap(), &format!("curriculum#{id}"));

        let restored = Curriculum::from_item(&item).unwrap();
        assert_eq!(restored.id, id);
        assert_eq!(restored.status, CurriculumStatus::Skeleton);
        assert_eq!(restored.timeframe, 8);
        assert_eq!(restored.plan.as_deref(), Some(r#"{"totalWeeks":8}"#));
    }

    #[test]
    fn test_plan_not_serialized() {
        let mut curriculum = Curriculum::new("user-1", "sqld", "t", 4, 5);
        curriculum.plan = Some("{}".to_string());
        let value = serde_json::to_value(&curriculum).unwrap();
        assert!(value.get("plan").is_none());
        assert_eq!(value["status"], "skeleton");
        assert_eq!(value["studyHoursPerWeek"], 5);
    }

    #[test]
    fn test_task_from_foreign_sort_key_fails() {
        let mut item = Task::new("u", "c", "t", 1, 1.5).into_item();
        item.insert(
            "type".to_string(),
            aws_sdk_dynamodb::types::AttributeValue::S("milestone#x".into()),
        );
        assert!(Task::from_item(&item).is_err());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("active".parse::<CurriculumStatus>().unwrap(), CurriculumStatus::Active);
        assert!("archived".parse::<CurriculumStatus>().is_err());
        assert_eq!("completed".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
    }

    #[test]
    fn test_certification_matches_keywords() {
        let cert = Certification {
            id: "sqld".into(),
            name: "SQL 개발자".into(),
            category: "데이터".into(),
            level: None,
            description: "데이터베이스 SQL 자격".into(),
            search_keywords: vec!["database".into(), "oracle".into()],
            raw_data: None,
            updated_at: None,
        };
        assert!(cert.matches("Oracle"));
        assert!(cert.matches("sql"));
        assert!(cert.matches(""));
        assert!(!cert.matches("aws"));
    }
}
