use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ItemKind, ItemRef, ReportType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Answer,
    Comment,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Answer => "answer",
            ContentKind::Comment => "comment",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Post => "Post",
            ContentKind::Answer => "Answer",
            ContentKind::Comment => "Comment",
        }
    }

    /// Content kind a report points at; `user` reports point at no content.
    pub fn for_report(report_type: ReportType) -> Option<Self> {
        match report_type {
            ReportType::Post => Some(ContentKind::Post),
            ReportType::Answer => Some(ContentKind::Answer),
            ReportType::Comment => Some(ContentKind::Comment),
            ReportType::User => None,
        }
    }
}

impl From<ItemKind> for ContentKind {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Post => ContentKind::Post,
            ItemKind::Answer => ContentKind::Answer,
        }
    }
}

impl FromStr for ContentKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(ContentKind::Post),
            "answer" => Ok(ContentKind::Answer),
            "comment" => Ok(ContentKind::Comment),
            _ => Err(format!("Unknown ContentKind: {}", s)),
        }
    }
}

/// The slice of a post, answer or comment the moderation core needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: Uuid,
    pub kind: ContentKind,
    pub author_id: Uuid,
    /// Answer -> post, comment -> answer, post -> none.
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ContentRecord {
    pub fn post(author_id: Uuid) -> Self {
        Self::new(ContentKind::Post, author_id, None)
    }

    pub fn answer(author_id: Uuid, post_id: Uuid) -> Self {
        Self::new(ContentKind::Answer, author_id, Some(post_id))
    }

    pub fn comment(author_id: Uuid, answer_id: Uuid) -> Self {
        Self::new(ContentKind::Comment, author_id, Some(answer_id))
    }

    fn new(kind: ContentKind, author_id: Uuid, parent_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            author_id,
            parent_id,
            created_at: Utc::now(),
        }
    }

    pub fn item_ref(&self) -> Option<ItemRef> {
        match self.kind {
            ContentKind::Post => Some(ItemRef::post(self.id)),
            ContentKind::Answer => Some(ItemRef::answer(self.id)),
            ContentKind::Comment => None,
        }
    }
}
