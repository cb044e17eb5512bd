use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Votable item families. Serialized as the route segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    #[serde(rename = "posts")]
    Post,
    #[serde(rename = "answers")]
    Answer,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Post => "post",
            ItemKind::Answer => "answer",
        }
    }

    pub fn route_segment(&self) -> &'static str {
        match self {
            ItemKind::Post => "posts",
            ItemKind::Answer => "answers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub id: Uuid,
}

impl ItemRef {
    pub fn post(id: Uuid) -> Self {
        Self {
            kind: ItemKind::Post,
            id,
        }
    }

    pub fn answer(id: Uuid) -> Self {
        Self {
            kind: ItemKind::Answer,
            id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// Wire encoding: `true` is up.
    pub fn from_flag(is_up: bool) -> Self {
        if is_up {
            VoteDirection::Up
        } else {
            VoteDirection::Down
        }
    }

    pub fn as_flag(&self) -> bool {
        matches!(self, VoteDirection::Up)
    }
}

/// Score and membership attached to a post or answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementAggregate {
    pub score: i64,
    pub upvoted_by: BTreeSet<Uuid>,
    pub downvoted_by: BTreeSet<Uuid>,
}

impl EngagementAggregate {
    /// Asserts the user's membership on the `direction` side and clears the
    /// other side. Casting the same direction twice changes nothing.
    pub fn cast(&mut self, user_id: Uuid, direction: VoteDirection) {
        match direction {
            VoteDirection::Up => {
                self.downvoted_by.remove(&user_id);
                self.upvoted_by.insert(user_id);
            }
            VoteDirection::Down => {
                self.upvoted_by.remove(&user_id);
                self.downvoted_by.insert(user_id);
            }
        }
        self.recount();
    }

    pub fn from_members(upvoted_by: BTreeSet<Uuid>, downvoted_by: BTreeSet<Uuid>) -> Self {
        let mut aggregate = Self {
            score: 0,
            upvoted_by,
            downvoted_by,
        };
        aggregate.recount();
        aggregate
    }

    fn recount(&mut self) {
        self.score = self.upvoted_by.len() as i64 - self.downvoted_by.len() as i64;
    }

    pub fn vote_of(&self, user_id: Uuid) -> Option<VoteDirection> {
        if self.upvoted_by.contains(&user_id) {
            Some(VoteDirection::Up)
        } else if self.downvoted_by.contains(&user_id) {
            Some(VoteDirection::Down)
        } else {
            None
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.upvoted_by.is_disjoint(&self.downvoted_by)
            && self.score == self.upvoted_by.len() as i64 - self.downvoted_by.len() as i64
    }
}

// Vote request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub item_id: Uuid,
    pub direction: bool, // true for upvote, false for downvote
}

// Bookmark response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkState {
    pub post_id: Uuid,
    pub bookmarked: bool,
}
