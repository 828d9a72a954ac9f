//! Publishing state of an article
//!
//! Every article has at most one [`PublishingState`]. The state is a plain
//! label: any value may be written at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PublishState {
    Draft,
    #[serde(rename = "Ready To Approve")]
    ReadyToApprove,
    Published,
}

impl PublishState {
    pub const ALL: [PublishState; 3] = [
        PublishState::Draft,
        PublishState::ReadyToApprove,
        PublishState::Published,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PublishState::Draft => "Draft",
            PublishState::ReadyToApprove => "Ready To Approve",
            PublishState::Published => "Published",
        }
    }
}

impl FromStr for PublishState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PublishState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("Unknown publish state: {}", s))
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

text_column!(PublishState);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublishingState {
    pub id: i64,
    pub content_id: i64,
    pub publish_state: Option<PublishState>,
    pub unpublishing_on: Option<DateTime<Utc>>,
    pub do_not_publish_until: Option<DateTime<Utc>>,
    pub not_for_external_use: bool,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl PublishingState {
    /// Published, past any embargo and not yet withdrawn at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.publish_state == Some(PublishState::Published)
            && self.do_not_publish_until.map_or(true, |from| now >= from)
            && self.unpublishing_on.map_or(true, |until| now < until)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishingStateInput {
    pub publish_state: Option<PublishState>,
    pub unpublishing_on: Option<DateTime<Utc>>,
    pub do_not_publish_until: Option<DateTime<Utc>>,
    pub not_for_external_use: bool,
}
