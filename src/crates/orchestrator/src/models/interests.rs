//! Learner interest topics
//!
//! Topics are owned by the client. The server receives the current list with
//! each request and hands back a full replacement; nothing is stored here.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::request::null_as_default;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestTopic {
    /// Slug-like stable identifier
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub urls: Vec<String>,
}

/// Body of `POST /api/interests/from-usage`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterestFromUsageRequest {
    pub word: String,
    pub context: String,
    #[serde(default)]
    pub page_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub existing_topics: Vec<InterestTopic>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub blocked_titles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestFromUsageResponse {
    pub topics: Vec<InterestTopic>,
}

/// Case and whitespace insensitive set of blocked topic titles.
#[derive(Debug, Clone, Default)]
pub struct BlockList {
    titles: HashSet<String>,
}

impl BlockList {
    pub fn new<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            titles: titles
                .into_iter()
                .map(|t| normalize_title(t.as_ref()))
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn is_blocked(&self, title: &str) -> bool {
        self.titles.contains(&normalize_title(title))
    }

    /// Drop every topic whose title is blocked.
    pub fn retain_allowed(&self, topics: Vec<InterestTopic>) -> Vec<InterestTopic> {
        topics
            .into_iter()
            .filter(|topic| !self.is_blocked(&topic.title))
            .collect()
    }
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}
