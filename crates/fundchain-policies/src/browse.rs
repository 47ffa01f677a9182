// SPDX-License-Identifier: Apache-2.0

use std::cmp::Ordering;

use fundchain_core::UnixSeconds;
use fundchain_model::{parse_deadline_input, CampaignMetadata, Wei};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowseSort {
    Deadline,
    Target,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseQuery {
    pub text: Option<String>,
    pub active_only: bool,
    pub sort: Option<BrowseSort>,
}

fn matches_text(meta: &CampaignMetadata, needle: &str) -> bool {
    meta.title.to_lowercase().contains(needle) || meta.description.to_lowercase().contains(needle)
}

fn deadline_of(meta: &CampaignMetadata) -> Option<UnixSeconds> {
    parse_deadline_input(&meta.deadline).ok()
}

fn target_of(meta: &CampaignMetadata) -> Option<Wei> {
    Wei::parse_ether(&meta.target).ok()
}

/// Unparseable keys sort after every parseable one.
fn cmp_missing_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Filters and orders backend campaign records. A record whose deadline cannot be read
/// is never considered active.
#[must_use]
pub fn apply_browse(
    campaigns: &[CampaignMetadata],
    query: &BrowseQuery,
    now: UnixSeconds,
) -> Vec<CampaignMetadata> {
    let needle = query
        .text
        .as_deref()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty());

    let mut out = campaigns
        .iter()
        .filter(|m| needle.as_deref().map_or(true, |n| matches_text(m, n)))
        .filter(|m| !query.active_only || deadline_of(m).is_some_and(|d| d > now))
        .cloned()
        .collect::<Vec<_>>();

    match query.sort {
        Some(BrowseSort::Deadline) => {
            out.sort_by(|a, b| cmp_missing_last(deadline_of(a), deadline_of(b)));
        }
        Some(BrowseSort::Target) => {
            out.sort_by(|a, b| cmp_missing_last(target_of(a), target_of(b)));
        }
        None => {}
    }
    out
}
