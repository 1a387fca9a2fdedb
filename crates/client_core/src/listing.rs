//! Filtering and pagination over the in-memory record lists.

use serde::Serialize;
use shared::domain::{
    Campaign, CampaignKind, CampaignStatus, EmployeeId, Lead, LeadStatus, ReferralPartner,
};

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based.
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Out-of-range pages clamp to the nearest valid one.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total_items);

    Page {
        items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
        page,
        per_page,
        total_items,
        total_pages,
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn normalized_search(search: &Option<String>) -> Option<&str> {
    search.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub assigned_to: Option<EmployeeId>,
    pub search: Option<String>,
    pub include_inactive: bool,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        if !self.include_inactive && !lead.is_active {
            return false;
        }
        if let Some(status) = self.status {
            if lead.known_status() != Some(status) {
                return false;
            }
        }
        if let Some(assignee) = self.assigned_to {
            if lead.assigned_to != Some(assignee) {
                return false;
            }
        }
        match normalized_search(&self.search) {
            Some(needle) => {
                contains_ignore_case(&lead.name, needle)
                    || lead
                        .email
                        .as_deref()
                        .is_some_and(|email| contains_ignore_case(email, needle))
                    || lead
                        .phone
                        .as_deref()
                        .is_some_and(|phone| phone.contains(needle))
            }
            None => true,
        }
    }

    pub fn apply(&self, leads: &[Lead]) -> Vec<Lead> {
        leads.iter().filter(|l| self.matches(l)).cloned().collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CampaignFilter {
    pub kind: Option<CampaignKind>,
    pub status: Option<CampaignStatus>,
    pub search: Option<String>,
}

impl CampaignFilter {
    pub fn matches(&self, campaign: &Campaign) -> bool {
        self.kind.map_or(true, |kind| campaign.kind == kind)
            && self.status.map_or(true, |status| campaign.status == status)
            && normalized_search(&self.search)
                .map_or(true, |needle| contains_ignore_case(&campaign.name, needle))
    }

    pub fn apply(&self, campaigns: &[Campaign]) -> Vec<Campaign> {
        campaigns
            .iter()
            .filter(|c| self.matches(c))
            .cloned()
            .collect()
    }
}

/// Referral directory search over name and specialty.
pub fn search_referrals(partners: &[ReferralPartner], search: &str) -> Vec<ReferralPartner> {
    let needle = search.trim();
    if needle.is_empty() {
        return partners.to_vec();
    }
    partners
        .iter()
        .filter(|p| {
            contains_ignore_case(&p.name, needle)
                || p.specialty
                    .as_deref()
                    .is_some_and(|s| contains_ignore_case(s, needle))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "tests/listing_tests.rs"]
mod tests;
