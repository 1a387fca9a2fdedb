//! Dashboard KPI counts derived from the in-memory lead list.

use std::collections::BTreeMap;

use serde::Serialize;
use shared::domain::{Lead, LeadStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricName {
    TotalLeads,
    NewLeads,
    Appointments,
    FollowUps,
    Converted,
    CycleConversions,
    LostLeads,
}

impl MetricName {
    pub const ALL: [MetricName; 7] = [
        MetricName::TotalLeads,
        MetricName::NewLeads,
        MetricName::Appointments,
        MetricName::FollowUps,
        MetricName::Converted,
        MetricName::CycleConversions,
        MetricName::LostLeads,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TotalLeads => "totalLeads",
            Self::NewLeads => "newLeads",
            Self::Appointments => "appointments",
            Self::FollowUps => "followUps",
            Self::Converted => "converted",
            Self::CycleConversions => "cycleConversions",
            Self::LostLeads => "lostLeads",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadMetrics {
    pub total_leads: u32,
    pub new_leads: u32,
    pub appointments: u32,
    pub follow_ups: u32,
    pub converted: u32,
    pub cycle_conversions: u32,
    pub lost_leads: u32,
}

impl LeadMetrics {
    pub fn get(&self, name: MetricName) -> u32 {
        match name {
            MetricName::TotalLeads => self.total_leads,
            MetricName::NewLeads => self.new_leads,
            MetricName::Appointments => self.appointments,
            MetricName::FollowUps => self.follow_ups,
            MetricName::Converted => self.converted,
            MetricName::CycleConversions => self.cycle_conversions,
            MetricName::LostLeads => self.lost_leads,
        }
    }

    pub fn to_map(&self) -> BTreeMap<MetricName, u32> {
        MetricName::ALL
            .into_iter()
            .map(|name| (name, self.get(name)))
            .collect()
    }

    /// Share of active leads that converted, in percent.
    pub fn conversion_rate(&self) -> f64 {
        if self.total_leads == 0 {
            return 0.0;
        }
        f64::from(self.converted) * 100.0 / f64::from(self.total_leads)
    }
}

/// Inactive leads are skipped. Statuses outside the vocabulary count toward
/// the total only.
pub fn derive_lead_metrics(leads: &[Lead]) -> LeadMetrics {
    let mut metrics = LeadMetrics::default();
    for lead in leads.iter().filter(|lead| lead.is_active) {
        metrics.total_leads += 1;
        match lead.known_status() {
            Some(LeadStatus::New) => metrics.new_leads += 1,
            Some(LeadStatus::Appointment) => metrics.appointments += 1,
            Some(LeadStatus::FollowUps) => metrics.follow_ups += 1,
            Some(LeadStatus::Converted) => metrics.converted += 1,
            Some(LeadStatus::CycleConversion) => metrics.cycle_conversions += 1,
            Some(LeadStatus::Lost) => metrics.lost_leads += 1,
            None => {}
        }
    }
    metrics
}

#[cfg(test)]
#[path = "tests/metrics_tests.rs"]
mod tests;
