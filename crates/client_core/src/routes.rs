//! Client-side route table.

use std::{fmt, str::FromStr};

use shared::domain::{CampaignKind, LeadId, TicketId};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Dashboard,
    Campaigns(Option<CampaignKind>),
    Leads,
    LeadDetail(LeadId),
    Referrals,
    Reports,
    Settings,
    Tickets,
    TicketDetail(TicketId),
}

impl Route {
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let route = match segments.as_slice() {
            [] | ["dashboard"] => Self::Dashboard,
            ["campaigns"] => Self::Campaigns(None),
            ["campaigns", "social"] => Self::Campaigns(Some(CampaignKind::Social)),
            ["campaigns", "email"] => Self::Campaigns(Some(CampaignKind::Email)),
            ["leads"] => Self::Leads,
            ["leads", id] => Self::LeadDetail(LeadId(id.parse().ok()?)),
            ["referrals"] => Self::Referrals,
            ["reports"] => Self::Reports,
            ["settings"] => Self::Settings,
            ["tickets"] => Self::Tickets,
            ["tickets", id] => Self::TicketDetail(TicketId(id.parse().ok()?)),
            _ => return None,
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Self::Dashboard => "/dashboard".to_string(),
            Self::Campaigns(None) => "/campaigns".to_string(),
            Self::Campaigns(Some(kind)) => format!("/campaigns/{kind}"),
            Self::Leads => "/leads".to_string(),
            Self::LeadDetail(id) => format!("/leads/{id}"),
            Self::Referrals => "/referrals".to_string(),
            Self::Reports => "/reports".to_string(),
            Self::Settings => "/settings".to_string(),
            Self::Tickets => "/tickets".to_string(),
            Self::TicketDetail(id) => format!("/tickets/{id}"),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Campaigns(None) => "Campaigns",
            Self::Campaigns(Some(CampaignKind::Social)) => "Social campaigns",
            Self::Campaigns(Some(CampaignKind::Email)) => "Email campaigns",
            Self::Leads => "Leads",
            Self::LeadDetail(_) => "Lead",
            Self::Referrals => "Referrals",
            Self::Reports => "Reports",
            Self::Settings => "Settings",
            Self::Tickets => "Tickets",
            Self::TicketDetail(_) => "Ticket",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no page is mapped to '{0}'")]
pub struct UnknownRoute(pub String);

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownRoute(s.to_string()))
    }
}
