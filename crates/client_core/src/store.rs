//! Central client state: immutable snapshots produced by a pure reducer.

use std::{collections::BTreeMap, sync::Arc};

use shared::domain::{
    Campaign, CampaignAction, CampaignId, CampaignStatus, Clinic, EmailHistoryEntry, Lead, Ticket,
    TicketId, TicketReply,
};
use tokio::sync::watch;
use uuid::Uuid;

use crate::metrics::{derive_lead_metrics, LeadMetrics};

/// A status change applied locally and awaiting the server's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingStatusChange {
    /// Identifies the request that installed this entry.
    pub request_id: Uuid,
    pub action: CampaignAction,
    pub previous: CampaignStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignStatusView {
    pub status: CampaignStatus,
    pub pending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub revision: u64,
    pub signed_in: bool,
    pub campaigns: Vec<Campaign>,
    pub leads: Vec<Lead>,
    pub clinic: Option<Clinic>,
    pub email_history: Vec<EmailHistoryEntry>,
    pub tickets: Vec<Ticket>,
    pub pending_status: BTreeMap<CampaignId, PendingStatusChange>,
}

impl AppState {
    pub fn campaign(&self, campaign_id: CampaignId) -> Option<&Campaign> {
        self.campaigns.iter().find(|c| c.id == campaign_id)
    }

    pub fn campaign_status(&self, campaign_id: CampaignId) -> Option<CampaignStatusView> {
        self.campaign(campaign_id).map(|c| CampaignStatusView {
            status: c.status,
            pending: self.pending_status.contains_key(&campaign_id),
        })
    }

    pub fn lead_metrics(&self) -> LeadMetrics {
        derive_lead_metrics(&self.leads)
    }

    pub fn ticket(&self, ticket_id: TicketId) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == ticket_id)
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    SignedIn,
    SignedOut,
    CampaignsLoaded(Vec<Campaign>),
    CampaignCreated(Campaign),
    CampaignRemoved(CampaignId),
    LeadsLoaded(Vec<Lead>),
    ClinicLoaded(Clinic),
    EmailHistoryLoaded(Vec<EmailHistoryEntry>),
    TicketsLoaded(Vec<Ticket>),
    TicketReplyAppended {
        ticket_id: TicketId,
        reply: TicketReply,
    },
    CampaignStatusRequested {
        campaign_id: CampaignId,
        action: CampaignAction,
        request_id: Uuid,
    },
    /// Ignored when a different request owns the pending entry.
    CampaignStatusConfirmed {
        campaign: Campaign,
        request_id: Uuid,
    },
    /// Rolls back only the change installed by `request_id`.
    CampaignStatusFailed {
        campaign_id: CampaignId,
        request_id: Uuid,
    },
}

pub fn reduce(state: &AppState, action: Action) -> AppState {
    let mut next = state.clone();
    next.revision = state.revision + 1;

    match action {
        Action::SignedIn => next.signed_in = true,
        Action::SignedOut => {
            next = AppState {
                revision: next.revision,
                ..AppState::default()
            };
        }
        Action::CampaignsLoaded(campaigns) => {
            // A full refetch is authoritative.
            next.campaigns = campaigns;
            next.pending_status.clear();
        }
        Action::CampaignCreated(campaign) => upsert_campaign(&mut next.campaigns, campaign),
        Action::CampaignRemoved(campaign_id) => {
            next.campaigns.retain(|c| c.id != campaign_id);
            next.pending_status.remove(&campaign_id);
        }
        Action::LeadsLoaded(leads) => next.leads = leads,
        Action::ClinicLoaded(clinic) => next.clinic = Some(clinic),
        Action::EmailHistoryLoaded(history) => next.email_history = history,
        Action::TicketsLoaded(tickets) => next.tickets = tickets,
        Action::TicketReplyAppended { ticket_id, reply } => {
            if let Some(ticket) = next.tickets.iter_mut().find(|t| t.id == ticket_id) {
                ticket.append_reply(reply);
            }
        }
        Action::CampaignStatusRequested {
            campaign_id,
            action,
            request_id,
        } => {
            if next.pending_status.contains_key(&campaign_id) {
                return next;
            }
            if let Some(campaign) = next.campaigns.iter_mut().find(|c| c.id == campaign_id) {
                if action.is_allowed_from(campaign.status) {
                    next.pending_status.insert(
                        campaign_id,
                        PendingStatusChange {
                            request_id,
                            action,
                            previous: campaign.status,
                        },
                    );
                    campaign.status = action.target_status();
                }
            }
        }
        Action::CampaignStatusConfirmed {
            campaign,
            request_id,
        } => match next.pending_status.get(&campaign.id) {
            Some(pending) if pending.request_id != request_id => {}
            Some(_) => {
                next.pending_status.remove(&campaign.id);
                upsert_campaign(&mut next.campaigns, campaign);
            }
            None => upsert_campaign(&mut next.campaigns, campaign),
        },
        Action::CampaignStatusFailed {
            campaign_id,
            request_id,
        } => {
            let owned = next
                .pending_status
                .get(&campaign_id)
                .is_some_and(|pending| pending.request_id == request_id);
            if owned {
                if let Some(pending) = next.pending_status.remove(&campaign_id) {
                    if let Some(campaign) = next.campaigns.iter_mut().find(|c| c.id == campaign_id)
                    {
                        campaign.status = pending.previous;
                    }
                }
            }
        }
    }

    next
}

fn upsert_campaign(campaigns: &mut Vec<Campaign>, campaign: Campaign) {
    match campaigns.iter_mut().find(|c| c.id == campaign.id) {
        Some(existing) => *existing = campaign,
        None => campaigns.push(campaign),
    }
}

/// Holds the current snapshot; subscribers see every dispatched change.
pub struct Store {
    state: watch::Sender<Arc<AppState>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

impl Store {
    pub fn new(initial: AppState) -> Self {
        let (state, _) = watch::channel(Arc::new(initial));
        Self { state }
    }

    pub fn snapshot(&self) -> Arc<AppState> {
        self.state.borrow().clone()
    }

    pub fn dispatch(&self, action: Action) -> Arc<AppState> {
        let mut published = None;
        self.state.send_modify(|current| {
            let next = Arc::new(reduce(current, action));
            published = Some(next.clone());
            *current = next;
        });
        published.unwrap_or_else(|| self.snapshot())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AppState>> {
        self.state.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
