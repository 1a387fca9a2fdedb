//! Flows that combine backend calls with store dispatches.

use shared::domain::{Campaign, CampaignAction, CampaignId, TicketId, TicketReply};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    api::CrmBackend,
    error::ClientError,
    http::SessionEvent,
    store::{Action, Store},
    wizard::{WizardController, WizardError},
};

/// Fetches everything the dashboard shows. Nothing is dispatched unless
/// every request succeeds.
pub async fn load_dashboard<B>(backend: &B, store: &Store) -> Result<(), ClientError>
where
    B: CrmBackend + ?Sized,
{
    let (campaigns, leads, clinic, history) = futures::try_join!(
        backend.list_campaigns(None),
        backend.list_leads(),
        backend.get_clinic(),
        backend.list_email_history(),
    )?;

    debug!(
        campaigns = campaigns.len(),
        leads = leads.len(),
        "dashboard data loaded"
    );
    store.dispatch(Action::CampaignsLoaded(campaigns));
    store.dispatch(Action::LeadsLoaded(leads));
    store.dispatch(Action::ClinicLoaded(clinic));
    store.dispatch(Action::EmailHistoryLoaded(history));
    Ok(())
}

/// Optimistically applies the new status, then confirms it with the server
/// or restores the previous one. Only the request whose pending entry the
/// store installed reaches the backend.
pub async fn change_campaign_status<B>(
    backend: &B,
    store: &Store,
    campaign_id: CampaignId,
    action: CampaignAction,
) -> Result<Campaign, ClientError>
where
    B: CrmBackend + ?Sized,
{
    let request_id = Uuid::new_v4();
    let state = store.dispatch(Action::CampaignStatusRequested {
        campaign_id,
        action,
        request_id,
    });
    let campaign = state
        .campaign(campaign_id)
        .ok_or(ClientError::UnknownCampaign(campaign_id))?;
    let installed = state
        .pending_status
        .get(&campaign_id)
        .is_some_and(|pending| pending.request_id == request_id);
    if !installed {
        return Err(ClientError::InvalidTransition {
            campaign_id,
            action,
            status: campaign.status,
        });
    }

    match backend.change_campaign_status(campaign_id, action).await {
        Ok(updated) => {
            info!(campaign_id = campaign_id.0, %action, status = ?updated.status, "campaign status changed");
            store.dispatch(Action::CampaignStatusConfirmed {
                campaign: updated.clone(),
                request_id,
            });
            Ok(updated)
        }
        Err(err) => {
            warn!(campaign_id = campaign_id.0, %action, error = %err, "campaign status change rolled back");
            store.dispatch(Action::CampaignStatusFailed {
                campaign_id,
                request_id,
            });
            Err(err)
        }
    }
}

pub async fn submit_wizard<B>(
    backend: &B,
    store: &Store,
    wizard: &mut WizardController,
) -> Result<Campaign, WizardError>
where
    B: CrmBackend + ?Sized,
{
    let campaign = wizard
        .submit(|request, key| async move { backend.create_campaign(&request, key).await })
        .await?;
    store.dispatch(Action::CampaignCreated(campaign.clone()));
    Ok(campaign)
}

pub async fn reply_to_ticket<B>(
    backend: &B,
    store: &Store,
    ticket_id: TicketId,
    body: &str,
) -> Result<TicketReply, ClientError>
where
    B: CrmBackend + ?Sized,
{
    if body.trim().is_empty() {
        return Err(ClientError::Validation("reply must not be empty".into()));
    }
    let reply = backend.reply_to_ticket(ticket_id, body).await?;
    store.dispatch(Action::TicketReplyAppended {
        ticket_id,
        reply: reply.clone(),
    });
    Ok(reply)
}

/// Mirrors session broadcasts into the store until the sender goes away.
pub async fn follow_session(mut events: broadcast::Receiver<SessionEvent>, store: &Store) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::LoggedIn) => {
                store.dispatch(Action::SignedIn);
            }
            Ok(SessionEvent::LoggedOut { reason }) => {
                info!(?reason, "session ended");
                store.dispatch(Action::SignedOut);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "session listener lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
#[path = "tests/orchestration_tests.rs"]
mod tests;
