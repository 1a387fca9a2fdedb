//! Typed calls for every backend resource the dashboard uses.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use shared::{
    domain::{
        Campaign, CampaignAction, CampaignId, CampaignKind, Clinic, EmailHistoryEntry,
        EmailTemplate, Employee, Integration, Lead, LeadId, NextAction, NextActionId, Note,
        NoteId, Platform, ReferralPartner, Ticket, TicketDocument, TicketId, TicketReply,
        TicketStatus,
    },
    protocol::{
        CampaignStatusRequest, CreateCampaignRequest, CreateTicketRequest, DocumentUploadRequest,
        IntegrationConnectRequest, LoginRequest, LoginResponse, NextActionRequest, NoteRequest,
        TicketReplyRequest, TicketStatusRequest, UpdateClinicRequest,
    },
};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::ClientError,
    http::{ApiClient, LogoutReason, SessionEvent},
};

pub type ApiResult<T> = Result<T, ClientError>;

#[derive(Debug, Serialize)]
struct KindQuery {
    kind: CampaignKind,
}

#[derive(Debug, Serialize)]
struct SearchQuery<'a> {
    search: &'a str,
}

#[async_trait]
pub trait CrmBackend: Send + Sync {
    async fn list_campaigns(&self, kind: Option<CampaignKind>) -> ApiResult<Vec<Campaign>>;
    async fn create_campaign(
        &self,
        request: &CreateCampaignRequest,
        idempotency_key: Uuid,
    ) -> ApiResult<Campaign>;
    async fn change_campaign_status(
        &self,
        campaign_id: CampaignId,
        action: CampaignAction,
    ) -> ApiResult<Campaign>;
    async fn list_leads(&self) -> ApiResult<Vec<Lead>>;
    async fn get_clinic(&self) -> ApiResult<Clinic>;
    async fn list_email_history(&self) -> ApiResult<Vec<EmailHistoryEntry>>;
    async fn reply_to_ticket(&self, ticket_id: TicketId, body: &str) -> ApiResult<TicketReply>;
}

#[derive(Clone)]
pub struct CrmApi {
    client: ApiClient,
}

impl CrmApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let response: LoginResponse = self
            .client
            .post(
                "auth/login/",
                &LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                },
            )
            .await?;
        self.client.storage().set_token(&response.token)?;
        self.client.notify_session(SessionEvent::LoggedIn);
        info!(email, "signed in");
        Ok(response)
    }

    pub fn logout(&self) -> ApiResult<()> {
        self.client.storage().clear_token()?;
        self.client.notify_session(SessionEvent::LoggedOut {
            reason: LogoutReason::UserRequested,
        });
        Ok(())
    }

    pub async fn get_campaign(&self, campaign_id: CampaignId) -> ApiResult<Campaign> {
        self.client
            .get(&format!("campaigns/{campaign_id}/"))
            .await
    }

    pub async fn delete_campaign(&self, campaign_id: CampaignId) -> ApiResult<()> {
        self.client
            .delete(&format!("campaigns/{campaign_id}/"))
            .await
    }

    pub async fn get_lead(&self, lead_id: LeadId) -> ApiResult<Lead> {
        self.client.get(&format!("leads/{lead_id}/")).await
    }

    pub async fn list_notes(&self, lead_id: LeadId) -> ApiResult<Vec<Note>> {
        self.client.get(&format!("leads/{lead_id}/notes/")).await
    }

    pub async fn create_note(&self, lead_id: LeadId, body: &str) -> ApiResult<Note> {
        self.client
            .post(
                &format!("leads/{lead_id}/notes/"),
                &NoteRequest {
                    body: body.to_string(),
                },
            )
            .await
    }

    pub async fn update_note(&self, note_id: NoteId, body: &str) -> ApiResult<Note> {
        self.client
            .put(
                &format!("notes/{note_id}/"),
                &NoteRequest {
                    body: body.to_string(),
                },
            )
            .await
    }

    pub async fn delete_note(&self, note_id: NoteId) -> ApiResult<()> {
        self.client.delete(&format!("notes/{note_id}/")).await
    }

    pub async fn list_next_actions(&self, lead_id: LeadId) -> ApiResult<Vec<NextAction>> {
        self.client.get(&format!("leads/{lead_id}/actions/")).await
    }

    pub async fn create_next_action(
        &self,
        lead_id: LeadId,
        request: &NextActionRequest,
    ) -> ApiResult<NextAction> {
        self.client
            .post(&format!("leads/{lead_id}/actions/"), request)
            .await
    }

    pub async fn update_next_action(
        &self,
        action_id: NextActionId,
        request: &NextActionRequest,
    ) -> ApiResult<NextAction> {
        self.client
            .put(&format!("actions/{action_id}/"), request)
            .await
    }

    pub async fn delete_next_action(&self, action_id: NextActionId) -> ApiResult<()> {
        self.client.delete(&format!("actions/{action_id}/")).await
    }

    pub async fn list_tickets(&self) -> ApiResult<Vec<Ticket>> {
        self.client.get("tickets/").await
    }

    pub async fn get_ticket(&self, ticket_id: TicketId) -> ApiResult<Ticket> {
        self.client.get(&format!("tickets/{ticket_id}/")).await
    }

    pub async fn create_ticket(&self, request: &CreateTicketRequest) -> ApiResult<Ticket> {
        self.client.post("tickets/", request).await
    }

    pub async fn set_ticket_status(
        &self,
        ticket_id: TicketId,
        status: TicketStatus,
    ) -> ApiResult<Ticket> {
        self.client
            .patch(
                &format!("tickets/{ticket_id}/status/"),
                &TicketStatusRequest { status },
            )
            .await
    }

    pub async fn upload_ticket_document(
        &self,
        ticket_id: TicketId,
        filename: &str,
        mime_type: Option<&str>,
        content: &[u8],
    ) -> ApiResult<TicketDocument> {
        if filename.trim().is_empty() {
            return Err(ClientError::Validation(
                "document filename must not be empty".into(),
            ));
        }
        self.client
            .post(
                &format!("tickets/{ticket_id}/documents/"),
                &DocumentUploadRequest {
                    filename: filename.to_string(),
                    mime_type: mime_type.map(str::to_string),
                    content_b64: STANDARD.encode(content),
                },
            )
            .await
    }

    pub async fn update_clinic(&self, request: &UpdateClinicRequest) -> ApiResult<Clinic> {
        self.client.patch("clinic/", request).await
    }

    pub async fn list_employees(&self) -> ApiResult<Vec<Employee>> {
        self.client.get("employees/").await
    }

    pub async fn list_integrations(&self) -> ApiResult<Vec<Integration>> {
        self.client.get("integrations/").await
    }

    /// Fetches the backend's integration list and stores each flag under its
    /// `<platform>Connected` key. Providers missing from the list keep their
    /// local value.
    pub async fn sync_integrations(&self) -> ApiResult<Vec<Integration>> {
        let integrations = self.list_integrations().await?;
        for integration in &integrations {
            self.client
                .storage()
                .set_integration_connected(integration.provider, integration.connected)?;
        }
        Ok(integrations)
    }

    /// Updates the backend and mirrors the flag into local storage.
    pub async fn set_integration_connected(
        &self,
        provider: Platform,
        connected: bool,
    ) -> ApiResult<Integration> {
        let integration: Integration = self
            .client
            .put(
                &format!("integrations/{provider}/"),
                &IntegrationConnectRequest { connected },
            )
            .await?;
        self.client
            .storage()
            .set_integration_connected(provider, integration.connected)?;
        Ok(integration)
    }

    pub async fn list_email_templates(&self) -> ApiResult<Vec<EmailTemplate>> {
        self.client.get("templates/email/").await
    }

    pub async fn list_referrals(&self, search: Option<&str>) -> ApiResult<Vec<ReferralPartner>> {
        match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(search) => {
                self.client
                    .get_with_query("referrals/", &SearchQuery { search })
                    .await
            }
            None => self.client.get("referrals/").await,
        }
    }
}

#[async_trait]
impl CrmBackend for CrmApi {
    async fn list_campaigns(&self, kind: Option<CampaignKind>) -> ApiResult<Vec<Campaign>> {
        match kind {
            Some(kind) => {
                self.client
                    .get_with_query("campaigns/", &KindQuery { kind })
                    .await
            }
            None => self.client.get("campaigns/").await,
        }
    }

    async fn create_campaign(
        &self,
        request: &CreateCampaignRequest,
        idempotency_key: Uuid,
    ) -> ApiResult<Campaign> {
        self.client
            .post_idempotent("campaigns/", request, idempotency_key)
            .await
    }

    async fn change_campaign_status(
        &self,
        campaign_id: CampaignId,
        action: CampaignAction,
    ) -> ApiResult<Campaign> {
        self.client
            .post(
                &format!("campaigns/{campaign_id}/status/"),
                &CampaignStatusRequest { action },
            )
            .await
    }

    async fn list_leads(&self) -> ApiResult<Vec<Lead>> {
        self.client.get("leads/").await
    }

    async fn get_clinic(&self) -> ApiResult<Clinic> {
        self.client.get("clinic/").await
    }

    async fn list_email_history(&self) -> ApiResult<Vec<EmailHistoryEntry>> {
        self.client.get("campaigns/email/history/").await
    }

    async fn reply_to_ticket(&self, ticket_id: TicketId, body: &str) -> ApiResult<TicketReply> {
        self.client
            .post(
                &format!("tickets/{ticket_id}/replies/"),
                &TicketReplyRequest {
                    body: body.to_string(),
                },
            )
            .await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
