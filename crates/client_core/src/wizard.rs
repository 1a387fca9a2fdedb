//! Campaign-creation wizard: Details, then Content, then Schedule.
//!
//! Forward navigation is gated on the current step's required fields being
//! non-empty. Going back never re-validates later steps; they are checked
//! again only when the user advances through them.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    future::Future,
};

use chrono::{DateTime, NaiveDate, Utc};
use shared::{
    domain::{Campaign, CampaignId, CampaignKind, Platform, TemplateId},
    protocol::{CampaignContent, CreateCampaignRequest, ScheduleMode},
};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WizardStep {
    Details,
    Content,
    Schedule,
}

impl WizardStep {
    pub const ALL: [WizardStep; 3] = [WizardStep::Details, WizardStep::Content, WizardStep::Schedule];

    pub fn index(self) -> usize {
        match self {
            Self::Details => 0,
            Self::Content => 1,
            Self::Schedule => 2,
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).map(|idx| Self::ALL[idx])
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Details => "details",
            Self::Content => "content",
            Self::Schedule => "schedule",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CampaignField {
    Name,
    Objective,
    Audience,
    StartDate,
    EndDate,
    Platforms,
    Mode,
    Subject,
    Template,
    ScheduleMode,
    ScheduledAt,
}

impl CampaignField {
    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Campaign name",
            Self::Objective => "Objective",
            Self::Audience => "Audience",
            Self::StartDate => "Start date",
            Self::EndDate => "End date",
            Self::Platforms => "Platforms",
            Self::Mode => "Mode",
            Self::Subject => "Subject",
            Self::Template => "Template",
            Self::ScheduleMode => "Schedule",
            Self::ScheduledAt => "Send time",
        }
    }
}

impl fmt::Display for CampaignField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Many(Vec<String>),
}

impl FieldValue {
    pub fn is_filled(&self) -> bool {
        match self {
            Self::Text(text) => !text.trim().is_empty(),
            Self::Many(values) => values.iter().any(|v| !v.trim().is_empty()),
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(text) => text.trim(),
            Self::Many(_) => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Advanced(WizardStep),
    Blocked { missing: Vec<CampaignField> },
    AtEnd,
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("submit is only available on the last step (currently on {step})")]
    NotAtTerminalStep { step: WizardStep },
    #[error("missing required fields: {}", join_fields(.missing))]
    Incomplete { missing: Vec<CampaignField> },
    #[error("{field}: {reason}")]
    InvalidField {
        field: CampaignField,
        reason: String,
    },
    #[error("campaign submission already in flight")]
    AlreadySubmitting,
    #[error("campaign {0} was already created from this wizard")]
    AlreadySubmitted(CampaignId),
    #[error("failed to save campaign: {0}")]
    Save(#[source] ClientError),
}

fn join_fields(fields: &[CampaignField]) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    InFlight,
    Completed(CampaignId),
}

#[derive(Debug, Clone)]
pub struct WizardController {
    kind: CampaignKind,
    step: WizardStep,
    fields: BTreeMap<CampaignField, FieldValue>,
    touched: BTreeSet<CampaignField>,
    step_submitted: bool,
    submission: SubmissionState,
    idempotency_key: Uuid,
    last_error: Option<String>,
}

impl WizardController {
    pub fn new(kind: CampaignKind) -> Self {
        Self {
            kind,
            step: WizardStep::Details,
            fields: BTreeMap::new(),
            touched: BTreeSet::new(),
            step_submitted: false,
            submission: SubmissionState::Idle,
            idempotency_key: Uuid::new_v4(),
            last_error: None,
        }
    }

    pub fn kind(&self) -> CampaignKind {
        self.kind
    }

    pub fn current_step(&self) -> WizardStep {
        self.step
    }

    pub fn step_submitted(&self) -> bool {
        self.step_submitted
    }

    pub fn submission(&self) -> SubmissionState {
        self.submission
    }

    pub fn idempotency_key(&self) -> Uuid {
        self.idempotency_key
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn value(&self, field: CampaignField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn set_text(&mut self, field: CampaignField, value: impl Into<String>) {
        self.fields.insert(field, FieldValue::Text(value.into()));
    }

    pub fn set_platforms(&mut self, platforms: &[Platform]) {
        let values = platforms.iter().map(|p| p.as_str().to_string()).collect();
        self.fields
            .insert(CampaignField::Platforms, FieldValue::Many(values));
    }

    pub fn toggle_platform(&mut self, platform: Platform) {
        let mut selected = self.selected_platforms();
        match selected.iter().position(|p| *p == platform) {
            Some(idx) => {
                selected.remove(idx);
            }
            None => selected.push(platform),
        }
        self.set_platforms(&selected);
    }

    pub fn selected_platforms(&self) -> Vec<Platform> {
        match self.fields.get(&CampaignField::Platforms) {
            Some(FieldValue::Many(values)) => {
                values.iter().filter_map(|v| Platform::parse(v)).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn set_schedule_mode(&mut self, mode: ScheduleMode) {
        let raw = match mode {
            ScheduleMode::Now => "now",
            ScheduleMode::Later => "later",
        };
        self.set_text(CampaignField::ScheduleMode, raw);
    }

    pub fn touch(&mut self, field: CampaignField) {
        self.touched.insert(field);
    }

    pub fn is_touched(&self, field: CampaignField) -> bool {
        self.touched.contains(&field)
    }

    fn is_filled(&self, field: CampaignField) -> bool {
        self.fields.get(&field).is_some_and(FieldValue::is_filled)
    }

    fn text(&self, field: CampaignField) -> &str {
        self.fields.get(&field).map(FieldValue::as_text).unwrap_or("")
    }

    pub fn required_fields(&self, step: WizardStep) -> Vec<CampaignField> {
        use CampaignField::*;
        match (step, self.kind) {
            (WizardStep::Details, _) => vec![Name, Objective, Audience, StartDate, EndDate],
            (WizardStep::Content, CampaignKind::Social) => vec![Platforms, Mode],
            (WizardStep::Content, CampaignKind::Email) => vec![Subject, Template],
            (WizardStep::Schedule, _) => {
                let mode = CampaignField::ScheduleMode;
                if self.text(mode).eq_ignore_ascii_case("later") {
                    vec![mode, ScheduledAt]
                } else {
                    vec![mode]
                }
            }
        }
    }

    pub fn missing_fields(&self, step: WizardStep) -> Vec<CampaignField> {
        self.required_fields(step)
            .into_iter()
            .filter(|field| !self.is_filled(*field))
            .collect()
    }

    /// Inline error text for a touched, required, empty field.
    pub fn field_error(&self, field: CampaignField) -> Option<String> {
        if !self.is_touched(field) || self.is_filled(field) {
            return None;
        }
        let required = WizardStep::ALL
            .into_iter()
            .any(|step| self.required_fields(step).contains(&field));
        required.then(|| match field {
            CampaignField::Platforms => "Select at least one platform".to_string(),
            other => format!("{} is required", other.label()),
        })
    }

    pub fn advance(&mut self) -> AdvanceOutcome {
        let Some(next) = self.step.next() else {
            return AdvanceOutcome::AtEnd;
        };

        let missing = self.missing_fields(self.step);
        if !missing.is_empty() {
            self.touched.extend(self.required_fields(self.step));
            self.step_submitted = true;
            return AdvanceOutcome::Blocked { missing };
        }

        self.step = next;
        self.step_submitted = false;
        AdvanceOutcome::Advanced(next)
    }

    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
            self.step_submitted = false;
        }
        self.step
    }

    /// Validates the terminal step and marks the submission in flight.
    pub fn begin_submit(&mut self) -> Result<CreateCampaignRequest, WizardError> {
        if !self.step.is_terminal() {
            return Err(WizardError::NotAtTerminalStep { step: self.step });
        }
        match self.submission {
            SubmissionState::InFlight => return Err(WizardError::AlreadySubmitting),
            SubmissionState::Completed(id) => return Err(WizardError::AlreadySubmitted(id)),
            SubmissionState::Idle => {}
        }

        let missing = self.missing_fields(self.step);
        if !missing.is_empty() {
            self.touched.extend(self.required_fields(self.step));
            self.step_submitted = true;
            return Err(WizardError::Incomplete { missing });
        }

        let request = match self.build_request() {
            Ok(request) => request,
            Err(err) => {
                if let WizardError::InvalidField { field, .. } = &err {
                    self.touched.insert(*field);
                }
                self.last_error = Some(err.to_string());
                return Err(err);
            }
        };

        self.submission = SubmissionState::InFlight;
        self.last_error = None;
        Ok(request)
    }

    pub fn finish_submit(
        &mut self,
        result: Result<Campaign, ClientError>,
    ) -> Result<Campaign, WizardError> {
        match result {
            Ok(campaign) => {
                info!(campaign_id = campaign.id.0, kind = %self.kind, "campaign created");
                self.submission = SubmissionState::Completed(campaign.id);
                self.step_submitted = false;
                Ok(campaign)
            }
            Err(err) => {
                error!(error = %err, kind = %self.kind, "campaign submission failed");
                self.submission = SubmissionState::Idle;
                self.last_error = Some(err.user_message());
                Err(WizardError::Save(err))
            }
        }
    }

    pub async fn submit<F, Fut>(&mut self, save: F) -> Result<Campaign, WizardError>
    where
        F: FnOnce(CreateCampaignRequest, Uuid) -> Fut,
        Fut: Future<Output = Result<Campaign, ClientError>>,
    {
        let request = self.begin_submit()?;
        let result = save(request, self.idempotency_key).await;
        self.finish_submit(result)
    }

    fn build_request(&self) -> Result<CreateCampaignRequest, WizardError> {
        let start_date = parse_date(CampaignField::StartDate, self.text(CampaignField::StartDate))?;
        let end_date = parse_date(CampaignField::EndDate, self.text(CampaignField::EndDate))?;
        if end_date < start_date {
            return Err(WizardError::InvalidField {
                field: CampaignField::EndDate,
                reason: "must not be before the start date".into(),
            });
        }

        let content = match self.kind {
            CampaignKind::Social => CampaignContent::Social {
                platforms: self.parse_platforms()?,
                mode: self.text(CampaignField::Mode).to_string(),
            },
            CampaignKind::Email => CampaignContent::Email {
                subject: self.text(CampaignField::Subject).to_string(),
                template_id: self
                    .text(CampaignField::Template)
                    .parse::<i64>()
                    .map(TemplateId)
                    .map_err(|_| WizardError::InvalidField {
                        field: CampaignField::Template,
                        reason: "select a template from the list".into(),
                    })?,
            },
        };

        let schedule_raw = self.text(CampaignField::ScheduleMode).to_ascii_lowercase();
        let schedule_mode = match schedule_raw.as_str() {
            "now" => ScheduleMode::Now,
            "later" => ScheduleMode::Later,
            other => {
                return Err(WizardError::InvalidField {
                    field: CampaignField::ScheduleMode,
                    reason: format!("unknown schedule option '{other}'"),
                })
            }
        };
        let scheduled_at = match schedule_mode {
            ScheduleMode::Now => None,
            ScheduleMode::Later => Some(parse_timestamp(self.text(CampaignField::ScheduledAt))?),
        };

        Ok(CreateCampaignRequest {
            name: self.text(CampaignField::Name).to_string(),
            objective: self.text(CampaignField::Objective).to_string(),
            audience: self.text(CampaignField::Audience).to_string(),
            start_date,
            end_date,
            content,
            schedule_mode,
            scheduled_at,
        })
    }

    fn parse_platforms(&self) -> Result<Vec<Platform>, WizardError> {
        let Some(FieldValue::Many(values)) = self.fields.get(&CampaignField::Platforms) else {
            return Err(WizardError::Incomplete {
                missing: vec![CampaignField::Platforms],
            });
        };
        let mut platforms = Vec::new();
        for raw in values.iter().filter(|v| !v.trim().is_empty()) {
            let platform = Platform::parse(raw).ok_or_else(|| WizardError::InvalidField {
                field: CampaignField::Platforms,
                reason: format!("unsupported platform '{raw}'"),
            })?;
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        Ok(platforms)
    }
}

fn parse_date(field: CampaignField, raw: &str) -> Result<NaiveDate, WizardError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| WizardError::InvalidField {
        field,
        reason: format!("'{raw}' is not a YYYY-MM-DD date"),
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, WizardError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| WizardError::InvalidField {
            field: CampaignField::ScheduledAt,
            reason: format!("'{raw}' is not an RFC 3339 timestamp"),
        })
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
