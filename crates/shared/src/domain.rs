use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(CampaignId);
id_newtype!(LeadId);
id_newtype!(NoteId);
id_newtype!(NextActionId);
id_newtype!(TicketId);
id_newtype!(ReplyId);
id_newtype!(DocumentId);
id_newtype!(ClinicId);
id_newtype!(EmployeeId);
id_newtype!(TemplateId);
id_newtype!(ReferralId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignKind {
    Social,
    Email,
}

impl CampaignKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Social => "social",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for CampaignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignStatus {
    Live,
    Draft,
    Schedule,
    Paused,
    Stopped,
    Completed,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "Live",
            Self::Draft => "Draft",
            Self::Schedule => "Schedule",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-triggered lifecycle change on a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignAction {
    Pause,
    Resume,
    Stop,
}

impl CampaignAction {
    pub fn target_status(self) -> CampaignStatus {
        match self {
            Self::Pause => CampaignStatus::Paused,
            Self::Resume => CampaignStatus::Live,
            Self::Stop => CampaignStatus::Stopped,
        }
    }

    pub fn is_allowed_from(self, status: CampaignStatus) -> bool {
        use CampaignStatus::*;
        match self {
            Self::Pause => matches!(status, Live | Schedule),
            Self::Resume => matches!(status, Paused),
            Self::Stop => matches!(status, Live | Schedule | Paused),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for CampaignAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Facebook,
    Instagram,
    Linkedin,
    Twitter,
    Google,
    Tiktok,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Facebook,
        Platform::Instagram,
        Platform::Linkedin,
        Platform::Twitter,
        Platform::Google,
        Platform::Tiktok,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
            Self::Linkedin => "linkedin",
            Self::Twitter => "twitter",
            Self::Google => "google",
            Self::Tiktok => "tiktok",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|platform| platform.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub kind: CampaignKind,
    pub status: CampaignStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub lead_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

/// Known lead pipeline stages. Leads keep the raw backend string; this is
/// only the vocabulary used to bucket them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LeadStatus {
    New,
    Appointment,
    FollowUps,
    Converted,
    CycleConversion,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 6] = [
        LeadStatus::New,
        LeadStatus::Appointment,
        LeadStatus::FollowUps,
        LeadStatus::Converted,
        LeadStatus::CycleConversion,
        LeadStatus::Lost,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Appointment => "Appointment",
            Self::FollowUps => "Follow-Ups",
            Self::Converted => "Converted",
            Self::CycleConversion => "Cycle Conversion",
            Self::Lost => "Lost",
        }
    }

    /// Case-insensitive exact match against the status vocabulary.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LeadRecord")]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Raw backend status; empty when the record carried none.
    pub status: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<EmployeeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Wire shape of a lead. Backends disagree on key casing and may send
/// `null` or several spellings of the same key in one record.
#[derive(Deserialize)]
struct LeadRecord {
    id: LeadId,
    #[serde(alias = "Name")]
    name: String,
    #[serde(default, alias = "Email")]
    email: Option<String>,
    #[serde(default, alias = "Phone")]
    phone: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "Status")]
    status_pascal: Option<String>,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default, rename = "isActive")]
    is_active_camel: Option<bool>,
    #[serde(default, rename = "IsActive")]
    is_active_pascal: Option<bool>,
    #[serde(default, alias = "assignedTo")]
    assigned_to: Option<EmployeeId>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default, alias = "createdAt")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt")]
    updated_at: Option<DateTime<Utc>>,
}

impl From<LeadRecord> for Lead {
    fn from(record: LeadRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            phone: record.phone,
            status: record
                .status
                .or(record.status_pascal)
                .unwrap_or_default(),
            is_active: record
                .is_active
                .or(record.is_active_camel)
                .or(record.is_active_pascal)
                .unwrap_or(true),
            assigned_to: record.assigned_to,
            source: record.source,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl Lead {
    pub fn known_status(&self) -> Option<LeadStatus> {
        LeadStatus::parse(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub lead_id: LeadId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextAction {
    pub id: NextActionId,
    pub lead_id: LeadId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketReply {
    pub id: ReplyId,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketDocument {
    pub id: DocumentId,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    #[serde(default)]
    pub replies: Vec<TicketReply>,
    #[serde(default)]
    pub documents: Vec<TicketDocument>,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Replies are append-only, existing entries are never touched.
    pub fn append_reply(&mut self, reply: TicketReply) {
        self.replies.push(reply);
    }

    pub fn last_reply(&self) -> Option<&TicketReply> {
        self.replies.last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clinic {
    pub id: ClinicId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Integration {
    pub provider: Platform,
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: TemplateId,
    pub name: String,
    pub subject: String,
    #[serde(default)]
    pub body_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailHistoryEntry {
    pub campaign_id: CampaignId,
    pub subject: String,
    pub recipient_count: u32,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralPartner {
    pub id: ReferralId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub referral_count: u32,
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
