use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    listing::{paginate, search_referrals, CampaignFilter, LeadFilter, DEFAULT_PAGE_SIZE},
    load_settings, orchestration, AdvanceOutcome, ApiClient, CampaignField, CrmApi, FileStore,
    LocalStorage, Route, Store, TaskScope, WizardController,
};
use serde::Serialize;
use shared::{
    domain::{
        CampaignAction, CampaignId, CampaignKind, CampaignStatus, LeadId, LeadStatus, Platform,
        TicketId,
    },
    protocol::ScheduleMode,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "crm", about = "Clinic CRM dashboard client")]
struct Cli {
    /// Overrides the configured API base URL.
    #[arg(long)]
    api_base_url: Option<String>,
    #[arg(long)]
    storage_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Social,
    Email,
}

impl From<KindArg> for CampaignKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Social => CampaignKind::Social,
            KindArg::Email => CampaignKind::Email,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ActionArg {
    Pause,
    Resume,
    Stop,
}

impl From<ActionArg> for CampaignAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Pause => CampaignAction::Pause,
            ActionArg::Resume => CampaignAction::Resume,
            ActionArg::Stop => CampaignAction::Stop,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScheduleArg {
    Now,
    Later,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Prints the lead KPIs and campaign overview.
    Dashboard,
    Campaigns {
        #[arg(long)]
        kind: Option<KindArg>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    CampaignStatus {
        campaign_id: i64,
        action: ActionArg,
    },
    CreateCampaign {
        kind: KindArg,
        #[arg(long)]
        name: String,
        #[arg(long)]
        objective: String,
        #[arg(long)]
        audience: String,
        #[arg(long)]
        start_date: String,
        #[arg(long)]
        end_date: String,
        #[arg(long = "platform")]
        platforms: Vec<String>,
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        template: Option<String>,
        #[arg(long, value_enum, default_value = "now")]
        schedule: ScheduleArg,
        #[arg(long)]
        scheduled_at: Option<String>,
    },
    Leads {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        include_inactive: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    Notes {
        lead_id: i64,
    },
    AddNote {
        lead_id: i64,
        body: String,
    },
    Tickets,
    Reply {
        ticket_id: i64,
        body: String,
    },
    Referrals {
        #[arg(long)]
        search: Option<String>,
    },
    /// Lists integrations and stores the backend's flags locally.
    Integrations,
    Connect {
        platform: String,
    },
    Disconnect {
        platform: String,
    },
    /// Resolves a dashboard path such as `/tickets/4`.
    Open {
        path: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(url) = cli.api_base_url {
        settings.api_base_url = url;
    }
    if let Some(path) = cli.storage_path {
        settings.storage_path = path;
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .init();

    let file_store = FileStore::open(&settings.storage_path).with_context(|| {
        format!(
            "failed to open local storage at {}",
            settings.storage_path.display()
        )
    })?;
    let storage = LocalStorage::new(Arc::new(file_store));
    let client = ApiClient::from_settings(&settings, storage.clone())
        .with_context(|| format!("invalid API base URL '{}'", settings.api_base_url))?;
    let api = CrmApi::new(client.clone());
    let store = Arc::new(Store::default());

    let mut scope = TaskScope::new("cli");
    let session_store = store.clone();
    let events = client.subscribe_session();
    scope.spawn(async move { orchestration::follow_session(events, &session_store).await });

    info!(base_url = %client.base_url(), "crm client ready");

    match cli.command {
        Command::Login { email, password } => {
            let response = api.login(&email, &password).await?;
            println!("signed in as {email}");
            if let Some(employee_id) = response.employee_id {
                println!("employee_id={employee_id}");
            }
        }
        Command::Logout => {
            api.logout()?;
            println!("signed out");
        }
        Command::Dashboard => {
            orchestration::load_dashboard(&api, &store).await?;
            let state = store.snapshot();
            let metrics = state.lead_metrics();
            if let Some(clinic) = &state.clinic {
                println!("{}", clinic.name);
            }
            for name in client_core::MetricName::ALL {
                println!("{:<18} {}", name.as_str(), metrics.get(name));
            }
            println!("conversion rate    {:.1}%", metrics.conversion_rate());
            let live = CampaignFilter {
                status: Some(CampaignStatus::Live),
                ..CampaignFilter::default()
            }
            .apply(&state.campaigns);
            println!("live campaigns     {}", live.len());
            println!("emails sent        {}", state.email_history.len());
        }
        Command::Campaigns { kind, search, page } => {
            use client_core::CrmBackend as _;
            let kind = kind.map(CampaignKind::from);
            let campaigns = api.list_campaigns(kind).await?;
            let filtered = CampaignFilter {
                kind,
                search,
                ..CampaignFilter::default()
            }
            .apply(&campaigns);
            print_json(&paginate(&filtered, page, DEFAULT_PAGE_SIZE))?;
        }
        Command::CampaignStatus {
            campaign_id,
            action,
        } => {
            orchestration::load_dashboard(&api, &store).await?;
            let updated = orchestration::change_campaign_status(
                &api,
                &store,
                CampaignId(campaign_id),
                action.into(),
            )
            .await
            .map_err(|err| anyhow!(err.user_message()))?;
            println!("campaign {} is now {}", updated.id, updated.status);
        }
        Command::CreateCampaign {
            kind,
            name,
            objective,
            audience,
            start_date,
            end_date,
            platforms,
            mode,
            subject,
            template,
            schedule,
            scheduled_at,
        } => {
            let mut wizard = WizardController::new(kind.into());
            wizard.set_text(CampaignField::Name, name);
            wizard.set_text(CampaignField::Objective, objective);
            wizard.set_text(CampaignField::Audience, audience);
            wizard.set_text(CampaignField::StartDate, start_date);
            wizard.set_text(CampaignField::EndDate, end_date);
            advance_or_bail(&mut wizard)?;

            let selected = platforms
                .iter()
                .map(|raw| Platform::parse(raw).ok_or_else(|| anyhow!("unknown platform '{raw}'")))
                .collect::<Result<Vec<_>>>()?;
            wizard.set_platforms(&selected);
            wizard.set_text(CampaignField::Mode, mode.unwrap_or_default());
            wizard.set_text(CampaignField::Subject, subject.unwrap_or_default());
            wizard.set_text(CampaignField::Template, template.unwrap_or_default());
            advance_or_bail(&mut wizard)?;

            wizard.set_schedule_mode(match schedule {
                ScheduleArg::Now => ScheduleMode::Now,
                ScheduleArg::Later => ScheduleMode::Later,
            });
            wizard.set_text(CampaignField::ScheduledAt, scheduled_at.unwrap_or_default());

            let campaign = orchestration::submit_wizard(&api, &store, &mut wizard).await?;
            println!("created campaign {} ({})", campaign.id, campaign.status);
        }
        Command::Leads {
            status,
            search,
            include_inactive,
            page,
        } => {
            use client_core::CrmBackend as _;
            let status = status
                .map(|raw| {
                    LeadStatus::parse(&raw).ok_or_else(|| anyhow!("unknown lead status '{raw}'"))
                })
                .transpose()?;
            let leads = api.list_leads().await?;
            let filtered = LeadFilter {
                status,
                search,
                include_inactive,
                ..LeadFilter::default()
            }
            .apply(&leads);
            print_json(&paginate(&filtered, page, DEFAULT_PAGE_SIZE))?;
        }
        Command::Notes { lead_id } => {
            print_json(&api.list_notes(LeadId(lead_id)).await?)?;
        }
        Command::AddNote { lead_id, body } => {
            let note = api.create_note(LeadId(lead_id), &body).await?;
            println!("added note {}", note.id);
        }
        Command::Tickets => {
            print_json(&api.list_tickets().await?)?;
        }
        Command::Reply { ticket_id, body } => {
            let reply =
                orchestration::reply_to_ticket(&api, &store, TicketId(ticket_id), &body).await?;
            println!("reply {} posted", reply.id);
        }
        Command::Referrals { search } => {
            let partners = api.list_referrals(search.as_deref()).await?;
            // Also narrowed locally.
            let partners = search_referrals(&partners, search.as_deref().unwrap_or_default());
            print_json(&partners)?;
        }
        Command::Integrations => {
            let remote = api.sync_integrations().await?;
            let connected = storage.connected_integrations()?;
            for platform in Platform::ALL {
                let account = remote
                    .iter()
                    .find(|i| i.provider == platform)
                    .and_then(|i| i.account_name.as_deref())
                    .unwrap_or_default();
                let state = if connected.contains(&platform) { "connected" } else { "-" };
                println!("{:<10} {state:<10} {account}", platform.as_str());
            }
        }
        Command::Connect { platform } => set_integration(&api, &platform, true).await?,
        Command::Disconnect { platform } => set_integration(&api, &platform, false).await?,
        Command::Open { path } => {
            let route: Route = path.parse()?;
            println!("{} -> {}", route.title(), route.path());
        }
    }

    scope.cancel_all();
    Ok(())
}

async fn set_integration(api: &CrmApi, raw: &str, connected: bool) -> Result<()> {
    let platform = Platform::parse(raw).ok_or_else(|| anyhow!("unknown platform '{raw}'"))?;
    let integration = api.set_integration_connected(platform, connected).await?;
    println!(
        "{} {}",
        platform.as_str(),
        if integration.connected { "connected" } else { "disconnected" }
    );
    Ok(())
}

fn advance_or_bail(wizard: &mut WizardController) -> Result<()> {
    match wizard.advance() {
        AdvanceOutcome::Advanced(_) | AdvanceOutcome::AtEnd => Ok(()),
        AdvanceOutcome::Blocked { missing } => {
            let labels: Vec<&str> = missing.iter().map(|f| f.label()).collect();
            bail!(
                "{} step is incomplete: {}",
                wizard.current_step(),
                labels.join(", ")
            )
        }
    }
}
