//! Fixtures shared by the unit tests.

use anyhow::Result;
use axum::Router;
use chrono::NaiveDate;
use shared::domain::{
    Campaign, CampaignId, CampaignKind, CampaignStatus, Lead, LeadId, Platform,
};
use tokio::net::TcpListener;

/// Serves `app` on an ephemeral port and returns the API base URL.
pub async fn spawn_backend(app: Router) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/api/"))
}

pub fn campaign(id: i64, status: CampaignStatus) -> Campaign {
    Campaign {
        id: CampaignId(id),
        name: format!("campaign-{id}"),
        kind: CampaignKind::Social,
        status,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
        end_date: NaiveDate::from_ymd_opt(2024, 1, 31).expect("date"),
        platforms: vec![Platform::Facebook],
        lead_count: 0,
        scheduled_at: None,
        objective: None,
        audience: None,
    }
}

pub fn lead(id: i64, status: &str, is_active: bool) -> Lead {
    Lead {
        id: LeadId(id),
        name: format!("lead-{id}"),
        email: None,
        phone: None,
        status: status.to_string(),
        is_active,
        assigned_to: None,
        source: None,
        created_at: None,
        updated_at: None,
    }
}
