use anyhow::Result;
use tracing::info;

mod auditor;
mod browser;
mod config;
mod error;
mod journey;
mod models;
mod report;
mod rules;
mod scanner;
mod traits;
mod workflow;

use auditor::WorkflowAuditor;
use config::AuditConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    info!("Starting WCAG shopping workflow audit");

    let config = AuditConfig::load()?;
    if let Some(path) = &config.summarize_report {
        return auditor::summarize(path).await;
    }

    let auditor = WorkflowAuditor::new(config).await?;
    auditor.run().await?;

    info!("All audit runs finished");
    Ok(())
}
