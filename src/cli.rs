// src/cli.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::core::{
    ApplicationScope, ConfigManager, MarketplaceApi, ServiceClient, SessionContext,
    SqliteTokenStore,
};
use crate::error::{ApiError, ApiResult};
use crate::lifecycle::{
    available_actions, ApplicationLifecycleView, FixedLocation, LocationProvider,
    TransitionOutcome,
};
use crate::types::{Application, ApplicationStatus, ContractTerms, Coordinates, RecordId, UserRole};
use crate::utils::{filter_applications, sort_by_pipeline, status_counts, ApplicationFilter};

#[derive(Parser)]
#[command(name = "jobflow")]
#[command(about = "Follow job applications from application to clock-in")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Session database, overrides JOBFLOW_SESSION_DB
    #[arg(long, global = true)]
    pub session_db: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in and remember the session
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List applications (your own, or those received for a job)
    Applications {
        /// Include completed, rejected and withdrawn applications
        #[arg(long)]
        all: bool,
        #[arg(long)]
        status: Option<ApplicationStatus>,
        /// Job whose received applications to list (employers)
        #[arg(long)]
        job: Option<String>,
        #[arg(long, value_enum, default_value_t = SortOrder::Newest)]
        sort: SortOrder,
        /// Also export the listed applications to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Withdraw a pending or reviewed application
    Withdraw { id: String },
    /// Sign a contract by typing your full legal name
    Sign { id: String, signature: String },
    /// Verify a contract the candidate has signed (employers)
    Verify {
        id: String,
        #[arg(long)]
        job: String,
    },
    /// Record a review decision (employers)
    Review {
        id: String,
        status: ApplicationStatus,
        #[arg(long)]
        job: String,
    },
    /// Send a contract for an accepted application (employers)
    SendContract {
        id: String,
        #[arg(long)]
        job: String,
        #[arg(long)]
        rate: Option<f64>,
        #[arg(long)]
        schedule: Option<String>,
    },
    /// Start a work session at the given position
    ClockIn {
        id: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// End the open work session at the given position
    ClockOut {
        id: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// Start or end a break in the open work session
    Break {
        #[command(subcommand)]
        action: BreakAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    /// Most recently created first
    Newest,
    /// Pipeline stage, closed applications last
    Pipeline,
}

#[derive(Subcommand)]
pub enum BreakAction {
    Start { id: String },
    End { id: String },
}

/// Breaks do not need a position.
struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_position(&self) -> ApiResult<Coordinates> {
        Err(ApiError::precondition("A position is required for this action."))
    }
}

struct CliContext {
    session: Arc<SessionContext>,
    client: Arc<ServiceClient>,
}

impl CliContext {
    async fn open(config: &ConfigManager) -> Result<Self> {
        let store = SqliteTokenStore::open(&config.session.database_path).await?;
        let session = Arc::new(
            SessionContext::restore(Arc::new(store))
                .await
                .context("Failed to restore session")?,
        );
        let client = Arc::new(ServiceClient::new(
            &config.environment.api_url,
            config.environment.timeout_seconds,
            session.clone(),
        )?);

        Ok(Self { session, client })
    }

    fn require_login(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            bail!("Not signed in. Run `jobflow login <email> --password <password>` first.");
        }
        Ok(())
    }

    fn view(&self, scope: ApplicationScope) -> ApplicationLifecycleView {
        self.view_at(scope, Arc::new(NoLocation))
    }

    fn view_at(
        &self,
        scope: ApplicationScope,
        location: Arc<dyn LocationProvider>,
    ) -> ApplicationLifecycleView {
        ApplicationLifecycleView::new(self.client.clone(), location, scope)
    }

    /// View with its collection already fetched.
    async fn loaded_view(&self, scope: ApplicationScope) -> Result<ApplicationLifecycleView> {
        self.require_login()?;
        let view = self.view(scope);
        view.refresh().await?;
        Ok(view)
    }

    async fn located_view(
        &self,
        lat: f64,
        lng: f64,
    ) -> Result<ApplicationLifecycleView> {
        self.require_login()?;
        let view = self.view_at(
            ApplicationScope::Mine,
            Arc::new(FixedLocation(Coordinates::new(lat, lng))),
        );
        view.refresh().await?;
        Ok(view)
    }
}

pub async fn handle_command(cli: Cli, config: ConfigManager) -> Result<()> {
    let config = config.with_session_db(cli.session_db);
    config.ensure_directories().await?;
    let ctx = CliContext::open(&config).await?;

    match cli.command {
        Command::Login { email, password } => {
            ctx.client.login(&email, &password).await?;
            let profile = ctx.client.fetch_profile().await?;
            println!(
                "✅ Signed in as {} <{}>",
                profile.legal_name().unwrap_or_else(|| email.clone()),
                profile.email
            );
        }

        Command::Logout => {
            ctx.client.logout().await?;
            println!("Signed out.");
        }

        Command::Whoami => {
            ctx.require_login()?;
            let profile = ctx.client.fetch_profile().await?;
            let role = match profile.role {
                UserRole::JobSeeker => "job seeker",
                UserRole::Employer => "employer",
            };
            println!(
                "{} <{}> ({})",
                profile.legal_name().unwrap_or_else(|| "(no legal name)".to_string()),
                profile.email,
                role
            );
            println!("   User ID: {}", profile.id);
            if let Some(expires) = ctx.session.claims().and_then(|c| c.expires_at()) {
                println!("   Access token expires: {}", expires.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            println!("   API: {}", ctx.client.base_url());
        }

        Command::Applications {
            all,
            status,
            job,
            sort,
            csv,
        } => {
            let (scope, role) = match job {
                Some(job) => (ApplicationScope::ForJob(RecordId::new(job)), UserRole::Employer),
                None => (ApplicationScope::Mine, UserRole::JobSeeker),
            };
            let view = ctx.loaded_view(scope).await?;

            let filter = ApplicationFilter {
                status,
                include_closed: all,
            };
            let mut applications = filter_applications(&view.applications(), &filter);
            if sort == SortOrder::Pipeline {
                sort_by_pipeline(&mut applications);
            }
            print_applications(&applications, role);
            if !applications.is_empty() {
                println!("{}", format_summary(&status_counts(&applications)));
            }

            if let Some(path) = csv {
                export_csv(&path, &applications)?;
                println!("Exported {} applications to {}", applications.len(), path.display());
            }
        }

        Command::Withdraw { id } => {
            let view = ctx.loaded_view(ApplicationScope::Mine).await?;
            let outcome = view.withdraw(&RecordId::new(id)).await?;
            print_outcome(&outcome);
        }

        Command::Sign { id, signature } => {
            let view = ctx.loaded_view(ApplicationScope::Mine).await?;
            let profile = ctx.client.fetch_profile().await?;
            let outcome = view
                .sign_contract(&RecordId::new(id), &signature, &profile)
                .await?;
            print_outcome(&outcome);
        }

        Command::Verify { id, job } => {
            let view = ctx
                .loaded_view(ApplicationScope::ForJob(RecordId::new(job)))
                .await?;
            let outcome = view.verify_contract(&RecordId::new(id)).await?;
            print_outcome(&outcome);
        }

        Command::Review { id, status, job } => {
            let view = ctx
                .loaded_view(ApplicationScope::ForJob(RecordId::new(job.clone())))
                .await?;
            let outcome = view.update_status(&RecordId::new(id.clone()), status).await?;
            print_outcome(&outcome);
            if outcome.offer_send_contract {
                println!("Next: jobflow send-contract {} --job {}", id, job);
            }
        }

        Command::SendContract {
            id,
            job,
            rate,
            schedule,
        } => {
            let view = ctx
                .loaded_view(ApplicationScope::ForJob(RecordId::new(job)))
                .await?;
            let terms = (rate.is_some() || schedule.is_some()).then(|| ContractTerms {
                hourly_rate: rate,
                schedule,
                ..Default::default()
            });
            let outcome = view.send_contract(&RecordId::new(id), terms).await?;
            print_outcome(&outcome);
        }

        Command::ClockIn { id, lat, lng } => {
            let view = ctx.located_view(lat, lng).await?;
            let outcome = view.clock_in(&RecordId::new(id)).await?;
            println!("✅ {}", outcome.message);
            if outcome.within_geofence == Some(false) {
                println!("⚠️  You are outside the job site area; this session is flagged.");
            }
        }

        Command::ClockOut { id, lat, lng } => {
            let view = ctx.located_view(lat, lng).await?;
            let summary = view.clock_out(&RecordId::new(id)).await?;
            println!(
                "✅ Clocked out: {:.2} hours, {:.2} earned",
                summary.total_hours, summary.total_earnings
            );
            if let Some(message) = summary.message {
                println!("   {}", message);
            }
        }

        Command::Break { action } => {
            let view = ctx.loaded_view(ApplicationScope::Mine).await?;
            match action {
                BreakAction::Start { id } => {
                    view.start_break(&RecordId::new(id)).await?;
                    println!("Break started.");
                }
                BreakAction::End { id } => {
                    view.end_break(&RecordId::new(id)).await?;
                    println!("Break ended.");
                }
            }
        }
    }

    Ok(())
}

/// One-line count per status, e.g. `3 applications: active 1, pending 2`.
fn format_summary(counts: &BTreeMap<&'static str, usize>) -> String {
    let total: usize = counts.values().sum();
    let parts: Vec<String> = counts
        .iter()
        .map(|(status, count)| format!("{} {}", status, count))
        .collect();
    format!("{} applications: {}", total, parts.join(", "))
}

fn print_applications(applications: &[Application], role: UserRole) {
    if applications.is_empty() {
        println!("No applications found.");
        return;
    }

    println!(
        "{:<8} {:<30} {:<22} {:<24} {:<12}",
        "ID", "Job", "Status", "Contract", "Applied"
    );
    println!("{}", "-".repeat(100));

    for application in applications {
        println!(
            "{:<8} {:<30} {:<22} {:<24} {:<12}",
            application.id,
            truncate(&application.display_title(), 30),
            application.status.label(),
            application.contract_phase().label(),
            application.created_at.format("%Y-%m-%d")
        );

        let actions: Vec<String> = available_actions(application, role)
            .iter()
            .map(|a| a.label())
            .collect();
        if !actions.is_empty() {
            println!("{:<8} actions: {}", "", actions.join(", "));
        }
    }
}

fn print_outcome(outcome: &TransitionOutcome) {
    match &outcome.application {
        Some(application) => {
            let pending = if outcome.confirmed {
                ""
            } else {
                " (not yet confirmed)"
            };
            println!(
                "✅ Application {} is now {}{}",
                application.id,
                application.status.label().to_lowercase(),
                pending
            );
        }
        None => println!("✅ Done; the application is no longer listed."),
    }

    if let Some(message) = &outcome.message {
        println!("   {}", message);
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut shortened: String = value.chars().take(width.saturating_sub(1)).collect();
        shortened.push('…');
        shortened
    }
}

const CSV_HEADERS: [&str; 8] = [
    "id",
    "job_id",
    "job_title",
    "company",
    "status",
    "contract",
    "proposed_rate",
    "created_at",
];

pub fn write_csv<W: Write>(writer: W, applications: &[Application]) -> Result<W> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_HEADERS)?;

    for application in applications {
        writer.write_record([
            application.id.to_string(),
            application
                .job_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            application.display_title(),
            application.company_name.clone().unwrap_or_default(),
            application.status.as_str().to_string(),
            application.contract_phase().label().to_string(),
            application
                .proposed_rate
                .map(|r| r.to_string())
                .unwrap_or_default(),
            application.created_at.to_rfc3339(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e))
}

pub fn export_csv(path: &Path, applications: &[Application]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    match write_csv(file, applications) {
        Ok(_) => {
            info!("Exported {} applications to {}", applications.len(), path.display());
            Ok(())
        }
        Err(e) => {
            error!("CSV export to {} failed: {}", path.display(), e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: u64, status: &str) -> Application {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "status": status,
            "job_id": 7,
            "job_title": "Warehouse, night shift",
            "company_name": "Acme",
            "proposed_rate": 18.5,
            "created_at": "2024-03-01T10:00:00Z",
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_review_command() {
        let cli = Cli::try_parse_from(["jobflow", "review", "12", "shortlisted", "--job", "7"])
            .unwrap();
        match cli.command {
            Command::Review { id, status, job } => {
                assert_eq!(id, "12");
                assert_eq!(status, ApplicationStatus::Shortlisted);
                assert_eq!(job, "7");
            }
            _ => panic!("expected review"),
        }

        assert!(Cli::try_parse_from(["jobflow", "review", "12", "bogus", "--job", "7"]).is_err());
    }

    #[test]
    fn test_parse_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "jobflow", "clock-in", "3", "--lat", "-33.92", "--lng", "18.42",
        ])
        .unwrap();
        match cli.command {
            Command::ClockIn { id, lat, lng } => {
                assert_eq!(id, "3");
                assert_eq!(lat, -33.92);
                assert_eq!(lng, 18.42);
            }
            _ => panic!("expected clock-in"),
        }
    }

    #[test]
    fn test_parse_break_and_global_session_db() {
        let cli = Cli::try_parse_from(["jobflow", "break", "end", "4", "--session-db", "/tmp/s.db"])
            .unwrap();
        assert_eq!(cli.session_db, Some(PathBuf::from("/tmp/s.db")));
        assert!(matches!(
            cli.command,
            Command::Break {
                action: BreakAction::End { .. }
            }
        ));
    }

    #[test]
    fn test_write_csv() {
        let output = write_csv(Vec::new(), &[app(1, "pending"), app(2, "contract_sent")]).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "id,job_id,job_title,company,status,contract,proposed_rate,created_at");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,7,\"Warehouse, night shift\",Acme,pending,"));
        assert!(lines[2].contains("contract_sent"));
    }

    #[test]
    fn test_parse_sort_order() {
        let cli = Cli::try_parse_from(["jobflow", "applications", "--all", "--sort", "pipeline"])
            .unwrap();
        match cli.command {
            Command::Applications { all, sort, .. } => {
                assert!(all);
                assert_eq!(sort, SortOrder::Pipeline);
            }
            _ => panic!("expected applications"),
        }

        let cli = Cli::try_parse_from(["jobflow", "applications"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Applications {
                sort: SortOrder::Newest,
                ..
            }
        ));
    }

    #[test]
    fn test_format_summary() {
        let applications = [app(1, "pending"), app(2, "active"), app(3, "pending")];
        assert_eq!(
            format_summary(&status_counts(&applications)),
            "3 applications: active 1, pending 2"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
