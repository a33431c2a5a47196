use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use jobsync_cli::{Command, Config, ExportFormat};
use jobsync_client::JobFeedClient;
use jobsync_core::models::MAX_LIST_LIMIT;
use jobsync_core::{
    load_config, AppError, JobQuery, JobStore, StoredJob, SyncReport, SyncService,
};
use jobsync_db::{run_migrations, JobRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Setup logging (stderr to keep stdout clean for exports)
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    // Parse command line arguments
    let config = Config::parse();
    let file = load_config(config.config.as_deref()).map_err(explain)?;

    let mut feed_config = file.feed_config();
    if let Some(url) = &config.feed_url {
        feed_config.url = url.clone();
    }

    // Database connection
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(file.db_config().max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let repo = JobRepository::new(pool);

    // Execute command
    match config.command {
        Command::Migrate => {
            run_migrations(repo.pool()).await.map_err(explain)?;
            info!("Migrations applied");
        }
        Command::Stats => {
            show_stats(&repo).await?;
        }
        Command::Export {
            format,
            category,
            limit,
        } => {
            export(&repo, format, category, limit).await?;
        }
        Command::Sync => {
            let feed = JobFeedClient::new(&feed_config).map_err(explain)?;
            let service = SyncService::new(Arc::new(repo), Arc::new(feed), file.sync_config());
            let report = service.sync_jobs().await.map_err(explain)?;
            print_report(&report);
        }
        Command::Serve {
            port,
            interval_secs,
        } => {
            run_migrations(repo.pool()).await.map_err(explain)?;

            let mut sync_config = file.sync_config();
            if let Some(secs) = interval_secs {
                sync_config.interval = (secs > 0).then(|| Duration::from_secs(secs));
            }
            let interval = sync_config.interval;

            let feed = JobFeedClient::new(&feed_config).map_err(explain)?;
            info!("Using job feed: {}", feed.url());
            let service = Arc::new(SyncService::new(
                Arc::new(repo),
                Arc::new(feed),
                sync_config,
            ));

            serve(service, port, interval).await?;
        }
    }

    Ok(())
}

/// Turns an `AppError` into an `anyhow` error carrying the user-facing message.
fn explain(err: AppError) -> anyhow::Error {
    anyhow::anyhow!(err.user_message())
}

/// Serve the HTTP API until Ctrl-C
async fn serve(
    service: Arc<SyncService>,
    port: u16,
    interval: Option<Duration>,
) -> anyhow::Result<()> {
    let scheduled = interval.map(|period| {
        info!("Scheduled sync every {}s", period.as_secs());
        jobsync_server::spawn_scheduled_sync(service.clone(), period)
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    jobsync_server::run(listener, service, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await
    .context("Server error")?;

    if let Some(handle) = scheduled {
        handle.abort();
    }
    info!("Server stopped");
    Ok(())
}

fn print_report(report: &SyncReport) {
    let stats = &report.stats;
    println!(
        "\nSync complete in {}ms\n",
        report.duration().num_milliseconds()
    );
    println!("  Fetched:               {}", report.fetched);
    println!("  Created:               {}", stats.created);
    println!("  Updated:               {}", stats.updated);
    println!("  Unchanged:             {}", stats.unchanged);
    println!("  Failed:                {}", stats.failed);
    println!("  Rejected:              {}", report.rejected.len());
    if report.duplicates > 0 {
        println!("  Duplicate ids:         {}", report.duplicates);
    }
    for rejected in &report.rejected {
        println!(
            "    #{} {}: {}",
            rejected.index,
            rejected.external_id.as_deref().unwrap_or("(no id)"),
            rejected.reason
        );
    }
    println!();
}

/// Show database statistics
async fn show_stats(repo: &JobRepository) -> anyhow::Result<()> {
    let stats = repo.get_stats().await.map_err(explain)?;

    println!("\nDatabase Statistics\n");
    println!("  Total jobs:            {}", stats.total_jobs);
    println!("  Remote jobs:           {}", stats.remote_jobs);
    println!("  Unique companies:      {}", stats.companies);
    if let Some(last_update) = stats.last_update {
        println!("  Last update:           {}", last_update);
    }
    println!();

    Ok(())
}

/// Export jobs to various formats
async fn export(
    repo: &JobRepository,
    format: ExportFormat,
    category: Option<String>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    info!("Exporting jobs...");

    let jobs = collect_jobs(repo, category, limit).await.map_err(explain)?;

    if jobs.is_empty() {
        eprintln!("No jobs found to export.");
        return Ok(());
    }

    info!("Found {} jobs to export", jobs.len());

    match format {
        ExportFormat::Jsonl => export_jsonl(&jobs)?,
        ExportFormat::Json => export_json(&jobs)?,
        ExportFormat::Csv => export_csv(&jobs),
    }

    info!("Export complete: {} jobs", jobs.len());
    Ok(())
}

/// Reads jobs page by page until `limit` is reached or the store runs out.
async fn collect_jobs(
    repo: &JobRepository,
    category: Option<String>,
    limit: Option<usize>,
) -> Result<Vec<StoredJob>, AppError> {
    let mut jobs = Vec::new();
    let mut query = JobQuery {
        category,
        ..JobQuery::default()
    };

    loop {
        let wanted = limit.map_or(MAX_LIST_LIMIT, |l| (l - jobs.len()).min(MAX_LIST_LIMIT));
        if wanted == 0 {
            break;
        }
        query.limit = wanted;
        let page = repo.list(&query).await?;
        let last_page = page.len() < wanted;
        query.offset += page.len();
        jobs.extend(page);
        if last_page {
            break;
        }
    }

    Ok(jobs)
}

/// Export jobs in JSON Lines format (one JSON object per line)
fn export_jsonl(jobs: &[StoredJob]) -> anyhow::Result<()> {
    for job in jobs {
        println!("{}", serde_json::to_string(job)?);
    }
    Ok(())
}

/// Export jobs as a JSON array
fn export_json(jobs: &[StoredJob]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(jobs)?);
    Ok(())
}

const CSV_HEADER: &str = "id,external_id,title,company,location,job_category,employment_type,salary_from,salary_to,is_remote_work,number_of_openings,first_seen_at,last_updated_at";

/// Export jobs in CSV format
fn export_csv(jobs: &[StoredJob]) {
    println!("{}", CSV_HEADER);
    for job in jobs {
        println!("{}", csv_row(job));
    }
}

fn csv_row(job: &StoredJob) -> String {
    let p = &job.posting;
    let text = |v: Option<&str>| v.map(escape_csv).unwrap_or_default();
    let number = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();

    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{}",
        job.id,
        escape_csv(&p.external_id),
        escape_csv(&p.title),
        text(p.company.as_deref()),
        text(p.location.as_deref()),
        text(p.job_category.as_deref()),
        text(p.employment_type.as_ref().map(|t| t.as_str())),
        number(p.salary_from),
        number(p.salary_to),
        p.is_remote_work,
        p.number_of_openings.map(|n| n.to_string()).unwrap_or_default(),
        job.first_seen_at.format("%Y-%m-%dT%H:%M:%SZ"),
        job.last_updated_at.format("%Y-%m-%dT%H:%M:%SZ"),
    )
}

/// Escape a string for CSV output
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsync_core::testing::fixtures;

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_csv_row_matches_header() {
        let mut posting = fixtures::detailed(3);
        posting.company = Some("Acme, Inc.".to_string());
        let now = chrono::Utc::now();
        let job = StoredJob {
            id: uuid::Uuid::nil(),
            posting,
            content_hash: None,
            first_seen_at: now,
            last_updated_at: now,
        };

        let row = csv_row(&job);

        assert!(row.contains("\"Acme, Inc.\""));
        assert!(row.contains(",contract,"));
        // The quoted company adds one comma that is not a separator.
        assert_eq!(
            row.matches(',').count(),
            CSV_HEADER.matches(',').count() + 1
        );
    }
}
