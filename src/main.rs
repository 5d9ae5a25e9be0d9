use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recording_downloader::cli::{Cli, Commands};
use recording_downloader::config::Config;
use recording_downloader::export::{ExportOutcome, ExportPipeline, ExportRequest, ExportSummary, TranscodeOutcome};
use recording_downloader::platform::{
    AudioFormat, ClientCredentials, CloudClient, RecordingApi, Region, TokenProvider,
};
use recording_downloader::prompt::{self, ConsolePrompter, Prompter};
use recording_downloader::transcode::ScriptTranscoder;
use recording_downloader::utils::{self, format_duration};
use recording_downloader::DownloaderError;

/// Selections for one download run; `None` means ask the operator
struct DownloadArgs {
    region: Option<Region>,
    start: Option<String>,
    end: Option<String>,
    queue: Option<String>,
    format: Option<AudioFormat>,
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "recording_downloader=debug,recdl=debug"
    } else {
        "recording_downloader=info,recdl=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().await?;
    let client_id = cli.client_id.as_deref();
    let client_secret = cli.client_secret.as_deref();

    match cli.command {
        Commands::Download {
            region,
            start,
            end,
            queue,
            format,
            output_dir,
        } => {
            let args = DownloadArgs {
                region,
                start,
                end,
                queue,
                format,
                output_dir,
            };
            run_download(&config, args, client_id, client_secret).await?;
        }
        Commands::Queues { region } => {
            let region = match region {
                Some(region) => region,
                None => config.region()?,
            };
            let client = connect(&config, region, client_id, client_secret).await?;
            let queues = client
                .list_queues(config.export.page_size)
                .await
                .context("Failed to load queues")?;

            println!("Queues in {}:", region);
            for queue in queues {
                println!("  {}  {}", queue.id, queue.name);
            }
        }
        Commands::Regions => {
            println!("Supported regions:");
            for region in Region::ALL {
                println!("  • {:<20} {}", region.host(), region.label());
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                Config::print_location()?;
            }
        }
    }

    Ok(())
}

/// Authenticate and build an API client for the region
async fn connect(
    config: &Config,
    region: Region,
    client_id: Option<&str>,
    client_secret: Option<&str>,
) -> Result<CloudClient> {
    let (id, secret) = config.credentials(client_id, client_secret)?;
    let token = ClientCredentials::new(region, id, secret)
        .access_token()
        .await
        .map_err(|e| DownloaderError::Authentication(e.to_string()))?;

    tracing::info!("Authenticated against {}", region.host());
    Ok(CloudClient::new(region, token))
}

async fn run_download(
    config: &Config,
    args: DownloadArgs,
    client_id: Option<&str>,
    client_secret: Option<&str>,
) -> Result<()> {
    println!("{}", style("RECORDING DOWNLOADER").bold().cyan());
    println!("====================\n");

    let prompter = ConsolePrompter::new();

    let region = match args.region {
        Some(region) => region,
        None => prompt::select_region(&prompter)?,
    };
    println!("Region: {}", region);

    let client = connect(config, region, client_id, client_secret).await?;

    let (start, end) = match (args.start.as_deref(), args.end.as_deref()) {
        (Some(start), Some(end)) => {
            let start = utils::parse_date(start)?;
            let end = utils::parse_date(end)?;
            utils::validate_date_range(start, end)?;
            (start, end)
        }
        (None, None) => prompt::prompt_date_range(&prompter)?,
        _ => anyhow::bail!("--start and --end must be given together"),
    };
    println!("Date range: {} to {}", start, end);

    let queue_id = match args.queue {
        Some(queue_id) => queue_id,
        None => {
            let queues = client
                .list_queues(config.export.page_size)
                .await
                .context("Failed to load queues")?;
            prompter.show("Available queues:")?;
            let queue = prompt::select_queue(&prompter, &queues)?;
            println!("Queue: {}", queue.name);
            queue.id.clone()
        }
    };

    let format = match args.format {
        Some(format) => format,
        None => prompt::select_format(&prompter)?,
    };
    println!("Final format: {}", format);

    let base_dir = utils::executable_dir()?;
    let output_dir = args.output_dir.unwrap_or_else(|| config.output_dir(&base_dir));
    let transcoder = ScriptTranscoder::from_config(&config.transcode, &base_dir);

    let pipeline = ExportPipeline::new(&client, &transcoder, output_dir)
        .with_page_size(config.export.page_size)
        .with_poll_policy(config.export.max_poll_attempts, config.poll_interval());

    let request = ExportRequest {
        queue_id,
        start,
        end,
        format,
    };

    match pipeline.run(&request).await? {
        ExportOutcome::NoConversations => println!("No conversations found."),
        ExportOutcome::NoAvailableRecordings => println!("No recordings available for download."),
        ExportOutcome::EmptyBatch => println!("The batch returned no results to download."),
        ExportOutcome::Completed(summary) => print_summary(&summary),
    }

    Ok(())
}

fn print_summary(summary: &ExportSummary) {
    let report = &summary.report;

    println!("\n{}", style("Download finished").bold().green());
    println!("  Batch: {}", summary.batch);
    println!("  Recordings downloaded: {}", summary.success_count());
    println!("  Errors: {}", summary.error_count());
    for (item, reason) in &report.failed {
        println!("    {} download failed: {}", item.label(), reason);
    }
    for item in &report.export_errors {
        println!(
            "    {} export failed: {}",
            item.label(),
            item.error_message().unwrap_or("unknown error")
        );
    }
    println!("  Files saved in: {}", report.output_dir.display());
    println!("  Elapsed: {}", format_duration(summary.elapsed.as_secs_f64()));

    match &summary.transcode {
        TranscodeOutcome::NotRequired => println!("No conversion needed."),
        TranscodeOutcome::Succeeded => println!("{}", style("Conversion finished successfully.").green()),
        TranscodeOutcome::Failed(reason) => {
            println!("{} {}", style("Conversion failed:").red(), reason);
            println!("The downloaded recordings were kept.");
        }
    }
}
