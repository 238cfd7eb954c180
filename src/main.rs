use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Parser;
use oepl_dashboard::{dashboard, Config, Error};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oepl-dashboard")]
#[command(about = "Render a calendar and weather dashboard and upload it to an OpenEPaperLink tag")]
struct Cli {
    /// YAML config file (settings can also come from the environment)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Save the image but do not upload it
    #[arg(long)]
    skip_upload: bool,

    /// Directory for the rendered JPEG
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Render for this day instead of today (YYYY-MM-DD)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// More logging (-v info is the default, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 | 1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    let mut config = Config::load(cli.config.as_ref())?;
    if cli.skip_upload {
        config.skip_upload = true;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    let now = match cli.date {
        Some(date) => {
            let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
            config
                .timezone
                .from_local_datetime(&date.and_time(noon))
                .earliest()
                .ok_or_else(|| Error::Config(format!("Noon does not exist on {}", date)))?
        }
        None => Utc::now().with_timezone(&config.timezone),
    };

    let report = dashboard::run(&config, now).await?;
    tracing::info!(
        "Done: {} ({})",
        report.image_path.display(),
        if report.uploaded {
            "uploaded"
        } else {
            "not uploaded"
        }
    );

    Ok(())
}
