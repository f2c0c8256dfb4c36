use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use galaxy_library_sync::app::{App, ReconcileOptions};
use galaxy_library_sync::config::{RawSettings, Settings};
use galaxy_library_sync::error::LoaderError;
use galaxy_library_sync::galaxy::GalaxyHttpClient;
use galaxy_library_sync::manifest::ManifestLoader;
use galaxy_library_sync::output::{JsonOutput, OutputMode, TextOutput};

#[derive(Parser)]
#[command(name = "galaxy-library-sync")]
#[command(about = "Create a Galaxy data library and populate it from a dataset manifest")]
#[command(
    long_about = "Create a Galaxy data library if it does not exist and upload every dataset \
listed in the manifest that is not already present in its folder. Re-running is safe.\n\n\
The manifest is a local file or a URL with the following structure:\n\n\
datasets:\n  - name: RefSeq_reference_DSv2.gtf\n    url: https://example.org/GTFs/RefSeq_reference_DSv2.gtf\n    \
folder_name: GTFs\n    folder_description: A collection of GTF files\n    type: gtf\n    dbkey: mm10"
)]
#[command(version)]
struct Cli {
    /// Base URL of the Galaxy server
    #[arg(short = 'g', long, alias = "galaxy", env = "GALAXY_URL")]
    galaxy_url: String,

    /// Galaxy API key
    #[arg(short = 'a', long, alias = "api_key", env = "GALAXY_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Name of the data library to create or reuse
    #[arg(short = 'l', long, alias = "library_name")]
    library_name: String,

    /// Description used when the library is created
    #[arg(short = 'd', long, alias = "description")]
    library_description: String,

    /// Path or URL of the dataset manifest
    #[arg(short = 'm', long)]
    manifest: String,

    /// Look up everything but create and upload nothing
    #[arg(long)]
    dry_run: bool,

    /// Wait for each upload to finish before continuing
    #[arg(long)]
    wait: bool,

    /// Upper bound in seconds for --wait
    #[arg(long, value_name = "SECONDS", requires = "wait")]
    max_wait: Option<u64>,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<LoaderError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &LoaderError) -> u8 {
    if error.is_remote() {
        return 3;
    }
    match error {
        LoaderError::InvalidGalaxyUrl(_)
        | LoaderError::InvalidApiKey(_)
        | LoaderError::InvalidSetting(_) => 2,
        other if other.is_manifest() => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let settings = Settings::resolve(RawSettings {
        galaxy_url: cli.galaxy_url,
        api_key: cli.api_key,
        library_name: cli.library_name,
        library_description: cli.library_description,
        manifest: cli.manifest,
        dry_run: cli.dry_run,
        wait: cli.wait,
        max_wait_secs: cli.max_wait,
        timeout_secs: cli.timeout,
    })?;

    let manifest = ManifestLoader::load(&settings.manifest, settings.http_timeout)?;
    let galaxy = GalaxyHttpClient::new(
        settings.galaxy_url.clone(),
        &settings.api_key,
        settings.http_timeout,
    )?;
    let app = App::new(galaxy);
    let options = ReconcileOptions::from_settings(&settings);
    let result = app.reconcile(
        &settings.library_name,
        &settings.library_description,
        &manifest,
        &options,
    )?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_reconcile(&result).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_reconcile(&result).into_diagnostic()?,
    }
    Ok(())
}
