use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use majsoul_asset_manager::app::{App, RunOptions};
use majsoul_asset_manager::endpoint::HttpRemoteClient;
use majsoul_asset_manager::error::AssetError;
use majsoul_asset_manager::job::ConflictPolicy;
use majsoul_asset_manager::output::StdoutSink;
use majsoul_asset_manager::version::Version;

#[derive(Parser)]
#[command(name = "majsoul-am")]
#[command(about = "Mirror the Mahjong Soul asset catalog under human-readable file names")]
#[command(version, author)]
struct Cli {
    /// Directory files are downloaded into
    #[arg(long, default_value = "./assets")]
    output: Utf8PathBuf,

    /// Download assets of this version (inclusive) instead of the latest one
    #[arg(long)]
    max_version: Option<String>,

    /// Only download assets newer than this version (exclusive)
    #[arg(long)]
    min_version: Option<String>,

    /// Number of concurrent download jobs
    #[arg(long, default_value_t = 1)]
    jobs: usize,

    /// How same-named files from different territories are renamed; files
    /// with matching sizes are assumed equivalent and always skipped
    #[arg(long, value_enum, default_value_t = ConflictPolicy::FileSuffix)]
    on_conflict: ConflictPolicy,

    /// Print URL/path pairs without downloading anything
    #[arg(long)]
    dry_run: bool,

    /// Keep raw remote paths instead of metadata-derived names; an escape
    /// hatch for when a metadata format change breaks decoding
    #[arg(long)]
    no_remap: bool,

    /// Write the decoded game metadata to metadata.json
    #[arg(long)]
    dump_metadata: bool,

    /// Write the path mapping table to mappings.json
    #[arg(long)]
    dump_mappings: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<AssetError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &AssetError) -> u8 {
    match error {
        AssetError::InvalidVersion(_) => 2,
        AssetError::CatalogHttp(_)
        | AssetError::CatalogStatus { .. }
        | AssetError::DownloadHttp(_) => 3,
        AssetError::WireFormat(_)
        | AssetError::UnknownRecordType(_)
        | AssetError::MalformedDescriptor { .. }
        | AssetError::TableDecode { .. }
        | AssetError::UnknownCharacterId(_)
        | AssetError::ResourceNotFound(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let max_version = parse_version_flag(cli.max_version.as_deref())?;
    let min_version = parse_version_flag(cli.min_version.as_deref())?;

    let options = RunOptions {
        output: cli.output,
        max_version,
        min_version,
        jobs: cli.jobs.max(1),
        conflict_policy: cli.on_conflict,
        dry_run: cli.dry_run,
        remap: !cli.no_remap,
        dump_metadata: cli.dump_metadata,
        dump_mappings: cli.dump_mappings,
    };

    let client = HttpRemoteClient::new().into_diagnostic()?;
    let app = App::new(client);
    let results = app.run(&options, &StdoutSink).into_diagnostic()?;

    let failed = results.iter().filter(|result| !result.success).count();
    if failed > 0 {
        tracing::warn!("{failed} of {} jobs failed", results.len());
    } else {
        tracing::info!("processed {} jobs", results.len());
    }
    Ok(())
}

fn parse_version_flag(value: Option<&str>) -> miette::Result<Option<Version>> {
    value
        .map(str::parse::<Version>)
        .transpose()
        .into_diagnostic()
}
