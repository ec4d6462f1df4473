use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use profsite_core::dataset::Column;
use profsite_core::workspace::normalize_path;
use profsite_core::{BuildOptions, SiteBuilder, SiteConfig};
use profsite_render::SvgChartRenderer;
use profsite_source::{ContentSource, GitContentSource};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("profsite")
        .version(profsite_core::VERSION)
        .about("Build the profiling results site from sessions stored on a branch")
        .arg(
            Arg::new("source-branch")
                .required(true)
                .help("Branch holding the profiling session files"),
        )
        .arg(
            Arg::new("build-dir")
                .value_parser(value_parser!(PathBuf))
                .help("Build output root (default: <repo>/build)"),
        )
        .arg(
            Arg::new("flatten")
                .short('f')
                .long("flatten")
                .action(ArgAction::SetTrue)
                .help("Put every report directly under reports/, suffixed with its discovery index"),
        )
        .arg(
            Arg::new("clean-build")
                .short('c')
                .long("clean-build")
                .action(ArgAction::SetTrue)
                .help("Remove the build directory first; refused outside the repository"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("benchmark-record")
                .long("benchmark-record")
                .action(ArgAction::SetTrue)
                .help("Also write benchmark.json for continuous benchmark tracking"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Debug logging unless RUST_LOG is set"),
        )
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    let source = GitContentSource::discover(&cwd).context("not inside a git repository")?;

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => SiteConfig::load(path, source.repository_root())?,
        None => SiteConfig::for_repository(source.repository_root()),
    };

    let branch = matches
        .get_one::<String>("source-branch")
        .context("source branch is required")?;
    let build_dir = match matches.get_one::<PathBuf>("build-dir") {
        Some(dir) => normalize_path(dir, &cwd),
        None => normalize_path(&config.default_build_dir(), &cwd),
    };

    let options = BuildOptions::new(branch.as_str(), build_dir)
        .with_flatten(matches.get_flag("flatten"))
        .with_clean_build(matches.get_flag("clean-build"))
        .with_benchmark_record(matches.get_flag("benchmark-record"));

    let renderer = config.renderer.command();
    let charts = SvgChartRenderer::default();
    let builder = SiteBuilder::new(config, &source, &renderer, &charts);
    let report = builder.build(&options)?;

    let columns = [
        Column::ArtifactPath,
        Column::StartTime,
        Column::Duration,
        Column::Commit,
        Column::TriggeredBy,
        Column::Html,
    ];
    println!("{}", report.dataset.to_markdown(&columns));
    println!(
        "Site built in {} ({} runs, {} with issues)",
        report.build_dir.display(),
        report.dataset.len(),
        report.rows_with_issues()
    );
    Ok(())
}
