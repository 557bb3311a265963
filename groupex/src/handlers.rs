use anyhow::{Context, bail};
use chrono::Local;
use clap::ArgMatches;
use colored::Colorize;
use groupex_core::{DirectorySink, ExportConfig, ExportResponse, ExportService, ExportSummary};
use groupex_scanner::{
    HtmlPage, NameResolution, NoiseStripper, RenderPass, ScrollCadence, ScrollProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Install the fmt subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build a page from a listing snapshot plus the fragments its lazy loads reveal.
pub fn load_page(html: &Path, fragments: &[PathBuf], location: &Url) -> anyhow::Result<HtmlPage> {
    let markup = fs::read_to_string(html)
        .with_context(|| format!("Failed to read listing snapshot {}", html.display()))?;

    let fragments = fragments
        .iter()
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read fragment {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(HtmlPage::new(location.as_str(), markup).with_fragments(fragments))
}

/// Configuration file (or defaults) with command-line flags applied on top.
pub fn build_config(args: &ArgMatches) -> anyhow::Result<ExportConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => ExportConfig::from_file(path)
            .with_context(|| format!("Invalid configuration file {}", path.display()))?,
        None => ExportConfig::default(),
    };

    if let Some(cadence) = args.get_one::<String>("cadence") {
        config.scroll.cadence = match cadence.as_str() {
            "fixed" => ScrollCadence::fixed(),
            "humanized" => ScrollCadence::humanized(),
            other => bail!("Unknown cadence '{}'", other),
        };
    }
    if let Some(timeout) = args.get_one::<u64>("timeout") {
        config.scroll.timeout_secs = Some(*timeout);
    }
    if args.get_flag("render-pass") && config.scroll.render_pass.is_none() {
        config.scroll.render_pass = Some(RenderPass::default());
    }
    if args.get_flag("no-membership-filter") {
        config.membership_filter = false;
    }
    if let Some(names) = args.get_one::<String>("names") {
        config.name_resolution = match names.as_str() {
            "own-text" => NameResolution::OwnText,
            "layered" => NameResolution::Layered,
            other => bail!("Unknown name strategy '{}'", other),
        };
    }
    if let Some(directory) = args.get_one::<String>("output-dir") {
        config.output.directory = directory.clone();
    }
    if let Some(filename) = args.get_one::<String>("filename") {
        config.output.filename = filename.clone();
    }

    config.validate()?;
    Ok(config)
}

/// The status sink's one-line rendering of a response.
pub fn status_line(response: &ExportResponse) -> String {
    if response.success {
        let count = response.count.unwrap_or(0);
        let noun = if count == 1 { "group" } else { "groups" };
        format!("✓ Groups exported successfully! ({} {})", count, noun)
    } else {
        format!(
            "✗ {}",
            response.error.as_deref().unwrap_or("Export failed")
        )
    }
}

pub fn normalize_labels<'a, I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let stripper = NoiseStripper::new();
    labels.into_iter().map(|label| stripper.strip(label)).collect()
}

pub async fn handle_export(sub_matches: &ArgMatches) {
    init_tracing(sub_matches.get_flag("verbose"));

    let config = match build_config(sub_matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let html = sub_matches
        .get_one::<PathBuf>("html")
        .expect("clap requires --html");
    let location = sub_matches
        .get_one::<Url>("location")
        .expect("--location has a default");
    let fragments: Vec<PathBuf> = sub_matches
        .get_many::<PathBuf>("fragment")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default();

    let page = match load_page(html, &fragments, location) {
        Ok(page) => page,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("spinner template is valid"),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Loading groups...");

    let progress_spinner = spinner.clone();
    let progress_callback: ScrollProgressCallback = Arc::new(move |step: usize, height: u64| {
        progress_spinner.set_message(format!("Scrolling: step {} (page height {}px)", step, height));
    });

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let service = ExportService::new(
        config.build_pipeline(page, Some(progress_callback)),
        DirectorySink::new(config.output_directory()),
    )
    .with_filename(config.output.filename.clone())
    .with_cancellation(cancel);

    let started_at = Local::now();
    let result = service.export().await;
    spinner.finish_and_clear();

    let line = status_line(&ExportResponse::from_result(&result));
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(_) => {
            eprintln!("{}", line.red().bold());
            std::process::exit(1);
        }
    };

    let summary = ExportSummary::from_outcome(&outcome, started_at, Local::now());
    if summary.is_partial() {
        println!("{}", line.yellow().bold());
    } else {
        println!("{}", line.green().bold());
    }
    info!("Export written to {}", summary.path.display());
    print!("{}", summary.render());
}

pub fn handle_normalize(sub_matches: &ArgMatches) {
    let labels = sub_matches
        .get_many::<String>("LABEL")
        .map(|labels| labels.map(String::as_str).collect::<Vec<_>>())
        .unwrap_or_default();

    for label in normalize_labels(labels) {
        println!("{}", label);
    }
}
