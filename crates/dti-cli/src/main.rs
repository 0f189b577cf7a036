use anyhow::Context;
use clap::{Parser, ValueEnum};
use dti_core::{ParseOutcome, RulesetStats, parse_reader};
use dti_render::{ImageFormat, RenderConfig, Renderer};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Exit status for `--strict` runs whose input had unparsable lines.
const EXIT_PARSE_ISSUES: u8 = 2;

#[derive(Parser)]
#[command(name = "dotiptables")]
#[command(version, about = "Browse iptables-save dumps as rule listings and chain graphs", long_about = None)]
struct Cli {
    /// iptables-save dump to read (stdin when omitted)
    input: Option<PathBuf>,

    /// Directory for generated files [default: ./out]
    #[arg(short = 'd', long = "outputdir")]
    outputdir: Option<PathBuf>,

    /// Rasterize table graphs with the configured layout tool
    #[arg(long, overrides_with = "no_render")]
    render: bool,

    /// Skip rasterizing even if the config file enables it
    #[arg(long, overrides_with = "render")]
    no_render: bool,

    /// Image format for rasterized graphs
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// YAML render configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write the parsed ruleset as ruleset.json
    #[arg(long)]
    json: bool,

    /// Exit with status 2 when any input line could not be used
    #[arg(long)]
    strict: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Svg,
    Png,
    Pdf,
}

impl From<FormatArg> for ImageFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Svg => ImageFormat::Svg,
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Pdf => ImageFormat::Pdf,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = build_config(&cli)?;
    ensure_output_dir(&config.output_dir)?;

    let outcome = read_input(cli.input.as_deref())?;
    let renderer = Renderer::new(config);

    RulesetStats::collect(&outcome.ruleset, renderer.catalog()).display();
    if !outcome.is_clean() {
        warn!(skipped = outcome.issues.len(), "some input lines were not used");
        println!(
            "\n⚠️  {} input line(s) skipped, see log for details",
            outcome.issues.len()
        );
    }

    println!("\n📝 Generating HTML and DOT output...");
    if renderer.config().render {
        println!("🖼️  Rendering {} graphs...", renderer.config().rasterizer.format);
    }
    let report = renderer
        .render(&outcome.ruleset)
        .context("Failed to write output")?;

    for (table, err) in &report.raster_failures {
        warn!("Graph for table '{}' not rendered: {}", table, err);
    }
    println!(
        "✅ Wrote {} chain pages and {} graphs to {}",
        report.listings.len(),
        report.graphs.len(),
        renderer.config().output_dir.display()
    );
    if let Some(json) = &report.json {
        println!("   Ruleset JSON: {}", json.display());
    }

    if cli.strict && !outcome.is_clean() {
        return Ok(ExitCode::from(EXIT_PARSE_ISSUES));
    }
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Config file values, overridden by whatever was given on the command line.
fn build_config(cli: &Cli) -> anyhow::Result<RenderConfig> {
    let mut config = match &cli.config {
        Some(path) => RenderConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RenderConfig::default(),
    };

    if let Some(dir) = &cli.outputdir {
        config.output_dir = dir.clone();
    }
    if cli.render {
        config.render = true;
    }
    if cli.no_render {
        config.render = false;
    }
    if let Some(format) = cli.format {
        config.rasterizer.format = format.into();
    }
    if cli.json {
        config.json = true;
    }

    debug!(?config, "effective render config");
    Ok(config)
}

fn ensure_output_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Can't create output directory: {}", dir.display()))?;
    println!("📁 Output directory created: {}", dir.display());
    Ok(())
}

fn read_input(path: Option<&Path>) -> anyhow::Result<ParseOutcome> {
    match path {
        Some(path) => {
            println!("📖 Reading iptables data from {}", path.display());
            let file = File::open(path)
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            parse_reader(BufReader::new(file))
                .with_context(|| format!("Failed to read input {}", path.display()))
        }
        None => {
            println!("📖 Reading iptables data from stdin");
            parse_reader(io::stdin().lock()).context("Failed to read stdin")
        }
    }
}
