use clap::{Parser, Subcommand, ValueEnum};
use photo_report::config::{self, NormalizerStrategy};
use photo_report::generate;
use photo_report::imaging::{RustBackend, select_normalizer};
use photo_report::output;
use photo_report::render::assembler_for;
use photo_report::request;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photo-report")]
#[command(about = "Photo reports as PDF and DOCX")]
#[command(long_about = "\
Photo reports as PDF and DOCX

A request is a JSON file with the report metadata, an optional layout and the
ordered photo list. Photo paths are relative to the request file.

  {
    \"metadata\": {
      \"institution\": \"Escola Municipal\",
      \"motive\": \"Vistoria\",
      \"process_number\": \"2024/0042\",
      \"address\": \"Rua das Flores, 120\",
      \"date\": \"12/03/2024\",
      \"comments\": \"Infiltrações no bloco B.\"
    },
    \"layout\": {\"columns\": 2, \"style\": \"bordered\"},
    \"photos\": [
      {\"id\": \"a1\", \"path\": \"fotos/001.jpg\", \"description\": \"Fachada\", \"rotation\": 90}
    ]
  }

Photos that cannot be decoded are skipped with a warning; the remaining
figures keep their numbers.

Run 'photo-report gen-config' to generate a documented report.toml.")]
#[command(version = env!("BUILD_VERSION"))]
struct Cli {
    /// Directory holding report.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Produce the configured documents for a request
    Generate {
        /// Request JSON file
        request: PathBuf,

        /// Directory the documents are written to
        #[arg(long, default_value = ".")]
        output: PathBuf,

        /// Override the configured normalization strategy
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },
    /// Show how the figures of a request would be laid out, without writing anything
    Plan {
        /// Request JSON file
        request: PathBuf,
    },
    /// Print a stock report.toml with all options documented
    GenConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Auto,
    Pooled,
    Inline,
}

impl From<StrategyArg> for NormalizerStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Auto => NormalizerStrategy::Auto,
            StrategyArg::Pooled => NormalizerStrategy::Pooled,
            StrategyArg::Inline => NormalizerStrategy::Inline,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Generate {
            request,
            output: out_dir,
            strategy,
        } => {
            let mut config = config::load_config(&cli.config)?;
            if let Some(strategy) = strategy {
                config.processing.strategy = strategy.into();
            }
            let request = load(&request)?;
            let normalizer = select_normalizer(
                RustBackend::new(),
                config.normalize_settings(),
                &config.processing,
            );

            let report = generate::generate(&request, &config, normalizer.as_ref())?;
            let paths = generate::write_artifacts(&report.artifacts, &out_dir)?;
            output::print_generate_output(&report, &paths);
        }
        Command::Plan { request } => {
            let config = config::load_config(&cli.config)?;
            let request = load(&request)?;
            let normalizer = select_normalizer(
                RustBackend::new(),
                config.normalize_settings(),
                &config.processing,
            );

            let prepared = generate::prepare(&request, normalizer.as_ref());
            let plans: Vec<_> = config
                .output
                .formats
                .iter()
                .map(|&format| {
                    let assembler = assembler_for(format, config.layout.border_shape);
                    (
                        format,
                        generate::plan_for(&request, &prepared, &config, assembler.as_ref()),
                    )
                })
                .collect();
            output::print_plan_output(&prepared, &plans);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<request::ReportRequest, request::RequestError> {
    let request = request::load_request(path)?;
    info!(
        path = %path.display(),
        photos = request.photos.len(),
        "request loaded"
    );
    Ok(request)
}

/// Logs go to stderr so stdout stays reserved for the command's own output.
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        "photo_report=debug"
    } else {
        "photo_report=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();
}
