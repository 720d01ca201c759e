//! VeriLeaf CLI - Vegetation impact analysis of before/after images

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use verileaf_algorithms::imagery::{compute_index, index_descriptions, VegetationIndex};
use verileaf_algorithms::report::{ErrorReport, JsonFileStore, ResultStore, SessionId};
use verileaf_algorithms::{AnalysisConfig, Analyzer};
use verileaf_core::io::{write_index_tiff, DecoderKind, ImageFormat};
use verileaf_core::Error;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "verileaf")]
#[command(author, version, about = "Vegetation impact analysis of before/after images", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding stored results
    #[arg(long, global = true, env = "VERILEAF_RESULTS_DIR", default_value = "results")]
    results_dir: PathBuf,

    /// Image decoding backend
    #[arg(long, global = true, env = "VERILEAF_DECODER", value_enum, default_value_t = DecoderArg::Image)]
    decoder: DecoderArg,

    /// JSON file overriding analysis parameters
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extra roots for resolving relative image paths
    #[arg(long = "search-dir", global = true)]
    search_dirs: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a before and an after image and store the result
    Analyze {
        /// Image taken before the change
        before: PathBuf,
        /// Image taken after the change
        after: PathBuf,
        /// Embedded image encoding
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
        /// Print the result without storing it
        #[arg(long)]
        no_save: bool,
    },
    /// Print a stored result
    Results {
        /// Session id printed by `analyze`
        session_id: String,
    },
    /// Describe the computed indices
    Metrics,
    /// Report that the tool is operational
    Health,
    /// Summary statistics of a single image
    Summary {
        /// Input image
        input: PathBuf,
    },
    /// Export one index of an image as a float TIFF
    Index {
        /// Input image
        input: PathBuf,
        /// Index to export
        #[arg(value_enum)]
        index: IndexArg,
        /// Output TIFF file
        output: PathBuf,
    },
}

/// Image decoding backend for CLI interface
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DecoderArg {
    /// Any format the `image` crate reads (default)
    Image,
    /// Native TIFF reader keeping 16-bit precision
    #[value(alias = "tif")]
    Tiff,
}

impl std::fmt::Display for DecoderArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", DecoderKind::from(*self))
    }
}

impl From<DecoderArg> for DecoderKind {
    fn from(arg: DecoderArg) -> Self {
        match arg {
            DecoderArg::Image => DecoderKind::Image,
            DecoderArg::Tiff => DecoderKind::Tiff,
        }
    }
}

/// Embedded image encoding for CLI interface
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    #[value(alias = "jpg")]
    Jpeg,
    Png,
}

impl From<FormatArg> for ImageFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Jpeg => ImageFormat::Jpeg,
            FormatArg::Png => ImageFormat::Png,
        }
    }
}

/// Exportable index for CLI interface
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum IndexArg {
    Ndvi,
    Evi,
    Ndwi,
    Savi,
    Fvc,
    Lai,
}

impl From<IndexArg> for VegetationIndex {
    fn from(arg: IndexArg) -> Self {
        match arg {
            IndexArg::Ndvi => VegetationIndex::Ndvi,
            IndexArg::Evi => VegetationIndex::Evi,
            IndexArg::Ndwi => VegetationIndex::Ndwi,
            IndexArg::Savi => VegetationIndex::Savi,
            IndexArg::Fvc => VegetationIndex::Fvc,
            IndexArg::Lai => VegetationIndex::Lai,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    // A subscriber can only be missing here if one was installed already
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Absolute paths are taken as-is; relative ones are tried against the
/// working directory, its parent and each search root, first hit wins.
fn resolve_input(path: &Path, search_dirs: &[PathBuf]) -> Result<PathBuf> {
    let not_found = || Error::MissingInput(format!("Image not found: {}", path.display()));
    if path.is_absolute() {
        if !path.exists() {
            return Err(not_found().into());
        }
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir().context("Cannot determine working directory")?;
    let mut roots = vec![cwd.clone()];
    if let Some(parent) = cwd.parent() {
        roots.push(parent.to_path_buf());
    }
    roots.extend(search_dirs.iter().cloned());

    roots
        .iter()
        .map(|root| root.join(path))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| not_found().into())
}

fn read_image(path: &Path, search_dirs: &[PathBuf]) -> Result<Vec<u8>> {
    let path = resolve_input(path, search_dirs)?;
    let pb = spinner("Reading image...");
    let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()));
    pb.finish_and_clear();
    let bytes = bytes?;
    debug!("Input: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("Invalid configuration {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Process exit status for a failed command: 2 when the caller's input or
/// session id was at fault, 1 for everything else
fn exit_status(err: &anyhow::Error) -> u8 {
    let input_fault = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<Error>())
        .any(Error::is_input_error);
    if input_fault {
        2
    } else {
        1
    }
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    eprintln!("{} saved to: {}", name, path.display());
    eprintln!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let report = ErrorReport::new(format!("{:#}", e));
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(_) => eprintln!("error: {:#}", e),
            }
            ExitCode::from(exit_status(&e))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        // ── Analysis ─────────────────────────────────────────────────
        Commands::Analyze {
            before,
            after,
            format,
            no_save,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(format) = format {
                config.image_format = format.into();
            }
            let analyzer = Analyzer::new(DecoderKind::from(cli.decoder).build(), config)?;

            let before = read_image(&before, &cli.search_dirs)?;
            let after = read_image(&after, &cli.search_dirs)?;

            let start = Instant::now();
            let pb = spinner("Analyzing...");
            let result = analyzer.analyze_bytes(Some(before.as_slice()), Some(after.as_slice()));
            pb.finish_and_clear();
            let result = result.context("Analysis failed")?;
            info!("Processing time: {:.2?}", start.elapsed());

            if !no_save {
                let store = JsonFileStore::new(&cli.results_dir).with_context(|| {
                    format!("Cannot open results directory {}", cli.results_dir.display())
                })?;
                store.persist(&result).context("Failed to store result")?;
                info!("Stored as {}", store.path_for(&result.session_id).display());
            }
            print_json(&result)?;
        }

        Commands::Results { session_id } => {
            let id = SessionId::parse(&session_id)?;
            let store = JsonFileStore::open(&cli.results_dir);
            let result = store.load(&id)?;
            print_json(&result)?;
        }

        // ── Static information ───────────────────────────────────────
        Commands::Metrics => {
            print_json(&index_descriptions())?;
        }

        Commands::Health => {
            debug!("Decoder backend: {}", cli.decoder);
            print_json(&serde_json::json!({ "status": "ok" }))?;
        }

        // ── Single image ─────────────────────────────────────────────
        Commands::Summary { input } => {
            let decoder = DecoderKind::from(cli.decoder);
            let analyzer = Analyzer::new(decoder.build(), load_config(cli.config.as_deref())?)?;
            let bytes = read_image(&input, &cli.search_dirs)?;
            let summary = analyzer
                .summarize_bytes(&bytes)
                .context("Failed to summarize image")?;
            if cli.verbose {
                eprintln!("{}", summary);
            }
            print_json(&summary)?;
        }

        Commands::Index {
            input,
            index,
            output,
        } => {
            let index = VegetationIndex::from(index);
            let decoder = DecoderKind::from(cli.decoder);
            let config = load_config(cli.config.as_deref())?;
            let analyzer = Analyzer::new(decoder.build(), config)?;

            let bytes = read_image(&input, &cli.search_dirs)?;
            let rgb = analyzer.decode(&bytes)?;
            let start = Instant::now();
            let raster = compute_index(&rgb, index, &analyzer.config().indices);
            let elapsed = start.elapsed();

            let pb = spinner("Writing output...");
            let written = write_index_tiff(&raster, &output);
            pb.finish_and_clear();
            written.context("Failed to write output")?;
            done(&index.to_string().to_uppercase(), &output, elapsed);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("before.png");
        std::fs::write(&file, b"x").unwrap();
        assert_eq!(resolve_input(&file, &[]).unwrap(), file);
        assert!(resolve_input(&dir.path().join("missing.png"), &[]).is_err());
    }

    #[test]
    fn test_resolve_search_dir() {
        let dir = tempfile::tempdir().unwrap();
        let name = format!("verileaf-{}.png", std::process::id());
        std::fs::write(dir.path().join(&name), b"x").unwrap();

        let found = resolve_input(Path::new(&name), &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(found, dir.path().join(&name));

        let err = resolve_input(Path::new("no-such-verileaf-image.png"), &[]).unwrap_err();
        assert_eq!(err.to_string(), "Missing input: Image not found: no-such-verileaf-image.png");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "verileaf",
            "--search-dir",
            "/data",
            "analyze",
            "a.png",
            "b.png",
            "--format",
            "png",
            "--no-save",
        ])
        .unwrap();
        assert_eq!(cli.search_dirs, vec![PathBuf::from("/data")]);
        assert!(matches!(
            cli.command,
            Commands::Analyze {
                no_save: true,
                format: Some(FormatArg::Png),
                ..
            }
        ));
    }

    #[test]
    fn test_cli_typed_choices() {
        let cli = Cli::try_parse_from(["verileaf", "--decoder", "tif", "index", "a.png", "lai", "out.tif"])
            .unwrap();
        assert_eq!(DecoderKind::from(cli.decoder), DecoderKind::Tiff);
        assert!(matches!(cli.command, Commands::Index { index: IndexArg::Lai, .. }));

        let cli = Cli::try_parse_from(["verileaf", "analyze", "a.png", "b.png", "-f", "jpg"]).unwrap();
        assert!(matches!(cli.command, Commands::Analyze { format: Some(FormatArg::Jpeg), .. }));

        assert!(Cli::try_parse_from(["verileaf", "--decoder", "gdal", "health"]).is_err());
        assert!(Cli::try_parse_from(["verileaf", "analyze", "a", "b", "--format", "gif"]).is_err());
        assert!(Cli::try_parse_from(["verileaf", "index", "a.png", "nbr", "out.tif"]).is_err());
    }

    #[test]
    fn test_results_leaves_missing_dir_alone() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("results");
        let cli = Cli::try_parse_from([
            "verileaf",
            "--results-dir",
            missing.to_str().unwrap(),
            "results",
            "abc123",
        ])
        .unwrap();

        let err = run(cli).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::SessionNotFound(_))));
        assert_eq!(exit_status(&err), 2);
        assert!(!missing.exists());
    }

    #[test]
    fn test_exit_status() {
        let missing = resolve_input(Path::new("/no/such/verileaf/image.png"), &[]).unwrap_err();
        assert_eq!(exit_status(&missing), 2);

        let decode = anyhow::Error::from(Error::Decode("bad header".into())).context("Analysis failed");
        assert_eq!(exit_status(&decode), 2);

        let unknown = anyhow::Error::from(Error::SessionNotFound("abc".into()));
        assert_eq!(exit_status(&unknown), 2);

        let internal = anyhow::Error::from(Error::Encode("jpeg".into()));
        assert_eq!(exit_status(&internal), 1);
        assert_eq!(exit_status(&anyhow::anyhow!("disk full")), 1);
    }
}
