mod display;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use renewa_ai::{LoadOptions, LoadedModel, OnnxBackend, StartupReport};
use renewa_web::ServeConfig;
use tracing_subscriber::EnvFilter;

/// Default artifact file name, looked up beside the executable.
const MODEL_FILE: &str = "model.onnx";

/// Renewa: single-image classification behind a web form
#[derive(Parser, Debug)]
#[command(name = "renewa", version, about, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the upload form and JSON API (default)
    Serve(ServeArgs),
    /// Classify one image file and print the ranked labels
    Predict(PredictArgs),
    /// Print startup diagnostics and the label vocabulary
    Info(ModelArgs),
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Model artifact (defaults to model.onnx beside the executable)
    #[arg(long, env = "RENEWA_MODEL")]
    model: Option<PathBuf>,

    /// Log startup diagnostics before loading the model
    #[arg(
        long,
        env = "RENEWA_DIAGNOSTICS",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    diagnostics: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Host to bind to
    #[arg(long, env = "RENEWA_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "RENEWA_PORT", default_value_t = 7860)]
    port: u16,

    /// Ranked labels to show (0 = all)
    #[arg(long, env = "RENEWA_TOP_K", default_value_t = 3)]
    top_k: usize,

    /// Page title
    #[arg(long, env = "RENEWA_TITLE")]
    title: Option<String>,

    /// Text shown under the title
    #[arg(long, env = "RENEWA_DESCRIPTION")]
    description: Option<String>,

    /// Largest accepted upload, in MiB
    #[arg(long, env = "RENEWA_MAX_UPLOAD_MIB", default_value_t = 10)]
    max_upload_mib: usize,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Ranked labels to print (0 = all)
    #[arg(long, default_value_t = 0)]
    top_k: usize,

    /// Image to classify
    image: PathBuf,
}

impl ModelArgs {
    fn path(&self) -> PathBuf {
        self.model.clone().unwrap_or_else(default_model_path)
    }

    fn load(&self) -> anyhow::Result<LoadedModel> {
        let options = LoadOptions {
            diagnostics: self.diagnostics,
        };
        Ok(renewa_ai::load::<OnnxBackend>(&self.path(), &options)?)
    }
}

impl ServeArgs {
    fn config(&self) -> ServeConfig {
        let defaults = ServeConfig::default();
        ServeConfig {
            host: self.host.clone(),
            port: self.port,
            top_k: self.top_k,
            title: self.title.clone().unwrap_or(defaults.title),
            description: self.description.clone().unwrap_or(defaults.description),
            max_upload_bytes: self.max_upload_mib.saturating_mul(1024 * 1024),
        }
    }
}

/// `model.onnx` next to the running binary, or in the working directory if
/// the binary's location is unknown.
fn default_model_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(MODEL_FILE)))
        .unwrap_or_else(|| PathBuf::from(MODEL_FILE))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("renewa v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(Command::Serve(args)) => serve(args).await,
        Some(Command::Predict(args)) => predict(args),
        Some(Command::Info(args)) => info(args),
        None => serve(cli.serve).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = args.config();
    // Fail before binding: there is nothing to serve without a model.
    let model = args.model.load()?;
    renewa_web::serve(config, model).await
}

fn predict(args: PredictArgs) -> anyhow::Result<()> {
    let mut model = args.model.load()?;
    let image = image::open(&args.image)
        .with_context(|| format!("reading image {}", args.image.display()))?;

    let prediction = model.predict(&image)?;
    print!(
        "{}",
        display::prediction_card(&args.image.display().to_string(), &prediction, args.top_k)
    );
    Ok(())
}

fn info(args: ModelArgs) -> anyhow::Result<()> {
    let path = args.path();
    let report = StartupReport::for_backend::<OnnxBackend>(&path);
    let model = args.load()?;
    print!(
        "{}",
        display::model_card(&report, model.backend(), model.vocabulary())
    );
    Ok(())
}
