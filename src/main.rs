use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use smart_bin_detector::{
    classify::{ClassificationPipeline, ClassifyOptions},
    config::{Config, DEFAULT_CONFIDENCE},
    web::{init_state, serve},
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smart-bin-detector")]
#[command(about = "Waste bin fill-level classification service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    common: CommonArgs,

    /// 无子命令时按 serve 处理
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Args, Clone)]
struct CommonArgs {
    /// Model artifact candidates, tried in order
    #[arg(long = "model", env = "MODEL_PATH", global = true)]
    models: Vec<PathBuf>,

    /// TTF/OTF font used for detection labels
    #[arg(long, env = "LABEL_FONT", global = true)]
    label_font: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and dashboard (default)
    Serve(ServeArgs),
    /// Classify a single image and print the result as JSON
    Classify(ClassifyArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    bind: String,

    /// Number of worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Enable development mode
    #[arg(long)]
    dev: bool,
}

#[derive(Args)]
struct ClassifyArgs {
    /// Image to classify
    image: PathBuf,

    /// Confidence threshold in (0, 1)
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f32,

    /// Write the annotated image to this PNG file
    #[arg(long)]
    annotate_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.common.log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Some(Command::Classify(args)) => run_classify(cli.common, args),
        Some(Command::Serve(args)) => run_serve(cli.common, args),
        None => run_serve(cli.common, cli.serve),
    }
}

fn run_serve(common: CommonArgs, args: ServeArgs) -> Result<()> {
    tracing::info!("Starting Smart Bin Detector service...");
    tracing::info!("Bind address: {}", args.bind);

    let config = Config::new(args.bind, common.models, common.label_font, args.workers, args.dev)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(serve(config))?;
    Ok(())
}

fn run_classify(common: CommonArgs, args: ClassifyArgs) -> Result<()> {
    let config = Config::new(String::new(), common.models, common.label_font, Some(1), false)?;
    let state = init_state(config)?;

    let bytes = std::fs::read(&args.image).with_context(|| format!("failed to read {}", args.image.display()))?;
    let filename = args.image.file_name().map(|n| n.to_string_lossy().to_string());
    let options = ClassifyOptions {
        confidence_threshold: args.confidence,
        annotate: args.annotate_out.is_some(),
    };

    let model = state.models.model();
    let mut prediction =
        ClassificationPipeline::process_bytes(model.as_ref(), state.models.annotator(), &bytes, filename, options)?;

    if let (Some(path), Some(annotated)) = (&args.annotate_out, &prediction.annotated) {
        annotated
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Annotated image written to {}", path.display());
    }

    // 标注图已写入文件，不再内联输出
    prediction.response.annotated_image = None;
    println!("{}", serde_json::to_string_pretty(&prediction.response)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_reads_serve_options() {
        let cli = Cli::try_parse_from(["smart-bin-detector", "--bind", "127.0.0.1:9000", "--workers", "3", "--dev"])
            .unwrap();

        assert!(cli.command.is_none());
        assert_eq!(cli.serve.bind, "127.0.0.1:9000");
        assert_eq!(cli.serve.workers, Some(3));
        assert!(cli.serve.dev);
    }

    #[test]
    fn bind_address_falls_back_to_env_then_default() {
        std::env::set_var("BIND_ADDR", "127.0.0.1:9100");
        let cli = Cli::try_parse_from(["smart-bin-detector"]).unwrap();
        std::env::remove_var("BIND_ADDR");
        assert!(cli.command.is_none());
        assert_eq!(cli.serve.bind, "127.0.0.1:9100");

        let cli = Cli::try_parse_from(["smart-bin-detector"]).unwrap();
        assert_eq!(cli.serve.bind, "0.0.0.0:8000");
    }

    #[test]
    fn serve_subcommand_still_parses() {
        let cli = Cli::try_parse_from(["smart-bin-detector", "serve", "--bind", "127.0.0.1:9001"]).unwrap();
        match cli.command {
            Some(Command::Serve(args)) => assert_eq!(args.bind, "127.0.0.1:9001"),
            _ => panic!("expected serve subcommand"),
        }
    }

    #[test]
    fn classify_subcommand_parses() {
        let cli = Cli::try_parse_from(["smart-bin-detector", "classify", "bin.jpg", "--confidence", "0.4"]).unwrap();
        match cli.command {
            Some(Command::Classify(args)) => {
                assert_eq!(args.image, PathBuf::from("bin.jpg"));
                assert!((args.confidence - 0.4).abs() < f32::EPSILON);
            }
            _ => panic!("expected classify subcommand"),
        }
    }
}
