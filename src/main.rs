use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use replaycast_lib::compare::{delta_file_name, Comparator};
use replaycast_lib::config::{self, Config};
use replaycast_lib::export::{text, ExportFormat};
use replaycast_lib::recorder::storage;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "replaycast",
    version,
    about = "Inspect recorded UI scripts and compare screenshots"
)]
struct Cli {
    /// Config file (default: <config dir>/replaycast/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a screenshot against its reference
    Compare(CompareArgs),
    /// Print a recorded script
    Show(ShowArgs),
    /// Print the effective configuration as JSON
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Reference PNG
    reference: PathBuf,
    /// Captured PNG
    current: PathBuf,
    /// Minimum PSNR in dB (exclusive); defaults to the configured threshold
    #[arg(long)]
    threshold: Option<f64>,
    /// Paint identical pixels white in the delta image
    #[arg(long, action = ArgAction::SetTrue)]
    white_equals: bool,
    /// Delta image path (default: <reference>.delta.png)
    #[arg(long)]
    delta: Option<PathBuf>,
    /// Skip writing the delta image
    #[arg(long, action = ArgAction::SetTrue)]
    no_delta: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Also write it to the config file, filling in missing keys
    #[arg(long, action = ArgAction::SetTrue)]
    write: bool,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// script.json written by the recorder
    script: PathBuf,
    /// Output format: txt or json
    #[arg(long, default_value = "txt")]
    format: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.or_else(config::config_path);
    let config = match &config_path {
        Some(path) => config::load_from(path),
        None => Config::default(),
    };

    match cli.command {
        Commands::Compare(args) => command_compare(args, config.replay.threshold),
        Commands::Show(args) => command_show(args),
        Commands::Config(args) => command_config(args, &config, config_path),
    }
}

fn command_config(args: ConfigArgs, config: &Config, path: Option<PathBuf>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if args.write {
        let Some(path) = path else {
            bail!("no config directory on this platform; pass --config");
        };
        config::save(&path, config)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("failed to write config: {}", path.display()))?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn command_compare(args: CompareArgs, default_threshold: f64) -> Result<()> {
    let reference = image::open(&args.reference)
        .with_context(|| format!("cannot open reference image: {}", args.reference.display()))?
        .to_rgba8();
    let current = image::open(&args.current)
        .with_context(|| format!("cannot open current image: {}", args.current.display()))?
        .to_rgba8();

    let comparator = Comparator::new(args.threshold.unwrap_or(default_threshold))
        .with_white_equals(args.white_equals);
    let result = comparator.compare(&reference, &current);

    if let Some(mismatch) = result.size_mismatch {
        bail!(
            "image sizes differ: reference {}x{}, current {}x{}",
            mismatch.source.0,
            mismatch.source.1,
            mismatch.target.0,
            mismatch.target.1
        );
    }

    println!(
        "signal={:.3} dB threshold={} matched={}",
        result.score, comparator.threshold, result.matched
    );

    if result.matched {
        return Ok(());
    }

    if !args.no_delta {
        let out = args.delta.unwrap_or_else(|| {
            PathBuf::from(delta_file_name(&args.reference.to_string_lossy()))
        });
        if let Some(image) = result.delta {
            image
                .save(&out)
                .with_context(|| format!("failed to save delta image: {}", out.display()))?;
            println!("delta={}", out.display());
        }
    }
    bail!(
        "{} does not match {}",
        args.current.display(),
        args.reference.display()
    )
}

fn command_show(args: ShowArgs) -> Result<()> {
    let format = ExportFormat::from_str(&args.format).map_err(anyhow::Error::msg)?;
    let script = storage::read_script(&args.script)
        .with_context(|| format!("failed to read script: {}", args.script.display()))?;

    match format {
        ExportFormat::Json => println!("{}", serde_json::to_string_pretty(&script)?),
        ExportFormat::Text => {
            let title = args
                .script
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "script".to_string());
            print!("{}", text::generate_content(&title, &script));
        }
    }
    Ok(())
}
