use animbox_cli::api::generate::download_name;
use animbox_cli::config::Config;
use animbox_dataset::PromptDataset;
use animbox_sandbox::{RenderOrchestrator, SourceUnit};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "animbox")]
#[command(about = "Animbox - render Manim animations in isolated sandboxes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP render service
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Address to bind (overrides HOST)
        #[arg(long)]
        host: Option<String>,
    },
    /// Render one local scene file and save the video
    Render {
        /// Python file containing a Manim scene
        file: PathBuf,
        /// Where to write the video (default: manim_animation_<timestamp>.mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List prompts from the dataset
    Prompts {
        /// Maximum number of prompts to show
        #[arg(long)]
        limit: Option<usize>,
        /// Dataset CSV (overrides DATASET_PATH)
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = handle_command(cli.command).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn handle_command(command: Commands) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;

    match command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }
            animbox_cli::init_tracing();

            println!("{}", "Starting Animbox server...".green().bold());
            println!(
                "{} http://{}:{}",
                "Server will run on".cyan(),
                config.host,
                config.port
            );
            animbox_cli::run_server(config).await
        }
        Commands::Render { file, output } => {
            animbox_cli::init_tracing();
            render_file(&config, file, output).await
        }
        Commands::Prompts { limit, dataset } => {
            let path = dataset.unwrap_or(config.dataset_path);
            let dataset = PromptDataset::load(&path)
                .with_context(|| format!("Failed to load dataset {}", path.display()))?;

            let prompts = dataset.list_prompts(limit);
            if prompts.is_empty() {
                println!("{}", "No prompts available".yellow());
                return Ok(());
            }
            for (index, prompt) in prompts.iter().enumerate() {
                println!("{} {}", format!("{:>4}.", index + 1).dimmed(), prompt);
            }
            println!("{} {}", "Total:".cyan(), prompts.len());
            Ok(())
        }
    }
}

async fn render_file(
    config: &Config,
    file: PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let source = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let provider = animbox_cli::build_provider(config)?;
    let orchestrator = RenderOrchestrator::new(provider);

    println!(
        "{} {} {} {}",
        "Rendering".green().bold(),
        file.display(),
        "with".dimmed(),
        orchestrator.provider_name()
    );

    let outcome = orchestrator.execute(&SourceUnit::new(source)).await;

    match outcome.artifact {
        Some(artifact) => {
            let output = output.unwrap_or_else(|| PathBuf::from(download_name()));
            tokio::fs::write(&output, &artifact.content)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "{} {} ({} bytes)",
                "Saved".green().bold(),
                output.display(),
                artifact.len()
            );
            Ok(())
        }
        None => {
            if !outcome.stdout.trim().is_empty() {
                eprintln!("{}\n{}", "stdout:".cyan(), outcome.stdout.trim_end());
            }
            if !outcome.stderr.trim().is_empty() {
                eprintln!("{}\n{}", "stderr:".cyan(), outcome.stderr.trim_end());
            }
            if let Some(report) = &outcome.provisioning {
                eprintln!("{} {}", "provisioning:".cyan(), report.summary());
            }
            bail!("Render produced no video")
        }
    }
}
