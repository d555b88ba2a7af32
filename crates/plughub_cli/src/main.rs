//! Demo entry point for the plugin bus.
//!
//! # Responsibility
//! - Load the sample plugins in a fixed order and construct one instance.
//! - Print generated plugin documentation.

mod plugins;

use clap::{Parser, Subcommand, ValueEnum};
use plughub_core::{
    core_version, default_log_level, init_logging, BoxError, InstanceConfig, PluginHost,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plughub")]
#[command(about = "In-process plugin bus demo")]
#[command(version)]
struct Cli {
    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when omitted
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the core version
    Version,
    /// Construct an instance with the sample plugins and exercise it
    Demo {
        /// JSON instance configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print documentation for the sample plugins
    Docs {
        #[arg(short, long, value_enum, default_value_t = DocsFormat::Markdown)]
        format: DocsFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DocsFormat {
    Markdown,
    Json,
}

fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    match cli.command {
        Commands::Version => println!("plughub_core version={}", core_version()),
        Commands::Demo { config } => run_demo(config)?,
        Commands::Docs { format } => print_docs(format)?,
    }
    Ok(())
}

fn run_demo(config_path: Option<PathBuf>) -> Result<(), BoxError> {
    let config = match config_path {
        Some(path) => InstanceConfig::from_path(path)?,
        None => InstanceConfig::new().with_name("demo"),
    };

    let host = PluginHost::new();
    plugins::load_all(&host)?;
    host.register_initializer("cli.echo_ready", |instance| {
        instance.on(plugins::READY_EVENT, |_bus, args| {
            println!("ready: {}", json!(args));
            Ok(())
        })?;
        Ok(())
    })?;

    let instance = host.construct(config)?;
    let sum = instance.call("math", "add", &[json!(2), json!(3)])?;
    println!("math.add(2, 3) = {sum}");

    let status = instance.call_root("status", &[])?;
    println!("status = {}", serde_json::to_string_pretty(&status)?);
    log::info!(
        "event=demo module=cli status=ok instance_id={}",
        instance.id()
    );
    Ok(())
}

fn print_docs(format: DocsFormat) -> Result<(), BoxError> {
    let host = PluginHost::new();
    plugins::load_all(&host)?;
    let descriptors = host.descriptors();

    match format {
        DocsFormat::Markdown => {
            let pages: Vec<String> = descriptors
                .iter()
                .map(|descriptor| descriptor.to_markdown())
                .collect();
            print!("{}", pages.join("\n"));
        }
        DocsFormat::Json => println!("{}", serde_json::to_string_pretty(&descriptors)?),
    }
    Ok(())
}
