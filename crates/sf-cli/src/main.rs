//! SpoilerFree CLI
//!
//! Developer tool for inspecting URL classification, the options bag and the
//! spoiler-free policy outside the browser.

#[cfg(feature = "e2e")]
mod e2e;

use std::fs;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use sf_core::options::OptionMap;
use sf_core::{classify_url, duration, migration, parse_qualified_name, policy, Options};

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(about = "SpoilerFree developer tools")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a URL into platform, page type and channel
    Classify {
        url: String,
    },

    /// Parse or format durations
    Duration {
        #[command(subcommand)]
        command: DurationCommand,
    },

    /// Evaluate the spoiler-free state for a page
    Evaluate {
        /// Options JSON file (a storage dump)
        #[arg(short, long)]
        options: String,

        /// Page URL
        #[arg(short, long)]
        url: String,

        /// Qualified channel name overriding the one in the URL
        #[arg(short, long)]
        channel: Option<String>,
    },

    /// Migrate a storage dump to the current schema
    Migrate {
        /// Storage dump JSON file
        #[arg(short, long)]
        input: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Print the default options
    Defaults,

    /// Smoke-test the packaged extension in Chrome
    #[cfg(feature = "e2e")]
    E2e {
        /// Unpacked extension directory
        #[arg(short, long)]
        extension: String,

        #[arg(long, default_value = "http://localhost:9515")]
        chromedriver: String,

        #[arg(long)]
        headless: bool,
    },
}

#[derive(Subcommand)]
enum DurationCommand {
    /// Parse text like "1h2m3s" into seconds
    Parse { text: String },
    /// Format seconds as a compact duration
    Format { seconds: u64 },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Warn };
    env_logger::Builder::new().filter_level(level).format_timestamp(None).init();

    let result = match cli.command {
        Commands::Classify { url } => cmd_classify(&url),
        Commands::Duration { command } => cmd_duration(command),
        Commands::Evaluate { options, url, channel } => cmd_evaluate(&options, &url, channel.as_deref()),
        Commands::Migrate { input, output } => cmd_migrate(&input, output.as_deref()),
        Commands::Defaults => cmd_defaults(),
        #[cfg(feature = "e2e")]
        Commands::E2e {
            extension,
            chromedriver,
            headless,
        } => e2e::run_e2e(e2e::E2eOptions {
            chromedriver_url: chromedriver,
            extension_path: extension,
            headless,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn print_json(value: &Value) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| format!("Failed to encode JSON: {}", e))?;
    println!("{}", text);
    Ok(())
}

fn read_storage(path: &str) -> Result<OptionMap, String> {
    let content = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(format!("'{}' is not a JSON object", path)),
        Err(e) => Err(format!("Failed to parse '{}': {}", path, e)),
    }
}

fn cmd_classify(url: &str) -> Result<(), String> {
    let (platform, info) = classify_url(url).ok_or_else(|| format!("Unsupported URL: {}", url))?;
    print_json(&json!({
        "platform": platform.name(),
        "pageType": info.page_type.as_str(),
        "channel": info.channel.as_ref().map(|c| c.qualified_name()),
    }))
}

fn cmd_duration(command: DurationCommand) -> Result<(), String> {
    match command {
        DurationCommand::Parse { text } => println!("{}", duration::parse(&text)),
        DurationCommand::Format { seconds } => println!("{}", duration::format(seconds)),
    }
    Ok(())
}

fn cmd_evaluate(options_path: &str, url: &str, channel: Option<&str>) -> Result<(), String> {
    let content =
        fs::read_to_string(options_path).map_err(|e| format!("Failed to read '{}': {}", options_path, e))?;
    let options = Options::from_json_str(&content).map_err(|e| format!("Invalid options: {}", e))?;

    let classified = classify_url(url);
    let platform = classified.as_ref().map(|(p, _)| *p);
    let channel = match channel {
        Some(name) => Some(parse_qualified_name(name).ok_or_else(|| format!("Unknown channel: {}", name))?),
        None => classified.and_then(|(_, info)| info.channel),
    };
    log::debug!("Evaluating {:?} on {:?}", channel, platform);

    let state = policy::evaluate(&options, platform, channel.as_ref());
    print_json(&json!({
        "platform": platform.map(|p| p.name()),
        "channel": channel.as_ref().map(|c| c.qualified_name()),
        "sfmState": state,
    }))
}

fn cmd_migrate(input: &str, output: Option<&str>) -> Result<(), String> {
    let mut storage = read_storage(input)?;
    let from = migration::stored_version(&storage);
    let plan = migration::plan(&storage);

    if plan.is_empty() {
        eprintln!("Already at version {}", from);
    } else {
        plan.apply(&mut storage);
        eprintln!(
            "Migrated from version {}: {} written, {} removed",
            from,
            plan.set.len(),
            plan.remove.len()
        );
    }

    let text =
        serde_json::to_string_pretty(&Value::Object(storage)).map_err(|e| format!("Failed to encode JSON: {}", e))?;
    match output {
        Some(path) => fs::write(path, text + "\n").map_err(|e| format!("Failed to write '{}': {}", path, e)),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn cmd_defaults() -> Result<(), String> {
    print_json(&Value::Object(Options::default().to_storage()))
}
