use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flux_lib::hotkeys::parse_shortcut;
use flux_lib::registrar::resolve_shortcut;
use flux_lib::{
    backend_from_config, run_daemon, CommandChannel, CommandRequest, Config, FileStore,
    KeyValueStore, RecorderCommand, Settings, HOTKEY_STORAGE_KEY,
};

#[derive(Parser)]
#[command(name = "flux")]
#[command(about = "global clip hotkey daemon")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// register the clip hotkey and wait for presses (default)
    Run,
    /// inspect or change the clip hotkey
    Hotkey {
        #[command(subcommand)]
        action: HotkeyAction,
    },
    /// call a backend command directly
    Invoke {
        command: String,
        /// argument as key=value; values that parse as json are sent as json,
        /// so quote strings that look like numbers or booleans: --arg 'name="42"'
        #[arg(long = "arg", value_name = "key=value")]
        args: Vec<String>,
        /// send every value as a plain string
        #[arg(long)]
        raw: bool,
    },
    /// print the resolved clip settings
    Settings,
    /// start the replay recorder
    Record {
        /// print the recorder command instead of running it
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum HotkeyAction {
    /// print the hotkey the daemon will register
    Show,
    /// store a new hotkey, e.g. "Ctrl+Shift+X"
    Set { spec: String },
    /// go back to the default hotkey
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load_or_create()?;

    // RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("starting flux v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_daemon(&config).await,
        Commands::Hotkey { action } => hotkey(&config, action),
        Commands::Invoke { command, args, raw } => invoke(&config, command, &args, raw).await,
        Commands::Settings => {
            let settings = Settings::load_from(&config.settings_path()?)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        Commands::Record { dry_run } => record(&config, dry_run).await,
    }
}

fn hotkey(config: &Config, action: HotkeyAction) -> Result<()> {
    let store = FileStore::new(config.storage_path()?);
    match action {
        HotkeyAction::Show => println!("{}", resolve_shortcut(&store)),
        HotkeyAction::Set { spec } => {
            parse_shortcut(&spec)?;
            store.set_item(HOTKEY_STORAGE_KEY, &spec)?;
            println!("clip hotkey set to {spec}, restart flux to apply");
        }
        HotkeyAction::Reset => {
            store.remove_item(HOTKEY_STORAGE_KEY)?;
            println!("clip hotkey reset to {}", resolve_shortcut(&store));
        }
    }
    Ok(())
}

async fn invoke(config: &Config, command: String, args: &[String], raw: bool) -> Result<()> {
    let mut request = CommandRequest::new(command);
    for arg in args {
        let (key, value) = parse_arg(arg, raw)?;
        request = request.arg(key, value);
    }

    let backend = backend_from_config(config)?;
    let result = backend.invoke(request).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn record(config: &Config, dry_run: bool) -> Result<()> {
    let settings = Settings::load_from(&config.settings_path()?)?;
    let recorder = RecorderCommand::from_settings(&settings)?;

    if dry_run {
        println!("{} {}", recorder.program, recorder.args.join(" "));
        return Ok(());
    }

    let status = recorder.run().await?;
    info!("recorder exited with {}", status);
    Ok(())
}

fn parse_arg(arg: &str, raw: bool) -> Result<(String, Value)> {
    let (key, text) = arg
        .split_once('=')
        .with_context(|| format!("argument {arg:?} is not key=value"))?;
    let value = if raw {
        Value::String(text.to_string())
    } else {
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    };
    Ok((key.to_string(), value))
}
