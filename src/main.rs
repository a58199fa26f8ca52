//! Mandala CLI - A hierarchical goal chart.

use clap::Parser;
use mandala::action_log::{self, ActionLog};
use mandala::cli::{Cli, Commands, ConfigCommands, TargetsCommands};
use mandala::commands::{self, Output};
use mandala::config::{
    ConfigOverrides, ConfigPaths, DEFAULT_LOG_LEVEL, OutputFormat, ResolvedConfig, resolve_config,
};
use mandala::storage::{get_data_root, get_storage_dir_in, validate_user};
use mandala::sync::YearlyActuals;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the diagnostic log format ("json" or "text").
const LOG_FORMAT_ENV: &str = "MANDALA_LOG_FORMAT";

/// Everything a command needs to locate the user's data.
struct Context {
    user: String,
    data_root: PathBuf,
    storage_dir: PathBuf,
    config_paths: ConfigPaths,
    overrides: ConfigOverrides,
    config: ResolvedConfig,
}

fn main() {
    let cli = Cli::parse();
    let flag_human = cli.human_readable;

    let context = match build_context(cli.user, flag_human) {
        Ok(context) => context,
        Err(e) => exit_with_error(&e, flag_human),
    };
    let human = context.config.output_format() == OutputFormat::Human;

    init_tracing(context.config.log_level());

    // Serialize command for logging
    let (cmd_name, args_json) = serialize_command(&cli.command);

    let start = Instant::now();
    let result = run_command(cli.command, &context, human);
    let duration = start.elapsed().as_millis() as u64;

    if context.config.action_log() {
        let (success, error) = match &result {
            Ok(_) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };
        action_log::log_action(
            &context.data_root,
            &ActionLog::new(&context.user, &cmd_name, &args_json, success, error, duration),
        );
    }

    if let Err(e) = result {
        exit_with_error(&e, human);
    }
}

fn exit_with_error(e: &mandala::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", e);
    } else {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    }
    process::exit(1);
}

/// Resolve the user, data directories and configuration.
///
/// User priority: --user flag > MANDALA_USER env var > login name > "default"
fn build_context(user: Option<String>, flag_human: bool) -> mandala::Result<Context> {
    let user = user.unwrap_or_else(default_user);
    validate_user(&user)?;

    let data_root = get_data_root()?;
    let storage_dir = get_storage_dir_in(&data_root, &user);
    let config_paths = ConfigPaths::for_storage_dir(&storage_dir);

    let mut overrides = ConfigOverrides::new().with_log_env();
    if flag_human {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }

    let config = resolve_config(&config_paths, &overrides)?;

    Ok(Context {
        user,
        data_root,
        storage_dir,
        config_paths,
        overrides,
        config,
    })
}

fn default_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "default".to_string())
}

/// Install the stderr diagnostic subscriber.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    // A subscriber may already be installed when embedded; keep the first one.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn run_command(
    command: Option<Commands>,
    context: &Context,
    human: bool,
) -> Result<(), mandala::Error> {
    let dir: &Path = &context.storage_dir;
    match command {
        None => output(&commands::summary(dir)?, human),

        Some(Commands::Show) => output(&commands::show(dir)?, human),

        Some(Commands::Open { id }) => output(&commands::open(dir, &id)?, human),

        Some(Commands::Back { to_major }) => output(&commands::back(dir, to_major)?, human),

        Some(Commands::Title { target, text }) => {
            output(&commands::title(dir, &target, &text)?, human)
        }

        Some(Commands::Toggle { id }) => output(&commands::toggle(dir, &id)?, human),

        Some(Commands::Progress { id }) => output(&commands::progress(dir, &id)?, human),

        Some(Commands::Targets { command }) => match command {
            TargetsCommands::Sync => output(&commands::targets_sync(dir)?, human),
            TargetsCommands::List => output(&commands::targets_list(dir)?, human),
        },

        Some(Commands::Actuals {
            year,
            revenue,
            gross_profit,
            operating_profit,
        }) => {
            let year = year.unwrap_or_else(|| context.config.default_year());
            let actuals = YearlyActuals {
                revenue_actual: revenue,
                gross_profit_actual: gross_profit,
                operating_profit_actual: operating_profit,
            };
            output(&commands::actuals(dir, year, actuals)?, human)
        }

        Some(Commands::Extract { title }) => output(&commands::extract(&title), human),

        Some(Commands::Reset) => output(&commands::reset(dir)?, human),

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => output(
                &commands::config_show(&context.config_paths, &context.overrides)?,
                human,
            ),
            ConfigCommands::Get { key } => output(
                &commands::config_get(&context.config_paths, &context.overrides, &key)?,
                human,
            ),
            ConfigCommands::Set { key, value } => {
                let session = context
                    .config_paths
                    .session
                    .clone()
                    .unwrap_or_else(|| dir.join(mandala::config::CONFIG_FILE));
                output(&commands::config_set(&session, &key, &value)?, human)
            }
        },
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Serialize command to extract name and arguments for logging.
fn serialize_command(command: &Option<Commands>) -> (String, serde_json::Value) {
    match command {
        None => ("summary".to_string(), serde_json::json!({})),

        Some(Commands::Show) => ("show".to_string(), serde_json::json!({})),

        Some(Commands::Open { id }) => ("open".to_string(), serde_json::json!({ "id": id })),

        Some(Commands::Back { to_major }) => (
            "back".to_string(),
            serde_json::json!({ "to_major": to_major }),
        ),

        Some(Commands::Title { target, text }) => (
            "title".to_string(),
            serde_json::json!({ "target": target, "text": text }),
        ),

        Some(Commands::Toggle { id }) => ("toggle".to_string(), serde_json::json!({ "id": id })),

        Some(Commands::Progress { id }) => {
            ("progress".to_string(), serde_json::json!({ "id": id }))
        }

        Some(Commands::Targets { command }) => match command {
            TargetsCommands::Sync => ("targets sync".to_string(), serde_json::json!({})),
            TargetsCommands::List => ("targets list".to_string(), serde_json::json!({})),
        },

        Some(Commands::Actuals {
            year,
            revenue,
            gross_profit,
            operating_profit,
        }) => (
            "actuals".to_string(),
            serde_json::json!({
                "year": year,
                "revenue": revenue,
                "gross_profit": gross_profit,
                "operating_profit": operating_profit,
            }),
        ),

        Some(Commands::Extract { title }) => (
            "extract".to_string(),
            serde_json::json!({ "title": title }),
        ),

        Some(Commands::Reset) => ("reset".to_string(), serde_json::json!({})),

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => ("config show".to_string(), serde_json::json!({})),
            ConfigCommands::Get { key } => {
                ("config get".to_string(), serde_json::json!({ "key": key }))
            }
            ConfigCommands::Set { key, value } => (
                "config set".to_string(),
                serde_json::json!({ "key": key, "value": value }),
            ),
        },
    }
}
