use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use scaffold::commands::add_api_extension::{self, AddApiExtensionOptions};
use scaffold::commands::add_dashboard::{self, AddDashboardOptions};
use scaffold::commands::add_entity::{self, AddEntityOptions};
use scaffold::commands::add_job_queue::{self, AddJobQueueOptions};
use scaffold::commands::add_service::{self, AddServiceOptions};
use scaffold::commands::add_ui_extension::{self, AddUiExtensionOptions};
use scaffold::commands::config::{self, ConfigAction};
use scaffold::commands::create_plugin::{self, CreatePluginOptions};
use scaffold::commands::{execute, Session};
use scaffold::help;
use scaffold::install::{NoopInstaller, PackageInstaller, SystemInstaller};
use scaffold::prompt::TerminalPrompter;
use scaffold::CommandResult;
use scaffold_ast::{ManipulationSettings, Project};
use scaffold_config::Config;
use scaffold_logger as logger;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scaffold")]
#[command(about = "Add entities, services and API extensions to Vendure plugins", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalOpts,
}

#[derive(Args, Debug, Clone)]
struct GlobalOpts {
    /// Increase output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print the command result as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Project directory or tsconfig file (default: current directory)
    #[arg(long, value_name = "PATH", global = true)]
    project: Option<PathBuf>,

    /// Never prompt; missing options are errors
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Do not install npm packages the new code needs
    #[arg(long, global = true)]
    skip_install: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a feature to an existing plugin
    Add {
        #[command(subcommand)]
        command: AddCommand,
    },
    /// Create a new plugin
    Create {
        #[command(subcommand)]
        command: CreateCommand,
    },
    /// Read or change scaffold settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum AddCommand {
    /// Add an entity
    Entity(AddEntityOptions),
    /// Add a service
    Service(AddServiceOptions),
    /// Add a job queue to a service
    JobQueue(AddJobQueueOptions),
    /// Add a GraphQL API extension
    ApiExtension(AddApiExtensionOptions),
    /// Add an Admin UI extension
    UiExtension(AddUiExtensionOptions),
    /// Add a dashboard extension
    Dashboard(AddDashboardOptions),
}

#[derive(Subcommand)]
enum CreateCommand {
    /// Create a plugin
    Plugin(CreatePluginOptions),
}

fn main() {
    let cli = Cli::parse();
    let verbosity = if cli.global.quiet || cli.global.json {
        0
    } else {
        1 + cli.global.verbose
    };
    logger::init(verbosity, None);
    init_tracing(&cli.global);

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            logger::error(&format!("{err:#}"));
            logger::debug(&format!("{err:?}"));
            1
        }
    };
    process::exit(code);
}

fn init_tracing(global: &GlobalOpts) {
    let default = match (global.quiet || global.json, global.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_env("SCAFFOLD_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<i32> {
    let Some(command) = cli.command else {
        help::show_overview();
        return Ok(0);
    };
    let global = cli.global;

    let result = match command {
        Commands::Config { action } => match config::run(&action) {
            Ok(result) => result,
            Err(err) => CommandResult::from_error(&err),
        },
        Commands::Add { command } => {
            let mut session = open_session(&global)?;
            execute(&mut session, |session| match &command {
                AddCommand::Entity(options) => add_entity::run(session, options),
                AddCommand::Service(options) => add_service::run(session, options),
                AddCommand::JobQueue(options) => add_job_queue::run(session, options),
                AddCommand::ApiExtension(options) => add_api_extension::run(session, options),
                AddCommand::UiExtension(options) => add_ui_extension::run(session, options),
                AddCommand::Dashboard(options) => add_dashboard::run(session, options),
            })
        }
        Commands::Create {
            command: CreateCommand::Plugin(options),
        } => {
            let mut session = open_session(&global)?;
            execute(&mut session, |session| create_plugin::run(session, &options))
        }
    };

    if global.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?
        );
    } else {
        help::show_result(&result);
    }
    Ok(result.exit_code)
}

fn open_session(global: &GlobalOpts) -> Result<Session> {
    let config = Config::load().context("Failed to load scaffold configuration")?;
    let start = match &global.project {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let settings = ManipulationSettings::from_config(&config);
    let project = Project::resolve(&start, settings)
        .with_context(|| format!("Failed to load the TypeScript project at {}", start.display()))?;
    logger::debug(&format!(
        "Project root {} ({} files)",
        project.root_dir().display(),
        project.paths().len()
    ));

    let interactive = !global.non_interactive && atty::is(atty::Stream::Stdin);
    let installer: Box<dyn PackageInstaller> = if global.skip_install {
        Box::new(NoopInstaller)
    } else {
        Box::new(SystemInstaller::new(config.package_manager.clone()))
    };
    Ok(Session::new(
        project,
        Box::new(TerminalPrompter::new(config.prompt_timeout())),
        installer,
        interactive,
    ))
}
