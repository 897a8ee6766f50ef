// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;
mod run;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};

use spin_app::{init_logging, ConfigFile};
use spin_backend::{register_builtin_drivers_on, RegistrationContext};
use spin_core::recipe::JsonFileRepository;
use spin_core::{
    DynResult, Engine, MotorDriver, RecipeCatalog, RecipeDraft, RecipeId, RecipeStore, RunMode,
    SpinError, SpinResult, UserRegistry,
};
use spin_history::HistoryLog;

use config::CoaterConfig;
use run::{build_queue, check_loops, run_queue, RunRequest, StepArg};

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - spin coater recipe runner");

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage operators
    Users {
        #[command(subcommand)]
        action: UsersCommand,
    },
    /// Manage recipes
    Recipes {
        #[command(subcommand)]
        action: RecipesCommand,
    },
    /// Execute a sequence of recipes and waits
    Run(RunArgs),
    /// Show or clear the activity history
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
}

#[derive(Debug, Subcommand)]
enum UsersCommand {
    List,
    Add { name: String },
    Delete { name: String },
}

#[derive(Debug, Subcommand)]
enum RecipesCommand {
    /// Recipes visible to a user
    List {
        #[arg(short, long)]
        user: String,
    },
    Show {
        #[arg(short, long)]
        user: String,
        id: String,
    },
    /// Create a recipe, or update it when --id names an existing one
    Save(SaveArgs),
    Delete {
        #[arg(short, long)]
        user: String,
        id: String,
    },
}

#[derive(Debug, Args)]
struct SaveArgs {
    #[arg(short, long)]
    user: String,
    #[arg(long)]
    id: Option<String>,
    #[arg(short, long)]
    name: String,
    /// Target speed (RPM)
    #[arg(short, long)]
    speed: u32,
    /// Spin time (seconds)
    #[arg(short, long)]
    duration: u32,
    /// Ramp rate (RPM/s)
    #[arg(short, long, default_value_t = 0)]
    acceleration: u32,
    /// Make the recipe visible and editable for all users
    #[arg(long)]
    shared: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(short, long)]
    user: String,
    /// Repeat the whole sequence this many times
    #[arg(short, long)]
    loops: Option<u32>,
    /// Drive the motor instead of simulating
    #[arg(long)]
    live: bool,
    /// Override [device].driver
    #[arg(long)]
    driver: Option<String>,
    /// Steps in order: recipe:<id> or wait:<secs>
    #[arg(value_name = "STEP", required = true)]
    steps: Vec<StepArg>,
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    List,
    Clear,
}

/// Opened storage for one invocation.
struct App {
    cfg: CoaterConfig,
    history: Arc<HistoryLog>,
}

impl App {
    fn new(cfg: CoaterConfig) -> Self {
        let history = Arc::new(HistoryLog::new(cfg.storage.history_path()));
        Self { cfg, history }
    }

    fn users(&self) -> SpinResult<UserRegistry> {
        UserRegistry::open(&self.cfg.storage.users_path())
    }

    fn store(&self) -> SpinResult<RecipeStore> {
        let repo = JsonFileRepository::open(&self.cfg.storage.recipes_path())?;
        Ok(RecipeStore::new(Arc::new(repo), self.history.clone()))
    }

    /// Operators must be registered before acting.
    fn ensure_user(&self, user: &str) -> SpinResult<()> {
        if user.is_empty() {
            return Err(SpinError::validation("select a user first"));
        }
        if !self.users()?.contains(user) {
            return Err(SpinError::not_found(format!(
                "user '{}' (add it with `users add`)",
                user
            )));
        }
        Ok(())
    }

    fn driver(&self, name_override: Option<&str>) -> SpinResult<Arc<dyn MotorDriver>> {
        let mut registry = RegistrationContext::new();
        register_builtin_drivers_on(&mut registry);
        let name = name_override.unwrap_or(&self.cfg.device.driver);
        registry.build_driver(name, self.cfg.device.access_for(name))
    }

    fn users_command(&self, action: UsersCommand) -> SpinResult<()> {
        let mut users = self.users()?;
        match action {
            UsersCommand::List => {
                for name in users.list() {
                    println!("{}", name);
                }
            }
            UsersCommand::Add { name } => users.add(&name)?,
            UsersCommand::Delete { name } => users.remove(&name)?,
        }
        Ok(())
    }

    fn recipes_command(&self, action: RecipesCommand) -> SpinResult<()> {
        let store = self.store()?;
        match action {
            RecipesCommand::List { user } => {
                self.ensure_user(&user)?;
                print_catalog(&store.catalog(&user)?);
            }
            RecipesCommand::Show { user, id } => {
                self.ensure_user(&user)?;
                let recipe = store.get(&user, &RecipeId::from(id.as_str()))?;
                println!("id:           {}", id);
                println!("name:         {}", recipe.name);
                println!("speed:        {} RPM", recipe.speed);
                println!("duration:     {} s", recipe.duration);
                println!("acceleration: {} RPM/s", recipe.acceleration);
                println!("author:       {}", recipe.author);
                println!("shared:       {}", if recipe.shared { "yes" } else { "no" });
            }
            RecipesCommand::Save(args) => {
                self.ensure_user(&args.user)?;
                let id = args.id.map(RecipeId::from);
                let draft = RecipeDraft::new(args.name, args.speed, args.duration)
                    .with_acceleration(args.acceleration)
                    .shared(args.shared);
                let saved = store.save(&args.user, id.as_ref(), draft)?;
                println!("{}", saved);
            }
            RecipesCommand::Delete { user, id } => {
                self.ensure_user(&user)?;
                let recipe = store.delete(&user, &RecipeId::from(id.as_str()))?;
                println!("Deleted {}", recipe.name);
            }
        }
        Ok(())
    }

    fn history_command(&self, action: HistoryCommand) -> SpinResult<()> {
        match action {
            HistoryCommand::List => {
                for entry in self.history.entries()? {
                    println!("{}  {:<12} {}", entry.timestamp, entry.user, entry.action);
                }
            }
            HistoryCommand::Clear => {
                self.history.clear()?;
                info!("History cleared");
            }
        }
        Ok(())
    }

    async fn run_command(&self, args: RunArgs) -> SpinResult<()> {
        self.ensure_user(&args.user)?;
        let loops = check_loops(
            args.loops.unwrap_or(self.cfg.engine.default_loops),
            self.cfg.engine.max_loops,
        )?;

        let store = self.store()?;
        let mut queue = build_queue(&store, &args.user, &args.steps)?;
        for (index, step) in queue.steps().iter().enumerate() {
            info!("{:>3}. {}", index + 1, step);
        }

        let (mode, driver) = if args.live {
            (RunMode::Live, Some(self.driver(args.driver.as_deref())?))
        } else {
            (RunMode::Simulated, None)
        };
        let engine = Engine::new(driver, self.cfg.engine.timing());
        let request = RunRequest {
            user: &args.user,
            loop_count: loops,
            mode,
        };

        run_queue(
            &engine,
            &mut queue,
            &*self.history,
            request,
            ctrl_c(),
            |event| println!("{} {}", mode.label(), event),
        )
        .await?;
        Ok(())
    }
}

fn print_catalog(catalog: &RecipeCatalog) {
    if catalog.is_empty() {
        println!("(no recipes)");
        return;
    }
    for (title, entries) in [("Private", &catalog.private), ("Shared", &catalog.shared)] {
        if entries.is_empty() {
            continue;
        }
        println!("{}:", title);
        for entry in entries {
            println!(
                "  {}  {:<24} {:>6} RPM {:>5} s",
                entry.id, entry.label, entry.recipe.speed, entry.recipe.duration
            );
        }
    }
}

/// Resolves on Ctrl-C. A failed handler install never resolves.
async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", CoaterConfig::example_toml());
        return Ok(());
    }

    let (cfg, config_path) = CoaterConfig::resolve(cli.config.as_deref())?;
    cfg.validate()
        .map_err(|e| format!("Invalid spin-coater configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let Some(command) = cli.command else {
        return Err("no command given (see --help)".into());
    };

    let app = App::new(cfg);
    match command {
        Command::Users { action } => app.users_command(action)?,
        Command::Recipes { action } => app.recipes_command(action)?,
        Command::History { action } => app.history_command(action)?,
        Command::Run(args) => app.run_command(args).await?,
    }
    Ok(())
}
