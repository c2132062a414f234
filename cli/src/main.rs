use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use console::style;
use proctor_core::agent::{
    Agent, AgentCore, AgentOutcome, AgentState, ContextBuilder, ScratchpadUnitTester,
    SimpleUnitTester, ThrottleGuard, ToolRegistry,
};
use proctor_core::config::{self, AgentVariant, Config};
use proctor_core::traits::TracingObserver;
use proctor_core::{providers, tools};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod onboard;
mod templates;

const TAIL_MESSAGES: usize = 3;
const PREVIEW_CHARS: usize = 400;

#[derive(Parser)]
#[command(name = "proctor")]
#[command(
    about = "proctor - writes pytest suites for your modules and runs them until they pass",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure provider, API key and model
    Onboard,
    /// Run the unit-test agent against one or more modules
    Run {
        /// Module under test, relative to the workspace
        #[arg(short, long = "file", required = true)]
        files: Vec<String>,
        /// Replaces the generated task text
        #[arg(short, long)]
        task: Option<String>,
        /// simple or scratchpad
        #[arg(short, long)]
        variant: Option<AgentVariant>,
        #[arg(short, long)]
        max_iterations: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proctor_core=info,proctor=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let command = match cli.command {
        Some(command) => command,
        None if !config::config_exists() => Commands::Onboard,
        None => {
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard().map_err(|e| {
                eprintln!("❌ Onboarding failed: {}", e);
                anyhow::anyhow!("Onboarding failed: {}", e)
            })?;
            config::save_config(&onboard_config)?;
        }
        Commands::Run {
            files,
            task,
            variant,
            max_iterations,
        } => {
            let mut config = Config::load_or_init()?;
            apply_run_options(&mut config, &files, variant, max_iterations);

            let task =
                task.unwrap_or_else(|| templates::build_task(&files, &config.test_output_dir));
            if let Err(e) = run(&config, &task).await {
                eprintln!("❌ Error: {:#}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Command-line overrides. The first file under test becomes the throttle's
/// target module unless the config names one.
fn apply_run_options(
    config: &mut Config,
    files: &[String],
    variant: Option<AgentVariant>,
    max_iterations: Option<usize>,
) {
    if let Some(variant) = variant {
        config.variant = variant;
    }
    if let Some(max) = max_iterations {
        config.max_iterations = max;
    }
    if config.target_module.is_none() {
        config.target_module = files.first().cloned();
    }
}

fn build_registry(config: &Config) -> ToolRegistry {
    let workspace = &config.workspace_dir;

    let mut pytest = tools::RunPytestTool::new(workspace);
    let mut python_file = tools::RunPythonFileTool::new(workspace);
    if let Some(python) = &config.python {
        pytest = pytest.with_python(python.clone());
        python_file = python_file.with_python(python.clone());
    }

    ToolRegistry::new()
        .with_tool(tools::ListDirectoryTool::new(workspace))
        .with_tool(tools::ReadFileTool::new(workspace))
        .with_tool(tools::WriteFileTool::new(workspace))
        .with_tool(pytest)
        .with_tool(python_file)
        .with_tool(tools::JsonValidTool)
}

async fn run(config: &Config, task: &str) -> Result<()> {
    let test_dir = config.workspace_dir.join(&config.test_output_dir);
    std::fs::create_dir_all(&test_dir)
        .with_context(|| format!("Could not create test directory {}", test_dir.display()))?;

    let provider = providers::create_provider(config)?;
    let registry = build_registry(config);

    let context = match &config.prompt_template {
        Some(path) => ContextBuilder::from_template_file(&config.workspace_dir, path)?,
        None => ContextBuilder::new(
            &config.workspace_dir,
            templates::default_prompt(config.variant),
        ),
    };
    let system_prompt = context.build_system_prompt(&registry);

    let core = AgentCore::new(provider, Arc::new(registry))
        .with_max_iterations(config.max_iterations)
        .with_observer(Arc::new(TracingObserver));

    info!(
        variant = ?config.variant,
        max_iterations = config.max_iterations,
        "Starting agent"
    );

    println!("\n🤔 Writing tests...\n");
    match config.variant {
        AgentVariant::Simple => {
            let agent = SimpleUnitTester::new(core, system_prompt, config.test_output_dir.clone());
            let state = agent.iterate(task).await?;
            print_summary(&state);
        }
        AgentVariant::Scratchpad => {
            let guard = ThrottleGuard::new(config.throttle_config());
            let agent = ScratchpadUnitTester::new(core, system_prompt, guard)
                .with_prune_options(config.prune);
            let state = agent.iterate(task).await?;

            print_summary(&state.base);
            println!("\n{}", style("scratchpad:").bold());
            for entry in &state.scratchpad {
                println!("  - {}", entry);
            }
        }
    }

    Ok(())
}

fn print_summary(state: &AgentState) {
    let outcome = AgentOutcome::of(state);
    let outcome = match outcome {
        AgentOutcome::Finished => style(outcome.to_string()).green().bold(),
        AgentOutcome::BudgetExhausted => style(outcome.to_string()).yellow().bold(),
    };

    println!("{} {}", style("is_finished:").bold(), state.is_finished);
    println!("{} {}", style("outcome:").bold(), outcome);
    println!("{} {}", style("iterations:").bold(), state.iteration);

    println!("\n{}", style("messages (tail):").bold());
    let skip = state.messages.len().saturating_sub(TAIL_MESSAGES);
    for message in state.messages.iter().skip(skip) {
        let preview: String = message.content.chars().take(PREVIEW_CHARS).collect();
        println!("  [{}] {}", style(&message.role).cyan(), preview);
        if let Some(calls) = &message.tool_calls {
            for call in calls {
                println!(
                    "    -> {}({})",
                    call.name(),
                    call.function.arguments.to_text()
                );
            }
        }
    }
}
