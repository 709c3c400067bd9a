use anyhow::{Context, Result};
use pipegen::cli::commands::{GenerateCommand, PipelineArg, TaskCommand, TasksCommand};
use pipegen::cli::output::*;
use pipegen::cli::{Cli, Command};
use pipegen::core::workspace::{self, InitAction};
use pipegen::core::{PipelineDefinition, PipelineError, PipelineRegistry};
use pipegen::fly::{execute_args, hand_off, FlyClient, FlyConfig, PipelineCommand};
use pipegen::ProjectConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set logging subscriber: {}", e);
    }

    if let Err(e) = run(&cli).await {
        eprintln!("{}{}", CROSS, style(format!("{:#}", e)).red());
        let code = e
            .downcast_ref::<PipelineError>()
            .map(PipelineError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let mut config = ProjectConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load project config {}", cli.config))?;
    if let Some(target) = &cli.target {
        config.fly_target = target.clone();
    }

    let registry = config.to_registry()?;
    let fly = FlyClient::new(FlyConfig::from_project(&config));

    match &cli.command {
        Command::Init => init_project(&config)?,
        Command::Generate(cmd) => generate(&config, &registry, &fly, cmd).await?,
        Command::Set(arg) => set_pipelines(&config, &registry, &fly, arg).await?,
        Command::Expose(arg) => {
            pipeline_command(&registry, &fly, PipelineCommand::Expose, arg).await?
        }
        Command::Hide(arg) => pipeline_command(&registry, &fly, PipelineCommand::Hide, arg).await?,
        Command::Pause(arg) => {
            pipeline_command(&registry, &fly, PipelineCommand::Pause, arg).await?
        }
        Command::Unpause(arg) => {
            pipeline_command(&registry, &fly, PipelineCommand::Unpause, arg).await?
        }
        Command::Destroy(arg) => {
            pipeline_command(&registry, &fly, PipelineCommand::Destroy, arg).await?
        }
        Command::Clean => clean(&registry)?,
        Command::Tasks(cmd) => list_tasks(&config, &registry, &fly, cmd).await?,
        Command::Task(cmd) => run_task(&config, &registry, &fly, cmd).await?,
    }

    Ok(())
}

fn init_project(config: &ProjectConfig) -> Result<()> {
    for action in workspace::init(config, Path::new("."))? {
        match action {
            InitAction::CreatedDirectory(dir) => {
                note(&format!("created directory {}", dir.display()))
            }
            InitAction::CreatedTemplate(path) => {
                note(&format!("created empty pipeline template {}", path.display()))
            }
            InitAction::AddedToGitignore(glob) => {
                note(&format!("adding '{}' to {}", glob, workspace::GITIGNORE_FILE))
            }
            InitAction::AlreadyIgnored(glob) => {
                note(&format!("found '{}' already present in {}", glob, workspace::GITIGNORE_FILE))
            }
        }
    }
    Ok(())
}

/// Pipelines a command applies to: one by name, or all of them
fn select<'a>(
    registry: &'a PipelineRegistry,
    name: Option<&str>,
) -> Result<Vec<&'a PipelineDefinition>> {
    match name {
        Some(name) => {
            let pipeline = registry.get(name).ok_or_else(|| {
                PipelineError::Configuration(format!("unknown pipeline '{}'", name))
            })?;
            Ok(vec![pipeline])
        }
        None => Ok(registry.pipelines().iter().collect()),
    }
}

/// Generate the selected pipelines in parallel, then format and validate
/// them in registration order
async fn generate_and_validate(
    config: &ProjectConfig,
    registry: &PipelineRegistry,
    fly: &FlyClient,
    name: Option<&str>,
    validate: bool,
) -> Result<Vec<PathBuf>> {
    let pipelines = select(registry, name)?;

    let generated = tokio::task::block_in_place(|| registry.generate_concurrently(&pipelines))?;
    for path in &generated {
        debug!("Generated {}", path.display());
    }

    for path in &generated {
        if config.format {
            running(&format!("format-pipeline {}", path.display()));
            fly.format_pipeline(path).await?;
        }
        if validate {
            running(&format!("validate-pipeline {}", path.display()));
            fly.validate_pipeline(path).await?;
        }
    }

    Ok(generated)
}

async fn generate(
    config: &ProjectConfig,
    registry: &PipelineRegistry,
    fly: &FlyClient,
    cmd: &GenerateCommand,
) -> Result<()> {
    let generated = generate_and_validate(
        config,
        registry,
        fly,
        cmd.pipeline.as_deref(),
        !cmd.no_validate,
    )
    .await?;
    for path in generated {
        println!("{}generated {}", CHECK, style(path.display()).bold());
    }
    Ok(())
}

async fn set_pipelines(
    config: &ProjectConfig,
    registry: &PipelineRegistry,
    fly: &FlyClient,
    arg: &PipelineArg,
) -> Result<()> {
    generate_and_validate(config, registry, fly, arg.pipeline.as_deref(), true).await?;

    let secrets = config.secrets_path();
    let secrets = if secrets.is_file() {
        Some(secrets.as_path())
    } else {
        println!(
            "{}no secrets file at {}, setting pipelines without it",
            WARN,
            style(secrets.display()).dim()
        );
        None
    };

    for pipeline in select(registry, arg.pipeline.as_deref())? {
        running(&format!("set-pipeline {}", pipeline.name()));
        fly.set_pipeline(pipeline.name(), pipeline.generated_path(), secrets)
            .await?;
    }
    Ok(())
}

async fn pipeline_command(
    registry: &PipelineRegistry,
    fly: &FlyClient,
    command: PipelineCommand,
    arg: &PipelineArg,
) -> Result<()> {
    for pipeline in select(registry, arg.pipeline.as_deref())? {
        running(&format!("{} {}", command.fly_command(), pipeline.name()));
        fly.pipeline_command(command, pipeline.name()).await?;
    }
    Ok(())
}

fn clean(registry: &PipelineRegistry) -> Result<()> {
    let removed = registry.clean()?;
    if removed.is_empty() {
        println!("{}nothing to clean", INFO);
    }
    for path in removed {
        note(&format!("removed {}", path.display()));
    }
    Ok(())
}

async fn list_tasks(
    config: &ProjectConfig,
    registry: &PipelineRegistry,
    fly: &FlyClient,
    cmd: &TasksCommand,
) -> Result<()> {
    generate_and_validate(config, registry, fly, None, true).await?;

    let mut tasks = registry.locator().list_tasks()?;
    if cmd.json {
        tasks.sort();
        let data = serde_json::json!({ "project": config.project, "tasks": tasks });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{}", format_task_list(&config.project, &tasks));
    }
    Ok(())
}

async fn run_task(
    config: &ProjectConfig,
    registry: &PipelineRegistry,
    fly: &FlyClient,
    cmd: &TaskCommand,
) -> Result<()> {
    generate_and_validate(config, registry, fly, None, true).await?;

    let found = registry
        .locator()
        .find_task(&cmd.address)?
        .ok_or_else(|| anyhow::anyhow!("could not find task `{}`", cmd.address))?;
    println!("{}", format_task_match(&found)?);

    let args = execute_args(&cmd.execute_args);
    running(&format!("execute {} {}", cmd.address, args.join(" ")));

    tokio::select! {
        result = hand_off(&found.step, fly, &args) => result?,
        _ = tokio::signal::ctrl_c() => anyhow::bail!("task `{}` interrupted", cmd.address),
    }

    println!("{}{} {}", CHECK, style(&cmd.address).bold(), style("succeeded").green());
    Ok(())
}
