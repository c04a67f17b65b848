use anyhow::Result;
use clap::Parser;
use fleetrun::cmd::fleet::{Args, Commands};
use fleetrun::plan::{self, RunPlan};
use fleetrun::{config, render_command};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn display_plan(plan: &RunPlan) {
    let config = &plan.config;
    println!("---------- RUN PLAN ----------");
    println!("workers:\t{}", config.num_clients);
    println!("base dir:\t{}", config.base_dir);
    if let Some(branch) = &config.branch {
        println!("branch:\t\t{} (pull: {})", branch, config.pull);
    }
    if let Some(files) = &config.files {
        println!("archive:\t{}", files.display());
    }
    if let Some(key) = &config.read_key {
        println!("read key:\t{}", key.display());
    }
    for (index, command) in plan.commands().iter().enumerate() {
        println!("[{}]\t{}", index, command);
    }
    println!("------------------------------");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Commands::Run {
            config_file,
            update,
        } => {
            let mut config = config::load_config(&config_file)?;
            if update {
                config.apply_overrides(&args.fleet);
            }
            let plan = plan::prepare(config)?;
            display_plan(&plan);
        }
        Commands::Config { save, run } => {
            let config = config::build_config(&args.fleet)?;
            // Dry run: echo the values back so the user can iterate.
            println!("{}", serde_json::to_string_pretty(&config)?);
            if let Some(template) = &config.command_str {
                info!("worker 0 would run: {}", render_command(template, 0));
            }
            if let Some(path) = save {
                let written = config::save_config(&config, &path)?;
                info!("saved configuration to {}", written.display());
            }
            if run {
                let plan = plan::prepare(config)?;
                display_plan(&plan);
            }
        }
    }

    Ok(())
}
