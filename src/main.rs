use anyhow::Context;
use clap::Parser;
use pullio::agent::{AgentBootstrap, AgentContext};
use pullio::batch::{self, BatchReport};
use pullio::cli::Args;
use pullio::config::Config;
use pullio::git::GitCli;
use pullio::locate;
use pullio::output;
use pullio::repo::RepositoryTask;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = Args::parse().into_config();
    init_logging(&config);

    match run(&config) {
        Ok(report) if report.all_succeeded() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            output::print_fatal(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(config: &Config) -> anyhow::Result<BatchReport> {
    let agent = AgentBootstrap::system()
        .ensure_agent_and_key(&config.key_path, AgentContext::from_env())
        .context("SSH agent setup failed")?;
    output::print_agent_ready(agent.auth_sock(), config);

    output::print_working_dir(&config.start_path, config);
    let started = Instant::now();
    let tasks: Vec<RepositoryTask> = locate::find_repository_roots(&config.start_path)
        .context("Failed to find Git directories")?
        .iter()
        .map(|git_dir| RepositoryTask::from_git_dir(git_dir))
        .collect();
    output::print_discovery(tasks.len(), started.elapsed(), config);

    if tasks.is_empty() {
        return Ok(BatchReport::default());
    }

    let vcs = GitCli::new(config.git_timeout).with_agent(agent);
    let progress = output::create_batch_progress(tasks.len(), config);
    let started = Instant::now();
    let report = batch::update_repositories(&vcs, &tasks, config, &progress)?;
    progress.finish();

    output::print_summary(&report, started.elapsed(), config);
    Ok(report)
}
