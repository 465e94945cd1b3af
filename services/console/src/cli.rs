use crate::demo::{run_demo, DemoArgs};
use crate::generate::{run_generate, GenerateCommand};
use crate::report::{run_export, run_jobs, ExportArgs, JobsArgs};
use clap::{Parser, Subcommand};
use swt_placement::config::AppConfig;
use swt_placement::error::AppError;
use swt_placement::telemetry;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "placement-console",
    about = "Run the summer work travel placement ledger from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk through the placement lifecycle on demo data (default command)
    Demo(DemoArgs),
    /// Print the admin job overview with applicant statistics
    Jobs(JobsArgs),
    /// Export a job's recent applicants as CSV
    Export(ExportArgs),
    /// Draft job content with the generative content service
    Generate {
        #[command(subcommand)]
        command: GenerateCommand,
    },
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    debug!(?config, "configuration loaded");

    let command = cli
        .command
        .unwrap_or_else(|| Command::Demo(DemoArgs::default()));

    match command {
        Command::Demo(args) => run_demo(args, config.ledger),
        Command::Jobs(args) => run_jobs(args, config.ledger),
        Command::Export(args) => run_export(args, config.ledger),
        Command::Generate { command } => run_generate(command, &config.content).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_export_arguments() {
        let cli = Cli::try_parse_from([
            "placement-console",
            "export",
            "--job",
            "j2",
            "--output",
            "-",
            "--today",
            "2024-06-15",
        ])
        .expect("valid arguments");
        match cli.command {
            Some(Command::Export(args)) => {
                assert_eq!(args.job, "j2");
                assert_eq!(args.output.as_deref(), Some(std::path::Path::new("-")));
                assert!(args.today.is_some());
            }
            other => panic!("expected export command, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_sort() {
        assert!(Cli::try_parse_from(["placement-console", "jobs", "--sort", "salary"]).is_err());
    }
}
