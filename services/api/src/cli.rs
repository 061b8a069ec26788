use crate::demo::{
    run_demo, run_donor_eligibility, run_roster_import, run_screening_evaluation, DemoArgs,
    DonorEligibilityArgs, RosterImportArgs, ScreeningEvaluationArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hemoconnect::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "HemoConnect",
    about = "Run the HemoConnect blood-bank service or check donors from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Pre-donation screening tools
    Screening {
        #[command(subcommand)]
        command: ScreeningCommand,
    },
    /// Single-donor checks
    Donor {
        #[command(subcommand)]
        command: DonorCommand,
    },
    /// Donor roster tools
    Donors {
        #[command(subcommand)]
        command: DonorsCommand,
    },
    /// Walk a donor from registration through screening to an admitted donation
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ScreeningCommand {
    /// Evaluate vital signs without recording anything
    Evaluate(ScreeningEvaluationArgs),
}

#[derive(Subcommand, Debug)]
enum DonorCommand {
    /// Check age window and donation interval for a donor
    Eligibility(DonorEligibilityArgs),
}

#[derive(Subcommand, Debug)]
enum DonorsCommand {
    /// Validate a donor roster CSV and report rejected rows
    Import(RosterImportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Screening {
            command: ScreeningCommand::Evaluate(args),
        } => {
            run_screening_evaluation(args);
            Ok(())
        }
        Command::Donor {
            command: DonorCommand::Eligibility(args),
        } => {
            run_donor_eligibility(args);
            Ok(())
        }
        Command::Donors {
            command: DonorsCommand::Import(args),
        } => run_roster_import(args),
        Command::Demo(args) => run_demo(args),
    }
}
