use crate::server;
use crate::simulate::{run_simulation, SimulateArgs};
use clap::{Args, Parser, Subcommand};
use style_quiz::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Style Quiz",
    about = "Serve the style discovery quiz or replay a scripted round from the command line",
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
    /// Play a scripted round against a catalog and print every step
    Simulate(SimulateArgs),
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
        Command::Simulate(args) => run_simulation(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["style-quiz-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn simulate_collects_repeated_like_patterns() {
        let cli = Cli::try_parse_from([
            "style-quiz-api",
            "simulate",
            "--like",
            "loft",
            "--like",
            "nordic",
            "--seed",
            "9",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Simulate(args)) => {
                assert_eq!(args.like, vec!["loft", "nordic"]);
                assert_eq!(args.seed, Some(9));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
