use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use mindhelp::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "MindHelp Assessment Engine",
    about = "Serve or demonstrate the MindHelp wellness and certification assessments",
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
    /// Walk scripted wellness and certification runs through the engine
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seconds between sweeps that finalize timed-out runs
    #[arg(long, default_value_t = 1)]
    pub(crate) sweep_interval_secs: u64,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or_else(|| {
        Command::Serve(ServeArgs {
            sweep_interval_secs: 1,
            ..ServeArgs::default()
        })
    });

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
    }
}
