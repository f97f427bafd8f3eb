use std::io;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use treasurer::channel::{Capture, ErrorChannel};
use treasurer::clerk::{APP_NAME, Clerk, DialogPrompt, Notifier};
use treasurer::cli::{self, Cli};
use treasurer::{Result, Service, Treasurer};

fn main() {
    let cli = Cli::parse();

    // overhear stderr, keeping the original for our own output
    let (capture, channel) = match Capture::install() {
        Ok((capture, channel)) => (Some(capture), Some(channel)),
        Err(e) => {
            eprintln!("treasurer: cannot capture stderr: {e}");
            (None, None)
        }
    };
    init_logging(&cli, capture.as_ref());

    let notifier = Notifier::new(APP_NAME);
    if let Err(err) = run(&cli, capture.as_ref(), channel) {
        notifier.close_shop(&err.to_string());
    }
    drop(capture);
}

fn init_logging(cli: &Cli, capture: Option<&Capture>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_directive().into());
    let layer = tracing_subscriber::fmt::layer().with_target(false);
    match capture.and_then(|c| c.original().ok()) {
        Some(stderr) => tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_writer(Mutex::new(stderr)))
            .init(),
        None => tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_writer(io::stderr))
            .init(),
    }
}

fn run(cli: &Cli, capture: Option<&Capture>, channel: Option<ErrorChannel>) -> Result<()> {
    let mut prompt = match cli.ask_pass_command() {
        Some(command) => DialogPrompt::new(command),
        None => DialogPrompt::zenity(APP_NAME),
    };
    if let Some(capture) = capture {
        prompt = prompt.with_stderr(capture.original()?);
    }
    let clerk = Clerk::new(Box::new(prompt), channel);
    let mut treasurer = Treasurer::new(Service::new()?, clerk, cli.keyring.as_str())?;
    cli::execute(cli, &mut treasurer, &mut io::stdout().lock())
}
