use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use skiff_wm::common::config::{Config, config_file};
use skiff_wm::common::log;
use skiff_wm::reactor::Reactor;
use skiff_wm::sys::x11::X11Server;
use tracing::{error, info};

#[derive(Parser)]
#[command(version, about = "A reactive tiling window manager for X11")]
struct Cli {
    /// Configuration file to use instead of the per-user default.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Check the configuration file and report any problems without
    /// starting the window manager.
    #[arg(long)]
    validate: bool,

    /// X display to manage. Defaults to `$DISPLAY`.
    #[arg(long)]
    display: Option<String>,
}

fn main() -> ExitCode {
    let opt: Cli = Parser::parse();

    if std::env::var_os("RUST_BACKTRACE").is_none() {
        // SAFETY: We are single threaded at this point.
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }
    log::init_logging();

    if opt.validate {
        return validate(opt.config);
    }

    let config = Config::load_or_default(opt.config.as_deref());
    let server = match X11Server::connect(opt.display.as_deref()) {
        Ok(server) => server,
        Err(e) => {
            error!("Could not start: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match Reactor::new(config, server).run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Lost the display server");
            ExitCode::FAILURE
        }
    }
}

fn validate(path: Option<PathBuf>) -> ExitCode {
    let Some(path) = path.or_else(config_file) else {
        error!("No configuration directory available");
        return ExitCode::FAILURE;
    };
    let config = match Config::read(&path) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %path.display(), "Could not load configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    let issues = config.validate();
    if issues.is_empty() {
        info!(path = %path.display(), "Configuration is valid");
        return ExitCode::SUCCESS;
    }
    for issue in &issues {
        println!("{issue}");
    }
    ExitCode::FAILURE
}
