// #![forbid(unsafe_code)]
// #![deny(non_upper_case_globals)]
// #![deny(non_camel_case_types)]
// #![deny(non_snake_case)]
// #![deny(unused_mut)]
// #![deny(unused_variables)]
// #![deny(dead_code)]
// #![deny(unused_imports)]
//#![deny(missing_docs)]
//#![deny(warnings)]

extern crate chrono;
extern crate derivative;
extern crate lazy_static;
extern crate serde_derive;

#[macro_use]
extern crate log;

mod app;
mod configuration;
mod reporter;
mod specification;
mod suite;
mod time;

use log::LevelFilter;
use serde_yaml::Mapping;
use std::{path::PathBuf, process::exit};
use structopt::StructOpt;

use self::app::{App, AppError};
use self::configuration::command_line::{LogLevel, Opt};
use self::configuration::settings::Settings;
use self::specification::registry::Registry;

const EXIT_FAILED: i32 = 1;
const EXIT_LOAD: i32 = 2;
const EXIT_ENGINE: i32 = 3;

fn main() {
    let mut options = Opt::from_args();

    if let Err(e) = init_logging(
        options.logging.take().unwrap_or(LogLevel::Info).into(),
        &options.log_output_file,
    ) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let settings = match Settings::load(options.config.as_deref()) {
        Ok(settings) => apply_overrides(settings, &options),
        Err(e) => {
            error!("Failed to load settings {}", e);
            exit(EXIT_LOAD);
        }
    };
    debug!("Initiated configuration {:#?}", settings);

    let params: Mapping = options
        .params
        .iter()
        .map(|(key, value)| (key.as_str().into(), value.clone()))
        .collect();

    let app = App::new(settings, Registry::with_builtins()).failfast(options.failfast);
    match app.run(&options.tests, &params) {
        Ok(tally) if tally.was_successful() => info!("OK"),
        Ok(_) => {
            error!("FAILED");
            exit(EXIT_FAILED);
        }
        Err(AppError::Load(e)) => {
            error!("Failed to load tests: {}", e);
            exit(EXIT_LOAD);
        }
        Err(e) => {
            error!("Run aborted: {}", e);
            exit(EXIT_ENGINE);
        }
    }
}

fn apply_overrides(mut settings: Settings, options: &Opt) -> Settings {
    if let Some(dir) = &options.result_dir {
        settings.result_root = dir.clone();
    }
    if let Some(dir) = &options.tmp_dir {
        settings.tmp_root = dir.clone();
    }
    if !options.path.is_empty() {
        settings.path = options
            .path
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
    }
    if !options.overlay.is_empty() {
        settings.overlays = options.overlay.clone();
    }
    settings
}

fn init_logging(level: LevelFilter, output: &Option<PathBuf>) -> Result<(), fern::InitError> {
    let mut dispatcher = fern::Dispatch::new()
        // Perform allocation-free log formatting
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}:{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record
                    .line()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "".to_owned()),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(log_file) = output {
        dispatcher = dispatcher.chain(fern::log_file(log_file)?)
    }
    dispatcher.apply()?;
    info!("Logging level {} enabled", level);
    Ok(())
}
