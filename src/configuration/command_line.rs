use crate::configuration::constants::cargo_env::CARGO_PKG_NAME;
use clap::arg_enum;
use log::LevelFilter;
use serde_yaml::Value;
use std::path::PathBuf;
use structopt::StructOpt;

arg_enum! {
    #[derive(Debug)]
    pub enum LogLevel {
        Off, Error, Warn, Info, Debug, Trace,
    }
}

#[derive(StructOpt, Debug)]
#[structopt(name = CARGO_PKG_NAME)]
pub struct Opt {
    /// Dotted names of the suites or test units to run
    #[structopt(required = true, min_values = 1)]
    pub tests: Vec<String>,

    /// Settings file. Supported: YAML, JSON, TOML, HJSON
    #[structopt(long, short = "c", parse(from_os_str), env = "TRELLIS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root under which result directories are created
    #[structopt(long, short = "r", parse(from_os_str))]
    pub result_dir: Option<PathBuf>,

    /// Root under which scratch directories are created
    #[structopt(long, short = "T", parse(from_os_str))]
    pub tmp_dir: Option<PathBuf>,

    /// Search path for suite specifications, may be repeated
    #[structopt(long, short = "p", parse(from_os_str))]
    pub path: Vec<PathBuf>,

    /// Overlay prefix tried before the plain name, may be repeated
    #[structopt(long, short = "o")]
    pub overlay: Vec<String>,

    /// Suite parameter given as key=value, may be repeated
    #[structopt(long = "param", short = "P", parse(try_from_str = parse_param))]
    pub params: Vec<(String, Value)>,

    /// Stop scheduling tests after the first failure
    #[structopt(long, short = "f")]
    pub failfast: bool,

    /// Sets a logging level
    #[structopt(case_insensitive = true, long, short = "L", possible_values = &LogLevel::variants(), env = "LOG_LEVEL")]
    pub logging: Option<LogLevel>,

    /// File to which application will write logs
    #[structopt(long, short = "O", env = "LOG_OUTPUT_FILE")]
    pub log_output_file: Option<PathBuf>,
}

impl Into<LevelFilter> for LogLevel {
    fn into(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Splits `key=value`, reading the value as a YAML scalar so that
/// `count=3` arrives as a number and `name=foo` as a string.
fn parse_param(text: &str) -> Result<(String, Value), String> {
    let mut split = text.splitn(2, '=');
    let key = split.next().unwrap_or_default().trim();
    let raw = split
        .next()
        .ok_or_else(|| format!("parameter '{}' is not of the form key=value", text))?;
    if key.is_empty() {
        return Err(format!("parameter '{}' has an empty key", text));
    }
    let value = serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
    Ok((key.to_owned(), value))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_param_value_is_read_as_yaml() {
        assert_eq!(
            parse_param("min=12").unwrap(),
            ("min".to_owned(), Value::from(12))
        );
        assert_eq!(
            parse_param("board=imx6 rev b").unwrap(),
            ("board".to_owned(), Value::from("imx6 rev b"))
        );
        assert_eq!(
            parse_param("url=a=b").unwrap(),
            ("url".to_owned(), Value::from("a=b"))
        );
    }

    #[test]
    fn test_param_without_value_is_rejected() {
        assert!(parse_param("lonely").is_err());
        assert!(parse_param("=3").is_err());
    }

    #[test]
    fn test_options_collect_repeated_flags() {
        let opt = Opt::from_iter(vec![
            "trellis", "-P", "a=1", "-P", "b=two", "-o", "board.x", "--failfast", "smoke.all",
        ]);
        assert_eq!(opt.tests, vec!["smoke.all".to_owned()]);
        assert_eq!(opt.params.len(), 2);
        assert_eq!(opt.overlay, vec!["board.x".to_owned()]);
        assert!(opt.failfast);
    }
}
