use crate::app::case::{CaseReport, TestCase};
use crate::app::context::ExecutionContext;
use crate::specification::registry::{CaseType, Registry, UnitArgs};
use serde::de::DeserializeOwned;
use serde_derive::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

const DEFAULT_VARIABLE: &str = "MACHINE";

pub fn register(registry: &mut Registry) {
    registry
        .register_case_type("builtin.sleep", CaseType::new("sleep", Sleep::build))
        .register_case_type(
            "builtin.platform_information",
            CaseType::new("platform_information", PlatformInformation::build),
        )
        .register_case_type("builtin.command", CaseType::new("command", Shell::build));
}

fn parse<T: DeserializeOwned>(params: &Mapping) -> Result<T, String> {
    serde_yaml::from_value(Value::Mapping(params.clone())).map_err(|e| format!("invalid parameters: {}", e))
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct SleepParams {
    s: f64,
    ms: f64,
    us: f64,
    #[serde(deserialize_with = "crate::configuration::deserialize::duration::deserialize")]
    duration: Duration,
}

impl SleepParams {
    fn total(&self) -> Result<Duration, String> {
        let seconds = self.s + self.ms / 1e3 + self.us / 1e6;
        Duration::try_from_secs_f64(seconds)
            .ok()
            .and_then(|period| period.checked_add(self.duration))
            .ok_or_else(|| format!("cannot sleep for {} seconds", seconds))
    }
}

/// Waits, typically between two steps talking to a device.
struct Sleep {
    period: Duration,
    params: Mapping,
}

impl Sleep {
    fn build(_method: &str, args: &UnitArgs) -> Result<Box<dyn TestCase>, String> {
        let period = parse::<SleepParams>(args.params)?.total()?;
        Ok(Box::new(Sleep {
            period,
            params: args.params.clone(),
        }))
    }
}

impl TestCase for Sleep {
    fn description(&self) -> String {
        format!("Sleep for {:.3} seconds", self.period.as_secs_f64())
    }

    fn params(&self) -> Option<Mapping> {
        Some(self.params.clone())
    }

    fn execute(&self, _context: &ExecutionContext) -> CaseReport {
        debug!("Sleeping {:?}", self.period);
        std::thread::sleep(self.period);
        CaseReport::pass()
    }
}

/// Records what the run executes on.
struct PlatformInformation {
    information: Mapping,
}

impl PlatformInformation {
    fn build(_method: &str, args: &UnitArgs) -> Result<Box<dyn TestCase>, String> {
        let variable = args
            .param::<String>("variable")?
            .unwrap_or_else(|| DEFAULT_VARIABLE.to_owned());
        let mut information = Mapping::new();
        information.insert("os".into(), std::env::consts::OS.into());
        information.insert("family".into(), std::env::consts::FAMILY.into());
        information.insert("arch".into(), std::env::consts::ARCH.into());
        if let Some(value) = args.settings.variable(&variable) {
            information.insert(variable.to_lowercase().into(), value.clone());
        }
        if let Some(device) = args.device() {
            information.insert("device".into(), Value::Mapping(device.clone()));
        }
        Ok(Box::new(PlatformInformation { information }))
    }
}

impl TestCase for PlatformInformation {
    fn description(&self) -> String {
        "Platform information".to_owned()
    }

    fn execute(&self, _context: &ExecutionContext) -> CaseReport {
        CaseReport::pass().with_output(Value::Mapping(self.information.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct CommandParams {
    #[serde(with = "crate::configuration::deserialize::string_or_list")]
    command: Vec<String>,
    /// Working directory, the scratch directory of the execution by default.
    #[serde(default)]
    cwd: Option<PathBuf>,
}

/// Runs an external command. Passes iff it exits with status 0; its
/// standard output becomes the output of the test.
struct Shell {
    argv: Vec<String>,
    cwd: Option<PathBuf>,
    params: Mapping,
}

impl Shell {
    fn build(_method: &str, args: &UnitArgs) -> Result<Box<dyn TestCase>, String> {
        let params: CommandParams = parse(args.params)?;
        let argv: Vec<String> = match params.command.as_slice() {
            [line] => line.split_whitespace().map(str::to_owned).collect(),
            argv => argv.to_vec(),
        };
        if argv.is_empty() {
            return Err("command must not be empty".to_owned());
        }
        Ok(Box::new(Shell {
            argv,
            cwd: params.cwd,
            params: args.params.clone(),
        }))
    }
}

impl TestCase for Shell {
    fn description(&self) -> String {
        format!("Run `{}`", self.argv.join(" "))
    }

    fn params(&self) -> Option<Mapping> {
        Some(self.params.clone())
    }

    fn execute(&self, context: &ExecutionContext) -> CaseReport {
        let cwd = self
            .cwd
            .clone()
            .unwrap_or_else(|| context.tmp_dir().to_path_buf());
        debug!("Running {:?} in {}", self.argv, cwd.display());
        let output = match Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .current_dir(&cwd)
            .output()
        {
            Ok(output) => output,
            Err(e) => return CaseReport::error(format!("cannot run {}: {}", self.argv[0], e)),
        };
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let report = if output.status.success() {
            CaseReport::pass()
        } else {
            CaseReport::fail(format!(
                "{} exited with {}\n{}",
                self.argv[0],
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ))
        };
        report.with_output(stdout)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::app::case::Verdict;
    use crate::configuration::settings::Settings;
    use crate::specification::policy::Policy;

    fn build(
        constructor: fn(&str, &UnitArgs) -> Result<Box<dyn TestCase>, String>,
        params: &str,
        settings: &Settings,
    ) -> Result<Box<dyn TestCase>, String> {
        let params: Mapping = serde_yaml::from_str(params).unwrap();
        let policy = Policy::default();
        let args = UnitArgs {
            params: &params,
            policy: &policy,
            settings,
        };
        constructor("run", &args)
    }

    fn context(dir: &tempfile::TempDir) -> ExecutionContext {
        let context = ExecutionContext::new(dir.path().join("res"), dir.path().join("tmp"));
        context.create().unwrap();
        context
    }

    #[test]
    fn test_sleep_adds_up_units() {
        let params: SleepParams = parse(&serde_yaml::from_str("{s: 1, ms: 500, duration: 2s}").unwrap()).unwrap();
        assert_eq!(params.total().unwrap(), Duration::from_millis(3500));
        let params: SleepParams = parse(&Mapping::new()).unwrap();
        assert_eq!(params.total().unwrap(), Duration::default());
        assert!(build(Sleep::build, "{s: -1}", &Settings::default()).is_err());
        assert!(build(Sleep::build, "{duration: soon}", &Settings::default()).is_err());
        assert!(build(Sleep::build, "{s: 1e30}", &Settings::default()).is_err());
        assert!(build(Sleep::build, "{s: .nan}", &Settings::default()).is_err());
    }

    #[test]
    fn test_platform_information_reports_settings() {
        let mut settings = Settings::default();
        settings.variables.insert("machine".into(), "rpi4".into());
        let case = build(PlatformInformation::build, "{}", &settings).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let report = case.execute(&context(&dir));
        assert_eq!(report.verdict, Verdict::Pass);
        let output = report.output.unwrap();
        assert_eq!(output["machine"], Value::from("rpi4"));
        assert_eq!(output["os"], Value::from(std::env::consts::OS));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_status_decides() {
        let settings = Settings::default();
        let dir = tempfile::tempdir().unwrap();

        let echo = build(Shell::build, "{command: echo hello}", &settings).unwrap();
        let report = echo.execute(&context(&dir));
        assert_eq!(report.verdict, Verdict::Pass);
        assert_eq!(report.output, Some(Value::from("hello\n")));

        let dir = tempfile::tempdir().unwrap();
        let failing = build(Shell::build, "{command: [sh, -c, 'exit 3']}", &settings).unwrap();
        match failing.execute(&context(&dir)).verdict {
            Verdict::Fail(message) => assert!(message.contains("exited")),
            other => panic!("unexpected {:?}", other),
        }

        let dir = tempfile::tempdir().unwrap();
        let missing = build(Shell::build, "{command: /nonexistent/binary}", &settings).unwrap();
        match missing.execute(&context(&dir)).verdict {
            Verdict::Error(_) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(build(Shell::build, "{command: ''}", &settings).is_err());
    }
}
