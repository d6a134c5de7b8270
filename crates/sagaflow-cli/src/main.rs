use std::{
    env, fs,
    process::ExitCode,
    time::{Duration, Instant},
};

use sagaflow::{ProfilingTracer, RunOutcome, Runner, SessionError, StdPrint, StderrTracer};

const USAGE: &str = "usage: sagaflow <program.json> [--trace | --profile]";

/// Which tracer the session runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraceMode {
    Off,
    Trace,
    Profile,
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    file_path: String,
    mode: TraceMode,
}

fn main() -> ExitCode {
    let raw: Vec<String> = env::args().skip(1).collect();
    let Some(args) = parse_args(&raw) else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let source = match fs::read_to_string(&args.file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error reading {}: {err}", args.file_path);
            return ExitCode::FAILURE;
        }
    };

    let runner = match Runner::from_json(&source) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("error:\n{err}");
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    let result = match args.mode {
        TraceMode::Off => runner.run(&mut StdPrint),
        TraceMode::Trace => runner.run_traced(&mut StdPrint, StderrTracer::new()).0,
        TraceMode::Profile => {
            let (result, tracer) = runner.run_traced(&mut StdPrint, ProfilingTracer::new());
            eprint!("{}", tracer.report());
            result
        }
    };
    let elapsed = start.elapsed();

    match result {
        Ok(outcome) => {
            eprintln!("{}", outcome_line(&outcome, elapsed, args.mode));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", error_line(&err, elapsed));
            ExitCode::FAILURE
        }
    }
}

/// Parses the command line. `--trace` and `--profile` are mutually exclusive.
fn parse_args(raw: &[String]) -> Option<Args> {
    let mut file_path = None;
    let mut mode = TraceMode::Off;
    for arg in raw {
        let requested = match arg.as_str() {
            "--trace" => TraceMode::Trace,
            "--profile" => TraceMode::Profile,
            flag if flag.starts_with("--") => return None,
            path => {
                if file_path.replace(path.to_owned()).is_some() {
                    return None;
                }
                continue;
            }
        };
        if mode != TraceMode::Off && mode != requested {
            return None;
        }
        mode = requested;
    }
    Some(Args {
        file_path: file_path?,
        mode,
    })
}

/// Summary printed to stderr for a session that did not fail.
///
/// Termination that nothing handled ends the session like a normal
/// completion; the killing fault is only named when tracing.
fn outcome_line(outcome: &RunOutcome, elapsed: Duration, mode: TraceMode) -> String {
    match outcome {
        RunOutcome::Terminated(fault) if mode == TraceMode::Trace => {
            format!("terminated by {fault} after: {elapsed:?}")
        }
        RunOutcome::Completed | RunOutcome::Exited | RunOutcome::Terminated(_) => {
            format!("completed after: {elapsed:?}")
        }
    }
}

fn error_line(err: &SessionError, elapsed: Duration) -> String {
    format!("error after: {elapsed:?}\n{err}")
}

#[cfg(test)]
mod tests {
    use sagaflow::Fault;

    use super::*;

    fn args(raw: &[&str]) -> Option<Args> {
        let raw: Vec<String> = raw.iter().map(|s| (*s).to_owned()).collect();
        parse_args(&raw)
    }

    #[test]
    fn parses_file_and_flag() {
        assert_eq!(
            args(&["prog.json", "--trace"]),
            Some(Args {
                file_path: "prog.json".to_owned(),
                mode: TraceMode::Trace,
            })
        );
        assert_eq!(args(&["--profile", "prog.json"]).map(|a| a.mode), Some(TraceMode::Profile));
        assert_eq!(args(&["prog.json"]).map(|a| a.mode), Some(TraceMode::Off));
    }

    #[test]
    fn trace_and_profile_are_exclusive() {
        assert_eq!(args(&["prog.json", "--trace", "--profile"]), None);
        assert_eq!(args(&["--profile", "prog.json", "--trace"]), None);
        assert!(args(&["prog.json", "--trace", "--trace"]).is_some());
    }

    #[test]
    fn rejects_missing_file_and_unknown_flags() {
        assert_eq!(args(&["--trace"]), None);
        assert_eq!(args(&["prog.json", "--verbose"]), None);
        assert_eq!(args(&["a.json", "b.json"]), None);
    }

    #[test]
    fn termination_is_only_named_when_tracing() {
        let elapsed = Duration::from_millis(5);
        let terminated = RunOutcome::Terminated(Fault::named("Cancelled"));
        assert_eq!(
            outcome_line(&terminated, elapsed, TraceMode::Off),
            outcome_line(&RunOutcome::Completed, elapsed, TraceMode::Off)
        );
        assert_eq!(outcome_line(&terminated, elapsed, TraceMode::Profile), "completed after: 5ms");
        assert_eq!(
            outcome_line(&terminated, elapsed, TraceMode::Trace),
            "terminated by Cancelled after: 5ms"
        );
    }
}
