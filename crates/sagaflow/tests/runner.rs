//! Tests for loading and running whole programs through `Runner`.

use pretty_assertions::assert_eq;
use sagaflow::{
    CollectStringPrint, Expr, Fault, HandlerInstall, NoPrint, NoopTracer, Process, Program, ProfilingTracer,
    RecordingTracer, ResourceError, ResourceLimits, RunOutcome, Runner, SessionError, TraceKind, Value,
    VariablePath,
};

const ORDER_SAGA: &str = include_str!("programs/order_saga.json");
const CANCEL: &str = include_str!("programs/cancel.json");

fn path(text: &str) -> VariablePath {
    text.parse().unwrap()
}

fn say(text: &str) -> Process {
    Process::Print(vec![Expr::literal(text)])
}

fn run(runner: &Runner) -> (Result<RunOutcome, SessionError>, String) {
    let mut print = CollectStringPrint::new();
    let result = runner.run(&mut print);
    (result, print.into_output())
}

#[test]
fn order_saga_compensates_completed_steps() {
    let runner = Runner::from_json(ORDER_SAGA).unwrap();
    let (result, output) = run(&runner);

    assert_eq!(result, Ok(RunOutcome::Completed));
    assert_eq!(output, "reserved sku-42\ncharged\ndeclined card-expired\nrefund\nrelease\n");
}

#[test]
fn order_saga_final_environment() {
    let runner = Runner::from_json(ORDER_SAGA).unwrap();
    let (result, env, _) = runner.run_session(&mut NoPrint, NoopTracer);

    assert_eq!(result, Ok(RunOutcome::Completed));
    assert_eq!(env.depth(), 1);
    assert_eq!(env.current_bindings(), env.root_bindings());
    let names: Vec<_> = env.root_bindings().child_names().collect();
    assert_eq!(names, vec!["stock", "order"]);
    assert_eq!(env.value(&path("stock.sku")), Value::from("sku-42"));
    assert_eq!(env.value(&path("order.PaymentDeclined")), Value::from("card-expired"));
    assert_eq!(env.value(&path("order.default")), Value::from("PaymentDeclined"));
}

#[test]
fn cancelled_job_reports_termination() {
    let runner = Runner::from_json(CANCEL).unwrap();
    let (result, output) = run(&runner);

    let Ok(RunOutcome::Terminated(fault)) = result else {
        panic!("expected the session to end terminated");
    };
    assert_eq!(fault.into_parts(), ("Cancelled".to_owned(), Value::Void));
    assert_eq!(output, "working\nrollback worker\n");
}

#[test]
fn cancelled_job_trace() {
    let runner = Runner::from_json(CANCEL).unwrap();
    let (_, tracer) = runner.run_traced(&mut NoPrint, RecordingTracer::new());

    assert_eq!(tracer.count(TraceKind::ScopePush), 2);
    assert_eq!(tracer.count(TraceKind::ScopePop), 2);
    // once in the worker, once again in the enclosing job scope
    assert_eq!(tracer.count(TraceKind::KillObserved), 2);
    assert_eq!(tracer.count(TraceKind::CompensationStart), 1);
}

#[test]
fn profiling_tracer_counts_transitions() {
    let runner = Runner::from_json(ORDER_SAGA).unwrap();
    let (_, tracer) = runner.run_traced(&mut NoPrint, ProfilingTracer::new());
    let report = tracer.report();

    assert_eq!(report.count(TraceKind::ScopePush), 3);
    assert_eq!(report.count(TraceKind::FaultDispatch), 1);
    assert_eq!(report.count(TraceKind::FaultCaptured), 1);
    assert_eq!(report.max_depth, 2);
}

#[test]
fn uncaught_fault_is_a_session_error() {
    let runner = Runner::new(Program::new(Process::scope(
        "main-task",
        Process::throw("Boom", Value::Int(3)),
    )));
    let (result, output) = run(&runner);

    assert_eq!(result, Err(SessionError::UncaughtFault(Fault::new("Boom", Value::Int(3)))));
    assert_eq!(output, "");
    assert_eq!(result.unwrap_err().to_string(), "uncaught fault Boom: 3");
}

#[test]
fn exit_ends_session_without_error() {
    let body = Process::Sequence(vec![
        Process::Install(vec![HandlerInstall::compensation(say("undo"))]),
        say("before"),
        Process::Exit,
        say("after"),
    ]);
    let runner = Runner::new(Program::new(Process::scope("s", body)));
    let (result, output) = run(&runner);

    assert_eq!(result, Ok(RunOutcome::Exited));
    assert_eq!(output, "before\n");
}

#[test]
fn operation_limit_aborts_session() {
    let main = Process::Sequence(vec![say("a"), say("a"), say("a"), say("a")]);
    let runner = Runner::new(Program::new(main).with_limits(ResourceLimits::new().max_operations(3)));
    let (result, output) = run(&runner);

    assert_eq!(
        result,
        Err(SessionError::Resource(ResourceError::Operation { limit: 3, count: 4 }))
    );
    assert_eq!(output, "a\na\n");
}

#[test]
fn malformed_path_is_rejected_at_load() {
    let json = r#"{ "main": { "print": [{ "path": "a[b" }] } }"#;
    let err = Runner::from_json(json).unwrap_err();
    assert!(matches!(err, SessionError::Program(_)), "unexpected error: {err}");
}

#[test]
fn unknown_process_is_rejected_at_load() {
    let err = Runner::from_json(r#"{ "main": { "spawn": [] } }"#).unwrap_err();
    assert!(matches!(err, SessionError::Program(_)));
}

#[test]
fn defaults_fill_optional_fields() {
    let json = r#"{ "main": { "scope": { "id": "s", "body": { "kill": { "fault": "Stop" } } } } }"#;
    let program = Program::from_json(json).unwrap();

    assert_eq!(program.limits, ResourceLimits::default());
    let Process::Scope(scope) = &program.main else {
        panic!("expected a scope, got {:?}", program.main);
    };
    assert!(scope.auto_pop());
    assert_eq!(scope.body(), &Process::kill("Stop"));
}

#[test]
fn json_description_survives_rendering() {
    let program = Program::from_json(ORDER_SAGA).unwrap();
    let rendered = program.to_json().unwrap();
    assert_eq!(Program::from_json(&rendered).unwrap(), program);
}

#[test]
fn dumped_runner_behaves_identically() {
    let runner = Runner::from_json(ORDER_SAGA).unwrap();
    let loaded = Runner::load(&runner.dump().unwrap()).unwrap();

    assert_eq!(loaded.program(), runner.program());
    assert_eq!(run(&loaded), run(&runner));
}

#[test]
fn sessions_do_not_share_state() {
    let body = Process::Sequence(vec![
        Process::Install(vec![HandlerInstall::compensation(say("undo"))]),
        Process::kill("Stop"),
    ]);
    let runner = Runner::new(Program::new(Process::scope("s", body)));

    let first = run(&runner);
    let second = run(&runner);
    assert_eq!(first, second);
    assert_eq!(second.1, "undo\n");
}
