use std::{
    borrow::Cow,
    io::{self, Write as _},
};

use crate::{
    fault::{Fault, IO_FAULT_NAME},
    value::Value,
};

/// Trait for handling output from `print` processes.
///
/// Implement this trait to capture or redirect the output of a session. A
/// failing writer raises a catchable `IOException` fault in the process that
/// printed.
pub trait PrintWriter {
    /// Called once for each rendered expression of a `print` process.
    ///
    /// Must not add separators or a trailing newline; those are emitted via
    /// [`stdout_push`](Self::stdout_push).
    fn stdout_write(&mut self, output: Cow<'_, str>) -> Result<(), Fault>;

    /// Emits a separator or line terminator.
    fn stdout_push(&mut self, end: char) -> Result<(), Fault>;
}

/// Writes session output straight to the process's stdout.
#[derive(Debug)]
pub struct StdPrint;

fn io_fault(err: &io::Error) -> Fault {
    Fault::new(IO_FAULT_NAME, Value::Str(err.to_string()))
}

impl PrintWriter for StdPrint {
    fn stdout_write(&mut self, output: Cow<'_, str>) -> Result<(), Fault> {
        io::stdout().lock().write_all(output.as_bytes()).map_err(|err| io_fault(&err))
    }

    fn stdout_push(&mut self, end: char) -> Result<(), Fault> {
        let mut stdout = io::stdout().lock();
        let mut buf = [0; 4];
        stdout
            .write_all(end.encode_utf8(&mut buf).as_bytes())
            .and_then(|()| if end == '\n' { stdout.flush() } else { Ok(()) })
            .map_err(|err| io_fault(&err))
    }
}

/// Buffers session output in memory.
///
/// Tests compare the buffer against the expected lines.
#[derive(Debug, Default)]
pub struct CollectStringPrint(String);

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self(String::new())
    }

    /// Everything printed so far.
    #[must_use]
    pub fn output(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl PrintWriter for CollectStringPrint {
    fn stdout_write(&mut self, output: Cow<'_, str>) -> Result<(), Fault> {
        self.0.push_str(&output);
        Ok(())
    }

    fn stdout_push(&mut self, end: char) -> Result<(), Fault> {
        self.0.push(end);
        Ok(())
    }
}

/// Discards session output.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn stdout_write(&mut self, _output: Cow<'_, str>) -> Result<(), Fault> {
        Ok(())
    }

    fn stdout_push(&mut self, _end: char) -> Result<(), Fault> {
        Ok(())
    }
}
