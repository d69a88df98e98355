/*!
 * Operator Console
 *
 * Text command surface over the process manager. Every command returns a
 * human-readable string; internal errors are caught at this boundary and
 * rendered as `[Error] ...`, never thrown past it. Argument parsing is plain
 * word splitting - the grammar lives with the host.
 */

use crate::core::types::Pid;
use crate::process::{Identifier, ProcessError, ProcessResult};
use crate::scheduler::ProcessManager;
use std::fmt::Write as _;
use std::panic::{catch_unwind, AssertUnwindSafe};

const HELP: &str = "\
Commands:
  launch <kind> [identifier] [args...]
  kill <pid>
  suspend <pid>
  resume <pid>
  message <pid> <text...>
  process [pid]
  help";

/// Console bound to one process manager
pub struct Console<'a> {
    manager: &'a mut ProcessManager,
}

impl<'a> Console<'a> {
    pub fn new(manager: &'a mut ProcessManager) -> Self {
        Self { manager }
    }

    /// Execute one command line; never panics, never returns an Err
    pub fn execute(&mut self, line: &str) -> String {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.dispatch(line)));
        match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => format!("[Error] {err}"),
            Err(_) => "[Error] internal failure while executing command".to_string(),
        }
    }

    fn dispatch(&mut self, line: &str) -> ProcessResult<String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.split_first() {
            None | Some((&"help", _)) => Ok(HELP.to_string()),
            Some((&"launch", rest)) => self.launch(rest),
            Some((&"kill", rest)) => self.kill(rest),
            Some((&"suspend", rest)) => self.suspend(rest),
            Some((&"resume", rest)) => self.resume(rest),
            Some((&"message", rest)) => self.message(rest),
            Some((&"process", rest)) => self.process(rest),
            Some((&other, _)) => Err(ProcessError::InvalidCommand(format!(
                "unknown command {other:?} (try \"help\")"
            ))),
        }
    }

    fn launch(&mut self, args: &[&str]) -> ProcessResult<String> {
        let (&kind, rest) = args
            .split_first()
            .ok_or_else(|| ProcessError::InvalidCommand("launch needs a process kind".into()))?;

        let (identifier, rest) = match rest.split_first() {
            Some((&identifier, rest)) => (Identifier::from(identifier), rest),
            None => (Identifier::Default, rest),
        };

        let args: Vec<String> = rest.iter().map(|word| word.to_string()).collect();
        let pid = self.manager.launch(kind, identifier.clone(), &args)?;
        Ok(format!("Launched {kind}[{identifier}] as PID {pid}"))
    }

    fn kill(&mut self, args: &[&str]) -> ProcessResult<String> {
        let pid = parse_pid(args)?;
        self.manager.kill(pid)?;
        Ok(format!("Killed PID {pid}"))
    }

    fn suspend(&mut self, args: &[&str]) -> ProcessResult<String> {
        let pid = parse_pid(args)?;
        self.manager.suspend(pid)?;
        Ok(format!("Suspended PID {pid}"))
    }

    fn resume(&mut self, args: &[&str]) -> ProcessResult<String> {
        let pid = parse_pid(args)?;
        self.manager.resume(pid)?;
        Ok(format!("Resumed PID {pid}"))
    }

    fn message(&mut self, args: &[&str]) -> ProcessResult<String> {
        let pid = parse_pid(args)?;
        let text = args[1..].join(" ");
        if text.is_empty() {
            return Err(ProcessError::InvalidCommand("message needs text".into()));
        }
        match self.manager.deliver_message(pid, &text)? {
            Some(reply) => Ok(reply),
            None => Ok(format!("PID {pid} has no message handler")),
        }
    }

    fn process(&mut self, args: &[&str]) -> ProcessResult<String> {
        match args.first() {
            Some(_) => {
                let pid = parse_pid(args)?;
                self.detail(pid)
            }
            None => Ok(self.listing()),
        }
    }

    fn detail(&self, pid: Pid) -> ProcessResult<String> {
        let record = self.manager.record(pid).ok_or(ProcessError::NotFound(pid))?;
        let mut output = String::new();
        let _ = writeln!(output, "PID {}: {}", record.pid(), record.description());
        let _ = writeln!(output, "  kind:       {}", record.kind());
        let _ = writeln!(output, "  identifier: {}", record.identifier());
        let _ = writeln!(
            output,
            "  running:    {}",
            if record.is_running() { "yes" } else { "no" }
        );
        let _ = write!(output, "  depends on:");
        let dependencies = record.dependencies();
        if dependencies.is_empty() {
            let _ = write!(output, " (none)");
        } else {
            for specifier in dependencies {
                let _ = write!(output, " {specifier}");
            }
        }
        Ok(output)
    }

    fn listing(&self) -> String {
        let total = self.manager.records().count();
        let quarantined = self.manager.quarantined().len();
        let mut output = format!("{total} processes ({quarantined} quarantined)");
        for record in self.manager.records() {
            let _ = write!(
                output,
                "\n  {:>5} {} {}",
                record.pid(),
                if record.is_running() { "*" } else { "-" },
                record.description()
            );
        }
        output
    }
}

fn parse_pid(args: &[&str]) -> ProcessResult<Pid> {
    let raw = args
        .first()
        .ok_or_else(|| ProcessError::InvalidCommand("expected a PID".into()))?;
    raw.parse::<Pid>()
        .map_err(|_| ProcessError::InvalidCommand(format!("invalid PID {raw:?}")))
}
