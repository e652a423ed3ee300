//! Passthrough of unknown commands to the operating system.
//!
//! The process runs on a background worker; each stdout and stderr line is
//! printed through the priority queue as it arrives. Cancelling the worker
//! kills the process.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use typist_types::error::{Result, TypistError};

use crate::printer::Printer;
use crate::workers::{CancelToken, Workers};

/// Printed when nothing could make sense of the input.
pub const UNKNOWN_COMMAND: &str = "Unknown command";

const WORKER_NAME: &str = "shell-passthrough";

const EXIT_POLL: Duration = Duration::from_millis(20);

/// Name of the native shell for the header line.
pub fn shell_name() -> String {
    if cfg!(windows) {
        return "cmd".to_string();
    }
    std::env::var("SHELL")
        .ok()
        .and_then(|path| {
            path.rsplit('/')
                .next()
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "sh".to_string())
}

/// Announce the passthrough and run `program args` on a background worker.
pub fn passthrough(
    printer: &Printer,
    workers: &Workers,
    program: &str,
    args: &[String],
) -> Result<CancelToken> {
    printer.println_priority(format!(
        "Unknown command, passing to operating system native shell ({})",
        shell_name()
    ));

    let printer = printer.clone();
    let program = program.to_string();
    let args = args.to_vec();
    workers.spawn(WORKER_NAME, move |token| {
        if let Err(e) = run(&printer, &token, &program, &args) {
            log::warn!("Shell passthrough of '{program}' failed: {e}");
            printer.println_priority(UNKNOWN_COMMAND);
        }
    })
}

fn run(printer: &Printer, token: &CancelToken, program: &str, args: &[String]) -> Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| TypistError::Shell(format!("could not start '{program}': {e}")))?;
    log::debug!("Spawned '{program}' with pid {}", child.id());

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    thread::scope(|scope| {
        if let Some(out) = stdout {
            scope.spawn(|| stream_lines(out, printer, token));
        }
        if let Some(err) = stderr {
            scope.spawn(|| stream_lines(err, printer, token));
        }
        supervise(&mut child, token, program);
    });
    Ok(())
}

/// Wait for the child to exit, killing it if the token is cancelled.
fn supervise(child: &mut Child, token: &CancelToken, program: &str) {
    loop {
        if token.is_cancelled() {
            if let Err(e) = child.kill() {
                log::debug!("Could not kill '{program}': {e}");
            }
            if let Err(e) = child.wait() {
                log::debug!("Could not reap '{program}': {e}");
            }
            log::info!("Shell passthrough of '{program}' was cancelled");
            return;
        }
        match child.try_wait() {
            Ok(Some(status)) => {
                log::debug!("'{program}' exited with {status}");
                return;
            },
            Ok(None) => thread::sleep(EXIT_POLL),
            Err(e) => {
                log::warn!("Lost track of '{program}': {e}");
                return;
            },
        }
    }
}

fn stream_lines(stream: impl Read, printer: &Printer, token: &CancelToken) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return,
            Ok(_) => {
                if token.is_cancelled() {
                    return;
                }
                let line = String::from_utf8_lossy(&buf);
                printer.println_priority(line.trim_end_matches(['\r', '\n']));
            },
            Err(e) => {
                log::debug!("Stopped reading process output: {e}");
                return;
            },
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::printer::AnimationSettings;
    use crate::test_utils::RecordingSurface;

    const WAIT: Duration = Duration::from_secs(10);

    #[test]
    fn output_lines_are_streamed() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lines.txt");
        std::fs::write(&file, "alpha\nbeta\n").unwrap();

        let surface = RecordingSurface::new();
        let printer = Printer::new(surface.clone(), None, AnimationSettings::instant());
        let workers = Workers::new();
        passthrough(&printer, &workers, "cat", &[file.display().to_string()]).unwrap();

        assert!(workers.wait_idle_timeout(WAIT));
        assert!(printer.wait_idle_timeout(WAIT));
        let text = surface.text();
        assert!(text.starts_with("Unknown command, passing to operating system native shell ("));
        assert!(text.ends_with("alpha\nbeta\n"), "got {text:?}");
    }

    #[test]
    fn spawn_failure_prints_unknown_command() {
        let surface = RecordingSurface::new();
        let printer = Printer::new(surface.clone(), None, AnimationSettings::instant());
        let workers = Workers::new();
        passthrough(&printer, &workers, "typist-no-such-program", &[]).unwrap();

        assert!(workers.wait_idle_timeout(WAIT));
        assert!(printer.wait_idle_timeout(WAIT));
        assert!(surface.text().ends_with("\nUnknown command\n"));
    }

    #[test]
    fn missing_program_is_a_shell_error() {
        let printer = Printer::new(RecordingSurface::new(), None, AnimationSettings::instant());
        let err = run(&printer, &CancelToken::new(), "typist-no-such-program", &[]).unwrap_err();
        assert!(
            matches!(err, TypistError::Shell(ref msg) if msg.starts_with("could not start 'typist-no-such-program'")),
            "got {err:?}"
        );
    }

    #[test]
    fn cancellation_kills_the_process() {
        let surface = RecordingSurface::new();
        let printer = Printer::new(surface.clone(), None, AnimationSettings::instant());
        let workers = Workers::new();
        let token = passthrough(&printer, &workers, "sleep", &["30".to_string()]).unwrap();

        token.cancel();
        assert!(workers.wait_idle_timeout(WAIT));
    }

    #[test]
    fn shell_name_is_not_empty() {
        assert!(!shell_name().is_empty());
    }
}
