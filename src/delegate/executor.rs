//! Process-backed delegate.
//!
//! Spawns the configured command once per call, feeds the request on stdin,
//! and captures both output streams while reporting every chunk to the event
//! sink.
//!
//! A call completes when both output pipes reach EOF and the child has been
//! reaped. A background grandchild that inherits stdout or stderr holds the
//! pipes open, so the call stays blocked until that grandchild exits or
//! closes them, even after the direct child has exited.

use super::{Delegate, DelegateResult, request_text};
use crate::config::{Config, ResolvedCommand};
use crate::error::Result;
use crate::events::{Event, EventAction, EventSink};
use serde_json::{Value, json};
use std::io::{ErrorKind, Read, Write};
use std::process::{ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

const READ_CHUNK: usize = 8192;

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Delegate that runs one external process per call.
pub struct ProcessDelegate {
    command: ResolvedCommand,
    sink: Arc<dyn EventSink>,
}

impl ProcessDelegate {
    pub fn new(command: ResolvedCommand, sink: Arc<dyn EventSink>) -> Self {
        Self { command, sink }
    }

    /// Build a delegate from the effective configuration.
    pub fn from_config(config: &Config, sink: Arc<dyn EventSink>) -> Result<Self> {
        Ok(Self::new(config.resolve_command()?, sink))
    }

    fn emit(&self, call: u64, action: EventAction, details: Value) {
        self.sink
            .record(&Event::new(action).with_call(call).with_details(details));
    }

    /// Write the request plus a newline, then drop stdin to signal end of input.
    fn write_request(&self, call: u64, stdin: Option<ChildStdin>, request: &str) {
        let Some(mut stdin) = stdin else {
            return;
        };

        let written = stdin
            .write_all(request.as_bytes())
            .and_then(|()| stdin.write_all(b"\n"))
            .and_then(|()| stdin.flush());

        match written {
            Ok(()) => self.emit(
                call,
                EventAction::Stdin,
                json!({"bytes": request.len() + 1, "text": request}),
            ),
            // The child may exit without reading its input; the exit status decides.
            Err(e) => self.emit(call, EventAction::StdinFailed, json!({"error": e.to_string()})),
        }
    }

    /// Read a stream to EOF, reporting each chunk as it arrives.
    fn drain<R: Read>(&self, call: u64, stream: Option<R>, action: EventAction) -> Vec<u8> {
        let mut collected = Vec::new();
        let Some(mut stream) = stream else {
            return collected;
        };

        let mut buf = [0u8; READ_CHUNK];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    self.emit(
                        call,
                        action,
                        json!({"bytes": n, "text": String::from_utf8_lossy(&buf[..n])}),
                    );
                    collected.extend_from_slice(&buf[..n]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.emit(call, action, json!({"error": e.to_string()}));
                    break;
                }
            }
        }

        collected
    }
}

impl Delegate for ProcessDelegate {
    fn delegate(&self, input: &str, force_structured: bool) -> DelegateResult {
        let call = NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed);
        let request = request_text(input, force_structured);
        let program = &self.command.program;

        let spawned = Command::new(program)
            .args(&self.command.args)
            .current_dir(&self.command.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let message = format!("failed to start '{}': {}", program.display(), e);
                self.emit(call, EventAction::SpawnFailed, json!({"error": message}));
                return DelegateResult::Fail(message);
            }
        };

        self.emit(
            call,
            EventAction::Spawn,
            json!({
                "program": program.to_string_lossy(),
                "args": self.command.args,
                "working_dir": self.command.working_dir.to_string_lossy(),
                "pid": child.id(),
            }),
        );

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Writer and readers run side by side so a chatty child cannot fill a
        // pipe while we are still blocked on the other one.
        let (out, err) = thread::scope(|s| {
            let request = request.as_ref();
            s.spawn(move || self.write_request(call, stdin, request));
            let out = s.spawn(move || self.drain(call, stdout, EventAction::Stdout));
            let err = s.spawn(move || self.drain(call, stderr, EventAction::Stderr));
            (
                out.join().unwrap_or_default(),
                err.join().unwrap_or_default(),
            )
        });

        let status = match child.wait() {
            Ok(status) => status,
            Err(e) => {
                let message = format!("failed to wait for '{}': {}", program.display(), e);
                self.emit(call, EventAction::Exit, json!({"error": message}));
                return DelegateResult::Fail(message);
            }
        };

        self.emit(
            call,
            EventAction::Exit,
            json!({"code": status.code(), "success": status.success()}),
        );

        classify(
            status.code(),
            String::from_utf8_lossy(&out).into_owned(),
            String::from_utf8_lossy(&err).into_owned(),
        )
    }
}

/// Map an exit code and captured streams to a result.
fn classify(code: Option<i32>, stdout: String, stderr: String) -> DelegateResult {
    match code {
        Some(0) if stdout.is_empty() => DelegateResult::Ok(stderr),
        Some(0) => DelegateResult::Ok(stdout),
        Some(code) => DelegateResult::Fail(format!("process exited with code {}: {}", code, stderr)),
        None => DelegateResult::Fail(format!("process terminated by signal: {}", stderr)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::STRUCTURED_DIRECTIVE;
    use crate::events::{MemorySink, NullSink};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn make_delegate(command: &str) -> ProcessDelegate {
        let config = Config {
            command: command.to_string(),
            ..Default::default()
        };
        ProcessDelegate::from_config(&config, Arc::new(NullSink)).unwrap()
    }

    #[test]
    fn test_classify_prefers_stdout() {
        let result = classify(Some(0), "out".to_string(), "err".to_string());
        assert_eq!(result, DelegateResult::Ok("out".to_string()));
    }

    #[test]
    fn test_classify_falls_back_to_stderr() {
        let result = classify(Some(0), String::new(), "err".to_string());
        assert_eq!(result, DelegateResult::Ok("err".to_string()));
    }

    #[test]
    fn test_classify_nonzero_exit() {
        let result = classify(Some(4), "ignored".to_string(), "bad input".to_string());
        assert_eq!(
            result,
            DelegateResult::Fail("process exited with code 4: bad input".to_string())
        );
    }

    #[test]
    fn test_classify_signal() {
        let result = classify(None, String::new(), String::new());
        assert!(!result.is_ok());
        assert!(result.text().contains("terminated by signal"));
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_echoes_first_line() {
        let delegate = make_delegate(r#"sh -c 'read line; printf "%s" "$line"'"#);
        let result = delegate.delegate("hello", false);
        assert_eq!(result, DelegateResult::Ok("hello".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_writes_newline_and_closes_stdin() {
        // `cat` only exits once stdin is closed.
        let delegate = make_delegate("cat");
        let result = delegate.delegate("hello", false);
        assert_eq!(result, DelegateResult::Ok("hello\n".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_structured_directive_is_sent() {
        let delegate = make_delegate("cat");
        let result = delegate.delegate("hello", true);
        assert_eq!(
            result,
            DelegateResult::Ok(format!("hello{}\n", STRUCTURED_DIRECTIVE))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_stderr_when_stdout_empty() {
        let delegate = make_delegate("sh -c 'cat > /dev/null; echo only-stderr >&2'");
        let result = delegate.delegate("x", false);
        assert_eq!(result, DelegateResult::Ok("only-stderr\n".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_empty_output_is_empty_success() {
        let delegate = make_delegate("sh -c 'cat > /dev/null'");
        let result = delegate.delegate("x", false);
        assert_eq!(result, DelegateResult::Ok(String::new()));
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_nonzero_exit() {
        let delegate = make_delegate("sh -c 'cat > /dev/null; echo bad things >&2; exit 3'");
        let result = delegate.delegate("x", false);

        assert!(!result.is_ok());
        assert!(result.text().contains("code 3"));
        assert!(result.text().contains("bad things"));
    }

    #[test]
    fn test_delegate_missing_executable() {
        let delegate = make_delegate("/nonexistent/fanout-missing-binary");
        let result = delegate.delegate("x", false);

        assert!(!result.is_ok());
        assert!(result.text().contains("failed to start"));
        assert!(result.text().contains("fanout-missing-binary"));
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_is_repeatable() {
        let delegate = make_delegate(r#"sh -c 'read line; printf "seen:%s" "$line"'"#);
        let first = delegate.delegate("same input", true);
        let second = delegate.delegate("same input", true);

        assert_eq!(first, DelegateResult::Ok("seen:same input".to_string()));
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_large_input_and_output() {
        let delegate = make_delegate("cat");
        let input = "a".repeat(300_000);
        let result = delegate.delegate(&input, false);

        assert!(result.is_ok());
        assert_eq!(result.text().len(), 300_001);
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_child_ignoring_stdin() {
        let delegate = make_delegate("sh -c 'exit 0'");
        let input = "z".repeat(1_000_000);
        let result = delegate.delegate(&input, false);
        assert_eq!(result, DelegateResult::Ok(String::new()));
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_runs_in_working_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            command: "sh -c 'cat > /dev/null; pwd -P'".to_string(),
            working_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let delegate = ProcessDelegate::from_config(&config, Arc::new(NullSink)).unwrap();

        let result = delegate.delegate("x", false);
        let expected = temp_dir.path().canonicalize().unwrap();
        assert_eq!(PathBuf::from(result.text().trim()), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_resolves_relative_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("stub.sh");
        std::fs::write(&script, "#!/bin/sh\nread line\nprintf 'stub:%s' \"$line\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = Config {
            command: "./stub.sh".to_string(),
            working_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let delegate = ProcessDelegate::from_config(&config, Arc::new(NullSink)).unwrap();

        let result = delegate.delegate("ping", false);
        assert_eq!(result, DelegateResult::Ok("stub:ping".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_waits_for_inherited_pipes_to_close() {
        // The child exits at once; its background job keeps stdout open.
        let delegate = make_delegate("sh -c 'cat > /dev/null; (sleep 1; echo late) &'");
        let result = delegate.delegate("x", false);
        assert_eq!(result, DelegateResult::Ok("late\n".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_runs_bare_executable_from_working_dir() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("llmstub");
        std::fs::write(&script, "#!/bin/sh\nread line\nprintf 'local:%s' \"$line\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = Config {
            command: "llmstub".to_string(),
            working_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let delegate = ProcessDelegate::from_config(&config, Arc::new(NullSink)).unwrap();

        let result = delegate.delegate("ping", false);
        assert_eq!(result, DelegateResult::Ok("local:ping".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_delegate_reports_lifecycle_events() {
        let sink = Arc::new(MemorySink::default());
        let config = Config {
            command: "sh -c 'cat > /dev/null; echo out; echo err >&2'".to_string(),
            ..Default::default()
        };
        let delegate = ProcessDelegate::from_config(&config, sink.clone()).unwrap();

        let result = delegate.delegate("hello", false);
        assert_eq!(result, DelegateResult::Ok("out\n".to_string()));

        let events = sink.events();
        assert_eq!(events.first().unwrap().action, EventAction::Spawn);
        assert_eq!(events.last().unwrap().action, EventAction::Exit);
        assert_eq!(sink.count(EventAction::Stdin), 1);
        assert!(sink.count(EventAction::Stdout) >= 1);
        assert!(sink.count(EventAction::Stderr) >= 1);

        let call = events[0].call;
        assert!(call.is_some());
        assert!(events.iter().all(|e| e.call == call));

        let stdin = events
            .iter()
            .find(|e| e.action == EventAction::Stdin)
            .unwrap();
        assert_eq!(stdin.details["text"], "hello");
        assert_eq!(stdin.details["bytes"], 6);
        assert_eq!(events.last().unwrap().details["code"], 0);
    }

    #[test]
    fn test_delegate_reports_spawn_failure() {
        let sink = Arc::new(MemorySink::default());
        let config = Config {
            command: "/nonexistent/fanout-missing-binary".to_string(),
            ..Default::default()
        };
        let delegate = ProcessDelegate::from_config(&config, sink.clone()).unwrap();

        delegate.delegate("x", false);
        assert_eq!(sink.actions(), vec![EventAction::SpawnFailed]);
    }

    #[test]
    fn test_call_ids_are_distinct() {
        let sink = Arc::new(MemorySink::default());
        let config = Config {
            command: "/nonexistent/fanout-missing-binary".to_string(),
            ..Default::default()
        };
        let delegate = ProcessDelegate::from_config(&config, sink.clone()).unwrap();

        delegate.delegate("a", false);
        delegate.delegate("b", false);

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_ne!(events[0].call, events[1].call);
    }
}
