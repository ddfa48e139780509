//! Output multiplexing for managed processes.
//!
//! One background reader per managed process drains its merged
//! stdout/stderr stream into the console. Passthrough processes (the
//! application server, whose own log formatting is meaningful) are
//! forwarded verbatim; everything else is prefixed with `[name]`.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::process::Shared;
use crate::constants::OUTPUT_POLL_INTERVAL_MS;

/// Spawn the reader thread for one process stream.
///
/// The loop polls the stream, forwards complete lines, and sleeps briefly
/// when no data is available. It exits at end-of-stream or when the
/// global shutdown flag is set, whichever comes first. Read errors are
/// suppressed; the loop simply exits so I/O problems never reach the
/// console. The thread is daemon-style and is never joined.
pub(crate) fn spawn_reader<R: Read + Send + 'static>(
    shared: Arc<Shared>,
    name: String,
    passthrough: bool,
    mut stream: R,
) {
    std::thread::spawn(move || {
        let mut pending: Vec<u8> = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            if shared.shutdown.load(Ordering::SeqCst) {
                break;
            }
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    for line in split_complete_lines(&mut pending) {
                        forward(&name, passthrough, &line);
                    }
                },
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::Interrupted =>
                {
                    std::thread::sleep(Duration::from_millis(OUTPUT_POLL_INTERVAL_MS));
                },
                Err(_) => break,
            }
        }

        // Trailing partial line at end-of-stream.
        if !pending.is_empty() {
            let line = String::from_utf8_lossy(&pending).into_owned();
            forward(&name, passthrough, &line);
        }
    });
}

/// Drain complete lines out of the pending buffer, leaving any trailing
/// partial line in place.
fn split_complete_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
        let mut raw: Vec<u8> = pending.drain(..=pos).collect();
        raw.pop(); // '\n'
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        lines.push(String::from_utf8_lossy(&raw).into_owned());
    }
    lines
}

fn forward(name: &str, passthrough: bool, line: &str) {
    println!("{}", render(name, passthrough, line));
}

fn render(name: &str, passthrough: bool, line: &str) -> String {
    if passthrough {
        line.to_string()
    } else {
        format!("[{name}] {line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_tagged_and_passthrough() {
        assert_eq!(
            render("asset-watcher", false, "Rebuilding..."),
            "[asset-watcher] Rebuilding..."
        );
        assert_eq!(render("server", true, "INFO: started"), "INFO: started");
    }

    #[test]
    fn split_keeps_partial_line() {
        let mut pending = b"one\ntwo\r\nthr".to_vec();
        let lines = split_complete_lines(&mut pending);
        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
        assert_eq!(pending, b"thr");
    }

    #[test]
    fn split_empty_buffer() {
        let mut pending = Vec::new();
        assert!(split_complete_lines(&mut pending).is_empty());
    }

    #[test]
    fn split_handles_blank_lines() {
        let mut pending = b"\n\n".to_vec();
        let lines = split_complete_lines(&mut pending);
        assert_eq!(lines, vec![String::new(), String::new()]);
        assert!(pending.is_empty());
    }
}
