// src/exec/pipe.rs

//! Spawning a child with stdout and stderr merged into one pipe, and the
//! blocking reader thread that turns that pipe into lines.
//!
//! Both output streams share the write end of a single OS pipe, so the
//! reader sees bytes in exactly the order the child wrote them.

use std::io::{self, BufRead, BufReader, PipeReader};
use std::process::Stdio;

use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::errors::{BenchError, Result};
use crate::exec::CommandSpec;
use crate::types::RunId;

/// A freshly spawned child plus the read end of its merged output pipe.
#[derive(Debug)]
pub(crate) struct SpawnedChild {
    pub child: Child,
    pub output: PipeReader,
}

fn spawn_error(program: String, source: io::Error) -> BenchError {
    BenchError::SpawnError { program, source }
}

/// Spawn `spec` with stdin closed and stdout+stderr on one pipe.
///
/// The child is `kill_on_drop`, so dropping the returned value without
/// waiting terminates it.
pub(crate) fn spawn_merged(spec: &CommandSpec) -> Result<SpawnedChild> {
    if let Some(script) = &spec.script {
        if !script.is_file() {
            return Err(spawn_error(
                script.display().to_string(),
                io::Error::new(io::ErrorKind::NotFound, "script not found"),
            ));
        }
    }

    let program = spec.program.display().to_string();
    let (output, writer) = io::pipe().map_err(|e| spawn_error(program.clone(), e))?;
    let writer_err = writer
        .try_clone()
        .map_err(|e| spawn_error(program.clone(), e))?;

    let child = {
        let mut cmd = spec.to_tokio_command();
        cmd.stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_err)
            .kill_on_drop(true);
        cmd.spawn().map_err(|e| spawn_error(program, e))?
        // `cmd` drops here, closing our copies of the write end; EOF on
        // `output` then only depends on the child and its descendants.
    };

    Ok(SpawnedChild { child, output })
}

/// Strip the line terminator (`\n` or `\r\n`) and decode lossily.
pub fn decode_line(bytes: &[u8]) -> String {
    let mut end = bytes.len();
    if end > 0 && bytes[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && bytes[end - 1] == b'\r' {
        end -= 1;
    }
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Start the worker thread that blocks on the pipe and forwards each line.
///
/// The thread ends at EOF, on a read error, or once the receiving side is
/// gone. Must stay off the Tokio blocking pool: a descendant process can keep
/// the pipe open past runtime shutdown.
pub(crate) fn spawn_reader(
    output: PipeReader,
    run_id: RunId,
    tx: mpsc::UnboundedSender<String>,
) -> io::Result<()> {
    std::thread::Builder::new()
        .name(format!("benchrun-reader-{run_id}"))
        .spawn(move || {
            let mut reader = BufReader::new(output);
            let mut buf = Vec::with_capacity(256);
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => {
                        trace!(run_id, "output pipe reached EOF");
                        break;
                    }
                    Ok(_) => {
                        if tx.send(decode_line(&buf)).is_err() {
                            debug!(run_id, "line receiver dropped; reader stopping");
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!(run_id, error = %e, "error reading child output");
                        break;
                    }
                }
            }
        })?;
    Ok(())
}
