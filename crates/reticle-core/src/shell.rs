//! Interactive shell
//!
//! A read loop over the dispatcher: one prompt, one line, one dispatch.
//! End of input exits with status 0, an interrupt with status 1. Usage
//! errors and help requests end only the current line. A handler failure
//! the dispatcher does not recover from is reported on stderr and the loop
//! goes on to the next prompt.

use std::{future::Future, io, io::Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::{
    dispatcher::{Cli, Status},
    error::Result,
};

impl Cli {
    /// Start the shell on the configured input (stdin unless replaced),
    /// stopping on Ctrl-C.
    pub async fn interactive(&mut self) -> Result<Status> {
        let input: Box<dyn AsyncBufRead + Unpin + Send> = match self.shell_input.take() {
            Some(input) => input,
            None => Box::new(BufReader::new(tokio::io::stdin())),
        };
        self.interactive_with(input, tokio::signal::ctrl_c()).await
    }

    /// Shell loop over `input`; resolving `interrupt` ends it with status 1.
    pub async fn interactive_with<R, I>(&mut self, input: R, interrupt: I) -> Result<Status>
    where
        R: AsyncBufRead + Unpin,
        I: Future<Output = io::Result<()>>,
    {
        self.interactive = true;
        writeln!(self.console.out(), "{}", self.config.message)?;

        let mut lines = input.lines();
        tokio::pin!(interrupt);
        let mut interrupt_armed = true;

        loop {
            write!(self.console.out(), "{}", self.config.prompt)?;
            self.console.flush()?;

            let line = loop {
                tokio::select! {
                    biased;
                    signal = &mut interrupt, if interrupt_armed => match signal {
                        Ok(()) => {
                            writeln!(self.console.out())?;
                            self.console.flush()?;
                            tracing::debug!("Interrupted, leaving shell");
                            return Ok(Status::Exit(1));
                        }
                        Err(e) => {
                            tracing::warn!("Interrupt handling unavailable: {e}");
                            interrupt_armed = false;
                        }
                    },
                    line = lines.next_line() => break line?,
                }
            };

            let Some(line) = line else {
                writeln!(self.console.out())?;
                self.console.flush()?;
                tracing::debug!("End of input, leaving shell");
                return Ok(Status::Exit(0));
            };

            let args: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            match self.dispatch(&args) {
                Ok(Status::Exit(code)) => {
                    self.console.flush()?;
                    return Ok(Status::Exit(code));
                }
                Ok(status) => tracing::trace!(?status, "Line handled"),
                Err(err) => {
                    tracing::error!("Command failed in shell: {err}");
                    writeln!(self.console.err(), "error: {err}")?;
                }
            }
        }
    }
}
