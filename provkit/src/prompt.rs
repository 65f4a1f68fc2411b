//! Operator confirmation gate
//!
//! Some commands need sustained physical button contact; the operator must
//! be told what to do and acknowledge before the command goes out.

use std::io::{self, BufRead, Write};

/// Blocking "proceed?" gate consulted before button-gated commands
pub trait Confirm {
    fn await_confirmation(&mut self, message: &str) -> io::Result<()>;
}

/// Prints the instruction to stderr and waits for ENTER
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn await_confirmation(&mut self, message: &str) -> io::Result<()> {
        let mut stderr = io::stderr();
        write!(stderr, "{message}\nPress ENTER to continue")?;
        stderr.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(())
    }
}

/// Proceeds without asking; for unattended runs and tests
#[derive(Debug, Default)]
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn await_confirmation(&mut self, _message: &str) -> io::Result<()> {
        Ok(())
    }
}
