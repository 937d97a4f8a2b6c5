//! Operator confirmation before modules are switched back on.

use crate::flow::RestorePlan;
use crate::{Error, Result};
use std::io::{BufRead, Write};

/// Asks whether a restore should go ahead.
pub trait Confirm {
    fn confirm(&mut self, plan: &RestorePlan) -> Result<bool>;
}

/// Always answers yes; used for `--no-interaction` and `skip_confirmation`.
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _plan: &RestorePlan) -> Result<bool> {
        Ok(true)
    }
}

/// `[y/N]` prompt over arbitrary reader/writer handles. Anything other than
/// `y`/`yes` (including end of input) declines.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for LinePrompt<R, W> {
    fn confirm(&mut self, plan: &RestorePlan) -> Result<bool> {
        let io_err = |e: std::io::Error| Error::Host(format!("confirmation prompt: {e}"));
        write!(self.output, "{} [y/N] ", plan.question()).map_err(io_err)?;
        self.output.flush().map_err(io_err)?;

        let mut answer = String::new();
        self.input.read_line(&mut answer).map_err(io_err)?;
        let answer = answer.trim().to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}
