use anyhow::{Context, Result};
use std::io::Write;

/// Destination for detected payload lines
pub trait LineSink {
    fn emit(&mut self, line: &str) -> Result<()>;
}

/// Writes lines to stdout
#[derive(Debug, Default)]
pub struct Console;

impl LineSink for Console {
    fn emit(&mut self, line: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", line).context("Failed to write to stdout")?;
        out.flush().context("Failed to flush stdout")?;
        Ok(())
    }
}

impl LineSink for Vec<String> {
    fn emit(&mut self, line: &str) -> Result<()> {
        self.push(line.to_string());
        Ok(())
    }
}
