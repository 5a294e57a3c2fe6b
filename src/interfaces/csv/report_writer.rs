use crate::error::Result;
use crate::interfaces::demo::DemoReport;
use serde::Serialize;
use std::io::Write;

/// Writes demo results as CSV tables.
///
/// Each table gets its own header row; tables are separated by a blank line.
pub struct ReportWriter<W: Write> {
    sink: W,
}

impl<W: Write> ReportWriter<W> {
    /// Creates a new `ReportWriter` over any `Write` sink (e.g., Stdout, File).
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Writes `rows` as one table. Nothing is written for an empty table.
    pub fn write_table<T: Serialize>(&mut self, rows: &[T]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(&mut self.sink);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_report(&mut self, report: &DemoReport) -> Result<()> {
        self.write_table(&report.bookings)?;
        if !report.payments.is_empty() {
            writeln!(self.sink)?;
            self.write_table(&report.payments)?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
