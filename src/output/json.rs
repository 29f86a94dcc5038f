use super::{CycleCursor, OutputHandler};
use crate::error::Result;
use crate::poller::DashboardState;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Writes snapshots as a JSON array; the array is closed by `close`.
pub struct JsonOutput {
    file: File,
    first: bool,
    cursor: CycleCursor,
}

impl JsonOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        write!(file, "[")?;

        Ok(Self {
            file,
            first: true,
            cursor: CycleCursor::default(),
        })
    }
}

#[async_trait]
impl OutputHandler for JsonOutput {
    async fn write(&mut self, state: &DashboardState) -> Result<()> {
        let Some(snapshot) = self.cursor.next(state) else {
            return Ok(());
        };

        if !self.first {
            write!(self.file, ",")?;
        } else {
            self.first = false;
        }

        serde_json::to_writer(&mut self.file, snapshot)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        write!(self.file, "]")?;
        self.file.flush()?;
        Ok(())
    }
}
