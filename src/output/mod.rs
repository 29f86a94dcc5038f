use crate::error::Result;
use crate::poller::DashboardState;
use crate::snapshot::ChainSnapshot;
use async_trait::async_trait;

pub mod console;
pub mod json;
pub mod csv;
pub mod sqlite;

#[async_trait]
pub trait OutputHandler: Send + Sync {
    /// Called with every published dashboard state, including failed cycles.
    async fn write(&mut self, state: &DashboardState) -> Result<()>;
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Tracks which cycle a recording sink has already written so repeated or
/// error-only states do not produce duplicate rows.
#[derive(Debug, Default)]
pub(crate) struct CycleCursor {
    written: u64,
}

impl CycleCursor {
    pub(crate) fn next<'a>(&mut self, state: &'a DashboardState) -> Option<&'a ChainSnapshot> {
        if state.cycles_completed <= self.written {
            return None;
        }
        let snapshot = state.latest.as_ref()?;
        self.written = state.cycles_completed;
        Some(snapshot)
    }
}
