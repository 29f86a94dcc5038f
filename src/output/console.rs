use super::OutputHandler;
use crate::dashboard::DashboardView;
use crate::error::{Error, Result};
use crate::poller::DashboardState;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use indicatif::MultiProgress;
use std::sync::Arc;

pub struct ConsoleOutput {
    view: DashboardView,
    multi: Option<Arc<MultiProgress>>,
}

impl ConsoleOutput {
    pub fn new(
        window_size: u64,
        network_launch: Option<NaiveDate>,
        multi: Option<Arc<MultiProgress>>,
    ) -> Self {
        Self {
            view: DashboardView::new(window_size, network_launch),
            multi,
        }
    }
}

#[async_trait]
impl OutputHandler for ConsoleOutput {
    async fn write(&mut self, state: &DashboardState) -> Result<()> {
        let output = self.view.render(state, Utc::now());

        if let Some(multi) = &self.multi {
            for line in output.lines() {
                multi.println(line).map_err(|e| Error::Internal(e.to_string()))?;
            }
        } else {
            println!("{}", output);
        }
        Ok(())
    }
}
