use crate::poller::DashboardState;
use crate::snapshot::ChainSnapshot;
use chrono::{DateTime, NaiveDate, Utc};

const PLACEHOLDER: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub label: String,
    pub value: String,
}

impl Card {
    fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Card layout for one rendering of the dashboard.
pub struct DashboardView {
    window_size: u64,
    network_launch: Option<NaiveDate>,
}

impl DashboardView {
    pub fn new(window_size: u64, network_launch: Option<NaiveDate>) -> Self {
        Self {
            window_size,
            network_launch,
        }
    }

    pub fn cards(&self, snapshot: Option<&ChainSnapshot>, now: DateTime<Utc>) -> Vec<Card> {
        let value = |f: &dyn Fn(&ChainSnapshot) -> String| {
            snapshot.map(f).unwrap_or_else(|| PLACEHOLDER.to_string())
        };

        let mut cards = vec![
            Card::new("Block Height", value(&|s| s.block_height.to_string())),
            Card::new(
                format!("Txs (last {} blocks)", self.window_size),
                value(&|s| s.window_transaction_count.to_string()),
            ),
            Card::new("TPS (approx.)", value(&ChainSnapshot::throughput_display)),
            Card::new(
                format!("Contracts Created (last {} blocks)", self.window_size),
                value(&|s| s.window_contract_creation_count.to_string()),
            ),
        ];

        if let Some(launch) = self.network_launch {
            cards.push(Card::new(
                "Testnet Days",
                days_since(launch, now).to_string(),
            ));
        }
        cards
    }

    /// Renders the cards as a boxed block of text, with the error line and a
    /// degraded-window note when applicable.
    pub fn render(&self, state: &DashboardState, now: DateTime<Utc>) -> String {
        let cards = self.cards(state.latest.as_ref(), now);
        let label_width = cards.iter().map(|c| c.label.len()).max().unwrap_or(0);

        let mut lines: Vec<String> = cards
            .iter()
            .map(|c| format!("{:<width$}  {}", c.label, c.value, width = label_width))
            .collect();

        if let Some(snapshot) = state.latest.as_ref().filter(|s| s.is_degraded()) {
            lines.push(format!(
                "! {} of {} blocks missing from window",
                snapshot.missing_blocks.len(),
                snapshot.blocks_requested
            ));
        }
        if let Some(error) = &state.last_error {
            lines.push(format!("Error: {}", error));
        }

        let inner = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let border = format!("+{}+", "-".repeat(inner + 2));

        let body = lines
            .iter()
            .map(|line| format!("| {:<width$} |", line, width = inner));

        std::iter::once(border.clone())
            .chain(body)
            .chain(std::iter::once(border))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Whole days elapsed since `launch`, never negative.
pub fn days_since(launch: NaiveDate, now: DateTime<Utc>) -> i64 {
    now.date_naive().signed_duration_since(launch).num_days().max(0)
}
