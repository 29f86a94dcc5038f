use chrono::{TimeZone, Utc};
use monascope::output::csv::CsvOutput;
use monascope::output::json::JsonOutput;
use monascope::output::sqlite::SqliteOutput;
use monascope::output::OutputHandler;
use monascope::{ChainSnapshot, DashboardState};
use sqlx::Row;
use tempfile::TempDir;

fn state(cycles_completed: u64, height: u64, error: Option<&str>) -> DashboardState {
    DashboardState {
        latest: Some(ChainSnapshot {
            block_height: height,
            window_transaction_count: 12,
            window_contract_creation_count: 3,
            approximate_throughput: Some(1.2),
            blocks_requested: 3,
            blocks_sampled: 2,
            missing_blocks: vec![99],
            sampled_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        }),
        last_error: error.map(str::to_string),
        cycles_completed,
    }
}

#[tokio::test]
async fn json_sink_writes_each_cycle_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snapshots.json");

    let mut sink = JsonOutput::new(path.clone()).unwrap();
    sink.write(&state(1, 100, None)).await.unwrap();
    // a failed cycle republishes the same snapshot with an error
    sink.write(&state(1, 100, Some("timeout"))).await.unwrap();
    sink.write(&state(2, 101, None)).await.unwrap();
    sink.close().await.unwrap();

    let written: Vec<ChainSnapshot> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(written[0].block_height, 100);
    assert_eq!(written[1].block_height, 101);
    assert_eq!(written[1].missing_blocks, vec![99]);
}

#[tokio::test]
async fn json_sink_ignores_loading_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.json");

    let mut sink = JsonOutput::new(path.clone()).unwrap();
    sink.write(&DashboardState::default()).await.unwrap();
    sink.close().await.unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
}

#[tokio::test]
async fn csv_sink_writes_header_and_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snapshots.csv");

    let mut sink = CsvOutput::new(path.clone()).unwrap();
    sink.write(&state(1, 100, None)).await.unwrap();
    sink.write(&state(2, 101, None)).await.unwrap();
    sink.close().await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("sampled_at,block_height"));
    assert!(lines[1].contains(",100,12,3,1.2000,3,2,99"));
    assert!(lines[2].contains(",101,"));
}

#[tokio::test]
async fn sqlite_sink_inserts_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snapshots.db");

    let mut sink = SqliteOutput::new(path, "snapshots".to_string()).await.unwrap();
    sink.write(&state(1, 100, None)).await.unwrap();
    sink.write(&state(2, 101, None)).await.unwrap();

    let rows = sqlx::query("SELECT block_height, missing_blocks FROM snapshots ORDER BY id")
        .fetch_all(sink.pool())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get::<i64, _>("block_height"), 100);
    assert_eq!(rows[1].get::<String, _>("missing_blocks"), "[99]");

    sink.close().await.unwrap();
}

#[tokio::test]
async fn sqlite_sink_rejects_unsafe_table_name() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.db");
    assert!(SqliteOutput::new(path, "x; DROP TABLE y".to_string()).await.is_err());
}
