//! Runs against a real server when `TSBENCH_CLICKHOUSE_URL` is set.
//!
//! ```bash
//! TSBENCH_CLICKHOUSE_URL="http://default:@localhost:8123/tsbench" \
//!     cargo test -p tsbench-clickhouse --test live_clickhouse
//! ```

use std::sync::Arc;
use tsbench_clickhouse::ClickHouseStore;
use tsbench_core::{ExecutorOptions, RecordCounts, Table};
use tsbench_executor::{Executor, Store};

#[tokio::test]
async fn test_live_sized_case() {
    let Ok(url) = std::env::var("TSBENCH_CLICKHOUSE_URL") else {
        eprintln!("TSBENCH_CLICKHOUSE_URL not set, skipping");
        return;
    };

    let store = Arc::new(ClickHouseStore::connect(&url).await.unwrap());
    store.drop_tables().await.unwrap();

    let options = ExecutorOptions {
        run_schema_setup: true,
        run_schema_teardown: false,
        parallel_readers: 1,
        parallel_writers: 1,
        min_records: 100,
        records: RecordCounts {
            users: 2,
            devices: 4,
            events: 0,
        },
        iterations: 20,
        ..Default::default()
    };
    let mut executor = Executor::new("click_house", store.clone(), None, 7, options);

    executor
        .run("parallel_complex_rw_with_min_records")
        .await
        .unwrap();
    assert_eq!(store.count(Table::Events).await.unwrap(), 100 + 20);
    assert!(!store.yearly_summary().await.unwrap().is_empty());

    executor.teardown().await.unwrap();
}
