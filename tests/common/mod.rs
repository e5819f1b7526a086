//! Shared test infrastructure: a scripted mock transaction service that
//! records every invocation, and a temp-file store harness.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use sparepart_core::config::{DatabaseConfig, SparepartConfig};
use sparepart_core::database::{DatabaseConnection, RunStateStore};
use sparepart_core::hierarchy::{RawComponentRecord, RenumberTarget};
use sparepart_core::mi::{MiResponse, TransactionResult, TransactionService};
use sparepart_core::steps::RunContext;
use sparepart_core::Result;

/// One recorded remote invocation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: String,
    pub transaction: String,
    pub params: BTreeMap<String, String>,
}

type Responder = dyn Fn(&str, &str, &BTreeMap<String, String>) -> MiResponse + Send + Sync;

/// Mock [`TransactionService`] with a scripted responder.
pub struct MockTransactionService {
    calls: Mutex<Vec<RecordedCall>>,
    responder: Box<Responder>,
}

impl MockTransactionService {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&str, &str, &BTreeMap<String, String>) -> MiResponse + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    /// OK for every transaction, with generated values where the pipeline
    /// expects them: a planned operation from the property step and a work
    /// order from the lookup step.
    pub fn happy_path() -> Arc<Self> {
        Self::new(|program, _transaction, _params| match program {
            "MOS160MI" => MiResponse::with_record(&[("PLPN", "990001")]),
            "MOS170MI" => MiResponse::with_record(&[("MWNO", "WO0004711")]),
            _ => MiResponse::ok(),
        })
    }

    /// OK for every transaction but never returns any generated value.
    pub fn ok_without_values() -> Arc<Self> {
        Self::new(|_, _, _| MiResponse::ok())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn count_for(&self, program: &str, transaction: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.program == program && c.transaction == transaction)
            .count()
    }
}

#[async_trait]
impl TransactionService for MockTransactionService {
    async fn call(
        &self,
        program: &str,
        transaction: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<MiResponse> {
        self.calls.lock().push(RecordedCall {
            program: program.to_string(),
            transaction: transaction.to_string(),
            params: params.clone(),
        });
        Ok((self.responder)(program, transaction, params))
    }
}

/// A business-conflict response (work order status 80).
pub fn conflict_response() -> MiResponse {
    MiResponse {
        nr_of_failed_transactions: 1,
        results: vec![TransactionResult {
            error_message: Some("Work order status is 80, change not allowed".to_string()),
            error_code: Some("YY123".to_string()),
            ..TransactionResult::default()
        }],
    }
}

/// Store backed by a temp-file SQLite database; the directory guard keeps
/// the file alive for the test's duration.
pub struct StoreHarness {
    pub store: Arc<RunStateStore>,
    _dir: tempfile::TempDir,
}

pub async fn test_store() -> StoreHarness {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = DatabaseConfig {
        path: dir.path().join("cache.db"),
        max_connections: 5,
    };
    let connection = DatabaseConnection::new(&config).await.expect("connect");
    let store = Arc::new(
        RunStateStore::new(connection.pool().clone(), "test")
            .await
            .expect("store"),
    );
    StoreHarness { store, _dir: dir }
}

/// Configuration with fast retries for tests.
pub fn test_config() -> SparepartConfig {
    let mut config = SparepartConfig {
        environment: "test".to_string(),
        ..SparepartConfig::default()
    };
    config.pipeline.retry.delay_ms = 10;
    config
}

/// Run context with a change date set, live mode.
pub fn run_context() -> RunContext {
    let mut ctx = RunContext::new("test", false);
    ctx.change_date = Some("20260805".to_string());
    ctx
}

/// The three-node scenario: the asset root plus two directly attached
/// components.
pub fn scenario_records() -> Vec<RawComponentRecord> {
    let record = |path: &str, item: &str, serial: &str| RawComponentRecord {
        path: path.to_string(),
        component_item: item.to_string(),
        component_serial: serial.to_string(),
        removal_timestamp: "20260105103000".to_string(),
        ..RawComponentRecord::default()
    };
    vec![
        record("1", "", ""),
        record("1-1", "A", "S1"),
        record("1-2", "B", "S2"),
    ]
}

pub fn scenario_target() -> RenumberTarget {
    RenumberTarget {
        asset_item: "WAGX".to_string(),
        asset_serial: "OLD123".to_string(),
        new_asset_item: "NEWX".to_string(),
        new_asset_serial: "NEW123".to_string(),
    }
}
