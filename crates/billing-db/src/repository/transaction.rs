//! # Transaction Repository
//!
//! Voucher number lookups for the transaction screens. The number returned
//! is a preview: nothing is reserved or written, and two terminals asking
//! for the same series get the same answer until an invoice is saved.

use tracing::debug;

use billing_core::voucher::next_voucher_number;
use billing_core::GeneratedVoucher;

use crate::error::DbResult;
use crate::executor::ResilientExecutor;
use crate::params::{ParamSpec, Params, SqlType, Statement};
use crate::record::column_i64;

pub(crate) const LAST_VOUCHER: Statement = Statement::query(
    "SELECT MAX(VoucherNo) AS LastNumber
     FROM InvoiceHeader
     WHERE VoucherSeries = @VoucherSeries",
    &[ParamSpec::required("VoucherSeries", SqlType::NVarChar)],
);

/// Highest stored voucher number for `series`, if the series was used.
pub(crate) async fn last_voucher_number(
    executor: &ResilientExecutor,
    series: &str,
) -> DbResult<Option<i64>> {
    let rows = executor
        .execute(&LAST_VOUCHER, Params::new().set("VoucherSeries", series))
        .await?;
    Ok(rows.first().and_then(|row| column_i64(row, "LastNumber")))
}

/// Repository for transaction screen lookups.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    executor: ResilientExecutor,
}

impl TransactionRepository {
    pub fn new(executor: ResilientExecutor) -> Self {
        TransactionRepository { executor }
    }

    /// Next voucher number for an already validated series.
    pub async fn next_voucher(&self, series: &str) -> DbResult<GeneratedVoucher> {
        let series = series.trim();
        let last = last_voucher_number(&self.executor, series).await?;
        let voucher_number = next_voucher_number(last);

        debug!(series = %series, ?last, voucher_number, "Generated voucher number");
        Ok(GeneratedVoucher {
            series: series.to_string(),
            voucher_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::executor::RetryPolicy;
    use crate::pool::PoolManager;
    use crate::testing::{record, ScriptedConnector};

    fn repo(script: &ScriptedConnector) -> TransactionRepository {
        let pool = Arc::new(PoolManager::new(Arc::new(script.clone())));
        TransactionRepository::new(ResilientExecutor::new(pool, RetryPolicy::default()))
    }

    #[tokio::test]
    async fn test_next_after_stored() {
        let script = ScriptedConnector::new();
        script.respond("MAX(VoucherNo)", vec![record(json!({"LastNumber": 41}))]);

        let voucher = repo(&script).next_voucher(" RS-25NAM ").await.unwrap();
        assert_eq!(voucher.series, "RS-25NAM");
        assert_eq!(voucher.voucher_number, 42);
    }

    #[tokio::test]
    async fn test_unused_series_starts_at_one() {
        let script = ScriptedConnector::new();
        script.respond("MAX(VoucherNo)", vec![record(json!({"LastNumber": null}))]);

        let voucher = repo(&script).next_voucher("SRS-25").await.unwrap();
        assert_eq!(voucher.voucher_number, 1);
    }

    #[tokio::test]
    async fn test_preview_writes_nothing() {
        let script = ScriptedConnector::new();
        let repo = repo(&script);
        repo.next_voucher("RS-25").await.unwrap();
        repo.next_voucher("RS-25").await.unwrap();

        assert!(script.executed().iter().all(|r| r.text() == LAST_VOUCHER.text));
        assert_eq!(script.commits(), 0);
    }
}
