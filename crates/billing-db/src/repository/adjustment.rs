//! # Adjustment Repository
//!
//! Ledger accounts an invoice adjustment (round off, discount, advance) can
//! be posted to.

use serde::Deserialize;

use billing_core::AdjustmentAccount;

use crate::error::DbResult;
use crate::executor::ResilientExecutor;
use crate::params::{Params, Statement};

const LIST_ACCOUNTS: Statement = Statement::query(
    "SELECT AccountId, AccountName, AccountType, IsActive
     FROM AdjustmentAccounts
     WHERE IsActive = 1
     ORDER BY AccountName",
    &[],
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccountRow {
    account_id: i32,
    account_name: String,
    account_type: Option<String>,
    #[serde(default)]
    is_active: Option<bool>,
}

impl From<AccountRow> for AdjustmentAccount {
    fn from(row: AccountRow) -> Self {
        AdjustmentAccount {
            account_id: row.account_id,
            account_name: row.account_name,
            account_type: row.account_type,
            is_active: row.is_active.unwrap_or(true),
        }
    }
}

/// Repository for adjustment accounts.
#[derive(Debug, Clone)]
pub struct AdjustmentRepository {
    executor: ResilientExecutor,
}

impl AdjustmentRepository {
    pub fn new(executor: ResilientExecutor) -> Self {
        AdjustmentRepository { executor }
    }

    /// Active adjustment accounts ordered by name.
    pub async fn list_accounts(&self) -> DbResult<Vec<AdjustmentAccount>> {
        let rows: Vec<AccountRow> = self.executor.fetch_all(&LIST_ACCOUNTS, Params::new()).await?;
        Ok(rows.into_iter().map(AdjustmentAccount::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::error::ErrorKind;
    use crate::executor::RetryPolicy;
    use crate::pool::PoolManager;
    use crate::testing::{record, ScriptedConnector};

    fn repo(script: &ScriptedConnector) -> AdjustmentRepository {
        let pool = Arc::new(PoolManager::new(Arc::new(script.clone())));
        AdjustmentRepository::new(ResilientExecutor::new(pool, RetryPolicy::default()))
    }

    #[tokio::test]
    async fn test_list_accounts() {
        let script = ScriptedConnector::new();
        script.respond(
            "FROM AdjustmentAccounts",
            vec![
                record(json!({"AccountId": 1, "AccountName": "Advance", "AccountType": "Credit"})),
                record(json!({"AccountId": 2, "AccountName": "Round Off", "AccountType": null, "IsActive": true})),
            ],
        );

        let accounts = repo(&script).list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert!(accounts[0].is_active);
        assert_eq!(accounts[1].account_type, None);
    }

    #[tokio::test]
    async fn test_syntax_error_is_surfaced_once() {
        let script = ScriptedConnector::new();
        script.fail("FROM AdjustmentAccounts", ErrorKind::Syntax, 1);

        let err = repo(&script).list_accounts().await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Syntax));
        assert_eq!(script.attempts(), 1);
    }
}
