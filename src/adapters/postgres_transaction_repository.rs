//! Postgres implementation of TransactionRepository.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};

use crate::domain::Transaction;
use crate::ports::{Page, PageRequest, RepositoryError, RepositoryResult, TransactionRepository};

const UNIQUE_VIOLATION: &str = "23505";

const SELECT_BY_ID: &str = r#"
    SELECT id, transaction_no, source_account_id, target_account_id, amount,
           description, create_time, update_time
    FROM transaction_management
    WHERE id = $1
"#;

const SELECT_BY_TRANSACTION_NO: &str = r#"
    SELECT id, transaction_no, source_account_id, target_account_id, amount,
           description, create_time, update_time
    FROM transaction_management
    WHERE transaction_no = $1
"#;

// strpos keeps the match literal; LIKE would treat % and _ as wildcards
const SEARCH_CONTAINING: &str = r#"
    SELECT id, transaction_no, source_account_id, target_account_id, amount,
           description, create_time, update_time
    FROM transaction_management
    WHERE strpos(transaction_no, $1) > 0
    ORDER BY id ASC
    LIMIT $2 OFFSET $3
"#;

const COUNT_CONTAINING: &str =
    "SELECT COUNT(*) FROM transaction_management WHERE strpos(transaction_no, $1) > 0";

const SEARCH_ALL: &str = r#"
    SELECT id, transaction_no, source_account_id, target_account_id, amount,
           description, create_time, update_time
    FROM transaction_management
    ORDER BY id ASC
    LIMIT $1 OFFSET $2
"#;

const COUNT_ALL: &str = "SELECT COUNT(*) FROM transaction_management";

const INSERT: &str = r#"
    INSERT INTO transaction_management (
        transaction_no, source_account_id, target_account_id, amount,
        description, create_time, update_time
    ) VALUES ($1, $2, $3, $4, $5, $6, $7)
    RETURNING id, transaction_no, source_account_id, target_account_id, amount,
              description, create_time, update_time
"#;

const UPDATE: &str = r#"
    UPDATE transaction_management
    SET source_account_id = $2, target_account_id = $3, amount = $4,
        description = $5, update_time = $6
    WHERE id = $1
    RETURNING id, transaction_no, source_account_id, target_account_id, amount,
              description, create_time, update_time
"#;

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Commits on success and rolls back on error. Dropping an uncommitted
/// sqlx transaction also rolls back, so the connection is always released.
async fn finish<T>(
    dbtx: SqlxTransaction<'_, Postgres>,
    result: RepositoryResult<T>,
) -> RepositoryResult<T> {
    match result {
        Ok(value) => {
            dbtx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = dbtx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

fn map_write_error(e: sqlx::Error, transaction_no: &str) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            RepositoryError::Conflict(transaction_no.to_string())
        }
        _ => RepositoryError::Sqlx(e),
    }
}

async fn insert(
    dbtx: &mut SqlxTransaction<'_, Postgres>,
    tx: &Transaction,
) -> RepositoryResult<TransactionRow> {
    sqlx::query_as::<_, TransactionRow>(INSERT)
        .bind(&tx.transaction_no)
        .bind(tx.source_account_id)
        .bind(tx.target_account_id)
        .bind(&tx.amount)
        .bind(&tx.description)
        .bind(tx.create_time)
        .bind(tx.update_time)
        .fetch_one(&mut **dbtx)
        .await
        .map_err(|e| map_write_error(e, &tx.transaction_no))
}

async fn update(
    dbtx: &mut SqlxTransaction<'_, Postgres>,
    id: i64,
    tx: &Transaction,
) -> RepositoryResult<TransactionRow> {
    sqlx::query_as::<_, TransactionRow>(UPDATE)
        .bind(id)
        .bind(tx.source_account_id)
        .bind(tx.target_account_id)
        .bind(&tx.amount)
        .bind(&tx.description)
        .bind(tx.update_time)
        .fetch_optional(&mut **dbtx)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(SELECT_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(TransactionRow::into_domain))
    }

    async fn find_by_transaction_no(
        &self,
        transaction_no: &str,
    ) -> RepositoryResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(SELECT_BY_TRANSACTION_NO)
            .bind(transaction_no)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(TransactionRow::into_domain))
    }

    async fn search(
        &self,
        filter: Option<&str>,
        request: PageRequest,
    ) -> RepositoryResult<Page<Transaction>> {
        let (total, rows) = match filter {
            Some(filter) => {
                let total: i64 = sqlx::query_scalar(COUNT_CONTAINING)
                    .bind(filter)
                    .fetch_one(&self.pool)
                    .await?;
                let rows = sqlx::query_as::<_, TransactionRow>(SEARCH_CONTAINING)
                    .bind(filter)
                    .bind(request.size)
                    .bind(request.offset())
                    .fetch_all(&self.pool)
                    .await?;
                (total, rows)
            }
            None => {
                let total: i64 = sqlx::query_scalar(COUNT_ALL)
                    .fetch_one(&self.pool)
                    .await?;
                let rows = sqlx::query_as::<_, TransactionRow>(SEARCH_ALL)
                    .bind(request.size)
                    .bind(request.offset())
                    .fetch_all(&self.pool)
                    .await?;
                (total, rows)
            }
        };

        let content = rows.into_iter().map(TransactionRow::into_domain).collect();
        Ok(Page::new(content, request, total))
    }

    async fn save(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let mut dbtx = self.pool.begin().await?;
        let result = match tx.id {
            None => insert(&mut dbtx, tx).await,
            Some(id) => update(&mut dbtx, id, tx).await,
        };

        finish(dbtx, result).await.map(TransactionRow::into_domain)
    }

    async fn exists_by_id(&self, id: i64) -> RepositoryResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM transaction_management WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn delete_by_id(&self, id: i64) -> RepositoryResult<()> {
        let mut dbtx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM transaction_management WHERE id = $1")
            .bind(id)
            .execute(&mut *dbtx)
            .await
            .map(|_| ())
            .map_err(RepositoryError::from);

        finish(dbtx, result).await
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    transaction_no: String,
    source_account_id: i64,
    target_account_id: i64,
    amount: BigDecimal,
    description: String,
    create_time: i64,
    update_time: i64,
}

impl TransactionRow {
    fn into_domain(self) -> Transaction {
        Transaction {
            id: Some(self.id),
            transaction_no: self.transaction_no,
            source_account_id: self.source_account_id,
            target_account_id: self.target_account_id,
            amount: self.amount,
            description: self.description,
            create_time: self.create_time,
            update_time: self.update_time,
        }
    }
}
