//! In-memory implementation of TransactionRepository.
//! Enforces the same unique transaction number constraint as the table.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::Transaction;
use crate::ports::{Page, PageRequest, RepositoryError, RepositoryResult, TransactionRepository};

#[derive(Default)]
struct Store {
    rows: BTreeMap<i64, Transaction>,
    next_id: i64,
}

#[derive(Clone, Default)]
pub struct InMemoryTransactionRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Transaction>> {
        Ok(self.store.read().await.rows.get(&id).cloned())
    }

    async fn find_by_transaction_no(
        &self,
        transaction_no: &str,
    ) -> RepositoryResult<Option<Transaction>> {
        Ok(self
            .store
            .read()
            .await
            .rows
            .values()
            .find(|tx| tx.transaction_no == transaction_no)
            .cloned())
    }

    async fn search(
        &self,
        filter: Option<&str>,
        request: PageRequest,
    ) -> RepositoryResult<Page<Transaction>> {
        let store = self.store.read().await;
        let matching: Vec<&Transaction> = store
            .rows
            .values()
            .filter(|tx| filter.map_or(true, |f| tx.transaction_no.contains(f)))
            .collect();

        let content = matching
            .iter()
            .skip(request.offset().max(0) as usize)
            .take(request.size.max(0) as usize)
            .map(|tx| (*tx).clone())
            .collect();

        Ok(Page::new(content, request, matching.len() as i64))
    }

    async fn save(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let mut store = self.store.write().await;

        match tx.id {
            None => {
                if store
                    .rows
                    .values()
                    .any(|existing| existing.transaction_no == tx.transaction_no)
                {
                    return Err(RepositoryError::Conflict(tx.transaction_no.clone()));
                }

                store.next_id += 1;
                let id = store.next_id;
                let mut saved = tx.clone();
                saved.id = Some(id);
                store.rows.insert(id, saved.clone());
                Ok(saved)
            }
            Some(id) => {
                let existing = store
                    .rows
                    .get_mut(&id)
                    .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

                existing.source_account_id = tx.source_account_id;
                existing.target_account_id = tx.target_account_id;
                existing.amount = tx.amount.clone();
                existing.description = tx.description.clone();
                existing.update_time = tx.update_time;
                Ok(existing.clone())
            }
        }
    }

    async fn exists_by_id(&self, id: i64) -> RepositoryResult<bool> {
        Ok(self.store.read().await.rows.contains_key(&id))
    }

    async fn delete_by_id(&self, id: i64) -> RepositoryResult<()> {
        self.store.write().await.rows.remove(&id);
        Ok(())
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}
