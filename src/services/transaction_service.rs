use chrono::Utc;
use std::sync::Arc;

use crate::cache::{CacheKey, CachedValue, ListFilter, TransactionCache};
use crate::domain::{Transaction, TransactionInput, TransactionModifyInput, TransactionView};
use crate::error::AppError;
use crate::ports::{Page, PageRequest, RepositoryError, TransactionRepository};

/// Business operations on transactions.
///
/// Owns the uniqueness and existence rules and the cache policy: reads go
/// through the cache, every successful write clears it entirely.
#[derive(Clone)]
pub struct TransactionService {
    repository: Arc<dyn TransactionRepository>,
    cache: TransactionCache,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn already_exists(transaction_no: &str) -> AppError {
    AppError::Business(format!(
        "Transaction with transactionNo {} already exists.",
        transaction_no
    ))
}

fn does_not_exist(id: i64) -> AppError {
    AppError::Business(format!("Transaction with id {} does not exist.", id))
}

impl TransactionService {
    pub fn new(repository: Arc<dyn TransactionRepository>, cache: TransactionCache) -> Self {
        Self { repository, cache }
    }

    pub async fn create(&self, input: TransactionInput) -> Result<TransactionView, AppError> {
        if self
            .repository
            .find_by_transaction_no(&input.transaction_no)
            .await?
            .is_some()
        {
            return Err(already_exists(&input.transaction_no));
        }

        let tx = Transaction::new(input, now_millis());
        // The unique index still decides when two creates race past the check above.
        let saved = self.repository.save(&tx).await.map_err(|e| match e {
            RepositoryError::Conflict(no) => already_exists(&no),
            other => AppError::from(other),
        })?;
        self.cache.evict_all().await;

        tracing::info!(
            id = ?saved.id,
            transaction_no = %saved.transaction_no,
            "Transaction created"
        );
        Ok(saved.into())
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.repository.exists_by_id(id).await? {
            return Err(does_not_exist(id));
        }

        self.repository.delete_by_id(id).await?;
        self.cache.evict_all().await;

        tracing::info!(id, "Transaction deleted");
        Ok(())
    }

    pub async fn modify(
        &self,
        id: i64,
        input: TransactionModifyInput,
    ) -> Result<TransactionView, AppError> {
        let mut tx = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| does_not_exist(id))?;

        tx.apply(input, now_millis());
        let saved = self.repository.save(&tx).await.map_err(|e| match e {
            RepositoryError::NotFound(_) => does_not_exist(id),
            other => AppError::from(other),
        })?;
        self.cache.evict_all().await;

        tracing::info!(id, "Transaction modified");
        Ok(saved.into())
    }

    pub async fn list(
        &self,
        transaction_no: Option<&str>,
        request: PageRequest,
    ) -> Result<Page<TransactionView>, AppError> {
        let filter = ListFilter::from_query(transaction_no);
        let key = CacheKey::list(filter.clone(), request);
        if let Some(CachedValue::List(page)) = self.cache.get(&key).await {
            return Ok(page);
        }

        let generation = self.cache.generation().await;
        let page = self
            .repository
            .search(filter.as_filter(), request)
            .await?
            .map(TransactionView::from);
        self.cache
            .put(key, CachedValue::List(page.clone()), generation)
            .await;

        Ok(page)
    }

    /// Absent results are not cached.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<TransactionView>, AppError> {
        let key = CacheKey::Detail(id);
        if let Some(CachedValue::Detail(view)) = self.cache.get(&key).await {
            return Ok(Some(view));
        }

        let generation = self.cache.generation().await;
        let view = self
            .repository
            .find_by_id(id)
            .await?
            .map(TransactionView::from);
        if let Some(view) = &view {
            self.cache
                .put(key, CachedValue::Detail(view.clone()), generation)
                .await;
        }

        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryTransactionRepository;
    use crate::ports::RepositoryResult;
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps the in-memory repository and counts calls per operation.
    #[derive(Default)]
    struct CountingRepository {
        inner: InMemoryTransactionRepository,
        hide_existing_numbers: bool,
        find_by_id_calls: AtomicUsize,
        search_calls: AtomicUsize,
        save_calls: AtomicUsize,
        delete_calls: AtomicUsize,
    }

    #[async_trait]
    impl TransactionRepository for CountingRepository {
        async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Transaction>> {
            self.find_by_id_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_id(id).await
        }

        async fn find_by_transaction_no(
            &self,
            transaction_no: &str,
        ) -> RepositoryResult<Option<Transaction>> {
            if self.hide_existing_numbers {
                return Ok(None);
            }
            self.inner.find_by_transaction_no(transaction_no).await
        }

        async fn search(
            &self,
            filter: Option<&str>,
            request: PageRequest,
        ) -> RepositoryResult<Page<Transaction>> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.search(filter, request).await
        }

        async fn save(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
            self.save_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.save(tx).await
        }

        async fn exists_by_id(&self, id: i64) -> RepositoryResult<bool> {
            self.inner.exists_by_id(id).await
        }

        async fn delete_by_id(&self, id: i64) -> RepositoryResult<()> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.delete_by_id(id).await
        }

        async fn ping(&self) -> RepositoryResult<()> {
            Ok(())
        }
    }

    fn setup() -> (TransactionService, Arc<CountingRepository>) {
        setup_with(CountingRepository::default())
    }

    fn setup_with(repo: CountingRepository) -> (TransactionService, Arc<CountingRepository>) {
        let repo = Arc::new(repo);
        let service = TransactionService::new(repo.clone(), TransactionCache::new());
        (service, repo)
    }

    fn input(no: &str) -> TransactionInput {
        TransactionInput {
            transaction_no: no.to_string(),
            source_account_id: 1,
            target_account_id: 2,
            amount: BigDecimal::from_str("100.00").unwrap(),
            description: "Test Transaction".to_string(),
        }
    }

    fn modify_input() -> TransactionModifyInput {
        TransactionModifyInput {
            source_account_id: 10,
            target_account_id: 20,
            amount: BigDecimal::from_str("55.50").unwrap(),
            description: "Modified".to_string(),
        }
    }

    fn business_message(err: AppError) -> String {
        match err {
            AppError::Business(msg) => msg,
            other => panic!("expected business error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (service, _) = setup();

        let created = service.create(input("12345")).await.unwrap();
        let fetched = service
            .get_by_id(created.id.unwrap())
            .await
            .unwrap()
            .expect("present");

        assert_eq!(fetched, created);
        assert_eq!(fetched.transaction_no, "12345");
        assert_eq!(fetched.source_account_id, 1);
        assert_eq!(fetched.target_account_id, 2);
        assert_eq!(fetched.amount, BigDecimal::from(100));
        assert_eq!(fetched.description, "Test Transaction");
        assert_eq!(fetched.create_time, fetched.update_time);
    }

    #[tokio::test]
    async fn create_duplicate_fails_without_insert() {
        let (service, repo) = setup();
        service.create(input("12345")).await.unwrap();
        assert_eq!(repo.save_calls.load(Ordering::SeqCst), 1);

        let msg = business_message(service.create(input("12345")).await.unwrap_err());

        assert_eq!(msg, "Transaction with transactionNo 12345 already exists.");
        assert_eq!(repo.save_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn create_duplicate_rejected_by_storage_constraint() {
        let (service, repo) = setup_with(CountingRepository {
            hide_existing_numbers: true,
            ..Default::default()
        });
        service.create(input("RACE")).await.unwrap();

        let msg = business_message(service.create(input("RACE")).await.unwrap_err());

        assert!(msg.contains("RACE"));
        assert_eq!(repo.save_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn delete_missing_fails_without_delete() {
        let (service, repo) = setup();

        let msg = business_message(service.delete(999).await.unwrap_err());

        assert_eq!(msg, "Transaction with id 999 does not exist.");
        assert_eq!(repo.delete_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let (service, _) = setup();
        let created = service.create(input("DEL")).await.unwrap();
        let id = created.id.unwrap();

        service.delete(id).await.unwrap();

        assert_eq!(service.get_by_id(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn modify_missing_fails_without_save() {
        let (service, repo) = setup();

        let msg = business_message(service.modify(7, modify_input()).await.unwrap_err());

        assert_eq!(msg, "Transaction with id 7 does not exist.");
        assert_eq!(repo.save_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn modify_preserves_identity_fields() {
        let (service, _) = setup();
        let created = service.create(input("KEEP-ME")).await.unwrap();

        let modified = service
            .modify(created.id.unwrap(), modify_input())
            .await
            .unwrap();

        assert_eq!(modified.id, created.id);
        assert_eq!(modified.transaction_no, "KEEP-ME");
        assert_eq!(modified.create_time, created.create_time);
        assert!(modified.update_time >= modified.create_time);
        assert_eq!(modified.source_account_id, 10);
        assert_eq!(modified.target_account_id, 20);
        assert_eq!(modified.amount, BigDecimal::from_str("55.50").unwrap());
        assert_eq!(modified.description, "Modified");
    }

    #[tokio::test]
    async fn list_filters_by_substring() {
        let (service, _) = setup();
        for no in ["ORD-100", "ORD-200", "REF-100"] {
            service.create(input(no)).await.unwrap();
        }

        let filtered = service
            .list(Some("100"), PageRequest::new(0, 10))
            .await
            .unwrap();
        let unfiltered = service.list(Some(""), PageRequest::new(0, 10)).await.unwrap();

        let numbers: Vec<_> = filtered
            .content
            .iter()
            .map(|v| v.transaction_no.as_str())
            .collect();
        assert_eq!(numbers, vec!["ORD-100", "REF-100"]);
        assert_eq!(unfiltered.total_elements, 3);
    }

    #[tokio::test]
    async fn list_is_served_from_cache_until_a_write() {
        let (service, repo) = setup();
        service.create(input("A-1")).await.unwrap();

        service.list(None, PageRequest::new(0, 10)).await.unwrap();
        let cached = service.list(None, PageRequest::new(0, 10)).await.unwrap();
        assert_eq!(repo.search_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.total_elements, 1);

        service.create(input("A-2")).await.unwrap();
        let fresh = service.list(None, PageRequest::new(0, 10)).await.unwrap();

        assert_eq!(repo.search_calls.load(Ordering::SeqCst), 2);
        assert_eq!(fresh.total_elements, 2);
    }

    #[tokio::test]
    async fn get_by_id_reflects_modify_and_delete() {
        let (service, repo) = setup();
        let id = service.create(input("C-1")).await.unwrap().id.unwrap();

        service.get_by_id(id).await.unwrap();
        service.get_by_id(id).await.unwrap();
        assert_eq!(repo.find_by_id_calls.load(Ordering::SeqCst), 1);

        service.modify(id, modify_input()).await.unwrap();
        let after_modify = service.get_by_id(id).await.unwrap().expect("present");
        assert_eq!(after_modify.description, "Modified");

        service.delete(id).await.unwrap();
        assert_eq!(service.get_by_id(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn absent_lookups_are_not_cached() {
        let (service, repo) = setup();

        assert_eq!(service.get_by_id(5).await.unwrap(), None);
        assert_eq!(service.get_by_id(5).await.unwrap(), None);

        assert_eq!(repo.find_by_id_calls.load(Ordering::SeqCst), 2);
    }
}
