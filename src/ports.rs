//! Storage port for transactions.
//! Adapters live in `crate::adapters`.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::domain::Transaction;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Zero-based page index plus page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    pub fn new(page: i64, size: i64) -> Self {
        Self { page, size }
    }

    /// Row offset of the first element. Saturates instead of overflowing.
    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }
}

/// One slice of a larger result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: i64,
    pub total_pages: i64,
    pub number: i64,
    pub size: i64,
    pub number_of_elements: i64,
    pub first: bool,
    pub last: bool,
    pub empty: bool,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: i64) -> Self {
        let total_pages = if request.size > 0 {
            (total_elements + request.size - 1) / request.size
        } else {
            0
        };
        let number_of_elements = content.len() as i64;

        Self {
            empty: content.is_empty(),
            content,
            total_elements,
            total_pages,
            number: request.page,
            size: request.size,
            number_of_elements,
            first: request.page == 0,
            last: request.page + 1 >= total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            number: self.number,
            size: self.size,
            number_of_elements: self.number_of_elements,
            first: self.first,
            last: self.last,
            empty: self.empty,
        }
    }
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Transaction>>;

    async fn find_by_transaction_no(&self, transaction_no: &str)
        -> RepositoryResult<Option<Transaction>>;

    /// Records whose transaction number contains `filter` (case-sensitive,
    /// literal), or all records when `filter` is `None`. Ordered by id.
    async fn search(
        &self,
        filter: Option<&str>,
        request: PageRequest,
    ) -> RepositoryResult<Page<Transaction>>;

    /// Inserts when `tx.id` is `None`, updates otherwise.
    async fn save(&self, tx: &Transaction) -> RepositoryResult<Transaction>;

    async fn exists_by_id(&self, id: i64) -> RepositoryResult<bool>;

    async fn delete_by_id(&self, id: i64) -> RepositoryResult<()>;

    async fn ping(&self) -> RepositoryResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_metadata_for_middle_page() {
        let page = Page::new(vec![1, 2], PageRequest::new(1, 2), 5);

        assert_eq!(page.total_pages, 3);
        assert_eq!(page.number, 1);
        assert_eq!(page.number_of_elements, 2);
        assert!(!page.first);
        assert!(!page.last);
        assert!(!page.empty);
    }

    #[test]
    fn page_metadata_for_empty_result() {
        let page: Page<i32> = Page::new(vec![], PageRequest::new(0, 10), 0);

        assert_eq!(page.total_pages, 0);
        assert!(page.first);
        assert!(page.last);
        assert!(page.empty);
    }

    #[test]
    fn map_keeps_metadata() {
        let page = Page::new(vec![1, 2, 3], PageRequest::new(0, 3), 3).map(|n| n * 10);

        assert_eq!(page.content, vec![10, 20, 30]);
        assert_eq!(page.total_elements, 3);
        assert!(page.last);
    }

    #[test]
    fn offset_uses_zero_based_page() {
        assert_eq!(PageRequest::new(0, 10).offset(), 0);
        assert_eq!(PageRequest::new(3, 10).offset(), 30);
    }
}
