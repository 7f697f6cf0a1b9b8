pub mod transaction;

pub use transaction::{
    Transaction, TransactionInput, TransactionModifyInput, TransactionModifyPayload,
    TransactionPayload, TransactionView,
};
