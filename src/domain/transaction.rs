//! Transaction domain entity and its input/output shapes.
//! Framework-agnostic representation of a transaction record.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize, Serializer};
use utoipa::ToSchema;

use crate::validation::{
    self, AmountField, ValidationErrors, require, validate_amount, validate_description,
    validate_transaction_no,
};

/// Domain entity representing a stored transaction.
///
/// `id` is `None` until the record has been persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: Option<i64>,
    pub transaction_no: String,
    pub source_account_id: i64,
    pub target_account_id: i64,
    pub amount: BigDecimal,
    pub description: String,
    pub create_time: i64,
    pub update_time: i64,
}

impl Transaction {
    /// Builds an unsaved record, both timestamps set to `now_millis`.
    pub fn new(input: TransactionInput, now_millis: i64) -> Self {
        Self {
            id: None,
            transaction_no: input.transaction_no,
            source_account_id: input.source_account_id,
            target_account_id: input.target_account_id,
            amount: input.amount.with_scale(2),
            description: input.description,
            create_time: now_millis,
            update_time: now_millis,
        }
    }

    /// Overwrites the mutable fields. Id and transaction number stay as they are.
    /// `update_time` never goes below `create_time`, even if the clock stepped back.
    pub fn apply(&mut self, input: TransactionModifyInput, now_millis: i64) {
        self.source_account_id = input.source_account_id;
        self.target_account_id = input.target_account_id;
        self.amount = input.amount.with_scale(2);
        self.description = input.description;
        self.update_time = now_millis.max(self.create_time);
    }
}

/// Validated fields for creating a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInput {
    pub transaction_no: String,
    pub source_account_id: i64,
    pub target_account_id: i64,
    pub amount: BigDecimal,
    pub description: String,
}

/// Validated fields for modifying a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionModifyInput {
    pub source_account_id: i64,
    pub target_account_id: i64,
    pub amount: BigDecimal,
    pub description: String,
}

/// Create request body as received. Server-assigned fields are not part of it.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    pub transaction_no: Option<String>,
    pub source_account_id: Option<i64>,
    pub target_account_id: Option<i64>,
    #[schema(value_type = Option<String>, example = "100.00")]
    pub amount: Option<AmountField>,
    pub description: Option<String>,
}

impl TransactionPayload {
    pub fn validate(self) -> Result<TransactionInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match require("transactionNo", &self.transaction_no) {
            Ok(no) => errors.check(validate_transaction_no(no)),
            Err(e) => errors.add(e),
        }
        let modify = ModifyFields {
            source_account_id: self.source_account_id,
            target_account_id: self.target_account_id,
            amount: self.amount,
            description: self.description,
        }
        .validate_into(&mut errors);

        match (self.transaction_no, modify) {
            (Some(transaction_no), Some(fields)) if errors.is_empty() => Ok(TransactionInput {
                transaction_no,
                source_account_id: fields.source_account_id,
                target_account_id: fields.target_account_id,
                amount: fields.amount,
                description: fields.description,
            }),
            _ => Err(errors),
        }
    }
}

/// Modify request body as received. Any `transactionNo` sent by the client is ignored.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionModifyPayload {
    pub source_account_id: Option<i64>,
    pub target_account_id: Option<i64>,
    #[schema(value_type = Option<String>, example = "100.00")]
    pub amount: Option<AmountField>,
    pub description: Option<String>,
}

impl TransactionModifyPayload {
    pub fn validate(self) -> Result<TransactionModifyInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let fields = ModifyFields {
            source_account_id: self.source_account_id,
            target_account_id: self.target_account_id,
            amount: self.amount,
            description: self.description,
        }
        .validate_into(&mut errors);

        match fields {
            Some(fields) if errors.is_empty() => Ok(fields),
            _ => Err(errors),
        }
    }
}

struct ModifyFields {
    source_account_id: Option<i64>,
    target_account_id: Option<i64>,
    amount: Option<AmountField>,
    description: Option<String>,
}

impl ModifyFields {
    fn validate_into(self, errors: &mut ValidationErrors) -> Option<TransactionModifyInput> {
        if let Err(e) = require("sourceAccountId", &self.source_account_id) {
            errors.add(e);
        }
        if let Err(e) = require("targetAccountId", &self.target_account_id) {
            errors.add(e);
        }

        let amount = match require("amount", &self.amount)
            .and_then(|raw| validation::parse_amount("amount", raw))
        {
            Ok(amount) => match validate_amount("amount", &amount) {
                Ok(()) => Some(amount),
                Err(e) => {
                    errors.add(e);
                    None
                }
            },
            Err(e) => {
                errors.add(e);
                None
            }
        };

        match require("description", &self.description) {
            Ok(description) => errors.check(validate_description(description)),
            Err(e) => errors.add(e),
        }

        Some(TransactionModifyInput {
            source_account_id: self.source_account_id?,
            target_account_id: self.target_account_id?,
            amount: amount?,
            description: self.description?,
        })
    }
}

/// Transaction as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: Option<i64>,
    pub transaction_no: String,
    pub source_account_id: i64,
    pub target_account_id: i64,
    #[serde(serialize_with = "serialize_amount")]
    #[schema(value_type = String, example = "100.00")]
    pub amount: BigDecimal,
    pub description: String,
    pub create_time: i64,
    pub update_time: i64,
}

fn serialize_amount<S: Serializer>(amount: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&amount.with_scale(2).to_string())
}

impl From<Transaction> for TransactionView {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            transaction_no: tx.transaction_no,
            source_account_id: tx.source_account_id,
            target_account_id: tx.target_account_id,
            amount: tx.amount,
            description: tx.description,
            create_time: tx.create_time,
            update_time: tx.update_time,
        }
    }
}
