use bigdecimal::BigDecimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const TRANSACTION_NO_MAX_LEN: usize = 255;
pub const DESCRIPTION_MIN_LEN: usize = 2;
pub const DESCRIPTION_MAX_LEN: usize = 30;
pub const AMOUNT_MAX_FRACTION_DIGITS: i64 = 2;
/// NUMERIC(19,2) leaves 17 digits before the decimal point.
pub const AMOUNT_MAX_INTEGER_DIGITS: i64 = 17;
pub const AMOUNT_INPUT_MAX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

/// Field name to violation message, one message per field.
///
/// Renders as `{field=message, other=message}` with fields in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a violation. The first violation for a field wins.
    pub fn add(&mut self, error: ValidationError) {
        self.errors.entry(error.field).or_insert(error.message);
    }

    pub fn check(&mut self, result: ValidationResult) {
        if let Err(error) = result {
            self.add(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(error);
        errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (field, message)) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", field, message)?;
        }
        f.write_str("}")
    }
}

impl std::error::Error for ValidationErrors {}

/// Amount as sent on the wire. Clients send either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountField {
    Number(serde_json::Number),
    Text(String),
}

impl AmountField {
    fn as_text(&self) -> String {
        match self {
            AmountField::Number(number) => number.to_string(),
            AmountField::Text(text) => text.trim().to_string(),
        }
    }
}

pub fn require<'a, T>(field: &'static str, value: &'a Option<T>) -> Result<&'a T, ValidationError> {
    value
        .as_ref()
        .ok_or_else(|| ValidationError::new(field, "must not be null"))
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be blank"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_len_between(
    field: &'static str,
    value: &str,
    min_len: usize,
    max_len: usize,
) -> ValidationResult {
    let len = value.chars().count();
    if len < min_len || len > max_len {
        return Err(ValidationError::new(
            field,
            format!("length must be between {} and {}", min_len, max_len),
        ));
    }

    Ok(())
}

pub fn parse_amount(field: &'static str, raw: &AmountField) -> Result<BigDecimal, ValidationError> {
    let text = raw.as_text();
    if text.len() > AMOUNT_INPUT_MAX_LEN {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", AMOUNT_INPUT_MAX_LEN),
        ));
    }

    BigDecimal::from_str(&text).map_err(|_| ValidationError::new(field, "must be a decimal number"))
}

fn minimum_amount() -> BigDecimal {
    BigDecimal::new(1.into(), 2)
}

/// Digits before and after the decimal point, ignoring trailing zeros.
///
/// Works on the raw digits and exponent so `1e1000000` is measured
/// without ever being expanded.
fn digit_counts(amount: &BigDecimal) -> (i64, i64) {
    let (int, scale) = amount.as_bigint_and_exponent();
    let digits = int.to_string();
    let digits = digits.trim_start_matches('-');
    let significant = digits.trim_end_matches('0');
    if significant.is_empty() {
        return (0, 0);
    }

    let trailing_zeros = (digits.len() - significant.len()) as i64;
    let scale = scale.saturating_sub(trailing_zeros);
    let integer_digits = (significant.len() as i64).saturating_sub(scale).max(0);
    (integer_digits, scale.max(0))
}

/// At most two fraction digits (trailing zeros ignored), at most 17 integer
/// digits, and strictly above 0.01.
pub fn validate_amount(field: &'static str, amount: &BigDecimal) -> ValidationResult {
    let (integer_digits, fraction_digits) = digit_counts(amount);
    if fraction_digits > AMOUNT_MAX_FRACTION_DIGITS {
        return Err(ValidationError::new(
            field,
            format!("must have at most {} decimal places", AMOUNT_MAX_FRACTION_DIGITS),
        ));
    }
    if integer_digits > AMOUNT_MAX_INTEGER_DIGITS {
        return Err(ValidationError::new(
            field,
            format!("must have at most {} integer digits", AMOUNT_MAX_INTEGER_DIGITS),
        ));
    }

    if amount <= &minimum_amount() {
        return Err(ValidationError::new(field, "must be greater than 0.01"));
    }

    Ok(())
}

pub fn validate_transaction_no(transaction_no: &str) -> ValidationResult {
    validate_required("transactionNo", transaction_no)?;
    validate_max_len("transactionNo", transaction_no, TRANSACTION_NO_MAX_LEN)
}

pub fn validate_description(description: &str) -> ValidationResult {
    validate_required("description", description)?;
    validate_len_between(
        "description",
        description,
        DESCRIPTION_MIN_LEN,
        DESCRIPTION_MAX_LEN,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).expect("valid decimal")
    }

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_len_in_characters() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
        assert!(validate_max_len("field", "äöü", 3).is_ok());
    }

    #[test]
    fn validates_description_bounds() {
        assert!(validate_description("ok").is_ok());
        assert!(validate_description(&"a".repeat(30)).is_ok());
        assert!(validate_description("a").is_err());
        assert!(validate_description(&"a".repeat(31)).is_err());

        let blank = validate_description("   ").unwrap_err();
        assert_eq!(blank.message, "must not be blank");
    }

    #[test]
    fn validates_amount_precision_and_minimum() {
        assert!(validate_amount("amount", &decimal("100.00")).is_ok());
        assert!(validate_amount("amount", &decimal("100")).is_ok());
        assert!(validate_amount("amount", &decimal("0.02")).is_ok());
        assert!(validate_amount("amount", &decimal("1.500")).is_ok());

        let too_precise = validate_amount("amount", &decimal("1.005")).unwrap_err();
        assert_eq!(too_precise.message, "must have at most 2 decimal places");

        let at_minimum = validate_amount("amount", &decimal("0.01")).unwrap_err();
        assert_eq!(at_minimum.message, "must be greater than 0.01");
        assert!(validate_amount("amount", &decimal("0")).is_err());
        assert!(validate_amount("amount", &decimal("-5")).is_err());
    }

    #[test]
    fn limits_amount_integer_digits() {
        assert!(validate_amount("amount", &decimal("99999999999999999.99")).is_ok());
        assert!(validate_amount("amount", &decimal("1e16")).is_ok());

        let too_large = validate_amount("amount", &decimal("100000000000000000")).unwrap_err();
        assert_eq!(too_large.message, "must have at most 17 integer digits");
        assert!(validate_amount("amount", &decimal("1e17")).is_err());
    }

    #[test]
    fn rejects_huge_exponents_without_expanding_them() {
        let huge = validate_amount("amount", &decimal("1e1000000")).unwrap_err();
        assert_eq!(huge.message, "must have at most 17 integer digits");
        assert!(validate_amount("amount", &decimal("-1e1000000")).is_err());

        let tiny = validate_amount("amount", &decimal("1e-1000000")).unwrap_err();
        assert_eq!(tiny.message, "must have at most 2 decimal places");

        assert!(validate_amount("amount", &decimal("0e1000000")).is_err());
    }

    #[test]
    fn parses_amount_from_number_or_text() {
        let number: AmountField = serde_json::from_str("12.34").expect("number");
        let text: AmountField = serde_json::from_str(r#"" 12.34 ""#).expect("text");

        assert_eq!(parse_amount("amount", &number).unwrap(), decimal("12.34"));
        assert_eq!(parse_amount("amount", &text).unwrap(), decimal("12.34"));
        assert!(parse_amount("amount", &AmountField::Text("twelve".into())).is_err());

        let long = AmountField::Text("1".repeat(AMOUNT_INPUT_MAX_LEN + 1));
        assert_eq!(
            parse_amount("amount", &long).unwrap_err().message,
            "must be at most 64 characters"
        );
    }

    #[test]
    fn renders_errors_as_sorted_map() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::new("description", "must not be blank"));
        errors.add(ValidationError::new("amount", "must not be null"));
        errors.add(ValidationError::new("amount", "ignored second violation"));

        assert_eq!(
            errors.to_string(),
            "{amount=must not be null, description=must not be blank}"
        );
        assert_eq!(errors.get("amount"), Some("must not be null"));
    }
}
