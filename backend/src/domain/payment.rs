//! Payment record model.
//!
//! A [`PaymentRecord`] is written once by the payment-capture flow and only
//! ever read by this service. All fields are validated newtypes so that the
//! receipt renderers can embed them (in filenames, HTML, PDF strings) without
//! re-checking.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Validation errors raised while constructing payment record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentValidationError {
    EmptyOrderId,
    OrderIdTooLong { max: usize },
    OrderIdInvalidCharacters,
    UnknownPaymentType(String),
    InvalidCurrency(String),
    InvalidAmount(String),
    NegativeAmount,
    InvalidEmail,
    EmptyField(&'static str),
    FieldTooLong { field: &'static str, max: usize },
}

impl fmt::Display for PaymentValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyOrderId => write!(f, "order id must not be empty"),
            Self::OrderIdTooLong { max } => {
                write!(f, "order id must be at most {max} characters")
            }
            Self::OrderIdInvalidCharacters => write!(
                f,
                "order id may only contain ASCII letters, digits, '_' or '-'"
            ),
            Self::UnknownPaymentType(raw) => write!(f, "unknown payment type '{raw}'"),
            Self::InvalidCurrency(raw) => {
                write!(f, "currency '{raw}' must be three uppercase letters")
            }
            Self::InvalidAmount(raw) => write!(f, "amount '{raw}' is not a valid decimal"),
            Self::NegativeAmount => write!(f, "amount must not be negative"),
            Self::InvalidEmail => write!(f, "customer email is not a valid address"),
            Self::EmptyField(field) => write!(f, "{field} must not be empty"),
            Self::FieldTooLong { field, max } => {
                write!(f, "{field} must be at most {max} characters")
            }
        }
    }
}

impl std::error::Error for PaymentValidationError {}

/// Maximum length of an order identifier.
pub const ORDER_ID_MAX: usize = 64;
/// Maximum length of free-text customer fields.
pub const CUSTOMER_FIELD_MAX: usize = 200;

/// External-facing, immutable order identifier such as `ORDER_1755543375236`.
///
/// Restricted to `[A-Za-z0-9_-]` so it can be used verbatim in the
/// `receipt_<orderId>.pdf` attachment filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(String);

impl OrderId {
    /// Validate and construct an [`OrderId`].
    pub fn new(raw: impl Into<String>) -> Result<Self, PaymentValidationError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(PaymentValidationError::EmptyOrderId);
        }
        if raw.len() > ORDER_ID_MAX {
            return Err(PaymentValidationError::OrderIdTooLong { max: ORDER_ID_MAX });
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(PaymentValidationError::OrderIdInvalidCharacters);
        }
        Ok(Self(raw))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payment method tag recorded at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentType {
    Card,
    BankTransfer,
    Wallet,
    Cash,
}

impl PaymentType {
    /// Stable wire/storage tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
            Self::Wallet => "wallet",
            Self::Cash => "cash",
        }
    }
}

impl FromStr for PaymentType {
    type Err = PaymentValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(Self::Card),
            "bank_transfer" => Ok(Self::BankTransfer),
            "wallet" => Ok(Self::Wallet),
            "cash" => Ok(Self::Cash),
            _ => Err(PaymentValidationError::UnknownPaymentType(s.to_owned())),
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ISO 4217 style currency code (three uppercase ASCII letters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// Borrow the code as a string slice.
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl FromStr for CurrencyCode {
    type Err = PaymentValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            [a, b, c] if [a, b, c].iter().all(|byte| byte.is_ascii_uppercase()) => {
                Ok(Self([*a, *b, *c]))
            }
            _ => Err(PaymentValidationError::InvalidCurrency(s.to_owned())),
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-negative monetary amount held in minor units (hundredths).
///
/// # Examples
/// ```
/// use after_payments::domain::Amount;
///
/// let amount: Amount = "150".parse().expect("valid amount");
/// assert_eq!(amount.to_string(), "150.00");
/// assert_eq!(amount.minor_units(), 15_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    /// Construct from minor units, rejecting negative values.
    pub fn from_minor_units(minor: i64) -> Result<Self, PaymentValidationError> {
        if minor < 0 {
            return Err(PaymentValidationError::NegativeAmount);
        }
        Ok(Self(minor))
    }

    /// Amount in minor units.
    pub fn minor_units(self) -> i64 {
        self.0
    }
}

impl FromStr for Amount {
    type Err = PaymentValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PaymentValidationError::InvalidAmount(s.to_owned());
        let trimmed = s.trim();
        if trimmed.starts_with('-') {
            return Err(PaymentValidationError::NegativeAmount);
        }
        let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || fraction.len() > 2
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|minor| minor.checked_add(fraction))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Syntactically valid email address.
///
/// Only the checks that matter for a receipt are performed: one `@`,
/// non-empty local part and domain, a dot in the domain, and no whitespace
/// or control characters (header injection).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and construct an [`EmailAddress`].
    pub fn new(raw: impl Into<String>) -> Result<Self, PaymentValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.len() > 254
            || trimmed
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>')
        {
            return Err(PaymentValidationError::InvalidEmail);
        }
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(PaymentValidationError::InvalidEmail);
        };
        if local.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
        {
            return Err(PaymentValidationError::InvalidEmail);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Customer details embedded in the payment record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    first_name: String,
    last_name: String,
    email: EmailAddress,
    phone: String,
    trip_name: String,
}

/// Unvalidated customer fields, as read from storage or fixtures.
#[derive(Debug, Clone, Default)]
pub struct CustomerDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub trip_name: String,
}

fn bounded_text(field: &'static str, value: String) -> Result<String, PaymentValidationError> {
    let value = value.trim().to_owned();
    if value.is_empty() {
        return Err(PaymentValidationError::EmptyField(field));
    }
    if value.chars().count() > CUSTOMER_FIELD_MAX {
        return Err(PaymentValidationError::FieldTooLong {
            field,
            max: CUSTOMER_FIELD_MAX,
        });
    }
    Ok(value)
}

impl Customer {
    /// Validate a [`CustomerDraft`].
    ///
    /// Phone numbers are optional in upstream data and may be empty.
    pub fn try_from_draft(draft: CustomerDraft) -> Result<Self, PaymentValidationError> {
        let phone = draft.phone.trim().to_owned();
        if phone.chars().count() > CUSTOMER_FIELD_MAX {
            return Err(PaymentValidationError::FieldTooLong {
                field: "phone",
                max: CUSTOMER_FIELD_MAX,
            });
        }
        Ok(Self {
            first_name: bounded_text("first name", draft.first_name)?,
            last_name: bounded_text("last name", draft.last_name)?,
            email: EmailAddress::new(draft.email)?,
            phone,
            trip_name: bounded_text("trip name", draft.trip_name)?,
        })
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// `"{first} {last}"`, as printed on receipts.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn trip_name(&self) -> &str {
        &self.trip_name
    }
}

/// Immutable record of a completed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    order_id: OrderId,
    payment_type: PaymentType,
    currency: CurrencyCode,
    amount: Amount,
    customer: Customer,
    created_at: DateTime<Utc>,
}

/// Unvalidated payment record fields.
#[derive(Debug, Clone)]
pub struct PaymentRecordDraft {
    pub order_id: String,
    pub payment_type: String,
    pub currency: String,
    pub amount: String,
    pub customer: CustomerDraft,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Validate every field of a [`PaymentRecordDraft`].
    ///
    /// # Examples
    /// ```
    /// use after_payments::domain::{CustomerDraft, PaymentRecord, PaymentRecordDraft};
    /// use chrono::Utc;
    ///
    /// let record = PaymentRecord::try_from_draft(PaymentRecordDraft {
    ///     order_id: "ORDER_1".into(),
    ///     payment_type: "card".into(),
    ///     currency: "USD".into(),
    ///     amount: "150.00".into(),
    ///     customer: CustomerDraft {
    ///         first_name: "A".into(),
    ///         last_name: "B".into(),
    ///         email: "a@b.com".into(),
    ///         phone: "555".into(),
    ///         trip_name: "Kandy Tour".into(),
    ///     },
    ///     created_at: Utc::now(),
    /// })
    /// .expect("valid record");
    /// assert_eq!(record.order_id().as_str(), "ORDER_1");
    /// ```
    pub fn try_from_draft(draft: PaymentRecordDraft) -> Result<Self, PaymentValidationError> {
        Ok(Self {
            order_id: OrderId::new(draft.order_id)?,
            payment_type: draft.payment_type.parse()?,
            currency: draft.currency.trim().parse()?,
            amount: draft.amount.parse()?,
            customer: Customer::try_from_draft(draft.customer)?,
            created_at: draft.created_at,
        })
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn payment_type(&self) -> PaymentType {
        self.payment_type
    }

    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ORDER_1755543375236")]
    #[case("a-b_C9")]
    fn accepts_well_formed_order_ids(#[case] raw: &str) {
        assert_eq!(OrderId::new(raw).expect("valid").as_str(), raw);
    }

    #[rstest]
    #[case("", PaymentValidationError::EmptyOrderId)]
    #[case("ORDER 1", PaymentValidationError::OrderIdInvalidCharacters)]
    #[case("../etc/passwd", PaymentValidationError::OrderIdInvalidCharacters)]
    #[case("ORDER\"1", PaymentValidationError::OrderIdInvalidCharacters)]
    fn rejects_malformed_order_ids(#[case] raw: &str, #[case] expected: PaymentValidationError) {
        assert_eq!(OrderId::new(raw), Err(expected));
    }

    #[test]
    fn rejects_overlong_order_id() {
        let raw = "A".repeat(ORDER_ID_MAX + 1);
        assert_eq!(
            OrderId::new(raw),
            Err(PaymentValidationError::OrderIdTooLong { max: ORDER_ID_MAX })
        );
    }

    #[rstest]
    #[case("150", 15_000, "150.00")]
    #[case("150.5", 15_050, "150.50")]
    #[case("0.07", 7, "0.07")]
    #[case(" 12.34 ", 1_234, "12.34")]
    fn parses_amounts(#[case] raw: &str, #[case] minor: i64, #[case] display: &str) {
        let amount: Amount = raw.parse().expect("valid amount");
        assert_eq!(amount.minor_units(), minor);
        assert_eq!(amount.to_string(), display);
    }

    #[rstest]
    #[case("-1")]
    #[case("1.234")]
    #[case("abc")]
    #[case(".5")]
    #[case("")]
    fn rejects_invalid_amounts(#[case] raw: &str) {
        assert!(raw.parse::<Amount>().is_err());
    }

    #[test]
    fn negative_minor_units_are_rejected() {
        assert_eq!(
            Amount::from_minor_units(-5),
            Err(PaymentValidationError::NegativeAmount)
        );
    }

    #[rstest]
    #[case("usd")]
    #[case("US")]
    #[case("USDT")]
    fn rejects_invalid_currency(#[case] raw: &str) {
        assert!(raw.parse::<CurrencyCode>().is_err());
    }

    #[rstest]
    #[case("a@b.com", true)]
    #[case("first.last@example.co.uk", true)]
    #[case("no-at-sign.com", false)]
    #[case("a@b", false)]
    #[case("a@@b.com", false)]
    #[case("a@b.com\r\nBcc: x@y.com", false)]
    #[case("@b.com", false)]
    fn validates_email_addresses(#[case] raw: &str, #[case] valid: bool) {
        assert_eq!(EmailAddress::new(raw).is_ok(), valid);
    }

    #[rstest]
    #[case("card", PaymentType::Card)]
    #[case("Card", PaymentType::Card)]
    #[case("bank_transfer", PaymentType::BankTransfer)]
    fn parses_payment_types(#[case] raw: &str, #[case] expected: PaymentType) {
        assert_eq!(raw.parse::<PaymentType>(), Ok(expected));
    }

    #[test]
    fn fixture_record_exposes_fields() {
        let record = crate::test_support::sample_record("ORDER_1");
        assert_eq!(record.order_id().as_str(), "ORDER_1");
        assert_eq!(record.customer().full_name(), "A B");
        assert_eq!(record.currency().as_str(), "USD");
        assert_eq!(record.amount().to_string(), "150.00");
    }

    #[test]
    fn empty_trip_name_is_rejected() {
        let draft = CustomerDraft {
            first_name: "A".into(),
            last_name: "B".into(),
            email: "a@b.com".into(),
            phone: String::new(),
            trip_name: "  ".into(),
        };
        assert_eq!(
            Customer::try_from_draft(draft),
            Err(PaymentValidationError::EmptyField("trip name"))
        );
    }
}
