//! The in-memory state of the transaction entry form.
//!
//! A [TransactionDraft] is the single editable record behind the add/edit
//! entry screen. All edits flow through [TransactionDraft::apply_field_change],
//! an explicit state-transition function: it updates one field, reapplies the
//! conditional required-ness rules when the transaction type changed, and then
//! recomputes the derived total. The total is written by a plain internal
//! step that raises no further change events, so the recompute can never
//! trigger itself.

use time::Date;

use super::core::{
    BirdCategory, Gender, PaymentMethod, SaleType, Transaction, TransactionRecord, TransactionType,
};

/// The editable transaction record behind the entry form.
///
/// Amount fields are `None` while unset. They are only coerced to zero when
/// the draft is finalized for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    /// When the sale or purchase happened.
    pub date: Option<Date>,
    /// Whether the birds were sold whole or skinned.
    pub sale_type: SaleType,
    /// Whether this entry is income or an expense.
    pub transaction_type: TransactionType,
    /// The kind of bird.
    pub category: Option<BirdCategory>,
    /// The sex of the birds.
    pub gender: Option<Gender>,
    /// How many birds changed hands.
    pub quantity: Option<u32>,
    /// How the money changed hands.
    pub payment_method: PaymentMethod,
    /// Free text notes about the entry.
    pub details: String,
    /// Money earned, for income entries.
    pub income_amount: Option<f64>,
    /// Money spent buying birds, for expense entries.
    pub purchase_amount: Option<f64>,
    /// Money spent on wages, for expense entries.
    pub salary_amount: Option<f64>,
    /// Other money spent, for expense entries.
    pub others_amount: Option<f64>,
    /// The derived total of the entry. Read-only, recomputed after every
    /// field change.
    pub total_price: f64,
}

impl Default for TransactionDraft {
    fn default() -> Self {
        Self::new()
    }
}

/// A change to a single field of the draft.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    /// The date field changed.
    Date(Option<Date>),
    /// The sale type field changed.
    SaleType(SaleType),
    /// The transaction type changed. Applying this reapplies the
    /// required-ness rules across the amount fields.
    TransactionType(TransactionType),
    /// The category field changed.
    Category(Option<BirdCategory>),
    /// The gender field changed.
    Gender(Option<Gender>),
    /// The quantity field changed.
    Quantity(Option<u32>),
    /// The payment method field changed.
    PaymentMethod(PaymentMethod),
    /// The details field changed.
    Details(String),
    /// The income amount changed.
    IncomeAmount(Option<f64>),
    /// The purchase amount changed.
    PurchaseAmount(Option<f64>),
    /// The salary amount changed.
    SalaryAmount(Option<f64>),
    /// The others amount changed.
    OthersAmount(Option<f64>),
}

/// The fields of the draft that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    /// The date field.
    Date,
    /// The category field.
    Category,
    /// The gender field.
    Gender,
    /// The quantity field.
    Quantity,
    /// The income amount field.
    IncomeAmount,
    /// The purchase amount field.
    PurchaseAmount,
    /// The salary amount field.
    SalaryAmount,
    /// The others amount field.
    OthersAmount,
}

/// A field-localized validation failure that blocks submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// The field the error belongs to.
    pub field: DraftField,
    /// The message shown next to the field.
    pub message: String,
}

impl ValidationError {
    fn new(field: DraftField, message: &str) -> Self {
        Self {
            field,
            message: message.to_owned(),
        }
    }
}

/// Look up the error message for `field`, if any.
pub fn error_for(errors: &[ValidationError], field: DraftField) -> Option<&str> {
    errors
        .iter()
        .find(|error| error.field == field)
        .map(|error| error.message.as_str())
}

impl TransactionDraft {
    /// Create an empty draft with the form defaults.
    pub fn new() -> Self {
        Self {
            date: None,
            sale_type: SaleType::Standard,
            transaction_type: TransactionType::Income,
            category: None,
            gender: None,
            quantity: None,
            payment_method: PaymentMethod::Cash,
            details: String::new(),
            income_amount: None,
            purchase_amount: None,
            salary_amount: None,
            others_amount: None,
            total_price: 0.0,
        }
    }

    /// Populate a draft from a persisted transaction, for the edit screen.
    pub fn from_transaction(transaction: &Transaction) -> Self {
        let nonzero = |amount: f64| if amount == 0.0 { None } else { Some(amount) };

        let mut draft = Self {
            date: Some(transaction.date),
            sale_type: transaction.sale_type,
            transaction_type: transaction.transaction_type,
            category: Some(transaction.category),
            gender: Some(transaction.gender),
            quantity: Some(transaction.quantity),
            payment_method: transaction.payment_method,
            details: transaction.details.clone(),
            income_amount: nonzero(transaction.income_amount),
            purchase_amount: nonzero(transaction.purchase_amount),
            salary_amount: nonzero(transaction.salary_amount),
            others_amount: nonzero(transaction.others_amount),
            total_price: 0.0,
        };
        draft.recompute_total();

        draft
    }

    /// Apply a change to a single field and return the new draft state.
    ///
    /// Changing the transaction type atomically reapplies the required-ness
    /// rules before the total is recomputed, so a cleared field can never be
    /// left with a stale required error.
    pub fn apply_field_change(mut self, change: FieldChange) -> Self {
        match change {
            FieldChange::Date(date) => self.date = date,
            FieldChange::SaleType(sale_type) => self.sale_type = sale_type,
            FieldChange::TransactionType(transaction_type) => {
                self.apply_transaction_type(transaction_type)
            }
            FieldChange::Category(category) => self.category = category,
            FieldChange::Gender(gender) => self.gender = gender,
            FieldChange::Quantity(quantity) => self.quantity = quantity,
            FieldChange::PaymentMethod(payment_method) => self.payment_method = payment_method,
            FieldChange::Details(details) => self.details = details,
            FieldChange::IncomeAmount(amount) => self.income_amount = amount,
            FieldChange::PurchaseAmount(amount) => self.purchase_amount = amount,
            FieldChange::SalaryAmount(amount) => self.salary_amount = amount,
            FieldChange::OthersAmount(amount) => self.others_amount = amount,
        }

        // Internal non-notifying step, cannot re-enter the change cycle.
        self.recompute_total();

        self
    }

    /// Switch the transaction type and clear the amounts that no longer
    /// apply.
    ///
    /// Switching to income clears the expense amounts; switching to expense
    /// clears the income amount. The required-ness rules themselves are a
    /// function of the type, see [TransactionDraft::is_required].
    fn apply_transaction_type(&mut self, transaction_type: TransactionType) {
        self.transaction_type = transaction_type;

        match transaction_type {
            TransactionType::Income => {
                self.purchase_amount = None;
                self.salary_amount = None;
                self.others_amount = None;
            }
            TransactionType::Expense => {
                self.income_amount = None;
            }
        }
    }

    /// Recompute the derived total from the current field values.
    ///
    /// Unset amounts count as zero. Calling this twice in a row without a
    /// field change yields the same total.
    pub fn recompute_total(&mut self) {
        let amount = |amount: Option<f64>| amount.unwrap_or(0.0);

        self.total_price = match self.transaction_type {
            TransactionType::Income => amount(self.income_amount),
            TransactionType::Expense => {
                amount(self.purchase_amount)
                    + amount(self.salary_amount)
                    + amount(self.others_amount)
            }
        };
    }

    /// Whether `field` is required given the current transaction type.
    pub fn is_required(&self, field: DraftField) -> bool {
        match field {
            DraftField::Date | DraftField::Category | DraftField::Gender | DraftField::Quantity => {
                true
            }
            DraftField::IncomeAmount => self.transaction_type == TransactionType::Income,
            DraftField::PurchaseAmount => self.transaction_type == TransactionType::Expense,
            DraftField::SalaryAmount | DraftField::OthersAmount => false,
        }
    }

    /// Check every field-level and cross-field rule.
    ///
    /// Returns one error per failing field. An empty list means the draft can
    /// be submitted.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.date.is_none() {
            errors.push(ValidationError::new(DraftField::Date, "Date is required"));
        }

        if self.category.is_none() {
            errors.push(ValidationError::new(
                DraftField::Category,
                "Category is required",
            ));
        }

        if self.gender.is_none() {
            errors.push(ValidationError::new(
                DraftField::Gender,
                "Gender is required",
            ));
        }

        match self.quantity {
            None => errors.push(ValidationError::new(
                DraftField::Quantity,
                "Quantity is required",
            )),
            Some(quantity) if quantity < 1 => errors.push(ValidationError::new(
                DraftField::Quantity,
                "Quantity must be at least 1",
            )),
            Some(_) => {}
        }

        let amounts = [
            (DraftField::IncomeAmount, self.income_amount, "Income amount"),
            (
                DraftField::PurchaseAmount,
                self.purchase_amount,
                "Purchase amount",
            ),
            (DraftField::SalaryAmount, self.salary_amount, "Salary amount"),
            (DraftField::OthersAmount, self.others_amount, "Others amount"),
        ];

        for (field, amount, name) in amounts {
            match amount {
                None if self.is_required(field) => {
                    errors.push(ValidationError::new(field, &format!("{name} is required")));
                }
                Some(amount) if amount < 0.0 => {
                    errors.push(ValidationError::new(
                        field,
                        &format!("{name} must be at least 0"),
                    ));
                }
                _ => {}
            }
        }

        errors
    }

    /// Normalize the draft into a record ready for persistence.
    ///
    /// Unset amounts are coerced to zero, the total is recomputed one final
    /// time so the stored value always matches the amount fields, and the
    /// details text defaults to the empty string.
    ///
    /// # Errors
    /// Returns the validation errors if any field-level rule fails.
    pub fn finalize(&self) -> Result<TransactionRecord, Vec<ValidationError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut draft = self.clone();
        draft.recompute_total();

        Ok(TransactionRecord {
            // Validation guarantees the required fields are set.
            date: draft.date.expect("validated draft must have a date"),
            sale_type: draft.sale_type,
            transaction_type: draft.transaction_type,
            category: draft.category.expect("validated draft must have a category"),
            gender: draft.gender.expect("validated draft must have a gender"),
            quantity: draft.quantity.expect("validated draft must have a quantity"),
            payment_method: draft.payment_method,
            details: draft.details,
            income_amount: draft.income_amount.unwrap_or(0.0),
            purchase_amount: draft.purchase_amount.unwrap_or(0.0),
            salary_amount: draft.salary_amount.unwrap_or(0.0),
            others_amount: draft.others_amount.unwrap_or(0.0),
            total_price: draft.total_price,
            import_id: None,
        })
    }
}

#[cfg(test)]
mod draft_tests {
    use time::macros::date;

    use crate::transaction::core::{
        BirdCategory, Gender, PaymentMethod, SaleType, TransactionType,
    };

    use super::{DraftField, FieldChange, TransactionDraft, error_for};

    fn valid_income_draft() -> TransactionDraft {
        TransactionDraft::new()
            .apply_field_change(FieldChange::Date(Some(date!(2025 - 04 - 05))))
            .apply_field_change(FieldChange::Category(Some(BirdCategory::Broiler)))
            .apply_field_change(FieldChange::Gender(Some(Gender::Male)))
            .apply_field_change(FieldChange::Quantity(Some(3)))
            .apply_field_change(FieldChange::IncomeAmount(Some(500.0)))
    }

    #[test]
    fn new_draft_has_form_defaults() {
        let draft = TransactionDraft::new();

        assert_eq!(draft.sale_type, SaleType::Standard);
        assert_eq!(draft.transaction_type, TransactionType::Income);
        assert_eq!(draft.payment_method, PaymentMethod::Cash);
        assert_eq!(draft.total_price, 0.0);
    }

    #[test]
    fn income_total_tracks_income_amount() {
        let draft = valid_income_draft();

        assert_eq!(draft.total_price, 500.0);
    }

    #[test]
    fn expense_total_sums_expense_amounts() {
        let draft = TransactionDraft::new()
            .apply_field_change(FieldChange::TransactionType(TransactionType::Expense))
            .apply_field_change(FieldChange::PurchaseAmount(Some(200.0)))
            .apply_field_change(FieldChange::SalaryAmount(Some(100.0)))
            .apply_field_change(FieldChange::OthersAmount(Some(50.0)));

        assert_eq!(draft.total_price, 350.0);
    }

    #[test]
    fn unset_amounts_count_as_zero() {
        let draft = TransactionDraft::new()
            .apply_field_change(FieldChange::TransactionType(TransactionType::Expense))
            .apply_field_change(FieldChange::PurchaseAmount(Some(200.0)));

        assert_eq!(draft.total_price, 200.0);
    }

    #[test]
    fn recompute_total_is_idempotent() {
        let mut draft = valid_income_draft();

        draft.recompute_total();
        let first = draft.total_price;
        draft.recompute_total();

        assert_eq!(first, draft.total_price);
    }

    #[test]
    fn switching_to_expense_clears_income_and_flips_required_fields() {
        let draft = valid_income_draft()
            .apply_field_change(FieldChange::TransactionType(TransactionType::Expense));

        assert_eq!(draft.income_amount, None);
        assert!(!draft.is_required(DraftField::IncomeAmount));
        assert!(draft.is_required(DraftField::PurchaseAmount));
        assert!(!draft.is_required(DraftField::SalaryAmount));
        assert!(!draft.is_required(DraftField::OthersAmount));
        assert_eq!(draft.total_price, 0.0);
    }

    #[test]
    fn switching_to_income_clears_expense_amounts_and_flips_required_fields() {
        let draft = TransactionDraft::new()
            .apply_field_change(FieldChange::TransactionType(TransactionType::Expense))
            .apply_field_change(FieldChange::PurchaseAmount(Some(200.0)))
            .apply_field_change(FieldChange::SalaryAmount(Some(100.0)))
            .apply_field_change(FieldChange::OthersAmount(Some(50.0)))
            .apply_field_change(FieldChange::TransactionType(TransactionType::Income));

        assert_eq!(draft.purchase_amount, None);
        assert_eq!(draft.salary_amount, None);
        assert_eq!(draft.others_amount, None);
        assert!(draft.is_required(DraftField::IncomeAmount));
        assert!(!draft.is_required(DraftField::PurchaseAmount));
        assert_eq!(draft.total_price, 0.0);
    }

    #[test]
    fn type_switch_leaves_no_stale_required_error_on_cleared_field() {
        // A filled income draft switched to expense must not report an error
        // for the income amount it just cleared.
        let draft = valid_income_draft()
            .apply_field_change(FieldChange::TransactionType(TransactionType::Expense));

        let errors = draft.validate();

        assert!(error_for(&errors, DraftField::IncomeAmount).is_none());
        assert!(error_for(&errors, DraftField::PurchaseAmount).is_some());
    }

    #[test]
    fn empty_draft_reports_required_fields() {
        let errors = TransactionDraft::new().validate();

        assert!(error_for(&errors, DraftField::Date).is_some());
        assert!(error_for(&errors, DraftField::Category).is_some());
        assert!(error_for(&errors, DraftField::Gender).is_some());
        assert!(error_for(&errors, DraftField::Quantity).is_some());
        assert!(error_for(&errors, DraftField::IncomeAmount).is_some());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let draft = valid_income_draft().apply_field_change(FieldChange::Quantity(Some(0)));

        let errors = draft.validate();

        assert_eq!(
            error_for(&errors, DraftField::Quantity),
            Some("Quantity must be at least 1")
        );
    }

    #[test]
    fn negative_optional_amount_is_rejected() {
        let draft = TransactionDraft::new()
            .apply_field_change(FieldChange::TransactionType(TransactionType::Expense))
            .apply_field_change(FieldChange::SalaryAmount(Some(-1.0)));

        let errors = draft.validate();

        assert_eq!(
            error_for(&errors, DraftField::SalaryAmount),
            Some("Salary amount must be at least 0")
        );
    }

    #[test]
    fn finalize_coerces_unset_amounts_to_zero() {
        let record = valid_income_draft().finalize().unwrap();

        assert_eq!(record.purchase_amount, 0.0);
        assert_eq!(record.salary_amount, 0.0);
        assert_eq!(record.others_amount, 0.0);
        assert_eq!(record.income_amount, 500.0);
        assert_eq!(record.total_price, 500.0);
        assert_eq!(record.details, "");
    }

    #[test]
    fn finalize_serializes_date_as_local_calendar_date() {
        let record = valid_income_draft().finalize().unwrap();

        // The calendar date the user picked must serialize to the literal
        // date string, never shifted through UTC.
        assert_eq!(record.date.to_string(), "2025-04-05");
    }

    #[test]
    fn finalize_rejects_invalid_draft() {
        let result = TransactionDraft::new().finalize();

        assert!(result.is_err());
    }

    #[test]
    fn populating_from_transaction_round_trips() {
        let record = valid_income_draft().finalize().unwrap();
        let transaction = crate::transaction::core::Transaction {
            id: 1,
            date: record.date,
            sale_type: record.sale_type,
            transaction_type: record.transaction_type,
            category: record.category,
            gender: record.gender,
            quantity: record.quantity,
            payment_method: record.payment_method,
            details: record.details.clone(),
            income_amount: record.income_amount,
            purchase_amount: record.purchase_amount,
            salary_amount: record.salary_amount,
            others_amount: record.others_amount,
            total_price: record.total_price,
            import_id: None,
        };

        let draft = TransactionDraft::from_transaction(&transaction);

        assert_eq!(draft.finalize().unwrap(), record);
    }
}
