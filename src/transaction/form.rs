//! The entry form shared by the new-transaction and edit-transaction pages.
//!
//! The form is server-driven: changing the transaction type or an amount
//! field posts the current values to [refresh_transaction_form], which routes
//! them through [TransactionDraft::apply_field_change] and re-renders the
//! form partial with the cleared fields, updated required-ness and the
//! recomputed total.

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    database_id::TransactionId,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_RADIO_GROUP_STYLE, FORM_RADIO_INPUT_STYLE,
        FORM_RADIO_LABEL_STYLE, FORM_SELECT_STYLE, FORM_TEXT_INPUT_STYLE, format_currency,
        loading_spinner,
    },
    timezone::get_local_offset,
    transaction::{
        core::{BirdCategory, Gender, PaymentMethod, SaleType, TransactionType},
        draft::{DraftField, FieldChange, TransactionDraft, ValidationError, error_for},
    },
};

/// Whether the form creates a new transaction or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    /// Submitting creates a new transaction and resets the form.
    Create,
    /// Submitting updates the transaction and returns to the reports page.
    Edit(TransactionId),
}

impl FormAction {
    fn mode_str(&self) -> &'static str {
        match self {
            FormAction::Create => "create",
            FormAction::Edit(_) => "edit",
        }
    }

    fn submit_label(&self) -> &'static str {
        match self {
            FormAction::Create => "Add Entry",
            FormAction::Edit(_) => "Update Entry",
        }
    }
}

/// The raw values submitted from the entry form.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionFormData {
    /// The date of the sale or purchase.
    #[serde(default)]
    pub date: Option<Date>,
    /// Whether the birds were sold whole or skinned.
    pub sale_type: SaleType,
    /// Whether this entry is income or an expense.
    pub transaction_type: TransactionType,
    /// The kind of bird.
    #[serde(default)]
    pub category: Option<BirdCategory>,
    /// The sex of the birds.
    #[serde(default)]
    pub gender: Option<Gender>,
    /// How many birds changed hands.
    #[serde(default)]
    pub quantity: Option<u32>,
    /// How the money changed hands.
    pub payment_method: PaymentMethod,
    /// Free text notes about the entry.
    #[serde(default)]
    pub details: String,
    /// Money earned, for income entries.
    #[serde(default)]
    pub income_amount: Option<f64>,
    /// Money spent buying birds, for expense entries.
    #[serde(default)]
    pub purchase_amount: Option<f64>,
    /// Money spent on wages, for expense entries.
    #[serde(default)]
    pub salary_amount: Option<f64>,
    /// Other money spent, for expense entries.
    #[serde(default)]
    pub others_amount: Option<f64>,
    /// The transaction type the rendered form was built with. Used to detect
    /// a type switch so the amount clearing rules can be applied even when
    /// the values and the new type arrive in the same request.
    #[serde(default)]
    pub prev_transaction_type: Option<TransactionType>,
    /// Whether the form was creating or editing, see [FormAction].
    #[serde(default)]
    pub form_mode: Option<String>,
    /// The transaction being edited, in edit mode.
    #[serde(default)]
    pub transaction_id: Option<TransactionId>,
}

impl TransactionFormData {
    /// Rebuild the draft from the submitted values.
    ///
    /// The draft starts from the type the form was rendered with; if the
    /// submitted type differs, the switch is applied as a field change so the
    /// clearing rules run exactly as they would for any other edit.
    pub fn into_draft(self) -> TransactionDraft {
        let submitted_type = self.transaction_type;
        let rendered_type = self.prev_transaction_type.unwrap_or(submitted_type);

        let mut draft = TransactionDraft {
            date: self.date,
            sale_type: self.sale_type,
            transaction_type: rendered_type,
            category: self.category,
            gender: self.gender,
            quantity: self.quantity,
            payment_method: self.payment_method,
            details: self.details,
            income_amount: self.income_amount,
            purchase_amount: self.purchase_amount,
            salary_amount: self.salary_amount,
            others_amount: self.others_amount,
            total_price: 0.0,
        };
        draft.recompute_total();

        if rendered_type != submitted_type {
            draft = draft.apply_field_change(FieldChange::TransactionType(submitted_type));
        }

        draft
    }

    /// The form action encoded in the hidden mode fields.
    pub fn action(&self) -> FormAction {
        match (self.form_mode.as_deref(), self.transaction_id) {
            (Some("edit"), Some(transaction_id)) => FormAction::Edit(transaction_id),
            _ => FormAction::Create,
        }
    }
}

/// Attributes shared by every control that refreshes the form on change.
fn refresh_attrs() -> (&'static str, &'static str, &'static str) {
    (endpoints::TRANSACTION_FORM, "#transaction-form", "outerHTML")
}

fn field_error(errors: &[ValidationError], field: DraftField) -> Markup {
    html! {
        @if let Some(message) = error_for(errors, field) {
            p class="text-red-500 text-sm mt-1" { (message) }
        }
    }
}

fn amount_input(
    name: &str,
    label: &str,
    value: Option<f64>,
    required: bool,
    errors: &[ValidationError],
    field: DraftField,
) -> Markup {
    let (refresh_url, refresh_target, refresh_swap) = refresh_attrs();

    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }

            div class="input-wrapper w-full"
            {
                input
                    type="number"
                    name=(name)
                    id=(name)
                    min="0"
                    step="0.01"
                    value=[value]
                    required[required]
                    class=(FORM_TEXT_INPUT_STYLE)
                    hx-post=(refresh_url)
                    hx-target=(refresh_target)
                    hx-swap=(refresh_swap)
                    hx-include="#transaction-form";
            }

            (field_error(errors, field))
        }
    }
}

/// Render the entry form for `draft`.
///
/// `errors` should be empty until a submit has been attempted, so the user is
/// not shouted at while still filling the form in.
pub fn transaction_form(
    draft: &TransactionDraft,
    errors: &[ValidationError],
    action: FormAction,
    max_date: Date,
) -> Markup {
    let (refresh_url, refresh_target, refresh_swap) = refresh_attrs();

    let fields = html! {
        input type="hidden" name="form_mode" value=(action.mode_str());
        @if let FormAction::Edit(transaction_id) = action {
            input type="hidden" name="transaction_id" value=(transaction_id);
        }
        input type="hidden" name="prev_transaction_type" value=(draft.transaction_type);

        div
        {
            label for="date" class=(FORM_LABEL_STYLE) { "Date" }

            input
                type="date"
                name="date"
                id="date"
                value=[draft.date]
                max=(max_date)
                required
                class=(FORM_TEXT_INPUT_STYLE);

            (field_error(errors, DraftField::Date))
        }

        div
        {
            span class=(FORM_LABEL_STYLE) { "Sale Type" }

            div class=(FORM_RADIO_GROUP_STYLE)
            {
                @for sale_type in SaleType::ALL {
                    div class="flex items-center gap-x-2"
                    {
                        input
                            type="radio"
                            name="sale_type"
                            id={ "sale-type-" (sale_type.as_str()) }
                            value=(sale_type)
                            checked[draft.sale_type == *sale_type]
                            class=(FORM_RADIO_INPUT_STYLE);

                        label
                            for={ "sale-type-" (sale_type.as_str()) }
                            class=(FORM_RADIO_LABEL_STYLE)
                        {
                            (sale_type.label())
                        }
                    }
                }
            }
        }

        div
        {
            span class=(FORM_LABEL_STYLE) { "Transaction Type" }

            div class=(FORM_RADIO_GROUP_STYLE)
            {
                @for transaction_type in TransactionType::ALL {
                    div class="flex items-center gap-x-2"
                    {
                        input
                            type="radio"
                            name="transaction_type"
                            id={ "transaction-type-" (transaction_type.as_str()) }
                            value=(transaction_type)
                            checked[draft.transaction_type == *transaction_type]
                            class=(FORM_RADIO_INPUT_STYLE)
                            hx-post=(refresh_url)
                            hx-target=(refresh_target)
                            hx-swap=(refresh_swap)
                            hx-include="#transaction-form";

                        label
                            for={ "transaction-type-" (transaction_type.as_str()) }
                            class=(FORM_RADIO_LABEL_STYLE)
                        {
                            (transaction_type.label())
                        }
                    }
                }
            }
        }

        div
        {
            label for="category" class=(FORM_LABEL_STYLE) { "Category" }

            select name="category" id="category" required class=(FORM_SELECT_STYLE)
            {
                option value="" disabled selected[draft.category.is_none()] { "Select a category" }

                @for category in BirdCategory::ALL {
                    option
                        value=(category)
                        selected[draft.category == Some(*category)]
                    {
                        (category.label())
                    }
                }
            }

            (field_error(errors, DraftField::Category))
        }

        div
        {
            label for="gender" class=(FORM_LABEL_STYLE) { "Gender" }

            select name="gender" id="gender" required class=(FORM_SELECT_STYLE)
            {
                option value="" disabled selected[draft.gender.is_none()] { "Select a gender" }

                @for gender in Gender::ALL {
                    option
                        value=(gender)
                        selected[draft.gender == Some(*gender)]
                    {
                        (gender.label())
                    }
                }
            }

            (field_error(errors, DraftField::Gender))
        }

        div
        {
            label for="quantity" class=(FORM_LABEL_STYLE) { "Quantity" }

            input
                type="number"
                name="quantity"
                id="quantity"
                min="1"
                step="1"
                value=[draft.quantity]
                required
                class=(FORM_TEXT_INPUT_STYLE);

            (field_error(errors, DraftField::Quantity))
        }

        div
        {
            label for="payment_method" class=(FORM_LABEL_STYLE) { "Payment Method" }

            select name="payment_method" id="payment_method" class=(FORM_SELECT_STYLE)
            {
                @for payment_method in PaymentMethod::ALL {
                    option
                        value=(payment_method)
                        selected[draft.payment_method == *payment_method]
                    {
                        (payment_method.label())
                    }
                }
            }
        }

        @match draft.transaction_type {
            TransactionType::Income => {
                (amount_input(
                    "income_amount",
                    "Income Amount",
                    draft.income_amount,
                    draft.is_required(DraftField::IncomeAmount),
                    errors,
                    DraftField::IncomeAmount,
                ))
            }
            TransactionType::Expense => {
                (amount_input(
                    "purchase_amount",
                    "Purchase Amount",
                    draft.purchase_amount,
                    draft.is_required(DraftField::PurchaseAmount),
                    errors,
                    DraftField::PurchaseAmount,
                ))
                (amount_input(
                    "salary_amount",
                    "Salary Amount",
                    draft.salary_amount,
                    false,
                    errors,
                    DraftField::SalaryAmount,
                ))
                (amount_input(
                    "others_amount",
                    "Others Amount",
                    draft.others_amount,
                    false,
                    errors,
                    DraftField::OthersAmount,
                ))
            }
        }

        div
        {
            label for="details" class=(FORM_LABEL_STYLE) { "Details" }

            input
                type="text"
                name="details"
                id="details"
                placeholder="Optional notes"
                value=(draft.details)
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label for="total-price" class=(FORM_LABEL_STYLE) { "Total Price" }

            input
                type="text"
                id="total-price"
                value=(format_currency(draft.total_price))
                disabled
                class=(FORM_TEXT_INPUT_STYLE);
        }

        button
            type="submit" id="submit-button"
            class=(BUTTON_PRIMARY_STYLE)
            hx-disabled-elt="#submit-button"
        {
            span class="inline htmx-indicator" id="indicator"
            {
                (loading_spinner())
            }
            (action.submit_label())
        }
    };

    match action {
        FormAction::Create => html! {
            form
                id="transaction-form"
                hx-post=(endpoints::TRANSACTIONS_API)
                hx-target="#transaction-form"
                hx-target-4xx="#dialog-container"
                hx-target-5xx="#dialog-container"
                hx-swap="outerHTML"
                hx-indicator="#indicator"
                class="w-full space-y-4 md:space-y-6"
            {
                (fields)
            }
        },
        FormAction::Edit(transaction_id) => html! {
            form
                id="transaction-form"
                hx-put=(endpoints::format_endpoint(endpoints::TRANSACTION, transaction_id))
                hx-target="#transaction-form"
                hx-target-4xx="#dialog-container"
                hx-target-5xx="#dialog-container"
                hx-swap="outerHTML"
                hx-indicator="#indicator"
                class="w-full space-y-4 md:space-y-6"
            {
                (fields)
            }
        },
    }
}

/// The state needed to re-render the entry form.
#[derive(Debug, Clone)]
pub struct RefreshFormState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for RefreshFormState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Route handler that applies a field change and re-renders the form partial.
///
/// This powers the conditional amount fields and the derived total: the
/// changed control posts the whole form here, the draft is rebuilt through
/// the state-transition rules, and the refreshed form replaces the old one.
pub async fn refresh_transaction_form(
    State(state): State<RefreshFormState>,
    Form(form_data): Form<TransactionFormData>,
) -> Response {
    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let max_date = time::OffsetDateTime::now_utc().to_offset(local_offset).date();
    let action = form_data.action();
    let draft = form_data.into_draft();

    transaction_form(&draft, &[], action, max_date).into_response()
}

/// A filled-in income entry, shared by the endpoint tests.
#[cfg(test)]
pub(crate) fn income_form_data() -> TransactionFormData {
    use time::macros::date;

    TransactionFormData {
        date: Some(date!(2025 - 04 - 05)),
        sale_type: SaleType::Standard,
        transaction_type: TransactionType::Income,
        category: Some(BirdCategory::Broiler),
        gender: Some(Gender::Male),
        quantity: Some(3),
        payment_method: PaymentMethod::Cash,
        details: String::new(),
        income_amount: Some(500.0),
        purchase_amount: None,
        salary_amount: None,
        others_amount: None,
        prev_transaction_type: Some(TransactionType::Income),
        form_mode: None,
        transaction_id: None,
    }
}

#[cfg(test)]
mod form_data_tests {
    use crate::transaction::core::TransactionType;

    use super::{FormAction, income_form_data};

    #[test]
    fn into_draft_keeps_submitted_values() {
        let draft = income_form_data().into_draft();

        assert_eq!(draft.income_amount, Some(500.0));
        assert_eq!(draft.total_price, 500.0);
    }

    #[test]
    fn into_draft_applies_type_switch_clearing_rules() {
        let mut form_data = income_form_data();
        form_data.transaction_type = TransactionType::Expense;

        let draft = form_data.into_draft();

        assert_eq!(draft.transaction_type, TransactionType::Expense);
        assert_eq!(draft.income_amount, None);
        assert_eq!(draft.total_price, 0.0);
    }

    #[test]
    fn action_defaults_to_create() {
        assert_eq!(income_form_data().action(), FormAction::Create);
    }

    #[test]
    fn action_reads_edit_mode_fields() {
        let mut form_data = income_form_data();
        form_data.form_mode = Some("edit".to_owned());
        form_data.transaction_id = Some(42);

        assert_eq!(form_data.action(), FormAction::Edit(42));
    }
}

#[cfg(test)]
mod form_view_tests {
    use scraper::{Html, Selector};
    use time::macros::date;

    use crate::transaction::{
        core::TransactionType,
        draft::{FieldChange, TransactionDraft},
    };

    use super::{FormAction, transaction_form};

    fn render(draft: &TransactionDraft) -> Html {
        let markup = transaction_form(draft, &[], FormAction::Create, date!(2025 - 04 - 05));
        Html::parse_fragment(&markup.into_string())
    }

    fn input_names(html: &Html) -> Vec<String> {
        let selector = Selector::parse("input, select").unwrap();
        html.select(&selector)
            .filter_map(|input| input.value().attr("name"))
            .map(|name| name.to_owned())
            .collect()
    }

    #[test]
    fn income_form_shows_only_income_amount() {
        let html = render(&TransactionDraft::new());
        let names = input_names(&html);

        assert!(names.contains(&"income_amount".to_owned()));
        assert!(!names.contains(&"purchase_amount".to_owned()));
        assert!(!names.contains(&"salary_amount".to_owned()));
        assert!(!names.contains(&"others_amount".to_owned()));
    }

    #[test]
    fn expense_form_shows_expense_amounts() {
        let draft = TransactionDraft::new()
            .apply_field_change(FieldChange::TransactionType(TransactionType::Expense));
        let html = render(&draft);
        let names = input_names(&html);

        assert!(!names.contains(&"income_amount".to_owned()));
        assert!(names.contains(&"purchase_amount".to_owned()));
        assert!(names.contains(&"salary_amount".to_owned()));
        assert!(names.contains(&"others_amount".to_owned()));
    }

    #[test]
    fn income_amount_is_required_on_income_form() {
        let html = render(&TransactionDraft::new());
        let selector = Selector::parse("input[name=income_amount]").unwrap();

        let input = html.select(&selector).next().expect("no income input");
        assert!(input.value().attr("required").is_some());
    }

    #[test]
    fn purchase_is_required_but_salary_is_not_on_expense_form() {
        let draft = TransactionDraft::new()
            .apply_field_change(FieldChange::TransactionType(TransactionType::Expense));
        let html = render(&draft);

        let purchase = html
            .select(&Selector::parse("input[name=purchase_amount]").unwrap())
            .next()
            .expect("no purchase input");
        assert!(purchase.value().attr("required").is_some());

        let salary = html
            .select(&Selector::parse("input[name=salary_amount]").unwrap())
            .next()
            .expect("no salary input");
        assert!(salary.value().attr("required").is_none());
    }

    #[test]
    fn total_price_input_is_disabled() {
        let html = render(&TransactionDraft::new());
        let selector = Selector::parse("input#total-price").unwrap();

        let input = html.select(&selector).next().expect("no total input");
        assert!(input.value().attr("disabled").is_some());
    }

    #[test]
    fn submit_button_locks_while_a_request_is_in_flight() {
        // A second click while the first submit is pending must not fire
        // another request.
        let html = render(&TransactionDraft::new());
        let selector = Selector::parse("button[type=submit]").unwrap();

        let button = html.select(&selector).next().expect("no submit button");
        assert_eq!(
            button.value().attr("hx-disabled-elt"),
            Some("#submit-button")
        );
    }

    #[test]
    fn type_radios_refresh_the_form() {
        let html = render(&TransactionDraft::new());
        let selector = Selector::parse("input[name=transaction_type]").unwrap();

        for radio in html.select(&selector) {
            assert_eq!(
                radio.value().attr("hx-post"),
                Some(crate::endpoints::TRANSACTION_FORM)
            );
            assert_eq!(radio.value().attr("hx-target"), Some("#transaction-form"));
        }
    }
}
