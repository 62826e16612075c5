//! The profit and loss summary cards at the top of the dashboard.

use maud::{Markup, html};

use crate::html::format_currency;

use super::aggregation::ProfitLoss;

const CARD_STYLE: &str = "p-4 rounded-lg shadow bg-white dark:bg-gray-800";

fn summary_card(title: &str, value: &str, value_style: &str) -> Markup {
    html! {
        div class=(CARD_STYLE)
        {
            p class="text-sm text-gray-500 dark:text-gray-400" { (title) }
            p class={ "text-2xl font-semibold " (value_style) } { (value) }
        }
    }
}

/// Render the income, expense and profit cards.
pub(super) fn profit_loss_cards(profit_loss: &ProfitLoss) -> Markup {
    let profit_style = if profit_loss.profit < 0.0 {
        "text-red-600 dark:text-red-400"
    } else {
        "text-green-600 dark:text-green-400"
    };

    html! {
        section class="grid grid-cols-1 sm:grid-cols-3 gap-4 w-full mb-4"
        {
            (summary_card(
                "Total Income",
                &format_currency(profit_loss.total_income),
                "text-green-600 dark:text-green-400",
            ))
            (summary_card(
                "Total Expense",
                &format_currency(profit_loss.total_expense),
                "text-red-600 dark:text-red-400",
            ))
            (summary_card("Profit", &format_currency(profit_loss.profit), profit_style))
        }
    }
}

#[cfg(test)]
mod cards_tests {
    use super::{ProfitLoss, profit_loss_cards};

    #[test]
    fn cards_show_formatted_totals() {
        let markup = profit_loss_cards(&ProfitLoss {
            total_income: 750.0,
            total_expense: 300.0,
            profit: 450.0,
        })
        .into_string();

        assert!(markup.contains("₹750.00"));
        assert!(markup.contains("₹300.00"));
        assert!(markup.contains("₹450.00"));
    }

    #[test]
    fn negative_profit_is_shown_in_red() {
        let markup = profit_loss_cards(&ProfitLoss {
            total_income: 100.0,
            total_expense: 300.0,
            profit: -200.0,
        })
        .into_string();

        assert!(markup.contains("-₹200.00"));
        assert!(markup.contains("text-red-600 dark:text-red-400\">-₹200.00"));
    }
}
