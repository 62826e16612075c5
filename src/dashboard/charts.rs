//! Chart generation and rendering for the dashboard.
//!
//! The monthly income and expense totals are rendered as an ECharts bar
//! chart. The chart is generated as JSON configuration for the ECharts
//! library and rendered with an HTML container and JavaScript initialization
//! code.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{AxisType, Tooltip, Trigger},
    series::Bar,
};
use maud::{Markup, PreEscaped, html};

use crate::{Error, html::HeadElement};

use super::aggregation::MonthlyTotals;

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Build the monthly income versus expense bar chart.
///
/// # Errors
/// Returns [Error::JSONSerializationError] if the chart configuration cannot
/// be serialized.
pub(super) fn income_expense_chart(totals: &[MonthlyTotals]) -> Result<DashboardChart, Error> {
    let labels: Vec<String> = totals.iter().map(|month| month.label.clone()).collect();
    let income: Vec<f64> = totals.iter().map(|month| month.income).collect();
    let expense: Vec<f64> = totals.iter().map(|month| month.expense).collect();

    let chart = Chart::new()
        .title(
            Title::new()
                .text("Income and expenses")
                .subtext("Last twelve months"),
        )
        .tooltip(Tooltip::new().trigger(Trigger::Axis))
        .legend(Legend::new())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(Axis::new().type_(AxisType::Value))
        .series(Bar::new().name("Income").data(income))
        .series(Bar::new().name("Expense").data(expense));

    let options = serde_json::to_string(&chart)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    Ok(DashboardChart {
        id: "income-expense-chart",
        options,
    })
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

#[cfg(test)]
mod charts_tests {
    use crate::dashboard::aggregation::MonthlyTotals;

    use super::income_expense_chart;

    #[test]
    fn chart_options_contain_labels_and_series() {
        let totals = vec![
            MonthlyTotals {
                label: "Mar 2025".to_owned(),
                income: 150.0,
                expense: 0.0,
            },
            MonthlyTotals {
                label: "Apr 2025".to_owned(),
                income: 50.0,
                expense: 75.0,
            },
        ];

        let chart = income_expense_chart(&totals).unwrap();

        assert!(chart.options.contains("Mar 2025"));
        assert!(chart.options.contains("Income"));
        assert!(chart.options.contains("Expense"));
    }
}
