//! This modules defines the common functionality for paging data.

use maud::{Markup, html};

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The maximum transactions to display per page when not specified in a request.
    pub default_page_size: u64,
    /// The maximum number of pages to show in the pagination indicator.
    pub max_pages: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
            max_pages: 5,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PaginationIndicator {
    Page(u64),
    CurrPage(u64),
    Ellipsis,
    NextButton(u64),
    BackButton(u64),
}

pub fn create_pagination_indicators(
    curr_page: u64,
    page_count: u64,
    max_pages: u64,
) -> Vec<PaginationIndicator> {
    let map_page = |page| {
        if page == curr_page {
            PaginationIndicator::CurrPage(page)
        } else {
            PaginationIndicator::Page(page)
        }
    };

    let mut indicators: Vec<PaginationIndicator> = if page_count <= max_pages {
        (1..=page_count).map(map_page).collect()
    } else if curr_page <= (max_pages / 2) {
        (1..=max_pages).map(map_page).collect()
    } else if curr_page > (page_count - max_pages / 2) {
        ((page_count - max_pages + 1)..=page_count)
            .map(map_page)
            .collect()
    } else {
        ((curr_page - max_pages / 2)..=(curr_page + max_pages / 2))
            .map(map_page)
            .collect()
    };

    if page_count > max_pages {
        if curr_page > (max_pages / 2) + 1 {
            indicators.insert(0, PaginationIndicator::Page(1));
            indicators.insert(1, PaginationIndicator::Ellipsis);
        }

        if curr_page < (page_count - max_pages / 2) {
            indicators.push(PaginationIndicator::Ellipsis);
            indicators.push(PaginationIndicator::Page(page_count));
        }
    }

    if curr_page > 1 {
        indicators.insert(0, PaginationIndicator::BackButton(curr_page - 1));
    }

    if curr_page < page_count {
        indicators.push(PaginationIndicator::NextButton(curr_page + 1));
    }

    indicators
}

const PAGE_LINK_STYLE: &str = "flex items-center justify-center px-3 h-8 \
    leading-tight text-gray-500 bg-white border border-gray-300 \
    hover:bg-gray-100 hover:text-gray-700 dark:bg-gray-800 \
    dark:border-gray-700 dark:text-gray-400 dark:hover:bg-gray-700 \
    dark:hover:text-white";

const CURR_PAGE_STYLE: &str = "flex items-center justify-center px-3 h-8 \
    text-blue-600 border border-gray-300 bg-blue-50 hover:bg-blue-100 \
    hover:text-blue-700 dark:border-gray-700 dark:bg-gray-700 dark:text-white";

/// Render pagination indicators as a row of links.
///
/// `page_url` maps a page number to the URL that displays it, so the caller
/// can keep its filter and sort query parameters in the links.
pub fn pagination_nav(
    indicators: &[PaginationIndicator],
    page_url: impl Fn(u64) -> String,
) -> Markup {
    html! {
        nav aria-label="pagination"
        {
            ul class="inline-flex -space-x-px text-sm"
            {
                @for indicator in indicators
                {
                    li
                    {
                        @match indicator
                        {
                            PaginationIndicator::BackButton(page) =>
                                a href=(page_url(*page)) class=(PAGE_LINK_STYLE) { "Previous" }
                            PaginationIndicator::NextButton(page) =>
                                a href=(page_url(*page)) class=(PAGE_LINK_STYLE) { "Next" }
                            PaginationIndicator::Page(page) =>
                                a href=(page_url(*page)) class=(PAGE_LINK_STYLE) { (page) }
                            PaginationIndicator::CurrPage(page) =>
                                a aria-current="page" class=(CURR_PAGE_STYLE) { (page) }
                            PaginationIndicator::Ellipsis =>
                                span class=(PAGE_LINK_STYLE) { "..." }
                        }
                    }
                }
            }
        }
    }
}
