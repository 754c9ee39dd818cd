// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod api;
pub(crate) mod api_docs;
pub(crate) mod error;
pub(crate) mod models;
pub(crate) mod server;
pub(crate) mod state;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct PagedResult<T> {
    pub page: usize,
    pub size: usize,
    pub total: usize,
    pub items: Vec<T>,
}

impl<T> PagedResult<T> {
    /// Wraps one page fetched with the limit/offset of `pagination`.
    pub(crate) fn from_page(pagination: Pagination, total: i64, items: Vec<T>) -> Self {
        let (size, page) = pagination.to_inner_values();

        PagedResult {
            page,
            size,
            total: usize::try_from(total).unwrap_or_default(),
            items,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct Pagination {
    size: Option<usize>,
    page: Option<usize>,
}

impl Pagination {
    // unwrap stored values or use predefined defaults
    pub(crate) fn to_inner_values(self) -> (usize, usize) {
        const SIZE_DEFAULT: usize = 10;
        const SIZE_MAX: usize = 200;

        const PAGE_DEFAULT: usize = 0;

        (
            self.size.unwrap_or(SIZE_DEFAULT).clamp(1, SIZE_MAX),
            self.page.unwrap_or(PAGE_DEFAULT),
        )
    }

    /// `(limit, offset)` for the SQL query.
    pub(crate) fn limit_offset(self) -> (i64, i64) {
        let (size, page) = self.to_inner_values();
        let limit = i64::try_from(size).unwrap_or(i64::MAX);
        let offset = i64::try_from(size.saturating_mul(page)).unwrap_or(i64::MAX);
        (limit, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_bounds() {
        assert_eq!(Pagination::default().to_inner_values(), (10, 0));
        assert_eq!(
            Pagination {
                size: Some(1000),
                page: Some(2)
            }
            .limit_offset(),
            (200, 400)
        );
        assert_eq!(
            Pagination {
                size: Some(0),
                page: None
            }
            .to_inner_values(),
            (1, 0)
        );
    }
}
