//! Page-number pagination shared by every listing.
//!
//! Requests carry a raw `?page=` value. Anything that is not an integer
//! resolves to the first page; integers outside `1..=num_pages` resolve to the
//! last page, so an out-of-range request never fails.

use serde::Serialize;

const LINK_RADIUS: usize = 2;

/// The slice of a listing a repository should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub offset: u64,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: u32,
}

impl Paginator {
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of pages for `total` records; an empty listing still has one page.
    pub fn num_pages(&self, total: u64) -> usize {
        if total == 0 {
            return 1;
        }
        let pages = total.div_ceil(u64::from(self.per_page));
        usize::try_from(pages).unwrap_or(usize::MAX)
    }

    /// Resolve a raw page parameter against the current record count.
    pub fn window(&self, total: u64, requested: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages(total);
        let number = match requested.map(str::trim).map(str::parse::<i64>) {
            None | Some(Err(_)) => 1,
            Some(Ok(value)) if value < 1 => num_pages,
            Some(Ok(value)) => usize::try_from(value)
                .ok()
                .filter(|number| *number <= num_pages)
                .unwrap_or(num_pages),
        };

        let offset = (number as u64 - 1).saturating_mul(u64::from(self.per_page));
        PageWindow {
            number,
            offset,
            limit: self.per_page,
        }
    }

    pub fn page<T>(&self, items: Vec<T>, window: PageWindow, total: u64) -> Page<T> {
        Page {
            items,
            number: window.number,
            num_pages: self.num_pages(total),
            total_count: total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub total_count: u64,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_other_pages(&self) -> bool {
        self.has_next() || self.has_previous()
    }

    pub fn next_number(&self) -> Option<usize> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_number(&self) -> Option<usize> {
        self.has_previous().then_some(self.number - 1)
    }

    /// Page numbers shown around the current one.
    pub fn link_numbers(&self) -> Vec<usize> {
        let first = self.number.saturating_sub(LINK_RADIUS).max(1);
        let last = (self.number + LINK_RADIUS).min(self.num_pages);
        (first..=last).collect()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total_count: self.total_count,
        }
    }
}
