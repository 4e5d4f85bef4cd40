use anyhow::{bail, Result};

/// Page navigation state for a remote result set. Page numbers are 1-based;
/// a zero page size is rejected at construction so the arithmetic below can
/// never divide by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page_number: u64,
    page_size: u64,
    total_records: u64,
}

impl Pager {
    pub fn new(page_size: u64) -> Result<Self> {
        if page_size == 0 {
            bail!("pager: page size must be positive");
        }
        Ok(Pager {
            page_number: 1,
            page_size,
            total_records: 0,
        })
    }

    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    pub fn total_pages(&self) -> u64 {
        self.total_records.div_ceil(self.page_size)
    }

    /// Updates the known total after a fetch. If the total shrank below the
    /// current page, the page snaps back into range.
    pub fn set_total_records(&mut self, total: u64) {
        self.total_records = total;
        let last = self.total_pages().max(1);
        if self.page_number > last {
            self.page_number = last;
        }
    }

    /// Changes the page size and rewinds to the first page. The caller must
    /// refetch afterwards.
    pub fn set_page_size(&mut self, page_size: u64) -> Result<()> {
        if page_size == 0 {
            bail!("pager: page size must be positive");
        }
        self.page_size = page_size;
        self.page_number = 1;
        Ok(())
    }

    /// Returns to the first page, keeping size and total. Used when the sort
    /// order or filter changes.
    pub fn rewind(&mut self) {
        self.page_number = 1;
    }

    pub fn is_first(&self) -> bool {
        self.page_number <= 1
    }

    pub fn is_last(&self) -> bool {
        self.page_number >= self.total_pages()
    }

    /// Advances one page. Returns whether the page changed; a no-op on the
    /// last page.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.page_number += 1;
        true
    }

    /// Steps back one page. Returns whether the page changed; a no-op on the
    /// first page.
    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.page_number -= 1;
        true
    }

    /// Zero-based record offset of the current page for fetch requests.
    pub fn offset(&self) -> u64 {
        (self.page_number - 1) * self.page_size
    }

    pub fn record_range(&self) -> (u64, u64) {
        compute_range(self.page_number, self.page_size, self.total_records)
    }

    /// Display text like "21-25 of 25", or "0 of 0" for an empty result set.
    pub fn range_text(&self) -> String {
        if self.total_records == 0 {
            return "0 of 0".to_string();
        }
        let (start, end) = self.record_range();
        format!("{}-{} of {}", start, end, self.total_records)
    }

    /// Display text like "3 of 5"; an empty result set shows "1 of 1".
    pub fn page_text(&self) -> String {
        format!("{} of {}", self.page_number, self.total_pages().max(1))
    }
}

/// 1-indexed inclusive display range of the given page, or (0, 0) when the
/// result set is empty. Page number and page size must both be positive.
pub fn compute_range(page_number: u64, page_size: u64, total_records: u64) -> (u64, u64) {
    assert!(page_size > 0, "page size must be positive");
    assert!(page_number > 0, "page number must be positive");
    if total_records == 0 {
        return (0, 0);
    }
    let start = (page_number - 1) * page_size + 1;
    let end = (page_number * page_size).min(total_records);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_on_final_partial_page() {
        assert_eq!(compute_range(3, 10, 25), (21, 25));
    }

    #[test]
    fn range_is_zero_for_empty_result() {
        assert_eq!(compute_range(1, 10, 0), (0, 0));
        assert_eq!(compute_range(7, 50, 0), (0, 0));
    }

    #[test]
    fn navigation_is_silent_at_bounds() {
        let mut pager = Pager::new(10).unwrap();
        pager.set_total_records(25);
        assert!(!pager.previous());
        assert_eq!(pager.page_number(), 1);

        assert!(pager.next());
        assert!(pager.next());
        assert_eq!(pager.page_number(), 3);
        assert!(pager.is_last());
        assert!(!pager.next());
        assert_eq!(pager.page_number(), 3);
    }

    #[test]
    fn page_size_change_rewinds_to_first_page() {
        let mut pager = Pager::new(10).unwrap();
        pager.set_total_records(100);
        pager.next();
        pager.next();
        pager.set_page_size(25).unwrap();
        assert_eq!(pager.page_number(), 1);
        assert_eq!(pager.total_pages(), 4);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(Pager::new(0).is_err());
        let mut pager = Pager::new(10).unwrap();
        assert!(pager.set_page_size(0).is_err());
        assert_eq!(pager.page_size(), 10);
    }

    #[test]
    fn shrinking_total_snaps_page_into_range() {
        let mut pager = Pager::new(10).unwrap();
        pager.set_total_records(50);
        while pager.next() {}
        assert_eq!(pager.page_number(), 5);
        pager.set_total_records(12);
        assert_eq!(pager.page_number(), 2);
        pager.set_total_records(0);
        assert_eq!(pager.page_number(), 1);
    }

    #[test]
    fn display_texts_match_footer_format() {
        let mut pager = Pager::new(10).unwrap();
        assert_eq!(pager.range_text(), "0 of 0");
        assert_eq!(pager.page_text(), "1 of 1");

        pager.set_total_records(25);
        pager.next();
        pager.next();
        assert_eq!(pager.range_text(), "21-25 of 25");
        assert_eq!(pager.page_text(), "3 of 3");
    }

    #[test]
    fn offset_tracks_page() {
        let mut pager = Pager::new(25).unwrap();
        pager.set_total_records(80);
        assert_eq!(pager.offset(), 0);
        pager.next();
        assert_eq!(pager.offset(), 25);
    }
}
