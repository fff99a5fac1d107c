use chrono::NaiveDate;

/// Every day from the start date through the end date (inclusive).
///
/// An end before the start is an empty range.
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct DateRange {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            next: (start <= end).then_some(start),
            end,
        }
    }

    /// Number of days the range still has to yield.
    pub fn num_days(&self) -> usize {
        self.next
            .map_or(0, |next| (self.end - next).num_days() as usize + 1)
    }
}

impl Iterator for DateRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.succ_opt().filter(|d| *d <= self.end);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.num_days();
        (n, Some(n))
    }
}

impl ExactSizeIterator for DateRange {}
