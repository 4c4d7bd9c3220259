use std::iter::FusedIterator;

/// Rows returned by a query, consumed once.
#[derive(Debug)]
pub struct QueryRows<T> {
    rows: std::vec::IntoIter<T>,
}

impl<T> QueryRows<T> {
    pub(crate) fn new(rows: Vec<T>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }

    /// Returns true when no rows are left.
    pub fn is_empty(&self) -> bool {
        self.rows.as_slice().is_empty()
    }
}

impl<T> Iterator for QueryRows<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<T> ExactSizeIterator for QueryRows<T> {}

impl<T> FusedIterator for QueryRows<T> {}
