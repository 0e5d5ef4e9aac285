use std::ops::Range;

use treebench_core::{BenchError, BenchResult};

/// One contiguous block of rows sent to a backend in a single call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchSlice {
    pub index: usize,
    pub range: Range<usize>,
    /// Shorter than the nominal query size (only ever the last slice).
    pub is_partial: bool,
}

impl BatchSlice {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchPlan {
    total_rows: usize,
    slices: Vec<BatchSlice>,
}

impl BatchPlan {
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn iterations(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn slices(&self) -> &[BatchSlice] {
        &self.slices
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BatchSlice> {
        self.slices.iter()
    }
}

impl<'a> IntoIterator for &'a BatchPlan {
    type Item = &'a BatchSlice;
    type IntoIter = std::slice::Iter<'a, BatchSlice>;

    fn into_iter(self) -> Self::IntoIter {
        self.slices.iter()
    }
}

/// Split `[0, total_rows)` into `ceil(total_rows / query_size)` ordered slices.
pub fn plan(total_rows: usize, query_size: usize) -> BenchResult<BatchPlan> {
    if query_size == 0 {
        return Err(BenchError::invalid("batch size must be at least 1"));
    }

    let iterations = total_rows.div_ceil(query_size);
    let slices = (0..iterations)
        .map(|i| {
            let start = i * query_size;
            let end = ((i + 1) * query_size).min(total_rows);
            BatchSlice {
                index: i,
                range: start..end,
                is_partial: end - start < query_size,
            }
        })
        .collect();

    Ok(BatchPlan {
        total_rows,
        slices,
    })
}
