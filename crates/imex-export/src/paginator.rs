//! Offset/limit pagination over the images source
//!
//! The total is queried once when the paginator opens and stays fixed for the
//! run, so records added to the source mid-run are not picked up.

use tracing::{debug, info};

use crate::error::{ExportError, Result};
use crate::models::SourceRecord;
use crate::source::ImageSource;

/// Default page size for list calls
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Position of an export run in the source result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportCursor {
    pub offset: u64,
    pub limit: u64,
    pub total: u64,
}

impl ExportCursor {
    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.total
    }

    /// Number of list calls needed to drain `total`, excluding the total query
    pub fn expected_batches(&self) -> u64 {
        self.total.div_ceil(self.limit)
    }
}

/// One page of records
#[derive(Debug, Clone)]
pub struct Batch {
    /// Zero-based position of the batch in the run
    pub index: usize,
    pub offset: u64,
    pub records: Vec<SourceRecord>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Lazy, finite, single-pass sequence of batches
///
/// Any failed fetch ends the sequence: the error is returned once and later
/// calls to [`Paginator::next_batch`] yield `None`.
pub struct Paginator<'a, S: ImageSource + ?Sized> {
    source: &'a S,
    tenant_id: String,
    project_id: String,
    cursor: ExportCursor,
    next_index: usize,
    finished: bool,
}

impl<'a, S: ImageSource + ?Sized> Paginator<'a, S> {
    /// Query the source for its total and position the cursor at offset 0
    pub async fn open(source: &'a S, tenant_id: &str, project_id: &str, limit: u64) -> Result<Self> {
        if limit == 0 {
            return Err(ExportError::config("page size must be greater than 0"));
        }

        let first = source
            .list(tenant_id, project_id, 0, 1)
            .await
            .map_err(|e| ExportError::source_fetch(tenant_id, project_id, 0, 1, e))?;

        let cursor = ExportCursor {
            offset: 0,
            limit,
            total: first.total,
        };

        info!(
            tenant_id = %tenant_id,
            project_id = %project_id,
            total = cursor.total,
            batches = cursor.expected_batches(),
            "{} image(s) to export",
            cursor.total
        );

        Ok(Self {
            source,
            tenant_id: tenant_id.to_string(),
            project_id: project_id.to_string(),
            cursor,
            next_index: 0,
            finished: cursor.is_exhausted(),
        })
    }

    pub fn cursor(&self) -> ExportCursor {
        self.cursor
    }

    pub fn total(&self) -> u64 {
        self.cursor.total
    }

    pub async fn next_batch(&mut self) -> Result<Option<Batch>> {
        if self.finished || self.cursor.is_exhausted() {
            self.finished = true;
            return Ok(None);
        }

        let ExportCursor { offset, limit, .. } = self.cursor;
        debug!(offset, limit, "About to fetch image batch");

        let page = match self
            .source
            .list(&self.tenant_id, &self.project_id, offset, limit)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.finished = true;
                return Err(ExportError::source_fetch(
                    &self.tenant_id,
                    &self.project_id,
                    offset,
                    limit,
                    e,
                ));
            },
        };

        debug!(offset, count = page.items.len(), "Got image batch");

        let batch = Batch {
            index: self.next_index,
            offset,
            records: page.items,
        };
        self.next_index += 1;
        self.cursor.offset = offset.saturating_add(limit);

        Ok(Some(batch))
    }
}
