//! Block — caller-owned output buffer filled by the hosted reader.

use crate::error::{XscanError, XscanResult};
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

/// Outcome of one pull from a hosted reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockRead {
    /// Rows appended to the block by this call
    pub rows: usize,
    /// End of stream reached
    pub eos: bool,
}

impl BlockRead {
    pub fn rows(rows: usize) -> Self {
        Self { rows, eos: false }
    }

    pub fn eos(rows: usize) -> Self {
        Self { rows, eos: true }
    }
}

/// 컬럼형 출력 블록 — 스키마가 고정된 RecordBatch 버퍼
#[derive(Debug, Clone)]
pub struct Block {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    num_rows: usize,
}

impl Block {
    pub fn new(schema: SchemaRef) -> Self {
        Self {
            schema,
            batches: Vec::new(),
            num_rows: 0,
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Append a decoded batch. Column names and types must match the block schema.
    pub fn push_batch(&mut self, batch: RecordBatch) -> XscanResult<()> {
        let expected = self.schema.fields();
        let actual = batch.schema_ref().fields();
        if expected.len() != actual.len() {
            return Err(XscanError::Schema(format!(
                "block expects {} columns, batch has {}",
                expected.len(),
                actual.len()
            )));
        }
        for (want, got) in expected.iter().zip(actual.iter()) {
            if want.name() != got.name() || want.data_type() != got.data_type() {
                return Err(XscanError::Schema(format!(
                    "expected column {}: {}, got {}: {}",
                    want.name(),
                    want.data_type(),
                    got.name(),
                    got.data_type()
                )));
            }
        }

        // Rebind to the block schema so nullability/metadata stay uniform.
        let batch = RecordBatch::try_new(self.schema.clone(), batch.columns().to_vec())?;
        self.num_rows += batch.num_rows();
        self.batches.push(batch);
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Drop buffered rows, keeping the schema for reuse.
    pub fn clear(&mut self) {
        self.batches.clear();
        self.num_rows = 0;
    }

    /// Move buffered batches out, leaving the block empty.
    pub fn take_batches(&mut self) -> Vec<RecordBatch> {
        self.num_rows = 0;
        std::mem::take(&mut self.batches)
    }

    /// Concatenate buffered batches into one (an empty batch if none).
    pub fn to_record_batch(&self) -> XscanResult<RecordBatch> {
        Ok(concat_batches(&self.schema, &self.batches)?)
    }
}
