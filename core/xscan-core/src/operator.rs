//! Hosted scan operator — Volcano-style pull over a list of scan ranges.
//!
//! Each scan range gets its own [`BridgeScanner`]; the operator opens the
//! next range only once the previous one has reported end of stream.
//! A failed range ends the scan: the operator never reconstructs a hosted
//! reader for it, and reports the failure until [`PhysicalOperator::reset`].

use crate::block::Block;
use crate::bridge::ReaderLoader;
use crate::error::{XscanError, XscanResult};
use crate::options::RuntimeState;
use crate::params::{FileScanRangeParams, SlotDescriptor, TableFileDesc};
use crate::predicate::PredicateRanges;
use crate::profile::ScanProfile;
use crate::scanner::{BridgeScanner, GenericReader};
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// 물리 연산자 트레이트 — Volcano 실행 모델 (Pull 기반)
pub trait PhysicalOperator: Send {
    /// 출력 스키마 반환
    fn schema(&self) -> &Schema;

    /// 다음 RecordBatch 반환 (None이면 끝)
    fn next(&mut self) -> XscanResult<Option<RecordBatch>>;

    /// 연산자 상태 초기화 (재실행용)
    fn reset(&mut self) -> XscanResult<()>;
}

/// One unit of scan work: a base file with its delta logs.
#[derive(Debug, Clone)]
pub struct ScanRange {
    pub params: FileScanRangeParams,
    pub desc: TableFileDesc,
}

/// 외부 런타임 리더 기반 스캔 연산자
pub struct HostedScanOperator {
    ranges: Vec<ScanRange>,
    slots: Vec<SlotDescriptor>,
    schema: SchemaRef,
    loader: Arc<dyn ReaderLoader>,
    predicates: Arc<PredicateRanges>,
    state: Arc<RuntimeState>,
    profile: Arc<ScanProfile>,
    /// Scanner for `ranges[position]`, if open
    current: Option<BridgeScanner>,
    position: usize,
    /// Root error of the range that ended the scan
    failed: Option<String>,
}

impl HostedScanOperator {
    pub fn new(
        ranges: Vec<ScanRange>,
        slots: Vec<SlotDescriptor>,
        loader: Arc<dyn ReaderLoader>,
        state: Arc<RuntimeState>,
    ) -> Self {
        let schema = SlotDescriptor::schema_of(&slots);
        Self {
            ranges,
            slots,
            schema,
            loader,
            predicates: Arc::new(PredicateRanges::new()),
            state,
            profile: Arc::new(ScanProfile::new()),
            current: None,
            position: 0,
            failed: None,
        }
    }

    /// Predicate ranges forwarded to every scanner.
    pub fn with_predicates(mut self, predicates: Arc<PredicateRanges>) -> Self {
        self.predicates = predicates;
        self
    }

    pub fn with_profile(mut self, profile: Arc<ScanProfile>) -> Self {
        self.profile = profile;
        self
    }

    pub fn profile(&self) -> &Arc<ScanProfile> {
        &self.profile
    }

    /// Index of the range being scanned (equals the range count when done).
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }

    /// A predicate no value can satisfy means no range can produce rows.
    fn provably_empty(&self) -> Option<&str> {
        self.predicates
            .values()
            .find(|r| r.is_empty_range())
            .map(|r| r.column.as_str())
    }

    fn pull(&mut self) -> XscanResult<Option<RecordBatch>> {
        if self.position == 0 && self.current.is_none() {
            if let Some(column) = self.provably_empty() {
                tracing::debug!(column, "predicate range is empty, skipping all scan ranges");
                self.position = self.ranges.len();
            }
        }
        loop {
            if self.current.is_none() {
                let Some(range) = self.ranges.get(self.position) else {
                    return Ok(None);
                };
                tracing::debug!(
                    range = self.position,
                    file = %range.desc.data_file_path,
                    "opening scan range"
                );
                self.current = Some(self.open_range(range)?);
            }

            let Some(scanner) = self.current.as_mut() else {
                continue;
            };
            let mut block = Block::new(Arc::clone(&self.schema));
            let read = scanner.get_next_block(&mut block)?;
            if read.eos {
                // Already closed by the scanner.
                tracing::debug!(
                    range = self.position,
                    file = %scanner.config().data_file_path,
                    "scan range finished"
                );
                self.current = None;
                self.position += 1;
            }
            if !block.is_empty() {
                return Ok(Some(block.to_record_batch()?));
            }
        }
    }

    fn open_range(&self, range: &ScanRange) -> XscanResult<BridgeScanner> {
        let mut scanner = BridgeScanner::new(
            &range.params,
            &range.desc,
            self.slots.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.profile),
            self.loader.as_ref(),
        )?;
        scanner.init_reader(Arc::clone(&self.predicates))?;
        Ok(scanner)
    }
}

impl PhysicalOperator for HostedScanOperator {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next(&mut self) -> XscanResult<Option<RecordBatch>> {
        if let Some(root) = &self.failed {
            return Err(XscanError::invalid_state(
                "read next batch",
                format!("failed at scan range {}: {root}", self.position),
            ));
        }
        match self.pull() {
            Ok(batch) => Ok(batch),
            Err(e) => {
                // 실패한 스캔 범위는 재시도하지 않음 (스캐너는 이미 닫힘)
                self.current = None;
                self.failed = Some(e.to_string());
                tracing::warn!(range = self.position, error = %e, "scan range failed");
                Err(e)
            }
        }
    }

    fn reset(&mut self) -> XscanResult<()> {
        if let Some(mut scanner) = self.current.take() {
            scanner.close()?;
        }
        self.position = 0;
        self.failed = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockRead;
    use crate::bridge::{HostedReader, ReaderFactory, ReaderRegistry};
    use crate::params::ParamMap;
    use crate::predicate::{ColumnValueRange, Literal};
    use arrow::array::{Array, Int64Array};
    use arrow::datatypes::DataType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Emits the file length as a single-row block, preceded by one empty block.
    /// A zero-length file fails its read.
    struct LengthReader {
        length: i64,
        step: usize,
        schema: SchemaRef,
    }

    impl HostedReader for LengthReader {
        fn init(&mut self, _: &PredicateRanges) -> XscanResult<()> {
            Ok(())
        }
        fn open(&mut self, _: &RuntimeState) -> XscanResult<()> {
            Ok(())
        }
        fn next_block(&mut self, block: &mut Block) -> XscanResult<BlockRead> {
            self.step += 1;
            match self.step {
                1 => Ok(BlockRead::rows(0)),
                2 if self.length == 0 => Err(XscanError::remote("next_block", "truncated file")),
                2 => {
                    let batch = RecordBatch::try_new(
                        Arc::clone(&self.schema),
                        vec![Arc::new(Int64Array::from(vec![self.length]))],
                    )?;
                    block.push_batch(batch)?;
                    Ok(BlockRead::rows(1))
                }
                _ => Ok(BlockRead::eos(0)),
            }
        }
        fn close(&mut self) -> XscanResult<()> {
            Ok(())
        }
    }

    struct LengthFactory;

    impl ReaderFactory for LengthFactory {
        fn name(&self) -> &str {
            "LengthReader"
        }
        fn create(&self, params: &ParamMap) -> XscanResult<Box<dyn HostedReader>> {
            let length = params
                .get("data_file_length")
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| XscanError::remote("<init>", "missing data_file_length"))?;
            Ok(Box::new(LengthReader {
                length,
                step: 0,
                schema: SlotDescriptor::schema_of(&[SlotDescriptor::new("len", DataType::Int64)]),
            }))
        }
    }

    /// Constructor always throws, counting attempts.
    struct BrokenFactory {
        creates: Arc<AtomicUsize>,
    }

    impl ReaderFactory for BrokenFactory {
        fn name(&self) -> &str {
            "BrokenReader"
        }
        fn create(&self, _: &ParamMap) -> XscanResult<Box<dyn HostedReader>> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Err(XscanError::remote("<init>", "java.lang.ClassNotFoundException"))
        }
    }

    fn range(length: u64) -> ScanRange {
        ScanRange {
            params: FileScanRangeParams::default(),
            desc: TableFileDesc {
                format: "len".to_string(),
                data_file_path: format!("/t/{length}.parquet"),
                data_file_length: length,
                column_names: vec!["len".to_string()],
                column_types: vec!["bigint".to_string()],
                ..Default::default()
            },
        }
    }

    fn operator(ranges: Vec<ScanRange>) -> HostedScanOperator {
        operator_with(ranges, ReaderRegistry::new())
    }

    fn operator_with(ranges: Vec<ScanRange>, registry: ReaderRegistry) -> HostedScanOperator {
        registry.register("len", Arc::new(LengthFactory)).unwrap();
        HostedScanOperator::new(
            ranges,
            vec![SlotDescriptor::new("len", DataType::Int64)],
            Arc::new(registry),
            Arc::new(RuntimeState::default()),
        )
    }

    fn drain(op: &mut HostedScanOperator) -> Vec<i64> {
        let mut out = Vec::new();
        while let Some(batch) = op.next().unwrap() {
            let col = batch
                .column(0)
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap();
            out.extend(col.values().iter().copied());
        }
        out
    }

    #[test]
    fn scans_ranges_in_order_skipping_empty_blocks() {
        let mut op = operator(vec![range(10), range(20), range(30)]);
        assert_eq!(drain(&mut op), vec![10, 20, 30]);
        assert_eq!(op.position(), 3);

        let snap = op.profile().snapshot();
        assert_eq!(snap.scanners_opened, 3);
        assert_eq!(snap.scanners_closed, 3);
        assert_eq!(snap.rows_read, 3);
        assert!(op.next().unwrap().is_none());
    }

    #[test]
    fn reset_closes_live_scanner_and_restarts() {
        let mut op = operator(vec![range(1), range(2)]);
        assert!(op.next().unwrap().is_some());
        assert_eq!(op.profile().snapshot().live_scanners(), 1);

        op.reset().unwrap();
        assert_eq!(op.profile().snapshot().live_scanners(), 0);
        assert_eq!(drain(&mut op), vec![1, 2]);
    }

    #[test]
    fn no_ranges_yields_nothing() {
        let mut op = operator(vec![]);
        assert!(op.next().unwrap().is_none());
        assert_eq!(op.schema().fields().len(), 1);
    }

    #[test]
    fn unregistered_format_fails_the_scan() {
        let mut bad = range(5);
        bad.desc.format = "iceberg".to_string();
        let mut op = operator(vec![bad]);
        assert!(matches!(op.next(), Err(XscanError::BridgeInit { .. })));
    }

    #[test]
    fn failed_construction_is_not_retried() {
        let creates = Arc::new(AtomicUsize::new(0));
        let registry = ReaderRegistry::new();
        registry
            .register(
                "broken",
                Arc::new(BrokenFactory {
                    creates: Arc::clone(&creates),
                }),
            )
            .unwrap();
        let mut bad = range(5);
        bad.desc.format = "broken".to_string();
        let mut op = operator_with(vec![bad, range(7)], registry);

        let first = op.next().unwrap_err();
        assert!(matches!(first, XscanError::BridgeInit { .. }));
        assert!(op.is_failed());

        // 같은 범위에 대해 호스팅 리더를 다시 만들지 않음
        let second = op.next().unwrap_err();
        assert!(second.to_string().contains("ClassNotFoundException"));
        assert_eq!(creates.load(Ordering::SeqCst), 1);
        assert_eq!(op.position(), 0);

        op.reset().unwrap();
        assert!(!op.is_failed());
        assert!(op.next().is_err());
        assert_eq!(creates.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn read_failure_reports_root_error_afterwards() {
        let mut op = operator(vec![range(3), range(0), range(9)]);
        assert!(op.next().unwrap().is_some());

        let err = op.next().unwrap_err();
        assert_eq!(err.to_string(), "remote next_block failed: truncated file");
        assert_eq!(op.profile().snapshot().live_scanners(), 0);

        let again = op.next().unwrap_err();
        assert!(matches!(again, XscanError::InvalidState { .. }));
        assert!(again.to_string().contains("truncated file"));
        assert_eq!(op.position(), 1);
    }

    #[test]
    fn empty_predicate_range_skips_every_scan_range() {
        let mut ranges = PredicateRanges::new();
        ranges.insert(
            "len".to_string(),
            ColumnValueRange::new("len")
                .with_low(Literal::Int(10), true)
                .with_high(Literal::Int(5), true),
        );
        let mut op = operator(vec![range(1), range(2)]).with_predicates(Arc::new(ranges));

        assert!(op.next().unwrap().is_none());
        assert_eq!(op.position(), 2);
        assert_eq!(op.profile().snapshot().scanners_opened, 0);
    }
}
