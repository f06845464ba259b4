//! Scanner Adapter — a hosted reader presented as a native scan source.
//!
//! [`BridgeScanner`] implements the engine's generic external-reader
//! interface ([`GenericReader`]) so the scan pipeline can treat it like any
//! other file reader. One scanner serves exactly one scan range.

use crate::block::{Block, BlockRead};
use crate::bridge::{BridgeHandle, BridgeState, ReaderLoader};
use crate::error::{XscanError, XscanResult};
use crate::options::RuntimeState;
use crate::params::{FileScanRangeParams, ParamMap, ScannerConfig, SlotDescriptor, TableFileDesc};
use crate::predicate::PredicateRanges;
use crate::profile::{ScanPhase, ScanProfile};
use arrow::datatypes::{DataType, SchemaRef};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// 엔진의 범용 외부 리더 인터페이스
pub trait GenericReader: Send {
    /// Install predicate ranges and open the underlying reader.
    fn init_reader(&mut self, predicates: Arc<PredicateRanges>) -> XscanResult<()>;

    /// Fill `block` with the next rows. Resources are released before `eos` is reported.
    fn get_next_block(&mut self, block: &mut Block) -> XscanResult<BlockRead>;

    /// Column name → type of everything this reader produces.
    fn get_columns(
        &self,
        name_to_type: &mut HashMap<String, DataType>,
        missing_cols: &mut HashSet<String>,
    ) -> XscanResult<()>;

    /// Early-termination teardown. Idempotent.
    fn close(&mut self) -> XscanResult<()>;
}

/// Scanner over one base file plus its delta logs, decoded by a hosted reader.
pub struct BridgeScanner {
    config: ScannerConfig,
    params: ParamMap,
    slots: Vec<SlotDescriptor>,
    schema: SchemaRef,
    state: Arc<RuntimeState>,
    profile: Arc<ScanProfile>,
    predicates: Option<Arc<PredicateRanges>>,
    handle: BridgeHandle,
}

impl BridgeScanner {
    /// Build the parameter map and construct the hosted reader eagerly.
    ///
    /// No I/O happens here, but the hosted object exists and holds its
    /// configuration when this returns.
    pub fn new(
        scan_params: &FileScanRangeParams,
        desc: &TableFileDesc,
        slots: Vec<SlotDescriptor>,
        state: Arc<RuntimeState>,
        profile: Arc<ScanProfile>,
        loader: &dyn ReaderLoader,
    ) -> XscanResult<Self> {
        let required_fields: Vec<String> = slots.iter().map(|s| s.col_name.clone()).collect();
        desc.validate(&required_fields)?;

        let config = ScannerConfig::new(desc, required_fields, scan_params);
        let params = config.to_param_map();
        if state.trace_parameters {
            tracing::info!(
                query_id = %state.query_id,
                file = %config.data_file_path,
                params = %params.redacted(),
                "hosted scanner parameters"
            );
        }

        let handle = BridgeHandle::construct(loader, &config.format, &params)?;
        let schema = SlotDescriptor::schema_of(&slots);

        Ok(Self {
            config,
            params,
            slots,
            schema,
            state,
            profile,
            predicates: None,
            handle,
        })
    }

    /// Schema of the blocks this scanner fills.
    pub fn output_schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// A fresh block matching [`Self::output_schema`].
    pub fn new_block(&self) -> Block {
        Block::new(self.output_schema())
    }

    pub fn required_fields(&self) -> &[String] {
        &self.config.required_fields
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn param_map(&self) -> &ParamMap {
        &self.params
    }

    pub fn predicates(&self) -> Option<&PredicateRanges> {
        self.predicates.as_deref()
    }

    pub fn bridge_state(&self) -> BridgeState {
        self.handle.state()
    }

    fn close_handle(&mut self) -> XscanResult<()> {
        if self.handle.is_closed() {
            return Ok(());
        }
        let opened = matches!(
            self.handle.state(),
            BridgeState::Opened | BridgeState::Draining | BridgeState::Exhausted
        );
        let result = self.profile.timed(ScanPhase::Close, || self.handle.close());
        if opened {
            self.profile.record_closed();
        }
        result
    }

    /// Close after a failure; the root error wins over a cleanup error.
    fn abort(&mut self, root: XscanError) -> XscanError {
        if let Err(cleanup) = self.close_handle() {
            tracing::warn!(
                file = %self.config.data_file_path,
                error = %cleanup,
                root = %root,
                "close failed while aborting scan range"
            );
        }
        root
    }
}

impl GenericReader for BridgeScanner {
    fn init_reader(&mut self, predicates: Arc<PredicateRanges>) -> XscanResult<()> {
        match self.handle.init(&predicates) {
            Ok(()) => {}
            Err(e @ XscanError::InvalidState { .. }) => return Err(e),
            Err(e) => return Err(self.abort(e)),
        }
        self.predicates = Some(Arc::clone(&predicates));

        let state = Arc::clone(&self.state);
        let handle = &mut self.handle;
        let opened = self.profile.timed(ScanPhase::Open, || handle.open(&state));
        if let Err(e) = opened {
            return Err(self.abort(e));
        }
        self.profile.record_opened();

        tracing::debug!(
            format = self.handle.format(),
            implementation = self.handle.implementation(),
            file = %self.config.data_file_path,
            deltas = self.config.delta_file_paths.len(),
            predicates = predicates.values().filter(|r| !r.is_full_range()).count(),
            "hosted scanner opened"
        );
        Ok(())
    }

    fn get_next_block(&mut self, block: &mut Block) -> XscanResult<BlockRead> {
        let handle = &mut self.handle;
        let read = match self.profile.timed(ScanPhase::Read, || handle.next_block(block)) {
            Ok(read) => read,
            // Lifecycle misuse leaves the handle alone; anything else ends the range.
            Err(e @ XscanError::InvalidState { .. }) => return Err(e),
            Err(e) => return Err(self.abort(e)),
        };
        self.profile.record_block(read.rows);

        if read.eos {
            self.close_handle()
                .map_err(|e| XscanError::Cleanup { source: Box::new(e) })?;
            tracing::debug!(file = %self.config.data_file_path, "hosted scanner reached end of stream");
        }
        Ok(read)
    }

    fn get_columns(
        &self,
        name_to_type: &mut HashMap<String, DataType>,
        _missing_cols: &mut HashSet<String>,
    ) -> XscanResult<()> {
        // Every requested column is assumed present in the hosted output.
        for slot in &self.slots {
            name_to_type.insert(slot.col_name.clone(), slot.data_type.clone());
        }
        Ok(())
    }

    fn close(&mut self) -> XscanResult<()> {
        self.close_handle()
    }
}

impl std::fmt::Debug for BridgeScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeScanner")
            .field("file", &self.config.data_file_path)
            .field("required_fields", &self.config.required_fields)
            .field("handle", &self.handle)
            .finish()
    }
}

impl Drop for BridgeScanner {
    fn drop(&mut self) {
        if let Err(e) = self.close_handle() {
            tracing::warn!(file = %self.config.data_file_path, error = %e, "close failed during scanner teardown");
        }
    }
}
