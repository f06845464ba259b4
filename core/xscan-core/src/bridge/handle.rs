//! Bridge Handle — owns one hosted reader and drives its lifecycle.
//!
//! ```text
//! Constructed ─init─▶ Initialized ─open─▶ Opened ─next_block─▶ Draining
//!                                                                │ eos
//!                                                                ▼
//!        Closed ◀──────────────── close (from any state) ─── Exhausted
//! ```
//!
//! Every call into the hosted reader is guarded: a panic on the other side
//! becomes an error here instead of unwinding through the scan pipeline.

use super::{HostedReader, ReaderLoader, panic_message};
use crate::block::{Block, BlockRead};
use crate::error::{XscanError, XscanResult};
use crate::options::RuntimeState;
use crate::params::ParamMap;
use crate::predicate::PredicateRanges;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Lifecycle state of a [`BridgeHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Constructed,
    Initialized,
    Opened,
    /// At least one block pulled, stream not finished
    Draining,
    /// End of stream observed, close pending
    Exhausted,
    Closed,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BridgeState::Constructed => "constructed",
            BridgeState::Initialized => "initialized",
            BridgeState::Opened => "opened",
            BridgeState::Draining => "draining",
            BridgeState::Exhausted => "exhausted",
            BridgeState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Owned reference to one hosted reader instance.
pub struct BridgeHandle {
    format: String,
    implementation: String,
    /// `None` once closed; dropping the box releases the hosted object
    reader: Option<Box<dyn HostedReader>>,
    state: BridgeState,
}

impl BridgeHandle {
    /// Resolve the reader implementation for `format` and construct it eagerly.
    ///
    /// Any failure (unknown format, hosted construction error, hosted panic)
    /// is reported as [`XscanError::BridgeInit`] and never retried.
    pub fn construct(
        loader: &dyn ReaderLoader,
        format: &str,
        params: &ParamMap,
    ) -> XscanResult<Self> {
        let init_failed = |message: String| XscanError::BridgeInit {
            format: format.to_string(),
            message,
        };

        let factory = loader.resolve(format).map_err(|e| init_failed(e.to_string()))?;
        let reader = match panic::catch_unwind(AssertUnwindSafe(|| factory.create(params))) {
            Ok(Ok(reader)) => reader,
            Ok(Err(e)) => return Err(init_failed(e.to_string())),
            Err(payload) => {
                return Err(init_failed(format!(
                    "constructor panicked: {}",
                    panic_message(payload)
                )));
            }
        };

        tracing::debug!(
            format,
            implementation = factory.name(),
            params = params.len(),
            "hosted reader constructed"
        );

        Ok(Self {
            format: format.to_string(),
            implementation: factory.name().to_string(),
            reader: Some(reader),
            state: BridgeState::Constructed,
        })
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == BridgeState::Closed
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    /// Forward predicate ranges. Valid only right after construction.
    pub fn init(&mut self, predicates: &PredicateRanges) -> XscanResult<()> {
        self.expect_state("init", &[BridgeState::Constructed])?;
        self.call("init", |reader| reader.init(predicates))?;
        self.transition(BridgeState::Initialized);
        Ok(())
    }

    /// Let the hosted reader allocate its resources.
    pub fn open(&mut self, state: &RuntimeState) -> XscanResult<()> {
        self.expect_state("open", &[BridgeState::Initialized])?;
        self.call("open", |reader| reader.open(state))?;
        self.transition(BridgeState::Opened);
        Ok(())
    }

    /// Pull the next batch of decoded rows into `block`.
    pub fn next_block(&mut self, block: &mut Block) -> XscanResult<BlockRead> {
        self.expect_state("read next block", &[BridgeState::Opened, BridgeState::Draining])?;

        let before = block.num_rows();
        let read = self.call("next_block", |reader| reader.next_block(block))?;
        if self.state == BridgeState::Opened {
            self.transition(BridgeState::Draining);
        }

        let appended = block.num_rows().checked_sub(before);
        if appended != Some(read.rows) {
            return Err(XscanError::remote(
                "next_block",
                format!(
                    "reader reported {} rows but block grew from {} to {} rows",
                    read.rows,
                    before,
                    block.num_rows()
                ),
            ));
        }

        if read.eos {
            self.transition(BridgeState::Exhausted);
        }
        Ok(read)
    }

    /// Release the hosted reader. A no-op once closed.
    ///
    /// The handle is `Closed` afterwards even if the hosted close failed;
    /// the reader object is released either way.
    pub fn close(&mut self) -> XscanResult<()> {
        let Some(mut reader) = self.reader.take() else {
            return Ok(());
        };
        let previous = self.state;
        self.state = BridgeState::Closed;

        let result = match panic::catch_unwind(AssertUnwindSafe(|| reader.close())) {
            Ok(result) => result,
            Err(payload) => Err(XscanError::remote("close", panic_message(payload))),
        };
        drop(reader);

        tracing::debug!(
            format = %self.format,
            from = %previous,
            ok = result.is_ok(),
            "hosted reader closed"
        );
        result
    }

    fn expect_state(&self, op: &str, allowed: &[BridgeState]) -> XscanResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(XscanError::invalid_state(op, self.state))
        }
    }

    fn transition(&mut self, next: BridgeState) {
        tracing::trace!(format = %self.format, from = %self.state, to = %next, "bridge transition");
        self.state = next;
    }

    fn call<T>(
        &mut self,
        op: &str,
        f: impl FnOnce(&mut dyn HostedReader) -> XscanResult<T>,
    ) -> XscanResult<T> {
        let state = self.state;
        let reader = self
            .reader
            .as_deref_mut()
            .ok_or_else(|| XscanError::invalid_state(op, state))?;
        match panic::catch_unwind(AssertUnwindSafe(move || f(reader))) {
            Ok(result) => result,
            Err(payload) => Err(XscanError::remote(op, panic_message(payload))),
        }
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(format = %self.format, error = %e, "hosted reader close failed during teardown");
        }
    }
}

impl fmt::Debug for BridgeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeHandle")
            .field("format", &self.format)
            .field("implementation", &self.implementation)
            .field("state", &self.state)
            .finish()
    }
}
