//! Bridge to readers hosted in another runtime.
//!
//! The scanner never sees a concrete hosted implementation. It depends on
//! three seams:
//!
//! - [`HostedReader`] — one remote reader instance (init → open → next_block* → close)
//! - [`ReaderFactory`] — builds a reader from the flat parameter map
//! - [`ReaderLoader`] — resolves the factory for a format identifier
//!
//! [`BridgeHandle`] drives a single reader through its lifecycle.

pub mod handle;
pub mod registry;

pub use handle::{BridgeHandle, BridgeState};
pub use registry::ReaderRegistry;

use crate::block::{Block, BlockRead};
use crate::error::XscanResult;
use crate::options::RuntimeState;
use crate::params::ParamMap;
use crate::predicate::PredicateRanges;
use std::any::Any;
use std::sync::Arc;

/// Reader instance living in the hosted runtime.
///
/// # Contract
///
/// - `init`: receives predicate ranges for source-side pruning; called once.
/// - `open`: allocates hosted resources (file handles, buffers).
/// - `next_block`: appends decoded rows to `block`; `rows` must equal the
///   rows appended. Never called after `eos` or `close`.
/// - `close`: releases hosted resources; called at most once.
///
/// Errors returned here reach the caller unchanged.
pub trait HostedReader: Send {
    fn init(&mut self, predicates: &PredicateRanges) -> XscanResult<()>;

    fn open(&mut self, state: &RuntimeState) -> XscanResult<()>;

    fn next_block(&mut self, block: &mut Block) -> XscanResult<BlockRead>;

    fn close(&mut self) -> XscanResult<()>;
}

/// Constructs hosted readers for one format.
pub trait ReaderFactory: Send + Sync {
    /// Implementation name, for logs
    fn name(&self) -> &str;

    fn create(&self, params: &ParamMap) -> XscanResult<Box<dyn HostedReader>>;
}

/// Resolves which factory implements a format.
pub trait ReaderLoader: Send + Sync {
    fn resolve(&self, format: &str) -> XscanResult<Arc<dyn ReaderFactory>>;
}

/// Render a caught panic payload.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "hosted reader panicked".to_string()
    }
}
