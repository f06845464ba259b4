//! xscan C FFI Bindings
//!
//! Two directions cross this boundary:
//!
//! - **Hosted side**: a reader implemented in another runtime registers an
//!   [`XscanReaderVTable`]. Parameters cross as parallel key/value C string
//!   arrays, predicates as JSON, blocks as Arrow C Data Interface structs.
//! - **Engine side**: a native scan pipeline drives scanners through opaque
//!   handles (`xscan_registry_*`, `xscan_scanner_*`).
//!
//! Every handle returned here must be released with its matching `*_free`.

#![allow(unsafe_op_in_unsafe_fn)]
#![allow(clippy::missing_safety_doc)]

use arrow::array::{Array, StructArray};
use arrow::datatypes::Schema;
use arrow::error::ArrowError;
use arrow::ffi::{FFI_ArrowArray, FFI_ArrowSchema, from_ffi, to_ffi};
use arrow::record_batch::RecordBatch;
use libc::{c_char, c_int, c_void};
use serde::Deserialize;
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;
use xscan_core::params::{FileScanRangeParams, ParamMap, SlotDescriptor, TableFileDesc};
use xscan_core::predicate::{self, PredicateRanges};
use xscan_core::{
    Block, BlockRead, BridgeScanner, GenericReader, HostedReader, ReaderFactory, ReaderRegistry,
    RuntimeState, ScanProfile, ScannerOptions, XscanError, XscanResult,
};

/// Error codes
pub const XSCAN_OK: c_int = 0;
pub const XSCAN_ERR_NULL_PTR: c_int = -1;
pub const XSCAN_ERR_INVALID_UTF8: c_int = -2;
pub const XSCAN_ERR_BRIDGE_INIT: c_int = -3;
pub const XSCAN_ERR_REMOTE: c_int = -4;
pub const XSCAN_ERR_INVALID_STATE: c_int = -5;
pub const XSCAN_ERR_CLEANUP: c_int = -6;
pub const XSCAN_ERR_INVALID_ARG: c_int = -7;
pub const XSCAN_ERR_INTERNAL: c_int = -8;

fn error_code(err: &XscanError) -> c_int {
    match err {
        XscanError::BridgeInit { .. } | XscanError::ReaderNotFound(_) => XSCAN_ERR_BRIDGE_INIT,
        XscanError::Remote { .. } => XSCAN_ERR_REMOTE,
        XscanError::InvalidState { .. } => XSCAN_ERR_INVALID_STATE,
        XscanError::Cleanup { .. } => XSCAN_ERR_CLEANUP,
        XscanError::Config(_)
        | XscanError::DuplicateReader(_)
        | XscanError::Serialization(_)
        | XscanError::Schema(_) => XSCAN_ERR_INVALID_ARG,
        XscanError::Arrow { .. } | XscanError::Io { .. } => XSCAN_ERR_INTERNAL,
    }
}

/// Failure of an entry point: a bad C argument or a bridge error.
#[derive(Debug)]
enum FfiError {
    NullPtr(&'static str),
    InvalidUtf8(&'static str),
    Bridge(XscanError),
}

impl FfiError {
    fn code(&self) -> c_int {
        match self {
            FfiError::NullPtr(_) => XSCAN_ERR_NULL_PTR,
            FfiError::InvalidUtf8(_) => XSCAN_ERR_INVALID_UTF8,
            FfiError::Bridge(err) => error_code(err),
        }
    }
}

impl std::fmt::Display for FfiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FfiError::NullPtr(what) => write!(f, "{what} is null"),
            FfiError::InvalidUtf8(what) => write!(f, "{what} is not valid UTF-8"),
            FfiError::Bridge(err) => write!(f, "{err}"),
        }
    }
}

impl From<XscanError> for FfiError {
    fn from(err: XscanError) -> Self {
        FfiError::Bridge(err)
    }
}

impl From<serde_json::Error> for FfiError {
    fn from(err: serde_json::Error) -> Self {
        FfiError::Bridge(err.into())
    }
}

impl From<ArrowError> for FfiError {
    fn from(err: ArrowError) -> Self {
        FfiError::Bridge(err.into())
    }
}

type FfiResult<T> = Result<T, FfiError>;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(message: &str) {
    let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

/// Run an engine-side entry point: map errors to codes, never unwind into C.
fn guarded(entry: &'static str, f: impl FnOnce() -> FfiResult<()>) -> c_int {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => XSCAN_OK,
        Ok(Err(err)) => {
            let code = err.code();
            tracing::debug!(entry, code, error = %err, "xscan call failed");
            set_last_error(&err.to_string());
            code
        }
        Err(payload) => {
            let message = xscan_core::bridge::panic_message(payload);
            tracing::error!(entry, panic = %message, "panic caught at the C boundary");
            set_last_error(&format!("internal panic in xscan: {message}"));
            XSCAN_ERR_INTERNAL
        }
    }
}

unsafe fn c_str<'a>(s: *const c_char, what: &'static str) -> FfiResult<&'a str> {
    if s.is_null() {
        return Err(FfiError::NullPtr(what));
    }
    CStr::from_ptr(s)
        .to_str()
        .map_err(|_| FfiError::InvalidUtf8(what))
}

// ═══════════════════════════════════════════════════════════════
// Hosted side — reader vtable
// ═══════════════════════════════════════════════════════════════

/// Callbacks implementing a hosted reader.
///
/// Every callback returns `0` on success; on failure the host makes a
/// message available through `last_error(ctx)` on the calling thread.
/// `next_block` either leaves `out_array`/`out_schema` untouched (no rows) or
/// moves a struct array into them, ownership passing to xscan.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct XscanReaderVTable {
    /// Host context handed back to `create` and `last_error`
    pub ctx: *mut c_void,
    pub create: unsafe extern "C" fn(
        ctx: *mut c_void,
        keys: *const *const c_char,
        values: *const *const c_char,
        len: usize,
        out_reader: *mut *mut c_void,
    ) -> c_int,
    pub init: unsafe extern "C" fn(reader: *mut c_void, predicates_json: *const c_char) -> c_int,
    pub open: unsafe extern "C" fn(
        reader: *mut c_void,
        batch_size: usize,
        time_zone: *const c_char,
    ) -> c_int,
    pub next_block: unsafe extern "C" fn(
        reader: *mut c_void,
        out_array: *mut FFI_ArrowArray,
        out_schema: *mut FFI_ArrowSchema,
        out_rows: *mut usize,
        out_eos: *mut bool,
    ) -> c_int,
    pub close: unsafe extern "C" fn(reader: *mut c_void) -> c_int,
    /// Destroy the hosted object; called exactly once per created reader
    pub release: unsafe extern "C" fn(reader: *mut c_void),
    pub last_error: unsafe extern "C" fn(ctx: *mut c_void) -> *const c_char,
}

impl XscanReaderVTable {
    unsafe fn host_error(&self, op: &str) -> XscanError {
        let message = (self.last_error)(self.ctx);
        let message = if message.is_null() {
            "unknown host error".to_string()
        } else {
            CStr::from_ptr(message).to_string_lossy().into_owned()
        };
        XscanError::remote(op, message)
    }
}

/// Factory backed by a host vtable.
struct VTableFactory {
    name: String,
    vtable: XscanReaderVTable,
}

// SAFETY: the host guarantees the vtable callbacks and ctx may be used from
// any thread; the registry only shares the factory, never a reader.
unsafe impl Send for VTableFactory {}
unsafe impl Sync for VTableFactory {}

impl ReaderFactory for VTableFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self, params: &ParamMap) -> XscanResult<Box<dyn HostedReader>> {
        let to_c = |s: &str| {
            CString::new(s).map_err(|_| XscanError::Config(format!("parameter '{s}' contains NUL")))
        };
        let mut keys = Vec::with_capacity(params.len());
        let mut values = Vec::with_capacity(params.len());
        for (key, value) in params.iter() {
            keys.push(to_c(key)?);
            values.push(to_c(value)?);
        }
        let key_ptrs: Vec<*const c_char> = keys.iter().map(|k| k.as_ptr()).collect();
        let value_ptrs: Vec<*const c_char> = values.iter().map(|v| v.as_ptr()).collect();

        let mut reader: *mut c_void = ptr::null_mut();
        let code = unsafe {
            (self.vtable.create)(
                self.vtable.ctx,
                key_ptrs.as_ptr(),
                value_ptrs.as_ptr(),
                key_ptrs.len(),
                &mut reader,
            )
        };
        if code != XSCAN_OK {
            let err = unsafe { self.vtable.host_error("create") };
            if !reader.is_null() {
                // 실패했더라도 호스트가 만든 객체는 해제
                tracing::warn!(
                    format = %self.name,
                    "host create failed after producing a reader; releasing it"
                );
                unsafe { (self.vtable.release)(reader) };
            }
            return Err(err);
        }
        if reader.is_null() {
            return Err(XscanError::remote("create", "host returned a null reader"));
        }
        Ok(Box::new(VTableReader {
            vtable: self.vtable,
            reader,
        }))
    }
}

/// One hosted reader object reached through the vtable.
struct VTableReader {
    vtable: XscanReaderVTable,
    reader: *mut c_void,
}

// SAFETY: a hosted reader is driven by one thread at a time; the host allows
// that thread to differ from the creating one.
unsafe impl Send for VTableReader {}

impl VTableReader {
    fn check(&self, op: &str, code: c_int) -> XscanResult<()> {
        if code == XSCAN_OK {
            Ok(())
        } else {
            Err(unsafe { self.vtable.host_error(op) })
        }
    }
}

impl HostedReader for VTableReader {
    fn init(&mut self, predicates: &PredicateRanges) -> XscanResult<()> {
        let json = CString::new(predicate::to_json(predicates)?)
            .map_err(|_| XscanError::Config("predicate JSON contains NUL".to_string()))?;
        let code = unsafe { (self.vtable.init)(self.reader, json.as_ptr()) };
        self.check("init", code)
    }

    fn open(&mut self, state: &RuntimeState) -> XscanResult<()> {
        let time_zone = CString::new(state.time_zone.as_str())
            .map_err(|_| XscanError::Config("time zone contains NUL".to_string()))?;
        let code = unsafe { (self.vtable.open)(self.reader, state.batch_size, time_zone.as_ptr()) };
        self.check("open", code)
    }

    fn next_block(&mut self, block: &mut Block) -> XscanResult<BlockRead> {
        let mut array = FFI_ArrowArray::empty();
        let mut schema = FFI_ArrowSchema::empty();
        let mut rows = 0usize;
        let mut eos = false;
        let code = unsafe {
            (self.vtable.next_block)(self.reader, &mut array, &mut schema, &mut rows, &mut eos)
        };
        self.check("next_block", code)?;

        if !array.is_released() {
            let data = unsafe { from_ffi(array, &schema)? };
            block.push_batch(RecordBatch::from(StructArray::from(data)))?;
        }
        Ok(BlockRead { rows, eos })
    }

    fn close(&mut self) -> XscanResult<()> {
        let code = unsafe { (self.vtable.close)(self.reader) };
        self.check("close", code)
    }
}

impl Drop for VTableReader {
    fn drop(&mut self) {
        unsafe { (self.vtable.release)(self.reader) };
    }
}

// ═══════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════

/// Opaque handle to a reader registry
pub struct XscanRegistry {
    inner: Arc<ReaderRegistry>,
}

/// Create an empty reader registry
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xscan_registry_new() -> *mut XscanRegistry {
    Box::into_raw(Box::new(XscanRegistry {
        inner: Arc::new(ReaderRegistry::new()),
    }))
}

/// Register a hosted reader implementation for `format`
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xscan_registry_register(
    registry: *mut XscanRegistry,
    format: *const c_char,
    vtable: *const XscanReaderVTable,
) -> c_int {
    if registry.is_null() || vtable.is_null() {
        return XSCAN_ERR_NULL_PTR;
    }
    let registry = &*registry;
    let vtable = *vtable;
    guarded("xscan_registry_register", || {
        let format = c_str(format, "format")?;
        registry.inner.register(
            format,
            Arc::new(VTableFactory {
                name: format!("{format}-vtable"),
                vtable,
            }),
        )?;
        Ok(())
    })
}

/// Free a registry. Scanners created from it stay valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xscan_registry_free(registry: *mut XscanRegistry) {
    if !registry.is_null() {
        let _ = Box::from_raw(registry);
    }
}

// ═══════════════════════════════════════════════════════════════
// Scanner
// ═══════════════════════════════════════════════════════════════

/// JSON body of `xscan_scanner_new`.
#[derive(Debug, Deserialize)]
struct ScanRequest {
    #[serde(default)]
    query_id: String,
    #[serde(default)]
    params: FileScanRangeParams,
    desc: TableFileDesc,
    /// Falls back to `ScannerOptions::from_env`
    #[serde(default)]
    options: Option<ScannerOptions>,
}

/// Opaque handle to one scanner (one scan range)
pub struct XscanScanner {
    scanner: BridgeScanner,
}

/// Create a scanner for one scan range.
///
/// `request_json` carries the scan range (see `ScanRequest`); `slots` is an
/// Arrow C schema of struct type listing the output columns in order.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xscan_scanner_new(
    registry: *mut XscanRegistry,
    request_json: *const c_char,
    slots: *const FFI_ArrowSchema,
    out_scanner: *mut *mut XscanScanner,
) -> c_int {
    if registry.is_null() || slots.is_null() || out_scanner.is_null() {
        return XSCAN_ERR_NULL_PTR;
    }
    let registry = &*registry;
    let slots = &*slots;
    guarded("xscan_scanner_new", || {
        let request: ScanRequest = serde_json::from_str(c_str(request_json, "request")?)?;
        let options = match request.options {
            Some(options) => {
                options.validate()?;
                options
            }
            None => ScannerOptions::from_env()?,
        };
        let schema = Schema::try_from(slots)?;
        let slots: Vec<SlotDescriptor> = schema
            .fields()
            .iter()
            .map(|f| SlotDescriptor {
                col_name: f.name().clone(),
                data_type: f.data_type().clone(),
                nullable: f.is_nullable(),
            })
            .collect();

        let scanner = BridgeScanner::new(
            &request.params,
            &request.desc,
            slots,
            Arc::new(options.runtime_state(request.query_id)),
            Arc::new(ScanProfile::new()),
            registry.inner.as_ref(),
        )?;
        *out_scanner = Box::into_raw(Box::new(XscanScanner { scanner }));
        Ok(())
    })
}

/// Install predicate ranges (JSON, may be null for none) and open the reader
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xscan_scanner_init(
    scanner: *mut XscanScanner,
    predicates_json: *const c_char,
) -> c_int {
    if scanner.is_null() {
        return XSCAN_ERR_NULL_PTR;
    }
    let scanner = &mut *scanner;
    guarded("xscan_scanner_init", || {
        let predicates = if predicates_json.is_null() {
            PredicateRanges::new()
        } else {
            predicate::from_json(c_str(predicates_json, "predicates")?)?
        };
        scanner.scanner.init_reader(Arc::new(predicates))?;
        Ok(())
    })
}

/// Pull the next block.
///
/// On success `out_array`/`out_schema` receive a struct array (empty when no
/// rows were produced) that the caller must release.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xscan_scanner_next(
    scanner: *mut XscanScanner,
    out_array: *mut FFI_ArrowArray,
    out_schema: *mut FFI_ArrowSchema,
    out_rows: *mut usize,
    out_eof: *mut bool,
) -> c_int {
    if scanner.is_null()
        || out_array.is_null()
        || out_schema.is_null()
        || out_rows.is_null()
        || out_eof.is_null()
    {
        return XSCAN_ERR_NULL_PTR;
    }
    let scanner = &mut *scanner;
    guarded("xscan_scanner_next", || {
        let mut block = scanner.scanner.new_block();
        let read = scanner.scanner.get_next_block(&mut block)?;

        let (array, schema) = if block.is_empty() {
            (FFI_ArrowArray::empty(), FFI_ArrowSchema::empty())
        } else {
            let data = StructArray::from(block.to_record_batch()?).into_data();
            to_ffi(&data)?
        };
        ptr::write(out_array, array);
        ptr::write(out_schema, schema);
        *out_rows = read.rows;
        *out_eof = read.eos;
        Ok(())
    })
}

/// Close the hosted reader early. Idempotent.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xscan_scanner_close(scanner: *mut XscanScanner) -> c_int {
    if scanner.is_null() {
        return XSCAN_ERR_NULL_PTR;
    }
    let scanner = &mut *scanner;
    guarded("xscan_scanner_close", || Ok(scanner.scanner.close()?))
}

/// Free a scanner, closing the hosted reader if still open
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xscan_scanner_free(scanner: *mut XscanScanner) {
    if !scanner.is_null() {
        let _ = Box::from_raw(scanner);
    }
}

/// Last error message on this thread (valid until the next failing call)
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xscan_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| match slot.borrow().as_ref() {
        Some(message) => message.as_ptr(),
        None => c"No error".as_ptr(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int32Array;
    use arrow::datatypes::{DataType, Field};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct HostCtx {
        batches: usize,
        fail_open: bool,
        fail_create: bool,
        fail_close: bool,
        closes: AtomicUsize,
        releases: AtomicUsize,
        error: CString,
    }

    struct MockReader {
        ctx: *const HostCtx,
        remaining: usize,
        params: Vec<(String, String)>,
    }

    fn host_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![Field::new("id", DataType::Int32, true)]))
    }

    unsafe extern "C" fn mock_create(
        ctx: *mut c_void,
        keys: *const *const c_char,
        values: *const *const c_char,
        len: usize,
        out_reader: *mut *mut c_void,
    ) -> c_int {
        let ctx = ctx as *const HostCtx;
        let mut params = Vec::with_capacity(len);
        for i in 0..len {
            let key = CStr::from_ptr(*keys.add(i)).to_string_lossy().into_owned();
            let value = CStr::from_ptr(*values.add(i)).to_string_lossy().into_owned();
            params.push((key, value));
        }
        let reader = Box::new(MockReader {
            ctx,
            remaining: (*ctx).batches,
            params,
        });
        *out_reader = Box::into_raw(reader) as *mut c_void;
        if (*ctx).fail_create { -1 } else { 0 }
    }

    unsafe extern "C" fn mock_init(_reader: *mut c_void, predicates: *const c_char) -> c_int {
        if predicates.is_null() { -1 } else { 0 }
    }

    unsafe extern "C" fn mock_open(
        reader: *mut c_void,
        _batch_size: usize,
        _time_zone: *const c_char,
    ) -> c_int {
        let reader = &*(reader as *const MockReader);
        if (*reader.ctx).fail_open { -1 } else { 0 }
    }

    unsafe extern "C" fn mock_next_block(
        reader: *mut c_void,
        out_array: *mut FFI_ArrowArray,
        out_schema: *mut FFI_ArrowSchema,
        out_rows: *mut usize,
        out_eos: *mut bool,
    ) -> c_int {
        let reader = &mut *(reader as *mut MockReader);
        if reader.remaining == 0 {
            *out_rows = 0;
            *out_eos = true;
            return 0;
        }
        reader.remaining -= 1;
        let batch =
            RecordBatch::try_new(host_schema(), vec![Arc::new(Int32Array::from(vec![1, 2]))])
                .unwrap();
        let (array, schema) = to_ffi(&StructArray::from(batch).into_data()).unwrap();
        ptr::write(out_array, array);
        ptr::write(out_schema, schema);
        *out_rows = 2;
        *out_eos = false;
        0
    }

    unsafe extern "C" fn mock_close(reader: *mut c_void) -> c_int {
        let reader = &*(reader as *const MockReader);
        (*reader.ctx).closes.fetch_add(1, Ordering::SeqCst);
        if (*reader.ctx).fail_close { -1 } else { 0 }
    }

    unsafe extern "C" fn mock_release(reader: *mut c_void) {
        let reader = Box::from_raw(reader as *mut MockReader);
        (*reader.ctx).releases.fetch_add(1, Ordering::SeqCst);
        assert!(reader.params.iter().any(|(k, _)| k == "required_fields"));
    }

    unsafe extern "C" fn mock_last_error(ctx: *mut c_void) -> *const c_char {
        (*(ctx as *const HostCtx)).error.as_ptr()
    }

    fn host(batches: usize, fail_open: bool) -> Box<HostCtx> {
        Box::new(HostCtx {
            batches,
            fail_open,
            fail_create: false,
            fail_close: false,
            closes: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            error: CString::new("java.io.IOException: disk gone").unwrap(),
        })
    }

    fn vtable(ctx: &HostCtx) -> XscanReaderVTable {
        XscanReaderVTable {
            ctx: ctx as *const HostCtx as *mut c_void,
            create: mock_create,
            init: mock_init,
            open: mock_open,
            next_block: mock_next_block,
            close: mock_close,
            release: mock_release,
            last_error: mock_last_error,
        }
    }

    const REQUEST: &str = r#"{
        "query_id": "q-1",
        "params": {"properties": {"fs.defaultFS": "hdfs://nn:8020"}},
        "desc": {
            "format": "hudi",
            "base_path": "/t",
            "data_file_path": "/t/f.parquet",
            "data_file_length": 10,
            "column_names": ["id"],
            "column_types": ["int"]
        },
        "options": {"batch_size": 2}
    }"#;

    unsafe fn new_scanner(registry: *mut XscanRegistry) -> (c_int, *mut XscanScanner) {
        let slots = FFI_ArrowSchema::try_from(host_schema().as_ref()).unwrap();
        let request = CString::new(REQUEST).unwrap();
        let mut scanner: *mut XscanScanner = ptr::null_mut();
        let code = xscan_scanner_new(registry, request.as_ptr(), &slots, &mut scanner);
        (code, scanner)
    }

    #[test]
    fn scan_through_c_abi() {
        unsafe {
            let ctx = host(3, false);
            let registry = xscan_registry_new();
            let format = CString::new("hudi").unwrap();
            assert_eq!(
                xscan_registry_register(registry, format.as_ptr(), &vtable(&ctx)),
                XSCAN_OK
            );

            let (code, scanner) = new_scanner(registry);
            assert_eq!(code, XSCAN_OK);
            assert_eq!(xscan_scanner_init(scanner, ptr::null()), XSCAN_OK);

            let mut total = 0usize;
            loop {
                let mut array = FFI_ArrowArray::empty();
                let mut schema = FFI_ArrowSchema::empty();
                let mut rows = 0usize;
                let mut eof = false;
                let code =
                    xscan_scanner_next(scanner, &mut array, &mut schema, &mut rows, &mut eof);
                assert_eq!(code, XSCAN_OK);
                if !array.is_released() {
                    let data = from_ffi(array, &schema).unwrap();
                    assert_eq!(data.len(), rows);
                }
                total += rows;
                if eof {
                    break;
                }
            }
            assert_eq!(total, 6);
            assert_eq!(ctx.closes.load(Ordering::SeqCst), 1);

            xscan_scanner_free(scanner);
            xscan_registry_free(registry);
            assert_eq!(ctx.closes.load(Ordering::SeqCst), 1);
            assert_eq!(ctx.releases.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn open_failure_reports_host_message_and_releases() {
        unsafe {
            let ctx = host(1, true);
            let registry = xscan_registry_new();
            let format = CString::new("hudi").unwrap();
            xscan_registry_register(registry, format.as_ptr(), &vtable(&ctx));

            let (code, scanner) = new_scanner(registry);
            assert_eq!(code, XSCAN_OK);
            assert_eq!(xscan_scanner_init(scanner, ptr::null()), XSCAN_ERR_REMOTE);
            let message = CStr::from_ptr(xscan_last_error()).to_string_lossy();
            assert!(message.contains("disk gone"));
            assert_eq!(ctx.closes.load(Ordering::SeqCst), 1);

            assert_eq!(xscan_scanner_close(scanner), XSCAN_OK);
            xscan_scanner_free(scanner);
            xscan_registry_free(registry);
            assert_eq!(ctx.closes.load(Ordering::SeqCst), 1);
            assert_eq!(ctx.releases.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn unknown_format_is_bridge_init() {
        unsafe {
            let registry = xscan_registry_new();
            let (code, scanner) = new_scanner(registry);
            assert_eq!(code, XSCAN_ERR_BRIDGE_INIT);
            assert!(scanner.is_null());
            xscan_registry_free(registry);
        }
    }

    #[test]
    fn null_pointers_are_rejected() {
        unsafe {
            assert_eq!(xscan_scanner_init(ptr::null_mut(), ptr::null()), XSCAN_ERR_NULL_PTR);
            assert_eq!(xscan_scanner_close(ptr::null_mut()), XSCAN_ERR_NULL_PTR);
            xscan_scanner_free(ptr::null_mut());
        }
    }

    #[test]
    fn error_codes_follow_taxonomy() {
        assert_eq!(
            error_code(&XscanError::invalid_state("open", "closed")),
            XSCAN_ERR_INVALID_STATE
        );
        assert_eq!(
            error_code(&XscanError::Cleanup {
                source: Box::new(XscanError::remote("close", "x")),
            }),
            XSCAN_ERR_CLEANUP
        );
    }

    unsafe fn register_host(ctx: &HostCtx) -> *mut XscanRegistry {
        let registry = xscan_registry_new();
        let format = CString::new("hudi").unwrap();
        assert_eq!(
            xscan_registry_register(registry, format.as_ptr(), &vtable(ctx)),
            XSCAN_OK
        );
        registry
    }

    #[test]
    fn close_failure_after_last_block_is_cleanup_error() {
        unsafe {
            let mut ctx = host(1, false);
            ctx.fail_close = true;
            let registry = register_host(&ctx);
            let (_, scanner) = new_scanner(registry);
            assert_eq!(xscan_scanner_init(scanner, ptr::null()), XSCAN_OK);

            let mut codes = Vec::new();
            for _ in 0..2 {
                let mut array = FFI_ArrowArray::empty();
                let mut schema = FFI_ArrowSchema::empty();
                let mut rows = 0usize;
                let mut eof = false;
                codes.push(xscan_scanner_next(
                    scanner,
                    &mut array,
                    &mut schema,
                    &mut rows,
                    &mut eof,
                ));
            }
            assert_eq!(codes, vec![XSCAN_OK, XSCAN_ERR_CLEANUP]);
            let message = CStr::from_ptr(xscan_last_error()).to_string_lossy();
            assert!(message.contains("cleanup failed"));
            assert!(message.contains("disk gone"));

            // close는 다시 호출되지 않음
            assert_eq!(xscan_scanner_close(scanner), XSCAN_OK);
            xscan_scanner_free(scanner);
            xscan_registry_free(registry);
            assert_eq!(ctx.closes.load(Ordering::SeqCst), 1);
            assert_eq!(ctx.releases.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn failed_create_still_releases_host_object() {
        unsafe {
            let mut ctx = host(1, false);
            ctx.fail_create = true;
            let registry = register_host(&ctx);

            let (code, scanner) = new_scanner(registry);
            assert_eq!(code, XSCAN_ERR_BRIDGE_INIT);
            assert!(scanner.is_null());
            assert_eq!(ctx.releases.load(Ordering::SeqCst), 1);
            assert_eq!(ctx.closes.load(Ordering::SeqCst), 0);
            xscan_registry_free(registry);
        }
    }

    #[test]
    fn bad_strings_map_to_their_own_codes() {
        unsafe {
            let ctx = host(0, false);
            let registry = xscan_registry_new();
            let invalid = CString::new(vec![0xffu8, 0xfe, b'x']).unwrap();

            assert_eq!(
                xscan_registry_register(registry, ptr::null(), &vtable(&ctx)),
                XSCAN_ERR_NULL_PTR
            );
            assert_eq!(
                xscan_registry_register(registry, invalid.as_ptr(), &vtable(&ctx)),
                XSCAN_ERR_INVALID_UTF8
            );
            let message = CStr::from_ptr(xscan_last_error()).to_string_lossy();
            assert!(message.contains("format is not valid UTF-8"));

            let format = CString::new("hudi").unwrap();
            xscan_registry_register(registry, format.as_ptr(), &vtable(&ctx));
            let (_, scanner) = new_scanner(registry);
            assert_eq!(xscan_scanner_init(scanner, invalid.as_ptr()), XSCAN_ERR_INVALID_UTF8);

            let slots = FFI_ArrowSchema::try_from(host_schema().as_ref()).unwrap();
            let mut other: *mut XscanScanner = ptr::null_mut();
            assert_eq!(
                xscan_scanner_new(registry, ptr::null(), &slots, &mut other),
                XSCAN_ERR_NULL_PTR
            );
            assert!(other.is_null());

            xscan_scanner_free(scanner);
            xscan_registry_free(registry);
        }
    }
}
