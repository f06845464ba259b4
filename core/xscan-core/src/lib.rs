//! # xscan — Cross-Runtime Scanner Bridge
//!
//! xscan은 별도 런타임(예: JVM)에 구현된 테이블 포맷 리더를 컬럼형 쿼리 엔진의
//! 네이티브 스캔 소스처럼 사용할 수 있게 해주는 어댑터입니다.
//! 베이스 파일 + 델타 로그 형태의 merge-on-read 포맷을 주 대상으로 합니다.
//!
//! ## 주요 특징
//!
//! - **Typed parameters**: [`params::ScannerConfig`]가 유일한 진실의 원천이며,
//!   경계에서만 평면 문자열 맵으로 직렬화됩니다
//! - **Explicit lifecycle**: [`bridge::BridgeHandle`] 상태 머신, close는 정확히 한 번
//! - **Pluggable readers**: 포맷 이름으로 팩토리를 조회 ([`bridge::ReaderRegistry`])
//! - **Apache Arrow 기반**: 블록은 `RecordBatch` 버퍼
//!
//! ## 빠른 시작
//!
//! ```rust
//! use xscan_core::params::{FileScanRangeParams, ScannerConfig, TableFileDesc};
//!
//! let desc = TableFileDesc {
//!     format: "hudi".to_string(),
//!     base_path: "/t".to_string(),
//!     delta_logs: vec!["/t/.log1".to_string(), "/t/.log2".to_string()],
//!     column_names: vec!["id".to_string(), "name".to_string()],
//!     column_types: vec!["int".to_string(), "string".to_string()],
//!     ..Default::default()
//! };
//! let scan = FileScanRangeParams::default().with_property("fs.s3a.region", "us-east-1");
//!
//! let params = ScannerConfig::new(&desc, vec!["id".to_string()], &scan).to_param_map();
//! assert_eq!(params.get("delta_file_paths"), Some("/t/.log1,/t/.log2"));
//! assert_eq!(params.get("hudi_column_types"), Some("int#string"));
//! assert_eq!(params.get("hadoop_fs.fs.s3a.region"), Some("us-east-1"));
//! ```
//!
//! ## 스캔 파이프라인
//!
//! ```text
//! HostedScanOperator ─(scan range마다)─▶ BridgeScanner::new
//!     → init_reader(predicates)   : init + open
//!     → get_next_block(block)*    : 블록 채우기
//!     → eos 시 자동 close
//! ```
//!
//! ## 모듈 구조
//!
//! - [`params`] — Parameter Assembler
//! - [`bridge`] — 호스팅 리더 트레이트, 레지스트리, Bridge Handle
//! - [`scanner`] — Scanner Adapter ([`BridgeScanner`])
//! - [`operator`] — 스캔 연산자
//! - [`predicate`] — 컬럼 값 범위
//! - [`block`] — 출력 블록

pub mod block;
pub mod bridge;
pub mod error;
pub mod operator;
pub mod options;
pub mod params;
pub mod predicate;
pub mod profile;
pub mod scanner;

// Logging utilities
pub mod logging;

// Re-export commonly used types
pub use block::{Block, BlockRead};
pub use bridge::{BridgeHandle, BridgeState, HostedReader, ReaderFactory, ReaderLoader, ReaderRegistry};
pub use error::{XscanError, XscanResult};
pub use operator::{HostedScanOperator, PhysicalOperator, ScanRange};
pub use options::{RuntimeState, ScannerOptions};
pub use params::{FileScanRangeParams, ParamMap, SlotDescriptor, TableFileDesc};
pub use predicate::{ColumnValueRange, Literal, PredicateRanges};
pub use profile::ScanProfile;
pub use scanner::{BridgeScanner, GenericReader};
