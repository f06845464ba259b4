//! Reader registry — format identifier → hosted reader factory
//!
//! 구현 클래스를 하드코딩하지 않고 포맷 이름으로 팩토리를 조회합니다.

use super::{ReaderFactory, ReaderLoader};
use crate::error::{XscanError, XscanResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// 포맷별 리더 팩토리 레지스트리
pub struct ReaderRegistry {
    factories: RwLock<HashMap<String, Arc<dyn ReaderFactory>>>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// 팩토리 등록
    pub fn register(&self, format: &str, factory: Arc<dyn ReaderFactory>) -> XscanResult<()> {
        let mut factories = self.factories.write();

        if factories.contains_key(format) {
            return Err(XscanError::DuplicateReader(format.to_string()));
        }

        tracing::debug!(format, implementation = factory.name(), "reader registered");
        factories.insert(format.to_string(), factory);
        Ok(())
    }

    /// 팩토리 등록 해제
    pub fn unregister(&self, format: &str) -> XscanResult<()> {
        self.factories
            .write()
            .remove(format)
            .ok_or_else(|| XscanError::ReaderNotFound(format.to_string()))?;
        Ok(())
    }

    /// 등록된 포맷 목록 (정렬됨)
    pub fn formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.factories.read().keys().cloned().collect();
        formats.sort();
        formats
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderLoader for ReaderRegistry {
    fn resolve(&self, format: &str) -> XscanResult<Arc<dyn ReaderFactory>> {
        self.factories
            .read()
            .get(format)
            .cloned()
            .ok_or_else(|| XscanError::ReaderNotFound(format.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockRead};
    use crate::bridge::HostedReader;
    use crate::options::RuntimeState;
    use crate::params::ParamMap;
    use crate::predicate::PredicateRanges;

    struct NoopReader;

    impl HostedReader for NoopReader {
        fn init(&mut self, _: &PredicateRanges) -> XscanResult<()> {
            Ok(())
        }
        fn open(&mut self, _: &RuntimeState) -> XscanResult<()> {
            Ok(())
        }
        fn next_block(&mut self, _: &mut Block) -> XscanResult<BlockRead> {
            Ok(BlockRead::eos(0))
        }
        fn close(&mut self) -> XscanResult<()> {
            Ok(())
        }
    }

    struct NoopFactory(&'static str);

    impl ReaderFactory for NoopFactory {
        fn name(&self) -> &str {
            self.0
        }
        fn create(&self, _: &ParamMap) -> XscanResult<Box<dyn HostedReader>> {
            Ok(Box::new(NoopReader))
        }
    }

    #[test]
    fn register_and_resolve() {
        let registry = ReaderRegistry::new();
        registry
            .register("hudi", Arc::new(NoopFactory("HudiJniScanner")))
            .unwrap();

        let factory = registry.resolve("hudi").unwrap();
        assert_eq!(factory.name(), "HudiJniScanner");
        assert_eq!(registry.formats(), vec!["hudi".to_string()]);
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = ReaderRegistry::new();
        registry.register("hudi", Arc::new(NoopFactory("a"))).unwrap();
        let err = registry
            .register("hudi", Arc::new(NoopFactory("b")))
            .unwrap_err();
        assert!(matches!(err, XscanError::DuplicateReader(f) if f == "hudi"));
    }

    #[test]
    fn resolve_unknown_format() {
        let registry = ReaderRegistry::default();
        assert!(matches!(
            registry.resolve("paimon"),
            Err(XscanError::ReaderNotFound(_))
        ));
    }

    #[test]
    fn unregister_removes_factory() {
        let registry = ReaderRegistry::new();
        registry.register("hudi", Arc::new(NoopFactory("a"))).unwrap();
        registry.unregister("hudi").unwrap();
        assert!(registry.formats().is_empty());
        assert!(registry.unregister("hudi").is_err());
    }
}
