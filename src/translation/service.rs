// Async facade over the blocking translation engine

use super::orchestrator::TranslationOrchestrator;
use super::types::{CandidateSet, RankOptions, TranslationRequest, TranslationResponse};
use crate::error::{Result, TranslateError};
use async_trait::async_trait;
use std::sync::Arc;

/// Translation as seen by request handlers
#[async_trait]
pub trait TranslationService: Send + Sync {
    async fn translate(&self, request: TranslationRequest) -> Result<TranslationResponse>;

    async fn rank(
        &self,
        request: TranslationRequest,
        options: RankOptions,
    ) -> Result<Vec<CandidateSet>>;
}

/// Runs each call on tokio's blocking pool so requests can overlap
#[derive(Debug, Clone)]
pub struct BlockingTranslationService {
    engine: Arc<TranslationOrchestrator>,
}

impl BlockingTranslationService {
    pub fn new(engine: Arc<TranslationOrchestrator>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<TranslationOrchestrator> {
        &self.engine
    }

    async fn run<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&TranslationOrchestrator) -> Result<T> + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || job(&engine))
            .await
            .map_err(|e| TranslateError::Worker(e.to_string()))?
    }
}

#[async_trait]
impl TranslationService for BlockingTranslationService {
    async fn translate(&self, request: TranslationRequest) -> Result<TranslationResponse> {
        self.run(move |engine| engine.translate_request(&request)).await
    }

    async fn rank(
        &self,
        request: TranslationRequest,
        options: RankOptions,
    ) -> Result<Vec<CandidateSet>> {
        self.run(move |engine| {
            engine.rank_candidates(&request.texts, &request.source_language, &options)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::device::DeviceHandle;
    use crate::translation::testing::StubModels;

    fn service(stubs: &StubModels) -> BlockingTranslationService {
        let engine =
            TranslationOrchestrator::from_slots(DeviceHandle::cpu(), stubs.slots(false, true));
        BlockingTranslationService::new(Arc::new(engine))
    }

    #[tokio::test]
    async fn test_translate_request() {
        let stubs = StubModels::new();
        let service = service(&stubs);
        let response = service
            .translate(TranslationRequest::new(vec!["Hello".into(), "".into()], "en"))
            .await
            .unwrap();
        assert_eq!(response.original, vec!["Hello"]);
        assert_eq!(response.translations, vec!["[en-fr] Hello"]);
    }

    #[tokio::test]
    async fn test_concurrent_requests() {
        let stubs = StubModels::new();
        let service = service(&stubs);
        let (en, ta) = tokio::join!(
            service.translate(TranslationRequest::single("Hello", "en")),
            service.translate(TranslationRequest::single("vanakkam", "ta")),
        );
        assert_eq!(en.unwrap().translations, vec!["[en-fr] Hello"]);
        assert_eq!(ta.unwrap().translations, vec!["[en-fr] [ta-en] vanakkam"]);
        assert_eq!(stubs.forward.calls(), 2);
    }

    #[tokio::test]
    async fn test_rank_request() {
        let stubs = StubModels::new();
        let service = service(&stubs);
        let sets = service
            .rank(
                TranslationRequest::single("Bonjour", "fr"),
                RankOptions::default().with_candidates(2, 3),
            )
            .await
            .unwrap();
        assert_eq!(sets[0].candidates, vec!["[fr-en#0] Bonjour", "[fr-en#1] Bonjour"]);
    }

    #[tokio::test]
    async fn test_invalid_rank_options() {
        let stubs = StubModels::new();
        let err = service(&stubs)
            .rank(
                TranslationRequest::single("Hello", "en"),
                RankOptions::default().with_candidates(0, 5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::InvalidOptions(_)));
    }
}
