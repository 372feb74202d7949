//! Stub engine — degraded mode with synthetic responses.
//!
//! Platforms without a native generation capability still get the full
//! orchestrator contract: identical call signatures, deterministic canned
//! responses instead of real inference. The orchestrator also substitutes
//! a canned response when a stub-mode call fails for any reason, so stub
//! mode never surfaces engine failures to the caller.

use async_trait::async_trait;
use hearth_core::{
    EngineError, GenerationOptions, Message, ModelHandle, NativeEngine, NativeOutput,
    NativeSession, SessionParams,
};
use tracing::info;

/// Canned responses, cycled in order.
const CANNED_RESPONSES: &[&str] = &[
    "I'm running in offline stub mode right now, so this is a canned reply rather than real inference.",
    "No on-device model is available, but the conversation pipeline is working end to end.",
    "Stub mode here: your message made it through context assembly and admission control just fine.",
];

/// Pick the canned response for the given call index.
pub fn canned_response(index: usize) -> &'static str {
    CANNED_RESPONSES[index % CANNED_RESPONSES.len()]
}

/// A `NativeEngine` that always succeeds and hands out stub sessions.
#[derive(Debug, Default)]
pub struct StubEngine;

impl StubEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NativeEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    async fn acquire(
        &self,
        handle: &ModelHandle,
        _params: &SessionParams,
    ) -> Result<Box<dyn NativeSession>, EngineError> {
        info!(model = %handle.name, "Acquired stub session");
        Ok(Box::new(StubSession::default()))
    }
}

/// A session producing rotating canned responses.
#[derive(Debug, Default)]
pub struct StubSession {
    calls: usize,
    released: bool,
}

#[async_trait]
impl NativeSession for StubSession {
    async fn complete(
        &mut self,
        _messages: &[Message],
        _options: &GenerationOptions,
    ) -> Result<NativeOutput, EngineError> {
        if self.released {
            return Err(EngineError::Released);
        }
        let response = canned_response(self.calls);
        self.calls += 1;
        Ok(NativeOutput::Text(response.to_string()))
    }

    async fn release(&mut self) -> Result<(), EngineError> {
        self.released = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn responses_rotate_deterministically() {
        let engine = StubEngine::new();
        let handle = ModelHandle::new("/nonexistent", "none");
        let mut session = engine
            .acquire(&handle, &SessionParams::default())
            .await
            .unwrap();

        let opts = GenerationOptions::default();
        let first = session.complete(&[], &opts).await.unwrap().into_text().unwrap();
        let second = session.complete(&[], &opts).await.unwrap().into_text().unwrap();
        assert_eq!(first, CANNED_RESPONSES[0]);
        assert_eq!(second, CANNED_RESPONSES[1]);
    }

    #[tokio::test]
    async fn released_session_rejects_calls() {
        let mut session = StubSession::default();
        session.release().await.unwrap();
        let err = session
            .complete(&[], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Released));
    }

    #[test]
    fn canned_response_wraps_around() {
        assert_eq!(canned_response(0), canned_response(CANNED_RESPONSES.len()));
    }
}
