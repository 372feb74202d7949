//! Conversation surface gluing the window, power monitor, orchestrator
//! and store together.
//!
//! One `ChatSession` per conversation. Every turn goes through the same
//! pipeline: embed, append, honor the power-recommended delay, degrade
//! the token budget when inference is throttled, assemble context with
//! retrieval, generate, persist the reply. Window bounding keeps
//! assembled context small by construction, so no token-limit refusal
//! happens here.

use hearth_context::{generate_embedding, ContextWindow};
use hearth_core::{ConversationStore, Error, GenerationOptions, Message};
use hearth_power::PowerMonitor;
use std::sync::Arc;
use tracing::{debug, info};

use crate::orchestrator::Orchestrator;

pub struct ChatSession {
    window: ContextWindow,
    monitor: PowerMonitor,
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn ConversationStore>,
    options: GenerationOptions,
}

impl ChatSession {
    pub fn new(
        monitor: PowerMonitor,
        orchestrator: Arc<Orchestrator>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            window: ContextWindow::new(),
            monitor,
            orchestrator,
            store,
            options: GenerationOptions::default(),
        }
    }

    /// Override the per-session generation options.
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// The live window, for inspection.
    pub fn window(&self) -> &ContextWindow {
        &self.window
    }

    /// Send one user turn and return the assistant reply.
    pub async fn send(&mut self, text: &str) -> Result<String, Error> {
        let embedding = generate_embedding(text);
        let user = Message::user(text).with_embedding(embedding.clone());
        self.window.add_message(user.clone());
        self.store.append(user).await?;

        let delay = self.monitor.recommended_delay();
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "Delaying turn for battery");
            tokio::time::sleep(delay).await;
        }

        let mut options = self.options.clone();
        if self.monitor.should_throttle_inference() {
            // Throttled turns still run, at half the token budget.
            options.max_tokens = (options.max_tokens / 2).max(1);
            info!(max_tokens = options.max_tokens, "Throttling generation for battery");
        }

        let context = self.window.build_context(Some(&embedding))?;
        let reply = self.orchestrator.generate(context, &options).await?;

        let assistant =
            Message::assistant(&reply).with_embedding(generate_embedding(&reply));
        self.window.add_message(assistant.clone());
        self.store.append(assistant).await?;
        Ok(reply)
    }

    /// Replay persisted history into the window, oldest first. Messages
    /// stored without an embedding get one recomputed so retrieval keeps
    /// working across restarts.
    pub async fn hydrate(&mut self) -> Result<(), Error> {
        let history = self.store.load().await?;
        debug!(messages = history.len(), "Hydrating session from store");
        for mut message in history {
            if message.embedding.is_none() {
                let embedding = generate_embedding(&message.content);
                message = message.with_embedding(embedding);
            }
            self.window.add_message(message);
        }
        Ok(())
    }

    /// Drop the in-memory window. The store is left untouched; clearing
    /// persisted history is the caller's decision.
    pub fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;
    use async_trait::async_trait;
    use hearth_core::{
        EngineError, InMemoryStore, ModelHandle, NativeEngine, NativeOutput, NativeSession,
        PowerState, SessionParams,
    };
    use std::sync::Mutex as StdMutex;

    async fn stub_session(store: Arc<InMemoryStore>) -> ChatSession {
        let orchestrator = Arc::new(Orchestrator::stub(OrchestratorConfig::default()));
        orchestrator
            .initialize(ModelHandle::new("/none", "stub"))
            .await
            .unwrap();
        ChatSession::new(PowerMonitor::new(), orchestrator, store)
    }

    #[tokio::test]
    async fn send_appends_both_turns_to_window_and_store() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = stub_session(Arc::clone(&store)).await;

        let reply = session.send("hello there").await.unwrap();
        assert!(!reply.is_empty());

        assert_eq!(session.window().active_len(), 2);
        let history = store.load().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hello there");
        assert_eq!(history[1].content, reply);
        // Both turns carry embeddings for later retrieval.
        assert!(history.iter().all(|m| m.embedding.is_some()));
    }

    #[tokio::test]
    async fn hydrate_replays_history_through_window_bounds() {
        let store = Arc::new(InMemoryStore::new());
        for i in 0..15 {
            store
                .append(Message::user(format!("turn {i}")))
                .await
                .unwrap();
        }

        let mut session = stub_session(Arc::clone(&store)).await;
        session.hydrate().await.unwrap();

        // Window bounding applies during replay: 10 active, 5 archived.
        assert_eq!(session.window().active_len(), 10);
        assert_eq!(session.window().archived_len(), 5);
        // Recomputed embeddings on replayed messages.
        assert!(session.window().active().iter().all(|m| m.embedding.is_some()));
    }

    #[tokio::test]
    async fn reset_clears_window_but_not_store() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = stub_session(Arc::clone(&store)).await;
        session.send("one").await.unwrap();

        session.reset();
        assert!(session.window().is_empty());
        assert_eq!(store.load().await.unwrap().len(), 2);
    }

    struct RecordingEngine {
        seen: Arc<StdMutex<Vec<GenerationOptions>>>,
    }

    struct RecordingSession {
        seen: Arc<StdMutex<Vec<GenerationOptions>>>,
    }

    #[async_trait]
    impl NativeEngine for RecordingEngine {
        fn name(&self) -> &str {
            "recording"
        }

        async fn acquire(
            &self,
            _handle: &ModelHandle,
            _params: &SessionParams,
        ) -> Result<Box<dyn NativeSession>, EngineError> {
            Ok(Box::new(RecordingSession {
                seen: Arc::clone(&self.seen),
            }))
        }
    }

    #[async_trait]
    impl NativeSession for RecordingSession {
        async fn complete(
            &mut self,
            _messages: &[Message],
            options: &GenerationOptions,
        ) -> Result<NativeOutput, EngineError> {
            self.seen.lock().unwrap().push(options.clone());
            Ok(NativeOutput::Text("recorded".into()))
        }

        async fn release(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn throttled_turn_runs_with_reduced_budget() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let engine = RecordingEngine {
            seen: Arc::clone(&seen),
        };
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(engine),
            OrchestratorConfig::default(),
        ));
        orchestrator
            .initialize(ModelHandle::new("/models/tiny.gguf", "tiny"))
            .await
            .unwrap();

        let store = Arc::new(InMemoryStore::new());
        let mut session = ChatSession::new(PowerMonitor::new(), orchestrator, store);
        // Low-power mode at full battery throttles without any delay.
        session.monitor.set_state(PowerState {
            level: 0.90,
            charging: false,
            low_power: true,
        });

        let reply = session.send("how are you").await.unwrap();
        assert_eq!(reply, "recorded");
        let recorded = seen.lock().unwrap()[0].clone();
        assert_eq!(
            recorded.max_tokens,
            GenerationOptions::default().max_tokens / 2
        );
    }

    #[tokio::test]
    async fn unthrottled_turn_keeps_full_budget() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let engine = RecordingEngine {
            seen: Arc::clone(&seen),
        };
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(engine),
            OrchestratorConfig::default(),
        ));
        orchestrator
            .initialize(ModelHandle::new("/models/tiny.gguf", "tiny"))
            .await
            .unwrap();

        let store = Arc::new(InMemoryStore::new());
        let mut session = ChatSession::new(PowerMonitor::new(), orchestrator, store);

        session.send("how are you").await.unwrap();
        let recorded = seen.lock().unwrap()[0].clone();
        assert_eq!(recorded.max_tokens, GenerationOptions::default().max_tokens);
    }

    #[tokio::test(start_paused = true)]
    async fn low_battery_delays_the_turn() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = stub_session(Arc::clone(&store)).await;
        session.monitor.set_state(PowerState {
            level: 0.10,
            charging: false,
            low_power: true,
        });

        let start = tokio::time::Instant::now();
        session.send("still works").await.unwrap();
        assert!(start.elapsed() >= std::time::Duration::from_secs(5));
    }
}
