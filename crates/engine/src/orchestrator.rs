//! The inference orchestrator.
//!
//! Owns the single native generation session for one conversation surface.
//! Exactly one generation runs at a time (single-flight), bounded by a hard
//! wall-clock timeout. Initialization failures that mean "this platform
//! cannot run real inference" degrade to the stub engine instead of
//! failing, so the caller-visible contract is uniform whether or not real
//! inference is available.
//!
//! State machine:
//! Uninitialized → Initializing → Ready ⇄ Generating → Ready;
//! Ready → Cleanup → Uninitialized; any initialization failure returns to
//! Uninitialized.

use hearth_core::{
    EngineError, GenerationInput, GenerationOptions, Message, ModelHandle, NativeEngine,
    NativeSession, Role,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::OrchestratorConfig;
use crate::postprocess::{clean_response, truncate_to_budget};
use crate::stub::{canned_response, StubEngine};

/// System preamble injected when the caller supplies none.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant running privately on this device. Keep answers concise.";

/// Orchestrator lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Generating,
    Cleanup,
}

/// The live native session, shared between the generation path and the
/// lifecycle path. The outer slot is only ever held briefly; the inner
/// lock is held across the native call, so the lifecycle path can empty
/// the slot mid-flight and defer the actual release.
type SharedSession = Arc<Mutex<Box<dyn NativeSession>>>;

/// Single-session inference orchestrator.
pub struct Orchestrator {
    engine: Arc<dyn NativeEngine>,
    config: OrchestratorConfig,
    state: StdMutex<EngineState>,
    handle: StdMutex<Option<ModelHandle>>,
    session: StdMutex<Option<SharedSession>>,
    has_session: AtomicBool,
    generating: AtomicBool,
    stub_mode: AtomicBool,
    stub_selected: bool,
    fallback_calls: AtomicUsize,
}

impl Orchestrator {
    /// Create an orchestrator over a real native engine.
    pub fn new(engine: Arc<dyn NativeEngine>, config: OrchestratorConfig) -> Self {
        Self::with_parts(engine, config, false)
    }

    /// Create an orchestrator that targets the stub engine explicitly.
    pub fn stub(config: OrchestratorConfig) -> Self {
        Self::with_parts(Arc::new(StubEngine::new()), config, true)
    }

    fn with_parts(engine: Arc<dyn NativeEngine>, config: OrchestratorConfig, stub: bool) -> Self {
        Self {
            engine,
            config,
            state: StdMutex::new(EngineState::Uninitialized),
            handle: StdMutex::new(None),
            session: StdMutex::new(None),
            has_session: AtomicBool::new(false),
            generating: AtomicBool::new(false),
            stub_mode: AtomicBool::new(false),
            stub_selected: stub,
            fallback_calls: AtomicUsize::new(0),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        *self.state.lock().expect("state lock poisoned")
    }

    fn set_state(&self, state: EngineState) {
        *self.state.lock().expect("state lock poisoned") = state;
    }

    /// Whether the orchestrator can serve `generate` calls.
    pub fn is_loaded(&self) -> bool {
        matches!(self.state(), EngineState::Ready | EngineState::Generating)
            && (self.stub_mode.load(Ordering::SeqCst) || self.has_session.load(Ordering::SeqCst))
    }

    /// Whether a generation is in flight right now.
    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }

    /// Whether the orchestrator degraded to synthetic responses.
    pub fn is_stub_mode(&self) -> bool {
        self.stub_mode.load(Ordering::SeqCst)
    }

    /// Initialize (or re-initialize) the native session for a model.
    ///
    /// A no-op when already initialized with an identical handle. If a
    /// generation is in flight, waits up to the settle window for it to
    /// finish, then forcibly releases the existing session either way.
    pub async fn initialize(&self, handle: ModelHandle) -> Result<(), EngineError> {
        if self.is_loaded() {
            let same = self
                .handle
                .lock()
                .expect("handle lock poisoned")
                .as_ref()
                .is_some_and(|current| *current == handle);
            if same {
                debug!(model = %handle.name, "Already initialized with this model");
                return Ok(());
            }
        }

        if self.is_generating() && !self.wait_for_idle(self.config.settle_wait()).await {
            warn!("Initialization proceeding while a generation is still in flight");
        }

        self.set_state(EngineState::Initializing);
        self.release_session().await;
        self.stub_mode.store(false, Ordering::SeqCst);

        let result = if self.stub_selected {
            self.stub_mode.store(true, Ordering::SeqCst);
            self.engine.acquire(&handle, &self.config.session).await
        } else {
            match self.engine.acquire(&handle, &self.config.session).await {
                Err(EngineError::CapabilityUnavailable(reason)) => {
                    warn!(
                        model = %handle.name,
                        reason = %reason,
                        "No native capability, degrading to stub mode"
                    );
                    self.stub_mode.store(true, Ordering::SeqCst);
                    StubEngine::new().acquire(&handle, &self.config.session).await
                }
                other => other,
            }
        };

        match result {
            Ok(session) => {
                *self.session.lock().expect("session lock poisoned") =
                    Some(Arc::new(Mutex::new(session)));
                self.has_session.store(true, Ordering::SeqCst);
                *self.handle.lock().expect("handle lock poisoned") = Some(handle.clone());
                self.set_state(EngineState::Ready);
                info!(
                    model = %handle.name,
                    engine = self.engine.name(),
                    stub = self.is_stub_mode(),
                    "Engine initialized"
                );
                Ok(())
            }
            Err(err) => {
                error!(model = %handle.name, error = %err, "Engine initialization failed");
                *self.handle.lock().expect("handle lock poisoned") = None;
                self.stub_mode.store(false, Ordering::SeqCst);
                self.set_state(EngineState::Uninitialized);
                Err(err)
            }
        }
    }

    /// Run one generation.
    ///
    /// Rejects synchronously when uninitialized or when another generation
    /// is in flight. Input is normalized (default system preamble, system
    /// message first, at least one user turn) before any native call.
    pub async fn generate(
        &self,
        input: impl Into<GenerationInput>,
        options: &GenerationOptions,
    ) -> Result<String, EngineError> {
        if !self.is_loaded() {
            return Err(EngineError::NotInitialized);
        }
        self.generating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| EngineError::AlreadyGenerating)?;

        let _flight = FlightGuard { orchestrator: self };
        self.set_state(EngineState::Generating);
        self.run_generation(input.into(), options).await
    }

    async fn run_generation(
        &self,
        input: GenerationInput,
        options: &GenerationOptions,
    ) -> Result<String, EngineError> {
        let opts = options.clamped();
        let messages = normalize_input(input)?;
        let stub_mode = self.is_stub_mode();
        let timeout = self.config.generation_timeout();

        debug!(
            turns = messages.len(),
            max_tokens = opts.max_tokens,
            stub = stub_mode,
            "Starting generation"
        );

        let shared = self
            .session
            .lock()
            .expect("session lock poisoned")
            .clone();
        let Some(session) = shared else {
            return Err(EngineError::NotInitialized);
        };

        let mut guard = session.lock().await;
        let outcome = tokio::time::timeout(timeout, guard.complete(&messages, &opts)).await;
        drop(guard);

        let text = match outcome {
            Err(_) => {
                // The native call was abandoned; resource state is
                // indeterminate and the caller must reinitialize.
                warn!(secs = timeout.as_secs(), "Generation timed out");
                return Err(EngineError::Timeout {
                    secs: timeout.as_secs(),
                });
            }
            Ok(Err(err)) if stub_mode => {
                warn!(error = %err, "Stub-mode call failed, substituting canned response");
                self.next_canned()
            }
            Ok(Err(err)) => {
                error!(error = %err, "Native generation failed");
                return Err(err);
            }
            Ok(Ok(output)) => match output.into_text() {
                Some(text) if !text.trim().is_empty() => text,
                _ if stub_mode => self.next_canned(),
                _ => {
                    // A real engine producing nothing usable is a hard
                    // failure, never silently replaced mid-session.
                    error!("Native engine produced an empty or malformed response");
                    return Err(EngineError::EmptyResponse);
                }
            },
        };

        let cleaned = clean_response(&text);
        let bounded = truncate_to_budget(&cleaned, opts.max_tokens);
        info!(chars = bounded.len(), "Generation complete");
        Ok(bounded)
    }

    /// Wait up to the settle window for an in-flight generation to end,
    /// then force-release the native session. Always ends Uninitialized,
    /// even when release itself errors: a dangling handle must never be
    /// left behind.
    pub async fn cleanup(&self) {
        if self.is_generating() && !self.wait_for_idle(self.config.settle_wait()).await {
            warn!("Cleanup proceeding while a generation is still in flight");
        }

        self.set_state(EngineState::Cleanup);
        self.release_session().await;
        *self.handle.lock().expect("handle lock poisoned") = None;
        self.stub_mode.store(false, Ordering::SeqCst);
        self.set_state(EngineState::Uninitialized);
        info!("Engine cleaned up");
    }

    /// Take and release the current session, logging release failures.
    ///
    /// Emptying the slot never waits on an in-flight native call: when the
    /// inner lock is still held past the settle window, the session is
    /// abandoned to a detached task that releases it once the call
    /// returns, and this method comes back immediately.
    async fn release_session(&self) {
        let old = self.session.lock().expect("session lock poisoned").take();
        self.has_session.store(false, Ordering::SeqCst);
        let Some(session) = old else {
            return;
        };
        if let Ok(mut guard) = session.try_lock() {
            if let Err(err) = guard.release().await {
                warn!(error = %err, "Native session release failed, continuing");
            }
            return;
        }
        warn!("Session still busy, deferring release until its call returns");
        tokio::spawn(async move {
            let mut guard = session.lock().await;
            if let Err(err) = guard.release().await {
                warn!(error = %err, "Deferred session release failed");
            }
        });
    }

    async fn wait_for_idle(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while self.is_generating() {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        true
    }

    fn next_canned(&self) -> String {
        let index = self.fallback_calls.fetch_add(1, Ordering::SeqCst);
        canned_response(index).to_string()
    }
}

/// Clears the single-flight flag on every exit path (success, failure,
/// timeout, panic unwind).
struct FlightGuard<'a> {
    orchestrator: &'a Orchestrator,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.generating.store(false, Ordering::SeqCst);
        let mut state = self
            .orchestrator
            .state
            .lock()
            .expect("state lock poisoned");
        if *state == EngineState::Generating {
            *state = EngineState::Ready;
        }
    }
}

/// Normalize caller input into an ordered message list: a bare string is
/// promoted to a default-system + user pair; an explicit system message is
/// guaranteed first; at least one user message is required.
fn normalize_input(input: GenerationInput) -> Result<Vec<Message>, EngineError> {
    match input {
        GenerationInput::Text(text) => Ok(vec![
            Message::system(DEFAULT_SYSTEM_PROMPT),
            Message::user(text),
        ]),
        GenerationInput::Messages(mut messages) => {
            if messages.is_empty() {
                return Err(EngineError::MalformedInput("message list is empty".into()));
            }
            if !messages.iter().any(|m| m.role == Role::User) {
                return Err(EngineError::MalformedInput(
                    "at least one user message is required".into(),
                ));
            }
            match messages.iter().position(|m| m.role == Role::System) {
                Some(0) => {}
                Some(pos) => {
                    let system = messages.remove(pos);
                    messages.insert(0, system);
                }
                None => messages.insert(0, Message::system(DEFAULT_SYSTEM_PROMPT)),
            }
            Ok(messages)
        }
    }
}
