// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Encryption Gateway Session
//!
//! Owns the single coprocessor session of the process. The session is
//! created lazily on first use and cached afterwards.
//!
//! ## State machine
//!
//! ```text
//! Uninitialized ──get_session──▶ Initializing(shared future) ──ok──▶ Ready(session)
//!       ▲                               │
//!       └────────────── error ──────────┘
//! ```
//!
//! Concurrent first callers clone the in-flight shared future instead of
//! starting a second initialization. A failed initialization leaves the
//! manager `Uninitialized`, so the next call starts a clean attempt. Each
//! initialization carries a generation number; a future that finishes after
//! [`GatewaySession::reset`] does not overwrite the newer state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use super::coprocessor::{Coprocessor, CoprocessorRuntime};
use super::gateway::GatewayConfig;

/// Handle to an initialized coprocessor session.
pub type Session = Arc<dyn Coprocessor>;

type SessionInit = Shared<BoxFuture<'static, Result<Session, SessionError>>>;

/// Where the client runs. Sessions need an interactive user who can sign
/// decryption requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    Interactive,
    Headless,
}

impl ExecutionContext {
    /// Parse `interactive` / `headless` (case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "interactive" => Some(ExecutionContext::Interactive),
            "headless" | "server" => Some(ExecutionContext::Headless),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Cannot create a coprocessor session in a non-interactive context")]
    Environment,

    #[error("Coprocessor initialization failed at {step}: {message}")]
    Initialization { step: InitStep, message: String },
}

/// Initialization step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    Load,
    Bootstrap,
    Connect,
}

impl std::fmt::Display for InitStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitStep::Load => write!(f, "runtime load"),
            InitStep::Bootstrap => write!(f, "runtime bootstrap"),
            InitStep::Connect => write!(f, "session construction"),
        }
    }
}

/// Observable state, mainly for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Initializing,
    Ready,
}

enum SessionState {
    Uninitialized,
    Initializing { generation: u64, init: SessionInit },
    Ready(Session),
}

struct Inner {
    state: SessionState,
    generation: u64,
}

/// Lazily initialized, concurrency-safe coprocessor session.
pub struct GatewaySession {
    runtime: Arc<dyn CoprocessorRuntime>,
    config: GatewayConfig,
    context: ExecutionContext,
    inner: Mutex<Inner>,
}

impl GatewaySession {
    pub fn new(
        runtime: Arc<dyn CoprocessorRuntime>,
        config: GatewayConfig,
        context: ExecutionContext,
    ) -> Self {
        Self {
            runtime,
            config,
            context,
            inner: Mutex::new(Inner {
                state: SessionState::Uninitialized,
                generation: 0,
            }),
        }
    }

    /// Deployment the session is bound to.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        match self.lock().state {
            SessionState::Uninitialized => SessionStatus::Uninitialized,
            SessionState::Initializing { .. } => SessionStatus::Initializing,
            SessionState::Ready(_) => SessionStatus::Ready,
        }
    }

    /// Return the session, initializing it on first use.
    pub async fn get_session(&self) -> Result<Session, SessionError> {
        if self.context != ExecutionContext::Interactive {
            warn!(context = ?self.context, "Refusing to create coprocessor session");
            return Err(SessionError::Environment);
        }

        let (generation, init) = {
            let mut inner = self.lock();
            match &inner.state {
                SessionState::Ready(session) => return Ok(session.clone()),
                SessionState::Initializing { generation, init } => {
                    debug!(generation, "Coprocessor initialization in progress, joining");
                    (*generation, init.clone())
                }
                SessionState::Uninitialized => {
                    inner.generation += 1;
                    let generation = inner.generation;
                    info!(generation, "Starting coprocessor initialization");

                    let init = initialize(self.runtime.clone(), self.config.clone())
                        .boxed()
                        .shared();
                    inner.state = SessionState::Initializing {
                        generation,
                        init: init.clone(),
                    };
                    (generation, init)
                }
            }
        };

        let result = init.await;

        let mut inner = self.lock();
        let current = matches!(
            &inner.state,
            SessionState::Initializing { generation: g, .. } if *g == generation
        );
        if current {
            inner.state = match &result {
                Ok(session) => SessionState::Ready(session.clone()),
                Err(e) => {
                    warn!(generation, error = %e, "Coprocessor initialization failed, state reset");
                    SessionState::Uninitialized
                }
            };
        }

        result
    }

    /// Drop the cached session and any in-flight initialization.
    pub fn reset(&self) {
        info!("Resetting coprocessor session");
        self.lock().state = SessionState::Uninitialized;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn initialize(
    runtime: Arc<dyn CoprocessorRuntime>,
    config: GatewayConfig,
) -> Result<Session, SessionError> {
    let failed = |step: InitStep| {
        move |e: super::coprocessor::CoprocessorError| SessionError::Initialization {
            step,
            message: e.to_string(),
        }
    };

    debug!("Step 1/3: loading coprocessor runtime");
    runtime.load().await.map_err(failed(InitStep::Load))?;

    debug!("Step 2/3: bootstrapping coprocessor runtime");
    runtime.bootstrap().await.map_err(failed(InitStep::Bootstrap))?;

    debug!(
        chain_id = config.chain_id,
        relayer = %config.relayer_url,
        "Step 3/3: creating coprocessor session"
    );
    let session = runtime
        .connect(&config)
        .await
        .map_err(failed(InitStep::Connect))?;

    info!(chain_id = config.chain_id, "Coprocessor session ready");
    Ok(session)
}
