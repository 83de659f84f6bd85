//! Segmentation session state machine
//!
//! A session takes a source image, hands it to the [`SegmentationOracle`],
//! turns the answer into a displayable bitmap and publishes the outcome as a
//! sequence of [`SegmentationState`] transitions.
//!
//! Every `begin` starts a new generation. Results are applied only when the
//! generation they were issued for is still current, so a slow answer to an
//! earlier image can never replace the outcome of a later one.

use crate::{
    config::SessionConfig,
    error::{ComposeError, OracleError, Result},
    mask::MaskReconstructor,
    oracle::SegmentationOracle,
    services::observer::StateObserver,
    types::{PixelBuffer, SegmentationResult},
    utils::ResolutionLimiter,
};
use instant::Instant;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Observable state of a segmentation session
#[derive(Debug, Clone)]
pub enum SegmentationState {
    /// No segmentation requested yet (or the previous outcome was cleared)
    Idle,
    /// Waiting for the oracle
    Processing,
    /// Final bitmap: the oracle's foreground or the reconstructed mask overlay
    Success(Arc<PixelBuffer>),
    /// The oracle failed; call `begin`/`process` again to retry
    Error(OracleError),
}

impl SegmentationState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }

    /// Whether this state ends a session
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Error(_))
    }

    /// The result bitmap, if the session succeeded
    #[must_use]
    pub fn bitmap(&self) -> Option<&Arc<PixelBuffer>> {
        match self {
            Self::Success(bitmap) => Some(bitmap),
            _ => None,
        }
    }
}

impl std::fmt::Display for SegmentationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success(bitmap) => write!(f, "success ({}x{})", bitmap.width(), bitmap.height()),
            Self::Error(err) => write!(f, "error ({})", err),
            other => f.write_str(other.name()),
        }
    }
}

/// A state change tagged with the generation that produced it
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub generation: u64,
    pub state: SegmentationState,
}

/// Wall-clock breakdown of one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTimings {
    /// Resolution limiting before submission
    pub limit_ms: u64,
    /// Time spent waiting for the oracle
    pub oracle_ms: u64,
    /// Mask reconstruction (zero for foreground results)
    pub reconstruct_ms: u64,
    /// From `begin` to the terminal transition
    pub total_ms: u64,
}

/// Handle for one in-flight segmentation
///
/// Produced by [`SegmentationSession::begin`] and consumed by
/// [`SegmentationSession::resolve`]. Holds the image the oracle should see.
#[derive(Debug)]
pub struct SessionTicket {
    generation: u64,
    image: PixelBuffer,
    cancel: CancellationToken,
    started: Instant,
    timings: SessionTimings,
}

impl SessionTicket {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The (possibly downscaled) image to submit
    #[must_use]
    pub fn image(&self) -> &PixelBuffer {
        &self.image
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Token that fires when this ticket is superseded or abandoned
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Record how long the oracle took, for the completion log
    pub fn record_oracle_time(&mut self, oracle_ms: u64) {
        self.timings.oracle_ms = oracle_ms;
    }
}

struct SessionCore {
    generation: u64,
    state: SegmentationState,
    cancel: Option<CancellationToken>,
    subscribers: Vec<mpsc::UnboundedSender<StateTransition>>,
    observers: Vec<Arc<dyn StateObserver>>,
    last_timings: Option<SessionTimings>,
}

impl SessionCore {
    /// Apply a state and fan it out while still holding the lock so every
    /// consumer sees transitions in the order they were applied
    fn publish(&mut self, state: SegmentationState) {
        self.state = state;
        let transition = StateTransition {
            generation: self.generation,
            state: self.state.clone(),
        };

        self.subscribers
            .retain(|subscriber| subscriber.send(transition.clone()).is_ok());
        for observer in &self.observers {
            observer.on_transition(&transition);
        }
    }
}

/// Orchestrates one oracle at a time for a single image slot
pub struct SegmentationSession {
    oracle: Arc<dyn SegmentationOracle>,
    config: SessionConfig,
    reconstructor: MaskReconstructor,
    core: Mutex<SessionCore>,
}

impl SegmentationSession {
    /// Create a session with default configuration
    #[must_use]
    pub fn new(oracle: Arc<dyn SegmentationOracle>) -> Self {
        Self::build(oracle, SessionConfig::default(), MaskReconstructor::default())
    }

    /// Create a session with custom configuration
    ///
    /// # Errors
    /// - `InvalidConfig` when the configuration fails validation
    pub fn with_config(oracle: Arc<dyn SegmentationOracle>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let reconstructor = MaskReconstructor::new(config.mask)?;
        Ok(Self::build(oracle, config, reconstructor))
    }

    fn build(
        oracle: Arc<dyn SegmentationOracle>,
        config: SessionConfig,
        reconstructor: MaskReconstructor,
    ) -> Self {
        Self {
            oracle,
            config,
            reconstructor,
            core: Mutex::new(SessionCore {
                generation: 0,
                state: SegmentationState::Idle,
                cancel: None,
                subscribers: Vec::new(),
                observers: Vec::new(),
                last_timings: None,
            }),
        }
    }

    fn core(&self) -> MutexGuard<'_, SessionCore> {
        // Publishing never leaves the core half-updated, so a poisoned lock is still usable
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current state snapshot
    #[must_use]
    pub fn state(&self) -> SegmentationState {
        self.core().state.clone()
    }

    /// Generation of the most recent `begin` (0 before the first one)
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.core().generation
    }

    /// Timings of the most recently completed session
    #[must_use]
    pub fn last_timings(&self) -> Option<SessionTimings> {
        self.core().last_timings
    }

    /// Receive every future transition, in order
    ///
    /// The channel closes when the session is dropped.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<StateTransition> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.core().subscribers.push(tx);
        rx
    }

    /// Register an observer called synchronously on every transition
    ///
    /// Observers run while the session is locked and must not call back into it.
    pub fn add_observer(&self, observer: Arc<dyn StateObserver>) {
        self.core().observers.push(observer);
    }

    /// Start a new session for `image`
    ///
    /// Cancels any in-flight request, clears the previous outcome and moves to
    /// `Processing`. The returned ticket carries the image to submit.
    ///
    /// # Errors
    /// - `InvalidImage` for zero-area input (the current session is left untouched)
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn begin(&self, image: PixelBuffer) -> Result<SessionTicket> {
        image.ensure_non_empty("segmentation")?;

        let started = Instant::now();
        let image = match &self.config.limiter {
            Some(limiter) => ResolutionLimiter::limit(image, limiter)?,
            None => image,
        };
        let limit_ms = started.elapsed().as_millis() as u64;

        let cancel = CancellationToken::new();
        let mut core = self.core();
        if let Some(previous) = core.cancel.replace(cancel.clone()) {
            previous.cancel();
        }
        core.generation += 1;
        let generation = core.generation;

        if !matches!(core.state, SegmentationState::Idle) {
            // Drops the previous bitmap unless a consumer still holds it
            core.publish(SegmentationState::Idle);
        }
        core.publish(SegmentationState::Processing);
        drop(core);

        debug!(
            "Session {} started for {}x{} image",
            generation,
            image.width(),
            image.height()
        );

        Ok(SessionTicket {
            generation,
            image,
            cancel,
            started,
            timings: SessionTimings {
                limit_ms,
                ..SessionTimings::default()
            },
        })
    }

    /// Apply an oracle outcome to the session that issued `ticket`
    ///
    /// Foreground results are published as-is; mask results are reconstructed
    /// at the ticket's dimensions. Oracle failures become `Error`.
    ///
    /// # Errors
    /// - `CancelledStale` when a newer `begin` or an `abandon` superseded the ticket
    /// - `Oracle` carrying the failure that was published as `Error`
    #[instrument(skip(self, ticket, outcome), fields(generation = ticket.generation))]
    pub fn resolve(
        &self,
        ticket: SessionTicket,
        outcome: std::result::Result<SegmentationResult, OracleError>,
    ) -> Result<Arc<PixelBuffer>> {
        self.ensure_current(ticket.generation)?;

        let mut timings = ticket.timings;
        let (width, height) = ticket.dimensions();
        let reconstruct_start = Instant::now();
        let outcome = outcome.and_then(|result| self.finalize(result, width, height));
        timings.reconstruct_ms = reconstruct_start.elapsed().as_millis() as u64;
        timings.total_ms = ticket.started.elapsed().as_millis() as u64;
        drop(ticket.image);

        let mut core = self.core();
        // The generation may have moved on while the bitmap was being built
        if core.generation != ticket.generation
            || !matches!(core.state, SegmentationState::Processing)
        {
            let current = core.generation;
            drop(core);
            debug!("Discarding result for superseded session {}", ticket.generation);
            return Err(ComposeError::CancelledStale {
                generation: ticket.generation,
                current,
            });
        }

        core.cancel = None;
        core.last_timings = Some(timings);
        match outcome {
            Ok(bitmap) => {
                core.publish(SegmentationState::Success(Arc::clone(&bitmap)));
                drop(core);
                info!(
                    "Session {} succeeded: {}x{} in {}ms (oracle {}ms, reconstruct {}ms)",
                    ticket.generation,
                    width,
                    height,
                    timings.total_ms,
                    timings.oracle_ms,
                    timings.reconstruct_ms
                );
                Ok(bitmap)
            },
            Err(err) => {
                core.publish(SegmentationState::Error(err.clone()));
                drop(core);
                warn!(
                    "Session {} failed after {}ms: {}",
                    ticket.generation, timings.total_ms, err
                );
                Err(ComposeError::Oracle(err))
            },
        }
    }

    /// Run a complete session: begin, query the oracle, resolve
    ///
    /// A caller whose run was superseded by a newer `begin` (or by `abandon`)
    /// gets `CancelledStale` back. That is not a failure of the session: its
    /// state belongs to the newer run and was left untouched, so callers should
    /// check [`ComposeError::is_stale`] and drop the result silently.
    ///
    /// # Errors
    /// - `InvalidImage` for zero-area input
    /// - `Oracle` when the oracle fails or times out (the session ends in `Error`)
    /// - `CancelledStale` when superseded before the oracle answered
    pub async fn process(&self, image: PixelBuffer) -> Result<Arc<PixelBuffer>> {
        let mut ticket = self.begin(image)?;

        let oracle_start = Instant::now();
        let outcome = self.query_oracle(&ticket).await;
        ticket.record_oracle_time(oracle_start.elapsed().as_millis() as u64);

        self.resolve(ticket, outcome)
    }

    async fn query_oracle(
        &self,
        ticket: &SessionTicket,
    ) -> std::result::Result<SegmentationResult, OracleError> {
        debug!(
            "Submitting session {} to {} oracle",
            ticket.generation,
            self.oracle.name()
        );
        let request = self.oracle.submit(ticket.image(), ticket.cancellation().clone());

        match self.config.oracle_timeout {
            Some(limit) => match tokio::time::timeout(limit, request).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    ticket.cancellation().cancel();
                    Err(OracleError::Timeout(limit.as_millis() as u64))
                },
            },
            None => request.await,
        }
    }

    /// Abandon the in-flight session
    ///
    /// The oracle is asked to cancel and any result that still arrives is
    /// discarded. The state is left as it was; no further transition occurs
    /// until the next `begin`.
    pub fn abandon(&self) {
        let mut core = self.core();
        if let Some(cancel) = core.cancel.take() {
            cancel.cancel();
        }
        core.generation += 1;
        debug!("Session abandoned, generation now {}", core.generation);
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        let core = self.core();
        if core.generation == generation && matches!(core.state, SegmentationState::Processing) {
            return Ok(());
        }
        let current = core.generation;
        drop(core);
        debug!("Ignoring late result for session {} (current {})", generation, current);
        Err(ComposeError::CancelledStale {
            generation,
            current,
        })
    }

    fn finalize(
        &self,
        result: SegmentationResult,
        width: u32,
        height: u32,
    ) -> std::result::Result<Arc<PixelBuffer>, OracleError> {
        match result {
            SegmentationResult::WholeImageForeground(foreground) => {
                if foreground.is_empty() {
                    return Err(OracleError::failed("oracle returned an empty foreground"));
                }
                Ok(Arc::new(foreground))
            },
            SegmentationResult::SubjectMasks(masks) => self
                .reconstructor
                .reconstruct(&masks, width, height)
                .map(Arc::new)
                .map_err(|e| OracleError::failed(format!("mask reconstruction failed: {}", e))),
        }
    }
}

impl Drop for SegmentationSession {
    fn drop(&mut self) {
        let core = self.core.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(cancel) = core.cancel.take() {
            cancel.cancel();
        }
    }
}
