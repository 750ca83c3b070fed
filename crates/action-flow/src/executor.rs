//! Playback executor implementation

use crate::errors::PlaybackError;
use crate::strategies::{DefaultFailureHandler, FailureDecision, FailureHandler};
use crate::types::*;
use action_locator::{DefaultElementResolver, ElementResolver, ResolutionResult, ResolveRequest};
use action_primitives::{
    ActionPrimitives, ActionReport, DefaultActionPrimitives, ExecCtx, SelectTarget,
};
use async_trait::async_trait;
use dom_snapshot::{NodeId, SharedDocument};
use domreplay_core_types::RunId;
use domreplay_scenario_store::{Action, ActionPayload};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Playback executor trait
#[async_trait]
pub trait PlaybackExecutor: Send + Sync {
    /// Play actions in order and report every outcome.
    ///
    /// Per-action failures never fail the run; only boundary errors do.
    async fn play(
        &self,
        actions: &[Action],
        cancel: CancellationToken,
    ) -> Result<PlaybackReport, PlaybackError>;

    /// Check that a run can start
    fn validate(&self, actions: &[Action]) -> Result<(), PlaybackError>;

    /// Current state
    fn state(&self) -> PlaybackState;
}

/// Whether the run goes on after an action
enum Next {
    Proceed,
    Abort,
    Cancelled,
}

/// Sequential playback engine over one page
pub struct PlaybackEngine {
    doc: SharedDocument,
    resolver: Arc<dyn ElementResolver>,
    primitives: Arc<dyn ActionPrimitives>,
    failure_handler: Arc<dyn FailureHandler>,
    options: PlaybackOptions,
    state: Mutex<PlaybackState>,
}

impl PlaybackEngine {
    /// Engine with the default resolver, primitives and failure handler
    pub fn new(doc: SharedDocument, options: PlaybackOptions) -> Self {
        let primitives = DefaultActionPrimitives::new(doc.clone(), options.effect_timing());
        Self {
            doc,
            resolver: Arc::new(DefaultElementResolver::default()),
            primitives: Arc::new(primitives),
            failure_handler: Arc::new(DefaultFailureHandler::new()),
            options,
            state: Mutex::new(PlaybackState::Idle),
        }
    }

    /// Replace the resolver fallback chain
    pub fn with_resolver(mut self, resolver: Arc<dyn ElementResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the per-kind effects
    pub fn with_primitives(mut self, primitives: Arc<dyn ActionPrimitives>) -> Self {
        self.primitives = primitives;
        self
    }

    /// Replace the per-action failure policy
    pub fn with_failure_handler(mut self, handler: Arc<dyn FailureHandler>) -> Self {
        self.failure_handler = handler;
        self
    }

    /// Options the engine was built with
    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    /// Page the actions are played against
    pub fn doc(&self) -> &SharedDocument {
        &self.doc
    }

    /// Fire-and-forget run on the runtime.
    ///
    /// Boundary errors are reported before anything is spawned.
    pub fn spawn(
        self: Arc<Self>,
        actions: Vec<Action>,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<Result<PlaybackReport, PlaybackError>>, PlaybackError> {
        self.validate(&actions)?;
        Ok(tokio::spawn(async move { self.play(&actions, cancel).await }))
    }

    fn set_state(&self, state: PlaybackState) {
        *self.state.lock() = state;
    }

    /// Resolve under a read lock released before any await
    fn resolve(&self, action: &Action) -> Option<ResolutionResult> {
        let request = ResolveRequest::new(&action.locator)
            .with_hint(action.auxiliary_hint.as_deref())
            .with_tag(action.element_tag.as_deref());
        let doc = self.doc.read();
        self.resolver.resolve(&doc, &request)
    }

    /// Play one action, retrying per the failure strategy
    async fn play_action(
        &self,
        index: usize,
        action: &Action,
        cancel: &CancellationToken,
    ) -> (ActionOutcome, Next) {
        let mut outcome = ActionOutcome::new(index, action.kind().name(), &action.locator);

        let delay = self.options.scaled(action.delay_millis);
        if !delay.is_zero() {
            debug!(action_index = index, "Waiting {}ms", delay.as_millis());
        }
        if wait(cancel, delay).await.is_err() {
            return (outcome.with_status(OutcomeStatus::Cancelled), Next::Cancelled);
        }

        let mut attempt = 1;
        loop {
            outcome.attempts = attempt;
            let mut ctx = ExecCtx::new(cancel.clone());
            if let Some(deadline) = self.options.attempt_deadline() {
                ctx = ctx.with_deadline(deadline);
            }
            match self.attempt(index, action, &ctx, &mut outcome).await {
                Ok(report) => {
                    outcome.status = if report.applied {
                        OutcomeStatus::Applied
                    } else {
                        OutcomeStatus::NoOp
                    };
                    outcome.error = None;
                    outcome.report = Some(report);
                    return (outcome, Next::Proceed);
                }
                Err(PlaybackError::Interrupted) => {
                    return (outcome.with_status(OutcomeStatus::Cancelled), Next::Cancelled);
                }
                Err(err) => {
                    outcome.status = match err {
                        PlaybackError::ElementNotFound { .. } => OutcomeStatus::NotFound,
                        _ => OutcomeStatus::Failed,
                    };
                    match self.failure_handler.handle_failure(
                        index,
                        self.options.failure_strategy,
                        &err,
                        attempt,
                    ) {
                        FailureDecision::Retry {
                            attempt: next,
                            backoff_ms,
                        } => {
                            if wait(cancel, Duration::from_millis(backoff_ms)).await.is_err() {
                                let outcome = outcome
                                    .with_status(OutcomeStatus::Cancelled)
                                    .with_error(err.to_string());
                                return (outcome, Next::Cancelled);
                            }
                            attempt = next;
                        }
                        FailureDecision::Abort(msg) => {
                            return (outcome.with_error(msg), Next::Abort);
                        }
                        FailureDecision::Continue(msg) => {
                            return (outcome.with_error(msg), Next::Proceed);
                        }
                    }
                }
            }
        }
    }

    /// Resolve, prepare, apply and settle once
    async fn attempt(
        &self,
        index: usize,
        action: &Action,
        ctx: &ExecCtx,
        outcome: &mut ActionOutcome,
    ) -> Result<ActionReport, PlaybackError> {
        let fail = |err| PlaybackError::from_action(index, err);
        ctx.check().map_err(fail)?;

        let resolved = self
            .resolve(action)
            .ok_or_else(|| PlaybackError::ElementNotFound {
                index,
                locator: action.locator.clone(),
            })?;
        outcome.strategy = Some(resolved.strategy);
        let node = resolved.node;

        self.primitives
            .scroll_into_view(ctx, node)
            .await
            .map_err(fail)?;
        self.primitives.highlight(ctx, node).await.map_err(fail)?;

        let report = self.apply(index, action, ctx, node).await?;
        info!(
            action_index = index,
            action_id = %ctx.action_id,
            kind = %action.kind(),
            strategy = %resolved.strategy,
            applied = report.applied,
            "Action replayed"
        );

        wait(&ctx.cancel_token, self.options.settle_delay()).await?;
        Ok(report)
    }

    /// Kind-specific effect
    async fn apply(
        &self,
        index: usize,
        action: &Action,
        ctx: &ExecCtx,
        node: NodeId,
    ) -> Result<ActionReport, PlaybackError> {
        let primitives = &self.primitives;
        let result = match &action.payload {
            ActionPayload::Click => primitives.click(ctx, node).await,
            ActionPayload::Input { value, .. } => primitives.type_text(ctx, node, value).await,
            ActionPayload::Select {
                value,
                selected_index,
                ..
            } => {
                let target = SelectTarget::from_capture(*selected_index, value.as_deref())
                    .ok_or_else(|| PlaybackError::InvalidAction {
                        index,
                        reason: "select action has neither an index nor a value".to_string(),
                    })?;
                primitives.select(ctx, node, &target).await
            }
            ActionPayload::Checkbox { checked } => {
                primitives.set_checkbox(ctx, node, *checked).await
            }
            ActionPayload::Radio { .. } => primitives.check_radio(ctx, node).await,
            ActionPayload::KeyPress { key } => primitives.press_key(ctx, node, key).await,
        };
        result.map_err(|err| PlaybackError::from_action(index, err))
    }
}

/// Cancellable sleep
async fn wait(cancel: &CancellationToken, duration: Duration) -> Result<(), PlaybackError> {
    if cancel.is_cancelled() {
        return Err(PlaybackError::Interrupted);
    }
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(PlaybackError::Interrupted),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Await a spawned run
pub async fn join_playback(
    handle: JoinHandle<Result<PlaybackReport, PlaybackError>>,
) -> Result<PlaybackReport, PlaybackError> {
    handle
        .await
        .map_err(|e| PlaybackError::Join(e.to_string()))?
}

#[async_trait]
impl PlaybackExecutor for PlaybackEngine {
    async fn play(
        &self,
        actions: &[Action],
        cancel: CancellationToken,
    ) -> Result<PlaybackReport, PlaybackError> {
        self.validate(actions)?;

        let mut report = PlaybackReport::new(RunId::new());
        info!(
            run_id = %report.run_id,
            actions = actions.len(),
            speed = self.options.speed,
            "Playback started"
        );

        let mut stop: Option<OutcomeStatus> = None;
        for (index, action) in actions.iter().enumerate() {
            if stop.is_none() && cancel.is_cancelled() {
                stop = Some(OutcomeStatus::Cancelled);
            }
            if let Some(status) = stop {
                report.outcomes.push(
                    ActionOutcome::new(index, action.kind().name(), &action.locator)
                        .with_status(status),
                );
                continue;
            }

            self.set_state(PlaybackState::Playing { position: index });
            report.state = PlaybackState::Playing { position: index };
            let (outcome, next) = self.play_action(index, action, &cancel).await;
            report.outcomes.push(outcome);
            match next {
                Next::Proceed => {}
                Next::Abort => {
                    report.aborted = true;
                    stop = Some(OutcomeStatus::Skipped);
                }
                Next::Cancelled => stop = Some(OutcomeStatus::Cancelled),
            }
        }

        let report = report.finish();
        self.set_state(PlaybackState::Done);
        if report.failure_count() > 0 {
            warn!(
                run_id = %report.run_id,
                succeeded = report.success_count(),
                failed = report.failure_count(),
                "Playback finished with failures"
            );
        } else {
            info!(
                run_id = %report.run_id,
                succeeded = report.success_count(),
                latency_ms = report.latency_ms,
                "Playback finished"
            );
        }
        Ok(report)
    }

    fn validate(&self, actions: &[Action]) -> Result<(), PlaybackError> {
        if actions.is_empty() {
            return Err(PlaybackError::EmptyScenario);
        }
        Ok(())
    }

    fn state(&self) -> PlaybackState {
        *self.state.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_snapshot::Document;

    fn engine() -> PlaybackEngine {
        let mut doc = Document::new();
        let html = doc.create_element(doc.root(), "html").unwrap();
        let body = doc.create_element(html, "body").unwrap();
        doc.create_element_with(body, "select", &[("id", "country")])
            .unwrap();
        PlaybackEngine::new(SharedDocument::new(doc), PlaybackOptions::default())
    }

    #[test]
    fn test_validate_rejects_empty_run() {
        let engine = engine();
        assert_eq!(engine.validate(&[]), Err(PlaybackError::EmptyScenario));
        let result = tokio_test::block_on(engine.play(&[], CancellationToken::new()));
        assert_eq!(result.unwrap_err(), PlaybackError::EmptyScenario);
        assert_eq!(engine.state(), PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_without_target_fails_action() {
        let engine = engine();
        let action = Action::new(
            ActionPayload::Select {
                value: None,
                selected_index: None,
                selected_text: Some("Germany".to_string()),
            },
            "#country",
        );
        let report = engine
            .play(&[action], CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.statuses(), vec![OutcomeStatus::Failed]);
        assert!(report.outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("neither an index nor a value"));
        assert_eq!(engine.state(), PlaybackState::Done);
    }

    #[tokio::test]
    async fn test_wait_observes_cancellation() {
        let token = CancellationToken::new();
        assert!(wait(&token, Duration::ZERO).await.is_ok());
        token.cancel();
        assert_eq!(
            wait(&token, Duration::from_secs(5)).await,
            Err(PlaybackError::Interrupted)
        );
    }
}
