use crate::Event;
use crate::Operation;
use futures::channel::mpsc;
use log::error;
use std::collections::VecDeque;

/// A processing unit, one link of a pipeline
///
/// Operations run downward through the chain of stages, events upward. A
/// stage handles the operation kinds it understands and must forward every
/// other kind, unmodified, to the next stage: this is what lets stages be
/// composed independently of each other.
pub trait PipelineStage: 'static + Send {
    /// The name of this stage, used by logs and background-exception reports
    fn name(&self) -> &str;

    /// Process an operation flowing down
    fn run_op(&mut self, op: Operation, cx: &mut StageContext<'_>);

    /// Process an event flowing up
    ///
    /// Unless overridden, events are forwarded to the previous stage
    /// unmodified.
    fn run_event(&mut self, event: Event, cx: &mut StageContext<'_>) {
        cx.send_event_up(event)
    }
}

/// The capabilities a pipeline injects into a stage for a single
/// `run_op` or `run_event` call
///
/// A stage never holds the next or previous stage: it only sends operations
/// down and events up through this context, so a stage can be exercised
/// against a mock context, see [crate::test_helpers::StageProbe].
pub struct StageContext<'a> {
    effects: &'a mut StageEffects,
    background: &'a BackgroundSender,
}

impl<'a> StageContext<'a> {
    pub(crate) fn new(effects: &'a mut StageEffects, background: &'a BackgroundSender) -> Self {
        StageContext {
            effects,
            background,
        }
    }

    /// Hand an operation to the next stage, or to the terminal transport
    /// resolver when called from the last stage
    pub fn send_op_down(&mut self, op: Operation) {
        self.effects.ops_down.push_back(op);
    }

    /// Hand an event to the previous stage, or to the pipeline event sink
    /// when called from the first stage
    pub fn send_event_up(&mut self, event: Event) {
        self.effects.events_up.push_back(event);
    }

    /// Report an exception raised outside the synchronous call stack of
    /// `run_op`
    pub fn report_background_exception(&self, stage: &str, error: anyhow::Error) {
        self.background.report(stage, error)
    }

    /// A cloneable reporter for continuations that outlive this call,
    /// e.g. a completion callback attached to an operation sent down
    pub fn background_reporter(&self) -> BackgroundSender {
        self.background.clone()
    }
}

/// The operations and events a stage emitted during a single call
#[derive(Default)]
pub(crate) struct StageEffects {
    pub(crate) ops_down: VecDeque<Operation>,
    pub(crate) events_up: VecDeque<Event>,
}

/// An exception raised from an asynchronous continuation of a stage
#[derive(Debug)]
pub struct BackgroundException {
    pub stage: String,
    pub error: anyhow::Error,
}

/// The error sink a stage hands over to its asynchronous continuations
///
/// Reported exceptions are drained and logged by the pipeline executor:
/// they are never raised into the call stack of the task that triggered the
/// continuation, nor silently dropped.
#[derive(Clone)]
pub struct BackgroundSender {
    sender: mpsc::UnboundedSender<BackgroundException>,
}

impl BackgroundSender {
    pub(crate) fn new() -> (BackgroundSender, mpsc::UnboundedReceiver<BackgroundException>) {
        let (sender, receiver) = mpsc::unbounded();
        (BackgroundSender { sender }, receiver)
    }

    /// Report an exception, falling back to the log when the pipeline itself
    /// is gone
    pub fn report(&self, stage: &str, error: anyhow::Error) {
        let exception = BackgroundException {
            stage: stage.to_string(),
            error,
        };
        if let Err(exception) = self.sender.unbounded_send(exception) {
            let exception = exception.into_inner();
            error!(
                target: "pipeline",
                "Background exception raised by the {} stage after the pipeline stopped: {}",
                exception.stage, exception.error
            );
        }
    }
}
