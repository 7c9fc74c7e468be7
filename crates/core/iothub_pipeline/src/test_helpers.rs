//! Test helpers to exercise stages and operations in isolation

use crate::BackgroundException;
use crate::BackgroundSender;
use crate::ChannelError;
use crate::Event;
use crate::Operation;
use crate::OperationOutcome;
use crate::OperationPayload;
use crate::PipelineStage;
use crate::StageContext;
use crate::StageEffects;
use futures::channel::mpsc;
use futures::channel::oneshot;

/// A fake pipeline surrounding a single stage under test
///
/// Collects whatever the stage sends down, up, or to the background-exception
/// channel, so each can be asserted on without assembling a full pipeline.
pub struct StageProbe {
    effects: StageEffects,
    background: BackgroundSender,
    background_exceptions: mpsc::UnboundedReceiver<BackgroundException>,
}

impl StageProbe {
    pub fn new() -> Self {
        let (background, background_exceptions) = BackgroundSender::new();
        StageProbe {
            effects: StageEffects::default(),
            background,
            background_exceptions,
        }
    }

    /// Run an operation through the stage under test
    pub fn run_op(&mut self, stage: &mut impl PipelineStage, op: Operation) {
        let mut cx = StageContext::new(&mut self.effects, &self.background);
        stage.run_op(op, &mut cx);
    }

    /// Run an event through the stage under test
    pub fn run_event(&mut self, stage: &mut impl PipelineStage, event: Event) {
        let mut cx = StageContext::new(&mut self.effects, &self.background);
        stage.run_event(event, &mut cx);
    }

    /// Next operation the stage sent down, if any
    pub fn next_op_down(&mut self) -> Option<Operation> {
        self.effects.ops_down.pop_front()
    }

    /// Next event the stage sent up, if any
    pub fn next_event_up(&mut self) -> Option<Event> {
        self.effects.events_up.pop_front()
    }

    /// Next exception the stage reported in the background, if any
    pub fn next_background_exception(&mut self) -> Option<BackgroundException> {
        self.background_exceptions.try_next().ok().flatten()
    }
}

impl Default for StageProbe {
    fn default() -> Self {
        StageProbe::new()
    }
}

/// An operation paired with a receiver observing its completion
///
/// The receiver resolves with the outcome once the operation is completed,
/// and with a cancellation error if the operation is dropped uncompleted.
pub fn probed_operation(
    payload: impl Into<OperationPayload>,
) -> (Operation, oneshot::Receiver<OperationOutcome>) {
    let (sender, receiver) = oneshot::channel();
    let op = Operation::new(
        payload,
        Box::new(move |outcome| sender.send(outcome).map_err(|_| ChannelError::ReceiveError)),
    );
    (op, receiver)
}
