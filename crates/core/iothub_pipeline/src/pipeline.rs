use crate::BackgroundException;
use crate::BackgroundSender;
use crate::ConfigError;
use crate::DynSender;
use crate::Event;
use crate::Operation;
use crate::PipelineConfig;
use crate::PipelineHandle;
use crate::PipelineStage;
use crate::RuntimeError;
use crate::StageContext;
use crate::StageEffects;
use futures::channel::mpsc;
use futures::StreamExt;
use log::error;
use log::info;
use std::collections::VecDeque;
use std::sync::Arc;

/// Shared, read-mostly context injected into every stage of a pipeline
///
/// Lives as long as the client connection; mutated only at configuration
/// time, read thereafter by every stage and every in-flight completion.
#[derive(Debug)]
pub struct Nucleus {
    pub pipeline_configuration: PipelineConfig,
}

/// Messages entering a pipeline: operations issued by the client above,
/// events raised by the transport layer below
#[derive(Debug)]
pub enum PipelineInput {
    Operation(Operation),
    Event(Event),
}

impl From<Operation> for PipelineInput {
    fn from(op: Operation) -> Self {
        PipelineInput::Operation(op)
    }
}

impl From<Event> for PipelineInput {
    fn from(event: Event) -> Self {
        PipelineInput::Event(event)
    }
}

/// Assemble the ordered chain of stages of a pipeline
///
/// Stages are appended top to bottom; the chain is terminated by the sender
/// feeding the transport resolver and the sink receiving the events leaving
/// the pipeline at the top.
pub struct PipelineBuilder {
    nucleus: Arc<Nucleus>,
    stages: Vec<Box<dyn PipelineStage>>,
}

const MAILBOX_CAPACITY: usize = 16;

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(PipelineBuilder {
            nucleus: Arc::new(Nucleus {
                pipeline_configuration: config,
            }),
            stages: Vec::new(),
        })
    }

    /// The nucleus the stages of this pipeline share
    pub fn nucleus(&self) -> Arc<Nucleus> {
        self.nucleus.clone()
    }

    /// Append a stage below the ones already added
    pub fn with_stage(self, stage: impl PipelineStage) -> Self {
        self.with_boxed_stage(Box::new(stage))
    }

    /// Append an already boxed stage below the ones already added
    pub fn with_boxed_stage(mut self, stage: Box<dyn PipelineStage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Terminate the chain and build the pipeline along with the handle used
    /// to issue operations to it
    pub fn build(
        self,
        transport: DynSender<Operation>,
        events: DynSender<Event>,
    ) -> (Pipeline, PipelineHandle) {
        let (input_sender, input_receiver) = mpsc::channel(MAILBOX_CAPACITY);
        let (background, background_exceptions) = BackgroundSender::new();
        let pipeline = Pipeline {
            nucleus: self.nucleus,
            stages: self.stages,
            input: input_receiver,
            transport,
            events,
            background,
            background_exceptions,
        };
        (pipeline, PipelineHandle::new(input_sender))
    }
}

/// An ordered chain of stages with its own sequential executor
///
/// A single task processes all the `run_op` and `run_event` calls of a
/// pipeline: no two operations are ever processed concurrently within one
/// pipeline instance. Completion callbacks, however, run on whatever task
/// completes the related operation, typically the transport layer.
pub struct Pipeline {
    nucleus: Arc<Nucleus>,
    stages: Vec<Box<dyn PipelineStage>>,
    input: mpsc::Receiver<PipelineInput>,
    transport: DynSender<Operation>,
    events: DynSender<Event>,
    background: BackgroundSender,
    background_exceptions: mpsc::UnboundedReceiver<BackgroundException>,
}

/// A pending stage call while walking the chain
enum Dispatch {
    /// Run an operation at the given stage;
    /// an index one past the last stage denotes the transport resolver
    Op(usize, Operation),
    /// Run an event at the given stage
    Event(usize, Event),
}

impl Pipeline {
    /// Run the pipeline until all the senders to its mailbox are gone
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        info!(
            target: "pipeline",
            "Starting a pipeline of {} stages for device {}",
            self.stages.len(),
            self.nucleus.pipeline_configuration.device_id
        );
        loop {
            tokio::select! {
                input = self.input.next() => match input {
                    Some(PipelineInput::Operation(op)) => self.accept_op(op).await,
                    Some(PipelineInput::Event(event)) => self.accept_event(event).await,
                    None => break,
                },
                Some(exception) = self.background_exceptions.next() => {
                    error!(
                        target: "pipeline",
                        "Background exception raised by the {} stage: {}",
                        exception.stage, exception.error
                    );
                },
            }
        }
        Ok(())
    }

    /// Let an operation enter the chain at the top stage
    async fn accept_op(&mut self, op: Operation) {
        self.drain(Dispatch::Op(0, op)).await
    }

    /// Let an event enter the chain at the bottom stage
    async fn accept_event(&mut self, event: Event) {
        match self.stages.len() {
            0 => self.send_event_out(event).await,
            bottom => self.drain(Dispatch::Event(bottom - 1, event)).await,
        }
    }

    /// Walk the chain, dispatching each pending call in emission order
    async fn drain(&mut self, first: Dispatch) {
        let mut queue = VecDeque::new();
        queue.push_back(first);
        while let Some(next) = queue.pop_front() {
            let (index, mut effects) = match next {
                Dispatch::Op(index, op) => match self.stages.get_mut(index) {
                    None => {
                        // past the last stage: over to the transport resolver
                        if let Err(err) = self.transport.send(op).await {
                            self.background.report("pipeline", err.into());
                        }
                        continue;
                    }
                    Some(stage) => {
                        let mut effects = StageEffects::default();
                        let mut cx = StageContext::new(&mut effects, &self.background);
                        stage.run_op(op, &mut cx);
                        (index, effects)
                    }
                },
                Dispatch::Event(index, event) => {
                    let mut effects = StageEffects::default();
                    let mut cx = StageContext::new(&mut effects, &self.background);
                    self.stages[index].run_event(event, &mut cx);
                    (index, effects)
                }
            };
            while let Some(op) = effects.ops_down.pop_front() {
                queue.push_back(Dispatch::Op(index + 1, op));
            }
            while let Some(event) = effects.events_up.pop_front() {
                match index {
                    0 => self.send_event_out(event).await,
                    above => queue.push_back(Dispatch::Event(above - 1, event)),
                }
            }
        }
    }

    /// Deliver an event leaving the pipeline at the top
    async fn send_event_out(&mut self, event: Event) {
        if let Err(err) = self.events.send(event).await {
            self.background.report("pipeline", err.into());
        }
    }
}
