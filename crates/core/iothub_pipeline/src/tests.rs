use crate::test_helpers::probed_operation;
use crate::test_helpers::StageProbe;
use crate::ChannelError;
use crate::ClientError;
use crate::Event;
use crate::GetStorageInfo;
use crate::HttpRequestAndResponse;
use crate::Operation;
use crate::OperationPayload;
use crate::PipelineBuilder;
use crate::PipelineConfig;
use crate::PipelineHandle;
use crate::PipelineStage;
use crate::Sender;
use crate::StageContext;
use assert_matches::assert_matches;
use futures::channel::mpsc;
use futures::StreamExt;
use serde_json::json;
use std::collections::HashMap;

/// A stage that recognizes no operation kind at all
struct TransparentStage;

impl PipelineStage for TransparentStage {
    fn name(&self) -> &str {
        "transparent"
    }

    fn run_op(&mut self, op: Operation, cx: &mut StageContext<'_>) {
        cx.send_op_down(op)
    }
}

/// A stage answering storage-info requests on the spot, without the network
struct CannedStorageInfoStage;

impl PipelineStage for CannedStorageInfoStage {
    fn name(&self) -> &str {
        "canned-storage"
    }

    fn run_op(&mut self, mut op: Operation, cx: &mut StageContext<'_>) {
        if let OperationPayload::GetStorageInfo(request) = op.payload_mut() {
            request.storage_info = Some(json!({"containerName": "upload"}));
        } else {
            cx.send_op_down(op);
            return;
        }
        if let Err(err) = op.complete_ok() {
            cx.report_background_exception("canned-storage", err.into());
        }
    }
}

/// A stage losing every operation it receives
struct DroppingStage;

impl PipelineStage for DroppingStage {
    fn name(&self) -> &str {
        "dropping"
    }

    fn run_op(&mut self, op: Operation, _cx: &mut StageContext<'_>) {
        drop(op)
    }
}

#[tokio::test]
async fn unrecognized_operations_reach_the_transport_resolver() {
    let (mut handle, mut transport, _events) = spawn_pipeline(vec![
        Box::new(TransparentStage),
        Box::new(TransparentStage),
    ]);

    let client = tokio::spawn(async move {
        handle
            .run_operation(some_http_request("/some/path"))
            .await
            .unwrap()
    });

    // The operation crossed both stages unmodified
    let op = transport.next().await.unwrap();
    assert_matches!(
        op.payload(),
        OperationPayload::HttpRequestAndResponse(HttpRequestAndResponse { path, .. })
            if path == "/some/path"
    );

    // Completing it on the transport side resolves the client call
    op.complete_ok().unwrap();
    let payload = client.await.unwrap();
    assert_matches!(payload, OperationPayload::HttpRequestAndResponse(_));
}

#[tokio::test]
async fn events_flow_up_through_the_chain_to_the_event_sink() {
    let (handle, _transport, mut events) = spawn_pipeline(vec![
        Box::new(TransparentStage),
        Box::new(TransparentStage),
    ]);

    let mut event_sender = handle.event_sender();
    event_sender.send(Event::Connected).await.unwrap();
    event_sender
        .send(Event::MessageReceived(b"telemetry".to_vec()))
        .await
        .unwrap();

    assert_eq!(events.next().await, Some(Event::Connected));
    assert_eq!(
        events.next().await,
        Some(Event::MessageReceived(b"telemetry".to_vec()))
    );
}

#[tokio::test]
async fn a_stage_can_complete_an_operation_without_the_transport() {
    let (mut handle, mut transport, _events) =
        spawn_pipeline(vec![Box::new(CannedStorageInfoStage)]);

    let storage_info = handle.get_storage_info("some blob").await.unwrap();
    assert_eq!(storage_info, Some(json!({"containerName": "upload"})));

    // No transport operation was ever synthesized
    assert!(transport.try_next().is_err());
}

#[tokio::test]
async fn a_lost_operation_resolves_the_issuer_with_a_channel_error() {
    let (mut handle, _transport, _events) = spawn_pipeline(vec![Box::new(DroppingStage)]);

    let result = handle.get_storage_info("some blob").await;
    assert_matches!(
        result,
        Err(ClientError::FromChannel(ChannelError::ReceiveError))
    );
}

#[test]
fn operations_fan_out_in_emission_order() {
    /// A stage turning one operation into two, in a fixed order
    struct FanOutStage;

    impl PipelineStage for FanOutStage {
        fn name(&self) -> &str {
            "fan-out"
        }

        fn run_op(&mut self, op: Operation, cx: &mut StageContext<'_>) {
            for path in ["/first", "/second"] {
                let child = Operation::new(some_http_request(path), Box::new(|_| Ok(())));
                cx.send_op_down(child);
            }
            drop(op)
        }
    }

    let mut probe = StageProbe::new();
    let mut stage = FanOutStage;
    let (op, _outcome) = probed_operation(GetStorageInfo::new("some blob"));
    probe.run_op(&mut stage, op);

    let first = probe.next_op_down().unwrap();
    let second = probe.next_op_down().unwrap();
    assert_matches!(
        first.payload(),
        OperationPayload::HttpRequestAndResponse(HttpRequestAndResponse { path, .. })
            if path == "/first"
    );
    assert_matches!(
        second.payload(),
        OperationPayload::HttpRequestAndResponse(HttpRequestAndResponse { path, .. })
            if path == "/second"
    );
    assert!(probe.next_op_down().is_none());
}

#[test]
fn events_are_forwarded_up_by_default() {
    let mut probe = StageProbe::new();
    let mut stage = TransparentStage;

    probe.run_event(&mut stage, Event::Disconnected);

    assert_eq!(probe.next_event_up(), Some(Event::Disconnected));
    assert!(probe.next_event_up().is_none());
}

fn some_http_request(path: &str) -> HttpRequestAndResponse {
    HttpRequestAndResponse::post(
        path.to_string(),
        "api-version=test".to_string(),
        HashMap::new(),
        "{}".to_string(),
    )
}

/// Spawn a pipeline made of the given stages.
/// Return the client handle, and the receiving ends standing in for the
/// transport resolver and the top-level event sink.
fn spawn_pipeline(
    stages: Vec<Box<dyn PipelineStage>>,
) -> (
    PipelineHandle,
    mpsc::Receiver<Operation>,
    mpsc::Receiver<Event>,
) {
    let config = PipelineConfig::new("my.hub.hostname", "my_device");
    let mut builder = PipelineBuilder::new(config).unwrap();
    for stage in stages {
        builder = builder.with_boxed_stage(stage);
    }

    let (transport_sender, transport_receiver) = mpsc::channel(10);
    let (event_sender, event_receiver) = mpsc::channel(10);
    let (pipeline, handle) = builder.build(Box::new(transport_sender), Box::new(event_sender));

    tokio::spawn(async move { pipeline.run().await });

    (handle, transport_receiver, event_receiver)
}
