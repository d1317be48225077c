use super::update::UiUpdate;
use crate::api::channel::UndecodableFrame;
use crate::api::{ApiClient, StreamClient};
use crate::logging::{debug_payload_enabled, emit_debug_payload};
use crate::state::{ChannelEvent, ChannelId, ChannelUpdate, TrajectorySession};
use crate::types::ExecuteRequest;
use crate::util::preview;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct ActiveChannel {
    id: ChannelId,
    cancel: CancellationToken,
}

/// Owns the backend clients and the one live execution channel.
///
/// All results come back to the UI thread through `update_tx`; nothing here
/// touches session state except `start_run`, which resets it.
pub struct RuntimeContext {
    api: Arc<ApiClient>,
    stream: Arc<StreamClient>,
    update_tx: mpsc::UnboundedSender<UiUpdate>,
    active_channel: Option<ActiveChannel>,
}

impl RuntimeContext {
    pub fn new(
        api: ApiClient,
        stream: StreamClient,
        update_tx: mpsc::UnboundedSender<UiUpdate>,
    ) -> Self {
        Self {
            api: Arc::new(api),
            stream: Arc::new(stream),
            update_tx,
            active_channel: None,
        }
    }

    pub fn server_url(&self) -> &str {
        self.api.server_url()
    }

    pub fn stream_url(&self) -> &str {
        self.stream.stream_url()
    }

    pub fn active_channel(&self) -> Option<ChannelId> {
        self.active_channel.as_ref().map(|active| active.id)
    }

    /// Starts a fresh run, closing whichever channel was live before it.
    pub fn start_run(
        &mut self,
        session: &mut TrajectorySession,
        request: ExecuteRequest,
    ) -> ChannelId {
        if let Some(previous) = self.active_channel.take() {
            tracing::debug!(channel = %previous.id, "superseding live channel");
            previous.cancel.cancel();
        }

        let channel = session.begin_run();
        tracing::info!(
            %channel,
            query = %preview(&request.query, 80),
            context_chars = request.context.len(),
            enable_sub_llm = request.enable_sub_llm,
            "starting run"
        );

        let cancel = CancellationToken::new();
        tokio::spawn(drive_channel(
            Arc::clone(&self.stream),
            channel,
            request,
            self.update_tx.clone(),
            cancel.clone(),
        ));
        self.active_channel = Some(ActiveChannel { id: channel, cancel });
        channel
    }

    pub fn fetch_sample(&self) {
        let api = Arc::clone(&self.api);
        self.spawn_request(async move { api.fetch_sample().await.map(UiUpdate::SampleLoaded) });
    }

    pub fn list_datasets(&self) {
        let api = Arc::clone(&self.api);
        self.spawn_request(async move { api.list_datasets().await.map(UiUpdate::DatasetsListed) });
    }

    pub fn check_health(&self) {
        let api = Arc::clone(&self.api);
        self.spawn_request(async move { api.health().await.map(UiUpdate::HealthChecked) });
    }

    fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = anyhow::Result<UiUpdate>> + Send + 'static,
    {
        let update_tx = self.update_tx.clone();
        tokio::spawn(async move {
            let update = request
                .await
                .unwrap_or_else(|error| UiUpdate::Error(format!("{error:#}")));
            let _ = update_tx.send(update);
        });
    }
}

impl Drop for RuntimeContext {
    fn drop(&mut self) {
        if let Some(active) = self.active_channel.take() {
            active.cancel.cancel();
        }
    }
}

/// Runs one channel from connect to close, forwarding every event tagged with
/// `channel`. Cancellation closes the socket and stops forwarding.
async fn drive_channel(
    stream: Arc<StreamClient>,
    channel: ChannelId,
    request: ExecuteRequest,
    update_tx: mpsc::UnboundedSender<UiUpdate>,
    cancel: CancellationToken,
) {
    let emit = |event: ChannelEvent| {
        let _ = update_tx.send(UiUpdate::Channel(ChannelUpdate { channel, event }));
    };

    let opened = tokio::select! {
        _ = cancel.cancelled() => return,
        opened = stream.open() => opened,
    };
    let mut handle = match opened {
        Ok(handle) => handle,
        Err(error) => {
            emit(ChannelEvent::TransportError(format!("{error:#}")));
            return;
        }
    };
    if cancel.is_cancelled() {
        handle.close().await;
        return;
    }
    emit(ChannelEvent::Opened);

    let payload = request.to_wire();
    if debug_payload_enabled() {
        emit_debug_payload(stream.stream_url(), &payload);
    }
    if let Err(error) = handle.send_text(payload.to_string()).await {
        emit(ChannelEvent::TransportError(format!("{error:#}")));
        handle.close().await;
        return;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(%channel, "closing superseded channel");
                handle.close().await;
                return;
            }
            frame = handle.next_frame() => match frame {
                Some(Ok(text)) => emit(ChannelEvent::Frame(text)),
                Some(Err(error)) if error.downcast_ref::<UndecodableFrame>().is_some() => {
                    emit(ChannelEvent::Undecodable(format!("{error:#}")));
                    handle.close().await;
                    return;
                }
                Some(Err(error)) => {
                    emit(ChannelEvent::TransportError(format!("{error:#}")));
                    return;
                }
                None => {
                    emit(ChannelEvent::Closed);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_client::{MockChannelClient, MockRun};
    use crate::config::Config;
    use crate::state::RunStatus;
    use crate::types::StreamFailure;
    use std::time::Duration;

    fn step_frame(id: i64, parent: Option<i64>) -> String {
        let parent = parent.map_or("null".to_string(), |p| p.to_string());
        format!(r#"{{"type":"step","step":{{"id":{id},"parent_id":{parent},"type":"thinking"}}}}"#)
    }

    fn make_ctx(
        mock: &MockChannelClient,
    ) -> (RuntimeContext, mpsc::UnboundedReceiver<UiUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel::<UiUpdate>();
        let config = Config {
            server_url: "http://127.0.0.1:9".to_string(),
            stream_url: "ws://127.0.0.1:9/api/rlm/stream".to_string(),
            enable_sub_llm: true,
            connect_timeout: Duration::from_secs(1),
            working_dir: std::env::temp_dir(),
        };
        let api = ApiClient::new(&config).expect("api client");
        let stream = StreamClient::new_mock(Arc::new(mock.clone()));
        (RuntimeContext::new(api, stream, tx), rx)
    }

    async fn next_channel_update(rx: &mut mpsc::UnboundedReceiver<UiUpdate>) -> ChannelUpdate {
        loop {
            let update = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("update within timeout")
                .expect("channel open");
            if let UiUpdate::Channel(update) = update {
                return update;
            }
        }
    }

    /// Applies updates until `channel` reports a terminal event.
    async fn pump_until_done(
        rx: &mut mpsc::UnboundedReceiver<UiUpdate>,
        session: &mut TrajectorySession,
        channel: ChannelId,
    ) {
        loop {
            let update = next_channel_update(rx).await;
            let done = update.channel == channel
                && matches!(
                    update.event,
                    ChannelEvent::Closed
                        | ChannelEvent::TransportError(_)
                        | ChannelEvent::Undecodable(_)
                );
            session.apply(update.channel, update.event);
            if done {
                return;
            }
        }
    }

    #[tokio::test]
    async fn run_streams_steps_then_final_answer() {
        let mock = MockChannelClient::new(vec![MockRun::closing(vec![
            step_frame(1, None),
            step_frame(2, Some(1)),
            r#"{"type":"final","answer":"42"}"#.to_string(),
        ])]);
        let (mut ctx, mut rx) = make_ctx(&mock);
        let mut session = TrajectorySession::new();

        let channel = ctx.start_run(&mut session, ExecuteRequest::new("q", "ctx", false));
        assert_eq!(ctx.active_channel(), Some(channel));
        assert_eq!(session.status(), RunStatus::Running);

        pump_until_done(&mut rx, &mut session, channel).await;

        assert_eq!(session.status(), RunStatus::Complete);
        assert_eq!(session.steps().len(), 2);
        assert_eq!(session.final_answer(), Some("42"));

        let sent = mock.sent_messages();
        assert_eq!(sent.len(), 1, "initiation message is sent exactly once");
        let wire: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(wire["query"], "q");
        assert_eq!(wire["context"], "ctx");
        assert_eq!(wire["enable_sub_llm"], false);
    }

    #[tokio::test]
    async fn second_run_supersedes_the_first_channel() {
        let mock = MockChannelClient::new(vec![
            MockRun::held_open(vec![step_frame(1, None)]),
            MockRun::closing(vec![
                step_frame(9, None),
                r#"{"type":"final","answer":"second"}"#.to_string(),
            ]),
        ]);
        let (mut ctx, mut rx) = make_ctx(&mock);
        let mut session = TrajectorySession::new();

        let first = ctx.start_run(&mut session, ExecuteRequest::new("one", "ctx", true));
        loop {
            let update = next_channel_update(&mut rx).await;
            let is_frame = matches!(update.event, ChannelEvent::Frame(_));
            session.apply(update.channel, update.event);
            if is_frame {
                break;
            }
        }
        assert_eq!(session.steps().len(), 1);

        let second = ctx.start_run(&mut session, ExecuteRequest::new("two", "ctx", true));
        assert_ne!(first, second);
        assert!(session.steps().is_empty());

        pump_until_done(&mut rx, &mut session, second).await;

        let ids: Vec<_> = session.steps().iter().map(|step| step.id).collect();
        assert_eq!(ids, vec![Some(9)]);
        assert_eq!(session.final_answer(), Some("second"));
        assert_eq!(session.status(), RunStatus::Complete);
        assert_eq!(mock.sent_messages().len(), 2);
    }

    #[tokio::test]
    async fn late_events_from_first_channel_are_ignored() {
        let mock = MockChannelClient::new(vec![
            MockRun::held_open(vec![]),
            MockRun::held_open(vec![]),
        ]);
        let (mut ctx, _rx) = make_ctx(&mock);
        let mut session = TrajectorySession::new();

        let first = ctx.start_run(&mut session, ExecuteRequest::new("one", "ctx", true));
        let second = ctx.start_run(&mut session, ExecuteRequest::new("two", "ctx", true));
        assert_eq!(ctx.active_channel(), Some(second));

        // A callback registered on the first channel firing after replacement.
        assert!(!session.apply(first, ChannelEvent::Frame(step_frame(5, None))));
        assert!(!session.apply(first, ChannelEvent::Closed));
        assert!(session.steps().is_empty());
        assert_eq!(session.status(), RunStatus::Running);
    }

    #[tokio::test]
    async fn invalid_utf8_binary_frame_fails_the_run_as_malformed() {
        let mock = MockChannelClient::new(vec![MockRun::with_binary(
            vec![step_frame(1, None)],
            vec![0x7b, 0xff, 0xfe, 0x7d],
        )]);
        let (mut ctx, mut rx) = make_ctx(&mock);
        let mut session = TrajectorySession::new();

        let channel = ctx.start_run(&mut session, ExecuteRequest::new("q", "ctx", true));
        pump_until_done(&mut rx, &mut session, channel).await;

        assert_eq!(session.status(), RunStatus::Error);
        assert_eq!(session.steps().len(), 1);
        assert!(matches!(
            session.last_failure(),
            Some(StreamFailure::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn open_failure_surfaces_as_transport_error() {
        let mock = MockChannelClient::new(vec![]);
        let (mut ctx, mut rx) = make_ctx(&mock);
        let mut session = TrajectorySession::new();

        let channel = ctx.start_run(&mut session, ExecuteRequest::new("q", "ctx", true));
        pump_until_done(&mut rx, &mut session, channel).await;

        assert_eq!(session.status(), RunStatus::Error);
        assert!(session.last_failure().is_some());
        assert!(mock.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn rest_failures_arrive_as_error_updates() {
        let mock = MockChannelClient::new(vec![]);
        let (ctx, mut rx) = make_ctx(&mock);

        ctx.check_health();
        let update = tokio::time::timeout(Duration::from_secs(35), rx.recv())
            .await
            .expect("update within timeout")
            .expect("channel open");
        assert!(matches!(update, UiUpdate::Error(_)));
    }
}
