use super::context::RuntimeContext;
use super::frontend::{FrontendAdapter, UserInputEvent};
use super::mode::RuntimeMode;
use super::update::UiUpdate;
use tokio::sync::mpsc;

pub struct Runtime<M: RuntimeMode> {
    pub mode: M,
    update_rx: mpsc::UnboundedReceiver<UiUpdate>,
}

impl<M: RuntimeMode> Runtime<M> {
    pub fn new(mode: M, update_rx: mpsc::UnboundedReceiver<UiUpdate>) -> Self {
        Self { mode, update_rx }
    }

    /// Drives one frontend until it asks to quit: input first, then every
    /// pending background update, then a render.
    pub async fn run<F: FrontendAdapter<M>>(&mut self, frontend: &mut F, ctx: &mut RuntimeContext) {
        loop {
            if let Some(event) = frontend.poll_user_input(&self.mode) {
                self.dispatch_input(event, ctx);
            }

            self.drain_updates(ctx);
            frontend.render(&self.mode);

            if frontend.should_quit() || self.mode.quit_requested() {
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    fn dispatch_input(&mut self, event: UserInputEvent, ctx: &mut RuntimeContext) {
        match event {
            UserInputEvent::Text(input) => self.mode.on_user_input(input, ctx),
            UserInputEvent::Interrupt => self.mode.on_interrupt(ctx),
            other => self.mode.on_frontend_event(other, ctx),
        }
    }

    fn drain_updates(&mut self, ctx: &mut RuntimeContext) {
        while let Ok(update) = self.update_rx.try_recv() {
            self.mode.on_model_update(update, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_client::MockChannelClient;
    use crate::api::{ApiClient, StreamClient};
    use crate::config::Config;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingMode {
        inputs: Vec<String>,
        updates: usize,
        interrupts: usize,
        toggles: usize,
    }

    impl RuntimeMode for RecordingMode {
        fn on_user_input(&mut self, input: String, _ctx: &mut RuntimeContext) {
            self.inputs.push(input);
        }

        fn on_model_update(&mut self, _update: UiUpdate, _ctx: &mut RuntimeContext) {
            self.updates += 1;
        }

        fn on_interrupt(&mut self, _ctx: &mut RuntimeContext) {
            self.interrupts += 1;
        }

        fn on_frontend_event(&mut self, event: UserInputEvent, _ctx: &mut RuntimeContext) {
            if event == UserInputEvent::ToggleView {
                self.toggles += 1;
            }
        }

        fn is_run_in_progress(&self) -> bool {
            false
        }
    }

    struct ScriptedFrontend {
        events: VecDeque<UserInputEvent>,
        renders: usize,
    }

    impl FrontendAdapter<RecordingMode> for ScriptedFrontend {
        fn poll_user_input(&mut self, _mode: &RecordingMode) -> Option<UserInputEvent> {
            self.events.pop_front()
        }

        fn render(&mut self, _mode: &RecordingMode) {
            self.renders += 1;
        }

        fn should_quit(&self) -> bool {
            self.events.is_empty()
        }
    }

    #[tokio::test]
    async fn events_and_updates_reach_the_mode_before_render() {
        let config = Config {
            server_url: "http://127.0.0.1:9".to_string(),
            stream_url: "ws://127.0.0.1:9/api/rlm/stream".to_string(),
            enable_sub_llm: true,
            connect_timeout: Duration::from_secs(1),
            working_dir: std::env::temp_dir(),
        };
        let (tx, rx) = mpsc::unbounded_channel::<UiUpdate>();
        let mut ctx = RuntimeContext::new(
            ApiClient::new(&config).expect("api client"),
            StreamClient::new_mock(Arc::new(MockChannelClient::new(vec![]))),
            tx.clone(),
        );
        tx.send(UiUpdate::Error("queued".to_string())).unwrap();

        let mut runtime = Runtime::new(RecordingMode::default(), rx);
        let mut frontend = ScriptedFrontend {
            events: VecDeque::from([
                UserInputEvent::Text("hello".to_string()),
                UserInputEvent::ToggleView,
                UserInputEvent::Interrupt,
            ]),
            renders: 0,
        };

        runtime.run(&mut frontend, &mut ctx).await;

        assert_eq!(runtime.mode.inputs, vec!["hello".to_string()]);
        assert_eq!(runtime.mode.toggles, 1);
        assert_eq!(runtime.mode.interrupts, 1);
        assert_eq!(runtime.mode.updates, 1);
        assert_eq!(frontend.renders, 3);
    }
}
