use crate::api::channel::{frame_text, Channel, MockChannelProducer};
use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex};
use tokio_tungstenite::tungstenite::Message;

/// One scripted channel: the frames it delivers, an optional binary payload
/// after them, and whether it then stays open (never closing) instead of
/// ending.
#[derive(Clone, Default)]
pub struct MockRun {
    pub frames: Vec<String>,
    pub binary: Option<Vec<u8>>,
    pub hold_open: bool,
}

impl MockRun {
    pub fn closing(frames: Vec<String>) -> Self {
        Self {
            frames,
            binary: None,
            hold_open: false,
        }
    }

    pub fn held_open(frames: Vec<String>) -> Self {
        Self {
            frames,
            binary: None,
            hold_open: true,
        }
    }

    /// Text frames followed by one binary frame, decoded as a live channel
    /// would decode it.
    pub fn with_binary(frames: Vec<String>, bytes: Vec<u8>) -> Self {
        Self {
            frames,
            binary: Some(bytes),
            hold_open: false,
        }
    }
}

#[derive(Clone)]
pub struct MockChannelClient {
    runs: Arc<Mutex<Vec<MockRun>>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl MockChannelClient {
    pub fn new(runs: Vec<MockRun>) -> Self {
        Self {
            runs: Arc::new(Mutex::new(runs)),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every text message written to any channel opened by this client.
    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl MockChannelProducer for MockChannelClient {
    fn open_mock_channel(&self) -> Result<Channel> {
        let mut runs = self.runs.lock().unwrap();
        if runs.is_empty() {
            return Err(anyhow::anyhow!(
                "MockChannelClient: No more runs configured"
            ));
        }
        let run = runs.remove(0);

        let binary = run
            .binary
            .and_then(|bytes| frame_text(Ok(Message::binary(bytes))));
        let frames = stream::iter(
            run.frames
                .into_iter()
                .map(Ok::<String, anyhow::Error>)
                .chain(binary),
        );
        let frames = if run.hold_open {
            frames.chain(stream::pending()).boxed()
        } else {
            frames.boxed()
        };

        Ok(Channel::scripted(frames, Arc::clone(&self.sent)))
    }
}
