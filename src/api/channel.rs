use crate::config::Config;
use crate::util::is_local_endpoint_url;
use anyhow::{anyhow, Result};
use futures::stream::SplitSink;
use futures::{SinkExt, Stream, StreamExt};
use std::pin::Pin;
use std::string::FromUtf8Error;
#[cfg(test)]
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;
type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// A binary frame whose payload is not UTF-8 text.
#[derive(Debug, Error)]
#[error("binary frame is not valid UTF-8: {0}")]
pub struct UndecodableFrame(#[from] FromUtf8Error);

#[cfg(test)]
pub trait MockChannelProducer: Send + Sync {
    fn open_mock_channel(&self) -> Result<Channel>;
}

/// Opens execution channels against the backend's streaming endpoint.
#[derive(Clone)]
pub struct StreamClient {
    stream_url: String,
    connect_timeout: Duration,
    #[cfg(test)]
    mock_channel_producer: Option<Arc<dyn MockChannelProducer>>,
}

impl StreamClient {
    pub fn new(config: &Config) -> Self {
        Self {
            stream_url: config.stream_url.clone(),
            connect_timeout: config.connect_timeout,
            #[cfg(test)]
            mock_channel_producer: None,
        }
    }

    #[cfg(test)]
    pub fn new_mock(producer: Arc<dyn MockChannelProducer>) -> Self {
        Self {
            stream_url: "ws://localhost:8000/api/rlm/stream".to_string(),
            connect_timeout: Duration::from_secs(1),
            mock_channel_producer: Some(producer),
        }
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    pub async fn open(&self) -> Result<Channel> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_channel_producer {
                return producer.open_mock_channel();
            }
        }

        let url = self.stream_url.as_str();
        tracing::debug!(url, "opening execution channel");
        let (socket, _response) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                anyhow!(
                    "connecting to '{}' timed out after {}s",
                    url,
                    self.connect_timeout.as_secs()
                )
            })?
            .map_err(|error| map_connect_error(error, url))?;

        let (sink, stream) = socket.split();
        let frames = stream.filter_map(|item| async move { frame_text(item) });

        Ok(Channel {
            frames: Box::pin(frames),
            outbound: Outbound::WebSocket(Box::new(sink)),
        })
    }
}

/// Text carried by one inbound message. Control frames and a clean close
/// yield `None`; binary frames must hold UTF-8.
pub(crate) fn frame_text(item: Result<Message, WsError>) -> Option<Result<String>> {
    match item {
        Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
        Ok(Message::Binary(bytes)) => Some(
            String::from_utf8(bytes.to_vec()).map_err(|error| UndecodableFrame(error).into()),
        ),
        Ok(_) => None,
        Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => None,
        Err(error) => Some(Err(anyhow!("execution channel failed: {error}"))),
    }
}

fn map_connect_error(error: WsError, url: &str) -> anyhow::Error {
    if is_local_endpoint_url(url) {
        if let WsError::Io(io_error) = &error {
            return anyhow!(
                "cannot reach local stream endpoint '{}': {}. Start the backend or update RLMSCOPE_STREAM_URL.",
                url,
                io_error
            );
        }
    }
    if let WsError::Http(response) = &error {
        return anyhow!(
            "stream endpoint '{}' rejected the upgrade with HTTP {}",
            url,
            response.status()
        );
    }
    anyhow!("cannot open stream endpoint '{}': {}", url, error)
}

enum Outbound {
    WebSocket(Box<WsSink>),
    #[cfg(test)]
    Recorder(Arc<Mutex<Vec<String>>>),
}

/// One open execution channel: a frame stream plus the outbound half.
pub struct Channel {
    frames: FrameStream,
    outbound: Outbound,
}

impl Channel {
    #[cfg(test)]
    pub fn scripted(frames: FrameStream, sent: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            frames,
            outbound: Outbound::Recorder(sent),
        }
    }

    pub async fn send_text(&mut self, text: String) -> Result<()> {
        match &mut self.outbound {
            Outbound::WebSocket(sink) => sink
                .send(Message::Text(text.into()))
                .await
                .map_err(|error| anyhow!("failed to send on execution channel: {error}")),
            #[cfg(test)]
            Outbound::Recorder(sent) => {
                sent.lock().unwrap().push(text);
                Ok(())
            }
        }
    }

    /// Next text frame; `None` once the peer has closed the channel.
    pub async fn next_frame(&mut self) -> Option<Result<String>> {
        self.frames.next().await
    }

    pub async fn close(mut self) {
        match &mut self.outbound {
            Outbound::WebSocket(sink) => {
                let _ = sink.send(Message::Close(None)).await;
                let _ = sink.close().await;
            }
            #[cfg(test)]
            Outbound::Recorder(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_utf8_binary_frames_yield_text() {
        let text = frame_text(Ok(Message::text(r#"{"type":"final"}"#)));
        assert_eq!(text.unwrap().unwrap(), r#"{"type":"final"}"#);

        let binary = frame_text(Ok(Message::binary("résumé".as_bytes().to_vec())));
        assert_eq!(binary.unwrap().unwrap(), "résumé");
    }

    #[test]
    fn invalid_utf8_binary_frame_is_rejected() {
        let error = frame_text(Ok(Message::binary(vec![0x7b, 0xff, 0xfe])))
            .expect("binary frames are not skipped")
            .unwrap_err();
        assert!(error.downcast_ref::<UndecodableFrame>().is_some(), "{error:#}");
    }

    #[test]
    fn control_frames_and_clean_close_are_skipped() {
        assert!(frame_text(Ok(Message::Ping(Vec::new().into()))).is_none());
        assert!(frame_text(Err(WsError::ConnectionClosed)).is_none());
    }
}
