use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use perch_core::protocol::{ClientEvent, ServerEvent};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::ChatClientResult;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live gateway connection. Constructed per session with the
/// credential passed at connect time and dropped on logout, so a stale
/// credential can never ride along into the next session.
pub struct ChatConnection {
    sink: SplitSink<Socket, WsMessage>,
    stream: SplitStream<Socket>,
}

impl ChatConnection {
    /// Dials the gateway. The server verifies the credential during the
    /// handshake; a refused credential surfaces here as a websocket
    /// handshake failure, before any event is exchanged.
    pub async fn connect(gateway_url: &str, token: &str) -> ChatClientResult<Self> {
        let mut request = gateway_url.into_client_request()?;
        request.headers_mut().insert(
            http::header::AUTHORIZATION,
            format!("Bearer {}", token).parse()?,
        );
        debug!("dialing chat gateway at {}", gateway_url);
        let (socket, _response) = connect_async(request).await?;
        let (sink, stream) = socket.split();
        Ok(Self { sink, stream })
    }

    pub async fn send(&mut self, event: &ClientEvent) -> ChatClientResult<()> {
        let json = serde_json::to_string(event)?;
        self.sink.send(WsMessage::Text(json)).await?;
        Ok(())
    }

    /// Yields the next pushed event, or None once the server closed the
    /// connection. Transport housekeeping frames are handled inline.
    pub async fn next_event(&mut self) -> ChatClientResult<Option<ServerEvent>> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                WsMessage::Text(text) => {
                    let event = serde_json::from_str::<ServerEvent>(&text)?;
                    return Ok(Some(event));
                }
                WsMessage::Ping(data) => {
                    self.sink.send(WsMessage::Pong(data)).await?;
                }
                WsMessage::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> ChatClientResult<()> {
        self.sink.close().await?;
        Ok(())
    }
}
