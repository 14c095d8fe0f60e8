use std::net::SocketAddr;

use async_trait::async_trait;
use rosc::encoder;
use rosc::{OscMessage, OscPacket, OscType};
use scorex_model::StatsSnapshot;
use tokio::net::UdpSocket;
use tokio::sync::OnceCell;
use tracing::trace;

use crate::error::Result;

/// Address for the whole-page object count emitted by a static pass.
pub const ADDR_OBJECT_COUNT: &str = "/image/object_count";

/// Addresses for the per-tick scan burst, in emission order.
pub const ADDR_SCAN_COUNT: &str = "/image/scan_object_count";
pub const ADDR_SCAN_MIN: &str = "/image/scan_min_size";
pub const ADDR_SCAN_AVG: &str = "/image/scan_avg_size";
pub const ADDR_SCAN_MAX: &str = "/image/scan_max_size";

/// Outbound parameter channel the engine emits into.
///
/// Delivery is best effort; implementations report failures but the engine
/// never retries a burst.
#[async_trait]
pub trait ParameterSink: Send + Sync {
    /// Emit the whole-page object count from a static pass.
    async fn send_static(&self, count: usize) -> Result<()>;

    /// Emit one scan tick's statistics as an ordered burst:
    /// count, min, avg, max.
    async fn send_scan(&self, snapshot: &StatsSnapshot) -> Result<()>;
}

/// UDP transmitter speaking OSC 1.0, one message per datagram.
///
/// The socket is bound lazily on first use so constructing a transmitter is
/// infallible and cheap.
#[derive(Debug)]
pub struct OscTransmitter {
    destination: SocketAddr,
    socket: OnceCell<UdpSocket>,
}

impl OscTransmitter {
    pub fn new(destination: SocketAddr) -> Self {
        Self {
            destination,
            socket: OnceCell::new(),
        }
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    async fn socket(&self) -> Result<&UdpSocket> {
        self.socket
            .get_or_try_init(|| async {
                let socket = UdpSocket::bind("0.0.0.0:0").await?;
                socket.connect(self.destination).await?;
                Ok(socket)
            })
            .await
    }

    async fn send(&self, addr: &str, arg: OscType) -> Result<()> {
        let packet = OscPacket::Message(OscMessage {
            addr: addr.to_owned(),
            args: vec![arg],
        });
        let bytes = encoder::encode(&packet)?;
        self.socket().await?.send(&bytes).await?;
        trace!(%addr, "sent parameter");
        Ok(())
    }
}

#[async_trait]
impl ParameterSink for OscTransmitter {
    async fn send_static(&self, count: usize) -> Result<()> {
        self.send(ADDR_OBJECT_COUNT, OscType::Int(count as i32)).await
    }

    async fn send_scan(&self, snapshot: &StatsSnapshot) -> Result<()> {
        self.send(ADDR_SCAN_COUNT, OscType::Int(snapshot.count as i32))
            .await?;
        self.send(ADDR_SCAN_MIN, OscType::Float(snapshot.min_size))
            .await?;
        self.send(ADDR_SCAN_AVG, OscType::Float(snapshot.avg_size))
            .await?;
        self.send(ADDR_SCAN_MAX, OscType::Float(snapshot.max_size))
            .await?;
        Ok(())
    }
}
