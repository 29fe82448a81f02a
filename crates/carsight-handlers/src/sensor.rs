//! Shared plumbing for handlers backed by a simulator sensor.
//!
//! A [`SensorFeed`] owns the receiving end of one sensor's channel. It
//! supports the two consumption patterns the handlers need: waiting for
//! the newest reading of a given frame (cameras, lidar) and draining
//! every pending event (collisions).

use std::time::{Duration, Instant};

use carsight_core::{
    ActorId, ConfigError, FrameId, HandlerError, SensorBlueprint, SensorError, SensorId,
    SensorReading, SensorStream, World,
};
use crossbeam_channel::{RecvTimeoutError, TryRecvError};
use tracing::{debug, trace};

/// Spawn `blueprint` on the world's ego actor.
pub fn spawn_on_ego(
    world: &dyn World,
    blueprint: &SensorBlueprint,
) -> Result<(ActorId, SensorStream), ConfigError> {
    let ego = world.ego().ok_or(SensorError::NoEgo)?;
    let stream = world.spawn_sensor(blueprint, ego)?;
    debug!(sensor = %stream.id, parent = %ego, kind = ?blueprint.kind, "sensor spawned");
    Ok((ego, stream))
}

/// Receiving side of one sensor, with a cached newest reading.
#[derive(Debug)]
pub struct SensorFeed {
    stream: SensorStream,
    latest: Option<SensorReading>,
    timeout: Duration,
    connected: bool,
}

impl SensorFeed {
    /// Wrap a stream. `timeout` bounds [`await_frame`](Self::await_frame).
    pub fn new(stream: SensorStream, timeout: Duration) -> Self {
        Self {
            stream,
            latest: None,
            timeout,
            connected: true,
        }
    }

    /// The sensor this feed reads from.
    pub fn id(&self) -> SensorId {
        self.stream.id
    }

    /// Drop the cached reading and everything queued.
    pub fn clear(&mut self) {
        self.latest = None;
        let stale = self.stream.receiver.try_iter().count();
        if stale > 0 {
            debug!(sensor = %self.stream.id, stale, "discarded queued readings");
        }
    }

    /// Take every queued reading without blocking.
    ///
    /// Fails only if the channel is closed and nothing was queued.
    pub fn drain(&mut self) -> Result<Vec<SensorReading>, HandlerError> {
        let mut readings = Vec::new();
        loop {
            match self.stream.receiver.try_recv() {
                Ok(r) => readings.push(r),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.connected = false;
                    if readings.is_empty() {
                        return Err(self.disconnected());
                    }
                    break;
                }
            }
        }
        Ok(readings)
    }

    /// Newest reading captured on or after `frame`.
    ///
    /// Older readings are skipped. Blocks for at most the feed timeout
    /// when nothing fresh is queued.
    pub fn await_frame(&mut self, frame: FrameId) -> Result<&SensorReading, HandlerError> {
        while let Ok(r) = self.stream.receiver.try_recv() {
            self.latest = Some(r);
        }
        let start = Instant::now();
        let deadline = start + self.timeout;
        loop {
            let fresh = self.latest.as_ref().is_some_and(|r| r.frame() >= frame);
            if fresh {
                break;
            }
            if let Some(stale) = &self.latest {
                trace!(sensor = %self.stream.id, have = %stale.frame(), want = %frame, "stale reading");
            }
            match self.stream.receiver.recv_deadline(deadline) {
                Ok(r) => self.latest = Some(r),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(HandlerError::SensorTimeout {
                        sensor: self.stream.id,
                        waited_ms: start.elapsed().as_millis() as u64,
                    })
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.connected = false;
                    return Err(self.disconnected());
                }
            }
        }
        self.latest.as_ref().ok_or(HandlerError::SensorTimeout {
            sensor: self.stream.id,
            waited_ms: 0,
        })
    }

    /// Whether the world still holds the sending side, as of the last read.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn disconnected(&self) -> HandlerError {
        HandlerError::SensorDisconnected {
            sensor: self.stream.id,
        }
    }
}
