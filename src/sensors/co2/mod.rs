//! MH-Z19 CO2 sensor protocol driver.
//!
//! The sensor sits on a half-duplex UART: one request goes out, one 9-byte
//! response comes back some time later.  [`Co2Driver::step`] is called once
//! per scheduler pass and makes at most one decision, so the caller never
//! blocks on the serial line.
//!
//! ```text
//!            now >= next_poll_due
//!   ┌──────┐ ───────────────────────▶ ┌──────────────────┐
//!   │ Idle │                          │ AwaitingResponse │
//!   └──────┘ ◀─────────────────────── └──────────────────┘
//!        Ok / ChecksumError / Filtered     (normal interval)
//!        Desync / Timeout / NoResponse     (recovery delay)
//! ```
//!
//! Every terminal outcome updates the published [`Co2Reading`]. Fault
//! outcomes only change `result` and `updated_at_ms`; the concentration and
//! temperature keep their last good values.

pub mod frame;

use log::{debug, warn};

use crate::app::ports::ByteChannel;
use crate::app::state::{Co2Reading, ResultCode};
use crate::config::SystemConfig;

use frame::{Command, FRAME_LEN, FrameError};

/// Timing and plausibility parameters for the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Co2Timing {
    pub poll_interval_ms: u64,
    pub response_timeout_ms: u64,
    /// Added to `poll_interval_ms` after a timeout, desync or transport error.
    pub recovery_extra_ms: u64,
    pub warmup_ms: u64,
    pub max_plausible_ppm: u16,
}

impl Co2Timing {
    pub fn recovery_delay_ms(&self) -> u64 {
        self.poll_interval_ms + self.recovery_extra_ms
    }
}

impl From<&SystemConfig> for Co2Timing {
    fn from(c: &SystemConfig) -> Self {
        Self {
            poll_interval_ms: u64::from(c.co2_poll_interval_ms),
            response_timeout_ms: u64::from(c.co2_response_timeout_ms),
            recovery_extra_ms: u64::from(c.co2_recovery_extra_ms),
            warmup_ms: u64::from(c.co2_warmup_ms),
            max_plausible_ppm: c.co2_max_plausible_ppm,
        }
    }
}

impl Default for Co2Timing {
    fn default() -> Self {
        Self::from(&SystemConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

/// Request/response bookkeeping.  Reset in place on every outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolSession {
    pub state: SessionState,
    pub request_sent_at_ms: u64,
    pub next_poll_due_at_ms: u64,
}

/// What a single [`Co2Driver::step`] call did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Co2Step {
    /// Nothing due, or still waiting for the response.
    Idle,
    /// A concentration request was written.
    RequestSent,
    /// A queued fire-and-forget command was written.
    CommandSent(Command),
    /// The cycle finished; carries the published reading.
    Completed(Co2Reading),
}

/// Owns the serial channel and the request/response state machine.
pub struct Co2Driver<C: ByteChannel> {
    channel: C,
    timing: Co2Timing,
    session: ProtocolSession,
    reading: Co2Reading,
    started_at_ms: u64,
    /// One slot for a command that expects no reply.
    queued: Option<Command>,
}

impl<C: ByteChannel> Co2Driver<C> {
    /// Create a driver whose first request is due immediately.
    pub fn new(channel: C, timing: Co2Timing, now_ms: u64) -> Self {
        Self {
            channel,
            timing,
            session: ProtocolSession {
                state: SessionState::Idle,
                request_sent_at_ms: 0,
                next_poll_due_at_ms: now_ms,
            },
            reading: Co2Reading::default(),
            started_at_ms: now_ms,
            queued: None,
        }
    }

    /// Latest published reading.
    pub fn reading(&self) -> Co2Reading {
        self.reading
    }

    pub fn session(&self) -> ProtocolSession {
        self.session
    }

    /// Borrow the underlying channel (used by tests to inspect traffic).
    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn is_warming_up(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.started_at_ms) < self.timing.warmup_ms
    }

    /// Queue a fire-and-forget command for the next idle step.
    ///
    /// Returns `false` if the slot is taken or the command expects a reply
    /// (concentration reads are scheduled by the driver itself).
    pub fn queue_command(&mut self, cmd: Command) -> bool {
        if cmd.expects_response() || self.queued.is_some() {
            return false;
        }
        self.queued = Some(cmd);
        true
    }

    /// Advance the state machine by one decision.
    pub fn step(&mut self, now_ms: u64) -> Co2Step {
        match self.session.state {
            SessionState::Idle => self.step_idle(now_ms),
            SessionState::AwaitingResponse => self.step_awaiting(now_ms),
        }
    }

    fn step_idle(&mut self, now_ms: u64) -> Co2Step {
        if let Some(cmd) = self.queued.take() {
            let bytes = frame::encode_command(cmd);
            if let Err(e) = self.channel.write_frame(&bytes) {
                warn!("CO2: command 0x{:02X} not sent: {}", cmd.code(), e);
            }
            return Co2Step::CommandSent(cmd);
        }

        if now_ms < self.session.next_poll_due_at_ms {
            return Co2Step::Idle;
        }

        let request = frame::encode_command(Command::ReadConcentration);
        match self.channel.write_frame(&request) {
            Ok(()) => {
                self.session.state = SessionState::AwaitingResponse;
                self.session.request_sent_at_ms = now_ms;
                Co2Step::RequestSent
            }
            Err(e) => {
                warn!("CO2: request write failed: {}", e);
                self.fail(now_ms, ResultCode::NoResponse)
            }
        }
    }

    fn step_awaiting(&mut self, now_ms: u64) -> Co2Step {
        if self.channel.available() >= FRAME_LEN {
            let mut buf = [0u8; FRAME_LEN];
            if let Err(e) = self.channel.read_exact(&mut buf) {
                warn!("CO2: response read failed: {}", e);
                return self.fail(now_ms, ResultCode::NoResponse);
            }
            return match frame::decode_response(&buf) {
                Ok(f) if f.ppm > self.timing.max_plausible_ppm => {
                    debug!("CO2: dropping implausible {} ppm", f.ppm);
                    self.finish(now_ms, ResultCode::Filtered, self.timing.poll_interval_ms)
                }
                Ok(f) => {
                    self.reading.ppm = f.ppm;
                    self.reading.temperature_c = f.temperature_c;
                    self.reading.sampled = true;
                    self.reading.sample_time_ms = now_ms;
                    self.finish(now_ms, ResultCode::Ok, self.timing.poll_interval_ms)
                }
                Err(FrameError::BadHeader) => self.fail(now_ms, ResultCode::Desync),
                Err(e @ FrameError::BadChecksum { .. }) => {
                    debug!("CO2: {}", e);
                    self.finish(now_ms, ResultCode::ChecksumError, self.timing.poll_interval_ms)
                }
            };
        }

        if now_ms.saturating_sub(self.session.request_sent_at_ms) < self.timing.response_timeout_ms {
            return Co2Step::Idle;
        }
        self.fail(now_ms, ResultCode::Timeout)
    }

    /// Flush the receive side and back off for the recovery delay.
    fn fail(&mut self, now_ms: u64, result: ResultCode) -> Co2Step {
        self.channel.discard_buffered();
        self.finish(now_ms, result, self.timing.recovery_delay_ms())
    }

    fn finish(&mut self, now_ms: u64, result: ResultCode, delay_ms: u64) -> Co2Step {
        self.session.state = SessionState::Idle;
        self.session.next_poll_due_at_ms = now_ms + delay_ms;
        self.reading.result = result;
        self.reading.updated_at_ms = now_ms;
        self.reading.warming_up = self.is_warming_up(now_ms);
        Co2Step::Completed(self.reading)
    }
}
