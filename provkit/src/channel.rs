//! Report channel
//!
//! The deliver-and-await primitive every higher layer is built on. The
//! transport is a lossy polling interface: a reply can be dropped, and a
//! command may have been applied device-side even when no matching reply
//! arrives. Callers must treat delivery as at-least-once.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::{trace, warn};

use provkit_core::frame::{fragment, Reassembler};
use provkit_core::{CancelToken, Report};
use provkit_transport::Transport;

use crate::error::{Error, Result};

/// Serialized access to one device handle
///
/// Response matching relies on no other writer intervening between a write
/// and its matching read, so every exchange holds the transport lock for
/// its full duration.
pub struct ReportChannel {
    transport: Mutex<Box<dyn Transport>>,
    cancel: CancelToken,
}

impl ReportChannel {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport: Mutex::new(transport),
            cancel: CancelToken::new(),
        }
    }

    /// Token checked between polling attempts of interruptible exchanges
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn description(&self) -> String {
        self.transport.lock().description()
    }

    /// Fire-and-forget write of a single report
    pub fn write(&self, report: &Report) -> Result<()> {
        self.transport.lock().write(report)?;
        Ok(())
    }

    /// Write `report`, then poll reads up to `attempts` times, each bounded
    /// by `per_attempt`; the first report satisfying `matcher` wins.
    ///
    /// Returns [`Error::Timeout`] after exactly `attempts` unmatched polls.
    /// Cancellation is honored between polls.
    pub fn deliver_and_await(
        &self,
        report: &Report,
        matcher: impl Fn(&Report) -> bool,
        attempts: usize,
        per_attempt: Duration,
    ) -> Result<Report> {
        self.exchange(report, matcher, attempts, per_attempt, true)
    }

    /// Like [`Self::deliver_and_await`], but never interrupted by the
    /// cancellation token. Used for fuse-burning commands, where breaking
    /// off mid-exchange would leave device state unknown.
    pub fn deliver_and_await_uninterruptible(
        &self,
        report: &Report,
        matcher: impl Fn(&Report) -> bool,
        attempts: usize,
        per_attempt: Duration,
    ) -> Result<Report> {
        self.exchange(report, matcher, attempts, per_attempt, false)
    }

    fn exchange(
        &self,
        report: &Report,
        matcher: impl Fn(&Report) -> bool,
        attempts: usize,
        per_attempt: Duration,
        interruptible: bool,
    ) -> Result<Report> {
        let mut transport = self.transport.lock();

        if interruptible && self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        transport.write(report)?;

        for attempt in 0..attempts {
            if interruptible && attempt > 0 && self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            if let Some(reply) = transport.read(per_attempt)? {
                if matcher(&reply) {
                    trace!(attempt, "matching reply");
                    return Ok(reply);
                }
                trace!(attempt, "discarding unmatched reply");
            }
        }

        warn!(attempts, "no matching reply within attempt budget");
        Err(Error::Timeout { attempts })
    }

    /// Framed exchange: fragment an outbound message, deliver all frames,
    /// and reassemble the framed response for `reply_cmd` on `cid`.
    ///
    /// Inbound frames are drained between outbound writes so the device's
    /// report buffer cannot overflow on long messages.
    pub fn framed_exchange(
        &self,
        cid: u32,
        cmd: u8,
        payload: &[u8],
        reply_cmd: u8,
        attempts: usize,
        per_attempt: Duration,
    ) -> Result<Vec<u8>> {
        let reports = fragment(cid, cmd, payload)?;
        let mut asm = Reassembler::new(cid, reply_cmd);

        let mut transport = self.transport.lock();

        let mut iter = reports.iter();
        // The init frame goes out before any read
        if let Some(first) = iter.next() {
            transport.write(first)?;
        }
        for report in iter {
            transport.write(report)?;
            // Opportunistic drain, no blocking
            if !asm.is_complete() {
                if let Some(reply) = transport.read(Duration::ZERO)? {
                    asm.push(&reply)?;
                }
            }
        }

        let mut idle = 0usize;
        while !asm.is_complete() {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            match transport.read(per_attempt)? {
                Some(reply) => {
                    idle = 0;
                    asm.push(&reply)?;
                }
                None => {
                    idle += 1;
                    if idle >= attempts {
                        return Err(Error::Timeout { attempts });
                    }
                }
            }
        }

        Ok(asm.into_message()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct MockTransport {
        replies: VecDeque<Option<Report>>,
        reads: usize,
        writes: usize,
    }

    impl MockTransport {
        fn new(replies: Vec<Option<Report>>) -> Self {
            Self {
                replies: replies.into(),
                reads: 0,
                writes: 0,
            }
        }
    }

    impl Transport for MockTransport {
        fn write(&mut self, _report: &Report) -> provkit_transport::Result<()> {
            self.writes += 1;
            Ok(())
        }

        fn read(
            &mut self,
            _timeout: Duration,
        ) -> provkit_transport::Result<Option<Report>> {
            self.reads += 1;
            Ok(self.replies.pop_front().unwrap_or(None))
        }

        fn description(&self) -> String {
            "mock".into()
        }
    }

    fn report(bytes: &[u8]) -> Report {
        Report::from_payload(bytes).unwrap()
    }

    #[test]
    fn test_timeout_after_exact_attempt_count() {
        // Replies present but never matching
        let noise = (0..10).map(|_| Some(report(&[0x42]))).collect();
        let channel = ReportChannel::new(Box::new(MockTransport::new(noise)));

        let err = channel
            .deliver_and_await(
                &report(&[0x81]),
                |r| r.command_byte() == 0x81,
                4,
                Duration::from_millis(1),
            )
            .unwrap_err();

        assert!(matches!(err, Error::Timeout { attempts: 4 }));
    }

    #[test]
    fn test_match_on_later_attempt() {
        let replies = vec![
            None,
            Some(report(&[0x42])),
            Some(report(&[0x81, 1])),
        ];
        let channel = ReportChannel::new(Box::new(MockTransport::new(replies)));

        let reply = channel
            .deliver_and_await(
                &report(&[0x81]),
                |r| r.command_byte() == 0x81,
                5,
                Duration::from_millis(1),
            )
            .unwrap();

        assert_eq!(reply.status_byte(), 1);
    }

    #[test]
    fn test_cancellation_between_polls() {
        let channel = ReportChannel::new(Box::new(MockTransport::new(vec![None; 10])));
        channel.cancel_token().cancel();

        let err = channel
            .deliver_and_await(&report(&[0x81]), |_| true, 5, Duration::from_millis(1))
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_uninterruptible_ignores_cancel() {
        let replies = vec![Some(report(&[0x83, 1]))];
        let channel = ReportChannel::new(Box::new(MockTransport::new(replies)));
        channel.cancel_token().cancel();

        let reply = channel
            .deliver_and_await_uninterruptible(
                &report(&[0x83]),
                |r| r.command_byte() == 0x83,
                5,
                Duration::from_millis(1),
            )
            .unwrap();
        assert_eq!(reply.status_byte(), 1);
    }
}
