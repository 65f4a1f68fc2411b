//! Logical-message framing over fixed-size reports
//!
//! # Frame structure
//!
//! ```text
//! Initialization frame          Continuation frame
//! ┌──────┬─────┬────────┬────┐  ┌──────┬─────┬──────┐
//! │ CID  │ cmd │ len_be │... │  │ CID  │ seq │ ...  │
//! │ 4 B  │ 1 B │  2 B   │57 B│  │ 4 B  │ 1 B │ 59 B │
//! └──────┴─────┴────────┴────┘  └──────┴─────┴──────┘
//! ```
//!
//! The cmd byte of an initialization frame has the top bit set (>= 0x80);
//! continuation sequence numbers start at 0 and stay below 0x80, which is
//! how the two frame kinds are told apart on the wire.

use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::error::{Error, Result};
use crate::report::Report;
use crate::{CONT_DATA_SIZE, INIT_DATA_SIZE, REPORT_SIZE};

/// Largest logical message the codec will carry: one init frame plus
/// continuation frames for every sequence number below 0x80.
pub const MAX_MESSAGE_SIZE: usize = INIT_DATA_SIZE + 0x80 * CONT_DATA_SIZE;

/// One unit of the framing protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Carries the command byte, the total message length, and the first
    /// chunk of payload
    Init {
        cid: u32,
        cmd: u8,
        total_len: u16,
        data: Vec<u8>,
    },
    /// Carries the next chunk of payload under an incrementing sequence byte
    Cont { cid: u32, seq: u8, data: Vec<u8> },
}

impl Frame {
    /// Parse one received report into a frame
    ///
    /// Initialization vs continuation is decided by bit 7 of byte 4.
    pub fn parse(report: &Report) -> Result<Self> {
        let raw = report.as_bytes();
        let cid = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let marker = raw[4];

        if marker & 0x80 != 0 {
            let total_len = u16::from_be_bytes([raw[5], raw[6]]);
            let take = (total_len as usize).min(INIT_DATA_SIZE);
            Ok(Self::Init {
                cid,
                cmd: marker,
                total_len,
                data: raw[7..7 + take].to_vec(),
            })
        } else {
            Ok(Self::Cont {
                cid,
                seq: marker,
                data: raw[5..].to_vec(),
            })
        }
    }

    /// Encode this frame into a report
    pub fn encode(&self) -> Result<Report> {
        let mut buf = BytesMut::with_capacity(REPORT_SIZE);
        match self {
            Self::Init {
                cid,
                cmd,
                total_len,
                data,
            } => {
                buf.put_u32(*cid);
                buf.put_u8(*cmd);
                buf.put_u16(*total_len);
                buf.put_slice(data);
            }
            Self::Cont { cid, seq, data } => {
                buf.put_u32(*cid);
                buf.put_u8(*seq);
                buf.put_slice(data);
            }
        }
        Report::from_payload(&buf)
    }

    /// Channel identifier carried by the frame
    pub fn cid(&self) -> u32 {
        match self {
            Self::Init { cid, .. } | Self::Cont { cid, .. } => *cid,
        }
    }
}

/// Fragment a logical message into an initialization frame plus as many
/// continuation frames as the payload needs.
///
/// `cmd` must have the top bit set; continuation sequence numbers count up
/// from 0.
pub fn fragment(cid: u32, cmd: u8, payload: &[u8]) -> Result<Vec<Report>> {
    debug_assert!(cmd & 0x80 != 0, "init command byte must have bit 7 set");

    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(Error::MessageTooLarge {
            len: payload.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let first = payload.len().min(INIT_DATA_SIZE);
    let mut reports = vec![Frame::Init {
        cid,
        cmd,
        total_len: payload.len() as u16,
        data: payload[..first].to_vec(),
    }
    .encode()?];

    let mut offset = first;
    let mut seq: u8 = 0;
    while offset < payload.len() {
        let chunk = (payload.len() - offset).min(CONT_DATA_SIZE);
        reports.push(
            Frame::Cont {
                cid,
                seq,
                data: payload[offset..offset + chunk].to_vec(),
            }
            .encode()?,
        );
        offset += chunk;
        seq += 1;
    }

    trace!(
        cid = format!("0x{cid:08X}"),
        cmd = format!("0x{cmd:02X}"),
        len = payload.len(),
        frames = reports.len(),
        "fragmented message"
    );

    Ok(reports)
}

/// Reassembles one inbound logical message from a sequence of reports
///
/// The total length is learned from the initialization frame; every frame's
/// cmd/seq byte must equal the expected next value, otherwise the read is
/// aborted with [`Error::FrameSequenceMismatch`].
#[derive(Debug)]
pub struct Reassembler {
    cid: u32,
    expect: u8,
    total: Option<usize>,
    buf: Vec<u8>,
}

impl Reassembler {
    /// Start reassembly of a response to `cmd` on channel `cid`
    pub fn new(cid: u32, cmd: u8) -> Self {
        Self {
            cid,
            expect: cmd,
            total: None,
            buf: Vec::new(),
        }
    }

    /// Feed one received report; returns `true` once the message is complete
    pub fn push(&mut self, report: &Report) -> Result<bool> {
        let frame = Frame::parse(report)?;

        if frame.cid() != self.cid {
            return Err(Error::ChannelMismatch {
                expected: self.cid,
                actual: frame.cid(),
            });
        }

        match (&frame, self.total) {
            (Frame::Init { cmd, total_len, data, .. }, None) => {
                if *cmd != self.expect {
                    return Err(Error::FrameSequenceMismatch {
                        expected: self.expect,
                        actual: *cmd,
                    });
                }
                let total = *total_len as usize;
                if total > MAX_MESSAGE_SIZE {
                    return Err(Error::MessageTooLarge {
                        len: total,
                        max: MAX_MESSAGE_SIZE,
                    });
                }
                self.total = Some(total);
                self.buf.extend_from_slice(&data[..data.len().min(total)]);
                // Continuations count from 0
                self.expect = 0;
            }
            (Frame::Cont { seq, data, .. }, Some(total)) => {
                if self.buf.len() >= total {
                    return Err(Error::UnexpectedFrame { total });
                }
                if *seq != self.expect {
                    return Err(Error::FrameSequenceMismatch {
                        expected: self.expect,
                        actual: *seq,
                    });
                }
                let need = total - self.buf.len();
                self.buf.extend_from_slice(&data[..data.len().min(need)]);
                self.expect += 1;
            }
            // Cont before init, or a second init mid-message
            (frame, _) => {
                let actual = match frame {
                    Frame::Init { cmd, .. } => *cmd,
                    Frame::Cont { seq, .. } => *seq,
                };
                return Err(Error::FrameSequenceMismatch {
                    expected: self.expect,
                    actual,
                });
            }
        }

        Ok(self.is_complete())
    }

    /// Check whether the declared message length has been satisfied
    pub fn is_complete(&self) -> bool {
        self.total.is_some_and(|t| self.buf.len() >= t)
    }

    /// Consume the reassembler and yield the message bytes
    pub fn into_message(self) -> Result<Vec<u8>> {
        match self.total {
            Some(total) if self.buf.len() >= total => Ok(self.buf),
            Some(total) => Err(Error::FrameTooShort {
                expected: total,
                actual: self.buf.len(),
            }),
            None => Err(Error::FrameTooShort {
                expected: 1,
                actual: 0,
            }),
        }
    }
}

/// Strip device padding from the end of a reassembled message.
///
/// Drops trailing zero bytes, but never below `original_len`, so genuine
/// zero bytes inside the payload the caller sent are preserved.
pub fn trim_padding(data: &mut Vec<u8>, original_len: usize) {
    while data.len() > original_len && data.last() == Some(&0) {
        data.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const CID: u32 = 0x1234_5678;
    const CMD: u8 = 0x81;

    fn roundtrip(payload: &[u8]) -> Vec<u8> {
        let reports = fragment(CID, CMD, payload).unwrap();
        let mut asm = Reassembler::new(CID, CMD);
        for report in &reports {
            asm.push(report).unwrap();
        }
        assert!(asm.is_complete());
        asm.into_message().unwrap()
    }

    #[test]
    fn test_roundtrip_boundary_lengths() {
        for len in [0usize, 1, 56, 57, 58, 300, 4096] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251 + 1) as u8).collect();
            assert_eq!(roundtrip(&payload), payload, "len={len}");
        }
    }

    #[test]
    fn test_frame_counts() {
        assert_eq!(fragment(CID, CMD, &[0xAA; 57]).unwrap().len(), 1);
        assert_eq!(fragment(CID, CMD, &[0xAA; 58]).unwrap().len(), 2);
        assert_eq!(fragment(CID, CMD, &[0xAA; 57 + 59]).unwrap().len(), 2);
        assert_eq!(fragment(CID, CMD, &[0xAA; 57 + 59 + 1]).unwrap().len(), 3);
    }

    #[test]
    fn test_sequence_skip_rejected() {
        let reports = fragment(CID, CMD, &vec![0x11; 300]).unwrap();
        let mut asm = Reassembler::new(CID, CMD);
        asm.push(&reports[0]).unwrap();
        asm.push(&reports[1]).unwrap();
        // Skip seq 1, deliver seq 2
        let err = asm.push(&reports[3]).unwrap_err();
        assert!(matches!(
            err,
            Error::FrameSequenceMismatch {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_wrong_command_rejected() {
        let reports = fragment(CID, 0x86, &[1, 2, 3]).unwrap();
        let mut asm = Reassembler::new(CID, CMD);
        let err = asm.push(&reports[0]).unwrap_err();
        assert!(matches!(
            err,
            Error::FrameSequenceMismatch {
                expected: 0x81,
                actual: 0x86
            }
        ));
    }

    #[test]
    fn test_continuation_before_init_rejected() {
        let reports = fragment(CID, CMD, &vec![0x22; 120]).unwrap();
        let mut asm = Reassembler::new(CID, CMD);
        assert!(asm.push(&reports[1]).is_err());
    }

    #[test]
    fn test_foreign_channel_rejected() {
        let reports = fragment(0xDEAD_BEEF, CMD, &[1, 2, 3]).unwrap();
        let mut asm = Reassembler::new(CID, CMD);
        assert!(matches!(
            asm.push(&reports[0]),
            Err(Error::ChannelMismatch { .. })
        ));
    }

    #[test]
    fn test_trim_padding_preserves_genuine_zeros() {
        // Caller sent 5 bytes ending in zeros; device padded up to 8
        let mut data = vec![1, 2, 3, 0, 0, 0, 0, 0];
        trim_padding(&mut data, 5);
        assert_eq!(data, vec![1, 2, 3, 0, 0]);
    }

    #[test]
    fn test_trim_padding_stops_at_data() {
        let mut data = vec![1, 2, 3, 4, 0, 0];
        trim_padding(&mut data, 2);
        assert_eq!(data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_message_too_large() {
        let payload = vec![0u8; MAX_MESSAGE_SIZE + 1];
        assert!(matches!(
            fragment(CID, CMD, &payload),
            Err(Error::MessageTooLarge { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_fragment_reassemble_identity(payload in proptest::collection::vec(any::<u8>(), 0..2048)) {
            prop_assert_eq!(roundtrip(&payload), payload);
        }
    }
}
