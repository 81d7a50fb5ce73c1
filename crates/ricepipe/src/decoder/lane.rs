//! Per-lane group decoder.
//!
//! A lane owns one group at a time. It fetches the group's metadata record,
//! streams cache chunks into its accumulator, reads the mode flag once and
//! then emits one weight per decode step until `group_size` weights are out.
//!
//! ```text
//!  Idle ─start─▶ FetchMeta ─▶ FetchStream ─▶ ParseFlag ─▶ DecodeExec ◀─▶ DecodePost
//!   ▲                              ▲                         │  │
//!   │                              └──── < max symbol ───────┘  │
//!   └─────────── ack ──────────── Done ◀──── group complete ────┘
//! ```
//!
//! Requests are derived from the registered state ([`GroupDecoder::meta_request`],
//! [`GroupDecoder::stream_request`]); the bank arbitrates them and feeds
//! grants and responses back through [`LaneInputs`] on the next step.

use ricepipe_core::{
    CodingMode, DecodePath, DecodeTiming, DecoderConfig, Error, MetaRecord, MODE_FLAG_BITS,
};
use ricepipe_rice::{reconstruct, stream_order, BitAccumulator, SymbolCodec};
use tracing::{trace, warn};

/// Lane state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    /// Waiting for a group.
    Idle,
    /// Requesting or awaiting the group's metadata record.
    FetchMeta,
    /// Requesting or awaiting a cache chunk.
    FetchStream,
    /// Reading the 2-bit mode flag.
    ParseFlag,
    /// Decoding the next symbol.
    DecodeExec,
    /// Writing back a latched symbol (split timing only).
    DecodePost,
    /// Group finished, waiting for acknowledge.
    Done,
}

impl LaneState {
    /// State name for logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            LaneState::Idle => "idle",
            LaneState::FetchMeta => "fetch_meta",
            LaneState::FetchStream => "fetch_stream",
            LaneState::ParseFlag => "parse_flag",
            LaneState::DecodeExec => "decode_exec",
            LaneState::DecodePost => "decode_post",
            LaneState::Done => "done",
        }
    }
}

/// A group handed to a lane, with its wave index within the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneStart {
    pub group: u32,
    pub wave: u32,
}

/// Everything a lane samples in one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaneInputs {
    /// Start (from Idle) or next group (alongside `ack`, from Done).
    pub start: Option<LaneStart>,
    /// Acknowledge of a finished group.
    pub ack: bool,
    /// The metadata request was granted this tick.
    pub meta_grant: bool,
    /// The cache request was granted this tick.
    pub stream_grant: bool,
    /// Metadata response due this tick.
    pub meta_data: Option<MetaRecord>,
    /// Cache word (little-endian) due this tick.
    pub stream_data: Option<u64>,
}

/// One decoded weight leaving a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightWrite {
    pub wave: u32,
    pub offset: usize,
    pub weight: u8,
    pub path: DecodePath,
}

/// What a lane produced in one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneOutputs {
    /// Zero point latched from the metadata record, with the wave index.
    pub zero_point: Option<(u32, u8)>,
    /// Weight write-back.
    pub weight: Option<WeightWrite>,
    /// The group was truncated by a codec error this tick.
    pub fault: bool,
}

/// A group truncated by an invalid symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneFault {
    pub lane: usize,
    pub group: u32,
    /// Weights written before the fault.
    pub decoded: usize,
    pub error: Error,
}

/// One decode lane.
#[derive(Debug, Clone)]
pub struct GroupDecoder {
    lane: usize,
    group_size: usize,
    max_symbol_bits: u32,
    chunk_bytes: usize,
    timing: DecodeTiming,

    state: LaneState,
    /// A granted request is awaiting its response.
    pending: bool,
    group: u32,
    wave: u32,
    offset: u32,
    zero_point: u8,
    mode: Option<CodingMode>,
    decoded: usize,
    acc: BitAccumulator,
    latched: Option<WeightWrite>,
    fault: Option<LaneFault>,
}

impl GroupDecoder {
    /// Create lane `lane` for a validated configuration.
    pub fn new(lane: usize, config: &DecoderConfig) -> Self {
        Self {
            lane,
            group_size: config.group_size,
            max_symbol_bits: config.max_symbol_bits(),
            chunk_bytes: config.chunk_bytes,
            timing: config.timing,
            state: LaneState::Idle,
            pending: false,
            group: 0,
            wave: 0,
            offset: 0,
            zero_point: 0,
            mode: None,
            decoded: 0,
            acc: BitAccumulator::new(),
            latched: None,
            fault: None,
        }
    }

    /// Lane index.
    pub fn lane(&self) -> usize {
        self.lane
    }

    /// Current state.
    pub fn state(&self) -> LaneState {
        self.state
    }

    /// Group currently (or last) owned.
    pub fn group(&self) -> u32 {
        self.group
    }

    /// Weights emitted for the current group.
    pub fn decoded(&self) -> usize {
        self.decoded
    }

    /// Mode read from the current group's flag.
    pub fn mode(&self) -> Option<CodingMode> {
        self.mode
    }

    /// Whether the lane holds a finished group.
    pub fn is_finished(&self) -> bool {
        self.state == LaneState::Done
    }

    /// Whether the lane has no group.
    pub fn is_idle(&self) -> bool {
        self.state == LaneState::Idle
    }

    /// Fault recorded for the group held in Done, if it was truncated.
    pub fn fault(&self) -> Option<&LaneFault> {
        self.fault.as_ref()
    }

    /// Group id to read from the metadata table this tick.
    pub fn meta_request(&self) -> Option<u32> {
        (self.state == LaneState::FetchMeta && !self.pending).then_some(self.group)
    }

    /// Byte offset to read from the cache this tick.
    pub fn stream_request(&self) -> Option<u32> {
        (self.state == LaneState::FetchStream && !self.pending).then_some(self.offset)
    }

    /// Advance one tick.
    pub fn step(&mut self, inputs: &LaneInputs, codec: &SymbolCodec) -> LaneOutputs {
        let mut out = LaneOutputs::default();

        match self.state {
            LaneState::Idle => {
                if let Some(start) = inputs.start {
                    self.begin(start);
                }
            }

            LaneState::FetchMeta => {
                if inputs.meta_grant {
                    self.pending = true;
                }
                if let Some(record) = inputs.meta_data {
                    self.offset = record.byte_offset;
                    self.zero_point = record.zero_point;
                    self.decoded = 0;
                    self.mode = None;
                    self.acc.clear();
                    self.pending = false;
                    self.state = LaneState::FetchStream;
                    out.zero_point = Some((self.wave, record.zero_point));
                }
            }

            LaneState::FetchStream => {
                if inputs.stream_grant {
                    self.pending = true;
                }
                if let Some(word) = inputs.stream_data {
                    let width = self.chunk_bytes as u32 * 8;
                    self.acc.push(stream_order(word, self.chunk_bytes), width);
                    self.offset = self.offset.wrapping_add(self.chunk_bytes as u32);
                    self.pending = false;

                    if self.mode.is_none() {
                        if self.acc.len() >= MODE_FLAG_BITS {
                            self.state = LaneState::ParseFlag;
                        }
                    } else if self.acc.len() >= self.max_symbol_bits {
                        self.state = LaneState::DecodeExec;
                    }
                }
            }

            LaneState::ParseFlag => {
                let mode = CodingMode::from_flag(self.acc.take(MODE_FLAG_BITS) as u8);
                self.mode = Some(mode);
                self.state = LaneState::DecodeExec;
            }

            LaneState::DecodeExec => self.decode_exec(codec, &mut out),

            LaneState::DecodePost => {
                if let Some(write) = self.latched.take() {
                    self.emit(write, &mut out);
                } else {
                    self.state = LaneState::DecodeExec;
                }
            }

            LaneState::Done => {
                if inputs.ack {
                    self.fault = None;
                    match inputs.start {
                        Some(start) => self.begin(start),
                        None => self.state = LaneState::Idle,
                    }
                }
            }
        }

        out
    }

    /// Abandon the current group and return to Idle.
    pub fn reset(&mut self) {
        self.state = LaneState::Idle;
        self.pending = false;
        self.mode = None;
        self.decoded = 0;
        self.acc.clear();
        self.latched = None;
        self.fault = None;
    }

    fn begin(&mut self, start: LaneStart) {
        self.group = start.group;
        self.wave = start.wave;
        self.pending = false;
        self.state = LaneState::FetchMeta;
    }

    fn decode_exec(&mut self, codec: &SymbolCodec, out: &mut LaneOutputs) {
        if self.acc.len() < self.max_symbol_bits {
            self.state = LaneState::FetchStream;
            return;
        }

        let mode = self.mode.unwrap_or(CodingMode::Raw);
        match codec.decode_value(self.acc.window(), mode) {
            Ok(coded) => {
                self.acc.consume(coded.length);
                let write = WeightWrite {
                    wave: self.wave,
                    offset: self.decoded,
                    weight: reconstruct(coded.value, self.zero_point),
                    path: coded.path,
                };
                match self.timing {
                    DecodeTiming::SingleCycle => self.emit(write, out),
                    DecodeTiming::Split => {
                        self.latched = Some(write);
                        self.state = LaneState::DecodePost;
                    }
                }
            }
            Err(error) => {
                warn!(
                    lane = self.lane,
                    group = self.group,
                    decoded = self.decoded,
                    %error,
                    "codec fault, truncating group"
                );
                self.fault = Some(LaneFault {
                    lane: self.lane,
                    group: self.group,
                    decoded: self.decoded,
                    error,
                });
                out.fault = true;
                self.state = LaneState::Done;
            }
        }
    }

    fn emit(&mut self, write: WeightWrite, out: &mut LaneOutputs) {
        out.weight = Some(write);
        self.decoded += 1;
        if self.decoded == self.group_size {
            trace!(lane = self.lane, group = self.group, mode = ?self.mode, "group complete");
            self.state = LaneState::Done;
        } else {
            self.state = LaneState::DecodeExec;
        }
    }
}
