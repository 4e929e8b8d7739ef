//! Fixed-size framing of a PCM buffer for streaming.
//!
//! ```text
//! pcm: |<-- chunk -->|<-- chunk -->| ... |<- tail ->|
//!        First         Middle              Last
//! ```
//!
//! A buffer that fits in one chunk produces a single `Last` frame: the
//! server needs exactly one terminal frame, and that wins over `First`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

// ---------------------------------------------------------------------------
// FramePosition
// ---------------------------------------------------------------------------

/// Where a frame sits in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePosition {
    First,
    Middle,
    Last,
}

impl FramePosition {
    /// Wire value of the `aus` audio-status field.
    pub fn aus(self) -> u8 {
        match self {
            FramePosition::First => 1,
            FramePosition::Middle => 2,
            FramePosition::Last => 4,
        }
    }

    /// Wire value of the `data.status` data-stage flag: 2 only on the
    /// terminal frame.
    pub fn data_status(self) -> u8 {
        match self {
            FramePosition::Last => 2,
            FramePosition::First | FramePosition::Middle => 1,
        }
    }

    pub fn is_last(self) -> bool {
        self == FramePosition::Last
    }
}

// ---------------------------------------------------------------------------
// AudioFrame
// ---------------------------------------------------------------------------

/// One chunk of the PCM buffer plus its position marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame<'a> {
    /// Zero-based frame index.
    pub index: usize,
    /// Byte offset of this chunk in the source buffer.
    pub offset: usize,
    pub position: FramePosition,
    pub bytes: &'a [u8],
}

impl AudioFrame<'_> {
    /// Base64 form carried in the JSON `data` field.
    pub fn encode(&self) -> String {
        BASE64.encode(self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// AudioFramer
// ---------------------------------------------------------------------------

/// Splits a borrowed PCM buffer into `chunk_bytes`-sized frames.
///
/// [`frames`](Self::frames) can be called any number of times; each call
/// starts again from offset 0, so a retried attempt re-streams the same
/// sequence.
#[derive(Debug, Clone, Copy)]
pub struct AudioFramer<'a> {
    pcm: &'a [u8],
    chunk_bytes: usize,
}

impl<'a> AudioFramer<'a> {
    /// `chunk_bytes` of zero is treated as one byte so iteration always
    /// terminates.
    pub fn new(pcm: &'a [u8], chunk_bytes: usize) -> Self {
        Self {
            pcm,
            chunk_bytes: chunk_bytes.max(1),
        }
    }

    /// Number of frames: `ceil(len / chunk_bytes)`.
    pub fn frame_count(&self) -> usize {
        self.pcm.len().div_ceil(self.chunk_bytes)
    }

    pub fn frames(&self) -> Frames<'a> {
        Frames {
            pcm: self.pcm,
            chunk_bytes: self.chunk_bytes,
            cursor: 0,
            index: 0,
        }
    }
}

/// Iterator returned by [`AudioFramer::frames`].
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    pcm: &'a [u8],
    chunk_bytes: usize,
    cursor: usize,
    index: usize,
}

impl<'a> Iterator for Frames<'a> {
    type Item = AudioFrame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.pcm.len() {
            return None;
        }

        let offset = self.cursor;
        let end = (offset + self.chunk_bytes).min(self.pcm.len());
        let position = if end == self.pcm.len() {
            FramePosition::Last
        } else if offset == 0 {
            FramePosition::First
        } else {
            FramePosition::Middle
        };

        let frame = AudioFrame {
            index: self.index,
            offset,
            position,
            bytes: &self.pcm[offset..end],
        };

        self.cursor = end;
        self.index += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.pcm.len() - self.cursor.min(self.pcm.len())).div_ceil(self.chunk_bytes);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Frames<'_> {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
