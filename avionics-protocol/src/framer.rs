use heapless::Vec;

pub const DEFAULT_BUFFER_SIZE: usize = 256;

/// What a protocol can tell from the head of the receive buffer.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLength {
    /// More bytes are needed before the length is known.
    Pending,
    /// A frame of this many bytes starts at the head of the buffer.
    Complete(usize),
    /// The head of the buffer cannot start a frame, drop this many bytes.
    Discard(usize),
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    Overflow,
    ChecksumMismatch,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    pub frames: u32,
    pub checksum_errors: u32,
    pub overflows: u32,
    pub discarded_bytes: u32,
}

impl FramerStats {
    fn record(&mut self, error: FrameError) {
        match error {
            FrameError::Overflow => self.overflows += 1,
            FrameError::ChecksumMismatch => self.checksum_errors += 1,
        }
    }
}

pub trait FrameProtocol {
    const START_BYTE: u8;

    /// Called with a buffer starting with [`Self::START_BYTE`].
    fn frame_length(&self, data: &[u8]) -> FrameLength;

    /// Integrity check of a complete frame.
    fn verify(&self, frame: &[u8]) -> bool;
}

/// Turns an arbitrarily chunked byte stream into verified frames.
///
/// The result does not depend on how the input was split: bytes are copied
/// into the buffer as far as they fit, then every complete frame at the head
/// is consumed before more input is taken.
pub struct FrameResynchronizer<P: FrameProtocol, const N: usize = DEFAULT_BUFFER_SIZE> {
    protocol: P,
    buffer: Vec<u8, N>,
    /// length of the frame at the head once known, 0 otherwise
    expected_length: usize,
    stats: FramerStats,
}

impl<P: FrameProtocol, const N: usize> FrameResynchronizer<P, N> {
    pub fn new(protocol: P) -> Self {
        Self {
            protocol,
            buffer: Vec::new(),
            expected_length: 0,
            stats: FramerStats::default(),
        }
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    pub fn stats(&self) -> &FramerStats {
        &self.stats
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.expected_length = 0;
    }

    /// Appends `data` and calls `on_frame` for every verified frame, in
    /// stream order.
    pub fn push(&mut self, mut data: &[u8], mut on_frame: impl FnMut(&[u8])) {
        while !data.is_empty() {
            let free = N - self.buffer.len();
            if free == 0 {
                log_warn!(
                    "receive buffer overflow, dropping {} bytes",
                    self.buffer.len()
                );
                self.stats.record(FrameError::Overflow);
                self.clear();
                continue;
            }

            let n = free.min(data.len());
            let (head, tail) = data.split_at(n);
            // fits, checked above
            let _ = self.buffer.extend_from_slice(head);
            data = tail;

            self.drain(&mut on_frame);
        }
    }

    fn drain(&mut self, on_frame: &mut impl FnMut(&[u8])) {
        while !self.buffer.is_empty() && self.buffer.len() >= self.expected_length {
            let consumed = if self.buffer[0] != P::START_BYTE {
                self.stats.discarded_bytes += 1;
                1
            } else {
                match self.protocol.frame_length(&self.buffer) {
                    FrameLength::Pending => {
                        self.expected_length = 0;
                        return;
                    }
                    FrameLength::Discard(n) => {
                        let n = n.clamp(1, self.buffer.len());
                        self.stats.discarded_bytes += n as u32;
                        n
                    }
                    FrameLength::Complete(n) => {
                        let n = n.max(1);
                        if self.buffer.len() < n {
                            self.expected_length = n;
                            return;
                        }
                        let frame = &self.buffer[..n];
                        if self.protocol.verify(frame) {
                            self.stats.frames += 1;
                            on_frame(frame);
                        } else {
                            log_debug!("dropping frame of {} bytes, checksum mismatch", n);
                            self.stats.record(FrameError::ChecksumMismatch);
                        }
                        n
                    }
                }
            };

            self.consume(consumed);
        }
    }

    fn consume(&mut self, n: usize) {
        let len = self.buffer.len();
        self.buffer.copy_within(n..len, 0);
        self.buffer.truncate(len - n);
        self.expected_length = 0;
    }
}
