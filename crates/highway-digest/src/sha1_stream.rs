/// Incremental SHA-1 with access to the intermediate state.
///
/// Flash Transfer needs the raw compression state at chunk boundaries (no
/// padding, no length suffix), which the usual hash crates only hand out
/// after finalizing. `Sha1Stream` keeps the state in the open:
///
/// ```text
/// update(..)  -> feed bytes, full 64-byte blocks are compressed at once
/// digest(..)  -> snapshot of the five state words, nothing is consumed
/// finalize()  -> standard padding + bit length, returns the real SHA-1
/// reset()     -> back to the initial constants
/// ```

/// SHA-1 block size in bytes.
pub const BLOCK_SIZE: usize = 64;

/// Digest length in bytes.
pub const DIGEST_SIZE: usize = 20;

const INITIAL_STATE: [u32; 5] = [0x6745_2301, 0xEFCD_AB89, 0x98BA_DCFE, 0x1032_5476, 0xC3D2_E1F0];

const K1: u32 = 0x5A82_7999;
const K2: u32 = 0x6ED9_EBA1;
const K3: u32 = 0x8F1B_BCDC;
const K4: u32 = 0xCA62_C1D6;

const PADDING: [u8; BLOCK_SIZE] = {
    let mut p = [0u8; BLOCK_SIZE];
    p[0] = 0x80;
    p
};

/// Byte order used when serializing the five state words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Resettable SHA-1 accumulator exposing mid-stream snapshots.
#[derive(Clone)]
pub struct Sha1Stream {
    state: [u32; 5],
    /// Total message length in bits.
    count: u64,
    buffer: [u8; BLOCK_SIZE],
    w: [u32; 80],
}

impl Default for Sha1Stream {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Sha1Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sha1Stream")
            .field("state", &hex::encode(self.digest(Endian::Big)))
            .field("bytes", &(self.count >> 3))
            .finish()
    }
}

impl Sha1Stream {
    pub fn new() -> Self {
        Self {
            state: INITIAL_STATE,
            count: 0,
            buffer: [0u8; BLOCK_SIZE],
            w: [0u32; 80],
        }
    }

    /// Restore the initial state. Buffered bytes become irrelevant since the
    /// bit count is zeroed.
    pub fn reset(&mut self) {
        self.state = INITIAL_STATE;
        self.count = 0;
    }

    /// Number of bytes fed since the last reset.
    pub fn len(&self) -> u64 {
        self.count >> 3
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn update(&mut self, data: &[u8]) {
        let mut index = self.buffered();
        self.count = self.count.wrapping_add((data.len() as u64) << 3);

        let part_len = BLOCK_SIZE - index;
        let mut i = 0;

        if data.len() >= part_len {
            self.buffer[index..].copy_from_slice(&data[..part_len]);
            compress(&mut self.state, &mut self.w, &self.buffer);

            i = part_len;
            while i + BLOCK_SIZE <= data.len() {
                compress(&mut self.state, &mut self.w, &data[i..i + BLOCK_SIZE]);
                i += BLOCK_SIZE;
            }
            index = 0;
        }

        let rest = &data[i..];
        self.buffer[index..index + rest.len()].copy_from_slice(rest);
    }

    /// Serialize the current state words without padding.
    ///
    /// Only bytes that completed a 64-byte block are reflected; the pending
    /// buffer is left untouched so the stream can keep going.
    pub fn digest(&self, order: Endian) -> [u8; DIGEST_SIZE] {
        let mut out = [0u8; DIGEST_SIZE];
        for (word, dst) in self.state.iter().zip(out.chunks_exact_mut(4)) {
            let bytes = match order {
                Endian::Big => word.to_be_bytes(),
                Endian::Little => word.to_le_bytes(),
            };
            dst.copy_from_slice(&bytes);
        }
        out
    }

    /// Pad, append the bit length and return the big-endian SHA-1.
    ///
    /// The stream must be `reset()` before it is fed again.
    pub fn finalize(&mut self) -> [u8; DIGEST_SIZE] {
        let bits = self.count.to_be_bytes();
        let index = self.buffered();
        let pad_len = if index < 56 { 56 - index } else { 120 - index };

        self.update(&PADDING[..pad_len]);
        self.update(&bits);
        debug_assert_eq!(self.buffered(), 0);

        self.digest(Endian::Big)
    }

    /// Bytes currently waiting in the pending block.
    fn buffered(&self) -> usize {
        ((self.count >> 3) & 0x3F) as usize
    }
}

/// One-shot SHA-1 of `data`.
pub fn sha1(data: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut s = Sha1Stream::new();
    s.update(data);
    s.finalize()
}

fn compress(state: &mut [u32; 5], w: &mut [u32; 80], block: &[u8]) {
    for (i, word) in block.chunks_exact(4).take(16).enumerate() {
        w[i] = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
    }
    for i in 16..80 {
        w[i] = (w[i - 3] ^ w[i - 8] ^ w[i - 14] ^ w[i - 16]).rotate_left(1);
    }

    let [mut a, mut b, mut c, mut d, mut e] = *state;

    for (i, &wi) in w.iter().enumerate() {
        let (f, k) = match i {
            0..=19 => ((b & c) | (!b & d), K1),
            20..=39 => (b ^ c ^ d, K2),
            40..=59 => ((b & c) | (b & d) | (c & d), K3),
            _ => (b ^ c ^ d, K4),
        };
        let t = a
            .rotate_left(5)
            .wrapping_add(f)
            .wrapping_add(e)
            .wrapping_add(wi)
            .wrapping_add(k);
        e = d;
        d = c;
        c = b.rotate_left(30);
        b = a;
        a = t;
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
    state[4] = state[4].wrapping_add(e);
}
