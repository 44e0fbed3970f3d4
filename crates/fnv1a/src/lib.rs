//! 64-bit FNV-1a hash.
//!
//! Fowler/Noll/Vo hash, the "alternate" variant that xors each byte in before
//! multiplying. Small, allocation-free and well mixed for short ASCII labels.

#![no_std]

/// FNV-1a 64-bit offset basis.
pub const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime.
pub const PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash a byte slice.
#[inline]
pub const fn hash64(data: &[u8]) -> u64 {
    let mut hash = OFFSET_BASIS;
    let mut i = 0;
    while i < data.len() {
        hash ^= data[i] as u64;
        hash = hash.wrapping_mul(PRIME);
        i += 1;
    }
    hash
}

/// Hash a string's UTF-8 bytes.
#[inline]
pub const fn hash64_str(s: &str) -> u64 {
    hash64(s.as_bytes())
}

/// Incremental hasher, for labels assembled from several parts.
#[derive(Clone, Copy, Debug)]
pub struct Fnv1a64 {
    state: u64,
}

impl Fnv1a64 {
    pub const fn new() -> Self {
        Self { state: OFFSET_BASIS }
    }

    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        for &b in data {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(PRIME);
        }
    }

    #[inline]
    pub const fn finish(&self) -> u64 {
        self.state
    }
}

impl Default for Fnv1a64 {
    fn default() -> Self {
        Self::new()
    }
}

impl core::hash::Hasher for Fnv1a64 {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        self.update(bytes);
    }
}
