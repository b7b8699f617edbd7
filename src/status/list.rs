//! # Revocation Bitstring
//!
//! The issuer-side bitstring backing a revocation list: one bit per issued
//! credential, set when the credential is revoked. Bit `0` is the left-most
//! bit of the encoded bitstring; the uncompressed bitstring is at least 16KiB
//! to provide herd privacy.

use std::io::{Read, Write};

use anyhow::{anyhow, bail};
use base64ct::{Base64UrlUnpadded, Encoding};
use bitvec::order::Msb0;
use bitvec::vec::BitVec;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

/// The number of entries in a revocation list. This is the minimum length
/// required by the specification (131,072 bits / 16KiB uncompressed).
pub const LIST_SIZE: usize = 131_072;

/// A revocation bitstring for one time period.
///
/// Index allocation is pseudorandom within the period so that a published
/// list does not leak issuance order or volume: the pool of unused indices is
/// sampled without replacement, Fisher-Yates style. An allocated index is
/// only consumed when the issuance it belongs to commits; callers return
/// indices for issuances that fail.
#[derive(Clone, Debug)]
pub struct RevocationList {
    time_period: i32,
    bits: BitVec<u8, Msb0>,
    free: Vec<u32>,
    rng: fastrand::Rng,
}

impl RevocationList {
    /// Creates an all-zero list for the given time period, with a freshly
    /// seeded index generator.
    #[must_use]
    pub fn new(time_period: i32) -> Self {
        Self {
            time_period,
            bits: BitVec::repeat(false, LIST_SIZE),
            free: (0..u32::try_from(LIST_SIZE).unwrap_or(u32::MAX)).collect(),
            rng: fastrand::Rng::new(),
        }
    }

    /// The time period this list covers.
    #[must_use]
    pub const fn time_period(&self) -> i32 {
        self.time_period
    }

    /// Draws an unused index at random. Returns `None` when the list is
    /// exhausted.
    pub fn allocate_index(&mut self) -> Option<u32> {
        if self.free.is_empty() {
            return None;
        }
        let at = self.rng.usize(..self.free.len());
        Some(self.free.swap_remove(at))
    }

    /// Returns an index drawn with [`Self::allocate_index`] whose issuance
    /// did not commit, making it available again.
    pub fn release_index(&mut self, index: u32) {
        self.free.push(index);
    }

    /// Sets the bit for the given index. Returns `false` if the index is out
    /// of range. Once set, a bit stays set for the life of the period.
    pub fn revoke(&mut self, index: u32) -> bool {
        let index = index as usize;
        if index >= self.bits.len() {
            return false;
        }
        self.bits.set(index, true);
        true
    }

    /// Returns `true` if the bit for the given index is set.
    #[must_use]
    pub fn is_revoked(&self, index: u32) -> bool {
        self.bits.get(index as usize).is_some_and(|bit| *bit)
    }

    /// Encodes the bitstring as `base64url(gzip(bits))`, bit 0 at the
    /// left-most position.
    ///
    /// # Errors
    ///
    /// Returns an error if compression fails.
    pub fn encode(&self) -> anyhow::Result<String> {
        encode_bits(&self.bits)
    }

    /// Decodes an encoded list back into a bitstring.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoding, compression, or minimum length is
    /// invalid.
    pub fn decode(encoded: &str) -> anyhow::Result<BitVec<u8, Msb0>> {
        decode_bits(encoded)
    }
}

pub(crate) fn encode_bits(bits: &BitVec<u8, Msb0>) -> anyhow::Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(bits.as_raw_slice())?;
    let compressed = encoder.finish()?;
    Ok(Base64UrlUnpadded::encode_string(&compressed))
}

pub(crate) fn decode_bits(encoded: &str) -> anyhow::Result<BitVec<u8, Msb0>> {
    let compressed = Base64UrlUnpadded::decode_vec(encoded)
        .map_err(|e| anyhow!("issue decoding list: {e}"))?;

    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut raw = Vec::new();
    decoder.read_to_end(&mut raw).map_err(|e| anyhow!("issue decompressing list: {e}"))?;

    if raw.len() * 8 < LIST_SIZE {
        bail!("list is shorter than the minimum length");
    }

    Ok(BitVec::from_vec(raw))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn allocation_is_unique() {
        let mut list = RevocationList::new(2024);
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let index = list.allocate_index().expect("should allocate");
            assert!(u64::from(index) < LIST_SIZE as u64);
            assert!(seen.insert(index), "index allocated twice");
        }
    }

    #[test]
    fn released_index_is_reusable() {
        let mut list = RevocationList::new(2024);
        let index = list.allocate_index().expect("should allocate");
        list.release_index(index);

        let mut seen = HashSet::new();
        while let Some(next) = list.allocate_index() {
            seen.insert(next);
            if seen.contains(&index) {
                break;
            }
        }
        assert!(seen.contains(&index));
    }

    #[test]
    fn revocation_is_monotone() {
        let mut list = RevocationList::new(2024);
        assert!(!list.is_revoked(42));
        assert!(list.revoke(42));
        assert!(list.is_revoked(42));
        assert!(list.revoke(42));
        assert!(list.is_revoked(42));
    }

    #[test]
    fn revoke_out_of_range() {
        let mut list = RevocationList::new(2024);
        assert!(!list.revoke(u32::try_from(LIST_SIZE).unwrap()));
    }

    #[test]
    fn encode_round_trip() {
        let mut list = RevocationList::new(2024);
        list.revoke(0);
        list.revoke(7);
        list.revoke(131_071);

        let encoded = list.encode().expect("should encode");
        let decoded = RevocationList::decode(&encoded).expect("should decode");

        assert!(decoded[0]);
        assert!(decoded[7]);
        assert!(decoded[131_071]);
        assert!(!decoded[1]);
        // bit 0 is the most significant bit of the first byte
        assert_eq!(decoded.as_raw_slice()[0], 0b1000_0001);
    }

    #[test]
    fn decode_rejects_short_list() {
        let bits: BitVec<u8, Msb0> = BitVec::repeat(false, 8);
        let encoded = encode_bits(&bits).expect("should encode");
        assert!(RevocationList::decode(&encoded).is_err());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(RevocationList::decode("not base64 ***").is_err());
        assert!(RevocationList::decode("bm90IGd6aXA").is_err());
    }
}
