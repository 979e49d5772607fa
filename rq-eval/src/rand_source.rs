//! A single explicit PRNG source (§6 `RAND_SEED`, §9 open question (b):
//! "the legacy code mixes several PRNG sources conditional on build flags;
//! the specification prescribes a single explicit PRNG with configurable
//! seed"). Grounded on the teacher's use of the `rand` crate for UUID/BNode
//! generation, narrowed here to one `StdRng` instance threaded through the
//! evaluation context rather than reached for ad hoc at each call site.
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

pub struct RandSource {
    rng: StdRng,
}

impl RandSource {
    /// A query-lifetime PRNG, seeded deterministically when `seed` is given
    /// (for `RAND_SEED` / replay, §6) or from OS entropy otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
        }
    }

    /// `RAND()` (§4.3): a double in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// 16 random bytes for `UUID`/`STRUUID`, with the RFC 4122 version-4
    /// variant bits set per §4.3 ("byte 6 masked 0x0F | 0x40, byte 8 masked
    /// 0x3F | 0x80").
    pub fn next_uuid_v4_bytes(&mut self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        bytes[6] = (bytes[6] & 0x0F) | 0x40;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_the_same_sequence() {
        let mut a = RandSource::new(Some(42));
        let mut b = RandSource::new(Some(42));
        assert_eq!(a.next_f64(), b.next_f64());
        assert_eq!(a.next_uuid_v4_bytes(), b.next_uuid_v4_bytes());
    }

    #[test]
    fn uuid_bytes_carry_version_4_variant_bits() {
        let mut rng = RandSource::new(Some(7));
        let bytes = rng.next_uuid_v4_bytes();
        assert_eq!(bytes[6] & 0xF0, 0x40);
        assert_eq!(bytes[8] & 0xC0, 0x80);
    }
}
