//! Random prime and Blum-prime search.
//!
//! Candidates are odd, exactly `bits` long, and retried until Miller-Rabin
//! accepts them. The parallel Blum search runs one worker per thread, each with
//! its own ChaCha20 stream; the first prime found wins and the rest stop at
//! their next trial boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{debug, trace};

use super::BigInt;
use crate::config::PrimeSearchConfig;
use crate::error::{CryptoError, CryptoResult};

/// Smallest modulus size for which two distinct Blum primes of half length exist
pub const MIN_BLUM_PAIR_BITS: u64 = 10;

/// Two distinct Blum primes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlumPair {
    /// First prime
    pub p: BigInt,
    /// Second prime, distinct from `p`
    pub q: BigInt,
}

/// Probabilistic prime generator
#[derive(Clone, Debug, Default)]
pub struct PrimeGenerator {
    config: PrimeSearchConfig,
}

impl PrimeGenerator {
    /// Create a generator with the given configuration
    #[must_use]
    pub const fn new(config: PrimeSearchConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &PrimeSearchConfig {
        &self.config
    }

    /// Primality check at the configured certainty
    #[must_use]
    pub fn is_prime(&self, candidate: &BigInt) -> bool {
        candidate.is_probable_prime(self.certainty())
    }

    /// Random prime of exactly `bits` bits
    ///
    /// # Errors
    /// Returns `Domain` when `bits < 2`.
    pub fn generate(&self, bits: u64) -> CryptoResult<BigInt> {
        check_bits(bits)?;
        Ok(self.search(bits, false, &mut OsRng))
    }

    /// Random prime `p ≡ 3 (mod 4)` of exactly `bits` bits
    ///
    /// # Errors
    /// Returns `Domain` when `bits < 2`.
    pub fn generate_blum(&self, bits: u64) -> CryptoResult<BigInt> {
        check_bits(bits)?;
        Ok(self.search(bits, true, &mut OsRng))
    }

    /// Blum prime search spread over `parallelism` workers
    ///
    /// # Errors
    /// Returns `Domain` when `bits < 2`.
    pub fn generate_blum_parallel(&self, bits: u64, parallelism: usize) -> CryptoResult<BigInt> {
        check_bits(bits)?;
        let workers = parallelism.max(1);
        if workers == 1 {
            return self.generate_blum(bits);
        }

        let cancelled = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel();
        debug!(bits, workers, "starting parallel Blum prime search");

        std::thread::scope(|scope| {
            for worker in 0..workers {
                let tx = tx.clone();
                let cancelled = &cancelled;
                scope.spawn(move || {
                    let mut seed = [0u8; 32];
                    OsRng.fill_bytes(&mut seed);
                    let mut rng = ChaCha20Rng::from_seed(seed);
                    if let Some(prime) = self.search_cancellable(bits, true, &mut rng, cancelled) {
                        if !cancelled.swap(true, Ordering::AcqRel) {
                            debug!(worker, "worker found Blum prime");
                            let _ = tx.send(prime);
                        }
                    }
                });
            }
            drop(tx);
            rx.recv()
                .map_err(|_| CryptoError::State("all prime search workers exited".into()))
        })
    }

    /// Blum prime search using the configured worker count
    ///
    /// # Errors
    /// Returns `Domain` when `bits < 2`.
    pub fn generate_blum_with_config(&self, bits: u64) -> CryptoResult<BigInt> {
        self.generate_blum_parallel(bits, self.config.workers())
    }

    /// Two distinct Blum primes of `bits / 2` bits each
    ///
    /// # Errors
    /// Returns `Domain` unless `bits` is even and at least
    /// [`MIN_BLUM_PAIR_BITS`]; below that there is at most one Blum prime of
    /// each half length.
    pub fn generate_blum_pair(&self, bits: u64) -> CryptoResult<BlumPair> {
        if bits < MIN_BLUM_PAIR_BITS || bits % 2 != 0 {
            return Err(CryptoError::Domain(format!(
                "Blum pair needs an even bit length of at least {MIN_BLUM_PAIR_BITS}, got {bits}"
            )));
        }
        let half = bits / 2;
        let p = self.generate_blum_with_config(half)?;
        let q = loop {
            let q = self.generate_blum_with_config(half)?;
            if q != p {
                break q;
            }
            trace!("Blum pair collision, resampling q");
        };
        Ok(BlumPair { p, q })
    }

    fn certainty(&self) -> i32 {
        i32::try_from(self.config.certainty).unwrap_or(i32::MAX)
    }

    /// Search until a prime is found
    fn search<R: RngCore + CryptoRng + ?Sized>(
        &self,
        bits: u64,
        blum: bool,
        rng: &mut R,
    ) -> BigInt {
        let candidates = Candidates::new(bits, blum);
        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            if let Some(prime) = candidates.trial(rng, self.certainty()) {
                debug!(bits, attempts, blum, "prime found");
                return prime;
            }
        }
    }

    /// As `search`, checking `cancelled` between trials; `None` once it is set
    fn search_cancellable<R: RngCore + CryptoRng + ?Sized>(
        &self,
        bits: u64,
        blum: bool,
        rng: &mut R,
        cancelled: &AtomicBool,
    ) -> Option<BigInt> {
        let candidates = Candidates::new(bits, blum);
        let mut attempts: u64 = 0;
        while !cancelled.load(Ordering::Acquire) {
            attempts += 1;
            if let Some(prime) = candidates.trial(rng, self.certainty()) {
                debug!(bits, attempts, blum, "prime found");
                return Some(prime);
            }
        }
        trace!(attempts, "prime search cancelled");
        None
    }
}

/// Odd candidates of exactly `bits` bits, `≡ 3 (mod 4)` for Blum searches
struct Candidates {
    bits: u64,
    top: BigInt,
    low_mask: BigInt,
}

impl Candidates {
    fn new(bits: u64, blum: bool) -> Self {
        Self {
            bits,
            top: BigInt::one().shift_left(bit_index(bits - 1)),
            low_mask: if blum { BigInt::from(3) } else { BigInt::one() },
        }
    }

    /// Draw one candidate and return it if it tests prime
    fn trial<R: RngCore + CryptoRng + ?Sized>(
        &self,
        rng: &mut R,
        certainty: i32,
    ) -> Option<BigInt> {
        let candidate = BigInt::random_bits_with_rng(self.bits, rng)
            .or(&self.top)
            .or(&self.low_mask);
        candidate.is_probable_prime_with_rng(certainty, rng).then_some(candidate)
    }
}

fn check_bits(bits: u64) -> CryptoResult<()> {
    if bits < 2 {
        return Err(CryptoError::Domain(format!("prime bit length must be at least 2, got {bits}")));
    }
    Ok(())
}

fn bit_index(bits: u64) -> i64 {
    i64::try_from(bits).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_blum(p: &BigInt) -> bool {
        p.and(&BigInt::from(3)) == BigInt::from(3)
    }

    #[test]
    fn test_generate_has_exact_bit_length() {
        let gen = PrimeGenerator::default();
        let p = gen.generate(512).unwrap();
        assert_eq!(p.bit_length(), 512);
        assert!(gen.is_prime(&p));
    }

    #[test]
    fn test_generate_blum() {
        let gen = PrimeGenerator::default();
        for _ in 0..3 {
            let p = gen.generate_blum(512).unwrap();
            assert_eq!(p.bit_length(), 512);
            assert!(p.is_probable_prime(100));
            assert!(is_blum(&p));
        }
    }

    #[test]
    fn test_generate_blum_parallel() {
        let gen = PrimeGenerator::default();
        let p = gen.generate_blum_parallel(512, 4).unwrap();
        assert_eq!(p.bit_length(), 512);
        assert!(p.is_probable_prime(100));
        assert!(is_blum(&p));
    }

    #[test]
    fn test_generate_blum_pair() {
        let gen = PrimeGenerator::new(PrimeSearchConfig::default().with_parallelism(2));
        let pair = gen.generate_blum_pair(1024).unwrap();
        assert_ne!(pair.p, pair.q);
        for prime in [&pair.p, &pair.q] {
            assert_eq!(prime.bit_length(), 512);
            assert!(prime.is_probable_prime(100));
            assert!(is_blum(prime));
        }
    }

    #[test]
    fn test_search_returns_prime() {
        let gen = PrimeGenerator::default();
        let mut rng = ChaCha20Rng::from_seed([7u8; 32]);
        let p = gen.search(64, false, &mut rng);
        assert_eq!(p.bit_length(), 64);
        assert!(p.is_probable_prime(100));
    }

    #[test]
    fn test_cancellable_search() {
        let gen = PrimeGenerator::default();
        let mut rng = ChaCha20Rng::from_seed([9u8; 32]);
        let stop = AtomicBool::new(true);
        assert!(gen.search_cancellable(64, true, &mut rng, &stop).is_none());
        let go = AtomicBool::new(false);
        let p = gen.search_cancellable(64, true, &mut rng, &go).unwrap();
        assert_eq!(p.bit_length(), 64);
        assert!(is_blum(&p));
    }

    #[test]
    fn test_small_bit_lengths() {
        let gen = PrimeGenerator::default();
        assert_eq!(gen.generate(2).unwrap(), BigInt::from(3));
        assert_eq!(gen.generate_blum(2).unwrap(), BigInt::from(3));
        let p = gen.generate_blum(3).unwrap();
        assert_eq!(p, BigInt::from(7));
        assert!(gen.generate(1).is_err());
        assert!(gen.generate_blum_pair(7).is_err());
        assert!(gen.generate_blum_pair(8).is_err());
        let pair = gen.generate_blum_pair(10).unwrap();
        assert_ne!(pair.p, pair.q);
    }
}
