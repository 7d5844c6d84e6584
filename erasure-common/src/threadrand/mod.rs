use rand::rngs::OsRng;
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::cell::UnsafeCell;

thread_local! {
    static RNG: UnsafeCell<ChaCha20Rng> = UnsafeCell::new(ChaCha20Rng::from_seed(OsRng.gen()));
}

/// Per-thread ChaCha20 generator seeded from the OS.
pub struct SecureRng;

impl SecureRng {
    pub fn next_u64() -> u64 {
        RNG.with(|rng| {
            // Only one thread accesses this RNG so this is safe
            unsafe { rand_chacha::rand_core::RngCore::next_u64(&mut *rng.get()) }
        })
    }

    pub fn next_u128() -> u128 {
        let mut bytes = [0u8; 16];
        Self::fill(&mut bytes);
        u128::from_le_bytes(bytes)
    }

    pub fn fill(dest: &mut [u8]) {
        RNG.with(|rng| {
            // Only one thread accesses this RNG so this is safe
            unsafe { rand_chacha::rand_core::RngCore::fill_bytes(&mut *rng.get(), dest) }
        })
    }
}
