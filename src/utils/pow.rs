// Proof-of-Work checker for burn keys
//
// keccak256(burnKey || bound public values || "EIP-7503") must start with
// `minimum_zero_bytes` zero bytes, adding 8 * minimum_zero_bytes bits of
// security against address-hash collision attacks.

use alloy_primitives::U256;
use log::{debug, info};
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::config::ProtocolConfig;
use crate::constants::POW_DOMAIN_TAG;
use crate::field::FieldElement;
use crate::utils::burn_address::BurnParams;
use crate::utils::keccak::keccak256_concat;

/// Bytes following the burn key in the PoW preimage. Fixed for one search.
pub fn pow_suffix(params: &BurnParams, config: &ProtocolConfig) -> Vec<u8> {
    let mut suffix = Vec::new();
    for input in &config.pow_inputs {
        let word = params.value(*input).to_be_bytes::<32>();
        suffix.extend_from_slice(&word[32 - input.pow_width()..]);
    }
    suffix.extend_from_slice(POW_DOMAIN_TAG);
    suffix
}

/// Full PoW preimage for a burn key
pub fn pow_preimage(burn_key: FieldElement, params: &BurnParams, config: &ProtocolConfig) -> Vec<u8> {
    let mut preimage = burn_key.to_be_bytes().to_vec();
    preimage.extend_from_slice(&pow_suffix(params, config));
    preimage
}

pub fn compute_pow_hash(burn_key: FieldElement, params: &BurnParams, config: &ProtocolConfig) -> [u8; 32] {
    keccak256_concat(&[&burn_key.to_be_bytes(), &pow_suffix(params, config)])
}

pub fn leading_zero_bytes(hash: &[u8; 32]) -> usize {
    hash.iter().take_while(|&&b| b == 0).count()
}

/// Check if hash starts with at least `minimum_zero_bytes` zero bytes
pub fn check_leading_zero_bytes(hash: &[u8; 32], minimum_zero_bytes: usize) -> bool {
    minimum_zero_bytes <= 32 && leading_zero_bytes(hash) >= minimum_zero_bytes
}

pub fn verify_pow(
    burn_key: FieldElement,
    params: &BurnParams,
    config: &ProtocolConfig,
    minimum_zero_bytes: usize,
) -> bool {
    check_leading_zero_bytes(&compute_pow_hash(burn_key, params, config), minimum_zero_bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowSolution {
    pub burn_key: FieldElement,
    pub hash: [u8; 32],
    /// Candidates hashed, including the successful one
    pub attempts: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// First candidate; random when unset
    pub start: Option<FieldElement>,
    /// Give up after this many candidates
    pub max_attempts: Option<u64>,
}

/// Uniformly distributed field element
pub fn random_field_element<R: Rng + ?Sized>(rng: &mut R) -> FieldElement {
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes[..]);
    FieldElement::from_be_bytes_mod_order(&bytes)
}

/// Increment the candidate until its tag satisfies the difficulty.
///
/// Returns `None` only when `max_attempts` runs out. Candidates wrap around
/// the field modulus, so every candidate is a valid field element.
pub fn find_burn_key(
    params: &BurnParams,
    config: &ProtocolConfig,
    minimum_zero_bytes: usize,
    options: &SearchOptions,
) -> Option<PowSolution> {
    if minimum_zero_bytes > 32 {
        return None;
    }
    let start = options
        .start
        .unwrap_or_else(|| random_field_element(&mut rand::thread_rng()));
    let suffix = pow_suffix(params, config);
    let budget = options.max_attempts.unwrap_or(u64::MAX);

    debug!(
        "PoW search from {start}, {minimum_zero_bytes} zero bytes, budget {:?}",
        options.max_attempts
    );

    let mut candidate = start;
    let mut attempts = 0u64;
    while attempts < budget {
        attempts += 1;
        let hash = keccak256_concat(&[&candidate.to_be_bytes(), &suffix]);
        if check_leading_zero_bytes(&hash, minimum_zero_bytes) {
            info!("Found burn key after {attempts} attempts");
            return Some(PowSolution { burn_key: candidate, hash, attempts });
        }
        candidate = candidate + FieldElement::one();
    }

    debug!("PoW search exhausted after {attempts} attempts");
    None
}

/// Sharded search: worker `i` starts `i * 2^128` past the start, so shards
/// never overlap in practice. The first worker to succeed stops the others.
pub fn find_burn_key_parallel(
    params: &BurnParams,
    config: &ProtocolConfig,
    minimum_zero_bytes: usize,
    options: &SearchOptions,
    workers: usize,
) -> Option<PowSolution> {
    let workers = workers.max(1);
    if minimum_zero_bytes > 32 {
        return None;
    }
    let start = options
        .start
        .unwrap_or_else(|| random_field_element(&mut rand::thread_rng()));
    let suffix = pow_suffix(params, config);
    let per_worker = options.max_attempts.map(|total| total.div_ceil(workers as u64));
    let stride = FieldElement::from_be_bytes_mod_order(&(U256::from(1) << 128usize).to_be_bytes::<32>());

    let stop = AtomicBool::new(false);
    let total_attempts = AtomicU64::new(0);
    let found: Mutex<Option<(usize, FieldElement, [u8; 32])>> = Mutex::new(None);

    debug!("PoW search with {workers} workers, {minimum_zero_bytes} zero bytes");

    std::thread::scope(|scope| {
        for worker in 0..workers {
            let suffix = &suffix;
            let stop = &stop;
            let total_attempts = &total_attempts;
            let found = &found;
            let mut candidate = start + stride * FieldElement::from(worker as u64);

            scope.spawn(move || {
                let mut attempts = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    if per_worker.is_some_and(|budget| attempts >= budget) {
                        break;
                    }
                    attempts += 1;
                    let hash = keccak256_concat(&[&candidate.to_be_bytes(), suffix]);
                    if check_leading_zero_bytes(&hash, minimum_zero_bytes) {
                        stop.store(true, Ordering::Relaxed);
                        if let Ok(mut slot) = found.lock() {
                            // lowest worker index wins ties
                            if slot.map_or(true, |(w, _, _)| worker < w) {
                                *slot = Some((worker, candidate, hash));
                            }
                        }
                        break;
                    }
                    candidate = candidate + FieldElement::one();
                }
                total_attempts.fetch_add(attempts, Ordering::Relaxed);
            });
        }
    });

    let attempts = total_attempts.load(Ordering::Relaxed);
    let solution = found.into_inner().ok().flatten();
    match solution {
        Some((worker, burn_key, hash)) => {
            info!("Worker {worker} found burn key, {attempts} attempts across all workers");
            Some(PowSolution { burn_key, hash, attempts })
        }
        None => {
            debug!("Parallel PoW search exhausted after {attempts} attempts");
            None
        }
    }
}
