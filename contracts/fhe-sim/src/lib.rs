#![no_std]

//! # FHE Engine Simulator
//!
//! A plaintext-backed stand-in for a homomorphic-encryption coprocessor.
//! Ciphertexts are opaque `u64` handles; the plaintext behind each handle
//! lives in this contract's storage and can only be recovered through
//! `decrypt`, which is gated by per-handle decrypt-authorization grants.
//!
//! Game contracts never see plaintexts: they combine handles with the
//! operations below and grant read rights per handle. Swapping this
//! contract for a real coprocessor behind the same interface changes no
//! caller code.
//!
//! | Operation    | Semantics                                            |
//! |--------------|------------------------------------------------------|
//! | `encrypt`    | trivial encryption of a public constant              |
//! | `rand_bool`  | secure random bit, plaintext never revealed          |
//! | `eq`/`ne`    | encrypted comparison, result is an encrypted 0/1     |
//! | `and`/`or`/`not` | logical ops over encrypted 0/1 values            |
//! | `select`     | oblivious multiplexer: `cond ? a : b`                |
//! | `from_input` | materialize an external ciphertext, checking proof   |
//! | `allow`      | grant a principal decrypt rights on one handle       |
//! | `decrypt`    | recover a plaintext (auth + grant required)          |
//!
//! Handle 0 is reserved: it denotes "no ciphertext" and decrypts to 0 for
//! any principal. Real handles start at 1.
//!
//! ## External input format
//!
//! `from_input` accepts an 8-byte big-endian plaintext payload plus a
//! 64-byte validity proof whose first 32 bytes must equal
//! `keccak256(input)`. Proof validity is a public check: a bad proof is a
//! hard failure, never a silently-wrong ciphertext.

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, panic_with_error, Address, Bytes,
    BytesN, Env,
};

// ═══════════════════════════════════════════════════════════════════════════════
//  Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum FheError {
    UnknownHandle = 1,
    InvalidProof = 2,
    NotAuthorized = 3,
    MalformedInput = 4,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Storage
// ═══════════════════════════════════════════════════════════════════════════════

/// An opaque ciphertext handle. 0 is the "no ciphertext" sentinel.
pub type Handle = u64;

#[contracttype]
#[derive(Clone)]
enum DataKey {
    /// Next handle to allocate (instance storage, starts at 1).
    NextHandle,
    /// Plaintext behind a handle: DataKey::Value(handle) → u64.
    Value(Handle),
    /// Decrypt-authorization: DataKey::Grant(handle, principal) → ().
    Grant(Handle, Address),
}

// Ledger rate is approximately 5 seconds per ledger on Stellar
const LEDGER_RATE_SECS: u32 = 5;

// Ciphertexts and grants live as long as the games that reference them (120 days)
const TTL_SECONDS: u32 = 120 * 24 * 60 * 60;
const TTL_LEDGERS: u32 = TTL_SECONDS / LEDGER_RATE_SECS;

const PROOF_LEN: u32 = 64;
const INPUT_LEN: u32 = 8;

// ═══════════════════════════════════════════════════════════════════════════════
//  Contract
// ═══════════════════════════════════════════════════════════════════════════════

#[contract]
pub struct FheSim;

#[contractimpl]
impl FheSim {
    // ───────────────────────────────────────────────────────────────────────────
    //  Ciphertext creation
    // ───────────────────────────────────────────────────────────────────────────

    /// Trivially encrypt a public constant.
    pub fn encrypt(env: Env, value: u64) -> Handle {
        Self::store_value(&env, value)
    }

    /// Draw a secure random bit. The plaintext bit is never exposed;
    /// callers only ever see the handle.
    pub fn rand_bool(env: Env) -> Handle {
        let bit = env.prng().gen_range::<u64>(0..=1);
        Self::store_value(&env, bit)
    }

    /// Materialize an externally encrypted input. The proof is a public,
    /// plaintext-checkable binding of the payload; an invalid proof traps
    /// the whole invocation.
    pub fn from_input(env: Env, input: Bytes, proof: Bytes) -> Handle {
        if input.len() != INPUT_LEN {
            panic_with_error!(&env, FheError::MalformedInput);
        }
        if proof.len() != PROOF_LEN {
            panic_with_error!(&env, FheError::InvalidProof);
        }

        // Binding check: proof[0..32) must equal keccak256(input)
        let digest: BytesN<32> = env.crypto().keccak256(&input).into();
        let digest_arr = digest.to_array();
        let mut i: u32 = 0;
        while i < 32 {
            if proof.get(i).unwrap_or(0) != digest_arr[i as usize] {
                panic_with_error!(&env, FheError::InvalidProof);
            }
            i += 1;
        }

        let mut value_bytes = [0u8; 8];
        let mut j: u32 = 0;
        while j < INPUT_LEN {
            value_bytes[j as usize] = input.get(j).unwrap_or(0);
            j += 1;
        }
        Self::store_value(&env, u64::from_be_bytes(value_bytes))
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Homomorphic operations
    // ───────────────────────────────────────────────────────────────────────────

    pub fn eq(env: Env, a: Handle, b: Handle) -> Handle {
        let va = Self::read_value(&env, a);
        let vb = Self::read_value(&env, b);
        Self::store_value(&env, (va == vb) as u64)
    }

    pub fn ne(env: Env, a: Handle, b: Handle) -> Handle {
        let va = Self::read_value(&env, a);
        let vb = Self::read_value(&env, b);
        Self::store_value(&env, (va != vb) as u64)
    }

    pub fn and(env: Env, a: Handle, b: Handle) -> Handle {
        let va = Self::read_value(&env, a);
        let vb = Self::read_value(&env, b);
        Self::store_value(&env, (va != 0 && vb != 0) as u64)
    }

    pub fn or(env: Env, a: Handle, b: Handle) -> Handle {
        let va = Self::read_value(&env, a);
        let vb = Self::read_value(&env, b);
        Self::store_value(&env, (va != 0 || vb != 0) as u64)
    }

    pub fn not(env: Env, a: Handle) -> Handle {
        let va = Self::read_value(&env, a);
        Self::store_value(&env, (va == 0) as u64)
    }

    /// Oblivious multiplexer: yields `a` when `cond` is true, `b` otherwise.
    /// Always allocates a fresh handle, so the choice is not observable
    /// from the handle value.
    pub fn select(env: Env, cond: Handle, a: Handle, b: Handle) -> Handle {
        let c = Self::read_value(&env, cond);
        let va = Self::read_value(&env, a);
        let vb = Self::read_value(&env, b);
        Self::store_value(&env, if c != 0 { va } else { vb })
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Decrypt-authorization
    // ───────────────────────────────────────────────────────────────────────────

    /// Grant `who` the right to decrypt `handle`. Grants are per handle:
    /// a freshly computed ciphertext carries no grants from its inputs.
    pub fn allow(env: Env, handle: Handle, who: Address) {
        if handle != 0 && !Self::handle_exists(&env, handle) {
            panic_with_error!(&env, FheError::UnknownHandle);
        }
        let key = DataKey::Grant(handle, who);
        env.storage().persistent().set(&key, &());
        env.storage().persistent().extend_ttl(&key, TTL_LEDGERS, TTL_LEDGERS);
    }

    pub fn is_allowed(env: Env, handle: Handle, who: Address) -> bool {
        handle == 0 || env.storage().persistent().has(&DataKey::Grant(handle, who))
    }

    /// Recover the plaintext behind a handle. Requires the principal's
    /// auth and a prior `allow` grant. Handle 0 decrypts to 0 for anyone.
    pub fn decrypt(env: Env, handle: Handle, who: Address) -> u64 {
        who.require_auth();
        if handle == 0 {
            return 0;
        }
        if !env
            .storage()
            .persistent()
            .has(&DataKey::Grant(handle, who))
        {
            panic_with_error!(&env, FheError::NotAuthorized);
        }
        Self::read_value(&env, handle)
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Internal
    // ───────────────────────────────────────────────────────────────────────────

    fn store_value(env: &Env, value: u64) -> Handle {
        let handle: Handle = env
            .storage()
            .instance()
            .get(&DataKey::NextHandle)
            .unwrap_or(1);
        env.storage()
            .instance()
            .set(&DataKey::NextHandle, &(handle + 1));

        let key = DataKey::Value(handle);
        env.storage().persistent().set(&key, &value);
        env.storage().persistent().extend_ttl(&key, TTL_LEDGERS, TTL_LEDGERS);
        env.storage().instance().extend_ttl(TTL_LEDGERS, TTL_LEDGERS);
        handle
    }

    fn handle_exists(env: &Env, handle: Handle) -> bool {
        env.storage().persistent().has(&DataKey::Value(handle))
    }

    fn read_value(env: &Env, handle: Handle) -> u64 {
        if handle == 0 {
            return 0;
        }
        match env.storage().persistent().get(&DataKey::Value(handle)) {
            Some(v) => v,
            None => panic_with_error!(&env, FheError::UnknownHandle),
        }
    }
}

#[cfg(test)]
mod test;
