#![no_std]

//! # Confidential Rock-Paper-Scissors
//!
//! A two-player (or one-player-vs-house) Rock-Paper-Scissors contract in
//! which moves and the outcome stay encrypted end to end. The contract
//! stores only ciphertext handles issued by an FHE engine; the winner is
//! computed homomorphically, so not even the contract ever observes a
//! plaintext move.
//!
//! ## Game flow
//! 1. `create_game(player1, opponent)` — opponent `None` means solo play:
//!    the house move is drawn at creation from an encrypted random bit.
//! 2. Each player calls `submit_move` once with an externally encrypted
//!    move plus a validity proof.
//! 3. After every submission the outcome is recomputed obliviously and
//!    both players are re-granted decrypt rights on it.
//! 4. Players decrypt their own move and the outcome via the engine.
//!
//! ## Two-tier error handling
//! Structural misuse (unknown game, non-player caller, self-play, bad
//! input proof) fails hard with a typed error and no state change. Game
//! logic problems (illegal move value, duplicate submission) never fail:
//! the submission completes as an oblivious no-op and the diagnosis is
//! written to the caller's encrypted last-error record, readable by that
//! caller alone. Branching on those conditions in the clear would leak
//! game state through control flow.
//!
//! ## Move and outcome encoding
//! Moves: 0 = none, 1 = rock, 2 = paper, 3 = scissors.
//! Outcomes: 0 = pending, 1 = player1 wins, 2 = player2 wins, 3 = tie.
//! The outcome stays pending until both slots hold a real move.

use soroban_sdk::{
    contract, contractclient, contracterror, contractevent, contractimpl, contracttype, Address,
    Bytes, BytesN, Env,
};

// ═══════════════════════════════════════════════════════════════════════════════
//  Contract Events
// ═══════════════════════════════════════════════════════════════════════════════

#[contractevent]
pub struct EvGameCreated {
    pub game_id: u64,
    pub player1: Address,
    /// `None` for a solo game against the house.
    pub player2: Option<Address>,
}

/// Emitted for every submission, accepted or not — a conditional event
/// would reveal the accept/reject decision.
#[contractevent]
pub struct EvMoveSubmitted {
    pub game_id: u64,
    pub player: Address,
}

/// Emitted on every evaluation of a player's last-error record, even
/// when the stored error value did not change.
#[contractevent]
pub struct EvErrorChanged {
    pub player: Address,
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  External trait interfaces
// ═══════════════════════════════════════════════════════════════════════════════

/// An opaque ciphertext handle issued by the FHE engine. 0 denotes
/// "no ciphertext" and decrypts to 0.
pub type Handle = u64;

/// FHE engine contract interface. Ciphertexts are opaque handles; every
/// operation is oblivious (its result handle and cost reveal nothing
/// about the plaintexts) and yields a fresh handle with no grants.
///
/// The engine address is injected at construction, so the game logic can
/// run against a real coprocessor or a plaintext-simulating test engine.
#[contractclient(name = "FheEngineClient")]
pub trait FheEngine {
    /// Trivial encryption of a public constant.
    fn encrypt(env: Env, value: u64) -> Handle;
    /// Encrypted uniformly random bit.
    fn rand_bool(env: Env) -> Handle;
    /// Materialize an external ciphertext; traps on an invalid proof.
    fn from_input(env: Env, input: Bytes, proof: Bytes) -> Handle;
    fn eq(env: Env, a: Handle, b: Handle) -> Handle;
    fn ne(env: Env, a: Handle, b: Handle) -> Handle;
    fn and(env: Env, a: Handle, b: Handle) -> Handle;
    fn or(env: Env, a: Handle, b: Handle) -> Handle;
    fn not(env: Env, a: Handle) -> Handle;
    /// Oblivious multiplexer: `cond ? a : b`.
    fn select(env: Env, cond: Handle, a: Handle, b: Handle) -> Handle;
    /// Grant `who` decrypt rights on `handle`. Grants do not carry over
    /// to freshly written handles, so every write re-grants.
    fn allow(env: Env, handle: Handle, who: Address);
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum RpsError {
    SelfPlayNotAllowed = 1,
    GameNotFound = 2,
    NotAPlayer = 3,
    AdminNotSet = 4,
    EngineNotSet = 5,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Plaintext domains (encrypted in storage, public as constants)
// ═══════════════════════════════════════════════════════════════════════════════

pub type MoveValue = u64;

pub const MOVE_NONE: MoveValue = 0;
pub const MOVE_ROCK: MoveValue = 1;
pub const MOVE_PAPER: MoveValue = 2;
pub const MOVE_SCISSORS: MoveValue = 3;

pub type Outcome = u64;

pub const OUTCOME_PENDING: Outcome = 0;
pub const OUTCOME_PLAYER1_WIN: Outcome = 1;
pub const OUTCOME_PLAYER2_WIN: Outcome = 2;
pub const OUTCOME_TIE: Outcome = 3;

pub type ErrorCode = u64;

pub const ERR_NONE: ErrorCode = 0;
pub const ERR_INVALID_MOVE: ErrorCode = 1;
pub const ERR_ALREADY_SUBMITTED: ErrorCode = 2;

// Player slots
const PLAYER_1: u32 = 1;
const PLAYER_2: u32 = 2;

// ═══════════════════════════════════════════════════════════════════════════════
//  Game state & storage keys
// ═══════════════════════════════════════════════════════════════════════════════

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Game {
    pub player1: Address,
    /// `None` is the house sentinel: a solo game whose second move was
    /// drawn at creation and is never readable by player1.
    pub player2: Option<Address>,
    pub move1: Handle,
    pub move2: Handle,
    pub outcome: Handle,
}

/// Per-player confidential error record. The error code is a ciphertext
/// only the affected player (and the contract) can decrypt; the
/// timestamp of the last evaluation is public.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LastError {
    pub error: Handle,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone)]
enum StorageKey {
    Admin,
    EngineAddress,
    /// Next game id to allocate (starts at 1; id 0 never exists).
    NextGameId,
    Game(u64),
    LastError(Address),
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Constants
// ═══════════════════════════════════════════════════════════════════════════════

// Ledger rate is approximately 5 seconds per ledger on Stellar
const LEDGER_RATE_SECS: u32 = 5;

// Games and error records are populate-only; keep them around for 120 days
const TTL_SECONDS: u32 = 120 * 24 * 60 * 60;
const TTL_LEDGERS: u32 = TTL_SECONDS / LEDGER_RATE_SECS;

// ═══════════════════════════════════════════════════════════════════════════════
//  Contract
// ═══════════════════════════════════════════════════════════════════════════════

#[contract]
pub struct RpsContract;

#[contractimpl]
impl RpsContract {
    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Constructor & Lifecycle
    // ───────────────────────────────────────────────────────────────────────────

    pub fn __constructor(env: Env, admin: Address, engine: Address) {
        env.storage().instance().set(&StorageKey::Admin, &admin);
        env.storage()
            .instance()
            .set(&StorageKey::EngineAddress, &engine);
    }

    /// Create a game. `opponent = None` starts a solo game against the
    /// house: the house move is committed at creation from an encrypted
    /// random bit, so the player cannot react to it and the contract
    /// never learns it.
    pub fn create_game(
        env: Env,
        player1: Address,
        opponent: Option<Address>,
    ) -> Result<u64, RpsError> {
        player1.require_auth();
        if opponent.as_ref() == Some(&player1) {
            return Err(RpsError::SelfPlayNotAllowed);
        }

        let fhe = Self::engine(&env)?;
        let game_id = Self::allocate_game_id(&env);
        let this = env.current_contract_address();

        let move1 = fhe.encrypt(&MOVE_NONE);
        let outcome = fhe.encrypt(&OUTCOME_PENDING);
        let move2 = match &opponent {
            Some(_) => fhe.encrypt(&MOVE_NONE),
            None => {
                // One random bit plus an offset draws from {rock, paper}
                // without branching on the bit. The narrowed range (no
                // scissors for the house) matches the 1-bit draw of the
                // original design.
                let bit = fhe.rand_bool();
                let rock = fhe.encrypt(&MOVE_ROCK);
                let paper = fhe.encrypt(&MOVE_PAPER);
                fhe.select(&bit, &paper, &rock)
            }
        };

        // The contract keeps compute rights on every field it stores.
        fhe.allow(&move1, &this);
        fhe.allow(&move2, &this);
        fhe.allow(&outcome, &this);
        // Players may read the outcome from the start. The house move is
        // never granted to the creator; only the outcome derived from it.
        fhe.allow(&outcome, &player1);
        if let Some(p2) = &opponent {
            fhe.allow(&outcome, p2);
        }

        let game = Game {
            player1: player1.clone(),
            player2: opponent.clone(),
            move1,
            move2,
            outcome,
        };
        Self::write_game(&env, game_id, &game);

        EvGameCreated {
            game_id,
            player1,
            player2: opponent,
        }
        .publish(&env);

        Ok(game_id)
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Move submission
    // ───────────────────────────────────────────────────────────────────────────

    /// Submit an encrypted move. Structural problems (unknown game,
    /// caller not a player, invalid proof) fail hard; everything after
    /// that runs obliviously to completion. An illegal move value or a
    /// duplicate submission leaves the stored move unchanged and records
    /// the diagnosis in the caller's confidential last-error record.
    pub fn submit_move(
        env: Env,
        player: Address,
        game_id: u64,
        move_input: Bytes,
        proof: Bytes,
    ) -> Result<(), RpsError> {
        player.require_auth();

        let mut game = Self::read_game(&env, game_id)?;
        let slot = Self::resolve_slot(&game, &player)?;
        let fhe = Self::engine(&env)?;
        let this = env.current_contract_address();

        // Materialize first: proof validity is public, so a bad proof
        // traps here before any state or error record is touched.
        let submitted = fhe.from_input(&move_input, &proof);

        let rock = fhe.encrypt(&MOVE_ROCK);
        let paper = fhe.encrypt(&MOVE_PAPER);
        let scissors = fhe.encrypt(&MOVE_SCISSORS);
        let legal = fhe.or(
            &fhe.or(
                &fhe.eq(&submitted, &rock),
                &fhe.eq(&submitted, &paper),
            ),
            &fhe.eq(&submitted, &scissors),
        );
        let invalid = fhe.not(&legal);
        Self::record_if(&env, &fhe, &this, &player, ERR_INVALID_MOVE, invalid);

        let stored = match slot {
            PLAYER_1 => game.move1,
            _ => game.move2,
        };
        let none = fhe.encrypt(&MOVE_NONE);
        let already = fhe.ne(&stored, &none);
        // Recorded after InvalidMove: when both conditions hold, the
        // duplicate diagnosis is the one the player reads back.
        Self::record_if(&env, &fhe, &this, &player, ERR_ALREADY_SUBMITTED, already);

        // Single oblivious update: keep the submission only when it is
        // legal and the slot is still empty.
        let accept = fhe.and(&fhe.not(&invalid), &fhe.not(&already));
        let updated = fhe.select(&accept, &submitted, &stored);
        fhe.allow(&updated, &this);
        fhe.allow(&updated, &player);
        match slot {
            PLAYER_1 => game.move1 = updated,
            _ => game.move2 = updated,
        }

        EvMoveSubmitted { game_id, player }.publish(&env);

        // Recomputed after every submission; keeps Pending while a slot
        // is still empty.
        Self::refresh_outcome(&env, &fhe, &mut game);
        Self::write_game(&env, game_id, &game);
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Reads
    // ───────────────────────────────────────────────────────────────────────────

    /// Stored ciphertext handles, verbatim. Anyone may fetch them; only
    /// granted principals can decrypt any given field via the engine.
    pub fn get_game(env: Env, game_id: u64) -> Result<Game, RpsError> {
        Self::read_game(&env, game_id)
    }

    pub fn game_exists(env: Env, game_id: u64) -> bool {
        game_id != 0 && env.storage().persistent().has(&StorageKey::Game(game_id))
    }

    /// The caller's own move slot. Non-players are rejected outright.
    pub fn get_player_move(env: Env, game_id: u64, player: Address) -> Result<Handle, RpsError> {
        let game = Self::read_game(&env, game_id)?;
        let slot = Self::resolve_slot(&game, &player)?;
        Ok(match slot {
            PLAYER_1 => game.move1,
            _ => game.move2,
        })
    }

    /// A player's confidential last-error record. Returns handle 0 (which
    /// decrypts to `ERR_NONE`) and timestamp 0 when no record exists yet.
    pub fn get_last_error(env: Env, player: Address) -> LastError {
        Self::read_last_error(&env, &player).unwrap_or(LastError {
            error: 0,
            timestamp: 0,
        })
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Admin
    // ───────────────────────────────────────────────────────────────────────────

    pub fn get_admin(env: Env) -> Result<Address, RpsError> {
        Self::load_admin(&env)
    }

    pub fn set_admin(env: Env, new_admin: Address) -> Result<(), RpsError> {
        let admin = Self::load_admin(&env)?;
        admin.require_auth();
        env.storage().instance().set(&StorageKey::Admin, &new_admin);
        Ok(())
    }

    pub fn get_engine(env: Env) -> Result<Address, RpsError> {
        Self::load_engine(&env)
    }

    pub fn set_engine(env: Env, new_engine: Address) -> Result<(), RpsError> {
        let admin = Self::load_admin(&env)?;
        admin.require_auth();
        env.storage()
            .instance()
            .set(&StorageKey::EngineAddress, &new_engine);
        Ok(())
    }

    pub fn upgrade(env: Env, new_wasm_hash: BytesN<32>) -> Result<(), RpsError> {
        let admin = Self::load_admin(&env)?;
        admin.require_auth();
        env.deployer().update_current_contract_wasm(new_wasm_hash);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    //  Internal: Winner determination
    // ═══════════════════════════════════════════════════════════════════════════

    /// Recompute the encrypted outcome from the current move slots. A
    /// fixed circuit of comparisons and nested selects; no step depends
    /// on the plaintext moves.
    fn refresh_outcome(env: &Env, fhe: &FheEngineClient, game: &mut Game) {
        let none = fhe.encrypt(&MOVE_NONE);
        let rock = fhe.encrypt(&MOVE_ROCK);
        let paper = fhe.encrypt(&MOVE_PAPER);
        let scissors = fhe.encrypt(&MOVE_SCISSORS);

        let not_pending = fhe.and(
            &fhe.ne(&game.move1, &none),
            &fhe.ne(&game.move2, &none),
        );
        let tie = fhe.and(&not_pending, &fhe.eq(&game.move1, &game.move2));
        // Rock beats scissors, paper beats rock, scissors beats paper
        let p1_beats = fhe.or(
            &fhe.or(
                &fhe.and(&fhe.eq(&game.move1, &rock), &fhe.eq(&game.move2, &scissors)),
                &fhe.and(&fhe.eq(&game.move1, &paper), &fhe.eq(&game.move2, &rock)),
            ),
            &fhe.and(&fhe.eq(&game.move1, &scissors), &fhe.eq(&game.move2, &paper)),
        );
        let player1_wins = fhe.and(&not_pending, &p1_beats);
        let player2_wins = fhe.and(
            &not_pending,
            &fhe.and(&fhe.not(&tie), &fhe.not(&player1_wins)),
        );

        // Priority: tie, then player1, then player2 (mutually exclusive
        // by construction); otherwise the previous outcome is retained.
        let o_tie = fhe.encrypt(&OUTCOME_TIE);
        let o_p1 = fhe.encrypt(&OUTCOME_PLAYER1_WIN);
        let o_p2 = fhe.encrypt(&OUTCOME_PLAYER2_WIN);
        let outcome = fhe.select(
            &tie,
            &o_tie,
            &fhe.select(
                &player1_wins,
                &o_p1,
                &fhe.select(&player2_wins, &o_p2, &game.outcome),
            ),
        );

        let this = env.current_contract_address();
        fhe.allow(&outcome, &this);
        fhe.allow(&outcome, &game.player1);
        if let Some(p2) = &game.player2 {
            fhe.allow(&outcome, p2);
        }
        game.outcome = outcome;
    }

    // ═══════════════════════════════════════════════════════════════════════════
    //  Internal: Confidential error tracking
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record `code` into the player's last-error record when `cond`
    /// holds, obliviously: when it does not, the previous error value is
    /// retained (not reset), while the timestamp is refreshed either
    /// way. The asymmetry is deliberate and pinned by tests.
    fn record_if(
        env: &Env,
        fhe: &FheEngineClient,
        this: &Address,
        player: &Address,
        code: ErrorCode,
        cond: Handle,
    ) {
        let code_ct = fhe.encrypt(&code);
        let prev = match Self::read_last_error(env, player) {
            Some(rec) => rec.error,
            None => fhe.encrypt(&ERR_NONE),
        };
        let error = fhe.select(&cond, &code_ct, &prev);
        fhe.allow(&error, this);
        fhe.allow(&error, player);

        let timestamp = env.ledger().timestamp();
        let key = StorageKey::LastError(player.clone());
        env.storage()
            .persistent()
            .set(&key, &LastError { error, timestamp });
        env.storage()
            .persistent()
            .extend_ttl(&key, TTL_LEDGERS, TTL_LEDGERS);

        // The encrypted comparison needed to detect "no real change" is
        // never performed, so this over-notifies rather than leaks.
        EvErrorChanged {
            player: player.clone(),
            timestamp,
        }
        .publish(env);
    }

    fn read_last_error(env: &Env, player: &Address) -> Option<LastError> {
        env.storage()
            .persistent()
            .get(&StorageKey::LastError(player.clone()))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    //  Internal: Registry & configuration
    // ═══════════════════════════════════════════════════════════════════════════

    fn resolve_slot(game: &Game, player: &Address) -> Result<u32, RpsError> {
        if *player == game.player1 {
            Ok(PLAYER_1)
        } else if game.player2.as_ref() == Some(player) {
            Ok(PLAYER_2)
        } else {
            Err(RpsError::NotAPlayer)
        }
    }

    fn allocate_game_id(env: &Env) -> u64 {
        let id: u64 = env
            .storage()
            .instance()
            .get(&StorageKey::NextGameId)
            .unwrap_or(1);
        env.storage()
            .instance()
            .set(&StorageKey::NextGameId, &(id + 1));
        id
    }

    fn read_game(env: &Env, game_id: u64) -> Result<Game, RpsError> {
        env.storage()
            .persistent()
            .get(&StorageKey::Game(game_id))
            .ok_or(RpsError::GameNotFound)
    }

    fn write_game(env: &Env, game_id: u64, game: &Game) {
        let key = StorageKey::Game(game_id);
        env.storage().persistent().set(&key, game);
        env.storage()
            .persistent()
            .extend_ttl(&key, TTL_LEDGERS, TTL_LEDGERS);
        // Keep instance storage (admin, engine address, id counter) alive
        env.storage().instance().extend_ttl(TTL_LEDGERS, TTL_LEDGERS);
    }

    fn engine(env: &Env) -> Result<FheEngineClient<'_>, RpsError> {
        Ok(FheEngineClient::new(env, &Self::load_engine(env)?))
    }

    fn load_admin(env: &Env) -> Result<Address, RpsError> {
        env.storage()
            .instance()
            .get(&StorageKey::Admin)
            .ok_or(RpsError::AdminNotSet)
    }

    fn load_engine(env: &Env) -> Result<Address, RpsError> {
        env.storage()
            .instance()
            .get(&StorageKey::EngineAddress)
            .ok_or(RpsError::EngineNotSet)
    }
}
