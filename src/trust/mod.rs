//! Trust system: score records, tier resolution, penalties.

pub mod manager;
pub mod penalty;
pub mod score;
pub mod tier;

pub use manager::TrustManager;
pub use penalty::{PenaltyEngine, PenaltyPolicy, SlashOutcome, TrustSignal};
pub use score::{TrustScore, MAX_SCORE, MIN_SCORE, STARTING_SCORE};
pub use tier::{TierConfig, TierTable, TrustTier};
