//! Simulation core: house model, player state, staking policies and the
//! session runner.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod house;
pub mod player;
pub mod session;
pub mod staking;
pub mod state;

pub use config::{OutputConfig, PoliciesConfig, SimConfig, SimulationConfig, StopLossParams, WinRateGrid};
pub use config_loader::ConfigLoader;
pub use error::{Result, SimError};
pub use house::{GameOutcome, House, OUTCOME_RANGE};
pub use player::Player;
pub use session::{SessionEnd, SessionReport, SessionRunner};
pub use staking::{
    PolicyKind, StakeParams, StakingPolicy, BASE_STAKE_FRACTION, FLAT_STAKE_BROKE_RATIO,
    MARTINGALE_BROKE_RATIO, STAKE_CAP, STOP_LOSS_RATIO,
};
pub use state::{PlayerState, Pnl, PnlConvention};
