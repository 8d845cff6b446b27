//! Per-player session state.
//!
//! A [`PlayerState`] is created with an initial budget, mutated once per game
//! and becomes a read-only snapshot when its session ends. Snapshots are what
//! the aggregator and the persistence layer consume.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::house::GameOutcome;

/// Mutable bankroll and performance tracking for one simulated player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Budget the session started with.
    pub initial_budget: Decimal,
    /// Current bankroll.
    pub balance: Decimal,
    /// Most recent stake.
    pub last_bet: Decimal,
    /// Largest stake placed so far.
    pub max_bet: Decimal,
    /// Total staked since the last win.
    pub cumulative_bet: Decimal,
    /// First stake of the current losing streak.
    pub streak_initial_bet: Decimal,
    /// Whether the previous game was a loss.
    pub lost_last_game: bool,
    pub wins: u64,
    pub ties: u64,
    pub losses: u64,
    pub losing_streak: u64,
    pub max_losing_streak: u64,
    pub games_played: u64,
    /// Highest balance observed, including the initial budget.
    pub peak_balance: Decimal,
    /// Most negative drawdown percentage observed; 0 means none yet.
    pub max_drawdown_pct: Decimal,
    /// Next balance that counts as a doubling.
    pub target_balance: Decimal,
    /// `games_played` at the previous doubling.
    pub last_double_game: u64,
    /// Games between successive doublings, in order.
    pub doubling_intervals: Vec<u64>,
}

/// Absolute and relative profit of a player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pnl {
    pub amount: Decimal,
    pub percent: Decimal,
}

/// How a PnL percentage is expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PnlConvention {
    /// `(balance - initial) / initial * 100`; zero means break-even.
    #[default]
    ProfitRelative,
    /// `balance / initial * 100`; 100 means break-even.
    BalanceRelative,
}

impl PnlConvention {
    /// PnL percentage of a state under this convention.
    #[must_use]
    pub fn percent(self, state: &PlayerState) -> Decimal {
        match self {
            Self::ProfitRelative => {
                (state.balance - state.initial_budget) / state.initial_budget * dec!(100)
            }
            Self::BalanceRelative => state.balance / state.initial_budget * dec!(100),
        }
    }
}

impl PlayerState {
    /// Creates a fresh state holding `initial_budget`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NonPositiveBudget`] if the budget is zero or negative.
    pub fn new(initial_budget: Decimal) -> Result<Self> {
        if initial_budget <= Decimal::ZERO {
            return Err(SimError::NonPositiveBudget(initial_budget));
        }
        Ok(Self {
            initial_budget,
            balance: initial_budget,
            last_bet: Decimal::ZERO,
            max_bet: Decimal::ZERO,
            cumulative_bet: Decimal::ZERO,
            streak_initial_bet: Decimal::ZERO,
            lost_last_game: false,
            wins: 0,
            ties: 0,
            losses: 0,
            losing_streak: 0,
            max_losing_streak: 0,
            games_played: 0,
            peak_balance: initial_budget,
            max_drawdown_pct: Decimal::ZERO,
            target_balance: initial_budget * dec!(2),
            last_double_game: 0,
            doubling_intervals: Vec::new(),
        })
    }

    /// Profit relative to the initial budget.
    #[must_use]
    pub fn pnl(&self) -> Pnl {
        Pnl {
            amount: self.balance - self.initial_budget,
            percent: PnlConvention::ProfitRelative.percent(self),
        }
    }

    /// Drawdown of the current balance from the peak, as a non-positive percentage.
    #[must_use]
    pub fn current_drawdown_pct(&self) -> Decimal {
        (self.balance / self.peak_balance - Decimal::ONE) * dec!(100)
    }

    /// Clears the losing-streak stake tracker.
    pub fn reset_streak(&mut self) {
        self.lost_last_game = false;
        self.last_bet = Decimal::ZERO;
        self.cumulative_bet = Decimal::ZERO;
        self.streak_initial_bet = Decimal::ZERO;
    }

    /// Takes `stake` out of the balance and updates the stake trackers.
    pub(crate) fn place_bet(&mut self, stake: Decimal) {
        if !self.lost_last_game {
            self.streak_initial_bet = stake;
        }
        self.cumulative_bet += stake;
        self.balance -= stake;
        self.last_bet = stake;
        if self.max_bet < stake {
            self.max_bet = stake;
        }
    }

    /// Books the house's payout for a placed stake and runs the per-game
    /// bookkeeping: counters, drawdown, game count and doubling check.
    pub(crate) fn settle(&mut self, stake: Decimal, payout: Decimal) -> GameOutcome {
        let outcome = GameOutcome::classify(stake, payout);
        match outcome {
            GameOutcome::Win => {
                self.wins += 1;
                self.reset_streak();
                self.losing_streak = 0;
            }
            GameOutcome::Tie => self.ties += 1,
            GameOutcome::Loss => {
                self.losses += 1;
                self.losing_streak += 1;
                self.max_losing_streak = self.max_losing_streak.max(self.losing_streak);
                self.lost_last_game = true;
            }
        }
        self.balance += payout;
        self.update_drawdown();
        self.games_played += 1;
        self.track_doubling();
        outcome
    }

    fn update_drawdown(&mut self) {
        self.peak_balance = self.peak_balance.max(self.balance);
        let drawdown = self.current_drawdown_pct();
        self.max_drawdown_pct = self.max_drawdown_pct.min(drawdown);
    }

    fn track_doubling(&mut self) {
        if self.balance < self.target_balance {
            return;
        }
        self.doubling_intervals
            .push(self.games_played - self.last_double_game);
        self.target_balance *= dec!(2);
        self.last_double_game = self.games_played;
    }
}
