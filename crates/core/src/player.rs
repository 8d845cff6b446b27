//! A simulated player: a staking policy driving a [`PlayerState`].

use rand::Rng;
use rust_decimal::Decimal;

use crate::error::{Result, SimError};
use crate::house::{GameOutcome, House};
use crate::staking::{PolicyKind, StakingPolicy};
use crate::state::PlayerState;

/// Player owning its policy and session state.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    policy: StakingPolicy,
    state: PlayerState,
}

impl Player {
    /// Creates a player with a fresh state holding `initial_budget`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the budget is not positive or the
    /// policy constants are out of range.
    pub fn new(policy: StakingPolicy, initial_budget: Decimal) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            policy,
            state: PlayerState::new(initial_budget)?,
        })
    }

    #[must_use]
    pub fn policy(&self) -> &StakingPolicy {
        &self.policy
    }

    #[must_use]
    pub fn kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    #[must_use]
    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    /// Consumes the player, leaving its terminal snapshot.
    #[must_use]
    pub fn into_state(self) -> PlayerState {
        self.state
    }

    #[must_use]
    pub fn is_broke(&self) -> bool {
        self.policy.is_broke(&self.state)
    }

    /// Sizes and places the next stake, deducting it from the balance.
    ///
    /// The stake is the policy's required bet, clamped to the balance, then
    /// passed through the policy's stop-loss.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StakeViolation`] if the final stake is negative or
    /// larger than the balance. The balance is left untouched in that case.
    pub fn bet(&mut self, roi: Decimal) -> Result<Decimal> {
        let required = self.policy.required_bet(&self.state, roi);
        let stake = required.min(self.state.balance);
        let stake = self.policy.apply_stop_loss(&mut self.state, stake);

        if stake < Decimal::ZERO || stake > self.state.balance {
            return Err(SimError::StakeViolation {
                stake,
                balance: self.state.balance,
            });
        }

        self.state.place_bet(stake);
        Ok(stake)
    }

    /// Plays one game against `house`.
    ///
    /// # Errors
    ///
    /// Propagates [`SimError::StakeViolation`] from [`Player::bet`].
    pub fn play<R: Rng + ?Sized>(&mut self, house: &House, rng: &mut R) -> Result<GameOutcome> {
        let stake = self.bet(house.return_on_investment())?;
        let payout = house.resolve(stake, rng);
        Ok(self.state.settle(stake, payout))
    }
}
