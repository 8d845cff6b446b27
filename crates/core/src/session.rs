//! Drives one player through a bounded number of games against one house.

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Result;
use crate::house::House;
use crate::player::Player;
use crate::state::PlayerState;

/// Upper bound on the balances reserved up front; `max_games` is only a bound
/// and most sessions end broke long before it.
const TRAJECTORY_CAPACITY_HINT: usize = 4096;

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// The player reached the policy's broke threshold.
    Broke,
    /// The game budget ran out.
    Exhausted,
}

/// Terminal outcome of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub state: PlayerState,
    pub end: SessionEnd,
    /// Balance before the first game and after every game, when tracked.
    pub trajectory: Option<Vec<Decimal>>,
}

/// Runs sessions of at most `max_games` games.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRunner {
    max_games: u64,
    track_trajectory: bool,
}

impl SessionRunner {
    #[must_use]
    pub fn new(max_games: u64) -> Self {
        Self {
            max_games,
            track_trajectory: false,
        }
    }

    /// Records the balance after every game. Costs one `Decimal` per game.
    #[must_use]
    pub fn with_trajectory(mut self, track: bool) -> Self {
        self.track_trajectory = track;
        self
    }

    #[must_use]
    pub fn max_games(&self) -> u64 {
        self.max_games
    }

    /// Plays until the game budget is spent or the player is broke.
    ///
    /// Broke is checked before every game; a broke player is not mutated
    /// further. The end reason is taken from the final state, so a player who
    /// goes broke on the very last game reports [`SessionEnd::Broke`].
    ///
    /// # Errors
    ///
    /// Propagates a stake violation raised by the player's policy.
    pub fn run<R: Rng + ?Sized>(
        &self,
        mut player: Player,
        house: &House,
        rng: &mut R,
    ) -> Result<SessionReport> {
        let mut trajectory = self.track_trajectory.then(|| {
            let hint = usize::try_from(self.max_games).map_or(TRAJECTORY_CAPACITY_HINT, |n| {
                n.min(TRAJECTORY_CAPACITY_HINT)
            });
            let mut balances = Vec::with_capacity(hint + 1);
            balances.push(player.state().balance);
            balances
        });

        for _ in 0..self.max_games {
            if player.is_broke() {
                break;
            }
            player.play(house, rng)?;
            if let Some(balances) = trajectory.as_mut() {
                balances.push(player.state().balance);
            }
        }

        let end = if player.is_broke() {
            SessionEnd::Broke
        } else {
            SessionEnd::Exhausted
        };
        trace!(
            policy = %player.kind(),
            games = player.state().games_played,
            balance = %player.state().balance,
            ?end,
            "session finished"
        );

        Ok(SessionReport {
            state: player.into_state(),
            end,
            trajectory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::StakingPolicy;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rust_decimal_macros::dec;

    #[test]
    fn exhausts_game_budget_when_never_broke() {
        let player = Player::new(StakingPolicy::flat_stake(), dec!(1000)).unwrap();
        let house = House::new(1.0, 0.0, dec!(1)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let report = SessionRunner::new(25).run(player, &house, &mut rng).unwrap();

        assert_eq!(report.end, SessionEnd::Exhausted);
        assert_eq!(report.state.games_played, 25);
        assert!(report.trajectory.is_none());
    }

    #[test]
    fn stops_as_soon_as_player_is_broke() {
        let player = Player::new(StakingPolicy::flat_stake(), dec!(1000)).unwrap();
        let house = House::new(0.0, 0.0, dec!(1)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let report = SessionRunner::new(1000).run(player, &house, &mut rng).unwrap();

        assert_eq!(report.end, SessionEnd::Broke);
        assert_eq!(report.state.games_played, 69);
        assert!(report.state.balance <= dec!(500));
    }

    #[test]
    fn broke_on_last_game_reports_broke() {
        let player = Player::new(StakingPolicy::flat_stake(), dec!(1000)).unwrap();
        let house = House::new(0.0, 0.0, dec!(1)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let report = SessionRunner::new(69).run(player, &house, &mut rng).unwrap();

        assert_eq!(report.state.games_played, 69);
        assert_eq!(report.end, SessionEnd::Broke);
    }

    #[test]
    fn trajectory_holds_initial_and_every_game() {
        let player = Player::new(StakingPolicy::martingale(), dec!(10000)).unwrap();
        let house = House::new(0.5, 0.0, dec!(1)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let report = SessionRunner::new(40)
            .with_trajectory(true)
            .run(player, &house, &mut rng)
            .unwrap();

        let trajectory = report.trajectory.unwrap();
        assert_eq!(trajectory.len() as u64, report.state.games_played + 1);
        assert_eq!(trajectory[0], dec!(10000));
        assert_eq!(*trajectory.last().unwrap(), report.state.balance);
    }

    #[test]
    fn huge_game_budget_with_trajectory_stops_on_broke() {
        let house = House::new(0.0, 0.0, dec!(1)).unwrap();
        for max_games in [u64::MAX, 1u64 << 40] {
            let player = Player::new(StakingPolicy::flat_stake(), dec!(1000)).unwrap();
            let report = SessionRunner::new(max_games)
                .with_trajectory(true)
                .run(player, &house, &mut ChaCha8Rng::seed_from_u64(3))
                .unwrap();

            assert_eq!(report.end, SessionEnd::Broke);
            assert_eq!(report.state.games_played, 69);
            assert_eq!(report.trajectory.unwrap().len(), 70);
        }
    }

    #[test]
    fn same_seed_gives_same_terminal_state() {
        let house = House::new(0.55, 0.05, dec!(1)).unwrap();
        let runner = SessionRunner::new(300);
        let run = |seed| {
            let player = Player::new(StakingPolicy::martingale_stop_loss(), dec!(50000)).unwrap();
            runner
                .run(player, &house, &mut ChaCha8Rng::seed_from_u64(seed))
                .unwrap()
        };
        assert_eq!(run(11), run(11));
    }
}
