//! Single-session CLI command.

use anyhow::{Context, Result};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use wager_sim_core::{House, Player, PolicyKind, SessionReport, SessionRunner, StakingPolicy};
use wager_sim_engine::{master_rng, ReportFormatter, StatBlock};

use super::OutputFormat;

/// Arguments for the session command.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Staking policy: flat_stake, martingale, martingale_stop_loss
    #[arg(long, default_value = "martingale")]
    pub policy: PolicyKind,

    /// Probability of winning a game
    #[arg(long, default_value = "0.5")]
    pub win_rate: f64,

    /// Probability of a tie
    #[arg(long, default_value = "0")]
    pub tie_rate: f64,

    /// Net return paid on a winning stake
    #[arg(long, default_value = "1")]
    pub roi: Decimal,

    /// Maximum games to play
    #[arg(long, default_value = "1000")]
    pub games: u64,

    /// Initial bankroll
    #[arg(long, default_value = "1000000")]
    pub budget: Decimal,

    /// Seed for a reproducible session
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct SessionOutput<'a> {
    policy: PolicyKind,
    win_rate: f64,
    tie_rate: f64,
    roi: Decimal,
    report: &'a SessionReport,
}

/// Plays one session with trajectory tracking on.
///
/// # Errors
///
/// Returns an error if the house or player cannot be built, or the policy
/// produces an invalid stake.
pub fn simulate_session(args: &SessionArgs) -> Result<SessionReport> {
    let house = House::new(args.win_rate, args.tie_rate, args.roi).context("Invalid house")?;
    let player = Player::new(StakingPolicy::for_kind(args.policy), args.budget).context("Invalid player")?;
    let mut rng = master_rng(args.seed);

    let report = SessionRunner::new(args.games)
        .with_trajectory(true)
        .run(player, &house, &mut rng)?;

    info!(
        policy = %args.policy,
        games = report.state.games_played,
        balance = %report.state.balance,
        end = ?report.end,
        "Session finished"
    );
    Ok(report)
}

/// Run the session command.
pub fn run_session(args: SessionArgs) -> Result<()> {
    let report = simulate_session(&args)?;

    match args.format {
        OutputFormat::Text => {
            print!("{}", ReportFormatter::format_session(args.policy, &report));
            if let Some(trajectory) = &report.trajectory {
                println!();
                print!(
                    "{}",
                    ReportFormatter::format_block("Balance Trajectory", &StatBlock::from_values(trajectory))
                );
            }
        }
        OutputFormat::Json => {
            let output = SessionOutput {
                policy: args.policy,
                win_rate: args.win_rate,
                tie_rate: args.tie_rate,
                roi: args.roi,
                report: &report,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wager_sim_core::SessionEnd;

    fn args(policy: PolicyKind, win_rate: f64, games: u64) -> SessionArgs {
        SessionArgs {
            policy,
            win_rate,
            tie_rate: 0.0,
            roi: dec!(1),
            games,
            budget: dec!(1000000),
            seed: Some(1),
            format: OutputFormat::Text,
        }
    }

    #[test]
    fn certain_win_single_game() {
        let report = simulate_session(&args(PolicyKind::FlatStake, 1.0, 1)).unwrap();
        assert_eq!(report.state.balance, dec!(1010000));
        assert_eq!(report.end, SessionEnd::Exhausted);
        assert_eq!(report.trajectory.unwrap(), vec![dec!(1000000), dec!(1010000)]);
    }

    #[test]
    fn certain_loss_ends_broke() {
        let report = simulate_session(&args(PolicyKind::Martingale, 0.0, 1000)).unwrap();
        assert_eq!(report.end, SessionEnd::Broke);
        assert!(report.state.games_played < 1000);
    }

    #[test]
    fn invalid_house_is_rejected() {
        let mut bad = args(PolicyKind::FlatStake, 0.9, 10);
        bad.tie_rate = 0.2;
        assert!(simulate_session(&bad).is_err());
    }
}
