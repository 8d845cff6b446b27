#![allow(clippy::format_push_string)]

use rust_decimal::Decimal;
use wager_sim_core::{PolicyKind, SessionReport};

use crate::aggregate::RateSummary;
use crate::context::GroupKey;
use crate::statistics::StatBlock;

const RULE_HEAVY: &str = "═══════════════════════════════════════════════════════════════════════════════\n";
const RULE_LIGHT: &str = "───────────────────────────────────────────────────────────────────────────────\n";

pub struct ReportFormatter;

impl ReportFormatter {
    /// Renders one `(policy, roi)` group as a table with one row per win rate.
    #[must_use]
    pub fn format_group(key: &GroupKey, summaries: &[RateSummary]) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str(RULE_HEAVY);
        output.push_str(&format!("  {}  (roi {})\n", key.policy.name().to_uppercase(), key.roi));
        output.push_str(RULE_HEAVY);

        if summaries.is_empty() {
            output.push_str("No sessions recorded.\n");
            output.push_str(RULE_HEAVY);
            return output;
        }

        output.push_str(&format!(
            "{:>7} {:>7} │ {:>10} {:>10} │ {:>10} {:>10} │ {:>9} {:>9}\n",
            "rate", "n", "mdd mean", "mdd min", "pnl mean", "pnl std", "dbl mean", "dbl n"
        ));
        output.push_str(RULE_LIGHT);

        for summary in summaries {
            output.push_str(&format!(
                "{:>7} {:>7} │ {:>9.2}% {:>9.2}% │ {:>9.2}% {:>10.2} │ {:>9.1} {:>9}\n",
                summary.rate.to_string(),
                summary.sample_size,
                summary.max_drawdown.mean,
                summary.max_drawdown.min,
                summary.pnl.mean,
                summary.pnl.std,
                summary.doubling_interval.mean,
                doubling_count(&summary.doubling_interval),
            ));
        }

        output.push_str(RULE_HEAVY);
        output
    }

    /// Renders the terminal state of a single session.
    #[must_use]
    pub fn format_session(policy: PolicyKind, report: &SessionReport) -> String {
        let state = &report.state;
        let pnl = state.pnl();
        let mut output = String::new();

        output.push('\n');
        output.push_str(RULE_HEAVY);
        output.push_str(&format!("  {}\n", policy.name().to_uppercase()));
        output.push_str(RULE_HEAVY);
        output.push_str(&format!("Initial Budget:        {:.2}\n", state.initial_budget));
        output.push_str(&format!("Final Balance:         {:.2}\n", state.balance));
        output.push_str(&format!("Peak Balance:          {:.2}\n", state.peak_balance));
        output.push_str(&format!("PnL:                   {:.2} ({:.2}%)\n", pnl.amount, pnl.percent));
        output.push_str(&format!("Max Drawdown:          {:.2}%\n", state.max_drawdown_pct));
        output.push('\n');
        output.push_str(&format!("Games Played:          {}\n", state.games_played));
        output.push_str(&format!(
            "Wins / Ties / Losses:  {} / {} / {}\n",
            state.wins, state.ties, state.losses
        ));
        output.push_str(&format!("Longest Losing Streak: {}\n", state.max_losing_streak));
        output.push_str(&format!("Doublings:             {}\n", state.doubling_intervals.len()));
        output.push_str(&format!("Ended:                 {:?}\n", report.end));
        output.push_str(RULE_HEAVY);
        output
    }

    /// Renders one statistic block under a title.
    #[must_use]
    pub fn format_block(title: &str, block: &StatBlock) -> String {
        let mut output = String::new();
        output.push_str(&format!("{title}\n"));
        output.push_str(RULE_LIGHT);
        output.push_str(&format!("Samples:               {}\n", block.sample_size));
        output.push_str(&format!("Mean:                  {:.4}\n", block.mean));
        output.push_str(&format!("Std:                   {:.4}\n", block.std));
        output.push_str(&format!("Min:                   {:.4}\n", block.min));
        output.push_str(&format!("Max:                   {:.4}\n", block.max));
        output
    }
}

// A lone zero interval stands for "nobody doubled".
fn doubling_count(block: &StatBlock) -> String {
    if block.sample_size == 1 && block.max == Decimal::ZERO {
        "-".to_string()
    } else {
        block.sample_size.to_string()
    }
}
