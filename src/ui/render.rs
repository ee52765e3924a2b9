//! Plain-text rendering of boards and replies

use std::fmt::Write;

use crate::error::Error;
use crate::gaming::{BoardView, Outcome, SessionView, TerminalResult, TileView, TILE_COUNT};
use crate::token::LeaderboardEntry;

pub const HIDDEN: &str = "🟦";
pub const GEM: &str = "💎";
pub const BOMB: &str = "💣";

fn tile_symbol(tile: TileView) -> &'static str {
    match tile {
        TileView::Hidden => HIDDEN,
        TileView::Gem => GEM,
        TileView::Bomb => BOMB,
    }
}

/// Grid with row numbers, one line per row
pub fn board(view: &BoardView) -> String {
    let mut out = String::from("   0 1 2 3 4\n");
    for (row, tiles) in view.rows.iter().enumerate() {
        let line: String = tiles.iter().map(|t| tile_symbol(*t)).collect();
        let _ = writeln!(out, "{}  {}", row, line);
    }
    out
}

/// Header and board for a game in progress
pub fn session(view: &SessionView) -> String {
    let safe_tiles = TILE_COUNT - view.mine_count as usize;
    let mut out = String::new();
    let _ = writeln!(out, "💎 Mines Game 💣\n");
    let _ = writeln!(out, "Bet: {} Hiwa", view.bet_amount);
    let _ = writeln!(out, "Mines: {}", view.mine_count);
    let _ = writeln!(out, "Gems Found: {}/{}", view.gems_revealed, safe_tiles);
    let _ = writeln!(out, "Multiplier: {:.2}x", view.multiplier);
    let _ = writeln!(out, "Potential Win: {} Hiwa\n", view.potential_payout);
    out.push_str(&board(&view.board));

    if view.can_cash_out {
        let _ = write!(out, "\n💰 /cashout ({:.2}x) or keep going with /reveal <row> <col>", view.multiplier);
    } else {
        out.push_str("\nReveal a tile with /reveal <row> <col>");
    }
    out
}

/// Summary of a finished game with every tile face up
pub fn terminal(result: &TerminalResult) -> String {
    let mut out = match result.outcome {
        Outcome::Won => format!(
            "🎉 Cashout Successful!\nWon: {} Hiwa ({:.2}x)\n\n",
            result.amount, result.multiplier
        ),
        Outcome::Lost => format!("💥 Game Over!\nLost: {} Hiwa\n\n", result.amount),
    };
    out.push_str(&board(&result.board));
    if let Some(balance) = result.new_balance {
        let _ = write!(out, "\nNew Balance: {} Hiwa", balance);
    }
    out
}

pub fn leaderboard(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return "🏆 Leaderboard is empty! Be the first to play!".to_string();
    }

    let mut out = String::from("🏆 Top Players 🏆\n\n");
    let _ = writeln!(out, "{:<5} {:<15} {:>10}", "Rank", "Player", "Balance");
    for entry in entries {
        let name = display_name(entry);
        let _ = writeln!(
            out,
            "{:<5} {:<15} {:>10} Hiwa",
            entry.rank,
            truncate(&name, 15),
            entry.balance
        );
    }
    out
}

fn display_name(entry: &LeaderboardEntry) -> String {
    match &entry.username {
        Some(name) => name.clone(),
        None => {
            let id = entry.user_id.to_string();
            format!("User{}", truncate(&id, 4))
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Multiplier table for one mine count
pub fn odds_table(mine_count: u8, rows: &[(u8, f64)]) -> String {
    let mut out = format!("Multipliers with {} mines\n", mine_count);
    let _ = writeln!(out, "{:>5}  {:>12}", "gems", "multiplier");
    for (gems, multiplier) in rows {
        let _ = writeln!(out, "{:>5}  {:>11.4}x", gems, multiplier);
    }
    out
}

/// Reply text for a failed request
///
/// Internal failures are not shown verbatim.
pub fn error(err: &Error) -> String {
    if !err.is_user_facing() {
        return "❌ Something went wrong. Please try again.".to_string();
    }
    match err {
        Error::InvalidCommand(msg)
        | Error::PermissionDenied(msg)
        | Error::InvalidConfiguration(msg)
        | Error::InvalidTransfer(msg)
        | Error::InvalidMove(msg) => capitalize(msg),
        Error::BonusCooldown { .. } => format!("⏳ {}", err),
        other => other.to_string(),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
