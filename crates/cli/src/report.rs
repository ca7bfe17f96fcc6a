//! Formatting of analysis results.

use colored::Colorize;
use num_format::{Locale, ToFormattedString};
use othello_core::AnalysisResult;
use othello_core::constants::{DISC_WEIGHT, WIN_SCORE};
use othello_core::types::Score;

/// Renders a score as a disc margin, or as a decided result.
pub fn format_score(score: Score) -> String {
    if score > WIN_SCORE {
        format!("win +{}", score - WIN_SCORE)
    } else if score < -WIN_SCORE {
        format!("loss {}", score + WIN_SCORE)
    } else {
        format!("{:+.2}", score as f64 / DISC_WEIGHT as f64)
    }
}

fn nodes_per_second(result: &AnalysisResult) -> u64 {
    let secs = result.time_used.as_secs_f64();
    if secs > 0.0 { (result.nodes as f64 / secs) as u64 } else { 0 }
}

pub fn print_analysis(result: &AnalysisResult) {
    let pv = result.pv.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(" ");
    let mode = if result.stats.exact { "exact" } else { "heuristic" };
    println!(" depth | score       | nodes         | time     | nps");
    println!("-------+-------------+---------------+----------+------------");
    println!(
        " {:>5} | {:<11} | {:>13} | {:>6}ms | {:>10}",
        result.depth,
        format_score(result.evaluation),
        result.nodes.to_formatted_string(&Locale::en),
        result.time_used.as_millis(),
        nodes_per_second(result).to_formatted_string(&Locale::en),
    );
    println!(
        " {} {} ({}, level {} / {}, tt hit rate {:.1}%)",
        "pv:".bold(),
        pv,
        mode,
        result.stats.level,
        result.stats.tier,
        result.stats.tt.hit_rate() * 100.0
    );
    if result.stats.fallback {
        println!(" {}", "search failed, move chosen by fallback".bright_red());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(WIN_SCORE + 12), "win +12");
        assert_eq!(format_score(-WIN_SCORE - 4), "loss -4");
        assert_eq!(format_score(250), "+2.50");
        assert_eq!(format_score(0), "+0.00");
    }
}
