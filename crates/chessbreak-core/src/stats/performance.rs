//! Long-term performance statistics computed from the game history.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::game::{GameHistory, GameResult, OutcomeRecord, RatingTrack};

/// Performance within one hour of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourPerformance {
    /// 0-23 in the caller's time zone.
    pub hour: u32,
    pub win_rate: f64,
    pub avg_rating_change: f64,
    pub games_played: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub total_games: u32,
    /// Percent of games won.
    pub win_rate: f64,
    pub average_rating_change: f64,
    pub total_tilt_count: u32,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
    pub games_today: u32,
    pub rating_change_today: i32,
    pub session_rating_change: i32,
    /// Best hours first.
    pub peak_hours: Vec<HourPerformance>,
}

/// Builds a [`PerformanceReport`] from history.
#[derive(Debug, Clone)]
pub struct PerformanceAnalyzer {
    /// Hours with fewer games are not ranked.
    pub min_games_per_hour: u32,
    pub peak_hour_count: usize,
    /// Win rates closer than this many points are compared by rating change.
    pub win_rate_tolerance: f64,
}

impl Default for PerformanceAnalyzer {
    fn default() -> Self {
        Self {
            min_games_per_hour: 3,
            peak_hour_count: 3,
            win_rate_tolerance: 1.0,
        }
    }
}

#[derive(Default)]
struct HourBucket {
    games: u32,
    wins: u32,
    rating_changes: Vec<i32>,
}

impl PerformanceAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze `history` as seen at `now`. Hours of day and the start of
    /// "today" are taken in `now`'s time zone.
    pub fn analyze<Tz: TimeZone>(
        &self,
        history: &GameHistory,
        total_tilt_count: u32,
        rating: &RatingTrack,
        now: &DateTime<Tz>,
    ) -> PerformanceReport {
        let mut games: Vec<&OutcomeRecord> = history.entries().iter().collect();
        games.sort_by_key(|g| g.timestamp);

        let total_games = games.len() as u32;
        let wins = games.iter().filter(|g| g.result == GameResult::Win).count();
        let win_rate = percent(wins, games.len());

        let changes: Vec<i32> = games.iter().filter_map(|g| g.rating_change).collect();
        let (longest_win_streak, longest_loss_streak) = longest_streaks(&games);

        let today_start = start_of_day(now);
        let today: Vec<&&OutcomeRecord> =
            games.iter().filter(|g| g.timestamp >= today_start).collect();
        let rating_change_today: i32 = today.iter().filter_map(|g| g.rating_change).sum();

        let session_rating_change = match (rating.current_rating, rating.session_rating_start) {
            (Some(current), Some(start)) => current - start,
            _ => 0,
        };

        PerformanceReport {
            total_games,
            win_rate: round2(win_rate),
            average_rating_change: round2(mean(&changes)),
            total_tilt_count,
            longest_win_streak,
            longest_loss_streak,
            games_today: today.len() as u32,
            rating_change_today,
            session_rating_change,
            peak_hours: self.peak_hours(&games, &now.timezone()),
        }
    }

    fn peak_hours<Tz: TimeZone>(&self, games: &[&OutcomeRecord], tz: &Tz) -> Vec<HourPerformance> {
        let mut buckets: BTreeMap<u32, HourBucket> = BTreeMap::new();
        for game in games {
            let Some(at) = DateTime::from_timestamp_millis(game.timestamp) else {
                continue;
            };
            let bucket = buckets.entry(at.with_timezone(tz).hour()).or_default();
            bucket.games += 1;
            if game.result == GameResult::Win {
                bucket.wins += 1;
            }
            bucket.rating_changes.extend(game.rating_change);
        }

        let mut candidates: Vec<HourPerformance> = buckets
            .into_iter()
            .filter(|(_, b)| b.games >= self.min_games_per_hour)
            .map(|(hour, b)| HourPerformance {
                hour,
                win_rate: percent(b.wins as usize, b.games as usize),
                avg_rating_change: mean(&b.rating_changes),
                games_played: b.games,
            })
            .collect();

        // The ranking relation is not transitive, so pick winners one at a
        // time instead of sorting.
        let mut ranked = Vec::new();
        while ranked.len() < self.peak_hour_count && !candidates.is_empty() {
            let mut best = 0;
            for i in 1..candidates.len() {
                if self.ranks_above(&candidates[i], &candidates[best]) {
                    best = i;
                }
            }
            let mut hour = candidates.remove(best);
            hour.win_rate = round2(hour.win_rate);
            hour.avg_rating_change = round2(hour.avg_rating_change);
            ranked.push(hour);
        }
        ranked
    }

    fn ranks_above(&self, a: &HourPerformance, b: &HourPerformance) -> bool {
        if (a.win_rate - b.win_rate).abs() > self.win_rate_tolerance {
            a.win_rate > b.win_rate
        } else {
            a.avg_rating_change > b.avg_rating_change
        }
    }
}

fn longest_streaks(games: &[&OutcomeRecord]) -> (u32, u32) {
    let (mut wins, mut losses) = (0u32, 0u32);
    let (mut best_wins, mut best_losses) = (0u32, 0u32);
    for game in games {
        match game.result {
            GameResult::Win => {
                wins += 1;
                losses = 0;
                best_wins = best_wins.max(wins);
            }
            GameResult::Loss => {
                losses += 1;
                wins = 0;
                best_losses = best_losses.max(losses);
            }
            GameResult::Draw => {
                wins = 0;
                losses = 0;
            }
        }
    }
    (best_wins, best_losses)
}

/// Epoch milliseconds of the most recent local midnight.
fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> i64 {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| now.timezone().from_local_datetime(&midnight).earliest())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| now.timestamp_millis())
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn mean(values: &[i32]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
