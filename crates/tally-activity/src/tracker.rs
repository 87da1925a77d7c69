//! Sliding-window vote counters keyed by voter, voter/author pair and IP.
//!
//! # Design
//!
//! Each voter has a [`VecDeque`] of vote timestamps kept sorted, so
//! out-of-order arrivals still count in the right window. Windows are
//! measured back from the instant of the vote being scored. Entries older
//! than one week behind the newest vote are pruned, and the queue is capped
//! at `max_tracked_votes`.
//!
//! Each IP keeps `(timestamp, voter)` pairs for `ip_window_secs`, capped at
//! `max_ip_votes`, plus a reference count per voter, which gives the
//! distinct-user count without rescanning the queue.
//!
//! Voter/author pairs keep a counter for as long as the voter is tracked.
//!
//! Every `eviction_interval` observations the tracker sweeps out voters idle
//! for a week (with their pair counters) and IPs idle for the IP window.

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use tally_core::config::ActivityConfig;
use tally_core::constants::{SECS_PER_DAY, SECS_PER_HOUR};
use tally_core::error::StoreError;
use tally_core::traits::ActivityStore;
use tally_core::types::{ActivitySnapshot, UserId, VoteEvent};

const WEEK_SECS: i64 = 7 * SECS_PER_DAY;

/// Start of the `secs`-long window ending at `at`, or `None` when that lies
/// outside the representable range.
fn window_start(at: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(secs).and_then(|w| at.checked_sub_signed(w))
}

#[derive(Debug, Default)]
struct VoterHistory {
    /// Vote timestamps, ascending.
    votes: VecDeque<DateTime<Utc>>,
}

impl VoterHistory {
    fn record(&mut self, at: DateTime<Utc>, cap: usize) {
        let pos = self.votes.partition_point(|t| *t <= at);
        self.votes.insert(pos, at);
        if let Some(cutoff) = self.latest().and_then(|t| window_start(t, WEEK_SECS)) {
            while self.votes.front().is_some_and(|t| *t <= cutoff) {
                self.votes.pop_front();
            }
        }
        while self.votes.len() > cap {
            self.votes.pop_front();
        }
    }

    /// Votes in `(now - window, now]`.
    fn count_within(&self, now: DateTime<Utc>, window_secs: i64) -> u64 {
        let upper = self.votes.partition_point(|t| *t <= now);
        let lower = window_start(now, window_secs)
            .map_or(0, |start| self.votes.partition_point(|t| *t <= start));
        upper.saturating_sub(lower) as u64
    }

    /// Up to `n` most recent votes at or before `now`, oldest first.
    fn recent(&self, now: DateTime<Utc>, n: usize) -> Vec<DateTime<Utc>> {
        let upper = self.votes.partition_point(|t| *t <= now);
        let lower = upper.saturating_sub(n);
        self.votes.range(lower..upper).copied().collect()
    }

    fn latest(&self) -> Option<DateTime<Utc>> {
        self.votes.back().copied()
    }
}

#[derive(Debug, Default)]
struct IpHistory {
    /// `(timestamp, voter)` pairs, ascending by timestamp.
    votes: VecDeque<(DateTime<Utc>, UserId)>,
    /// Votes per voter still inside the window.
    users: HashMap<UserId, u64>,
}

impl IpHistory {
    fn record(&mut self, at: DateTime<Utc>, voter: &UserId, window_secs: i64, cap: usize) {
        let pos = self.votes.partition_point(|(t, _)| *t <= at);
        self.votes.insert(pos, (at, voter.clone()));
        *self.users.entry(voter.clone()).or_default() += 1;
        if let Some(cutoff) = self.latest().and_then(|t| window_start(t, window_secs)) {
            while self.votes.front().is_some_and(|(t, _)| *t <= cutoff) {
                self.pop_oldest();
            }
        }
        while self.votes.len() > cap {
            self.pop_oldest();
        }
    }

    fn pop_oldest(&mut self) {
        let Some((_, voter)) = self.votes.pop_front() else { return };
        if let Some(n) = self.users.get_mut(&voter) {
            *n -= 1;
            if *n == 0 {
                self.users.remove(&voter);
            }
        }
    }

    fn latest(&self) -> Option<DateTime<Utc>> {
        self.votes.back().map(|(t, _)| *t)
    }
}

/// Concurrent rolling counters backing [`ActivityStore`].
pub struct RateWindowTracker {
    config: ActivityConfig,
    voters: DashMap<UserId, VoterHistory>,
    pairs: DashMap<(UserId, UserId), u64>,
    ips: DashMap<IpAddr, IpHistory>,
    observed: AtomicU64,
}

impl RateWindowTracker {
    pub fn new(config: ActivityConfig) -> Self {
        Self {
            config,
            voters: DashMap::new(),
            pairs: DashMap::new(),
            ips: DashMap::new(),
            observed: AtomicU64::new(0),
        }
    }

    fn ip_window_secs(&self) -> i64 {
        i64::try_from(self.config.ip_window_secs).unwrap_or(i64::MAX)
    }

    /// Number of voters with tracked history.
    pub fn tracked_voters(&self) -> usize {
        self.voters.len()
    }

    /// Number of IPs with tracked history.
    pub fn tracked_ips(&self) -> usize {
        self.ips.len()
    }

    /// Number of voter/author pair counters.
    pub fn tracked_pairs(&self) -> usize {
        self.pairs.len()
    }

    /// Drop voters whose newest vote is over a week old, together with their
    /// pair counters, and IPs whose newest vote is outside the IP window, as
    /// of `now`. Returns how many voter and IP keys were removed.
    ///
    /// Must not be called while holding an entry guard on any of the maps.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let mut idle = HashSet::new();
        if let Some(cutoff) = window_start(now, WEEK_SECS) {
            self.voters.retain(|voter, h| {
                let keep = h.latest().is_some_and(|t| t > cutoff);
                if !keep {
                    idle.insert(voter.clone());
                }
                keep
            });
        }
        if !idle.is_empty() {
            // A voter may have voted again since the sweep above.
            self.pairs
                .retain(|(voter, _), _| !idle.contains(voter) || self.voters.contains_key(voter));
        }

        let ips_before = self.ips.len();
        if let Some(cutoff) = window_start(now, self.ip_window_secs()) {
            self.ips.retain(|_, h| h.latest().is_some_and(|t| t > cutoff));
        }
        let removed = idle.len() + ips_before.saturating_sub(self.ips.len());
        if removed > 0 {
            debug!(removed, voters = idle.len(), "tracker: evicted idle keys");
        }
        removed
    }

    fn voter_counts(&self, history: &VoterHistory, now: DateTime<Utc>, snap: &mut ActivitySnapshot) {
        snap.votes_last_hour = history.count_within(now, SECS_PER_HOUR);
        snap.votes_last_day = history.count_within(now, SECS_PER_DAY);
        snap.votes_last_week = history.count_within(now, WEEK_SECS);
        snap.recent_votes = history.recent(now, self.config.recent_vote_sample);
    }
}

impl Default for RateWindowTracker {
    fn default() -> Self {
        Self::new(ActivityConfig::default())
    }
}

impl ActivityStore for RateWindowTracker {
    fn observe(&self, event: &VoteEvent) -> Result<ActivitySnapshot, StoreError> {
        let now = event.timestamp;
        let mut snap = ActivitySnapshot::default();

        // One entry guard at a time: never hold two keys' locks together.
        {
            let mut history = self.voters.entry(event.voter.clone()).or_default();
            history.record(now, self.config.max_tracked_votes);
            self.voter_counts(&history, now, &mut snap);
        }
        {
            let mut count = self
                .pairs
                .entry((event.voter.clone(), event.author.clone()))
                .or_insert(0);
            *count += 1;
            snap.votes_on_author = *count;
        }
        {
            let mut ip = self.ips.entry(event.ip).or_default();
            ip.record(now, &event.voter, self.ip_window_secs(), self.config.max_ip_votes);
            snap.votes_from_ip = ip.votes.len() as u64;
            snap.distinct_users_from_ip = ip.users.len() as u64;
        }

        let observed = self.observed.fetch_add(1, Ordering::Relaxed) + 1;
        if observed % self.config.eviction_interval.max(1) == 0 {
            self.evict_idle(now);
        }

        debug!(
            voter = %event.voter,
            ip = %event.ip,
            hourly = snap.votes_last_hour,
            daily = snap.votes_last_day,
            ip_votes = snap.votes_from_ip,
            ip_users = snap.distinct_users_from_ip,
            "tracker: vote recorded"
        );
        Ok(snap)
    }

    fn peek(&self, event: &VoteEvent) -> Result<ActivitySnapshot, StoreError> {
        let now = event.timestamp;
        let mut snap = ActivitySnapshot::default();
        if let Some(history) = self.voters.get(&event.voter) {
            self.voter_counts(&history, now, &mut snap);
        }
        if let Some(count) = self.pairs.get(&(event.voter.clone(), event.author.clone())) {
            snap.votes_on_author = *count;
        }
        if let Some(ip) = self.ips.get(&event.ip) {
            snap.votes_from_ip = ip.votes.len() as u64;
            snap.distinct_users_from_ip = ip.users.len() as u64;
        }
        Ok(snap)
    }
}

// =============================================================================
// Tests
// =============================================================================
