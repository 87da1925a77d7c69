//! Default tuning values. Every threshold here can be overridden through
//! [`EngineConfig`](crate::config::EngineConfig); these are only the values a
//! fresh deployment starts with.

/// Upper bound of the composite risk score.
pub const MAX_RISK_SCORE: f64 = 1.0;

/// Votes scoring strictly above this are high-risk and earn no credits.
pub const DEFAULT_HIGH_RISK_THRESHOLD: f64 = 0.5;

/// Weight of the self-vote heuristic.
pub const DEFAULT_SELF_VOTE_WEIGHT: f64 = 0.3;

/// Accounts younger than this (in seconds) are suspicious. Three days.
pub const DEFAULT_MIN_ACCOUNT_AGE_SECS: u64 = 3 * 24 * 60 * 60;

/// Weight of the account-age heuristic.
pub const DEFAULT_ACCOUNT_AGE_WEIGHT: f64 = 0.3;

/// Maximum votes a voter may cast in one hour before the rate heuristic fires.
pub const DEFAULT_HOURLY_VOTE_LIMIT: u64 = 20;

/// Maximum votes a voter may cast in one day before the rate heuristic fires.
pub const DEFAULT_DAILY_VOTE_LIMIT: u64 = 100;

/// Weight of each excessive-rate heuristic (hourly and daily).
pub const DEFAULT_EXCESSIVE_RATE_WEIGHT: f64 = 0.6;

/// Maximum votes from a single IP before the clustering heuristic fires.
pub const DEFAULT_IP_VOTE_LIMIT: u64 = 50;

/// Weight of the IP volume heuristic.
pub const DEFAULT_IP_CLUSTER_WEIGHT: f64 = 0.6;

/// Maximum distinct users behind one IP before coordinated voting is flagged.
pub const DEFAULT_IP_USER_LIMIT: u64 = 5;

/// Weight of the coordinated-voting heuristic.
pub const DEFAULT_COORDINATED_WEIGHT: f64 = 0.6;

/// Trailing window, measured back from the vote instant, for burst detection.
pub const DEFAULT_BURST_WINDOW_SECS: u64 = 30;

/// Maximum votes inside the burst window before the burst heuristic fires.
pub const DEFAULT_BURST_VOTE_LIMIT: u64 = 5;

/// Weight of the rapid-burst heuristic.
pub const DEFAULT_BURST_WEIGHT: f64 = 0.6;

/// Maximum votes one voter may cast on one author before manipulation is flagged.
pub const DEFAULT_AUTHOR_VOTE_LIMIT: u64 = 10;

/// Weight of the vote-manipulation heuristic.
pub const DEFAULT_MANIPULATION_WEIGHT: f64 = 0.3;

/// Credits per upvote, by plan tier.
pub const DEFAULT_FREE_CREDITS: u32 = 0;
pub const DEFAULT_STARTER_CREDITS: u32 = 1;
pub const DEFAULT_PRO_CREDITS: u32 = 2;
pub const DEFAULT_ENTERPRISE_CREDITS: u32 = 3;

/// Window over which per-IP votes and distinct users are counted (one day).
pub const DEFAULT_IP_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Hard cap on timestamps retained per voter.
pub const DEFAULT_MAX_TRACKED_VOTES: usize = 10_000;

/// Number of most recent vote timestamps handed to the scorer.
pub const DEFAULT_RECENT_VOTE_SAMPLE: usize = 64;

/// Hard cap on `(timestamp, voter)` entries retained per IP.
pub const DEFAULT_MAX_IP_VOTES: usize = 10_000;

/// Observations between sweeps of idle voters and IPs.
pub const DEFAULT_EVICTION_INTERVAL: u64 = 1_024;

/// Upper bound on any configurable rolling window (one year).
pub const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

/// Number of voters reported in the top-offender ranking.
pub const DEFAULT_TOP_OFFENDERS: usize = 10;

/// Seconds per hour, used for rolling windows and resolution-time reporting.
pub const SECS_PER_HOUR: i64 = 60 * 60;

/// Seconds per day.
pub const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;
