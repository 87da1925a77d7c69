//! Core data types: vote events, activity snapshots, detections and cases.
//!
//! Detection kinds, severities and case statuses are closed enums so every
//! `match` over them is checked for exhaustiveness by the compiler.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque user identity as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier assigned to an [`AbuseCase`] by the case store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(pub u64);

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case-{}", self.0)
    }
}

/// BLAKE3 digest identifying one vote event.
///
/// Two evaluations of the same event produce the same fingerprint, which is
/// what lets the store open at most one case per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventFingerprint(pub [u8; 32]);

impl EventFingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for EventFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to correlate log lines.
        f.write_str(&hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// Vote input
// ---------------------------------------------------------------------------

/// Direction of a vote. Serialized as `1` / `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Polarity {
    Up,
    Down,
}

impl TryFrom<i8> for Polarity {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Up),
            -1 => Ok(Self::Down),
            other => Err(format!("vote polarity must be 1 or -1, got {other}")),
        }
    }
}

impl From<Polarity> for i8 {
    fn from(p: Polarity) -> i8 {
        match p {
            Polarity::Up => 1,
            Polarity::Down => -1,
        }
    }
}

/// Subscription level of a voter. Ordered by rank, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Starter,
    Pro,
    Enterprise,
}

impl PlanTier {
    pub const ALL: [PlanTier; 4] = [Self::Free, Self::Starter, Self::Pro, Self::Enterprise];

    /// Zero-based rank; higher tiers never earn fewer credits.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Starter => 1,
            Self::Pro => 2,
            Self::Enterprise => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One upvote or downvote, as received from the voting feature.
///
/// Not persisted; it lives for the duration of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEvent {
    /// Who cast the vote.
    pub voter: UserId,
    /// Author of the content being voted on.
    pub author: UserId,
    pub polarity: Polarity,
    /// Plan tier as known by the caller at submission time.
    #[serde(default)]
    pub plan: PlanTier,
    pub account_created_at: DateTime<Utc>,
    pub ip: IpAddr,
    #[serde(default)]
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
}

impl VoteEvent {
    /// `true` when the voter is voting on their own content.
    pub fn is_self_vote(&self) -> bool {
        self.voter == self.author
    }

    /// Stable digest over every identifying field of the event.
    pub fn fingerprint(&self) -> EventFingerprint {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.voter.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(self.author.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(&[i8::from(self.polarity) as u8]);
        hasher.update(self.ip.to_string().as_bytes());
        hasher.update(&[0]);
        hasher.update(self.user_agent.as_bytes());
        hasher.update(&[0]);
        hasher.update(&self.timestamp.timestamp().to_le_bytes());
        hasher.update(&self.timestamp.timestamp_subsec_nanos().to_le_bytes());
        EventFingerprint(*hasher.finalize().as_bytes())
    }
}

/// Rolling counters describing the voter's and the IP's recent activity.
///
/// Missing counters default to zero, so a cold-start voter reads as low
/// activity rather than as an error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivitySnapshot {
    pub votes_last_hour: u64,
    pub votes_last_day: u64,
    pub votes_last_week: u64,
    /// Votes this voter has cast on this author.
    pub votes_on_author: u64,
    /// Votes observed from the originating IP.
    pub votes_from_ip: u64,
    /// Distinct voters observed from the originating IP.
    pub distinct_users_from_ip: u64,
    /// The voter's most recent vote timestamps, oldest first.
    pub recent_votes: Vec<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Detections
// ---------------------------------------------------------------------------

/// How serious a detection is. Ordered least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Dashboard colour for this severity.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "blue",
            Self::Medium => "yellow",
            Self::High => "orange",
            Self::Critical => "red",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which heuristic fired. Variant order is the scorer's evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionKind {
    SelfVoteAttempt,
    SuspiciousAccountAge,
    ExcessiveVotingRate,
    IpClustering,
    CoordinatedVoting,
    RapidVotingPattern,
    VoteManipulation,
}

impl DetectionKind {
    pub const ALL: [DetectionKind; 7] = [
        Self::SelfVoteAttempt,
        Self::SuspiciousAccountAge,
        Self::ExcessiveVotingRate,
        Self::IpClustering,
        Self::CoordinatedVoting,
        Self::RapidVotingPattern,
        Self::VoteManipulation,
    ];

    /// Severity every detection of this kind carries.
    pub fn severity(&self) -> Severity {
        match self {
            Self::SelfVoteAttempt | Self::SuspiciousAccountAge | Self::VoteManipulation => {
                Severity::Medium
            }
            Self::ExcessiveVotingRate
            | Self::IpClustering
            | Self::CoordinatedVoting
            | Self::RapidVotingPattern => Severity::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfVoteAttempt => "SELF_VOTE_ATTEMPT",
            Self::SuspiciousAccountAge => "SUSPICIOUS_ACCOUNT_AGE",
            Self::ExcessiveVotingRate => "EXCESSIVE_VOTING_RATE",
            Self::IpClustering => "IP_CLUSTERING",
            Self::CoordinatedVoting => "COORDINATED_VOTING",
            Self::RapidVotingPattern => "RAPID_VOTING_PATTERN",
            Self::VoteManipulation => "VOTE_MANIPULATION",
        }
    }
}

impl fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The limit a heuristic enforces and what was actually observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionDetails {
    /// Name of the measured quantity, e.g. `votes_last_hour`.
    pub metric: String,
    pub threshold: u64,
    pub observed: u64,
}

/// One triggered heuristic. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub kind: DetectionKind,
    pub severity: Severity,
    /// Contribution to the composite risk score.
    pub weight: f64,
    pub details: DetectionDetails,
}

impl Detection {
    pub fn new(kind: DetectionKind, weight: f64, metric: &str, threshold: u64, observed: u64) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            weight,
            details: DetectionDetails {
                metric: metric.to_string(),
                threshold,
                observed,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Cases
// ---------------------------------------------------------------------------

/// Lifecycle state of an [`AbuseCase`].
///
/// ```text
/// PENDING ──► INVESTIGATING ──► RESOLVED | FALSE_POSITIVE
///    └────────────────────────► RESOLVED | FALSE_POSITIVE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Pending,
    Investigating,
    Resolved,
    FalsePositive,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 4] = [
        Self::Pending,
        Self::Investigating,
        Self::Resolved,
        Self::FalsePositive,
    ];

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::FalsePositive)
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: CaseStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Investigating | Self::Resolved | Self::FalsePositive) => true,
            (Self::Investigating, Self::Resolved | Self::FalsePositive) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Investigating => "INVESTIGATING",
            Self::Resolved => "RESOLVED",
            Self::FalsePositive => "FALSE_POSITIVE",
        }
    }

    /// Dashboard icon for this status.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Pending => "clock",
            Self::Investigating => "search",
            Self::Resolved => "check-circle",
            Self::FalsePositive => "x-circle",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted group of detections fired by a single vote event.
///
/// # Invariants
///
/// * `detections` is never empty.
/// * `risk_score` never changes after creation.
/// * `status` only moves along [`CaseStatus::can_transition_to`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbuseCase {
    pub id: CaseId,
    pub voter: UserId,
    pub author: UserId,
    pub fingerprint: EventFingerprint,
    /// Detections in heuristic evaluation order.
    pub detections: Vec<Detection>,
    pub risk_score: f64,
    pub status: CaseStatus,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub investigator: Option<UserId>,
    pub resolution: Option<String>,
}

impl AbuseCase {
    /// Summary kind for single-value displays: the first detection in
    /// heuristic evaluation order. The full list stays authoritative.
    pub fn primary_kind(&self) -> Option<DetectionKind> {
        self.detections.first().map(|d| d.kind)
    }

    /// Most severe detection in the case.
    pub fn highest_severity(&self) -> Option<Severity> {
        self.detections.iter().map(|d| d.severity).max()
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Time from detection to resolution, if resolved.
    pub fn resolution_time(&self) -> Option<chrono::Duration> {
        self.resolved_at.map(|at| at - self.detected_at)
    }
}

/// A case about to be created. Only constructible with at least one
/// detection.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCase {
    voter: UserId,
    author: UserId,
    fingerprint: EventFingerprint,
    detections: Vec<Detection>,
    risk_score: f64,
    detected_at: DateTime<Utc>,
}

impl NewCase {
    /// Returns `None` when `detections` is empty.
    pub fn new(
        event: &VoteEvent,
        detections: Vec<Detection>,
        risk_score: f64,
        detected_at: DateTime<Utc>,
    ) -> Option<Self> {
        if detections.is_empty() {
            return None;
        }
        Some(Self {
            voter: event.voter.clone(),
            author: event.author.clone(),
            fingerprint: event.fingerprint(),
            detections,
            risk_score,
            detected_at,
        })
    }

    pub fn fingerprint(&self) -> EventFingerprint {
        self.fingerprint
    }

    pub fn voter(&self) -> &UserId {
        &self.voter
    }

    /// Materialize the case under its store-assigned identifier, in
    /// [`CaseStatus::Pending`].
    pub fn into_case(self, id: CaseId) -> AbuseCase {
        AbuseCase {
            id,
            voter: self.voter,
            author: self.author,
            fingerprint: self.fingerprint,
            detections: self.detections,
            risk_score: self.risk_score,
            status: CaseStatus::Pending,
            detected_at: self.detected_at,
            resolved_at: None,
            investigator: None,
            resolution: None,
        }
    }
}

/// Compare-and-set status change applied by a case store.
///
/// The store applies the update only while the case is still in `expected`.
/// `None` fields leave the stored value untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseUpdate {
    pub expected: CaseStatus,
    pub status: CaseStatus,
    pub investigator: Option<UserId>,
    pub resolution: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl CaseUpdate {
    pub fn apply(&self, case: &mut AbuseCase) {
        case.status = self.status;
        if let Some(investigator) = &self.investigator {
            case.investigator = Some(investigator.clone());
        }
        if let Some(resolution) = &self.resolution {
            case.resolution = Some(resolution.clone());
        }
        if let Some(at) = self.resolved_at {
            case.resolved_at = Some(at);
        }
    }
}

/// Selection criteria for listing cases. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub voter: Option<UserId>,
    pub detected_since: Option<DateTime<Utc>>,
}

impl CaseFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: CaseStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_voter(mut self, voter: UserId) -> Self {
        self.voter = Some(voter);
        self
    }

    pub fn detected_since(mut self, since: DateTime<Utc>) -> Self {
        self.detected_since = Some(since);
        self
    }

    pub fn matches(&self, case: &AbuseCase) -> bool {
        self.status.is_none_or(|s| case.status == s)
            && self.voter.as_ref().is_none_or(|v| &case.voter == v)
            && self.detected_since.is_none_or(|since| case.detected_at >= since)
    }
}

/// Outcome of evaluating one vote. Not persisted; callers act on it, e.g. by
/// crediting a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardDecision {
    pub credits: u32,
    pub abuse_detected: bool,
    pub high_risk: bool,
    pub risk_score: f64,
    pub detections: Vec<Detection>,
    /// The case opened (or previously opened) for this event.
    pub case: Option<AbuseCase>,
}
