use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::{Local, NaiveDateTime};
use regex::Regex;
use thiserror::Error;

use crate::Warning;
use crate::gres::parse_allocated_indices;
use crate::parser::parse_job_blocks;
use crate::utils::{format_time_delta_at, pad_cell, parse_slurm_time};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("expected job state {expected}, got {actual}")]
    VariantMismatch {
        expected: &'static str,
        actual: String,
    },
    #[error("job record is missing the `{0}` attribute")]
    MissingField(&'static str),
}

/// The scheduler state of a job, as reported in the `JobState` field.
/// Anything that is neither running nor pending is terminal for our
/// purposes and keeps its raw name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Running,
    Pending,
    Other(String),
}

impl JobState {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "RUNNING" => JobState::Running,
            "PENDING" => JobState::Pending,
            other => JobState::Other(other.to_string()),
        }
    }
}

/// Display-ordering tier derived from the raw QoS name. The derivation
/// checks substrings in a fixed order and the first matching rule wins;
/// the enum ordering doubles as the sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QosTier {
    PhdDeadline,
    PhdNormal,
    MscDeadline,
    MscNormal,
    Other,
}

impl QosTier {
    pub fn from_qos(qos: &str) -> Self {
        let is_deadline = qos.contains("deadline");
        let is_master = qos.contains("master");
        let is_phd = qos.contains("phd");
        if is_phd && is_deadline {
            QosTier::PhdDeadline
        } else if is_phd {
            QosTier::PhdNormal
        } else if is_master && is_deadline {
            QosTier::MscDeadline
        } else if is_master {
            QosTier::MscNormal
        } else {
            QosTier::Other
        }
    }
}

impl fmt::Display for QosTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QosTier::PhdDeadline => "phd|d",
            QosTier::PhdNormal => "phd|n",
            QosTier::MscDeadline => "msc|d",
            QosTier::MscNormal => "msc|n",
            QosTier::Other => "other",
        };
        write!(f, "{label}")
    }
}

/// State-specific payload of a job record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobDetail {
    Running {
        node: String,
        gpu_count: u32,
        /// Compact allocated-GPU label, e.g. `node 0,1`, or an
        /// `UNKNOWN (node)` placeholder when the index list was
        /// unusable.
        gpu_indices: String,
        cpu_count: u32,
        memory_gb: u64,
        remaining_time: String,
    },
    Pending {
        requested_gpu_count: u32,
        /// The requested GPU type, or `any` when the request does not
        /// constrain the type.
        requested_gpu_type: String,
        cpu_count: u32,
    },
    Other {
        status: String,
        end_time: String,
        elapsed_time: String,
    },
}

/// One job from a snapshot, with the fields shared by every state plus
/// the state-specific payload. Constructed once per reporting run and
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub job_id: String,
    pub name: String,
    /// Login name with the `(uid)` suffix stripped.
    pub user_id: String,
    /// First letter of the raw partition, uppercased.
    pub partition: char,
    pub qos_tier: QosTier,
    pub priority: u64,
    pub runtime: String,
    pub time_limit: String,
    pub detail: JobDetail,
}

fn required<'a>(
    attrs: &'a HashMap<String, String>,
    key: &'static str,
) -> Result<&'a str, JobError> {
    attrs
        .get(key)
        .map(String::as_str)
        .ok_or(JobError::MissingField(key))
}

/// Strips a trailing parenthesized uid from a raw `UserId` value, e.g.
/// `alice(1000)` -> `alice`.
fn strip_uid_suffix(raw: &str) -> &str {
    match raw.rsplit_once('(') {
        Some((name, rest)) if rest.ends_with(')') => name,
        _ => raw,
    }
}

/// Extracts the allocated GPU count from an `AllocTRES` style value,
/// e.g. `cpu=8,mem=64000M,gres/gpu=2`. Absent means zero.
fn alloc_tres_gpu_count(tres: &str) -> u32 {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"gres/gpu=(\d+)").expect("tres gpu regex is valid"));
    re.captures(tres)
        .and_then(|captures| captures[1].parse().ok())
        .unwrap_or(0)
}

/// Pulls the `IDX:` list out of a detailed GRES value, e.g.
/// `gpu:A100:2(IDX:0-1)` -> `0-1`.
fn extract_idx_list(gres: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"IDX:([^)]*)\)").expect("idx regex is valid"));
    re.captures(gres)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Scans a comma-separated requested-TRES list for GPU sub-requests.
/// Returns the first plain count match and the first typed match; both
/// `gres/gpu=N` and the older `gres/gpu:N` spellings occur in the wild,
/// as do `gres/gpu:TYPE=N` and `gres/gpu:TYPE:N`.
fn requested_gpus(tres_per_node: &str) -> (Option<u32>, Option<(String, u32)>) {
    static PLAIN_RE: OnceLock<Regex> = OnceLock::new();
    static TYPED_RE: OnceLock<Regex> = OnceLock::new();
    let plain_re = PLAIN_RE
        .get_or_init(|| Regex::new(r"^gres/gpu[=:](\d+)$").expect("plain gpu regex is valid"));
    let typed_re = TYPED_RE.get_or_init(|| {
        Regex::new(r"^gres/gpu:([A-Za-z0-9_.\-]+)[=:](\d+)$").expect("typed gpu regex is valid")
    });

    let mut plain = None;
    let mut typed = None;
    for request in tres_per_node.split(',') {
        if plain.is_none()
            && let Some(captures) = plain_re.captures(request)
        {
            plain = captures[1].parse().ok();
        }
        if typed.is_none()
            && let Some(captures) = typed_re.captures(request)
            && let Ok(count) = captures[2].parse()
        {
            typed = Some((captures[1].to_string(), count));
        }
    }
    (plain, typed)
}

impl Job {
    /// Builds the job variant matching the record's reported state.
    ///
    /// Recoverable oddities inside the record (unusable GPU index list,
    /// disagreeing GPU counts) land in `warnings`; a missing required
    /// attribute fails the job without touching the rest of the
    /// snapshot.
    pub fn from_attrs(
        attrs: &HashMap<String, String>,
        now: NaiveDateTime,
        warnings: &mut Vec<Warning>,
    ) -> Result<Self, JobError> {
        match JobState::from_raw(required(attrs, "JobState")?) {
            JobState::Running => Self::running(attrs, now, warnings),
            JobState::Pending => Self::pending(attrs),
            JobState::Other(_) => Self::other(attrs, now),
        }
    }

    /// Shared fields, independent of state.
    fn base(attrs: &HashMap<String, String>) -> Result<(Self, JobState), JobError> {
        let state = JobState::from_raw(required(attrs, "JobState")?);
        let partition = required(attrs, "Partition")?
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?');
        let qos = required(attrs, "QOS")?;
        let job = Job {
            job_id: required(attrs, "JobId")?.to_string(),
            name: required(attrs, "JobName")?.to_string(),
            user_id: strip_uid_suffix(required(attrs, "UserId")?).to_string(),
            partition,
            qos_tier: QosTier::from_qos(qos),
            priority: attrs
                .get("Priority")
                .and_then(|p| p.parse().ok())
                .unwrap_or(0),
            runtime: required(attrs, "RunTime")?.to_string(),
            time_limit: attrs.get("TimeLimit").cloned().unwrap_or_default(),
            // placeholder, replaced by the variant constructor
            detail: JobDetail::Other {
                status: String::new(),
                end_time: String::new(),
                elapsed_time: String::new(),
            },
        };
        Ok((job, state))
    }

    /// Constructs the Running variant. A record in any other state is a
    /// construction error, never silently coerced.
    pub fn running(
        attrs: &HashMap<String, String>,
        now: NaiveDateTime,
        warnings: &mut Vec<Warning>,
    ) -> Result<Self, JobError> {
        let (mut job, state) = Self::base(attrs)?;
        if state != JobState::Running {
            return Err(JobError::VariantMismatch {
                expected: "RUNNING",
                actual: required(attrs, "JobState")?.to_string(),
            });
        }

        let node = required(attrs, "Nodes")?.to_string();
        let tres_count = attrs.get("AllocTRES").map_or(0, |t| alloc_tres_gpu_count(t));

        // The scheduler reports the allocation twice: a count inside
        // AllocTRES and an index list inside GRES. They are known to
        // disagree occasionally; the index-derived count wins and the
        // disagreement is surfaced.
        let (gpu_count, gpu_indices) = if tres_count == 0 {
            (0, String::new())
        } else {
            let indices = attrs
                .get("GRES")
                .and_then(|gres| extract_idx_list(gres))
                .map(parse_allocated_indices);
            match indices {
                Some(Ok(indices)) => {
                    let index_count = indices.len() as u32;
                    if index_count != tres_count {
                        warnings.push(Warning::new(
                            job.job_id.clone(),
                            format!(
                                "AllocTRES reports {tres_count} gpus but GRES indexes {index_count}, \
                                 trusting the index list"
                            ),
                        ));
                    }
                    let labels: Vec<String> =
                        indices.iter().map(|index| index.to_string()).collect();
                    let prefix: String = node.chars().take(4).collect();
                    (index_count, format!("{} {}", prefix, labels.join(",")))
                }
                Some(Err(err)) => {
                    warnings.push(Warning::new(
                        job.job_id.clone(),
                        format!("could not parse allocated gpu indices: {err}"),
                    ));
                    (tres_count, format!("UNKNOWN ({node})"))
                }
                None => (tres_count, format!("UNKNOWN ({node})")),
            }
        };

        job.detail = JobDetail::Running {
            remaining_time: format_time_delta_at(required(attrs, "EndTime")?, now, true),
            cpu_count: required(attrs, "NumCPUs")?.parse().unwrap_or(0),
            memory_gb: attrs
                .get("Mem")
                .and_then(|m| m.parse::<u64>().ok())
                .unwrap_or(0)
                / 1000,
            node,
            gpu_count,
            gpu_indices,
        };
        Ok(job)
    }

    /// Constructs the Pending variant; fails fast on any other state.
    pub fn pending(attrs: &HashMap<String, String>) -> Result<Self, JobError> {
        let (mut job, state) = Self::base(attrs)?;
        if state != JobState::Pending {
            return Err(JobError::VariantMismatch {
                expected: "PENDING",
                actual: required(attrs, "JobState")?.to_string(),
            });
        }

        let (plain, typed) = attrs
            .get("TresPerNode")
            .map(|t| requested_gpus(t))
            .unwrap_or((None, None));
        let (requested_gpu_count, requested_gpu_type) = match (plain, typed) {
            (_, Some((gpu_type, count))) => (count, gpu_type),
            (Some(count), None) => (count, "any".to_string()),
            (None, None) => (0, "any".to_string()),
        };

        job.detail = JobDetail::Pending {
            requested_gpu_count,
            requested_gpu_type,
            cpu_count: required(attrs, "NumCPUs")?.parse().unwrap_or(0),
        };
        Ok(job)
    }

    /// Constructs the Other (terminal) variant. RUNNING and PENDING
    /// records are rejected.
    pub fn other(attrs: &HashMap<String, String>, now: NaiveDateTime) -> Result<Self, JobError> {
        let (mut job, state) = Self::base(attrs)?;
        let status = match state {
            JobState::Running | JobState::Pending => {
                return Err(JobError::VariantMismatch {
                    expected: "neither RUNNING nor PENDING",
                    actual: required(attrs, "JobState")?.to_string(),
                });
            }
            JobState::Other(status) => status,
        };

        let end_time = required(attrs, "EndTime")?.to_string();
        job.detail = JobDetail::Other {
            elapsed_time: format_time_delta_at(&end_time, now, false),
            end_time,
            status,
        };
        Ok(job)
    }

    pub fn state(&self) -> JobState {
        match &self.detail {
            JobDetail::Running { .. } => JobState::Running,
            JobDetail::Pending { .. } => JobState::Pending,
            JobDetail::Other { status, .. } => JobState::Other(status.clone()),
        }
    }

    /// Whether a terminal job ended recently: the whole-day count since
    /// `end_time` must be within `window_days` AND the remainder of the
    /// current partial day within `window_minutes`. The two bounds are
    /// checked separately, not folded into one combined duration: a job
    /// that ended 1 day and 5 minutes ago passes (60, 1), while one that
    /// ended 90 minutes ago fails (60, 0) on the intra-day bound alone.
    /// Running and pending jobs are never "recent".
    pub fn is_recent(&self, now: NaiveDateTime, window_minutes: i64, window_days: i64) -> bool {
        let JobDetail::Other { end_time, .. } = &self.detail else {
            return false;
        };
        let Some(end) = parse_slurm_time(end_time) else {
            return false;
        };
        let elapsed = (now - end).num_seconds();
        let days = elapsed.div_euclid(86_400);
        let intra_day = elapsed.rem_euclid(86_400);
        days <= window_days && intra_day < window_minutes * 60
    }

    /// Resolves one printable field by name. Fields that do not apply to
    /// the job's variant render empty, so one layout can be shared by a
    /// whole table.
    pub fn field(&self, name: &str) -> String {
        match name {
            "job_id" => self.job_id.clone(),
            "name" => self.name.clone(),
            "user_id" => self.user_id.clone(),
            "partition" => self.partition.to_string(),
            "qos" => self.qos_tier.to_string(),
            "priority" => self.priority.to_string(),
            "runtime" => self.runtime.clone(),
            "time_limit" => self.time_limit.clone(),
            _ => self.detail_field(name),
        }
    }

    fn detail_field(&self, name: &str) -> String {
        match (&self.detail, name) {
            (JobDetail::Running { node, .. }, "node") => node.clone(),
            (JobDetail::Running { gpu_count, .. }, "gpus") => gpu_count.to_string(),
            (JobDetail::Running { gpu_indices, .. }, "gpu_ids") => gpu_indices.clone(),
            (JobDetail::Running { cpu_count, .. }, "cpus") => cpu_count.to_string(),
            (JobDetail::Running { memory_gb, .. }, "mem") => format!("{memory_gb} GB"),
            (JobDetail::Running { remaining_time, .. }, "remaining_time") => {
                remaining_time.clone()
            }
            (
                JobDetail::Pending {
                    requested_gpu_count,
                    ..
                },
                "gpus",
            ) => requested_gpu_count.to_string(),
            (
                JobDetail::Pending {
                    requested_gpu_type, ..
                },
                "gpu_type",
            ) => requested_gpu_type.clone(),
            (JobDetail::Pending { cpu_count, .. }, "cpus") => cpu_count.to_string(),
            (JobDetail::Other { status, .. }, "status") => status.clone(),
            (JobDetail::Other { end_time, .. }, "end_time") => end_time.clone(),
            (JobDetail::Other { elapsed_time, .. }, "elapsed_time") => elapsed_time.clone(),
            _ => String::new(),
        }
    }

    /// Renders the job as one table row: each field truncated and padded
    /// to its configured width, columns in layout order.
    pub fn display(&self, layout: &[(&str, usize)]) -> String {
        layout
            .iter()
            .map(|(name, width)| pad_cell(&self.field(name), *width))
            .collect::<Vec<_>>()
            .join("  ")
    }
}

/// All jobs parsed from one `scontrol show job -d` dump, along with the
/// warnings the parse produced. Records that fail outright are reported
/// and skipped; the snapshot itself never fails.
#[derive(Debug, Clone, Default)]
pub struct JobsSnapshot {
    pub jobs: Vec<Job>,
    pub warnings: Vec<Warning>,
}

impl JobsSnapshot {
    pub fn parse_at(raw: &str, now: NaiveDateTime) -> Self {
        let mut jobs = Vec::new();
        let mut warnings = Vec::new();
        for attrs in parse_job_blocks(raw) {
            match Job::from_attrs(&attrs, now, &mut warnings) {
                Ok(job) => jobs.push(job),
                Err(err) => {
                    let subject = attrs
                        .get("JobId")
                        .cloned()
                        .unwrap_or_else(|| "<unknown job>".to_string());
                    warnings.push(Warning::new(subject, err.to_string()));
                }
            }
        }
        Self { jobs, warnings }
    }

    pub fn parse(raw: &str) -> Self {
        Self::parse_at(raw, Local::now().naive_local())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, 12)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn running_attrs() -> HashMap<String, String> {
        attrs(&[
            ("JobId", "4242"),
            ("JobName", "train-seg"),
            ("UserId", "alice(1000)"),
            ("Partition", "universe"),
            ("JobState", "RUNNING"),
            ("QOS", "phd-deadline-q"),
            ("Priority", "5120"),
            ("RunTime", "1-02:00:00"),
            ("TimeLimit", "2-00:00:00"),
            ("Nodes", "prometheus"),
            ("NumCPUs", "16"),
            ("Mem", "64000"),
            ("EndTime", "2024-08-12T12:01:30"),
            ("AllocTRES", "cpu=16,mem=64000M,gres/gpu=2"),
            ("GRES", "gpu:A100:2(IDX:0-1)"),
        ])
    }

    #[test]
    fn qos_tier_rules_check_in_order() {
        assert_eq!(QosTier::from_qos("phd-deadline"), QosTier::PhdDeadline);
        assert_eq!(QosTier::from_qos("phdnormal"), QosTier::PhdNormal);
        assert_eq!(QosTier::from_qos("master-deadline"), QosTier::MscDeadline);
        assert_eq!(QosTier::from_qos("masterqos"), QosTier::MscNormal);
        assert_eq!(QosTier::from_qos("deadline-ext"), QosTier::Other);
        assert_eq!(QosTier::from_qos("staff"), QosTier::Other);
        // phd wins over master when both appear
        assert_eq!(QosTier::from_qos("phd-master"), QosTier::PhdNormal);
        assert!(QosTier::PhdDeadline < QosTier::MscNormal);
        assert!(QosTier::MscNormal < QosTier::Other);
    }

    #[test]
    fn running_job_parses_and_reconciles() {
        let mut warnings = Vec::new();
        let job = Job::from_attrs(&running_attrs(), now(), &mut warnings).unwrap();
        assert_eq!(job.user_id, "alice");
        assert_eq!(job.partition, 'U');
        assert_eq!(job.qos_tier, QosTier::PhdDeadline);
        assert!(warnings.is_empty());
        let JobDetail::Running {
            node,
            gpu_count,
            gpu_indices,
            cpu_count,
            memory_gb,
            remaining_time,
        } = job.detail
        else {
            panic!("expected running detail");
        };
        assert_eq!(node, "prometheus");
        assert_eq!(gpu_count, 2);
        assert_eq!(gpu_indices, "prom 0,1");
        assert_eq!(cpu_count, 16);
        assert_eq!(memory_gb, 64);
        assert_eq!(remaining_time, "0d:00h:01m:30s");
    }

    #[test]
    fn index_count_wins_over_tres_count() {
        let mut raw = running_attrs();
        raw.insert("AllocTRES".to_string(), "cpu=16,gres/gpu=1".to_string());
        let mut warnings = Vec::new();
        let job = Job::from_attrs(&raw, now(), &mut warnings).unwrap();
        let JobDetail::Running { gpu_count, .. } = job.detail else {
            panic!("expected running detail");
        };
        assert_eq!(gpu_count, 2);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].subject, "4242");
    }

    #[test]
    fn unusable_index_list_falls_back_to_placeholder() {
        let mut raw = running_attrs();
        raw.insert("GRES".to_string(), "gpu:A100:2(IDX:9-x)".to_string());
        let mut warnings = Vec::new();
        let job = Job::from_attrs(&raw, now(), &mut warnings).unwrap();
        let JobDetail::Running {
            gpu_count,
            gpu_indices,
            ..
        } = job.detail
        else {
            panic!("expected running detail");
        };
        assert_eq!(gpu_count, 2);
        assert_eq!(gpu_indices, "UNKNOWN (prometheus)");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn job_without_gpus_has_empty_indices() {
        let mut raw = running_attrs();
        raw.insert("AllocTRES".to_string(), "cpu=16,mem=64000M".to_string());
        raw.remove("GRES");
        let mut warnings = Vec::new();
        let job = Job::from_attrs(&raw, now(), &mut warnings).unwrap();
        let JobDetail::Running {
            gpu_count,
            gpu_indices,
            ..
        } = job.detail
        else {
            panic!("expected running detail");
        };
        assert_eq!(gpu_count, 0);
        assert_eq!(gpu_indices, "");
        assert!(warnings.is_empty());
    }

    #[test]
    fn pending_job_reads_requested_resources() {
        let raw = attrs(&[
            ("JobId", "4243"),
            ("JobName", "sweep"),
            ("UserId", "bob(1001)"),
            ("Partition", "asteroids"),
            ("JobState", "PENDING"),
            ("QOS", "master-q"),
            ("Priority", "90"),
            ("RunTime", "00:00:00"),
            ("TimeLimit", "08:00:00"),
            ("NumCPUs", "8"),
            ("TresPerNode", "gres/gpu:A100=4"),
        ]);
        let job = Job::pending(&raw).unwrap();
        assert_eq!(job.partition, 'A');
        assert_eq!(job.priority, 90);
        assert_eq!(
            job.detail,
            JobDetail::Pending {
                requested_gpu_count: 4,
                requested_gpu_type: "A100".to_string(),
                cpu_count: 8,
            }
        );
    }

    #[test]
    fn pending_without_gpu_request_is_any() {
        let raw = attrs(&[
            ("JobId", "1"),
            ("JobName", "cpu-only"),
            ("UserId", "bob(1001)"),
            ("Partition", "universe"),
            ("JobState", "PENDING"),
            ("QOS", "master-q"),
            ("RunTime", "00:00:00"),
            ("NumCPUs", "2"),
        ]);
        let job = Job::pending(&raw).unwrap();
        assert_eq!(
            job.detail,
            JobDetail::Pending {
                requested_gpu_count: 0,
                requested_gpu_type: "any".to_string(),
                cpu_count: 2,
            }
        );
    }

    #[test]
    fn first_plain_and_first_typed_request_are_used() {
        let (plain, typed) = requested_gpus("gres/gpu=2,gres/gpu:A100=4,gres/gpu=8,gres/gpu:A40=1");
        assert_eq!(plain, Some(2));
        assert_eq!(typed, Some(("A100".to_string(), 4)));
        // older colon spellings
        let (plain, typed) = requested_gpus("gres/gpu:3");
        assert_eq!(plain, Some(3));
        assert_eq!(typed, None);
    }

    #[test]
    fn other_variant_rejects_live_states() {
        let err = Job::other(&running_attrs(), now()).unwrap_err();
        assert_eq!(
            err,
            JobError::VariantMismatch {
                expected: "neither RUNNING nor PENDING",
                actual: "RUNNING".to_string(),
            }
        );

        let mut raw = running_attrs();
        raw.insert("JobState".to_string(), "PENDING".to_string());
        assert!(Job::other(&raw, now()).is_err());
        assert!(Job::running(&raw, now(), &mut Vec::new()).is_err());
    }

    #[test]
    fn other_variant_formats_elapsed_time() {
        let raw = attrs(&[
            ("JobId", "4244"),
            ("JobName", "old"),
            ("UserId", "carol(1002)"),
            ("Partition", "universe"),
            ("JobState", "COMPLETED"),
            ("QOS", "staff"),
            ("RunTime", "01:00:00"),
            ("EndTime", "2024-08-12T11:30:00"),
        ]);
        let job = Job::other(&raw, now()).unwrap();
        assert_eq!(
            job.detail,
            JobDetail::Other {
                status: "COMPLETED".to_string(),
                end_time: "2024-08-12T11:30:00".to_string(),
                elapsed_time: "0d:00h:30m:00s".to_string(),
            }
        );
        assert_eq!(job.state(), JobState::Other("COMPLETED".to_string()));
    }

    #[test]
    fn is_recent_applies_both_bounds() {
        let make = |end_time: &str| {
            let raw = attrs(&[
                ("JobId", "9"),
                ("JobName", "x"),
                ("UserId", "carol(1002)"),
                ("Partition", "universe"),
                ("JobState", "FAILED"),
                ("QOS", "staff"),
                ("RunTime", "00:10:00"),
                ("EndTime", end_time),
            ]);
            Job::other(&raw, now()).unwrap()
        };

        // 30 minutes ago: within both bounds
        assert!(make("2024-08-12T11:30:00").is_recent(now(), 60, 0));
        // 2 days ago: day bound fails
        assert!(!make("2024-08-10T11:30:00").is_recent(now(), 60, 0));
        // 90 minutes ago: intra-day bound fails
        assert!(!make("2024-08-12T10:30:00").is_recent(now(), 60, 0));
        // 1 day and 5 minutes ago: day bound ok at window_days=1, and the
        // intra-day remainder (5 minutes) is inside the minutes bound
        assert!(make("2024-08-11T11:55:00").is_recent(now(), 60, 1));
        // unparseable end time is never recent
        assert!(!make("Unknown").is_recent(now(), 60, 0));
    }

    #[test]
    fn snapshot_skips_bad_records_with_warnings() {
        let raw = "JobId=1 JobName=a UserId=alice(1000) Partition=universe \
                   JobState=RUNNING QOS=phd-q RunTime=01:00:00 Nodes=n1 NumCPUs=4 \
                   EndTime=2024-08-12T13:00:00 AllocTRES=cpu=4,gres/gpu=1 \
                   GRES=gpu:A100:1(IDX:0)\n\n\
                   JobName=broken JobState=RUNNING\n\n\
                   JobId=3 JobName=c UserId=bob(1001) Partition=universe \
                   JobState=COMPLETED QOS=master-q RunTime=00:05:00 \
                   EndTime=2024-08-12T11:00:00\n";
        let snapshot = JobsSnapshot::parse_at(raw, now());
        assert_eq!(snapshot.jobs.len(), 2);
        assert_eq!(snapshot.warnings.len(), 1);
        assert_eq!(snapshot.warnings[0].subject, "<unknown job>");
    }

    #[test]
    fn display_pads_and_orders_columns() {
        let mut warnings = Vec::new();
        let job = Job::from_attrs(&running_attrs(), now(), &mut warnings).unwrap();
        let row = job.display(&[("job_id", 6), ("gpus", 4), ("name", 6)]);
        assert_eq!(row, "4242    2     train-");
    }
}
