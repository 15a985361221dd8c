//! Pure classification and aggregation over already-parsed collections.
//! No I/O happens here; the binary decides what to print.

use std::collections::HashMap;

use crate::jobs::{Job, JobDetail, JobState, QosTier};

/// The jobs of one snapshot partitioned by state, each partition already
/// in display order: running and terminal jobs by `(qos_tier, name)`,
/// pending jobs by priority.
#[derive(Debug, Clone, Default)]
pub struct JobClasses {
    pub running: Vec<Job>,
    pub pending: Vec<Job>,
    pub other: Vec<Job>,
}

impl JobClasses {
    pub fn classify(jobs: Vec<Job>) -> Self {
        let mut classes = JobClasses::default();
        for job in jobs {
            match job.state() {
                JobState::Running => classes.running.push(job),
                JobState::Pending => classes.pending.push(job),
                JobState::Other(_) => classes.other.push(job),
            }
        }
        sort_by_qos(&mut classes.running);
        sort_by_qos(&mut classes.other);
        classes.pending.sort_by_key(|job| job.priority);
        classes
    }

    /// The subset belonging to one user, each partition re-sorted by
    /// job id.
    pub fn for_user(&self, user_id: &str) -> JobClasses {
        let subset = |jobs: &[Job]| {
            let mut jobs: Vec<Job> = jobs
                .iter()
                .filter(|job| job.user_id == user_id)
                .cloned()
                .collect();
            jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));
            jobs
        };
        JobClasses {
            running: subset(&self.running),
            pending: subset(&self.pending),
            other: subset(&self.other),
        }
    }

    /// GPUs in use on one node: the sum over running jobs placed there.
    pub fn gpus_on_node(&self, node_name: &str) -> u32 {
        self.running
            .iter()
            .filter_map(|job| match &job.detail {
                JobDetail::Running {
                    node, gpu_count, ..
                } if node == node_name => Some(*gpu_count),
                _ => None,
            })
            .sum()
    }
}

fn sort_by_qos(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| a.qos_tier.cmp(&b.qos_tier).then_with(|| a.name.cmp(&b.name)));
}

/// One user's total allocated GPUs across running jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGpuUsage {
    pub user_id: String,
    /// Tier of the user's first running job, for the breakdown line.
    pub qos_tier: QosTier,
    pub gpu_count: u32,
}

/// Aggregates allocated GPUs per user over running jobs, descending by
/// total and ascending by user id on ties.
pub fn running_gpus_by_user(running: &[Job]) -> Vec<UserGpuUsage> {
    let mut totals: HashMap<&str, (QosTier, u32)> = HashMap::new();
    for job in running {
        let JobDetail::Running { gpu_count, .. } = &job.detail else {
            continue;
        };
        totals
            .entry(&job.user_id)
            .or_insert((job.qos_tier, 0))
            .1 += gpu_count;
    }

    let mut usage: Vec<UserGpuUsage> = totals
        .into_iter()
        .map(|(user_id, (qos_tier, gpu_count))| UserGpuUsage {
            user_id: user_id.to_string(),
            qos_tier,
            gpu_count,
        })
        .collect();
    usage.sort_by(|a, b| {
        b.gpu_count
            .cmp(&a.gpu_count)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    usage
}

/// One user's outstanding GPU requests across pending jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPendingRequests {
    pub user_id: String,
    pub qos_tier: QosTier,
    /// One rendered descriptor per pending job, e.g. `4xA100` or `2xany`.
    pub requests: Vec<String>,
}

/// Groups pending GPU requests per user, ascending by user id.
pub fn pending_requests_by_user(pending: &[Job]) -> Vec<UserPendingRequests> {
    let mut grouped: HashMap<&str, UserPendingRequests> = HashMap::new();
    for job in pending {
        let JobDetail::Pending {
            requested_gpu_count,
            requested_gpu_type,
            ..
        } = &job.detail
        else {
            continue;
        };
        grouped
            .entry(&job.user_id)
            .or_insert_with(|| UserPendingRequests {
                user_id: job.user_id.clone(),
                qos_tier: job.qos_tier,
                requests: Vec::new(),
            })
            .requests
            .push(format!("{requested_gpu_count}x{requested_gpu_type}"));
    }

    let mut requests: Vec<UserPendingRequests> = grouped.into_values().collect();
    requests.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    requests
}

/// Total GPUs allocated to phd-tier and msc-tier running jobs.
pub fn student_gpu_totals(running: &[Job]) -> (u32, u32) {
    running.iter().fold((0, 0), |(phd, msc), job| {
        let JobDetail::Running { gpu_count, .. } = &job.detail else {
            return (phd, msc);
        };
        match job.qos_tier {
            QosTier::PhdDeadline | QosTier::PhdNormal => (phd + gpu_count, msc),
            QosTier::MscDeadline | QosTier::MscNormal => (phd, msc + gpu_count),
            QosTier::Other => (phd, msc),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobsSnapshot;
    use chrono::{NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, 12)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn running_block(id: &str, user: &str, qos: &str, name: &str, node: &str, gpus: u32) -> String {
        format!(
            "JobId={id} JobName={name} UserId={user}(1000) Partition=universe \
             JobState=RUNNING QOS={qos} Priority=100 RunTime=01:00:00 Nodes={node} \
             NumCPUs=4 EndTime=2024-08-12T18:00:00 \
             AllocTRES=cpu=4,gres/gpu={gpus} GRES=gpu:A100:{gpus}(IDX:0-{})",
            gpus.saturating_sub(1)
        )
    }

    fn pending_block(id: &str, user: &str, priority: u64, request: &str) -> String {
        format!(
            "JobId={id} JobName=p{id} UserId={user}(1000) Partition=universe \
             JobState=PENDING QOS=master-q Priority={priority} RunTime=00:00:00 \
             NumCPUs=2 TresPerNode={request}"
        )
    }

    fn fixture() -> JobClasses {
        let raw = [
            running_block("10", "alice", "phd-q", "zeta", "n1", 2),
            running_block("11", "bob", "master-deadline", "alpha", "n1", 1),
            running_block("12", "alice", "phd-deadline", "beta", "n2", 4),
            pending_block("20", "carol", 50, "gres/gpu=2"),
            pending_block("21", "bob", 10, "gres/gpu:A100=1"),
            "JobId=30 JobName=done UserId=carol(1000) Partition=universe \
             JobState=COMPLETED QOS=staff RunTime=00:10:00 \
             EndTime=2024-08-12T11:00:00"
                .to_string(),
        ]
        .join("\n\n");
        let snapshot = JobsSnapshot::parse_at(&raw, now());
        assert!(snapshot.warnings.is_empty());
        JobClasses::classify(snapshot.jobs)
    }

    #[test]
    fn classification_partitions_and_sorts() {
        let classes = fixture();
        // running: qos tier first (phd-deadline < phd-normal < msc-deadline)
        let running: Vec<&str> = classes.running.iter().map(|j| j.job_id.as_str()).collect();
        assert_eq!(running, vec!["12", "10", "11"]);
        // pending: by priority ascending
        let pending: Vec<&str> = classes.pending.iter().map(|j| j.job_id.as_str()).collect();
        assert_eq!(pending, vec!["21", "20"]);
        assert_eq!(classes.other.len(), 1);
    }

    #[test]
    fn user_subsets_sort_by_job_id() {
        let classes = fixture();
        let alice = classes.for_user("alice");
        let ids: Vec<&str> = alice.running.iter().map(|j| j.job_id.as_str()).collect();
        assert_eq!(ids, vec!["10", "12"]);
        assert!(alice.pending.is_empty());
    }

    #[test]
    fn gpus_on_node_sums_running_jobs() {
        let classes = fixture();
        assert_eq!(classes.gpus_on_node("n1"), 3);
        assert_eq!(classes.gpus_on_node("n2"), 4);
        assert_eq!(classes.gpus_on_node("idle-node"), 0);
    }

    #[test]
    fn usage_breakdown_sorts_desc_then_by_user() {
        let classes = fixture();
        let usage = running_gpus_by_user(&classes.running);
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0].user_id, "alice");
        assert_eq!(usage[0].gpu_count, 6);
        assert_eq!(usage[1].user_id, "bob");
        assert_eq!(usage[1].gpu_count, 1);
    }

    #[test]
    fn pending_breakdown_renders_descriptors() {
        let classes = fixture();
        let requests = pending_requests_by_user(&classes.pending);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].user_id, "bob");
        assert_eq!(requests[0].requests, vec!["1xA100"]);
        assert_eq!(requests[1].user_id, "carol");
        assert_eq!(requests[1].requests, vec!["2xany"]);
    }

    #[test]
    fn student_totals_split_by_tier() {
        let classes = fixture();
        let (phd, msc) = student_gpu_totals(&classes.running);
        assert_eq!(phd, 6);
        assert_eq!(msc, 1);
    }
}
