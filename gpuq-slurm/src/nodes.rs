use thiserror::Error;

use crate::Warning;
use crate::gres::{GpuDescriptor, parse_gpu_descriptors, total_gpu_count};
use crate::parser::split_node_record;
use crate::utils::pad_cell;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeParseError {
    #[error("expected 4 `||`-delimited fields, got {count} in `{record}`")]
    FieldCount { count: usize, record: String },
}

/// Site policy tables injected at construction: which partitions are
/// open to everyone, which of those are preempt-scavenging, and which
/// scheduler states count as down. Immutable for the lifetime of a
/// snapshot.
#[derive(Debug, Clone)]
pub struct ClusterPolicy {
    pub public_partitions: Vec<String>,
    pub preempt_partitions: Vec<String>,
    pub down_states: Vec<String>,
}

impl Default for ClusterPolicy {
    fn default() -> Self {
        let list = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            // sinfo marks the default partition with a trailing `*`
            public_partitions: list(&["universe", "universe*", "asteroids", "asteroids*"]),
            preempt_partitions: list(&["asteroids", "asteroids*"]),
            down_states: list(&[
                "down", "down*", "drain", "draining", "drained", "fail", "fail*",
            ]),
        }
    }
}

impl ClusterPolicy {
    pub fn is_public(&self, partition: &str) -> bool {
        self.public_partitions.iter().any(|p| p == partition)
    }

    pub fn is_preempt(&self, partition: &str) -> bool {
        self.preempt_partitions.iter().any(|p| p == partition)
    }

    pub fn is_down(&self, state: &str) -> bool {
        self.down_states.iter().any(|s| s == state)
    }
}

/// One compute node from a snapshot, with availability and GPU summary
/// derived at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    /// Raw scheduler state string, e.g. `idle` or `drained`.
    pub state: String,
    pub partition: String,
    /// GPU classes in order of first appearance in the raw record.
    pub gpu_descriptors: Vec<GpuDescriptor>,
    /// Sum of descriptor counts.
    pub gpu_count: u32,
    /// Compact rendering like `4xRTX8000(48G),2xA40(44G)`, or `unknown`
    /// when the GPU record was unparseable.
    pub gpu_label: String,
    pub is_preempt: bool,
    pub is_restricted_partition: bool,
    pub is_marked_down: bool,
    pub is_unavailable: bool,
}

impl Node {
    /// Parses one `name||state||partition||gres` record.
    ///
    /// A malformed top-level record fails; an unparseable GPU field does
    /// not — the node survives with zero GPUs, an `unknown` label and a
    /// warning, since dropping a whole node over its GRES string would
    /// understate cluster capacity.
    pub fn parse(
        raw: &str,
        policy: &ClusterPolicy,
        warnings: &mut Vec<Warning>,
    ) -> Result<Self, NodeParseError> {
        let fields = split_node_record(raw);
        let [name, state, partition, gpu_raw] = fields[..] else {
            return Err(NodeParseError::FieldCount {
                count: fields.len(),
                record: raw.to_string(),
            });
        };

        let (gpu_descriptors, gpu_label) = match parse_gpu_descriptors(gpu_raw) {
            Ok(descriptors) => {
                let label = descriptors
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                (descriptors, label)
            }
            Err(err) => {
                warnings.push(Warning::new(
                    name,
                    format!("could not parse gpu info `{gpu_raw}`: {err}"),
                ));
                (Vec::new(), "unknown".to_string())
            }
        };

        let is_restricted_partition = !policy.is_public(partition);
        let is_marked_down = policy.is_down(state);
        Ok(Node {
            name: name.to_string(),
            state: state.to_string(),
            partition: partition.to_string(),
            gpu_count: total_gpu_count(&gpu_descriptors),
            gpu_descriptors,
            gpu_label,
            is_preempt: policy.is_preempt(partition),
            is_restricted_partition,
            is_marked_down,
            is_unavailable: is_marked_down || is_restricted_partition,
        })
    }

    pub fn field(&self, name: &str) -> String {
        match name {
            "name" => self.name.clone(),
            "state" => self.state.clone(),
            "partition" => self.partition.clone(),
            "gpus" => self.gpu_label.clone(),
            "gpu_count" => self.gpu_count.to_string(),
            "access" => if self.is_restricted_partition { "private" } else { "public" }.to_string(),
            _ => String::new(),
        }
    }

    /// Renders the node as one table row, mirroring `Job::display`.
    pub fn display(&self, layout: &[(&str, usize)]) -> String {
        layout
            .iter()
            .map(|(name, width)| pad_cell(&self.field(name), *width))
            .collect::<Vec<_>>()
            .join("  ")
    }
}

/// All nodes parsed from one `sinfo` dump, sorted for display, plus the
/// cluster-wide GPU totals computed after every node is built.
#[derive(Debug, Clone, Default)]
pub struct NodesSnapshot {
    pub nodes: Vec<Node>,
    pub total_gpu_count: u32,
    pub total_gpu_count_available: u32,
    /// GPUs that are both available and outside the preempt partitions.
    pub total_gpu_count_general: u32,
    pub warnings: Vec<Warning>,
}

impl NodesSnapshot {
    /// Parses the output of `sinfo -N -o "%N||%T||%P||%G"`. The header
    /// line is skipped; a malformed record skips that node only.
    ///
    /// Nodes are sorted so that available, highest-capacity machines
    /// surface first: availability, then GPU count descending, then GPU
    /// label, then name.
    pub fn parse(raw: &str, policy: &ClusterPolicy) -> Self {
        let mut nodes = Vec::new();
        let mut warnings = Vec::new();
        for line in raw.lines().skip(1).filter(|l| !l.trim().is_empty()) {
            match Node::parse(line, policy, &mut warnings) {
                Ok(node) => nodes.push(node),
                Err(err) => warnings.push(Warning::new("<node snapshot>", err.to_string())),
            }
        }

        nodes.sort_by(|a, b| {
            a.is_unavailable
                .cmp(&b.is_unavailable)
                .then(b.gpu_count.cmp(&a.gpu_count))
                .then_with(|| a.gpu_label.cmp(&b.gpu_label))
                .then_with(|| a.name.cmp(&b.name))
        });

        let total = |predicate: &dyn Fn(&&Node) -> bool| -> u32 {
            nodes.iter().filter(predicate).map(|n| n.gpu_count).sum()
        };
        NodesSnapshot {
            total_gpu_count: total(&|_| true),
            total_gpu_count_available: total(&|n| !n.is_unavailable),
            total_gpu_count_general: total(&|n| !n.is_unavailable && !n.is_preempt),
            nodes,
            warnings,
        }
    }
}
