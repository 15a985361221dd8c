//! Console rendering of already-resolved records: section printers,
//! column layouts and coloring. No decision logic lives here.

use colored::Colorize;

use gpuq_slurm::cluster::{
    JobClasses, pending_requests_by_user, running_gpus_by_user, student_gpu_totals,
};
use gpuq_slurm::jobs::Job;
use gpuq_slurm::nodes::NodesSnapshot;
use gpuq_slurm::utils::pad_cell;

/// Column layouts: field name and width, in print order.
pub const RUNNING_LAYOUT: &[(&str, usize)] = &[
    ("job_id", 6),
    ("node", 12),
    ("gpus", 4),
    ("cpus", 4),
    ("mem", 6),
    ("priority", 7),
    ("runtime", 10),
    ("remaining_time", 14),
    ("name", 27),
];

pub const PENDING_LAYOUT: &[(&str, usize)] = &[
    ("job_id", 6),
    ("user_id", 8),
    ("qos", 5),
    ("gpus", 4),
    ("cpus", 4),
    ("priority", 10),
    ("time_limit", 10),
    ("name", 27),
];

pub const OTHER_LAYOUT: &[(&str, usize)] = &[
    ("job_id", 6),
    ("user_id", 8),
    ("qos", 5),
    ("status", 15),
    ("runtime", 10),
    ("elapsed_time", 15),
];

const NODE_LAYOUT: &[(&str, usize)] = &[
    ("name", 20),
    ("gpus", 28),
    ("state", 12),
    ("partition", 12),
    ("access", 8),
];

/// Prints a header row followed by one row per job, all columns padded
/// to the layout widths.
pub fn print_job_table(jobs: &[Job], layout: &[(&str, usize)]) {
    let header: Vec<String> = layout
        .iter()
        .map(|(name, width)| pad_cell(name, *width))
        .collect();
    println!("{}", header.join("  ").bold());
    for job in jobs {
        println!("{}", job.display(layout));
    }
}

/// The cluster-wide free-GPU summary line plus the available and
/// unavailable node lists.
pub fn print_overall_gpu_info(nodes: &NodesSnapshot, jobs: &JobClasses, show_unavailable: bool) {
    let mut free_total = 0;
    let mut free_general = 0;
    let mut available = Vec::new();
    for node in nodes.nodes.iter().filter(|n| !n.is_unavailable) {
        let used = jobs.gpus_on_node(&node.name);
        let free = node.gpu_count.saturating_sub(used);
        free_total += free;
        if !node.is_preempt {
            free_general += free;
        }
        available.push(format!("{} ({}/{})", node.name, free, node.gpu_count));
    }
    println!(
        "Free GPUs: {} / {} ({} outside the preempt partitions)",
        free_total.to_string().green().bold(),
        nodes.total_gpu_count_available,
        free_general
    );
    println!("Available nodes: {}", available.join(", "));

    if show_unavailable {
        let unavailable: Vec<String> = nodes
            .nodes
            .iter()
            .filter(|n| n.is_unavailable && !n.is_preempt)
            .map(|n| format!("{} ({})", n.name, n.state))
            .collect();
        if unavailable.is_empty() {
            println!("All nodes are up and running.");
        } else {
            println!("Unavailable nodes: {}", unavailable.join(", ").red());
        }
    }
}

/// Per-node table of the whole cluster, available nodes in green and
/// unavailable ones in red.
pub fn print_node_table(nodes: &NodesSnapshot) {
    println!("Total GPUs: {}", nodes.total_gpu_count);
    println!("Total GPUs currently online: {}", nodes.total_gpu_count_available);
    println!(
        "Total general (non-preempt) GPUs: {}",
        nodes.total_gpu_count_general
    );
    println!();
    let header: Vec<String> = NODE_LAYOUT
        .iter()
        .map(|(name, width)| pad_cell(name, *width))
        .collect();
    println!("{}", header.join("  ").bold());
    for node in &nodes.nodes {
        let row = node.display(NODE_LAYOUT);
        if node.is_unavailable {
            println!("{}", row.red());
        } else {
            println!("{}", row.green());
        }
    }
}

/// The invoking user's running, pending and recently finished jobs.
pub fn print_user_jobs(user: &str, classes: &JobClasses, now: chrono::NaiveDateTime) {
    let mine = classes.for_user(user);

    if mine.running.is_empty() {
        println!("No running jobs of the current user.");
    } else {
        println!("My running jobs ({}):", mine.running.len());
        print_job_table(&mine.running, RUNNING_LAYOUT);
    }

    if !mine.pending.is_empty() {
        println!();
        println!("My pending jobs ({}):", mine.pending.len());
        print_job_table(&mine.pending, PENDING_LAYOUT);
    }

    let recent: Vec<Job> = mine
        .other
        .iter()
        .filter(|job| job.is_recent(now, 60, 0))
        .cloned()
        .collect();
    if !recent.is_empty() {
        println!();
        println!("My recently finished jobs:");
        print_job_table(&recent, OTHER_LAYOUT);
    }
}

/// Per-user GPU usage over running jobs, with phd/msc subtotals.
pub fn print_usage_breakdown(classes: &JobClasses, full_name: impl Fn(&str) -> Option<String>) {
    println!("GPU usage per user (running jobs):");
    for usage in running_gpus_by_user(&classes.running) {
        if usage.gpu_count == 0 {
            continue;
        }
        let name = full_name(&usage.user_id).unwrap_or_default();
        println!(
            "{}{}{}{} GPUs",
            pad_cell(&usage.user_id, 10),
            pad_cell(&format!(" {name} "), 30),
            pad_cell(&format!(" ({}) ", usage.qos_tier), 10),
            usage.gpu_count
        );
    }

    let (phd_gpus, msc_gpus) = student_gpu_totals(&classes.running);
    println!();
    println!("Total phd student GPUs: {phd_gpus}");
    println!("Total msc student GPUs: {msc_gpus}");
}

/// Per-user outstanding GPU requests over pending jobs.
pub fn print_pending_breakdown(classes: &JobClasses, full_name: impl Fn(&str) -> Option<String>) {
    println!("Breakdown of GPU requests per user (pending jobs):");
    for user in pending_requests_by_user(&classes.pending) {
        if user.requests.is_empty() {
            continue;
        }
        let name = full_name(&user.user_id).unwrap_or_default();
        println!(
            "{}{}{} {} jobs: [{}]",
            pad_cell(&user.user_id, 10),
            pad_cell(&format!(" {name} "), 30),
            pad_cell(&format!(" ({}) ", user.qos_tier), 8),
            user.requests.len(),
            user.requests.join(", ")
        );
    }
}

/// All running or pending jobs on the cluster, optionally without the
/// invoking user's own (already shown in their personal section).
pub fn print_all_jobs(
    title: &str,
    jobs: &[Job],
    layout: &[(&str, usize)],
    exclude_user: Option<&str>,
) {
    println!("{title}:");
    let visible: Vec<Job> = jobs
        .iter()
        .filter(|job| exclude_user.is_none_or(|user| job.user_id != user))
        .cloned()
        .collect();
    if visible.is_empty() {
        println!("(none)");
    } else {
        print_job_table(&visible, layout);
    }
}
