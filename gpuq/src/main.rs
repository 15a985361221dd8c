pub mod fetch;
pub mod report;

use clap::Parser;
use colored::Colorize;

use gpuq_slurm::Warning;
use gpuq_slurm::cluster::JobClasses;
use gpuq_slurm::jobs::JobsSnapshot;
use gpuq_slurm::nodes::{ClusterPolicy, NodesSnapshot};

use crate::report::{PENDING_LAYOUT, RUNNING_LAYOUT};

/// A custom squeue for a shared GPU cluster: live GPU allocation per
/// node and per user, from single snapshots of `scontrol` and `sinfo`.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Show the default profile: overall info, my jobs and usage breakdowns.
    #[arg(long)]
    default: bool,
    /// Like --default, plus running jobs of all users.
    #[arg(long)]
    more: bool,
    /// Show everything.
    #[arg(long)]
    all: bool,
    /// Show only the all-user job tables.
    #[arg(long)]
    jobs: bool,

    /// Show the overall GPU availability summary.
    #[arg(long)]
    overall: bool,
    /// Show the current user's jobs.
    #[arg(long)]
    user: bool,
    /// Show the per-user GPU usage breakdowns.
    #[arg(long)]
    usage: bool,
    /// Show running jobs of all users.
    #[arg(long)]
    all_users: bool,
    /// Show pending jobs of all users.
    #[arg(long)]
    all_users_pending: bool,

    /// List every node with its GPUs and state.
    #[arg(long)]
    nodes: bool,
}

/// Which sections to print, resolved from the profile flags.
struct Sections {
    overall: bool,
    user: bool,
    usage: bool,
    all_users: bool,
    all_users_pending: bool,
    nodes: bool,
}

impl Sections {
    fn from_args(args: &Args) -> Self {
        let mut sections = Sections {
            overall: args.overall,
            user: args.user,
            usage: args.usage,
            all_users: args.all_users,
            all_users_pending: args.all_users_pending,
            nodes: args.nodes,
        };
        if args.default {
            sections.overall = true;
            sections.user = true;
            sections.usage = true;
        }
        if args.more {
            sections.overall = true;
            sections.user = true;
            sections.usage = true;
            sections.all_users = true;
        }
        if args.jobs {
            sections.all_users = true;
            sections.all_users_pending = true;
        }
        if args.all {
            sections.overall = true;
            sections.user = true;
            sections.usage = true;
            sections.all_users = true;
            sections.all_users_pending = true;
        }
        sections
    }

    fn any(&self) -> bool {
        self.overall
            || self.user
            || self.usage
            || self.all_users
            || self.all_users_pending
            || self.nodes
    }
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
}

fn main() -> Result<(), fetch::FetchError> {
    let args = Args::parse();
    let mut sections = Sections::from_args(&args);
    if !sections.any() {
        // bare invocation behaves like --default
        sections.overall = true;
        sections.user = true;
        sections.usage = true;
    }

    let now = chrono::Local::now().naive_local();
    let policy = ClusterPolicy::default();

    // One snapshot per run; everything below is a pure transform of it.
    let node_snapshot = NodesSnapshot::parse(&fetch::fetch_node_snapshot()?, &policy);
    let job_snapshot = JobsSnapshot::parse_at(&fetch::fetch_job_snapshot()?, now);
    print_warnings(&node_snapshot.warnings);
    print_warnings(&job_snapshot.warnings);

    let classes = JobClasses::classify(job_snapshot.jobs);
    let user = fetch::current_user();

    if sections.nodes {
        report::print_node_table(&node_snapshot);
        println!();
    }
    if sections.overall {
        report::print_overall_gpu_info(&node_snapshot, &classes, false);
        println!();
    }
    if sections.user {
        match &user {
            Some(user) => report::print_user_jobs(user, &classes, now),
            None => println!("Could not determine the current user."),
        }
        println!();
    }
    if sections.usage {
        report::print_usage_breakdown(&classes, fetch::lookup_full_name);
        println!();
        report::print_pending_breakdown(&classes, fetch::lookup_full_name);
        println!();
    }
    // Skip the invoking user's own jobs in the all-user tables when they
    // already got their personal section.
    let exclude = if sections.user { user.as_deref() } else { None };
    if sections.all_users {
        report::print_all_jobs("Running jobs, all users", &classes.running, RUNNING_LAYOUT, exclude);
        println!();
    }
    if sections.all_users_pending {
        report::print_all_jobs("Pending jobs, all users", &classes.pending, PENDING_LAYOUT, exclude);
        println!();
    }

    Ok(())
}
