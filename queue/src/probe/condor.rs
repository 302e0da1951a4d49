//! Queue probe backed by the `condor_q` command.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::QueueProbe;
use crate::job::{Job, parse_description};

/// Line printed by the scheduler when nothing is queued anywhere.
const EMPTY_QUEUE_SENTINEL: &str = "All queues are empty";

/// Attributes printed one per job, colon-separated, in this order.
const QUEUE_ATTRIBUTES: [&str; 9] = [
    "GlobalJobId",
    "ClusterId",
    "JobStatus",
    "QDate",
    "RequestCpus",
    "RequestMemory",
    "RequestDisk",
    "JobDescription",
    "ExitStatus",
];

pub struct CondorProbe {
    bin: String,
}

impl CondorProbe {
    pub fn new() -> Self {
        Self {
            bin: "condor_q".into(),
        }
    }
}

impl Default for CondorProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueProbe for CondorProbe {
    async fn global_queue(&self) -> anyhow::Result<Vec<Job>> {
        let output = Command::new(&self.bin)
            .args(query_args())
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("failed to spawn {}: {e}", self.bin))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                self.bin,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(parse_queue(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn query_args() -> Vec<String> {
    let mut args = vec!["-global".to_string()];
    let last = QUEUE_ATTRIBUTES.len() - 1;
    for (i, attr) in QUEUE_ATTRIBUTES.iter().enumerate() {
        args.push("-format".into());
        // Fields are colon-joined; the final one terminates the line.
        args.push(if i == last { "%s\n".into() } else { "%s:".into() });
        args.push((*attr).into());
    }
    args
}

/// Parse probe output, one job per line. Bad lines are logged and skipped;
/// the empty-queue sentinel ends parsing.
fn parse_queue(output: &str) -> Vec<Job> {
    let mut jobs = Vec::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        if line.contains(EMPTY_QUEUE_SENTINEL) {
            break;
        }
        match parse_queue_line(line) {
            Ok(job) => jobs.push(job),
            Err(e) => warn!(error = %e, line, "skipping unparseable queue line"),
        }
    }
    debug!(count = jobs.len(), "parsed global queue");
    jobs
}

fn parse_queue_line(line: &str) -> anyhow::Result<Job> {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() < QUEUE_ATTRIBUTES.len() {
        anyhow::bail!(
            "expected {} colon-separated fields, got {}",
            QUEUE_ATTRIBUTES.len(),
            fields.len()
        );
    }

    // The global id is <tenant queue address>#<cluster>.<proc>#...
    let tenant_address = match fields[0].split_once('#') {
        Some((address, _)) => address.to_string(),
        None => String::new(),
    };

    let id: i64 = fields[1].parse()?;
    let status: i32 = fields[2].parse()?;
    let req_time: i64 = fields[3].parse()?;
    let req_cpus: i32 = fields[4].parse()?;
    let req_mem = normalize_capacity(fields[5]);
    let req_disk = normalize_capacity(fields[6]);

    let description = if fields[7].contains('=') {
        parse_description(fields[7])
    } else {
        HashMap::new()
    };

    Ok(Job::new(
        tenant_address,
        id,
        status,
        req_time,
        req_cpus,
        req_mem,
        req_disk,
        description,
    ))
}

/// The scheduler reports memory and disk either in GB or in MB; raw values
/// above 1024 are taken to be MB and scaled down. Non-numeric values
/// (condor sometimes prints an expression here) become zero.
fn normalize_capacity(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v > 1024.0 => v / 1024.0,
        Ok(v) => v,
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::DescValue;

    const LINE: &str =
        "queue.example.org#1234.0#5678:1234:1:1700000000:4:2048:10:ondemand=true,tool=blast:0";

    #[test]
    fn a_full_line_parses() {
        let job = parse_queue_line(LINE).unwrap();

        assert_eq!(job.tenant_address, "queue.example.org");
        assert_eq!(job.id, 1234);
        assert_eq!(job.status, 1);
        assert_eq!(job.req_time, 1_700_000_000);
        assert_eq!(job.req_cpus, 4);
        assert!(job.ondemand);
        assert_eq!(job.tool.as_deref(), Some("blast"));
    }

    #[test]
    fn large_capacities_are_scaled_to_gb() {
        let job = parse_queue_line(LINE).unwrap();
        // 2048 MB -> 2 GB; 10 is already GB.
        assert_eq!(job.req_mem, 2.0);
        assert_eq!(job.req_disk, 10.0);
    }

    #[test]
    fn non_numeric_capacity_becomes_zero() {
        assert_eq!(normalize_capacity("ifthenelse(...)"), 0.0);
    }

    #[test]
    fn short_lines_are_rejected() {
        assert!(parse_queue_line("a:b:c").is_err());
    }

    #[test]
    fn bad_lines_are_skipped_not_fatal() {
        let output = format!("garbage line\n{LINE}\n");
        let jobs = parse_queue(&output);
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn sentinel_ends_parsing() {
        let output = format!("{LINE}\n-- All queues are empty --\n{LINE}\n");
        let jobs = parse_queue(&output);
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn description_without_equals_is_ignored() {
        let line = "q#1.0:1:1:100:1:1:1:none:0";
        let job = parse_queue_line(line).unwrap();
        assert!(job.description.is_empty());
        assert_eq!(job.description.get("x"), None::<&DescValue>);
    }
}
