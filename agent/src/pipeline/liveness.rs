use std::collections::VecDeque;
use std::time::Duration;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use printfleet_core::model::{LivenessResult, ScanJob};
use printfleet_core::targets;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(800);

/// Sweeps a batch of candidate jobs for open TCP ports, bounding in-flight
/// connection attempts with a sliding `FuturesUnordered` window rather than
/// chunking into fixed batches, so a single slow host doesn't stall an
/// otherwise-fast batch.
pub async fn sweep_liveness(
    jobs: Vec<ScanJob>,
    ports: &[u16],
    concurrency: usize,
) -> Vec<LivenessResult> {
    let mut queue: VecDeque<ScanJob> = jobs.into();
    let mut in_flight = FuturesUnordered::new();
    let mut results = Vec::new();

    for _ in 0..concurrency {
        if let Some(job) = queue.pop_front() {
            in_flight.push(probe_job(job, ports.to_vec()));
        }
    }

    while let Some(result) = in_flight.next().await {
        results.push(result);
        if let Some(job) = queue.pop_front() {
            in_flight.push(probe_job(job, ports.to_vec()));
        }
    }

    results
}

async fn probe_job(job: ScanJob, ports: Vec<u16>) -> LivenessResult {
    let mut open_ports = Vec::new();
    for port in ports {
        if probe_port(job.ip, port).await {
            open_ports.push(port);
        }
    }

    let alive = !open_ports.is_empty();
    debug!(
        target: targets::PIPELINE,
        ip = %job.ip,
        alive,
        open_ports = ?open_ports,
        "liveness sweep result"
    );

    LivenessResult {
        job,
        alive,
        open_ports,
    }
}

async fn probe_port(ip: std::net::Ipv4Addr, port: u16) -> bool {
    let addr = (ip, port);
    match timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(error)) => {
            trace!(target: targets::PIPELINE, ip = %ip, port, error = %error, "port closed");
            false
        }
        Err(_) => {
            trace!(target: targets::PIPELINE, ip = %ip, port, "port probe timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printfleet_core::model::ScanJob;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn unreachable_host_reports_not_alive() {
        let job = ScanJob::new(Ipv4Addr::new(198, 51, 100, 1), "test");
        let results = sweep_liveness(vec![job], &[1], 1).await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].alive);
    }

    #[tokio::test]
    async fn empty_batch_yields_no_results() {
        let results = sweep_liveness(vec![], &[80], 4).await;
        assert!(results.is_empty());
    }
}
