use crate::aggregator::Aggregator;
use crate::client::DeliveryClient;
use metra_collector::Collector;
use metra_common::Metric;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// A full sample channel suspends the sampler until the aggregator
/// catches up; samples are never dropped.
const SAMPLE_CHANNEL_CAPACITY: usize = 16;
const JOB_CHANNEL_CAPACITY: usize = 10;

/// Scheduler lifecycle, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Sampling,
    Reporting,
    Draining,
    Stopped,
}

fn set_phase(phase: &mut Phase, next: Phase) {
    if *phase != next {
        tracing::debug!(from = ?phase, to = ?next, "scheduler phase");
        *phase = next;
    }
}

/// Runs sampling and reporting on independent timers, decoupled through
/// bounded channels, and guarantees the drain-once flush on shutdown.
pub struct Scheduler {
    poll_interval: Duration,
    report_interval: Duration,
    batch_update: bool,
    workers: usize,
}

impl Scheduler {
    pub fn new(
        poll_interval: Duration,
        report_interval: Duration,
        batch_update: bool,
        workers: usize,
    ) -> Self {
        Self {
            poll_interval,
            report_interval,
            batch_update,
            workers: workers.max(1),
        }
    }

    /// Drives the agent until `cancel` fires, then drains: buffered
    /// samples are folded in, at most one final batch is flushed through
    /// the delivery workers, and every task is joined.
    pub async fn run(
        &self,
        collectors: Vec<Box<dyn Collector>>,
        client: Arc<DeliveryClient>,
        cancel: CancellationToken,
    ) {
        let (samples_tx, mut samples_rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        let (jobs_tx, jobs_rx) = mpsc::channel::<Vec<Metric>>(JOB_CHANNEL_CAPACITY);

        let mut sampler_handles = Vec::new();
        for collector in collectors {
            sampler_handles.push(tokio::spawn(run_sampler(
                collector,
                self.poll_interval,
                samples_tx.clone(),
                cancel.clone(),
            )));
        }
        drop(samples_tx);

        // Workers exit when the jobs channel closes, not on cancellation,
        // so the final flush still goes out.
        let jobs_rx = Arc::new(Mutex::new(jobs_rx));
        let mut worker_handles = Vec::new();
        for id in 1..=self.workers {
            worker_handles.push(tokio::spawn(run_delivery_worker(
                id,
                jobs_rx.clone(),
                client.clone(),
                self.batch_update,
            )));
        }

        let mut aggregator = Aggregator::new();
        let mut report = tokio::time::interval(self.report_interval);
        report.tick().await; // the immediate first tick would always be empty
        let mut phase = Phase::Sampling;

        loop {
            tokio::select! {
                maybe_sample = samples_rx.recv() => match maybe_sample {
                    Some(sample) => aggregator.absorb(sample),
                    None => break,
                },
                _ = report.tick() => {
                    if let Some(batch) = aggregator.take_batch() {
                        set_phase(&mut phase, Phase::Reporting);
                        if jobs_tx.send(batch).await.is_err() {
                            break;
                        }
                        set_phase(&mut phase, Phase::Sampling);
                    } else {
                        tracing::debug!("no samples since last report, skipping");
                    }
                },
                _ = cancel.cancelled() => break,
            }
        }

        set_phase(&mut phase, Phase::Draining);
        // Fold in samples that were already queued, then flush at most
        // one final batch.
        while let Ok(sample) = samples_rx.try_recv() {
            aggregator.absorb(sample);
        }
        if let Some(batch) = aggregator.take_batch() {
            if jobs_tx.send(batch).await.is_err() {
                tracing::warn!("delivery workers gone, final batch dropped");
            }
        }
        drop(jobs_tx);

        for handle in worker_handles {
            let _ = handle.await;
        }
        for handle in sampler_handles {
            let _ = handle.await;
        }
        set_phase(&mut phase, Phase::Stopped);
    }
}

async fn run_sampler(
    mut collector: Box<dyn Collector>,
    poll_interval: Duration,
    samples_tx: mpsc::Sender<std::collections::HashMap<String, f64>>,
    cancel: CancellationToken,
) {
    let mut tick = tokio::time::interval(poll_interval);
    tick.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                match collector.collect() {
                    Ok(sample) => {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            sent = samples_tx.send(sample) => {
                                if sent.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(collector = collector.name(), error = %e, "sampling failed");
                    }
                }
            }
        }
    }
    tracing::debug!(collector = collector.name(), "sampler stopped");
}

async fn run_delivery_worker(
    id: usize,
    jobs_rx: Arc<Mutex<mpsc::Receiver<Vec<Metric>>>>,
    client: Arc<DeliveryClient>,
    batch_update: bool,
) {
    loop {
        let batch = jobs_rx.lock().await.recv().await;
        let Some(batch) = batch else { break };

        if batch_update {
            if let Err(e) = client.send_batch(&batch).await {
                tracing::error!(worker = id, error = %e, "batch delivery failed");
            }
        } else {
            // Per-metric mode: one POST each, failures independent.
            for metric in &batch {
                if let Err(e) = client.send_one(metric).await {
                    tracing::error!(worker = id, metric = %metric.id, error = %e, "metric delivery failed");
                }
            }
        }
    }
    tracing::debug!(worker = id, "delivery worker stopped");
}
