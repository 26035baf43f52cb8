use crate::Collector;
use anyhow::Result;
use rand::Rng;
use std::collections::HashMap;
use sysinfo::{get_current_pid, Pid, ProcessesToUpdate, System};

/// Samples the agent process itself.
///
/// Includes a `random_value` gauge drawn fresh each poll, useful as a
/// liveness probe: a stuck sampler shows up as a frozen value.
pub struct RuntimeCollector {
    system: System,
    pid: Pid,
}

impl RuntimeCollector {
    pub fn new() -> Result<Self> {
        let pid = get_current_pid().map_err(|e| anyhow::anyhow!("cannot resolve own pid: {e}"))?;
        Ok(Self {
            system: System::new(),
            pid,
        })
    }
}

impl Collector for RuntimeCollector {
    fn name(&self) -> &str {
        "runtime"
    }

    fn collect(&mut self) -> Result<HashMap<String, f64>> {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let process = self
            .system
            .process(self.pid)
            .ok_or_else(|| anyhow::anyhow!("own process missing from the process table"))?;

        let mut gauges = HashMap::new();
        gauges.insert("proc.memory".to_string(), process.memory() as f64);
        gauges.insert(
            "proc.virtual_memory".to_string(),
            process.virtual_memory() as f64,
        );
        gauges.insert("proc.cpu_usage".to_string(), process.cpu_usage() as f64);
        gauges.insert("random_value".to_string(), rand::thread_rng().gen::<f64>());

        Ok(gauges)
    }
}
