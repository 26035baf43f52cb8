use crate::Collector;
use anyhow::Result;
use std::collections::HashMap;
use sysinfo::System;

/// Samples OS-level memory, CPU, and load gauges.
pub struct SystemCollector {
    system: System,
}

impl SystemCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        Self { system }
    }
}

impl Collector for SystemCollector {
    fn name(&self) -> &str {
        "system"
    }

    fn collect(&mut self) -> Result<HashMap<String, f64>> {
        self.system.refresh_memory();
        self.system.refresh_cpu_all();
        let load_avg = System::load_average();

        let mut gauges = HashMap::new();
        gauges.insert(
            "system.memory_total".to_string(),
            self.system.total_memory() as f64,
        );
        gauges.insert(
            "system.memory_used".to_string(),
            self.system.used_memory() as f64,
        );
        gauges.insert(
            "system.memory_available".to_string(),
            self.system.available_memory() as f64,
        );
        gauges.insert(
            "system.cpu_usage".to_string(),
            self.system.global_cpu_usage() as f64,
        );
        gauges.insert("system.load_1".to_string(), load_avg.one);
        gauges.insert("system.load_5".to_string(), load_avg.five);
        gauges.insert("system.load_15".to_string(), load_avg.fifteen);
        gauges.insert("system.uptime".to_string(), System::uptime() as f64);

        Ok(gauges)
    }
}
