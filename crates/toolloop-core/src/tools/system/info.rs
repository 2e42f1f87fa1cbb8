//! System information tool

use serde_json::{json, Value};
use sysinfo::{Disks, System};

use crate::error::ToolError;
use crate::tools::{BoxFuture, Tool};

use super::{blocking, format_bytes};

/// Reports OS, CPU, memory and disk figures for the host
pub struct GetSystemInfo;

fn collect() -> Value {
    let sys = System::new_all();

    let cpus = sys.cpus();
    let brand = cpus.first().map(|c| c.brand().to_string());
    let frequency = cpus.first().map(|c| c.frequency());

    let disks = Disks::new_with_refreshed_list();
    let disk_list: Vec<Value> = disks
        .list()
        .iter()
        .map(|d| {
            let total = d.total_space();
            let free = d.available_space();
            json!({
                "name": d.name().to_string_lossy(),
                "mount_point": d.mount_point().to_string_lossy(),
                "total": total,
                "free": free,
                "used": total.saturating_sub(free),
                "total_human": format_bytes(total),
                "free_human": format_bytes(free),
            })
        })
        .collect();

    let total_memory = sys.total_memory();
    let used_memory = sys.used_memory();

    json!({
        "platform": {
            "system": System::name(),
            "release": System::kernel_version(),
            "version": System::os_version(),
            "long_version": System::long_os_version(),
            "node": System::host_name(),
            "machine": std::env::consts::ARCH,
            "uptime_secs": System::uptime(),
        },
        "cpu": {
            "brand": brand,
            "logical_cores": cpus.len(),
            "frequency_mhz": frequency,
            "usage_percent": sys.global_cpu_usage(),
        },
        "memory": {
            "total": total_memory,
            "available": sys.available_memory(),
            "used": used_memory,
            "percent": if total_memory > 0 { used_memory as f64 / total_memory as f64 * 100.0 } else { 0.0 },
            "total_human": format_bytes(total_memory),
            "used_human": format_bytes(used_memory),
        },
        "disks": disk_list,
        "processes": {
            "total": sys.processes().len(),
        },
    })
}

impl Tool for GetSystemInfo {
    fn name(&self) -> &str {
        "get_system_info"
    }

    fn description(&self) -> &str {
        "Get information about the host: operating system, CPU, memory, disks and process count."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    fn execute(&self, _params: Value) -> BoxFuture<'_, Result<Value, ToolError>> {
        Box::pin(async move { blocking(|| Ok(collect())).await })
    }
}
