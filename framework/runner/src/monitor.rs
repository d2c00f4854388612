use gust_core::prelude::ShutdownListener;
use sysinfo::{Pid, ProcessRefreshKind, System};

/// Watch the worker's own CPU usage while it emits load.
///
/// A saturated worker cannot pace arrivals accurately, so the emitted curve
/// silently flattens. This won't stop the run; it logs a warning so the
/// operator knows the numbers may be distorted and the chunk limits should
/// come down.
pub fn start_monitor(mut shutdown: ShutdownListener) {
    std::thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            let own_pid = Pid::from_u32(std::process::id());
            let mut sys = System::new();

            sys.refresh_cpu();
            let cpu_count = sys.cpus().len();

            loop {
                if shutdown.is_triggered() {
                    break;
                }

                sys.refresh_process_specifics(own_pid, ProcessRefreshKind::new().with_cpu());

                if let Some(process) = sys.process(own_pid) {
                    let usage = process.cpu_usage() / cpu_count as f32;
                    if usage > 70.0 {
                        log::warn!(
                            "The worker is using {usage:.1}% of {cpu_count} cores; arrival pacing \
                             may lag behind the script"
                        );
                    }
                }

                std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            }
        })
        .expect("Failed to start monitor thread");
}
