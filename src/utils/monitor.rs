use std::sync::Mutex;
use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

/// 單一分析階段的耗時與結束時的記憶體
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseStats {
    pub phase: String,
    pub elapsed: Duration,
    pub memory_mb: Option<u64>,
}

#[derive(Default)]
struct MonitorState {
    phases: Vec<PhaseStats>,
    peak_memory_mb: u64,
}

/// 記錄 bootstrap 等較重的分析步驟所用的時間與記憶體
pub struct AnalysisMonitor {
    enabled: bool,
    started: Instant,
    state: Mutex<MonitorState>,
    #[cfg(feature = "cli")]
    probe: Option<Mutex<MemoryProbe>>,
}

impl AnalysisMonitor {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            started: Instant::now(),
            state: Mutex::new(MonitorState::default()),
            #[cfg(feature = "cli")]
            probe: enabled.then(MemoryProbe::new).flatten().map(Mutex::new),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 執行 `f` 並記下這個階段；停用時直接執行
    pub fn measure<T>(&self, phase: &str, f: impl FnOnce() -> T) -> T {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let output = f();
        let stats = PhaseStats {
            phase: phase.to_string(),
            elapsed: start.elapsed(),
            memory_mb: self.sample_memory_mb(),
        };

        tracing::info!(
            "📊 {} - Time: {:?}, Memory: {}",
            stats.phase,
            stats.elapsed,
            stats
                .memory_mb
                .map(|mb| format!("{}MB", mb))
                .unwrap_or_else(|| "n/a".to_string())
        );

        if let Ok(mut state) = self.state.lock() {
            if let Some(mb) = stats.memory_mb {
                state.peak_memory_mb = state.peak_memory_mb.max(mb);
            }
            state.phases.push(stats);
        }
        output
    }

    pub fn phases(&self) -> Vec<PhaseStats> {
        self.state
            .lock()
            .map(|state| state.phases.clone())
            .unwrap_or_default()
    }

    pub fn log_summary(&self) {
        if !self.enabled {
            return;
        }
        let (count, peak) = self
            .state
            .lock()
            .map(|s| (s.phases.len(), s.peak_memory_mb))
            .unwrap_or_default();
        tracing::info!(
            "📊 {} phases in {:?}, peak memory {}MB",
            count,
            self.started.elapsed(),
            peak
        );
    }

    #[cfg(feature = "cli")]
    fn sample_memory_mb(&self) -> Option<u64> {
        self.probe.as_ref()?.lock().ok()?.resident_mb()
    }

    #[cfg(not(feature = "cli"))]
    fn sample_memory_mb(&self) -> Option<u64> {
        None
    }
}

impl Default for AnalysisMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

/// 只刷新本行程的資訊
#[cfg(feature = "cli")]
struct MemoryProbe {
    system: System,
    pid: Pid,
}

#[cfg(feature = "cli")]
impl MemoryProbe {
    fn new() -> Option<Self> {
        let pid = sysinfo::get_current_pid().ok()?;
        Some(Self {
            system: System::new(),
            pid,
        })
    }

    fn resident_mb(&mut self) -> Option<u64> {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        self.system
            .process(self.pid)
            .map(|process| process.memory() / 1024 / 1024)
    }
}
