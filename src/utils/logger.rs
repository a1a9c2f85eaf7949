use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    /// 一行一個 JSON 物件，方便批次分析時收集
    Json,
}

/// `RUST_LOG` 優先；否則 verbose 時開到 debug
fn default_filter(verbose: bool) -> EnvFilter {
    let directive = if verbose { "qtm_spec=debug,warn" } else { "qtm_spec=info,warn" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
}

/// 日誌一律寫到 stderr，stdout 只留給報表
pub fn init_logger(format: LogFormat, verbose: bool) {
    let registry = tracing_subscriber::registry().with(default_filter(verbose));
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Compact => registry.with(layer.compact()).init(),
        LogFormat::Json => registry.with(layer.json()).init(),
    }
}
