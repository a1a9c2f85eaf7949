use anyhow::Context;
use clap::Parser;
use qtm_spec::config::cli::Command;
use qtm_spec::core::report::{combined_report, experiment_report, render_table};
use qtm_spec::utils::error::{ErrorSeverity, SpecError};
use qtm_spec::utils::logger::{init_logger, LogFormat};
use qtm_spec::utils::monitor::AnalysisMonitor;
use qtm_spec::utils::validation::Validate;
use qtm_spec::{AnalysisOptions, CliConfig, Selector, Settings, SpecLoader};

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 設定檔只讀一次；讀取失敗時先用預設日誌格式回報錯誤
    let file_config = cli.file_config();

    let json_logs = cli.log_json
        || file_config
            .as_ref()
            .is_ok_and(|config| config.json_logs());
    let log_format = if json_logs { LogFormat::Json } else { LogFormat::Compact };
    init_logger(log_format, cli.verbose);
    tracing::debug!("CLI config: {:?}", cli);

    let settings = match file_config
        .and_then(|config| cli.resolve_with(&config))
        .and_then(|s| s.validate().map(|_| s))
    {
        Ok(settings) => settings,
        Err(e) => exit_with(&e),
    };

    let monitor = AnalysisMonitor::new(settings.monitor);
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run(&cli.command, &settings, &monitor) {
        Ok(output) => {
            print!("{}", output);
            monitor.log_summary();
            Ok(())
        }
        Err(e) => match e.downcast_ref::<SpecError>() {
            Some(spec_error) => exit_with(spec_error),
            None => Err(e),
        },
    }
}

fn run(command: &Command, settings: &Settings, monitor: &AnalysisMonitor) -> anyhow::Result<String> {
    let loader = SpecLoader::new(settings.storage());
    let format = settings.output_format()?;
    let options = AnalysisOptions::from_config(settings);
    tracing::debug!("Reading data from {}", loader.storage().base_path().display());

    let output = match command {
        Command::List { machine } => {
            let mut lines = String::new();
            for selector in loader.selectors() {
                let selector = selector?;
                if machine.as_deref().is_some_and(|m| m != selector.machine) {
                    continue;
                }
                lines.push_str(&selector.to_string());
                lines.push('\n');
            }
            lines
        }
        Command::Show { selector } => {
            let table = loader.load_str(selector)?;
            render_table(&table, format)?
        }
        Command::Analyze { selector, .. } => {
            let selector: Selector = selector.parse()?;
            let report = monitor
                .measure(&selector.to_string(), || {
                    experiment_report(&loader, &selector, &options)
                })
                .with_context(|| format!("analyzing {}", selector))?;
            report.render(format)?
        }
        Command::Combined {
            machine,
            date,
            tests,
            ..
        } => {
            let report = monitor.measure("combined report", || {
                combined_report(&loader, machine, date, tests, &options)
            })?;
            report.render(format)?
        }
    };

    Ok(output)
}

fn exit_with(e: &SpecError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
