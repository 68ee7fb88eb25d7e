mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::io::IsTerminal;
use std::time::Duration;

use cli::{Cli, Commands, ConfigAction, ScanArgs};
use module_size_cli::config::Config;
use module_size_cli::report::ReportFormatter;
use module_size_cli::scanner::{ScanProgress, SizeCalculator};
use module_size_cli::SizeReport;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 日志输出到 stderr，报告输出到 stdout
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // 加载配置
    let config = match &cli.config {
        Some(config_path) => Config::load_from_file(config_path)?,
        None => Config::load_or_default()?,
    };

    let grace = config.scan.cancel_grace();
    block_on_with_grace(grace, run(cli, config))?
}

/// 在新建的运行时上执行，结束后最多等待 `grace` 让阻塞任务退出
///
/// 取消或超时后被放弃的遍历和计数可能卡在文件系统调用上，
/// 运行时不会无限期等待它们。
fn block_on_with_grace<F: Future>(grace: Duration, future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("无法创建异步运行时")?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(grace);
    Ok(output)
}

async fn run(cli: Cli, mut config: Config) -> Result<()> {
    match cli.command {
        Commands::Scan(args) => run_scan(&args, &mut config, cli.quiet).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let content = toml::to_string_pretty(&config)?;
                println!("{}", content);
                Ok(())
            }
            ConfigAction::Init { path, force } => {
                let path = match path {
                    Some(path) => path,
                    None => Config::default_config_path()?,
                };
                if path.exists() && !force {
                    anyhow::bail!("配置文件 `{}` 已存在，使用 --force 覆盖", path.display());
                }
                Config::default().save_to_file(&path)?;
                println!("已写入默认配置: {}", path.display());
                Ok(())
            }
        },
    }
}

async fn run_scan(args: &ScanArgs, config: &mut Config, quiet: bool) -> Result<()> {
    args.apply_to(config)?;

    let spinner = progress_spinner(quiet)?;
    let calculator = SizeCalculator::new(&config.scan)
        .with_undefined_module(args.include_undefined)
        .with_progress({
            let spinner = spinner.clone();
            move |progress: ScanProgress| {
                spinner.set_message(format!(
                    "已统计 {} 个文件，跳过 {} 个（{}）",
                    progress.files_counted, progress.files_skipped, progress.module
                ));
            }
        });

    // Ctrl-C 取消计数，仍输出已完成的部分
    let token = calculator.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("收到中断信号，输出部分结果");
            token.cancel();
        }
    });

    let result = calculator
        .analyze(&config.root, &config.modules, &config.policy)
        .await;
    interrupt.abort();
    spinner.finish_and_clear();

    let report = result.with_context(|| format!("无法扫描 `{}`", config.root.display()))?;

    let style = config.output.format;
    match &args.output {
        Some(target) => {
            ReportFormatter::save_to_file(&report, style, target)?;
            tracing::info!("报告已保存到 {}", target.display());
        }
        None => println!("{}", ReportFormatter::format(&report, style)?),
    }

    verify(&report, args)
}

/// 按命令行中的约束校验报告，失败时以非零状态退出
fn verify(report: &SizeReport, args: &ScanArgs) -> Result<()> {
    if args.require_non_empty {
        report.verify_no_empty_modules()?;
    }
    if let Some(threshold) = args.max_share {
        report.verify_each_module_relative_size_below(threshold)?;
    }
    for (name, threshold) in &args.max_module_share {
        report.verify_module_relative_size_below(name, *threshold)?;
    }
    if let Some(allowed) = args.max_undefined_files {
        report.verify_undefined_module_file_count_below(allowed)?;
    }
    Ok(())
}

fn progress_spinner(quiet: bool) -> Result<ProgressBar> {
    if quiet || !std::io::stderr().is_terminal() {
        return Ok(ProgressBar::hidden());
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")?);
    spinner.set_message("正在扫描...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}
