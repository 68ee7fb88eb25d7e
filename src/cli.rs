use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use module_size_cli::config::{normalize_extension, Config};
use module_size_cli::models::{ModuleSpec, PartitionStrategy};
use module_size_cli::report::ReportStyle;

#[derive(Parser)]
#[command(name = "module-size")]
#[command(about = "统计项目各模块的代码行数及其占比")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 详细输出
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 只输出警告和错误
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 统计各模块的代码行数
    Scan(ScanArgs),

    /// 管理配置
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub struct ScanArgs {
    /// 项目根目录（默认使用配置中的 root，否则为当前目录）
    pub root: Option<PathBuf>,

    /// 显式模块，格式为 NAME=PATH 或 PATH
    #[arg(short, long = "module", value_name = "NAME=PATH")]
    pub modules: Vec<String>,

    /// 按包名定义模块，如 pl.tfij.orders
    #[arg(short, long = "package", value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// 每个直接子目录作为一个模块
    #[arg(long, conflicts_with_all = ["modules", "packages", "whole_root"])]
    pub subdirs: bool,

    /// 整个根目录作为单个模块
    #[arg(long, conflicts_with_all = ["modules", "packages"])]
    pub whole_root: bool,

    /// 只统计这些扩展名
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// 排除这些扩展名
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// 排除匹配 glob 的路径（相对于项目根目录）
    #[arg(long, value_name = "GLOB")]
    pub exclude_path: Vec<String>,

    /// 排除匹配正则的路径（相对于项目根目录）
    #[arg(long, value_name = "REGEX")]
    pub exclude_pattern: Vec<String>,

    /// 计入空行
    #[arg(long)]
    pub count_blank: bool,

    /// 计入注释行
    #[arg(long)]
    pub count_comments: bool,

    /// 输出格式
    #[arg(short, long, value_enum)]
    pub format: Option<ReportStyle>,

    /// 保存结果到文件
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 并发计数的 worker 数
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// 运行超时（秒）
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// 任一模块的占比上限，范围 (0, 1]
    #[arg(long, value_name = "SHARE")]
    pub max_share: Option<f64>,

    /// 指定模块的占比上限
    #[arg(long, value_name = "NAME=SHARE", value_parser = parse_module_share)]
    pub max_module_share: Vec<(String, f64)>,

    /// 要求每个模块至少包含一个文件
    #[arg(long)]
    pub require_non_empty: bool,

    /// 把不属于任何模块的文件计入 `undefined` 模块
    #[arg(long)]
    pub include_undefined: bool,

    /// `undefined` 模块允许的最大文件数
    #[arg(long, value_name = "COUNT", allow_negative_numbers = true)]
    pub max_undefined_files: Option<i64>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// 显示当前生效的配置
    Show,

    /// 写入默认配置文件
    Init {
        /// 目标路径（默认为用户配置目录）
        path: Option<PathBuf>,

        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

impl ScanArgs {
    /// 命令行参数覆盖配置文件中的值
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if config.root.as_os_str().is_empty() {
            config.root = PathBuf::from(".");
        }

        if self.subdirs {
            config.modules = PartitionStrategy::Subdirectories;
        } else if self.whole_root {
            config.modules = PartitionStrategy::WholeRoot { name: None };
        } else if !self.modules.is_empty() || !self.packages.is_empty() {
            let mut entries = self
                .modules
                .iter()
                .map(|value| parse_module(value))
                .collect::<Result<Vec<_>>>()?;
            entries.extend(self.packages.iter().map(ModuleSpec::package));
            config.modules = PartitionStrategy::explicit(entries);
        }

        let policy = &mut config.policy;
        policy
            .include_extensions
            .extend(self.include.iter().map(|e| normalize_extension(e)));
        policy
            .exclude_extensions
            .extend(self.exclude.iter().map(|e| normalize_extension(e)));
        policy.exclude_paths.extend(self.exclude_path.iter().cloned());
        policy.exclude_patterns.extend(self.exclude_pattern.iter().cloned());
        policy.count_blank_lines |= self.count_blank;
        policy.count_comments |= self.count_comments;

        if let Some(workers) = self.workers {
            config.scan.workers = workers;
        }
        if self.timeout.is_some() {
            config.scan.timeout_secs = self.timeout;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        Ok(())
    }
}

fn parse_module(value: &str) -> Result<ModuleSpec> {
    match value.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok(ModuleSpec::new(name, path))
        }
        Some(_) => Err(anyhow!("无效的模块 `{}`，应为 NAME=PATH", value)),
        None if value.is_empty() => Err(anyhow!("模块路径不能为空")),
        None => Ok(ModuleSpec::dir(value)),
    }
}

fn parse_module_share(value: &str) -> std::result::Result<(String, f64), String> {
    let (name, share) = value
        .split_once('=')
        .ok_or_else(|| format!("应为 NAME=SHARE，实际为 `{}`", value))?;
    let share: f64 = share
        .parse()
        .map_err(|_| format!("`{}` 不是数字", share))?;
    Ok((name.to_string(), share))
}
