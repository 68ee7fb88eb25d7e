use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

use crate::models::Module;

/// 单个文件的计数结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCount {
    /// 文件路径
    pub path: PathBuf,

    /// 所属模块名称
    pub module: String,

    /// 可计数的行数
    pub line_count: u64,
}

/// 单个模块的汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCount {
    pub module: Module,

    /// 总行数，等于 `file_counts` 行数之和
    pub total_lines: u64,

    /// 按遍历顺序排列的文件计数
    pub file_counts: Vec<FileCount>,

    /// 因读取或解码失败而跳过的条目数
    pub skipped_files: usize,

    /// 模块根目录本身无法读取
    pub failed: bool,

    /// 收集未归属任何模块的文件
    #[serde(default)]
    pub undefined: bool,
}

impl ModuleCount {
    /// 由文件计数构建，总行数在此处求和
    pub fn new(module: Module, file_counts: Vec<FileCount>, skipped_files: usize) -> Self {
        let total_lines = file_counts.iter().map(|f| f.line_count).sum();
        Self {
            module,
            total_lines,
            file_counts,
            skipped_files,
            failed: false,
            undefined: false,
        }
    }

    /// 标记为未归属文件的模块
    pub fn into_undefined(mut self) -> Self {
        self.undefined = true;
        self
    }

    /// 根目录无法读取的模块
    pub fn failed(module: Module) -> Self {
        Self {
            module,
            total_lines: 0,
            file_counts: Vec::new(),
            skipped_files: 0,
            failed: true,
            undefined: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.module.name
    }

    /// 参与计数的文件数量
    pub fn file_count(&self) -> usize {
        self.file_counts.len()
    }

    /// 是否有文件被跳过或模块失败
    pub fn has_errors(&self) -> bool {
        self.failed || self.skipped_files > 0
    }
}

/// 报告未完成的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IncompleteReason {
    /// 调用方取消
    Cancelled,
    /// 运行超时
    TimedOut,
}

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Complete,
    Incomplete(IncompleteReason),
}

impl RunStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, RunStatus::Complete)
    }
}

/// 一次运行的模块大小报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeReport {
    /// 按总行数降序、名称升序排列
    pub module_counts: Vec<ModuleCount>,

    /// 所有模块行数之和
    pub grand_total: u64,

    pub status: RunStatus,
}

impl SizeReport {
    /// 排序并计算总数
    pub fn new(mut module_counts: Vec<ModuleCount>, status: RunStatus) -> Self {
        module_counts.sort_by(Self::rank);
        let grand_total = module_counts.iter().map(|m| m.total_lines).sum();
        Self {
            module_counts,
            grand_total,
            status,
        }
    }

    fn rank(a: &ModuleCount, b: &ModuleCount) -> Ordering {
        b.total_lines
            .cmp(&a.total_lines)
            .then_with(|| a.module.name.cmp(&b.module.name))
    }

    /// 所有模块中参与计数的文件总数
    pub fn total_files(&self) -> usize {
        self.module_counts.iter().map(|m| m.file_count()).sum()
    }

    /// 所有模块中跳过的条目总数
    pub fn total_skipped(&self) -> usize {
        self.module_counts.iter().map(|m| m.skipped_files).sum()
    }

    pub fn module(&self, name: &str) -> Option<&ModuleCount> {
        self.module_counts.iter().find(|m| m.module.name == name)
    }

    /// 未归属文件的模块，没有这类文件时为 `None`
    pub fn undefined_module(&self) -> Option<&ModuleCount> {
        self.module_counts.iter().find(|m| m.undefined)
    }

    /// 显式定义的模块
    pub fn defined_modules(&self) -> impl Iterator<Item = &ModuleCount> {
        self.module_counts.iter().filter(|m| !m.undefined)
    }

    /// 模块相对大小，范围 0..=1；总数为 0 时为 0
    pub fn relative_size(&self, module: &ModuleCount) -> f64 {
        if self.grand_total == 0 {
            0.0
        } else {
            module.total_lines as f64 / self.grand_total as f64
        }
    }

    /// 百分比的十分位整数值，四舍五入（half-up）
    ///
    /// 使用整数运算，保证输出可复现。
    pub fn percentage_tenths(&self, module: &ModuleCount) -> u64 {
        if self.grand_total == 0 {
            return 0;
        }
        let lines = module.total_lines as u128;
        let total = self.grand_total as u128;
        ((lines * 2000 + total) / (2 * total)) as u64
    }

    /// 保留一位小数的百分比
    pub fn percentage(&self, module: &ModuleCount) -> f64 {
        self.percentage_tenths(module) as f64 / 10.0
    }
}
