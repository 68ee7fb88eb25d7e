use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::size_report::IncompleteReason;
use crate::models::{ModuleCount, RunStatus, SizeReport};

/// 报告格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStyle {
    /// 表格格式
    #[default]
    Table,
    /// 文本条形图
    Bars,
    /// JSON 格式
    Json,
    /// Mermaid 饼图
    Mermaid,
}

/// 条形图宽度（字符数）
const BAR_WIDTH: u64 = 40;

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(rename = "grandTotal")]
    grand_total: u64,
    complete: bool,
    modules: Vec<JsonModule<'a>>,
}

#[derive(Serialize)]
struct JsonModule<'a> {
    module: &'a str,
    lines: u64,
    percentage: f64,
    #[serde(rename = "skippedFiles")]
    skipped_files: usize,
    failed: bool,
}

/// 报告渲染器 - 纯函数，不修改报告
pub struct ReportFormatter;

impl ReportFormatter {
    pub fn format(report: &SizeReport, style: ReportStyle) -> Result<String> {
        let content = match style {
            ReportStyle::Table => Self::table(report),
            ReportStyle::Bars => Self::bars(report),
            ReportStyle::Json => Self::json(report)?,
            ReportStyle::Mermaid => Self::mermaid(report),
        };
        Ok(content)
    }

    /// 渲染并写入文件
    pub fn save_to_file(report: &SizeReport, style: ReportStyle, target: &Path) -> Result<()> {
        let content = Self::format(report, style)?;
        std::fs::write(target, content)
            .with_context(|| format!("无法写入报告 `{}`", target.display()))
    }

    fn table(report: &SizeReport) -> String {
        let rows: Vec<[String; 5]> = report
            .module_counts
            .iter()
            .map(|m| {
                [
                    m.name().to_string(),
                    m.total_lines.to_string(),
                    format!("{}%", format_tenths(report.percentage_tenths(m))),
                    m.file_count().to_string(),
                    notes(m),
                ]
            })
            .collect();

        let total_share = if report.grand_total == 0 { "0.0%" } else { "100.0%" };
        let footer = [
            "Total".to_string(),
            report.grand_total.to_string(),
            total_share.to_string(),
            report.total_files().to_string(),
            String::new(),
        ];
        let header = ["Module", "Lines", "Share", "Files", "Notes"].map(String::from);

        let mut widths = [0usize; 4];
        for row in std::iter::once(&header).chain(rows.iter()).chain(std::iter::once(&footer)) {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let render = |row: &[String; 5]| {
            let line = format!(
                "{:<w0$}  {:>w1$}  {:>w2$}  {:>w3$}  {}",
                row[0],
                row[1],
                row[2],
                row[3],
                row[4],
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2],
                w3 = widths[3],
            );
            line.trim_end().to_string()
        };

        let mut out = Vec::with_capacity(rows.len() + 4);
        out.push(render(&header));
        let rule_width = widths.iter().sum::<usize>() + 6;
        out.push("-".repeat(rule_width));
        out.extend(rows.iter().map(render));
        out.push("-".repeat(rule_width));
        out.push(render(&footer));
        if let Some(line) = status_line(report.status) {
            out.push(line);
        }
        out.join("\n")
    }

    fn bars(report: &SizeReport) -> String {
        let name_width = report
            .module_counts
            .iter()
            .map(|m| m.name().chars().count())
            .max()
            .unwrap_or(0);

        let mut out: Vec<String> = report
            .module_counts
            .iter()
            .map(|m| {
                let filled = bar_length(m.total_lines, report.grand_total) as usize;
                let bar = format!(
                    "{}{}",
                    "█".repeat(filled),
                    " ".repeat(BAR_WIDTH as usize - filled)
                );
                let line = format!(
                    "{:<width$} |{}| {:>6}% {}",
                    m.name(),
                    bar,
                    format_tenths(report.percentage_tenths(m)),
                    notes(m),
                    width = name_width
                );
                line.trim_end().to_string()
            })
            .collect();

        if let Some(line) = status_line(report.status) {
            out.push(line);
        }
        out.join("\n")
    }

    fn json(report: &SizeReport) -> Result<String> {
        let dto = JsonReport {
            grand_total: report.grand_total,
            complete: report.status.is_complete(),
            modules: report
                .module_counts
                .iter()
                .map(|m| JsonModule {
                    module: m.name(),
                    lines: m.total_lines,
                    percentage: report.percentage(m),
                    skipped_files: m.skipped_files,
                    failed: m.failed,
                })
                .collect(),
        };
        serde_json::to_string_pretty(&dto).context("无法序列化报告")
    }

    fn mermaid(report: &SizeReport) -> String {
        let mut modules: Vec<&ModuleCount> = report.module_counts.iter().collect();
        modules.sort_by(|a, b| a.name().cmp(b.name()));

        let mut out = vec![format!(
            "pie showData title Modules size (Total LOC: {})",
            report.grand_total
        )];
        out.extend(
            modules
                .iter()
                .map(|m| format!("    \"{}\" : {}", m.name(), m.total_lines)),
        );
        out.join("\n")
    }
}

/// 十分位整数转为一位小数文本
fn format_tenths(tenths: u64) -> String {
    format!("{}.{}", tenths / 10, tenths % 10)
}

/// 条形长度，四舍五入
fn bar_length(lines: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let (lines, total) = (lines as u128, total as u128);
    ((lines * BAR_WIDTH as u128 * 2 + total) / (2 * total)) as u64
}

fn notes(module: &ModuleCount) -> String {
    if module.failed {
        "失败: 无法读取模块根目录".to_string()
    } else if module.skipped_files > 0 {
        format!("跳过 {} 个", module.skipped_files)
    } else {
        String::new()
    }
}

fn status_line(status: RunStatus) -> Option<String> {
    match status {
        RunStatus::Complete => None,
        RunStatus::Incomplete(IncompleteReason::Cancelled) => {
            Some("报告不完整: 扫描已取消".to_string())
        }
        RunStatus::Incomplete(IncompleteReason::TimedOut) => {
            Some("报告不完整: 扫描超时".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileCount, Module};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn module_count(name: &str, lines: &[u64], skipped: usize) -> ModuleCount {
        let files = lines
            .iter()
            .enumerate()
            .map(|(i, &line_count)| FileCount {
                path: PathBuf::from(format!("/p/{}/{}.rs", name, i)),
                module: name.to_string(),
                line_count,
            })
            .collect();
        ModuleCount::new(Module::new(name, format!("/p/{}", name)), files, skipped)
    }

    fn sample() -> SizeReport {
        SizeReport::new(
            vec![module_count("util", &[7], 1), module_count("core", &[10, 0, 5], 0)],
            RunStatus::Complete,
        )
    }

    #[test]
    fn test_table() {
        let table = ReportFormatter::format(&sample(), ReportStyle::Table).unwrap();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Module  Lines   Share  Files  Notes");
        assert_eq!(lines[2], "core       15   68.2%      3");
        assert_eq!(lines[3], "util        7   31.8%      1  跳过 1 个");
        assert_eq!(lines[5], "Total      22  100.0%      4");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_table_marks_incomplete() {
        let report = SizeReport::new(
            vec![module_count("a", &[], 0)],
            RunStatus::Incomplete(IncompleteReason::TimedOut),
        );
        let table = ReportFormatter::format(&report, ReportStyle::Table).unwrap();
        assert!(table.contains("0.0%"));
        assert!(table.ends_with("报告不完整: 扫描超时"));
    }

    #[test]
    fn test_json_contract() {
        let json = ReportFormatter::format(&sample(), ReportStyle::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["grandTotal"], 22);
        assert_eq!(value["complete"], true);
        assert_eq!(value["modules"][0]["module"], "core");
        assert_eq!(value["modules"][0]["lines"], 15);
        assert_eq!(value["modules"][0]["percentage"], 68.2);
        assert_eq!(value["modules"][1]["module"], "util");
        assert_eq!(value["modules"][1]["percentage"], 31.8);
        assert_eq!(value["modules"][1]["skippedFiles"], 1);
        assert_eq!(value["modules"][1]["failed"], false);
    }

    #[test]
    fn test_bars() {
        let bars = ReportFormatter::format(&sample(), ReportStyle::Bars).unwrap();
        let lines: Vec<&str> = bars.lines().collect();
        assert_eq!(lines.len(), 2);
        // 68.2% of 40 -> 27
        assert_eq!(lines[0].matches('█').count(), 27);
        assert_eq!(lines[1].matches('█').count(), 13);
        assert!(lines[0].ends_with("68.2%"));
        assert!(lines[1].ends_with("31.8% 跳过 1 个"));
    }

    #[test]
    fn test_mermaid_sorted_by_name() {
        let chart = ReportFormatter::format(&sample(), ReportStyle::Mermaid).unwrap();
        let expected = "pie showData title Modules size (Total LOC: 22)\n    \"core\" : 15\n    \"util\" : 7";
        assert_eq!(chart, expected);
    }

    #[test]
    fn test_save_to_file() {
        let temp_dir = tempdir().unwrap();
        let target = temp_dir.path().join("chart.mermaid");
        ReportFormatter::save_to_file(&sample(), ReportStyle::Mermaid, &target).unwrap();
        let saved = std::fs::read_to_string(&target).unwrap();
        assert!(saved.starts_with("pie showData title Modules size (Total LOC: 22)"));

        let error = ReportFormatter::save_to_file(&sample(), ReportStyle::Mermaid, temp_dir.path())
            .unwrap_err();
        assert!(error.to_string().starts_with("无法写入报告 "));
    }
}
