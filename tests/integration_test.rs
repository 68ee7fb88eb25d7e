use std::fs;
use std::path::Path;
use tempfile::tempdir;

use module_size_cli::config::{Config, LineCountPolicy};
use module_size_cli::models::{ModuleSpec, PartitionStrategy, RunStatus};
use module_size_cli::report::{ReportFormatter, ReportStyle};
use module_size_cli::scanner::{FileLineCounter, SizeCalculator};
use module_size_cli::SizeReport;

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn lines(count: usize) -> String {
    (0..count).map(|i| format!("statement_{};\n", i)).collect()
}

async fn scan(root: &Path, strategy: &PartitionStrategy, policy: &LineCountPolicy) -> SizeReport {
    SizeCalculator::default()
        .with_workers(4)
        .analyze(root, strategy, policy)
        .await
        .unwrap()
}

fn assert_grand_total_is_sum_of_files(report: &SizeReport) {
    let file_sum: u64 = report
        .module_counts
        .iter()
        .flat_map(|m| m.file_counts.iter())
        .map(|f| f.line_count)
        .sum();
    let module_sum: u64 = report.module_counts.iter().map(|m| m.total_lines).sum();
    assert_eq!(report.grand_total, file_sum);
    assert_eq!(report.grand_total, module_sum);
}

#[tokio::test]
async fn test_two_modules_with_percentages() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_file(&root.join("core/src/a.rs"), &lines(10));
    write_file(&root.join("core/src/empty.rs"), "");
    write_file(&root.join("core/b.rs"), &lines(5));
    write_file(&root.join("util/lib.rs"), &lines(7));

    let report = scan(root, &PartitionStrategy::Subdirectories, &LineCountPolicy::default()).await;

    assert_eq!(report.status, RunStatus::Complete);
    assert_eq!(report.grand_total, 22);
    assert_grand_total_is_sum_of_files(&report);

    let core = &report.module_counts[0];
    let util = &report.module_counts[1];
    assert_eq!((core.name(), core.total_lines, core.file_count()), ("core", 15, 3));
    assert_eq!((util.name(), util.total_lines, util.file_count()), ("util", 7, 1));
    assert_eq!(report.percentage(core), 68.2);
    assert_eq!(report.percentage(util), 31.8);

    let json: serde_json::Value =
        serde_json::from_str(&ReportFormatter::format(&report, ReportStyle::Json).unwrap()).unwrap();
    assert_eq!(json["grandTotal"], 22);
    assert_eq!(json["modules"][0]["module"], "core");
    assert_eq!(json["modules"][0]["lines"], 15);
    assert_eq!(json["modules"][0]["percentage"], 68.2);
}

#[test]
fn test_blank_lines_policy() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("notes.txt");
    fs::write(&path, "a\nb\n\nc\nd\n   \ne\nf\n\ng\n").unwrap();

    let skip_blank = LineCountPolicy::default();
    assert_eq!(FileLineCounter::count(&path, &skip_blank).unwrap(), 7);
    // 同一文件重复计数结果一致
    assert_eq!(FileLineCounter::count(&path, &skip_blank).unwrap(), 7);

    let count_blank = LineCountPolicy {
        count_blank_lines: true,
        ..LineCountPolicy::default()
    };
    assert_eq!(FileLineCounter::count(&path, &count_blank).unwrap(), 10);
}

#[tokio::test]
async fn test_undecodable_file_is_skipped() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_file(&root.join("core/a.txt"), &lines(4));
    write_file(&root.join("core/b.txt"), &lines(6));
    fs::write(root.join("core/image.txt"), [0xffu8, 0xfe, 0x00, 0x01]).unwrap();

    let report = scan(root, &PartitionStrategy::Subdirectories, &LineCountPolicy::default()).await;

    let core = report.module("core").unwrap();
    assert_eq!(core.total_lines, 10);
    assert_eq!(core.skipped_files, 1);
    assert!(!core.failed);
    assert_grand_total_is_sum_of_files(&report);
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_file_is_skipped() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_file(&root.join("core/a.txt"), &lines(4));
    write_file(&root.join("core/b.txt"), &lines(6));
    std::os::unix::fs::symlink(root.join("core/missing.txt"), root.join("core/broken.txt"))
        .unwrap();

    let report = scan(root, &PartitionStrategy::Subdirectories, &LineCountPolicy::default()).await;

    let core = report.module("core").unwrap();
    assert_eq!(core.total_lines, 10);
    assert_eq!(core.skipped_files, 1);
    assert!(!core.failed);
    assert_eq!(report.status, RunStatus::Complete);
}

#[tokio::test]
async fn test_excluded_extension_is_not_counted() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_file(&root.join("docs/guide.md"), &lines(50));
    write_file(&root.join("docs/notes.txt"), &lines(5));
    // 被排除的文件即使无法解码也不会被打开
    fs::write(root.join("docs/broken.md"), [0u8, 0xff]).unwrap();

    let policy = LineCountPolicy::default().exclude([".md"]);
    let report = scan(root, &PartitionStrategy::Subdirectories, &policy).await;

    let docs = report.module("docs").unwrap();
    assert_eq!(docs.total_lines, 5);
    assert_eq!(docs.file_count(), 1);
    assert_eq!(docs.skipped_files, 0);
}

#[tokio::test]
async fn test_empty_modules_sort_by_name() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_file(&root.join("b/empty.txt"), "\n\n");
    fs::create_dir_all(root.join("a")).unwrap();

    let report = scan(root, &PartitionStrategy::Subdirectories, &LineCountPolicy::default()).await;

    assert_eq!(report.grand_total, 0);
    let names: Vec<_> = report.module_counts.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["a", "b"]);
    for module in &report.module_counts {
        assert_eq!(module.total_lines, 0);
        assert_eq!(report.percentage(module), 0.0);
    }

    let table = ReportFormatter::format(&report, ReportStyle::Table).unwrap();
    assert!(table.contains("0.0%"));
    assert!(report.verify_no_empty_modules().is_err());
}

#[tokio::test]
async fn test_package_modules_with_verification_and_mermaid() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_file(&root.join("pl/tfij/orders/Order.java"), &lines(6));
    write_file(&root.join("pl/tfij/orders/OrderService.java"), &lines(3));
    write_file(&root.join("pl/tfij/users/User.java"), &lines(1));

    let strategy = PartitionStrategy::explicit(vec![
        ModuleSpec::package("pl.tfij.orders"),
        ModuleSpec::package("pl.tfij.users"),
    ]);
    let report = scan(root, &strategy, &LineCountPolicy::default()).await;

    assert_eq!(report.grand_total, 10);
    assert!(report
        .verify_no_empty_modules()
        .and_then(|r| r.verify_module_relative_size_below("pl.tfij.users", 0.1))
        .is_ok());
    let error = report.verify_each_module_relative_size_below(0.8).unwrap_err();
    assert_eq!(
        error.to_string(),
        "Module `pl.tfij.orders` relative size is 0.9. Max allowed size is 0.8."
    );

    let target = temp_dir.path().join("modules.mermaid");
    ReportFormatter::save_to_file(&report, ReportStyle::Mermaid, &target).unwrap();
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "pie showData title Modules size (Total LOC: 10)\n    \"pl.tfij.orders\" : 9\n    \"pl.tfij.users\" : 1"
    );
}

#[tokio::test]
async fn test_config_file_drives_scan() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path().join("project");
    write_file(&root.join("app/main.py"), "# entry point\n\nprint('hi')\n");
    write_file(&root.join("app/generated/schema.py"), &lines(40));
    write_file(&root.join("lib/util.py"), "def f():\n    return 1\n");

    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!(
            r#"
root = "{}"

[modules]
strategy = "explicit"
entries = [{{ name = "app" }}, {{ name = "library", path = "lib" }}]

[policy]
exclude_paths = ["**/generated/**"]
"#,
            root.display()
        ),
    )
    .unwrap();

    let config = Config::load_from_file(&config_path).unwrap();
    let report = SizeCalculator::new(&config.scan)
        .analyze(&config.root, &config.modules, &config.policy)
        .await
        .unwrap();

    assert_eq!(report.module("app").unwrap().total_lines, 1);
    assert_eq!(report.module("library").unwrap().total_lines, 2);
    assert_grand_total_is_sum_of_files(&report);
}

#[tokio::test]
async fn test_duplicate_module_names_are_rejected() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_file(&root.join("x/a.txt"), &lines(1));
    write_file(&root.join("y/a.txt"), &lines(1));

    let strategy = PartitionStrategy::explicit(vec![
        ModuleSpec::new("same", "x"),
        ModuleSpec::new("same", "y"),
    ]);
    let result = SizeCalculator::default()
        .analyze(root, &strategy, &LineCountPolicy::default())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_files_outside_modules_go_to_undefined() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_file(&root.join("pl/tfij/orders/Order.java"), &lines(2));
    write_file(&root.join("pl/tfij/misc/Other.java"), &lines(8));

    let strategy = PartitionStrategy::Explicit {
        entries: vec![ModuleSpec::package("pl.tfij.orders")],
        include_undefined: true,
    };
    let report = scan(root, &strategy, &LineCountPolicy::default()).await;

    assert_eq!(report.grand_total, 10);
    assert_grand_total_is_sum_of_files(&report);
    let undefined = report.undefined_module().unwrap();
    assert_eq!(undefined.name(), "undefined");
    assert_eq!(undefined.total_lines, 8);
    let orders = report.module("pl.tfij.orders").unwrap();
    assert_eq!(report.relative_size(orders), 0.2);

    assert!(report.verify_each_module_relative_size_below(0.8).is_ok());
    assert!(report.verify_undefined_module_file_count_below(1).is_ok());
    let error = report.verify_undefined_module_file_count_below(0).unwrap_err();
    assert_eq!(
        error.to_string(),
        "Number of files in undefined module is 1. Max allowed count is 0."
    );

    assert_eq!(
        ReportFormatter::format(&report, ReportStyle::Mermaid).unwrap(),
        "pie showData title Modules size (Total LOC: 10)\n    \"pl.tfij.orders\" : 2\n    \"undefined\" : 8"
    );

    // 不打开时未归属的文件不参与统计
    let without = scan(
        root,
        &PartitionStrategy::explicit(vec![ModuleSpec::package("pl.tfij.orders")]),
        &LineCountPolicy::default(),
    )
    .await;
    assert_eq!(without.grand_total, 2);
    assert!(without.undefined_module().is_none());
}
