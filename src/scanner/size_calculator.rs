use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::config::{LineCountPolicy, ScanConfig};
use crate::error::{ConfigError, CountError};
use crate::models::size_report::IncompleteReason;
use crate::models::{
    FileCount, Module, ModuleCount, PartitionStrategy, RunStatus, SizeReport, UNDEFINED_MODULE,
};
use crate::scanner::module_resolver::validate_modules;
use crate::scanner::{
    DirectoryRules, FileFilter, FileLineCounter, ModuleResolver, TreeWalker, WalkEvent,
};
use crate::utils::format_duration;

/// 计数进度快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    /// 最近完成计数的文件所属模块
    pub module: String,

    /// 已完成计数的文件总数
    pub files_counted: usize,

    /// 已跳过的条目总数
    pub files_skipped: usize,
}

pub type ProgressCallback = Arc<dyn Fn(ScanProgress) + Send + Sync>;

/// 模块大小计算器
///
/// 遍历在阻塞线程上惰性进行，文件计数由有界的 worker 池并发完成，
/// 结果通过 channel 交给唯一的汇总循环，每个模块一个累加器。
pub struct SizeCalculator {
    /// 目录剪枝规则
    rules: DirectoryRules,

    /// 最大并发计数任务数
    workers: usize,

    /// 运行超时
    timeout: Option<Duration>,

    /// 取消后等待进行中任务的时间
    cancel_grace: Duration,

    /// 调用方的取消令牌
    cancel_token: CancellationToken,

    /// 进度回调
    progress: Option<ProgressCallback>,

    /// 遍历队列大小
    queue_size: usize,

    /// 是否统计未归属任何模块的文件
    include_undefined: bool,
}

/// 遍历线程发给分发循环的条目
enum WalkItem {
    File {
        module: usize,
        ordinal: usize,
        path: PathBuf,
    },
    Skipped {
        module: usize,
        path: PathBuf,
        error: String,
    },
    RootUnreadable {
        module: usize,
        error: String,
    },
}

/// worker 返回的单个文件结果
struct CountOutcome {
    module: usize,
    ordinal: usize,
    path: PathBuf,
    result: Result<u64, CountError>,
}

/// 一个模块的遍历起点，跳过其中属于其他模块的子树
struct WalkTarget {
    root: PathBuf,
    skipped_dirs: Vec<PathBuf>,
}

/// 单个模块的累加器，只由汇总循环持有
#[derive(Default)]
struct ModuleAccumulator {
    files: Vec<(usize, FileCount)>,
    skipped: usize,
    failed: bool,
}

impl ModuleAccumulator {
    fn finish(mut self, module: Module) -> ModuleCount {
        if self.failed {
            return ModuleCount::failed(module);
        }
        // 恢复遍历顺序，与完成顺序无关
        self.files.sort_by_key(|(ordinal, _)| *ordinal);
        let files = self.files.into_iter().map(|(_, file)| file).collect();
        ModuleCount::new(module, files, self.skipped)
    }
}

struct Aggregator<'a> {
    modules: &'a [Module],
    accumulators: Vec<ModuleAccumulator>,
    counted: usize,
    skipped: usize,
    progress: Option<&'a ProgressCallback>,
}

impl<'a> Aggregator<'a> {
    fn new(modules: &'a [Module], progress: Option<&'a ProgressCallback>) -> Self {
        Self {
            modules,
            accumulators: modules.iter().map(|_| ModuleAccumulator::default()).collect(),
            counted: 0,
            skipped: 0,
            progress,
        }
    }

    fn apply(&mut self, outcome: CountOutcome) {
        let module = &self.modules[outcome.module];
        match outcome.result {
            Ok(line_count) => {
                self.accumulators[outcome.module].files.push((
                    outcome.ordinal,
                    FileCount {
                        path: outcome.path,
                        module: module.name.clone(),
                        line_count,
                    },
                ));
                self.counted += 1;
            }
            Err(err) => {
                tracing::warn!("跳过模块 `{}` 中的文件: {}", module.name, err);
                self.accumulators[outcome.module].skipped += 1;
                self.skipped += 1;
            }
        }
        self.report(outcome.module);
    }

    fn skip(&mut self, index: usize, path: &Path, error: &str) {
        tracing::warn!(
            "跳过 `{}`（模块 `{}`）: {}",
            path.display(),
            self.modules[index].name,
            error
        );
        self.accumulators[index].skipped += 1;
        self.skipped += 1;
        self.report(index);
    }

    fn fail(&mut self, index: usize, error: &str) {
        tracing::warn!("无法读取模块 `{}` 的根目录: {}", self.modules[index].name, error);
        self.accumulators[index].failed = true;
    }

    fn report(&self, index: usize) {
        if let Some(progress) = self.progress {
            (progress.as_ref())(ScanProgress {
                module: self.modules[index].name.clone(),
                files_counted: self.counted,
                files_skipped: self.skipped,
            });
        }
    }

    fn finish(self, defined: usize) -> Vec<ModuleCount> {
        let mut counts: Vec<ModuleCount> = self
            .accumulators
            .into_iter()
            .zip(self.modules.iter().cloned())
            .map(|(accumulator, module)| accumulator.finish(module))
            .collect();

        // 未归属模块只在确实有文件时出现在报告中
        if counts.len() > defined {
            if let Some(undefined) = counts.pop() {
                if undefined.file_count() > 0 || undefined.skipped_files > 0 {
                    counts.push(undefined.into_undefined());
                }
            }
        }
        counts
    }
}

impl SizeCalculator {
    /// 使用扫描配置创建计算器
    pub fn new(scan: &ScanConfig) -> Self {
        Self {
            rules: DirectoryRules::from_scan(scan),
            workers: scan.workers.max(1),
            timeout: scan.timeout(),
            cancel_grace: scan.cancel_grace(),
            cancel_token: CancellationToken::new(),
            progress: None,
            queue_size: 1000,
            include_undefined: false,
        }
    }

    /// 使用外部取消令牌
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// 设置进度回调
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ScanProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// 设置运行超时
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// 设置并发数
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// 把项目根目录下不属于任何模块的文件计入 `undefined` 模块
    pub fn with_undefined_module(mut self, include: bool) -> Self {
        self.include_undefined = include;
        self
    }

    /// 取消令牌，调用 `cancel()` 停止分发新的计数任务
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 解析模块并计算报告
    pub async fn analyze(
        &self,
        project_root: &Path,
        strategy: &PartitionStrategy,
        policy: &LineCountPolicy,
    ) -> Result<SizeReport, ConfigError> {
        // 先构建过滤器，使无效的 glob/正则在解析前报告
        FileFilter::new(policy)?;
        let modules = ModuleResolver::new(self.rules.clone()).resolve(project_root, strategy)?;
        let root = project_root
            .canonicalize()
            .map_err(|_| ConfigError::InvalidProjectRoot(project_root.to_path_buf()))?;
        let include_undefined = self.include_undefined || strategy.includes_undefined();
        self.run(&root, &modules, policy, include_undefined).await
    }

    /// 计算各模块大小
    ///
    /// 配置错误在读取任何文件之前返回；单个文件或模块的失败只记录在报告中。
    pub async fn calculate(
        &self,
        project_root: &Path,
        modules: &[Module],
        policy: &LineCountPolicy,
    ) -> Result<SizeReport, ConfigError> {
        self.run(project_root, modules, policy, self.include_undefined)
            .await
    }

    async fn run(
        &self,
        project_root: &Path,
        modules: &[Module],
        policy: &LineCountPolicy,
        include_undefined: bool,
    ) -> Result<SizeReport, ConfigError> {
        validate_modules(project_root, modules)?;
        if include_undefined && modules.iter().any(|m| m.name == UNDEFINED_MODULE) {
            return Err(ConfigError::DuplicateModule(UNDEFINED_MODULE.to_string()));
        }
        let filter = FileFilter::new(policy)?;
        let walker = TreeWalker::new(project_root, filter, self.rules.clone());

        let mut targets: Vec<WalkTarget> = modules
            .iter()
            .map(|m| WalkTarget {
                root: m.root_path.clone(),
                skipped_dirs: Vec::new(),
            })
            .collect();
        let mut all_modules = modules.to_vec();
        if include_undefined {
            targets.push(WalkTarget {
                root: project_root.to_path_buf(),
                skipped_dirs: modules.iter().map(|m| m.root_path.clone()).collect(),
            });
            all_modules.push(Module::new(UNDEFINED_MODULE, project_root));
        }

        let started = Instant::now();
        let run_token = self.cancel_token.child_token();
        let timer = self.timeout.map(|timeout| {
            let token = run_token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => {
                        tracing::warn!("扫描超时（{}），停止分发新的计数任务", format_duration(timeout));
                        token.cancel();
                    }
                    _ = token.cancelled() => {}
                }
            })
        });

        let (walk_tx, mut walk_rx) = mpsc::channel(self.queue_size);
        let producer = {
            let token = run_token.clone();
            tokio::task::spawn_blocking(move || Self::walk_modules(&walker, &targets, &token, &walk_tx))
        };

        let (result_tx, mut result_rx) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let policy = Arc::new(policy.clone());
        let mut aggregator = Aggregator::new(&all_modules, self.progress.as_ref());

        // 分发循环：遍历结束或被取消时退出
        loop {
            tokio::select! {
                biased;
                _ = run_token.cancelled() => break,
                Some(outcome) = result_rx.recv() => aggregator.apply(outcome),
                item = walk_rx.recv() => match item {
                    None => break,
                    Some(WalkItem::File { module, ordinal, path }) => {
                        let permit = tokio::select! {
                            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                                Ok(permit) => permit,
                                Err(_) => break,
                            },
                            _ = run_token.cancelled() => break,
                        };
                        let tx = result_tx.clone();
                        let policy = Arc::clone(&policy);
                        tokio::spawn(async move {
                            let counted_path = path.clone();
                            let result = tokio::task::spawn_blocking(move || {
                                FileLineCounter::count(&counted_path, &policy)
                            })
                            .await
                            .unwrap_or_else(|err| {
                                Err(CountError::Io {
                                    path: path.clone(),
                                    source: std::io::Error::other(err.to_string()),
                                })
                            });
                            let _ = tx.send(CountOutcome { module, ordinal, path, result });
                            drop(permit);
                        });
                    }
                    Some(WalkItem::Skipped { module, path, error }) => {
                        aggregator.skip(module, &path, &error);
                    }
                    Some(WalkItem::RootUnreadable { module, error }) => {
                        aggregator.fail(module, &error);
                    }
                },
            }
        }

        // 关闭发送端，这样接收端知道何时结束
        drop(result_tx);
        drop(walk_rx);

        let cancelled = run_token.is_cancelled();
        if cancelled {
            // 不再等待遍历线程，进行中的任务最多等待一个宽限期
            let drained = tokio::time::timeout(self.cancel_grace, async {
                while let Some(outcome) = result_rx.recv().await {
                    aggregator.apply(outcome);
                }
            })
            .await;
            if drained.is_err() {
                tracing::warn!("宽限期已过，放弃仍在进行的文件计数");
            }
        } else {
            while let Some(outcome) = result_rx.recv().await {
                aggregator.apply(outcome);
            }
            if let Err(err) = producer.await {
                tracing::warn!("目录遍历异常结束: {}", err);
            }
        }

        if let Some(timer) = timer {
            timer.abort();
        }

        let status = if !cancelled {
            RunStatus::Complete
        } else if self.cancel_token.is_cancelled() {
            RunStatus::Incomplete(IncompleteReason::Cancelled)
        } else {
            RunStatus::Incomplete(IncompleteReason::TimedOut)
        };

        let report = SizeReport::new(aggregator.finish(modules.len()), status);
        tracing::info!(
            "统计完成: {} 个模块，{} 个文件，共 {} 行（跳过 {} 个），耗时 {}",
            report.module_counts.len(),
            report.total_files(),
            report.grand_total,
            report.total_skipped(),
            format_duration(started.elapsed())
        );

        Ok(report)
    }

    /// 在阻塞线程上按顺序遍历每个模块
    fn walk_modules(
        walker: &TreeWalker,
        targets: &[WalkTarget],
        token: &CancellationToken,
        tx: &mpsc::Sender<WalkItem>,
    ) {
        for (module, target) in targets.iter().enumerate() {
            let mut ordinal = 0usize;
            for event in walker.walk_excluding(&target.root, target.skipped_dirs.clone()) {
                if token.is_cancelled() {
                    return;
                }
                let item = match event {
                    WalkEvent::File(path) => {
                        ordinal += 1;
                        WalkItem::File {
                            module,
                            ordinal,
                            path,
                        }
                    }
                    WalkEvent::Skipped { path, error } => WalkItem::Skipped {
                        module,
                        path,
                        error,
                    },
                    WalkEvent::RootUnreadable(error) => WalkItem::RootUnreadable { module, error },
                };
                if tx.blocking_send(item).is_err() {
                    return; // 接收端已关闭
                }
            }
        }
    }
}

impl Default for SizeCalculator {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}
