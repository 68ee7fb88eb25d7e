use crate::error::{ConfigError, VerificationError};
use crate::models::SizeReport;

/// 模块大小约束校验，可链式调用
impl SizeReport {
    /// 每个显式定义的模块至少有一个参与计数的文件
    pub fn verify_no_empty_modules(&self) -> Result<&Self, VerificationError> {
        match self.defined_modules().find(|m| m.file_count() == 0) {
            Some(empty) => Err(VerificationError::EmptyModule(empty.name().to_string())),
            None => Ok(self),
        }
    }

    /// 每个模块的相对大小都不超过阈值，阈值范围 (0, 1]
    pub fn verify_each_module_relative_size_below(
        &self,
        threshold: f64,
    ) -> Result<&Self, VerificationError> {
        verify_threshold(threshold)?;

        let biggest = self
            .module_counts
            .iter()
            .max_by(|a, b| self.relative_size(a).total_cmp(&self.relative_size(b)));

        if let Some(module) = biggest {
            let size = self.relative_size(module);
            if size > threshold {
                return Err(VerificationError::RelativeSizeExceeded {
                    module: module.name().to_string(),
                    size: format_decimal(size),
                    threshold: format_decimal(threshold),
                });
            }
        }
        Ok(self)
    }

    /// 指定模块的相对大小不超过阈值
    pub fn verify_module_relative_size_below(
        &self,
        name: &str,
        threshold: f64,
    ) -> Result<&Self, VerificationError> {
        let module = self
            .defined_modules()
            .find(|m| m.name() == name)
            .ok_or_else(|| ConfigError::UnknownModule(name.to_string()))?;
        verify_threshold(threshold)?;

        let size = self.relative_size(module);
        if size > threshold {
            return Err(VerificationError::RelativeSizeExceeded {
                module: name.to_string(),
                size: format_decimal(size),
                threshold: format_decimal(threshold),
            });
        }
        Ok(self)
    }

    /// 未归属任何模块的文件数不超过 `allowed`，没有这类文件时总是通过
    pub fn verify_undefined_module_file_count_below(
        &self,
        allowed: i64,
    ) -> Result<&Self, VerificationError> {
        if allowed < 0 {
            return Err(ConfigError::InvalidFileCount(allowed).into());
        }
        if let Some(undefined) = self.undefined_module() {
            let count = undefined.file_count();
            if count as u64 > allowed as u64 {
                return Err(VerificationError::UndefinedFileCountExceeded { count, allowed });
            }
        }
        Ok(self)
    }
}

fn verify_threshold(threshold: f64) -> Result<(), ConfigError> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold(threshold))
    }
}

/// 最多四位小数，去掉末尾的零
fn format_decimal(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}
