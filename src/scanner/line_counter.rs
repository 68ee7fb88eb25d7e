use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::LineCountPolicy;
use crate::error::CountError;
use crate::scanner::file_filter::extension_of;
use crate::scanner::CommentSyntax;

/// 行计数器 - 按规则统计单个文件的可计数行
pub struct FileLineCounter;

impl FileLineCounter {
    /// 统计文件中的可计数行
    pub fn count(path: &Path, policy: &LineCountPolicy) -> Result<u64, CountError> {
        let file = File::open(path).map_err(|source| CountError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::count_reader(BufReader::new(file), path, &extension_of(path), policy)
    }

    /// 从任意读取器统计，`path` 只用于错误信息
    pub fn count_reader<R: BufRead>(
        mut reader: R,
        path: &Path,
        extension: &str,
        policy: &LineCountPolicy,
    ) -> Result<u64, CountError> {
        let syntax = if policy.count_comments {
            None
        } else {
            CommentSyntax::for_extension(extension)
        };

        let mut chunk = Vec::new();
        let mut line_number = 0usize;
        let mut in_block = false;
        let mut count = 0u64;

        loop {
            chunk.clear();
            let read = reader
                .read_until(b'\n', &mut chunk)
                .map_err(|source| CountError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            if read == 0 {
                break;
            }

            // `read_until` 只按 `\n` 切分，块内剩余的 `\r` 也是行结束符
            for raw in split_terminated(&chunk) {
                line_number += 1;
                if raw.contains(&0) {
                    return Err(CountError::Encoding {
                        path: path.to_path_buf(),
                        line: line_number,
                    });
                }
                let mut line = std::str::from_utf8(raw).map_err(|_| CountError::Encoding {
                    path: path.to_path_buf(),
                    line: line_number,
                })?;
                if line_number == 1 {
                    line = line.trim_start_matches('\u{feff}');
                }

                if is_countable(line, syntax.as_ref(), &mut in_block, policy) {
                    count += 1;
                }
            }
        }

        Ok(count)
    }
}

/// 去掉结尾的 `\r\n`、`\n` 或 `\r`，再按内部的 `\r` 切分
fn split_terminated(chunk: &[u8]) -> impl Iterator<Item = &[u8]> {
    let body = chunk
        .strip_suffix(b"\r\n")
        .or_else(|| chunk.strip_suffix(b"\n"))
        .or_else(|| chunk.strip_suffix(b"\r"))
        .unwrap_or(chunk);
    body.split(|&b| b == b'\r')
}

fn is_countable(
    line: &str,
    syntax: Option<&CommentSyntax>,
    in_block: &mut bool,
    policy: &LineCountPolicy,
) -> bool {
    match syntax {
        Some(syntax) => {
            let starts_in_block = *in_block;
            let has_code = syntax.line_has_code(line, in_block);
            if has_code {
                true
            } else if line.trim().is_empty() && !starts_in_block {
                policy.count_blank_lines
            } else {
                false
            }
        }
        None => policy.count_blank_lines || !line.trim().is_empty(),
    }
}
