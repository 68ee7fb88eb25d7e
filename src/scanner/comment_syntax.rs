/// 按扩展名的注释语法
///
/// 只做行级匹配，不解析字符串字面量。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    /// 单行注释前缀
    pub line: &'static [&'static str],

    /// 块注释 (开始, 结束)
    pub block: Option<(&'static str, &'static str)>,
}

const C_STYLE: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
};

const CSS: CommentSyntax = CommentSyntax {
    line: &[],
    block: Some(("/*", "*/")),
};

const HASH: CommentSyntax = CommentSyntax {
    line: &["#"],
    block: None,
};

const PYTHON: CommentSyntax = CommentSyntax {
    line: &["#"],
    block: Some(("\"\"\"", "\"\"\"")),
};

const SQL: CommentSyntax = CommentSyntax {
    line: &["--"],
    block: Some(("/*", "*/")),
};

const LUA: CommentSyntax = CommentSyntax {
    line: &["--"],
    block: Some(("--[[", "]]")),
};

const HASKELL: CommentSyntax = CommentSyntax {
    line: &["--"],
    block: Some(("{-", "-}")),
};

const MARKUP: CommentSyntax = CommentSyntax {
    line: &[],
    block: Some(("<!--", "-->")),
};

const LISP: CommentSyntax = CommentSyntax {
    line: &[";"],
    block: None,
};

const ERLANG: CommentSyntax = CommentSyntax {
    line: &["%"],
    block: None,
};

impl CommentSyntax {
    /// 根据扩展名（已规范化为小写、无前导点）查找注释语法
    pub fn for_extension(extension: &str) -> Option<CommentSyntax> {
        let syntax = match extension {
            "c" | "h" | "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" | "cs" | "java" | "js"
            | "mjs" | "cjs" | "jsx" | "ts" | "tsx" | "rs" | "go" | "swift" | "kt" | "kts"
            | "scala" | "dart" | "groovy" | "gradle" | "zig" | "m" | "mm" | "php" | "proto" => {
                C_STYLE
            }
            "css" | "scss" | "less" => CSS,
            "py" | "pyi" => PYTHON,
            "sh" | "bash" | "zsh" | "rb" | "pl" | "pm" | "r" | "toml" | "yaml" | "yml"
            | "cmake" | "ps1" | "mk" | "dockerfile" | "properties" | "conf" => HASH,
            "sql" => SQL,
            "lua" => LUA,
            "hs" => HASKELL,
            "html" | "htm" | "xml" | "xhtml" | "svg" | "vue" => MARKUP,
            "lisp" | "clj" | "cljs" | "el" | "scm" | "asm" | "ini" => LISP,
            "erl" | "hrl" | "tex" => ERLANG,
            _ => return None,
        };
        Some(syntax)
    }

    /// 分析一行，返回该行是否含有代码
    ///
    /// `in_block` 记录跨行的块注释状态。含代码又开启块注释的行算作代码行。
    pub fn line_has_code(&self, line: &str, in_block: &mut bool) -> bool {
        let mut rest = line.trim();
        let mut has_code = false;

        loop {
            if *in_block {
                let Some((_, end)) = self.block else {
                    *in_block = false;
                    continue;
                };
                match rest.find(end) {
                    Some(index) => {
                        *in_block = false;
                        rest = rest[index + end.len()..].trim_start();
                    }
                    None => return has_code,
                }
            }

            if rest.is_empty() {
                return has_code;
            }

            // 块注释优先：Lua 的 `--[[` 同时以 `--` 开头
            if let Some((start, _)) = self.block {
                if rest.starts_with(start) {
                    *in_block = true;
                    rest = &rest[start.len()..];
                    continue;
                }
            }

            if self.line.iter().any(|prefix| rest.starts_with(prefix)) {
                return has_code;
            }

            // 代码片段：找到后面最早出现的注释开始位置
            has_code = true;
            let line_comment = self.line.iter().filter_map(|prefix| rest.find(prefix)).min();
            let block_comment = self
                .block
                .and_then(|(start, _)| rest.find(start).map(|index| (index, start)));

            match (line_comment, block_comment) {
                (Some(line_at), Some((block_at, _))) if line_at < block_at => return true,
                (_, Some((block_at, start))) => {
                    *in_block = true;
                    rest = &rest[block_at + start.len()..];
                }
                (_, None) => return true,
            }
        }
    }
}
