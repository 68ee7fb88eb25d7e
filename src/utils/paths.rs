use std::path::Path;

/// 统一使用 `/` 作为分隔符
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// 相对于根目录的路径；不在根目录下时返回原路径
pub fn relative_to<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}
