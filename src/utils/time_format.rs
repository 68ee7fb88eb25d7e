use std::time::Duration;

/// 格式化耗时为友好显示格式 (例如: "850ms", "12.3s", "2m 5s")
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    let seconds = duration.as_secs();

    match seconds {
        0 => format!("{}ms", millis),
        1..=59 => format!("{}.{}s", seconds, duration.subsec_millis() / 100),
        _ => format!("{}m {}s", seconds / 60, seconds % 60),
    }
}
