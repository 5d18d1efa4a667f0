//! 数值格式化

/// 定点格式化，四舍五入到零的负数不带负号（`-0.0` → `0.0`）
pub(crate) fn fixed(value: f32, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value);
    match text.strip_prefix('-') {
        Some(abs) if abs.chars().all(|c| c == '0' || c == '.') => abs.to_string(),
        _ => text,
    }
}

/// `x,y,z` 三元组（用于 JSON 数组）
pub(crate) fn triple(v: &[f32; 3], decimals: usize, sep: &str) -> String {
    v.iter()
        .map(|x| fixed(*x, decimals))
        .collect::<Vec<_>>()
        .join(sep)
}
