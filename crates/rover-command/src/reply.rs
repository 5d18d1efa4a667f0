//! 命令回复

/// 单次回复的最大字节数（含换行）
pub const MAX_RESPONSE_LEN: usize = 1024;

/// 命令回复：一行文本 + 成功标志
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    text: String,
    ok: bool,
}

impl CommandReply {
    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text.into(), true)
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self::new(text.into(), false)
    }

    fn new(mut text: String, ok: bool) -> Self {
        // 为换行保留 1 字节，按字符边界截断
        if text.len() > MAX_RESPONSE_LEN - 1 {
            let mut end = MAX_RESPONSE_LEN - 1;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
        }
        Self { text, ok }
    }

    /// 回复文本（不含换行）
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// 线路格式：文本 + `\n`
    pub fn to_line(&self) -> String {
        let mut line = String::with_capacity(self.text.len() + 1);
        line.push_str(&self.text);
        line.push('\n');
        line
    }
}
