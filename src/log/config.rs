//! 로깅 설정
//!
//! 커널 커맨드라인 형식의 문자열에서 읽는다.
//! `loglevel=<0-4|error|warn|info|debug|trace>`, `quiet`, `console=on|off`.
//! 모르는 토큰은 무시한다.

use super::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub console: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console: true,
        }
    }
}

impl LogConfig {
    pub fn from_cmdline(cmdline: &str) -> Self {
        let mut config = Self::default();
        for token in cmdline.split_ascii_whitespace() {
            match token.split_once('=') {
                Some(("loglevel", value)) => {
                    if let Ok(level) = value.parse() {
                        config.level = level;
                    }
                }
                Some(("console", "off")) => config.console = false,
                Some(("console", "on")) => config.console = true,
                None if token == "quiet" => config.level = LogLevel::Warn,
                _ => {}
            }
        }
        config
    }
}
