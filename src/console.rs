//! 콘솔 출력 훅
//!
//! 커널 로그가 한 줄씩 에코되는 곳. 기본은 연결된 콘솔 없음이고,
//! 로더블 모듈 빌드에서는 호스트 커널의 `kernel_print`로 연결한다.

use core::fmt::{self, Write};

use spin::RwLock;

/// 콘솔 출력 함수 타입
pub type ConsoleFn = fn(&str);

static CONSOLE: RwLock<Option<ConsoleFn>> = RwLock::new(None);

/// 콘솔 연결 (기존 콘솔 교체)
pub fn set_console(sink: ConsoleFn) {
    *CONSOLE.write() = Some(sink);
}

/// 콘솔 분리
pub fn clear_console() {
    *CONSOLE.write() = None;
}

/// 문자열 출력 (콘솔이 없으면 버림)
pub fn puts(s: &str) {
    if let Some(sink) = *CONSOLE.read() {
        sink(s);
    }
}

/// 포맷팅 출력을 콘솔로 보내는 Writer
pub struct Console;

impl Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        puts(s);
        Ok(())
    }
}
