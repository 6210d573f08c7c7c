//! helloworld1 로더블 커널 모듈
//!
//! - `hello`: 로드 시 인사, 언로드 시 작별 인사를 남기는 모듈 본체
//! - `module`: 모듈 디스크립터, .modinfo, 라이선스/taint, 모듈 로더
//! - `log`: 커널 로그 (dmesg 링 버퍼)
//! - `console`: 로그 출력용 콘솔 훅

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod console;
pub mod hello;
pub mod log;
pub mod module;

/// 전역 로그/콘솔을 건드리는 테스트 직렬화용
#[cfg(test)]
pub(crate) static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
pub(crate) fn test_guard() -> std::sync::MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}
