//! 커널 로깅 시스템
//!
//! - 로그 레벨: ERROR, WARN, INFO, DEBUG, TRACE
//! - 시퀀스 번호 + syslog 우선순위 접두사 (`<6>[     3] ...`)
//! - 64KB 링 버퍼 (dmesg)
//! - 커맨드라인 스타일 설정 (`loglevel=`, `quiet`, `console=`)

mod buffer;
mod config;
mod macros;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use spin::Mutex;

use crate::console;
use buffer::RingBuffer;

pub use config::LogConfig;

/// 링 버퍼 크기
pub const RING_BUFFER_SIZE: usize = 64 * 1024;

/// 한 레코드의 최대 메시지 길이 (바이트)
pub const MAX_MESSAGE_LEN: usize = 512;

/// 커널 facility (syslog facility 0)
const KERN_FACILITY: u8 = 0;

// 전역 로그 레벨 (기본: Info = 2)
static CURRENT_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

// 콘솔 에코 여부
static CONSOLE_ECHO: AtomicBool = AtomicBool::new(true);

// 다음 레코드 시퀀스 번호
static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

static KMSG: Mutex<RingBuffer<RING_BUFFER_SIZE>> = Mutex::new(RingBuffer::new());

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            4 => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }

    /// syslog severity (KERN_ERR=3, KERN_WARNING=4, KERN_INFO=6, KERN_DEBUG=7)
    pub fn severity(&self) -> u8 {
        match self {
            LogLevel::Error => 3,
            LogLevel::Warn => 4,
            LogLevel::Info => 6,
            LogLevel::Debug | LogLevel::Trace => 7,
        }
    }

    /// facility와 합친 syslog 우선순위 값
    pub fn priority(&self) -> u8 {
        (KERN_FACILITY << 3) | self.severity()
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // 숫자 한 자리 먼저
        if let [c @ b'0'..=b'4'] = s.as_bytes() {
            return Ok(Self::from_u8(*c - b'0'));
        }
        const NAMES: [(&str, LogLevel); 5] = [
            ("error", LogLevel::Error),
            ("warn", LogLevel::Warn),
            ("info", LogLevel::Info),
            ("debug", LogLevel::Debug),
            ("trace", LogLevel::Trace),
        ];
        NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, level)| *level)
            .ok_or(())
    }
}

/// 링 버퍼에서 읽어낸 로그 레코드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub seq: u64,
    pub level: LogLevel,
    pub text: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>[{:>6}] {}", self.level.priority(), self.seq, self.text)
    }
}

pub fn set_log_level(level: LogLevel) {
    CURRENT_LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn get_log_level() -> LogLevel {
    LogLevel::from_u8(CURRENT_LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn set_console_echo(enabled: bool) {
    CONSOLE_ECHO.store(enabled, Ordering::Relaxed);
}

/// 로깅 설정 적용
pub fn init(config: LogConfig) {
    set_log_level(config.level);
    set_console_echo(config.console);
}

/// 로그 메시지 기록
pub fn log(level: LogLevel, args: fmt::Arguments) {
    // 레벨 필터링
    if level > get_log_level() {
        return;
    }

    // 락 밖에서 포매팅 (Display 구현이 다시 로그를 찍어도 데드락 없음)
    let mut msg_buf = [0u8; MAX_MESSAGE_LEN];
    let msg_len = format_to_buf(&mut msg_buf, args);
    let msg = match core::str::from_utf8(&msg_buf[..msg_len]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let msg = msg.strip_suffix('\n').unwrap_or(msg);

    let seq = {
        let mut kmsg = KMSG.lock();
        // 시퀀스 할당과 저장을 같은 락 안에서 해야 버퍼 순서가 유지됨
        let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
        kmsg.append(level, seq, msg);
        seq
    };

    if CONSOLE_ECHO.load(Ordering::Relaxed) {
        let _ = fmt::write(
            &mut console::Console,
            format_args!("<{}>[{:>6}] {}\n", level.priority(), seq, msg),
        );
    }
}

/// 다음에 기록될 레코드의 시퀀스 번호
pub fn next_seq() -> u64 {
    NEXT_SEQ.load(Ordering::Relaxed)
}

/// 링 버퍼에 남아 있는 모든 레코드
pub fn records() -> Vec<LogRecord> {
    KMSG.lock().records()
}

/// `seq` 이상인 레코드만
pub fn records_since(seq: u64) -> Vec<LogRecord> {
    let mut records = records();
    records.retain(|r| r.seq >= seq);
    records
}

/// dmesg -C
pub fn clear() {
    KMSG.lock().clear();
}

/// dmesg: 링 버퍼 내용을 콘솔로 출력
pub fn dump_logs() {
    let records = records();
    if records.is_empty() {
        console::puts("(empty log buffer)\n");
        return;
    }
    for record in &records {
        let _ = fmt::write(&mut console::Console, format_args!("{}\n", record));
    }
}

// fmt::Arguments를 바이트 버퍼에 포매팅
fn format_to_buf(buf: &mut [u8], args: fmt::Arguments) -> usize {
    let mut writer = BufWriter::new(buf);
    let _ = fmt::write(&mut writer, args);
    writer.pos
}

// 스택 버퍼에 쓰는 fmt::Write 구현. 넘치면 문자 경계에서 자른다.
struct BufWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> BufWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }
}

impl fmt::Write for BufWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let remaining = self.buf.len() - self.pos;
        let mut copy_len = s.len().min(remaining);
        while !s.is_char_boundary(copy_len) {
            copy_len -= 1;
        }
        self.buf[self.pos..self.pos + copy_len].copy_from_slice(&s.as_bytes()[..copy_len]);
        self.pos += copy_len;
        Ok(())
    }
}
