//! 커널 로그 매크로
//!
//! klog!, log_error!, log_warn!, log_info!, log_debug!, log_trace!
//!
//! `target: "name",`을 앞에 붙이면 메시지가 `name: ...` 형태가 된다 (pr_fmt).

#[macro_export]
macro_rules! klog {
    ($level:expr, target: $target:expr, $fmt:literal $($arg:tt)*) => {
        $crate::log::log(
            $level,
            ::core::format_args!("{}: {}", $target, ::core::format_args!($fmt $($arg)*)),
        )
    };
    ($level:expr, $($arg:tt)*) => {
        $crate::log::log($level, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Error, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Warn, $($arg)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Info, $($arg)*) };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Debug, $($arg)*) };
}

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => { $crate::klog!($crate::log::LogLevel::Trace, $($arg)*) };
}
