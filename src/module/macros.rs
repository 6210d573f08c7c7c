//! 모듈 선언 매크로
//!
//! `module!`은 모듈 쪽 코드에서 디스크립터와 .modinfo 문자열을 만들고,
//! `module_entry!`는 로더블 아티팩트(staticlib)에서 C ABI 진입점을 내보낸다.
//!
//! ```ignore
//! module! {
//!     name: "helloworld1",
//!     init: hello_init,
//!     exit: hello_exit,
//!     license: "GPL",
//!     author: "...",
//!     description: "...",
//! }
//! ```
//!
//! 생성되는 항목: `THIS_MODULE`, `MODINFO`, `NAME`, `VERSION`
//!
//! `exit`, `version`, `intree`는 생략할 수 있다. `intree: Y`가 없으면
//! 트리 밖 모듈로 보고 로드 시 `O` taint가 붙는다.

#[macro_export]
macro_rules! module {
    {
        name: $name:literal,
        init: $init:path,
        $(exit: $exit:path,)?
        $(version: $version:literal,)?
        $(intree: $intree:ident,)?
        license: $license:literal,
        author: $author:literal,
        description: $description:literal $(,)?
    } => {
        /// 호스트 로더에 등록되는 이 모듈의 디스크립터
        pub static THIS_MODULE: $crate::module::ModuleDesc = $crate::module::ModuleDesc {
            info: $crate::module::ModInfo {
                name: $name,
                version: $crate::__module_opt!($($version)?),
                license: Some($license),
                author: Some($author),
                description: Some($description),
                intree: $crate::__module_intree!($($intree)?),
            },
            init: Some($init),
            exit: $crate::__module_opt!($($exit)?),
        };

        /// .modinfo 섹션 내용
        pub const MODINFO: &str = concat!(
            "name=", $name, "\0",
            $("version=", $version, "\0",)?
            "license=", $license, "\0",
            "author=", $author, "\0",
            "description=", $description, "\0",
            $("intree=", stringify!($intree), "\0",)?
        );

        /// NUL 종료 모듈 이름
        pub const NAME: &str = concat!($name, "\0");

        /// NUL 종료 버전 (없으면 빈 문자열)
        pub const VERSION: &str = concat!($($version,)? "\0");
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __module_opt {
    () => {
        None
    };
    ($value:expr) => {
        Some($value)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __module_intree {
    () => {
        false
    };
    (Y) => {
        true
    };
}

/// `module!`로 선언한 모듈의 C ABI 진입점
///
/// `before_init`은 init 전에 한 번 불린다 (힙/콘솔 준비 등).
#[macro_export]
macro_rules! module_entry {
    ($($module:ident)::+ $(, before_init: $before:path)? $(,)?) => {
        #[used]
        #[cfg_attr(
            any(target_os = "linux", target_os = "none"),
            unsafe(link_section = ".modinfo")
        )]
        static __MODINFO: [u8; $($module)::+::MODINFO.len()] =
            $crate::module::modinfo_bytes::<{ $($module)::+::MODINFO.len() }>(
                $($module)::+::MODINFO,
            );

        /// 모듈 초기화 함수 (0 = 성공)
        #[unsafe(no_mangle)]
        pub extern "C" fn module_init() -> i32 {
            $($before();)?
            $crate::module::call_init(&$($module)::+::THIS_MODULE)
        }

        /// 모듈 정리 함수
        #[unsafe(no_mangle)]
        pub extern "C" fn module_exit() {
            $crate::module::call_exit(&$($module)::+::THIS_MODULE)
        }

        /// 모듈 이름 반환
        #[unsafe(no_mangle)]
        pub extern "C" fn module_name() -> *const u8 {
            $($module)::+::NAME.as_ptr()
        }

        /// 모듈 버전 반환
        #[unsafe(no_mangle)]
        pub extern "C" fn module_version() -> *const u8 {
            $($module)::+::VERSION.as_ptr()
        }
    };
}
