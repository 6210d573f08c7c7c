//! 커널 모듈 시스템
//!
//! - 모듈 디스크립터 (init/exit 훅 + 메타데이터)
//! - .modinfo 인코딩/파싱
//! - 라이선스 검사, taint
//! - 모듈 라이프사이클 (로드/언로드, 참조 카운트)

pub mod info;
pub mod license;
pub mod loader;
mod macros;

pub use info::{modinfo_bytes, modinfo_get, parse_modinfo, ModInfo};
pub use license::{license_is_gpl_compatible, Taint};
pub use loader::{ModuleError, ModuleInfo, ModuleLoader, ModuleRef, ModuleState, LOADER};

/// 모듈 초기화 함수. 0이면 성공, 그 외에는 로드 실패.
pub type InitFn = fn() -> i32;

/// 모듈 정리 함수
pub type ExitFn = fn();

/// 호스트 로더에 등록되는 모듈 디스크립터
#[derive(Debug)]
pub struct ModuleDesc {
    pub info: ModInfo,
    pub init: Option<InitFn>,
    pub exit: Option<ExitFn>,
}

impl ModuleDesc {
    pub fn name(&self) -> &'static str {
        self.info.name
    }
}

/// init 호출 (등록된 init이 없으면 성공으로 취급)
pub fn call_init(desc: &ModuleDesc) -> i32 {
    match desc.init {
        Some(init) => init(),
        None => 0,
    }
}

/// exit 호출
pub fn call_exit(desc: &ModuleDesc) {
    if let Some(exit) = desc.exit {
        exit();
    }
}
