//! 모듈 로더
//!
//! 호스트 커널의 모듈 테이블과 라이프사이클 관리
//! - 중복 로드 거부
//! - 라이선스 검사, taint
//! - init 실패 시 롤백 (exit은 호출하지 않음)
//! - 참조 카운트가 남아 있으면 언로드 거부

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use spin::RwLock;
use thiserror::Error;

use super::license::{license_is_gpl_compatible, Taint};
use super::{call_exit, call_init, ModuleDesc};
use crate::{log_debug, log_warn};

// ============================================================================
// 모듈 에러 및 상태
// ============================================================================

/// 모듈 에러
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ModuleError {
    /// 잘못된 모듈 포맷 (이름 없음, .modinfo 손상)
    #[error("invalid module format")]
    InvalidFormat,
    /// 같은 이름의 모듈이 이미 테이블에 있음
    #[error("module already loaded")]
    AlreadyLoaded,
    /// 모듈을 찾을 수 없음
    #[error("module not found")]
    NotFound,
    /// 초기화 함수가 0이 아닌 값을 반환
    #[error("module init failed with {0}")]
    InitFailed(i32),
    /// 모듈이 사용 중
    #[error("module is in use")]
    InUse,
    /// exit 함수가 없어 언로드 불가
    #[error("module has no exit function")]
    NoExit,
    /// 모듈이 초기화 중
    #[error("module is still initializing")]
    ModuleLoading,
    /// 모듈이 언로딩 중
    #[error("module is being unloaded")]
    ModuleUnloading,
}

/// 모듈 상태. 테이블에 없으면 언로드 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// init 실행 중
    Loading,
    /// 활성 상태
    Live,
    /// exit 실행 중
    Unloading,
}

/// 모듈 상세 정보 (조회용)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: &'static str,
    pub version: Option<&'static str>,
    pub state: ModuleState,
    pub ref_count: usize,
    pub license: Option<&'static str>,
    pub author: Option<&'static str>,
    pub description: Option<&'static str>,
    /// 이 모듈 때문에 생긴 taint
    pub taints: Taint,
}

/// 로드된 모듈
struct LoadedModule {
    desc: &'static ModuleDesc,
    state: ModuleState,
    ref_count: Arc<AtomicUsize>,
    taints: Taint,
}

impl LoadedModule {
    fn name(&self) -> &'static str {
        self.desc.name()
    }

    fn info(&self) -> ModuleInfo {
        let info = &self.desc.info;
        ModuleInfo {
            name: info.name,
            version: info.version,
            state: self.state,
            ref_count: self.ref_count.load(Ordering::SeqCst),
            license: info.license,
            author: info.author,
            description: info.description,
            taints: self.taints,
        }
    }
}

/// 모듈 참조 가드 (RAII)
/// Drop 시 자동으로 참조 카운트 감소
pub struct ModuleRef {
    name: &'static str,
    ref_count: Arc<AtomicUsize>,
}

impl ModuleRef {
    /// 모듈 이름 반환
    pub fn name(&self) -> &str {
        self.name
    }
}

impl Drop for ModuleRef {
    fn drop(&mut self) {
        self.ref_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 프로세스 전역 모듈 로더
pub static LOADER: ModuleLoader = ModuleLoader::new();

/// 모듈 로더
pub struct ModuleLoader {
    /// 로드 순서대로 유지
    modules: RwLock<Vec<LoadedModule>>,
    /// 커널 전체 taint
    taint: AtomicU32,
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader {
    pub const fn new() -> Self {
        Self {
            modules: RwLock::new(Vec::new()),
            taint: AtomicU32::new(0),
        }
    }

    /// 모듈 로드
    ///
    /// 1. 테이블에 Loading 상태로 등록 (중복 이름 거부)
    /// 2. 락을 놓고 init 호출
    /// 3. 성공이면 Live, 실패면 테이블에서 제거
    pub fn load(&self, desc: &'static ModuleDesc) -> Result<(), ModuleError> {
        let name = desc.name();
        if name.is_empty() {
            return Err(ModuleError::InvalidFormat);
        }

        let (taints, first_oot) = {
            let mut modules = self.modules.write();
            if modules.iter().any(|m| m.name() == name) {
                return Err(ModuleError::AlreadyLoaded);
            }

            let (taints, first_oot) = self.apply_taint(desc);
            modules.push(LoadedModule {
                desc,
                state: ModuleState::Loading,
                ref_count: Arc::new(AtomicUsize::new(0)),
                taints,
            });
            (taints, first_oot)
        };

        // 콘솔 싱크가 로더를 다시 읽을 수 있으므로 경고는 락 밖에서
        Self::warn_taint(desc, taints, first_oot);

        log_debug!(target: name, "calling init");
        let ret = call_init(desc);

        let mut modules = self.modules.write();
        let idx = modules
            .iter()
            .position(|m| m.name() == name)
            .ok_or(ModuleError::NotFound)?;

        if ret != 0 {
            modules.remove(idx);
            drop(modules);
            if ret > 0 {
                log_warn!(
                    target: name,
                    "init returned {}, it should return 0 or a negative errno",
                    ret
                );
            }
            log_debug!(target: name, "init failed ({}), module discarded", ret);
            return Err(ModuleError::InitFailed(ret));
        }

        modules[idx].state = ModuleState::Live;
        drop(modules);

        log_debug!(target: name, "module loaded");
        Ok(())
    }

    /// 모듈 언로드
    ///
    /// Live 상태이고 참조가 없을 때만 exit을 호출하고 테이블에서 제거
    pub fn unload(&self, name: &str) -> Result<(), ModuleError> {
        let desc = {
            let mut modules = self.modules.write();
            let module = modules
                .iter_mut()
                .find(|m| m.name() == name)
                .ok_or(ModuleError::NotFound)?;

            match module.state {
                ModuleState::Loading => return Err(ModuleError::ModuleLoading),
                ModuleState::Unloading => return Err(ModuleError::ModuleUnloading),
                ModuleState::Live => {}
            }
            if module.desc.exit.is_none() {
                return Err(ModuleError::NoExit);
            }
            if module.ref_count.load(Ordering::SeqCst) > 0 {
                return Err(ModuleError::InUse);
            }

            module.state = ModuleState::Unloading;
            module.desc
        };

        call_exit(desc);

        self.modules.write().retain(|m| m.name() != name);

        log_debug!(target: name, "module unloaded");
        Ok(())
    }

    /// 모듈 참조 획득 (RAII 가드 반환)
    ///
    /// Live 상태일 때만 성공. ModuleRef가 drop되면 참조 카운트 감소.
    pub fn acquire(&self, name: &str) -> Result<ModuleRef, ModuleError> {
        let modules = self.modules.read();
        let module = modules
            .iter()
            .find(|m| m.name() == name)
            .ok_or(ModuleError::NotFound)?;

        match module.state {
            ModuleState::Loading => Err(ModuleError::ModuleLoading),
            ModuleState::Unloading => Err(ModuleError::ModuleUnloading),
            ModuleState::Live => {
                module.ref_count.fetch_add(1, Ordering::SeqCst);
                Ok(ModuleRef {
                    name: module.name(),
                    ref_count: Arc::clone(&module.ref_count),
                })
            }
        }
    }

    /// 모듈 상태 (테이블에 없으면 None)
    pub fn state(&self, name: &str) -> Option<ModuleState> {
        self.modules
            .read()
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.state)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.state(name) == Some(ModuleState::Live)
    }

    /// 로드된 모듈 목록 (로드 순서)
    pub fn list(&self) -> Vec<String> {
        self.modules
            .read()
            .iter()
            .map(|m| String::from(m.name()))
            .collect()
    }

    /// 모듈 상세 정보
    pub fn info(&self, name: &str) -> Option<ModuleInfo> {
        self.modules
            .read()
            .iter()
            .find(|m| m.name() == name)
            .map(LoadedModule::info)
    }

    /// 커널 전체 taint
    pub fn taint(&self) -> Taint {
        Taint::from_bits_truncate(self.taint.load(Ordering::SeqCst))
    }

    // 라이선스/출처 검사. 로드를 막지는 않고 taint만 남긴다.
    // 반환: (이 모듈의 taint, 커널 첫 OOT taint인지)
    fn apply_taint(&self, desc: &ModuleDesc) -> (Taint, bool) {
        let info = &desc.info;
        let mut taints = Taint::empty();

        if !info.license.is_some_and(license_is_gpl_compatible) {
            taints |= Taint::PROPRIETARY_MODULE;
        }
        if !info.intree {
            taints |= Taint::OOT_MODULE;
        }

        let before = self.add_taint(taints);
        let first_oot =
            taints.contains(Taint::OOT_MODULE) && !before.contains(Taint::OOT_MODULE);
        (taints, first_oot)
    }

    fn warn_taint(desc: &ModuleDesc, taints: Taint, first_oot: bool) {
        let info = &desc.info;
        if taints.contains(Taint::PROPRIETARY_MODULE) {
            log_warn!(
                target: info.name,
                "module license '{}' taints kernel.",
                info.license.unwrap_or("unspecified")
            );
        }
        if first_oot {
            log_warn!(target: info.name, "loading out-of-tree module taints kernel.");
        }
    }

    // taint 추가, 이전 값 반환
    fn add_taint(&self, taint: Taint) -> Taint {
        Taint::from_bits_truncate(self.taint.fetch_or(taint.bits(), Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log;
    use crate::module::ModInfo;

    static CALLS_INIT: AtomicUsize = AtomicUsize::new(0);
    static CALLS_EXIT: AtomicUsize = AtomicUsize::new(0);

    fn counting_init() -> i32 {
        CALLS_INIT.fetch_add(1, Ordering::SeqCst);
        0
    }

    fn counting_exit() {
        CALLS_EXIT.fetch_add(1, Ordering::SeqCst);
    }

    fn failing_init() -> i32 {
        -12
    }

    fn positive_init() -> i32 {
        1
    }

    const fn gpl(name: &'static str) -> ModInfo {
        ModInfo {
            license: Some("GPL"),
            intree: true,
            ..ModInfo::new(name)
        }
    }

    static COUNTING: ModuleDesc = ModuleDesc {
        info: gpl("counting"),
        init: Some(counting_init),
        exit: Some(counting_exit),
    };

    static FAILING: ModuleDesc = ModuleDesc {
        info: gpl("failing"),
        init: Some(failing_init),
        exit: Some(counting_exit),
    };

    static POSITIVE: ModuleDesc = ModuleDesc {
        info: gpl("positive"),
        init: Some(positive_init),
        exit: None,
    };

    static PERMANENT: ModuleDesc = ModuleDesc {
        info: gpl("permanent"),
        init: None,
        exit: None,
    };

    static PROPRIETARY: ModuleDesc = ModuleDesc {
        info: ModInfo {
            license: Some("Proprietary"),
            ..ModInfo::new("blob")
        },
        init: None,
        exit: Some(counting_exit),
    };

    static UNNAMED: ModuleDesc = ModuleDesc {
        info: ModInfo::new(""),
        init: None,
        exit: None,
    };

    fn reset_counts() {
        CALLS_INIT.store(0, Ordering::SeqCst);
        CALLS_EXIT.store(0, Ordering::SeqCst);
    }

    #[test]
    fn load_unload_cycle() {
        let _guard = crate::test_guard();
        reset_counts();
        let loader = ModuleLoader::new();

        loader.load(&COUNTING).unwrap();
        assert_eq!(loader.state("counting"), Some(ModuleState::Live));
        assert_eq!(CALLS_INIT.load(Ordering::SeqCst), 1);
        assert_eq!(loader.list(), ["counting"]);

        loader.unload("counting").unwrap();
        assert_eq!(loader.state("counting"), None);
        assert_eq!(CALLS_EXIT.load(Ordering::SeqCst), 1);

        // 새 로드 사이클
        loader.load(&COUNTING).unwrap();
        assert_eq!(CALLS_INIT.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn double_load_rejected() {
        let _guard = crate::test_guard();
        reset_counts();
        let loader = ModuleLoader::new();
        loader.load(&COUNTING).unwrap();
        assert_eq!(loader.load(&COUNTING), Err(ModuleError::AlreadyLoaded));
        assert_eq!(CALLS_INIT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn init_failure_discards_without_exit() {
        let _guard = crate::test_guard();
        reset_counts();
        let loader = ModuleLoader::new();
        assert_eq!(loader.load(&FAILING), Err(ModuleError::InitFailed(-12)));
        assert_eq!(loader.state("failing"), None);
        assert_eq!(loader.unload("failing"), Err(ModuleError::NotFound));
        assert_eq!(CALLS_EXIT.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn positive_init_is_failure_with_warning() {
        let _guard = crate::test_guard();
        log::set_log_level(log::LogLevel::Info);
        let loader = ModuleLoader::new();
        let mark = log::next_seq();
        assert_eq!(loader.load(&POSITIVE), Err(ModuleError::InitFailed(1)));
        let recs = log::records_since(mark);
        assert!(recs.iter().any(|r| r.level == log::LogLevel::Warn
            && r.text.starts_with("positive: init returned 1")));
    }

    #[test]
    fn permanent_module_cannot_unload() {
        let _guard = crate::test_guard();
        let loader = ModuleLoader::new();
        loader.load(&PERMANENT).unwrap();
        assert_eq!(loader.unload("permanent"), Err(ModuleError::NoExit));
        assert!(loader.is_loaded("permanent"));
    }

    #[test]
    fn reference_blocks_unload() {
        let _guard = crate::test_guard();
        reset_counts();
        let loader = ModuleLoader::new();
        loader.load(&COUNTING).unwrap();

        let r = loader.acquire("counting").unwrap();
        assert_eq!(r.name(), "counting");
        assert_eq!(loader.info("counting").map(|i| i.ref_count), Some(1));
        assert_eq!(loader.unload("counting"), Err(ModuleError::InUse));
        assert_eq!(CALLS_EXIT.load(Ordering::SeqCst), 0);

        drop(r);
        loader.unload("counting").unwrap();
        assert_eq!(CALLS_EXIT.load(Ordering::SeqCst), 1);
        assert!(matches!(loader.acquire("counting"), Err(ModuleError::NotFound)));
    }

    #[test]
    fn proprietary_license_taints() {
        let _guard = crate::test_guard();
        log::set_log_level(log::LogLevel::Info);
        let loader = ModuleLoader::new();
        let mark = log::next_seq();

        loader.load(&COUNTING).unwrap();
        assert_eq!(loader.taint(), Taint::empty());

        loader.load(&PROPRIETARY).unwrap();
        assert_eq!(loader.taint(), Taint::PROPRIETARY_MODULE | Taint::OOT_MODULE);
        let info = loader.info("blob").unwrap();
        assert_eq!(info.taints, Taint::PROPRIETARY_MODULE | Taint::OOT_MODULE);

        let warnings: Vec<_> = log::records_since(mark)
            .into_iter()
            .filter(|r| r.level == log::LogLevel::Warn)
            .map(|r| r.text)
            .collect();
        assert_eq!(
            warnings,
            [
                "blob: module license 'Proprietary' taints kernel.",
                "blob: loading out-of-tree module taints kernel.",
            ]
        );

        // taint는 언로드 후에도 남는다
        loader.unload("blob").unwrap();
        assert!(loader.taint().contains(Taint::PROPRIETARY_MODULE));
    }

    #[test]
    fn empty_name_rejected() {
        let _guard = crate::test_guard();
        let loader = ModuleLoader::new();
        assert_eq!(loader.load(&UNNAMED), Err(ModuleError::InvalidFormat));
        assert!(loader.list().is_empty());
    }

    #[test]
    fn unknown_module() {
        let loader = ModuleLoader::new();
        assert_eq!(loader.unload("nope"), Err(ModuleError::NotFound));
        assert!(loader.info("nope").is_none());
        assert!(!loader.is_loaded("nope"));
    }

    static OOT_A: ModuleDesc = ModuleDesc {
        info: ModInfo {
            license: Some("GPL"),
            ..ModInfo::new("oot_a")
        },
        init: None,
        exit: None,
    };

    static OOT_B: ModuleDesc = ModuleDesc {
        info: ModInfo {
            license: Some("GPL"),
            ..ModInfo::new("oot_b")
        },
        init: None,
        exit: None,
    };

    #[test]
    fn out_of_tree_warning_once_per_kernel() {
        let _guard = crate::test_guard();
        log::set_log_level(log::LogLevel::Info);
        let loader = ModuleLoader::new();
        let mark = log::next_seq();

        loader.load(&OOT_A).unwrap();
        loader.load(&OOT_B).unwrap();

        let oot_warnings = log::records_since(mark)
            .into_iter()
            .filter(|r| r.text.contains("loading out-of-tree module"))
            .count();
        assert_eq!(oot_warnings, 1);
        // 경고는 한 번이지만 두 모듈 모두 O로 표시된다
        assert_eq!(loader.info("oot_b").map(|i| i.taints), Some(Taint::OOT_MODULE));
    }

    // init/exit 안에서 같은 로더를 다시 부르는 모듈
    static REENTRANT_LOADER: ModuleLoader = ModuleLoader::new();

    type Seen = (Option<ModuleState>, Option<ModuleError>, Option<ModuleError>);

    static SEEN_IN_INIT: std::sync::Mutex<Option<Seen>> = std::sync::Mutex::new(None);
    static SEEN_IN_EXIT: std::sync::Mutex<Option<Seen>> = std::sync::Mutex::new(None);

    fn observe(name: &str) -> Seen {
        (
            REENTRANT_LOADER.state(name),
            REENTRANT_LOADER.unload(name).err(),
            REENTRANT_LOADER.acquire(name).err(),
        )
    }

    fn reentrant_init() -> i32 {
        *SEEN_IN_INIT.lock().unwrap() = Some(observe("reentrant"));
        0
    }

    fn reentrant_exit() {
        *SEEN_IN_EXIT.lock().unwrap() = Some(observe("reentrant"));
    }

    static REENTRANT: ModuleDesc = ModuleDesc {
        info: gpl("reentrant"),
        init: Some(reentrant_init),
        exit: Some(reentrant_exit),
    };

    #[test]
    fn callbacks_see_transient_states() {
        let _guard = crate::test_guard();

        REENTRANT_LOADER.load(&REENTRANT).unwrap();
        assert_eq!(
            SEEN_IN_INIT.lock().unwrap().take(),
            Some((
                Some(ModuleState::Loading),
                Some(ModuleError::ModuleLoading),
                Some(ModuleError::ModuleLoading),
            ))
        );
        assert!(REENTRANT_LOADER.is_loaded("reentrant"));

        REENTRANT_LOADER.unload("reentrant").unwrap();
        assert_eq!(
            SEEN_IN_EXIT.lock().unwrap().take(),
            Some((
                Some(ModuleState::Unloading),
                Some(ModuleError::ModuleUnloading),
                Some(ModuleError::ModuleUnloading),
            ))
        );
        assert_eq!(REENTRANT_LOADER.state("reentrant"), None);
    }

    // 콘솔 싱크가 로더를 조회해도 로드가 멈추지 않아야 한다
    static CONSOLE_LOADER: ModuleLoader = ModuleLoader::new();
    static CONSOLE_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn listing_console(_line: &str) {
        let _ = CONSOLE_LOADER.list();
        CONSOLE_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn console_may_query_loader_while_taint_is_logged() {
        let _guard = crate::test_guard();
        log::set_log_level(log::LogLevel::Info);
        log::set_console_echo(true);
        CONSOLE_CALLS.store(0, Ordering::SeqCst);
        crate::console::set_console(listing_console);

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(CONSOLE_LOADER.load(&PROPRIETARY));
        });
        let result = rx.recv_timeout(std::time::Duration::from_secs(3));
        crate::console::clear_console();

        assert_eq!(result, Ok(Ok(())));
        // 라이선스 경고 + OOT 경고
        assert!(CONSOLE_CALLS.load(Ordering::SeqCst) >= 2);
        assert_eq!(CONSOLE_LOADER.list(), ["blob"]);
    }
}
