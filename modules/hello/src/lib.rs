//! helloworld1 로더블 모듈 아티팩트
//!
//! 모듈 본체는 `hellomod::hello`에 있고, 여기서는 호스트 커널이 찾는
//! C ABI 진입점과 .modinfo 섹션만 내보낸다.
//! 출력은 PLT를 통해 커널의 `kernel_print`로 보낸다.

#![no_std]
#![no_main]

use core::panic::PanicInfo;
use core::sync::atomic::{AtomicBool, Ordering};

use hellomod::log::LogConfig;
use linked_list_allocator::LockedHeap;

/// 모듈 전용 힙 크기
const HEAP_SIZE: usize = 16 * 1024;

static mut HEAP_ARENA: [u8; HEAP_SIZE] = [0; HEAP_SIZE];
static HEAP_READY: AtomicBool = AtomicBool::new(false);

#[global_allocator]
static HEAP_ALLOCATOR: LockedHeap = LockedHeap::empty();

// 커널에서 제공하는 extern 함수 선언
unsafe extern "C" {
    /// 커널 출력 함수 (PLT를 통해 호출됨)
    fn kernel_print(s: *const u8, len: usize);
    /// 부팅 커맨드라인 (없으면 null)
    fn kernel_cmdline(len: *mut usize) -> *const u8;
}

fn print(s: &str) {
    unsafe {
        kernel_print(s.as_ptr(), s.len());
    }
}

fn cmdline() -> &'static str {
    let mut len = 0;
    let ptr = unsafe { kernel_cmdline(&mut len) };
    if ptr.is_null() {
        return "";
    }
    let bytes = unsafe { core::slice::from_raw_parts(ptr, len) };
    core::str::from_utf8(bytes).unwrap_or("")
}

/// init 전 준비: 힙, 콘솔, 로그 설정
fn prepare() {
    if !HEAP_READY.swap(true, Ordering::SeqCst) {
        unsafe {
            HEAP_ALLOCATOR
                .lock()
                .init((&raw mut HEAP_ARENA).cast::<u8>(), HEAP_SIZE);
        }
    }
    hellomod::console::set_console(print);
    hellomod::log::init(LogConfig::from_cmdline(cmdline()));
}

hellomod::module_entry!(hellomod::hello, before_init: prepare);

/// Panic 핸들러
#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    print("[helloworld1] PANIC!\n");
    loop {}
}
