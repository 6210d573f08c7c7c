//! helloworld1 모듈
//!
//! 로드될 때 인사를, 언로드될 때 작별 인사를 커널 로그에 한 줄씩 남긴다.
//! 상태는 없고 init은 항상 성공한다.

use crate::log_info;

/// 로드 시 호출
fn hello_init() -> i32 {
    log_info!("Hello kernel 1");
    // 0이 아니면 로드 실패
    0
}

/// 언로드 시 호출 (init이 성공했을 때만)
fn hello_exit() {
    log_info!("Goodbye kernel 1");
}

crate::module! {
    name: "helloworld1",
    init: hello_init,
    exit: hello_exit,
    license: "GPL",
    author: "Gianmarco Bencivenni",
    description: "A sample helloworld loadable kernel module",
}
