//! 라이선스 검사와 커널 taint 플래그

use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// 커널 taint 플래그 (비트 번호는 리눅스와 동일)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Taint: u32 {
        /// 'P' - GPL 호환이 아닌 라이선스의 모듈이 로드됨
        const PROPRIETARY_MODULE = 1 << 0;
        /// 'O' - 트리 밖에서 빌드된 모듈이 로드됨
        const OOT_MODULE = 1 << 12;
    }
}

impl Taint {
    fn letter(flag: Taint) -> char {
        if flag == Taint::PROPRIETARY_MODULE {
            'P'
        } else if flag == Taint::OOT_MODULE {
            'O'
        } else {
            '?'
        }
    }

    /// 설정된 플래그를 비트 순서대로 문자로 표시 ("PO")
    pub fn letters(&self) -> impl Iterator<Item = char> + '_ {
        self.iter().map(Self::letter)
    }
}

impl fmt::Display for Taint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Not tainted");
        }
        for c in self.letters() {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// GPL 호환 라이선스 식별자
const GPL_COMPATIBLE: [&str; 6] = [
    "GPL",
    "GPL v2",
    "GPL and additional rights",
    "Dual BSD/GPL",
    "Dual MIT/GPL",
    "Dual MPL/GPL",
];

pub fn license_is_gpl_compatible(license: &str) -> bool {
    GPL_COMPATIBLE.contains(&license)
}
