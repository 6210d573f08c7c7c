//! 모듈 메타데이터 (.modinfo)
//!
//! 호스트 도구가 읽는 `key=value\0` 목록. 로딩 여부(라이선스)와
//! 표시용 정보에만 쓰이고 init/exit 동작에는 영향이 없다.

use alloc::vec::Vec;

use super::ModuleError;

/// 모듈 메타데이터 블록
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModInfo {
    /// 모듈 이름
    pub name: &'static str,
    /// 버전
    pub version: Option<&'static str>,
    /// 라이선스 식별자 ("GPL" 등)
    pub license: Option<&'static str>,
    /// 작성자
    pub author: Option<&'static str>,
    /// 설명
    pub description: Option<&'static str>,
    /// 커널 트리 안에서 빌드된 모듈인지
    pub intree: bool,
}

impl ModInfo {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            version: None,
            license: None,
            author: None,
            description: None,
            intree: false,
        }
    }

    /// 키-값 쌍 (인코딩 순서)
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &'static str)> {
        [
            Some(("name", self.name)),
            self.version.map(|v| ("version", v)),
            self.license.map(|v| ("license", v)),
            self.author.map(|v| ("author", v)),
            self.description.map(|v| ("description", v)),
            self.intree.then_some(("intree", "Y")),
        ]
        .into_iter()
        .flatten()
    }

    /// .modinfo 섹션 바이트로 인코딩
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (key, value) in self.entries() {
            out.extend_from_slice(key.as_bytes());
            out.push(b'=');
            out.extend_from_slice(value.as_bytes());
            out.push(0);
        }
        out
    }

    /// .modinfo 섹션에서 복원 (`name`은 필수)
    pub fn from_modinfo(bytes: &'static [u8]) -> Result<Self, ModuleError> {
        let mut name = None;
        let mut info = Self::new("");
        for entry in parse_modinfo(bytes) {
            let (key, value) = entry?;
            match key {
                "name" => name = Some(value),
                "version" => info.version = Some(value),
                "license" => info.license = Some(value),
                "author" => info.author = Some(value),
                "description" => info.description = Some(value),
                "intree" => info.intree = value == "Y",
                _ => {}
            }
        }
        info.name = name.filter(|n| !n.is_empty()).ok_or(ModuleError::InvalidFormat)?;
        Ok(info)
    }
}

/// .modinfo 엔트리 순회. 빈 엔트리(패딩 NUL)는 건너뛴다.
pub fn parse_modinfo(
    bytes: &[u8],
) -> impl Iterator<Item = Result<(&str, &str), ModuleError>> + '_ {
    bytes
        .split(|&b| b == 0)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let entry = core::str::from_utf8(entry).map_err(|_| ModuleError::InvalidFormat)?;
            entry.split_once('=').ok_or(ModuleError::InvalidFormat)
        })
}

/// 키에 해당하는 첫 번째 값 (modinfo -F)
pub fn modinfo_get<'a>(bytes: &'a [u8], key: &str) -> Option<&'a str> {
    parse_modinfo(bytes)
        .filter_map(Result::ok)
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// `module!`이 만든 .modinfo 문자열을 섹션에 넣을 고정 크기 배열로 복사
pub const fn modinfo_bytes<const N: usize>(s: &str) -> [u8; N] {
    let src = s.as_bytes();
    let mut out = [0u8; N];
    let mut i = 0;
    while i < N && i < src.len() {
        out[i] = src[i];
        i += 1;
    }
    out
}
