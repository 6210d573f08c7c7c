//! 커널 로그 링 버퍼 (dmesg)
//!
//! 고정 크기 배열 기반 순환 버퍼.
//! 엔트리 포맷: [4:length][1:level][8:seq][N:msg]

use alloc::string::String;
use alloc::vec::Vec;

use super::{LogLevel, LogRecord};

const ENTRY_HEADER_SIZE: usize = 13; // 4 + 1 + 8

pub(super) struct RingBuffer<const N: usize> {
    buffer: [u8; N],
    /// 다음 쓰기 위치 (모듈러 N)
    write_pos: usize,
    /// 가장 오래된 유효 엔트리의 시작 위치
    read_pos: usize,
    /// 유효 데이터 바이트 수
    used: usize,
}

impl<const N: usize> RingBuffer<N> {
    pub(super) const fn new() -> Self {
        Self {
            buffer: [0u8; N],
            write_pos: 0,
            read_pos: 0,
            used: 0,
        }
    }

    pub(super) fn append(&mut self, level: LogLevel, seq: u64, msg: &str) {
        let msg_bytes = msg.as_bytes();
        let total_len = ENTRY_HEADER_SIZE + msg_bytes.len();

        // 버퍼 절반보다 큰 메시지는 무시
        if total_len > N / 2 {
            return;
        }

        // 자리가 날 때까지 가장 오래된 엔트리부터 버림
        while N - self.used < total_len {
            let oldest = self.entry_len_at(self.read_pos);
            self.read_pos = (self.read_pos + oldest) % N;
            self.used -= oldest;
        }

        self.write_bytes(&(total_len as u32).to_le_bytes());
        self.write_bytes(&[level as u8]);
        self.write_bytes(&seq.to_le_bytes());
        self.write_bytes(msg_bytes);
        self.used += total_len;
    }

    pub(super) fn records(&self) -> Vec<LogRecord> {
        let mut records = Vec::new();
        let mut offset = 0;
        while offset + ENTRY_HEADER_SIZE <= self.used {
            let start = (self.read_pos + offset) % N;
            let total_len = self.entry_len_at(start);
            if total_len < ENTRY_HEADER_SIZE || offset + total_len > self.used {
                break;
            }

            let level = LogLevel::from_u8(self.byte_at(start + 4));
            let mut seq_bytes = [0u8; 8];
            self.read_into(start + 5, &mut seq_bytes);
            let seq = u64::from_le_bytes(seq_bytes);

            let mut msg = alloc::vec![0u8; total_len - ENTRY_HEADER_SIZE];
            self.read_into(start + ENTRY_HEADER_SIZE, &mut msg);
            let text = String::from_utf8(msg).unwrap_or_else(|e| {
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            });

            records.push(LogRecord { seq, level, text });
            offset += total_len;
        }
        records
    }

    pub(super) fn clear(&mut self) {
        self.write_pos = 0;
        self.read_pos = 0;
        self.used = 0;
    }

    fn entry_len_at(&self, pos: usize) -> usize {
        let mut len_bytes = [0u8; 4];
        self.read_into(pos, &mut len_bytes);
        u32::from_le_bytes(len_bytes) as usize
    }

    fn byte_at(&self, pos: usize) -> u8 {
        self.buffer[pos % N]
    }

    fn read_into(&self, pos: usize, out: &mut [u8]) {
        for (i, b) in out.iter_mut().enumerate() {
            *b = self.byte_at(pos + i);
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.buffer[self.write_pos] = byte;
            self.write_pos += 1;
            if self.write_pos >= N {
                self.write_pos = 0;
            }
        }
    }
}
