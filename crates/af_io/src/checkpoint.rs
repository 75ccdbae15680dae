// crates/af_io/src/checkpoint.rs

//! 重启快照
//!
//! 带版本的二进制记录，支持中断续算：
//!
//! ```text
//! [魔数: 4 bytes] "AFRS"
//! [版本: u32]
//! [字节序标记: u32] 0x01020304
//! [守恒变量个数 n_var: u32]
//! [湍流变量个数 n_turb: u32]
//! [单元数: u64]
//! [迭代计数: u64]
//! [当前 CFL: f64]
//! [物理时间: f64]
//! [守恒变量: n_cells * n_var * f64]
//! [湍流变量: n_cells * n_turb * f64]
//! [CRC32: u32]
//! ```
//!
//! 全部负载为本机小端裸 double；加载时校验魔数、版本、
//! 字节序、规模与 CRC。

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{IoError, IoResult};

const MAGIC: &[u8; 4] = b"AFRS";
const VERSION: u32 = 1;
const ENDIAN_MARK: u32 = 0x0102_0304;

/// 重启快照
#[derive(Debug, Clone)]
pub struct Checkpoint {
    /// 守恒变量个数
    pub n_var: usize,
    /// 湍流变量个数
    pub n_turb: usize,
    /// 单元数
    pub n_cells: usize,
    /// 迭代计数
    pub iteration: u64,
    /// 保存时的 CFL
    pub cfl: f64,
    /// 物理时间 [s]
    pub time: f64,
    /// 守恒变量，n_cells * n_var
    pub conservative: Vec<f64>,
    /// 湍流变量，n_cells * n_turb
    pub turbulence: Vec<f64>,
}

impl Checkpoint {
    /// 保存到文件
    pub fn save(&self, path: &Path) -> IoResult<()> {
        debug_assert_eq!(self.conservative.len(), self.n_cells * self.n_var);
        debug_assert_eq!(self.turbulence.len(), self.n_cells * self.n_turb);

        let mut writer = BufWriter::new(File::create(path)?);
        let mut crc = Crc32::new();

        let emit = |writer: &mut BufWriter<File>, crc: &mut Crc32, bytes: &[u8]| -> IoResult<()> {
            crc.update(bytes);
            writer.write_all(bytes)?;
            Ok(())
        };

        emit(&mut writer, &mut crc, MAGIC)?;
        emit(&mut writer, &mut crc, &VERSION.to_le_bytes())?;
        emit(&mut writer, &mut crc, &ENDIAN_MARK.to_le_bytes())?;
        emit(&mut writer, &mut crc, &(self.n_var as u32).to_le_bytes())?;
        emit(&mut writer, &mut crc, &(self.n_turb as u32).to_le_bytes())?;
        emit(&mut writer, &mut crc, &(self.n_cells as u64).to_le_bytes())?;
        emit(&mut writer, &mut crc, &self.iteration.to_le_bytes())?;
        emit(&mut writer, &mut crc, &self.cfl.to_le_bytes())?;
        emit(&mut writer, &mut crc, &self.time.to_le_bytes())?;
        emit(&mut writer, &mut crc, bytemuck::cast_slice(&self.conservative))?;
        emit(&mut writer, &mut crc, bytemuck::cast_slice(&self.turbulence))?;

        writer.write_all(&crc.finish().to_le_bytes())?;
        writer.flush()?;
        tracing::debug!(path = %path.display(), iteration = self.iteration, "重启快照已写出");
        Ok(())
    }

    /// 从文件加载
    pub fn load(path: &Path) -> IoResult<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut crc = Crc32::new();

        let take = |reader: &mut BufReader<File>, crc: &mut Crc32, n: usize| -> IoResult<Vec<u8>> {
            let mut buf = vec![0u8; n];
            reader.read_exact(&mut buf)?;
            crc.update(&buf);
            Ok(buf)
        };

        let magic = take(&mut reader, &mut crc, 4)?;
        if magic != MAGIC {
            return Err(IoError::Format("魔数不匹配，不是 AeroFVM 重启文件".into()));
        }
        let version = read_u32(&take(&mut reader, &mut crc, 4)?);
        if version != VERSION {
            return Err(IoError::Version {
                file: version,
                current: VERSION,
            });
        }
        let endian = read_u32(&take(&mut reader, &mut crc, 4)?);
        if endian != ENDIAN_MARK {
            return Err(IoError::Endianness(endian));
        }

        let n_var = read_u32(&take(&mut reader, &mut crc, 4)?) as usize;
        let n_turb = read_u32(&take(&mut reader, &mut crc, 4)?) as usize;
        let n_cells = read_u64(&take(&mut reader, &mut crc, 8)?) as usize;
        let iteration = read_u64(&take(&mut reader, &mut crc, 8)?);
        let cfl = read_f64(&take(&mut reader, &mut crc, 8)?);
        let time = read_f64(&take(&mut reader, &mut crc, 8)?);

        let cons_bytes = take(&mut reader, &mut crc, n_cells * n_var * 8)?;
        let turb_bytes = take(&mut reader, &mut crc, n_cells * n_turb * 8)?;
        // pod_collect_to_vec 拷贝重组，对输入字节对齐无要求
        let conservative: Vec<f64> = bytemuck::pod_collect_to_vec(&cons_bytes);
        let turbulence: Vec<f64> = bytemuck::pod_collect_to_vec(&turb_bytes);

        let expected = crc.finish();
        let mut trailer = [0u8; 4];
        reader.read_exact(&mut trailer)?;
        let found = u32::from_le_bytes(trailer);
        if expected != found {
            return Err(IoError::Checksum { expected, found });
        }

        Ok(Self {
            n_var,
            n_turb,
            n_cells,
            iteration,
            cfl,
            time,
            conservative,
            turbulence,
        })
    }

    /// 校验与目标求解规模一致
    pub fn check_compatible(&self, n_cells: usize, n_var: usize, n_turb: usize) -> IoResult<()> {
        if self.n_cells != n_cells {
            return Err(IoError::Mismatch {
                what: "单元数",
                expected: n_cells,
                found: self.n_cells,
            });
        }
        if self.n_var != n_var {
            return Err(IoError::Mismatch {
                what: "守恒变量个数",
                expected: n_var,
                found: self.n_var,
            });
        }
        if self.n_turb != n_turb {
            return Err(IoError::Mismatch {
                what: "湍流变量个数",
                expected: n_turb,
                found: self.n_turb,
            });
        }
        Ok(())
    }
}

#[inline]
fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes(bytes[..4].try_into().expect("长度已校验"))
}

#[inline]
fn read_u64(bytes: &[u8]) -> u64 {
    u64::from_le_bytes(bytes[..8].try_into().expect("长度已校验"))
}

#[inline]
fn read_f64(bytes: &[u8]) -> f64 {
    f64::from_le_bytes(bytes[..8].try_into().expect("长度已校验"))
}

/// CRC-32 (IEEE 802.3)，逐字节位反转实现
struct Crc32 {
    state: u32,
}

impl Crc32 {
    fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    fn update(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u32;
            for _ in 0..8 {
                let mask = (self.state & 1).wrapping_neg();
                self.state = (self.state >> 1) ^ (0xEDB8_8320 & mask);
            }
        }
    }

    fn finish(&self) -> u32 {
        !self.state
    }
}
