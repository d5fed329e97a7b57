use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::core::{IndexValue, PartitionId};
use crate::error::{IndexError, Result};
use crate::index::ValueMap;

/// 索引文件 Header
const MAGIC: u32 = 0xD51D_0001;
const VERSION_CURRENT: u32 = 1;
const HEADER_SIZE: usize = 4 + 4 + 4 + 8; // magic + version + data_len + checksum

/// 持久化二级索引的 body（bincode）。
///
/// entries 按 value 升序写出，相同内容总是编码成相同字节。
#[derive(Serialize, Deserialize)]
struct IndexFileBody {
    column: String,
    entries: Vec<(IndexValue, Vec<PartitionId>)>,
}

/// 编码：header + bincode body。
pub fn encode_index(column: &str, values: &ValueMap) -> Result<Vec<u8>> {
    let body = IndexFileBody {
        column: column.to_string(),
        entries: values.to_entries(),
    };
    let body = bincode::serialize(&body)
        .map_err(|e| IndexError::InvalidArgument(format!("encode index `{column}`: {e}")))?;
    let data_len: u32 = body.len().try_into().map_err(|_| {
        IndexError::InvalidArgument(format!("index `{column}` too large (>{} bytes)", u32::MAX))
    })?;

    let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.extend_from_slice(&VERSION_CURRENT.to_le_bytes());
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(&xxh3_64(&body).to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// 解码并校验 magic/version/data_len/checksum，以及文件里的列名与请求的列一致。
///
/// `key` 只用于错误信息。
pub fn decode_index(key: &str, expected_column: &str, data: &[u8]) -> Result<ValueMap> {
    if data.len() < HEADER_SIZE {
        return Err(IndexError::corrupt(key, "artifact shorter than header"));
    }

    let magic = u32::from_le_bytes(read4(data, 0));
    let version = u32::from_le_bytes(read4(data, 4));
    let data_len = u32::from_le_bytes(read4(data, 8)) as usize;
    let mut checksum = [0u8; 8];
    checksum.copy_from_slice(&data[12..20]);
    let stored_checksum = u64::from_le_bytes(checksum);

    if magic != MAGIC {
        return Err(IndexError::corrupt(
            key,
            format!("magic mismatch: {:#x} != {:#x}", magic, MAGIC),
        ));
    }
    if version != VERSION_CURRENT {
        return Err(IndexError::corrupt(
            key,
            format!("unsupported version {version}"),
        ));
    }

    let body = &data[HEADER_SIZE..];
    if body.len() != data_len {
        return Err(IndexError::corrupt(
            key,
            format!("data length mismatch: {} != {}", body.len(), data_len),
        ));
    }

    let computed = xxh3_64(body);
    if computed != stored_checksum {
        return Err(IndexError::corrupt(
            key,
            format!("checksum mismatch: {:#x} != {:#x}", computed, stored_checksum),
        ));
    }

    let body: IndexFileBody = bincode::deserialize(body)
        .map_err(|e| IndexError::corrupt(key, format!("deserialize failed: {e}")))?;
    if body.column != expected_column {
        return Err(IndexError::corrupt(
            key,
            format!(
                "column mismatch: artifact holds `{}`, expected `{}`",
                body.column, expected_column
            ),
        ));
    }

    Ok(ValueMap::from_entries(body.entries))
}

fn read4(data: &[u8], at: usize) -> [u8; 4] {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[at..at + 4]);
    buf
}
