//! Conversions between wire messages and core beans.

use bex_core::{BlockInfo, Counter, FileRecord, FileType};

use crate::proto;
use crate::{Error, Result};

pub fn counter_to_wire(counter: Counter) -> proto::Counter {
    proto::Counter {
        id: counter.id,
        value: counter.value,
    }
}

pub fn counter_from_wire(counter: &proto::Counter) -> Counter {
    Counter {
        id: counter.id,
        value: counter.value,
    }
}

pub fn block_to_wire(block: &BlockInfo) -> proto::BlockInfo {
    proto::BlockInfo {
        offset: block.offset as i64,
        size: block.size as i32,
        hash: block.hash.to_vec(),
    }
}

pub fn block_from_wire(block: &proto::BlockInfo) -> Result<BlockInfo> {
    let hash: [u8; 32] = block
        .hash
        .as_slice()
        .try_into()
        .map_err(|_| Error::InvalidRecord(format!("block hash is {} bytes", block.hash.len())))?;
    Ok(BlockInfo {
        offset: block.offset as u64,
        size: block.size as u32,
        hash,
    })
}

pub fn file_type_to_wire(file_type: FileType) -> proto::FileInfoType {
    match file_type {
        FileType::File => proto::FileInfoType::File,
        FileType::Directory => proto::FileInfoType::Directory,
    }
}

/// Rebuilds a domain record from an announced `FileInfo`.
pub fn record_from_wire(folder: &str, file: &proto::FileInfo) -> Result<FileRecord> {
    let file_type = match proto::FileInfoType::try_from(file.r#type) {
        Ok(proto::FileInfoType::File) => FileType::File,
        Ok(proto::FileInfoType::Directory) => FileType::Directory,
        Err(_) => {
            return Err(Error::InvalidRecord(format!(
                "unknown file type {}",
                file.r#type
            )))
        }
    };
    let blocks = file
        .blocks
        .iter()
        .map(block_from_wire)
        .collect::<Result<Vec<_>>>()?;
    let version = file
        .version
        .as_ref()
        .map(|v| v.counters.iter().map(counter_from_wire).collect())
        .unwrap_or_default();
    Ok(FileRecord {
        folder: folder.to_string(),
        name: file.name.clone(),
        file_type,
        size: file.size as u64,
        modified_s: file.modified_s,
        modified_ns: file.modified_ns,
        deleted: file.deleted,
        no_permissions: file.no_permissions,
        version,
        sequence: file.sequence as u64,
        blocks,
    })
}
