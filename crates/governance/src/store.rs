// governance/src/store.rs

//! JSON values in contract buckets, seen from a call or from committed state

use blockchain_core::{Amount, BlockchainResult, ContractContext, XMReader};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) const STATUS_BAD_REQUEST: i32 = 400;
pub(crate) const STATUS_FORBIDDEN: i32 = 403;
pub(crate) const STATUS_NOT_FOUND: i32 = 404;
pub(crate) const STATUS_CONFLICT: i32 = 409;

pub(crate) fn arg_str(ctx: &dyn ContractContext, key: &str) -> Option<String> {
    ctx.arg(key)
        .and_then(|v| std::str::from_utf8(v).ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn arg_amount(ctx: &dyn ContractContext, key: &str) -> Option<Amount> {
    arg_str(ctx, key)?.parse().ok()
}

pub(crate) fn arg_u64(ctx: &dyn ContractContext, key: &str) -> Option<u64> {
    arg_str(ctx, key)?.parse().ok()
}

pub(crate) fn get_json<T: DeserializeOwned>(
    ctx: &mut dyn ContractContext,
    bucket: &str,
    key: &str,
) -> BlockchainResult<Option<T>> {
    match ctx.get_object(bucket, key.as_bytes())? {
        Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
        None => Ok(None),
    }
}

pub(crate) fn put_json<T: Serialize>(
    ctx: &mut dyn ContractContext,
    bucket: &str,
    key: &str,
    value: &T,
) -> BlockchainResult<Vec<u8>> {
    let raw = serde_json::to_vec(value)?;
    ctx.put_object(bucket, key.as_bytes(), raw.clone())?;
    Ok(raw)
}

pub(crate) fn read_json<T: DeserializeOwned>(
    reader: &dyn XMReader,
    bucket: &str,
    key: &str,
) -> BlockchainResult<Option<T>> {
    match reader.get(bucket, key.as_bytes())? {
        Some(data) if !data.is_empty() => Ok(Some(serde_json::from_slice(&data.pure_data.value)?)),
        _ => Ok(None),
    }
}
