//! JSON-RPC ledger backend.
//!
//! Reads go through `eth_call` against the account's `getData(bytes32)` /
//! `getDataBatch(bytes32[])` views at the requested block tag. Every request
//! is bounded by the configured timeout; a missing value comes back as empty
//! bytes and is mapped to `None`.

use crate::{LedgerConfig, LedgerError, LedgerResult, LedgerStore, Snapshot, keys_context};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::time::timeout;
use tracing::debug;
use upsync_keys::{Address, DataKey, keccak256};

pub struct HttpLedger {
    client: reqwest::Client,
    config: LedgerConfig,
}

impl HttpLedger {
    pub fn new(config: LedgerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("build http client");
        Self { client, config }
    }

    async fn eth_call(
        &self,
        account: Address,
        calldata: Vec<u8>,
        snapshot: Snapshot,
        keys: &str,
    ) -> LedgerResult<Vec<u8>> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": account.to_hex(), "data": format!("0x{}", hex::encode(&calldata)) },
                snapshot.to_tag(),
            ],
        });

        let started = std::time::Instant::now();
        let request = self.client.post(&self.config.rpc_url).json(&body).send();
        let response = match timeout(self.config.request_timeout, request).await {
            Ok(Ok(r)) => r,
            Ok(Err(e)) if e.is_timeout() => {
                return Err(LedgerError::Timeout {
                    account,
                    keys: keys.to_string(),
                    timeout: self.config.request_timeout,
                });
            }
            Ok(Err(e)) => {
                return Err(LedgerError::Transport {
                    account,
                    keys: keys.to_string(),
                    detail: e.to_string(),
                });
            }
            Err(_) => {
                return Err(LedgerError::Timeout {
                    account,
                    keys: keys.to_string(),
                    timeout: self.config.request_timeout,
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Transport {
                account,
                keys: keys.to_string(),
                detail: format!("http status {status}"),
            });
        }

        let envelope: RpcResponse =
            response
                .json()
                .await
                .map_err(|e| LedgerError::Transport {
                    account,
                    keys: keys.to_string(),
                    detail: format!("read body failed: {e}"),
                })?;

        if let Some(err) = envelope.error {
            return Err(LedgerError::Rpc {
                account,
                keys: keys.to_string(),
                code: err.code,
                message: err.message,
            });
        }
        let result = envelope.result.ok_or_else(|| LedgerError::Decode {
            account,
            keys: keys.to_string(),
            detail: "response has neither result nor error".to_string(),
        })?;
        let raw = result.strip_prefix("0x").unwrap_or(&result);
        let bytes = hex::decode(raw).map_err(|e| LedgerError::Decode {
            account,
            keys: keys.to_string(),
            detail: format!("result is not hex: {e}"),
        })?;
        debug!(
            account = %account,
            keys,
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ledger read"
        );
        Ok(bytes)
    }

    fn decode_err(&self, account: Address, keys: &str, detail: impl Into<String>) -> LedgerError {
        LedgerError::Decode {
            account,
            keys: keys.to_string(),
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl LedgerStore for HttpLedger {
    async fn get_data(
        &self,
        account: Address,
        key: DataKey,
        snapshot: Snapshot,
    ) -> LedgerResult<Option<Vec<u8>>> {
        let ctx = keys_context(&[key]);
        let return_data = self
            .eth_call(account, encode_get_data(key), snapshot, &ctx)
            .await?;
        let value = decode_abi_bytes(&return_data, 0)
            .map_err(|detail| self.decode_err(account, &ctx, detail))?;
        Ok(non_empty(value))
    }

    async fn get_data_batch(
        &self,
        account: Address,
        keys: &[DataKey],
        snapshot: Snapshot,
    ) -> LedgerResult<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let ctx = keys_context(keys);
        let return_data = self
            .eth_call(account, encode_get_data_batch(keys), snapshot, &ctx)
            .await?;
        let values = decode_abi_bytes_array(&return_data)
            .map_err(|detail| self.decode_err(account, &ctx, detail))?;
        if values.len() != keys.len() {
            return Err(self.decode_err(
                account,
                &ctx,
                format!("asked for {} values, got {}", keys.len(), values.len()),
            ));
        }
        Ok(values.into_iter().map(non_empty).collect())
    }
}

fn non_empty(value: Vec<u8>) -> Option<Vec<u8>> {
    if value.is_empty() { None } else { Some(value) }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Calldata for `getData(bytes32)`.
fn encode_get_data(key: DataKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 32);
    out.extend_from_slice(&selector("getData(bytes32)"));
    out.extend_from_slice(key.as_bytes());
    out
}

/// Calldata for `getDataBatch(bytes32[])`.
fn encode_get_data_batch(keys: &[DataKey]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 64 + 32 * keys.len());
    out.extend_from_slice(&selector("getDataBatch(bytes32[])"));
    out.extend_from_slice(&abi_word(32)); // offset of the array argument
    out.extend_from_slice(&abi_word(keys.len() as u64));
    for key in keys {
        out.extend_from_slice(key.as_bytes());
    }
    out
}

fn abi_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn read_word(data: &[u8], at: usize) -> Result<usize, String> {
    let end = at
        .checked_add(32)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| format!("word at offset {at} out of bounds ({} bytes)", data.len()))?;
    let word = &data[at..end];
    if word[..24].iter().any(|b| *b != 0) {
        return Err(format!("word at offset {at} exceeds usize range"));
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(tail) as usize)
}

/// Decode one ABI `bytes` value whose head word sits at `head`.
fn decode_abi_bytes(data: &[u8], head: usize) -> Result<Vec<u8>, String> {
    let offset = read_word(data, head)?;
    let base = head + offset;
    let len = read_word(data, base)?;
    let start = base + 32;
    let end = start
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| format!("bytes of length {len} at offset {start} out of bounds"))?;
    Ok(data[start..end].to_vec())
}

/// Decode an ABI `bytes[]` return value.
fn decode_abi_bytes_array(data: &[u8]) -> Result<Vec<Vec<u8>>, String> {
    let array = read_word(data, 0)?;
    let count = read_word(data, array)?;
    let elements = array + 32;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let offset = read_word(data, elements + 32 * i)?;
        let base = elements + offset;
        let len = read_word(data, base)?;
        let start = base + 32;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= data.len())
            .ok_or_else(|| format!("element {i} of length {len} out of bounds"))?;
        out.push(data[start..end].to_vec());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_data_calldata_layout() {
        let key = upsync_keys::controllers_array_key();
        let calldata = encode_get_data(key);
        // Documented selector of the single-key view.
        assert_eq!(&calldata[..4], &[0x54, 0xf6, 0x12, 0x7f]);
        assert_eq!(&calldata[4..], key.as_bytes());
    }

    #[test]
    fn get_data_batch_calldata_layout() {
        let keys = [
            upsync_keys::controller_element_key(0),
            upsync_keys::controller_element_key(1),
        ];
        let calldata = encode_get_data_batch(&keys);
        assert_eq!(calldata.len(), 4 + 32 + 32 + 64);
        assert_eq!(read_word(&calldata[4..], 0).expect("offset"), 32);
        assert_eq!(read_word(&calldata[4..], 32).expect("count"), 2);
        assert_eq!(&calldata[4 + 64..4 + 96], keys[0].as_bytes());
    }

    fn abi_bytes(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&abi_word(32));
        out.extend_from_slice(&abi_word(payload.len() as u64));
        out.extend_from_slice(payload);
        // right-pad to a word boundary like real return data
        let pad = (32 - payload.len() % 32) % 32;
        out.extend(std::iter::repeat_n(0u8, pad));
        out
    }

    #[test]
    fn decode_bytes_value() {
        let payload = [0xde, 0xad, 0xbe, 0xef];
        let decoded = decode_abi_bytes(&abi_bytes(&payload), 0).expect("decode");
        assert_eq!(decoded, payload);
    }

    #[test]
    fn decode_bytes_rejects_truncation() {
        let mut data = abi_bytes(&[0xde, 0xad, 0xbe, 0xef]);
        data.truncate(40);
        assert!(decode_abi_bytes(&data, 0).is_err());
    }

    #[test]
    fn decode_bytes_array() {
        // bytes[] of ["0xaa", "" , "0xbbcc"], hand-assembled.
        let mut body = Vec::new();
        body.extend_from_slice(&abi_word(3)); // count
        body.extend_from_slice(&abi_word(96)); // offset of element 0
        body.extend_from_slice(&abi_word(160)); // element 1
        body.extend_from_slice(&abi_word(192)); // element 2
        body.extend_from_slice(&abi_word(1));
        body.extend_from_slice(&{
            let mut w = [0u8; 32];
            w[0] = 0xaa;
            w
        });
        body.extend_from_slice(&abi_word(0));
        body.extend_from_slice(&abi_word(2));
        body.extend_from_slice(&{
            let mut w = [0u8; 32];
            w[0] = 0xbb;
            w[1] = 0xcc;
            w
        });

        let mut data = Vec::new();
        data.extend_from_slice(&abi_word(32));
        data.extend_from_slice(&body);

        let decoded = decode_abi_bytes_array(&data).expect("decode");
        assert_eq!(decoded, vec![vec![0xaa], vec![], vec![0xbb, 0xcc]]);
    }
}
