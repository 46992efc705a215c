/*!
Avro Object Container File framing (spec §4.2, §6.3): 4-byte magic,
a map of header metadata (`avro.schema`, `avro.codec`), a 16-byte random
sync marker, then one or more blocks of `(count, size, payload, sync)`.

Only the `null` codec is implemented; it is the only one spec §4.2 makes
mandatory, and this engine never needs the others for correctness.
*/

use uuid::Uuid;

use crate::error::{IcebergError, Result};

use super::avro_value::{decode, encode, AvroSchema, AvroValue};
use super::varint::{read_varint, write_varint};

const MAGIC: &[u8; 4] = b"Obj\x01";
const SYNC_SIZE: usize = 16;

/// Builds an Avro OCF byte stream from a sequence of records sharing one schema.
///
/// Per spec §4.2, "implementations may emit a single block" — this writer
/// always does, which keeps the format simple without sacrificing
/// conformance.
pub struct ContainerWriter<'a> {
    schema: &'a AvroSchema,
    schema_json: String,
    sync_marker: [u8; SYNC_SIZE],
    records: Vec<Vec<u8>>,
}

impl<'a> ContainerWriter<'a> {
    /// Creates a writer for `schema`. `schema_json` is the schema's JSON
    /// text, stored verbatim in the `avro.schema` header key.
    pub fn new(schema: &'a AvroSchema) -> Self {
        let sync_marker: [u8; SYNC_SIZE] = *Uuid::new_v4().as_bytes();
        ContainerWriter {
            schema_json: schema.to_json().to_string(),
            schema,
            sync_marker,
            records: Vec::new(),
        }
    }

    /// Encodes `value` against the container's schema and appends it as the
    /// next record of the single block [finish](Self::finish) will emit.
    pub fn append(&mut self, value: &AvroValue) -> Result<()> {
        let mut buf = Vec::new();
        encode(self.schema, value, &mut buf)?;
        self.records.push(buf);
        Ok(())
    }

    /// Serializes the full container: header plus one block holding every
    /// appended record.
    pub fn finish(self, user_metadata: &[(&str, &str)]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);

        let mut meta: Vec<(String, Vec<u8>)> = vec![
            ("avro.schema".to_string(), self.schema_json.into_bytes()),
            ("avro.codec".to_string(), b"null".to_vec()),
        ];
        for (k, v) in user_metadata {
            meta.push((k.to_string(), v.as_bytes().to_vec()));
        }
        write_map_header(&meta, &mut out);
        out.extend_from_slice(&self.sync_marker);

        if !self.records.is_empty() {
            let payload: Vec<u8> = self.records.concat();
            write_varint(self.records.len() as i64, &mut out);
            write_varint(payload.len() as i64, &mut out);
            out.extend_from_slice(&payload);
            out.extend_from_slice(&self.sync_marker);
        }
        out
    }
}

fn write_map_header(entries: &[(String, Vec<u8>)], out: &mut Vec<u8>) {
    if !entries.is_empty() {
        write_varint(entries.len() as i64, out);
        for (k, v) in entries {
            write_varint(k.len() as i64, out);
            out.extend_from_slice(k.as_bytes());
            write_varint(v.len() as i64, out);
            out.extend_from_slice(v);
        }
    }
    write_varint(0, out);
}

/// Parses an Avro OCF byte stream and exposes its header metadata and records.
pub struct ContainerReader {
    /// Header metadata key/value pairs, including `avro.schema`/`avro.codec`.
    pub metadata: Vec<(String, Vec<u8>)>,
    records_payload: Vec<u8>,
}

impl ContainerReader {
    /// Parses `bytes` as an Avro OCF container. Does not decode records —
    /// call [ContainerReader::read_records] with the schema used to write them.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
            return Err(IcebergError::InvalidInput(
                "not an Avro container file: bad magic".to_string(),
            ));
        }
        let mut pos = MAGIC.len();
        let metadata = read_map_header(bytes, &mut pos)?;
        if bytes.len() < pos + SYNC_SIZE {
            return Err(IcebergError::InvalidInput("truncated sync marker".to_string()));
        }
        let sync_marker: [u8; SYNC_SIZE] = bytes[pos..pos + SYNC_SIZE].try_into().unwrap();
        pos += SYNC_SIZE;

        let has_null_codec = metadata
            .iter()
            .find(|(k, _)| k == "avro.codec")
            .map(|(_, v)| v.as_slice() == b"null")
            .unwrap_or(true);
        if !has_null_codec {
            return Err(IcebergError::InvalidInput(
                "only the null codec is supported".to_string(),
            ));
        }

        let mut records_payload = Vec::new();
        while pos < bytes.len() {
            let _count = read_varint(bytes, &mut pos)?;
            let size = read_varint(bytes, &mut pos)? as usize;
            let block = bytes
                .get(pos..pos + size)
                .ok_or_else(|| IcebergError::InvalidInput("truncated block payload".to_string()))?;
            records_payload.extend_from_slice(block);
            pos += size;
            let marker = bytes
                .get(pos..pos + SYNC_SIZE)
                .ok_or_else(|| IcebergError::InvalidInput("truncated block sync marker".to_string()))?;
            if marker != sync_marker {
                return Err(IcebergError::InvalidInput(
                    "block sync marker mismatch".to_string(),
                ));
            }
            pos += SYNC_SIZE;
        }

        Ok(ContainerReader {
            metadata,
            records_payload,
        })
    }

    /// Looks up a header metadata value by key, decoded as UTF-8.
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| String::from_utf8(v.clone()).ok())
    }

    /// Decodes every record in the container using `schema`.
    pub fn read_records(&self, schema: &AvroSchema) -> Result<Vec<AvroValue>> {
        let mut pos = 0;
        let mut out = Vec::new();
        while pos < self.records_payload.len() {
            out.push(decode(schema, &self.records_payload, &mut pos)?);
        }
        Ok(out)
    }
}

fn read_map_header(bytes: &[u8], pos: &mut usize) -> Result<Vec<(String, Vec<u8>)>> {
    let mut out = Vec::new();
    loop {
        let count = read_varint(bytes, pos)?;
        if count == 0 {
            break;
        }
        let n = count.unsigned_abs();
        if count < 0 {
            let _size = read_varint(bytes, pos)?;
        }
        for _ in 0..n {
            let klen = read_varint(bytes, pos)? as usize;
            let key = bytes
                .get(*pos..*pos + klen)
                .ok_or_else(|| IcebergError::InvalidInput("truncated header key".to_string()))?;
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| IcebergError::InvalidInput(e.to_string()))?;
            *pos += klen;
            let vlen = read_varint(bytes, pos)? as usize;
            let value = bytes
                .get(*pos..*pos + vlen)
                .ok_or_else(|| IcebergError::InvalidInput("truncated header value".to_string()))?
                .to_vec();
            *pos += vlen;
            out.push((key, value));
        }
    }
    Ok(out)
}
