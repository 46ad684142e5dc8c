//! Binary XML manifest decoding
//!
//! Payload manifests are stored as compiled binary XML: a document chunk
//! holding a string pool, a resource-id map and a flat stream of element
//! chunks. Only the identity of the payload is extracted here: package id,
//! version code (including its major half) and split name from the root
//! element, plus the application label when it is a literal string.

use pkgi_errors::{Error, InstallError};

const RES_XML_TYPE: u16 = 0x0003;
const RES_STRING_POOL_TYPE: u16 = 0x0001;
const RES_XML_RESOURCE_MAP_TYPE: u16 = 0x0180;
const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;

const UTF8_FLAG: u32 = 1 << 8;
const NO_INDEX: u32 = u32::MAX;

const TYPE_STRING: u8 = 0x03;
const TYPE_INT_DEC: u8 = 0x10;
const TYPE_INT_HEX: u8 = 0x11;

const ATTR_LABEL: u32 = 0x0101_0001;
const ATTR_VERSION_CODE: u32 = 0x0101_021b;
const ATTR_VERSION_CODE_MAJOR: u32 = 0x0101_0576;

/// Identity decoded from a payload manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestInfo {
    pub package_id: String,
    pub version_code: i64,
    pub split_name: Option<String>,
    pub label: Option<String>,
}

fn invalid(message: impl Into<String>) -> Error {
    InstallError::InvalidManifest {
        message: message.into(),
    }
    .into()
}

fn read_bytes<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], Error> {
    offset
        .checked_add(N)
        .and_then(|end| data.get(offset..end))
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| invalid(format!("truncated at offset {offset}")))
}

fn read_u8(data: &[u8], offset: usize) -> Result<u8, Error> {
    read_bytes::<1>(data, offset).map(|[b]| b)
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, Error> {
    read_bytes(data, offset).map(u16::from_le_bytes)
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, Error> {
    read_bytes(data, offset).map(u32::from_le_bytes)
}

#[derive(Default)]
struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    fn parse(chunk: &[u8]) -> Result<Self, Error> {
        let header_size = read_u16(chunk, 2)? as usize;
        let count = read_u32(chunk, 8)? as usize;
        let flags = read_u32(chunk, 16)?;
        let strings_start = read_u32(chunk, 20)? as usize;
        let utf8 = flags & UTF8_FLAG != 0;

        // The offset table must fit in the chunk before anything is sized from it
        let table_end = count
            .checked_mul(4)
            .and_then(|len| len.checked_add(header_size))
            .filter(|end| *end <= chunk.len())
            .ok_or_else(|| invalid(format!("string pool claims {count} entries")))?;

        let mut strings = Vec::with_capacity(count);
        for at in (header_size..table_end).step_by(4) {
            let offset = strings_start
                .checked_add(read_u32(chunk, at)? as usize)
                .ok_or_else(|| invalid("string pool entry out of bounds"))?;
            let value = if utf8 {
                Self::decode_utf8(chunk, offset)?
            } else {
                Self::decode_utf16(chunk, offset)?
            };
            strings.push(value);
        }
        Ok(Self { strings })
    }

    fn utf8_length(chunk: &[u8], offset: usize) -> Result<(usize, usize), Error> {
        let first = read_u8(chunk, offset)?;
        if first & 0x80 == 0 {
            Ok((first as usize, 1))
        } else {
            let second = read_u8(chunk, offset + 1)?;
            Ok(((((first & 0x7f) as usize) << 8) | second as usize, 2))
        }
    }

    fn decode_utf8(chunk: &[u8], offset: usize) -> Result<String, Error> {
        // UTF-16 length first, then the byte length we actually need
        let (_, skip) = Self::utf8_length(chunk, offset)?;
        let (len, consumed) = Self::utf8_length(chunk, offset + skip)?;
        let start = offset + skip + consumed;
        let bytes = chunk
            .get(start..start.saturating_add(len))
            .ok_or_else(|| invalid("string pool entry out of bounds"))?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn decode_utf16(chunk: &[u8], offset: usize) -> Result<String, Error> {
        let first = read_u16(chunk, offset)?;
        let (len, consumed) = if first & 0x8000 == 0 {
            (first as usize, 2)
        } else {
            let second = read_u16(chunk, offset + 2)?;
            ((((first & 0x7fff) as usize) << 16) | second as usize, 4)
        };
        let start = offset + consumed;
        if start.saturating_add(len.saturating_mul(2)) > chunk.len() {
            return Err(invalid("string pool entry out of bounds"));
        }
        let units = (0..len)
            .map(|i| read_u16(chunk, start + i * 2))
            .collect::<Result<Vec<_>, _>>()?;
        String::from_utf16(&units).map_err(|_| invalid("string pool entry is not valid UTF-16"))
    }

    fn get(&self, index: u32) -> Option<&str> {
        if index == NO_INDEX {
            return None;
        }
        self.strings.get(index as usize).map(String::as_str)
    }
}

struct Attribute {
    name: u32,
    raw_value: u32,
    data_type: u8,
    data: u32,
}

struct Element {
    name: u32,
    attributes: Vec<Attribute>,
}

impl Element {
    fn parse(chunk: &[u8], header_size: usize) -> Result<Self, Error> {
        let name = read_u32(chunk, header_size + 4)?;
        let attr_start = read_u16(chunk, header_size + 8)? as usize;
        let attr_size = read_u16(chunk, header_size + 10)? as usize;
        let attr_count = read_u16(chunk, header_size + 12)? as usize;

        if attr_size < 20 && attr_count > 0 {
            return Err(invalid(format!("attribute size {attr_size} too small")));
        }

        let mut attributes = Vec::with_capacity(attr_count.min(chunk.len() / 20));
        for index in 0..attr_count {
            let base = header_size + attr_start + index * attr_size;
            attributes.push(Attribute {
                name: read_u32(chunk, base + 4)?,
                raw_value: read_u32(chunk, base + 8)?,
                data_type: read_u8(chunk, base + 15)?,
                data: read_u32(chunk, base + 16)?,
            });
        }
        Ok(Self { name, attributes })
    }
}

struct Document {
    strings: StringPool,
    resource_ids: Vec<u32>,
}

impl Document {
    fn attribute_is(&self, attr: &Attribute, resource_id: Option<u32>, name: &str) -> bool {
        if let (Some(id), Some(actual)) = (resource_id, self.resource_ids.get(attr.name as usize)) {
            if *actual == id {
                return true;
            }
        }
        self.strings.get(attr.name) == Some(name)
    }

    fn string_value(&self, attr: &Attribute) -> Option<String> {
        self.strings
            .get(attr.raw_value)
            .or_else(|| {
                (attr.data_type == TYPE_STRING)
                    .then(|| self.strings.get(attr.data))
                    .flatten()
            })
            .map(str::to_string)
    }

    fn int_value(attr: &Attribute) -> Option<u32> {
        matches!(attr.data_type, TYPE_INT_DEC | TYPE_INT_HEX).then_some(attr.data)
    }

    fn find<'a>(
        &self,
        element: &'a Element,
        resource_id: Option<u32>,
        name: &str,
    ) -> Option<&'a Attribute> {
        element
            .attributes
            .iter()
            .find(|attr| self.attribute_is(attr, resource_id, name))
    }
}

/// Decode the identity attributes of a compiled manifest
///
/// # Errors
///
/// Returns [`InstallError::InvalidManifest`] when the document is truncated,
/// is not binary XML, or lacks a package id or version code.
pub fn parse_manifest(data: &[u8]) -> Result<ManifestInfo, Error> {
    if read_u16(data, 0)? != RES_XML_TYPE {
        return Err(invalid("not a binary XML document"));
    }
    let header_size = read_u16(data, 2)? as usize;
    let total = (read_u32(data, 4)? as usize).min(data.len());

    let mut doc = Document {
        strings: StringPool::default(),
        resource_ids: Vec::new(),
    };
    let mut manifest: Option<ManifestInfo> = None;
    let mut offset = header_size;

    while offset + 8 <= total {
        let chunk_type = read_u16(data, offset)?;
        let chunk_header = read_u16(data, offset + 2)? as usize;
        let chunk_size = read_u32(data, offset + 4)? as usize;
        if chunk_size < 8 || offset + chunk_size > total {
            return Err(invalid(format!("bad chunk size {chunk_size} at {offset}")));
        }
        let chunk = &data[offset..offset + chunk_size];

        match chunk_type {
            RES_STRING_POOL_TYPE => doc.strings = StringPool::parse(chunk)?,
            RES_XML_RESOURCE_MAP_TYPE => {
                doc.resource_ids = (chunk_header..chunk_size)
                    .step_by(4)
                    .map(|at| read_u32(chunk, at))
                    .collect::<Result<_, _>>()?;
            }
            RES_XML_START_ELEMENT_TYPE => {
                let element = Element::parse(chunk, chunk_header)?;
                let name = doc.strings.get(element.name).unwrap_or_default();
                match manifest.as_mut() {
                    None if name == "manifest" => manifest = Some(read_root(&doc, &element)?),
                    None => return Err(invalid(format!("unexpected root element <{name}>"))),
                    Some(info) if name == "application" => {
                        info.label = doc
                            .find(&element, Some(ATTR_LABEL), "label")
                            .and_then(|attr| doc.string_value(attr));
                        break;
                    }
                    Some(_) => {}
                }
            }
            _ => {}
        }
        offset += chunk_size;
    }

    manifest.ok_or_else(|| invalid("no <manifest> element"))
}

fn read_root(doc: &Document, element: &Element) -> Result<ManifestInfo, Error> {
    let package_id = doc
        .find(element, None, "package")
        .and_then(|attr| doc.string_value(attr))
        .filter(|p| !p.is_empty())
        .ok_or_else(|| invalid("missing package attribute"))?;

    let minor = doc
        .find(element, Some(ATTR_VERSION_CODE), "versionCode")
        .and_then(Document::int_value)
        .ok_or_else(|| invalid("missing versionCode attribute"))?;
    let major = doc
        .find(element, Some(ATTR_VERSION_CODE_MAJOR), "versionCodeMajor")
        .and_then(Document::int_value)
        .unwrap_or(0);

    let split_name = doc
        .find(element, None, "split")
        .and_then(|attr| doc.string_value(attr))
        .filter(|s| !s.is_empty());

    Ok(ManifestInfo {
        package_id,
        version_code: (i64::from(major) << 32) | i64::from(minor),
        split_name,
        label: None,
    })
}
