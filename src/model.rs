use serde::Serialize;

use crate::error::{CommonResult, DicomError};

/// Tag group as handed over by the decoder.
///
/// The decoder keeps the two raw little-endian bytes it read from the stream;
/// hand-built elements can carry the number directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagGroup {
    Number(u16),
    Packed(Vec<u8>),
}

impl TagGroup {
    pub fn to_u16(&self) -> CommonResult<u16> {
        match self {
            TagGroup::Number(v) => Ok(*v),
            TagGroup::Packed(bytes) => {
                let pair: [u8; 2] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| DicomError::MalformedTagGroup { len: bytes.len() })?;

                Ok(u16::from_le_bytes(pair))
            }
        }
    }
}

/// Name attached to a tag by the decoder.
///
/// Only `Symbol` identifiers come from the keyword table; `Plain` is free text
/// such as the fallback for tags the table does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagName {
    Plain(String),
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataElement {
    pub tag_group: TagGroup,
    pub tag_elem: u16,
    pub tag: Option<TagName>,
    pub vr: Option<String>,
    pub value: Option<Vec<u8>>,
    pub items: Option<Vec<DataElement>>,
}

#[cfg(test)]
impl DataElement {
    pub fn new(tag_group: u16, tag_elem: u16) -> Self {
        DataElement {
            tag_group: TagGroup::Number(tag_group),
            tag_elem,
            tag: None,
            vr: None,
            value: None,
            items: None,
        }
    }

    pub fn with_name(mut self, name: TagName) -> Self {
        self.tag = Some(name);
        self
    }

    pub fn with_vr(mut self, vr: &str) -> Self {
        self.vr = Some(vr.to_string());
        self
    }

    pub fn with_value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_items(mut self, items: Vec<DataElement>) -> Self {
        self.items = Some(items);
        self
    }
}

/// JSON projection of one element; unset fields are left out of the output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Record>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Brief,
    Verbose,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_group_is_little_endian() {
        let group = TagGroup::Packed(vec![0x08, 0x00]);
        assert_eq!(group.to_u16().unwrap(), 0x0008);

        let group = TagGroup::Packed(vec![0xFE, 0xFF]);
        assert_eq!(group.to_u16().unwrap(), 0xFFFE);
    }

    #[test]
    fn packed_group_of_wrong_length_fails() {
        let err = TagGroup::Packed(vec![0x08]).to_u16().unwrap_err();
        assert!(matches!(err, DicomError::MalformedTagGroup { len: 1 }));

        let err = TagGroup::Packed(vec![1, 2, 3]).to_u16().unwrap_err();
        assert!(matches!(err, DicomError::MalformedTagGroup { len: 3 }));
    }

    #[test]
    fn record_skips_unset_fields() {
        let record = Record {
            tag: Some("0008:0010".to_string()),
            value: Some("Bar".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"tag":"0008:0010","value":"Bar"}"#);
        assert_eq!(serde_json::to_string(&Record::default()).unwrap(), "{}");
    }
}
