use std::{io::Read, path::Path};

use crate::{
    error::{CommonResult, DicomError},
    model::{DataElement, TagGroup, TagName},
    util,
};

const PREAMBLE_LENGTH: usize = 128;
const PREFIX: &[u8] = b"DICM";

const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

const META_GROUP: u16 = 0x0002;
const TRANSFER_SYNTAX_ELEM: u16 = 0x0010;

/// Deepest `items` nesting accepted, counting sequence and item levels alike.
pub const MAX_NESTING_DEPTH: usize = 256;

const DELIMITER_GROUP: u16 = 0xFFFE;
const ITEM: u16 = 0xE000;
const ITEM_DELIMITER: u16 = 0xE00D;
const SEQUENCE_DELIMITER: u16 = 0xE0DD;

// Implicit VR little endian, explicit VR big endian and deflated explicit VR
// little endian; everything else keeps the dataset in explicit VR little endian
const REJECTED_TRANSFER_SYNTAXES: [&str; 3] = [
    "1.2.840.10008.1.2",
    "1.2.840.10008.1.2.2",
    "1.2.840.10008.1.2.1.99",
];

pub fn read_file(file_path: &Path) -> CommonResult<Vec<DataElement>> {
    let mut file = util::get_file(file_path)?;

    let mut file_content = Vec::new();
    file.read_to_end(&mut file_content)?;

    read_elements(&file_content)
}

/// Decodes a whole Part 10 file: preamble, `DICM` prefix, then every element
/// of the meta header and the dataset in file order.
pub fn read_elements(file_content: &[u8]) -> CommonResult<Vec<DataElement>> {
    let mut offset = 0;

    offset += get_preamble(file_content)?;
    offset += get_prefix(file_content, offset)?;

    let mut data_elements = Vec::new();
    let mut transfer_syntax_checked = false;

    while offset < file_content.len() {
        if !transfer_syntax_checked {
            let (group, _) = peek_tag(file_content, offset)?;

            if group != META_GROUP {
                check_transfer_syntax(&data_elements)?;
                transfer_syntax_checked = true;
            }
        }

        let (data_element, consumed_bytes) = get_data_element(file_content, offset)?;
        offset += consumed_bytes;

        data_elements.push(data_element);
    }

    Ok(data_elements)
}

pub fn get_preamble(buffer: &[u8]) -> CommonResult<usize> {
    take(buffer, 0, PREAMBLE_LENGTH)?;

    Ok(PREAMBLE_LENGTH)
}

pub fn get_prefix(buffer: &[u8], offset: usize) -> CommonResult<usize> {
    let prefix = take(buffer, offset, PREFIX.len())?;

    if prefix != PREFIX {
        return Err(DicomError::InvalidPrefix(prefix.to_vec()));
    }

    Ok(PREFIX.len())
}

fn check_transfer_syntax(data_elements: &[DataElement]) -> CommonResult<()> {
    let Some(value) = get_data_element_via_tag(data_elements, META_GROUP, TRANSFER_SYNTAX_ELEM)
        .and_then(|e| e.value.as_deref())
    else {
        log::debug!("no transfer syntax in meta header, assuming explicit VR little endian");
        return Ok(());
    };

    let transfer_syntax = util::trim_padding(value);
    log::debug!("transfer syntax: {}", transfer_syntax);

    if REJECTED_TRANSFER_SYNTAXES.contains(&transfer_syntax.as_str()) {
        return Err(DicomError::UnsupportedTransferSyntax(transfer_syntax));
    }

    Ok(())
}

pub fn get_data_element_via_tag(
    data_elements: &[DataElement],
    group: u16,
    elem: u16,
) -> Option<&DataElement> {
    data_elements
        .iter()
        .find(|e| e.tag_elem == elem && e.tag_group.to_u16().ok() == Some(group))
}

/// Decodes one explicit VR little endian element starting at `offset`.
///
/// Returns the element and the number of bytes it occupied, nested sequence
/// content included. Offsets stay absolute to `buffer` so errors point into the
/// file.
pub fn get_data_element(buffer: &[u8], offset: usize) -> CommonResult<(DataElement, usize)> {
    get_nested_element(buffer, offset, 0)
}

// `depth` is the number of `items` lists enclosing the element
fn get_nested_element(
    buffer: &[u8],
    offset: usize,
    depth: usize,
) -> CommonResult<(DataElement, usize)> {
    let (group, elem) = peek_tag(buffer, offset)?;
    let mut length = 4;

    let mut data_element = new_element(buffer, offset, elem)?;

    // Item and delimiter tags carry no VR, only a 4 byte length
    if group == DELIMITER_GROUP {
        let value_length = read_u32(buffer, offset + length)?;
        length += 4;

        if value_length != UNDEFINED_LENGTH {
            let value = take(buffer, offset + length, value_length as usize)?;
            data_element.value = Some(value.to_vec());
            length += value_length as usize;
        }

        return Ok((data_element, length));
    }

    let vr = util::process_vec_to_vr(take(buffer, offset + length, 2)?);
    length += 2;

    if !util::is_known_vr(&vr) {
        return Err(DicomError::UnknownVr {
            tag: util::format_tag(group, elem),
            vr,
        });
    }

    let value_length = if util::has_long_length(&vr) {
        // skip the 2 reserved bytes
        length += 2;
        let value_length = read_u32(buffer, offset + length)?;
        length += 4;
        value_length
    } else {
        let value_length = read_u16(buffer, offset + length)? as u32;
        length += 2;
        value_length
    };

    if vr == "SQ" {
        let (items, consumed_bytes) =
            parse_sq_data(buffer, offset + length, value_length, depth + 1)?;
        log::debug!(
            "sequence {} holds {} entries",
            util::format_tag(group, elem),
            items.len()
        );

        data_element.items = Some(items);
        length += consumed_bytes;
    } else if value_length == UNDEFINED_LENGTH {
        let (fragments, consumed_bytes) =
            parse_encapsulated_data(buffer, offset + length, depth + 1)?;

        data_element.items = Some(fragments);
        length += consumed_bytes;
    } else {
        let value = take(buffer, offset + length, value_length as usize)?;

        data_element.value = Some(value.to_vec());
        length += value_length as usize;
    }

    data_element.vr = Some(vr);

    Ok((data_element, length))
}

// https://dicom.nema.org/dicom/2013/output/chtml/part05/sect_7.5.html
fn parse_sq_data(
    buffer: &[u8],
    offset: usize,
    value_length: u32,
    depth: usize,
) -> CommonResult<(Vec<DataElement>, usize)> {
    check_depth(depth)?;

    let mut items = Vec::new();
    let mut cursor = offset;

    if value_length == UNDEFINED_LENGTH {
        loop {
            if peek_tag(buffer, cursor)? == (DELIMITER_GROUP, SEQUENCE_DELIMITER) {
                let (delimiter, consumed_bytes) = get_nested_element(buffer, cursor, depth)?;
                items.push(delimiter);
                cursor += consumed_bytes;
                break;
            }

            let (item, consumed_bytes) = parse_sq_item(buffer, cursor, depth)?;
            items.push(item);
            cursor += consumed_bytes;
        }
    } else {
        let end = offset + value_length as usize;
        let bounded = take(buffer, 0, end)?;

        while cursor < end {
            let (item, consumed_bytes) = parse_sq_item(bounded, cursor, depth)?;
            items.push(item);
            cursor += consumed_bytes;
        }
    }

    Ok((items, cursor - offset))
}

fn parse_sq_item(
    buffer: &[u8],
    offset: usize,
    depth: usize,
) -> CommonResult<(DataElement, usize)> {
    let (group, elem) = peek_tag(buffer, offset)?;

    if (group, elem) != (DELIMITER_GROUP, ITEM) {
        return Err(DicomError::InvalidItemTag {
            tag: util::format_tag(group, elem),
        });
    }

    check_depth(depth + 1)?;

    let mut item = new_element(buffer, offset, elem)?;
    let item_length = read_u32(buffer, offset + 4)?;

    let mut cursor = offset + 8;
    let mut sub_elements = Vec::new();

    if item_length == UNDEFINED_LENGTH {
        loop {
            let tag = peek_tag(buffer, cursor)?;

            let (data_element, consumed_bytes) = get_nested_element(buffer, cursor, depth + 1)?;
            sub_elements.push(data_element);
            cursor += consumed_bytes;

            if tag == (DELIMITER_GROUP, ITEM_DELIMITER) {
                break;
            }
        }
    } else {
        let end = cursor + item_length as usize;
        let bounded = take(buffer, 0, end)?;

        while cursor < end {
            let (data_element, consumed_bytes) = get_nested_element(bounded, cursor, depth + 1)?;
            sub_elements.push(data_element);
            cursor += consumed_bytes;
        }
    }

    item.items = Some(sub_elements);

    Ok((item, cursor - offset))
}

// Encapsulated pixel data: a basic offset table item, one item per fragment,
// then a sequence delimiter
fn parse_encapsulated_data(
    buffer: &[u8],
    offset: usize,
    depth: usize,
) -> CommonResult<(Vec<DataElement>, usize)> {
    check_depth(depth)?;

    let mut fragments = Vec::new();
    let mut cursor = offset;

    loop {
        let tag = peek_tag(buffer, cursor)?;

        if tag != (DELIMITER_GROUP, ITEM) && tag != (DELIMITER_GROUP, SEQUENCE_DELIMITER) {
            return Err(DicomError::InvalidItemTag {
                tag: util::format_tag(tag.0, tag.1),
            });
        }

        let (fragment, consumed_bytes) = get_nested_element(buffer, cursor, depth)?;
        fragments.push(fragment);
        cursor += consumed_bytes;

        if tag == (DELIMITER_GROUP, SEQUENCE_DELIMITER) {
            break;
        }
    }

    Ok((fragments, cursor - offset))
}

fn check_depth(depth: usize) -> CommonResult<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DicomError::NestingTooDeep { depth });
    }

    Ok(())
}

fn new_element(buffer: &[u8], offset: usize, elem: u16) -> CommonResult<DataElement> {
    let group_bytes = take(buffer, offset, 2)?;
    let tag_group = TagGroup::Packed(group_bytes.to_vec());
    let tag: TagName = util::get_tag_name(tag_group.to_u16()?, elem);

    Ok(DataElement {
        tag_group,
        tag_elem: elem,
        tag: Some(tag),
        vr: None,
        value: None,
        items: None,
    })
}

fn take(buffer: &[u8], offset: usize, length: usize) -> CommonResult<&[u8]> {
    offset
        .checked_add(length)
        .and_then(|end| buffer.get(offset..end))
        .ok_or(DicomError::Truncated {
            offset,
            needed: offset.saturating_add(length).saturating_sub(buffer.len()),
        })
}

fn read_u16(buffer: &[u8], offset: usize) -> CommonResult<u16> {
    let bytes = take(buffer, offset, 2)?;

    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(buffer: &[u8], offset: usize) -> CommonResult<u32> {
    let bytes = take(buffer, offset, 4)?;

    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn peek_tag(buffer: &[u8], offset: usize) -> CommonResult<(u16, u16)> {
    Ok((read_u16(buffer, offset)?, read_u16(buffer, offset + 2)?))
}
