use std::path::Path;

use crate::{
    error::{CommonResult, DicomError},
    model::{DataElement, DisplayMode, Record, TagName},
    service, util,
};

/// Values longer than this are summarized by their size instead of dumped.
const MAX_VALUE_LENGTH: usize = 1000;

const ITEM_TAG: &str = "fffe:e000";
const ITEM_DELIMITER_TAG: &str = "fffe:e00d";
const SEQUENCE_DELIMITER_TAG: &str = "fffe:e0dd";

/// Projects one element into its JSON record.
///
/// `Ok(None)` means the element is dropped from the output, which in brief
/// mode happens to item and sequence delimiters.
pub fn dump_element(element: &DataElement, mode: DisplayMode) -> CommonResult<Option<Record>> {
    dump_nested_element(element, mode, 0)
}

pub fn dump_elements(elements: &[DataElement], mode: DisplayMode) -> CommonResult<Vec<Record>> {
    dump_nested_elements(elements, mode, 0)
}

// `depth` counts the `items` lists enclosing the element, as the decoder does
fn dump_nested_element(
    element: &DataElement,
    mode: DisplayMode,
    depth: usize,
) -> CommonResult<Option<Record>> {
    let tag = util::format_tag(element.tag_group.to_u16()?, element.tag_elem);
    log::trace!("dumping {}", tag);

    let mut record = Record {
        tag: Some(tag.clone()),
        ..Default::default()
    };

    if let Some(TagName::Symbol(symbol)) = &element.tag {
        let desc = symbol.strip_prefix(util::SYMBOL_PREFIX).unwrap_or(symbol);
        record.desc = Some(desc.to_string());
    }

    if mode == DisplayMode::Verbose {
        record.vr = element.vr.clone();
    }

    if let Some(value) = &element.value {
        record.value = Some(render_value(value));
    }

    if let Some(items) = &element.items {
        record.items = Some(dump_nested_elements(items, mode, depth + 1)?);
    }

    if mode == DisplayMode::Brief {
        match tag.as_str() {
            // start of item, keep its content but hide the marker
            ITEM_TAG => record.tag = None,
            ITEM_DELIMITER_TAG | SEQUENCE_DELIMITER_TAG => return Ok(None),
            _ => {}
        }
    }

    Ok(Some(record))
}

fn dump_nested_elements(
    elements: &[DataElement],
    mode: DisplayMode,
    depth: usize,
) -> CommonResult<Vec<Record>> {
    if depth > service::MAX_NESTING_DEPTH {
        return Err(DicomError::NestingTooDeep { depth });
    }

    let mut records = Vec::with_capacity(elements.len());

    for element in elements {
        if let Some(record) = dump_nested_element(element, mode, depth)? {
            records.push(record);
        }
    }

    Ok(records)
}

pub fn dump_file(file_path: &Path, mode: DisplayMode) -> CommonResult<Vec<Record>> {
    let data_elements = service::read_file(file_path)?;
    log::info!(
        "{}: {} top-level elements",
        file_path.display(),
        data_elements.len()
    );

    dump_elements(&data_elements, mode)
}

fn render_value(value: &[u8]) -> String {
    if value.len() > MAX_VALUE_LENGTH {
        return format!("({} bytes)", value.len());
    }

    match decode_utf8(value) {
        Some(text) => text,
        None => util::process_vec_to_hex(value),
    }
}

fn decode_utf8(value: &[u8]) -> Option<String> {
    encoding_rs::UTF_8
        .decode_without_bom_handling_and_without_replacement(value)
        .map(|text| text.into_owned())
}
