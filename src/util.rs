use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    path::Path,
};

use regex::Regex;

use crate::{error::CommonResult, model::TagName};

/// Namespace the keyword table puts in front of every symbolic tag name.
pub const SYMBOL_PREFIX: &str = "tags_";

pub fn get_file(file_path: &Path) -> CommonResult<File> {
    let f = OpenOptions::new().read(true).open(file_path)?;

    Ok(f)
}

// Two uppercase hex digits per byte, separated by a single space
pub fn process_vec_to_hex(buffer: &[u8]) -> String {
    let result = buffer
        .iter()
        .map(|ele| format!("{:02X}", ele))
        .collect::<Vec<String>>();

    result.join(" ")
}

pub fn process_vec_to_vr(buffer: &[u8]) -> String {
    buffer.iter().map(|ele| *ele as char).collect()
}

pub fn format_tag(group: u16, elem: u16) -> String {
    format!("{:04x}:{:04x}", group, elem)
}

// https://dicom.nema.org/dicom/2013/output/chtml/part05/sect_6.2.html
const VR_CODES: [&str; 34] = [
    "AE", "AS", "AT", "CS", "DA", "DS", "DT", "FL", "FD", "IS", "LO", "LT", "OB", "OD", "OF", "OL",
    "OV", "OW", "PN", "SH", "SL", "SQ", "SS", "ST", "SV", "TM", "UC", "UI", "UL", "UN", "UR", "US",
    "UT", "UV",
];

pub fn is_known_vr(vr: &str) -> bool {
    VR_CODES.contains(&vr)
}

// These VRs are followed by 2 reserved bytes and a 4 byte length,
// every other explicit VR uses a 2 byte length
// https://dicom.nema.org/dicom/2013/output/chtml/part05/sect_7.1.html
pub fn has_long_length(vr: &str) -> bool {
    [
        "OB", "OD", "OF", "OL", "OV", "OW", "SQ", "SV", "UC", "UN", "UR", "UT", "UV",
    ]
    .contains(&vr)
}

/// Strips the space/NUL padding DICOM uses to keep values at even length.
pub fn trim_padding(value: &[u8]) -> String {
    String::from_utf8_lossy(value)
        .trim_end_matches(['\0', ' '])
        .to_string()
}

pub fn get_tag_name(group: u16, elem: u16) -> TagName {
    let key = format!("{:04X},{:04X}", group, elem);

    let (full_match_mapping, partial_match_mapping) = &*crate::TAG_MAPPINGS;

    if let Some(keyword) = full_match_mapping.get(&key) {
        return TagName::Symbol(format!("{}{}", SYMBOL_PREFIX, keyword));
    }

    for (pattern, keyword) in partial_match_mapping {
        if pattern.is_match(&key) {
            return TagName::Symbol(format!("{}{}", SYMBOL_PREFIX, keyword));
        }
    }

    TagName::Plain("unknown".to_string())
}

/// Splits the keyword table into exact tags and `x` wildcard patterns.
///
/// Each line is `GGGG,EEEE<TAB>Keyword`. An `x` stands for any hex digit, so
/// `60xx,3000` covers every overlay group. Broken lines are skipped.
pub fn load_and_convert_tag_mapping(
    content: &str,
) -> (HashMap<String, String>, Vec<(Regex, String)>) {
    let mut full_match_mapping = HashMap::new();
    let mut partial_match_mapping = Vec::new();

    for (line_number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let Some((standard_tag, keyword)) = line.split_once('\t') else {
            log::warn!("tag mapping line {} has no keyword: {:?}", line_number + 1, line);
            continue;
        };

        let standard_tag = standard_tag.trim().to_uppercase();
        let keyword = keyword.trim().to_string();

        if standard_tag.contains('X') {
            let pattern = format!("^{}$", standard_tag.replace('X', "[0-9A-F]"));

            match Regex::new(&pattern) {
                Ok(regex) => partial_match_mapping.push((regex, keyword)),
                Err(error) => log::warn!("skipping tag pattern {}: {}", standard_tag, error),
            }
        } else {
            full_match_mapping.insert(standard_tag, keyword);
        }
    }

    (full_match_mapping, partial_match_mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_uppercase_and_space_separated() {
        assert_eq!(process_vec_to_hex(&[0xFF, 0xD8]), "FF D8");
        assert_eq!(process_vec_to_hex(&[0x4E, 0x4F, 0x0A]), "4E 4F 0A");
        assert_eq!(process_vec_to_hex(&[]), "");
    }

    #[test]
    fn tags_are_lowercase_and_zero_padded() {
        assert_eq!(format_tag(0x0008, 0x0010), "0008:0010");
        assert_eq!(format_tag(0xFFFE, 0xE0DD), "fffe:e0dd");
        assert_eq!(format_tag(0x7FE0, 0x0010), "7fe0:0010");
    }

    #[test]
    fn long_length_vrs() {
        assert!(has_long_length("SQ"));
        assert!(has_long_length("OB"));
        assert!(!has_long_length("PN"));
        assert!(is_known_vr("PN"));
        assert!(!is_known_vr("ZZ"));
    }

    #[test]
    fn every_long_length_vr_is_known() {
        for vr in ["OB", "OD", "OF", "OL", "OV", "OW", "SQ", "SV", "UC", "UN", "UR", "UT", "UV"] {
            assert!(has_long_length(vr));
            assert!(is_known_vr(vr), "{vr}");
        }
        assert!(!is_known_vr("sq"));
        assert!(!is_known_vr(""));
    }

    #[test]
    fn embedded_table_fills_both_lookups() {
        let (full, partial) = &*crate::TAG_MAPPINGS;

        assert_eq!(full.get("7FE0,0010").map(String::as_str), Some("PixelData"));
        assert!(partial.iter().any(|(_, keyword)| keyword == "OverlayData"));
        assert!(!full.keys().any(|tag| tag.contains('X')));
    }

    #[test]
    fn padding_is_trimmed() {
        assert_eq!(trim_padding(b"1.2.840.10008.1.2.1\0"), "1.2.840.10008.1.2.1");
        assert_eq!(trim_padding(b"DOE^JOHN "), "DOE^JOHN");
    }

    #[test]
    fn exact_names_win_over_patterns() {
        assert_eq!(
            get_tag_name(0x0010, 0x0010),
            TagName::Symbol("tags_PatientName".to_string())
        );
        assert_eq!(
            get_tag_name(0x0002, 0x0000),
            TagName::Symbol("tags_FileMetaInformationGroupLength".to_string())
        );
        assert_eq!(
            get_tag_name(0x0028, 0x0000),
            TagName::Symbol("tags_GenericGroupLength".to_string())
        );
    }

    #[test]
    fn wildcard_names_match_repeating_groups() {
        assert_eq!(
            get_tag_name(0x6002, 0x3000),
            TagName::Symbol("tags_OverlayData".to_string())
        );
        assert_eq!(
            get_tag_name(0x0029, 0x1010),
            TagName::Plain("unknown".to_string())
        );
    }

    #[test]
    fn malformed_mapping_lines_are_skipped() {
        let (full, partial) =
            load_and_convert_tag_mapping("0008,0060\tModality\nbroken line\n\n60xx,0010\tOverlayRows\n");

        assert_eq!(full.len(), 1);
        assert_eq!(full.get("0008,0060").map(String::as_str), Some("Modality"));
        assert_eq!(partial.len(), 1);
        assert!(partial[0].0.is_match("6000,0010"));
        assert!(!partial[0].0.is_match("6000,00100"));
    }
}
