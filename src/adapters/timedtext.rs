//! YouTube timedtext (XML 字幕) 解析

use crate::domain::model::{TranscriptSegment, VideoId};
use crate::utils::error::{Result, ServerError};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

static TEXT_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)").expect("text element pattern is valid")
});

static ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([\w:-]+)\s*=\s*"([^"]*)""#).expect("attribute pattern is valid"));

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);").expect("entity pattern is valid")
});

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// 解析 timedtext XML，每個非空的 `<text>` 元素對應一個片段
pub fn parse_timedtext(xml: &str, video_id: &VideoId) -> Result<Vec<TranscriptSegment>> {
    let mut segments = Vec::new();

    for caps in TEXT_ELEMENT.captures_iter(xml) {
        let body = match caps.get(2).map(|m| m.as_str()) {
            Some(body) if !body.is_empty() => body,
            _ => continue,
        };

        let attributes: HashMap<&str, &str> = ATTRIBUTE
            .captures_iter(&caps[1])
            .filter_map(|attr| Some((attr.get(1)?.as_str(), attr.get(2)?.as_str())))
            .collect();

        let start = parse_seconds(attributes.get("start").copied(), video_id, "start")?;
        let duration = match attributes.get("dur") {
            Some(raw) => parse_seconds(Some(raw), video_id, "dur")?,
            None => 0.0,
        };

        // XML 實體先解一次，內容本身是 HTML 再解一次，最後去掉標籤
        let text = unescape_html(&unescape_html(body));
        let text = HTML_TAG.replace_all(&text, "").into_owned();

        segments.push(TranscriptSegment {
            text,
            start,
            duration,
        });
    }

    Ok(segments)
}

fn parse_seconds(raw: Option<&str>, video_id: &VideoId, attribute: &str) -> Result<f64> {
    let raw = raw.ok_or_else(|| ServerError::YoutubeDataUnparsable {
        video_id: video_id.to_string(),
        message: format!("transcript element is missing '{}'", attribute),
    })?;

    raw.trim()
        .parse::<f64>()
        .map_err(|_| ServerError::YoutubeDataUnparsable {
            video_id: video_id.to_string(),
            message: format!("invalid '{}' value: {}", attribute, raw),
        })
}

/// 解碼 HTML 具名與數字實體；無法辨識的具名實體原樣保留
pub fn unescape_html(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    ENTITY
        .replace_all(input, |caps: &Captures| {
            let entity = &caps[1];
            if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                numeric_reference(u32::from_str_radix(hex, 16).ok())
            } else if let Some(dec) = entity.strip_prefix('#') {
                numeric_reference(dec.parse::<u32>().ok())
            } else {
                html_escape::decode_html_entities(&caps[0]).into_owned()
            }
        })
        .into_owned()
}

/// 數字實體依 HTML5 規則處理：0x80-0x9F 視為 cp1252，
/// NUL、代理字元與超出範圍的值換成 U+FFFD，非字元碼點移除
fn numeric_reference(code: Option<u32>) -> String {
    let Some(code) = code else {
        return REPLACEMENT.to_string();
    };

    if let Some(c) = cp1252_reference(code) {
        return c.to_string();
    }

    if code == 0 || (0xD800..=0xDFFF).contains(&code) || code > 0x10FFFF {
        return REPLACEMENT.to_string();
    }

    if is_noncharacter(code) {
        return String::new();
    }

    char::from_u32(code)
        .map(String::from)
        .unwrap_or_else(|| REPLACEMENT.to_string())
}

const REPLACEMENT: char = '\u{fffd}';

fn cp1252_reference(code: u32) -> Option<char> {
    let c = match code {
        0x0d => '\r',
        0x80 => '\u{20ac}',
        0x81 => '\u{81}',
        0x82 => '\u{201a}',
        0x83 => '\u{192}',
        0x84 => '\u{201e}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{2c6}',
        0x89 => '\u{2030}',
        0x8a => '\u{160}',
        0x8b => '\u{2039}',
        0x8c => '\u{152}',
        0x8d => '\u{8d}',
        0x8e => '\u{17d}',
        0x8f => '\u{8f}',
        0x90 => '\u{90}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201c}',
        0x94 => '\u{201d}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{2dc}',
        0x99 => '\u{2122}',
        0x9a => '\u{161}',
        0x9b => '\u{203a}',
        0x9c => '\u{153}',
        0x9d => '\u{9d}',
        0x9e => '\u{17e}',
        0x9f => '\u{178}',
        _ => return None,
    };
    Some(c)
}

fn is_noncharacter(code: u32) -> bool {
    matches!(code, 0x01..=0x08 | 0x0b | 0x0e..=0x1f | 0x7f..=0x9f | 0xfdd0..=0xfdef)
        || (code & 0xfffe) == 0xfffe
}
