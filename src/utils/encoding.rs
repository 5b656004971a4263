use crate::error::ArcError;
use crate::types::*;

pub fn decode_to_string(encoding: Encoding, data: &[u8]) -> Result<String, ArcError> {
    match encoding {
        Encoding::Auto => decode_to_string(Encoding::Utf8, data)
            .or_else(|_| decode_to_string(Encoding::Cp932, data))
            .or_else(|_| decode_to_string(Encoding::Gb2312, data)),
        Encoding::Utf8 => String::from_utf8(data.to_vec())
            .map_err(|e| ArcError::Encoding(format!("invalid UTF-8: {}", e))),
        Encoding::Cp932 => {
            let result = encoding_rs::SHIFT_JIS.decode(data);
            if result.2 {
                Err(ArcError::Encoding("failed to decode Shift-JIS".into()))
            } else {
                Ok(result.0.to_string())
            }
        }
        Encoding::Gb2312 => {
            let result = encoding_rs::GBK.decode(data);
            if result.2 {
                Err(ArcError::Encoding("failed to decode GB2312".into()))
            } else {
                Ok(result.0.to_string())
            }
        }
    }
}

pub fn encode_string(encoding: Encoding, data: &str, check: bool) -> Result<Vec<u8>, ArcError> {
    match encoding {
        Encoding::Auto | Encoding::Utf8 => Ok(data.as_bytes().to_vec()),
        Encoding::Cp932 => {
            let result = encoding_rs::SHIFT_JIS.encode(data);
            if result.2 {
                if check {
                    return Err(ArcError::Encoding(format!(
                        "failed to encode '{}' as Shift-JIS",
                        data
                    )));
                }
                tracing::warn!("Some characters could not be encoded in Shift-JIS: {}", data);
                crate::COUNTER.warning();
            }
            Ok(result.0.to_vec())
        }
        Encoding::Gb2312 => {
            let result = encoding_rs::GBK.encode(data);
            if result.2 {
                if check {
                    return Err(ArcError::Encoding(format!(
                        "failed to encode '{}' as GB2312",
                        data
                    )));
                }
                tracing::warn!("Some characters could not be encoded in GB2312: {}", data);
                crate::COUNTER.warning();
            }
            Ok(result.0.to_vec())
        }
    }
}

/// Decodes UTF-16LE code units, stopping at the first NUL.
pub fn decode_utf16le(data: &[u8]) -> Result<String, ArcError> {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16(&units).map_err(|e| ArcError::Encoding(format!("invalid UTF-16: {}", e)))
}

pub fn encode_utf16le(data: &str) -> Vec<u8> {
    data.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

#[test]
fn test_decode_to_string() {
    assert_eq!(
        decode_to_string(
            Encoding::Utf8,
            &[228, 184, 173, 230, 150, 135, 230, 181, 139, 232, 175, 149]
        )
        .unwrap(),
        "中文测试".to_string()
    );
    assert_eq!(
        decode_to_string(
            Encoding::Cp932,
            &[130, 171, 130, 225, 130, 215, 130, 194, 130, 187, 130, 211, 130, 198]
        )
        .unwrap(),
        "きゃべつそふと".to_string()
    );
    assert_eq!(
        decode_to_string(Encoding::Gb2312, &[214, 208, 206, 196]).unwrap(),
        "中文".to_string()
    );
    assert_eq!(
        decode_to_string(
            Encoding::Auto,
            &[130, 171, 130, 225, 130, 215, 130, 194, 130, 187, 130, 211, 130, 198]
        )
        .unwrap(),
        "きゃべつそふと".to_string()
    );
}

#[test]
fn test_encode_string() {
    assert_eq!(
        encode_string(Encoding::Cp932, "きゃべつそふと", true).unwrap(),
        vec![130, 171, 130, 225, 130, 215, 130, 194, 130, 187, 130, 211, 130, 198]
    );
    assert_eq!(
        encode_string(Encoding::Gb2312, "中文", true).unwrap(),
        vec![214, 208, 206, 196]
    );
}

#[test]
fn test_utf16_round_trip() {
    let encoded = encode_utf16le("data/bgm.ogg");
    assert_eq!(encoded.len(), 24);
    let mut padded = encoded.clone();
    padded.extend_from_slice(&[0, 0, b'x', 0]);
    assert_eq!(decode_utf16le(&padded).unwrap(), "data/bgm.ogg");
}
