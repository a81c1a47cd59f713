use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{BytesValue, HeaderCodecError};

/// Response headers the transport refuses to rewrite on an existing response.
pub const IMMUTABLE_RESPONSE_HEADERS: &[&str] = &[
    "content-encoding",
    "content-length",
    "content-type",
    "trailer",
    "transfer-encoding",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: BytesValue,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: BytesValue::String(value.into()),
        }
    }
}

pub fn is_immutable_response_header(name: &str) -> bool {
    IMMUTABLE_RESPONSE_HEADERS
        .iter()
        .any(|immutable| immutable.eq_ignore_ascii_case(name))
}

pub fn is_valid_http_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(is_token_byte)
}

fn is_token_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}

pub fn is_valid_header_value(value: &str) -> bool {
    let bytes = value.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return true;
    };
    let padded = |byte: &u8| matches!(byte, b' ' | b'\t');
    !padded(first) && !padded(last) && !bytes.iter().any(|byte| matches!(byte, b'\r' | b'\n' | 0))
}

pub fn deserialize_header(header: &Header) -> Result<(String, String), HeaderCodecError> {
    let value = header.value.to_text()?;
    if !is_valid_http_token(&header.name) {
        return Err(HeaderCodecError::InvalidHeaderName(header.name.clone()));
    }
    if !is_valid_header_value(&value) {
        return Err(HeaderCodecError::InvalidHeaderValue {
            name: header.name.clone(),
        });
    }
    Ok((header.name.clone(), value))
}

pub fn deserialize_headers(headers: &[Header]) -> Result<Vec<(String, String)>, HeaderCodecError> {
    headers.iter().map(deserialize_header).collect()
}

/// Header values read from the transport are already text, so they always
/// use the `string` form.
pub fn serialize_headers(raw: &[(String, String)]) -> Vec<Header> {
    raw.iter()
        .map(|(name, value)| Header::new(name.clone(), value.clone()))
        .collect()
}

pub fn parse_status_code(code: u16) -> Result<StatusCode, HeaderCodecError> {
    StatusCode::from_u16(code).map_err(|_| HeaderCodecError::InvalidStatusCode(code))
}

#[cfg(test)]
mod tests {
    use super::{
        deserialize_headers, is_immutable_response_header, is_valid_header_value,
        is_valid_http_token, parse_status_code, Header,
    };
    use crate::{BytesValue, HeaderCodecError};

    #[test]
    fn http_token_matrix() {
        for valid in ["GET", "x-custom", "A1!#$%&'*+-.^_`|~", "PATCH"] {
            assert!(is_valid_http_token(valid), "{valid} should be a token");
        }
        for invalid in ["", "has space", "semi;colon", "quote\"", "brace{", "é", "a/b", "x:y"] {
            assert!(!is_valid_http_token(invalid), "{invalid} should not be a token");
        }
    }

    #[test]
    fn header_value_rejects_padding_and_control_bytes() {
        assert!(is_valid_header_value(""));
        assert!(is_valid_header_value("text/html; charset=utf-8"));
        assert!(is_valid_header_value("inner  spaces ok"));
        assert!(!is_valid_header_value(" leading"));
        assert!(!is_valid_header_value("trailing\t"));
        assert!(!is_valid_header_value("line\r\nbreak"));
        assert!(!is_valid_header_value("nul\0byte"));
    }

    #[test]
    fn deserialize_headers_decodes_base64_and_validates() {
        let headers = vec![
            Header::new("x-plain", "one"),
            Header {
                name: "x-encoded".to_string(),
                value: BytesValue::Base64("dHdv".to_string()),
            },
        ];
        let decoded = deserialize_headers(&headers).expect("valid headers");
        assert_eq!(
            decoded,
            vec![
                ("x-plain".to_string(), "one".to_string()),
                ("x-encoded".to_string(), "two".to_string()),
            ]
        );

        let bad_name = deserialize_headers(&[Header::new("bad name", "v")]);
        assert_eq!(
            bad_name,
            Err(HeaderCodecError::InvalidHeaderName("bad name".to_string()))
        );
        let bad_value = deserialize_headers(&[Header::new("x-bad", "v\n")]);
        assert!(matches!(
            bad_value,
            Err(HeaderCodecError::InvalidHeaderValue { .. })
        ));
    }

    #[test]
    fn immutable_response_headers_match_case_insensitively() {
        assert!(is_immutable_response_header("Content-Length"));
        assert!(is_immutable_response_header("TRANSFER-ENCODING"));
        assert!(!is_immutable_response_header("x-powered-by"));
    }

    #[test]
    fn status_code_range_contract() {
        assert_eq!(parse_status_code(204).expect("valid").as_u16(), 204);
        assert_eq!(
            parse_status_code(0),
            Err(HeaderCodecError::InvalidStatusCode(0))
        );
        assert_eq!(
            parse_status_code(1000),
            Err(HeaderCodecError::InvalidStatusCode(1000))
        );
    }
}
