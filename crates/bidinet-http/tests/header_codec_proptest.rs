use bidinet_http::{
    deserialize_header, is_valid_header_value, is_valid_http_token, parse_cookie_header,
    BytesValue, Header, HeaderCodecError,
};
use proptest::prelude::*;

fn token_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9!#$%&'*+.^_`|~-]{1,24}").expect("valid token regex")
}

fn value_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[!-~]([ -~]{0,30}[!-~])?").expect("valid header value regex")
}

proptest! {
    #[test]
    fn generated_tokens_are_accepted(token in token_strategy()) {
        prop_assert!(is_valid_http_token(&token));
    }

    #[test]
    fn separators_make_a_token_invalid(prefix in token_strategy(), separator in "[ (),/:;<=>?@\\[\\]{}\"]") {
        let candidate = format!("{prefix}{separator}");
        prop_assert!(!is_valid_http_token(&candidate));
    }

    #[test]
    fn base64_headers_decode_to_the_same_pair(name in token_strategy(), value in value_strategy()) {
        let header = Header {
            name: name.clone(),
            value: BytesValue::base64_encode(value.as_bytes()),
        };
        let decoded = deserialize_header(&header).expect("valid header should decode");
        prop_assert_eq!(decoded, (name, value));
    }

    #[test]
    fn surrounding_whitespace_is_rejected(name in token_strategy(), value in value_strategy()) {
        let padded = format!(" {value}");
        prop_assert!(!is_valid_header_value(&padded));
        let header = Header::new(name.clone(), padded);
        prop_assert_eq!(
            deserialize_header(&header),
            Err(HeaderCodecError::InvalidHeaderValue { name })
        );
    }

    #[test]
    fn cookie_header_parsing_keeps_every_pair(
        pairs in proptest::collection::vec(("[a-z]{1,8}", "[a-z0-9]{0,8}"), 1..6)
    ) {
        let header = pairs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        let parsed = parse_cookie_header(&header);
        prop_assert_eq!(parsed.len(), pairs.len());
        for (cookie, (name, value)) in parsed.iter().zip(pairs.iter()) {
            prop_assert_eq!(&cookie.name, name);
            prop_assert_eq!(cookie.value.to_text().expect("text"), value.clone());
        }
    }
}
