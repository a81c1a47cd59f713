#![no_main]

use bidinet_http::{
    deserialize_header, is_valid_header_value, is_valid_http_token, parse_cookie_header,
    serialize_cookie_header, BytesValue, Header,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data).into_owned();
    let (name, value) = text.split_once(':').unwrap_or((text.as_str(), ""));

    let _ = is_valid_http_token(name);
    let _ = is_valid_header_value(value);
    let _ = deserialize_header(&Header::new(name, value));
    let _ = BytesValue::string(value).to_bytes();
    let _ = BytesValue::Base64(value.to_string()).to_text();
    let _ = BytesValue::from_body(data).to_bytes();

    let cookies = parse_cookie_header(&text);
    let _ = serialize_cookie_header(&cookies);
});
