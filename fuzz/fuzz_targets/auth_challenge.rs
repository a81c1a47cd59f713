#![no_main]

use bidinet_http::{extract_auth_challenges, parse_challenge_header};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = std::str::from_utf8(data) else {
        return;
    };
    let _ = parse_challenge_header(value);
    let headers = vec![
        ("WWW-Authenticate".to_string(), value.to_string()),
        ("Proxy-Authenticate".to_string(), value.to_string()),
    ];
    let _ = extract_auth_challenges(401, &headers);
    let _ = extract_auth_challenges(407, &headers);
});
