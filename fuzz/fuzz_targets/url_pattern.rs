#![no_main]

use bidinet_policy::{glob_matches, UrlPattern, UrlPatternSpec};
use libfuzzer_sys::fuzz_target;
use url::Url;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (pattern, candidate) = text.split_once('\n').unwrap_or((text, text));

    let _ = glob_matches(pattern, candidate);

    let Ok(url) = Url::parse(candidate) else {
        return;
    };
    if let Ok(compiled) = UrlPattern::compile(&UrlPatternSpec::string(pattern)) {
        let _ = compiled.matches(&url);
    }

    let mut parts = pattern.splitn(5, '|').map(str::to_string);
    let structured = UrlPatternSpec::Pattern {
        protocol: parts.next(),
        hostname: parts.next(),
        port: parts.next(),
        pathname: parts.next(),
        search: parts.next(),
    };
    if let Ok(compiled) = UrlPattern::compile(&structured) {
        let _ = compiled.matches(&url);
    }
});
