//! Recognition of anti-automation challenge pages.

/// Phrases served on CAPTCHA and rate-throttling interstitials. A hit
/// means the page carries no review data and must not be mistaken for
/// end-of-data.
const CHALLENGE_MARKERS: &[&str] = &[
    "请输入验证码",
    "验证码",
    "访问过于频繁",
    "请求过于频繁",
    "unusual traffic",
    "please verify",
];

/// Scan raw page text for known challenge markers.
///
/// Pure function with no side effects; the pagination controller maps a
/// hit onto the blocked-page policy (abandon the page, keep accumulated
/// records).
pub fn is_challenge_page(text: &str) -> bool {
    let lowered = text.to_lowercase();
    CHALLENGE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}
