//! Rotating attendance codes.
//!
//! Time is cut into windows of `rotation_seconds`. Each window has a 6-digit
//! code derived from the session secret with HMAC-SHA256 and dynamic
//! truncation, so the code displayed in the lecture hall (usually as a QR code)
//! changes every window and cannot be predicted without the secret.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const CODE_DIGITS: u32 = 6;

/// Index of the rotation window containing `now`.
pub fn window(now: DateTime<Utc>, rotation_seconds: i32) -> i64 {
    let r = i64::from(rotation_seconds.max(1));
    now.timestamp().div_euclid(r)
}

/// Seconds left before the code for `now` rotates.
pub fn seconds_until_rotation(now: DateTime<Utc>, rotation_seconds: i32) -> i64 {
    let r = i64::from(rotation_seconds.max(1));
    r - now.timestamp().rem_euclid(r)
}

pub fn code_for_window(secret: &str, window: i64) -> String {
    // HMAC accepts keys of any length.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(&window.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[31] & 0x0f) as usize;
    let slice = &digest[offset..offset + 4];
    let val = u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]) & 0x7fff_ffff;

    format!("{:0width$}", val % 10u32.pow(CODE_DIGITS), width = CODE_DIGITS as usize)
}

pub fn current_code(secret: &str, rotation_seconds: i32, now: DateTime<Utc>) -> String {
    code_for_window(secret, window(now, rotation_seconds))
}

/// Checks `submitted` against the windows `[w - tolerance, w + tolerance]`.
///
/// Returns the matching window, if any.
pub fn verify_code(
    secret: &str,
    rotation_seconds: i32,
    submitted: &str,
    now: DateTime<Utc>,
    tolerance: i64,
) -> Option<i64> {
    let submitted = submitted.trim();
    if submitted.len() != CODE_DIGITS as usize || !submitted.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let w = window(now, rotation_seconds);
    (-tolerance.abs()..=tolerance.abs())
        .map(|delta| w + delta)
        .find(|candidate| code_for_window(secret, *candidate) == submitted)
}
