/// Constant-time comparisons for hash and digest checks.
///
/// Password matching compares derived keys and formatted bcrypt strings with
/// these helpers, never with `==`.
use subtle::ConstantTimeEq;

/// Constant-time comparison of byte slices
///
/// Length is not secret; only the contents are compared in constant time.
///
/// ```rust
/// use crypto::constant_time::ct_eq;
///
/// assert!(ct_eq(b"derived-key", b"derived-key"));
/// assert!(!ct_eq(b"derived-key", b"derived-kez"));
/// ```
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

pub fn ct_eq_str(a: &str, b: &str) -> bool {
    ct_eq(a.as_bytes(), b.as_bytes())
}
