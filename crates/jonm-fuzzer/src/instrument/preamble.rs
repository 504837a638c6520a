//! Wire preamble
//!
//! Every lifted program is wrapped in a fixed outer frame that resolves a
//! print function fallback, defines the checksum container, and prints the
//! checksum in a finally so it appears even when control flow aborts. The
//! names and text below are fixed wire constants; target engines parse the
//! output, so they must not be mangled. Template strings are deliberately
//! not used in the suffix.

/// Name of the wrapped global object parameter.
pub const GLOBAL_VARIABLE: &str = "__compat_global__";

/// Name of the resolved print function.
pub const OUTPUT_VARIABLE: &str = "__compat_out__";

/// Name of the checksum container: a two-slot array holding the running
/// integer checksum and the per-subroutine update-count map.
pub const CHECKSUM_VARIABLE: &str = "__compat_checksum__";

/// Initial checksum value (decimal 11206928).
pub const CHECKSUM_SEED: i64 = 0xAB0110;

/// Label printed in front of the final checksum value.
pub const CHECKSUM_LABEL: &str = "Checksum: ";

/// Frame text emitted before the lifted program body.
pub const PREAMBLE_PREFIX: &str = "(function(__compat_global__){\n  const __compat_out__ = ((__compat_global__)['console'] && (__compat_global__)['console'].log) || (__compat_global__)['print'];\n  const __compat_checksum__ = [0xAB0110, {}];\n  try {\n";

/// Frame text emitted after the lifted program body.
pub const PREAMBLE_SUFFIX: &str = "  } finally {\n    __compat_out__(\"Checksum: \" + __compat_checksum__[0]);\n  }\n})(globalThis || global);\n";

/// Wrap lifted source text in the wire frame.
pub fn wrap_source(body: &str) -> String {
    let mut source = String::with_capacity(
        PREAMBLE_PREFIX.len() + body.len() + PREAMBLE_SUFFIX.len() + 1,
    );
    source.push_str(PREAMBLE_PREFIX);
    source.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        source.push('\n');
    }
    source.push_str(PREAMBLE_SUFFIX);
    source
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_value() {
        assert_eq!(CHECKSUM_SEED, 11206928);
    }

    #[test]
    fn test_wrap_is_exact() {
        let wrapped = wrap_source("var a = 1;");
        assert!(wrapped.starts_with("(function(__compat_global__){\n"));
        assert!(wrapped.contains("  const __compat_checksum__ = [0xAB0110, {}];\n"));
        assert!(wrapped.contains("var a = 1;\n"));
        assert!(wrapped.ends_with("})(globalThis || global);\n"));
        // No template strings anywhere in the frame.
        assert!(!PREAMBLE_PREFIX.contains('`'));
        assert!(!PREAMBLE_SUFFIX.contains('`'));
    }
}
