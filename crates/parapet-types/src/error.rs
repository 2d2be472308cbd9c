//! Error-code conventions for Parapet errors.
//!
//! Every error the access-control layer surfaces carries a stable,
//! machine-readable code so hosts can route outcomes without matching
//! on display strings. The split that matters to callers is
//! recoverability: a denial means the caller needs a broader grant,
//! not another attempt, while a failed privileged action carries the
//! action's own error and may well succeed on retry.

/// Stable, machine-readable code for an access-control error.
///
/// Codes are `UPPER_SNAKE_CASE`, prefixed with the layer that issued
/// them (`ACCESS_` for the controller), and never change once
/// published.
///
/// # Example
///
/// ```
/// use parapet_types::ErrorCode;
///
/// #[derive(Debug)]
/// enum GrantError {
///     Revoked,
///     StoreBusy,
/// }
///
/// impl ErrorCode for GrantError {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::Revoked => "GRANT_REVOKED",
///             Self::StoreBusy => "GRANT_STORE_BUSY",
///         }
///     }
///
///     fn is_recoverable(&self) -> bool {
///         // A revoked grant will not come back on retry.
///         matches!(self, Self::StoreBusy)
///     }
/// }
///
/// assert_eq!(GrantError::Revoked.code(), "GRANT_REVOKED");
/// assert!(!GrantError::Revoked.is_recoverable());
/// ```
pub trait ErrorCode {
    /// Returns the error's stable code, e.g. `"ACCESS_DENIED"`.
    fn code(&self) -> &'static str;

    /// Returns whether retrying the failed operation can help.
    ///
    /// Denials are not recoverable: the request needs a broader
    /// grant. A wrapped action failure is: whether a retry helps is
    /// the action's business, not the privilege machinery's.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that `err`'s code is well formed.
///
/// The code must extend `prefix` with a non-empty remainder and be
/// `UPPER_SNAKE_CASE` throughout. Test helper; panics naming the
/// offending code.
pub fn assert_error_code<E: ErrorCode>(err: &E, prefix: &str) {
    let code = err.code();
    assert!(
        code.starts_with(prefix) && code.len() > prefix.len(),
        "code '{code}' must extend prefix '{prefix}'"
    );
    let word_ok = |w: &str| {
        !w.is_empty() && w.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    };
    assert!(
        code.split('_').all(word_ok),
        "code '{code}' must be UPPER_SNAKE_CASE"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum GateError {
        Refused,
        Busy,
    }

    impl ErrorCode for GateError {
        fn code(&self) -> &'static str {
            match self {
                Self::Refused => "GATE_REFUSED",
                Self::Busy => "GATE_BUSY",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Busy)
        }
    }

    #[test]
    fn refusal_is_final_busy_is_not() {
        assert_eq!(GateError::Refused.code(), "GATE_REFUSED");
        assert!(!GateError::Refused.is_recoverable());
        assert!(GateError::Busy.is_recoverable());
    }

    #[test]
    fn well_formed_codes_pass() {
        assert_error_code(&GateError::Refused, "GATE_");
        assert_error_code(&GateError::Busy, "GATE_");
    }

    #[test]
    #[should_panic(expected = "must extend prefix")]
    fn foreign_prefix_is_rejected() {
        assert_error_code(&GateError::Refused, "ACCESS_");
    }

    #[derive(Debug)]
    struct MixedCase;

    impl ErrorCode for MixedCase {
        fn code(&self) -> &'static str {
            "Gate_Refused"
        }

        fn is_recoverable(&self) -> bool {
            false
        }
    }

    #[test]
    #[should_panic(expected = "UPPER_SNAKE_CASE")]
    fn mixed_case_code_is_rejected() {
        assert_error_code(&MixedCase, "");
    }

    #[derive(Debug)]
    struct DanglingUnderscore;

    impl ErrorCode for DanglingUnderscore {
        fn code(&self) -> &'static str {
            "GATE__REFUSED_"
        }

        fn is_recoverable(&self) -> bool {
            false
        }
    }

    #[test]
    #[should_panic(expected = "UPPER_SNAKE_CASE")]
    fn dangling_underscores_are_rejected() {
        assert_error_code(&DanglingUnderscore, "GATE_");
    }
}
