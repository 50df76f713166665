// Error classification shared by every verifier in the crate.
// Module errors stay specific; callers that only need accept/reject
// look at the kind.

use serde::Serialize;
use std::fmt;

/// Why a proof, encoding or transition was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// RLP or hex-prefix parse failure
    MalformedEncoding,
    /// A layer or header does not hash to the expected reference
    HashMismatch,
    /// Wrong account shape, non-terminal leaf, nibble count mismatch
    StructuralViolation,
    /// Integer exceeds its byte budget, or a field input is not below the modulus
    RangeViolation,
    /// Spend exceeds the available balance
    ArithmeticUnderflow,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MalformedEncoding => "malformed encoding",
            ErrorKind::HashMismatch => "hash mismatch",
            ErrorKind::StructuralViolation => "structural violation",
            ErrorKind::RangeViolation => "range violation",
            ErrorKind::ArithmeticUnderflow => "arithmetic underflow",
        };
        f.write_str(name)
    }
}

/// Implemented by every error type that can reject a proof.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

/// Outcome of checking a proof or transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Accept,
    Reject(ErrorKind),
}

impl Verdict {
    pub fn from_result<T, E: Classify>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Verdict::Accept,
            Err(e) => Verdict::Reject(e.kind()),
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accept => f.write_str("ACCEPT"),
            Verdict::Reject(kind) => write!(f, "REJECT ({kind})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Underflow;

    impl Classify for Underflow {
        fn kind(&self) -> ErrorKind {
            ErrorKind::ArithmeticUnderflow
        }
    }

    #[test]
    fn test_verdict_from_result() {
        let ok: Result<u8, Underflow> = Ok(1);
        let err: Result<u8, Underflow> = Err(Underflow);

        assert_eq!(Verdict::from_result(&ok), Verdict::Accept);
        assert_eq!(
            Verdict::from_result(&err),
            Verdict::Reject(ErrorKind::ArithmeticUnderflow)
        );
        assert!(!Verdict::from_result(&err).is_accept());
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Accept.to_string(), "ACCEPT");
        assert_eq!(
            Verdict::Reject(ErrorKind::HashMismatch).to_string(),
            "REJECT (hash mismatch)"
        );
    }
}
