/// Arbitrary-precision arithmetic errors.
#[derive(Debug, thiserror::Error)]
pub enum BigIntError {
    /// An argument violates a mathematical precondition (division by zero,
    /// non-positive modulus, prime bit length below 2, shift by `i32::MIN`).
    #[error("domain: {0}")]
    Domain(&'static str),

    /// Text or byte input cannot be parsed.
    #[error("format: {0}")]
    Format(String),

    /// `mod_inverse` on a value that is not relatively prime to the modulus.
    #[error("value is not invertible for this modulus")]
    NotInvertible,

    /// An exact narrowing conversion does not fit the target type.
    #[error("value out of range for {0}")]
    OutOfRange(&'static str),
}
