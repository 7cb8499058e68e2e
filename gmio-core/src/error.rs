//! Error taxonomy for gmio parsing and codec operations
//!
//! Errors are classified with distinct numeric ranges per category so that
//! callers can branch on the class of failure without matching every code.

/// Errors raised while decoding, validating, or converting sparse data
///
/// Error codes are organized by category with distinct numeric ranges.
/// I/O and allocation failures are not represented here; they belong to the
/// I/O crate, which wraps this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GmioError {
    // Format errors (grammar and header issues) - 1-15
    /// Leading magic bytes do not identify a known snapshot kind
    BadMagic = 1,
    /// Recognized binary family but an unsupported kind or version
    UnsupportedBinary = 2,
    /// MatrixMarket banner, field, or symmetry outside the supported set
    UnsupportedMatrixMarket = 3,
    /// Input region ended inside a fixed-size header or payload
    TruncatedPayload = 4,
    /// Header fields are present but unusable as written
    MalformedHeader = 5,

    // Width errors (on-disk type sizes) - 16-31
    /// Stored label width differs from the requested label type
    LabelWidth = 16,
    /// Stored edge-count width differs from the requested count type
    CountWidth = 17,

    // Contradiction errors (header disagrees with body) - 32-47
    /// More row labels in the body than the header admits
    RowCount = 32,
    /// More column labels in the body than the header admits
    ColCount = 33,
    /// Declared non-zero count inconsistent with the entries read
    NonzeroCount = 34,
    /// Payload length disagrees with the stored edge count
    PayloadLength = 35,
    /// Fewer adjacency lines than the declared vertex count
    VertexCount = 36,

    // Unsupported conversions - 48-63
    /// Triangle extraction while expanding a CSR is not implemented
    TriangleFromCsr = 48,
    /// Self-loop removal while expanding a CSR is not implemented
    SelfLoopsFromCsr = 49,
}

impl GmioError {
    /// Get the error category for this error
    pub const fn category(&self) -> ErrorCategory {
        match *self as u8 {
            1..=15 => ErrorCategory::Format,
            16..=31 => ErrorCategory::Width,
            32..=47 => ErrorCategory::Contradiction,
            48..=63 => ErrorCategory::Unsupported,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Get the numeric error code
    pub const fn code(&self) -> u8 {
        *self as u8
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Grammar and header format errors
    Format,
    /// On-disk type width mismatches
    Width,
    /// Header/body consistency errors
    Contradiction,
    /// Known but unimplemented operations
    Unsupported,
    /// Unknown/undefined category
    Unknown,
}

impl core::fmt::Display for GmioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            // Format errors
            GmioError::BadMagic => "leading magic bytes do not match any known snapshot",
            GmioError::UnsupportedBinary => "unsupported binary format, likely a version mismatch",
            GmioError::UnsupportedMatrixMarket => "unsupported MatrixMarket variant",
            GmioError::TruncatedPayload => "input ended inside a header or payload",
            GmioError::MalformedHeader => "header fields are unusable as written",

            // Width errors
            GmioError::LabelWidth => "stored label width does not match the requested type",
            GmioError::CountWidth => "stored count width does not match the requested type",

            // Contradiction errors
            GmioError::RowCount => "more row labels in body than the header admits",
            GmioError::ColCount => "more column labels in body than the header admits",
            GmioError::NonzeroCount => "declared non-zero count contradicts the entries read",
            GmioError::PayloadLength => "payload length disagrees with the stored edge count",
            GmioError::VertexCount => "fewer adjacency lines than declared vertices",

            // Unsupported conversions
            GmioError::TriangleFromCsr => "keeping one triangle while expanding a CSR is not implemented",
            GmioError::SelfLoopsFromCsr => "dropping self loops while expanding a CSR is not implemented",
        };
        write!(f, "{msg}")
    }
}

/// Result type for core operations
pub type Result<T> = core::result::Result<T, GmioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_partition_the_codes() {
        assert_eq!(GmioError::BadMagic.category(), ErrorCategory::Format);
        assert_eq!(GmioError::MalformedHeader.category(), ErrorCategory::Format);
        assert_eq!(GmioError::LabelWidth.category(), ErrorCategory::Width);
        assert_eq!(GmioError::CountWidth.category(), ErrorCategory::Width);
        assert_eq!(GmioError::RowCount.category(), ErrorCategory::Contradiction);
        assert_eq!(GmioError::PayloadLength.category(), ErrorCategory::Contradiction);
        assert_eq!(GmioError::TriangleFromCsr.category(), ErrorCategory::Unsupported);
        assert_eq!(GmioError::SelfLoopsFromCsr.category(), ErrorCategory::Unsupported);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(GmioError::BadMagic.code(), 1);
        assert_eq!(GmioError::LabelWidth.code(), 16);
        assert_eq!(GmioError::RowCount.code(), 32);
        assert_eq!(GmioError::TriangleFromCsr.code(), 48);
    }
}
