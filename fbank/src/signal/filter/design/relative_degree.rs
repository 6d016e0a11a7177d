use crate::kernel::ConfigError;

/// Number of zeros an analog prototype is missing relative to its poles.
///
/// Those zeros sit at infinity in the s-plane and are supplied by each band
/// mapping at its default location.
pub(crate) fn relative_degree(zeros: usize, poles: usize) -> Result<usize, ConfigError> {
    poles
        .checked_sub(zeros)
        .ok_or(ConfigError::InvalidArgument {
            arg: "zeros",
            reason: "improper prototype; poles must be >= zeros",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proper_and_improper_prototypes() {
        assert_eq!(relative_degree(1, 4), Ok(3));
        assert_eq!(relative_degree(2, 2), Ok(0));
        assert!(relative_degree(3, 2).is_err());
    }
}
