use alloy_primitives::B256;
use sha2::{Digest, Sha256};

/// Computes the SHA-256 digest of `data`.
pub fn sha256(data: impl AsRef<[u8]>) -> B256 {
    B256::from_slice(&Sha256::digest(data.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256(b"abc"),
            b256!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }
}
