/// Symmetric cipher used to seal the persisted library blob.
///
/// Default implementation uses AES-256-GCM via the `aes-gcm` crate.
///
/// Sealed box format:
/// ```text
/// [12-byte nonce] [ciphertext] [16-byte GCM authentication tag]
/// ```
pub trait BlobCipher: Send + Sync {
    /// Encrypt `data`, returning `nonce || ciphertext || tag`.
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, String>;

    /// Open a sealed box produced by `encrypt` with the same key.
    fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, String>;

    /// Algorithm identifier (e.g., "AES-256-GCM").
    fn algorithm(&self) -> &str;
}
