use {
    super::SecretKey,
    aes::{Aes128, Aes192, Aes256},
    anyhow::{anyhow, bail, Result},
    cmac::{Cmac, Mac},
};

/// Length of the truncated CMAC used as authentication token.
pub const AUTH_TOKEN_LENGTH: usize = 8;

/// AES-CMAC over `data`, truncated to [`AUTH_TOKEN_LENGTH`] bytes.
pub fn cmac_aes(key: &SecretKey, data: &[u8]) -> Result<Vec<u8>> {
    let tag = match key.bits() {
        128 => compute::<Cmac<Aes128>>(key.as_bytes(), data)?,
        192 => compute::<Cmac<Aes192>>(key.as_bytes(), data)?,
        256 => compute::<Cmac<Aes256>>(key.as_bytes(), data)?,
        bits => bail!("Unsupported AES key length {bits}"),
    };
    Ok(tag[..AUTH_TOKEN_LENGTH].to_vec())
}

fn compute<M: Mac + cmac::digest::KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|e| anyhow!("Invalid key: {e}"))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use {
        super::{super::KeyDerivation, *},
        hex_literal::hex,
    };

    #[test]
    fn test_rfc4493_vector() -> Result<()> {
        // RFC 4493 example 2
        let tag = compute::<Cmac<Aes128>>(
            &hex!("2b7e151628aed2a6abf7158809cf4f3c"),
            &hex!("6bc1bee22e409f96e93d7e117393172a"),
        )?;
        assert_eq!(tag, hex!("070a16b46b4d4144f79bdd9dd04a287c"));
        Ok(())
    }

    #[test]
    fn test_truncation() -> Result<()> {
        for bits in [128, 192, 256] {
            let key = KeyDerivation::new(bits)?.derive_mac(b"secret", None)?;
            let tag = cmac_aes(&key, b"data")?;
            assert_eq!(tag.len(), AUTH_TOKEN_LENGTH);
        }
        Ok(())
    }
}
