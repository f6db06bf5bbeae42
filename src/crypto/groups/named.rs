//! Named curves and the TR-03110 standardized domain parameter identifiers.
use {
    super::{EllipticCurve, FieldUint},
    anyhow::{bail, Result},
    ruint::uint,
};

/// Standardized domain parameter identifiers (TR-03110-3 table A.4) with
/// curve support in this crate.
pub const STANDARDIZED_IDS: [u64; 6] = [8, 10, 12, 13, 16, 17];

/// Domain parameters for a TR-03110 standardized domain parameter ID.
pub fn standardized(id: u64) -> Result<EllipticCurve<FieldUint>> {
    match id {
        8 => secp192r1(),
        10 => secp224r1(),
        12 => secp256r1(),
        13 => brainpool_p256r1(),
        16 => brainpool_p384r1(),
        17 => brainpool_p512r1(),
        _ => bail!("Unsupported standardized domain parameters {id}"),
    }
}

/// NIST P-192
pub fn secp192r1() -> Result<EllipticCurve<FieldUint>> {
    EllipticCurve::new(
        uint!(0xfffffffffffffffffffffffffffffffeffffffffffffffff_U576),
        uint!(0xfffffffffffffffffffffffffffffffefffffffffffffffc_U576),
        uint!(0x64210519e59c80e70fa7e9ab72243049feb8deecc146b9b1_U576),
        uint!(0x188da80eb03090f67cbf20eb43a18800f4ff0afd82ff1012_U576),
        uint!(0x07192b95ffc8da78631011ed6b24cdd573f977a11e794811_U576),
        uint!(0xffffffffffffffffffffffff99def836146bc9b1b4d22831_U576),
        uint!(1_U576),
    )
}

/// NIST P-224
pub fn secp224r1() -> Result<EllipticCurve<FieldUint>> {
    EllipticCurve::new(
        uint!(0xffffffffffffffffffffffffffffffff000000000000000000000001_U576),
        uint!(0xfffffffffffffffffffffffffffffffefffffffffffffffffffffffe_U576),
        uint!(0xb4050a850c04b3abf54132565044b0b7d7bfd8ba270b39432355ffb4_U576),
        uint!(0xb70e0cbd6bb4bf7f321390b94a03c1d356c21122343280d6115c1d21_U576),
        uint!(0xbd376388b5f723fb4c22dfe6cd4375a05a07476444d5819985007e34_U576),
        uint!(0xffffffffffffffffffffffffffff16a2e0b8f03e13dd29455c5c2a3d_U576),
        uint!(1_U576),
    )
}

/// NIST P-256
pub fn secp256r1() -> Result<EllipticCurve<FieldUint>> {
    EllipticCurve::new(
        uint!(0xffffffff00000001000000000000000000000000ffffffffffffffffffffffff_U576),
        uint!(0xffffffff00000001000000000000000000000000fffffffffffffffffffffffc_U576),
        uint!(0x5ac635d8aa3a93e7b3ebbd55769886bc651d06b0cc53b0f63bce3c3e27d2604b_U576),
        uint!(0x6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296_U576),
        uint!(0x4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5_U576),
        uint!(0xffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551_U576),
        uint!(1_U576),
    )
}

/// brainpoolP256r1 (RFC 5639)
pub fn brainpool_p256r1() -> Result<EllipticCurve<FieldUint>> {
    EllipticCurve::new(
        uint!(0xa9fb57dba1eea9bc3e660a909d838d726e3bf623d52620282013481d1f6e5377_U576),
        uint!(0x7d5a0975fc2c3057eef67530417affe7fb8055c126dc5c6ce94a4b44f330b5d9_U576),
        uint!(0x26dc5c6ce94a4b44f330b5d9bbd77cbf958416295cf7e1ce6bccdc18ff8c07b6_U576),
        uint!(0x8bd2aeb9cb7e57cb2c4b482ffc81b7afb9de27e1e3bd23c23a4453bd9ace3262_U576),
        uint!(0x547ef835c3dac4fd97f8461a14611dc9c27745132ded8e545c1d54c72f046997_U576),
        uint!(0xa9fb57dba1eea9bc3e660a909d838d718c397aa3b561a6f7901e0e82974856a7_U576),
        uint!(1_U576),
    )
}

/// brainpoolP384r1 (RFC 5639)
pub fn brainpool_p384r1() -> Result<EllipticCurve<FieldUint>> {
    EllipticCurve::new(
        uint!(0x8cb91e82a3386d280f5d6f7e50e641df152f7109ed5456b412b1da197fb71123acd3a729901d1a71874700133107ec53_U576),
        uint!(0x7bc382c63d8c150c3c72080ace05afa0c2bea28e4fb22787139165efba91f90f8aa5814a503ad4eb04a8c7dd22ce2826_U576),
        uint!(0x04a8c7dd22ce28268b39b55416f0447c2fb77de107dcd2a62e880ea53eeb62d57cb4390295dbc9943ab78696fa504c11_U576),
        uint!(0x1d1c64f068cf45ffa2a63a81b7c13f6b8847a3e77ef14fe3db7fcafe0cbd10e8e826e03436d646aaef87b2e247d4af1e_U576),
        uint!(0x8abe1d7520f9c2a45cb1eb8e95cfd55262b70b29feec5864e19c054ff99129280e4646217791811142820341263c5315_U576),
        uint!(0x8cb91e82a3386d280f5d6f7e50e641df152f7109ed5456b31f166e6cac0425a7cf3ab6af6b7fc3103b883202e9046565_U576),
        uint!(1_U576),
    )
}

/// brainpoolP512r1 (RFC 5639)
pub fn brainpool_p512r1() -> Result<EllipticCurve<FieldUint>> {
    EllipticCurve::new(
        uint!(0xaadd9db8dbe9c48b3fd4e6ae33c9fc07cb308db3b3c9d20ed6639cca703308717d4d9b009bc66842aecda12ae6a380e62881ff2f2d82c68528aa6056583a48f3_U576),
        uint!(0x7830a3318b603b89e2327145ac234cc594cbdd8d3df91610a83441caea9863bc2ded5d5aa8253aa10a2ef1c98b9ac8b57f1117a72bf2c7b9e7c1ac4d77fc94ca_U576),
        uint!(0x3df91610a83441caea9863bc2ded5d5aa8253aa10a2ef1c98b9ac8b57f1117a72bf2c7b9e7c1ac4d77fc94cadc083e67984050b75ebae5dd2809bd638016f723_U576),
        uint!(0x81aee4bdd82ed9645a21322e9c4c6a9385ed9f70b5d916c1b43b62eef4d0098eff3b1f78e2d0d48d50d1687b93b97d5f7c6d5047406a5e688b352209bcb9f822_U576),
        uint!(0x7dde385d566332ecc0eabfa9cf7822fdf209f70024a57b1aa000c55b881f8111b2dcde494a5f485e5bca4bd88a2763aed1ca2b2fa8f0540678cd1e0f3ad80892_U576),
        uint!(0xaadd9db8dbe9c48b3fd4e6ae33c9fc07cb308db3b3c9d20ed6639cca70330870553e5c414ca92619418661197fac10471db1d381085ddaddb58796829ca90069_U576),
        uint!(1_U576),
    )
}
