//! Digest + RSA signature verification against a trusted key.
//!
//! The source crate's own verified-load path (`domain.rs`'s
//! `verify_and_load_tsm`, `shadowfax_core/state.rs`'s `Tsm::verify_and_load`)
//! reaches for the `rsa` + `sha2` crates rather than hand-rolled bignum
//! math; we follow the same stack, generalized to the digest algorithms
//! this crate supports and to verifying a caller-supplied prehash instead
//! of re-hashing a whole buffer in one call (the image bodies here are
//! streamed through `digest_extend`, not held in memory at once).
//!
//! RSA modexp genuinely needs a heap (`num-bigint-dig`'s `BigUint`), the
//! same reason the source crate links `linked_list_allocator`. This crate
//! declares `extern crate alloc` for that reason alone — every byte this
//! crate itself stages (keys, hashes, parsed headers) still goes through
//! the no-alloc workbuf arena; only the RSA library's own internals
//! allocate, and that allocation is opaque to us per §1 ("raw
//! cryptographic primitives ... treated as a library the core calls").

use alloc::vec::Vec;

use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use zeroize::Zeroize;

use crate::error::{VbError, VbResult};

/// Digest algorithms the wire format can name. Only the ones enabled by
/// a matching Cargo feature (`sha1`/`sha256`/`sha512`) actually work;
/// the others parse fine but fail with [`VbError::DigestAlgorithmUnsupported`]
/// at first use, matching "any subset selectable at build time."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    pub const fn output_size(self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha512 => 64,
        }
    }
}

/// The wire algorithm tag packed keys and signatures carry: a (key size,
/// digest) pair, numbered the way the format this was distilled from
/// numbers them. Exact numeric values are an Open Question resolved in
/// DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum KeyAlgorithm {
    Rsa1024Sha1 = 0,
    Rsa1024Sha256 = 1,
    Rsa1024Sha512 = 2,
    Rsa2048Sha1 = 3,
    Rsa2048Sha256 = 4,
    Rsa2048Sha512 = 5,
    Rsa4096Sha1 = 6,
    Rsa4096Sha256 = 7,
    Rsa4096Sha512 = 8,
    Rsa8192Sha1 = 9,
    Rsa8192Sha256 = 10,
    Rsa8192Sha512 = 11,
}

impl KeyAlgorithm {
    pub fn from_u64(v: u64) -> VbResult<Self> {
        Ok(match v {
            0 => Self::Rsa1024Sha1,
            1 => Self::Rsa1024Sha256,
            2 => Self::Rsa1024Sha512,
            3 => Self::Rsa2048Sha1,
            4 => Self::Rsa2048Sha256,
            5 => Self::Rsa2048Sha512,
            6 => Self::Rsa4096Sha1,
            7 => Self::Rsa4096Sha256,
            8 => Self::Rsa4096Sha512,
            9 => Self::Rsa8192Sha1,
            10 => Self::Rsa8192Sha256,
            11 => Self::Rsa8192Sha512,
            _ => return Err(VbError::UnpackKeyAlgorithm),
        })
    }

    pub const fn digest(self) -> DigestAlgorithm {
        match self {
            Self::Rsa1024Sha1 | Self::Rsa2048Sha1 | Self::Rsa4096Sha1 | Self::Rsa8192Sha1 => {
                DigestAlgorithm::Sha1
            }
            Self::Rsa1024Sha256 | Self::Rsa2048Sha256 | Self::Rsa4096Sha256 | Self::Rsa8192Sha256 => {
                DigestAlgorithm::Sha256
            }
            Self::Rsa1024Sha512 | Self::Rsa2048Sha512 | Self::Rsa4096Sha512 | Self::Rsa8192Sha512 => {
                DigestAlgorithm::Sha512
            }
        }
    }

    pub const fn key_size_bits(self) -> usize {
        match self {
            Self::Rsa1024Sha1 | Self::Rsa1024Sha256 | Self::Rsa1024Sha512 => 1024,
            Self::Rsa2048Sha1 | Self::Rsa2048Sha256 | Self::Rsa2048Sha512 => 2048,
            Self::Rsa4096Sha1 | Self::Rsa4096Sha256 | Self::Rsa4096Sha512 => 4096,
            Self::Rsa8192Sha1 | Self::Rsa8192Sha256 | Self::Rsa8192Sha512 => 8192,
        }
    }
}

/// Hash-extend interface (§4.2): `init`, repeated `extend`, `finalize`.
/// Holding the hasher as an enum rather than `Box<dyn Digest>` keeps this
/// allocation-free regardless of which algorithm is selected.
pub enum DigestContext {
    #[cfg(feature = "sha1")]
    Sha1(sha1::Sha1),
    #[cfg(feature = "sha256")]
    Sha256(sha2::Sha256),
    #[cfg(feature = "sha512")]
    Sha512(sha2::Sha512),
}

impl DigestContext {
    pub fn init(alg: DigestAlgorithm) -> VbResult<Self> {
        match alg {
            #[cfg(feature = "sha1")]
            DigestAlgorithm::Sha1 => Ok(Self::Sha1(<sha1::Sha1 as digest::Digest>::new())),
            #[cfg(not(feature = "sha1"))]
            DigestAlgorithm::Sha1 => Err(VbError::DigestAlgorithmUnsupported),

            #[cfg(feature = "sha256")]
            DigestAlgorithm::Sha256 => Ok(Self::Sha256(<sha2::Sha256 as digest::Digest>::new())),
            #[cfg(not(feature = "sha256"))]
            DigestAlgorithm::Sha256 => Err(VbError::DigestAlgorithmUnsupported),

            #[cfg(feature = "sha512")]
            DigestAlgorithm::Sha512 => Ok(Self::Sha512(<sha2::Sha512 as digest::Digest>::new())),
            #[cfg(not(feature = "sha512"))]
            DigestAlgorithm::Sha512 => Err(VbError::DigestAlgorithmUnsupported),
        }
    }

    pub fn extend(&mut self, buf: &[u8]) {
        match self {
            #[cfg(feature = "sha1")]
            Self::Sha1(h) => digest::Digest::update(h, buf),
            #[cfg(feature = "sha256")]
            Self::Sha256(h) => digest::Digest::update(h, buf),
            #[cfg(feature = "sha512")]
            Self::Sha512(h) => digest::Digest::update(h, buf),
        }
    }

    /// Finalize into `dst`, returning the number of bytes written.
    /// `dst` must be at least as large as the algorithm's output size.
    pub fn finalize(self, dst: &mut [u8]) -> VbResult<usize> {
        match self {
            #[cfg(feature = "sha1")]
            Self::Sha1(h) => {
                let out = digest::Digest::finalize(h);
                if dst.len() < out.len() {
                    return Err(VbError::SignatureSizeMismatch);
                }
                dst[..out.len()].copy_from_slice(&out);
                Ok(out.len())
            }
            #[cfg(feature = "sha256")]
            Self::Sha256(h) => {
                let out = digest::Digest::finalize(h);
                if dst.len() < out.len() {
                    return Err(VbError::SignatureSizeMismatch);
                }
                dst[..out.len()].copy_from_slice(&out);
                Ok(out.len())
            }
            #[cfg(feature = "sha512")]
            Self::Sha512(h) => {
                let out = digest::Digest::finalize(h);
                if dst.len() < out.len() {
                    return Err(VbError::SignatureSizeMismatch);
                }
                dst[..out.len()].copy_from_slice(&out);
                Ok(out.len())
            }
        }
    }
}

/// RSA public key material, as decoded by `unpack_key` from a packed
/// key's wire bytes: a little-endian array of 32-bit modulus words, the
/// same representation `num-bigint-dig`'s `BigUint::new` expects, so no
/// endianness juggling is needed beyond the initial word read.
pub struct RsaVerifyKey {
    pub algorithm: KeyAlgorithm,
    pub modulus_words: Vec<u32>,
    pub exponent: u32,
}

/// RSA-verify `signature` against `digest` (already computed by
/// [`DigestContext`]) using `key`. The digest algorithm is taken from
/// `key.algorithm`, matching the wire format where a key's tag fixes
/// both its size and the hash it must be paired with.
///
/// Policy (§4.2): the caller is expected to have placed `signature` in
/// the workbuf and to zeroize it immediately after this call returns,
/// regardless of outcome — each signature is checked at most once per
/// boot (§8 invariant 3). We zeroize our local copy of the signature
/// bytes here too, since `Pkcs1v15Sign::verify` takes the signature by
/// reference and makes no such promise itself.
pub fn verify_digest(key: &RsaVerifyKey, digest: &[u8], signature: &mut [u8]) -> VbResult<()> {
    let alg = key.algorithm.digest();
    if digest.len() != alg.output_size() {
        return Err(VbError::SignatureSizeMismatch);
    }

    let n = BigUint::new(key.modulus_words.clone());
    let e = BigUint::from(key.exponent);
    let pub_key = RsaPublicKey::new(n, e).map_err(|_| VbError::SignatureInvalid)?;

    let scheme = match alg {
        #[cfg(feature = "sha1")]
        DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
        #[cfg(not(feature = "sha1"))]
        DigestAlgorithm::Sha1 => return Err(VbError::DigestAlgorithmUnsupported),

        #[cfg(feature = "sha256")]
        DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        #[cfg(not(feature = "sha256"))]
        DigestAlgorithm::Sha256 => return Err(VbError::DigestAlgorithmUnsupported),

        #[cfg(feature = "sha512")]
        DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
        #[cfg(not(feature = "sha512"))]
        DigestAlgorithm::Sha512 => return Err(VbError::DigestAlgorithmUnsupported),
    };

    let result = pub_key.verify(scheme, digest, signature);
    signature.zeroize();
    result.map_err(|_| VbError::SignatureInvalid)
}
