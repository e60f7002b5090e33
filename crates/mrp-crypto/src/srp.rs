//! SRP-6a for MRP pair-setup.
//!
//! Uses the 3072-bit prime from RFC 5054, generator g=5 and SHA-512. The
//! proxy plays the server role toward the app; the client role exists so the
//! server can be checked against an independent implementation.

use crate::keys::SharedSecret;
use mrp_core::error::{AuthFailure, CryptoError};
use num_bigint::{BigUint, RandBigInt};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// N size in bytes (3072 bits = 384 bytes).
const N_BYTES: usize = 384;

/// Length of the random salt.
pub const SALT_LEN: usize = 16;

/// RFC 5054 3072-bit prime N as hex string.
const RFC5054_N_3072: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E08",
    "8A67CC74020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B",
    "302B0A6DF25F14374FE1356D6D51C245E485B576625E7EC6F44C42E9",
    "A637ED6B0BFF5CB6F406B7EDEE386BFB5A899FA5AE9F24117C4B1FE6",
    "49286651ECE45B3DC2007CB8A163BF0598DA48361C55D39A69163FA8",
    "FD24CF5F83655D23DCA3AD961C62F356208552BB9ED529077096966D",
    "670C354E4ABC9804F1746C08CA18217C32905E462E36CE3BE39E772C",
    "180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718",
    "3995497CEA956AE515D2261898FA051015728E5A8AAAC42DAD33170D",
    "04507A33A85521ABDF1CBA64ECFB850458DBEF0A8AEA71575D060C7D",
    "B3970F85A6E1E4C7ABF5AE8CDB0933D71E8C94E04A25619DCEE3D226",
    "1AD2EE6BF12FFA06D98A0864D87602733EC86A64521F2B18177B200C",
    "BBE117577A615D6C770988C0BAD946E208E24FA074E5AB3143DB5BFC",
    "E0FD108E4B82D120A93AD2CAFFFFFFFFFFFFFFFF"
);

/// SRP-6a group parameters.
pub struct SrpParams {
    pub n: BigUint,
    pub g: BigUint,
}

impl Default for SrpParams {
    fn default() -> Self {
        let n = BigUint::parse_bytes(RFC5054_N_3072.as_bytes(), 16)
            .expect("Invalid RFC 5054 prime constant");
        let g = BigUint::from(5u32);
        Self { n, g }
    }
}

/// Salt and server public value sent in pair-setup step 2.
pub struct SrpChallenge {
    pub salt: [u8; SALT_LEN],
    pub server_public_key: Vec<u8>,
}

/// Outcome of checking the client's proof M1.
#[derive(Debug, PartialEq, Eq)]
pub enum ProofVerdict {
    /// M1 matched; `server_proof` is M2 to send back.
    Accepted { server_proof: Vec<u8> },
    Rejected(AuthFailure),
}

/// Server side of one SRP exchange.
#[derive(ZeroizeOnDrop)]
pub struct SrpServer {
    #[zeroize(skip)]
    params: SrpParams,
    identity: Vec<u8>,
    salt: [u8; SALT_LEN],
    #[zeroize(skip)]
    verifier: BigUint,
    private_key: Vec<u8>,
    #[zeroize(skip)]
    public_key: BigUint,
    session_key: Option<SharedSecret>,
}

impl SrpServer {
    /// Start a server session for `identity`/`password`.
    ///
    /// `salt` and `private_key` are random unless supplied.
    pub fn new(
        identity: &[u8],
        password: &[u8],
        salt: Option<[u8; SALT_LEN]>,
        private_key: Option<&[u8]>,
    ) -> Self {
        let params = SrpParams::default();

        let salt = salt.unwrap_or_else(|| {
            let mut salt = [0u8; SALT_LEN];
            OsRng.fill_bytes(&mut salt);
            salt
        });

        let x = compute_x(&salt, identity, password);
        let verifier = params.g.modpow(&x, &params.n);

        let b = match private_key {
            Some(bytes) => BigUint::from_bytes_be(bytes),
            None => OsRng.gen_biguint(256),
        };

        // B = (k*v + g^b) mod N
        let k = compute_k(&params);
        let k_v = (&k * &verifier) % &params.n;
        let g_b = params.g.modpow(&b, &params.n);
        let public_key = (&k_v + &g_b) % &params.n;

        Self {
            params,
            identity: identity.to_vec(),
            salt,
            verifier,
            private_key: b.to_bytes_be(),
            public_key,
            session_key: None,
        }
    }

    pub fn challenge(&self) -> SrpChallenge {
        SrpChallenge {
            salt: self.salt,
            server_public_key: pad_to_n(&self.public_key),
        }
    }

    /// Check the client's public value A and proof M1.
    ///
    /// A malformed A is an error; a well-formed A with the wrong proof is a
    /// [`ProofVerdict::Rejected`].
    pub fn verify_client(
        &mut self,
        client_public: &[u8],
        client_proof: &[u8],
    ) -> Result<ProofVerdict, CryptoError> {
        let a = BigUint::from_bytes_be(client_public);
        if (&a % &self.params.n).bits() == 0 {
            return Err(CryptoError::InvalidPublicKey(
                "SRP client value A mod N = 0".to_string(),
            ));
        }

        let u = compute_u(&a, &self.public_key);
        if u.bits() == 0 {
            return Err(CryptoError::KeyDerivation("SRP u = 0".to_string()));
        }

        // S = (A * v^u)^b mod N
        let b = BigUint::from_bytes_be(&self.private_key);
        let v_u = self.verifier.modpow(&u, &self.params.n);
        let base = (&a * &v_u) % &self.params.n;
        let s = base.modpow(&b, &self.params.n);

        let session_key = Sha512::digest(pad_to_n(&s)).to_vec();

        let expected = compute_m1(
            &self.params,
            &self.identity,
            &self.salt,
            &a,
            &self.public_key,
            &session_key,
        );

        if !bool::from(expected.ct_eq(client_proof)) {
            return Ok(ProofVerdict::Rejected(AuthFailure::ProofMismatch));
        }

        let server_proof = compute_m2(&a, &expected, &session_key);
        self.session_key = Some(SharedSecret::new(session_key));
        Ok(ProofVerdict::Accepted { server_proof })
    }

    /// Session key K, available once a proof has been accepted.
    pub fn session_key(&self) -> Option<&SharedSecret> {
        self.session_key.as_ref()
    }
}

/// Client side of one SRP exchange.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SrpClient {
    #[zeroize(skip)]
    params: SrpParams,
    identity: Vec<u8>,
    password: Vec<u8>,
    private_key: Vec<u8>,
    #[zeroize(skip)]
    public_key: BigUint,
}

/// Client proof and the values derived alongside it.
pub struct SrpProof {
    pub client_proof: Vec<u8>,
    pub session_key: SharedSecret,
    pub expected_server_proof: Vec<u8>,
}

impl SrpClient {
    pub fn new(identity: &[u8], password: &[u8]) -> Self {
        let a = OsRng.gen_biguint(256);
        Self::with_private(identity, password, a)
    }

    pub fn with_private_key(identity: &[u8], password: &[u8], private_key: &[u8]) -> Self {
        Self::with_private(identity, password, BigUint::from_bytes_be(private_key))
    }

    fn with_private(identity: &[u8], password: &[u8], a: BigUint) -> Self {
        let params = SrpParams::default();
        let public_key = params.g.modpow(&a, &params.n);
        Self {
            params,
            identity: identity.to_vec(),
            password: password.to_vec(),
            private_key: a.to_bytes_be(),
            public_key,
        }
    }

    /// Client public value A, padded to 384 bytes.
    pub fn public_key(&self) -> Vec<u8> {
        pad_to_n(&self.public_key)
    }

    /// Compute M1 and K for the server's challenge.
    pub fn process_challenge(&self, challenge: &SrpChallenge) -> Result<SrpProof, CryptoError> {
        let b = BigUint::from_bytes_be(&challenge.server_public_key);
        if (&b % &self.params.n).bits() == 0 {
            return Err(CryptoError::InvalidPublicKey(
                "SRP server value B mod N = 0".to_string(),
            ));
        }

        let u = compute_u(&self.public_key, &b);
        if u.bits() == 0 {
            return Err(CryptoError::KeyDerivation("SRP u = 0".to_string()));
        }

        let a = BigUint::from_bytes_be(&self.private_key);
        let x = compute_x(&challenge.salt, &self.identity, &self.password);
        let k = compute_k(&self.params);

        // S = (B - k * g^x)^(a + u*x) mod N
        let g_x = self.params.g.modpow(&x, &self.params.n);
        let k_gx = (&k * &g_x) % &self.params.n;
        let base = if b >= k_gx {
            (&b - &k_gx) % &self.params.n
        } else {
            (&b + &self.params.n - &k_gx) % &self.params.n
        };
        let exponent = &a + &u * &x;
        let s = base.modpow(&exponent, &self.params.n);

        let session_key = Sha512::digest(pad_to_n(&s)).to_vec();
        let client_proof = compute_m1(
            &self.params,
            &self.identity,
            &challenge.salt,
            &self.public_key,
            &b,
            &session_key,
        );
        let expected_server_proof = compute_m2(&self.public_key, &client_proof, &session_key);

        Ok(SrpProof {
            client_proof,
            session_key: SharedSecret::new(session_key),
            expected_server_proof,
        })
    }

    pub fn verify_server_proof(&self, proof: &[u8], expected: &[u8]) -> bool {
        proof.ct_eq(expected).into()
    }
}

/// M1 = H(H(N) xor H(g) || H(I) || salt || PAD(A) || PAD(B) || K)
///
/// H(g) is taken over the unpadded generator byte.
fn compute_m1(
    params: &SrpParams,
    identity: &[u8],
    salt: &[u8],
    a: &BigUint,
    b: &BigUint,
    k: &[u8],
) -> Vec<u8> {
    let h_n = Sha512::digest(pad_to_n(&params.n));
    let h_g = Sha512::digest(params.g.to_bytes_be());

    let mut xor_result = [0u8; 64];
    for (out, (n, g)) in xor_result.iter_mut().zip(h_n.iter().zip(h_g.iter())) {
        *out = n ^ g;
    }

    let mut hasher = Sha512::new();
    hasher.update(xor_result);
    hasher.update(Sha512::digest(identity));
    hasher.update(salt);
    hasher.update(pad_to_n(a));
    hasher.update(pad_to_n(b));
    hasher.update(k);
    hasher.finalize().to_vec()
}

/// M2 = H(PAD(A) || M1 || K)
fn compute_m2(a: &BigUint, m1: &[u8], k: &[u8]) -> Vec<u8> {
    let mut hasher = Sha512::new();
    hasher.update(pad_to_n(a));
    hasher.update(m1);
    hasher.update(k);
    hasher.finalize().to_vec()
}

/// Pad to N_BYTES with leading zeros.
fn pad_to_n(value: &BigUint) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    if bytes.len() >= N_BYTES {
        bytes[bytes.len() - N_BYTES..].to_vec()
    } else {
        let mut padded = vec![0u8; N_BYTES - bytes.len()];
        padded.extend_from_slice(&bytes);
        padded
    }
}

/// k = H(N || PAD(g))
fn compute_k(params: &SrpParams) -> BigUint {
    let mut hasher = Sha512::new();
    hasher.update(pad_to_n(&params.n));
    hasher.update(pad_to_n(&params.g));
    BigUint::from_bytes_be(&hasher.finalize())
}

/// u = H(PAD(A) || PAD(B))
fn compute_u(a: &BigUint, b: &BigUint) -> BigUint {
    let mut hasher = Sha512::new();
    hasher.update(pad_to_n(a));
    hasher.update(pad_to_n(b));
    BigUint::from_bytes_be(&hasher.finalize())
}

/// x = H(salt || H(I || ":" || P))
fn compute_x(salt: &[u8], identity: &[u8], password: &[u8]) -> BigUint {
    let mut inner = Sha512::new();
    inner.update(identity);
    inner.update(b":");
    inner.update(password);

    let mut outer = Sha512::new();
    outer.update(salt);
    outer.update(inner.finalize());
    BigUint::from_bytes_be(&outer.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &[u8] = b"Pair-Setup";

    mod srp_params {
        use super::*;

        #[test]
        fn uses_3072_bit_prime() {
            assert_eq!(SrpParams::default().n.to_bytes_be().len(), 384);
        }

        #[test]
        fn generator_is_5() {
            assert_eq!(SrpParams::default().g, BigUint::from(5u32));
        }

        #[test]
        fn prime_matches_rfc5054() {
            let n_hex = hex::encode(SrpParams::default().n.to_bytes_be()).to_uppercase();
            assert_eq!(n_hex, RFC5054_N_3072);
        }
    }

    mod server {
        use super::*;

        #[test]
        fn challenge_is_padded_with_fixed_salt() {
            let server = SrpServer::new(USER, b"1111", Some([0x5A; 16]), None);
            let challenge = server.challenge();
            assert_eq!(challenge.salt, [0x5A; 16]);
            assert_eq!(challenge.server_public_key.len(), 384);
        }

        #[test]
        fn injected_private_key_is_deterministic() {
            let b = [0x01u8; 32];
            let s1 = SrpServer::new(USER, b"1111", Some([0; 16]), Some(&b));
            let s2 = SrpServer::new(USER, b"1111", Some([0; 16]), Some(&b));
            assert_eq!(
                s1.challenge().server_public_key,
                s2.challenge().server_public_key
            );
        }

        #[test]
        fn random_salt_when_not_supplied() {
            let s1 = SrpServer::new(USER, b"1111", None, None);
            let s2 = SrpServer::new(USER, b"1111", None, None);
            assert_ne!(s1.challenge().salt, s2.challenge().salt);
        }

        #[test]
        fn rejects_zero_client_value() {
            let mut server = SrpServer::new(USER, b"1111", None, None);
            let result = server.verify_client(&[0u8; 384], &[0u8; 64]);
            assert!(matches!(result, Err(CryptoError::InvalidPublicKey(_))));
            assert!(server.session_key().is_none());
        }

        #[test]
        fn no_session_key_before_proof() {
            let server = SrpServer::new(USER, b"1111", None, None);
            assert!(server.session_key().is_none());
        }
    }

    mod client_server {
        use super::*;

        #[test]
        fn server_proof_matches_independent_client() {
            let mut server = SrpServer::new(USER, b"1111", None, None);
            let client = SrpClient::new(USER, b"1111");

            let proof = client.process_challenge(&server.challenge()).unwrap();
            let verdict = server
                .verify_client(&client.public_key(), &proof.client_proof)
                .unwrap();

            match verdict {
                ProofVerdict::Accepted { server_proof } => {
                    assert_eq!(server_proof, proof.expected_server_proof);
                    assert!(client.verify_server_proof(&server_proof, &proof.expected_server_proof));
                }
                ProofVerdict::Rejected(reason) => panic!("rejected: {}", reason),
            }

            assert_eq!(
                server.session_key().unwrap().as_bytes(),
                proof.session_key.as_bytes()
            );
        }

        #[test]
        fn fixed_transcript_is_reproducible() {
            let b = [0x01u8; 32];
            let a = [0x02u8; 32];
            let salt = Some([0x03u8; 16]);

            let run = || {
                let mut server = SrpServer::new(USER, b"1111", salt, Some(&b));
                let client = SrpClient::with_private_key(USER, b"1111", &a);
                let proof = client.process_challenge(&server.challenge()).unwrap();
                let verdict = server
                    .verify_client(&client.public_key(), &proof.client_proof)
                    .unwrap();
                (proof.client_proof, verdict)
            };

            assert_eq!(run(), run());
        }

        #[test]
        fn wrong_pin_is_rejected() {
            let mut server = SrpServer::new(USER, b"1111", None, None);
            let client = SrpClient::new(USER, b"2222");

            let proof = client.process_challenge(&server.challenge()).unwrap();
            let verdict = server
                .verify_client(&client.public_key(), &proof.client_proof)
                .unwrap();

            assert_eq!(verdict, ProofVerdict::Rejected(AuthFailure::ProofMismatch));
            assert!(server.session_key().is_none());
        }

        #[test]
        fn truncated_proof_is_rejected() {
            let mut server = SrpServer::new(USER, b"1111", None, None);
            let client = SrpClient::new(USER, b"1111");
            let proof = client.process_challenge(&server.challenge()).unwrap();

            let verdict = server
                .verify_client(&client.public_key(), &proof.client_proof[..32])
                .unwrap();
            assert!(matches!(verdict, ProofVerdict::Rejected(_)));
        }
    }

    /// Reference values from a separate SRP-6a implementation
    /// (SHA-512, RFC 5054 3072-bit group) for salt 03*16, a 02*32, b 01*32.
    mod known_answer {
        use super::*;

        const SALT: [u8; SALT_LEN] = [0x03; SALT_LEN];
        const A_PRIVATE: [u8; 32] = [0x02; 32];
        const B_PRIVATE: [u8; 32] = [0x01; 32];

        const B_PREFIX: &str = "f66e355eaf9b55d713eab435fb610c2ab2d375e8a9b5ddd7f7d2dfc981d4bd36";
        const M1: &str = concat!(
            "6b78d4363dfc9f391eabdc479fd2a563ba2006026ec715a2636d750faa9e8dae",
            "0bf7ef806475980f3db2d1ad81eab4efa87e29848d7f7273af1ad0151a1159d2"
        );
        const M2: &str = concat!(
            "0ab095ff1837644db5c7efc01f710ccaac687be278c1dc9fcdd4d4cc0ea473f8",
            "437c21e39a6c52a5cc272392b60912eeef1c31f030f7a2bf021836bd43ef6699"
        );
        const K: &str = concat!(
            "4e891f46a774b5509aec2dafaad469ba51104d91f1b2107d899f833b5cf2a74c",
            "f7836cdae8b13b6756f88f2d109f6b4397c94277e84271637cee818b5b852d3a"
        );

        #[test]
        fn server_public_value() {
            let server = SrpServer::new(USER, b"1111", Some(SALT), Some(&B_PRIVATE));
            let challenge = server.challenge();
            assert_eq!(challenge.server_public_key.len(), N_BYTES);
            assert_eq!(hex::encode(&challenge.server_public_key[..32]), B_PREFIX);
        }

        #[test]
        fn client_proof_and_session_key() {
            let server = SrpServer::new(USER, b"1111", Some(SALT), Some(&B_PRIVATE));
            let client = SrpClient::with_private_key(USER, b"1111", &A_PRIVATE);

            let proof = client.process_challenge(&server.challenge()).unwrap();
            assert_eq!(hex::encode(&proof.client_proof), M1);
            assert_eq!(hex::encode(&proof.expected_server_proof), M2);
            assert_eq!(hex::encode(proof.session_key.as_bytes()), K);
        }

        #[test]
        fn server_accepts_reference_proof() {
            let mut server = SrpServer::new(USER, b"1111", Some(SALT), Some(&B_PRIVATE));
            let client = SrpClient::with_private_key(USER, b"1111", &A_PRIVATE);

            let verdict = server
                .verify_client(&client.public_key(), &hex::decode(M1).unwrap())
                .unwrap();

            assert_eq!(
                verdict,
                ProofVerdict::Accepted {
                    server_proof: hex::decode(M2).unwrap()
                }
            );
            assert_eq!(hex::encode(server.session_key().unwrap().as_bytes()), K);
        }
    }

    mod helpers {
        use super::*;

        #[test]
        fn pad_to_n_left_pads() {
            let padded = pad_to_n(&BigUint::from(5u32));
            assert_eq!(padded.len(), 384);
            assert_eq!(padded[383], 5);
            assert!(padded[..383].iter().all(|&b| b == 0));
        }

        #[test]
        fn compute_x_is_double_hash() {
            let salt = [0x01u8; 16];
            let inner = Sha512::digest(b"Pair-Setup:1111");
            let mut outer = Sha512::new();
            outer.update(salt);
            outer.update(inner);
            let expected = BigUint::from_bytes_be(&outer.finalize());

            assert_eq!(compute_x(&salt, b"Pair-Setup", b"1111"), expected);
        }
    }
}
