//! Revision 6 (AES-256, "Algorithm 2.B") password verification, ISO
//! 32000-2 §7.6.4.3.4.
use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockEncryptMut, KeyIvInit};
use sha2::{Digest, Sha256, Sha384, Sha512};

use forge_ports::descriptor::PdfDescV6;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

fn aes128_cbc_encrypt_no_padding(key: &[u8], iv: &[u8], data: &[u8]) -> Vec<u8> {
    Aes128CbcEnc::new_from_slices(key, iv)
        .expect("K[0..16]/K[16..32] are always exactly 16 bytes")
        .encrypt_padded_vec_mut::<NoPadding>(data)
}

/// Algorithm 2.B. `extra` is empty for the user check, or `U[0..48]` for
/// the owner check.
fn algorithm_2b(password: &[u8], salt: &[u8], extra: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    hasher.update(extra);
    let mut k = hasher.finalize().to_vec();

    let mut round = 0u32;
    loop {
        let mut k0 = Vec::with_capacity(password.len() + k.len() + extra.len());
        k0.extend_from_slice(password);
        k0.extend_from_slice(&k);
        k0.extend_from_slice(extra);
        let k1 = k0.repeat(64);

        let e = aes128_cbc_encrypt_no_padding(&k[0..16], &k[16..32], &k1);

        // The modulus of a base-256 number by 3 equals the sum of its
        // digits mod 3, since 256 ≡ 1 (mod 3).
        let modulus: u32 = e[..16].iter().map(|b| *b as u32).sum::<u32>() % 3;
        k = match modulus {
            0 => Sha256::digest(&e).to_vec(),
            1 => Sha384::digest(&e).to_vec(),
            _ => Sha512::digest(&e).to_vec(),
        };

        let last = *e.last().expect("E is never empty");
        if round >= 64 && (last as u32) <= round - 32 {
            break;
        }
        round += 1;
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&k[..32]);
    out
}

pub fn check_user_password(desc: &PdfDescV6, password: &[u8]) -> bool {
    let result = algorithm_2b(password, &desc.u_key[32..40], &[]);
    result == desc.u_key[..32]
}

pub fn check_owner_password(desc: &PdfDescV6, password: &[u8]) -> bool {
    let result = algorithm_2b(password, &desc.o_key[32..40], &desc.u_key);
    result == desc.o_key[..32]
}

pub fn verify(desc: &PdfDescV6, password: &[u8]) -> bool {
    check_user_password(desc, password) || check_owner_password(desc, password)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc_for(password: &[u8]) -> PdfDescV6 {
        let mut desc = PdfDescV6 { o_key: [0u8; 48], u_key: [0u8; 48] };
        desc.u_key[32..40].copy_from_slice(b"saltsalt");
        let hash = algorithm_2b(password, &desc.u_key[32..40], &[]);
        desc.u_key[..32].copy_from_slice(&hash);
        desc
    }

    #[test]
    fn accepts_correct_user_password() {
        let desc = desc_for(b"correct horse battery staple");
        assert!(check_user_password(&desc, b"correct horse battery staple"));
        assert!(!check_user_password(&desc, b"wrong"));
    }

    #[test]
    fn accepts_unicode_password() {
        let desc = desc_for("hëllo-🌍".as_bytes());
        assert!(check_user_password(&desc, "hëllo-🌍".as_bytes()));
    }
}
