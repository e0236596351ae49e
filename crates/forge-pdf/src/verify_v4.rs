//! Standard security handler password verification for revisions 2-4
//! (ISO 32000-1 Algorithms 2, 3, 4, 5, 6, 7).
use md5::{Digest, Md5};
use rc4::{KeyInit, Rc4, StreamCipher};

use forge_ports::descriptor::PdfDescV4;

const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let n = password.len().min(32);
    out[..n].copy_from_slice(&password[..n]);
    if n < 32 {
        out[n..].copy_from_slice(&PADDING[..32 - n]);
    }
    out
}

fn key_byte_len(desc: &PdfDescV4) -> usize {
    if desc.revision == 2 {
        5
    } else {
        (desc.key_length_bits / 8) as usize
    }
}

/// RC4 (ARCFOUR) with a key of any length from 5 to 16 bytes, matching the
/// range the standard security handler can produce.
fn rc4_apply(key: &[u8], data: &mut [u8]) {
    use rc4::consts::*;
    match key.len() {
        5 => Rc4::<U5>::new(key.into()).apply_keystream(data),
        6 => Rc4::<U6>::new(key.into()).apply_keystream(data),
        7 => Rc4::<U7>::new(key.into()).apply_keystream(data),
        8 => Rc4::<U8>::new(key.into()).apply_keystream(data),
        9 => Rc4::<U9>::new(key.into()).apply_keystream(data),
        10 => Rc4::<U10>::new(key.into()).apply_keystream(data),
        11 => Rc4::<U11>::new(key.into()).apply_keystream(data),
        12 => Rc4::<U12>::new(key.into()).apply_keystream(data),
        13 => Rc4::<U13>::new(key.into()).apply_keystream(data),
        14 => Rc4::<U14>::new(key.into()).apply_keystream(data),
        15 => Rc4::<U15>::new(key.into()).apply_keystream(data),
        16 => Rc4::<U16>::new(key.into()).apply_keystream(data),
        other => panic!("unsupported RC4 key length {other}"),
    }
}

fn rc4_encrypt(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut buf = data.to_vec();
    rc4_apply(key, &mut buf);
    buf
}

/// Algorithm 2: derives the file encryption key from a padded password.
fn file_key(desc: &PdfDescV4, padded_password: &[u8; 32]) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(padded_password);
    hasher.update(desc.o_key);
    hasher.update(desc.permissions);
    hasher.update(&desc.document_id);
    if desc.revision >= 4 && !desc.metadata_encrypted {
        hasher.update([0xff, 0xff, 0xff, 0xff]);
    }
    let mut digest = hasher.finalize().to_vec();

    let n = key_byte_len(desc);
    if desc.revision >= 3 {
        for _ in 0..50 {
            let mut h = Md5::new();
            h.update(&digest[..n]);
            digest = h.finalize().to_vec();
        }
    }
    digest.truncate(n);
    digest
}

/// Algorithms 4/5/6: computes the expected `U` entry for a file key.
fn computed_u(desc: &PdfDescV4, key: &[u8]) -> Vec<u8> {
    if desc.revision == 2 {
        rc4_encrypt(key, &PADDING)
    } else {
        let mut hasher = Md5::new();
        hasher.update(PADDING);
        hasher.update(&desc.document_id);
        let h = hasher.finalize();
        let mut buf = rc4_encrypt(key, &h);
        for i in 1u8..=19 {
            let round_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
            buf = rc4_encrypt(&round_key, &buf);
        }
        buf
    }
}

/// Tests whether `password` is the document's user password.
pub fn check_user_password(desc: &PdfDescV4, password: &[u8]) -> bool {
    let padded = pad_password(password);
    let key = file_key(desc, &padded);
    let computed = computed_u(desc, &key);
    if desc.revision == 2 {
        computed.as_slice() == &desc.u_key[..]
    } else {
        computed[..16] == desc.u_key[..16]
    }
}

/// Algorithm 7: recovers the user password bytes from a candidate owner
/// password, then tests those bytes as a user password (Algorithm 3).
pub fn check_owner_password(desc: &PdfDescV4, password: &[u8]) -> bool {
    let padded = pad_password(password);
    let mut hasher = Md5::new();
    hasher.update(padded);
    let mut digest = hasher.finalize().to_vec();

    let n = key_byte_len(desc);
    if desc.revision >= 3 {
        for _ in 0..50 {
            let mut h = Md5::new();
            h.update(&digest[..n]);
            digest = h.finalize().to_vec();
        }
    }
    digest.truncate(n);
    let key = digest;

    let recovered = if desc.revision == 2 {
        rc4_encrypt(&key, &desc.o_key)
    } else {
        let mut buf = desc.o_key.to_vec();
        for i in (0u8..=19).rev() {
            let round_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
            buf = rc4_encrypt(&round_key, &buf);
        }
        buf
    };

    check_user_password(desc, &recovered)
}

/// The standard handler accepts a password that matches either role.
pub fn verify(desc: &PdfDescV4, password: &[u8]) -> bool {
    check_user_password(desc, password) || check_owner_password(desc, password)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc_for(password: &[u8], revision: u8, key_length_bits: u32) -> PdfDescV4 {
        let document_id = vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
        let permissions = (-44i32).to_le_bytes();
        let mut desc = PdfDescV4 {
            revision,
            key_length_bits,
            o_key: [0u8; 32],
            u_key: [0u8; 32],
            permissions,
            document_id,
            metadata_encrypted: true,
        };
        desc.o_key.copy_from_slice(&pad_password(b"owner-secret"));
        let padded = pad_password(password);
        let key = file_key(&desc, &padded);
        let u = computed_u(&desc, &key);
        desc.u_key[..u.len().min(32)].copy_from_slice(&u[..u.len().min(32)]);
        desc
    }

    #[test]
    fn accepts_correct_user_password_revision_2() {
        let desc = desc_for(b"hunter2", 2, 40);
        assert!(check_user_password(&desc, b"hunter2"));
        assert!(!check_user_password(&desc, b"wrong"));
    }

    #[test]
    fn accepts_correct_user_password_revision_3() {
        let desc = desc_for(b"hunter2", 3, 128);
        assert!(check_user_password(&desc, b"hunter2"));
        assert!(!check_user_password(&desc, b"wrong"));
    }
}
