//! Converts a parsed [`crate::parser::LuksVolume`] into the shared
//! [`forge_ports::descriptor::FormatDescriptor`] contract.
use forge_ports::descriptor::{FormatDescriptor, LuksInfo};

use crate::parser::LuksVolume;

pub fn to_format_descriptor(volume: &LuksVolume) -> FormatDescriptor {
    FormatDescriptor::Luks(LuksInfo {
        version: volume.version,
        cipher: volume.cipher.clone(),
        mode: volume.mode.clone(),
        hash: volume.hash.clone(),
        key_size_bits: volume.key_size_bits,
        active_slots: volume.active_slots.clone(),
        guid: volume.guid.clone(),
    })
}
