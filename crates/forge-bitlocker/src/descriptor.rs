//! Converts a parsed [`crate::parser::BitlockerVolume`] into the shared
//! [`forge_ports::descriptor::FormatDescriptor`] contract.
use forge_ports::descriptor::{BitlockerInfo, FormatDescriptor, KeyProtector};

use crate::parser::BitlockerVolume;

pub fn to_format_descriptor(volume: &BitlockerVolume) -> FormatDescriptor {
    FormatDescriptor::Bitlocker(BitlockerInfo {
        encryption_method: volume.encryption_method.clone(),
        creation_time_epoch: volume.creation_time_epoch,
        description: volume.description.clone(),
        key_protectors: volume
            .key_protectors
            .iter()
            .map(|p| KeyProtector {
                guid: p.guid.to_string(),
                protection_type: p.kind.to_string(),
            })
            .collect(),
    })
}
