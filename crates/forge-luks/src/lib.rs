//! LUKS1/LUKS2 volume header parsing
//!
//! [`parser`] reads the fixed-offset LUKS1 header or the LUKS2 JSON
//! metadata area and yields the cipher/mode/hash and active key slots.
//! As with [`forge_bitlocker`], there is no per-candidate verifier here:
//! a LUKS key slot's derived master key can only be tested by attempting
//! a real unlock, which is out of scope for this classification crate.
pub mod descriptor;
pub mod error;
pub mod parser;

use std::fs::File;
use std::path::Path;

pub use error::LuksError;
use forge_ports::descriptor::FormatDescriptor;

pub fn classify(path: &Path) -> Result<FormatDescriptor, LuksError> {
    let file = File::open(path)?;
    let volume = parser::parse(file)?;
    Ok(descriptor::to_format_descriptor(&volume))
}
