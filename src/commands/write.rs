//! Write command implementation

use super::Target;
use std::fs;
use std::path::Path;

/// Run the write command
pub fn run_write(
    target: &mut Target,
    input: &Path,
    start: u32,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    println!("Read {} bytes from {:?}", data.len(), input);

    let size = target.bank.size();
    if u64::from(start) + data.len() as u64 > u64::from(size) {
        return Err(format!(
            "File size ({} bytes) at 0x{:X} exceeds bank size ({} bytes)",
            data.len(),
            start,
            size
        )
        .into());
    }

    target.bank.set_write_verification(verify);
    target.bank.write(&mut target.session.bus, start, &data)?;

    println!(
        "Wrote {} bytes to '{}' at 0x{:X}{}",
        data.len(),
        target.bank.name(),
        start,
        if verify { ", verified" } else { "" }
    );
    Ok(())
}
