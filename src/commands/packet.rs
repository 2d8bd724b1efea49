//! Packet command implementations

use super::{print_hex, Target};
use std::fs;
use std::path::Path;

/// Read the packet stored in `page`
pub fn run_read_packet(
    target: &mut Target,
    page: u32,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut buf = vec![0u8; usize::from(target.bank.max_packet_data_length())];
    let len = target
        .bank
        .read_page_packet(&mut target.session.bus, page, false, &mut buf)?;
    let payload = &buf[..len];

    match output {
        Some(path) => {
            fs::write(path, payload)?;
            println!("Wrote {} byte packet from page {} to {:?}", len, page, path);
        }
        None => match std::str::from_utf8(payload) {
            Ok(text) if !text.chars().any(char::is_control) => println!("{}", text),
            _ => print_hex(0, payload),
        },
    }
    Ok(())
}

/// Write `data` or the contents of `input` as a packet into `page`
pub fn run_write_packet(
    target: &mut Target,
    page: u32,
    data: Option<&str>,
    input: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = match (data, input) {
        (Some(text), _) => text.as_bytes().to_vec(),
        (None, Some(path)) => fs::read(path)?,
        (None, None) => return Err("Packet payload required (--data or --input)".into()),
    };

    let max = target.bank.max_packet_data_length();
    if payload.len() > usize::from(max) {
        return Err(format!(
            "Packet of {} bytes exceeds the {}-byte maximum of '{}'",
            payload.len(),
            max,
            target.bank.name()
        )
        .into());
    }

    target
        .bank
        .write_page_packet(&mut target.session.bus, page, &payload)?;
    println!("Wrote {} byte packet to page {}", payload.len(), page);
    Ok(())
}
