//! Info command implementation

use super::{format_size, Target};
use owmem_core::adapter::Adapter;
use owmem_core::bank::{BankFeatures, ReadMode, WriteMode};

/// Show what is known about the target bank
pub fn run_info(target: &Target) -> Result<(), Box<dyn std::error::Error>> {
    let bank = &target.bank;
    let d = bank.descriptor();

    println!("Memory Bank Information");
    println!("=======================");
    println!();
    println!("Device:          {} ({})", target.device, target.session.rom);
    println!("Bank:            {}", bank.name());
    println!("Size:            {} bytes ({})", d.size, format_size(d.size));
    println!("Page length:     {} bytes", d.page_length);
    println!("Pages:           {}", d.page_count());
    println!("Start address:   0x{:04X}", d.start_physical_address);
    println!("Speed:           {:?}", bank.config().speed);

    let max_packet = bank.max_packet_data_length();
    if max_packet > 0 {
        println!("Max packet:      {} bytes", max_packet);
    } else {
        println!("Max packet:      packets not supported");
    }
    if d.has(BankFeatures::EXTRA_INFO) {
        println!(
            "Extra info:      {} bytes ({})",
            d.extra_info_length,
            d.extra_info_description.as_str()
        );
    }

    println!();
    let read = match bank.config().read {
        ReadMode::Direct { command } => format!("direct (0x{:02X})", command),
        ReadMode::Pages => "CRC pages".to_string(),
        ReadMode::Scratchpad => "recall to scratchpad".to_string(),
        ReadMode::Register { command, .. } => format!("registers (0x{:02X})", command),
    };
    println!("Read:            {}", read);
    if let Some(crc) = bank.config().page_crc {
        let gate = if crc.credential { ", credential" } else { "" };
        println!("CRC page read:   0x{:02X}{}", crc.command, gate);
    }
    let write = match &bank.config().write {
        WriteMode::None => "not writable".to_string(),
        WriteMode::Direct(w) => format!("direct (0x{:02X}, echo {:?})", w.command, w.echo),
        WriteMode::Scratchpad(sp) => format!(
            "{}-byte scratchpad, copy 0x{:02X}",
            sp.length, sp.copy_command
        ),
        WriteMode::Register(reg) => format!(
            "registers {}..={} (0x{:02X})",
            reg.writable_start, reg.writable_end, reg.command
        ),
    };
    println!("Write:           {}", write);
    println!("Features:        {:?}", d.features);

    println!();
    println!("Adapter:         {:?}", target.session.bus.features());

    Ok(())
}
