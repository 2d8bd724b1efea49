//! List command implementation

use super::format_size;
use owmem_core::catalog::BankCatalog;

/// List all known banks
pub fn list_banks(db: &BankCatalog, device_filter: Option<&str>) {
    println!("Known memory banks:");
    println!();
    println!(
        "{:<8} {:>6} {:>4} {:<32} {:>8} {:>6}",
        "Device", "Family", "Bank", "Name", "Size", "Pages"
    );
    println!("{}", "-".repeat(70));

    let mut device = "";
    let mut index = 0;
    for entry in db.iter() {
        if let Some(filter) = device_filter {
            if !entry.device.to_lowercase().contains(&filter.to_lowercase()) {
                continue;
            }
        }

        // Bank indices count within a device
        if entry.device != device {
            device = &entry.device;
            index = 0;
        }

        let d = &entry.config.descriptor;
        println!(
            "{:<8} {:>#6x} {:>4} {:<32} {:>8} {:>6}",
            entry.device,
            entry.family,
            index,
            entry.config.name.as_str(),
            format_size(d.size),
            d.page_count()
        );
        index += 1;
    }
}
