//! Page dump command implementation

use super::Target;
use owmem_core::bank::BankFeatures;

/// Read every page in one continued read, printing data and extra info
pub fn run_dump_pages(target: &mut Target) -> Result<(), Box<dyn std::error::Error>> {
    let bank = &mut target.bank;
    let bus = &mut target.session.bus;
    let features = bank.features();
    let page_len = usize::from(bank.page_length());
    let extra_len = usize::from(bank.extra_info_length());

    if !features.contains(BankFeatures::PAGE_AUTO_CRC) {
        log::warn!("'{}' has no device CRC; pages are read unchecked", bank.name());
    }
    println!(
        "{} ({}): {} pages of {} bytes",
        bank.name(),
        target.device,
        bank.page_count(),
        page_len
    );

    // Trailing verification bytes break the device's stream between pages
    let chain = bank
        .config()
        .page_crc
        .map_or(true, |crc| crc.verification_bytes == 0);

    let mut page_buf = vec![0u8; page_len];
    let mut extra = vec![0u8; extra_len];
    for page in 0..bank.page_count() {
        let continuing = chain && page > 0;
        if features.contains(BankFeatures::EXTRA_INFO) {
            bank.read_page_with_extra(bus, page, continuing, &mut page_buf, &mut extra)?;
        } else {
            bank.read_page(bus, page, continuing, &mut page_buf)?;
        }

        let hex: Vec<String> = page_buf.iter().map(|b| format!("{:02X}", b)).collect();
        if extra_len > 0 {
            let info: Vec<String> = extra.iter().map(|b| format!("{:02X}", b)).collect();
            println!("Page {:4}: {}  [{}]", page, hex.join(" "), info.join(" "));
        } else {
            println!("Page {:4}: {}", page, hex.join(" "));
        }
    }

    Ok(())
}
