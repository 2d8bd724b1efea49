//! Adapter registration and opening
//!
//! Adapters are named on the command line as `name` or
//! `name:key1=value1,key2=value2`.

use owmem_core::rom::RomId;
use owmem_dummy::DummyNetwork;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Information about an adapter
pub struct AdapterInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// All adapters this build knows about
pub fn available_adapters() -> Vec<AdapterInfo> {
    vec![AdapterInfo {
        name: "dummy",
        aliases: &["sim"],
        description: "Simulated network with one device (image=<file>,serial=<hex>)",
    }]
}

/// Parsed adapter parameters
pub struct AdapterParams {
    /// Adapter name as given
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

/// Parse an adapter string into name and parameters
pub fn parse_adapter_params(s: &str) -> Result<AdapterParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(AdapterParams {
        name: name.to_string(),
        params,
    })
}

/// An open adapter and the device commands talk to
pub struct Session {
    /// The bus
    pub bus: DummyNetwork,
    /// Address of the target device
    pub rom: RomId,
    image: Option<PathBuf>,
}

impl Session {
    /// Close the session, saving the simulated memory if an image was given
    pub fn finish(self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(path) = &self.image {
            let memory = self
                .bus
                .memory(self.rom)
                .ok_or("Simulated device disappeared")?;
            fs::write(path, memory)?;
            log::info!("Saved {} bytes of device memory to {}", memory.len(), path.display());
        }
        Ok(())
    }
}

/// Open the adapter named by `adapter` with a device of `family` on it
pub fn open_adapter(adapter: &str, family: u8) -> Result<Session, Box<dyn std::error::Error>> {
    let params = parse_adapter_params(adapter)?;

    match params.name.as_str() {
        "dummy" | "sim" => open_dummy(&params, family),
        _ => Err(unknown_adapter_error(&params.name)),
    }
}

fn open_dummy(params: &AdapterParams, family: u8) -> Result<Session, Box<dyn std::error::Error>> {
    let serial = match params.params.get("serial") {
        Some(s) => {
            let hex = s.trim_start_matches("0x");
            let serial = u64::from_str_radix(hex, 16)
                .map_err(|e| format!("Invalid serial '{}': {}", s, e))?;
            if serial >> 48 != 0 {
                return Err(format!("Serial '{}' does not fit in 48 bits", s).into());
            }
            serial
        }
        None => 1,
    };
    let rom = RomId::from_family_serial(family, serial);

    let mut bus = DummyNetwork::new();
    bus.attach_family(rom)
        .map_err(|_| format!("No simulated device for family 0x{:02X}", family))?;
    log::debug!("Simulating device {}", rom);

    let image = params.params.get("image").map(PathBuf::from);
    if let Some(path) = image.as_ref().filter(|p| p.exists()) {
        let data = fs::read(path)?;
        let memory = bus
            .memory_mut(rom)
            .ok_or("Simulated device has no memory")?;
        let n = data.len().min(memory.len());
        memory[..n].copy_from_slice(&data[..n]);
        log::info!("Loaded {} bytes of device memory from {}", n, path.display());
    }

    Ok(Session { bus, rom, image })
}

fn unknown_adapter_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown adapter: {}\n\nAvailable adapters:\n", name);
    for a in available_adapters() {
        let aliases = if a.aliases.is_empty() {
            String::new()
        } else {
            format!(" (also: {})", a.aliases.join(", "))
        };
        msg.push_str(&format!("  {:8} - {}{}\n", a.name, a.description, aliases));
    }
    msg.into()
}
