//! owmem-dummy - Simulated single-wire network for testing
//!
//! This crate provides a dummy adapter with emulated memory devices behind
//! it. Every byte slot is recorded in an event log so tests can check what
//! went over the wire, and faults can be injected to exercise the error
//! paths without real hardware.

pub mod models;

use owmem_core::adapter::{Adapter, AdapterFeatures, PowerCondition, PowerDuration, Speed};
use owmem_core::error::{Error, Result};
use owmem_core::rom::RomId;

pub use models::{device_for_family, SimDevice};

/// One thing that happened on the simulated bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    /// Bus reset and address
    Select {
        /// Address sent
        address: RomId,
        /// Whether a device answered
        present: bool,
    },
    /// Presence check
    Presence {
        /// Address checked
        address: RomId,
        /// Whether a device answered
        present: bool,
    },
    /// Speed change
    SetSpeed(Speed),
    /// One byte slot
    Byte {
        /// Byte the master drove
        out: u8,
        /// Byte read back
        back: u8,
    },
    /// Power delivery duration set
    PowerDuration(PowerDuration),
    /// Strong pull-up requested
    PowerStart(PowerCondition),
    /// Strong pull-up released
    PowerNormal,
    /// Program pulse
    ProgramPulse,
    /// Delay
    Delay(u32),
}

struct Slot {
    device: Box<dyn SimDevice>,
    present: bool,
}

/// Dummy adapter
///
/// Emulates a bus with any number of devices for testing purposes.
pub struct DummyNetwork {
    slots: Vec<Slot>,
    features: AdapterFeatures,
    speed: Speed,
    selected: Option<usize>,
    power_armed: bool,
    powered: bool,
    corrupt_in: Option<usize>,
    events: Vec<BusEvent>,
}

impl Default for DummyNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyNetwork {
    /// Create an empty network whose adapter supports everything
    pub fn new() -> Self {
        Self::with_features(AdapterFeatures::all())
    }

    /// Create an empty network whose adapter supports only `features`
    pub fn with_features(features: AdapterFeatures) -> Self {
        Self {
            slots: Vec::new(),
            features,
            speed: Speed::Regular,
            selected: None,
            power_armed: false,
            powered: false,
            corrupt_in: None,
            events: Vec::new(),
        }
    }

    /// Put a device on the bus
    pub fn attach(&mut self, device: Box<dyn SimDevice>) {
        log::debug!("Attaching simulated device {}", device.rom());
        self.slots.push(Slot {
            device,
            present: true,
        });
    }

    /// Put the built-in emulation of `rom`'s family on the bus
    pub fn attach_family(&mut self, rom: RomId) -> Result<()> {
        let device = device_for_family(rom).ok_or(Error::UnsupportedOperation)?;
        self.attach(device);
        Ok(())
    }

    fn slot(&self, address: RomId) -> Option<usize> {
        self.slots.iter().position(|s| s.device.rom() == address)
    }

    /// Simulated device with `address`
    pub fn device(&self, address: RomId) -> Option<&dyn SimDevice> {
        self.slot(address).map(|i| &*self.slots[i].device)
    }

    /// Memory of the device with `address`
    pub fn memory(&self, address: RomId) -> Option<&[u8]> {
        self.slot(address).map(|i| self.slots[i].device.memory())
    }

    /// Mutable memory of the device with `address`
    pub fn memory_mut(&mut self, address: RomId) -> Option<&mut [u8]> {
        let i = self.slot(address)?;
        Some(self.slots[i].device.memory_mut())
    }

    /// Make the device stop (or start) answering resets
    pub fn set_present(&mut self, address: RomId, present: bool) {
        if let Some(i) = self.slot(address) {
            self.slots[i].present = present;
        }
    }

    /// Make the device's next commit fail without confirmation
    pub fn fail_next_commit(&mut self, address: RomId) {
        if let Some(i) = self.slot(address) {
            self.slots[i].device.fail_next_commit();
        }
    }

    /// Flip the lowest bit of the `n`-th byte read from the bus from now on
    /// (0 = the next one)
    pub fn corrupt_read(&mut self, n: usize) {
        self.corrupt_in = Some(n);
    }

    /// Current bus speed
    pub fn speed(&self) -> Speed {
        self.speed
    }

    /// Whether strong pull-up power is on
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Events recorded since creation or the last [`take_events`](Self::take_events)
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    /// Take the recorded events
    pub fn take_events(&mut self) -> Vec<BusEvent> {
        core::mem::take(&mut self.events)
    }

    /// Bytes the master drove during recorded byte slots
    pub fn bytes_sent(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BusEvent::Byte { out, .. } => Some(*out),
                _ => None,
            })
            .collect()
    }

    fn answers(&self, address: RomId) -> Option<usize> {
        self.slot(address).filter(|&i| self.slots[i].present)
    }

    fn transfer(&mut self, out: u8) -> u8 {
        let powered = core::mem::take(&mut self.power_armed);
        if powered {
            self.powered = true;
        }

        let mut back = match self.selected {
            Some(i) if self.slots[i].present => out & self.slots[i].device.transfer(out, powered),
            _ => out,
        };

        if out == 0xFF {
            match self.corrupt_in {
                Some(0) => {
                    log::debug!("Corrupting read byte 0x{:02X}", back);
                    back ^= 0x01;
                    self.corrupt_in = None;
                }
                Some(n) => self.corrupt_in = Some(n - 1),
                None => {}
            }
        }

        self.events.push(BusEvent::Byte { out, back });
        back
    }
}

impl Adapter for DummyNetwork {
    fn features(&self) -> AdapterFeatures {
        self.features
    }

    fn select(&mut self, address: RomId) -> Result<bool> {
        self.selected = self.answers(address);
        if let Some(i) = self.selected {
            self.slots[i].device.select();
        }

        let present = self.selected.is_some();
        self.events.push(BusEvent::Select { address, present });
        Ok(present)
    }

    fn is_present(&mut self, address: RomId) -> Result<bool> {
        // A presence check resets the bus like a select does
        self.selected = None;
        let present = self.answers(address).is_some();
        self.events.push(BusEvent::Presence { address, present });
        Ok(present)
    }

    fn set_speed(&mut self, speed: Speed) -> Result<()> {
        let needed = match speed {
            Speed::Regular => AdapterFeatures::empty(),
            Speed::Flex => AdapterFeatures::FLEX,
            Speed::Overdrive => AdapterFeatures::OVERDRIVE,
        };
        if !self.features.contains(needed) {
            return Err(Error::AdapterFault);
        }

        self.speed = speed;
        self.events.push(BusEvent::SetSpeed(speed));
        Ok(())
    }

    fn put_byte(&mut self, byte: u8) -> Result<()> {
        self.transfer(byte);
        Ok(())
    }

    fn get_byte(&mut self) -> Result<u8> {
        Ok(self.transfer(0xFF))
    }

    fn exchange_block(&mut self, buf: &mut [u8]) -> Result<()> {
        for byte in buf.iter_mut() {
            *byte = self.transfer(*byte);
        }
        Ok(())
    }

    fn set_power_duration(&mut self, duration: PowerDuration) -> Result<()> {
        self.events.push(BusEvent::PowerDuration(duration));
        Ok(())
    }

    fn start_power_delivery(&mut self, condition: PowerCondition) -> Result<()> {
        let needed = match condition {
            PowerCondition::Now => AdapterFeatures::POWER_DELIVERY,
            PowerCondition::AfterNextByte => {
                AdapterFeatures::POWER_DELIVERY | AdapterFeatures::POWER_AFTER_BYTE
            }
        };
        if !self.features.contains(needed) {
            return Err(Error::AdapterFault);
        }
        match condition {
            PowerCondition::Now => self.powered = true,
            PowerCondition::AfterNextByte => self.power_armed = true,
        }
        self.events.push(BusEvent::PowerStart(condition));
        Ok(())
    }

    fn set_power_normal(&mut self) -> Result<()> {
        self.powered = false;
        self.power_armed = false;
        self.events.push(BusEvent::PowerNormal);
        Ok(())
    }

    fn start_program_pulse(&mut self, _condition: PowerCondition) -> Result<()> {
        if !self.features.contains(AdapterFeatures::PROGRAM_PULSE) {
            return Err(Error::AdapterFault);
        }
        if let Some(i) = self.selected {
            if self.slots[i].present {
                self.slots[i].device.program_pulse();
            }
        }
        self.events.push(BusEvent::ProgramPulse);
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.events.push(BusEvent::Delay(us));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use owmem_core::bank::{presets, Bank, Device, SpeedState};
    use owmem_core::bus::SharedBus;

    pub(crate) fn family_rom(family: u8) -> RomId {
        RomId::from_family_serial(family, 0x0000_00A1_B2C3)
    }

    pub(crate) fn bank(family: u8) -> Bank {
        let config = presets::for_family(family).unwrap();
        Bank::new(Device::new(family_rom(family)), config).unwrap()
    }

    pub(crate) fn network(family: u8) -> (DummyNetwork, Bank) {
        let mut net = DummyNetwork::new();
        net.attach_family(family_rom(family)).unwrap();
        (net, bank(family))
    }

    #[test]
    fn test_first_transaction_negotiates_speed() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2431);
        let rom = bank.device().address;

        bank.read(&mut net, 0, false, &mut [0u8; 2]).unwrap();
        assert_eq!(
            &net.events()[..3],
            &[
                BusEvent::SetSpeed(Speed::Regular),
                BusEvent::Presence {
                    address: rom,
                    present: true
                },
                BusEvent::Select {
                    address: rom,
                    present: true
                },
            ]
        );
        assert_eq!(net.bytes_sent()[..3], [0xF0, 0x00, 0x00]);

        // Verified now: the next read goes straight to select
        net.take_events();
        bank.read(&mut net, 0, false, &mut [0u8; 2]).unwrap();
        assert!(matches!(net.events()[0], BusEvent::Select { .. }));
    }

    #[test]
    fn test_absent_device() {
        let (mut net, mut bank) = network(presets::FAMILY_DS2423);
        let rom = bank.device().address;
        bank.read(&mut net, 0, false, &mut [0u8; 4]).unwrap();

        net.set_present(rom, false);
        assert_eq!(
            bank.read(&mut net, 0, false, &mut [0u8; 4]),
            Err(Error::DeviceNotPresent)
        );
        assert_eq!(bank.speed_state(), SpeedState::Stale);

        net.set_present(rom, true);
        net.take_events();
        bank.read(&mut net, 0, false, &mut [0u8; 4]).unwrap();
        assert!(matches!(net.events()[0], BusEvent::SetSpeed(_)));
        assert!(matches!(net.events()[1], BusEvent::Presence { present: true, .. }));
    }

    #[test]
    fn test_overdrive_needs_adapter_support() {
        let mut net = DummyNetwork::with_features(AdapterFeatures::POWER_DELIVERY);
        assert_eq!(net.set_speed(Speed::Overdrive), Err(Error::AdapterFault));
        assert_eq!(net.set_speed(Speed::Regular), Ok(()));
        assert_eq!(net.speed(), Speed::Regular);
    }

    #[test]
    fn test_corruption_only_hits_read_slots() {
        let mut net = DummyNetwork::new();
        net.corrupt_read(1);
        let mut buf = [0x12, 0xFF, 0x34, 0xFF];
        net.exchange_block(&mut buf).unwrap();
        assert_eq!(buf, [0x12, 0xFF, 0x34, 0xFE]);
    }

    #[test]
    fn test_shared_bus_between_threads() {
        let families = [presets::FAMILY_DS2431, presets::FAMILY_DS2423];
        let mut net = DummyNetwork::new();
        for family in families {
            net.attach_family(family_rom(family)).unwrap();
        }
        let bus = SharedBus::new(net);

        let handles: Vec<_> = families
            .into_iter()
            .map(|family| {
                let bus = bus.clone();
                std::thread::spawn(move || {
                    let mut bank = bank(family);
                    for round in 0..8u8 {
                        let start = u32::from(round) * 8;
                        let data = [round ^ family; 8];
                        bank.write(&mut *bus.lock(), start, &data).unwrap();

                        // Continuation reads stay under one guard
                        let mut guard = bus.lock();
                        let mut head = [0u8; 3];
                        let mut tail = [0u8; 5];
                        bank.read(&mut *guard, start, false, &mut head).unwrap();
                        bank.read(&mut *guard, start + 3, true, &mut tail).unwrap();
                        assert_eq!(head, data[..3]);
                        assert_eq!(tail, data[3..]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let guard = bus.lock();
        for family in families {
            let memory = guard.memory(family_rom(family)).unwrap();
            assert_eq!(memory[56..64], [7 ^ family; 8]);
        }
    }
}
