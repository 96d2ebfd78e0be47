use std::fmt;
use std::ops::RangeInclusive;

/// Address of a single servo controller
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct DeviceAddress {
    id: u8,
    bus: u8,
}

impl DeviceAddress {
    pub fn new(id: u8, bus: u8) -> DeviceAddress {
        DeviceAddress { id, bus }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }
}

impl From<(u8, u8)> for DeviceAddress {
    fn from(input: (u8, u8)) -> Self {
        let (id, bus) = input;
        DeviceAddress::new(id, bus)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Servo {} (Bus {})", self.id, self.bus)
    }
}

pub const BUS_1: u8 = 1;
pub const BUS_1_IDS: RangeInclusive<u8> = 11..=17;
pub const BUS_2: u8 = 2;
pub const BUS_2_IDS: RangeInclusive<u8> = 21..=27;

/// One contiguous run of ids on a single bus
pub fn bus_range(bus: u8, ids: RangeInclusive<u8>) -> Vec<DeviceAddress> {
    ids.map(|id| DeviceAddress::new(id, bus)).collect()
}

/// Every servo polled by default, in print order.
///
/// Ids 11 through 17 live on bus 1, ids 21 through 27 on bus 2.
pub fn default_devices() -> Vec<DeviceAddress> {
    let mut devices = bus_range(BUS_1, BUS_1_IDS);
    devices.extend(bus_range(BUS_2, BUS_2_IDS));
    devices
}
