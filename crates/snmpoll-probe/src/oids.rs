//! Published object identifiers used by the check modes.
//!
//! Each constant is a fixed, vendor-published OID, never computed. The
//! UCD (`1.3.6.1.4.1.2021`) subtree is the net-snmp family; the Host
//! Resources MIB (`1.3.6.1.2.1.25`) covers the Windows family tables.

/// sysDescr, probed once per session to classify the device family.
pub const SYS_DESCR: &str = "1.3.6.1.2.1.1.1.0";

pub mod disk {
    /// UCD dskPath column.
    pub const NET_SNMP_PATH: &str = "1.3.6.1.4.1.2021.9.1.2";
    /// UCD dskPercent column.
    pub const NET_SNMP_PERCENT: &str = "1.3.6.1.4.1.2021.9.1.9";
    /// hrFSAccess column; 1 = read-write, 2 = read-only.
    pub const NET_SNMP_ACCESS: &str = "1.3.6.1.2.1.25.3.8.1.5";

    pub const WINDOWS_TYPE: &str = "1.3.6.1.2.1.25.2.3.1.2";
    pub const WINDOWS_PATH: &str = "1.3.6.1.2.1.25.2.3.1.3";
    pub const WINDOWS_TOTAL: &str = "1.3.6.1.2.1.25.2.3.1.5";
    pub const WINDOWS_USED: &str = "1.3.6.1.2.1.25.2.3.1.6";

    /// hrStorageType values that count as local disks. Removables are
    /// included because iSCSI mounts advertise as removable.
    pub const WINDOWS_LOCAL_DEVICES: &[&str] =
        &["1.3.6.1.2.1.25.2.1.4", "1.3.6.1.2.1.25.2.1.7"];
}

pub mod cpu {
    /// UCD laLoad table; rows 1..=3 are the 1, 5, and 15 minute averages.
    pub const LOAD: &str = "1.3.6.1.4.1.2021.10.1.3";
    /// hrProcessorLoad; one row per core, instantaneous utilization.
    pub const PROCESSOR_LOAD: &str = "1.3.6.1.2.1.25.3.3.1.2";
}

pub mod load {
    /// UCD laLoad.2, the 5 minute average as a scalar.
    pub const FIVE_MINUTE: &str = "1.3.6.1.4.1.2021.10.1.3.2";
}

pub mod memory {
    pub const TOTAL: &str = "1.3.6.1.4.1.2021.4.5.0";
    pub const AVAILABLE: &str = "1.3.6.1.4.1.2021.4.6.0";

    /// Windows appends physical and virtual memory to the hrStorage table;
    /// rows are located by label and addressed with an index suffix.
    pub const WINDOWS_LABEL: &str = "1.3.6.1.2.1.25.2.3.1.3";
    pub const WINDOWS_UNITS: &str = "1.3.6.1.2.1.25.2.3.1.4";
    pub const WINDOWS_TOTAL: &str = "1.3.6.1.2.1.25.2.3.1.5";
    pub const WINDOWS_USED: &str = "1.3.6.1.2.1.25.2.3.1.6";
}

pub mod swap {
    pub const TOTAL: &str = "1.3.6.1.4.1.2021.4.3.0";
    pub const AVAILABLE: &str = "1.3.6.1.4.1.2021.4.4.0";
}

pub mod process {
    /// hrSWRunPath, the command binary for the net-snmp family.
    pub const NET_SNMP_LIST: &str = "1.3.6.1.2.1.25.4.2.1.4";
    pub const NET_SNMP_ARGS: &str = "1.3.6.1.2.1.25.4.2.1.5";

    /// Windows splits name and path across two columns.
    pub const WINDOWS_LIST: &str = "1.3.6.1.2.1.25.4.2.1.2";
    pub const WINDOWS_PATH: &str = "1.3.6.1.2.1.25.4.2.1.4";
    pub const WINDOWS_ARGS: &str = "1.3.6.1.2.1.25.4.2.1.5";
}

pub mod battery {
    /// upsBatteryStatus: 1 unknown, 2 normal, 3 low, 4 depleted.
    pub const STATUS: &str = "1.3.6.1.2.1.33.1.2.1.0";
    pub const SECONDS_ON_BATTERY: &str = "1.3.6.1.2.1.33.1.2.2.0";
    pub const EST_MINUTES_REMAINING: &str = "1.3.6.1.2.1.33.1.2.3.0";
    /// Estimated charge remaining, in percent.
    pub const EST_CHARGE_REMAINING: &str = "1.3.6.1.2.1.33.1.2.4.0";
    /// In 0.1 V DC.
    pub const VOLTAGE: &str = "1.3.6.1.2.1.33.1.2.5.0";
    /// In 0.1 A DC.
    pub const CURRENT: &str = "1.3.6.1.2.1.33.1.2.6.0";
    /// In degrees Celsius.
    pub const TEMPERATURE: &str = "1.3.6.1.2.1.33.1.2.7.0";
}
