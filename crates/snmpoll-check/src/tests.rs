use crate::battery::{self, BatteryCheck, BatteryInfo};
use crate::cpu::{self, CpuCheck, CpuSample};
use crate::disk::{self, DiskCheck, MountStat, MountTable, Threshold};
use crate::load::{self, LoadCheck};
use crate::memory::{self, MemoryCheck};
use crate::process::{self, ProcessCheck};
use crate::swap::{self, SwapCheck};
use serde_json::{json, Value};
use snmpoll_common::config::ConfigError;
use snmpoll_common::types::ConfigMap;
use snmpoll_probe::mock::MockSession;
use snmpoll_probe::oids;
use snmpoll_probe::Platform;

fn cfg(pairs: &[(&str, Value)]) -> ConfigMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn mounts(entries: &[(&str, f64)]) -> MountTable {
    entries
        .iter()
        .map(|(path, capacity)| {
            (
                path.to_string(),
                MountStat {
                    capacity: *capacity,
                    access: None,
                },
            )
        })
        .collect()
}

// ---- disk ----

#[test]
fn disk_at_warn_threshold_is_warning_not_error() {
    let check = DiskCheck::new(ConfigMap::new());
    let settings = check.settings(&ConfigMap::new()).unwrap();

    let report = disk::evaluate(&mounts(&[("/", 90.0)]), None, &settings);
    assert_eq!(report.warning.as_deref(), Some("/ at 90% capacity"));
    assert!(report.error.is_none());
}

#[test]
fn disk_at_full_capacity_is_error() {
    let check = DiskCheck::new(ConfigMap::new());
    let settings = check.settings(&ConfigMap::new()).unwrap();

    let report = disk::evaluate(&mounts(&[("/", 100.0)]), None, &settings);
    assert_eq!(report.error.as_deref(), Some("/ at 100% capacity"));
    assert!(report.warning.is_none());
}

#[test]
fn disk_default_excludes_hide_system_mounts() {
    let check = DiskCheck::new(ConfigMap::new());
    let settings = check.settings(&ConfigMap::new()).unwrap();

    let report = disk::evaluate(&mounts(&[("/", 40.0), ("/dev", 100.0)]), None, &settings);
    let reported = report.fields["mounts"].as_object().unwrap();
    assert!(reported.contains_key("/"));
    assert!(!reported.contains_key("/dev"));
    assert!(report.passed());
}

#[test]
fn disk_include_filter_keeps_only_matches() {
    let check = DiskCheck::new(ConfigMap::new());
    let node = cfg(&[("include", json!(["^/data"]))]);
    let settings = check.settings(&node).unwrap();

    let report = disk::evaluate(&mounts(&[("/", 40.0), ("/data", 50.0)]), None, &settings);
    let reported = report.fields["mounts"].as_object().unwrap();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported["/data"], json!(50.0));
}

#[test]
fn disk_vanished_mount_is_reported_cleared() {
    let check = DiskCheck::new(ConfigMap::new());
    let settings = check.settings(&ConfigMap::new()).unwrap();

    let prior = cfg(&[("/old", json!(55.0)), ("/", json!(40.0))]);
    let report = disk::evaluate(&mounts(&[("/", 41.0)]), Some(&prior), &settings);

    let reported = report.fields["mounts"].as_object().unwrap();
    assert_eq!(reported["/old"], Value::Null);
    assert_eq!(reported["/"], json!(41.0));
}

#[test]
fn disk_per_path_warn_map_falls_back_for_unlisted_paths() {
    let check = DiskCheck::new(ConfigMap::new());
    let node = cfg(&[("warn_at", json!({ "/data": 95 }))]);
    let settings = check.settings(&node).unwrap();

    // /data has its own threshold; /home falls back to the built-in 90.
    let report = disk::evaluate(&mounts(&[("/data", 92.0), ("/home", 92.0)]), None, &settings);
    assert_eq!(report.warning.as_deref(), Some("/home at 92% capacity"));
}

#[test]
fn disk_readonly_mount_is_an_error_when_policy_asks() {
    let check = DiskCheck::new(ConfigMap::new());
    let node = cfg(&[("alert_readonly", json!(true))]);
    let settings = check.settings(&node).unwrap();

    let mut table = MountTable::new();
    table.insert(
        "/".to_string(),
        MountStat {
            capacity: 10.0,
            access: Some(2),
        },
    );
    let report = disk::evaluate(&table, None, &settings);
    assert_eq!(report.error.as_deref(), Some("/ is mounted read-only."));
}

#[test]
fn disk_warn_at_precedence_is_node_then_mode_then_builtin() {
    let check = DiskCheck::new(cfg(&[("warn_at", json!(85))]));

    let node = cfg(&[("warn_at", json!(95))]);
    match check.settings(&node).unwrap().warn_at {
        Threshold::Flat(v) => assert_eq!(v, 95.0),
        other => panic!("unexpected threshold: {other:?}"),
    }
    match check.settings(&ConfigMap::new()).unwrap().warn_at {
        Threshold::Flat(v) => assert_eq!(v, 85.0),
        other => panic!("unexpected threshold: {other:?}"),
    }
    match DiskCheck::new(ConfigMap::new())
        .settings(&ConfigMap::new())
        .unwrap()
        .warn_at
    {
        Threshold::Flat(v) => assert_eq!(v, 90.0),
        other => panic!("unexpected threshold: {other:?}"),
    }
}

#[test]
fn disk_invalid_pattern_fails_at_resolution() {
    let check = DiskCheck::new(ConfigMap::new());
    let node = cfg(&[("include", json!(["(unclosed"]))]);
    assert!(matches!(
        check.settings(&node),
        Err(ConfigError::InvalidPattern { .. })
    ));
}

#[tokio::test]
async fn disk_net_snmp_walk_aligns_sparse_columns() {
    let mut session = MockSession::new()
        .text_table(oids::disk::NET_SNMP_PATH, &["/", "/var", "/data"])
        // Percent column is one row short; /data must be skipped, not fail.
        .int_table(oids::disk::NET_SNMP_PERCENT, &[37, 82])
        .int_table(oids::disk::NET_SNMP_ACCESS, &[1, 1, 1]);

    let table = disk::collect(&mut session, Platform::NetSnmp).await.unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table["/"].capacity, 37.0);
    assert_eq!(table["/var"].access, Some(1));
    assert!(!table.contains_key("/data"));
}

#[tokio::test]
async fn disk_windows_walk_filters_device_types_and_empty_disks() {
    let mut session = MockSession::new()
        .text_table(
            oids::disk::WINDOWS_TYPE,
            &[
                "1.3.6.1.2.1.25.2.1.4", // local disk
                "1.3.6.1.2.1.25.2.1.2", // RAM, skipped
                "1.3.6.1.2.1.25.2.1.4", // local but zero-sized
            ],
        )
        .text_table(oids::disk::WINDOWS_PATH, &["C:\\", "Z:\\", "D:\\"])
        .int_table(oids::disk::WINDOWS_TOTAL, &[1000, 500, 0])
        .int_table(oids::disk::WINDOWS_USED, &[473, 100, 0]);

    let table = disk::collect(&mut session, Platform::Windows).await.unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table["C:\\"].capacity, 47.3);
}

// ---- cpu ----

#[test]
fn cpu_windows_reports_mean_utilization() {
    let check = CpuCheck::new(ConfigMap::new());
    let settings = check.settings(&ConfigMap::new()).unwrap();

    let sample = CpuSample::Utilization {
        loads: vec![20.0, 40.0],
    };
    let report = cpu::evaluate(&sample, &settings);
    assert_eq!(report.fields["cpu"]["usage"], json!(30.0));
    assert_eq!(report.fields["message"], json!("System is 30.0% in use."));
    assert!(report.passed());
}

#[test]
fn cpu_load_average_below_capacity_is_idle() {
    let check = CpuCheck::new(ConfigMap::new());
    let settings = check.settings(&ConfigMap::new()).unwrap();

    let sample = CpuSample::LoadAverage {
        count: 2,
        load1: 0.8,
        load5: 1.0,
        load15: 0.9,
    };
    // (1.0 / 2 - 1) * 100 = -50 -> 50% usage, idle message.
    let report = cpu::evaluate(&sample, &settings);
    assert_eq!(report.fields["message"], json!("System is 50.0% idle."));
    assert_eq!(report.fields["cpu"]["usage"], json!(50.0));
    assert!(report.warning.is_none());
}

#[test]
fn cpu_load_average_over_capacity_warns() {
    let check = CpuCheck::new(ConfigMap::new());
    let settings = check.settings(&ConfigMap::new()).unwrap();

    let sample = CpuSample::LoadAverage {
        count: 1,
        load1: 2.5,
        load5: 3.0,
        load15: 2.0,
    };
    // (3.0 / 1 - 1) * 100 = 200% overloaded, over the default 80.
    let report = cpu::evaluate(&sample, &settings);
    assert_eq!(
        report.fields["message"],
        json!("System is 200.0% overloaded.")
    );
    assert_eq!(
        report.warning.as_deref(),
        Some("200.0 utilization exceeds 80.0 percent")
    );
}

#[tokio::test]
async fn cpu_collect_reads_load_table_rows() {
    let mut session = MockSession::new()
        .int_table(oids::cpu::PROCESSOR_LOAD, &[11, 22])
        .text_table(oids::cpu::LOAD, &["0.50", "0.40", "0.30"]);

    let sample = cpu::collect(&mut session, Platform::NetSnmp).await.unwrap();
    assert_eq!(
        sample,
        CpuSample::LoadAverage {
            count: 2,
            load1: 0.5,
            load5: 0.4,
            load15: 0.3,
        }
    );
}

// ---- load ----

#[test]
fn load_error_fires_at_threshold() {
    let check = LoadCheck::new(ConfigMap::new());
    let settings = check.settings(&ConfigMap::new()).unwrap();

    assert!(load::evaluate(6.9, &settings).passed());
    let report = load::evaluate(7.0, &settings);
    assert_eq!(
        report.error.as_deref(),
        Some("Load has exceeded 7.00 over a 5 minute average")
    );
    assert_eq!(report.fields["load5"], json!(7.0));
}

// ---- memory / swap ----

#[tokio::test]
async fn memory_usage_percentage_from_totals() {
    let mut session = MockSession::new()
        .int(oids::memory::TOTAL, 1000)
        .int(oids::memory::AVAILABLE, 250)
        .int(oids::swap::TOTAL, 0)
        .int(oids::swap::AVAILABLE, 0);

    let info = memory::collect(&mut session, Platform::NetSnmp).await.unwrap();
    assert_eq!(info.memory.usage, 75.0);
    assert_eq!(info.memory.available, 0.24);
    // Zero swap total yields a zero record, not a division fault.
    assert_eq!(info.swap.usage, 0.0);
}

#[test]
fn memory_and_swap_warnings_are_combined() {
    let check = MemoryCheck::new(ConfigMap::new());
    let node = cfg(&[("physical_warn_at", json!(70))]);
    let settings = check.settings(&node).unwrap();

    let info = memory::MemoryInfo {
        memory: memory::PoolUsage {
            usage: 75.0,
            available: 0.24,
        },
        swap: memory::PoolUsage {
            usage: 61.5,
            available: 1.0,
        },
    };
    let report = memory::evaluate(&info, &settings);
    let warning = report.warning.unwrap();
    assert!(warning.contains("75.0 memory utilization exceeds 70.0 percent"));
    assert!(warning.contains("61.5 swap utilization exceeds 60.0 percent"));
}

#[test]
fn memory_does_not_warn_on_ram_by_default() {
    let check = MemoryCheck::new(ConfigMap::new());
    let settings = check.settings(&ConfigMap::new()).unwrap();

    let info = memory::MemoryInfo {
        memory: memory::PoolUsage {
            usage: 99.0,
            available: 0.01,
        },
        swap: memory::PoolUsage::default(),
    };
    assert!(memory::evaluate(&info, &settings).passed());
}

#[tokio::test]
async fn memory_windows_rows_located_by_label() {
    let mut session = MockSession::new()
        .text_table(
            oids::memory::WINDOWS_LABEL,
            &["C:\\", "Physical Memory", "Virtual Memory"],
        )
        .int(&format!("{}.2", oids::memory::WINDOWS_UNITS), 1024)
        .int(&format!("{}.2", oids::memory::WINDOWS_TOTAL), 1000)
        .int(&format!("{}.2", oids::memory::WINDOWS_USED), 400)
        .int(&format!("{}.3", oids::memory::WINDOWS_UNITS), 1024)
        .int(&format!("{}.3", oids::memory::WINDOWS_TOTAL), 500)
        .int(&format!("{}.3", oids::memory::WINDOWS_USED), 50);

    let info = memory::collect(&mut session, Platform::Windows).await.unwrap();
    assert_eq!(info.memory.usage, 40.0);
    assert_eq!(info.swap.usage, 10.0);
}

#[tokio::test]
async fn swap_in_use_percentage_and_error() {
    let mut session = MockSession::new()
        .int(oids::swap::TOTAL, 2000)
        .int(oids::swap::AVAILABLE, 100);

    let swap_in_use = swap::collect(&mut session).await.unwrap();
    assert_eq!(swap_in_use, 95.0);

    let check = SwapCheck::new(ConfigMap::new());
    let settings = check.settings(&ConfigMap::new()).unwrap();
    let report = swap::evaluate(swap_in_use, &settings);
    assert_eq!(report.error.as_deref(), Some("95.0% swap in use"));
    assert_eq!(report.fields["swap_in_use"], json!(95.0));
}

#[tokio::test]
async fn swap_with_no_swap_configured_reports_zero() {
    let mut session = MockSession::new()
        .int(oids::swap::TOTAL, 0)
        .int(oids::swap::AVAILABLE, 0);
    assert_eq!(swap::collect(&mut session).await.unwrap(), 0.0);
}

// ---- process ----

#[test]
fn process_unmatched_pattern_is_one_error_line() {
    let check = ProcessCheck::new(ConfigMap::new());
    let node = cfg(&[("processes", json!(["httpd", "nginx"]))]);
    let settings = check.settings(&node).unwrap();

    let running = vec![
        "/usr/sbin/httpd -D FOREGROUND".to_string(),
        "/bin/sh".to_string(),
    ];
    let report = process::evaluate(&running, &settings);
    assert_eq!(report.fields["count"], json!(2));
    assert_eq!(report.error.as_deref(), Some("'nginx' is not running"));
}

#[test]
fn process_invalid_pattern_is_a_config_error() {
    let check = ProcessCheck::new(ConfigMap::new());
    let node = cfg(&[("processes", json!(["[unterminated"]))]);
    assert!(matches!(
        check.settings(&node),
        Err(ConfigError::InvalidPattern { .. })
    ));
}

#[tokio::test]
async fn process_net_snmp_lines_join_path_and_args() {
    let mut session = MockSession::new()
        .text_table(
            oids::process::NET_SNMP_LIST,
            &["/usr/sbin/httpd", "", "/bin/sh"],
        )
        .text_table(oids::process::NET_SNMP_ARGS, &["-D FOREGROUND", "x", ""]);

    let lines = process::collect(&mut session, Platform::NetSnmp).await.unwrap();
    assert_eq!(
        lines,
        vec!["/usr/sbin/httpd -D FOREGROUND".to_string(), "/bin/sh".to_string()]
    );
}

#[tokio::test]
async fn process_windows_lines_join_path_name_and_args() {
    let mut session = MockSession::new()
        .text_table(oids::process::WINDOWS_LIST, &["app.exe", "idle.exe"])
        .text_table(oids::process::WINDOWS_PATH, &["C:\\App\\", ""])
        .text_table(oids::process::WINDOWS_ARGS, &["--serve", ""]);

    let lines = process::collect(&mut session, Platform::Windows).await.unwrap();
    assert_eq!(lines, vec!["C:\\App\\app.exe --serve".to_string()]);
}

// ---- battery ----

fn healthy_battery() -> BatteryInfo {
    BatteryInfo {
        status: 2,
        capacity: 100.0,
        temperature: 25.0,
        minutes_remaining: 42,
        seconds_on_battery: 0,
        in_use: false,
        voltage: Some(13.2),
        current: None,
    }
}

#[test]
fn battery_healthy_passes() {
    let check = BatteryCheck::new(ConfigMap::new());
    let settings = check.settings(&ConfigMap::new()).unwrap();
    let report = battery::evaluate(&healthy_battery(), &settings);
    assert!(report.passed());
    assert_eq!(report.fields["battery"]["voltage"], json!(13.2));
    assert!(report.fields["battery"].get("current").is_none());
}

#[test]
fn battery_sub_checks_fire_together() {
    let check = BatteryCheck::new(ConfigMap::new());
    let settings = check.settings(&ConfigMap::new()).unwrap();

    let info = BatteryInfo {
        status: 3,
        capacity: 35.0,
        temperature: 55.0,
        minutes_remaining: 7,
        seconds_on_battery: 120,
        in_use: true,
        voltage: None,
        current: None,
    };
    let report = battery::evaluate(&info, &settings);
    let warning = report.warning.unwrap();
    let lines: Vec<&str> = warning.split('\n').collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "UPS on battery - 7 minute(s) remaining.");
    assert_eq!(lines[1], "Battery is Low.");
    assert!(lines[2].contains("35.0% less than 60.0 percent"));
    assert_eq!(lines[3], "Battery temperature 55C greater than 50C");
}

#[tokio::test]
async fn battery_collect_tolerates_missing_optionals() {
    let mut session = MockSession::new()
        .int(oids::battery::STATUS, 2)
        .int(oids::battery::EST_CHARGE_REMAINING, 98)
        .int(oids::battery::TEMPERATURE, 24)
        .int(oids::battery::EST_MINUTES_REMAINING, 30);
    // voltage, current, and seconds-on-battery deliberately absent

    let info = battery::collect(&mut session).await.unwrap();
    assert_eq!(info.voltage, None);
    assert_eq!(info.current, None);
    assert_eq!(info.seconds_on_battery, 0);
    assert!(!info.in_use);
}
