//! Configuration persistence across simulated reboots, using the host
//! build of the NVS region.

use smartgarden::adapters::nvs::NvsRegion;
use smartgarden::app::ports::{ConfigPort, LoadOutcome, StoragePort};
use smartgarden::app::service::AppService;
use smartgarden::config::{ConfigPatch, SystemConfig};
use smartgarden::config_store::{CONFIG_REGION_SIZE, ConfigStore};
use smartgarden::rpc::engine::{CommandDispatcher, DispatchPorts};

use crate::mock_hw::{MockClock, MockZones, RecordingDevice, RecordingPublisher, RecordingSink};

/// Power-cycle the region and boot a fresh store on it.
fn reboot(store: ConfigStore<NvsRegion>) -> ConfigStore<NvsRegion> {
    let mut region = store.into_storage();
    region.power_cycle();
    ConfigStore::new(region)
}

#[test]
fn first_boot_writes_defaults_and_second_boot_reads_them() {
    let mut store = ConfigStore::new(NvsRegion::new(CONFIG_REGION_SIZE));
    assert_eq!(store.seed(), SystemConfig::default());

    let store = reboot(store);
    let mut cfg = SystemConfig::default();
    cfg.watering_enabled = false;
    assert_eq!(store.load_into(&mut cfg), LoadOutcome::Loaded);
    assert_eq!(cfg, SystemConfig::default());
}

#[test]
fn remote_update_survives_reboot() {
    let mut store = ConfigStore::new(NvsRegion::new(CONFIG_REGION_SIZE));
    let mut sink = RecordingSink::new();
    let mut app = AppService::new(store.seed());
    app.start(&mut sink);

    let mut zones = MockZones::new();
    let mut publisher = RecordingPublisher::new();
    let mut device = RecordingDevice::default();
    let clock = MockClock::unsynced();
    let mut dispatcher = CommandDispatcher::new();
    {
        let mut ports = DispatchPorts {
            hw: &mut zones,
            config: &mut store,
            publisher: &mut publisher,
            device: &mut device,
            clock: &clock,
        };
        dispatcher
            .handle(
                br#"{"command":"set_config","watering_times":[300,1200],"mqtt_port":8883}"#,
                &mut app,
                &mut ports,
                &mut sink,
            )
            .unwrap();
    }

    let mut store = reboot(store);
    let cfg = store.seed();
    assert_eq!(cfg.watering_times.as_slice(), &[300, 1200]);
    assert_eq!(cfg.mqtt_port, 8883);
    assert_eq!(&cfg, app.config());
}

#[test]
fn failed_commit_is_lost_on_reboot() {
    let mut store = ConfigStore::new(NvsRegion::new(CONFIG_REGION_SIZE));
    let mut live = store.seed();

    store.storage_mut().set_fail_commits(true);
    let patch = ConfigPatch {
        watering_duration_secs: Some(60),
        ..ConfigPatch::default()
    };
    assert!(store.apply_remote_update(&mut live, patch).is_err());
    assert_eq!(live.watering_duration_secs, 60);

    let mut store = reboot(store);
    assert_eq!(store.seed().watering_duration_secs, 300);
}

#[test]
fn corrupted_region_boots_on_defaults_without_overwriting() {
    let mut region = NvsRegion::new(CONFIG_REGION_SIZE);
    region.write(0, &[0x00, 0x05]).unwrap();
    region.write(2, b"{bad}").unwrap();
    region.commit().unwrap();

    let mut store = ConfigStore::new(region);
    assert_eq!(store.seed(), SystemConfig::default());
    assert_eq!(&store.storage().committed()[2..7], b"{bad}");
}
