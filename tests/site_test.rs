mod common;

use common::{ScriptedApi, power, site};
use helios::config::Config;
use helios::site::{SNAPSHOT_REUSE_WINDOW, SiteMonitor};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test]
async fn recent_snapshot_is_reused() {
    let api = ScriptedApi::new(power(3000.0, 800.0, 60.0, 13500.0));
    let mut monitor = SiteMonitor::new(site(), &Config::default());
    let t0 = Instant::now();

    let first = monitor.ensure_fresh(&api, t0).await.unwrap();
    assert_eq!(first.solar_power, 3000.0);

    // A failing API is not consulted inside the reuse window
    api.fail_power(1);
    let again = monitor
        .ensure_fresh(&api, t0 + Duration::from_millis(500))
        .await
        .unwrap();
    assert_eq!(again, first);
    assert_eq!(monitor.solar_window().count(), 1);

    assert!(
        monitor
            .ensure_fresh(&api, t0 + SNAPSHOT_REUSE_WINDOW)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn every_refresh_feeds_the_solar_window() {
    let api = ScriptedApi::new(power(400.0, 300.0, 60.0, 13500.0));
    let mut monitor = SiteMonitor::new(site(), &Config::default());
    let t0 = Instant::now();

    monitor.refresh(&api, t0).await.unwrap();
    assert!(!monitor.has_enough_solar());

    api.set_power(power(2600.0, 300.0, 60.0, 13500.0));
    monitor
        .refresh(&api, t0 + Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(monitor.average_solar(), Some(1500.0));
    assert!(monitor.has_enough_solar());
    assert_eq!(monitor.snapshot().map(|s| s.solar_power), Some(2600.0));
}

#[tokio::test]
async fn site_window_forgets_readings_older_than_its_age_cap() {
    let api = ScriptedApi::new(power(200.0, 300.0, 60.0, 13500.0));
    let mut monitor = SiteMonitor::new(site(), &Config::default());
    let t0 = Instant::now();

    monitor.refresh(&api, t0).await.unwrap();
    api.set_power(power(2500.0, 300.0, 60.0, 13500.0));
    monitor
        .refresh(&api, t0 + Duration::from_secs(3001))
        .await
        .unwrap();

    assert_eq!(monitor.solar_window().count(), 1);
    assert_eq!(monitor.average_solar(), Some(2500.0));
    assert!(monitor.has_enough_solar());
}
