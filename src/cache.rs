/// Latest reading kept between acquisition cycles
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::models::{DataQuality, DeviceInfo, PublishedReading, Snapshot};
use crate::utils::{classify_cloud_condition, duration_to_seconds};

#[derive(Debug, Clone)]
pub struct ReadingCache {
    started: OffsetDateTime,
    timestamp: Option<OffsetDateTime>,
    snapshot: Option<Snapshot>,
    device_info: Option<DeviceInfo>,
    error: Option<String>,
    stale_after_secs: u64,
}

impl ReadingCache {
    pub fn new(started: OffsetDateTime, stale_after_secs: u64) -> Self {
        ReadingCache {
            started,
            timestamp: None,
            snapshot: None,
            device_info: None,
            error: None,
            stale_after_secs,
        }
    }

    pub fn record_success(&mut self, snapshot: Snapshot, at: OffsetDateTime) {
        self.snapshot = Some(snapshot);
        self.timestamp = Some(at);
        self.error = None;
    }

    /// Keep the previous snapshot but flag the cycle failure.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn set_device_info(&mut self, info: DeviceInfo) {
        self.device_info = Some(info);
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn quality(&self, now: OffsetDateTime) -> DataQuality {
        if self.error.is_some() {
            return DataQuality::Error;
        }
        match self.timestamp {
            None => DataQuality::Error,
            Some(ts) if duration_to_seconds(now - ts) > self.stale_after_secs => DataQuality::Stale,
            Some(_) => DataQuality::Ok,
        }
    }

    /// Render the cache as the document consumers read.
    pub fn publish(&self, now: OffsetDateTime) -> PublishedReading {
        let snap = self.snapshot.as_ref();
        let cloud_condition = snap.and_then(|s| {
            let delta = s.delta_c?;
            let ambient = s.ambient_temp_c?;
            Some(classify_cloud_condition(delta, ambient))
        });

        PublishedReading {
            timestamp: self.timestamp.and_then(|ts| ts.format(&Rfc3339).ok()),
            sky_temp_c: snap.map(|s| s.sky_temp_c),
            sensor_temp_c: snap.and_then(|s| s.sensor_temp_c),
            ambient_temp_c: snap.and_then(|s| s.ambient_temp_c),
            delta_c: snap.and_then(|s| s.delta_c),
            rain_freq: snap.and_then(|s| s.rain_freq),
            is_raining: snap.and_then(|s| s.is_raining),
            is_wet: snap.and_then(|s| s.is_wet),
            ldr_kohm: snap.and_then(|s| s.ldr_kohm),
            mpsas: snap.and_then(|s| s.mpsas),
            is_daylight: snap.and_then(|s| s.is_daylight),
            cloud_condition,
            device: self.device_info.clone(),
            uptime_s: duration_to_seconds(now - self.started),
            quality: self.quality(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CloudCondition;
    use time::macros::datetime;
    use time::Duration;

    fn snapshot() -> Snapshot {
        Snapshot {
            sky_temp_c: -15.0,
            sensor_temp_c: Some(12.1),
            ambient_temp_c: Some(10.0),
            delta_c: Some(25.0),
            rain_freq: Some(2750),
            is_raining: Some(false),
            is_wet: Some(false),
            ldr_kohm: Some(2400.0),
            mpsas: None,
            is_daylight: Some(false),
            samples: 5,
        }
    }

    #[test]
    fn empty_cache_is_error_quality() {
        let start = datetime!(2026-01-25 12:00 UTC);
        let cache = ReadingCache::new(start, 300);
        assert_eq!(cache.quality(start), DataQuality::Error);

        let published = cache.publish(start + Duration::seconds(10));
        assert_eq!(published.timestamp, None);
        assert_eq!(published.sky_temp_c, None);
        assert_eq!(published.uptime_s, 10);
    }

    #[test]
    fn fresh_reading_is_ok_then_goes_stale() {
        let start = datetime!(2026-01-25 12:00 UTC);
        let mut cache = ReadingCache::new(start, 300);
        cache.record_success(snapshot(), start);

        assert_eq!(cache.quality(start + Duration::seconds(300)), DataQuality::Ok);
        assert_eq!(cache.quality(start + Duration::seconds(301)), DataQuality::Stale);
    }

    #[test]
    fn failure_keeps_last_snapshot_but_flags_error() {
        let start = datetime!(2026-01-25 12:00 UTC);
        let mut cache = ReadingCache::new(start, 300);
        cache.record_success(snapshot(), start);
        cache.record_failure("insufficient data");

        assert_eq!(cache.quality(start), DataQuality::Error);
        assert_eq!(cache.error(), Some("insufficient data"));
        assert!(cache.snapshot().is_some());

        cache.record_success(snapshot(), start + Duration::seconds(30));
        assert_eq!(cache.error(), None);
        assert_eq!(cache.quality(start + Duration::seconds(30)), DataQuality::Ok);
    }

    #[test]
    fn publish_adds_cloud_condition_and_timestamp() {
        let start = datetime!(2026-01-25 12:00 UTC);
        let mut cache = ReadingCache::new(start, 300);
        cache.record_success(snapshot(), start + Duration::seconds(5));
        cache.set_device_info(DeviceInfo {
            name: Some("CloudWatcher".to_string()),
            firmware: None,
        });

        let published = cache.publish(start + Duration::seconds(65));
        assert_eq!(published.cloud_condition, Some(CloudCondition::MostlyClear));
        assert_eq!(published.timestamp.as_deref(), Some("2026-01-25T12:00:05Z"));
        assert_eq!(published.rain_freq, Some(2750));
        assert_eq!(published.uptime_s, 65);
        assert_eq!(published.quality, DataQuality::Ok);

        let json = serde_json::to_value(&published).unwrap();
        assert_eq!(json["quality"], serde_json::json!("ok"));
        assert_eq!(json["mpsas"], serde_json::Value::Null);
        assert_eq!(json["device"]["name"], serde_json::json!("CloudWatcher"));
    }

    #[test]
    fn no_cloud_condition_without_ambient() {
        let start = datetime!(2026-01-25 12:00 UTC);
        let mut cache = ReadingCache::new(start, 300);
        let mut snap = snapshot();
        snap.ambient_temp_c = None;
        snap.delta_c = None;
        cache.record_success(snap, start);

        let json = serde_json::to_value(cache.publish(start)).unwrap();
        assert!(json.get("cloud_condition").is_none());
    }
}
