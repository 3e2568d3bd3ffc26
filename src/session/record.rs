use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ActivityType;
use crate::cache::{CacheSnapshot, LocationSample, MotionSample};
use crate::storage::DeviceId;

/// One fused row of the dataset.
///
/// Location fields are flattened into the top level and omitted entirely when no fix
/// has been observed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeRecord {
    #[serde(flatten)]
    pub location: Option<LocationSample>,
    pub sensor_data: BTreeMap<String, MotionSample>,
    pub activity_type: ActivityType,
    pub device_id: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

impl CompositeRecord {
    pub fn assemble(
        snapshot: CacheSnapshot,
        device: &DeviceId,
        activity_type: ActivityType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        CompositeRecord {
            location: snapshot.location,
            sensor_data: snapshot.motion,
            activity_type,
            device_id: device.to_string(),
            timestamp: timestamp.trunc_subsecs(3),
        }
    }
}

mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ACCELEROMETER;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::microseconds(123_456)
    }

    #[test]
    fn test_record_layout() {
        let mut snapshot = CacheSnapshot::default();
        snapshot.location = Some(LocationSample {
            altitude: Some(12.5),
            ..LocationSample::new(1.0, 2.0)
        });
        snapshot
            .motion
            .insert(ACCELEROMETER.to_string(), MotionSample::new(0.1, 0.2, 9.8));
        let device = DeviceId::new("dev1").unwrap();

        let record = CompositeRecord::assemble(snapshot, &device, ActivityType::Walk, at());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(
            value,
            json!({
                "latitude": 1.0,
                "longitude": 2.0,
                "altitude": 12.5,
                "sensorData": { "accelerometer": { "x": 0.1, "y": 0.2, "z": 9.8 } },
                "activityType": "1",
                "deviceId": "dev1",
                "timestamp": "2024-03-01T12:00:00.123Z"
            })
        );
    }

    #[test]
    fn test_location_omitted_when_never_observed() {
        let device = DeviceId::new("dev1").unwrap();
        let record =
            CompositeRecord::assemble(CacheSnapshot::default(), &device, ActivityType::Car, at());

        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("latitude"));
        assert!(!object.contains_key("longitude"));
        assert_eq!(object["sensorData"], json!({}));

        let parsed: CompositeRecord = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.location, None);
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_parses_stored_row() {
        let row: Value = json!({
            "latitude": -33.9,
            "longitude": 151.2,
            "speed": 1.4,
            "sensorData": { "gyroscope": { "x": 0.0, "y": 0.01, "z": -0.02 } },
            "activityType": "3",
            "deviceId": "TP1A.220624.014",
            "timestamp": "2024-03-01T12:00:01.500Z"
        });
        let record: CompositeRecord = serde_json::from_value(row).unwrap();

        let location = record.location.unwrap();
        assert_eq!(location.speed, Some(1.4));
        assert_eq!(record.activity_type, ActivityType::Bike);
        assert_eq!(record.timestamp.timestamp_subsec_millis(), 500);
    }
}
