use heapless::String;
use log::info;
use serde::{Serialize, Serializer};
use thiserror_no_std::Error;

use super::{CloudSession, RecordId, TransportError};
use crate::measurement::Measurement;

/// Largest serialized record, with every float at full width
pub const RECORD_BUF_LEN: usize = 192;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("Record does not fit the serialization buffer")]
    Serialize,
    #[error("Push failed: {message} (code {code})")]
    Transport { code: i32, message: String<64> },
}

impl From<TransportError> for WriteError {
    fn from(e: TransportError) -> Self {
        Self::Transport {
            code: e.code,
            message: e.message,
        }
    }
}

/// Record as stored in the database. Field order is part of the format.
#[derive(Serialize)]
struct WireRecord {
    #[serde(serialize_with = "finite_or_null")]
    temperature: f32,
    date: u64,
    #[serde(serialize_with = "finite_or_null")]
    humidity: f32,
    #[serde(serialize_with = "finite_or_null")]
    pressure: f32,
    #[serde(serialize_with = "finite_or_null")]
    altitude: f32,
}

impl From<&Measurement> for WireRecord {
    fn from(m: &Measurement) -> Self {
        Self {
            temperature: m.temperature_c,
            date: m.timestamp,
            humidity: m.humidity_percent,
            pressure: m.pressure_hpa,
            altitude: m.altitude_m,
        }
    }
}

/// JSON has no NaN; a channel that could not be read is written as `null`.
fn finite_or_null<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f32(*value)
    } else {
        serializer.serialize_none()
    }
}

/// Serialize `measurement` into `buf`, returning the JSON length.
pub fn encode_record(measurement: &Measurement, buf: &mut [u8]) -> Result<usize, WriteError> {
    serde_json_core::to_slice(&WireRecord::from(measurement), buf)
        .map_err(|_| WriteError::Serialize)
}

/// Appends measurements to the database, one push per call.
pub struct CloudWriter {
    buf: [u8; RECORD_BUF_LEN],
}

impl Default for CloudWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudWriter {
    pub const fn new() -> Self {
        Self {
            buf: [0; RECORD_BUF_LEN],
        }
    }

    /// Append `measurement` under `path`. Not retried on failure.
    pub async fn write_record<S: CloudSession>(
        &mut self,
        session: &mut S,
        path: &str,
        measurement: &Measurement,
    ) -> Result<RecordId, WriteError> {
        let len = encode_record(measurement, &mut self.buf)?;
        info!("Creating record under {}...", path);

        let id = session.push(path, &self.buf[..len]).await?;
        info!("Record {} created", id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use embassy_futures::block_on;

    struct RecordingSession {
        pushes: Vec<(alloc::string::String, Vec<u8>)>,
        fail_with: Option<TransportError>,
    }

    impl CloudSession for RecordingSession {
        fn is_initialized(&self) -> bool {
            true
        }

        fn is_ready(&self) -> bool {
            true
        }

        async fn poll(&mut self) {}

        async fn push(&mut self, path: &str, body: &[u8]) -> Result<RecordId, TransportError> {
            self.pushes.push((path.into(), body.to_vec()));
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(RecordId::try_from("-NxYz123").unwrap()),
            }
        }
    }

    fn sample() -> Measurement {
        Measurement {
            temperature_c: 21.5,
            humidity_percent: 40.25,
            pressure_hpa: 1001.5,
            altitude_m: 99.75,
            timestamp: 1_717_000_000,
        }
    }

    #[test]
    fn test_encode_record_field_order() {
        let mut buf = [0u8; RECORD_BUF_LEN];
        let len = encode_record(&sample(), &mut buf).unwrap();
        assert_eq!(
            core::str::from_utf8(&buf[..len]).unwrap(),
            r#"{"temperature":21.5,"date":1717000000,"humidity":40.25,"pressure":1001.5,"altitude":99.75}"#
        );
    }

    #[test]
    fn test_encode_record_writes_null_for_nan() {
        let mut m = sample();
        m.altitude_m = f32::NAN;
        m.humidity_percent = f32::INFINITY;

        let mut buf = [0u8; RECORD_BUF_LEN];
        let len = encode_record(&m, &mut buf).unwrap();
        let json = core::str::from_utf8(&buf[..len]).unwrap();

        assert!(json.contains(r#""humidity":null"#));
        assert!(json.ends_with(r#""altitude":null}"#));
    }

    #[test]
    fn test_encode_record_too_small_buffer() {
        let mut buf = [0u8; 16];
        assert_eq!(encode_record(&sample(), &mut buf), Err(WriteError::Serialize));
    }

    #[test]
    fn test_write_record_pushes_once() {
        let mut session = RecordingSession {
            pushes: Vec::new(),
            fail_with: None,
        };

        let id = block_on(CloudWriter::new().write_record(
            &mut session,
            "temp_sensor_items",
            &sample(),
        ))
        .unwrap();

        assert_eq!(id.as_str(), "-NxYz123");
        assert_eq!(session.pushes.len(), 1);
        assert_eq!(session.pushes[0].0, "temp_sensor_items");
        assert!(session.pushes[0].1.starts_with(br#"{"temperature":"#));
    }

    #[test]
    fn test_write_record_carries_transport_error() {
        let mut session = RecordingSession {
            pushes: Vec::new(),
            fail_with: Some(TransportError::new(401, "Permission denied")),
        };

        let err = block_on(CloudWriter::new().write_record(
            &mut session,
            "temp_sensor_items",
            &sample(),
        ))
        .unwrap_err();

        assert_eq!(
            err,
            WriteError::Transport {
                code: 401,
                message: String::try_from("Permission denied").unwrap()
            }
        );
        assert_eq!(session.pushes.len(), 1);
    }
}
