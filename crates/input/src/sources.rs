use std::f32::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::hub::{SampleSink, SensorSource};
use crate::sensor::{Attitude, SensorError, SensorSample};

/// Source for hosts without orientation hardware.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSensor;

impl SensorSource for UnavailableSensor {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn start(&mut self, _sink: SampleSink) -> Result<(), SensorError> {
        Err(SensorError::Unavailable)
    }

    fn stop(&mut self) {}
}

#[derive(Debug, Default)]
struct ManualShared {
    sink: Mutex<Option<SampleSink>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

/// Source driven by the host (mouse tilt, scripted tests).
#[derive(Debug)]
pub struct ManualSensor {
    shared: Arc<ManualShared>,
}

/// Control side of a [`ManualSensor`]. Samples pushed while the source is
/// stopped are discarded.
#[derive(Debug, Clone)]
pub struct ManualSensorControl {
    shared: Arc<ManualShared>,
}

impl ManualSensor {
    pub fn pair() -> (Self, ManualSensorControl) {
        let shared = Arc::new(ManualShared::default());
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ManualSensorControl { shared },
        )
    }
}

impl SensorSource for ManualSensor {
    fn name(&self) -> &str {
        "manual"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self, sink: SampleSink) -> Result<(), SensorError> {
        self.shared.starts.fetch_add(1, Ordering::Relaxed);
        *self.shared.sink.lock() = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        self.shared.stops.fetch_add(1, Ordering::Relaxed);
        *self.shared.sink.lock() = None;
    }
}

impl ManualSensorControl {
    /// Publish a sample. Returns `false` if the source is not running.
    pub fn push(&self, sample: SensorSample) -> bool {
        match self.shared.sink.lock().as_ref() {
            Some(sink) => {
                sink.publish(sample);
                true
            }
            None => false,
        }
    }

    pub fn push_attitude(&self, attitude: Attitude) -> bool {
        self.push(SensorSample::from_attitude(attitude))
    }

    pub fn is_running(&self) -> bool {
        self.shared.sink.lock().is_some()
    }

    pub fn start_count(&self) -> usize {
        self.shared.starts.load(Ordering::Relaxed)
    }

    pub fn stop_count(&self) -> usize {
        self.shared.stops.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy)]
struct Sweep {
    amplitude: f32,
    period: f32,
}

impl Sweep {
    fn attitude_at(self, t: f32) -> Attitude {
        let phase = TAU * t / self.period;
        Attitude {
            pitch: self.amplitude * phase.sin(),
            roll: self.amplitude * phase.cos(),
            yaw: 0.0,
        }
    }
}

/// Background-thread source that sweeps a slow attitude oscillation.
///
/// Stands in for device motion on desktop hosts. Pitch and roll trace an
/// ellipse with the configured period; yaw stays at zero.
pub struct SyntheticGyro {
    rate_hz: f32,
    sweep: Sweep,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Default for SyntheticGyro {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl SyntheticGyro {
    pub fn new(rate_hz: f32) -> Self {
        Self {
            rate_hz: rate_hz.max(1.0),
            sweep: Sweep {
                amplitude: 0.35,
                period: 6.0,
            },
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Peak attitude in radians.
    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.sweep.amplitude = amplitude;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.sweep.period = period.as_secs_f32().max(0.001);
        self
    }

    /// Attitude at `t` seconds into the sweep.
    pub fn attitude_at(&self, t: f32) -> Attitude {
        self.sweep.attitude_at(t)
    }
}

impl SensorSource for SyntheticGyro {
    fn name(&self) -> &str {
        "synthetic-gyro"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self, sink: SampleSink) -> Result<(), SensorError> {
        if self.worker.is_some() {
            return Ok(());
        }
        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let interval = Duration::from_secs_f32(1.0 / self.rate_hz);
        let sweep = self.sweep;
        let worker = std::thread::Builder::new()
            .name("synthetic-gyro".into())
            .spawn(move || {
                let origin = Instant::now();
                while running.load(Ordering::Acquire) {
                    sink.publish_attitude(sweep.attitude_at(origin.elapsed().as_secs_f32()));
                    std::thread::sleep(interval);
                }
            })
            .map_err(|e| SensorError::StartFailed(e.to_string()))?;
        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("synthetic gyro worker panicked");
            }
        }
    }
}

impl Drop for SyntheticGyro {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::SensorHub;

    #[test]
    fn manual_push_requires_running_source() {
        let (source, control) = ManualSensor::pair();
        assert!(!control.push(SensorSample::NEUTRAL));
        let hub = SensorHub::new(source);
        let sub = hub.subscribe();
        assert!(control.is_running());
        assert!(control.push(SensorSample::NEUTRAL));
        drop(sub);
        assert!(!control.is_running());
    }

    #[test]
    fn unavailable_sensor_refuses_start() {
        let hub = SensorHub::new(UnavailableSensor);
        let _sub = hub.subscribe();
        assert!(!hub.is_active());
    }

    #[test]
    fn synthetic_attitude_sweeps() {
        let gyro = SyntheticGyro::new(60.0).with_period(Duration::from_secs(4));
        let a = gyro.attitude_at(0.0);
        assert_eq!(a.pitch, 0.0);
        assert!((a.roll - 0.35).abs() < 1e-6);
        let b = gyro.attitude_at(1.0);
        assert!((b.pitch - 0.35).abs() < 1e-5);
        assert!(b.roll.abs() < 1e-5);
    }

    #[test]
    fn synthetic_gyro_publishes_until_stopped() {
        let hub = SensorHub::new(SyntheticGyro::new(500.0));
        let sub = hub.subscribe();
        assert!(hub.is_active());

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut seen = None;
        while seen.is_none() && Instant::now() < deadline {
            seen = hub.latest_sample();
            std::thread::sleep(Duration::from_millis(2));
        }
        assert!(seen.is_some(), "no sample published within 2s");

        drop(sub);
        assert!(!hub.is_active());
        assert_eq!(hub.latest_sample(), None);
    }
}
