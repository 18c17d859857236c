// src/monitor.rs

//! One polling cycle of the detection node: read the sensor, decide on the
//! alarm, and publish a field when the publish interval has elapsed.

use log::warn;

use crate::common::{
    config::{AlarmThresholds, MonitorConfig},
    error::Error,
    hal_traits::{Clock, Heartbeat, Millis, ModemSerial, Timer},
};
use crate::modem::AtClient;
use crate::sensor::{Reading, ReadingSource};

/// What the sensor produced this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorOutcome {
    /// A valid frame; the stored reading was replaced.
    Fresh(Reading),
    /// Nobody answered the start pulse.
    NoResponse,
    /// A frame arrived but failed validation.
    ChecksumMismatch,
    /// The line misbehaved mid-transaction or the pin reported an error.
    Fault,
}

/// The channel fields are published alternately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishField {
    Temperature,
    Humidity,
}

impl PublishField {
    pub fn next(self) -> Self {
        match self {
            PublishField::Temperature => PublishField::Humidity,
            PublishField::Humidity => PublishField::Temperature,
        }
    }
}

/// A completed publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publication {
    pub field: PublishField,
    pub field_id: u8,
    pub value: i32,
    /// Sequence restarts the publish needed.
    pub restarts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub sensor: SensorOutcome,
    /// Last valid reading, possibly from an earlier cycle.
    pub reading: Option<Reading>,
    /// Whether the buzzer should sound.
    pub alarm: bool,
    pub published: Option<Publication>,
}

impl AlarmThresholds {
    /// Temperature at or above the high limit, or humidity at or below the low limit.
    pub fn is_triggered(&self, reading: &Reading) -> bool {
        reading.temperature_tenths >= self.temperature_high_tenths
            || reading.humidity_tenths <= self.humidity_low_tenths
    }
}

/// Reading source, modem client and clock driven as one polling loop.
#[derive(Debug)]
pub struct Monitor<'e, R, M, C>
where
    R: ReadingSource,
    M: ModemSerial + Timer + Clock,
    C: Clock,
{
    sensor: R,
    client: AtClient<'e, M>,
    clock: C,
    config: MonitorConfig,
    last_reading: Option<Reading>,
    last_publish: Millis,
    next_field: PublishField,
}

impl<'e, R, M, C> Monitor<'e, R, M, C>
where
    R: ReadingSource,
    M: ModemSerial + Timer + Clock,
    C: Clock,
{
    /// The first publish happens one full interval after construction.
    pub fn new(sensor: R, client: AtClient<'e, M>, clock: C, config: MonitorConfig) -> Self {
        let last_publish = clock.now();
        Monitor {
            sensor,
            client,
            clock,
            config,
            last_reading: None,
            last_publish,
            next_field: PublishField::Temperature,
        }
    }

    pub fn last_reading(&self) -> Option<Reading> {
        self.last_reading
    }

    pub fn next_field(&self) -> PublishField {
        self.next_field
    }

    /// Gives back the sensor, the client and the clock.
    pub fn release(self) -> (R, AtClient<'e, M>, C) {
        (self.sensor, self.client, self.clock)
    }

    /// Runs one cycle.
    ///
    /// Sensor failures only show up in the report; the previous reading stays in
    /// use. A publish that fails for good is returned as an error, and the next
    /// attempt waits for a full interval.
    pub fn cycle<H: Heartbeat>(&mut self, heartbeat: &mut H) -> Result<CycleReport, Error<M::Error>> {
        let sensor = self.poll_sensor();
        let alarm = self
            .last_reading
            .map_or(false, |reading| self.config.alarm.is_triggered(&reading));
        heartbeat.beat();

        let published = self.publish_if_due(heartbeat)?;

        Ok(CycleReport {
            sensor,
            reading: self.last_reading,
            alarm,
            published,
        })
    }

    /// Cycles forever, pausing the poll interval between cycles.
    ///
    /// `on_cycle` sees every report, typically to drive the buzzer and a display.
    /// Only returns when a publish fails for good.
    pub fn run<H, F>(&mut self, heartbeat: &mut H, mut on_cycle: F) -> Error<M::Error>
    where
        H: Heartbeat,
        F: FnMut(&CycleReport),
    {
        loop {
            match self.cycle(heartbeat) {
                Ok(report) => on_cycle(&report),
                Err(e) => return e,
            }
            self.client.pause_ms(self.config.poll_interval_ms);
        }
    }

    fn poll_sensor(&mut self) -> SensorOutcome {
        match self.sensor.read() {
            Ok(reading) => {
                self.last_reading = Some(reading);
                SensorOutcome::Fresh(reading)
            }
            Err(Error::NoResponse) => {
                warn!("sensor did not respond");
                SensorOutcome::NoResponse
            }
            Err(Error::ChecksumMismatch { expected, calculated }) => {
                warn!("sensor checksum mismatch: expected {:#04x}, calculated {:#04x}", expected, calculated);
                SensorOutcome::ChecksumMismatch
            }
            Err(e) => {
                warn!("sensor fault: {}", e);
                SensorOutcome::Fault
            }
        }
    }

    fn publish_if_due<H: Heartbeat>(
        &mut self,
        heartbeat: &mut H,
    ) -> Result<Option<Publication>, Error<M::Error>> {
        if self.clock.now().since(self.last_publish) < self.config.publish_interval_ms {
            return Ok(None);
        }
        let Some(reading) = self.last_reading else {
            return Ok(None);
        };

        let field = self.next_field;
        let (field_id, value) = match field {
            PublishField::Temperature => (self.config.temperature_field, reading.temperature_whole()),
            PublishField::Humidity => (self.config.humidity_field, reading.humidity_whole()),
        };

        let result = self.client.publish_reading_with(value, field_id, heartbeat);
        self.last_publish = self.clock.now();
        let restarts = result?;

        self.next_field = field.next();
        Ok(Some(Publication {
            field,
            field_id,
            value,
            restarts,
        }))
    }
}
