// src/modem/mod.rs

//! Blocking AT command client for an ESP8266 WiFi modem.
//!
//! Every operation is a [`CommandSequence`]: the steps run in order, and any
//! failed step makes the client wait and start over from the first step.

mod attempt;
mod io_helpers;
mod sequence;

pub use attempt::{AttemptOutcome, CommandAttempt, ResponseWindow};
pub use sequence::{CommandSequence, Step, MAX_STEPS};

use log::info;

use crate::common::{
    command::{AtCommand, UpdateRequest},
    config::{Credentials, Endpoint, ModemConfig},
    error::Error,
    hal_traits::{Clock, Heartbeat, ModemSerial, NoHeartbeat, Timer},
};

/// AT command client owning the serial channel to the modem.
#[derive(Debug)]
pub struct AtClient<'e, IF>
where
    IF: ModemSerial + Timer + Clock,
{
    interface: IF,
    endpoint: Endpoint<'e>,
    config: ModemConfig,
}

impl<'e, IF> AtClient<'e, IF>
where
    IF: ModemSerial + Timer + Clock,
{
    pub fn new(interface: IF, endpoint: Endpoint<'e>, config: ModemConfig) -> Self {
        AtClient {
            interface,
            endpoint,
            config,
        }
    }

    /// Gives the serial channel back.
    pub fn release(self) -> IF {
        self.interface
    }

    /// Sends `command` and scans the reply for `expected`.
    ///
    /// Returns `true` as soon as `expected` appears, `false` once `budget`
    /// bytes (at most [`crate::common::timing::RX_CAPACITY`]) arrived without it.
    /// Every call starts with an empty receive buffer.
    pub fn send_and_await(
        &mut self,
        command: &[u8],
        expected: &[u8],
        budget: usize,
    ) -> Result<bool, Error<IF::Error>> {
        let attempt = CommandAttempt { command, expected };
        Ok(self.run_attempt(&attempt, budget)?.is_match())
    }

    /// Joins the WiFi network, retrying per `config.join_retry`.
    ///
    /// With the default policy this blocks until the modem reports success.
    /// Returns the number of restarts it took.
    pub fn join_network(&mut self, credentials: &Credentials<'_>) -> Result<u32, Error<IF::Error>> {
        self.join_network_with(credentials, &mut NoHeartbeat)
    }

    /// Same as [`AtClient::join_network`], feeding `heartbeat` between steps.
    pub fn join_network_with<H: Heartbeat>(
        &mut self,
        credentials: &Credentials<'_>,
        heartbeat: &mut H,
    ) -> Result<u32, Error<IF::Error>> {
        let sequence = CommandSequence::from_steps(
            "join",
            &[
                Step::Command(AtCommand::Attention),
                Step::Command(AtCommand::StationMode),
                Step::Command(AtCommand::JoinAccessPoint {
                    ssid: credentials.ssid,
                    password: credentials.password,
                }),
            ],
        )
        .ok_or(Error::CommandFormat)?;

        let policy = self.config.join_retry;
        let restarts = self.run_sequence_with_retry(&sequence, &policy, heartbeat)?;
        info!("joined network {}", credentials.ssid);
        Ok(restarts)
    }

    /// Publishes `value` to channel field `field` of the endpoint, retrying per
    /// `config.publish_retry`. Returns the number of restarts it took.
    pub fn publish_reading(&mut self, value: i32, field: u8) -> Result<u32, Error<IF::Error>> {
        self.publish_reading_with(value, field, &mut NoHeartbeat)
    }

    /// Same as [`AtClient::publish_reading`], feeding `heartbeat` between steps.
    pub fn publish_reading_with<H: Heartbeat>(
        &mut self,
        value: i32,
        field: u8,
        heartbeat: &mut H,
    ) -> Result<u32, Error<IF::Error>> {
        let endpoint = self.endpoint;
        let request = UpdateRequest {
            api_key: endpoint.api_key,
            field,
            value,
        }
        .format_into()
        .map_err(|_| Error::CommandFormat)?;

        let sequence = CommandSequence::from_steps(
            "publish",
            &[
                Step::Command(AtCommand::EnableMultiplex),
                Step::Command(AtCommand::OpenTcp {
                    link_id: endpoint.link_id,
                    host: endpoint.host,
                    port: endpoint.port,
                }),
                Step::Command(AtCommand::SendReady {
                    link_id: endpoint.link_id,
                    len: request.len(),
                }),
                Step::Raw(request.as_bytes()),
                Step::Command(AtCommand::Close {
                    link_id: endpoint.link_id,
                }),
            ],
        )
        .ok_or(Error::CommandFormat)?;

        let policy = self.config.publish_retry;
        let restarts = self.run_sequence_with_retry(&sequence, &policy, heartbeat)?;
        info!("published field{}={}", field, value);
        Ok(restarts)
    }

    /// Blocks for `ms` milliseconds on the client's timer.
    pub(crate) fn pause_ms(&mut self, ms: u32) {
        self.interface.delay_ms(ms);
    }
}
