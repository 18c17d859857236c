// src/modem/sequence.rs

use heapless::Vec;
use log::{debug, info, warn};

use super::attempt::CommandAttempt;
use super::AtClient;
use crate::common::{
    command::{AtCommand, CommandFormatError},
    config::RetryPolicy,
    error::Error,
    hal_traits::{Clock, Heartbeat, ModemSerial, Timer},
};

/// Most steps any sequence needs.
pub const MAX_STEPS: usize = 8;

/// A single step of a [`CommandSequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    /// Send the command and wait for its expected response.
    Command(AtCommand<'a>),
    /// Write raw bytes without looking at the response.
    Raw(&'a [u8]),
}

/// Ordered steps that must all succeed for a higher-level operation to complete.
///
/// A failing step abandons the whole sequence; the next pass starts again from
/// the first step.
#[derive(Debug, Clone)]
pub struct CommandSequence<'a> {
    name: &'static str,
    steps: Vec<Step<'a>, MAX_STEPS>,
}

impl<'a> CommandSequence<'a> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Builds a sequence from a list of steps, `None` if there are more than [`MAX_STEPS`].
    pub fn from_steps(name: &'static str, steps: &[Step<'a>]) -> Option<Self> {
        Some(Self {
            name,
            steps: Vec::from_slice(steps).ok()?,
        })
    }

    /// Appends a step, handing it back if the sequence is full.
    pub fn push(&mut self, step: Step<'a>) -> Result<(), Step<'a>> {
        self.steps.push(step)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn steps(&self) -> &[Step<'a>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Checks that every command line fits its buffer.
    pub fn check_formats(&self) -> Result<(), CommandFormatError> {
        for step in self.steps.iter() {
            if let Step::Command(command) = step {
                command.format_into()?;
            }
        }
        Ok(())
    }
}

// Failures the remote side can cause restart the sequence, HAL errors do not
fn step_failed<E: core::fmt::Debug>(error: Error<E>, step: usize) -> Error<E> {
    if error.is_retryable() {
        Error::SequenceFailure { step }
    } else {
        error
    }
}

impl<IF> AtClient<'_, IF>
where
    IF: ModemSerial + Timer + Clock,
{
    /// Runs every step once, in order.
    ///
    /// The heartbeat is fed after each step. Successful commands are followed by
    /// the settle delay (except the last one), raw writes by the flush delay.
    /// Nothing is sent if any command line does not fit its buffer.
    pub fn run_sequence_once<H: Heartbeat>(
        &mut self,
        sequence: &CommandSequence<'_>,
        heartbeat: &mut H,
    ) -> Result<(), Error<IF::Error>> {
        sequence.check_formats().map_err(|_| Error::CommandFormat)?;
        let last = sequence.len().saturating_sub(1);

        for (index, step) in sequence.steps().iter().enumerate() {
            let pause_ms = match step {
                Step::Command(command) => {
                    let line = command.format_into().map_err(|_| Error::CommandFormat)?;
                    debug!("{} step {}: {}", sequence.name(), index, command);

                    let attempt = CommandAttempt {
                        command: line.as_bytes(),
                        expected: command.expected_response(),
                    };
                    let outcome = self
                        .run_attempt(&attempt, self.config.rx_budget)
                        .map_err(|e| step_failed(e, index))?;
                    if !outcome.is_match() {
                        debug!("{} step {}: no match in {} bytes", sequence.name(), index, outcome.received());
                        return Err(Error::SequenceFailure { step: index });
                    }

                    if index == last { 0 } else { self.config.settle_ms }
                }
                Step::Raw(bytes) => {
                    debug!("{} step {}: {} raw bytes", sequence.name(), index, bytes.len());
                    self.send_bytes(bytes).map_err(|e| step_failed(e, index))?;
                    self.config.flush_ms
                }
            };

            heartbeat.beat();
            if pause_ms > 0 {
                self.interface.delay_ms(pause_ms);
            }
        }
        Ok(())
    }

    /// Runs the sequence until a full pass succeeds.
    ///
    /// After a failed pass the client waits as `policy` dictates and starts over
    /// from the first step. Returns the number of restarts on success, or
    /// [`Error::RetriesExhausted`] once a bounded policy gives up. HAL errors
    /// abort immediately.
    pub fn run_sequence_with_retry<H: Heartbeat>(
        &mut self,
        sequence: &CommandSequence<'_>,
        policy: &RetryPolicy,
        heartbeat: &mut H,
    ) -> Result<u32, Error<IF::Error>> {
        let mut failures: u32 = 0;

        loop {
            match self.run_sequence_once(sequence, heartbeat) {
                Ok(()) => {
                    info!("{} complete after {} restarts", sequence.name(), failures);
                    return Ok(failures);
                }
                Err(Error::SequenceFailure { step }) => {
                    failures = failures.saturating_add(1);
                    if !policy.allows_another(failures) {
                        warn!("{} abandoned after {} attempts", sequence.name(), failures);
                        return Err(Error::RetriesExhausted { attempts: failures });
                    }
                    let delay_ms = policy.delay_after(failures);
                    warn!(
                        "{} failed at step {}, restarting in {} ms",
                        sequence.name(),
                        step,
                        delay_ms
                    );
                    self.interface.delay_ms(delay_ms);
                    heartbeat.beat();
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{
        config::{Backoff, Endpoint, ModemConfig},
        hal_traits::{Millis, NoHeartbeat},
    };
    use nb::Result as NbResult;
    use std::collections::VecDeque;
    use std::vec::Vec as StdVec;

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    struct MockCommError;

    // Answers each complete command line with the next scripted response for
    // the first matching prefix; the last response of a script repeats.
    struct ScriptedModem {
        current_time_us: u64,
        script: StdVec<(&'static [u8], VecDeque<&'static [u8]>)>,
        pending: VecDeque<u8>,
        line: StdVec<u8>,
        lines: StdVec<StdVec<u8>>,
        fail_writes_after: Option<usize>,
        written: usize,
    }
    impl ScriptedModem {
        fn new() -> Self {
            ScriptedModem {
                current_time_us: 0,
                script: StdVec::new(),
                pending: VecDeque::new(),
                line: StdVec::new(),
                lines: StdVec::new(),
                fail_writes_after: None,
                written: 0,
            }
        }
        fn respond(mut self, prefix: &'static [u8], responses: &[&'static [u8]]) -> Self {
            self.script.push((prefix, responses.iter().copied().collect()));
            self
        }
        fn count(&self, prefix: &[u8]) -> usize {
            self.lines.iter().filter(|l| l.starts_with(prefix)).count()
        }
        fn on_line(&mut self) {
            let line = core::mem::take(&mut self.line);
            // Only the latest command gets answered
            self.pending.clear();
            if let Some((_, responses)) = self.script.iter_mut().find(|(p, _)| line.starts_with(p)) {
                let response = if responses.len() > 1 {
                    responses.pop_front()
                } else {
                    responses.front().copied()
                };
                if let Some(bytes) = response {
                    self.pending.extend(bytes.iter().copied());
                }
            }
            self.lines.push(line);
        }
    }
    impl Timer for ScriptedModem {
        fn delay_us(&mut self, us: u32) { self.current_time_us += us as u64; }
        fn delay_ms(&mut self, ms: u32) { self.current_time_us += ms as u64 * 1_000; }
    }
    impl Clock for ScriptedModem {
        fn now(&self) -> Millis { Millis((self.current_time_us / 1_000) as u32) }
    }
    impl ModemSerial for ScriptedModem {
        type Error = MockCommError;
        fn read_byte(&mut self) -> NbResult<u8, Self::Error> {
            self.pending.pop_front().ok_or(nb::Error::WouldBlock)
        }
        fn write_byte(&mut self, byte: u8) -> NbResult<(), Self::Error> {
            if let Some(limit) = self.fail_writes_after {
                if self.written >= limit {
                    return Err(nb::Error::Other(MockCommError));
                }
            }
            self.written += 1;
            self.line.push(byte);
            if self.line.ends_with(b"\r\n") {
                self.on_line();
            }
            Ok(())
        }
    }

    fn small_budget_config() -> ModemConfig {
        ModemConfig {
            rx_budget: 32,
            ..ModemConfig::default()
        }
    }

    fn three_steps() -> CommandSequence<'static> {
        CommandSequence::from_steps(
            "join",
            &[
                Step::Command(AtCommand::Attention),
                Step::Command(AtCommand::StationMode),
                Step::Command(AtCommand::JoinAccessPoint { ssid: "lab", password: "pw" }),
            ],
        )
        .unwrap()
    }

    const OK: &[u8] = b"\r\nOK\r\n";
    // Long enough to exhaust a 32 byte budget
    const ERROR: &[u8] = b"\r\nbusy p...\r\nbusy p...\r\nbusy p...\r\nERROR\r\n";

    #[test]
    fn test_sequence_succeeds_first_pass() {
        let modem = ScriptedModem::new()
            .respond(b"AT\r\n", &[OK])
            .respond(b"AT+CWMODE", &[OK])
            .respond(b"AT+CWJAP", &[b"WIFI GOT IP\r\n\r\nOK\r\n"]);
        let mut client = AtClient::new(modem, Endpoint::thingspeak("K"), small_budget_config());
        let mut beats = 0;
        let mut heartbeat = || beats += 1;

        let restarts = client
            .run_sequence_with_retry(&three_steps(), &RetryPolicy::forever(5_000), &mut heartbeat)
            .unwrap();
        assert_eq!(restarts, 0);
        assert_eq!(beats, 3);
        // Settle after the first two steps only
        let elapsed = client.interface.current_time_us;
        assert!(elapsed >= 2_000_000 && elapsed < 3_000_000);
    }

    #[test]
    fn test_failing_middle_step_restarts_from_first_step() {
        const N: usize = 4;
        let mut cwmode: StdVec<&'static [u8]> = std::vec![ERROR; N];
        cwmode.push(OK);
        let modem = ScriptedModem::new()
            .respond(b"AT\r\n", &[OK])
            .respond(b"AT+CWMODE", &cwmode)
            .respond(b"AT+CWJAP", &[OK]);
        let mut client = AtClient::new(modem, Endpoint::thingspeak("K"), small_budget_config());

        let restarts = client
            .run_sequence_with_retry(&three_steps(), &RetryPolicy::forever(5_000), &mut NoHeartbeat)
            .unwrap();
        assert_eq!(restarts, N as u32);
        assert_eq!(client.interface.count(b"AT\r\n"), N + 1);
        assert_eq!(client.interface.count(b"AT+CWMODE"), N + 1);
        assert_eq!(client.interface.count(b"AT+CWJAP"), 1);
        assert!(client.interface.current_time_us >= N as u64 * 5_000_000);
    }

    #[test]
    fn test_last_step_never_reached_while_middle_step_fails() {
        let modem = ScriptedModem::new()
            .respond(b"AT\r\n", &[OK])
            .respond(b"AT+CWMODE", &[ERROR])
            .respond(b"AT+CWJAP", &[OK]);
        let mut client = AtClient::new(modem, Endpoint::thingspeak("K"), small_budget_config());
        let policy = RetryPolicy::bounded(6, 5_000, Backoff::Fixed);

        let result = client.run_sequence_with_retry(&three_steps(), &policy, &mut NoHeartbeat);
        assert!(matches!(result, Err(Error::RetriesExhausted { attempts: 6 })));
        assert_eq!(client.interface.count(b"AT\r\n"), 6);
        assert_eq!(client.interface.count(b"AT+CWJAP"), 0);
    }

    #[test]
    fn test_single_pass_reports_failing_step() {
        let modem = ScriptedModem::new()
            .respond(b"AT\r\n", &[OK])
            .respond(b"AT+CWMODE", &[ERROR]);
        let mut client = AtClient::new(modem, Endpoint::thingspeak("K"), small_budget_config());
        let result = client.run_sequence_once(&three_steps(), &mut NoHeartbeat);
        assert!(matches!(result, Err(Error::SequenceFailure { step: 1 })));
    }

    #[test]
    fn test_silent_modem_is_a_retryable_step_failure() {
        // No script: nothing is ever answered
        let mut client = AtClient::new(ScriptedModem::new(), Endpoint::thingspeak("K"), small_budget_config());
        let result = client.run_sequence_once(&three_steps(), &mut NoHeartbeat);
        assert!(matches!(result, Err(Error::SequenceFailure { step: 0 })));
    }

    #[test]
    fn test_io_error_aborts_without_retry() {
        let mut modem = ScriptedModem::new().respond(b"AT\r\n", &[OK]);
        modem.fail_writes_after = Some(6);
        let mut client = AtClient::new(modem, Endpoint::thingspeak("K"), small_budget_config());

        let result = client.run_sequence_with_retry(&three_steps(), &RetryPolicy::forever(5_000), &mut NoHeartbeat);
        assert!(matches!(result, Err(Error::Io(MockCommError))));
        assert_eq!(client.interface.count(b"AT\r\n"), 1);
    }

    #[test]
    fn test_backoff_delays_between_passes() {
        let modem = ScriptedModem::new().respond(b"AT\r\n", &[ERROR, ERROR, ERROR, OK]);
        let sequence = CommandSequence::from_steps("ping", &[Step::Command(AtCommand::Attention)]).unwrap();
        let mut client = AtClient::new(modem, Endpoint::thingspeak("K"), small_budget_config());
        let policy = RetryPolicy::bounded(5, 1_000, Backoff::Exponential { max_ms: 3_000 });

        let restarts = client.run_sequence_with_retry(&sequence, &policy, &mut NoHeartbeat).unwrap();
        assert_eq!(restarts, 3);
        // 1 s + 2 s + 3 s (capped) of backoff
        let elapsed = client.interface.current_time_us;
        assert!(elapsed >= 6_000_000 && elapsed < 7_000_000);
    }

    #[test]
    fn test_sequence_capacity() {
        let steps = [Step::Command(AtCommand::Attention); MAX_STEPS + 1];
        assert!(CommandSequence::from_steps("long", &steps).is_none());

        let mut sequence = CommandSequence::from_steps("full", &steps[..MAX_STEPS]).unwrap();
        assert_eq!(sequence.len(), MAX_STEPS);
        assert!(sequence.push(Step::Raw(b"x")).is_err());
        assert!(!sequence.is_empty());
        assert!(CommandSequence::new("empty").is_empty());
    }

    #[test]
    fn test_unformattable_step_sends_nothing() {
        let ssid = core::str::from_utf8(&[b's'; 120]).unwrap();
        let sequence = CommandSequence::from_steps(
            "join",
            &[
                Step::Command(AtCommand::Attention),
                Step::Command(AtCommand::StationMode),
                Step::Command(AtCommand::JoinAccessPoint { ssid, password: "pw" }),
            ],
        )
        .unwrap();
        assert!(sequence.check_formats().is_err());
        assert!(three_steps().check_formats().is_ok());

        let modem = ScriptedModem::new().respond(b"AT", &[OK]);
        let mut client = AtClient::new(modem, Endpoint::thingspeak("K"), small_budget_config());
        let result = client.run_sequence_with_retry(&sequence, &RetryPolicy::forever(5_000), &mut NoHeartbeat);
        assert!(matches!(result, Err(Error::CommandFormat)));
        assert_eq!(client.interface.written, 0);
        assert_eq!(client.interface.current_time_us, 0);
    }
}
