//! Sideband configuration channel.
//!
//! Before every transaction the DUT announces its settings over a strobe
//! pin and a data pin group. For each field the DUT puts the value on the
//! data pins, raises the strobe, then lowers it; the value is stable across
//! both strobe edges. The field order is fixed per role and is the one
//! bit-exact compatibility surface with the DUT test programs.

use sim_platform::{Level, PinGroup, SimPins};

use crate::config::{DriverConfig, SpiMode, TransactionConfig};
use crate::error::{CheckerError, Field};

/// Field order announced before a transaction the DUT masters.
pub const RESPONDER_FIELDS: [Field; 8] = [
    Field::Cpol,
    Field::Cpha,
    Field::FrequencyKhz,
    Field::MosiEnabled,
    Field::MisoEnabled,
    Field::DeviceId,
    Field::InterframeSpace,
    Field::ExpectedByteCount,
];

/// Field order announced before a transaction the checker masters.
pub const DRIVER_FIELDS: [Field; 6] = [
    Field::Cpol,
    Field::Cpha,
    Field::MisoEnabled,
    Field::ExpectedBitCount,
    Field::Kbps,
    Field::InitialClockDelay,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for the strobe edge that arms the field.
    AwaitArm,
    /// Armed; waiting for the edge after which the data is sampled.
    AwaitSettle,
    /// Data pins may be sampled.
    Settled,
}

/// Two-phase acquisition of one sideband field.
///
/// Only real strobe transitions advance the phase, so spurious wake-ups
/// from the pin interface are harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAcquisition {
    phase: Phase,
    last: Level,
}

impl FieldAcquisition {
    /// Start acquiring with the strobe currently at `strobe`.
    #[must_use]
    pub fn new(strobe: Level) -> Self {
        Self {
            phase: Phase::AwaitArm,
            last: strobe,
        }
    }

    /// Feed a freshly sampled strobe level; returns `true` once settled.
    pub fn observe(&mut self, strobe: Level) -> bool {
        if strobe != self.last {
            self.last = strobe;
            self.phase = match self.phase {
                Phase::AwaitArm => Phase::AwaitSettle,
                Phase::AwaitSettle | Phase::Settled => Phase::Settled,
            };
        }
        self.is_settled()
    }

    /// Whether the data pins may be sampled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Settled
    }
}

/// Reader for the DUT's sideband announcements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebandReader {
    strobe: PinGroup,
    data: PinGroup,
}

impl SidebandReader {
    /// Reader on the given strobe line and data group.
    #[must_use]
    pub fn new(strobe: PinGroup, data: PinGroup) -> Self {
        Self { strobe, data }
    }

    /// Strobe line handle.
    #[must_use]
    pub fn strobe(&self) -> PinGroup {
        self.strobe
    }

    /// Wait until the strobe is low so that reading never starts mid-field.
    pub async fn resync<P: SimPins>(&self, pins: &mut P) -> Result<(), P::Error> {
        while pins.sample_level(self.strobe)? == Level::High {
            pins.wait_for_change(&[self.strobe]).await?;
        }
        Ok(())
    }

    /// Read one field: two strobe transitions, then one sample of the data.
    pub async fn read_field<P: SimPins>(&self, pins: &mut P) -> Result<u32, P::Error> {
        let mut acquisition = FieldAcquisition::new(pins.sample_level(self.strobe)?);
        while !acquisition.is_settled() {
            pins.wait_for_change(&[self.strobe]).await?;
            acquisition.observe(pins.sample_level(self.strobe)?);
        }
        pins.sample(self.data)
    }

    /// Read the eight fields announced before a DUT-mastered transaction.
    pub async fn read_responder_config<P: SimPins>(
        &self,
        pins: &mut P,
    ) -> Result<TransactionConfig, CheckerError<P::Error>> {
        self.resync(pins).await?;
        let mut raw = [0u32; RESPONDER_FIELDS.len()];
        for slot in &mut raw {
            *slot = self.read_field(pins).await?;
        }
        let [cpol, cpha, frequency_khz, mosi, miso, device_id, interframe_space, bytes] = raw;

        let config = TransactionConfig {
            mode: SpiMode::from_bits(flag(Field::Cpol, cpol)?, flag(Field::Cpha, cpha)?),
            frequency_khz: nonzero(Field::FrequencyKhz, frequency_khz)?,
            mosi_enabled: flag(Field::MosiEnabled, mosi)?,
            miso_enabled: flag(Field::MisoEnabled, miso)?,
            device_id,
            interframe_space,
            expected_byte_count: bytes,
        };
        tracing::debug!(
            mode = ?config.mode,
            khz = config.frequency_khz,
            mosi = config.mosi_enabled,
            miso = config.miso_enabled,
            device_id = config.device_id,
            interframe_space = config.interframe_space,
            bytes = config.expected_byte_count,
            "responder settings received"
        );
        Ok(config)
    }

    /// Read the six fields announced before a checker-mastered transaction.
    pub async fn read_driver_config<P: SimPins>(
        &self,
        pins: &mut P,
    ) -> Result<DriverConfig, CheckerError<P::Error>> {
        self.resync(pins).await?;
        let mut raw = [0u32; DRIVER_FIELDS.len()];
        for slot in &mut raw {
            *slot = self.read_field(pins).await?;
        }
        let [cpol, cpha, miso, bits, kbps, initial_clock_delay_ns] = raw;

        let config = DriverConfig {
            mode: SpiMode::from_bits(flag(Field::Cpol, cpol)?, flag(Field::Cpha, cpha)?),
            miso_enabled: flag(Field::MisoEnabled, miso)?,
            expected_bit_count: bits,
            kbps: nonzero(Field::Kbps, kbps)?,
            initial_clock_delay_ns,
        };
        tracing::debug!(
            mode = ?config.mode,
            miso = config.miso_enabled,
            bits = config.expected_bit_count,
            kbps = config.kbps,
            initial_delay_ns = config.initial_clock_delay_ns,
            "driver settings received"
        );
        Ok(config)
    }
}

fn flag<E>(field: Field, value: u32) -> Result<bool, CheckerError<E>> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(CheckerError::InvalidField { field, value }),
    }
}

fn nonzero<E>(field: Field, value: u32) -> Result<u32, CheckerError<E>> {
    if value == 0 {
        Err(CheckerError::InvalidField { field, value })
    } else {
        Ok(value)
    }
}
