// src/sensor/frame.rs

/// The five bytes clocked out by the sensor in one transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SensorFrame {
    pub humidity_high: u8,
    pub humidity_low: u8,
    pub temperature_high: u8,
    pub temperature_low: u8,
    pub checksum: u8,
}

/// A validated reading in tenths of a unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Reading {
    /// Tenths of a degree Celsius.
    pub temperature_tenths: i16,
    /// Tenths of a percent relative humidity.
    pub humidity_tenths: u16,
}

impl SensorFrame {
    /// Builds a frame from bytes in wire order.
    pub const fn from_bytes(bytes: [u8; 5]) -> Self {
        Self {
            humidity_high: bytes[0],
            humidity_low: bytes[1],
            temperature_high: bytes[2],
            temperature_low: bytes[3],
            checksum: bytes[4],
        }
    }

    /// Low byte of the sum of the four data bytes.
    pub const fn calculated_checksum(&self) -> u8 {
        self.humidity_high
            .wrapping_add(self.humidity_low)
            .wrapping_add(self.temperature_high)
            .wrapping_add(self.temperature_low)
    }

    pub const fn is_valid(&self) -> bool {
        self.calculated_checksum() == self.checksum
    }

    /// Converts to physical units, refusing frames whose checksum does not match.
    ///
    /// On mismatch returns `(expected, calculated)`.
    pub fn reading(&self) -> Result<Reading, (u8, u8)> {
        if !self.is_valid() {
            return Err((self.checksum, self.calculated_checksum()));
        }
        Ok(Reading {
            temperature_tenths: self.temperature_tenths(),
            humidity_tenths: self.humidity_tenths(),
        })
    }

    fn humidity_tenths(&self) -> u16 {
        u16::from_be_bytes([self.humidity_high, self.humidity_low])
    }

    // Bit 7 of the high byte flags a negative value; the sensor then only
    // carries the magnitude in the low byte.
    fn temperature_tenths(&self) -> i16 {
        if self.temperature_high & 0x80 != 0 {
            -(self.temperature_low as i16)
        } else {
            i16::from_be_bytes([self.temperature_high, self.temperature_low])
        }
    }
}

impl Reading {
    pub fn temperature_celsius(&self) -> f32 {
        self.temperature_tenths as f32 / 10.0
    }

    pub fn humidity_percent(&self) -> f32 {
        self.humidity_tenths as f32 / 10.0
    }

    /// Whole degrees, truncated toward zero.
    pub const fn temperature_whole(&self) -> i32 {
        self.temperature_tenths as i32 / 10
    }

    /// Whole percent, truncated toward zero.
    pub const fn humidity_whole(&self) -> i32 {
        self.humidity_tenths as i32 / 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(hh: u8, hl: u8, th: u8, tl: u8) -> SensorFrame {
        let sum = hh.wrapping_add(hl).wrapping_add(th).wrapping_add(tl);
        SensorFrame::from_bytes([hh, hl, th, tl, sum])
    }

    #[test]
    fn test_reference_frame() {
        let f = SensorFrame::from_bytes([0x01, 0x2C, 0x00, 0xC8, 0xF5]);
        assert!(f.is_valid());
        let reading = f.reading().unwrap();
        assert_eq!(reading.humidity_tenths, 300);
        assert_eq!(reading.temperature_tenths, 200);
        assert_eq!(reading.humidity_percent(), 30.0);
        assert_eq!(reading.temperature_celsius(), 20.0);
    }

    #[test]
    fn test_negative_temperature_uses_low_byte_only() {
        let reading = frame(0x02, 0x8C, 0x80, 0x05).reading().unwrap();
        assert_eq!(reading.temperature_tenths, -5);
        assert_eq!(reading.temperature_celsius(), -0.5);

        // Remaining bits of the high byte are ignored once the sign bit is set
        let reading = frame(0x02, 0x8C, 0x81, 0x05).reading().unwrap();
        assert_eq!(reading.temperature_tenths, -5);
    }

    #[test]
    fn test_checksum_mismatch_is_refused() {
        let f = SensorFrame::from_bytes([0x01, 0x2C, 0x00, 0xC8, 0xF4]);
        assert!(!f.is_valid());
        assert_eq!(f.reading(), Err((0xF4, 0xF5)));
    }

    #[test]
    fn test_checksum_wraps() {
        let f = frame(0xFF, 0xFF, 0x7F, 0xFF);
        assert_eq!(f.checksum, 0x7C);
        assert!(f.reading().is_ok());
    }

    #[test]
    fn test_valid_frames_decode_and_corrupted_frames_do_not() {
        for hh in [0x00u8, 0x01, 0x03] {
            for th in [0x00u8, 0x01, 0x7F, 0x80, 0xFF] {
                for low in (0..=255u8).step_by(15) {
                    let f = frame(hh, low, th, low);
                    let reading = f.reading().unwrap();
                    assert_eq!(reading.humidity_tenths, (hh as u16) << 8 | low as u16);
                    let expected_temp = if th & 0x80 != 0 {
                        -(low as i16)
                    } else {
                        ((th as i16) << 8) | low as i16
                    };
                    assert_eq!(reading.temperature_tenths, expected_temp);

                    let mut corrupted = f;
                    corrupted.checksum = f.checksum.wrapping_add(1);
                    assert!(corrupted.reading().is_err());
                }
            }
        }
    }

    #[test]
    fn test_whole_units_truncate_toward_zero() {
        let reading = Reading { temperature_tenths: -19, humidity_tenths: 655 };
        assert_eq!(reading.temperature_whole(), -1);
        assert_eq!(reading.humidity_whole(), 65);
    }
}
