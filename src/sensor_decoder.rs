//! Decoding the bump-sensor board's serial output.
//!
//! The board prints one line per reading: its switches as `0`/`1`
//! characters, most significant first, e.g. `0101`.

use nom::{
    character::complete::{one_of, space0},
    combinator::{all_consuming, map},
    multi::many_m_n,
    sequence::delimited,
    Finish, IResult,
};

use std::{fmt, str::FromStr};

use crate::error::{Result, SenseNavError};

/// Widest reading that still fits the integer value.
pub const MAX_SENSOR_BITS: usize = 32;

/// One line from the sensor board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading {
    /// Switch states in the order they were printed
    pub bits: Vec<bool>,
    /// The bits read as a binary number
    pub value: u32,
}

impl SensorReading {
    /// Positions, counted from the left, of the switches that are closed.
    pub fn active(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.bits {
            f.write_str(if b { "1" } else { "0" })?;
        }
        write!(f, " ({})", self.value)
    }
}

fn parse_bit(s: &str) -> IResult<&str, bool> {
    map(one_of("01"), |c| c == '1')(s)
}

fn parse_reading(s: &str) -> IResult<&str, SensorReading> {
    map(
        all_consuming(delimited(
            space0,
            many_m_n(1, MAX_SENSOR_BITS, parse_bit),
            space0,
        )),
        |bits: Vec<bool>| {
            let value = bits.iter().fold(0u32, |acc, &b| (acc << 1) | b as u32);
            SensorReading { bits, value }
        },
    )(s)
}

impl FromStr for SensorReading {
    type Err = SenseNavError;

    fn from_str(s: &str) -> Result<Self> {
        let line = s.trim_end_matches(['\r', '\n']);
        match parse_reading(line).finish() {
            Ok((_remaining, reading)) => Ok(reading),
            Err(_) => Err(SenseNavError::SensorDecode(line.to_owned())),
        }
    }
}

/// Splits a byte stream into lines and decodes each one.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    /// An assembler with nothing buffered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes read from the port and returns every reading completed
    /// by them. Blank lines are skipped; the tail after the last newline is
    /// kept for the next call.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<SensorReading>> {
        let mut done = Vec::new();
        for &byte in bytes {
            if byte != b'\n' {
                self.pending.push(byte);
                continue;
            }
            let line = std::mem::take(&mut self.pending);
            match std::str::from_utf8(&line) {
                Ok(s) if s.trim().is_empty() => {}
                Ok(s) => done.push(s.parse()),
                // often garbage left in the hardware buffer at power up
                Err(_) => done.push(Err(SenseNavError::SensorDecode(
                    String::from_utf8_lossy(&line).into_owned(),
                ))),
            }
        }
        done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_binary_line() {
        let (leftover, reading) = parse_reading("0101").unwrap();
        assert_eq!(leftover, "");
        assert_eq!(
            reading,
            SensorReading {
                bits: vec![false, true, false, true],
                value: 5,
            }
        );
        assert_eq!(reading.active().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(reading.to_string(), "0101 (5)");
    }

    #[test]
    fn trims_line_endings_and_spaces() {
        let reading: SensorReading = " 1111 \r\n".parse().unwrap();
        assert_eq!(reading.value, 15);
        assert_eq!(reading.bits.len(), 4);
    }

    #[test]
    fn rejects_other_characters() {
        assert!(matches!(
            "01a1".parse::<SensorReading>(),
            Err(SenseNavError::SensorDecode(line)) if line == "01a1"
        ));
        assert!("".parse::<SensorReading>().is_err());
        assert!("2".parse::<SensorReading>().is_err());
    }

    #[test]
    fn rejects_overlong_readings() {
        let ok = "1".repeat(MAX_SENSOR_BITS);
        assert_eq!(ok.parse::<SensorReading>().unwrap().value, u32::MAX);
        let long = "1".repeat(MAX_SENSOR_BITS + 1);
        assert!(long.parse::<SensorReading>().is_err());
    }

    #[test]
    fn assembles_lines_across_reads() {
        let mut lines = LineAssembler::new();
        assert!(lines.push(b"01").is_empty());
        let out = lines.push(b"10\r\n\n0001\nxx\n11");
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().unwrap().value, 6);
        assert_eq!(out[1].as_ref().unwrap().value, 1);
        assert!(out[2].is_err());
        let out = lines.push(b"\n");
        assert_eq!(out[0].as_ref().unwrap().value, 3);
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut lines = LineAssembler::new();
        let out = lines.push(&[0xff, 0xfe, b'\n']);
        assert!(matches!(out[0], Err(SenseNavError::SensorDecode(_))));
    }
}
