//! NMEA 0183 helpers for the GPS receiver: sentence framing for PMTK
//! commands and GGA parsing.

use core::fmt::Write;
use core::str;

use heapless::{String, Vec};

use crate::error::SensorError;
use crate::model::{GgaFix, Hemisphere, Position};

/// Output only GGA sentences
pub const PMTK_GGA_ONLY: &str = "PMTK314,0,0,0,1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0";
/// Fix update every 1000 ms
pub const PMTK_RATE_1HZ: &str = "PMTK220,1000";

/// Longest sentence the standard allows, plus the CRLF
pub const MAX_SENTENCE_LEN: usize = 84;

/// XOR of every byte between `$` and `*`
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0, |acc, b| acc ^ b)
}

/// Frame a sentence body as `$<body>*HH\r\n`
pub fn write_sentence(body: &str) -> Result<String<MAX_SENTENCE_LEN>, SensorError> {
    let mut sentence = String::new();
    write!(sentence, "${}*{:02X}\r\n", body, checksum(body.as_bytes()))
        .map_err(|_| SensorError::Malformed)?;
    Ok(sentence)
}

/// Split `$body*HH` and verify the checksum when one is present
fn sentence_body(sentence: &[u8]) -> Result<&[u8], SensorError> {
    let sentence = sentence.trim_ascii();
    let sentence = sentence.strip_prefix(b"$").ok_or(SensorError::Malformed)?;

    match sentence.iter().position(|&b| b == b'*') {
        Some(star) => {
            let (body, tail) = sentence.split_at(star);
            let digits = str::from_utf8(&tail[1..]).map_err(|_| SensorError::Malformed)?;
            let expected = u8::from_str_radix(digits, 16).map_err(|_| SensorError::Malformed)?;
            if checksum(body) != expected {
                return Err(SensorError::Checksum);
            }
            Ok(body)
        }
        None => Ok(sentence),
    }
}

/// `true` for `$xxGGA` sentences from any talker
pub fn is_gga(sentence: &[u8]) -> bool {
    let sentence = sentence.trim_ascii_start();
    sentence.len() >= 6 && sentence[0] == b'$' && &sentence[3..6] == b"GGA"
}

fn parse_number<T: str::FromStr>(field: &str) -> Result<Option<T>, SensorError> {
    if field.is_empty() {
        return Ok(None);
    }
    field.parse().map(Some).map_err(|_| SensorError::Malformed)
}

/// `ddmm.mmmm` / `dddmm.mmmm` to decimal degrees
fn degrees_minutes(field: &str) -> Result<Option<f32>, SensorError> {
    let Some(raw) = parse_number::<f64>(field)? else {
        return Ok(None);
    };
    let degrees = (raw / 100.0) as i32 as f64;
    let minutes = raw - degrees * 100.0;
    if !(0.0..60.0).contains(&minutes) {
        return Err(SensorError::Malformed);
    }
    Ok(Some((degrees + minutes / 60.0) as f32))
}

fn hemisphere(field: &str) -> Result<Option<Hemisphere>, SensorError> {
    match field.as_bytes() {
        [] => Ok(None),
        [c] => Hemisphere::from_indicator(*c)
            .map(Some)
            .ok_or(SensorError::Malformed),
        _ => Err(SensorError::Malformed),
    }
}

/// Parse a GGA sentence into a fix
pub fn parse_gga(sentence: &[u8]) -> Result<GgaFix, SensorError> {
    if !is_gga(sentence) {
        return Err(SensorError::NoData);
    }
    let body = sentence_body(sentence)?;
    let body = str::from_utf8(body).map_err(|_| SensorError::Malformed)?;

    let mut fields = body.split(',');
    let mut next = || fields.next().ok_or(SensorError::Malformed);

    let _talker = next()?;
    let time = parse_number::<f32>(next()?)?.unwrap_or(0.0);
    let latitude = degrees_minutes(next()?)?;
    let lat_hemisphere = hemisphere(next()?)?;
    let longitude = degrees_minutes(next()?)?;
    let lon_hemisphere = hemisphere(next()?)?;
    let quality = parse_number::<u8>(next()?)?.unwrap_or(0);
    let satellites = parse_number::<u8>(next()?)?.unwrap_or(0);
    let horizontal_dilution = parse_number::<f32>(next()?)?.unwrap_or(0.0);
    let altitude = parse_number::<f32>(next()?)?.unwrap_or(0.0);
    let altitude_unit = next()?.chars().next().unwrap_or('M');

    let position = match (latitude, lat_hemisphere, longitude, lon_hemisphere) {
        (Some(latitude), Some(lat_hemisphere), Some(longitude), Some(lon_hemisphere)) => {
            Some(Position {
                latitude,
                lat_hemisphere,
                longitude,
                lon_hemisphere,
            })
        }
        _ => None,
    };

    Ok(GgaFix {
        time,
        position,
        quality,
        satellites,
        horizontal_dilution,
        altitude,
        altitude_unit,
        fix_valid: quality > 0,
    })
}

/// Assembles sentences from a byte stream, restarting at every `$`
pub struct SentenceBuffer {
    line: Vec<u8, MAX_SENTENCE_LEN>,
    complete: bool,
}

impl Default for SentenceBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceBuffer {
    pub fn new() -> Self {
        Self {
            line: Vec::new(),
            complete: false,
        }
    }

    /// Drop any partial sentence, e.g. after a receive overrun
    pub fn clear(&mut self) {
        self.line.clear();
        self.complete = false;
    }

    /// Feed one byte; returns the sentence once its `\n` arrives
    pub fn feed(&mut self, byte: u8) -> Option<&[u8]> {
        if self.complete {
            self.clear();
        }
        match byte {
            b'$' => {
                self.line.clear();
                let _ = self.line.push(b'$');
                None
            }
            b'\n' if !self.line.is_empty() => {
                self.complete = true;
                Some(self.line.as_slice())
            }
            _ if self.line.is_empty() => None,
            b => {
                if self.line.push(b).is_err() {
                    self.line.clear();
                }
                None
            }
        }
    }
}

/// A newer parsed fix wins; a newer failure only replaces another failure
pub fn newest(
    previous: Option<Result<GgaFix, SensorError>>,
    next: Result<GgaFix, SensorError>,
) -> Option<Result<GgaFix, SensorError>> {
    match (previous, next) {
        (Some(Ok(fix)), Err(_)) => Some(Ok(fix)),
        (_, next) => Some(next),
    }
}

/// Run `bytes` through `buffer` and keep the newest GGA completed in them.
/// A sentence left unfinished stays in the buffer for the next call.
pub fn latest_gga(
    buffer: &mut SentenceBuffer,
    bytes: &[u8],
) -> Option<Result<GgaFix, SensorError>> {
    let mut latest = None;
    for &b in bytes {
        if let Some(sentence) = buffer.feed(b) {
            if is_gga(sentence) {
                latest = newest(latest, parse_gga(sentence));
            }
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn pmtk_checksums() {
        assert_eq!(checksum(PMTK_GGA_ONLY.as_bytes()), 0x29);
        assert_eq!(
            write_sentence(PMTK_RATE_1HZ).unwrap().as_str(),
            "$PMTK220,1000*1F\r\n"
        );
    }

    #[test]
    fn parses_gpgga() {
        let fix = parse_gga(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n")
            .unwrap();

        assert_eq!(fix.time, 123519.0);
        assert_eq!(fix.quality, 1);
        assert_eq!(fix.satellites, 8);
        assert!(close(fix.horizontal_dilution, 0.9));
        assert!(close(fix.altitude, 545.4));
        assert_eq!(fix.altitude_unit, 'M');
        assert!(fix.fix_valid);

        let position = fix.position.unwrap();
        assert!(close(position.latitude, 48.1173));
        assert_eq!(position.lat_hemisphere, Hemisphere::North);
        assert!(close(position.longitude, 11.516667));
        assert_eq!(position.lon_hemisphere, Hemisphere::East);
    }

    #[test]
    fn parses_gngga_western_hemisphere() {
        let fix = parse_gga(
            b"$GNGGA,001043.00,4404.14036,N,12118.85961,W,1,12,0.98,1113.0,M,-21.3,M,,*47",
        )
        .unwrap();
        let position = fix.position.unwrap();
        assert!(close(position.signed_longitude(), -121.314327));
        assert!(close(position.signed_latitude(), 44.069006));
        assert_eq!(fix.satellites, 12);
    }

    #[test]
    fn no_fix_has_no_position() {
        let fix = parse_gga(b"$GPGGA,,,,,,0,00,99.99,,,,,,*48").unwrap();
        assert_eq!(fix.position, None);
        assert_eq!(fix.quality, 0);
        assert!(!fix.fix_valid);
    }

    #[test]
    fn checksum_mismatch() {
        let result =
            parse_gga(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*48");
        assert_eq!(result, Err(SensorError::Checksum));
    }

    #[test]
    fn sentence_without_checksum_is_accepted() {
        let fix = parse_gga(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        assert!(fix.is_ok());
    }

    #[test]
    fn other_sentences_are_skipped() {
        assert!(!is_gga(b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A"));
        assert_eq!(
            parse_gga(b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A"),
            Err(SensorError::NoData)
        );
    }

    #[test]
    fn truncated_sentence_is_malformed() {
        assert_eq!(parse_gga(b"$GPGGA,123519,4807.038,N"), Err(SensorError::Malformed));
    }

    #[test]
    fn bad_hemisphere_is_malformed() {
        assert_eq!(
            parse_gga(b"$GPGGA,123519,4807.038,Q,01131.000,E,1,08,0.9,545.4,M,46.9,M,,"),
            Err(SensorError::Malformed)
        );
    }

    const FIRST: &[u8] =
        b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
    const SECOND: &[u8] =
        b"$GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*76\r\n";
    const RMC: &[u8] =
        b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n";

    #[test]
    fn backlog_yields_newest_gga() {
        let mut bytes = std::vec::Vec::new();
        bytes.extend_from_slice(FIRST);
        bytes.extend_from_slice(RMC);
        bytes.extend_from_slice(SECOND);
        bytes.extend_from_slice(RMC);

        let mut buffer = SentenceBuffer::new();
        let fix = latest_gga(&mut buffer, &bytes).unwrap().unwrap();
        assert_eq!(fix.time, 92750.0);
        assert_eq!(fix.position.unwrap().lon_hemisphere, Hemisphere::West);
    }

    #[test]
    fn sentence_split_across_reads() {
        let mut buffer = SentenceBuffer::new();
        let (head, tail) = SECOND.split_at(30);

        assert_eq!(latest_gga(&mut buffer, head), None);
        let fix = latest_gga(&mut buffer, tail).unwrap().unwrap();
        assert_eq!(fix.satellites, 8);
    }

    #[test]
    fn newest_good_fix_survives_later_corruption() {
        let mut bytes = std::vec::Vec::new();
        bytes.extend_from_slice(FIRST);
        bytes.extend_from_slice(
            b"$GPGGA,123520,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*00\r\n",
        );

        let mut buffer = SentenceBuffer::new();
        let fix = latest_gga(&mut buffer, &bytes).unwrap().unwrap();
        assert_eq!(fix.time, 123519.0);
    }

    #[test]
    fn corrupt_only_is_reported() {
        let mut buffer = SentenceBuffer::new();
        let result = latest_gga(
            &mut buffer,
            b"$GPGGA,123520,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*00\r\n",
        );
        assert_eq!(result, Some(Err(SensorError::Checksum)));
    }

    #[test]
    fn no_gga_in_backlog() {
        let mut buffer = SentenceBuffer::new();
        assert_eq!(latest_gga(&mut buffer, RMC), None);
        assert_eq!(latest_gga(&mut buffer, b"noise without a start\r\n"), None);
    }

    #[test]
    fn overlong_garbage_resyncs_at_next_sentence() {
        let mut bytes = std::vec::Vec::new();
        bytes.push(b'$');
        bytes.extend_from_slice(&[b'x'; 2 * MAX_SENTENCE_LEN]);
        bytes.extend_from_slice(FIRST);

        let mut buffer = SentenceBuffer::new();
        let fix = latest_gga(&mut buffer, &bytes).unwrap().unwrap();
        assert_eq!(fix.time, 123519.0);
    }
}
