//! DS3231 RTC driver over `embedded-hal` I2C
//!
//! Minimal subset for timekeeping: time registers, oscillator-stop flag and
//! the square-wave output. Alarms, aging offset and the temperature sensor
//! are not exposed.
//!
//! Every method is one or two bus transactions and must not be called from
//! interrupt context.

use embedded_hal::i2c::I2c;

use crate::{DateTime, RtcDevice, SquareWave};

/// Fixed 7-bit I2C address
pub const DS3231_ADDR: u8 = 0x68;

// Register map (subset)
mod reg {
    pub const SECONDS: u8 = 0x00;
    pub const CONTROL: u8 = 0x0E;
    pub const STATUS: u8 = 0x0F;
}

/// Month register bit 7
const CENTURY: u8 = 0x80;
/// Hours register bit 6 (set = 12 hour mode)
const HOUR_12: u8 = 0x40;
/// Hours register bit 5 in 12 hour mode
const HOUR_PM: u8 = 0x20;
/// Control register: interrupt control (1 = alarm output, square wave off)
const INTCN: u8 = 0x04;
/// Control register: rate select RS2:RS1
const RATE_MASK: u8 = 0x18;
/// Status register: oscillator stop flag
const OSF: u8 = 0x80;

/// DS3231 errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ds3231Error<E> {
    /// I2C bus error
    I2c(E),
    /// Register contents are not valid BCD, or a value cannot be represented
    InvalidData,
}

impl<E: core::fmt::Debug> core::fmt::Display for Ds3231Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::I2c(e) => write!(f, "I2C error: {:?}", e),
            Self::InvalidData => write!(f, "Invalid RTC data"),
        }
    }
}

impl<E: core::fmt::Debug> core::error::Error for Ds3231Error<E> {}

/// DS3231 on an I2C bus
pub struct Ds3231<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Ds3231<I2C> {
    /// Driver at the default address
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, DS3231_ADDR)
    }

    /// Driver at a non-default address (behind a translator, for instance)
    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Give the bus back
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn read_register(&mut self, register: u8) -> Result<u8, Ds3231Error<I2C::Error>> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(Ds3231Error::I2c)?;
        Ok(buf[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Ds3231Error<I2C::Error>> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(Ds3231Error::I2c)
    }
}

impl<I2C: I2c> RtcDevice for Ds3231<I2C> {
    type Error = Ds3231Error<I2C::Error>;

    fn probe(&mut self) -> Result<(), Self::Error> {
        self.read_register(reg::STATUS).map(|_| ())
    }

    fn datetime(&mut self) -> Result<DateTime, Self::Error> {
        let mut buf = [0u8; 7];
        self.i2c
            .write_read(self.address, &[reg::SECONDS], &mut buf)
            .map_err(Ds3231Error::I2c)?;

        let second = bcd_to_bin(buf[0] & 0x7F)?;
        let minute = bcd_to_bin(buf[1] & 0x7F)?;
        let hour = decode_hour(buf[2])?;
        // buf[3] is the weekday, derived from the date on write
        let day = bcd_to_bin(buf[4] & 0x3F)?;
        let month = bcd_to_bin(buf[5] & 0x1F)?;
        let century = if buf[5] & CENTURY != 0 { 100 } else { 0 };
        let year = 2000 + century + u16::from(bcd_to_bin(buf[6])?);

        if !(1..=12).contains(&month)
            || day == 0
            || day > month_length(year, month)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return Err(Ds3231Error::InvalidData);
        }

        Ok(DateTime::new(year, month, day, hour, minute, second))
    }

    fn set_datetime(&mut self, datetime: &DateTime) -> Result<(), Self::Error> {
        if !(2000..=2199).contains(&datetime.year) || !(1..=12).contains(&datetime.month) {
            return Err(Ds3231Error::InvalidData);
        }
        let (century, yy) = if datetime.year >= 2100 {
            (CENTURY, (datetime.year - 2100) as u8)
        } else {
            (0, (datetime.year - 2000) as u8)
        };

        let payload = [
            reg::SECONDS,
            bin_to_bcd(datetime.second)?,
            bin_to_bcd(datetime.minute)?,
            bin_to_bcd(datetime.hour)?,
            weekday(datetime.year, datetime.month, datetime.day),
            bin_to_bcd(datetime.day)?,
            bin_to_bcd(datetime.month)? | century,
            bin_to_bcd(yy)?,
        ];
        self.i2c
            .write(self.address, &payload)
            .map_err(Ds3231Error::I2c)?;

        // A fresh time makes the oscillator-stop flag meaningless
        let status = self.read_register(reg::STATUS)?;
        self.write_register(reg::STATUS, status & !OSF)
    }

    fn lost_power(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_register(reg::STATUS)? & OSF != 0)
    }

    fn set_square_wave(&mut self, frequency: SquareWave) -> Result<(), Self::Error> {
        let mut control = self.read_register(reg::CONTROL)? & !(INTCN | RATE_MASK);
        control |= match frequency {
            SquareWave::Off => INTCN,
            SquareWave::Hz1 => 0x00,
            SquareWave::Hz1024 => 0x08,
            SquareWave::Hz4096 => 0x10,
            SquareWave::Hz8192 => 0x18,
        };
        self.write_register(reg::CONTROL, control)
    }
}

fn decode_hour<E>(raw: u8) -> Result<u8, Ds3231Error<E>> {
    if raw & HOUR_12 == 0 {
        return bcd_to_bin(raw & 0x3F);
    }
    let hour = bcd_to_bin(raw & 0x1F)?;
    if hour == 0 || hour > 12 {
        return Err(Ds3231Error::InvalidData);
    }
    let pm = if raw & HOUR_PM != 0 { 12 } else { 0 };
    Ok(hour % 12 + pm)
}

fn bcd_to_bin<E>(bcd: u8) -> Result<u8, Ds3231Error<E>> {
    let hi = bcd >> 4;
    let lo = bcd & 0x0F;
    if hi > 9 || lo > 9 {
        return Err(Ds3231Error::InvalidData);
    }
    Ok(hi * 10 + lo)
}

fn bin_to_bcd<E>(bin: u8) -> Result<u8, Ds3231Error<E>> {
    if bin > 99 {
        return Err(Ds3231Error::InvalidData);
    }
    Ok(((bin / 10) << 4) | (bin % 10))
}

/// Days in `month` (1-12) of `year`
fn month_length(year: u16, month: u8) -> u8 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        _ => 31,
    }
}

/// Weekday register value, Monday = 1 ... Sunday = 7 (Sakamoto's method)
fn weekday(year: u16, month: u8, day: u8) -> u8 {
    const OFFSETS: [u16; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];
    let y = if month < 3 { year - 1 } else { year };
    let idx = usize::from(month.clamp(1, 12) - 1);
    let dow = (y + y / 4 - y / 100 + y / 400 + OFFSETS[idx] + u16::from(day)) % 7;
    if dow == 0 {
        7
    } else {
        dow as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const ADDR: u8 = DS3231_ADDR;

    #[test]
    fn test_read_datetime() {
        let expectations = [I2cTransaction::write_read(
            ADDR,
            vec![0x00],
            vec![0x56, 0x34, 0x12, 0x01, 0x30, 0x06, 0x25],
        )];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));

        let dt = rtc.datetime().unwrap();
        assert_eq!(dt, DateTime::new(2025, 6, 30, 12, 34, 56));

        rtc.release().done();
    }

    #[test]
    fn test_read_datetime_12h_and_century() {
        // 11 PM in 12 hour mode, century bit set
        let expectations = [I2cTransaction::write_read(
            ADDR,
            vec![0x00],
            vec![0x00, 0x00, 0x40 | 0x20 | 0x11, 0x03, 0x01, 0x80 | 0x01, 0x05],
        )];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));

        let dt = rtc.datetime().unwrap();
        assert_eq!(dt, DateTime::new(2105, 1, 1, 23, 0, 0));

        rtc.release().done();
    }

    #[test]
    fn test_read_rejects_bad_bcd() {
        let expectations = [I2cTransaction::write_read(
            ADDR,
            vec![0x00],
            vec![0x5A, 0x00, 0x00, 0x01, 0x01, 0x01, 0x25],
        )];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));

        assert_eq!(rtc.datetime(), Err(Ds3231Error::InvalidData));

        rtc.release().done();
    }

    #[test]
    fn test_read_rejects_day_past_month_end() {
        // 2025-02-30 and 2025-02-29 from corrupted registers, then 2024-02-29
        let expectations = [
            I2cTransaction::write_read(
                ADDR,
                vec![0x00],
                vec![0x00, 0x00, 0x00, 0x06, 0x30, 0x02, 0x25],
            ),
            I2cTransaction::write_read(
                ADDR,
                vec![0x00],
                vec![0x00, 0x00, 0x00, 0x06, 0x29, 0x02, 0x25],
            ),
            I2cTransaction::write_read(
                ADDR,
                vec![0x00],
                vec![0x00, 0x00, 0x00, 0x04, 0x29, 0x02, 0x24],
            ),
        ];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));

        assert_eq!(rtc.datetime(), Err(Ds3231Error::InvalidData));
        assert_eq!(rtc.datetime(), Err(Ds3231Error::InvalidData));
        assert_eq!(rtc.datetime().unwrap(), DateTime::new(2024, 2, 29, 0, 0, 0));

        rtc.release().done();
    }

    #[test]
    fn test_set_datetime_clears_osf() {
        // 2024-02-29 is a Thursday
        let expectations = [
            I2cTransaction::write(
                ADDR,
                vec![0x00, 0x59, 0x59, 0x23, 0x04, 0x29, 0x02, 0x24],
            ),
            I2cTransaction::write_read(ADDR, vec![0x0F], vec![0x88]),
            I2cTransaction::write(ADDR, vec![0x0F, 0x08]),
        ];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));

        rtc.set_datetime(&DateTime::new(2024, 2, 29, 23, 59, 59).with_millis(500))
            .unwrap();

        rtc.release().done();
    }

    #[test]
    fn test_set_datetime_out_of_range() {
        let expectations: [I2cTransaction; 0] = [];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));
        assert_eq!(
            rtc.set_datetime(&DateTime::new(1999, 12, 31, 0, 0, 0)),
            Err(Ds3231Error::InvalidData)
        );
        rtc.release().done();
    }

    #[test]
    fn test_lost_power() {
        let expectations = [
            I2cTransaction::write_read(ADDR, vec![0x0F], vec![0x80]),
            I2cTransaction::write_read(ADDR, vec![0x0F], vec![0x00]),
        ];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));

        assert!(rtc.lost_power().unwrap());
        assert!(!rtc.lost_power().unwrap());

        rtc.release().done();
    }

    #[test]
    fn test_square_wave_1hz() {
        // INTCN set and 8 kHz selected before; 1 Hz clears both, keeps other bits
        let expectations = [
            I2cTransaction::write_read(ADDR, vec![0x0E], vec![0x1C | 0x40]),
            I2cTransaction::write(ADDR, vec![0x0E, 0x40]),
        ];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));

        rtc.set_square_wave(SquareWave::Hz1).unwrap();

        rtc.release().done();
    }

    #[test]
    fn test_square_wave_off() {
        let expectations = [
            I2cTransaction::write_read(ADDR, vec![0x0E], vec![0x00]),
            I2cTransaction::write(ADDR, vec![0x0E, 0x04]),
        ];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));

        rtc.set_square_wave(SquareWave::Off).unwrap();

        rtc.release().done();
    }

    #[test]
    fn test_probe_bus_error() {
        let expectations =
            [I2cTransaction::write_read(ADDR, vec![0x0F], vec![0x00]).with_error(ErrorKind::Other)];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));

        assert_eq!(rtc.probe(), Err(Ds3231Error::I2c(ErrorKind::Other)));

        rtc.release().done();
    }

    #[test]
    fn test_weekday() {
        assert_eq!(weekday(2000, 1, 1), 6); // Saturday
        assert_eq!(weekday(2024, 2, 29), 4); // Thursday
        assert_eq!(weekday(2025, 6, 29), 7); // Sunday
        assert_eq!(weekday(2025, 6, 30), 1); // Monday
    }
}
