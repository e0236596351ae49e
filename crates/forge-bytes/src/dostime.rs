//! MS-DOS date/time codec, as used by the ZIP local/central header fields
#[cfg(feature = "win32")]
use time::{Date, Month, PrimitiveDateTime, Time};

/// Decodes a DOS date/time pair into a [`PrimitiveDateTime`]
///
/// Returns `None` if the encoded fields do not form a valid calendar date
#[cfg(feature = "win32")]
pub fn dos_time_decode(date: u16, time: u16) -> Option<PrimitiveDateTime> {
    let year: i32 = (((date >> 9) & 0x7f) + 1980).into();
    let month = Month::try_from(((date >> 5) & 0xf) as u8).ok()?;
    let day: u8 = (date & 0x1f) as u8;
    let hour: u8 = ((time >> 11) & 0x1f) as u8;
    let minute: u8 = ((time >> 5) & 0x3f) as u8;
    let second: u8 = ((time & 0x1f) << 1) as u8;
    Some(PrimitiveDateTime::new(
        Date::from_calendar_date(year, month, day).ok()?,
        Time::from_hms(hour, minute, second).ok()?,
    ))
}

/// Encodes a `(year, month, day, hour, minute, second)` civil time into a DOS date/time pair
///
/// `year` must fall in `1980..=2107`. The low bit of `second` is dropped: DOS time
/// has a 2-second resolution.
#[cfg(feature = "win32")]
pub fn dos_time_encode(dt: PrimitiveDateTime) -> Option<(u16, u16)> {
    let year = dt.year();
    if !(1980..=2107).contains(&year) {
        return None;
    }
    let date = (((year - 1980) as u16) << 9)
        | ((u8::from(dt.month()) as u16) << 5)
        | (dt.day() as u16);
    let time = ((dt.hour() as u16) << 11) | ((dt.minute() as u16) << 5) | ((dt.second() as u16) >> 1);
    Some((date, time))
}

#[cfg(all(test, feature = "win32"))]
mod tests {
    use super::*;

    #[test]
    fn round_trip_even_seconds() {
        for second in (0u8..60).step_by(2) {
            let original = PrimitiveDateTime::new(
                Date::from_calendar_date(2003, Month::December, 17).unwrap(),
                Time::from_hms(14, 29, second).unwrap(),
            );
            let (date, time) = dos_time_encode(original).unwrap();
            let decoded = dos_time_decode(date, time).unwrap();
            assert_eq!(decoded, original);
        }
    }

    #[test]
    fn encode_drops_low_bit_of_odd_seconds() {
        let odd = PrimitiveDateTime::new(
            Date::from_calendar_date(2003, Month::December, 17).unwrap(),
            Time::from_hms(14, 29, 47).unwrap(),
        );
        let even = PrimitiveDateTime::new(
            Date::from_calendar_date(2003, Month::December, 17).unwrap(),
            Time::from_hms(14, 29, 46).unwrap(),
        );
        let (date, time) = dos_time_encode(odd).unwrap();
        assert_eq!(dos_time_decode(date, time).unwrap(), even);
    }

    #[test]
    fn rejects_year_out_of_range() {
        let too_early = PrimitiveDateTime::new(
            Date::from_calendar_date(1979, Month::January, 1).unwrap(),
            Time::from_hms(0, 0, 0).unwrap(),
        );
        assert_eq!(dos_time_encode(too_early), None);
    }
}
